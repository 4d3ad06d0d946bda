pub mod embedding_service;
pub mod matcher;
pub mod metrics_service;
