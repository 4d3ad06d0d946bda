pub mod registry_repository;
