use actix_cors::Cors;
use actix_multipart::form::MultipartFormConfig;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{
    commons::{
        blob_store::{BlobStore, MemoryBlobStore, S3BlobStore},
        local_storage::LocalStorage,
    },
    config::{Config, StorageBackend},
    faces::face_service::FaceService,
    repositories::registry_repository::{MemoryRegistry, RealtimeDbRegistry, RegistryStore},
    services::{embedding_service::RemoteEmbeddingExtractor, metrics_service::MetricsService},
};

mod commons;
mod config;
mod faces;
mod models;
mod repositories;
mod services;
mod utils;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing with JSON format
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = Config::from_env()?;

    let metrics = MetricsService::new(&config.statsd_host, config.statsd_port, &config.statsd_prefix)?;

    let (registry, blobs): (Arc<dyn RegistryStore>, Arc<dyn BlobStore>) = match config.storage_backend {
        StorageBackend::Remote => {
            let registry = RealtimeDbRegistry::new(
                &config.database_url,
                &config.registry_root,
                config.credentials.database_secret.clone(),
                config.database_timeout_millis,
            )?;
            let blobs = S3BlobStore::new(
                config.storage_endpoint.as_deref(),
                &config.storage_region,
                config.credentials.storage_access_key.as_deref().unwrap_or_default(),
                config.credentials.storage_secret_key.as_deref().unwrap_or_default(),
                &config.storage_bucket,
            )
            .await
            .context("initializing object storage")?;
            (
                Arc::new(registry) as Arc<dyn RegistryStore>,
                Arc::new(blobs) as Arc<dyn BlobStore>,
            )
        }
        StorageBackend::Memory => {
            tracing::warn!("using in-memory registry and blob store; registrations are lost on restart");
            (
                Arc::new(MemoryRegistry::new()) as Arc<dyn RegistryStore>,
                Arc::new(MemoryBlobStore::new()) as Arc<dyn BlobStore>,
            )
        }
    };

    let extractor = RemoteEmbeddingExtractor::new(
        &config.extractor_host,
        config.extractor_timeout_millis,
        metrics.clone(),
    )?;

    let face_service = web::Data::new(FaceService::new(
        registry,
        blobs,
        Arc::new(extractor),
        LocalStorage::new(config.local_image_dir.clone(), config.archive_dir.clone()),
        metrics,
        config.match_threshold,
        &config.storage_image_prefix,
    ));

    let max_upload_bytes = config.max_upload_bytes;
    let bind = (config.host.clone(), config.port);
    let workers = config.workers;

    tracing::info!(
        host = %bind.0,
        port = bind.1,
        backend = ?config.storage_backend,
        threshold = config.match_threshold,
        "starting face registry"
    );

    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .wrap(Cors::permissive())
            .app_data(face_service.clone())
            .app_data(
                MultipartFormConfig::default()
                    .total_limit(max_upload_bytes)
                    .memory_limit(max_upload_bytes),
            )
            .configure(faces::face_controller::configure)
    });
    if let Some(workers) = workers {
        server = server.workers(workers);
    }

    server.bind(bind)?.run().await?;
    Ok(())
}
