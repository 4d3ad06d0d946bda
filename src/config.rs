use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::{
    env,
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::services::matcher::DEFAULT_TOLERANCE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Remote,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "remote" => Ok(StorageBackend::Remote),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(anyhow!("unknown STORAGE_BACKEND {:?}", other)),
        }
    }
}

/// Service credentials loaded once from the JSON credential file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceCredentials {
    #[serde(default)]
    pub database_secret: Option<String>,
    #[serde(default)]
    pub storage_access_key: Option<String>,
    #[serde(default)]
    pub storage_secret_key: Option<String>,
}

impl ServiceCredentials {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading credential file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing credential file {}", path.display()))
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    pub storage_backend: StorageBackend,
    pub credentials: ServiceCredentials,
    pub database_url: String,
    pub registry_root: String,
    pub database_timeout_millis: u64,
    pub storage_endpoint: Option<String>,
    pub storage_region: String,
    pub storage_bucket: String,
    pub storage_image_prefix: String,
    pub extractor_host: String,
    pub extractor_timeout_millis: u64,
    pub match_threshold: f64,
    pub local_image_dir: PathBuf,
    pub archive_dir: Option<PathBuf>,
    pub max_upload_bytes: usize,
    pub statsd_host: String,
    pub statsd_port: u16,
    pub statsd_prefix: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let storage_backend: StorageBackend = parsed("STORAGE_BACKEND", StorageBackend::Remote)?;

        let credentials_path = PathBuf::from(
            optional("CREDENTIALS_PATH").unwrap_or_else(|| "serviceAccountKey.json".to_string()),
        );
        let credentials = match storage_backend {
            StorageBackend::Remote => ServiceCredentials::load(&credentials_path)?,
            StorageBackend::Memory => ServiceCredentials::default(),
        };

        let (database_url, storage_bucket) = match storage_backend {
            StorageBackend::Remote => (required("DATABASE_URL")?, required("STORAGE_BUCKET")?),
            StorageBackend::Memory => (
                optional("DATABASE_URL").unwrap_or_default(),
                optional("STORAGE_BUCKET").unwrap_or_default(),
            ),
        };

        let match_threshold: f64 = parsed("FACE_MATCH_THRESHOLD", DEFAULT_TOLERANCE)?;
        if !(match_threshold.is_finite() && match_threshold > 0.0) {
            return Err(anyhow!("FACE_MATCH_THRESHOLD must be a positive number"));
        }

        Ok(Self {
            host: optional("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parsed("PORT", 8080)?,
            workers: optional("WORKERS")
                .map(|w| w.parse::<usize>().context("WORKERS must be a number"))
                .transpose()?,
            storage_backend,
            credentials,
            database_url,
            registry_root: optional("REGISTRY_ROOT")
                .unwrap_or_else(|| "registered_faces".to_string()),
            database_timeout_millis: parsed("DATABASE_TIMEOUT_MILLIS", 10_000)?,
            storage_endpoint: optional("STORAGE_ENDPOINT"),
            storage_region: optional("STORAGE_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            storage_bucket,
            storage_image_prefix: optional("STORAGE_IMAGE_PREFIX")
                .unwrap_or_else(|| "images".to_string()),
            extractor_host: required("FACE_EXTRACTOR_HOST")?,
            extractor_timeout_millis: parsed("FACE_EXTRACTOR_TIMEOUT_MILLIS", 10_000)?,
            match_threshold,
            local_image_dir: PathBuf::from(
                optional("LOCAL_IMAGE_DIR").unwrap_or_else(|| "images".to_string()),
            ),
            archive_dir: optional("EMBEDDING_ARCHIVE_DIR").map(PathBuf::from),
            max_upload_bytes: parsed("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            statsd_host: optional("STATSD_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            statsd_port: parsed("STATSD_PORT", 8125)?,
            statsd_prefix: optional("STATSD_PREFIX").unwrap_or_else(|| "face_registry".to_string()),
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required(key: &str) -> Result<String> {
    optional(key).ok_or_else(|| anyhow!("{} must be set", key))
}

fn parsed<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow!("{} has an invalid value {:?}: {}", key, raw, e)),
        None => Ok(default),
    }
}
