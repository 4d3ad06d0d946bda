use chrono::Utc;
use std::{sync::Arc, time::Instant};

use crate::{
    commons::{blob_store::BlobStore, local_storage::LocalStorage},
    faces::{dto::face_requests::RegistrationInput, face_error::FaceError},
    models::face_record::{Embedding, FaceRecord},
    repositories::registry_repository::RegistryStore,
    services::{
        embedding_service::EmbeddingExtractor,
        matcher::{find_match, FaceMatch},
        metrics_service::{endpoint_tags, MetricsService},
    },
    utils::{generate_face_id, inspect_image},
};

#[derive(Debug)]
pub enum CheckOutcome {
    Matched(FaceMatch),
    Registered(FaceRecord),
}

/// Check-or-register workflow over the registry, blob store and face extractor.
#[derive(Clone)]
pub struct FaceService {
    registry: Arc<dyn RegistryStore>,
    blobs: Arc<dyn BlobStore>,
    extractor: Arc<dyn EmbeddingExtractor>,
    local: LocalStorage,
    metrics: MetricsService,
    threshold: f64,
    image_prefix: String,
}

impl FaceService {
    pub fn new(
        registry: Arc<dyn RegistryStore>,
        blobs: Arc<dyn BlobStore>,
        extractor: Arc<dyn EmbeddingExtractor>,
        local: LocalStorage,
        metrics: MetricsService,
        threshold: f64,
        image_prefix: &str,
    ) -> Self {
        Self {
            registry,
            blobs,
            extractor,
            local,
            metrics,
            threshold,
            image_prefix: image_prefix.trim_matches('/').to_string(),
        }
    }

    /// Matches the photo against the registry and registers it on a miss when
    /// `registration` is supplied.
    pub async fn check_or_register(
        &self,
        image: Vec<u8>,
        registration: Option<RegistrationInput>,
    ) -> Result<CheckOutcome, FaceError> {
        let start = Instant::now();
        let tags = endpoint_tags("check_face");

        let result = self.check_then_register(image, registration).await;
        let metric = match &result {
            Ok(CheckOutcome::Matched(_)) => "face.check.matched",
            Ok(CheckOutcome::Registered(_)) => "face.check.registered",
            Err(FaceError::NotRegistered) => "face.check.not_registered",
            Err(FaceError::NoFaceDetected) => "face.check.no_face",
            Err(FaceError::Validation(_)) => "face.check.invalid",
            Err(_) => "face.check.error",
        };
        self.metrics.increment(metric, Some(&tags));
        self.metrics
            .timing("face.check.duration", start.elapsed(), Some(&tags));

        result
    }

    async fn check_then_register(
        &self,
        image: Vec<u8>,
        registration: Option<RegistrationInput>,
    ) -> Result<CheckOutcome, FaceError> {
        if let Some(hit) = self.identify(&image).await? {
            tracing::info!(id = %hit.id, distance = hit.distance, "face matched");
            return Ok(CheckOutcome::Matched(hit));
        }

        match registration {
            Some(input) => {
                let record = self.register(input, image).await?;
                Ok(CheckOutcome::Registered(record))
            }
            None => Err(FaceError::NotRegistered),
        }
    }

    /// Checks an image already stored in the local image directory.
    pub async fn check_local_image(&self, relative_path: &str) -> Result<FaceMatch, FaceError> {
        let path = self
            .local
            .resolve_image_path(relative_path)
            .map_err(|e| FaceError::Validation(e.to_string()))?;

        let image = match self.local.read_image(&path).await {
            Ok(image) => image,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FaceError::Validation(format!(
                    "image {} does not exist",
                    relative_path
                )));
            }
            Err(e) => return Err(e.into()),
        };

        match self.check_or_register(image, None).await? {
            CheckOutcome::Matched(hit) => Ok(hit),
            CheckOutcome::Registered(_) => Err(FaceError::NotRegistered),
        }
    }

    /// Validates the photo, extracts its embedding and looks for the nearest registered face.
    pub async fn identify(&self, image: &[u8]) -> Result<Option<FaceMatch>, FaceError> {
        inspect_image(image)?;
        let query = self.extract_first(image).await?;

        let registry = self.registry.list().await.map_err(FaceError::Registry)?;
        tracing::debug!(records = registry.len(), "scanning registry");

        Ok(find_match(&query, &registry, self.threshold))
    }

    async fn extract_first(&self, image: &[u8]) -> Result<Embedding, FaceError> {
        let embeddings = self
            .extractor
            .extract(image)
            .await
            .map_err(FaceError::Extractor)?;

        if embeddings.len() > 1 {
            tracing::info!(faces = embeddings.len(), "several faces found, using the first");
        }
        embeddings
            .into_iter()
            .find(|e| !e.is_empty())
            .ok_or(FaceError::NoFaceDetected)
    }

    pub async fn register(
        &self,
        input: RegistrationInput,
        image: Vec<u8>,
    ) -> Result<FaceRecord, FaceError> {
        let start = Instant::now();
        let tags = endpoint_tags("registration");

        let result = self.store_registration(input, image).await;
        match &result {
            Ok(_) => self.metrics.increment("face.register.success", Some(&tags)),
            Err(_) => self.metrics.increment("face.register.error", Some(&tags)),
        }
        self.metrics
            .timing("face.register.duration", start.elapsed(), Some(&tags));

        result
    }

    async fn store_registration(
        &self,
        input: RegistrationInput,
        image: Vec<u8>,
    ) -> Result<FaceRecord, FaceError> {
        let kind = inspect_image(&image)?;
        let id = generate_face_id(&input.name, &input.age);
        let file_name = format!("{}.{}", id, kind.extension());

        let local_path = self.local.write_image(&file_name, &image).await?;

        // Extraction runs again on the persisted copy.
        let embedding = match self.local.read_image(&local_path).await {
            Ok(persisted) => self.extract_first(&persisted).await,
            Err(e) => Err(e.into()),
        };
        let embedding = match embedding {
            Ok(embedding) => embedding,
            Err(e) => {
                self.local.remove_image(&local_path).await;
                return Err(e);
            }
        };

        let image_path = if self.image_prefix.is_empty() {
            file_name
        } else {
            format!("{}/{}", self.image_prefix, file_name)
        };

        if let Err(e) = self.blobs.upload(&image_path, image, kind.mime_type()).await {
            self.local.remove_image(&local_path).await;
            return Err(FaceError::Blob(e));
        }

        let record = FaceRecord {
            id,
            name: input.name,
            age: input.age,
            embedding,
            image_path,
            created_at: Some(Utc::now()),
        };

        if let Err(e) = self.registry.put(&record).await {
            if let Err(cleanup) = self.blobs.delete(&record.image_path).await {
                tracing::warn!(
                    path = %record.image_path,
                    error = %cleanup,
                    "orphaned blob left after failed registry write"
                );
            }
            self.local.remove_image(&local_path).await;
            return Err(FaceError::Registry(e));
        }

        if let Err(e) = self.local.archive_embedding(&record.id, &record.embedding).await {
            tracing::warn!(id = %record.id, error = %e, "failed to archive embedding");
        }

        tracing::info!(id = %record.id, path = %record.image_path, "registered face");
        Ok(record)
    }
}
