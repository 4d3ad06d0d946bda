use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::{
    models::face_record::Embedding,
    services::metrics_service::{endpoint_tags, MetricsService},
};

/// Produces one embedding per face found in an encoded image.
#[async_trait]
pub trait EmbeddingExtractor: Send + Sync {
    async fn extract(&self, image: &[u8]) -> Result<Vec<Embedding>>;
}

#[derive(Debug, Serialize)]
struct FaceEncodingsRequest<'a> {
    image: &'a str,
}

#[derive(Debug, Deserialize)]
struct FaceEncodingsResponse {
    #[serde(default)]
    encodings: Vec<Embedding>,
}

/// Client for the face-encoding service (`POST {host}/face-encodings`).
#[derive(Clone)]
pub struct RemoteEmbeddingExtractor {
    client: reqwest::Client,
    base_url: String,
    metrics: MetricsService,
}

impl RemoteEmbeddingExtractor {
    pub fn new(base_url: &str, timeout_millis: u64, metrics: MetricsService) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_millis))
            .build()
            .context("building face extractor HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            metrics,
        })
    }

    async fn request(&self, image: &[u8]) -> Result<Vec<Embedding>> {
        let url = format!("{}/face-encodings", self.base_url);
        let encoded = STANDARD.encode(image);

        let response = self
            .client
            .post(&url)
            .json(&FaceEncodingsRequest { image: &encoded })
            .send()
            .await
            .map_err(|e| anyhow!("face extractor request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "face extractor returned error status: {}",
                response.status()
            ));
        }

        let body: FaceEncodingsResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("failed to parse face extractor response: {}", e))?;

        Ok(body.encodings)
    }
}

#[async_trait]
impl EmbeddingExtractor for RemoteEmbeddingExtractor {
    async fn extract(&self, image: &[u8]) -> Result<Vec<Embedding>> {
        let start = Instant::now();
        let tags = endpoint_tags("face_encodings");

        let result = self.request(image).await;
        if result.is_err() {
            self.metrics.increment("face.extractor.error", Some(&tags));
        }
        self.metrics
            .timing("face.extractor.duration", start.elapsed(), Some(&tags));

        let encodings = result?;
        tracing::debug!(faces = encodings.len(), "face extractor answered");
        Ok(encodings)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_without_encodings_means_no_face() {
        let body: FaceEncodingsResponse = serde_json::from_str("{}").unwrap();
        assert!(body.encodings.is_empty());

        let body: FaceEncodingsResponse =
            serde_json::from_str(r#"{"encodings":[[0.1,0.2],[0.3,0.4]]}"#).unwrap();
        assert_eq!(body.encodings.len(), 2);
        assert_eq!(body.encodings[1], vec![0.3, 0.4]);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let metrics = MetricsService::new("127.0.0.1", 8125, "test").unwrap();
        let extractor =
            RemoteEmbeddingExtractor::new("http://encoder:5000/", 1000, metrics).unwrap();
        assert_eq!(extractor.base_url, "http://encoder:5000");
    }

    #[actix_web::test]
    async fn unreachable_extractor_is_an_error() {
        let metrics = MetricsService::new("127.0.0.1", 8125, "test").unwrap();
        let extractor = RemoteEmbeddingExtractor::new("http://127.0.0.1:9", 500, metrics).unwrap();
        let err = extractor.extract(b"not sent anywhere").await.unwrap_err();
        assert!(err.to_string().contains("face extractor request failed"));
    }
}
