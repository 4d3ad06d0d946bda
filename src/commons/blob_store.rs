use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::{
    config::{Credentials, Region},
    primitives::ByteStream,
    Client,
};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Raw image bytes keyed by object path.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, path: &str, content: Vec<u8>, content_type: &str) -> Result<()>;
    async fn delete(&self, path: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket_name: String,
}

impl S3BlobStore {
    pub async fn new(
        endpoint: Option<&str>,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket_name: &str,
    ) -> Result<Self> {
        let mut builder = aws_sdk_s3::config::Builder::new()
            .region(Region::new(region.to_string()))
            .credentials_provider(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "service-credentials",
            ))
            .behavior_version_latest();

        if let Some(endpoint) = endpoint {
            builder = builder
                .endpoint_url(endpoint.trim_end_matches('/'))
                .force_path_style(true);
        }

        let client = Client::from_conf(builder.build());

        match client.head_bucket().bucket(bucket_name).send().await {
            Ok(_) => tracing::info!(bucket = bucket_name, "object storage reachable"),
            Err(e) => tracing::warn!(bucket = bucket_name, error = ?e, "object storage check failed"),
        }

        Ok(Self {
            client,
            bucket_name: bucket_name.to_string(),
        })
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn upload(&self, path: &str, content: Vec<u8>, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(path)
            .content_type(content_type)
            .body(ByteStream::from(content))
            .send()
            .await
            .with_context(|| format!("uploading {} to bucket {}", path, self.bucket_name))?;

        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(path)
            .send()
            .await
            .with_context(|| format!("deleting {} from bucket {}", path, self.bucket_name))?;

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredBlob {
    pub content: Vec<u8>,
    pub content_type: String,
}

/// In-process blob store for local runs without object storage.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, StoredBlob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl MemoryBlobStore {
    pub async fn get(&self, path: &str) -> Option<StoredBlob> {
        self.blobs.read().await.get(path).cloned()
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, path: &str, content: Vec<u8>, content_type: &str) -> Result<()> {
        self.blobs.write().await.insert(
            path.to_string(),
            StoredBlob {
                content,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.blobs.write().await.remove(path);
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn memory_store_upload_then_delete() {
        let store = MemoryBlobStore::new();
        store
            .upload("images/a.png", vec![1, 2, 3], "image/png")
            .await
            .unwrap();

        let blob = store.get("images/a.png").await.unwrap();
        assert_eq!(blob.content, vec![1, 2, 3]);
        assert_eq!(blob.content_type, "image/png");

        store.delete("images/a.png").await.unwrap();
        assert!(store.get("images/a.png").await.is_none());
        assert_eq!(store.len().await, 0);
    }

    #[actix_web::test]
    async fn deleting_a_missing_blob_is_not_an_error() {
        let store = MemoryBlobStore::new();
        assert!(store.delete("images/none.png").await.is_ok());
    }
}
