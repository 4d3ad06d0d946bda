use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use std::path::{Component, Path, PathBuf};

use crate::models::face_record::{ArchivedEmbedding, Embedding};

/// Local copies of uploaded images plus the optional embedding archive.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    image_dir: PathBuf,
    archive_dir: Option<PathBuf>,
}

impl LocalStorage {
    pub fn new(image_dir: PathBuf, archive_dir: Option<PathBuf>) -> Self {
        Self {
            image_dir,
            archive_dir,
        }
    }

    pub async fn write_image(&self, file_name: &str, content: &[u8]) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.image_dir).await?;
        let path = self.image_dir.join(file_name);
        tokio::fs::write(&path, content).await?;
        Ok(path)
    }

    pub async fn read_image(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    pub async fn remove_image(&self, path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove local image");
        }
    }

    /// Resolves a client supplied path inside the image directory.
    ///
    /// Only plain relative components are accepted.
    pub fn resolve_image_path(&self, relative: &str) -> Result<PathBuf> {
        let relative = Path::new(relative);
        if relative.as_os_str().is_empty() {
            return Err(anyhow!("image path is empty"));
        }
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(anyhow!("image path must stay inside the image directory"));
        }
        Ok(self.image_dir.join(relative))
    }

    /// Writes `<archive_dir>/<id>.json`. Returns `Ok(None)` when archiving is disabled.
    pub async fn archive_embedding(&self, id: &str, embedding: &Embedding) -> Result<Option<PathBuf>> {
        let Some(dir) = &self.archive_dir else {
            return Ok(None);
        };

        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating archive directory {}", dir.display()))?;

        let snapshot = ArchivedEmbedding {
            id: id.to_string(),
            embedding: embedding.clone(),
            created_at: Utc::now(),
        };
        let path = dir.join(format!("{}.json", id));
        let data = serde_json::to_vec(&snapshot)?;
        tokio::fs::write(&path, data)
            .await
            .with_context(|| format!("writing {}", path.display()))?;

        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn writes_and_reads_images_under_the_image_dir() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("images"), None);

        let path = storage.write_image("a.png", b"bytes").await.unwrap();
        assert!(path.starts_with(dir.path().join("images")));
        assert_eq!(storage.read_image(&path).await.unwrap(), b"bytes");

        storage.remove_image(&path).await;
        assert!(!path.exists());
    }

    #[test]
    fn rejects_paths_escaping_the_image_dir() {
        let storage = LocalStorage::new(PathBuf::from("/srv/images"), None);

        assert_eq!(
            storage.resolve_image_path("me.jpg").unwrap(),
            PathBuf::from("/srv/images/me.jpg")
        );
        assert!(storage.resolve_image_path("../secret.json").is_err());
        assert!(storage.resolve_image_path("/etc/passwd").is_err());
        assert!(storage.resolve_image_path("").is_err());
    }

    #[actix_web::test]
    async fn archive_is_skipped_when_disabled() {
        let storage = LocalStorage::new(PathBuf::from("images"), None);
        assert!(storage
            .archive_embedding("alice_30_x", &vec![0.1])
            .await
            .unwrap()
            .is_none());
    }

    #[actix_web::test]
    async fn archive_writes_a_json_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("images"), Some(dir.path().join("archive")));

        let path = storage
            .archive_embedding("alice_30_x", &vec![0.25, 0.5])
            .await
            .unwrap()
            .unwrap();

        let snapshot: ArchivedEmbedding =
            serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(snapshot.id, "alice_30_x");
        assert_eq!(snapshot.embedding, vec![0.25, 0.5]);
    }
}
