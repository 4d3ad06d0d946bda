use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::{collections::HashMap, time::Duration};
use tokio::sync::RwLock;

use crate::models::face_record::FaceRecord;

/// Key-value registry of face records keyed by generated identifier.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    async fn list(&self) -> Result<HashMap<String, FaceRecord>>;
    async fn put(&self, record: &FaceRecord) -> Result<()>;
}

/// Registry held in a realtime database reachable over its REST interface
/// (`{database_url}/{root}.json`).
#[derive(Clone)]
pub struct RealtimeDbRegistry {
    client: reqwest::Client,
    database_url: String,
    root: String,
    secret: Option<String>,
}

impl RealtimeDbRegistry {
    pub fn new(
        database_url: &str,
        root: &str,
        secret: Option<String>,
        timeout_millis: u64,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_millis))
            .build()
            .context("building realtime database HTTP client")?;

        Ok(Self {
            client,
            database_url: database_url.trim_end_matches('/').to_string(),
            root: root.trim_matches('/').to_string(),
            secret,
        })
    }

    fn url(&self, child: Option<&str>) -> String {
        match child {
            Some(child) => format!("{}/{}/{}.json", self.database_url, self.root, child),
            None => format!("{}/{}.json", self.database_url, self.root),
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.secret {
            Some(secret) => request.query(&[("auth", secret)]),
            None => request,
        }
    }
}

#[async_trait]
impl RegistryStore for RealtimeDbRegistry {
    async fn list(&self) -> Result<HashMap<String, FaceRecord>> {
        let response = self
            .authorize(self.client.get(self.url(None)))
            .send()
            .await
            .map_err(|e| anyhow!("registry read failed: {}", e))?;

        if !response.status().is_success() {
            return Err(anyhow!("registry read returned status {}", response.status()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| anyhow!("failed to parse registry: {}", e))?;

        Ok(records_from_value(body))
    }

    async fn put(&self, record: &FaceRecord) -> Result<()> {
        let response = self
            .authorize(self.client.put(self.url(Some(&record.id))))
            .json(record)
            .send()
            .await
            .map_err(|e| anyhow!("registry write failed for {}: {}", record.id, e))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "registry write for {} returned status {}",
                record.id,
                response.status()
            ));
        }

        Ok(())
    }
}

/// Turns the registry document into records; entries that are not objects are dropped.
pub fn records_from_value(body: Value) -> HashMap<String, FaceRecord> {
    let entries = match body {
        Value::Object(entries) => entries,
        Value::Null => return HashMap::new(),
        other => {
            tracing::warn!(kind = ?other, "registry root is not an object");
            return HashMap::new();
        }
    };

    entries
        .into_iter()
        .filter_map(|(id, value)| match serde_json::from_value::<FaceRecord>(value) {
            Ok(record) => Some((id.clone(), record.with_id(id))),
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "skipping unreadable registry entry");
                None
            }
        })
        .collect()
}

/// In-process registry for local runs without the remote database.
#[derive(Default)]
pub struct MemoryRegistry {
    records: RwLock<HashMap<String, FaceRecord>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegistryStore for MemoryRegistry {
    async fn list(&self) -> Result<HashMap<String, FaceRecord>> {
        Ok(self.records.read().await.clone())
    }

    async fn put(&self, record: &FaceRecord) -> Result<()> {
        self.records
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(())
    }
}

#[cfg(test)]
pub mod failing {
    use super::*;

    /// Reads succeed with an empty registry; every write fails.
    pub struct ReadOnlyRegistry;

    #[async_trait]
    impl RegistryStore for ReadOnlyRegistry {
        async fn list(&self) -> Result<HashMap<String, FaceRecord>> {
            Ok(HashMap::new())
        }

        async fn put(&self, record: &FaceRecord) -> Result<()> {
            Err(anyhow!("registry write for {} returned status 401 Unauthorized", record.id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_registry_is_empty() {
        assert!(records_from_value(Value::Null).is_empty());
    }

    #[test]
    fn entries_carry_their_key_as_id() {
        let records = records_from_value(json!({
            "alice_30_abc": { "name": "Alice", "age": "30", "encoding": [0.1], "image_path": "images/a.jpg" },
            "broken": "not a record",
            "legacy": { "name": "Old", "age": 70 }
        }));

        assert_eq!(records.len(), 2);
        assert_eq!(records["alice_30_abc"].id, "alice_30_abc");
        assert_eq!(records["legacy"].age, "70");
        assert!(records["legacy"].embedding.is_empty());
    }

    #[test]
    fn urls_follow_the_root_path() {
        let registry = RealtimeDbRegistry::new(
            "https://example-rtdb.firebaseio.com/",
            "/registered_faces/",
            None,
            1000,
        )
        .unwrap();
        assert_eq!(
            registry.url(None),
            "https://example-rtdb.firebaseio.com/registered_faces.json"
        );
        assert_eq!(
            registry.url(Some("bob_41_x")),
            "https://example-rtdb.firebaseio.com/registered_faces/bob_41_x.json"
        );
    }

    #[actix_web::test]
    async fn memory_registry_last_write_wins() {
        let registry = MemoryRegistry::new();
        let first = FaceRecord {
            id: "dup".to_string(),
            name: "First".to_string(),
            age: "1".to_string(),
            embedding: vec![0.0],
            image_path: String::new(),
            created_at: None,
        };
        let second = FaceRecord {
            name: "Second".to_string(),
            ..first.clone()
        };

        registry.put(&first).await.unwrap();
        registry.put(&second).await.unwrap();

        let records = registry.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records["dup"].name, "Second");
    }
}
