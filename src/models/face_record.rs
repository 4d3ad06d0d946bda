use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub type Embedding = Vec<f64>;

/// A registered identity as stored under `/<root>/<id>` in the realtime database.
///
/// The id is the database key and is not part of the stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceRecord {
    #[serde(skip)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub age: String,
    #[serde(rename = "encoding", default)]
    pub embedding: Embedding,
    #[serde(default)]
    pub image_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl FaceRecord {
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// Older registrations stored `age` as a number.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Age {
        Text(String),
        Number(serde_json::Number),
        Missing(()),
    }

    Ok(match Age::deserialize(deserializer)? {
        Age::Text(s) => s,
        Age::Number(n) => n.to_string(),
        Age::Missing(()) => String::new(),
    })
}

/// Write-only snapshot of a registration's embedding, kept for audit.
#[derive(Debug, Serialize, Deserialize)]
pub struct ArchivedEmbedding {
    pub id: String,
    pub embedding: Embedding,
    pub created_at: DateTime<Utc>,
}
