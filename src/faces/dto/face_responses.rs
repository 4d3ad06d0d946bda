use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{models::face_record::FaceRecord, services::matcher::FaceMatch};

#[derive(Debug, Serialize, Deserialize)]
pub struct MatchedFaceResponse {
    pub id: String,
    pub name: String,
    pub distance: f64,
    pub message: String,
}

impl From<FaceMatch> for MatchedFaceResponse {
    fn from(hit: FaceMatch) -> Self {
        Self {
            message: format!("Welcome! You are registered with ID: {}", hit.id),
            id: hit.id,
            name: hit.name,
            distance: hit.distance,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisteredFaceResponse {
    pub id: String,
    pub name: String,
    pub age: String,
    pub image_path: String,
    pub created_at: Option<DateTime<Utc>>,
    pub message: String,
}

impl From<FaceRecord> for RegisteredFaceResponse {
    fn from(record: FaceRecord) -> Self {
        Self {
            message: format!("Registration successful! Your unique ID is: {}", record.id),
            id: record.id,
            name: record.name,
            age: record.age,
            image_path: record.image_path,
            created_at: record.created_at,
        }
    }
}
