use actix_web::{http::StatusCode, HttpResponse, ResponseError};

use crate::models::api::ApiResponse;

#[derive(Debug, thiserror::Error)]
pub enum FaceError {
    #[error("INVALID_REQUEST_BODY: {0}")]
    Validation(String),
    #[error("NO_FACE_DETECTED")]
    NoFaceDetected,
    #[error("NOT_REGISTERED: name and age are required to register this face")]
    NotRegistered,
    #[error("face extractor failed: {0:#}")]
    Extractor(anyhow::Error),
    #[error("registry failed: {0:#}")]
    Registry(anyhow::Error),
    #[error("blob storage failed: {0:#}")]
    Blob(anyhow::Error),
    #[error("local storage failed: {0}")]
    Storage(#[from] std::io::Error),
}

impl FaceError {
    pub fn code(&self) -> &'static str {
        match self {
            FaceError::Validation(_) => "1003",
            FaceError::NoFaceDetected => "1004",
            FaceError::NotRegistered => "1005",
            _ => "1000",
        }
    }

    pub fn is_internal(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl ResponseError for FaceError {
    fn status_code(&self) -> StatusCode {
        match self {
            FaceError::Validation(_) | FaceError::NoFaceDetected => StatusCode::BAD_REQUEST,
            FaceError::NotRegistered => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Internal details stay in the log.
        let cause = if self.is_internal() {
            tracing::error!(error = %self, "request failed");
            "SYSTEM_ERROR".to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(self.status_code()).json(ApiResponse::<()>::failure(self.code(), cause))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use anyhow::anyhow;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(FaceError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(FaceError::NoFaceDetected.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(FaceError::NotRegistered.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            FaceError::Registry(anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_web::test]
    async fn internal_errors_do_not_leak_details() {
        let response = FaceError::Blob(anyhow!("AccessDenied for key s3cr3t")).error_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body()).await.unwrap();
        let text = std::str::from_utf8(&body).unwrap();
        assert!(text.contains("SYSTEM_ERROR"));
        assert!(!text.contains("s3cr3t"));
    }

    #[actix_web::test]
    async fn validation_errors_describe_the_problem() {
        let response = FaceError::Validation("image is required".into()).error_response();
        let body = to_bytes(response.into_body()).await.unwrap();
        let parsed: ApiResponse<()> = serde_json::from_slice(&body).unwrap();

        assert!(!parsed.success);
        let errors = parsed.errors.unwrap();
        assert_eq!(errors[0].code, "1003");
        assert_eq!(errors[0].cause, "INVALID_REQUEST_BODY: image is required");
    }
}
