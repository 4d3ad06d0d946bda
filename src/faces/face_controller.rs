use actix_multipart::form::MultipartForm;
use actix_web::{web, HttpResponse};
use serde_json::json;
use uuid::Uuid;

use crate::{
    faces::{
        dto::{
            face_requests::FaceUploadForm,
            face_responses::{MatchedFaceResponse, RegisteredFaceResponse},
        },
        face_error::FaceError,
        face_service::{CheckOutcome, FaceService},
    },
    models::api::ApiResponse,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(healthz).service(
        web::scope("/v1")
            .service(check_face)
            .service(check_face_by_path)
            .service(registration),
    );
}

fn invalid_body(e: actix_web::Error) -> FaceError {
    FaceError::Validation(e.to_string())
}

#[actix_web::get("/healthz")]
async fn healthz() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

#[actix_web::post("/check-face")]
#[tracing::instrument(name = "check-face-api", skip_all, fields(correlation_id = %Uuid::new_v4()))]
async fn check_face(
    face_service: web::Data<FaceService>,
    form: Result<MultipartForm<FaceUploadForm>, actix_web::Error>,
) -> Result<HttpResponse, FaceError> {
    let form = form.map_err(invalid_body)?.into_inner();
    let image = form.image_bytes()?;
    let registration_input = form.optional_registration()?;

    match face_service.check_or_register(image, registration_input).await? {
        CheckOutcome::Matched(hit) => {
            Ok(HttpResponse::Ok().json(ApiResponse::ok(MatchedFaceResponse::from(hit))))
        }
        CheckOutcome::Registered(record) => {
            Ok(HttpResponse::Created().json(ApiResponse::ok(RegisteredFaceResponse::from(record))))
        }
    }
}

#[actix_web::get("/check-face/{image_path:.*}")]
#[tracing::instrument(name = "check-face-path-api", skip(face_service), fields(correlation_id = %Uuid::new_v4()))]
async fn check_face_by_path(
    face_service: web::Data<FaceService>,
    image_path: web::Path<String>,
) -> Result<HttpResponse, FaceError> {
    let hit = face_service.check_local_image(&image_path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(MatchedFaceResponse::from(hit))))
}

#[actix_web::post("/registration")]
#[tracing::instrument(name = "registration-api", skip_all, fields(correlation_id = %Uuid::new_v4()))]
async fn registration(
    face_service: web::Data<FaceService>,
    form: Result<MultipartForm<FaceUploadForm>, actix_web::Error>,
) -> Result<HttpResponse, FaceError> {
    let form = form.map_err(invalid_body)?.into_inner();
    let input = form.required_registration()?;
    let image = form.image_bytes()?;

    let record = face_service.register(input, image).await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(RegisteredFaceResponse::from(record))))
}
