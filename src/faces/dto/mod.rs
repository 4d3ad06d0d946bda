pub mod face_requests;
pub mod face_responses;
