pub mod api;
pub mod face_record;
