pub mod dto;
pub mod face_controller;
pub mod face_error;
pub mod face_service;
