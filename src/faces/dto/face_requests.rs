use actix_multipart::form::{bytes::Bytes, text::Text, MultipartForm};
use validator::Validate;

use crate::{faces::face_error::FaceError, utils::decode_base64_image};

/// Multipart body shared by `/check-face` and `/registration`.
#[derive(Debug, MultipartForm)]
pub struct FaceUploadForm {
    pub image: Option<Bytes>,
    pub image_base64: Option<Text<String>>,
    pub name: Option<Text<String>>,
    pub age: Option<Text<String>>,
}

#[derive(Debug, Clone, PartialEq, Validate)]
pub struct RegistrationInput {
    #[validate(length(min = 1, max = 128, message = "name must be 1 to 128 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 32, message = "age must be 1 to 32 characters"))]
    pub age: String,
}

impl RegistrationInput {
    pub fn new(name: &str, age: &str) -> Result<Self, FaceError> {
        let input = Self {
            name: name.trim().to_string(),
            age: age.trim().to_string(),
        };
        input.validate().map_err(|e| {
            let mut messages = e
                .field_errors()
                .values()
                .flat_map(|errors| errors.iter())
                .filter_map(|error| error.message.as_ref().map(|m| m.to_string()))
                .collect::<Vec<String>>();
            messages.sort();
            FaceError::Validation(messages.join(", "))
        })?;
        Ok(input)
    }
}

impl FaceUploadForm {
    /// Exactly one of `image` or `image_base64` must be present.
    pub fn image_bytes(&self) -> Result<Vec<u8>, FaceError> {
        let file = self.image.as_ref().filter(|f| !f.data.is_empty());
        let encoded = self
            .image_base64
            .as_ref()
            .map(|t| t.0.trim())
            .filter(|s| !s.is_empty());

        match (file, encoded) {
            (Some(file), None) => Ok(file.data.to_vec()),
            (None, Some(encoded)) => decode_base64_image(encoded),
            (Some(_), Some(_)) => Err(FaceError::Validation(
                "send either image or image_base64, not both".to_string(),
            )),
            (None, None) => Err(FaceError::Validation("image is required".to_string())),
        }
    }

    /// `None` when neither field was sent; both are required otherwise.
    pub fn optional_registration(&self) -> Result<Option<RegistrationInput>, FaceError> {
        let name = text_field(&self.name);
        let age = text_field(&self.age);
        match (name, age) {
            (None, None) => Ok(None),
            (Some(name), Some(age)) => RegistrationInput::new(name, age).map(Some),
            _ => Err(FaceError::Validation(
                "name and age must be provided together".to_string(),
            )),
        }
    }

    pub fn required_registration(&self) -> Result<RegistrationInput, FaceError> {
        RegistrationInput::new(
            text_field(&self.name).unwrap_or_default(),
            text_field(&self.age).unwrap_or_default(),
        )
    }
}

fn text_field(field: &Option<Text<String>>) -> Option<&str> {
    field.as_ref().map(|t| t.0.trim()).filter(|s| !s.is_empty())
}
