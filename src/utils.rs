use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use uuid::Uuid;

use crate::faces::face_error::FaceError;

/// Format of an uploaded photo, sniffed from its bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageKind {
    pub format: ImageFormat,
}

impl ImageKind {
    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("img")
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }
}

/// Checks that `bytes` is a decodable image and reports its format.
pub fn inspect_image(bytes: &[u8]) -> Result<ImageKind, FaceError> {
    if bytes.is_empty() {
        return Err(FaceError::Validation("image is empty".to_string()));
    }
    let format = image::guess_format(bytes)
        .map_err(|e| FaceError::Validation(format!("unrecognized image: {}", e)))?;
    image::load_from_memory_with_format(bytes, format)
        .map_err(|e| FaceError::Validation(format!("image could not be decoded: {}", e)))?;
    Ok(ImageKind { format })
}

/// Decodes a base64 image, optionally prefixed with a `data:<mime>;base64,` header.
pub fn decode_base64_image(raw: &str) -> Result<Vec<u8>, FaceError> {
    let trimmed = raw.trim();
    let payload = match trimmed.strip_prefix("data:") {
        Some(rest) => match rest.split_once(";base64,") {
            Some((_, payload)) => payload,
            None => {
                return Err(FaceError::Validation(
                    "data URL must be base64 encoded".to_string(),
                ))
            }
        },
        None => trimmed,
    };
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(cleaned)
        .map_err(|e| FaceError::Validation(format!("invalid base64 image: {}", e)))
}

/// Lowercase ASCII alphanumerics; every other run of characters becomes a single `-`.
pub fn slug(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if out.is_empty() {
        out.push('x');
    }
    out
}

/// `<slug(name)>_<slug(age)>_<uuid>`; two registrations never share an id.
pub fn generate_face_id(name: &str, age: &str) -> String {
    format!("{}_{}_{}", slug(name), slug(age), Uuid::new_v4().simple())
}

#[cfg(test)]
pub mod fixtures {
    use image::{ImageBuffer, ImageFormat, Rgb};
    use std::io::Cursor;

    /// A small solid-colour PNG; different colours give different bytes.
    pub fn png(r: u8, g: u8, b: u8) -> Vec<u8> {
        let img = ImageBuffer::from_pixel(8, 8, Rgb([r, g, b]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }
}
