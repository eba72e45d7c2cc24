//! Draw something, describe it, let the others guess the description.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::SubmissionError;
use crate::types::Payload;

const DATA_URL_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// Normalize text for guess comparison (trim whitespace, lowercase)
fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

pub fn build(image: String, description: String) -> Result<Payload, SubmissionError> {
    validate_image(&image)?;
    let description = description.trim().to_string();
    if description.is_empty() {
        return Err(SubmissionError::MissingDescription);
    }
    Ok(Payload::Drawing { image, description })
}

/// Image data is opaque, but a base64 data URL must carry at least one byte
pub fn validate_image(image: &str) -> Result<(), SubmissionError> {
    let image = image.trim();
    if image.is_empty() {
        return Err(SubmissionError::MissingImage);
    }

    if let Some(rest) = image.strip_prefix(DATA_URL_PREFIX) {
        if let Some((_, body)) = rest.split_once(BASE64_MARKER) {
            let bytes = STANDARD
                .decode(body)
                .map_err(|_| SubmissionError::InvalidImageData)?;
            if bytes.is_empty() {
                return Err(SubmissionError::MissingImage);
            }
        } else if rest.split_once(',').is_none_or(|(_, body)| body.is_empty()) {
            return Err(SubmissionError::MissingImage);
        }
    }
    Ok(())
}

pub fn is_complete(image: &str, description: &str) -> bool {
    validate_image(image).is_ok() && !description.trim().is_empty()
}

/// Case-insensitive exact match against the owner's description
pub fn is_correct(description: &str, guess: &str) -> bool {
    normalize(description) == normalize(guess)
}
