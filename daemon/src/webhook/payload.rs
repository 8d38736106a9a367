//! Request bodies accepted by the webhook.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{ImageError, ImageFormat, ImageReader};
use serde::Deserialize;
use std::io::Cursor;

use crate::playlist::MIN_TRANSITION_SECS;
use crate::webhook::RequestError;

fn min_transition() -> i64 {
    i64::try_from(MIN_TRANSITION_SECS).unwrap_or(i64::MAX)
}

/// One image for a given playlist slot.
#[derive(Debug, Deserialize)]
pub struct ScreenPayload {
    /// Base64 encoded image.
    pub image: String,
    pub index: usize,
    #[serde(default = "min_transition")]
    pub transition_time: i64,
}

/// One image of a whole playlist, slots are numbered by position.
#[derive(Debug, Deserialize)]
pub struct SlidePayload {
    pub image: String,
    #[serde(default = "min_transition")]
    pub transition_time: i64,
}

/// Decodes a base64 image and checks that it is something the viewer can show.
///
/// # Errors
/// Returns [`RequestError::Base64`] if `encoded` is not valid base64, and
/// [`RequestError::Image`] or [`RequestError::UnknownFormat`] if the bytes are not a PNG or JPEG
/// image.
pub fn decode_image(encoded: &str) -> Result<Vec<u8>, RequestError> {
    let bytes = STANDARD.decode(encoded.trim())?;
    let format = validate(&bytes)?;
    log::debug!("detected image format: {format:?}");
    Ok(bytes)
}

/// Reads just the image header, enough to know the format and size.
fn validate(bytes: &[u8]) -> Result<ImageFormat, RequestError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(ImageError::IoError)?;
    let format = reader.format().ok_or(RequestError::UnknownFormat)?;
    reader.into_dimensions()?;
    Ok(format)
}
