//! Base64 encoding of images for request payloads

use crate::error::{ClientError, ClientResult};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::Path;

/// An image given either as raw bytes or as text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    Bytes(Vec<u8>),
    /// A path to an image file, or an already base64-encoded image
    Text(String),
}

impl From<Vec<u8>> for ImageInput {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for ImageInput {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<String> for ImageInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ImageInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Encode an image as standard base64
///
/// Text naming an existing file is read and encoded; any other text is
/// assumed to be base64 already and returned unchanged.
pub async fn encode_image(image: impl Into<ImageInput>) -> ClientResult<String> {
    match image.into() {
        ImageInput::Bytes(bytes) => Ok(STANDARD.encode(bytes)),
        ImageInput::Text(text) => {
            let path = Path::new(&text);
            let is_file = tokio::fs::metadata(path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false);

            if !is_file {
                return Ok(text);
            }

            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| ClientError::io(path, e))?;
            Ok(STANDARD.encode(bytes))
        }
    }
}
