use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::info;

use crate::error::GenerationError;
use crate::request::GeneratedImage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Decode a `data:<mime>;base64,<payload>` URI.
pub fn decode_data_uri(uri: &str) -> Result<DecodedImage, GenerationError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| GenerationError::InvalidDataUri("missing data: scheme".to_string()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| GenerationError::InvalidDataUri("missing payload".to_string()))?;
    let mime_type = meta
        .strip_suffix(";base64")
        .ok_or_else(|| GenerationError::InvalidDataUri("only base64 payloads are supported".to_string()))?;

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| GenerationError::InvalidDataUri(e.to_string()))?;

    Ok(DecodedImage {
        mime_type: if mime_type.is_empty() { "image/png" } else { mime_type }.to_string(),
        bytes,
    })
}

/// Write the image's exact bytes to `dir/<file_name>`.
pub fn save_image(image: &GeneratedImage, dir: &Path) -> Result<PathBuf> {
    let decoded = decode_data_uri(&image.data_uri)?;

    fs::create_dir_all(dir)
        .with_context(|| format!("Could not create output directory {}", dir.display()))?;

    let path = dir.join(image.file_name());
    fs::write(&path, &decoded.bytes)
        .with_context(|| format!("Could not write {}", path.display()))?;

    info!(path = %path.display(), mime = %decoded.mime_type, bytes = decoded.bytes.len(), "saved avatar");
    Ok(path)
}
