//! Data-URL framing for encoded canvas snapshots.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::{Result, SketchpadError};

pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

pub fn encode_data_url(png: &[u8]) -> String {
    format!("{}{}", PNG_DATA_URL_PREFIX, STANDARD.encode(png))
}

/// Extract the payload bytes of a `data:<mime>;base64,<payload>` URL
pub fn decode_data_url(url: &str) -> Result<Vec<u8>> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| SketchpadError::InvalidSnapshot("Expected a data URL".into()))?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| SketchpadError::InvalidSnapshot("Data URL has no payload".into()))?;

    if !header.ends_with(";base64") {
        return Err(SketchpadError::InvalidSnapshot(format!(
            "Unsupported data URL encoding: {}",
            header
        )));
    }

    Ok(STANDARD.decode(payload.trim())?)
}
