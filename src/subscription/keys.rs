//! Base64 conversions for push key material.
//!
//! The VAPID public key arrives URL-safe and unpadded; subscription keys go
//! to the settings API as standard padded base64.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{PushError, Result};

/// Decode a URL-safe base64 string into raw bytes.
///
/// Pads to a multiple of four characters, maps `-` to `+` and `_` to `/`,
/// then decodes as standard base64. Surrounding whitespace is ignored.
pub fn url_base64_to_bytes(input: &str) -> Result<Vec<u8>> {
    let trimmed = input.trim();
    let padding = (4 - trimmed.len() % 4) % 4;

    let mut standard = String::with_capacity(trimmed.len() + padding);
    for c in trimmed.chars() {
        standard.push(match c {
            '-' => '+',
            '_' => '/',
            other => other,
        });
    }
    standard.extend(std::iter::repeat_n('=', padding));

    STANDARD
        .decode(standard.as_bytes())
        .map_err(|e| PushError::invalid_payload(format!("invalid base64 key material: {}", e)))
}

/// Encode raw bytes as standard padded base64.
pub fn bytes_to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
