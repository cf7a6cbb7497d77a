//! Compact, URL-safe encoding for source text in shareable locators.
//!
//! Raw DEFLATE, then base64 with the URL-safe alphabet and no padding.

use std::io::{Read, Write};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::error::ConfigError;

/// Upper bound on decompressed text.
const MAX_DECOMPRESSED_BYTES: u64 = 8 * 1024 * 1024;

pub fn compress(text: &str) -> Result<String, ConfigError> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(text.as_bytes())?;
    let bytes = encoder.finish()?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

pub fn decompress(token: &str) -> Result<String, ConfigError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token.trim())
        .map_err(|e| ConfigError::Compression(format!("invalid token: {e}")))?;

    let mut text = String::new();
    DeflateDecoder::new(bytes.as_slice())
        .take(MAX_DECOMPRESSED_BYTES + 1)
        .read_to_string(&mut text)
        .map_err(|e| ConfigError::Compression(format!("corrupt stream: {e}")))?;

    if text.len() as u64 > MAX_DECOMPRESSED_BYTES {
        return Err(ConfigError::Compression(format!(
            "decompressed text exceeds {MAX_DECOMPRESSED_BYTES} bytes"
        )));
    }
    Ok(text)
}
