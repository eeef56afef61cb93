//! Binary ⇄ text encodings for persisted fields and recovery keys

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;

use nv_core::{NvError, NvResult};

/// Standard padded base64, used for every stored binary field.
pub fn bytes_to_b64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

pub fn b64_to_bytes(s: &str) -> NvResult<Vec<u8>> {
    STANDARD
        .decode(s)
        .map_err(|e| NvError::Serialization(format!("base64 decode: {e}")))
}

/// Unpadded base64url, used for human-shareable tokens.
pub fn bytes_to_b64url(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// Accepts both padded and unpadded base64url input.
pub fn b64url_to_bytes(s: &str) -> NvResult<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(s.trim_end_matches('='))
        .map_err(|e| NvError::Serialization(format!("base64url decode: {e}")))
}
