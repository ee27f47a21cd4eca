//! Transport-encoding handling for rendered bodies.
//!
//! Only `gzip` is decoded. Bodies in any other encoding are passed through
//! untouched together with their `content-encoding` header.

use axum::http::{header, HeaderMap};
use flate2::read::GzDecoder;
use std::io::Read;

use crate::error::FetchError;

/// True if the response declares `content-encoding: gzip`.
pub fn is_gzip(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim() == "gzip")
        .unwrap_or(false)
}

/// Inflate a complete gzip body.
pub fn gunzip(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::with_capacity(bytes.len() * 4);
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Turn a fully received body into text.
///
/// A gzip body is inflated and `content-encoding` / `content-length` are
/// removed from `headers`, since both describe the encoded bytes.
pub fn decode_body(headers: &mut HeaderMap, bytes: &[u8]) -> Result<String, FetchError> {
    if !is_gzip(headers) {
        return Ok(String::from_utf8_lossy(bytes).into_owned());
    }

    let decoded = gunzip(bytes).map_err(|source| FetchError::Decode {
        encoding: "gzip",
        source,
    })?;
    headers.remove(header::CONTENT_ENCODING);
    headers.remove(header::CONTENT_LENGTH);
    Ok(String::from_utf8_lossy(&decoded).into_owned())
}
