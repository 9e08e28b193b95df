// Stream record payload decoding
//
// Producers may gzip their JSON before putting it on the stream; the gzip
// magic number decides whether we inflate first.

use base64::Engine;
use flate2::read::GzDecoder;
use serde_json::Value;
use std::borrow::Cow;
use std::io::Read;

use crate::error::{ProcessError, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Decode raw record bytes (already base64-decoded) into a JSON value
pub fn decode_payload(bytes: &[u8]) -> Result<Value> {
    let body = inflate_if_gzipped(bytes)?;
    let value = serde_json::from_slice(&body)?;
    Ok(value)
}

/// Decode a base64 record body as delivered by the stream API
pub fn decode_base64_payload(encoded: &str) -> Result<Value> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(encoded.trim().as_bytes())?;
    decode_payload(&bytes)
}

fn inflate_if_gzipped(bytes: &[u8]) -> Result<Cow<'_, [u8]>> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(Cow::Borrowed(bytes));
    }

    let mut inflated = Vec::with_capacity(bytes.len() * 4);
    GzDecoder::new(bytes)
        .read_to_end(&mut inflated)
        .map_err(ProcessError::Gzip)?;
    Ok(Cow::Owned(inflated))
}
