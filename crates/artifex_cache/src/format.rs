//! Framing for the binary dependency cache.
//!
//! Layout: a 4-byte little-endian header length, a bincode [`BlobHeader`],
//! then the bincode payload. The header carries magic bytes, the format
//! version, the artifex version that wrote it, and a payload checksum.

use artifex_common::ContentHash;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::ARTIFEX_VERSION;

/// Magic bytes identifying an artifex dependency cache.
const BLOB_MAGIC: [u8; 4] = *b"AFXD";

/// Increment on breaking changes to the header or payload layout.
const BLOB_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BlobHeader {
    magic: [u8; 4],
    format_version: u32,
    artifex_version: String,
    checksum: ContentHash,
}

/// Serializes `value` into a framed blob.
pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CacheError> {
    let payload = bincode::serde::encode_to_vec(value, bincode::config::standard()).map_err(
        |e| CacheError::Serialization {
            reason: e.to_string(),
        },
    )?;

    let header = BlobHeader {
        magic: BLOB_MAGIC,
        format_version: BLOB_FORMAT_VERSION,
        artifex_version: ARTIFEX_VERSION.to_string(),
        checksum: ContentHash::from_bytes(&payload),
    };
    let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
        .map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;

    let header_len = header_bytes.len() as u32;
    let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
    output.extend_from_slice(&header_len.to_le_bytes());
    output.extend_from_slice(&header_bytes);
    output.extend_from_slice(&payload);
    Ok(output)
}

/// Decodes a framed blob, returning `None` on any validation failure.
pub(crate) fn decode<T: DeserializeOwned>(raw: &[u8]) -> Option<T> {
    if raw.len() < 4 {
        return None;
    }
    let header_len = u32::from_le_bytes(raw[..4].try_into().ok()?) as usize;
    if raw.len() < 4 + header_len {
        return None;
    }

    let header: BlobHeader =
        bincode::serde::decode_from_slice(&raw[4..4 + header_len], bincode::config::standard())
            .ok()?
            .0;
    if header.magic != BLOB_MAGIC
        || header.format_version != BLOB_FORMAT_VERSION
        || header.artifex_version != ARTIFEX_VERSION
    {
        return None;
    }

    let payload = &raw[4 + header_len..];
    if ContentHash::from_bytes(payload) != header.checksum {
        return None;
    }

    bincode::serde::decode_from_slice(payload, bincode::config::standard())
        .ok()
        .map(|(value, _)| value)
}
