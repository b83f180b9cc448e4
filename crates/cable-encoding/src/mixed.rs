//! Wire layout of the `mixed` encoding:
//!
//! ```text
//! ┌────────────────┬──────────────┬───────────────────┬──────────────┐
//! │ header_len (4B)│ body_len (4B)│ header (JSON text) │ body (opaque)│
//! └────────────────┴──────────────┴───────────────────┴──────────────┘
//! ```
//! Both lengths are little-endian u32.

use bytes::{BufMut, Bytes, BytesMut};
use serde_json::{Map, Value};

use crate::error::{DecodeError, EncodeError};
use crate::payload::Mixed;

/// Size of the two length prefixes.
pub const MIXED_PREFIX_SIZE: usize = 8;

pub(crate) fn encode(mixed: &Mixed) -> Result<Bytes, EncodeError> {
    // A missing header goes out as an empty object.
    let header = match &mixed.header {
        Value::Null => serde_json::to_vec(&Value::Object(Map::new()))?,
        value => serde_json::to_vec(value)?,
    };
    let header_len = section_len("header", header.len())?;
    let body_len = section_len("body", mixed.body.len())?;

    let mut out = BytesMut::with_capacity(MIXED_PREFIX_SIZE + header.len() + mixed.body.len());
    out.put_u32_le(header_len);
    out.put_u32_le(body_len);
    out.put_slice(&header);
    out.put_slice(&mixed.body);
    Ok(out.freeze())
}

pub(crate) fn decode(payload: Bytes) -> Result<Mixed, DecodeError> {
    if payload.len() < MIXED_PREFIX_SIZE {
        return Err(DecodeError::Truncated {
            needed: MIXED_PREFIX_SIZE,
            available: payload.len(),
        });
    }

    let header_len = read_u32_le(&payload[0..4]) as usize;
    let body_len = read_u32_le(&payload[4..8]) as usize;
    let header_end = MIXED_PREFIX_SIZE.saturating_add(header_len);
    let body_end = header_end.saturating_add(body_len);
    if payload.len() < body_end {
        return Err(DecodeError::Truncated {
            needed: body_end,
            available: payload.len(),
        });
    }

    let header =
        serde_json::from_slice(&payload[MIXED_PREFIX_SIZE..header_end]).map_err(DecodeError::Header)?;
    // Bytes beyond body_len are ignored.
    let body = payload.slice(header_end..body_end);
    Ok(Mixed { header, body })
}

fn section_len(section: &'static str, size: usize) -> Result<u32, EncodeError> {
    u32::try_from(size).map_err(|_| EncodeError::SectionTooLarge { section, size })
}

fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
