//! Key layout for the ordered store.
//!
//! Heights are encoded big-endian so that byte order equals numeric order
//! and range scans over a prefix walk records by ascending height.
//!
//! | key                                         | value           |
//! |---------------------------------------------|-----------------|
//! | `r/<kind>/` + height                        | stored record   |
//! | `i/<kind>/` + natural key                   | height          |
//! | `p/<kind>/<parent>/` + local height         | global height   |
//! | `c/<kind>/<parent>`                         | parent count    |
//! | `n/<kind>`                                  | kind count      |

use std::ops::Bound;

use crate::error::{Result, StoreError};
use crate::kind::EntityKind;

pub const HEIGHT_LEN: usize = 8;

pub fn encode_height(height: u64) -> [u8; HEIGHT_LEN] {
    height.to_be_bytes()
}

pub fn decode_height(bytes: &[u8]) -> Result<u64> {
    let raw: [u8; HEIGHT_LEN] = bytes.try_into().map_err(|_| {
        StoreError::Decode(format!(
            "height must be {HEIGHT_LEN} bytes, got {}",
            bytes.len()
        ))
    })?;
    Ok(u64::from_be_bytes(raw))
}

fn prefixed(tag: &str, kind: EntityKind, extra: usize) -> Vec<u8> {
    let mut key = Vec::with_capacity(tag.len() + kind.as_str().len() + 2 + extra);
    key.extend_from_slice(tag.as_bytes());
    key.push(b'/');
    key.extend_from_slice(kind.as_str().as_bytes());
    key.push(b'/');
    key
}

pub fn record_prefix(kind: EntityKind) -> Vec<u8> {
    prefixed("r", kind, 0)
}

pub fn record_key(kind: EntityKind, height: u64) -> Vec<u8> {
    let mut key = prefixed("r", kind, HEIGHT_LEN);
    key.extend_from_slice(&encode_height(height));
    key
}

pub fn id_key(kind: EntityKind, natural_key: &[u8]) -> Vec<u8> {
    let mut key = prefixed("i", kind, natural_key.len());
    key.extend_from_slice(natural_key);
    key
}

pub fn parent_entry_key(kind: EntityKind, parent: &str, local_height: u64) -> Vec<u8> {
    let mut key = prefixed("p", kind, parent.len() + 1 + HEIGHT_LEN);
    key.extend_from_slice(parent.as_bytes());
    key.push(b'/');
    key.extend_from_slice(&encode_height(local_height));
    key
}

pub fn parent_counter_prefix(kind: EntityKind) -> Vec<u8> {
    prefixed("c", kind, 0)
}

pub fn parent_counter_key(kind: EntityKind, parent: &str) -> Vec<u8> {
    let mut key = prefixed("c", kind, parent.len());
    key.extend_from_slice(parent.as_bytes());
    key
}

pub fn kind_counter_key(kind: EntityKind) -> Vec<u8> {
    let mut key = b"n/".to_vec();
    key.extend_from_slice(kind.as_str().as_bytes());
    key
}

/// Bounds covering every key that starts with `prefix`.
pub fn prefix_bounds(prefix: &[u8]) -> (Bound<Vec<u8>>, Bound<Vec<u8>>) {
    let start = Bound::Included(prefix.to_vec());
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return (start, Bound::Excluded(end));
        }
    }
    (start, Bound::Unbounded)
}

/// Canonical form of a parent id: trimmed, without `0x`, lowercase.
pub fn normalize_parent_id(raw: &str) -> String {
    let trimmed = raw.trim();
    let stripped = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    stripped.to_ascii_lowercase()
}

/// Bytes of a natural key given as text: hex when it decodes as hex,
/// otherwise the raw text bytes.
pub fn natural_key_bytes(raw: &str) -> Vec<u8> {
    let normalized = normalize_parent_id(raw);
    match hex::decode(&normalized) {
        Ok(bytes) if !bytes.is_empty() => bytes,
        _ => raw.trim().as_bytes().to_vec(),
    }
}
