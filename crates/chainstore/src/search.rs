//! Bounded substring search over one kind's records.
//!
//! There is no persistent structure behind search: the record key space is
//! walked from the highest height down and each record's key is matched,
//! case-insensitively, against the term as hex and as text. The walk stops
//! once `limit` hits are collected, so results are most recent first and
//! identical for an unchanged store.

use crate::error::{Result, StoreError};
use crate::keys::{decode_height, normalize_parent_id, record_prefix, HEIGHT_LEN};
use crate::kind::EntityKind;
use crate::kv::KvReader;
use crate::record::{Record, StoredRecord};

/// Hard cap on hits returned by one search.
pub const MAX_SEARCH_LIMIT: usize = 64;

#[derive(Debug, Clone, Copy)]
pub struct PrefixSearchIndex {
    kind: EntityKind,
}

impl PrefixSearchIndex {
    pub fn new(kind: EntityKind) -> Self {
        Self { kind }
    }

    pub fn search(&self, reader: &KvReader<'_>, term: &str, limit: usize) -> Result<Vec<Record>> {
        let needle = normalize_term(term)?;
        let limit = limit.min(MAX_SEARCH_LIMIT);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let prefix = record_prefix(self.kind);
        let mut hits = Vec::new();
        for (key, value) in reader.scan_prefix(&prefix).rev() {
            let suffix = &key[prefix.len()..];
            if suffix.len() != HEIGHT_LEN {
                continue;
            }
            let height = decode_height(suffix)?;
            let record = match StoredRecord::decode(height, value) {
                Ok(record) => record,
                Err(error) => {
                    log::warn!("search skipped {} at height {height}: {error}", self.kind);
                    continue;
                }
            };
            if key_matches(&record.key, &needle) {
                hits.push(record);
                if hits.len() == limit {
                    break;
                }
            }
        }
        log::debug!(
            "search {} for {needle:?} returned {} hits",
            self.kind,
            hits.len()
        );
        Ok(hits)
    }
}

fn normalize_term(term: &str) -> Result<String> {
    let normalized = normalize_parent_id(term);
    if normalized.is_empty() {
        return Err(StoreError::EmptySearchTerm);
    }
    Ok(normalized)
}

fn key_matches(key: &[u8], needle: &str) -> bool {
    if hex::encode(key).contains(needle) {
        return true;
    }
    match std::str::from_utf8(key) {
        Ok(text) => text.to_lowercase().contains(needle),
        Err(_) => false,
    }
}
