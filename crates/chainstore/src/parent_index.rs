//! Secondary index from a parent id to the global heights of its children.

use std::collections::BTreeMap;

use crate::error::{Result, StoreError};
use crate::keys::{
    decode_height, encode_height, normalize_parent_id, parent_counter_key,
    parent_counter_prefix, parent_entry_key,
};
use crate::kind::EntityKind;
use crate::kv::{KvRead, KvReader, WriteBatch};

#[derive(Debug, Clone, Copy)]
pub struct ParentSecondaryIndex {
    kind: EntityKind,
}

impl ParentSecondaryIndex {
    pub fn new(kind: EntityKind) -> Self {
        Self { kind }
    }

    /// Stages the next local position under `parent` together with the
    /// counter bump, so both land in the same batch.
    ///
    /// Returns the 0-based local position assigned.
    pub fn associate<R: KvRead>(
        &self,
        batch: &mut WriteBatch,
        base: &R,
        parent: &str,
        global_height: u64,
    ) -> Result<u64> {
        let parent = checked_parent(parent)?;
        let local = self.count_normalized(&batch.staged(base), &parent)?;
        batch.put(
            parent_entry_key(self.kind, &parent, local),
            encode_height(global_height).to_vec(),
        );
        batch.put(
            parent_counter_key(self.kind, &parent),
            encode_height(local + 1).to_vec(),
        );
        Ok(local)
    }

    /// Number of children under `parent`; 0 when the parent was never seen.
    pub fn count_for<R: KvRead>(&self, reader: &R, parent: &str) -> Result<u64> {
        self.count_normalized(reader, &normalize_parent_id(parent))
    }

    /// Global heights of children at local positions `[from, from + count)`,
    /// clamped to the children that exist.
    pub fn list_for<R: KvRead>(
        &self,
        reader: &R,
        parent: &str,
        from: u64,
        count: u64,
    ) -> Result<Vec<u64>> {
        let parent = normalize_parent_id(parent);
        let total = self.count_normalized(reader, &parent)?;
        let start = from.min(total);
        let end = from.saturating_add(count).min(total);

        let mut heights = Vec::with_capacity((end - start) as usize);
        for local in start..end {
            let key = parent_entry_key(self.kind, &parent, local);
            match reader.get(&key).map(decode_height) {
                Some(Ok(height)) => heights.push(height),
                Some(Err(error)) => {
                    log::warn!(
                        "skipping {} entry {local} under {parent}: {error}",
                        self.kind
                    );
                }
                None => {
                    log::warn!(
                        "missing {} entry {local} under {parent} (count {total})",
                        self.kind
                    );
                }
            }
        }
        Ok(heights)
    }

    /// Every parent with at least one child, with its child count.
    pub fn count_map(&self, reader: &KvReader<'_>) -> Result<BTreeMap<String, u64>> {
        let prefix = parent_counter_prefix(self.kind);
        let mut counts = BTreeMap::new();
        for (key, value) in reader.scan_prefix(&prefix) {
            let parent = std::str::from_utf8(&key[prefix.len()..]).map_err(|error| {
                StoreError::Decode(format!("{} parent id is not utf-8: {error}", self.kind))
            })?;
            counts.insert(parent.to_string(), decode_height(value)?);
        }
        Ok(counts)
    }

    fn count_normalized<R: KvRead>(&self, reader: &R, parent: &str) -> Result<u64> {
        match reader.get(&parent_counter_key(self.kind, parent)) {
            Some(raw) => decode_height(raw),
            None => Ok(0),
        }
    }
}

fn checked_parent(parent: &str) -> Result<String> {
    let normalized = normalize_parent_id(parent);
    if normalized.is_empty() {
        return Err(StoreError::Write("parent id is empty".to_string()));
    }
    Ok(normalized)
}
