//! Natural key (hash, nullifier, address) to height lookup.

use crate::error::{Result, StoreError};
use crate::keys::{decode_height, encode_height, id_key};
use crate::kind::EntityKind;
use crate::kv::{KvRead, WriteBatch};

#[derive(Debug, Clone, Copy)]
pub struct IdIndex {
    kind: EntityKind,
}

impl IdIndex {
    pub fn new(kind: EntityKind) -> Self {
        Self { kind }
    }

    pub fn insert<R: KvRead>(
        &self,
        batch: &mut WriteBatch,
        base: &R,
        key: &[u8],
        height: u64,
    ) -> Result<()> {
        if key.is_empty() {
            return Err(StoreError::Write(format!("{} key is empty", self.kind)));
        }
        let lookup = id_key(self.kind, key);
        if let Some(existing) = batch.staged(base).get(&lookup) {
            return Err(StoreError::Write(format!(
                "{} key {} already indexed at height {}",
                self.kind,
                hex::encode(key),
                decode_height(existing)?
            )));
        }
        batch.put(lookup, encode_height(height).to_vec());
        Ok(())
    }

    pub fn height_of<R: KvRead>(&self, reader: &R, key: &[u8]) -> Result<u64> {
        let raw = reader.get(&id_key(self.kind, key)).ok_or_else(|| {
            StoreError::NotFound(format!("{} with key {}", self.kind, hex::encode(key)))
        })?;
        decode_height(raw)
    }
}
