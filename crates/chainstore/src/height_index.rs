//! Primary `height -> record` index for one kind.

use crate::error::{Result, StoreError};
use crate::keys::{decode_height, encode_height, kind_counter_key, record_key};
use crate::kind::EntityKind;
use crate::kv::{KvRead, WriteBatch};
use crate::record::{Record, StoredRecord};

#[derive(Debug, Clone, Copy)]
pub struct HeightIndex {
    kind: EntityKind,
}

impl HeightIndex {
    pub fn new(kind: EntityKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Current max height, which is also the record count.
    pub fn count<R: KvRead>(&self, reader: &R) -> Result<u64> {
        match reader.get(&kind_counter_key(self.kind)) {
            Some(raw) => decode_height(raw),
            None => Ok(0),
        }
    }

    /// Stages a record at `height`. Heights must be contiguous from 1.
    pub fn put<R: KvRead>(
        &self,
        batch: &mut WriteBatch,
        base: &R,
        height: u64,
        key: &[u8],
        payload: &[u8],
    ) -> Result<()> {
        let current = self.count(&batch.staged(base))?;
        if height != current + 1 {
            return Err(StoreError::Write(format!(
                "{} height {height} out of sequence, expected {}",
                self.kind,
                current + 1
            )));
        }
        let stored = StoredRecord {
            key: key.to_vec(),
            payload: payload.to_vec(),
        };
        batch.put(record_key(self.kind, height), stored.encode()?);
        batch.put(kind_counter_key(self.kind), encode_height(height).to_vec());
        Ok(())
    }

    pub fn get<R: KvRead>(&self, reader: &R, height: u64) -> Result<Record> {
        let raw = reader
            .get(&record_key(self.kind, height))
            .ok_or_else(|| StoreError::NotFound(format!("{} at height {height}", self.kind)))?;
        StoredRecord::decode(height, raw)
    }

    /// Records with heights in `[from_height, from_height + count)`, ascending.
    ///
    /// Stops at the current max height. Each element decodes independently so
    /// one corrupt record does not hide its neighbours.
    pub fn list_range<R: KvRead>(
        &self,
        reader: &R,
        from_height: u64,
        count: u64,
    ) -> Result<Vec<Result<Record>>> {
        let max = self.count(reader)?;
        let start = from_height.max(1);
        if count == 0 || start > max {
            return Ok(Vec::new());
        }
        let end = from_height.saturating_add(count).min(max + 1);
        Ok((start..end).map(|height| self.get(reader, height)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::KvStore;

    fn seeded(kind: EntityKind, count: u64) -> KvStore {
        let store = KvStore::new();
        let index = HeightIndex::new(kind);
        let mut batch = WriteBatch::new();
        let empty = KvStore::new();
        let base = empty.read();
        for height in 1..=count {
            let key = format!("key-{height}");
            index
                .put(&mut batch, &base, height, key.as_bytes(), b"payload")
                .expect("put");
        }
        drop(base);
        store.apply(batch);
        store
    }

    fn heights(results: Vec<Result<Record>>) -> Vec<u64> {
        results
            .into_iter()
            .map(|record| record.expect("record").height)
            .collect()
    }

    #[test]
    fn put_rejects_out_of_sequence_heights() {
        let store = seeded(EntityKind::Block, 3);
        let index = HeightIndex::new(EntityKind::Block);
        let mut batch = WriteBatch::new();
        let reader = store.read();
        let err = index
            .put(&mut batch, &reader, 5, b"k", b"p")
            .expect_err("gap");
        assert!(matches!(err, StoreError::Write(_)));
        let err = index
            .put(&mut batch, &reader, 3, b"k", b"p")
            .expect_err("reuse");
        assert!(matches!(err, StoreError::Write(_)));
        index.put(&mut batch, &reader, 4, b"k", b"p").expect("next");
    }

    #[test]
    fn get_returns_not_found_past_max() {
        let store = seeded(EntityKind::Entity, 2);
        let index = HeightIndex::new(EntityKind::Entity);
        let reader = store.read();
        assert_eq!(index.get(&reader, 2).expect("record").key, b"key-2".to_vec());
        assert!(index.get(&reader, 3).expect_err("missing").is_not_found());
    }

    #[test]
    fn list_range_intersects_with_stored_heights() {
        let store = seeded(EntityKind::Block, 25);
        let index = HeightIndex::new(EntityKind::Block);
        let reader = store.read();

        assert_eq!(heights(index.list_range(&reader, 1, 5).unwrap()), vec![1, 2, 3, 4, 5]);
        assert_eq!(heights(index.list_range(&reader, 22, 10).unwrap()), vec![22, 23, 24, 25]);
        assert_eq!(heights(index.list_range(&reader, 0, 3).unwrap()), vec![1, 2]);
        assert!(index.list_range(&reader, 26, 10).unwrap().is_empty());
        assert!(index.list_range(&reader, 5, 0).unwrap().is_empty());
    }

    #[test]
    fn kinds_do_not_share_heights() {
        let store = seeded(EntityKind::Block, 4);
        let reader = store.read();
        assert_eq!(HeightIndex::new(EntityKind::Block).count(&reader).unwrap(), 4);
        assert_eq!(HeightIndex::new(EntityKind::Process).count(&reader).unwrap(), 0);
    }

    #[test]
    fn corrupt_record_fails_only_its_slot() {
        let store = seeded(EntityKind::Block, 3);
        let mut batch = WriteBatch::new();
        batch.put(record_key(EntityKind::Block, 2), vec![0xff, 0xff, 0xff]);
        store.apply(batch);

        let reader = store.read();
        let results = HeightIndex::new(EntityKind::Block)
            .list_range(&reader, 1, 3)
            .unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(StoreError::Decode(_))));
        assert!(results[2].is_ok());
    }
}
