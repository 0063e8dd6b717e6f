//! The chain store: shared read views plus a single batched writer.

use std::path::{Path, PathBuf};

use parking_lot::{Mutex, MutexGuard};

use crate::error::{Result, StoreError};
use crate::height_index::HeightIndex;
use crate::kind::EntityKind;
use crate::kv::{KvReader, KvStore, WriteBatch};
use crate::lookup::IdIndex;
use crate::parent_index::ParentSecondaryIndex;
use crate::persistence::{read_snapshot, snapshot_path, write_snapshot};

pub struct ChainStore {
    kv: KvStore,
    chain_id: String,
    snapshot: Option<PathBuf>,
    writer: Mutex<()>,
}

impl ChainStore {
    /// Store with no backing file.
    pub fn in_memory(chain_id: impl Into<String>) -> Self {
        Self {
            kv: KvStore::new(),
            chain_id: chain_id.into(),
            snapshot: None,
            writer: Mutex::new(()),
        }
    }

    /// Opens the store for `chain_id` under `data_dir`, loading the last
    /// snapshot when one is usable.
    pub fn open(data_dir: &Path, chain_id: &str) -> Result<Self> {
        let chain_id = chain_id.trim();
        if chain_id.is_empty() {
            return Err(StoreError::InvalidInput("chain id is empty".to_string()));
        }
        let path = snapshot_path(data_dir, chain_id);
        let kv = match read_snapshot(&path, chain_id) {
            Some(entries) => KvStore::from_entries(entries),
            None => {
                log::info!("starting empty store for {chain_id} at {}", path.display());
                KvStore::new()
            }
        };
        Ok(Self {
            kv,
            chain_id: chain_id.to_string(),
            snapshot: Some(path),
            writer: Mutex::new(()),
        })
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn reader(&self) -> KvReader<'_> {
        self.kv.read()
    }

    /// Blocks until no other writer is alive.
    pub fn writer(&self) -> ChainWriter<'_> {
        ChainWriter {
            kv: &self.kv,
            _guard: self.writer.lock(),
            batch: WriteBatch::new(),
        }
    }

    /// Writes a snapshot of the committed state. No-op for in-memory stores.
    pub fn persist(&self) -> Result<()> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        write_snapshot(path, &self.chain_id, self.kv.entries())
    }
}

/// The single writer. Staged appends become visible on [`ChainWriter::commit`];
/// dropping the writer without committing discards them.
pub struct ChainWriter<'a> {
    kv: &'a KvStore,
    _guard: MutexGuard<'a, ()>,
    batch: WriteBatch,
}

impl ChainWriter<'_> {
    /// Stages a record and its index entries, returning the assigned height.
    pub fn append(
        &mut self,
        kind: EntityKind,
        key: &[u8],
        parent: Option<&str>,
        payload: &[u8],
    ) -> Result<u64> {
        match (kind.parent_kind(), parent) {
            (Some(parent_kind), None) => {
                return Err(StoreError::Write(format!(
                    "{kind} requires a {parent_kind} parent"
                )))
            }
            (None, Some(_)) => {
                return Err(StoreError::Write(format!("{kind} records have no parent")))
            }
            _ => {}
        }

        let base = self.kv.read();
        let heights = HeightIndex::new(kind);
        let height = heights.count(&self.batch.staged(&base))? + 1;

        // Validate everything that can fail before staging anything, so an
        // error leaves the batch untouched.
        let mut staged = WriteBatch::new();
        IdIndex::new(kind).insert(&mut staged, &self.batch.staged(&base), key, height)?;
        let layered = self.batch.staged(&base);
        heights.put(&mut staged, &layered, height, key, payload)?;
        if let Some(parent) = parent {
            ParentSecondaryIndex::new(kind).associate(&mut staged, &layered, parent, height)?;
        }
        drop(base);

        self.batch.extend(staged);
        Ok(height)
    }

    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    /// Makes every staged append visible at once. Returns entries written.
    pub fn commit(self) -> usize {
        let ChainWriter { kv, batch, .. } = self;
        let written = kv.apply(batch);
        log::debug!("committed {written} entries");
        written
    }
}
