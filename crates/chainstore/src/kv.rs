//! Ordered, append-only key-value storage with atomic batches.
//!
//! Readers take a [`KvReader`] view; everything read through one view comes
//! from one state of the map. The single writer stages changes in a
//! [`WriteBatch`] and installs them with [`KvStore::apply`], which holds the
//! exclusive lock for the whole batch so a reader sees all of it or none.

use std::collections::BTreeMap;

use parking_lot::{RwLock, RwLockReadGuard};

use crate::keys::prefix_bounds;

pub type Entries = BTreeMap<Vec<u8>, Vec<u8>>;

/// Point reads shared by committed views and staged batches.
pub trait KvRead {
    fn get(&self, key: &[u8]) -> Option<&[u8]>;
}

#[derive(Debug, Default)]
pub struct KvStore {
    inner: RwLock<Entries>,
}

impl KvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Entries) -> Self {
        Self {
            inner: RwLock::new(entries),
        }
    }

    pub fn read(&self) -> KvReader<'_> {
        KvReader {
            guard: self.inner.read(),
        }
    }

    /// Installs every staged entry under one exclusive acquisition.
    ///
    /// Returns the number of entries written.
    pub fn apply(&self, batch: WriteBatch) -> usize {
        if batch.is_empty() {
            return 0;
        }
        let mut guard = self.inner.write();
        let written = batch.entries.len();
        guard.extend(batch.entries);
        written
    }

    /// Copy of the full map, used for snapshots.
    pub fn entries(&self) -> Entries {
        self.inner.read().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

/// A consistent read view over the store.
pub struct KvReader<'a> {
    guard: RwLockReadGuard<'a, Entries>,
}

impl KvReader<'_> {
    /// Entries whose key starts with `prefix`, ascending.
    pub fn scan_prefix<'s>(
        &'s self,
        prefix: &[u8],
    ) -> impl DoubleEndedIterator<Item = (&'s [u8], &'s [u8])> + 's {
        self.guard
            .range(prefix_bounds(prefix))
            .map(|(key, value)| (key.as_slice(), value.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard.is_empty()
    }
}

impl KvRead for KvReader<'_> {
    fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.guard.get(key).map(Vec::as_slice)
    }
}

/// Changes staged by the writer, not yet visible to readers.
#[derive(Debug, Default)]
pub struct WriteBatch {
    entries: Entries,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.entries.insert(key, value);
    }

    /// Moves every entry of `other` into this batch.
    pub fn extend(&mut self, other: WriteBatch) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reads `key` from the batch first, then from `base`.
    pub fn staged<'a, R: KvRead>(&'a self, base: &'a R) -> Staged<'a, R> {
        Staged { batch: self, base }
    }
}

impl KvRead for WriteBatch {
    fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }
}

/// Read-through view of a batch layered over committed state.
pub struct Staged<'a, R> {
    batch: &'a WriteBatch,
    base: &'a R,
}

impl<R: KvRead> KvRead for Staged<'_, R> {
    fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.batch.get(key).or_else(|| self.base.get(key))
    }
}
