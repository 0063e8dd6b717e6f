//! Snapshot persistence for the store.
//!
//! Snapshots are postcard-encoded and zstd-compressed, written to a temp file
//! and renamed into place.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use std::thread::available_parallelism;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::kv::Entries;

/// Snapshot format version - increment when changing the format.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
pub struct PersistentStore {
    pub version: u32,
    pub chain_id: String,
    /// Unix seconds when the snapshot was written.
    pub saved_at: i64,
    pub entries: Entries,
}

pub fn snapshot_path(data_dir: &Path, chain_id: &str) -> PathBuf {
    data_dir.join(format!("{chain_id}.bin.zst"))
}

pub fn write_snapshot(path: &Path, chain_id: &str, entries: Entries) -> Result<()> {
    let snapshot = PersistentStore {
        version: SNAPSHOT_VERSION,
        chain_id: chain_id.to_string(),
        saved_at: chrono::Utc::now().timestamp(),
        entries,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|error| {
            StoreError::Internal(format!(
                "failed to create data directory {}: {error}",
                parent.display()
            ))
        })?;
    }

    let tmp_path = path.with_extension("tmp");
    {
        let output = File::create(&tmp_path).map_err(|error| {
            StoreError::Internal(format!(
                "failed to create snapshot file {}: {error}",
                tmp_path.display()
            ))
        })?;

        let mut encoder = zstd::Encoder::new(output, 6).map_err(|error| {
            StoreError::Internal(format!("failed to create zstd encoder: {error}"))
        })?;
        let threads = available_parallelism().map(|x| x.get() as u32).unwrap_or(4);
        encoder.multithread(threads).map_err(|error| {
            StoreError::Internal(format!("failed to enable multi-threaded zstd: {error}"))
        })?;

        let output = encoder.auto_finish();
        let mut output = BufWriter::new(output);
        postcard::to_io(&snapshot, &mut output).map_err(|error| {
            StoreError::Serialization(format!("failed to encode snapshot: {error}"))
        })?;
    }

    fs::rename(&tmp_path, path).map_err(|error| {
        StoreError::Internal(format!(
            "failed to finalize snapshot {}: {error}",
            path.display()
        ))
    })?;

    log::debug!(
        "wrote snapshot for {chain_id} to {} ({} entries)",
        path.display(),
        snapshot.entries.len()
    );
    Ok(())
}

/// Loads a snapshot, returning `None` when it is missing, unreadable, or
/// belongs to another format version or chain.
pub fn read_snapshot(path: &Path, chain_id: &str) -> Option<Entries> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(error) if error.kind() == ErrorKind::NotFound => return None,
        Err(error) => {
            log::warn!("failed to open snapshot {}: {error}", path.display());
            return None;
        }
    };

    let decoder = match zstd::Decoder::new(file) {
        Ok(decoder) => decoder,
        Err(error) => {
            log::warn!("failed to create zstd decoder for {}: {error}", path.display());
            return None;
        }
    };
    let mut input = BufReader::new(decoder);
    let mut scratch = vec![0u8; 4096];
    let snapshot: PersistentStore = match postcard::from_io((&mut input, &mut scratch)) {
        Ok((snapshot, _)) => snapshot,
        Err(error) => {
            log::warn!("failed to decode snapshot {}: {error}", path.display());
            return None;
        }
    };

    if snapshot.version != SNAPSHOT_VERSION {
        log::info!(
            "ignoring snapshot {} with version {} (expected {SNAPSHOT_VERSION})",
            path.display(),
            snapshot.version
        );
        return None;
    }
    if snapshot.chain_id != chain_id {
        log::warn!(
            "ignoring snapshot {} for chain {} (expected {chain_id})",
            path.display(),
            snapshot.chain_id
        );
        return None;
    }

    log::info!(
        "loaded snapshot for {chain_id} saved at {} ({} entries)",
        snapshot.saved_at,
        snapshot.entries.len()
    );
    Some(snapshot.entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_entries() -> Entries {
        let mut entries = Entries::new();
        entries.insert(b"n/blocks".to_vec(), 2u64.to_be_bytes().to_vec());
        entries.insert(b"r/blocks/x".to_vec(), vec![1, 2, 3]);
        entries
    }

    #[test]
    fn missing_snapshot_loads_nothing() {
        let dir = tempdir().expect("tempdir");
        assert!(read_snapshot(&snapshot_path(dir.path(), "main"), "main").is_none());
    }

    #[test]
    fn written_snapshot_loads_back() {
        let dir = tempdir().expect("tempdir");
        let path = snapshot_path(dir.path(), "main");
        write_snapshot(&path, "main", sample_entries()).expect("write");

        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
        assert_eq!(read_snapshot(&path, "main"), Some(sample_entries()));
    }

    #[test]
    fn snapshot_for_another_chain_is_ignored() {
        let dir = tempdir().expect("tempdir");
        let path = snapshot_path(dir.path(), "main");
        write_snapshot(&path, "main", sample_entries()).expect("write");
        assert!(read_snapshot(&path, "testnet").is_none());
    }

    #[test]
    fn corrupt_snapshot_is_ignored() {
        let dir = tempdir().expect("tempdir");
        let path = snapshot_path(dir.path(), "main");
        fs::write(&path, b"definitely not zstd").expect("write garbage");
        assert!(read_snapshot(&path, "main").is_none());
    }
}
