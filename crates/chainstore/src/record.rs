use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// A record at its position in the kind's height sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub height: u64,
    pub key: Vec<u8>,
    pub payload: Vec<u8>,
}

impl Record {
    pub fn key_hex(&self) -> String {
        hex::encode(&self.key)
    }
}

/// On-disk value stored under a record key; the height lives in the key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredRecord {
    pub key: Vec<u8>,
    pub payload: Vec<u8>,
}

impl StoredRecord {
    pub(crate) fn encode(&self) -> Result<Vec<u8>> {
        postcard::to_allocvec(self).map_err(|error| {
            StoreError::Serialization(format!("failed to encode record: {error}"))
        })
    }

    pub(crate) fn decode(height: u64, bytes: &[u8]) -> Result<Record> {
        let stored: StoredRecord = postcard::from_bytes(bytes).map_err(|error| {
            StoreError::Decode(format!("record at height {height}: {error}"))
        })?;
        Ok(Record {
            height,
            key: stored.key,
            payload: stored.payload,
        })
    }
}
