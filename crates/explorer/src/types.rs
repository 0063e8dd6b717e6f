//! Typed chain records and their payload encoding.

use chainstore::keys::{natural_key_bytes, normalize_parent_id};
use chainstore::{EntityKind, Record};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{ExplorerError, ExplorerResult};

/// A record type stored in the chain store.
pub trait ChainRecord: Serialize + for<'de> Deserialize<'de> {
    const KIND: EntityKind;

    /// Natural key as text (hash, nullifier, address).
    fn key(&self) -> &str;

    /// Id of the parent this record is listed under, if its kind has one.
    fn parent(&self) -> Option<&str> {
        None
    }

    fn key_bytes(&self) -> Vec<u8> {
        natural_key_bytes(self.key())
    }

    fn encode(&self) -> ExplorerResult<Vec<u8>> {
        postcard::to_allocvec(self).map_err(|error| {
            ExplorerError::Internal(format!("failed to encode {}: {error}", Self::KIND))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub hash: String,
    pub proposer: String,
    pub num_txs: u32,
    /// Block time, unix seconds.
    pub time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub hash: String,
    pub block_hash: String,
    pub block_height: u64,
    pub index: u32,
    pub tx_type: String,
    pub nullifier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub nullifier: String,
    pub process_id: String,
    pub package: String,
    pub encryption_key_indexes: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Process {
    pub id: String,
    pub entity_id: String,
    pub process_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Validator {
    pub address: String,
    pub pub_key: String,
    pub voting_power: i64,
    pub proposer_priority: i64,
}

impl ChainRecord for Block {
    const KIND: EntityKind = EntityKind::Block;

    fn key(&self) -> &str {
        &self.hash
    }

    fn parent(&self) -> Option<&str> {
        Some(&self.proposer)
    }
}

impl ChainRecord for Transaction {
    const KIND: EntityKind = EntityKind::Transaction;

    fn key(&self) -> &str {
        &self.hash
    }

    fn parent(&self) -> Option<&str> {
        Some(&self.block_hash)
    }
}

impl ChainRecord for Envelope {
    const KIND: EntityKind = EntityKind::Envelope;

    fn key(&self) -> &str {
        &self.nullifier
    }

    fn parent(&self) -> Option<&str> {
        Some(&self.process_id)
    }
}

impl ChainRecord for Process {
    const KIND: EntityKind = EntityKind::Process;

    fn key(&self) -> &str {
        &self.id
    }

    fn parent(&self) -> Option<&str> {
        Some(&self.entity_id)
    }
}

impl ChainRecord for Entity {
    const KIND: EntityKind = EntityKind::Entity;

    fn key(&self) -> &str {
        &self.id
    }
}

impl ChainRecord for Validator {
    const KIND: EntityKind = EntityKind::Validator;

    fn key(&self) -> &str {
        &self.address
    }
}

/// Any decoded record, tagged with its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum AnyRecord {
    Block(Block),
    Transaction(Transaction),
    Envelope(Envelope),
    Process(Process),
    Entity(Entity),
    Validator(Validator),
}

impl AnyRecord {
    pub fn decode(kind: EntityKind, payload: &[u8]) -> ExplorerResult<Self> {
        fn typed<T: ChainRecord>(payload: &[u8]) -> ExplorerResult<T> {
            postcard::from_bytes(payload).map_err(|error| {
                ExplorerError::DecodeFailure(format!("{} payload: {error}", T::KIND))
            })
        }

        Ok(match kind {
            EntityKind::Block => AnyRecord::Block(typed(payload)?),
            EntityKind::Transaction => AnyRecord::Transaction(typed(payload)?),
            EntityKind::Envelope => AnyRecord::Envelope(typed(payload)?),
            EntityKind::Process => AnyRecord::Process(typed(payload)?),
            EntityKind::Entity => AnyRecord::Entity(typed(payload)?),
            EntityKind::Validator => AnyRecord::Validator(typed(payload)?),
        })
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            AnyRecord::Block(_) => EntityKind::Block,
            AnyRecord::Transaction(_) => EntityKind::Transaction,
            AnyRecord::Envelope(_) => EntityKind::Envelope,
            AnyRecord::Process(_) => EntityKind::Process,
            AnyRecord::Entity(_) => EntityKind::Entity,
            AnyRecord::Validator(_) => EntityKind::Validator,
        }
    }
}

/// A decoded record with its position, as served by the read API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordView {
    pub height: u64,
    /// Natural key, hex encoded.
    pub key: String,
    pub record: AnyRecord,
}

impl RecordView {
    pub fn from_record(kind: EntityKind, record: &Record) -> ExplorerResult<Self> {
        Ok(Self {
            height: record.height,
            key: record.key_hex(),
            record: AnyRecord::decode(kind, &record.payload)?,
        })
    }
}

/// Parent id in the form the store indexes it under.
pub fn parent_id(raw: &str) -> ExplorerResult<String> {
    let normalized = normalize_parent_id(raw);
    if normalized.is_empty() {
        return Err(ExplorerError::MissingParameter("parent".to_string()));
    }
    Ok(normalized)
}
