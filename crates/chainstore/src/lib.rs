//! Append-only chain record store with height, parent and search indexes.
//!
//! This crate provides the storage side of the explorer:
//! - An ordered key-value map with atomic write batches
//! - Height, parent and natural-key indexes per record kind
//! - Bounded substring search
//! - Compressed snapshot persistence

pub mod error;
pub mod height_index;
pub mod keys;
pub mod kind;
pub mod kv;
pub mod lookup;
pub mod parent_index;
pub mod persistence;
pub mod record;
pub mod search;
pub mod store;

pub use error::{Result, StoreError};
pub use height_index::HeightIndex;
pub use kind::EntityKind;
pub use kv::{KvRead, KvReader};
pub use lookup::IdIndex;
pub use parent_index::ParentSecondaryIndex;
pub use record::Record;
pub use search::{PrefixSearchIndex, MAX_SEARCH_LIMIT};
pub use store::{ChainStore, ChainWriter};
