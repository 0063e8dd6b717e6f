//! Record kinds and their parent relationships.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// The record families kept by the store. Each kind owns a disjoint key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Block,
    Transaction,
    Envelope,
    Process,
    Entity,
    Validator,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Block,
        EntityKind::Transaction,
        EntityKind::Envelope,
        EntityKind::Process,
        EntityKind::Entity,
        EntityKind::Validator,
    ];

    /// Plural segment used in keys and URLs.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Block => "blocks",
            EntityKind::Transaction => "transactions",
            EntityKind::Envelope => "envelopes",
            EntityKind::Process => "processes",
            EntityKind::Entity => "entities",
            EntityKind::Validator => "validators",
        }
    }

    /// The kind records of this kind are scoped under, if any.
    ///
    /// Blocks are grouped by proposing validator, transactions by block,
    /// envelopes by process and processes by entity.
    pub fn parent_kind(self) -> Option<EntityKind> {
        match self {
            EntityKind::Block => Some(EntityKind::Validator),
            EntityKind::Transaction => Some(EntityKind::Block),
            EntityKind::Envelope => Some(EntityKind::Process),
            EntityKind::Process => Some(EntityKind::Entity),
            EntityKind::Entity | EntityKind::Validator => None,
        }
    }

    pub fn has_parent(self) -> bool {
        self.parent_kind().is_some()
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = StoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_ascii_lowercase();
        let kind = match lowered.as_str() {
            "blocks" | "block" => EntityKind::Block,
            "transactions" | "transaction" | "txs" | "tx" => EntityKind::Transaction,
            "envelopes" | "envelope" => EntityKind::Envelope,
            "processes" | "process" => EntityKind::Process,
            "entities" | "entity" => EntityKind::Entity,
            "validators" | "validator" => EntityKind::Validator,
            _ => {
                return Err(StoreError::InvalidInput(format!(
                    "unknown record kind: {value}"
                )))
            }
        };
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plural_and_singular_names() {
        assert_eq!("blocks".parse::<EntityKind>().unwrap(), EntityKind::Block);
        assert_eq!("Process".parse::<EntityKind>().unwrap(), EntityKind::Process);
        assert_eq!("tx".parse::<EntityKind>().unwrap(), EntityKind::Transaction);
        assert!("votes".parse::<EntityKind>().is_err());
    }

    #[test]
    fn only_scoped_kinds_have_parents() {
        assert_eq!(EntityKind::Block.parent_kind(), Some(EntityKind::Validator));
        assert_eq!(EntityKind::Envelope.parent_kind(), Some(EntityKind::Process));
        assert!(!EntityKind::Entity.has_parent());
        assert!(!EntityKind::Validator.has_parent());
    }

    #[test]
    fn display_round_trips_through_parse() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.to_string().parse::<EntityKind>().unwrap(), kind);
        }
    }
}
