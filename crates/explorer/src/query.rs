//! Windowed reads over the chain store.
//!
//! `from` is a 0-based position in a kind's ascending sequence; position `p`
//! is the record at height `p + 1`. Positions are clamped to the last record
//! so a stale client never reads past the end, and an empty sequence is
//! reported as [`ExplorerError::NotFound`].

pub mod window;

use std::collections::BTreeMap;
use std::sync::Arc;

use chainstore::keys::natural_key_bytes;
use chainstore::{
    ChainStore, EntityKind, HeightIndex, IdIndex, KvReader, ParentSecondaryIndex,
    PrefixSearchIndex, Record, StoreError,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{ExplorerError, ExplorerResult};
use crate::page::{Page, Slot};
use crate::types::{parent_id, RecordView};

pub use window::Window;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub chain_id: String,
    pub page_size: usize,
    /// Record count per kind, keyed by the kind's plural name.
    pub counts: BTreeMap<String, u64>,
}

pub struct QueryService {
    store: Arc<ChainStore>,
    page_size: usize,
    search_limit: usize,
}

impl QueryService {
    pub fn new(store: Arc<ChainStore>, page_size: usize, search_limit: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
            search_limit: search_limit.clamp(1, chainstore::MAX_SEARCH_LIMIT),
        }
    }

    pub fn store(&self) -> &Arc<ChainStore> {
        &self.store
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn search_limit(&self) -> usize {
        self.search_limit
    }

    pub fn count(&self, kind: EntityKind) -> ExplorerResult<u64> {
        Ok(HeightIndex::new(kind).count(&self.store.reader())?)
    }

    /// Children under `parent`; 0 when the parent has none yet.
    pub fn count_by_parent(&self, kind: EntityKind, parent: &str) -> ExplorerResult<u64> {
        ensure_scoped(kind)?;
        let parent = parent_id(parent)?;
        Ok(ParentSecondaryIndex::new(kind).count_for(&self.store.reader(), &parent)?)
    }

    pub fn count_map(&self, kind: EntityKind) -> ExplorerResult<BTreeMap<String, u64>> {
        ensure_scoped(kind)?;
        Ok(ParentSecondaryIndex::new(kind).count_map(&self.store.reader())?)
    }

    pub fn get(&self, kind: EntityKind, height: u64) -> ExplorerResult<RecordView> {
        let reader = self.store.reader();
        let record = HeightIndex::new(kind).get(&reader, height)?;
        RecordView::from_record(kind, &record)
    }

    pub fn get_by_key(&self, kind: EntityKind, key: &str) -> ExplorerResult<RecordView> {
        if key.trim().is_empty() {
            return Err(ExplorerError::MissingParameter("key".to_string()));
        }
        let reader = self.store.reader();
        let height = IdIndex::new(kind).height_of(&reader, &natural_key_bytes(key))?;
        let record = HeightIndex::new(kind).get(&reader, height)?;
        RecordView::from_record(kind, &record)
    }

    /// One page of records starting at position `from`, ascending.
    pub fn list(&self, kind: EntityKind, from: u64) -> ExplorerResult<Page<RecordView>> {
        let reader = self.store.reader();
        let heights = HeightIndex::new(kind);
        let total = heights.count(&reader)?;
        if total == 0 {
            return Err(ExplorerError::NotFound(format!("no {kind} yet")));
        }
        let from = from.min(total - 1);
        let slots = heights
            .list_range(&reader, from + 1, self.page_size as u64)?
            .into_iter()
            .map(|record| to_slot(kind, record))
            .collect();
        Ok(Page::from_slots(from, total, self.page_size, slots))
    }

    /// One page of the children of `parent`, starting at local position `from`.
    pub fn list_by_parent(
        &self,
        kind: EntityKind,
        parent: &str,
        from: u64,
    ) -> ExplorerResult<Page<RecordView>> {
        ensure_scoped(kind)?;
        let parent = parent_id(parent)?;
        let reader = self.store.reader();
        let children = ParentSecondaryIndex::new(kind);
        let total = children.count_for(&reader, &parent)?;
        if total == 0 {
            return Err(ExplorerError::ParentNotIndexed(format!(
                "no {kind} under {parent}"
            )));
        }
        let from = from.min(total - 1);
        let slots = self.resolve_heights(
            &reader,
            kind,
            children.list_for(&reader, &parent, from, self.page_size as u64)?,
        );
        Ok(Page::from_slots(from, total, self.page_size, slots))
    }

    /// A single bounded page of matches, most recent first.
    pub fn search(&self, kind: EntityKind, term: &str) -> ExplorerResult<Page<RecordView>> {
        let reader = self.store.reader();
        let hits = PrefixSearchIndex::new(kind).search(&reader, term, self.search_limit)?;
        let total = hits.len() as u64;
        let slots = hits
            .into_iter()
            .map(|record| to_slot(kind, Ok(record)))
            .collect();
        Ok(Page::from_slots(0, total, self.search_limit, slots))
    }

    pub fn stats(&self) -> ExplorerResult<Stats> {
        let reader = self.store.reader();
        let mut counts = BTreeMap::new();
        for kind in EntityKind::ALL {
            counts.insert(kind.to_string(), HeightIndex::new(kind).count(&reader)?);
        }
        Ok(Stats {
            chain_id: self.store.chain_id().to_string(),
            page_size: self.page_size,
            counts,
        })
    }

    fn resolve_heights(
        &self,
        reader: &KvReader<'_>,
        kind: EntityKind,
        heights: Vec<u64>,
    ) -> Vec<Slot<RecordView>> {
        let index = HeightIndex::new(kind);
        heights
            .into_iter()
            .map(|height| to_slot(kind, index.get(reader, height)))
            .collect()
    }
}

fn ensure_scoped(kind: EntityKind) -> ExplorerResult<()> {
    if kind.has_parent() {
        Ok(())
    } else {
        Err(ExplorerError::InvalidInput(format!(
            "{kind} records are not listed by parent"
        )))
    }
}

fn to_slot(kind: EntityKind, record: Result<Record, StoreError>) -> Slot<RecordView> {
    let decoded = record
        .map_err(ExplorerError::from)
        .and_then(|record| RecordView::from_record(kind, &record));
    match decoded {
        Ok(view) => Slot::Filled(view),
        Err(error) => {
            tracing::warn!("leaving {} slot empty: {}", kind, error);
            Slot::Empty
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::append_record;
    use crate::types::{AnyRecord, Block, Entity, Validator};

    fn block(height: u64, proposer: &str) -> Block {
        Block {
            hash: format!("{height:064x}"),
            proposer: proposer.to_string(),
            num_txs: 0,
            time: height as i64,
        }
    }

    fn service_with_blocks(count: u64, page_size: usize) -> QueryService {
        let store = Arc::new(ChainStore::in_memory("test"));
        {
            let mut writer = store.writer();
            for height in 1..=count {
                let proposer = if height % 2 == 0 { "0xEVEN" } else { "0xODD" };
                append_record(&mut writer, &block(height, proposer)).expect("append");
            }
            writer.commit();
        }
        QueryService::new(store, page_size, 10)
    }

    fn heights(page: &Page<RecordView>) -> Vec<Option<u64>> {
        page.slots
            .iter()
            .map(|slot| slot.as_ref().into_option().map(|view| view.height))
            .collect()
    }

    fn most_recent_first(service: &QueryService, page: u64) -> Vec<Option<u64>> {
        let total = service.count(EntityKind::Block).expect("count");
        let window = Window::for_page(total, page, service.page_size());
        let listed = service.list(EntityKind::Block, window.from).expect("list");
        listed
            .reverse_filled(window.size as usize)
            .iter()
            .map(|slot| slot.as_ref().into_option().map(|view| view.height))
            .collect()
    }

    #[test]
    fn pages_of_a_hundred_blocks() {
        let service = service_with_blocks(100, 10);

        let first: Vec<Option<u64>> = (91..=100).rev().map(Some).collect();
        assert_eq!(most_recent_first(&service, 0), first);

        let last: Vec<Option<u64>> = (1..=10).rev().map(Some).collect();
        assert_eq!(most_recent_first(&service, 9), last);
        assert_eq!(most_recent_first(&service, 10), last);
    }

    #[test]
    fn list_clamps_from_and_pads_slots() {
        let service = service_with_blocks(12, 5);
        let page = service.list(EntityKind::Block, 10).expect("list");
        assert_eq!(page.from, 10);
        assert_eq!(heights(&page), vec![Some(11), Some(12), None, None, None]);

        let clamped = service.list(EntityKind::Block, 500).expect("list");
        assert_eq!(clamped.from, 11);
        assert_eq!(heights(&clamped), vec![Some(12), None, None, None, None]);
    }

    #[test]
    fn empty_kind_is_not_found() {
        let service = service_with_blocks(3, 5);
        let err = service.list(EntityKind::Envelope, 0).expect_err("empty");
        assert!(matches!(err, ExplorerError::NotFound(_)));
    }

    #[test]
    fn repeated_lists_are_identical() {
        let service = service_with_blocks(30, 10);
        assert_eq!(
            service.list(EntityKind::Block, 7).unwrap(),
            service.list(EntityKind::Block, 7).unwrap()
        );
    }

    #[test]
    fn lists_children_of_a_parent() {
        let service = service_with_blocks(9, 3);
        assert_eq!(service.count_by_parent(EntityKind::Block, "0xodd").unwrap(), 5);
        assert_eq!(service.count_by_parent(EntityKind::Block, "even").unwrap(), 4);
        assert_eq!(service.count_by_parent(EntityKind::Block, "0xnone").unwrap(), 0);

        let page = service
            .list_by_parent(EntityKind::Block, "0xODD", 3)
            .expect("by parent");
        assert_eq!(page.total, 5);
        assert_eq!(heights(&page), vec![Some(7), Some(9), None]);

        let err = service
            .list_by_parent(EntityKind::Block, "0xnone", 0)
            .expect_err("unseen parent");
        assert!(matches!(err, ExplorerError::ParentNotIndexed(_)));
    }

    #[test]
    fn parent_queries_need_a_scoped_kind_and_a_parent() {
        let service = service_with_blocks(1, 3);
        assert!(matches!(
            service.list_by_parent(EntityKind::Validator, "x", 0),
            Err(ExplorerError::InvalidInput(_))
        ));
        assert!(matches!(
            service.count_by_parent(EntityKind::Block, "  "),
            Err(ExplorerError::MissingParameter(_))
        ));
    }

    #[test]
    fn count_map_covers_every_parent() {
        let service = service_with_blocks(7, 3);
        let map = service.count_map(EntityKind::Block).expect("map");
        assert_eq!(map.get("odd"), Some(&4));
        assert_eq!(map.get("even"), Some(&3));
    }

    #[test]
    fn search_returns_one_bounded_page() {
        let service = service_with_blocks(40, 10);
        assert!(matches!(
            service.search(EntityKind::Block, ""),
            Err(ExplorerError::EmptySearchTerm)
        ));

        // Hashes are zero-padded heights in hex; "1" appears in many of them.
        let page = service.search(EntityKind::Block, "1").expect("search");
        assert_eq!(page.size(), 10);
        assert_eq!(page.filled(), 10);
        let found = heights(&page);
        assert_eq!(found[0], Some(33));
        assert_eq!(found[1], Some(31));
    }

    #[test]
    fn undecodable_payload_leaves_one_empty_slot() {
        let store = Arc::new(ChainStore::in_memory("test"));
        {
            let mut writer = store.writer();
            append_record(&mut writer, &block(1, "v")).expect("append");
            writer
                .append(EntityKind::Block, &[0xde, 0xad], Some("v"), &[0xff])
                .expect("append raw");
            append_record(&mut writer, &block(3, "v")).expect("append");
            writer.commit();
        }
        let service = QueryService::new(store, 4, 10);

        let page = service.list(EntityKind::Block, 0).expect("list");
        assert_eq!(heights(&page), vec![Some(1), None, Some(3), None]);
        let by_parent = service
            .list_by_parent(EntityKind::Block, "v", 0)
            .expect("by parent");
        assert_eq!(heights(&by_parent), vec![Some(1), None, Some(3), None]);
    }

    #[test]
    fn gets_by_height_and_key() {
        let store = Arc::new(ChainStore::in_memory("test"));
        {
            let mut writer = store.writer();
            append_record(&mut writer, &Entity { id: "0xE1".to_string() }).expect("append");
            append_record(
                &mut writer,
                &Validator {
                    address: "0xA1".to_string(),
                    pub_key: "pk".to_string(),
                    voting_power: 5,
                    proposer_priority: 1,
                },
            )
            .expect("append");
            writer.commit();
        }
        let service = QueryService::new(store, 10, 10);

        let entity = service.get(EntityKind::Entity, 1).expect("get");
        assert_eq!(entity.key, "e1");
        assert!(matches!(entity.record, AnyRecord::Entity(_)));
        assert!(matches!(
            service.get(EntityKind::Entity, 2),
            Err(ExplorerError::NotFound(_))
        ));

        let validator = service.get_by_key(EntityKind::Validator, "a1").expect("by key");
        assert_eq!(validator.height, 1);
        assert!(matches!(
            service.get_by_key(EntityKind::Validator, " "),
            Err(ExplorerError::MissingParameter(_))
        ));

        let stats = service.stats().expect("stats");
        assert_eq!(stats.counts.get("entities"), Some(&1));
        assert_eq!(stats.counts.get("blocks"), Some(&0));
    }
}
