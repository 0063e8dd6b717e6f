use chainstore::EntityKind;
use chrono::{DateTime, Utc};

use crate::page::Slot;
use crate::types::RecordView;

/// Everything that can happen to a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewAction {
    PageChange(u64),
    SearchTermChange(String),
    Tick,
    Cancel,
}

/// A fetch the controller wants issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRequest {
    /// Page of the most-recent-first listing; clamped when fetched.
    Page { page: u64 },
    Search { term: String },
}

/// A completed fetch, ready to be applied to view state.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Page {
        page: u64,
        total: u64,
        items: Vec<Slot<RecordView>>,
    },
    Search {
        term: String,
        hits: usize,
        items: Vec<Slot<RecordView>>,
    },
}

/// What a view shows, published after every applied fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub kind: EntityKind,
    pub parent: Option<String>,
    /// Current page of the most-recent-first listing.
    pub page: u64,
    /// Total records behind the listing, as of the last page fetch.
    pub total: u64,
    /// Most recent first; always `page_size` long outside search mode.
    pub items: Vec<Slot<RecordView>>,
    /// Active search term, if the view is in search mode.
    pub search: Option<String>,
    /// Background refresh is paused while set.
    pub disable_update: bool,
    /// False after a failed fetch; items keep the last good data.
    pub connected: bool,
    pub last_error: Option<String>,
    /// Fetches applied so far, successful or not.
    pub fetches: u64,
    pub updated_at: Option<DateTime<Utc>>,
    pub closed: bool,
}

impl ViewState {
    pub fn new(kind: EntityKind, parent: Option<String>, page_size: usize) -> Self {
        Self {
            kind,
            parent,
            page: 0,
            total: 0,
            items: (0..page_size).map(|_| Slot::Empty).collect(),
            search: None,
            disable_update: false,
            connected: true,
            last_error: None,
            fetches: 0,
            updated_at: None,
            closed: false,
        }
    }

    /// Heights of the displayed items, `None` for empty slots.
    pub fn heights(&self) -> Vec<Option<u64>> {
        self.items
            .iter()
            .map(|slot| slot.as_ref().into_option().map(|view| view.height))
            .collect()
    }
}
