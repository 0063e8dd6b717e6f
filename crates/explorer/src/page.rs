//! Fixed-length pages of optional slots.
//!
//! A page always carries exactly `size` slots. Positions with no record are
//! [`Slot::Empty`] rather than missing, so callers can do index math on the
//! slot vector directly.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::RecordView;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot<T> {
    Filled(T),
    Empty,
}

impl<T> Slot<T> {
    pub fn is_filled(&self) -> bool {
        matches!(self, Slot::Filled(_))
    }

    pub fn as_ref(&self) -> Slot<&T> {
        match self {
            Slot::Filled(value) => Slot::Filled(value),
            Slot::Empty => Slot::Empty,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Slot::Filled(value) => Some(value),
            Slot::Empty => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Slot<U> {
        match self {
            Slot::Filled(value) => Slot::Filled(f(value)),
            Slot::Empty => Slot::Empty,
        }
    }
}

impl<T> From<Option<T>> for Slot<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Slot::Filled(value),
            None => Slot::Empty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// 0-based position of the first slot in the ascending sequence.
    pub from: u64,
    /// Total records in the sequence when the page was read.
    pub total: u64,
    pub slots: Vec<Slot<T>>,
}

impl<T> Page<T> {
    /// Builds a page of exactly `size` slots from up to `size` values.
    pub fn from_slots(from: u64, total: u64, size: usize, slots: Vec<Slot<T>>) -> Self {
        let mut slots = slots;
        slots.truncate(size);
        slots.resize_with(size, || Slot::Empty);
        Self { from, total, slots }
    }

    pub fn empty(size: usize) -> Self {
        Self::from_slots(0, 0, size, Vec::new())
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_filled()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.filled() == 0
    }

    /// Reverses the first `effective` slots into most-recent-first order and
    /// pads the rest with empty slots, keeping the page length.
    pub fn reverse_filled(self, effective: usize) -> Vec<Slot<T>> {
        let size = self.slots.len();
        let mut slots: Vec<Slot<T>> = self.slots.into_iter().take(effective).collect();
        slots.reverse();
        slots.resize_with(size, || Slot::Empty);
        slots
    }
}

/// Wire form of a page: `items` is always `size` long, `null` for empty slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    pub from: u64,
    pub size: usize,
    pub total: u64,
    pub items: Vec<Option<RecordView>>,
}

impl From<Page<RecordView>> for PageResponse {
    fn from(page: Page<RecordView>) -> Self {
        Self {
            from: page.from,
            size: page.slots.len(),
            total: page.total,
            items: page.slots.into_iter().map(Slot::into_option).collect(),
        }
    }
}

impl From<PageResponse> for Page<RecordView> {
    fn from(response: PageResponse) -> Self {
        let slots = response.items.into_iter().map(Slot::from).collect();
        Page::from_slots(response.from, response.total, response.size, slots)
    }
}
