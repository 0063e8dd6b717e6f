//! Per-view pagination state machine.
//!
//! The controller decides which fetch, if any, each [`ViewAction`] calls
//! for and folds completed fetches back into the [`ViewState`]. It does no
//! I/O; the update loop drives it one action at a time.

use chrono::Utc;

use crate::error::ExplorerResult;
use crate::view::protocol::{FetchOutcome, FetchRequest, ViewAction, ViewState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Fetching,
    Closed,
}

#[derive(Debug)]
pub struct PaginationController {
    state: ControllerState,
    view: ViewState,
}

impl PaginationController {
    pub fn new(view: ViewState) -> Self {
        Self {
            state: ControllerState::Idle,
            view,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn handle(&mut self, action: ViewAction) -> Option<FetchRequest> {
        if self.state == ControllerState::Closed {
            return None;
        }
        match action {
            ViewAction::Cancel => {
                self.state = ControllerState::Closed;
                self.view.closed = true;
                None
            }
            ViewAction::Tick => {
                if self.state == ControllerState::Fetching
                    || self.view.disable_update
                    || self.view.search.is_some()
                {
                    return None;
                }
                Some(FetchRequest::Page {
                    page: self.view.page,
                })
            }
            ViewAction::PageChange(page) => {
                self.view.page = page;
                if self.view.search.is_some() {
                    // Applied when the search is cleared.
                    return None;
                }
                self.view.disable_update = page != 0;
                Some(FetchRequest::Page { page })
            }
            ViewAction::SearchTermChange(term) => {
                let term = term.trim().to_string();
                if term.is_empty() {
                    if self.view.search.take().is_none() {
                        return None;
                    }
                    self.view.disable_update = self.view.page != 0;
                    return Some(FetchRequest::Page {
                        page: self.view.page,
                    });
                }
                self.view.search = Some(term.clone());
                self.view.disable_update = true;
                Some(FetchRequest::Search { term })
            }
        }
    }

    pub fn begin(&mut self) {
        if self.state == ControllerState::Idle {
            self.state = ControllerState::Fetching;
        }
    }

    /// Applies a finished fetch. Failures keep the current items and only
    /// mark the view disconnected.
    pub fn complete(&mut self, outcome: ExplorerResult<FetchOutcome>) {
        if self.state == ControllerState::Fetching {
            self.state = ControllerState::Idle;
        }
        self.view.fetches += 1;
        match outcome {
            Ok(FetchOutcome::Page { page, total, items }) => {
                self.view.page = page;
                self.view.total = total;
                self.view.items = items;
                self.view.disable_update = page != 0 || self.view.search.is_some();
                self.mark_connected();
            }
            Ok(FetchOutcome::Search { items, .. }) => {
                self.view.items = items;
                self.mark_connected();
            }
            Err(error) => {
                self.view.connected = false;
                self.view.last_error = Some(error.to_string());
            }
        }
    }

    fn mark_connected(&mut self) {
        self.view.connected = true;
        self.view.last_error = None;
        self.view.updated_at = Some(Utc::now());
    }
}
