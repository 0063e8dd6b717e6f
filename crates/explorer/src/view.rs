//! Client-side record views.
//!
//! A view shows one page of a most-recent-first listing, optionally scoped
//! to a parent, and keeps it fresh in the background. Each open view owns a
//! task running an [`update_loop::UpdateLoop`]; callers drive it through a
//! [`ViewHandle`] and observe it through a watch channel or the app bus.

pub mod controller;
pub mod handle;
pub mod mailbox;
pub mod protocol;
pub(crate) mod update_loop;

use std::sync::Arc;
use std::time::Duration;

use chainstore::EntityKind;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::bus::Bus;
use crate::client::ExplorerBackend;
use crate::config::ExplorerConfig;
use crate::error::{ExplorerError, ExplorerResult};
use crate::event::ExplorerEvent;
use crate::types::parent_id;

pub use controller::{ControllerState, PaginationController};
pub use handle::ViewHandle;
pub use mailbox::{Mailbox, Posted};
pub use protocol::{FetchOutcome, FetchRequest, ViewAction, ViewState};

use update_loop::UpdateLoop;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewSettings {
    pub page_size: usize,
    pub refresh_interval: Duration,
    pub fetch_timeout: Duration,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self::from(&ExplorerConfig::default())
    }
}

impl From<&ExplorerConfig> for ViewSettings {
    fn from(config: &ExplorerConfig) -> Self {
        Self {
            page_size: config.page_size,
            refresh_interval: config.refresh_interval(),
            fetch_timeout: config.fetch_timeout(),
        }
    }
}

/// What a view lists: every record of a kind, or the children of one parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewTarget {
    pub kind: EntityKind,
    pub parent: Option<String>,
}

impl ViewTarget {
    pub fn all(kind: EntityKind) -> Self {
        Self { kind, parent: None }
    }

    pub fn children_of(kind: EntityKind, parent: &str) -> ExplorerResult<Self> {
        if !kind.has_parent() {
            return Err(ExplorerError::InvalidInput(format!(
                "{kind} records have no parent"
            )));
        }
        Ok(Self {
            kind,
            parent: Some(parent_id(parent)?),
        })
    }
}

/// Spawns the update loop for a new view on the current runtime.
pub fn open_view(
    backend: Arc<dyn ExplorerBackend>,
    target: ViewTarget,
    settings: ViewSettings,
    bus: Bus,
) -> ExplorerResult<ViewHandle> {
    if settings.page_size == 0 {
        return Err(ExplorerError::InvalidInput(
            "page size must be positive".to_string(),
        ));
    }
    if settings.refresh_interval.is_zero() {
        return Err(ExplorerError::InvalidInput(
            "refresh interval must be positive".to_string(),
        ));
    }

    let view_id = Uuid::new_v4();
    let initial = ViewState::new(target.kind, target.parent.clone(), settings.page_size);
    let (state_tx, state_rx) = watch::channel(initial.clone());
    let pages = Mailbox::new();
    let searches = Mailbox::new();
    let cancel = CancellationToken::new();

    let _ = bus.publish(ExplorerEvent::ViewOpened {
        view_id,
        kind: target.kind,
        parent: target.parent.clone(),
    });
    tracing::debug!("opening {} view {view_id}", target.kind);

    let update_loop = UpdateLoop {
        view_id,
        target: target.clone(),
        backend,
        controller: PaginationController::new(initial),
        settings,
        pages: pages.clone(),
        searches: searches.clone(),
        cancel: cancel.clone(),
        state_tx,
        bus,
    };
    let task = tokio::spawn(update_loop.run());

    Ok(ViewHandle::new(
        view_id, target, pages, searches, cancel, state_rx, task,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_of_requires_a_parented_kind() {
        let target = ViewTarget::children_of(EntityKind::Envelope, " 0xAB ").expect("target");
        assert_eq!(target.parent.as_deref(), Some("ab"));

        let err = ViewTarget::children_of(EntityKind::Entity, "ab").expect_err("no parent kind");
        assert!(matches!(err, ExplorerError::InvalidInput(_)));

        let err = ViewTarget::children_of(EntityKind::Block, "0x").expect_err("blank parent");
        assert!(matches!(err, ExplorerError::MissingParameter(_)));
    }

    #[test]
    fn settings_follow_config() {
        let config = ExplorerConfig {
            page_size: 7,
            refresh_interval_secs: 2,
            fetch_timeout_ms: 250,
            ..ExplorerConfig::default()
        };
        let settings = ViewSettings::from(&config);
        assert_eq!(settings.page_size, 7);
        assert_eq!(settings.refresh_interval, Duration::from_secs(2));
        assert_eq!(settings.fetch_timeout, Duration::from_millis(250));
    }
}
