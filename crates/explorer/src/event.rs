use chainstore::EntityKind;
use serde::Serialize;
use uuid::Uuid;

/// Notifications published on the application [`Bus`](crate::bus::Bus) by
/// open views.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ExplorerEvent {
    ViewOpened {
        view_id: Uuid,
        kind: EntityKind,
        parent: Option<String>,
    },
    PageLoaded {
        view_id: Uuid,
        page: u64,
        total: u64,
    },
    SearchLoaded {
        view_id: Uuid,
        term: String,
        hits: usize,
    },
    FetchFailed {
        view_id: Uuid,
        error: String,
    },
    ViewClosed {
        view_id: Uuid,
    },
}

impl ExplorerEvent {
    pub fn view_id(&self) -> Uuid {
        match self {
            ExplorerEvent::ViewOpened { view_id, .. }
            | ExplorerEvent::PageLoaded { view_id, .. }
            | ExplorerEvent::SearchLoaded { view_id, .. }
            | ExplorerEvent::FetchFailed { view_id, .. }
            | ExplorerEvent::ViewClosed { view_id } => *view_id,
        }
    }
}
