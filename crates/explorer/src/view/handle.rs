use std::sync::Mutex;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::view::mailbox::{Mailbox, Posted};
use crate::view::protocol::ViewState;
use crate::view::ViewTarget;

/// Caller side of an open view. Dropping it cancels the view.
pub struct ViewHandle {
    id: Uuid,
    target: ViewTarget,
    pages: Mailbox<u64>,
    searches: Mailbox<String>,
    cancel: CancellationToken,
    state: watch::Receiver<ViewState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ViewHandle {
    pub(crate) fn new(
        id: Uuid,
        target: ViewTarget,
        pages: Mailbox<u64>,
        searches: Mailbox<String>,
        cancel: CancellationToken,
        state: watch::Receiver<ViewState>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            id,
            target,
            pages,
            searches,
            cancel,
            state,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn target(&self) -> &ViewTarget {
        &self.target
    }

    /// Requests page `page`; replaces any page request not yet picked up.
    pub fn page_change(&self, page: u64) -> Posted {
        self.pages.post(page)
    }

    /// Enters search mode, or leaves it when `term` is blank.
    pub fn search(&self, term: impl Into<String>) -> Posted {
        self.searches.post(term.into())
    }

    /// Latest published state.
    pub fn state(&self) -> ViewState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stops the update loop and waits for it to exit. Later calls return
    /// immediately.
    pub async fn close(&self) {
        self.cancel.cancel();
        self.pages.close();
        self.searches.close();

        let task = self
            .task
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(error) = task.await {
                tracing::warn!("view {} update loop ended abnormally: {error}", self.id);
            }
        }
    }
}

impl Drop for ViewHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.pages.close();
        self.searches.close();
    }
}
