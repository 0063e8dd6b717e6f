use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::bus::Bus;
use crate::client::ExplorerBackend;
use crate::error::{ExplorerError, ExplorerResult};
use crate::event::ExplorerEvent;
use crate::page::Page;
use crate::query::Window;
use crate::view::controller::PaginationController;
use crate::view::mailbox::Mailbox;
use crate::view::protocol::{FetchOutcome, FetchRequest, ViewAction, ViewState};
use crate::view::{ViewSettings, ViewTarget};

/// Background task behind one view. Runs until cancelled.
pub(crate) struct UpdateLoop {
    pub(crate) view_id: Uuid,
    pub(crate) target: ViewTarget,
    pub(crate) backend: Arc<dyn ExplorerBackend>,
    pub(crate) controller: PaginationController,
    pub(crate) settings: ViewSettings,
    pub(crate) pages: Mailbox<u64>,
    pub(crate) searches: Mailbox<String>,
    pub(crate) cancel: CancellationToken,
    pub(crate) state_tx: watch::Sender<ViewState>,
    pub(crate) bus: Bus,
}

impl UpdateLoop {
    pub(crate) async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.settings.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let action = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => ViewAction::Cancel,
                Some(page) = self.pages.recv() => ViewAction::PageChange(page),
                Some(term) = self.searches.recv() => ViewAction::SearchTermChange(term),
                _ = ticker.tick() => ViewAction::Tick,
            };
            if action == ViewAction::Cancel {
                break;
            }
            let Some(request) = self.controller.handle(action) else {
                continue;
            };

            self.controller.begin();
            let limit = self.settings.fetch_timeout;
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                result = timeout(limit, self.fetch(&request)) => match result {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        tracing::warn!(
                            "view {} fetch {:?} timed out after {:?}",
                            self.view_id,
                            request,
                            limit
                        );
                        Err(ExplorerError::Timeout(limit.as_millis() as u64))
                    }
                },
            };
            self.apply(outcome);
        }

        self.controller.handle(ViewAction::Cancel);
        self.state_tx.send_replace(self.controller.view().clone());
        let _ = self.bus.publish(ExplorerEvent::ViewClosed {
            view_id: self.view_id,
        });
        tracing::debug!("view {} closed", self.view_id);
    }

    fn apply(&mut self, outcome: ExplorerResult<FetchOutcome>) {
        let view_id = self.view_id;
        let event = match &outcome {
            Ok(FetchOutcome::Page { page, total, .. }) => ExplorerEvent::PageLoaded {
                view_id,
                page: *page,
                total: *total,
            },
            Ok(FetchOutcome::Search { term, hits, .. }) => ExplorerEvent::SearchLoaded {
                view_id,
                term: term.clone(),
                hits: *hits,
            },
            Err(error) => {
                tracing::warn!("view {view_id} fetch failed: {error}");
                ExplorerEvent::FetchFailed {
                    view_id,
                    error: error.to_string(),
                }
            }
        };
        self.controller.complete(outcome);
        self.state_tx.send_replace(self.controller.view().clone());
        let _ = self.bus.publish(event);
    }

    async fn fetch(&self, request: &FetchRequest) -> ExplorerResult<FetchOutcome> {
        match request {
            FetchRequest::Page { page } => self.fetch_page(*page).await,
            FetchRequest::Search { term } => {
                let found = self.backend.search(self.target.kind, term).await?;
                Ok(FetchOutcome::Search {
                    term: term.clone(),
                    hits: found.filled(),
                    items: found.slots,
                })
            }
        }
    }

    async fn fetch_page(&self, page: u64) -> ExplorerResult<FetchOutcome> {
        let kind = self.target.kind;
        let page_size = self.settings.page_size;
        let total = match &self.target.parent {
            Some(parent) => self.backend.count_by_parent(kind, parent).await?,
            None => self.backend.count(kind).await?,
        };

        let window = Window::for_page(total, page, page_size);
        if window.is_empty() {
            return Ok(FetchOutcome::Page {
                page: window.page,
                total,
                items: Page::empty(page_size).slots,
            });
        }

        let listed = match &self.target.parent {
            Some(parent) => self.backend.list_by_parent(kind, parent, window.from).await,
            None => self.backend.list(kind, window.from).await,
        };
        let listed = match listed {
            Ok(listed) => listed,
            // Count and list can race with a writer; treat as not there yet.
            Err(error) if error.is_empty_result() => Page::empty(page_size),
            Err(error) => return Err(error),
        };
        if listed.size() != page_size {
            // The window above assumed `page_size` slots per page.
            return Err(ExplorerError::InvalidInput(format!(
                "backend pages hold {} {kind}, view expects {page_size}",
                listed.size()
            )));
        }

        let items = Page::from_slots(window.from, total, page_size, listed.slots)
            .reverse_filled(window.size as usize);
        Ok(FetchOutcome::Page {
            page: window.page,
            total,
            items,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use chainstore::EntityKind;
    use tokio::sync::{broadcast, Notify, Semaphore};

    use super::*;
    use crate::page::Slot;
    use crate::types::{AnyRecord, Block, RecordView};
    use crate::view::{open_view, Posted, ViewHandle};

    const WAIT: Duration = Duration::from_secs(5);

    struct MockBackend {
        total: AtomicU64,
        page_size: usize,
        froms: Mutex<Vec<u64>>,
        searches: Mutex<Vec<String>>,
        fail: AtomicBool,
        stall_next: AtomicBool,
        gated: AtomicBool,
        gate: Semaphore,
        entered: Notify,
    }

    impl MockBackend {
        fn new(total: u64, page_size: usize) -> Self {
            Self {
                total: AtomicU64::new(total),
                page_size,
                froms: Mutex::new(Vec::new()),
                searches: Mutex::new(Vec::new()),
                fail: AtomicBool::new(false),
                stall_next: AtomicBool::new(false),
                gated: AtomicBool::new(false),
                gate: Semaphore::new(0),
                entered: Notify::new(),
            }
        }

        fn gated(total: u64, page_size: usize) -> Self {
            let backend = Self::new(total, page_size);
            backend.gated.store(true, Ordering::SeqCst);
            backend
        }

        fn release(&self) {
            self.gated.store(false, Ordering::SeqCst);
            self.gate.add_permits(1_000);
        }

        fn froms(&self) -> Vec<u64> {
            self.froms.lock().expect("froms").clone()
        }

        fn view(height: u64) -> RecordView {
            RecordView {
                height,
                key: format!("{height:04x}"),
                record: AnyRecord::Block(Block {
                    hash: format!("{height:04x}"),
                    proposer: "aa".to_string(),
                    num_txs: 0,
                    time: height as i64,
                }),
            }
        }

        fn page_from(&self, from: u64) -> Page<RecordView> {
            let total = self.total.load(Ordering::SeqCst);
            let last = (from + self.page_size as u64).min(total);
            let slots = (from + 1..=last).map(|h| Slot::Filled(Self::view(h))).collect();
            Page::from_slots(from, total, self.page_size, slots)
        }

        async fn enter(&self) -> ExplorerResult<()> {
            if self.gated.load(Ordering::SeqCst) {
                self.entered.notify_one();
                self.gate
                    .acquire()
                    .await
                    .map_err(|_| ExplorerError::Internal("gate closed".to_string()))?
                    .forget();
            }
            if self.stall_next.swap(false, Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(ExplorerError::BackendUnavailable("offline".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ExplorerBackend for MockBackend {
        async fn page_size(&self) -> ExplorerResult<usize> {
            Ok(self.page_size)
        }

        async fn count(&self, _kind: EntityKind) -> ExplorerResult<u64> {
            self.enter().await?;
            Ok(self.total.load(Ordering::SeqCst))
        }

        async fn count_by_parent(&self, kind: EntityKind, _parent: &str) -> ExplorerResult<u64> {
            self.count(kind).await
        }

        async fn list(&self, _kind: EntityKind, from: u64) -> ExplorerResult<Page<RecordView>> {
            self.froms.lock().expect("froms").push(from);
            Ok(self.page_from(from))
        }

        async fn list_by_parent(
            &self,
            kind: EntityKind,
            _parent: &str,
            from: u64,
        ) -> ExplorerResult<Page<RecordView>> {
            self.list(kind, from).await
        }

        async fn search(&self, _kind: EntityKind, term: &str) -> ExplorerResult<Page<RecordView>> {
            self.enter().await?;
            self.searches.lock().expect("searches").push(term.to_string());
            let total = self.total.load(Ordering::SeqCst);
            let slots = vec![Slot::Filled(Self::view(total))];
            Ok(Page::from_slots(0, 1, 4, slots))
        }
    }

    fn settings(refresh_interval: Duration, fetch_timeout: Duration) -> ViewSettings {
        ViewSettings {
            page_size: 10,
            refresh_interval,
            fetch_timeout,
        }
    }

    fn open(backend: &Arc<MockBackend>, settings: ViewSettings) -> ViewHandle {
        let backend: Arc<dyn ExplorerBackend> = backend.clone();
        open_view(
            backend,
            ViewTarget::all(EntityKind::Block),
            settings,
            Bus::new(16),
        )
        .expect("open view")
    }

    async fn wait_until(handle: &ViewHandle, ready: impl FnMut(&ViewState) -> bool) -> ViewState {
        let mut rx = handle.subscribe();
        let state = tokio::time::timeout(WAIT, rx.wait_for(ready))
            .await
            .expect("timeout")
            .expect("view state")
            .clone();
        state
    }

    async fn next_event(events: &mut broadcast::Receiver<ExplorerEvent>) -> ExplorerEvent {
        tokio::time::timeout(WAIT, events.recv())
            .await
            .expect("timeout")
            .expect("event")
    }

    #[tokio::test]
    async fn first_tick_loads_latest_page() {
        let backend = Arc::new(MockBackend::new(25, 10));
        let handle = open(&backend, settings(Duration::from_secs(60), WAIT));

        let state = wait_until(&handle, |state| state.fetches == 1).await;
        assert_eq!(state.total, 25);
        assert!(state.connected);
        assert_eq!(
            state.heights(),
            (16..=25).rev().map(Some).collect::<Vec<_>>()
        );
        assert_eq!(backend.froms(), vec![15]);
        handle.close().await;
    }

    #[tokio::test]
    async fn last_page_overlaps_instead_of_shrinking() {
        let backend = Arc::new(MockBackend::new(25, 10));
        let handle = open(&backend, settings(Duration::from_secs(60), WAIT));
        wait_until(&handle, |state| state.fetches == 1).await;

        handle.page_change(7);
        let state = wait_until(&handle, |state| state.fetches == 2).await;
        assert_eq!(state.page, 2);
        assert_eq!(
            state.heights(),
            (1..=10).rev().map(Some).collect::<Vec<_>>()
        );
        assert_eq!(backend.froms(), vec![15, 0]);
        handle.close().await;
    }

    #[tokio::test]
    async fn short_backend_pages_are_rejected() {
        let backend = Arc::new(MockBackend::new(12, 4));
        let handle = open(&backend, settings(Duration::from_secs(60), WAIT));

        let state = wait_until(&handle, |state| state.fetches == 1).await;
        assert!(!state.connected);
        assert_eq!(
            state.last_error.as_deref(),
            Some("invalid input: backend pages hold 4 blocks, view expects 10")
        );
        assert_eq!(state.heights(), vec![None; 10]);
        handle.close().await;
    }

    #[tokio::test]
    async fn page_requests_made_during_a_fetch_coalesce() {
        let backend = Arc::new(MockBackend::gated(100, 10));
        let handle = open(&backend, settings(Duration::from_secs(60), WAIT));

        tokio::time::timeout(WAIT, backend.entered.notified())
            .await
            .expect("first fetch started");
        assert_eq!(handle.page_change(5), Posted::Queued);
        assert_eq!(handle.page_change(6), Posted::Replaced);
        assert_eq!(handle.page_change(2), Posted::Replaced);
        assert_eq!(handle.page_change(9), Posted::Replaced);
        backend.release();

        let state = wait_until(&handle, |state| state.fetches == 2).await;
        assert_eq!(state.page, 9);
        assert_eq!(backend.froms(), vec![90, 0]);
        assert_eq!(state.heights()[0], Some(10));
        handle.close().await;
    }

    #[tokio::test]
    async fn close_during_fetch_discards_it() {
        let backend = Arc::new(MockBackend::gated(100, 10));
        let handle = open(&backend, settings(Duration::from_secs(60), WAIT));
        tokio::time::timeout(WAIT, backend.entered.notified())
            .await
            .expect("first fetch started");

        handle.close().await;
        backend.release();

        let state = handle.state();
        assert!(state.closed);
        assert_eq!(state.fetches, 0);
        assert!(backend.froms().is_empty());
        assert_eq!(handle.page_change(1), Posted::Closed);
        assert!(handle.is_closed());

        handle.close().await;
    }

    #[tokio::test]
    async fn refresh_pauses_away_from_first_page() {
        let backend = Arc::new(MockBackend::new(40, 10));
        let handle = open(&backend, settings(Duration::from_millis(20), WAIT));
        wait_until(&handle, |state| state.fetches >= 1).await;

        handle.page_change(2);
        wait_until(&handle, |state| state.page == 2 && state.disable_update).await;
        let calls = backend.froms().len();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(backend.froms().len(), calls);

        handle.page_change(0);
        wait_until(&handle, |state| state.page == 0 && !state.disable_update).await;
        let resumed = backend.froms().len();
        tokio::time::timeout(WAIT, async {
            while backend.froms().len() <= resumed + 1 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("refresh resumed");
        handle.close().await;
    }

    #[tokio::test]
    async fn timed_out_fetch_keeps_the_loop_running() {
        let backend = Arc::new(MockBackend::new(12, 10));
        backend.stall_next.store(true, Ordering::SeqCst);
        let handle = open(
            &backend,
            settings(Duration::from_secs(60), Duration::from_millis(50)),
        );

        let state = wait_until(&handle, |state| state.fetches == 1).await;
        assert!(!state.connected);
        assert_eq!(
            state.last_error.as_deref(),
            Some("timed out after 50 ms")
        );

        handle.page_change(0);
        let state = wait_until(&handle, |state| state.fetches == 2).await;
        assert!(state.connected);
        assert_eq!(state.heights()[0], Some(12));
        handle.close().await;
    }

    #[tokio::test]
    async fn failed_refresh_keeps_stale_items() {
        let backend = Arc::new(MockBackend::new(3, 10));
        let handle = open(&backend, settings(Duration::from_secs(60), WAIT));
        let loaded = wait_until(&handle, |state| state.fetches == 1).await;

        backend.fail.store(true, Ordering::SeqCst);
        handle.page_change(0);
        let state = wait_until(&handle, |state| state.fetches == 2).await;
        assert!(!state.connected);
        assert_eq!(state.items, loaded.items);

        backend.fail.store(false, Ordering::SeqCst);
        backend.total.store(4, Ordering::SeqCst);
        handle.page_change(0);
        let state = wait_until(&handle, |state| state.fetches == 3).await;
        assert!(state.connected);
        assert_eq!(state.heights()[0], Some(4));
        handle.close().await;
    }

    #[tokio::test]
    async fn search_replaces_items_until_cleared() {
        let backend = Arc::new(MockBackend::new(30, 10));
        let handle = open(&backend, settings(Duration::from_secs(60), WAIT));
        wait_until(&handle, |state| state.fetches == 1).await;

        handle.search("1e");
        let state = wait_until(&handle, |state| state.fetches == 2).await;
        assert_eq!(state.search.as_deref(), Some("1e"));
        assert!(state.disable_update);
        assert_eq!(state.heights(), vec![Some(30), None, None, None]);
        assert_eq!(*backend.searches.lock().expect("searches"), vec!["1e"]);

        handle.search("");
        let state = wait_until(&handle, |state| state.fetches == 3).await;
        assert_eq!(state.search, None);
        assert_eq!(state.items.len(), 10);
        assert!(!state.disable_update);
        handle.close().await;
    }

    #[tokio::test]
    async fn events_follow_the_view_lifecycle() {
        let backend: Arc<dyn ExplorerBackend> = Arc::new(MockBackend::new(2, 10));
        let bus = Bus::new(16);
        let mut events = bus.subscribe();
        let handle = open_view(
            backend,
            ViewTarget::children_of(EntityKind::Transaction, "0xAB").expect("target"),
            settings(Duration::from_secs(60), WAIT),
            bus,
        )
        .expect("open view");

        assert!(matches!(
            next_event(&mut events).await,
            ExplorerEvent::ViewOpened { parent: Some(ref p), .. } if p == "ab"
        ));
        assert!(matches!(
            next_event(&mut events).await,
            ExplorerEvent::PageLoaded { page: 0, total: 2, .. }
        ));
        handle.close().await;
        let closed = next_event(&mut events).await;
        assert_eq!(closed, ExplorerEvent::ViewClosed { view_id: handle.id() });
    }
}
