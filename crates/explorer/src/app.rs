use std::sync::Arc;

use chainstore::EntityKind;
use tokio::sync::broadcast;

use crate::bus::Bus;
use crate::client::{ExplorerBackend, HttpBackend, LocalBackend};
use crate::config::ExplorerConfig;
use crate::error::ExplorerResult;
use crate::event::ExplorerEvent;
use crate::query::QueryService;
use crate::view::{open_view, ViewHandle, ViewSettings, ViewTarget};

const BUS_CAPACITY: usize = 256;

/// Shared application state: where views read from, how they page, and the
/// bus their events go out on.
#[derive(Clone)]
pub struct Explorer {
    backend: Arc<dyn ExplorerBackend>,
    settings: ViewSettings,
    bus: Bus,
}

impl Explorer {
    pub fn new(backend: Arc<dyn ExplorerBackend>, settings: ViewSettings) -> Self {
        Self {
            backend,
            settings,
            bus: Bus::new(BUS_CAPACITY),
        }
    }

    /// Views read the in-process store directly, paging at the query
    /// service's page size.
    pub fn local(query: Arc<QueryService>, config: &ExplorerConfig) -> Self {
        let settings = ViewSettings {
            page_size: query.page_size(),
            ..ViewSettings::from(config)
        };
        Self::new(Arc::new(LocalBackend::new(query)), settings)
    }

    /// Views read a running explorer server at `base_url`. The page size is
    /// the server's, whatever `config` says.
    pub async fn remote(base_url: &str, config: &ExplorerConfig) -> ExplorerResult<Self> {
        let backend = HttpBackend::new(base_url, config.fetch_timeout())?;
        let page_size = backend.page_size().await?;
        if page_size != config.page_size {
            tracing::info!(
                "using server page size {} instead of configured {}",
                page_size,
                config.page_size
            );
        }
        let settings = ViewSettings {
            page_size,
            ..ViewSettings::from(config)
        };
        Ok(Self::new(Arc::new(backend), settings))
    }

    pub fn settings(&self) -> ViewSettings {
        self.settings
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExplorerEvent> {
        self.bus.subscribe()
    }

    pub fn open_view(&self, target: ViewTarget) -> ExplorerResult<ViewHandle> {
        open_view(
            Arc::clone(&self.backend),
            target,
            self.settings,
            self.bus.clone(),
        )
    }

    pub fn open_kind(&self, kind: EntityKind) -> ExplorerResult<ViewHandle> {
        self.open_view(ViewTarget::all(kind))
    }

    pub fn open_children(&self, kind: EntityKind, parent: &str) -> ExplorerResult<ViewHandle> {
        self.open_view(ViewTarget::children_of(kind, parent)?)
    }
}
