pub mod server;

pub mod app;
pub mod bus;
pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod ingest;
pub mod page;
pub mod query;
pub mod types;
pub mod view;

pub use crate::app::Explorer;
pub use crate::client::{ExplorerBackend, HttpBackend, LocalBackend};
pub use crate::config::{load_explorer_config, ExplorerConfig};
pub use crate::error::{ExplorerError, ExplorerResult};
pub use crate::event::ExplorerEvent;
pub use crate::page::{Page, PageResponse, Slot};
pub use crate::query::{QueryService, Stats, Window};
pub use crate::types::{AnyRecord, ChainRecord, RecordView};
pub use crate::view::{ViewHandle, ViewSettings, ViewState, ViewTarget};
