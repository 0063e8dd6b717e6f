//! Fetch backends used by views.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chainstore::EntityKind;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::error::{ExplorerError, ExplorerResult};
use crate::page::{Page, PageResponse};
use crate::query::{QueryService, Stats};
use crate::server::error::{explorer_error_from_body, ApiErrorResponse};
use crate::types::RecordView;

/// The reads a view needs.
#[async_trait]
pub trait ExplorerBackend: Send + Sync {
    /// Slots per listing page, fixed by whoever serves the reads.
    async fn page_size(&self) -> ExplorerResult<usize>;

    async fn count(&self, kind: EntityKind) -> ExplorerResult<u64>;

    async fn count_by_parent(&self, kind: EntityKind, parent: &str) -> ExplorerResult<u64>;

    async fn list(&self, kind: EntityKind, from: u64) -> ExplorerResult<Page<RecordView>>;

    async fn list_by_parent(
        &self,
        kind: EntityKind,
        parent: &str,
        from: u64,
    ) -> ExplorerResult<Page<RecordView>>;

    async fn search(&self, kind: EntityKind, term: &str) -> ExplorerResult<Page<RecordView>>;
}

/// Reads an in-process [`QueryService`] on the blocking pool.
#[derive(Clone)]
pub struct LocalBackend {
    query: Arc<QueryService>,
}

impl LocalBackend {
    pub fn new(query: Arc<QueryService>) -> Self {
        Self { query }
    }

    async fn run<T, F>(&self, f: F) -> ExplorerResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&QueryService) -> ExplorerResult<T> + Send + 'static,
    {
        let query = Arc::clone(&self.query);
        tokio::task::spawn_blocking(move || f(&query))
            .await
            .map_err(|error| ExplorerError::Internal(format!("query task failed: {error}")))?
    }
}

#[async_trait]
impl ExplorerBackend for LocalBackend {
    async fn page_size(&self) -> ExplorerResult<usize> {
        Ok(self.query.page_size())
    }

    async fn count(&self, kind: EntityKind) -> ExplorerResult<u64> {
        self.run(move |query| query.count(kind)).await
    }

    async fn count_by_parent(&self, kind: EntityKind, parent: &str) -> ExplorerResult<u64> {
        let parent = parent.to_string();
        self.run(move |query| query.count_by_parent(kind, &parent)).await
    }

    async fn list(&self, kind: EntityKind, from: u64) -> ExplorerResult<Page<RecordView>> {
        self.run(move |query| query.list(kind, from)).await
    }

    async fn list_by_parent(
        &self,
        kind: EntityKind,
        parent: &str,
        from: u64,
    ) -> ExplorerResult<Page<RecordView>> {
        let parent = parent.to_string();
        self.run(move |query| query.list_by_parent(kind, &parent, from))
            .await
    }

    async fn search(&self, kind: EntityKind, term: &str) -> ExplorerResult<Page<RecordView>> {
        let term = term.to_string();
        self.run(move |query| query.search(kind, &term)).await
    }
}

/// Reads a remote explorer over its HTTP API.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ExplorerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| ExplorerError::Internal(format!("failed to build http client: {error}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ExplorerResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|error| ExplorerError::BackendUnavailable(format!("GET {url}: {error}")))?;

        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|error| {
                ExplorerError::DecodeFailure(format!("GET {url}: invalid body: {error}"))
            });
        }

        let message = response.text().await.map_err(|error| {
            ExplorerError::BackendUnavailable(format!("GET {url}: {status}: unreadable body: {error}"))
        })?;
        match serde_json::from_str::<ApiErrorResponse>(&message) {
            Ok(body) => Err(explorer_error_from_body(status, &body.error)),
            Err(_) if status == StatusCode::NOT_FOUND => {
                Err(ExplorerError::NotFound(format!("GET {url}")))
            }
            Err(_) => Err(ExplorerError::BackendUnavailable(format!(
                "GET {url}: {status}"
            ))),
        }
    }

    async fn get_page(&self, path: &str, query: &[(&str, String)]) -> ExplorerResult<Page<RecordView>> {
        let response: PageResponse = self.get_json(path, query).await?;
        Ok(response.into())
    }
}

#[async_trait]
impl ExplorerBackend for HttpBackend {
    async fn page_size(&self) -> ExplorerResult<usize> {
        let stats: Stats = self.get_json("/api/stats", &[]).await?;
        Ok(stats.page_size)
    }

    async fn count(&self, kind: EntityKind) -> ExplorerResult<u64> {
        self.get_json(&format!("/api/{kind}/count"), &[]).await
    }

    async fn count_by_parent(&self, kind: EntityKind, parent: &str) -> ExplorerResult<u64> {
        self.get_json(
            &format!("/api/{kind}/countbyparent"),
            &[("parent", parent.to_string())],
        )
        .await
    }

    async fn list(&self, kind: EntityKind, from: u64) -> ExplorerResult<Page<RecordView>> {
        self.get_page(&format!("/api/{kind}/list"), &[("from", from.to_string())])
            .await
    }

    async fn list_by_parent(
        &self,
        kind: EntityKind,
        parent: &str,
        from: u64,
    ) -> ExplorerResult<Page<RecordView>> {
        self.get_page(
            &format!("/api/{kind}/byparent"),
            &[("parent", parent.to_string()), ("from", from.to_string())],
        )
        .await
    }

    async fn search(&self, kind: EntityKind, term: &str) -> ExplorerResult<Page<RecordView>> {
        self.get_page(&format!("/api/{kind}/search"), &[("term", term.to_string())])
            .await
    }
}
