use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};

use crate::query::QueryService;

pub mod api;
pub mod error;
pub mod openapi;

pub struct Server {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Server {
    /// Binds `addr` (port 0 picks a free port) and serves the read API in
    /// the background until [`Server::shutdown`] or drop.
    pub async fn start(query: Arc<QueryService>, addr: SocketAddr) -> Result<Self, String> {
        let app = router(query);
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|error| error.to_string())?;
        let addr = listener
            .local_addr()
            .map_err(|error| error.to_string())?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(error) = result {
                tracing::warn!("explorer server stopped: {}", error);
            }
        });

        tracing::info!("explorer API listening on http://{}", addr);
        Ok(Server {
            addr,
            shutdown: Some(shutdown_tx),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn shutdown(&mut self) -> Result<(), String> {
        if let Some(sender) = self.shutdown.take() {
            sender
                .send(())
                .map_err(|_| "failed to send server shutdown signal".to_string())
        } else {
            Ok(())
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

pub fn router(query: Arc<QueryService>) -> Router {
    let state = Arc::new(ServerState { query });
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    Router::new()
        .route("/ping", get(api::ping))
        .route("/api/stats", get(api::stats))
        .route("/api/:kind/list", get(api::list))
        .route("/api/:kind/item", get(api::item))
        .route("/api/:kind/key", get(api::by_key))
        .route("/api/:kind/search", get(api::search))
        .route("/api/:kind/count", get(api::count))
        .route("/api/:kind/byparent", get(api::by_parent))
        .route("/api/:kind/countbyparent", get(api::count_by_parent))
        .route("/api/:kind/countmap", get(api::count_map))
        .with_state(state)
        .layer(cors)
}

pub(crate) struct ServerState {
    pub(crate) query: Arc<QueryService>,
}
