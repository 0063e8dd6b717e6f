//! Runs the explorer read API over the local chain store.
//!
//! Usage: `cargo run --bin explorer`. The config directory defaults to the
//! working directory and can be set with `EXPLORER_CONFIG_DIR`.

use std::path::PathBuf;
use std::sync::Arc;

use chainstore::ChainStore;
use explorer::server::Server;
use explorer::{load_explorer_config, QueryService};

#[tokio::main]
async fn main() {
    let config_dir = std::env::var("EXPLORER_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."));

    let config = match load_explorer_config(&config_dir) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Failed to load config: {}", error);
            std::process::exit(1);
        }
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level.as_str()),
    )
    .init();

    let store = match ChainStore::open(&config.data_dir, &config.chain_id) {
        Ok(store) => Arc::new(store),
        Err(error) => {
            eprintln!("Failed to open chain store: {}", error);
            std::process::exit(1);
        }
    };
    let query = Arc::new(QueryService::new(
        Arc::clone(&store),
        config.page_size,
        config.effective_search_limit(),
    ));

    let addr = match config.bind_addr() {
        Ok(addr) => addr,
        Err(error) => {
            eprintln!("{}", error);
            std::process::exit(1);
        }
    };

    let mut server = match Server::start(query, addr).await {
        Ok(server) => server,
        Err(error) => {
            eprintln!("Failed to start server: {}", error);
            std::process::exit(1);
        }
    };
    println!("Explorer for chain {} listening on http://{}", config.chain_id, server.addr());
    println!("Press Ctrl+C to stop");

    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {}", error);
    }
    println!("\nShutting down...");

    if let Err(error) = server.shutdown() {
        tracing::warn!("{}", error);
    }
    if let Err(error) = store.persist() {
        tracing::warn!("failed to persist chain store: {}", error);
    }
}
