use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chainstore::MAX_SEARCH_LIMIT;

use crate::error::{ExplorerError, ExplorerResult};

pub const EXPLORER_CONFIG_FILENAME: &str = "explorer.json";
pub const EXPLORER_CONFIG_VERSION: &str = "1.0.0";

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8081";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorerConfig {
    pub version: String,
    pub data_dir: PathBuf,
    pub chain_id: String,
    pub bind_addr: String,
    pub page_size: usize,
    pub search_limit: usize,
    pub refresh_interval_secs: u64,
    pub fetch_timeout_ms: u64,
    pub log_level: String,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            version: EXPLORER_CONFIG_VERSION.to_string(),
            data_dir: PathBuf::from("data"),
            chain_id: "main".to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            search_limit: DEFAULT_PAGE_SIZE,
            refresh_interval_secs: 5,
            fetch_timeout_ms: 5_000,
            log_level: "info".to_string(),
        }
    }
}

impl ExplorerConfig {
    pub fn bind_addr(&self) -> ExplorerResult<SocketAddr> {
        self.bind_addr.parse().map_err(|error| {
            ExplorerError::InvalidInput(format!("invalid bind address {}: {error}", self.bind_addr))
        })
    }

    /// Search limit after applying the store's hard cap.
    pub fn effective_search_limit(&self) -> usize {
        self.search_limit.min(MAX_SEARCH_LIMIT)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Applies `EXPLORER_*` environment overrides through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("EXPLORER_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(chain_id) = lookup("EXPLORER_CHAIN_ID") {
            self.chain_id = chain_id;
        }
        if let Some(addr) = lookup("EXPLORER_BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(level) = lookup("EXPLORER_LOG_LEVEL") {
            self.log_level = level;
        }
    }

    pub fn validate(&self) -> ExplorerResult<()> {
        if self.page_size == 0 {
            return Err(ExplorerError::InvalidInput(
                "page_size must be at least 1".to_string(),
            ));
        }
        if self.search_limit == 0 {
            return Err(ExplorerError::InvalidInput(
                "search_limit must be at least 1".to_string(),
            ));
        }
        if self.chain_id.trim().is_empty() {
            return Err(ExplorerError::InvalidInput("chain_id is empty".to_string()));
        }
        if self.refresh_interval_secs == 0 {
            return Err(ExplorerError::InvalidInput(
                "refresh_interval_secs must be at least 1".to_string(),
            ));
        }
        self.bind_addr()?;
        Ok(())
    }
}

pub fn load_or_create_explorer_config(dir: &Path) -> ExplorerResult<ExplorerConfig> {
    std::fs::create_dir_all(dir).map_err(|error| {
        ExplorerError::Internal(format!(
            "failed to create config directory {}: {error}",
            dir.display()
        ))
    })?;

    let path = explorer_config_path(dir);
    if !path.exists() {
        let config = ExplorerConfig::default();
        write_explorer_config(&path, &config)?;
        return Ok(config);
    }

    let data = std::fs::read_to_string(&path).map_err(|error| {
        ExplorerError::Internal(format!(
            "failed to read explorer config {}: {error}",
            path.display()
        ))
    })?;
    let config: ExplorerConfig = serde_json::from_str(&data).map_err(|error| {
        ExplorerError::InvalidInput(format!(
            "failed to parse explorer config {}: {error}",
            path.display()
        ))
    })?;

    if config.version != EXPLORER_CONFIG_VERSION {
        return Err(ExplorerError::InvalidInput(format!(
            "unsupported explorer config version {} (expected {EXPLORER_CONFIG_VERSION})",
            config.version
        )));
    }

    Ok(config)
}

/// Loads the config file, then `.env`, then process environment overrides.
pub fn load_explorer_config(dir: &Path) -> ExplorerResult<ExplorerConfig> {
    let _ = dotenvy::from_path(dir.join(".env"));
    let mut config = load_or_create_explorer_config(dir)?;
    config.apply_overrides(|name| std::env::var(name).ok());
    config.validate()?;
    Ok(config)
}

pub fn explorer_config_path(dir: &Path) -> PathBuf {
    dir.join(EXPLORER_CONFIG_FILENAME)
}

fn write_explorer_config(path: &Path, config: &ExplorerConfig) -> ExplorerResult<()> {
    let data = serde_json::to_string_pretty(config).map_err(|error| {
        ExplorerError::Internal(format!(
            "failed to serialize explorer config {}: {error}",
            path.display()
        ))
    })?;
    std::fs::write(path, data).map_err(|error| {
        ExplorerError::Internal(format!(
            "failed to write explorer config {}: {error}",
            path.display()
        ))
    })?;
    Ok(())
}
