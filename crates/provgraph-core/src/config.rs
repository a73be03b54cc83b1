//! Configuration for opening a graph store.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`PROVGRAPH__STORE__` prefix)
//! 2. Config file (`provgraph.toml`, `[store]` section)
//! 3. Defaults

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Special `db_path` value that opens a private in-memory store.
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Backing-store settings for a `GraphStore`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    /// SQLite database file (default: "provgraph.db").
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// How long a writer waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Use write-ahead logging so readers do not block on the writer.
    #[serde(default = "default_true")]
    pub wal: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("provgraph.db")
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            wal: default_true(),
        }
    }
}

impl StoreConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Default::default()
        }
    }

    /// A config for a throwaway in-memory store.
    pub fn in_memory() -> Self {
        Self::new(IN_MEMORY_PATH)
    }

    pub fn is_in_memory(&self) -> bool {
        self.db_path == Path::new(IN_MEMORY_PATH)
    }

    /// Load the `[store]` section from `<file_prefix>.toml` and the environment.
    ///
    /// A missing file or section yields the defaults; a present but invalid
    /// value is an error.
    pub fn load(file_prefix: &str) -> Result<Self, config::ConfigError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("PROVGRAPH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        match cfg.get::<StoreConfig>("store") {
            Ok(c) => Ok(c),
            Err(config::ConfigError::NotFound(_)) => Ok(StoreConfig::default()),
            Err(e) => Err(e),
        }
    }
}
