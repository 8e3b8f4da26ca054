use std::path::PathBuf;

use dbshift_common::Dialect;
use serde::{Deserialize, Serialize};

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_STORE_FILE: &str = "store.db";

/// Configuration for a single SQL store and how it is upgraded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database file. `None` resolves to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Passed through to migration steps; never interpreted by the runner.
    #[serde(default)]
    pub dialect: Dialect,

    #[serde(default)]
    pub journal_mode: JournalMode,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    #[serde(default = "default_true")]
    pub foreign_keys: bool,

    /// Bring the schema to the latest version as part of opening the store.
    #[serde(default = "default_true")]
    pub auto_upgrade: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            dialect: Dialect::default(),
            journal_mode: JournalMode::default(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            foreign_keys: true,
            auto_upgrade: true,
        }
    }
}

impl StoreConfig {
    /// The configured path, or `<data dir>/dbshift/store.db`.
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(default_store_path)
    }
}

/// Default location of the store file.
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dbshift")
        .join(DEFAULT_STORE_FILE)
}

/// SQLite `journal_mode` pragma values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    #[default]
    Wal,
    Delete,
    Truncate,
    Memory,
}

impl JournalMode {
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
            Self::Truncate => "truncate",
            Self::Memory => "memory",
        }
    }
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

fn default_true() -> bool {
    true
}
