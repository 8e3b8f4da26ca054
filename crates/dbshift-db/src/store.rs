use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use dbshift_common::{Dialect, Error, Result};
use dbshift_config::StoreConfig;
use rusqlite::Connection;
use tracing::info;

use crate::migrations::{Migration, StoreContext};
use crate::runner::MigrationRunner;
use crate::steps::default_migrations;

/// A SQLite store whose schema is kept current by a [`MigrationRunner`].
pub struct SqlStore {
    conn: Mutex<Connection>,
    runner: MigrationRunner,
    config: StoreConfig,
}

impl SqlStore {
    /// Open (creating if needed) the store described by `config` with the
    /// built-in upgrade sequence.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let path = config.resolved_path();
        info!("opening sql store at {}", path.display());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)
            .map_err(|e| Error::Database(format!("failed to open database: {e}")))?;

        Self::with_migrations(conn, config.clone(), default_migrations())
    }

    pub fn open_path(db_path: &Path) -> Result<Self> {
        Self::open(&StoreConfig {
            path: Some(db_path.to_path_buf()),
            ..Default::default()
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Database(format!("failed to open in-memory database: {e}")))?;

        Self::with_migrations(conn, StoreConfig::default(), default_migrations())
    }

    /// Wrap an existing connection with a caller-supplied upgrade sequence.
    pub fn with_migrations(
        conn: Connection,
        config: StoreConfig,
        migrations: Vec<Box<dyn Migration>>,
    ) -> Result<Self> {
        apply_pragmas(&conn, &config)?;

        let runner =
            MigrationRunner::new(migrations).with_context(StoreContext::new(config.dialect));
        let store = Self {
            conn: Mutex::new(conn),
            runner,
            config,
        };
        if store.config.auto_upgrade {
            store.upgrade()?;
        }
        Ok(store)
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Database("sql store lock poisoned".into()))
    }

    /// Bring the schema to the latest version. The connection stays locked
    /// for the whole run.
    pub fn upgrade(&self) -> Result<()> {
        let mut conn = self.connection()?;
        self.runner.upgrade(&mut conn)
    }

    /// The persisted schema version.
    pub fn version(&self) -> Result<u32> {
        let conn = self.connection()?;
        self.runner.current_version(&conn)
    }

    pub fn latest_version(&self) -> u32 {
        self.runner.latest_version()
    }

    pub fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Run `f` with the underlying connection locked.
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.connection()?;
        f(&conn)
    }
}

fn apply_pragmas(conn: &Connection, config: &StoreConfig) -> Result<()> {
    let foreign_keys = if config.foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!(
        "PRAGMA journal_mode={}; PRAGMA foreign_keys={foreign_keys};",
        config.journal_mode.pragma_value()
    ))
    .map_err(|e| Error::Database(format!("failed to set pragmas: {e}")))?;

    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|e| Error::Database(format!("failed to set busy timeout: {e}")))?;
    Ok(())
}
