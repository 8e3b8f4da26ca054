use dbshift_common::{Error, Result};
use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::migrations::{Migration, StoreContext};
use crate::version_store::VersionStore;

/// Drives an ordered migration sequence to completion against one connection.
///
/// Every step runs in its own transaction together with the version bump
/// that records it, so the persisted version always names the last step that
/// fully committed. A failed run can be retried by calling [`upgrade`] again.
///
/// [`upgrade`]: MigrationRunner::upgrade
pub struct MigrationRunner {
    migrations: Vec<Box<dyn Migration>>,
    context: StoreContext,
}

impl MigrationRunner {
    pub fn new(migrations: Vec<Box<dyn Migration>>) -> Self {
        Self {
            migrations,
            context: StoreContext::default(),
        }
    }

    pub fn with_context(mut self, context: StoreContext) -> Self {
        self.context = context;
        self
    }

    pub fn context(&self) -> &StoreContext {
        &self.context
    }

    pub fn migrations(&self) -> &[Box<dyn Migration>] {
        &self.migrations
    }

    /// The version a fully upgraded store reports.
    pub fn latest_version(&self) -> u32 {
        self.migrations.len() as u32
    }

    pub fn current_version(&self, conn: &Connection) -> Result<u32> {
        VersionStore::new(conn).get_version()
    }

    /// Apply every pending step in order, stopping at the first failure.
    pub fn upgrade(&self, conn: &mut Connection) -> Result<()> {
        let mut version = self.current_version(conn)?;
        let latest = self.latest_version();

        if version > latest {
            warn!(
                "schema version v{version} is newer than the latest known migration v{latest}, \
                 leaving it untouched"
            );
            return Ok(());
        }
        if version == latest {
            debug!("schema is up to date at v{version}");
            return Ok(());
        }

        while version < latest {
            let migration = self.migrations[version as usize].as_ref();
            self.apply_step(conn, migration, version + 1)?;
            version += 1;
        }

        info!("database upgraded to v{version}");
        Ok(())
    }

    fn apply_step(
        &self,
        conn: &mut Connection,
        migration: &dyn Migration,
        target: u32,
    ) -> Result<()> {
        // Dropping `tx` on any early return rolls it back.
        let tx = conn.transaction().map_err(|e| Error::Transaction {
            version: target,
            message: e.to_string(),
        })?;

        info!("upgrading database to v{target} ({})", migration.name());
        if let Err(e) = migration.apply(&tx, &self.context) {
            if let Err(rollback_err) = tx.rollback() {
                warn!("rollback of v{target} failed: {rollback_err}");
            }
            return Err(Error::StepExecution {
                version: target,
                name: migration.name().to_string(),
                message: e.to_string(),
            });
        }

        // A step that committed or rolled back on its own would leave the
        // version write running outside any transaction.
        if tx.is_autocommit() {
            return Err(Error::StepExecution {
                version: target,
                name: migration.name().to_string(),
                message: "step ended its own transaction".into(),
            });
        }

        VersionStore::set_version(&tx, target)?;

        tx.commit().map_err(|e| Error::Commit {
            version: target,
            message: e.to_string(),
        })
    }
}
