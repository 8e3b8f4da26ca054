use dbshift_common::{Dialect, Error, Result};
use rusqlite::Transaction;
use tracing::debug;

/// Store-level settings a migration step may consult. Read-only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreContext {
    pub dialect: Dialect,
}

impl StoreContext {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }
}

/// One step of the upgrade sequence.
///
/// A step has no version of its own: its position in the sequence is its
/// identity, and step `i` takes the schema from version `i` to `i + 1`.
/// Once released, a step must keep both its position and its behavior.
pub trait Migration: Send + Sync {
    /// Human-readable label used in logs and errors.
    fn name(&self) -> &str;

    /// Apply the step inside `tx`. The runner records the new version in the
    /// same transaction and commits it; the step must not commit itself.
    fn apply(&self, tx: &Transaction<'_>, ctx: &StoreContext) -> Result<()>;
}

/// A step that executes a fixed SQL batch.
pub struct SqlMigration {
    pub name: &'static str,
    pub sql: &'static str,
}

impl SqlMigration {
    pub const fn new(name: &'static str, sql: &'static str) -> Self {
        Self { name, sql }
    }
}

impl Migration for SqlMigration {
    fn name(&self) -> &str {
        self.name
    }

    fn apply(&self, tx: &Transaction<'_>, _ctx: &StoreContext) -> Result<()> {
        tx.execute_batch(self.sql)
            .map_err(|e| Error::Database(e.to_string()))
    }
}

/// A step backed by a closure, for sequences assembled at runtime.
pub struct FnMigration<F> {
    name: String,
    apply: F,
}

impl<F> FnMigration<F> {
    pub fn new(name: impl Into<String>, apply: F) -> Self
    where
        F: Fn(&Transaction<'_>, &StoreContext) -> Result<()> + Send + Sync,
    {
        Self {
            name: name.into(),
            apply,
        }
    }
}

impl<F> Migration for FnMigration<F>
where
    F: Fn(&Transaction<'_>, &StoreContext) -> Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, tx: &Transaction<'_>, ctx: &StoreContext) -> Result<()> {
        (self.apply)(tx, ctx)
    }
}

/// Placeholder for a step whose content was withdrawn after release.
///
/// It changes nothing but still occupies its index, so stores that already
/// passed it and stores that have not yet reached it agree on what every
/// later version means.
pub struct RetiredMigration {
    pub name: &'static str,
}

impl RetiredMigration {
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl Migration for RetiredMigration {
    fn name(&self) -> &str {
        self.name
    }

    fn apply(&self, _tx: &Transaction<'_>, _ctx: &StoreContext) -> Result<()> {
        debug!("migration {} is retired, nothing to apply", self.name);
        Ok(())
    }
}
