use dbshift_common::{Error, Result};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use tracing::debug;

/// Bookkeeping table holding the single schema version row.
pub const VERSION_TABLE: &str = "store_version";

/// Reads and writes the persisted schema version.
///
/// The version lives in a one-column, one-row table. A store that has never
/// been upgraded (no table, or an empty table) is at version 0.
pub struct VersionStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> VersionStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Create the bookkeeping table if needed, then read the version.
    pub fn get_version(&self) -> Result<u32> {
        self.conn
            .execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {VERSION_TABLE} (version INTEGER)"
            ))
            .map_err(|e| Error::Bookkeeping(format!("failed to create version table: {e}")))?;

        let stored: Option<Option<i64>> = self
            .conn
            .query_row(
                &format!("SELECT version FROM {VERSION_TABLE} LIMIT 1"),
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::Bookkeeping(format!("failed to read schema version: {e}")))?;

        match stored {
            None => {
                debug!("no schema version recorded, treating store as fresh");
                Ok(0)
            }
            Some(None) => Err(Error::Bookkeeping("schema version is NULL".into())),
            Some(Some(raw)) => u32::try_from(raw)
                .map_err(|_| Error::Bookkeeping(format!("invalid schema version: {raw}"))),
        }
    }

    /// Replace the stored version inside `tx`.
    ///
    /// Delete-then-insert keeps the table at exactly one row whether or not a
    /// row existed before. Takes a transaction so the bump can only land
    /// together with the step that earned it.
    pub fn set_version(tx: &Transaction<'_>, version: u32) -> Result<()> {
        let write_err = |e: rusqlite::Error| Error::VersionWrite {
            version,
            message: e.to_string(),
        };

        tx.execute(&format!("DELETE FROM {VERSION_TABLE}"), [])
            .map_err(write_err)?;
        tx.execute(
            &format!("INSERT INTO {VERSION_TABLE} (version) VALUES (?1)"),
            params![version],
        )
        .map_err(write_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_count(conn: &Connection) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {VERSION_TABLE}"), [], |row| {
            row.get(0)
        })
        .unwrap()
    }

    #[test]
    fn fresh_store_reads_zero_and_creates_table() {
        let conn = Connection::open_in_memory().unwrap();
        let store = VersionStore::new(&conn);

        assert_eq!(store.get_version().unwrap(), 0);
        assert_eq!(row_count(&conn), 0);
        // Second read is unchanged and does not fail on the existing table.
        assert_eq!(store.get_version().unwrap(), 0);
    }

    #[test]
    fn set_version_keeps_a_single_row() {
        let mut conn = Connection::open_in_memory().unwrap();
        VersionStore::new(&conn).get_version().unwrap();

        for version in [1, 2, 7] {
            let tx = conn.transaction().unwrap();
            VersionStore::set_version(&tx, version).unwrap();
            tx.commit().unwrap();
        }

        assert_eq!(row_count(&conn), 1);
        assert_eq!(VersionStore::new(&conn).get_version().unwrap(), 7);
    }

    #[test]
    fn uncommitted_version_is_not_visible() {
        let mut conn = Connection::open_in_memory().unwrap();
        VersionStore::new(&conn).get_version().unwrap();

        {
            let tx = conn.transaction().unwrap();
            VersionStore::set_version(&tx, 4).unwrap();
            // dropped without commit
        }

        assert_eq!(VersionStore::new(&conn).get_version().unwrap(), 0);
    }

    #[test]
    fn set_version_without_table_is_a_write_error() {
        let mut conn = Connection::open_in_memory().unwrap();
        let tx = conn.transaction().unwrap();
        let err = VersionStore::set_version(&tx, 1).unwrap_err();
        assert!(matches!(err, Error::VersionWrite { version: 1, .. }));
    }

    #[test]
    fn negative_version_is_a_bookkeeping_error() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE store_version (version INTEGER);
             INSERT INTO store_version (version) VALUES (-3);",
        )
        .unwrap();

        let err = VersionStore::new(&conn).get_version().unwrap_err();
        assert!(matches!(err, Error::Bookkeeping(_)));
    }

    #[test]
    fn null_version_is_a_bookkeeping_error() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE store_version (version INTEGER);
             INSERT INTO store_version (version) VALUES (NULL);",
        )
        .unwrap();

        let err = VersionStore::new(&conn).get_version().unwrap_err();
        assert_eq!(err.to_string(), "bookkeeping error: schema version is NULL");
    }

    #[test]
    fn read_only_connection_cannot_create_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ro.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE unrelated (id INTEGER)")
            .unwrap();

        let conn = Connection::open_with_flags(
            &path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        )
        .unwrap();
        let err = VersionStore::new(&conn).get_version().unwrap_err();
        assert!(matches!(err, Error::Bookkeeping(_)));
    }
}
