use dbshift_common::{Dialect, Error, Result};
use rusqlite::Transaction;

use crate::migrations::{Migration, StoreContext};

/// v0 -> v1. Creates the device store: device identity, Signal protocol
/// state (identity keys, sessions, sender keys), app state sync bookkeeping,
/// contacts and per-chat settings.
///
/// The app state sync key timestamp column is `timestamp` on Postgres, which
/// has no `datetime` type, and `datetime` everywhere else.
pub struct DeviceSchema;

impl Migration for DeviceSchema {
    fn name(&self) -> &str {
        "device_schema"
    }

    fn apply(&self, tx: &Transaction<'_>, ctx: &StoreContext) -> Result<()> {
        tx.execute_batch(&device_schema_sql(ctx.dialect))
            .map_err(|e| Error::Database(format!("device schema: {e}")))
    }
}

fn timestamp_type(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Postgres => "timestamp",
        Dialect::Sqlite | Dialect::Mysql => "datetime",
    }
}

fn device_schema_sql(dialect: Dialect) -> String {
    let timestamp = timestamp_type(dialect);
    format!(
        "CREATE TABLE IF NOT EXISTS store_device (
            jid                varchar(100) PRIMARY KEY,
            registration_id    BIGINT       NOT NULL,
            noise_key          varchar(32)  NOT NULL,
            identity_key       varchar(32)  NOT NULL,
            signed_pre_key     varchar(32)  NOT NULL,
            signed_pre_key_id  int          NOT NULL,
            signed_pre_key_sig varchar(64)  NOT NULL,
            adv_key            varchar(64)  NOT NULL,
            adv_details        varchar(64)  NOT NULL,
            adv_account_sig    varchar(64)  NOT NULL,
            adv_device_sig     varchar(64)  NOT NULL,
            platform           varchar(100) DEFAULT '' NOT NULL,
            business_name      varchar(100) DEFAULT '' NOT NULL,
            push_name          varchar(100) DEFAULT '' NOT NULL
        );

        CREATE TABLE IF NOT EXISTS store_identity_keys (
            our_jid  varchar(100) NOT NULL,
            their_id varchar(100),
            identity varchar(32)  NOT NULL,
            UNIQUE (our_jid, their_id)
        );

        CREATE TABLE IF NOT EXISTS store_sessions (
            our_jid  varchar(100),
            their_id varchar(100),
            session  varchar(5000),
            UNIQUE (our_jid, their_id)
        );

        CREATE TABLE IF NOT EXISTS store_sender_keys (
            our_jid    varchar(100),
            chat_id    varchar(100),
            sender_id  varchar(100),
            sender_key varchar(100) NOT NULL,
            UNIQUE (our_jid, chat_id, sender_id)
        );

        CREATE TABLE IF NOT EXISTS store_app_state_sync_keys (
            jid         varchar(100),
            key_id      varchar(64),
            key_data    varchar(64) NOT NULL,
            timestamp   {timestamp} NOT NULL,
            fingerprint varchar(64) NOT NULL,
            UNIQUE (jid, key_id)
        );

        CREATE TABLE IF NOT EXISTS store_app_state_version (
            jid     varchar(100),
            name    varchar(100),
            version BIGINT       NOT NULL,
            hash    varchar(500) NOT NULL,
            UNIQUE (jid, name)
        );

        CREATE TABLE IF NOT EXISTS store_app_state_mutation_macs (
            jid       varchar(100),
            name      varchar(100),
            version   BIGINT,
            index_mac varchar(500),
            value_mac varchar(500) NOT NULL,
            UNIQUE (jid, name, version, index_mac)
        );

        CREATE TABLE IF NOT EXISTS store_contacts (
            our_jid       varchar(100),
            their_jid     varchar(100),
            first_name    varchar(100),
            full_name     varchar(100),
            push_name     varchar(100),
            business_name varchar(100),
            UNIQUE (our_jid, their_jid)
        );

        CREATE TABLE IF NOT EXISTS store_chat_settings (
            our_jid     varchar(100),
            chat_jid    varchar(100),
            muted_until BIGINT DEFAULT 0 NOT NULL,
            pinned      int    DEFAULT 0 NOT NULL,
            archived    int    DEFAULT 0 NOT NULL,
            UNIQUE (our_jid, chat_jid)
        );"
    )
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::*;

    const TABLES: [&str; 9] = [
        "store_device",
        "store_identity_keys",
        "store_sessions",
        "store_sender_keys",
        "store_app_state_sync_keys",
        "store_app_state_version",
        "store_app_state_mutation_macs",
        "store_contacts",
        "store_chat_settings",
    ];

    fn apply(dialect: Dialect) -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        let tx = conn.transaction().unwrap();
        DeviceSchema
            .apply(&tx, &StoreContext::new(dialect))
            .unwrap();
        tx.commit().unwrap();
        conn
    }

    #[test]
    fn creates_every_device_table() {
        let conn = apply(Dialect::Sqlite);
        for table in TABLES {
            let exists: bool = conn
                .query_row(
                    "SELECT count(*) > 0 FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert!(exists, "missing table {table}");
        }
    }

    #[test]
    fn identity_keys_are_unique_per_pair() {
        let conn = apply(Dialect::Sqlite);
        conn.execute(
            "INSERT INTO store_identity_keys (our_jid, their_id, identity) VALUES ('a', 'b', 'k1')",
            [],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO store_identity_keys (our_jid, their_id, identity) VALUES ('a', 'b', 'k2')",
            [],
        );
        assert!(dup.is_err());
    }

    #[test]
    fn chat_settings_defaults_apply() {
        let conn = apply(Dialect::Sqlite);
        conn.execute(
            "INSERT INTO store_chat_settings (our_jid, chat_jid) VALUES ('me', 'chat')",
            [],
        )
        .unwrap();
        let (muted, pinned, archived): (i64, i64, i64) = conn
            .query_row(
                "SELECT muted_until, pinned, archived FROM store_chat_settings",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!((muted, pinned, archived), (0, 0, 0));
    }

    #[test]
    fn timestamp_column_follows_dialect() {
        assert!(device_schema_sql(Dialect::Postgres).contains("timestamp   timestamp NOT NULL"));
        assert!(device_schema_sql(Dialect::Sqlite).contains("timestamp   datetime NOT NULL"));

        // Postgres spelling is still accepted by SQLite's type affinity rules.
        apply(Dialect::Postgres);
    }
}
