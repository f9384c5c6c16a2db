//! Versioned schema migrations, tracked in a `_migrations` table so each one
//! runs exactly once per database.

use chrono::Utc;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, info};

use crate::error::{BoardError, Result};

struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

/// Append new migrations at the end.
static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "cards table with lane/position index",
    sql: r#"
        CREATE TABLE cards (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            title       TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            lane        TEXT NOT NULL CHECK (lane IN ('todo', 'doing', 'done')),
            position    INTEGER NOT NULL DEFAULT 0 CHECK (position >= 0),
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );
        CREATE INDEX idx_cards_lane_position ON cards(lane, position, id);
    "#,
}];

/// Apply every migration newer than the recorded schema version.
///
/// The version is read and the migrations applied under one `BEGIN IMMEDIATE`
/// transaction, so two processes starting on a fresh file cannot both try to
/// create the schema.
pub fn run_all(conn: &Connection) -> Result<()> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );",
    )?;

    let current = current_version(&tx)?;
    debug!(current, "checking schema migrations");

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        info!(
            version = migration.version,
            description = migration.description,
            "applying migration"
        );

        tx.execute_batch(migration.sql)
            .and_then(|()| {
                tx.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                    rusqlite::params![migration.version, Utc::now()],
                )
            })
            .map_err(|e| BoardError::Migration {
                version: migration.version,
                message: e.to_string(),
            })?;
    }

    tx.commit()?;
    Ok(())
}

/// Highest applied migration version, 0 on a fresh database
pub fn current_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> =
        conn.query_row("SELECT MAX(version) FROM _migrations", [], |row| row.get(0))?;
    Ok(version.unwrap_or(0))
}
