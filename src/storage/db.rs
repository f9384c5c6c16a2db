//! SQLite connection handle.
//!
//! [`Database`] wraps a `rusqlite::Connection` behind an `Arc<Mutex<>>` and
//! runs every closure on the blocking pool via `tokio::task::spawn_blocking`.
//! The mutex only guards the handle; isolation between writers, including
//! writers in other processes, comes from SQLite's own locking.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::storage::migration;

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) a database at `path`.
    ///
    /// `busy_timeout` bounds how long a writer waits for another writer's
    /// lock before failing.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "opening database");

        let conn = Connection::open(path)?;
        Self::apply_pragmas(&conn, busy_timeout)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory database, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        debug!("opening in-memory database");

        let conn = Connection::open_in_memory()?;
        Self::apply_pragmas(&conn, Duration::from_secs(5))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open the database and run all pending migrations
    pub async fn open_and_migrate(
        path: impl AsRef<Path> + Send + 'static,
        busy_timeout: Duration,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let db = tokio::task::spawn_blocking(move || Self::open(&path, busy_timeout)).await??;
        db.run_migrations().await?;
        Ok(db)
    }

    pub async fn run_migrations(&self) -> Result<()> {
        self.execute(|conn| migration::run_all(conn)).await
    }

    /// Run a closure against the connection on the blocking pool. Writes go
    /// through [`Database::write`], except migrations which manage their own
    /// transaction.
    pub async fn execute<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn);
            f(&conn)
        })
        .await?
    }

    /// Run `f` inside a `BEGIN IMMEDIATE` transaction and commit when it
    /// returns `Ok`.
    ///
    /// The write lock is taken before `f` reads anything, so the rows it sees
    /// cannot change until commit. On error, or if `f` panics, the transaction
    /// is dropped and rolled back.
    pub async fn write<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = lock(&conn);
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let value = f(&tx)?;
            tx.commit()?;
            Ok(value)
        })
        .await?
    }

    /// Returns true when a trivial query succeeds
    pub async fn ping(&self) -> bool {
        let result = self
            .execute(|conn| {
                conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
                Ok(())
            })
            .await;
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "database health check failed");
                false
            }
        }
    }

    fn apply_pragmas(conn: &Connection, busy_timeout: Duration) -> Result<()> {
        // WAL: readers never block the single writer.
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(busy_timeout)?;

        debug!(
            journal_mode = %mode,
            busy_timeout_ms = busy_timeout.as_millis() as u64,
            "database pragmas applied"
        );
        Ok(())
    }
}

/// Locks the connection, recovering it if a previous closure panicked.
///
/// A panic can only happen between statements; any transaction it left open
/// was rolled back when the `Transaction` was dropped during unwinding.
fn lock(conn: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    conn.lock().unwrap_or_else(|poisoned| {
        warn!("recovering database connection after a panicked task");
        conn.clear_poison();
        poisoned.into_inner()
    })
}
