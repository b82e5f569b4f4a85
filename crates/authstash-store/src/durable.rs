//! Durable tier: SQLite storage behind the blocking thread pool.
//!
//! [`SqliteStore`] wraps a `rusqlite::Connection` in an `Arc<Mutex<>>` and
//! dispatches every operation through `tokio::task::spawn_blocking`, so the
//! async runtime never blocks on file I/O. It is the fallible core.
//!
//! [`DurableStore`] is the adapter the cache actually holds. Opening it
//! cannot fail: if SQLite is unusable (missing directory, permissions,
//! quota), the adapter comes up in a disabled no-op mode and the system
//! carries on as if durability is simply unavailable. After a successful
//! open, individual operation failures are absorbed here too: reads degrade
//! to absent, writes are dropped, and every absorbed failure is logged.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};

/// One row per key, single namespace dedicated to this cache.
const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS entries (
    key        TEXT PRIMARY KEY,
    value      TEXT NOT NULL,
    updated_at INTEGER NOT NULL
)";

// ── fallible core ────────────────────────────────────────────────────

/// Thread-safe handle to the SQLite database.
#[derive(Clone)]
pub(crate) struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`, apply pragmas, create the
    /// schema. Blocks briefly on file I/O; callers wrap in `spawn_blocking`.
    fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::setup(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    #[cfg(test)]
    fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::setup(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn setup(conn: &Connection) -> StoreResult<()> {
        // WAL mode: readers never block on the fire-and-forget writers.
        conn.pragma_update(None, "journal_mode", "WAL")?;
        // NORMAL sync is safe with WAL; a power failure loses at most the
        // last transaction, never the whole file.
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        // Concurrent writers wait instead of failing immediately.
        conn.pragma_update(None, "busy_timeout", 5_000_i32)?;
        conn.execute(SCHEMA, [])?;
        Ok(())
    }

    /// Execute a closure against the connection on the blocking pool.
    async fn execute<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| StoreError::TaskJoin(format!("mutex poisoned: {e}")))?;
            f(&conn)
        })
        .await?
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let key = key.to_string();
        self.execute(move |conn| {
            let result = conn.query_row(
                "SELECT value FROM entries WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
            );
            match result {
                Ok(value) => Ok(Some(value)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(StoreError::Sqlite(e)),
            }
        })
        .await
    }

    async fn get_all(&self) -> StoreResult<Vec<(String, String)>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare("SELECT key, value FROM entries")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
    }

    async fn put(&self, key: &str, value: &str) -> StoreResult<()> {
        let key = key.to_string();
        let value = value.to_string();
        let now = Utc::now().timestamp();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO entries (key, value, updated_at) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                rusqlite::params![key, value, now],
            )?;
            Ok(())
        })
        .await
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        let key = key.to_string();
        self.execute(move |conn| {
            conn.execute("DELETE FROM entries WHERE key = ?1", rusqlite::params![key])?;
            Ok(())
        })
        .await
    }

    async fn clear(&self) -> StoreResult<()> {
        self.execute(|conn| {
            conn.execute("DELETE FROM entries", [])?;
            Ok(())
        })
        .await
    }
}

// ── absorbing adapter ────────────────────────────────────────────────

#[derive(Clone)]
enum Mode {
    Sqlite(SqliteStore),
    Disabled,
}

/// The durable store adapter held by the cache.
///
/// Cheap to clone; clones share the same underlying connection.
#[derive(Clone)]
pub struct DurableStore {
    mode: Mode,
}

impl DurableStore {
    /// Open the durable store at `path`. Never fails: an unusable backing
    /// store yields the disabled adapter instead.
    pub async fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let path_display = path.display().to_string();
        let opened = tokio::task::spawn_blocking(move || SqliteStore::open(&path)).await;
        match opened {
            Ok(Ok(store)) => {
                info!(path = %path_display, "durable store open");
                Self {
                    mode: Mode::Sqlite(store),
                }
            }
            Ok(Err(err)) => {
                warn!(path = %path_display, %err, "durable store unavailable, degrading to no-op");
                Self::disabled()
            }
            Err(err) => {
                warn!(path = %path_display, %err, "durable store open task failed, degrading to no-op");
                Self::disabled()
            }
        }
    }

    /// An adapter with no backing store: reads are absent, writes are no-ops.
    pub fn disabled() -> Self {
        Self {
            mode: Mode::Disabled,
        }
    }

    #[cfg(test)]
    pub(crate) fn in_memory() -> Self {
        Self {
            mode: Mode::Sqlite(SqliteStore::open_in_memory().unwrap()),
        }
    }

    /// Whether the adapter is running in its degraded no-op mode.
    pub fn is_disabled(&self) -> bool {
        matches!(self.mode, Mode::Disabled)
    }

    /// Read a single key. Failures degrade to absent.
    pub async fn get(&self, key: &str) -> Option<String> {
        match &self.mode {
            Mode::Disabled => {
                debug!(key = key, "durable.get skipped, store disabled");
                None
            }
            Mode::Sqlite(store) => match store.get(key).await {
                Ok(value) => value,
                Err(err) => {
                    warn!(key = key, %err, "durable.get failed, treating as absent");
                    None
                }
            },
        }
    }

    /// Enumerate every entry. Used only during recovery; failures degrade
    /// to an empty result.
    pub async fn get_all(&self) -> Vec<(String, String)> {
        match &self.mode {
            Mode::Disabled => {
                debug!("durable.get_all skipped, store disabled");
                Vec::new()
            }
            Mode::Sqlite(store) => match store.get_all().await {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(%err, "durable.get_all failed, treating as empty");
                    Vec::new()
                }
            },
        }
    }

    /// Upsert a key. The memory tier has already satisfied the logical
    /// write, so a failure here is logged and dropped, never propagated.
    pub async fn put(&self, key: &str, value: &str) {
        match &self.mode {
            Mode::Disabled => debug!(key = key, "durable.put skipped, store disabled"),
            Mode::Sqlite(store) => {
                if let Err(err) = store.put(key, value).await {
                    warn!(key = key, %err, "durable.put failed, write dropped");
                }
            }
        }
    }

    /// Delete a key. Failures are logged and dropped.
    pub async fn remove(&self, key: &str) {
        match &self.mode {
            Mode::Disabled => debug!(key = key, "durable.remove skipped, store disabled"),
            Mode::Sqlite(store) => {
                if let Err(err) = store.remove(key).await {
                    warn!(key = key, %err, "durable.remove failed, delete dropped");
                }
            }
        }
    }

    /// Delete every entry. Failures are logged and dropped.
    pub async fn clear(&self) {
        match &self.mode {
            Mode::Disabled => debug!("durable.clear skipped, store disabled"),
            Mode::Sqlite(store) => {
                if let Err(err) = store.clear().await {
                    warn!(%err, "durable.clear failed");
                }
            }
        }
    }
}

// ── tests ────────────────────────────────────────────────────────────
