//! The public tiered cache.
//!
//! [`SessionCache`] is the one surface the rest of the application talks
//! to. Reads are synchronous memory lookups; writes land in memory first
//! (read-your-writes) and then flow out to the persistent tiers as
//! best-effort background work. Construction is explicit, via
//! [`SessionCache::builder`], so the composition root owns the single
//! instance and tests can build a fresh one each.
//!
//! Persistence ordering: fire-and-forget writes to the same key are not
//! ordered relative to each other. The memory tier deterministically holds
//! the last `set_item` call's value, but the durable tier may transiently
//! disagree until the next write lands. Accepted, documented gap.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::backup::BackupStore;
use crate::durable::DurableStore;
use crate::memory::MemoryCache;
use crate::recovery::{self, RecoveryState};

const DEFAULT_NAMESPACE: &str = "authstash";
const DEFAULT_BACKUP_FILE: &str = "authstash-backup.json";

struct Inner {
    memory: MemoryCache,
    backup: BackupStore,
    durable_path: Option<PathBuf>,
    durable: OnceCell<DurableStore>,
    init: OnceCell<()>,
    state: AtomicU8,
}

/// Tiered session cache: synchronous memory reads over asynchronous,
/// best-effort persistence.
///
/// Cheap to clone; clones share all tiers and the initialization state.
///
/// # Example
///
/// ```ignore
/// let cache = SessionCache::builder()
///     .durable_path("data/session.db")
///     .backup_path("data/prefs.json")
///     .build();
/// cache.init().await;
///
/// cache.set_item("auth.token", "abc123");
/// assert_eq!(cache.get_item("auth.token").as_deref(), Some("abc123"));
/// ```
#[derive(Clone)]
pub struct SessionCache {
    inner: Arc<Inner>,
}

impl SessionCache {
    /// Start building a cache.
    pub fn builder() -> SessionCacheBuilder {
        SessionCacheBuilder {
            durable_path: None,
            backup_path: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    // ── initialization ───────────────────────────────────────────────

    /// Open the durable store and hydrate the memory tier. Idempotent and
    /// infallible: concurrent callers share a single in-flight sequence,
    /// and every caller resolves only once that sequence has completed.
    /// Tier failures degrade to "no data from this tier".
    pub async fn init(&self) {
        self.inner
            .init
            .get_or_init(|| async {
                self.set_state(RecoveryState::Opening);
                let durable = self.durable().await;
                self.set_state(RecoveryState::Hydrating);
                recovery::hydrate(durable, &self.inner.backup, &self.inner.memory).await;
                self.set_state(RecoveryState::Ready);
                info!("session cache ready");
            })
            .await;
    }

    /// Whether initialization has completed.
    pub fn is_ready(&self) -> bool {
        self.state() == RecoveryState::Ready
    }

    /// Current position in the startup sequence.
    pub fn state(&self) -> RecoveryState {
        RecoveryState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: RecoveryState) {
        debug!(state = %state, "recovery state transition");
        self.inner.state.store(state.as_u8(), Ordering::Release);
    }

    /// The durable adapter, opening it on first use. `init` and the async
    /// read path share this cell, so there is exactly one open per process
    /// no matter how many callers race.
    async fn durable(&self) -> &DurableStore {
        self.inner
            .durable
            .get_or_init(|| async {
                match &self.inner.durable_path {
                    Some(path) => DurableStore::open(path).await,
                    None => {
                        debug!("no durable path configured, durable tier disabled");
                        DurableStore::disabled()
                    }
                }
            })
            .await
    }

    // ── reads ────────────────────────────────────────────────────────

    /// Synchronous read from the memory tier only.
    pub fn get_item(&self, key: &str) -> Option<String> {
        self.inner.memory.get(key)
    }

    /// Read with durable fall-through: memory first, then a direct durable
    /// read for callers running before `init` has hydrated. A durable hit
    /// is written back into the memory tier.
    pub async fn get_item_async(&self, key: &str) -> Option<String> {
        if let Some(value) = self.inner.memory.get(key) {
            return Some(value);
        }
        let value = self.durable().await.get(key).await?;
        self.inner.memory.set(key, &value);
        Some(value)
    }

    // ── writes ───────────────────────────────────────────────────────

    /// Write a value. The memory tier is updated synchronously; durable
    /// persistence is spawned and best-effort. Must be called from within
    /// a Tokio runtime.
    pub fn set_item(&self, key: &str, value: &str) {
        self.inner.memory.set(key, value);
        self.spawn_durable_put(key.to_string(), value.to_string());
    }

    /// Remove a value from memory and, best-effort, from the durable tier.
    pub fn remove_item(&self, key: &str) {
        self.inner.memory.remove(key);
        self.spawn_durable_remove(key.to_string());
    }

    /// Write through every tier, including the synchronous backup store.
    /// Reserved for the small fixed auth key set; the backup file has a
    /// hard capacity ceiling and is never given arbitrary keys.
    pub fn set_item_mirrored(&self, key: &str, value: &str) {
        self.inner.memory.set(key, value);
        self.inner.backup.set(key, value);
        self.spawn_durable_put(key.to_string(), value.to_string());
    }

    /// Remove from every tier, including the backup store.
    pub fn remove_item_mirrored(&self, key: &str) {
        self.inner.memory.remove(key);
        self.inner.backup.remove(key);
        self.spawn_durable_remove(key.to_string());
    }

    /// Wipe every tier. Best-effort and infallible, like all writes.
    pub async fn clear(&self) {
        info!("clearing all session cache tiers");
        self.inner.memory.clear();
        self.inner.backup.clear();
        self.durable().await.clear().await;
    }

    fn spawn_durable_put(&self, key: String, value: String) {
        let cache = self.clone();
        tokio::spawn(async move {
            cache.durable().await.put(&key, &value).await;
        });
    }

    fn spawn_durable_remove(&self, key: String) {
        let cache = self.clone();
        tokio::spawn(async move {
            cache.durable().await.remove(&key).await;
        });
    }
}

// ── builder ──────────────────────────────────────────────────────────

/// Builder for [`SessionCache`].
///
/// With no durable path the durable tier runs disabled (memory + backup
/// only); the backup file defaults to `authstash-backup.json` in the
/// working directory and the namespace to `authstash`.
pub struct SessionCacheBuilder {
    durable_path: Option<PathBuf>,
    backup_path: Option<PathBuf>,
    namespace: String,
}

impl SessionCacheBuilder {
    /// Path of the SQLite file backing the durable tier.
    pub fn durable_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.durable_path = Some(path.into());
        self
    }

    /// Path of the shared JSON file backing the backup tier.
    pub fn backup_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.backup_path = Some(path.into());
        self
    }

    /// Key prefix isolating this cache's entries inside the backup file.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Build the cache. Nothing is opened yet; the durable store opens on
    /// the first `init` or async read.
    pub fn build(self) -> SessionCache {
        let backup_path = self
            .backup_path
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_FILE));
        debug!(
            durable = ?self.durable_path,
            backup = %backup_path.display(),
            namespace = %self.namespace,
            "session cache built"
        );
        SessionCache {
            inner: Arc::new(Inner {
                memory: MemoryCache::new(),
                backup: BackupStore::new(backup_path, &self.namespace),
                durable_path: self.durable_path,
                durable: OnceCell::new(),
                init: OnceCell::new(),
                state: AtomicU8::new(RecoveryState::Uninitialized.as_u8()),
            }),
        }
    }
}

// ── tests ────────────────────────────────────────────────────────────
