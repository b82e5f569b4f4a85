//! # authstash-store
//!
//! Resilient tiered key-value cache for session state on hostile client
//! runtimes, where storage can be evicted, process restarts are routine,
//! and the durable store may not be available at call time.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  SessionCache (public surface)               │
//! ├──────────────────────────────────────────────┤
//! │  MemoryCache   (sync reads, read-your-writes)│
//! │  DurableStore  (SQLite, async, authoritative)│
//! │  BackupStore   (shared JSON file, last resort)│
//! ├──────────────────────────────────────────────┤
//! │  recovery      (open → hydrate → self-heal)  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Every read the application performs is a synchronous memory lookup.
//! Writes hit memory first and then flow to the persistent tiers as
//! best-effort background work. On startup, [`SessionCache::init`] hydrates
//! memory from the durable store, falling back to the backup tier (and
//! re-seeding the durable store from it) when the durable copy was lost.
//!
//! No storage failure ever surfaces to callers: the public contract is
//! "have a value" or "don't have a value", nothing else.
//!
//! ## Quick start
//!
//! ```ignore
//! use authstash_store::SessionCache;
//!
//! let cache = SessionCache::builder()
//!     .durable_path("data/session.db")
//!     .backup_path("data/prefs.json")
//!     .build();
//! cache.init().await;
//!
//! cache.set_item("auth.token", "abc123");
//! assert_eq!(cache.get_item("auth.token").as_deref(), Some("abc123"));
//! ```

pub mod backup;
pub mod cache;
pub mod durable;
pub mod error;
pub mod memory;
pub mod recovery;

// ── re-exports ───────────────────────────────────────────────────────

pub use backup::BackupStore;
pub use cache::{SessionCache, SessionCacheBuilder};
pub use durable::DurableStore;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryCache;
pub use recovery::RecoveryState;
