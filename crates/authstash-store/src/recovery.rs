//! Startup recovery: hydrate the memory tier, fall back to backup.
//!
//! The sequence is deliberately one-way: open the durable store, copy its
//! contents into memory, and only if memory is still empty afterwards pull
//! the namespaced backup keys in and re-seed the durable store from them
//! (self-heal). A non-empty durable tier is trusted as authoritative and
//! the backup is not consulted at all. No step can fail the sequence; a
//! broken tier contributes no data instead of an error.

use tracing::{debug, info};

use crate::backup::BackupStore;
use crate::durable::DurableStore;
use crate::memory::MemoryCache;

/// Where the cache is in its startup sequence.
///
/// `Ready` is terminal for the process lifetime; there is no path back to
/// `Opening`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryState {
    /// `init` has not been called yet.
    Uninitialized,
    /// The durable store open is in flight.
    Opening,
    /// Copying persisted entries into the memory tier.
    Hydrating,
    /// Hydration finished; all reads are memory reads from here on.
    Ready,
}

impl RecoveryState {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Self::Uninitialized => 0,
            Self::Opening => 1,
            Self::Hydrating => 2,
            Self::Ready => 3,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Uninitialized,
            1 => Self::Opening,
            2 => Self::Hydrating,
            _ => Self::Ready,
        }
    }
}

impl std::fmt::Display for RecoveryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Opening => "opening",
            Self::Hydrating => "hydrating",
            Self::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// Copy persisted state into `memory`, self-healing the durable tier from
/// the backup tier when the durable copy has been lost.
pub(crate) async fn hydrate(durable: &DurableStore, backup: &BackupStore, memory: &MemoryCache) {
    let entries = durable.get_all().await;
    let hydrated = entries.len();
    for (key, value) in entries {
        memory.set(&key, &value);
    }

    if !memory.is_empty() {
        info!(entries = hydrated, "memory cache hydrated from durable store");
        return;
    }

    // Fresh install, or the durable tier was wiped under us. Pull whatever
    // the backup tier still holds and write it back through so the durable
    // copy is whole again.
    let keys = backup.keys();
    if keys.is_empty() {
        info!("no persisted session state found");
        return;
    }

    let mut recovered = 0usize;
    for key in keys {
        if let Some(value) = backup.get(&key) {
            memory.set(&key, &value);
            durable.put(&key, &value).await;
            recovered += 1;
        } else {
            debug!(key = key, "backup entry vanished during recovery, skipped");
        }
    }
    info!(
        entries = recovered,
        "memory cache recovered from backup store, durable store re-seeded"
    );
}

// ── tests ────────────────────────────────────────────────────────────
