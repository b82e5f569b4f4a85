//! Integration tests for the authstash-store crate.
//!
//! These exercise the full cache lifecycle against real stores on disk
//! (via tempfile): hydration, backup recovery with self-heal, restart
//! survival, removal, and degraded operation with no durable tier.

use std::path::Path;
use std::time::Duration;

use authstash_store::{BackupStore, DurableStore, RecoveryState, SessionCache};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

fn cache_in(dir: &Path) -> SessionCache {
    SessionCache::builder()
        .durable_path(dir.join("session.db"))
        .backup_path(dir.join("prefs.json"))
        .build()
}

/// Poll the durable tier until `key` holds `expected`, or give up.
async fn durable_eventually_holds(store: &DurableStore, key: &str, expected: &str) -> bool {
    for _ in 0..200 {
        if store.get(key).await.as_deref() == Some(expected) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Poll the durable tier until `key` is gone, or give up.
async fn durable_eventually_drops(store: &DurableStore, key: &str) -> bool {
    for _ in 0..200 {
        if store.get(key).await.is_none() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

// ═══════════════════════════════════════════════════════════════════════
//  Read-your-writes and initialization
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn read_your_writes_with_no_suspension() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let cache = cache_in(dir.path());

    // Holds even before init: the memory tier answers on its own.
    cache.set_item("k", "v");
    assert_eq!(cache.get_item("k").as_deref(), Some("v"));

    cache.init().await;
    cache.set_item("k", "v2");
    assert_eq!(cache.get_item("k").as_deref(), Some("v2"));
}

#[tokio::test]
async fn concurrent_init_shares_one_sequence() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    let seed = DurableStore::open(dir.path().join("session.db")).await;
    seed.put("auth.token", "seeded").await;
    drop(seed);

    let cache = cache_in(dir.path());
    tokio::join!(cache.init(), cache.init(), cache.init(), cache.init(), cache.init());

    assert!(cache.is_ready());
    assert_eq!(cache.state(), RecoveryState::Ready);
    assert_eq!(cache.get_item("auth.token").as_deref(), Some("seeded"));
}

#[tokio::test]
async fn init_is_idempotent_and_never_rehydrates() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    let seed = DurableStore::open(dir.path().join("session.db")).await;
    seed.put("auth.token", "seeded").await;
    drop(seed);

    let cache = cache_in(dir.path());
    cache.init().await;
    assert_eq!(cache.get_item("auth.token").as_deref(), Some("seeded"));

    // A second init after a local mutation must not resurrect the entry.
    cache.remove_item("auth.token");
    cache.init().await;
    assert_eq!(cache.get_item("auth.token"), None);
}

// ═══════════════════════════════════════════════════════════════════════
//  Recovery precedence and backup fallback
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn durable_store_wins_over_backup_when_non_empty() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    let seed = DurableStore::open(dir.path().join("session.db")).await;
    seed.put("auth.token", "durable-copy").await;
    drop(seed);
    BackupStore::new(dir.path().join("prefs.json"), "authstash").set("auth.token", "backup-copy");

    let cache = cache_in(dir.path());
    cache.init().await;

    assert_eq!(cache.get_item("auth.token").as_deref(), Some("durable-copy"));
}

#[tokio::test]
async fn empty_durable_store_recovers_from_backup_and_self_heals() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    let backup = BackupStore::new(dir.path().join("prefs.json"), "authstash");
    backup.set("auth.token", "backup-copy");
    backup.set("auth.user", "{\"id\":7}");

    let cache = cache_in(dir.path());
    cache.init().await;

    assert_eq!(cache.get_item("auth.token").as_deref(), Some("backup-copy"));
    assert_eq!(cache.get_item("auth.user").as_deref(), Some("{\"id\":7}"));

    // Self-heal completed before init resolved: the durable tier holds the
    // recovered entries again.
    let observer = DurableStore::open(dir.path().join("session.db")).await;
    assert_eq!(observer.get("auth.token").await.as_deref(), Some("backup-copy"));
    assert_eq!(observer.get("auth.user").await.as_deref(), Some("{\"id\":7}"));
}

// ═══════════════════════════════════════════════════════════════════════
//  Restart survival and removal
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn writes_survive_a_process_restart() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    let cache = cache_in(dir.path());
    cache.init().await;
    cache.set_item("auth.token", "t1");

    let observer = DurableStore::open(dir.path().join("session.db")).await;
    assert!(durable_eventually_holds(&observer, "auth.token", "t1").await);
    drop(cache);

    let restarted = cache_in(dir.path());
    restarted.init().await;
    assert_eq!(restarted.get_item("auth.token").as_deref(), Some("t1"));
}

#[tokio::test]
async fn mirrored_removal_is_complete_across_tiers_and_restarts() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    let cache = cache_in(dir.path());
    cache.init().await;
    cache.set_item_mirrored("auth.token", "t1");

    let observer = DurableStore::open(dir.path().join("session.db")).await;
    assert!(durable_eventually_holds(&observer, "auth.token", "t1").await);

    cache.remove_item_mirrored("auth.token");
    assert_eq!(cache.get_item("auth.token"), None);
    // Only once the background delete has landed is the async read-through
    // guaranteed to miss too.
    assert!(durable_eventually_drops(&observer, "auth.token").await);
    assert_eq!(cache.get_item_async("auth.token").await, None);

    let backup = BackupStore::new(dir.path().join("prefs.json"), "authstash");
    assert_eq!(backup.get("auth.token"), None);
    drop(cache);

    // A fresh start must not resurrect the token from any tier.
    let restarted = cache_in(dir.path());
    restarted.init().await;
    assert_eq!(restarted.get_item("auth.token"), None);
}

#[tokio::test]
async fn clear_wipes_every_tier_for_good() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    let cache = cache_in(dir.path());
    cache.init().await;
    cache.set_item_mirrored("auth.token", "t1");
    cache.set_item("auth.scratch", "s1");

    // Let the fire-and-forget writes land first; a put still in flight
    // would otherwise re-create its entry after the clear.
    let observer = DurableStore::open(dir.path().join("session.db")).await;
    assert!(durable_eventually_holds(&observer, "auth.token", "t1").await);
    assert!(durable_eventually_holds(&observer, "auth.scratch", "s1").await);

    cache.clear().await;

    assert_eq!(cache.get_item("auth.token"), None);
    drop(cache);

    let restarted = cache_in(dir.path());
    restarted.init().await;
    assert_eq!(restarted.get_item("auth.token"), None);
    assert_eq!(restarted.get_item("auth.scratch"), None);
}

// ═══════════════════════════════════════════════════════════════════════
//  Degraded operation
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn unopenable_durable_store_degrades_without_errors() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    // The parent directory never exists, so every open attempt fails and
    // the adapter must come up disabled.
    let cache = SessionCache::builder()
        .durable_path(dir.path().join("missing-dir").join("session.db"))
        .backup_path(dir.path().join("prefs.json"))
        .build();

    cache.init().await;
    assert!(cache.is_ready());

    cache.set_item("k", "v");
    assert_eq!(cache.get_item("k").as_deref(), Some("v"));
    assert_eq!(cache.get_item_async("k").await.as_deref(), Some("v"));

    // Mirrored writes still reach the backup tier, so a restart in the
    // same degraded environment recovers the auth keys from there.
    cache.set_item_mirrored("auth.token", "t1");
    drop(cache);

    let restarted = SessionCache::builder()
        .durable_path(dir.path().join("missing-dir").join("session.db"))
        .backup_path(dir.path().join("prefs.json"))
        .build();
    restarted.init().await;
    assert_eq!(restarted.get_item("auth.token").as_deref(), Some("t1"));
}
