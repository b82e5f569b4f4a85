//! Auth session facade over the tiered cache.
//!
//! [`AuthSession`] gives the rest of the application a domain-shaped API
//! for the handful of well-known auth keys: bearer token, refresh token,
//! serialized user record, and the login timestamp that feeds the grace
//! period check. It owns no storage logic; every operation is expressed
//! through [`SessionCache`] primitives, and the auth keys are the only
//! ones written through the capacity-limited backup tier.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use authstash_store::SessionCache;

/// Bearer token for authenticated requests.
pub const TOKEN_KEY: &str = "auth.token";

/// Refresh token used to mint a new bearer token.
pub const REFRESH_TOKEN_KEY: &str = "auth.refresh_token";

/// JSON-serialized user record.
pub const USER_KEY: &str = "auth.user";

/// Login timestamp, milliseconds since the Unix epoch, decimal string.
pub const LOGIN_AT_KEY: &str = "auth.login_at";

/// Default grace window after login during which callers typically
/// tolerate transient auth failures instead of logging the user out.
pub const DEFAULT_GRACE_PERIOD_SECS: u64 = 15;

/// Thin, domain-shaped handle over the session cache.
///
/// Cheap to clone; clones share the underlying cache.
#[derive(Clone)]
pub struct AuthSession {
    cache: SessionCache,
}

impl AuthSession {
    /// Wrap an existing cache. The cache is built and owned by the
    /// application's composition root; this facade adds no storage of its
    /// own.
    pub fn new(cache: SessionCache) -> Self {
        Self { cache }
    }

    /// The underlying generic cache, for collaborators that need raw keys.
    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Hydrate the cache. Idempotent, never fails; see [`SessionCache::init`].
    pub async fn init(&self) {
        self.cache.init().await;
    }

    /// Whether cache hydration has completed.
    pub fn is_ready(&self) -> bool {
        self.cache.is_ready()
    }

    // ── token ────────────────────────────────────────────────────────

    /// Store the bearer token and refresh the login timestamp. Both are
    /// written through every tier, including the backup store.
    pub fn set_token(&self, token: &str) {
        self.cache.set_item_mirrored(TOKEN_KEY, token);
        self.cache
            .set_item_mirrored(LOGIN_AT_KEY, &Utc::now().timestamp_millis().to_string());
        debug!("token stored, login timestamp refreshed");
    }

    /// Synchronous token read from the memory tier.
    pub fn token(&self) -> Option<String> {
        self.cache.get_item(TOKEN_KEY)
    }

    /// Token read with durable fall-through, for callers running before
    /// `init` has hydrated the memory tier.
    pub async fn token_async(&self) -> Option<String> {
        self.cache.get_item_async(TOKEN_KEY).await
    }

    /// Remove the token and the login timestamp from every tier.
    pub fn remove_token(&self) {
        self.cache.remove_item_mirrored(TOKEN_KEY);
        self.cache.remove_item_mirrored(LOGIN_AT_KEY);
        debug!("token removed");
    }

    // ── refresh token ────────────────────────────────────────────────

    /// Store the refresh token through every tier.
    pub fn set_refresh_token(&self, token: &str) {
        self.cache.set_item_mirrored(REFRESH_TOKEN_KEY, token);
    }

    /// Synchronous refresh token read.
    pub fn refresh_token(&self) -> Option<String> {
        self.cache.get_item(REFRESH_TOKEN_KEY)
    }

    /// Remove the refresh token from every tier.
    pub fn remove_refresh_token(&self) {
        self.cache.remove_item_mirrored(REFRESH_TOKEN_KEY);
    }

    // ── user record ──────────────────────────────────────────────────

    /// Serialize and store the user record. A record that fails to
    /// serialize is logged and dropped; the previous value stays.
    pub fn set_user<T: Serialize>(&self, user: &T) {
        match serde_json::to_string(user) {
            Ok(json) => self.cache.set_item_mirrored(USER_KEY, &json),
            Err(err) => warn!(%err, "user record serialization failed, write dropped"),
        }
    }

    /// Read and parse the cached user record. A corrupt record behaves
    /// like no record at all.
    pub fn user<T: DeserializeOwned>(&self) -> Option<T> {
        let json = self.cache.get_item(USER_KEY)?;
        match serde_json::from_str(&json) {
            Ok(user) => Some(user),
            Err(err) => {
                warn!(%err, "cached user record is corrupt, treating as absent");
                None
            }
        }
    }

    /// Remove the user record from every tier.
    pub fn remove_user(&self) {
        self.cache.remove_item_mirrored(USER_KEY);
    }

    // ── lifecycle ────────────────────────────────────────────────────

    /// Wipe every tier of the cache.
    pub async fn clear_all(&self) {
        self.cache.clear().await;
    }

    // ── grace period ─────────────────────────────────────────────────

    /// When the current token was stored, if known.
    pub fn last_login(&self) -> Option<DateTime<Utc>> {
        let raw = self.cache.get_item(LOGIN_AT_KEY)?;
        match raw.parse::<i64>() {
            Ok(millis) => DateTime::from_timestamp_millis(millis),
            Err(err) => {
                warn!(%err, raw = %raw, "login timestamp is corrupt, treating as absent");
                None
            }
        }
    }

    /// Whether the last login happened less than `window_secs` ago.
    ///
    /// Returns `false` when no login timestamp is recorded. Callers use
    /// this to tell "just logged in, tolerate a transient 401" apart from
    /// "stale session, log out"; that policy lives with the caller, this
    /// is only the primitive.
    pub fn is_within_grace_period(&self, window_secs: u64) -> bool {
        let Some(login_at) = self.last_login() else {
            return false;
        };
        let elapsed = Utc::now().signed_duration_since(login_at);
        elapsed < TimeDelta::milliseconds(window_secs as i64 * 1000)
    }
}

// ── tests ────────────────────────────────────────────────────────────
