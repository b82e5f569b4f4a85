//! # authstash-auth
//!
//! Domain-shaped authentication facade over [`authstash_store`].
//!
//! The store crate gives the application a generic tiered cache; this
//! crate names the handful of keys auth actually cares about and wraps
//! them in an API collaborators can read at a glance:
//!
//! ```text
//! AuthSession
//! ├── token / token_async / set_token / remove_token
//! ├── refresh_token / set_refresh_token / remove_refresh_token
//! ├── user / set_user / remove_user        (JSON-serialized records)
//! ├── last_login / is_within_grace_period
//! └── clear_all
//! ```
//!
//! Everything is built on the cache's primitives: synchronous memory
//! reads, mirrored writes through the durable and backup tiers, and the
//! same absorb-all-failures contract. Callers only ever observe "have a
//! value" or "don't have a value".
//!
//! ## Quick start
//!
//! ```ignore
//! use authstash_auth::AuthSession;
//! use authstash_store::SessionCache;
//!
//! let cache = SessionCache::builder()
//!     .durable_path("data/session.db")
//!     .backup_path("data/prefs.json")
//!     .build();
//! let session = AuthSession::new(cache);
//! session.init().await;
//!
//! session.set_token("abc123");
//! let header = session.token().map(|t| format!("Bearer {t}"));
//! ```

pub mod session;

pub use session::{
    AuthSession, DEFAULT_GRACE_PERIOD_SECS, LOGIN_AT_KEY, REFRESH_TOKEN_KEY, TOKEN_KEY, USER_KEY,
};
