//! Backup tier: a namespaced slice of a shared synchronous JSON file.
//!
//! This is the low-capacity, last-resort copy. Embedded databases are a
//! documented casualty of storage pressure on hostile client runtimes, so
//! the small fixed set of auth keys is mirrored here as well; recovery
//! reads it back only when the durable tier comes up empty.
//!
//! The file is a single flat JSON object shared with unrelated application
//! data. Keys owned by this cache carry a fixed `<namespace>.` prefix and
//! every write preserves the foreign keys untouched. Rewrites go through a
//! temp file and an atomic rename, so a crash mid-write cannot destroy the
//! last good copy of the one tier that exists for crash recovery.
//!
//! All operations are synchronous and infallible at the surface: read
//! failures degrade to absent, write failures are logged and dropped.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::StoreResult;

/// Synchronous, namespaced key-value store over a shared JSON file.
#[derive(Debug, Clone)]
pub struct BackupStore {
    path: PathBuf,
    prefix: String,
}

impl BackupStore {
    /// Create a handle over the file at `path`, owning keys prefixed with
    /// `<namespace>.`. The file is created lazily on first write.
    pub fn new(path: impl Into<PathBuf>, namespace: &str) -> Self {
        Self {
            path: path.into(),
            prefix: format!("{namespace}."),
        }
    }

    /// Read a value by logical (unprefixed) key.
    pub fn get(&self, key: &str) -> Option<String> {
        let map = match self.load() {
            Ok(map) => map,
            Err(err) => {
                warn!(key = key, %err, "backup.get failed, treating as absent");
                return None;
            }
        };
        match map.get(&self.prefixed(key)) {
            Some(Value::String(value)) => Some(value.clone()),
            Some(other) => {
                warn!(key = key, value = %other, "backup entry is not a string, treating as absent");
                None
            }
            None => None,
        }
    }

    /// Write a value by logical key. Foreign keys in the file are preserved.
    pub fn set(&self, key: &str, value: &str) {
        let mut map = match self.load() {
            Ok(map) => map,
            Err(err) => {
                // Never rewrite a file we could not read; that would clobber
                // whatever unrelated data it still holds.
                warn!(key = key, %err, "backup file unreadable, write dropped");
                return;
            }
        };
        map.insert(self.prefixed(key), Value::String(value.to_string()));
        if let Err(err) = self.persist(&map) {
            warn!(key = key, %err, "backup.set failed, write dropped");
        } else {
            debug!(key = key, "backup.set");
        }
    }

    /// Remove a logical key if present.
    pub fn remove(&self, key: &str) {
        let mut map = match self.load() {
            Ok(map) => map,
            Err(err) => {
                warn!(key = key, %err, "backup file unreadable, delete dropped");
                return;
            }
        };
        if map.remove(&self.prefixed(key)).is_none() {
            return;
        }
        if let Err(err) = self.persist(&map) {
            warn!(key = key, %err, "backup.remove failed, delete dropped");
        } else {
            debug!(key = key, "backup.remove");
        }
    }

    /// Logical keys in this cache's namespace, prefix stripped.
    pub fn keys(&self) -> Vec<String> {
        let map = match self.load() {
            Ok(map) => map,
            Err(err) => {
                warn!(%err, "backup.keys failed, treating as empty");
                return Vec::new();
            }
        };
        map.keys()
            .filter_map(|k| k.strip_prefix(&self.prefix))
            .map(str::to_string)
            .collect()
    }

    /// Remove every key in this cache's namespace, leaving foreign keys alone.
    pub fn clear(&self) {
        let mut map = match self.load() {
            Ok(map) => map,
            Err(err) => {
                warn!(%err, "backup file unreadable, clear dropped");
                return;
            }
        };
        let before = map.len();
        map.retain(|k, _| !k.starts_with(&self.prefix));
        if map.len() == before {
            return;
        }
        if let Err(err) = self.persist(&map) {
            warn!(%err, "backup.clear failed");
        } else {
            debug!(removed = before - map.len(), "backup.clear");
        }
    }

    fn prefixed(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    /// Load the whole file. A missing file is an empty map; a corrupt or
    /// unreadable file is an error, so writers drop instead of clobbering.
    fn load(&self) -> StoreResult<Map<String, Value>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(err) => return Err(err.into()),
        };
        let value: Value = serde_json::from_str(&raw)?;
        match value {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }

    fn persist(&self, map: &Map<String, Value>) -> StoreResult<()> {
        let tmp = match self.path.file_name() {
            Some(name) => {
                let mut tmp_name = name.to_os_string();
                tmp_name.push(".tmp");
                self.path.with_file_name(tmp_name)
            }
            None => self.path.with_extension("tmp"),
        };
        fs::write(&tmp, serde_json::to_string_pretty(map)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

// ── tests ────────────────────────────────────────────────────────────
