//! Credential Store
//!
//! Persists the single bearer-token record the bot holds, as a JSON file of
//! the shape `{ "token": "..." }`.
//!
//! The store owns no network logic. A missing or malformed file loads as
//! "no credential" (triggering lazy re-authentication in the gateway) rather
//! than an error. Saves are atomic: the record is written to a temporary
//! file in the same directory and renamed over the target, so an interrupted
//! save leaves the prior value intact.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur when persisting a credential
#[derive(Debug, Error)]
pub enum CredentialStoreError {
    /// The credential record could not be serialized
    #[error("failed to serialize credential record: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The credential file could not be written or renamed into place
    #[error("failed to write credential file at {path}: {source}")]
    Write {
        /// The path that was being written
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },
}

/// The persisted record format
#[derive(Debug, Serialize, Deserialize)]
struct TokenRecord {
    token: String,
}

/// File-backed store for the bot's bearer token
#[derive(Clone, Debug)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Create a store backed by the given file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored token, if any
    ///
    /// Returns `None` when the file is missing, unreadable, malformed, or
    /// holds an empty token. Malformed content is logged and treated as
    /// "no credential" so the caller re-authenticates instead of aborting.
    #[must_use]
    pub fn load(&self) -> Option<String> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No credential file");
                return None;
            }
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "Failed to read credential file");
                return None;
            }
        };

        match serde_json::from_str::<TokenRecord>(&raw) {
            Ok(record) if !record.token.is_empty() => Some(record.token),
            Ok(_) => {
                warn!(path = %self.path.display(), "Credential file holds an empty token");
                None
            }
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "Credential file is malformed, ignoring");
                None
            }
        }
    }

    /// Persist a token, replacing any previous record
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError`] when the record cannot be written;
    /// in that case the previously stored value is left untouched.
    pub fn save(&self, token: &str) -> Result<(), CredentialStoreError> {
        let body = serde_json::to_string(&TokenRecord {
            token: token.to_string(),
        })?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| CredentialStoreError::Write {
                    path: self.path.clone(),
                    source: e,
                })?;
            }
        }

        // Write-then-rename keeps the prior record if the write is interrupted
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, body).map_err(|e| CredentialStoreError::Write {
            path: tmp.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|e| CredentialStoreError::Write {
            path: self.path.clone(),
            source: e,
        })?;

        debug!(path = %self.path.display(), "Credential persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path().join("tokens.json"));

        store.save("abc123").unwrap();
        assert_eq!(store.load(), Some("abc123".to_string()));

        // save(load()) is a no-op on the persisted value
        let loaded = store.load().unwrap();
        store.save(&loaded).unwrap();
        assert_eq!(store.load(), Some("abc123".to_string()));
    }

    #[test]
    fn test_save_overwrites_previous_token() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path().join("tokens.json"));

        store.save("old-token").unwrap();
        store.save("new-token").unwrap();
        assert_eq!(store.load(), Some("new-token".to_string()));
    }

    #[test]
    fn test_load_missing_file_yields_none() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path().join("does-not-exist.json"));

        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_load_malformed_file_yields_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokens.json");
        std::fs::write(&path, "{ not json at all").unwrap();

        let store = CredentialStore::new(path);
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_load_empty_token_yields_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokens.json");
        std::fs::write(&path, r#"{"token": ""}"#).unwrap();

        let store = CredentialStore::new(path);
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path().join("nested").join("tokens.json"));

        store.save("tok").unwrap();
        assert_eq!(store.load(), Some("tok".to_string()));
    }

    #[test]
    fn test_record_format_matches_wire_shape() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokens.json");
        let store = CredentialStore::new(&path);

        store.save("shaped").unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["token"], "shaped");
    }
}
