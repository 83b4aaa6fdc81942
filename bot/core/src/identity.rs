//! Identity Resolver
//!
//! Extracts a stable user identifier from the locally supplied init-data
//! payload: a URL-encoded key/value string whose `user` key holds a JSON
//! object with at least an `id` field.
//!
//! Resolution failures are reported, never fatal: the orchestrator still
//! starts with identity absent and identity-scoped calls fail with
//! [`GatewayError::IdentityMissing`](crate::error::GatewayError::IdentityMissing).

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

/// Resolves the user identity from a local init-data file
#[derive(Clone, Debug)]
pub struct IdentityResolver {
    path: PathBuf,
}

impl IdentityResolver {
    /// Create a resolver backed by the given init-data file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the init-data file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the raw init-data payload, trimmed
    ///
    /// The same blob doubles as the `initDataRaw` parameter of the token
    /// exchange, so it is exposed separately from [`resolve`](Self::resolve).
    #[must_use]
    pub fn raw(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    warn!(path = %self.path.display(), "Init-data file is empty");
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "Failed to read init-data file");
                None
            }
        }
    }

    /// Resolve the user id from the init-data payload
    ///
    /// Any parse failure (missing source, missing `user` field, malformed
    /// JSON, missing `id`) is logged and yields `None`.
    #[must_use]
    pub fn resolve(&self) -> Option<String> {
        let raw = self.raw()?;
        match extract_user_id(&raw) {
            Some(id) => {
                debug!(user_id = %id, "Resolved user identity");
                Some(id)
            }
            None => {
                warn!(path = %self.path.display(), "Could not extract user id from init data");
                None
            }
        }
    }
}

/// Extract the `user.id` field from a URL-encoded init-data payload
///
/// The `id` may be a JSON number or string; it is normalized to a `String`.
#[must_use]
pub fn extract_user_id(payload: &str) -> Option<String> {
    let user = url::form_urlencoded::parse(payload.as_bytes())
        .find(|(key, _)| key == "user")
        .map(|(_, value)| value.into_owned())?;

    let user: Value = serde_json::from_str(&user).ok()?;

    match user.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
