//! Gateway Error Taxonomy
//!
//! Error types for the remote API gateway. Every variant in steady-state
//! operation is recoverable: the orchestrator reports it and re-enters the
//! loop after backoff. Nothing here terminates the process.

use thiserror::Error;

/// Errors produced by the API gateway
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The HTTP request could not be completed (transport failure, timeout)
    #[error("request to `{endpoint}` failed: {source}")]
    RequestFailed {
        /// The endpoint that was being called
        endpoint: String,
        /// The underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// The remote rejected the call with a non-401 HTTP error status
    #[error("remote rejected `{endpoint}` with HTTP {status}")]
    HttpStatus {
        /// The endpoint that was being called
        endpoint: String,
        /// The HTTP status code returned
        status: u16,
    },

    /// Re-authentication was attempted the maximum number of times
    #[error("maximum re-authentication attempts ({0}) reached")]
    MaxRetriesExceeded(u32),

    /// The transport succeeded but the response `status` field was not "OK"
    #[error("remote returned status `{status}` for `{endpoint}`")]
    LogicalError {
        /// The endpoint that was being called
        endpoint: String,
        /// The status string the remote reported (or `<missing>`)
        status: String,
    },

    /// The response body did not have the expected shape
    #[error("malformed response from `{endpoint}`: {reason}")]
    MalformedResponse {
        /// The endpoint that was being called
        endpoint: String,
        /// What was missing or wrong
        reason: String,
    },

    /// No user identity could be resolved; identity-scoped calls cannot run
    #[error("no user identity available")]
    IdentityMissing,

    /// The token exchange itself failed
    #[error("token exchange failed: {0}")]
    TokenExchange(String),
}
