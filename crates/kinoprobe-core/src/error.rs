//! Error types for the kinoprobe library
//!
//! Provides a single error enum with human-readable messages covering
//! transport failures, device-flow terminal states, and local I/O.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Error type for all kinoprobe operations
///
/// Transport-level failures carry the underlying `reqwest::Error`.
/// Device-flow terminal states are distinct variants so callers can tell
/// an expired code apart from an explicit denial or a local timeout.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Authorization server returned a malformed or incomplete response
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Device code expired on the server (`error=expired_token`)
    #[error("device authorization expired before the user approved it")]
    AuthExpired,

    /// User or server rejected the authorization (`error=access_denied`)
    #[error("device authorization was denied")]
    AuthDenied,

    /// Local deadline elapsed while waiting for the user to authorize
    #[error("timed out waiting for user authorization (device code expired)")]
    AuthTimeout,

    /// No access token could be resolved from argument, environment, or file
    #[error("no access token available")]
    MissingCredentials,

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Filesystem error while writing snapshots or token files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error for local artifacts
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Serialize for ProbeError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Result type alias for kinoprobe operations
pub type Result<T> = std::result::Result<T, ProbeError>;
