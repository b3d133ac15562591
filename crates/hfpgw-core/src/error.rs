//! Application error types with rich context

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Telephony Service Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Telephony service unreachable: {message}")]
    Transport { message: String },

    #[error("oFono replied with an error: {name}: {message}")]
    Remote { name: String, message: String },

    #[error("Bridge protocol error: {message}")]
    Protocol { message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    // ─────────────────────────────────────────────────────────────
    // Channel/Communication Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn remote(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check if this error should trigger application exit
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ChannelClosed | Error::ConfigNotFound { .. })
    }
}

// ─────────────────────────────────────────────────────────────────
// HFP Result Codes
// ─────────────────────────────────────────────────────────────────

/// Extended error result codes (`+CME ERROR`) reported back to the HF.
///
/// These are protocol outcomes rather than failures of the gateway, so they
/// live beside [`Error`] instead of inside it. A successful request is
/// represented as `Ok(())` by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmeError {
    /// The modem operation failed or could not be issued
    #[error("AG failure")]
    AgFailure,

    /// No call or state qualifies for the request
    #[error("operation not allowed")]
    NotAllowed,

    /// Feature disabled or not implemented
    #[error("operation not supported")]
    NotSupported,

    /// Call index does not resolve to a known call
    #[error("invalid index")]
    InvalidIndex,
}

impl CmeError {
    /// Numeric `+CME ERROR: <n>` code from 3GPP TS 27.007
    pub fn code(&self) -> u8 {
        match self {
            CmeError::AgFailure => 0,
            CmeError::NotAllowed => 3,
            CmeError::NotSupported => 4,
            CmeError::InvalidIndex => 21,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = Error::transport("bus closed");
        assert_eq!(err.to_string(), "Telephony service unreachable: bus closed");

        let err = Error::remote("org.ofono.Error.Failed", "Operation failed");
        assert!(err.to_string().contains("org.ofono.Error.Failed"));
        assert!(err.to_string().contains("Operation failed"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_fatal() {
        assert!(Error::ChannelClosed.is_fatal());
        assert!(Error::ConfigNotFound {
            path: PathBuf::from("/etc/hfpgw.toml")
        }
        .is_fatal());
        assert!(!Error::transport("test").is_fatal());
    }

    #[test]
    fn test_cme_error_codes() {
        assert_eq!(CmeError::AgFailure.code(), 0);
        assert_eq!(CmeError::NotAllowed.code(), 3);
        assert_eq!(CmeError::NotSupported.code(), 4);
        assert_eq!(CmeError::InvalidIndex.code(), 21);
    }

    #[test]
    fn test_cme_error_serializes_snake_case() {
        let json = serde_json::to_string(&CmeError::InvalidIndex).unwrap();
        assert_eq!(json, "\"invalid_index\"");
    }

    #[test]
    fn test_context_preserves_error() {
        let res: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = res.context("reading last number").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
