//! Error types for the Aegis domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`Error`] unifies them.

use thiserror::Error;

/// The top-level error type for all Aegis operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Registry errors ---
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    // --- Audit storage faults ---
    #[error("Audit storage fault: {0}")]
    Storage(#[from] StorageError),

    // --- Analyzer errors ---
    #[error("Analyzer error: {0}")]
    Analyzer(#[from] AnalyzerError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Policy ---
    #[error("Policy violation: {reason}")]
    PolicyViolation { reason: String },

    #[error("Unknown transaction: {0}")]
    UnknownTransaction(String),

    #[error("Transaction {tx_id} is not pending (decision: {decision})")]
    NotPending { tx_id: String, decision: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Agent already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Trust score {0} out of range (0-100)")]
    InvalidTrustScore(i64),
}

/// Failure to durably record an audit event.
///
/// Always fatal for the operation that produced the event.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("I/O failure on {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to encode audit event: {0}")]
    Encode(String),

    #[error("Audit store exhausted: {0}")]
    Exhausted(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalyzerError {
    #[error("Pattern compilation failed: {0}")]
    Pattern(String),

    #[error("Invalid analyzer input: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_error_displays_address() {
        let err = Error::Registry(RegistryError::AlreadyRegistered("0xabc".into()));
        assert!(err.to_string().contains("already registered"));
        assert!(err.to_string().contains("0xabc"));
    }

    #[test]
    fn storage_error_converts_into_top_level() {
        let err: Error = StorageError::Io {
            path: "/var/aegis/audit.jsonl".into(),
            reason: "disk full".into(),
        }
        .into();
        assert!(matches!(err, Error::Storage(_)));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn config_shorthand() {
        let err = Error::config("daily_limit must be non-negative");
        assert!(err.to_string().starts_with("Configuration error"));
    }
}
