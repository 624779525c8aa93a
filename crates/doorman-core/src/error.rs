//! Unified error types for Doorman.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire library.
///
/// Semantic rejections ([`ErrorKind::Rejected`]) are expected outcomes
/// (wrong password, unknown login, expired session) and are safe to retry
/// with corrected input. Every other kind is operator-actionable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Invalid construction input: bad table name, non-positive session
    /// duration, negative privilege threshold, unreadable config file.
    Configuration,
    /// The backing table is absent, malformed, or could not be created.
    Schema,
    /// An expected authentication rejection: bad credentials, unknown
    /// login or token, expired session, disabled account, missing row.
    Rejected,
    /// Query preparation or execution failed in the storage backend.
    Storage,
    /// A write was refused before touching storage: duplicate login,
    /// field/value type mismatch, negative level.
    Integrity,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Schema => write!(f, "SCHEMA"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::Storage => write!(f, "STORAGE"),
            Self::Integrity => write!(f, "INTEGRITY"),
        }
    }
}

/// The unified error used throughout Doorman.
///
/// Crate-specific errors are mapped into `AppError` with explicit
/// `.map_err()` calls so that callers can always distinguish "the user
/// typed the wrong password" from "the database is down" by inspecting
/// [`AppError::kind`].
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create a schema error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Schema, message)
    }

    /// Create a semantic rejection.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Rejected, message)
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// Create an integrity violation.
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Integrity, message)
    }

    /// Whether this error is an expected semantic rejection rather than
    /// an infrastructure failure.
    pub fn is_rejection(&self) -> bool {
        self.kind == ErrorKind::Rejected
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
