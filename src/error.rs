//! Error types for combat-wire processing.
//!
//! All errors implement the `std::error::Error` trait and carry structured
//! context. The pipeline itself is designed to degrade rather than fail:
//! malformed frames are resynchronized over, decompression failures fall
//! back to the raw bytes, and decoder errors skip a single event. The
//! variants here cover the conditions that *are* surfaced to callers.
//!
//! ## Error Categories
//!
//! - **Parse Errors**: a decoder or archive reader met bytes it cannot
//!   interpret (usually a too-short payload)
//! - **Source Errors**: the byte-producing collaborator failed
//! - **Archive Errors**: I/O problems reading or writing a capture archive
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use skirmish::CombatError;
//!
//! let error = CombatError::source_failed("capture device went away");
//! if error.is_retryable() {
//!     println!("Can retry this operation");
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for combat-wire operations.
pub type Result<T, E = CombatError> = std::result::Result<T, E>;

/// Main error type for combat-wire operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CombatError {
    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Byte source failed: {reason}")]
    Source {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Archive error: {path}")]
    Archive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CombatError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            CombatError::Parse { .. } => false,
            CombatError::Source { .. } => true,
            CombatError::Archive { .. } => false,
        }
    }

    /// Helper constructor for parse errors with context.
    pub fn parse_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        CombatError::Parse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for source failures.
    pub fn source_failed(reason: impl Into<String>) -> Self {
        CombatError::Source { reason: reason.into(), source: None }
    }

    /// Helper constructor for source failures with an underlying cause.
    pub fn source_failed_with(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        CombatError::Source { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for archive errors with path context.
    pub fn archive_error(path: PathBuf, source: std::io::Error) -> Self {
        CombatError::Archive { path, source }
    }
}

impl From<std::io::Error> for CombatError {
    fn from(err: std::io::Error) -> Self {
        CombatError::Archive { path: PathBuf::from("<unknown>"), source: err }
    }
}
