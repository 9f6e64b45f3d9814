//! Error taxonomy for registry construction and message validation
//!
//! Setup-time failures surface as [`MidasError`]. Event-time misses (an
//! unmapped wire address, an unknown status) are not errors and come back as
//! empty results instead.

use thiserror::Error;

/// Errors raised while building tables or validating message bytes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MidasError {
    /// An identifier or concrete pattern value is already bound
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// A required single-valued lookup missed
    #[error("not found: {0}")]
    NotFound(String),

    /// A MIDI data byte outside 0..=127
    #[error("invalid {field} byte: {value} (expected 0..=127)")]
    InvalidByte { field: &'static str, value: i64 },

    /// Sysex length or option mismatch, or a malformed frame
    #[error("validation failed: {0}")]
    Validation(String),

    /// Composite key or lookup tuple has the wrong length
    #[error("arity mismatch: expected {expected} positions, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },
}

/// Result alias used across the engine
pub type Result<T> = std::result::Result<T, MidasError>;
