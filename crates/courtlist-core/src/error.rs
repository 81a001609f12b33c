//! # Error Hierarchy
//!
//! Structured error types shared by every crate in the workspace, built with
//! `thiserror`. No `Box<dyn Error>`, no `.unwrap()` outside tests.
//!
//! Subsystem crates define their own error enums (rule registry, structural
//! validation, supersession) and wrap these with `#[from]` where they
//! surface them.

use thiserror::Error;

/// Validation errors for domain primitive newtypes.
///
/// Each identifier type enforces its format at construction time. The
/// rejected input travels with the error so operators can see exactly what
/// an upstream provider sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// List type identifier is not `SCREAMING_SNAKE_CASE`.
    #[error("invalid list type: \"{0}\" (expected upper-case words separated by underscores)")]
    InvalidListType(String),

    /// Enumerated envelope value is not one of the known variants.
    #[error("invalid {field}: \"{value}\"")]
    UnknownVariant {
        /// Name of the enumerated field.
        field: &'static str,
        /// The value that failed to parse.
        value: String,
    },

    /// Timestamp string is not valid UTC ISO 8601.
    #[error("invalid timestamp: \"{value}\" ({reason})")]
    InvalidTimestamp {
        /// The string that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Date arithmetic left the representable calendar.
    #[error("{days} day(s) from {base} is out of range")]
    OutOfRange {
        /// The starting instant.
        base: String,
        /// The offset that overflowed.
        days: i64,
    },
}

/// Errors during artefact lifecycle transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateTransitionError {
    /// The attempted transition is not valid from the current state.
    #[error("invalid transition from {from} to {to}: {reason}")]
    InvalidTransition {
        /// The current state name.
        from: String,
        /// The attempted target state name.
        to: String,
        /// Human-readable reason for the rejection.
        reason: String,
    },
}
