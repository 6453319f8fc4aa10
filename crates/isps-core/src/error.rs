//! # Core Error Types
//!
//! Errors raised by the foundational type constructors. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//! Higher layers (workflow, issuance, API) define their own error
//! taxonomies and convert from this one at the boundary.

use thiserror::Error;

/// Errors from foundational type construction.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Timestamp string was malformed or not UTC.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Score outside the 0–20 exam scale (or non-finite).
    #[error("invalid score {0}: must be a finite value in [0, 20]")]
    InvalidScore(f64),

    /// Document reference was empty or blank.
    #[error("document reference must not be empty")]
    EmptyDocumentRef,

    /// A date range with the end before the start.
    #[error("invalid date range: {debut} is after {fin}")]
    InvalidDateRange {
        /// Start date of the range.
        debut: String,
        /// End date of the range.
        fin: String,
    },
}
