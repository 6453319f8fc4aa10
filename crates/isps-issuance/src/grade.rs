//! # Grade Derivation
//!
//! Pass/fail is a pure function of the numeric score. The threshold is
//! inclusive: a 10/20 passes, a 9.5/20 fails. There is exactly one
//! implementation of this rule in the system.

use serde::{Deserialize, Serialize};

use isps_core::Score;

/// Minimum passing score, inclusive.
pub const PASS_THRESHOLD: f64 = 10.0;

/// The outcome derived from an exam score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Score at or above the pass threshold.
    Passed,
    /// Score below the pass threshold.
    Failed,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passed => f.write_str("PASSED"),
            Self::Failed => f.write_str("FAILED"),
        }
    }
}

/// Derive the outcome for a score.
pub fn outcome(score: Score) -> Outcome {
    if score.value() >= PASS_THRESHOLD {
        Outcome::Passed
    } else {
        Outcome::Failed
    }
}
