//! # Exam Scores
//!
//! `Score` wraps a grade on the 0–20 scale used for formation exams.
//! Construction rejects out-of-range values; half-point granularity is
//! conventional but not enforced. Pass/fail derivation lives in
//! isps-issuance — this type only guarantees the domain.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Minimum score on the exam scale.
pub const SCORE_MIN: f64 = 0.0;
/// Maximum score on the exam scale.
pub const SCORE_MAX: f64 = 20.0;

/// A validated exam score in `[0, 20]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Score(f64);

impl Score {
    /// Create a score, rejecting values outside `[0, 20]` or non-finite input.
    pub fn new(value: f64) -> Result<Self, CoreError> {
        if !value.is_finite() || !(SCORE_MIN..=SCORE_MAX).contains(&value) {
            return Err(CoreError::InvalidScore(value));
        }
        Ok(Self(value))
    }

    /// The raw numeric value.
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/20", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_scores() {
        assert!(Score::new(0.0).is_ok());
        assert!(Score::new(9.5).is_ok());
        assert!(Score::new(10.0).is_ok());
        assert!(Score::new(20.0).is_ok());
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(Score::new(-0.5).is_err());
        assert!(Score::new(20.5).is_err());
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(Score::new(f64::NAN).is_err());
        assert!(Score::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Score::new(12.5).unwrap().to_string(), "12.5/20");
    }

    #[test]
    fn test_serde_roundtrip() {
        let score = Score::new(14.0).unwrap();
        let json = serde_json::to_string(&score).unwrap();
        assert_eq!(json, "14.0");
        let parsed: Score = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, score);
    }
}
