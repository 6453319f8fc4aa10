//! # Supervision Reports
//!
//! The safety officer's post-exam observation report. Attached to a
//! formation exactly once, only after the exam has been formally
//! closed, and required before any grading can happen.

use serde::{Deserialize, Serialize};

use isps_core::Timestamp;

/// The caller-supplied content of a supervision report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisionReportPayload {
    /// General observations. Required non-empty.
    pub observations_generales: String,
    /// Whether the delivered content conformed to the approved subject.
    pub conformite_contenu: Option<bool>,
    /// Whether the trainer conformed to requirements.
    pub conformite_formateur: Option<bool>,
    /// Whether the venue conformed to requirements.
    pub conformite_lieu: Option<bool>,
    /// Recommendations for future sessions.
    pub recommandations: Option<String>,
    /// Fitness determination for the exam.
    pub apte_examen: bool,
}

/// A supervision report as attached to a formation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RapportSupervision {
    /// General observations.
    pub observations_generales: String,
    /// Content conformity, if assessed.
    pub conformite_contenu: Option<bool>,
    /// Trainer conformity, if assessed.
    pub conformite_formateur: Option<bool>,
    /// Venue conformity, if assessed.
    pub conformite_lieu: Option<bool>,
    /// Recommendations, if any.
    pub recommandations: Option<String>,
    /// Fitness determination for the exam.
    pub apte_examen: bool,
    /// When the report was submitted.
    pub date_rapport: Timestamp,
}

impl RapportSupervision {
    /// Stamp a payload into a report at the current time.
    pub fn from_payload(payload: SupervisionReportPayload) -> Self {
        Self {
            observations_generales: payload.observations_generales,
            conformite_contenu: payload.conformite_contenu,
            conformite_formateur: payload.conformite_formateur,
            conformite_lieu: payload.conformite_lieu,
            recommandations: payload.recommandations,
            apte_examen: payload.apte_examen,
            date_rapport: Timestamp::now(),
        }
    }
}
