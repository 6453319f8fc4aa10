//! # Participants
//!
//! An individual enrolled in a formation. Participants are owned by the
//! aggregate: they are added before validation, graded by the grading
//! action, and certified at director sign-off — never mutated from
//! outside the workflow.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use isps_core::{DiplomaNumber, DocumentRef, ParticipantId, Score, Timestamp};

/// Per-participant outcome within a formation.
///
/// This enum is the canonical representation; the accented French
/// labels are display-only (see `Display`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    /// Enrolled, not yet graded.
    Pending,
    /// Graded at or above the pass threshold.
    Passed,
    /// Graded below the pass threshold.
    Failed,
    /// Passed and signed off by the director-general.
    Certified,
    /// Barred from the exam (e.g. failed background check).
    NotAuthorized,
}

impl ParticipantStatus {
    /// The canonical tag name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Certified => "certified",
            Self::NotAuthorized => "not_authorized",
        }
    }

    /// The French display label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "En attente",
            Self::Passed => "Réussi",
            Self::Failed => "Échoué",
            Self::Certified => "Certifié",
            Self::NotAuthorized => "Non autorisé",
        }
    }
}

impl std::fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// An individual enrolled in a formation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    /// Unique participant identifier.
    pub id: ParticipantId,
    /// Family name.
    pub nom: String,
    /// Given name.
    pub prenom: String,
    /// Date of birth.
    pub date_naissance: Option<NaiveDate>,
    /// Place of birth.
    pub lieu_naissance: Option<String>,
    /// Identity document reference.
    pub url_cni: Option<DocumentRef>,
    /// Criminal-record-check reference.
    pub url_casier_judiciaire: Option<DocumentRef>,
    /// Exam score, set by grading.
    pub note: Option<Score>,
    /// Outcome tag.
    pub statut: ParticipantStatus,
    /// Free-text appreciation from the grader.
    pub appreciation: Option<String>,
    /// Diploma number, assigned at issuance.
    pub numero_diplome: Option<DiplomaNumber>,
    /// Director-general sign-off timestamp.
    pub date_validation_dg: Option<Timestamp>,
}

impl Participant {
    /// Enroll a new participant, pending grading.
    pub fn new(nom: impl Into<String>, prenom: impl Into<String>) -> Self {
        Self {
            id: ParticipantId::new(),
            nom: nom.into(),
            prenom: prenom.into(),
            date_naissance: None,
            lieu_naissance: None,
            url_cni: None,
            url_casier_judiciaire: None,
            note: None,
            statut: ParticipantStatus::Pending,
            appreciation: None,
            numero_diplome: None,
            date_validation_dg: None,
        }
    }
}
