//! # Formation Aggregate and Transition Engine
//!
//! The root aggregate of the certification workflow. A `Formation` owns
//! its participants, its supervision report, and its transition log,
//! and exposes one method per workflow action. Every action:
//!
//! 1. checks the actor's capability (authorization),
//! 2. checks the current status and sub-record preconditions,
//! 3. validates the payload,
//! 4. applies the whole mutation and appends a transition record —
//!    or returns an error having changed nothing.
//!
//! There are no other mutation paths: the presentation layer and the
//! store call these methods or read accessors, nothing else.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use isps_core::{ActorId, DocumentRef, FormationId, ParticipantId, Score, Timestamp};
use isps_issuance::{
    outcome, Diploma, DiplomaRegistry, DiplomaRequest, IssuanceError, IssuingAuthority, Outcome,
};
use isps_roles::{Actor, RoleTag};

use crate::participant::{Participant, ParticipantStatus};
use crate::report::{RapportSupervision, SupervisionReportPayload};

// ─── Formation Status ────────────────────────────────────────────────

/// The workflow status of a formation.
///
/// Statuses move forward along a single path; there are no backward
/// transitions. `Rejected` and `Completed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormationStatus {
    /// Submitted by the RSO, awaiting the safety officer's decision.
    PendingValidation,
    /// Validated; the exam has not started yet.
    ValidatedAwaitingExam,
    /// The exam is running.
    ExamInProgress,
    /// The exam is closed; supervision report and grading happen here.
    ExamCompleted,
    /// Graded, awaiting director-general sign-off.
    AwaitingDirectorValidation,
    /// Rejected by the safety officer (terminal).
    Rejected,
    /// Diplomas issued (terminal).
    Completed,
}

impl FormationStatus {
    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Completed)
    }

    /// The canonical status name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingValidation => "PENDING_VALIDATION",
            Self::ValidatedAwaitingExam => "VALIDATED_AWAITING_EXAM",
            Self::ExamInProgress => "EXAM_IN_PROGRESS",
            Self::ExamCompleted => "EXAM_COMPLETED",
            Self::AwaitingDirectorValidation => "AWAITING_DIRECTOR_VALIDATION",
            Self::Rejected => "REJECTED",
            Self::Completed => "COMPLETED",
        }
    }
}

impl std::fmt::Display for FormationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors that can occur during workflow actions.
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// The actor's role lacks the capability for this action.
    #[error("role '{role}' is not authorized to {action}")]
    Authorization {
        /// The attempted action.
        action: &'static str,
        /// The actor's normalized role.
        role: RoleTag,
    },

    /// A required field was missing or malformed.
    #[error("validation error: {0}")]
    Validation(String),

    /// The action is not legal from the current status.
    #[error("cannot {action} while formation is {status}")]
    State {
        /// The attempted action.
        action: &'static str,
        /// The formation's current status.
        status: FormationStatus,
    },

    /// Grading requires a supervision report first.
    #[error("cannot record grades: no supervision report has been submitted")]
    ReportMissing,

    /// A supervision report can be attached only once.
    #[error("a supervision report has already been submitted")]
    ReportAlreadyExists,

    /// A grade referenced a participant outside this formation.
    #[error("{0} is not part of this formation")]
    UnknownParticipant(ParticipantId),

    /// Diploma issuance was refused by the registry.
    #[error(transparent)]
    Issuance(#[from] IssuanceError),
}

// ─── Payloads ────────────────────────────────────────────────────────

/// The data needed to create a formation (the RSO's submission).
#[derive(Debug, Clone)]
pub struct NewFormation {
    /// Category tag (e.g. "agent_surete_portuaire").
    pub formation_type: String,
    /// Location of the session.
    pub lieu: String,
    /// Training centre, if any.
    pub centre_formation: Option<String>,
    /// First day of the session.
    pub date_debut: NaiveDate,
    /// Last day of the session.
    pub date_fin: NaiveDate,
    /// The RSO who proposed the formation.
    pub rso: ActorId,
    /// Initially enrolled participants.
    pub participants: Vec<Participant>,
}

/// One participant's grade in a grading batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeEntry {
    /// The participant being graded.
    pub participant_id: ParticipantId,
    /// The exam score.
    pub note: Score,
    /// Explicit outcome override (e.g. `NotAuthorized`). When absent
    /// the outcome derives from the score.
    pub statut_override: Option<ParticipantStatus>,
    /// Free-text appreciation.
    pub appreciation: Option<String>,
}

// ─── Transition Records ──────────────────────────────────────────────

/// Audit record of one status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Status before the transition.
    pub from_status: FormationStatus,
    /// Status after the transition.
    pub to_status: FormationStatus,
    /// Who performed the action.
    pub actor: ActorId,
    /// The actor's role at the time.
    pub role: RoleTag,
    /// When the transition occurred.
    pub timestamp: Timestamp,
}

// ─── Formation ───────────────────────────────────────────────────────

/// A scheduled certification session and its workflow state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Formation {
    /// Unique formation identifier.
    pub id: FormationId,
    /// Category tag.
    pub formation_type: String,
    /// Location of the session.
    pub lieu: String,
    /// Training centre, if any.
    pub centre_formation: Option<String>,
    /// First day of the session.
    pub date_debut: NaiveDate,
    /// Last day of the session.
    pub date_fin: NaiveDate,
    /// Current workflow status.
    pub status: FormationStatus,
    /// Exam subject document, attached at validation.
    pub url_sujet_examen: Option<DocumentRef>,
    /// Scanned answer copies, attached after the exam.
    pub url_copies_examen: Option<DocumentRef>,
    /// Rejection reason, recorded by `reject`.
    pub motif_rejet: Option<String>,
    /// The RSO who proposed the formation.
    pub rso: ActorId,
    /// The safety officer who validated it.
    pub chef_surete: Option<ActorId>,
    /// The director-general who signed off.
    pub dg: Option<ActorId>,
    /// The supervision report, at most one.
    pub rapport_supervision: Option<RapportSupervision>,
    /// Enrolled participants.
    pub participants: Vec<Participant>,
    /// Ordered log of all status transitions.
    pub transitions: Vec<TransitionRecord>,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Last mutation timestamp.
    pub updated_at: Timestamp,
}

impl Formation {
    /// Create a formation from an RSO submission, in `PendingValidation`.
    ///
    /// # Errors
    ///
    /// `Validation` when the category or location is blank, or when the
    /// date range is inverted.
    pub fn submit(request: NewFormation) -> Result<Self, WorkflowError> {
        if request.formation_type.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "formation type must not be empty".to_string(),
            ));
        }
        if request.lieu.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "lieu must not be empty".to_string(),
            ));
        }
        if request.date_debut > request.date_fin {
            return Err(WorkflowError::Validation(format!(
                "date_debut {} is after date_fin {}",
                request.date_debut, request.date_fin
            )));
        }

        let now = Timestamp::now();
        Ok(Self {
            id: FormationId::new(),
            formation_type: request.formation_type,
            lieu: request.lieu,
            centre_formation: request.centre_formation,
            date_debut: request.date_debut,
            date_fin: request.date_fin,
            status: FormationStatus::PendingValidation,
            url_sujet_examen: None,
            url_copies_examen: None,
            motif_rejet: None,
            rso: request.rso,
            chef_surete: None,
            dg: None,
            rapport_supervision: None,
            participants: request.participants,
            transitions: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    // ── Actions ──────────────────────────────────────────────────────

    /// Validate the submission (PENDING_VALIDATION → VALIDATED_AWAITING_EXAM).
    ///
    /// Safety-responsible roles only. Optionally attaches the exam
    /// subject document and stamps the validating officer.
    pub fn validate(
        &mut self,
        actor: &Actor,
        exam_subject: Option<DocumentRef>,
    ) -> Result<(), WorkflowError> {
        self.authorize(actor.role.is_safety_responsible(), "validate", actor)?;
        self.require_status(FormationStatus::PendingValidation, "validate")?;

        self.url_sujet_examen = exam_subject;
        self.chef_surete = Some(actor.id.clone());
        self.do_transition(FormationStatus::ValidatedAwaitingExam, actor);
        Ok(())
    }

    /// Reject the submission (PENDING_VALIDATION → REJECTED). Terminal.
    ///
    /// Safety-responsible roles only. The reason is required and
    /// recorded as `motif_rejet`.
    pub fn reject(&mut self, actor: &Actor, reason: &str) -> Result<(), WorkflowError> {
        self.authorize(actor.role.is_safety_responsible(), "reject", actor)?;
        self.require_status(FormationStatus::PendingValidation, "reject")?;
        if reason.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "rejection reason must not be empty".to_string(),
            ));
        }

        self.motif_rejet = Some(reason.to_string());
        self.do_transition(FormationStatus::Rejected, actor);
        Ok(())
    }

    /// Open the exam (VALIDATED_AWAITING_EXAM → EXAM_IN_PROGRESS).
    pub fn start_exam(&mut self, actor: &Actor) -> Result<(), WorkflowError> {
        self.authorize(actor.role.can_manage_formation(), "start the exam", actor)?;
        self.require_status(FormationStatus::ValidatedAwaitingExam, "start the exam")?;
        self.do_transition(FormationStatus::ExamInProgress, actor);
        Ok(())
    }

    /// Close the exam (EXAM_IN_PROGRESS → EXAM_COMPLETED).
    pub fn end_exam(&mut self, actor: &Actor) -> Result<(), WorkflowError> {
        self.authorize(actor.role.can_manage_formation(), "end the exam", actor)?;
        self.require_status(FormationStatus::ExamInProgress, "end the exam")?;
        self.do_transition(FormationStatus::ExamCompleted, actor);
        Ok(())
    }

    /// Attach the scanned answer copies after the exam has closed.
    ///
    /// Not a status transition; the document reference is recorded on
    /// the aggregate.
    pub fn attach_exam_copies(
        &mut self,
        actor: &Actor,
        copies: DocumentRef,
    ) -> Result<(), WorkflowError> {
        self.authorize(
            actor.role.can_manage_formation(),
            "attach exam copies",
            actor,
        )?;
        self.require_status(FormationStatus::ExamCompleted, "attach exam copies")?;
        self.url_copies_examen = Some(copies);
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Attach the supervision report. Status remains EXAM_COMPLETED.
    ///
    /// Legal once per formation, only after the exam has closed.
    /// `observations_generales` is required non-empty.
    pub fn submit_supervision_report(
        &mut self,
        actor: &Actor,
        payload: SupervisionReportPayload,
    ) -> Result<(), WorkflowError> {
        self.authorize(
            actor.role.can_manage_formation(),
            "submit the supervision report",
            actor,
        )?;
        self.require_status(
            FormationStatus::ExamCompleted,
            "submit the supervision report",
        )?;
        if self.rapport_supervision.is_some() {
            return Err(WorkflowError::ReportAlreadyExists);
        }
        if payload.observations_generales.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "observations_generales must not be empty".to_string(),
            ));
        }

        self.rapport_supervision = Some(RapportSupervision::from_payload(payload));
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Record the grading batch (EXAM_COMPLETED → AWAITING_DIRECTOR_VALIDATION).
    ///
    /// Safety-responsible roles only, and only once the supervision
    /// report exists. Each listed participant receives its note and the
    /// derived outcome (score >= 10 passes) unless the entry carries an
    /// explicit override. The whole batch is validated before any grade
    /// is applied.
    pub fn record_grades(
        &mut self,
        actor: &Actor,
        grades: Vec<GradeEntry>,
    ) -> Result<(), WorkflowError> {
        self.authorize(actor.role.is_safety_responsible(), "record grades", actor)?;
        self.require_status(FormationStatus::ExamCompleted, "record grades")?;
        if self.rapport_supervision.is_none() {
            return Err(WorkflowError::ReportMissing);
        }
        if grades.is_empty() {
            return Err(WorkflowError::Validation(
                "at least one grade is required".to_string(),
            ));
        }

        // Validate the whole batch before touching any participant.
        let mut seen = std::collections::HashSet::new();
        for entry in &grades {
            if !seen.insert(entry.participant_id) {
                return Err(WorkflowError::Validation(format!(
                    "duplicate grade entry for {}",
                    entry.participant_id
                )));
            }
            if !self.participants.iter().any(|p| p.id == entry.participant_id) {
                return Err(WorkflowError::UnknownParticipant(entry.participant_id));
            }
        }

        for entry in grades {
            if let Some(p) = self
                .participants
                .iter_mut()
                .find(|p| p.id == entry.participant_id)
            {
                p.note = Some(entry.note);
                p.statut = entry.statut_override.unwrap_or_else(|| match outcome(entry.note) {
                    Outcome::Passed => ParticipantStatus::Passed,
                    Outcome::Failed => ParticipantStatus::Failed,
                });
                p.appreciation = entry.appreciation;
            }
        }

        self.do_transition(FormationStatus::AwaitingDirectorValidation, actor);
        Ok(())
    }

    /// Issue diplomas (AWAITING_DIRECTOR_VALIDATION → COMPLETED). Terminal.
    ///
    /// Director-general only. Every participant whose status is
    /// `Passed` receives a unique diploma number from the registry, is
    /// promoted to `Certified`, and is stamped with the sign-off date.
    /// Other participants are untouched. All diplomas are minted before
    /// any participant state changes, so a registry refusal leaves the
    /// formation unchanged.
    pub fn issue_diplomas(
        &mut self,
        actor: &Actor,
        registry: &mut DiplomaRegistry,
        authority: &IssuingAuthority,
    ) -> Result<Vec<Diploma>, WorkflowError> {
        self.authorize(actor.role.is_director(), "issue diplomas", actor)?;
        self.require_status(
            FormationStatus::AwaitingDirectorValidation,
            "issue diplomas",
        )?;

        let mut minted: Vec<Diploma> = Vec::new();
        for p in self
            .participants
            .iter()
            .filter(|p| p.statut == ParticipantStatus::Passed)
        {
            let diploma = registry.issue(
                DiplomaRequest {
                    formation_id: self.id,
                    participant_id: p.id,
                    nom: p.nom.clone(),
                    prenom: p.prenom.clone(),
                    formation_type: self.formation_type.clone(),
                    issued_by: actor.id.clone(),
                },
                authority,
            )?;
            minted.push(diploma);
        }

        for diploma in &minted {
            if let Some(p) = self
                .participants
                .iter_mut()
                .find(|p| p.id == diploma.participant_id)
            {
                p.statut = ParticipantStatus::Certified;
                p.numero_diplome = Some(diploma.numero.clone());
                p.date_validation_dg = Some(diploma.issued_at);
            }
        }

        self.dg = Some(actor.id.clone());
        self.do_transition(FormationStatus::Completed, actor);
        Ok(minted)
    }

    // ── Aggregate maintenance ────────────────────────────────────────

    /// Enroll a participant. Legal only before the validation decision.
    pub fn add_participant(&mut self, participant: Participant) -> Result<(), WorkflowError> {
        self.require_status(FormationStatus::PendingValidation, "add a participant")?;
        self.participants.push(participant);
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Whether deletion is permitted at the current status.
    ///
    /// Only undecided submissions and rejected formations may be
    /// deleted; once the exam pipeline has started the record is part
    /// of the audit trail, and completed formations carry issued
    /// diplomas.
    pub fn can_delete(&self) -> bool {
        matches!(
            self.status,
            FormationStatus::PendingValidation | FormationStatus::Rejected
        )
    }

    /// Look up a participant by id.
    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == *id)
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Check a capability, building the authorization error on failure.
    fn authorize(
        &self,
        permitted: bool,
        action: &'static str,
        actor: &Actor,
    ) -> Result<(), WorkflowError> {
        if permitted {
            Ok(())
        } else {
            Err(WorkflowError::Authorization {
                action,
                role: actor.role,
            })
        }
    }

    /// Validate that the formation is in the expected status.
    fn require_status(
        &self,
        expected: FormationStatus,
        action: &'static str,
    ) -> Result<(), WorkflowError> {
        if self.status != expected {
            return Err(WorkflowError::State {
                action,
                status: self.status,
            });
        }
        Ok(())
    }

    /// Record a status transition.
    fn do_transition(&mut self, to: FormationStatus, actor: &Actor) {
        let now = Timestamp::now();
        self.transitions.push(TransitionRecord {
            from_status: self.status,
            to_status: to,
            actor: actor.id.clone(),
            role: actor.role,
            timestamp: now,
        });
        self.status = to;
        self.updated_at = now;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
