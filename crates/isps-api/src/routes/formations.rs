//! # Formation Workflow API
//!
//! Formation CRUD plus one endpoint per workflow action. Handlers
//! validate the payload at the boundary, resolve the acting user from
//! headers, and delegate every decision to the aggregate — no status or
//! role logic lives here. Mutations run through the store's atomic
//! `try_update`, so concurrent officers racing on the same formation
//! serialize and the loser gets a 409 with the current version.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use isps_core::{DocumentRef, ParticipantId, Score};
use isps_issuance::Diploma;
use isps_roles::RoleTag;
use isps_workflow::{
    Formation, GradeEntry, NewFormation, Participant, ParticipantStatus, RapportSupervision,
    SupervisionReportPayload, TransitionRecord,
};

use crate::auth::ActorHeaders;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::{AppState, VersionedFormation};

// ─── Pagination ──────────────────────────────────────────────────────

/// Pagination parameters for list endpoints.
#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct PaginationParams {
    /// Maximum number of items to return (default: 100, max: 1000).
    pub limit: Option<usize>,
    /// Number of items to skip (default: 0).
    pub offset: Option<usize>,
}

impl PaginationParams {
    const DEFAULT_LIMIT: usize = 100;
    const MAX_LIMIT: usize = 1000;

    fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .min(Self::MAX_LIMIT)
    }

    fn effective_offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }
}

// ─── Requests ────────────────────────────────────────────────────────

/// A participant in a creation request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct NewParticipantRequest {
    /// Family name.
    pub nom: String,
    /// Given name.
    pub prenom: String,
    /// Date of birth.
    pub date_naissance: Option<NaiveDate>,
    /// Place of birth.
    pub lieu_naissance: Option<String>,
    /// Identity document reference.
    pub url_cni: Option<String>,
    /// Criminal-record-check reference.
    pub url_casier_judiciaire: Option<String>,
}

impl NewParticipantRequest {
    fn into_participant(self) -> Result<Participant, AppError> {
        let mut participant = Participant::new(self.nom, self.prenom);
        participant.date_naissance = self.date_naissance;
        participant.lieu_naissance = self.lieu_naissance;
        participant.url_cni = self
            .url_cni
            .map(DocumentRef::new)
            .transpose()
            .map_err(|e| AppError::Validation(format!("url_cni: {e}")))?;
        participant.url_casier_judiciaire = self
            .url_casier_judiciaire
            .map(DocumentRef::new)
            .transpose()
            .map_err(|e| AppError::Validation(format!("url_casier_judiciaire: {e}")))?;
        Ok(participant)
    }
}

/// Request to create a formation (the RSO's submission).
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateFormationRequest {
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
    /// Initially enrolled participants.
    #[serde(default)]
    pub participants: Vec<NewParticipantRequest>,
}

impl Validate for CreateFormationRequest {
    fn validate(&self) -> Result<(), String> {
        if self.formation_type.trim().is_empty() {
            return Err("formation_type must not be empty".to_string());
        }
        if self.lieu.trim().is_empty() {
            return Err("lieu must not be empty".to_string());
        }
        if self.formation_type.len() > 255 || self.lieu.len() > 255 {
            return Err("formation_type and lieu must not exceed 255 characters".to_string());
        }
        if self.date_debut > self.date_fin {
            return Err("date_debut must not be after date_fin".to_string());
        }
        if self.participants.len() > 500 {
            return Err("a formation cannot enroll more than 500 participants".to_string());
        }
        for p in &self.participants {
            if p.nom.trim().is_empty() || p.prenom.trim().is_empty() {
                return Err("participant nom and prenom must not be empty".to_string());
            }
        }
        Ok(())
    }
}

/// Request to validate a pending formation.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateFormationRequest {
    /// Exam subject document reference to attach, if already uploaded.
    pub url_sujet_examen: Option<String>,
    /// Optimistic-concurrency guard; mismatch returns 409.
    pub expected_version: Option<u64>,
}

impl Validate for ValidateFormationRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(reference) = &self.url_sujet_examen {
            if reference.trim().is_empty() {
                return Err("url_sujet_examen must not be blank when supplied".to_string());
            }
        }
        Ok(())
    }
}

/// Request to reject a pending formation.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RejectFormationRequest {
    /// The rejection reason, recorded as `motif_rejet`. Required.
    pub motif: String,
    /// Optimistic-concurrency guard; mismatch returns 409.
    pub expected_version: Option<u64>,
}

impl Validate for RejectFormationRequest {
    fn validate(&self) -> Result<(), String> {
        // Checked before any role or status evaluation: an empty reason
        // is a validation error no matter who sends it.
        if self.motif.trim().is_empty() {
            return Err("motif must not be empty".to_string());
        }
        Ok(())
    }
}

/// Request body for the exam start/end actions.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ExamActionRequest {
    /// Optimistic-concurrency guard; mismatch returns 409.
    pub expected_version: Option<u64>,
}

impl Validate for ExamActionRequest {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Request to attach the scanned answer copies.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ExamCopiesRequest {
    /// Document reference of the scanned copies.
    pub url_copies_examen: String,
    /// Optimistic-concurrency guard; mismatch returns 409.
    pub expected_version: Option<u64>,
}

impl Validate for ExamCopiesRequest {
    fn validate(&self) -> Result<(), String> {
        if self.url_copies_examen.trim().is_empty() {
            return Err("url_copies_examen must not be empty".to_string());
        }
        Ok(())
    }
}

/// Request to submit the supervision report.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SupervisionReportRequest {
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
    /// Optimistic-concurrency guard; mismatch returns 409.
    pub expected_version: Option<u64>,
}

impl Validate for SupervisionReportRequest {
    fn validate(&self) -> Result<(), String> {
        if self.observations_generales.trim().is_empty() {
            return Err("observations_generales must not be empty".to_string());
        }
        Ok(())
    }
}

/// One participant's grade in a grading request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct GradeEntryRequest {
    /// The participant being graded.
    pub participant_id: Uuid,
    /// The exam score on the 0–20 scale.
    pub note: f64,
    /// Explicit outcome override: "passed", "failed", "not_authorized".
    /// When absent the outcome derives from the note.
    pub statut_override: Option<String>,
    /// Free-text appreciation.
    pub appreciation: Option<String>,
}

/// Request to record the grading batch.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordGradesRequest {
    /// The grades, one entry per participant.
    pub grades: Vec<GradeEntryRequest>,
    /// Optimistic-concurrency guard; mismatch returns 409.
    pub expected_version: Option<u64>,
}

impl Validate for RecordGradesRequest {
    fn validate(&self) -> Result<(), String> {
        if self.grades.is_empty() {
            return Err("grades must not be empty".to_string());
        }
        for entry in &self.grades {
            if !entry.note.is_finite() || !(0.0..=20.0).contains(&entry.note) {
                return Err(format!(
                    "note {} for participant {} is outside [0, 20]",
                    entry.note, entry.participant_id
                ));
            }
            if let Some(statut) = &entry.statut_override {
                if parse_statut(statut).is_none() {
                    return Err(format!(
                        "unknown statut_override '{statut}' (valid: pending, passed, failed, certified, not_authorized)"
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Request to issue diplomas.
#[derive(Debug, Deserialize, ToSchema)]
pub struct IssueDiplomasRequest {
    /// Optimistic-concurrency guard; mismatch returns 409.
    pub expected_version: Option<u64>,
}

impl Validate for IssueDiplomasRequest {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

fn parse_statut(statut: &str) -> Option<ParticipantStatus> {
    match statut {
        "pending" => Some(ParticipantStatus::Pending),
        "passed" => Some(ParticipantStatus::Passed),
        "failed" => Some(ParticipantStatus::Failed),
        "certified" => Some(ParticipantStatus::Certified),
        "not_authorized" => Some(ParticipantStatus::NotAuthorized),
        _ => None,
    }
}

// ─── Responses ───────────────────────────────────────────────────────

/// A participant as returned by the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ParticipantResponse {
    /// Participant identifier.
    pub id: Uuid,
    /// Family name.
    pub nom: String,
    /// Given name.
    pub prenom: String,
    /// Date of birth.
    pub date_naissance: Option<NaiveDate>,
    /// Place of birth.
    pub lieu_naissance: Option<String>,
    /// Identity document reference.
    pub url_cni: Option<String>,
    /// Criminal-record-check reference.
    pub url_casier_judiciaire: Option<String>,
    /// Exam score, once graded.
    pub note: Option<f64>,
    /// Canonical outcome tag ("pending", "passed", "failed",
    /// "certified", "not_authorized").
    pub statut: String,
    /// French display label ("Réussi", "Échoué", …).
    pub statut_label: String,
    /// Grader appreciation.
    pub appreciation: Option<String>,
    /// Diploma number, once certified.
    pub numero_diplome: Option<String>,
    /// Director-general sign-off timestamp.
    pub date_validation_dg: Option<String>,
}

impl ParticipantResponse {
    fn from_domain(p: &Participant) -> Self {
        Self {
            id: *p.id.as_uuid(),
            nom: p.nom.clone(),
            prenom: p.prenom.clone(),
            date_naissance: p.date_naissance,
            lieu_naissance: p.lieu_naissance.clone(),
            url_cni: p.url_cni.as_ref().map(|d| d.as_str().to_string()),
            url_casier_judiciaire: p
                .url_casier_judiciaire
                .as_ref()
                .map(|d| d.as_str().to_string()),
            note: p.note.map(|n| n.value()),
            statut: p.statut.as_str().to_string(),
            statut_label: p.statut.label().to_string(),
            appreciation: p.appreciation.clone(),
            numero_diplome: p.numero_diplome.as_ref().map(|n| n.as_str().to_string()),
            date_validation_dg: p.date_validation_dg.map(|t| t.to_iso8601()),
        }
    }
}

/// A supervision report as returned by the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SupervisionReportResponse {
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
    /// Fitness determination.
    pub apte_examen: bool,
    /// Submission timestamp.
    pub date_rapport: String,
}

impl SupervisionReportResponse {
    fn from_domain(r: &RapportSupervision) -> Self {
        Self {
            observations_generales: r.observations_generales.clone(),
            conformite_contenu: r.conformite_contenu,
            conformite_formateur: r.conformite_formateur,
            conformite_lieu: r.conformite_lieu,
            recommandations: r.recommandations.clone(),
            apte_examen: r.apte_examen,
            date_rapport: r.date_rapport.to_iso8601(),
        }
    }
}

/// One audit-log entry.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransitionResponse {
    /// Status before the transition.
    pub from_status: String,
    /// Status after the transition.
    pub to_status: String,
    /// Who performed the action.
    pub actor: String,
    /// The actor's role at the time.
    pub role: String,
    /// When the transition occurred.
    pub timestamp: String,
}

impl TransitionResponse {
    fn from_domain(t: &TransitionRecord) -> Self {
        Self {
            from_status: t.from_status.as_str().to_string(),
            to_status: t.to_status.as_str().to_string(),
            actor: t.actor.as_str().to_string(),
            role: t.role.as_str().to_string(),
            timestamp: t.timestamp.to_iso8601(),
        }
    }
}

/// A formation as returned by the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FormationResponse {
    /// Formation identifier.
    pub id: Uuid,
    /// Optimistic-concurrency version; echo back as `expected_version`.
    pub version: u64,
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
    /// Workflow status (e.g. "PENDING_VALIDATION").
    pub status: String,
    /// Exam subject document, once attached.
    pub url_sujet_examen: Option<String>,
    /// Scanned answer copies, once attached.
    pub url_copies_examen: Option<String>,
    /// Rejection reason, if rejected.
    pub motif_rejet: Option<String>,
    /// The proposing RSO.
    pub rso: String,
    /// The validating safety officer, once decided.
    pub chef_surete: Option<String>,
    /// The signing director-general, once completed.
    pub dg: Option<String>,
    /// The supervision report, once submitted.
    pub rapport_supervision: Option<SupervisionReportResponse>,
    /// Enrolled participants.
    pub participants: Vec<ParticipantResponse>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last mutation timestamp.
    pub updated_at: String,
}

impl FormationResponse {
    fn from_record(record: &VersionedFormation) -> Self {
        let f = &record.formation;
        Self {
            id: *f.id.as_uuid(),
            version: record.version,
            formation_type: f.formation_type.clone(),
            lieu: f.lieu.clone(),
            centre_formation: f.centre_formation.clone(),
            date_debut: f.date_debut,
            date_fin: f.date_fin,
            status: f.status.as_str().to_string(),
            url_sujet_examen: f.url_sujet_examen.as_ref().map(|d| d.as_str().to_string()),
            url_copies_examen: f.url_copies_examen.as_ref().map(|d| d.as_str().to_string()),
            motif_rejet: f.motif_rejet.clone(),
            rso: f.rso.as_str().to_string(),
            chef_surete: f.chef_surete.as_ref().map(|a| a.as_str().to_string()),
            dg: f.dg.as_ref().map(|a| a.as_str().to_string()),
            rapport_supervision: f
                .rapport_supervision
                .as_ref()
                .map(SupervisionReportResponse::from_domain),
            participants: f.participants.iter().map(ParticipantResponse::from_domain).collect(),
            created_at: f.created_at.to_iso8601(),
            updated_at: f.updated_at.to_iso8601(),
        }
    }
}

/// An issued diploma as returned by the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DiplomaResponse {
    /// The globally unique diploma number.
    pub numero: String,
    /// The formation the diploma was issued for.
    pub formation_id: Uuid,
    /// The certified participant.
    pub participant_id: Uuid,
    /// Holder family name.
    pub nom: String,
    /// Holder given name.
    pub prenom: String,
    /// The formation category tag.
    pub formation_type: String,
    /// Issuance timestamp.
    pub issued_at: String,
    /// The director-general who signed off.
    pub issued_by: String,
    /// Display name of the issuing authority.
    pub issuing_authority: String,
    /// SHA-256 verification code (the QR payload).
    pub verification_code: String,
    /// Ed25519 signature (hex) over the verification code.
    pub signature: String,
}

impl DiplomaResponse {
    pub(crate) fn from_domain(d: &Diploma) -> Self {
        Self {
            numero: d.numero.as_str().to_string(),
            formation_id: *d.formation_id.as_uuid(),
            participant_id: *d.participant_id.as_uuid(),
            nom: d.nom.clone(),
            prenom: d.prenom.clone(),
            formation_type: d.formation_type.clone(),
            issued_at: d.issued_at.to_iso8601(),
            issued_by: d.issued_by.as_str().to_string(),
            issuing_authority: d.issuing_authority.clone(),
            verification_code: d.verification_code.clone(),
            signature: d.signature.clone(),
        }
    }
}

/// Response of the diploma issuance action.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IssueDiplomasResponse {
    /// The completed formation.
    pub formation: FormationResponse,
    /// The diplomas minted by this action.
    pub diplomas: Vec<DiplomaResponse>,
}

// ─── Router ──────────────────────────────────────────────────────────

/// Build the formations router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/formations", get(list_formations).post(create_formation))
        .route(
            "/v1/formations/:id",
            get(get_formation).delete(delete_formation),
        )
        .route("/v1/formations/:id/transitions", get(get_transitions))
        .route("/v1/formations/:id/validate", put(validate_formation))
        .route("/v1/formations/:id/reject", put(reject_formation))
        .route("/v1/formations/:id/exam/start", put(start_exam))
        .route("/v1/formations/:id/exam/end", put(end_exam))
        .route("/v1/formations/:id/exam/copies", put(attach_exam_copies))
        .route(
            "/v1/formations/:id/supervision-report",
            put(submit_supervision_report),
        )
        .route("/v1/formations/:id/grades", put(record_grades))
        .route("/v1/formations/:id/diplomas/issue", put(issue_diplomas))
}

/// Log a successful transition for the audit surface.
fn trace_transition(formation: &Formation) {
    if let Some(t) = formation.transitions.last() {
        tracing::info!(
            formation_id = %formation.id,
            from_status = t.from_status.as_str(),
            to_status = t.to_status.as_str(),
            actor = t.actor.as_str(),
            role = t.role.as_str(),
            timestamp = %t.timestamp,
            "formation transition"
        );
    }
}

// ─── Handlers ────────────────────────────────────────────────────────

/// POST /v1/formations — Create a formation (RSO submission).
#[utoipa::path(
    post,
    path = "/v1/formations",
    request_body = CreateFormationRequest,
    responses(
        (status = 201, description = "Formation created", body = FormationResponse),
        (status = 403, description = "Actor may not propose formations", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    tag = "formations"
)]
pub(crate) async fn create_formation(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    body: Result<Json<CreateFormationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<FormationResponse>), AppError> {
    let req = extract_validated_json(body)?;

    if !(actor.role == RoleTag::Rso || actor.role.is_administrator()) {
        return Err(AppError::Forbidden(format!(
            "role '{}' may not propose a formation",
            actor.role.as_str()
        )));
    }

    let participants = req
        .participants
        .into_iter()
        .map(NewParticipantRequest::into_participant)
        .collect::<Result<Vec<_>, _>>()?;

    let formation = Formation::submit(NewFormation {
        formation_type: req.formation_type,
        lieu: req.lieu,
        centre_formation: req.centre_formation,
        date_debut: req.date_debut,
        date_fin: req.date_fin,
        rso: actor.id.clone(),
        participants,
    })?;

    tracing::info!(
        formation_id = %formation.id,
        actor = actor.id.as_str(),
        "formation submitted"
    );

    let version = state.formations.insert(formation.clone());
    let record = VersionedFormation { version, formation };
    Ok((StatusCode::CREATED, Json(FormationResponse::from_record(&record))))
}

/// GET /v1/formations — List formations with pagination.
#[utoipa::path(
    get,
    path = "/v1/formations",
    params(
        ("limit" = Option<usize>, Query, description = "Max items to return (default 100, max 1000)"),
        ("offset" = Option<usize>, Query, description = "Items to skip (default 0)"),
    ),
    responses(
        (status = 200, description = "List of formations", body = Vec<FormationResponse>),
    ),
    tag = "formations"
)]
pub(crate) async fn list_formations(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Json<Vec<FormationResponse>> {
    let all = state.formations.list();
    let offset = pagination.effective_offset().min(all.len());
    let limit = pagination.effective_limit();
    let page = all
        .iter()
        .skip(offset)
        .take(limit)
        .map(FormationResponse::from_record)
        .collect();
    Json(page)
}

/// GET /v1/formations/:id — Fetch a formation.
#[utoipa::path(
    get,
    path = "/v1/formations/{id}",
    params(("id" = Uuid, Path, description = "Formation ID")),
    responses(
        (status = 200, description = "Formation found", body = FormationResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "formations"
)]
pub(crate) async fn get_formation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FormationResponse>, AppError> {
    state
        .formations
        .get(&id)
        .map(|record| Json(FormationResponse::from_record(&record)))
        .ok_or_else(|| AppError::NotFound(format!("formation {id} not found")))
}

/// GET /v1/formations/:id/transitions — The formation's audit log.
#[utoipa::path(
    get,
    path = "/v1/formations/{id}/transitions",
    params(("id" = Uuid, Path, description = "Formation ID")),
    responses(
        (status = 200, description = "Ordered transition log", body = Vec<TransitionResponse>),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "formations"
)]
pub(crate) async fn get_transitions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TransitionResponse>>, AppError> {
    let record = state
        .formations
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("formation {id} not found")))?;
    Ok(Json(
        record
            .formation
            .transitions
            .iter()
            .map(TransitionResponse::from_domain)
            .collect(),
    ))
}

/// DELETE /v1/formations/:id — Delete a formation.
///
/// Administrators only, and only while the formation is still awaiting
/// the validation decision or has been rejected. Anything further along
/// is part of the audit trail and refuses deletion with 409.
#[utoipa::path(
    delete,
    path = "/v1/formations/{id}",
    params(("id" = Uuid, Path, description = "Formation ID")),
    responses(
        (status = 204, description = "Formation deleted"),
        (status = 403, description = "Actor is not an administrator", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Formation is past the deletable statuses", body = crate::error::ErrorBody),
    ),
    tag = "formations"
)]
pub(crate) async fn delete_formation(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.formations.try_delete(&id, |formation| {
        if !actor.role.is_administrator() {
            return Err(AppError::Forbidden(format!(
                "role '{}' may not delete formations",
                actor.role.as_str()
            )));
        }
        if !formation.can_delete() {
            return Err(AppError::Conflict(format!(
                "cannot delete a formation in status {}",
                formation.status
            )));
        }
        Ok(())
    })?;

    tracing::info!(formation_id = %id, actor = actor.id.as_str(), "formation deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /v1/formations/:id/validate — Safety officer validates the submission.
#[utoipa::path(
    put,
    path = "/v1/formations/{id}/validate",
    params(("id" = Uuid, Path, description = "Formation ID")),
    request_body = ValidateFormationRequest,
    responses(
        (status = 200, description = "Formation validated", body = FormationResponse),
        (status = 403, description = "Actor is not safety-responsible", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Illegal from the current status or stale version", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    tag = "formations"
)]
pub(crate) async fn validate_formation(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path(id): Path<Uuid>,
    body: Result<Json<ValidateFormationRequest>, JsonRejection>,
) -> Result<Json<FormationResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let exam_subject = req
        .url_sujet_examen
        .map(DocumentRef::new)
        .transpose()
        .map_err(|e| AppError::Validation(format!("url_sujet_examen: {e}")))?;

    let (_, record) = state
        .formations
        .try_update(&id, req.expected_version, |formation| {
            formation
                .validate(&actor, exam_subject)
                .map_err(AppError::from)
        })?;

    trace_transition(&record.formation);
    Ok(Json(FormationResponse::from_record(&record)))
}

/// PUT /v1/formations/:id/reject — Safety officer rejects the submission.
#[utoipa::path(
    put,
    path = "/v1/formations/{id}/reject",
    params(("id" = Uuid, Path, description = "Formation ID")),
    request_body = RejectFormationRequest,
    responses(
        (status = 200, description = "Formation rejected", body = FormationResponse),
        (status = 403, description = "Actor is not safety-responsible", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Illegal from the current status or stale version", body = crate::error::ErrorBody),
        (status = 422, description = "Missing rejection reason", body = crate::error::ErrorBody),
    ),
    tag = "formations"
)]
pub(crate) async fn reject_formation(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path(id): Path<Uuid>,
    body: Result<Json<RejectFormationRequest>, JsonRejection>,
) -> Result<Json<FormationResponse>, AppError> {
    let req = extract_validated_json(body)?;

    let (_, record) = state
        .formations
        .try_update(&id, req.expected_version, |formation| {
            formation.reject(&actor, &req.motif).map_err(AppError::from)
        })?;

    trace_transition(&record.formation);
    Ok(Json(FormationResponse::from_record(&record)))
}

/// PUT /v1/formations/:id/exam/start — Open the exam.
#[utoipa::path(
    put,
    path = "/v1/formations/{id}/exam/start",
    params(("id" = Uuid, Path, description = "Formation ID")),
    request_body = ExamActionRequest,
    responses(
        (status = 200, description = "Exam started", body = FormationResponse),
        (status = 403, description = "Actor may not manage formations", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Illegal from the current status or stale version", body = crate::error::ErrorBody),
    ),
    tag = "formations"
)]
pub(crate) async fn start_exam(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path(id): Path<Uuid>,
    body: Result<Json<ExamActionRequest>, JsonRejection>,
) -> Result<Json<FormationResponse>, AppError> {
    let req = extract_validated_json(body)?;

    let (_, record) = state
        .formations
        .try_update(&id, req.expected_version, |formation| {
            formation.start_exam(&actor).map_err(AppError::from)
        })?;

    trace_transition(&record.formation);
    Ok(Json(FormationResponse::from_record(&record)))
}

/// PUT /v1/formations/:id/exam/end — Close the exam.
#[utoipa::path(
    put,
    path = "/v1/formations/{id}/exam/end",
    params(("id" = Uuid, Path, description = "Formation ID")),
    request_body = ExamActionRequest,
    responses(
        (status = 200, description = "Exam closed", body = FormationResponse),
        (status = 403, description = "Actor may not manage formations", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Illegal from the current status or stale version", body = crate::error::ErrorBody),
    ),
    tag = "formations"
)]
pub(crate) async fn end_exam(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path(id): Path<Uuid>,
    body: Result<Json<ExamActionRequest>, JsonRejection>,
) -> Result<Json<FormationResponse>, AppError> {
    let req = extract_validated_json(body)?;

    let (_, record) = state
        .formations
        .try_update(&id, req.expected_version, |formation| {
            formation.end_exam(&actor).map_err(AppError::from)
        })?;

    trace_transition(&record.formation);
    Ok(Json(FormationResponse::from_record(&record)))
}

/// PUT /v1/formations/:id/exam/copies — Attach the scanned answer copies.
#[utoipa::path(
    put,
    path = "/v1/formations/{id}/exam/copies",
    params(("id" = Uuid, Path, description = "Formation ID")),
    request_body = ExamCopiesRequest,
    responses(
        (status = 200, description = "Copies attached", body = FormationResponse),
        (status = 403, description = "Actor may not manage formations", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Illegal from the current status or stale version", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    tag = "formations"
)]
pub(crate) async fn attach_exam_copies(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path(id): Path<Uuid>,
    body: Result<Json<ExamCopiesRequest>, JsonRejection>,
) -> Result<Json<FormationResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let copies = DocumentRef::new(req.url_copies_examen)
        .map_err(|e| AppError::Validation(format!("url_copies_examen: {e}")))?;

    let (_, record) = state
        .formations
        .try_update(&id, req.expected_version, |formation| {
            formation
                .attach_exam_copies(&actor, copies)
                .map_err(AppError::from)
        })?;

    Ok(Json(FormationResponse::from_record(&record)))
}

/// PUT /v1/formations/:id/supervision-report — Submit the supervision report.
#[utoipa::path(
    put,
    path = "/v1/formations/{id}/supervision-report",
    params(("id" = Uuid, Path, description = "Formation ID")),
    request_body = SupervisionReportRequest,
    responses(
        (status = 200, description = "Report attached", body = FormationResponse),
        (status = 403, description = "Actor may not manage formations", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Report already exists or wrong status", body = crate::error::ErrorBody),
        (status = 422, description = "Missing observations", body = crate::error::ErrorBody),
    ),
    tag = "formations"
)]
pub(crate) async fn submit_supervision_report(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path(id): Path<Uuid>,
    body: Result<Json<SupervisionReportRequest>, JsonRejection>,
) -> Result<Json<FormationResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let payload = SupervisionReportPayload {
        observations_generales: req.observations_generales,
        conformite_contenu: req.conformite_contenu,
        conformite_formateur: req.conformite_formateur,
        conformite_lieu: req.conformite_lieu,
        recommandations: req.recommandations,
        apte_examen: req.apte_examen,
    };

    let (_, record) = state
        .formations
        .try_update(&id, req.expected_version, |formation| {
            formation
                .submit_supervision_report(&actor, payload)
                .map_err(AppError::from)
        })?;

    tracing::info!(
        formation_id = %record.formation.id,
        actor = actor.id.as_str(),
        "supervision report submitted"
    );
    Ok(Json(FormationResponse::from_record(&record)))
}

/// PUT /v1/formations/:id/grades — Record the grading batch.
#[utoipa::path(
    put,
    path = "/v1/formations/{id}/grades",
    params(("id" = Uuid, Path, description = "Formation ID")),
    request_body = RecordGradesRequest,
    responses(
        (status = 200, description = "Grades recorded", body = FormationResponse),
        (status = 403, description = "Actor is not safety-responsible", body = crate::error::ErrorBody),
        (status = 404, description = "Formation or a listed participant not found", body = crate::error::ErrorBody),
        (status = 409, description = "No supervision report yet, wrong status, or stale version", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid grades", body = crate::error::ErrorBody),
    ),
    tag = "formations"
)]
pub(crate) async fn record_grades(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path(id): Path<Uuid>,
    body: Result<Json<RecordGradesRequest>, JsonRejection>,
) -> Result<Json<FormationResponse>, AppError> {
    let req = extract_validated_json(body)?;

    let grades = req
        .grades
        .into_iter()
        .map(|entry| {
            let note = Score::new(entry.note)
                .map_err(|e| AppError::Validation(e.to_string()))?;
            Ok(GradeEntry {
                participant_id: ParticipantId::from_uuid(entry.participant_id),
                note,
                statut_override: entry.statut_override.as_deref().and_then(parse_statut),
                appreciation: entry.appreciation,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    let (_, record) = state
        .formations
        .try_update(&id, req.expected_version, |formation| {
            formation.record_grades(&actor, grades).map_err(AppError::from)
        })?;

    trace_transition(&record.formation);
    Ok(Json(FormationResponse::from_record(&record)))
}

/// PUT /v1/formations/:id/diplomas/issue — Director-general sign-off.
#[utoipa::path(
    put,
    path = "/v1/formations/{id}/diplomas/issue",
    params(("id" = Uuid, Path, description = "Formation ID")),
    request_body = IssueDiplomasRequest,
    responses(
        (status = 200, description = "Diplomas issued", body = IssueDiplomasResponse),
        (status = 403, description = "Actor is not the director-general", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Illegal from the current status or stale version", body = crate::error::ErrorBody),
    ),
    tag = "formations"
)]
pub(crate) async fn issue_diplomas(
    State(state): State<AppState>,
    ActorHeaders(actor): ActorHeaders,
    Path(id): Path<Uuid>,
    body: Result<Json<IssueDiplomasRequest>, JsonRejection>,
) -> Result<Json<IssueDiplomasResponse>, AppError> {
    let req = extract_validated_json(body)?;

    let (diplomas, record) = state
        .formations
        .try_update(&id, req.expected_version, |formation| {
            let mut registry = state.registry.write();
            formation
                .issue_diplomas(&actor, &mut registry, state.authority.as_ref())
                .map_err(AppError::from)
        })?;

    trace_transition(&record.formation);
    tracing::info!(
        formation_id = %record.formation.id,
        diplomas = diplomas.len(),
        actor = actor.id.as_str(),
        "diplomas issued"
    );

    Ok(Json(IssueDiplomasResponse {
        formation: FormationResponse::from_record(&record),
        diplomas: diplomas.iter().map(DiplomaResponse::from_domain).collect(),
    }))
}
