//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the Bearer token security scheme to the OpenAPI spec.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "Bearer token authentication. Set via ISPS_AUTH_TOKEN env var.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "ISPS Formation Stack API",
        version = "0.3.2",
        description = "Formation certification lifecycle for a maritime/port security authority.\n\nProvides:\n- **Formation workflow**: RSO submission, safety-officer validation or rejection, exam lifecycle, supervision report, grading, and director-general diploma issuance — every action role-gated and audit-logged\n- **Public diploma verification** by number, with Ed25519 authority signatures\n\nAuthentication: Bearer token via `Authorization: Bearer <token>` header on `/v1/*`. Workflow actions additionally identify the acting user through `x-actor-id` / `x-actor-role` headers supplied by the session layer. Health probes (`/health/*`) and `/verification/*` are unauthenticated.",
        license(name = "AGPL-3.0-or-later"),
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    paths(
        // ── Formations ──────────────────────────────────────────────
        crate::routes::formations::create_formation,
        crate::routes::formations::list_formations,
        crate::routes::formations::get_formation,
        crate::routes::formations::get_transitions,
        crate::routes::formations::delete_formation,
        crate::routes::formations::validate_formation,
        crate::routes::formations::reject_formation,
        crate::routes::formations::start_exam,
        crate::routes::formations::end_exam,
        crate::routes::formations::attach_exam_copies,
        crate::routes::formations::submit_supervision_report,
        crate::routes::formations::record_grades,
        crate::routes::formations::issue_diplomas,
        // ── Verification ────────────────────────────────────────────
        crate::routes::verification::verify_diploma,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::formations::PaginationParams,
        crate::routes::formations::NewParticipantRequest,
        crate::routes::formations::CreateFormationRequest,
        crate::routes::formations::ValidateFormationRequest,
        crate::routes::formations::RejectFormationRequest,
        crate::routes::formations::ExamActionRequest,
        crate::routes::formations::ExamCopiesRequest,
        crate::routes::formations::SupervisionReportRequest,
        crate::routes::formations::GradeEntryRequest,
        crate::routes::formations::RecordGradesRequest,
        crate::routes::formations::IssueDiplomasRequest,
        crate::routes::formations::ParticipantResponse,
        crate::routes::formations::SupervisionReportResponse,
        crate::routes::formations::TransitionResponse,
        crate::routes::formations::FormationResponse,
        crate::routes::formations::DiplomaResponse,
        crate::routes::formations::IssueDiplomasResponse,
        crate::routes::verification::VerificationResponse,
    )),
    tags(
        (name = "formations", description = "Formation lifecycle operations"),
        (name = "verification", description = "Public diploma verification"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(serve_openapi))
}

/// GET /openapi.json — The assembled OpenAPI document.
async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_builds() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("/v1/formations"));
        assert!(json.contains("/verification/{numero}"));
    }
}
