//! # Public Diploma Verification
//!
//! Given a diploma number, returns validity plus the issuance details.
//! Mounted on the unauthenticated router: certificate holders and
//! employers verify without credentials. Unknown numbers answer 200
//! with `valid: false` rather than 404, so the endpoint never reveals
//! whether a probed number is "close" to a real one.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::routes::formations::DiplomaResponse;
use crate::state::AppState;

/// Verification result for a diploma number.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerificationResponse {
    /// The queried diploma number.
    pub numero: String,
    /// Whether the number designates an authentic diploma with a valid
    /// authority signature.
    pub valid: bool,
    /// The issuance details, present when valid.
    pub diploma: Option<DiplomaResponse>,
}

/// Build the verification router.
pub fn router() -> Router<AppState> {
    Router::new().route("/verification/:numero", get(verify_diploma))
}

/// GET /verification/:numero — Verify a diploma number.
#[utoipa::path(
    get,
    path = "/verification/{numero}",
    params(("numero" = String, Path, description = "Diploma number, e.g. ISPS-000001-…")),
    responses(
        (status = 200, description = "Verification result", body = VerificationResponse),
    ),
    tag = "verification"
)]
pub(crate) async fn verify_diploma(
    State(state): State<AppState>,
    Path(numero): Path<String>,
) -> Json<VerificationResponse> {
    let registry = state.registry.read();
    match registry.lookup(&numero) {
        Some(diploma) => {
            // The record must also carry an authentic authority signature.
            let valid = state
                .authority
                .verify_hex(diploma.verification_code.as_bytes(), &diploma.signature);
            if !valid {
                tracing::warn!(numero = %numero, "diploma record failed signature check");
            }
            Json(VerificationResponse {
                numero,
                valid,
                diploma: valid.then(|| DiplomaResponse::from_domain(diploma)),
            })
        }
        None => Json(VerificationResponse {
            numero,
            valid: false,
            diploma: None,
        }),
    }
}
