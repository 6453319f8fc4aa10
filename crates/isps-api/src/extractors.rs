//! # Request Validation
//!
//! Every request body type implements [`Validate`]; handlers pass the
//! raw extraction result through [`extract_validated_json`] so that
//! malformed JSON and semantically invalid payloads are both rejected
//! with a structured 422 before any domain code runs.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::AppError;

/// Payload-level validation, run at the boundary before the workflow
/// engine is invoked.
pub trait Validate {
    /// Check field-level constraints, returning a message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Unwrap a JSON extraction, then run payload validation.
pub fn extract_validated_json<T: Validate>(
    body: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let Json(value) =
        body.map_err(|rejection| AppError::BadRequest(format!("invalid request body: {rejection}")))?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}
