//! # Authentication and Actor Extraction
//!
//! Two concerns, both trusted per deployment contract:
//!
//! - **Service authentication**: a static bearer token
//!   (`ISPS_AUTH_TOKEN`). When unset (development, tests) all requests
//!   pass. Token comparison is constant-time.
//!
//! - **Actor identity**: the session provider in front of this service
//!   resolves the cookie and forwards the acting user as
//!   `x-actor-id` / `x-actor-role` headers. The role claim is
//!   normalized through the role resolver on the way in; an
//!   unrecognized claim becomes the unknown tag, which fails every
//!   capability check downstream rather than erroring here.

use axum::extract::{FromRequestParts, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;

use isps_core::ActorId;
use isps_roles::Actor;

use crate::error::AppError;

/// Bearer-token configuration injected as a request extension.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// The expected token. `None` disables authentication.
    pub token: Option<String>,
}

/// Middleware enforcing the bearer token on the authenticated router.
pub async fn auth_middleware(request: Request, next: Next) -> Response {
    let config = request
        .extensions()
        .get::<AuthConfig>()
        .cloned()
        .unwrap_or(AuthConfig { token: None });

    if let Some(expected) = &config.token {
        let provided = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        let authentic = match provided {
            Some(token) => bool::from(token.as_bytes().ct_eq(expected.as_bytes())),
            None => false,
        };
        if !authentic {
            return AppError::Unauthorized("missing or invalid bearer token".to_string())
                .into_response();
        }
    }

    next.run(request).await
}

/// Extractor for the acting user on workflow endpoints.
///
/// Rejects with 401 when `x-actor-id` is absent. The role header is
/// optional by design: a missing or unrecognized role resolves to the
/// unknown tag and fails capability checks with 403 instead.
#[derive(Debug, Clone)]
pub struct ActorHeaders(pub Actor);

#[axum::async_trait]
impl<S> FromRequestParts<S> for ActorHeaders
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get("x-actor-id")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::Unauthorized("missing x-actor-id header".to_string()))?;

        let raw_role = parts
            .headers
            .get("x-actor-role")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");

        Ok(Self(Actor::from_raw(ActorId::new(id), raw_role)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isps_roles::RoleTag;

    fn parts_with_headers(headers: &[(&str, &str)]) -> Parts {
        let mut builder = axum::http::Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[tokio::test]
    async fn test_actor_extracted_and_normalized() {
        let mut parts =
            parts_with_headers(&[("x-actor-id", "chef-7"), ("x-actor-role", " Chef_Surete ")]);
        let ActorHeaders(actor) = ActorHeaders::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(actor.id.as_str(), "chef-7");
        assert_eq!(actor.role, RoleTag::ChefSurete);
    }

    #[tokio::test]
    async fn test_missing_actor_id_rejected() {
        let mut parts = parts_with_headers(&[("x-actor-role", "dg")]);
        let result = ActorHeaders::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_unknown_role_is_tolerated() {
        let mut parts =
            parts_with_headers(&[("x-actor-id", "someone"), ("x-actor-role", "harbormaster")]);
        let ActorHeaders(actor) = ActorHeaders::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(actor.role, RoleTag::Unknown);
    }
}
