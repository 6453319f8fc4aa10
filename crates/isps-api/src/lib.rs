//! # isps-api — Axum API Service for the Formation Stack
//!
//! Assembles the formation workflow and verification routers into a
//! single application with shared middleware.
//!
//! ## API Surface
//!
//! | Prefix                       | Module                   | Auth |
//! |------------------------------|--------------------------|------|
//! | `/v1/formations/*`           | [`routes::formations`]   | yes  |
//! | `/verification/:numero`      | [`routes::verification`] | no   |
//! | `/health/*`                  | probes in `lib.rs`       | no   |
//! | `/metrics`                   | Prometheus scrape        | no   |
//! | `/openapi.json`              | [`openapi`]              | yes  |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```
//!
//! ## Crate Policy
//!
//! - No workflow logic in route handlers — the aggregate decides; the
//!   handlers translate HTTP to actions and errors to status codes.
//! - All errors map to structured HTTP responses via `AppError`.

pub mod auth;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

pub use error::AppError;

/// Check if metrics are enabled via the `ISPS_METRICS_ENABLED` env var.
/// Defaults to `true` when the variable is absent or set to anything
/// other than `"false"`.
fn metrics_enabled() -> bool {
    std::env::var("ISPS_METRICS_ENABLED")
        .map(|v| v.to_lowercase() != "false")
        .unwrap_or(true)
}

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`), `/metrics`, and the public verification
/// endpoint are mounted outside the auth middleware so they remain
/// accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = ApiMetrics::new();
    let metrics_on = metrics_enabled();

    // Authenticated API routes.
    //
    // Body size limit: 2 MiB. The service stores document references,
    // never file bytes, so no legitimate request body comes close.
    let api = Router::new()
        .merge(routes::formations::router())
        .merge(openapi::router());

    let mut api = api
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(from_fn(auth::auth_middleware));

    if metrics_on {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(metrics.clone()));
    }

    let api = api
        .layer(TraceLayer::new_for_http())
        .layer(Extension(auth_config))
        .with_state(state.clone());

    // Unauthenticated routes: health probes and public verification.
    let mut unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .merge(routes::verification::router());

    if metrics_on {
        unauthenticated = unauthenticated
            .route("/metrics", axum::routing::get(prometheus_metrics))
            .layer(Extension(metrics));
    }

    let unauthenticated = unauthenticated.with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// GET /metrics — Prometheus metrics scrape endpoint.
///
/// Updates domain gauges from current `AppState` on each scrape (pull
/// model), then gathers and encodes all metrics in text exposition
/// format.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    // -- Update domain gauges from AppState --

    let records = state.formations.list();
    let mut by_status: std::collections::HashMap<&'static str, usize> =
        std::collections::HashMap::new();
    let mut participants: usize = 0;
    for record in &records {
        *by_status
            .entry(record.formation.status.as_str())
            .or_default() += 1;
        participants += record.formation.participants.len();
    }
    metrics.formations_total().reset();
    for (status, count) in &by_status {
        metrics
            .formations_total()
            .with_label_values(&[status])
            .set(*count as f64);
    }
    metrics.participants_total().set(participants as f64);

    metrics
        .diplomas_issued_total()
        .set(state.registry.read().count() as f64);

    metrics
        .authority_key_ephemeral()
        .set(if state.config.authority_secret.is_none() {
            1.0
        } else {
            0.0
        });

    // -- Gather and encode --
    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — verifies the application is ready to serve traffic.
///
/// Checks:
/// - The issuing authority key is functional (can derive a verifying key).
/// - The diploma registry lock is acquirable (not deadlocked).
/// - The formation store is accessible.
///
/// Returns 200 "ready" or 503 with a diagnostic message.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if state.authority.verifying_key_hex().len() != 64 {
        return (StatusCode::SERVICE_UNAVAILABLE, "authority key degraded").into_response();
    }

    // parking_lot try_read is non-blocking.
    if state.registry.try_read().is_none() {
        return (StatusCode::SERVICE_UNAVAILABLE, "diploma registry locked").into_response();
    }

    let _ = state.formations.len();

    (StatusCode::OK, "ready").into_response()
}
