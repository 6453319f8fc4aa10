//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded in
//! middleware. Domain-level gauges (formations by status, participants,
//! issued diplomas) are updated on each `/metrics` scrape (pull model) —
//! see the metrics handler in `lib.rs`.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{
    core::Collector, Encoder, GaugeVec, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    // -- HTTP middleware metrics (push model) --
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    // -- Domain gauges (pull model, updated on /metrics scrape) --
    formations_total: GaugeVec,
    participants_total: prometheus::Gauge,
    diplomas_issued_total: prometheus::Gauge,
    authority_key_ephemeral: prometheus::Gauge,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .finish()
    }
}

impl ApiMetrics {
    /// Create a new metrics instance with a fresh Prometheus registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("isps_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let http_request_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "isps_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "path"],
        )
        .expect("metric can be created");

        let http_errors_total = IntCounterVec::new(
            Opts::new("isps_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let formations_total = GaugeVec::new(
            Opts::new("isps_formations_total", "Total formations by status"),
            &["status"],
        )
        .expect("metric can be created");

        let participants_total = prometheus::Gauge::new(
            "isps_participants_total",
            "Total enrolled participants across all formations",
        )
        .expect("metric can be created");

        let diplomas_issued_total = prometheus::Gauge::new(
            "isps_diplomas_issued_total",
            "Total diplomas ever issued",
        )
        .expect("metric can be created");

        let authority_key_ephemeral = prometheus::Gauge::new(
            "isps_authority_key_ephemeral",
            "Whether the issuing authority key is ephemeral (1=ephemeral, 0=configured)",
        )
        .expect("metric can be created");

        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(http_errors_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(formations_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(participants_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(diplomas_issued_total.clone()))
            .expect("metric can be registered");
        registry
            .register(Box::new(authority_key_ephemeral.clone()))
            .expect("metric can be registered");

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                formations_total,
                participants_total,
                diplomas_issued_total,
                authority_key_ephemeral,
            }),
        }
    }

    /// Current total request count (sum across all labels).
    pub fn requests(&self) -> u64 {
        let mut total = 0u64;
        for family in &self.inner.http_requests_total.collect() {
            for metric in family.get_metric() {
                total += metric.get_counter().get_value() as u64;
            }
        }
        total
    }

    /// Current total error count (sum across all labels).
    pub fn errors(&self) -> u64 {
        let mut total = 0u64;
        for family in &self.inner.http_errors_total.collect() {
            for metric in family.get_metric() {
                total += metric.get_counter().get_value() as u64;
            }
        }
        total
    }

    /// Record an HTTP request (called by the middleware).
    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();

        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);

        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
    }

    // -- Domain gauge accessors (used by the /metrics handler) --

    /// Access the formations-by-status gauge for updating.
    pub fn formations_total(&self) -> &GaugeVec {
        &self.inner.formations_total
    }

    /// Access the participants gauge for updating.
    pub fn participants_total(&self) -> &prometheus::Gauge {
        &self.inner.participants_total
    }

    /// Access the issued-diplomas gauge for updating.
    pub fn diplomas_issued_total(&self) -> &prometheus::Gauge {
        &self.inner.diplomas_issued_total
    }

    /// Access the ephemeral-key gauge for updating.
    pub fn authority_key_ephemeral(&self) -> &prometheus::Gauge {
        &self.inner.authority_key_ephemeral
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer)
            .map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a request path by replacing high-cardinality segments.
///
/// UUIDs become `{id}` and diploma numbers become `{numero}` so
/// Prometheus label cardinality stays bounded.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.len() == 36
                && segment.chars().enumerate().all(|(i, c)| {
                    if i == 8 || i == 13 || i == 18 || i == 23 {
                        c == '-'
                    } else {
                        c.is_ascii_hexdigit()
                    }
                })
            {
                "{id}"
            } else if segment.starts_with("ISPS-") {
                "{numero}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Middleware that records HTTP request metrics via Prometheus.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        let duration = start.elapsed().as_secs_f64();
        let status = response.status().as_u16();
        m.record_request(&method, &path, status, duration);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_metrics_new_starts_at_zero() {
        let m = ApiMetrics::new();
        assert_eq!(m.requests(), 0);
        assert_eq!(m.errors(), 0);
    }

    #[test]
    fn requests_and_errors_increment() {
        let m = ApiMetrics::new();
        m.record_request("GET", "/v1/formations", 200, 0.01);
        m.record_request("PUT", "/v1/formations/{id}/validate", 409, 0.02);
        assert_eq!(m.requests(), 2);
        assert_eq!(m.errors(), 1);
    }

    #[test]
    fn clone_shares_underlying_counters() {
        let m = ApiMetrics::new();
        let clone = m.clone();
        m.record_request("GET", "/x", 200, 0.01);
        assert_eq!(clone.requests(), 1);
    }

    #[test]
    fn gather_and_encode_produces_text() {
        let m = ApiMetrics::new();
        m.record_request("GET", "/v1/formations", 200, 0.01);
        let output = m.gather_and_encode().unwrap();
        assert!(output.contains("isps_http_requests_total"));
        assert!(output.contains("isps_http_request_duration_seconds"));
    }

    #[test]
    fn domain_gauges_update() {
        let m = ApiMetrics::new();
        m.formations_total()
            .with_label_values(&["EXAM_IN_PROGRESS"])
            .set(2.0);
        m.diplomas_issued_total().set(7.0);
        let output = m.gather_and_encode().unwrap();
        assert!(output.contains("isps_formations_total"));
        assert!(output.contains("isps_diplomas_issued_total"));
    }

    #[test]
    fn normalize_path_replaces_uuid() {
        let path = "/v1/formations/550e8400-e29b-41d4-a716-446655440000/validate";
        assert_eq!(normalize_path(path), "/v1/formations/{id}/validate");
    }

    #[test]
    fn normalize_path_replaces_diploma_number() {
        let path = "/verification/ISPS-000001-550e8400-0a1b2c3d";
        assert_eq!(normalize_path(path), "/verification/{numero}");
    }

    #[test]
    fn normalize_path_preserves_static_segments() {
        assert_eq!(normalize_path("/health/readiness"), "/health/readiness");
    }
}
