//! # Middleware
//!
//! - `metrics` — Prometheus HTTP metrics recorded per request, plus the
//!   domain gauges updated on `/metrics` scrape.
//!
//! Authentication middleware lives in `crate::auth` next to the actor
//! extractor it pairs with.

pub mod metrics;
