//! # API Route Modules
//!
//! - `formations` — formation CRUD and the workflow action endpoints
//!   (validation decision, exam lifecycle, supervision report, grading,
//!   diploma issuance). Authenticated; actions additionally require the
//!   actor headers.
//! - `verification` — public diploma verification by number. Mounted on
//!   the unauthenticated router: holders and employers check
//!   certificates without credentials.

pub mod formations;
pub mod verification;
