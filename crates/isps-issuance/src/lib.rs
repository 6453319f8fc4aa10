//! # isps-issuance — Grading and Diploma Issuance
//!
//! The terminal stage of the formation workflow: deriving pass/fail
//! from exam scores and minting certified-outcome records.
//!
//! ## Components
//!
//! - **Grading** (`grade.rs`): the one derivation rule, `score >= 10`
//!   passes, total over the whole `[0, 20]` domain.
//!
//! - **Registry** (`diploma.rs`): allocates diploma numbers from a
//!   monotonically increasing sequence combined with formation and
//!   participant identifiers — unique across the whole system, never
//!   random — and answers public verification lookups.
//!
//! - **Authority** (`authority.rs`): the issuing authority's Ed25519
//!   key. Every diploma carries a SHA-256 verification code (the QR
//!   payload) and the authority's signature over it.

pub mod authority;
pub mod diploma;
pub mod grade;

pub use authority::IssuingAuthority;
pub use diploma::{Diploma, DiplomaRegistry, DiplomaRequest, IssuanceError};
pub use grade::{outcome, Outcome, PASS_THRESHOLD};
