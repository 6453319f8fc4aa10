//! # isps-core — Foundational Types for the Formation Stack
//!
//! This crate is the bedrock of the ISPS Formation Stack. It defines the
//! type-system primitives shared by every other crate in the workspace;
//! it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `FormationId`,
//!    `ParticipantId`, `ActorId`, `DiplomaNumber`, `DocumentRef` — all
//!    newtypes with dedicated constructors. No bare strings or UUIDs for
//!    identifiers crossing a crate boundary.
//!
//! 2. **UTC-only timestamps.** The `Timestamp` type enforces UTC with Z
//!    suffix and seconds precision, so audit-log entries and diploma
//!    issuance dates render identically everywhere.
//!
//! 3. **Validated scores.** `Score` rejects values outside the 0–20 exam
//!    scale at construction. Pass/fail derivation lives in isps-issuance;
//!    this crate only guarantees the domain.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `isps-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug`, `Clone`, and implement
//!   `Serialize`/`Deserialize`.

pub mod document;
pub mod error;
pub mod identity;
pub mod score;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use document::DocumentRef;
pub use error::CoreError;
pub use identity::{ActorId, DiplomaNumber, FormationId, ParticipantId};
pub use score::Score;
pub use temporal::Timestamp;
