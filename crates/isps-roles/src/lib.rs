//! # isps-roles — Role Resolution and Capability Predicates
//!
//! The session provider hands this service a raw, loosely-typed role
//! claim: sometimes a bare string, sometimes an object with a `name`
//! field, with inconsistent casing and legacy aliases. Every
//! authorization decision in the workflow flows through one pure
//! function, [`RoleTag::resolve`], which collapses that input into a
//! closed tag set — so there is exactly one place where "what counts as
//! a safety officer" is defined, instead of a boolean expression
//! re-derived per screen.
//!
//! ## Design
//!
//! - Resolution never fails. Absent or unrecognized input yields
//!   [`RoleTag::Unknown`], which satisfies no capability predicate.
//! - Capability predicates are named methods, not inline set checks:
//!   `is_safety_responsible()`, `is_director()`, `is_administrator()`,
//!   `can_manage_formation()`.
//! - No side effects, no I/O, no error type.

pub mod actor;
pub mod resolve;

pub use actor::Actor;
pub use resolve::{RawRole, RoleTag};
