//! # Domain Identity Newtypes
//!
//! Newtype wrappers for all domain identifiers in the Formation Stack.
//! These prevent accidental identifier confusion — you cannot pass a
//! `ParticipantId` where a `FormationId` is expected, and a diploma
//! number is never just a string.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a formation (a scheduled certification session).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormationId(pub Uuid);

/// Unique identifier for a participant enrolled in a formation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub Uuid);

/// Opaque identifier for an acting user (RSO, chef sûreté, DG, admin).
///
/// The session provider owns actor identity; this service records the
/// identifier it was handed, never credentials.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

/// A diploma number assigned at issuance.
///
/// Globally unique across the whole system, not just within one
/// formation. Allocation is the job of the diploma registry in
/// isps-issuance; this type only carries the assigned value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiplomaNumber(pub String);

impl FormationId {
    /// Generate a new random formation identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID (e.g., from a route path parameter).
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// First 8 hex characters of the UUID, used in diploma numbers.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for FormationId {
    fn default() -> Self {
        Self::new()
    }
}

impl ParticipantId {
    /// Generate a new random participant identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// First 8 hex characters of the UUID, used in diploma numbers.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl ActorId {
    /// Wrap a raw actor identifier from the session layer.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Access the inner identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl DiplomaNumber {
    /// Wrap an already-allocated diploma number.
    pub fn new(numero: impl Into<String>) -> Self {
        Self(numero.into())
    }

    /// Access the inner number string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FormationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "formation:{}", self.0)
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "participant:{}", self.0)
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for DiplomaNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
