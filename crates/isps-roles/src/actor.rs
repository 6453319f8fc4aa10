//! # Actors
//!
//! An `Actor` pairs the opaque identity handed over by the session
//! layer with its normalized role tag. Workflow actions take an actor,
//! check the relevant capability, and record the identity in the audit
//! log.

use serde::{Deserialize, Serialize};

use isps_core::ActorId;

use crate::resolve::RoleTag;

/// An authenticated acting user, as trusted from the session layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Opaque identity from the session provider.
    pub id: ActorId,
    /// Normalized role tag.
    pub role: RoleTag,
}

impl Actor {
    /// Build an actor from an identity and an already-normalized tag.
    pub fn new(id: ActorId, role: RoleTag) -> Self {
        Self { id, role }
    }

    /// Build an actor from an identity and a raw role name, normalizing
    /// it on the way in.
    pub fn from_raw(id: ActorId, raw_role: &str) -> Self {
        Self {
            id,
            role: RoleTag::from_name(raw_role),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_normalizes() {
        let actor = Actor::from_raw(ActorId::new("u-1"), " DSM ");
        assert_eq!(actor.role, RoleTag::Dsm);
    }

    #[test]
    fn test_from_raw_unknown() {
        let actor = Actor::from_raw(ActorId::new("u-2"), "pilot");
        assert_eq!(actor.role, RoleTag::Unknown);
    }
}
