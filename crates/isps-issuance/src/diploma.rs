//! # Diploma Registry
//!
//! Allocates diploma numbers and keeps the system-wide issuance record
//! that the public verification endpoint answers from.
//!
//! ## Numbering
//!
//! `ISPS-{sequence:06}-{formation}-{participant}` — a monotonically
//! increasing sequence combined with the short forms of the formation
//! and participant identifiers. The sequence alone guarantees global
//! uniqueness; the identifier suffixes make a number traceable to its
//! records without a lookup. Random generation is deliberately not
//! used: collisions on a certificate register are unacceptable.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use isps_core::{ActorId, DiplomaNumber, FormationId, ParticipantId, Timestamp};

use crate::authority::{sha256_hex, IssuingAuthority};

/// Errors from diploma issuance.
#[derive(Error, Debug)]
pub enum IssuanceError {
    /// A diploma already exists for this participant in this formation.
    #[error("diploma already issued for {participant_id} in {formation_id}")]
    AlreadyIssued {
        /// The formation concerned.
        formation_id: FormationId,
        /// The participant concerned.
        participant_id: ParticipantId,
    },
}

/// The data needed to mint one diploma.
#[derive(Debug, Clone)]
pub struct DiplomaRequest {
    /// The formation the participant was certified in.
    pub formation_id: FormationId,
    /// The participant being certified.
    pub participant_id: ParticipantId,
    /// Holder family name.
    pub nom: String,
    /// Holder given name.
    pub prenom: String,
    /// The formation category tag, carried onto the certificate.
    pub formation_type: String,
    /// The director-general who signed off.
    pub issued_by: ActorId,
}

/// An issued diploma record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diploma {
    /// The globally unique diploma number.
    pub numero: DiplomaNumber,
    /// The formation the diploma was issued for.
    pub formation_id: FormationId,
    /// The certified participant.
    pub participant_id: ParticipantId,
    /// Holder family name.
    pub nom: String,
    /// Holder given name.
    pub prenom: String,
    /// The formation category tag.
    pub formation_type: String,
    /// Issuance timestamp.
    pub issued_at: Timestamp,
    /// The director-general who signed off.
    pub issued_by: ActorId,
    /// Display name of the issuing authority.
    pub issuing_authority: String,
    /// SHA-256 verification code over the canonical payload — the QR payload.
    pub verification_code: String,
    /// Ed25519 signature (hex) by the issuing authority over the
    /// verification code.
    pub signature: String,
}

/// The system-wide diploma register.
///
/// Owns the number sequence and every issued record. One diploma per
/// (formation, participant) pair, ever.
#[derive(Debug, Default)]
pub struct DiplomaRegistry {
    next_sequence: u64,
    issued: HashMap<String, Diploma>,
    by_participant: HashSet<(FormationId, ParticipantId)>,
}

impl DiplomaRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a diploma: allocate the next number, compute the
    /// verification code, and sign it with the authority key.
    pub fn issue(
        &mut self,
        request: DiplomaRequest,
        authority: &IssuingAuthority,
    ) -> Result<Diploma, IssuanceError> {
        let key = (request.formation_id, request.participant_id);
        if self.by_participant.contains(&key) {
            return Err(IssuanceError::AlreadyIssued {
                formation_id: request.formation_id,
                participant_id: request.participant_id,
            });
        }

        self.next_sequence += 1;
        let numero = DiplomaNumber::new(format!(
            "ISPS-{:06}-{}-{}",
            self.next_sequence,
            request.formation_id.short(),
            request.participant_id.short()
        ));
        let issued_at = Timestamp::now();

        let payload = format!(
            "{}|{}|{}|{} {}|{}",
            numero,
            request.formation_id,
            request.participant_id,
            request.prenom,
            request.nom,
            issued_at
        );
        let verification_code = sha256_hex(payload.as_bytes());
        let signature = authority.sign_hex(verification_code.as_bytes());

        let diploma = Diploma {
            numero: numero.clone(),
            formation_id: request.formation_id,
            participant_id: request.participant_id,
            nom: request.nom,
            prenom: request.prenom,
            formation_type: request.formation_type,
            issued_at,
            issued_by: request.issued_by,
            issuing_authority: authority.name().to_string(),
            verification_code,
            signature,
        };

        self.by_participant.insert(key);
        self.issued
            .insert(numero.as_str().to_string(), diploma.clone());
        Ok(diploma)
    }

    /// Look up a diploma by number, for the verification endpoint.
    pub fn lookup(&self, numero: &str) -> Option<&Diploma> {
        self.issued.get(numero)
    }

    /// Number of diplomas ever issued.
    pub fn count(&self) -> usize {
        self.issued.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(formation_id: FormationId) -> DiplomaRequest {
        DiplomaRequest {
            formation_id,
            participant_id: ParticipantId::new(),
            nom: "Diop".to_string(),
            prenom: "Awa".to_string(),
            formation_type: "agent_surete_portuaire".to_string(),
            issued_by: ActorId::new("dg-1"),
        }
    }

    #[test]
    fn test_issue_assigns_sequenced_number() {
        let mut registry = DiplomaRegistry::new();
        let authority = IssuingAuthority::generate("test");
        let formation = FormationId::new();

        let d1 = registry.issue(request(formation), &authority).unwrap();
        let d2 = registry.issue(request(formation), &authority).unwrap();

        assert!(d1.numero.as_str().starts_with("ISPS-000001-"));
        assert!(d2.numero.as_str().starts_with("ISPS-000002-"));
        assert_ne!(d1.numero, d2.numero);
    }

    #[test]
    fn test_numbers_unique_across_formations() {
        let mut registry = DiplomaRegistry::new();
        let authority = IssuingAuthority::generate("test");

        let mut seen = HashSet::new();
        for _ in 0..50 {
            let d = registry.issue(request(FormationId::new()), &authority).unwrap();
            assert!(seen.insert(d.numero.as_str().to_string()), "duplicate number");
        }
        assert_eq!(registry.count(), 50);
    }

    #[test]
    fn test_double_issue_same_participant_rejected() {
        let mut registry = DiplomaRegistry::new();
        let authority = IssuingAuthority::generate("test");
        let formation = FormationId::new();
        let participant = ParticipantId::new();

        let mut req = request(formation);
        req.participant_id = participant;
        registry.issue(req.clone(), &authority).unwrap();

        let result = registry.issue(req, &authority);
        assert!(matches!(result, Err(IssuanceError::AlreadyIssued { .. })));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_lookup_roundtrip() {
        let mut registry = DiplomaRegistry::new();
        let authority = IssuingAuthority::generate("test");
        let d = registry.issue(request(FormationId::new()), &authority).unwrap();

        let found = registry.lookup(d.numero.as_str()).unwrap();
        assert_eq!(found.nom, "Diop");
        assert_eq!(found.issuing_authority, "test");
        assert!(registry.lookup("ISPS-999999-deadbeef-deadbeef").is_none());
    }

    #[test]
    fn test_signature_verifies() {
        let mut registry = DiplomaRegistry::new();
        let authority = IssuingAuthority::generate("Autorité Portuaire");
        let d = registry.issue(request(FormationId::new()), &authority).unwrap();

        assert_eq!(d.verification_code.len(), 64);
        assert!(authority.verify_hex(d.verification_code.as_bytes(), &d.signature));
    }
}
