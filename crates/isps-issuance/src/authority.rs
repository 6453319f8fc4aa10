//! # Issuing Authority
//!
//! The port authority's Ed25519 signing identity. Diplomas carry a
//! signature over their verification code so a verifier holding the
//! authority's public key can check authenticity offline; the
//! verification endpoint does the same check server-side.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

/// The diploma-issuing authority: a display name plus a signing key.
///
/// Key material comes from deployment configuration; `generate()` makes
/// an ephemeral key for development and tests. An ephemeral key means
/// previously issued signatures will not verify after a restart.
pub struct IssuingAuthority {
    name: String,
    signing_key: SigningKey,
}

impl IssuingAuthority {
    /// Create an authority with a freshly generated ephemeral key.
    pub fn generate(name: impl Into<String>) -> Self {
        let mut rng = rand_core::OsRng;
        Self {
            name: name.into(),
            signing_key: SigningKey::generate(&mut rng),
        }
    }

    /// Create an authority from 32 secret key bytes.
    pub fn from_secret_bytes(name: impl Into<String>, bytes: [u8; 32]) -> Self {
        Self {
            name: name.into(),
            signing_key: SigningKey::from_bytes(&bytes),
        }
    }

    /// The authority's display name (stamped on diplomas).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The public verifying key as lowercase hex.
    pub fn verifying_key_hex(&self) -> String {
        to_hex(self.signing_key.verifying_key().as_bytes())
    }

    /// Sign a message, returning the signature as lowercase hex.
    pub fn sign_hex(&self, message: &[u8]) -> String {
        to_hex(&self.signing_key.sign(message).to_bytes())
    }

    /// Verify a hex signature over a message against this authority's key.
    pub fn verify_hex(&self, message: &[u8], signature_hex: &str) -> bool {
        verify_with_key(&self.signing_key.verifying_key(), message, signature_hex)
    }
}

impl std::fmt::Debug for IssuingAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of debug output.
        f.debug_struct("IssuingAuthority")
            .field("name", &self.name)
            .field("verifying_key", &self.verifying_key_hex())
            .finish()
    }
}

/// Verify a hex signature with an explicit verifying key.
pub fn verify_with_key(key: &VerifyingKey, message: &[u8], signature_hex: &str) -> bool {
    let Some(bytes) = from_hex(signature_hex) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&bytes) else {
        return false;
    };
    key.verify(message, &signature).is_ok()
}

/// SHA-256 over a byte string, as lowercase hex.
///
/// Used for diploma verification codes (the QR payload).
pub fn sha256_hex(data: &[u8]) -> String {
    to_hex(&Sha256::digest(data))
}

/// Render bytes as a lowercase hex string.
fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Parse a lowercase or uppercase hex string into bytes.
fn from_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify_roundtrip() {
        let authority = IssuingAuthority::generate("Autorité Portuaire");
        let sig = authority.sign_hex(b"diploma payload");
        assert!(authority.verify_hex(b"diploma payload", &sig));
    }

    #[test]
    fn test_verify_rejects_tampered_message() {
        let authority = IssuingAuthority::generate("test");
        let sig = authority.sign_hex(b"original");
        assert!(!authority.verify_hex(b"tampered", &sig));
    }

    #[test]
    fn test_verify_rejects_garbage_signature() {
        let authority = IssuingAuthority::generate("test");
        assert!(!authority.verify_hex(b"msg", "not-hex"));
        assert!(!authority.verify_hex(b"msg", "abcd"));
    }

    #[test]
    fn test_deterministic_from_secret_bytes() {
        let a = IssuingAuthority::from_secret_bytes("a", [7u8; 32]);
        let b = IssuingAuthority::from_secret_bytes("b", [7u8; 32]);
        assert_eq!(a.verifying_key_hex(), b.verifying_key_hex());
        // Ed25519 signatures are deterministic for the same key and message.
        assert_eq!(a.sign_hex(b"x"), b.sign_hex(b"x"));
    }

    #[test]
    fn test_sha256_hex_shape() {
        let hex = sha256_hex(b"payload");
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_verifying_key_hex_shape() {
        let authority = IssuingAuthority::generate("test");
        assert_eq!(authority.verifying_key_hex().len(), 64);
    }
}
