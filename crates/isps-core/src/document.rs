//! # Document References
//!
//! The formation workflow never stores file bytes. Exam subjects,
//! scanned answer copies, identity documents, and criminal-record
//! checks live in an external document store; the workflow records only
//! the stable reference (URL or store key) it was handed back.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A stable reference to an externally stored document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef(String);

impl DocumentRef {
    /// Wrap a document reference, rejecting empty or blank input.
    pub fn new(reference: impl Into<String>) -> Result<Self, CoreError> {
        let reference = reference.into();
        if reference.trim().is_empty() {
            return Err(CoreError::EmptyDocumentRef);
        }
        Ok(Self(reference))
    }

    /// Access the inner reference string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
