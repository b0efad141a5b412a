//! Database Error Types
//!
//! Errors raised by the bundled storage backend. Store trait methods return
//! `anyhow::Result`, so other backends are free to surface their own types.

use thiserror::Error;

/// Storage operation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatabaseError {
    /// Partial update addressed a document that does not exist
    #[error("Document not found: {id}")]
    DocumentNotFound { id: String },

    /// Write refused by the failure-injection budget (tests only)
    #[error("Write rejected after {limit} successful writes (injected failure)")]
    InjectedFailure { limit: usize },

    /// Position increment would overflow
    #[error("Position overflow on document {id}")]
    PositionOverflow { id: String },
}

impl DatabaseError {
    pub fn document_not_found(id: impl Into<String>) -> Self {
        Self::DocumentNotFound { id: id.into() }
    }

    pub fn injected_failure(limit: usize) -> Self {
        Self::InjectedFailure { limit }
    }

    pub fn position_overflow(id: impl Into<String>) -> Self {
        Self::PositionOverflow { id: id.into() }
    }
}
