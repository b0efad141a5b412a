//! Service Layer Error Types
//!
//! This module defines error types for service-layer operations. Store
//! failures arrive as `anyhow::Error` and are folded into `QueryFailed`;
//! validation failures carry every collected field error.

use crate::config::ConfigError;
use crate::models::{ValidationError, ValidationErrors};
use crate::templates::RegistryError;
use thiserror::Error;

/// Service operation errors
#[derive(Error, Debug)]
pub enum NodeServiceError {
    /// Node not found by ID
    #[error("Node not found: {id}")]
    NodeNotFound { id: String },

    /// No live node at this permalink (missing, unpublished or expired)
    #[error("Node not found at permalink: {permalink}")]
    PermalinkNotFound { permalink: String },

    /// Validation failed; nothing was persisted
    #[error("Node validation failed: {0}")]
    ValidationFailed(ValidationErrors),

    /// Invalid parent reference
    #[error("Invalid parent node: {parent_id}")]
    InvalidParent { parent_id: String },

    /// Circular reference detected
    #[error("Circular reference detected: {context}")]
    CircularReference { context: String },

    /// The acting user may not perform the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Storage collaborator failure
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Startup configuration was rejected
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl NodeServiceError {
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NodeNotFound { id: id.into() }
    }

    pub fn permalink_not_found(permalink: impl Into<String>) -> Self {
        Self::PermalinkNotFound {
            permalink: permalink.into(),
        }
    }

    pub fn invalid_parent(parent_id: impl Into<String>) -> Self {
        Self::InvalidParent {
            parent_id: parent_id.into(),
        }
    }

    pub fn circular_reference(context: impl Into<String>) -> Self {
        Self::CircularReference {
            context: context.into(),
        }
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn query_failed(msg: impl Into<String>) -> Self {
        Self::QueryFailed(msg.into())
    }

    /// Both "no such node" flavours
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NodeNotFound { .. } | Self::PermalinkNotFound { .. }
        )
    }

    /// Failures worth retrying: the store may succeed on a later attempt
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::QueryFailed(_))
    }

    /// Collected field errors, when this is a validation failure
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::ValidationFailed(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for NodeServiceError {
    fn from(errors: ValidationErrors) -> Self {
        Self::ValidationFailed(errors)
    }
}

impl From<ValidationError> for NodeServiceError {
    fn from(error: ValidationError) -> Self {
        Self::ValidationFailed(error.into())
    }
}

impl From<RegistryError> for NodeServiceError {
    fn from(error: RegistryError) -> Self {
        Self::Configuration(error.to_string())
    }
}

impl From<ConfigError> for NodeServiceError {
    fn from(error: ConfigError) -> Self {
        Self::Configuration(error.to_string())
    }
}
