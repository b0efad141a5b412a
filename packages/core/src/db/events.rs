//! Domain Events
//!
//! Events emitted by `NodeService` after a change has been persisted. They
//! let other parts of the system (caches, search indexers, UIs) follow the
//! tree without coupling to the storage collaborator.
//!
//! # Event Flow
//!
//! 1. `NodeService` runs the save pipeline and persists the node
//! 2. A domain event is sent on a tokio broadcast channel
//! 3. Every subscriber receives it asynchronously

use crate::models::Node;
use serde::{Deserialize, Serialize};

/// A node's place in the tree after a move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyRelationship {
    /// `None` when the node sits at the root
    pub parent_id: Option<String>,
    pub child_id: String,
    pub position: u32,
}

/// Domain events emitted by `NodeService`
#[derive(Debug, Clone)]
pub enum DomainEvent {
    /// A node was saved for the first time
    NodeCreated(Node),

    /// An existing node was saved
    NodeUpdated(Node),

    /// A node changed position or parent
    NodeMoved(HierarchyRelationship),

    /// Compaction rewrote `rewritten` sibling positions under `parent_id`
    SiblingsReordered {
        parent_id: Option<String>,
        rewritten: usize,
    },
}

impl DomainEvent {
    pub fn event_type(&self) -> &str {
        match self {
            DomainEvent::NodeCreated(_) => "node:created",
            DomainEvent::NodeUpdated(_) => "node:updated",
            DomainEvent::NodeMoved(_) => "node:moved",
            DomainEvent::SiblingsReordered { .. } => "siblings:reordered",
        }
    }
}
