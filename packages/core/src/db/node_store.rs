//! NodeStore Trait - Storage Collaborator Contract
//!
//! This module defines the `NodeStore` trait, the only surface through which
//! the core touches persistence. Document framing, indexes and deletion
//! policy belong to the implementation; the core needs:
//!
//! - **Atomic single-document writes** (`save_node`, `update_position`, `update_path`)
//! - **Atomic filtered multi-update** (`increment_positions`)
//! - **Ordered queries** (`find_nodes`)
//!
//! # Design Decisions
//!
//! 1. **Async-First**: All methods are async so embedded and networked
//!    document stores fit behind the same trait
//! 2. **Error Handling**: Uses `anyhow::Result` for flexible backend context;
//!    `NodeService` maps failures into `NodeServiceError`
//! 3. **No transactions**: Multi-document consistency is recovered by sibling
//!    compaction rather than demanded from the backend
//!
//! # Examples
//!
//! ```rust
//! use folio_core::db::{InMemoryNodeStore, NodeStore};
//! use folio_core::models::{Node, NodeQuery, ParentFilter, SortOrder};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let store = InMemoryNodeStore::new();
//! store.save_node(Node::new("page", "Home", None).with_position(0)).await?;
//!
//! let roots = store
//!     .find_nodes(&NodeQuery::new().parent(ParentFilter::Root), SortOrder::PositionAsc)
//!     .await?;
//! assert_eq!(roots.len(), 1);
//! # Ok(())
//! # }
//! ```

use crate::models::{Node, NodeQuery, SortOrder};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of a delete operation
///
/// Deletes are idempotent: removing a missing document succeeds, and
/// `existed` reports whether anything was there.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteResult {
    pub existed: bool,
}

impl DeleteResult {
    pub fn existed() -> Self {
        Self { existed: true }
    }

    pub fn not_found() -> Self {
        Self { existed: false }
    }
}

/// Abstraction over the document store holding nodes
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; `NodeService` shares one store
/// across tasks behind an `Arc<dyn NodeStore>`.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Insert or replace a whole node document
    ///
    /// Returns the stored document.
    async fn save_node(&self, node: Node) -> Result<Node>;

    /// Replace every field of an existing document except its position
    ///
    /// Returns the stored document, carrying the position already in the
    /// store. Used by saves that did not move the node, so a swap landing
    /// between their read and their write survives.
    ///
    /// The default re-reads the position right before writing, which
    /// narrows the window without closing it; backends with partial
    /// updates should override it.
    async fn save_node_content(&self, mut node: Node) -> Result<Node> {
        if let Some(stored) = self.get_node(&node.id).await? {
            node.position = stored.position;
        }
        self.save_node(node).await
    }

    /// Get a node by ID
    ///
    /// - `Ok(Some(node))` if it exists
    /// - `Ok(None)` if it doesn't (not an error)
    async fn get_node(&self, id: &str) -> Result<Option<Node>>;

    /// Find every node matching `query`, sorted by `order`
    async fn find_nodes(&self, query: &NodeQuery, order: SortOrder) -> Result<Vec<Node>>;

    /// First node matching `query` under `order`
    async fn find_one(&self, query: &NodeQuery, order: SortOrder) -> Result<Option<Node>> {
        Ok(self.find_nodes(query, order).await?.into_iter().next())
    }

    /// Number of nodes matching `query`
    async fn count_nodes(&self, query: &NodeQuery) -> Result<usize> {
        Ok(self.find_nodes(query, SortOrder::PositionAsc).await?.len())
    }

    /// Partial update of one document's position
    async fn update_position(&self, id: &str, position: u32) -> Result<()>;

    /// Write several positions as one unit
    ///
    /// The default applies them one by one; backends that can update several
    /// documents atomically should override it. A partially applied call may
    /// leave duplicate positions behind, which sibling compaction repairs.
    async fn set_positions(&self, positions: &[(String, u32)]) -> Result<()> {
        for (id, position) in positions {
            self.update_position(id, *position).await?;
        }
        Ok(())
    }

    /// Atomically add `by` to the position of every node matching `query`
    ///
    /// Returns the number of documents changed.
    async fn increment_positions(&self, query: &NodeQuery, by: u32) -> Result<u64>;

    /// Partial update of one document's cached ancestor path
    async fn update_path(&self, id: &str, path: Vec<String>) -> Result<()>;

    /// Remove one document. Never cascades to children.
    async fn delete_node(&self, id: &str) -> Result<DeleteResult>;
}
