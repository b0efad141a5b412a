//! Storage Layer
//!
//! The core treats persistence as an external collaborator reached through
//! the `NodeStore` trait:
//!
//! - Atomic single-document writes and partial updates
//! - Atomic filtered multi-update (position increments)
//! - Ordered queries by parent reference
//!
//! `InMemoryNodeStore` is the bundled implementation, used by tests and by
//! embedders that keep the tree in memory. Domain events emitted after
//! successful writes are defined in [`events`].

mod error;
pub mod events;
mod memory_store;
mod node_store;

pub use error::DatabaseError;
pub use events::{DomainEvent, HierarchyRelationship};
pub use memory_store::InMemoryNodeStore;
pub use node_store::{DeleteResult, NodeStore};
