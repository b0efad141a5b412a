//! Business Services
//!
//! This module contains the core business logic:
//!
//! - `NodeService` - save pipeline, lookups and tree mutations
//! - `TreeManager` - sibling enumeration, position assignment and renumbering
//! - `PublishScheduler` - derived publish state and publish/hide requests
//! - `SlotComposer` - slot layout, validation and pruning
//! - `permissions` - group-based permission checks
//!
//! Services coordinate between the storage collaborator and the template
//! registry; none of them hold node state of their own.

pub mod clock;
pub mod error;
pub mod node_service;
pub mod permissions;
pub mod publish_scheduler;
pub mod slot_composer;
pub mod tree_manager;

#[cfg(test)]
pub(crate) mod test_support;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::NodeServiceError;
pub use node_service::{CreateNodeParams, NodeService};
pub use permissions::User;
pub use publish_scheduler::{PublishScheduler, PublishStatus, DEFAULT_PUBLISH_HORIZON_YEARS};
pub use slot_composer::SlotComposer;
pub use tree_manager::TreeManager;
