//! Data Models
//!
//! This module contains the data structures shared by every layer:
//!
//! - `Node` - the single persisted entity of the content tree
//! - `NodeUpdate` / `PublishRequest` - values passed into a save
//! - `Permalink` / `SlotKey` / `Component` - value types stored on a node
//! - `NodeQuery` / `SortOrder` - filters and ordering handed to the store

mod node;
mod permalink;
mod query;
mod slot;

pub use node::{
    GroupPermissions, Node, NodeUpdate, PermissionKind, PublishRequest, ValidationError,
    ValidationErrors,
};
pub use permalink::{slugify, Permalink};
pub use query::{NodeQuery, ParentFilter, SortOrder};
pub use slot::{Component, InvalidSlotKey, SlotKey};
