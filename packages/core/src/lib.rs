//! Folio Core - Content Tree Business Logic
//!
//! This crate manages a hierarchical tree of content nodes kept in a
//! document store. Each node has a dense position among its siblings, a
//! scheduled publish window, and a fixed set of typed slots controlled by
//! its template.
//!
//! # Architecture
//!
//! - **Explicit save pipeline**: prune slots → inherit permissions → assign
//!   position → set path → persist → renumber siblings
//! - **Storage as a collaborator**: persistence is reached only through the
//!   `NodeStore` trait; an in-memory implementation is bundled
//! - **Static template registry**: templates and slot groups are declared in
//!   configuration and indexed once at startup
//! - **Derived publish state**: published / pending / expired are computed on
//!   read from the publish window, never stored
//!
//! # Modules
//!
//! - [`models`] - Node record, update/request values, queries
//! - [`templates`] - Template schemas and the registry
//! - [`db`] - Storage collaborator trait, in-memory store, domain events
//! - [`services`] - NodeService, tree manager, publish scheduler, slot composer
//! - [`operations`] - Per-parent serialized moves with retry
//! - [`config`] / [`logging`] - Startup configuration and tracing setup

pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod operations;
pub mod services;
pub mod templates;

// Re-export commonly used types
pub use config::{ConfigError, CoreConfig};
pub use db::{DomainEvent, InMemoryNodeStore, NodeStore};
pub use models::*;
pub use services::*;
pub use templates::{RegistryConfig, SlotGroup, TemplateRegistry, TemplateSchema};
