//! Template System
//!
//! Every node names a template (its node type). A template declares:
//!
//! - which templates are allowed as its children
//! - whether it may be used at the root of the tree
//! - how many slots of each slot group it offers
//!
//! Slot groups are declared once for the whole process, each with the list
//! of component types it accepts. `TemplateRegistry` indexes both and is
//! the only way the rest of the crate looks them up.

mod registry;
mod schema;

pub use registry::{RegistryError, TemplateRegistry, TemplateRegistryBuilder};
pub use schema::{RegistryConfig, SlotGroup, TemplateSchema};
