//! Template Schema Records
//!
//! Plain declarations, deserialized from configuration, describing each
//! template (node type) and each slot group. They carry no behavior beyond
//! small builder helpers; `TemplateRegistry` validates and indexes them.
//!
//! ## Example configuration
//!
//! ```json
//! {
//!   "slotGroups": [
//!     { "name": "main", "allowedComponents": ["content"] },
//!     { "name": "wide", "allowedComponents": ["content", "gallery"] }
//!   ],
//!   "templates": [
//!     {
//!       "name": "page",
//!       "rootTemplate": true,
//!       "subTemplates": ["page", "article"],
//!       "slotCounts": { "main": 1, "wide": 3 }
//!     },
//!     {
//!       "name": "article",
//!       "slotCounts": { "main": 1, "wide": 1 },
//!       "slotComponents": { "wide": ["gallery"] }
//!     }
//!   ]
//! }
//! ```

use crate::models::SortOrder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named slot category and the component types allowed in it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotGroup {
    pub name: String,

    #[serde(default)]
    pub allowed_components: Vec<String>,
}

impl SlotGroup {
    pub fn new<I, S>(name: impl Into<String>, allowed_components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            allowed_components: allowed_components.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allows(&self, component_type: &str) -> bool {
        self.allowed_components.iter().any(|c| c == component_type)
    }
}

/// Declared schema of one template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSchema {
    pub name: String,

    /// Templates permitted as children, in declaration order
    #[serde(default)]
    pub sub_templates: Vec<String>,

    /// Whether nodes of this template may sit at the top of the tree
    #[serde(default)]
    pub root_template: bool,

    /// Slot count per slot group. Groups not listed have no slots.
    #[serde(default)]
    pub slot_counts: BTreeMap<String, usize>,

    /// Narrower component allow-lists for some groups on this template.
    /// Groups not listed use the slot group's own list.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub slot_components: BTreeMap<String, Vec<String>>,

    /// Order used when listing this template's children and siblings
    #[serde(default)]
    pub sibling_order: SortOrder,
}

impl TemplateSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sub_templates: Vec::new(),
            root_template: false,
            slot_counts: BTreeMap::new(),
            slot_components: BTreeMap::new(),
            sibling_order: SortOrder::default(),
        }
    }

    pub fn root(mut self) -> Self {
        self.root_template = true;
        self
    }

    pub fn sub_templates<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sub_templates = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn slots(mut self, group: impl Into<String>, count: usize) -> Self {
        self.slot_counts.insert(group.into(), count);
        self
    }

    /// Override the component types allowed in `group` for this template
    pub fn slot_components<I, S>(mut self, group: impl Into<String>, components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.slot_components
            .insert(group.into(), components.into_iter().map(Into::into).collect());
        self
    }

    pub fn sibling_order(mut self, order: SortOrder) -> Self {
        self.sibling_order = order;
        self
    }

    /// Configured slot count for `group` (zero when not declared)
    pub fn slot_count(&self, group: &str) -> usize {
        self.slot_counts.get(group).copied().unwrap_or(0)
    }
}

/// Full registry declaration as read from configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryConfig {
    /// Slot groups in declaration order; this order drives slot listing
    #[serde(default)]
    pub slot_groups: Vec<SlotGroup>,

    #[serde(default)]
    pub templates: Vec<TemplateSchema>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_template_defaults_from_config() {
        let schema: TemplateSchema = serde_json::from_value(json!({"name": "article"})).unwrap();
        assert!(!schema.root_template);
        assert!(schema.sub_templates.is_empty());
        assert_eq!(schema.slot_count("main"), 0);
        assert_eq!(schema.sibling_order, SortOrder::PositionAsc);
    }

    #[test]
    fn test_builder_helpers() {
        let schema = TemplateSchema::new("page")
            .root()
            .sub_templates(["page", "article"])
            .slots("wide", 3)
            .sibling_order(SortOrder::TitleAsc);

        assert!(schema.root_template);
        assert_eq!(schema.sub_templates, vec!["page", "article"]);
        assert_eq!(schema.slot_count("wide"), 3);
        assert_eq!(schema.sibling_order, SortOrder::TitleAsc);
    }

    #[test]
    fn test_registry_config_parses_camel_case() {
        let config: RegistryConfig = serde_json::from_value(json!({
            "slotGroups": [{"name": "main", "allowedComponents": ["content"]}],
            "templates": [{"name": "page", "rootTemplate": true, "slotCounts": {"main": 1},
                           "siblingOrder": "title_asc"}]
        }))
        .unwrap();

        assert!(config.slot_groups[0].allows("content"));
        assert!(!config.slot_groups[0].allows("gallery"));
        assert!(config.templates[0].root_template);
        assert_eq!(config.templates[0].sibling_order, SortOrder::TitleAsc);
    }
}
