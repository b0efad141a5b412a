//! Template Registry
//!
//! Process-wide, read-only index of template schemas and slot groups. It is
//! built once at startup from an explicit `RegistryConfig` and shared behind
//! an `Arc`; nothing mutates it afterwards.

use crate::models::SortOrder;
use crate::templates::{RegistryConfig, SlotGroup, TemplateSchema};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use thiserror::Error;

/// Problems found while building a registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Template name cannot be empty")]
    EmptyTemplateName,

    #[error("Template '{0}' is declared more than once")]
    DuplicateTemplate(String),

    #[error("Slot group '{0}' is declared more than once")]
    DuplicateSlotGroup(String),

    #[error("Template '{template}' lists unknown sub-template '{sub_template}'")]
    UnknownSubTemplate {
        template: String,
        sub_template: String,
    },

    #[error("Template '{template}' configures slots for undeclared slot group '{group}'")]
    UnknownSlotGroup { template: String, group: String },
}

/// Immutable lookup of templates and slot groups
///
/// ```rust
/// use folio_core::templates::{SlotGroup, TemplateRegistry, TemplateSchema};
///
/// let registry = TemplateRegistry::builder()
///     .slot_group(SlotGroup::new("main", ["content"]))
///     .template(TemplateSchema::new("page").root().sub_templates(["article"]).slots("main", 1))
///     .template(TemplateSchema::new("article"))
///     .build()
///     .unwrap();
///
/// assert_eq!(registry.root_templates(), vec!["page"]);
/// assert!(registry.permits_child("page", "article"));
/// assert_eq!(registry.slot_count("article", "main"), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    slot_groups: Vec<SlotGroup>,
    templates: BTreeMap<String, TemplateSchema>,
    /// Template names in declaration order
    declared: Vec<String>,
}

impl TemplateRegistry {
    pub fn builder() -> TemplateRegistryBuilder {
        TemplateRegistryBuilder::default()
    }

    /// Validate and index a registry declaration
    pub fn from_config(config: RegistryConfig) -> Result<Self, RegistryError> {
        let mut group_names = HashSet::new();
        for group in &config.slot_groups {
            if !group_names.insert(group.name.clone()) {
                return Err(RegistryError::DuplicateSlotGroup(group.name.clone()));
            }
        }

        let mut templates = BTreeMap::new();
        let mut declared = Vec::with_capacity(config.templates.len());
        for schema in config.templates {
            if schema.name.trim().is_empty() {
                return Err(RegistryError::EmptyTemplateName);
            }
            if templates.contains_key(&schema.name) {
                return Err(RegistryError::DuplicateTemplate(schema.name));
            }
            declared.push(schema.name.clone());
            templates.insert(schema.name.clone(), schema);
        }

        for schema in templates.values() {
            if let Some(unknown) = schema
                .sub_templates
                .iter()
                .find(|name| !templates.contains_key(*name))
            {
                return Err(RegistryError::UnknownSubTemplate {
                    template: schema.name.clone(),
                    sub_template: unknown.clone(),
                });
            }
            if let Some(group) = schema
                .slot_counts
                .keys()
                .chain(schema.slot_components.keys())
                .find(|group| !group_names.contains(*group))
            {
                return Err(RegistryError::UnknownSlotGroup {
                    template: schema.name.clone(),
                    group: group.clone(),
                });
            }
        }

        tracing::debug!(
            "Template registry built with {} templates and {} slot groups",
            templates.len(),
            config.slot_groups.len()
        );

        Ok(Self {
            slot_groups: config.slot_groups,
            templates,
            declared,
        })
    }

    pub fn get(&self, template: &str) -> Option<&TemplateSchema> {
        self.templates.get(template)
    }

    pub fn contains(&self, template: &str) -> bool {
        self.templates.contains_key(template)
    }

    /// All slot groups in declaration order
    pub fn slot_groups(&self) -> &[SlotGroup] {
        &self.slot_groups
    }

    pub fn slot_group(&self, name: &str) -> Option<&SlotGroup> {
        self.slot_groups.iter().find(|g| g.name == name)
    }

    /// Component types allowed in `group`; empty for unknown groups
    pub fn allowed_components(&self, group: &str) -> &[String] {
        self.slot_group(group)
            .map(|g| g.allowed_components.as_slice())
            .unwrap_or(&[])
    }

    /// Component types allowed in `group` on `template`: the template's
    /// override when it declares one, otherwise the slot group's list
    pub fn allowed_components_for(&self, template: &str, group: &str) -> &[String] {
        match self
            .get(template)
            .and_then(|s| s.slot_components.get(group))
        {
            Some(components) => components.as_slice(),
            None => self.allowed_components(group),
        }
    }

    pub fn allows_component(&self, template: &str, group: &str, component_type: &str) -> bool {
        self.allowed_components_for(template, group)
            .iter()
            .any(|c| c == component_type)
    }

    /// Configured slot count of `group` for `template` (zero when unknown)
    pub fn slot_count(&self, template: &str, group: &str) -> usize {
        self.get(template).map(|s| s.slot_count(group)).unwrap_or(0)
    }

    /// Total number of slots across all groups for `template`
    pub fn slots_count(&self, template: &str) -> usize {
        self.slot_groups
            .iter()
            .map(|g| self.slot_count(template, &g.name))
            .sum()
    }

    /// Templates allowed as children of `parent`; the root templates when
    /// there is no parent
    pub fn template_classes(&self, parent: Option<&str>) -> Vec<&str> {
        match parent {
            None => self.root_templates(),
            Some(name) => self
                .get(name)
                .map(|s| s.sub_templates.iter().map(String::as_str).collect())
                .unwrap_or_default(),
        }
    }

    /// Templates usable at the top of the tree, in declaration order
    pub fn root_templates(&self) -> Vec<&str> {
        self.declared
            .iter()
            .filter(|name| self.templates.get(*name).is_some_and(|s| s.root_template))
            .map(String::as_str)
            .collect()
    }

    /// Sorted names of the templates allowed under `parent`
    pub fn template_names(&self, parent: Option<&str>) -> Vec<String> {
        let mut names: Vec<String> = self
            .template_classes(parent)
            .into_iter()
            .map(str::to_string)
            .collect();
        names.sort();
        names
    }

    /// Every template reachable below `parent` through sub-template
    /// declarations, sorted and de-duplicated
    pub fn all_template_classes(&self, parent: Option<&str>) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut pending: Vec<&str> = self.template_classes(parent);
        while let Some(name) = pending.pop() {
            if seen.insert(name.to_string()) {
                pending.extend(self.template_classes(Some(name)));
            }
        }
        seen.into_iter().collect()
    }

    /// Templates that accept `template` as a child, in declaration order
    pub fn parent_classes(&self, template: &str) -> Vec<&str> {
        self.declared
            .iter()
            .filter(|name| {
                self.templates
                    .get(*name)
                    .is_some_and(|s| s.sub_templates.iter().any(|t| t == template))
            })
            .map(String::as_str)
            .collect()
    }

    /// Whether a `parent` template accepts `child` as sub content
    pub fn permits_child(&self, parent: &str, child: &str) -> bool {
        self.get(parent)
            .is_some_and(|s| s.sub_templates.iter().any(|t| t == child))
    }

    /// Listing order for children of `template`
    pub fn sibling_order(&self, template: &str) -> SortOrder {
        self.get(template)
            .map(|s| s.sibling_order)
            .unwrap_or_default()
    }
}

/// Incremental construction of a `TemplateRegistry`
#[derive(Debug, Default)]
pub struct TemplateRegistryBuilder {
    config: RegistryConfig,
}

impl TemplateRegistryBuilder {
    pub fn slot_group(mut self, group: SlotGroup) -> Self {
        self.config.slot_groups.push(group);
        self
    }

    pub fn template(mut self, schema: TemplateSchema) -> Self {
        self.config.templates.push(schema);
        self
    }

    pub fn build(self) -> Result<TemplateRegistry, RegistryError> {
        TemplateRegistry::from_config(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TemplateRegistry {
        TemplateRegistry::builder()
            .slot_group(SlotGroup::new("main", ["content"]))
            .slot_group(SlotGroup::new("wide", ["content", "gallery"]))
            .slot_group(SlotGroup::new("small", ["quote"]))
            .template(
                TemplateSchema::new("page")
                    .root()
                    .sub_templates(["section", "article"])
                    .slots("main", 1)
                    .slots("small", 4)
                    .slots("wide", 3),
            )
            .template(TemplateSchema::new("section").sub_templates(["article"]))
            .template(TemplateSchema::new("article").slots("main", 1))
            .template(TemplateSchema::new("landing").root().slots("wide", 1))
            .build()
            .unwrap()
    }

    #[test]
    fn test_root_templates_follow_declaration_order() {
        assert_eq!(registry().root_templates(), vec!["page", "landing"]);
        assert_eq!(registry().template_classes(None), vec!["page", "landing"]);
    }

    #[test]
    fn test_template_names_are_sorted() {
        let registry = registry();
        assert_eq!(
            registry.template_names(Some("page")),
            vec!["article".to_string(), "section".to_string()]
        );
        assert_eq!(
            registry.template_names(None),
            vec!["landing".to_string(), "page".to_string()]
        );
    }

    #[test]
    fn test_all_template_classes_is_transitive() {
        let registry = registry();
        assert_eq!(
            registry.all_template_classes(None),
            vec!["article", "landing", "page", "section"]
        );
        assert_eq!(registry.all_template_classes(Some("section")), vec!["article"]);
        assert!(registry.all_template_classes(Some("article")).is_empty());
    }

    #[test]
    fn test_parent_classes() {
        let registry = registry();
        assert_eq!(registry.parent_classes("article"), vec!["page", "section"]);
        assert!(registry.parent_classes("page").is_empty());
    }

    #[test]
    fn test_slot_counts() {
        let registry = registry();
        assert_eq!(registry.slot_count("page", "wide"), 3);
        assert_eq!(registry.slot_count("article", "wide"), 0);
        assert_eq!(registry.slot_count("missing", "wide"), 0);
        assert_eq!(registry.slots_count("page"), 8);
        assert_eq!(registry.allowed_components("wide"), ["content", "gallery"]);
        assert!(registry.allowed_components("nope").is_empty());
    }

    #[test]
    fn test_template_narrows_slot_components() {
        let registry = TemplateRegistry::builder()
            .slot_group(SlotGroup::new("wide", ["content", "gallery"]))
            .template(TemplateSchema::new("page").slots("wide", 2))
            .template(
                TemplateSchema::new("landing")
                    .slots("wide", 2)
                    .slot_components("wide", ["content"]),
            )
            .build()
            .unwrap();

        assert!(registry.allows_component("page", "wide", "gallery"));
        assert!(!registry.allows_component("landing", "wide", "gallery"));
        assert_eq!(registry.allowed_components_for("landing", "wide"), ["content"]);
        assert!(!registry.allows_component("page", "ghost", "content"));

        let result = TemplateRegistry::builder()
            .template(TemplateSchema::new("page").slot_components("ghost", ["content"]))
            .build();
        assert!(matches!(
            result,
            Err(RegistryError::UnknownSlotGroup { .. })
        ));
    }

    #[test]
    fn test_rejects_unknown_sub_template() {
        let result = TemplateRegistry::builder()
            .template(TemplateSchema::new("page").sub_templates(["ghost"]))
            .build();
        assert_eq!(
            result.unwrap_err(),
            RegistryError::UnknownSubTemplate {
                template: "page".to_string(),
                sub_template: "ghost".to_string(),
            }
        );
    }

    #[test]
    fn test_rejects_undeclared_slot_group() {
        let result = TemplateRegistry::builder()
            .template(TemplateSchema::new("page").slots("wide", 2))
            .build();
        assert!(matches!(
            result,
            Err(RegistryError::UnknownSlotGroup { .. })
        ));
    }

    #[test]
    fn test_rejects_duplicates() {
        let result = TemplateRegistry::builder()
            .template(TemplateSchema::new("page"))
            .template(TemplateSchema::new("page"))
            .build();
        assert_eq!(
            result.unwrap_err(),
            RegistryError::DuplicateTemplate("page".to_string())
        );

        let result = TemplateRegistry::builder()
            .slot_group(SlotGroup::new("main", ["content"]))
            .slot_group(SlotGroup::new("main", ["quote"]))
            .build();
        assert_eq!(
            result.unwrap_err(),
            RegistryError::DuplicateSlotGroup("main".to_string())
        );
    }
}
