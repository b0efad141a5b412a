//! Node Data Structures
//!
//! This module defines the `Node` record, the single persisted entity of the
//! content tree, together with the values passed alongside it into a save:
//!
//! - `Node` - persisted document (structure, content, publish window, groups, slots)
//! - `NodeUpdate` - sparse update applied to an existing node
//! - `PublishRequest` - transient publish/hide flags consumed by one save
//! - `ValidationError` / `ValidationErrors` - field-level save rejections
//!
//! # Examples
//!
//! ```rust
//! use folio_core::models::{Component, Node, SlotKey};
//! use serde_json::json;
//!
//! let page = Node::new("page", "About us", None)
//!     .with_slot(SlotKey::new("main", 0), Component::new("content", json!({"text": "Hi"})));
//!
//! assert_eq!(page.display_name(), "About us");
//! assert!(page.is_root());
//! ```

use crate::models::{Component, Permalink, SlotKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Validation errors for Node saves
///
/// Every variant belongs to one field of the node, reported by
/// [`ValidationError::field`], so callers can attach messages to form inputs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("Template cannot be changed to '{template}' as sub content of type '{child_type}' is not allowed in this template")]
    TemplateRejectsChildren {
        template: String,
        child_type: String,
    },

    #[error("{slot} holds '{component_type}', which is not allowed in a {group} slot", group = .slot.group)]
    SlotNotAllowed {
        slot: SlotKey,
        component_type: String,
    },

    #[error("Node id '{0}' is already in use")]
    IdTaken(String),

    #[error("Permalink '{0}' is already taken")]
    PermalinkTaken(String),

    #[error("Invalid parent reference: {0}")]
    InvalidParent(String),
}

impl ValidationError {
    /// Name of the field this error is attached to
    pub fn field(&self) -> String {
        match self {
            Self::MissingField(field) => field.clone(),
            Self::UnknownTemplate(_) | Self::TemplateRejectsChildren { .. } => {
                "template".to_string()
            }
            Self::SlotNotAllowed { slot, .. } => slot.to_string(),
            Self::IdTaken(_) => "id".to_string(),
            Self::PermalinkTaken(_) => "permalink".to_string(),
            Self::InvalidParent(_) => "parent".to_string(),
        }
    }
}

/// Ordered collection of validation failures for one save
#[derive(Error, Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    pub fn extend(&mut self, errors: impl IntoIterator<Item = ValidationError>) {
        self.0.extend(errors);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    /// Errors attached to a given field
    pub fn on(&self, field: &str) -> Vec<&ValidationError> {
        self.0.iter().filter(|e| e.field() == field).collect()
    }

    /// `Ok(())` when nothing was collected, otherwise `Err(self)`
    pub fn into_result(self) -> Result<(), Self> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&messages.join("; "))
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

/// The four permission kinds carried by every node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionKind {
    Updatable,
    Destroyable,
    Publishable,
    Viewable,
}

impl PermissionKind {
    pub const ALL: [PermissionKind; 4] = [
        PermissionKind::Updatable,
        PermissionKind::Destroyable,
        PermissionKind::Publishable,
        PermissionKind::Viewable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Updatable => "updatable",
            Self::Destroyable => "destroyable",
            Self::Publishable => "publishable",
            Self::Viewable => "viewable",
        }
    }
}

/// Group lists per permission kind. An empty list means unrestricted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPermissions {
    #[serde(default)]
    pub updatable_groups: BTreeSet<String>,
    #[serde(default)]
    pub destroyable_groups: BTreeSet<String>,
    #[serde(default)]
    pub publishable_groups: BTreeSet<String>,
    #[serde(default)]
    pub viewable_groups: BTreeSet<String>,
}

impl GroupPermissions {
    pub fn groups(&self, kind: PermissionKind) -> &BTreeSet<String> {
        match kind {
            PermissionKind::Updatable => &self.updatable_groups,
            PermissionKind::Destroyable => &self.destroyable_groups,
            PermissionKind::Publishable => &self.publishable_groups,
            PermissionKind::Viewable => &self.viewable_groups,
        }
    }

    pub fn groups_mut(&mut self, kind: PermissionKind) -> &mut BTreeSet<String> {
        match kind {
            PermissionKind::Updatable => &mut self.updatable_groups,
            PermissionKind::Destroyable => &mut self.destroyable_groups,
            PermissionKind::Publishable => &mut self.publishable_groups,
            PermissionKind::Viewable => &mut self.viewable_groups,
        }
    }

    /// Union of all four lists
    pub fn all_groups(&self) -> BTreeSet<String> {
        PermissionKind::ALL
            .iter()
            .flat_map(|kind| self.groups(*kind).iter().cloned())
            .collect()
    }
}

/// A node of the content tree.
///
/// # Fields
///
/// - `id`: Unique identifier (UUID unless supplied by the caller)
/// - `node_type`: Template name; selects allowed children and slot layout
/// - `parent_id`: Parent reference (`None` = root)
/// - `position`: Dense zero-based index among siblings, `None` until first save
/// - `path`: Ancestor ids, root first, cached on save
/// - `published_at` / `published_to`: Publish window
/// - `permissions`: Group lists copied from the parent at creation
/// - `slots`: Populated slots keyed by `<group>_slot_<index>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,

    pub node_type: String,

    pub title: String,

    /// Short name, defaults to the title on save
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub body: Option<String>,

    /// Derived from the parent's permalink and the node's slug when blank
    #[serde(default)]
    pub permalink: Permalink,

    pub parent_id: Option<String>,

    #[serde(default)]
    pub position: Option<u32>,

    #[serde(default)]
    pub path: Vec<String>,

    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub published_to: Option<DateTime<Utc>>,

    #[serde(default, flatten)]
    pub permissions: GroupPermissions,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub slots: BTreeMap<SlotKey, Component>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Node {
    /// Create an unsaved node with an auto-generated UUID
    ///
    /// ```rust
    /// # use folio_core::models::Node;
    /// let root = Node::new("page", "Home", None);
    /// let child = Node::new("page", "About", Some(root.id.clone()));
    /// assert!(root.is_root());
    /// assert!(!child.is_root());
    /// assert!(child.position.is_none());
    /// ```
    pub fn new(
        node_type: impl Into<String>,
        title: impl Into<String>,
        parent_id: Option<String>,
    ) -> Self {
        Self::new_with_id(Uuid::new_v4().to_string(), node_type, title, parent_id)
    }

    /// Create an unsaved node with a caller-chosen ID
    pub fn new_with_id(
        id: impl Into<String>,
        node_type: impl Into<String>,
        title: impl Into<String>,
        parent_id: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            node_type: node_type.into(),
            title: title.into(),
            name: None,
            description: None,
            body: None,
            permalink: Permalink::default(),
            parent_id,
            position: None,
            path: Vec::new(),
            published_at: None,
            published_to: None,
            permissions: GroupPermissions::default(),
            slots: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_position(mut self, position: u32) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_permalink(mut self, permalink: impl Into<Permalink>) -> Self {
        self.permalink = permalink.into();
        self
    }

    pub fn with_publish_window(
        mut self,
        published_at: Option<DateTime<Utc>>,
        published_to: Option<DateTime<Utc>>,
    ) -> Self {
        self.published_at = published_at;
        self.published_to = published_to;
        self
    }

    pub fn with_slot(mut self, key: SlotKey, component: Component) -> Self {
        self.slots.insert(key, component);
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// The name if set and non-blank, otherwise the title
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.title,
        }
    }

    pub fn slot(&self, key: &SlotKey) -> Option<&Component> {
        self.slots.get(key)
    }

    /// Check fields that must be present on every save
    pub fn validate_required(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.id.trim().is_empty() {
            errors.push(ValidationError::MissingField("id".to_string()));
        }
        if self.node_type.trim().is_empty() {
            errors.push(ValidationError::MissingField("template".to_string()));
        }
        if self.title.trim().is_empty() {
            errors.push(ValidationError::MissingField("title".to_string()));
        }
        if let Some(parent_id) = &self.parent_id {
            if parent_id == &self.id {
                errors.push(ValidationError::InvalidParent(
                    "Node cannot be its own parent".to_string(),
                ));
            }
        }
        errors
    }
}

/// Transient publish/hide flags for a single save.
///
/// Never stored: the save pipeline consumes them to adjust the publish
/// window, then drops them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    #[serde(default)]
    pub publish: bool,
    #[serde(default)]
    pub hide: bool,
}

impl PublishRequest {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn publish() -> Self {
        Self {
            publish: true,
            hide: false,
        }
    }

    pub fn hide() -> Self {
        Self {
            publish: false,
            hide: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.publish && !self.hide
    }
}

/// Custom deserializer for optional fields that accepts both plain values and nulls
///
/// Maps three input formats to the double-Option pattern:
/// - Missing field → None (don't update)
/// - null → Some(None) (set to NULL)
/// - "value" → Some(Some("value")) (set to value)
fn deserialize_optional_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}

/// Partial node update
///
/// Nullable fields use the double-`Option` pattern:
///
/// - `None`: Don't change this field
/// - `Some(None)`: Clear the field
/// - `Some(Some(value))`: Set the field
///
/// Slot entries map a slot to `Some(component)` (set) or `None` (clear).
/// Parent changes go through `NodeService::reparent`, not through updates.
///
/// ```rust
/// # use folio_core::models::{NodeUpdate, SlotKey};
/// let update = NodeUpdate::new()
///     .with_node_type("landing-page")
///     .clear_slot(SlotKey::new("wide", 2));
/// assert!(!update.is_empty());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub name: Option<Option<String>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub description: Option<Option<String>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub body: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub permalink: Option<Permalink>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub published_at: Option<Option<DateTime<Utc>>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub published_to: Option<Option<DateTime<Utc>>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<GroupPermissions>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub slots: BTreeMap<SlotKey, Option<Component>>,
}

impl NodeUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Change the node's template
    pub fn with_node_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = Some(node_type.into());
        self
    }

    pub fn with_position(mut self, position: u32) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_permalink(mut self, permalink: impl Into<Permalink>) -> Self {
        self.permalink = Some(permalink.into());
        self
    }

    pub fn with_publish_window(
        mut self,
        published_at: Option<DateTime<Utc>>,
        published_to: Option<DateTime<Utc>>,
    ) -> Self {
        self.published_at = Some(published_at);
        self.published_to = Some(published_to);
        self
    }

    pub fn with_slot(mut self, key: SlotKey, component: Component) -> Self {
        self.slots.insert(key, Some(component));
        self
    }

    pub fn clear_slot(mut self, key: SlotKey) -> Self {
        self.slots.insert(key, None);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.node_type.is_none()
            && self.title.is_none()
            && self.name.is_none()
            && self.description.is_none()
            && self.body.is_none()
            && self.permalink.is_none()
            && self.position.is_none()
            && self.published_at.is_none()
            && self.published_to.is_none()
            && self.permissions.is_none()
            && self.slots.is_empty()
    }

    /// Apply the provided fields onto `node`
    pub fn apply_to(self, node: &mut Node) {
        if let Some(node_type) = self.node_type {
            node.node_type = node_type;
        }
        if let Some(title) = self.title {
            node.title = title;
        }
        if let Some(name) = self.name {
            node.name = name;
        }
        if let Some(description) = self.description {
            node.description = description;
        }
        if let Some(body) = self.body {
            node.body = body;
        }
        if let Some(permalink) = self.permalink {
            node.permalink = permalink;
        }
        if let Some(position) = self.position {
            node.position = Some(position);
        }
        if let Some(published_at) = self.published_at {
            node.published_at = published_at;
        }
        if let Some(published_to) = self.published_to {
            node.published_to = published_to;
        }
        if let Some(permissions) = self.permissions {
            node.permissions = permissions;
        }
        for (key, component) in self.slots {
            match component {
                Some(component) => {
                    node.slots.insert(key, component);
                }
                None => {
                    node.slots.remove(&key);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_creation() {
        let node = Node::new("page", "Test page", None);

        assert!(!node.id.is_empty());
        assert_eq!(node.node_type, "page");
        assert_eq!(node.title, "Test page");
        assert!(node.parent_id.is_none());
        assert!(node.position.is_none());
        assert!(node.path.is_empty());
        assert!(node.is_root());
    }

    #[test]
    fn test_display_name_falls_back_to_title() {
        let node = Node::new("page", "Title", None);
        assert_eq!(node.display_name(), "Title");

        let node = node.with_name("  ");
        assert_eq!(node.display_name(), "Title");

        let node = node.with_name("Short");
        assert_eq!(node.display_name(), "Short");
    }

    #[test]
    fn test_validate_required_collects_every_field() {
        let node = Node::new_with_id("self", "", " ", Some("self".to_string()));

        let errors = node.validate_required();
        let fields: Vec<String> = errors.iter().map(|e| e.field()).collect();
        assert_eq!(fields, vec!["template", "title", "parent"]);
    }

    #[test]
    fn test_validation_errors_lookup_by_field() {
        let mut errors = ValidationErrors::new();
        errors.push(ValidationError::MissingField("title".to_string()));
        errors.push(ValidationError::SlotNotAllowed {
            slot: SlotKey::new("wide", 1),
            component_type: "gallery".to_string(),
        });

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.on("wide_slot_1").len(), 1);
        assert!(errors.on("permalink").is_empty());
        assert_eq!(
            errors.to_string(),
            "Missing required field: title; wide_slot_1 holds 'gallery', which is not allowed in a wide slot"
        );
        assert!(errors.into_result().is_err());
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_all_groups_is_union() {
        let mut permissions = GroupPermissions::default();
        permissions.updatable_groups.insert("editors".to_string());
        permissions.viewable_groups.insert("members".to_string());
        permissions.viewable_groups.insert("editors".to_string());

        let all: Vec<String> = permissions.all_groups().into_iter().collect();
        assert_eq!(all, vec!["editors", "members"]);
    }

    #[test]
    fn test_update_applies_double_options() {
        let mut node = Node::new("page", "Old", None)
            .with_name("old-name")
            .with_slot(SlotKey::new("main", 0), Component::new("content", json!({})));

        let update = NodeUpdate {
            title: Some("New".to_string()),
            name: Some(None),
            ..Default::default()
        }
        .clear_slot(SlotKey::new("main", 0))
        .with_slot(SlotKey::new("wide", 0), Component::new("gallery", json!({})));

        update.apply_to(&mut node);

        assert_eq!(node.title, "New");
        assert!(node.name.is_none());
        assert!(node.slot(&SlotKey::new("main", 0)).is_none());
        assert!(node.slot(&SlotKey::new("wide", 0)).is_some());
    }

    #[test]
    fn test_update_deserializes_null_as_clear() {
        let update: NodeUpdate =
            serde_json::from_value(json!({"publishedTo": null, "title": "T"})).unwrap();
        assert_eq!(update.published_to, Some(None));
        assert!(update.published_at.is_none());
        assert_eq!(update.title.as_deref(), Some("T"));
    }

    #[test]
    fn test_node_document_shape() {
        let node = Node::new("page", "Doc", None)
            .with_slot(SlotKey::new("small", 3), Component::new("quote", json!({})));
        let doc = serde_json::to_value(&node).unwrap();

        assert_eq!(doc["nodeType"], "page");
        assert!(doc["updatableGroups"].is_array());
        assert_eq!(doc["slots"]["small_slot_3"]["componentType"], "quote");

        let back: Node = serde_json::from_value(doc).unwrap();
        assert_eq!(back, node);
    }
}
