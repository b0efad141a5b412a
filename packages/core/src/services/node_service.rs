//! Node Service - Save Pipeline and Tree Operations
//!
//! `NodeService` is the entry point for every node mutation. A save runs one
//! ordered pipeline:
//!
//! 1. validation, all field errors collected before any write
//! 2. slot pruning for the node's current template
//! 3. permission inheritance (creation only)
//! 4. position assignment and path derivation
//! 5. publish/hide request applied to the publish window
//! 6. persistence
//! 7. sibling renumbering when the position changed, plain compaction
//!    otherwise (best effort either way)
//!
//! Publish state is never stored; it is derived on read by
//! [`PublishScheduler`].

use crate::config::CoreConfig;
use crate::db::events::{DomainEvent, HierarchyRelationship};
use crate::db::NodeStore;
use crate::models::{
    Component, Node, NodeQuery, NodeUpdate, Permalink, PublishRequest, SlotKey, SortOrder,
    ValidationError, ValidationErrors,
};
use crate::services::error::NodeServiceError;
use crate::services::permissions::{self, User};
use crate::services::publish_scheduler::{self, PublishScheduler, DEFAULT_PUBLISH_HORIZON_YEARS};
use crate::services::{Clock, SlotComposer, SystemClock, TreeManager};
use crate::templates::TemplateRegistry;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Parameters for creating a node
///
/// Only `node_type` and `title` are required. Everything else is derived by
/// the save pipeline when left unset: a UUID id, the name (from the title),
/// the permalink (parent permalink plus slug), and a position at the end of
/// the sibling set.
///
/// ```rust
/// # use folio_core::services::CreateNodeParams;
/// # use folio_core::models::PublishRequest;
/// let params = CreateNodeParams {
///     node_type: "page".to_string(),
///     title: "About us".to_string(),
///     publish: PublishRequest::publish(),
///     ..Default::default()
/// };
/// # let _ = params;
/// ```
#[derive(Debug, Clone, Default)]
pub struct CreateNodeParams {
    /// Caller-chosen id; a UUID is generated when `None`
    pub id: Option<String>,
    pub node_type: String,
    pub title: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
    pub parent_id: Option<String>,
    /// Explicit position; siblings at or after it move down
    pub position: Option<u32>,
    pub permalink: Option<Permalink>,
    pub published_at: Option<DateTime<Utc>>,
    pub published_to: Option<DateTime<Utc>>,
    pub slots: BTreeMap<SlotKey, Component>,
    /// Consumed by the save, never stored
    pub publish: PublishRequest,
}

impl CreateNodeParams {
    fn into_node(self) -> Node {
        let mut node = match self.id {
            Some(id) => Node::new_with_id(id, self.node_type, self.title, self.parent_id),
            None => Node::new(self.node_type, self.title, self.parent_id),
        };
        node.name = self.name;
        node.description = self.description;
        node.body = self.body;
        node.position = self.position;
        node.permalink = self.permalink.unwrap_or_default();
        node.published_at = self.published_at;
        node.published_to = self.published_to;
        node.slots = self.slots;
        node
    }
}

/// Broadcast channel capacity for domain events.
const DOMAIN_EVENT_CHANNEL_CAPACITY: usize = 128;

fn store_error(e: anyhow::Error) -> NodeServiceError {
    NodeServiceError::query_failed(e.to_string())
}

/// Core service for node mutations and tree queries
///
/// Cheap to clone: every collaborator sits behind an `Arc`.
#[derive(Clone)]
pub struct NodeService {
    store: Arc<dyn NodeStore>,
    registry: Arc<TemplateRegistry>,
    clock: Arc<dyn Clock>,
    tree: TreeManager,
    slots: SlotComposer,
    scheduler: PublishScheduler,
    event_tx: broadcast::Sender<DomainEvent>,
}

impl NodeService {
    /// Service on the wall clock with the default publish horizon
    ///
    /// ```rust
    /// # use folio_core::db::InMemoryNodeStore;
    /// # use folio_core::services::NodeService;
    /// # use folio_core::templates::{TemplateRegistry, TemplateSchema};
    /// # use std::sync::Arc;
    /// let registry = TemplateRegistry::builder()
    ///     .template(TemplateSchema::new("page").root().sub_templates(["page"]))
    ///     .build()
    ///     .unwrap();
    /// let service = NodeService::new(Arc::new(InMemoryNodeStore::new()), Arc::new(registry));
    /// # let _ = service;
    /// ```
    pub fn new(store: Arc<dyn NodeStore>, registry: Arc<TemplateRegistry>) -> Self {
        Self::from_parts(
            store,
            registry,
            Arc::new(SystemClock),
            DEFAULT_PUBLISH_HORIZON_YEARS,
        )
    }

    /// Same as `new` with an injected "now" provider
    pub fn with_clock(
        store: Arc<dyn NodeStore>,
        registry: Arc<TemplateRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::from_parts(store, registry, clock, DEFAULT_PUBLISH_HORIZON_YEARS)
    }

    pub fn from_parts(
        store: Arc<dyn NodeStore>,
        registry: Arc<TemplateRegistry>,
        clock: Arc<dyn Clock>,
        publish_horizon_years: u32,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(DOMAIN_EVENT_CHANNEL_CAPACITY);
        Self {
            tree: TreeManager::new(store.clone(), registry.clone()),
            slots: SlotComposer::new(registry.clone()),
            scheduler: PublishScheduler::new(clock.clone(), publish_horizon_years),
            store,
            registry,
            clock,
            event_tx,
        }
    }

    /// Build the registry from startup configuration
    pub fn from_config(
        store: Arc<dyn NodeStore>,
        config: CoreConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NodeServiceError> {
        let horizon = config.publish_horizon_years;
        let registry = TemplateRegistry::from_config(config.registry)?;
        Ok(Self::from_parts(store, Arc::new(registry), clock, horizon))
    }

    pub fn store(&self) -> &Arc<dyn NodeStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<TemplateRegistry> {
        &self.registry
    }

    pub fn tree(&self) -> &TreeManager {
        &self.tree
    }

    pub fn slot_composer(&self) -> &SlotComposer {
        &self.slots
    }

    pub fn scheduler(&self) -> &PublishScheduler {
        &self.scheduler
    }

    /// Subscribe to domain events emitted after successful writes
    pub fn subscribe_to_events(&self) -> broadcast::Receiver<DomainEvent> {
        self.event_tx.subscribe()
    }

    /// Ignores send errors: having no subscribers is normal.
    fn emit_event(&self, event: DomainEvent) {
        let _ = self.event_tx.send(event);
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub async fn get_node(&self, id: &str) -> Result<Option<Node>, NodeServiceError> {
        self.store.get_node(id).await.map_err(store_error)
    }

    /// Like `get_node`, but a missing node is an error
    pub async fn require_node(&self, id: &str) -> Result<Node, NodeServiceError> {
        self.get_node(id)
            .await?
            .ok_or_else(|| NodeServiceError::node_not_found(id))
    }

    /// The live node at `permalink`.
    ///
    /// Nodes not yet started and expired nodes are reported exactly like
    /// missing ones.
    pub async fn find_by_permalink(&self, permalink: &Permalink) -> Result<Node, NodeServiceError> {
        let now = self.clock.now();
        let query = NodeQuery::new()
            .permalink(permalink.clone())
            .published_at_lte(now);
        match self
            .store
            .find_one(&query, SortOrder::PositionAsc)
            .await
            .map_err(store_error)?
        {
            Some(node) if !publish_scheduler::is_expired(&node, now) => Ok(node),
            _ => Err(NodeServiceError::permalink_not_found(permalink.to_string())),
        }
    }

    /// Every node published right now
    pub async fn published_nodes(&self) -> Result<Vec<Node>, NodeServiceError> {
        let query = self.scheduler.published_query(self.clock.now());
        self.store
            .find_nodes(&query, SortOrder::PositionAsc)
            .await
            .map_err(store_error)
    }

    pub async fn children(&self, id: &str) -> Result<Vec<Node>, NodeServiceError> {
        let node = self.require_node(id).await?;
        self.tree.children(&node).await
    }

    /// Children published right now, in listing order
    pub async fn published_children(&self, id: &str) -> Result<Vec<Node>, NodeServiceError> {
        let now = self.clock.now();
        Ok(self
            .children(id)
            .await?
            .into_iter()
            .filter(|child| publish_scheduler::is_published(child, now))
            .collect())
    }

    pub async fn siblings(&self, id: &str) -> Result<Vec<Node>, NodeServiceError> {
        let node = self.require_node(id).await?;
        self.tree.siblings(&node).await
    }

    pub async fn roots(&self) -> Result<Vec<Node>, NodeServiceError> {
        self.tree.roots().await
    }

    pub async fn ancestors(&self, id: &str) -> Result<Vec<Node>, NodeServiceError> {
        let node = self.require_node(id).await?;
        self.tree.ancestors(&node).await
    }

    /// Rendering view of a node's populated slots
    pub fn slots<'a>(&self, node: &'a Node) -> Vec<&'a Component> {
        self.slots.slots(node)
    }

    /// Whether `user` may create a node under `parent_id` (anyone at the root)
    pub async fn creatable_by(
        &self,
        parent_id: Option<&str>,
        user: &User,
    ) -> Result<bool, NodeServiceError> {
        let parent = match parent_id {
            Some(id) => Some(self.require_node(id).await?),
            None => None,
        };
        Ok(permissions::creatable_by(parent.as_ref(), user))
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Create and save a new node
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` with every field error when the node is invalid,
    ///   including a `parent_id` that does not resolve
    /// - `QueryFailed` when persistence fails
    pub async fn create_node(&self, params: CreateNodeParams) -> Result<Node, NodeServiceError> {
        let request = params.publish;
        let node = params.into_node();
        if self.get_node(&node.id).await?.is_some() {
            return Err(ValidationError::IdTaken(node.id).into());
        }
        self.save(node, None, request).await
    }

    /// `create_node` on behalf of `user`, who needs update rights on the parent
    pub async fn create_node_as(
        &self,
        params: CreateNodeParams,
        user: &User,
    ) -> Result<Node, NodeServiceError> {
        if !self.creatable_by(params.parent_id.as_deref(), user).await? {
            return Err(NodeServiceError::permission_denied(format!(
                "User may not create nodes under {}",
                params.parent_id.as_deref().unwrap_or("the root")
            )));
        }
        self.create_node(params).await
    }

    /// Apply a partial update and run the save pipeline
    ///
    /// An explicit `position` in the update moves the node within its
    /// sibling set; the other siblings are renumbered around it.
    pub async fn update_node(
        &self,
        id: &str,
        update: NodeUpdate,
        request: PublishRequest,
    ) -> Result<Node, NodeServiceError> {
        let existing = self.require_node(id).await?;
        let mut node = existing.clone();
        update.apply_to(&mut node);
        self.save(node, Some(existing), request).await
    }

    /// Change a node's template.
    ///
    /// Rejected without any write when an existing child's template is not
    /// allowed under the new one. Slots beyond the new layout are dropped.
    pub async fn retype_node(&self, id: &str, node_type: &str) -> Result<Node, NodeServiceError> {
        let node = self
            .update_node(
                id,
                NodeUpdate::new().with_node_type(node_type),
                PublishRequest::none(),
            )
            .await?;
        tracing::info!("Retyped node {} to '{}'", id, node_type);
        Ok(node)
    }

    /// Swap with the next sibling down. `false` when already last.
    pub async fn move_lower(&self, id: &str) -> Result<bool, NodeServiceError> {
        let node = self.require_node(id).await?;
        let moved = self.tree.move_lower(&node).await?;
        if moved {
            self.emit_moved(id).await?;
        }
        Ok(moved)
    }

    /// Swap with the next sibling up. `false` when already first.
    pub async fn move_higher(&self, id: &str) -> Result<bool, NodeServiceError> {
        let node = self.require_node(id).await?;
        let moved = self.tree.move_higher(&node).await?;
        if moved {
            self.emit_moved(id).await?;
        }
        Ok(moved)
    }

    /// Move a node under `new_parent_id`, or to the root when `None`.
    ///
    /// The node is appended to its new sibling set, the old set is
    /// compacted and every descendant's cached path is refreshed.
    ///
    /// # Errors
    ///
    /// - `InvalidParent` if the new parent doesn't exist
    /// - `CircularReference` if the new parent is the node or one of its
    ///   descendants
    pub async fn reparent(
        &self,
        id: &str,
        new_parent_id: Option<&str>,
    ) -> Result<Node, NodeServiceError> {
        let existing = self.require_node(id).await?;
        if existing.parent_id.as_deref() == new_parent_id {
            return Ok(existing);
        }

        if let Some(parent_id) = new_parent_id {
            if parent_id == id || self.tree.is_descendant(id, parent_id).await? {
                return Err(NodeServiceError::circular_reference(format!(
                    "Cannot move node {} under its descendant {}",
                    id, parent_id
                )));
            }
            if self.get_node(parent_id).await?.is_none() {
                return Err(NodeServiceError::invalid_parent(parent_id));
            }
        }

        let mut node = existing.clone();
        node.parent_id = new_parent_id.map(str::to_string);
        node.position = None;
        let saved = self.save(node, Some(existing), PublishRequest::none()).await?;
        tracing::info!("Moved node {} under {:?}", id, new_parent_id);
        Ok(saved)
    }

    async fn emit_moved(&self, id: &str) -> Result<(), NodeServiceError> {
        let node = self.require_node(id).await?;
        if let Some(position) = node.position {
            self.emit_event(DomainEvent::NodeMoved(HierarchyRelationship {
                parent_id: node.parent_id.clone(),
                child_id: node.id.clone(),
                position,
            }));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Save pipeline
    // ------------------------------------------------------------------

    /// The node's parent, `None` for roots and for unresolved references
    async fn load_parent(&self, node: &Node) -> Result<Option<Node>, NodeServiceError> {
        match node.parent_id.as_deref() {
            Some(parent_id) => self.get_node(parent_id).await,
            None => Ok(None),
        }
    }

    /// Collect every field error for `node` without writing anything
    async fn validate(
        &self,
        node: &Node,
        parent: Option<&Node>,
        existing: Option<&Node>,
    ) -> Result<ValidationErrors, NodeServiceError> {
        let mut errors = ValidationErrors::new();
        errors.extend(node.validate_required());

        if let (Some(parent_id), None) = (node.parent_id.as_deref(), parent) {
            if parent_id != node.id {
                errors.push(ValidationError::InvalidParent(parent_id.to_string()));
            }
        }

        let known_template = self.registry.contains(&node.node_type);
        if !node.node_type.trim().is_empty() && !known_template {
            errors.push(ValidationError::UnknownTemplate(node.node_type.clone()));
        }

        if node.permalink.is_blank() {
            errors.push(ValidationError::MissingField("permalink".to_string()));
        } else {
            let query = NodeQuery::new()
                .permalink(node.permalink.clone())
                .exclude_id(node.id.clone());
            if self.store.count_nodes(&query).await.map_err(store_error)? > 0 {
                errors.push(ValidationError::PermalinkTaken(node.permalink.to_string()));
            }
        }

        // Existing children must still be allowed under the (possibly new) template
        if existing.is_some() && known_template {
            let children = self.tree.children(node).await?;
            let rejected: BTreeSet<&str> = children
                .iter()
                .map(|child| child.node_type.as_str())
                .filter(|child_type| !self.registry.permits_child(&node.node_type, child_type))
                .collect();
            errors.extend(rejected.into_iter().map(|child_type| {
                ValidationError::TemplateRejectsChildren {
                    template: node.node_type.clone(),
                    child_type: child_type.to_string(),
                }
            }));
        }

        errors.extend(self.slots.validate(node));
        Ok(errors)
    }

    async fn save(
        &self,
        mut node: Node,
        existing: Option<Node>,
        request: PublishRequest,
    ) -> Result<Node, NodeServiceError> {
        let now = self.clock.now();
        let parent = self.load_parent(&node).await?;

        if node.name.as_deref().map_or(true, |name| name.trim().is_empty()) {
            node.name = Some(node.title.clone());
        }
        if node.permalink.is_blank() {
            let base = parent
                .as_ref()
                .map(|p| p.permalink.clone())
                .unwrap_or_default();
            node.permalink = base.child(node.display_name());
        }

        let errors = self
            .validate(&node, parent.as_ref(), existing.as_ref())
            .await?;
        if !errors.is_empty() {
            tracing::debug!("Rejected save of node {}: {}", node.id, errors);
        }
        errors.into_result()?;

        self.slots.prune(&mut node);
        if existing.is_none() {
            permissions::inherit_permissions(&mut node, parent.as_ref());
        }
        self.tree.assign_position(&mut node).await?;
        self.tree.set_path(&mut node, parent.as_ref());
        self.scheduler.apply_request(&mut node, request, now);

        node.updated_at = now;
        match &existing {
            Some(existing) => node.created_at = existing.created_at,
            None => node.created_at = now,
        }

        let parent_changed = existing
            .as_ref()
            .is_some_and(|e| e.parent_id != node.parent_id);
        let position_changed = existing
            .as_ref()
            .map_or(true, |e| parent_changed || e.position != node.position);

        // An unmoved node keeps whatever position the store holds now, so a
        // swap that landed after `existing` was read is not undone
        let saved = if position_changed {
            self.store.save_node(node).await
        } else {
            self.store.save_node_content(node).await
        }
        .map_err(store_error)?;

        // Any write to a set re-runs compaction, repairing earlier partial failures
        let rewritten = if position_changed {
            self.tree.renumber_best_effort(&saved).await
        } else {
            self.tree
                .compact_best_effort(saved.parent_id.as_deref())
                .await
        };
        if rewritten > 0 {
            self.emit_event(DomainEvent::SiblingsReordered {
                parent_id: saved.parent_id.clone(),
                rewritten,
            });
        }

        if let Some(existing) = existing.as_ref().filter(|_| parent_changed) {
            let rewritten = self
                .tree
                .compact_best_effort(existing.parent_id.as_deref())
                .await;
            if rewritten > 0 {
                self.emit_event(DomainEvent::SiblingsReordered {
                    parent_id: existing.parent_id.clone(),
                    rewritten,
                });
            }
            if let Err(e) = self.tree.refresh_descendant_paths(&saved).await {
                tracing::warn!("Refreshing descendant paths of {} failed: {}", saved.id, e);
            }
        }

        // Renumbering may have shifted the node itself
        let saved = match self.get_node(&saved.id).await {
            Ok(Some(current)) => current,
            _ => saved,
        };

        if position_changed {
            if let Some(position) = saved.position {
                self.emit_event(DomainEvent::NodeMoved(HierarchyRelationship {
                    parent_id: saved.parent_id.clone(),
                    child_id: saved.id.clone(),
                    position,
                }));
            }
        }
        match existing {
            None => {
                tracing::info!("Created node {} ({})", saved.id, saved.node_type);
                self.emit_event(DomainEvent::NodeCreated(saved.clone()));
            }
            Some(_) => self.emit_event(DomainEvent::NodeUpdated(saved.clone())),
        }
        Ok(saved)
    }
}

// Comprehensive tests in separate modules
#[cfg(test)]
#[path = "node_service_tree_test.rs"]
mod node_service_tree_test;

#[cfg(test)]
#[path = "node_service_publish_test.rs"]
mod node_service_publish_test;

#[cfg(test)]
#[path = "node_service_slots_test.rs"]
mod node_service_slots_test;
