//! Slot Composer
//!
//! Fixed-cardinality slot layout per template. Two separate checks run on
//! every save:
//!
//! - **prune** clears slots at an index the node's current template no
//!   longer has (index-overflow, including slots of undeclared groups)
//! - **validate** rejects in-range slots whose component type is not in the
//!   template's allow-list for the group, falling back to the group's own
//!   list (type-mismatch)
//!
//! Both look at the node's *current* template, never the one it had when a
//! slot was first filled.

use crate::models::{Component, Node, SlotKey, ValidationError};
use crate::templates::TemplateRegistry;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SlotComposer {
    registry: Arc<TemplateRegistry>,
}

impl SlotComposer {
    pub fn new(registry: Arc<TemplateRegistry>) -> Self {
        Self { registry }
    }

    /// Populated slot values in group-declaration order, then index order.
    ///
    /// Only indices inside the node's current layout are visible.
    pub fn slots<'a>(&self, node: &'a Node) -> Vec<&'a Component> {
        self.registry
            .slot_groups()
            .iter()
            .flat_map(|group| {
                let count = self.registry.slot_count(&node.node_type, &group.name);
                (0..count).filter_map(move |index| node.slot(&SlotKey::new(group.name.clone(), index)))
            })
            .collect()
    }

    /// Populated slots of one group in index order, paired with their keys
    pub fn group_slots<'a>(&self, node: &'a Node, group: &str) -> Vec<(&'a SlotKey, &'a Component)> {
        let count = self.registry.slot_count(&node.node_type, group);
        node.slots
            .iter()
            .filter(|(key, _)| key.group == group && key.index < count)
            .collect()
    }

    /// Field-level errors for every in-range slot holding a disallowed type.
    ///
    /// The allow-list is the node's current template override for the
    /// group, else the group's own list, so a retype can reject a slot that
    /// was valid under the previous template.
    pub fn validate(&self, node: &Node) -> Vec<ValidationError> {
        node.slots
            .iter()
            .filter(|(key, _)| key.index < self.registry.slot_count(&node.node_type, &key.group))
            .filter(|(key, component)| {
                !self.registry.allows_component(
                    &node.node_type,
                    &key.group,
                    &component.component_type,
                )
            })
            .map(|(key, component)| ValidationError::SlotNotAllowed {
                slot: key.clone(),
                component_type: component.component_type.clone(),
            })
            .collect()
    }

    /// Clear every slot at or beyond its group's configured count.
    ///
    /// Returns the removed keys.
    pub fn prune(&self, node: &mut Node) -> Vec<SlotKey> {
        let stale: Vec<SlotKey> = node
            .slots
            .keys()
            .filter(|key| key.index >= self.registry.slot_count(&node.node_type, &key.group))
            .cloned()
            .collect();

        for key in &stale {
            node.slots.remove(key);
        }
        if !stale.is_empty() {
            tracing::debug!(
                "Pruned {} stale slot(s) from node {} ({}): {:?}",
                stale.len(),
                node.id,
                node.node_type,
                stale.iter().map(ToString::to_string).collect::<Vec<_>>()
            );
        }
        stale
    }
}
