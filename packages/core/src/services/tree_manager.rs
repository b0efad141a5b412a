//! Tree Manager
//!
//! Parent/child linkage, sibling enumeration and position bookkeeping over
//! the storage collaborator.
//!
//! # Renumbering
//!
//! Positions are kept dense and zero-based per sibling set without any
//! external list structure. After a node lands on position `p`:
//!
//! 1. every *other* sibling at `p` or later is bumped by one in a single
//!    filtered multi-update, opening a gap for the node
//! 2. the whole set is re-read in position order
//! 3. every entry whose stored position differs from its index is rewritten
//!
//! Step 3 alone repairs gaps and duplicates left by interrupted or
//! concurrent writers, so re-running the pass on a disordered set always
//! converges to `0..count`.

use crate::db::{DatabaseError, NodeStore};
use crate::models::{Node, NodeQuery, ParentFilter, SortOrder};
use crate::services::NodeServiceError;
use crate::templates::TemplateRegistry;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

fn store_error(e: anyhow::Error) -> NodeServiceError {
    NodeServiceError::query_failed(e.to_string())
}

/// Set size or index as a stored position
fn to_position(value: usize, id: &str) -> Result<u32, NodeServiceError> {
    u32::try_from(value)
        .map_err(|_| NodeServiceError::query_failed(DatabaseError::position_overflow(id).to_string()))
}

/// Query for the sibling set `node` belongs to, without `node` itself
fn sibling_query(node: &Node) -> NodeQuery {
    NodeQuery::new()
        .parent(ParentFilter::of(node.parent_id.as_deref()))
        .exclude_id(node.id.clone())
}

/// Which neighbour a swap targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Next-greater position
    Lower,
    /// Next-lesser position
    Higher,
}

#[derive(Clone)]
pub struct TreeManager {
    store: Arc<dyn NodeStore>,
    registry: Arc<TemplateRegistry>,
}

impl TreeManager {
    pub fn new(store: Arc<dyn NodeStore>, registry: Arc<TemplateRegistry>) -> Self {
        Self { store, registry }
    }

    /// Listing order configured on the node's template
    pub fn sibling_order(&self, node: &Node) -> SortOrder {
        self.registry.sibling_order(&node.node_type)
    }

    /// Nodes sharing `node`'s parent, excluding `node`
    pub async fn siblings(&self, node: &Node) -> Result<Vec<Node>, NodeServiceError> {
        self.store
            .find_nodes(&sibling_query(node), self.sibling_order(node))
            .await
            .map_err(store_error)
    }

    /// The sibling set including `node` as currently stored
    pub async fn self_and_siblings(&self, node: &Node) -> Result<Vec<Node>, NodeServiceError> {
        let query = NodeQuery::new().parent(ParentFilter::of(node.parent_id.as_deref()));
        self.store
            .find_nodes(&query, self.sibling_order(node))
            .await
            .map_err(store_error)
    }

    pub async fn children(&self, node: &Node) -> Result<Vec<Node>, NodeServiceError> {
        let query = NodeQuery::new().parent(ParentFilter::Child(node.id.clone()));
        self.store
            .find_nodes(&query, self.sibling_order(node))
            .await
            .map_err(store_error)
    }

    /// Top-level nodes in position order
    pub async fn roots(&self) -> Result<Vec<Node>, NodeServiceError> {
        self.store
            .find_nodes(
                &NodeQuery::new().parent(ParentFilter::Root),
                SortOrder::PositionAsc,
            )
            .await
            .map_err(store_error)
    }

    /// Ancestors resolved from the cached path, root first.
    ///
    /// Ids that no longer resolve are skipped.
    pub async fn ancestors(&self, node: &Node) -> Result<Vec<Node>, NodeServiceError> {
        let mut ancestors = Vec::with_capacity(node.path.len());
        for id in &node.path {
            match self.store.get_node(id).await.map_err(store_error)? {
                Some(ancestor) => ancestors.push(ancestor),
                None => tracing::debug!("Ancestor {} of node {} no longer exists", id, node.id),
            }
        }
        Ok(ancestors)
    }

    pub fn is_first(&self, node: &Node) -> bool {
        node.position == Some(0)
    }

    /// Whether `node` occupies the final position of its set
    pub async fn is_last(&self, node: &Node) -> Result<bool, NodeServiceError> {
        let Some(position) = node.position else {
            return Ok(false);
        };
        let others = self
            .store
            .count_nodes(&sibling_query(node))
            .await
            .map_err(store_error)?;
        Ok(position as usize == others)
    }

    /// Swap with the sibling at the next-greater position.
    ///
    /// Returns `false` without touching the store when there is none.
    pub async fn move_lower(&self, node: &Node) -> Result<bool, NodeServiceError> {
        self.swap(node, Direction::Lower).await
    }

    /// Swap with the sibling at the next-lesser position.
    ///
    /// Returns `false` without touching the store when there is none.
    pub async fn move_higher(&self, node: &Node) -> Result<bool, NodeServiceError> {
        self.swap(node, Direction::Higher).await
    }

    async fn swap(&self, node: &Node, direction: Direction) -> Result<bool, NodeServiceError> {
        let Some(position) = node.position else {
            return Ok(false);
        };
        let (query, order) = match direction {
            Direction::Lower => (sibling_query(node).position_gt(position), SortOrder::PositionAsc),
            Direction::Higher => (
                sibling_query(node).position_lt(position),
                SortOrder::PositionDesc,
            ),
        };
        let Some(mut neighbour) = self.store.find_one(&query, order).await.map_err(store_error)?
        else {
            return Ok(false);
        };
        let Some(neighbour_position) = neighbour.position else {
            return Ok(false);
        };

        self.store
            .set_positions(&[
                (node.id.clone(), neighbour_position),
                (neighbour.id.clone(), position),
            ])
            .await
            .map_err(store_error)?;

        tracing::info!(
            "Swapped node {} ({} -> {}) with {}",
            node.id,
            position,
            neighbour_position,
            neighbour.id
        );

        let mut moved = node.clone();
        moved.position = Some(neighbour_position);
        neighbour.position = Some(position);
        self.renumber_best_effort(&moved).await;
        self.renumber_best_effort(&neighbour).await;
        Ok(true)
    }

    /// Append at the end of the sibling set when no position is set
    pub async fn assign_position(&self, node: &mut Node) -> Result<(), NodeServiceError> {
        if node.position.is_none() {
            let others = self
                .store
                .count_nodes(&sibling_query(node))
                .await
                .map_err(store_error)?;
            node.position = Some(to_position(others, &node.id)?);
        }
        Ok(())
    }

    /// `parent.path + [parent.id]`, or empty for roots
    pub fn set_path(&self, node: &mut Node, parent: Option<&Node>) {
        node.path = match parent {
            Some(parent) => {
                let mut path = parent.path.clone();
                path.push(parent.id.clone());
                path
            }
            None => Vec::new(),
        };
    }

    /// Open a gap at the node's position, then compact its sibling set.
    ///
    /// Returns the number of positions rewritten by compaction.
    pub async fn renumber(&self, node: &Node) -> Result<usize, NodeServiceError> {
        let Some(position) = node.position else {
            return Ok(0);
        };
        self.store
            .increment_positions(&sibling_query(node).position_gte(position), 1)
            .await
            .map_err(store_error)?;
        self.compact(node.parent_id.as_deref()).await
    }

    /// Rewrite every position in the set that differs from its index
    pub async fn compact(&self, parent_id: Option<&str>) -> Result<usize, NodeServiceError> {
        let set = self
            .store
            .find_nodes(
                &NodeQuery::new().parent(ParentFilter::of(parent_id)),
                SortOrder::PositionAsc,
            )
            .await
            .map_err(store_error)?;

        let mut rewritten = 0;
        for (index, sibling) in set.iter().enumerate() {
            let index = to_position(index, &sibling.id)?;
            if sibling.position != Some(index) {
                self.store
                    .update_position(&sibling.id, index)
                    .await
                    .map_err(store_error)?;
                rewritten += 1;
            }
        }

        if rewritten > 0 {
            tracing::debug!(
                "Compacted sibling set under {:?}: rewrote {} of {} positions",
                parent_id,
                rewritten,
                set.len()
            );
        }
        Ok(rewritten)
    }

    /// `renumber`, logging instead of failing. The next write to the same
    /// set re-runs compaction.
    pub async fn renumber_best_effort(&self, node: &Node) -> usize {
        match self.renumber(node).await {
            Ok(rewritten) => rewritten,
            Err(e) => {
                tracing::warn!("Renumbering siblings of node {} failed: {}", node.id, e);
                0
            }
        }
    }

    /// `compact`, logging instead of failing
    pub async fn compact_best_effort(&self, parent_id: Option<&str>) -> usize {
        match self.compact(parent_id).await {
            Ok(rewritten) => rewritten,
            Err(e) => {
                tracing::warn!("Compacting sibling set under {:?} failed: {}", parent_id, e);
                0
            }
        }
    }

    /// Whether `candidate_id` sits somewhere below `ancestor_id`.
    ///
    /// Walks parent links rather than trusting cached paths.
    pub async fn is_descendant(
        &self,
        ancestor_id: &str,
        candidate_id: &str,
    ) -> Result<bool, NodeServiceError> {
        let mut visited = HashSet::new();
        let mut current = candidate_id.to_string();
        while visited.insert(current.clone()) {
            let Some(node) = self.store.get_node(&current).await.map_err(store_error)? else {
                return Ok(false);
            };
            match node.parent_id {
                Some(parent_id) if parent_id == ancestor_id => return Ok(true),
                Some(parent_id) => current = parent_id,
                None => return Ok(false),
            }
        }
        Err(NodeServiceError::circular_reference(format!(
            "Parent chain of {} loops back on itself",
            candidate_id
        )))
    }

    /// Recompute cached paths below `node` after it moved.
    ///
    /// Returns the number of descendants whose path changed.
    pub async fn refresh_descendant_paths(&self, node: &Node) -> Result<usize, NodeServiceError> {
        let mut refreshed = 0;
        let mut pending = VecDeque::from([node.clone()]);
        while let Some(parent) = pending.pop_front() {
            let query = NodeQuery::new().parent(ParentFilter::Child(parent.id.clone()));
            let children = self
                .store
                .find_nodes(&query, SortOrder::PositionAsc)
                .await
                .map_err(store_error)?;
            for mut child in children {
                let previous = std::mem::take(&mut child.path);
                self.set_path(&mut child, Some(&parent));
                if child.path != previous {
                    self.store
                        .update_path(&child.id, child.path.clone())
                        .await
                        .map_err(store_error)?;
                    refreshed += 1;
                }
                pending.push_back(child);
            }
        }
        Ok(refreshed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryNodeStore;
    use crate::templates::TemplateSchema;

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_position_conversion_rejects_overflow() {
        assert_eq!(to_position(7, "n").unwrap(), 7);
        assert_eq!(to_position(u32::MAX as usize, "n").unwrap(), u32::MAX);

        let err = to_position(u32::MAX as usize + 1, "node-9").unwrap_err();
        assert!(matches!(err, NodeServiceError::QueryFailed(_)));
        assert!(err.to_string().contains("Position overflow on document node-9"));
    }

    fn registry() -> Arc<TemplateRegistry> {
        Arc::new(
            TemplateRegistry::builder()
                .template(TemplateSchema::new("page").root().sub_templates(["page"]))
                .build()
                .unwrap(),
        )
    }

    fn child(id: &str, position: Option<u32>) -> Node {
        let mut node = Node::new_with_id(id, "page", id, Some("p".to_string()));
        node.position = position;
        node
    }

    async fn manager(nodes: Vec<Node>) -> (TreeManager, Arc<InMemoryNodeStore>) {
        let store = Arc::new(InMemoryNodeStore::with_nodes(nodes).await);
        (TreeManager::new(store.clone(), registry()), store)
    }

    async fn order(store: &InMemoryNodeStore) -> Vec<(String, u32)> {
        store
            .find_nodes(
                &NodeQuery::new().parent(ParentFilter::Child("p".to_string())),
                SortOrder::PositionAsc,
            )
            .await
            .unwrap()
            .into_iter()
            .map(|n| (n.id, n.position.unwrap()))
            .collect()
    }

    #[tokio::test]
    async fn test_compact_repairs_gaps_and_duplicates() {
        let (tree, store) = manager(vec![
            child("a", Some(0)),
            child("b", Some(3)),
            child("c", Some(3)),
            child("d", None),
        ])
        .await;

        let rewritten = tree.compact(Some("p")).await.unwrap();
        assert_eq!(rewritten, 3);
        assert_eq!(
            order(&store).await,
            vec![
                ("a".to_string(), 0),
                ("b".to_string(), 1),
                ("c".to_string(), 2),
                ("d".to_string(), 3)
            ]
        );
        assert_eq!(tree.compact(Some("p")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_renumber_inserts_at_position() {
        let (tree, store) = manager(vec![
            child("a", Some(0)),
            child("b", Some(1)),
            child("c", Some(2)),
        ])
        .await;
        let inserted = child("x", Some(1));
        store.save_node(inserted.clone()).await.unwrap();

        tree.renumber(&inserted).await.unwrap();
        let ids: Vec<String> = order(&store).await.into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["a", "x", "b", "c"]);
    }

    #[tokio::test]
    async fn test_move_without_neighbour_is_noop() {
        let (tree, store) = manager(vec![child("a", Some(0)), child("b", Some(1))]).await;
        let writes = store.write_count();

        assert!(!tree.move_higher(&child("a", Some(0))).await.unwrap());
        assert!(!tree.move_lower(&child("b", Some(1))).await.unwrap());
        assert_eq!(store.write_count(), writes);
    }

    #[tokio::test]
    async fn test_first_and_last() {
        let (tree, _store) = manager(vec![child("a", Some(0)), child("b", Some(1))]).await;
        assert!(tree.is_first(&child("a", Some(0))));
        assert!(!tree.is_last(&child("a", Some(0))).await.unwrap());
        assert!(tree.is_last(&child("b", Some(1))).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_path_extends_parent() {
        let (tree, _store) = manager(vec![]).await;
        let mut parent = Node::new_with_id("p", "page", "P", Some("root".to_string()));
        parent.path = vec!["root".to_string()];
        let mut node = child("a", None);

        tree.set_path(&mut node, Some(&parent));
        assert_eq!(node.path, vec!["root", "p"]);
        tree.set_path(&mut node, None);
        assert!(node.path.is_empty());
    }

    #[tokio::test]
    async fn test_is_descendant_walks_parents() {
        let root = Node::new_with_id("r", "page", "R", None);
        let mid = Node::new_with_id("m", "page", "M", Some("r".to_string()));
        let leaf = Node::new_with_id("l", "page", "L", Some("m".to_string()));
        let (tree, _store) = manager(vec![root, mid, leaf]).await;

        assert!(tree.is_descendant("r", "l").await.unwrap());
        assert!(!tree.is_descendant("l", "r").await.unwrap());
    }
}
