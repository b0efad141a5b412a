//! In-Memory Node Store
//!
//! A `NodeStore` backed by a `HashMap` behind a tokio `RwLock`. Every trait
//! method takes the lock once, so each call (including `set_positions` and
//! `increment_positions`) is atomic with respect to readers.
//!
//! The store can be told to start rejecting writes after a number of
//! successful ones, which is how tests simulate a save interrupted halfway
//! through renumbering.

use crate::db::{DatabaseError, DeleteResult, NodeStore};
use crate::models::{Node, NodeQuery, SortOrder};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Sentinel for "no failure injected"
const UNLIMITED: usize = usize::MAX;

/// Thread-safe in-memory document store
#[derive(Debug)]
pub struct InMemoryNodeStore {
    nodes: RwLock<HashMap<String, Node>>,
    /// Remaining writes before injected failures start
    write_budget: AtomicUsize,
    /// Budget the current injection started from, for error messages
    write_limit: AtomicUsize,
    /// Successful writes since creation
    writes: AtomicUsize,
}

impl Default for InMemoryNodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryNodeStore {
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
            write_budget: AtomicUsize::new(UNLIMITED),
            write_limit: AtomicUsize::new(UNLIMITED),
            writes: AtomicUsize::new(0),
        }
    }

    /// Seed the store without going through the save pipeline
    pub async fn with_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let store = Self::new();
        {
            let mut map = store.nodes.write().await;
            for node in nodes {
                map.insert(node.id.clone(), node);
            }
        }
        store
    }

    /// Allow `limit` more successful writes, then fail every write
    pub fn fail_writes_after(&self, limit: usize) {
        self.write_limit.store(limit, Ordering::SeqCst);
        self.write_budget.store(limit, Ordering::SeqCst);
    }

    /// Stop injecting failures
    pub fn clear_write_failures(&self) {
        self.write_limit.store(UNLIMITED, Ordering::SeqCst);
        self.write_budget.store(UNLIMITED, Ordering::SeqCst);
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.nodes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.nodes.read().await.is_empty()
    }

    /// Consume one unit of write budget, or fail if it is exhausted
    fn take_write(&self) -> Result<()> {
        let taken = self
            .write_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |budget| match budget {
                UNLIMITED => Some(UNLIMITED),
                0 => None,
                n => Some(n - 1),
            });
        match taken {
            Ok(_) => {
                self.writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            Err(_) => {
                let limit = self.write_limit.load(Ordering::SeqCst);
                tracing::debug!("Injected write failure after {} writes", limit);
                Err(DatabaseError::injected_failure(limit).into())
            }
        }
    }
}

#[async_trait]
impl NodeStore for InMemoryNodeStore {
    async fn save_node(&self, node: Node) -> Result<Node> {
        let mut nodes = self.nodes.write().await;
        self.take_write()?;
        nodes.insert(node.id.clone(), node.clone());
        Ok(node)
    }

    async fn save_node_content(&self, mut node: Node) -> Result<Node> {
        let mut nodes = self.nodes.write().await;
        if let Some(stored) = nodes.get(&node.id) {
            node.position = stored.position;
        }
        self.take_write()?;
        nodes.insert(node.id.clone(), node.clone());
        Ok(node)
    }

    async fn get_node(&self, id: &str) -> Result<Option<Node>> {
        Ok(self.nodes.read().await.get(id).cloned())
    }

    async fn find_nodes(&self, query: &NodeQuery, order: SortOrder) -> Result<Vec<Node>> {
        let nodes = self.nodes.read().await;
        let mut found: Vec<Node> = nodes.values().filter(|n| query.matches(n)).cloned().collect();
        found.sort_by(|a, b| order.compare(a, b));
        Ok(found)
    }

    async fn count_nodes(&self, query: &NodeQuery) -> Result<usize> {
        Ok(self
            .nodes
            .read()
            .await
            .values()
            .filter(|n| query.matches(n))
            .count())
    }

    async fn update_position(&self, id: &str, position: u32) -> Result<()> {
        let mut nodes = self.nodes.write().await;
        let node = nodes
            .get_mut(id)
            .ok_or_else(|| DatabaseError::document_not_found(id))?;
        self.take_write()?;
        node.position = Some(position);
        Ok(())
    }

    async fn set_positions(&self, positions: &[(String, u32)]) -> Result<()> {
        let mut nodes = self.nodes.write().await;
        if let Some((missing, _)) = positions.iter().find(|(id, _)| !nodes.contains_key(id)) {
            return Err(DatabaseError::document_not_found(missing.clone()).into());
        }
        self.take_write()?;
        for (id, position) in positions {
            if let Some(node) = nodes.get_mut(id) {
                node.position = Some(*position);
            }
        }
        Ok(())
    }

    async fn increment_positions(&self, query: &NodeQuery, by: u32) -> Result<u64> {
        let mut nodes = self.nodes.write().await;
        let matching: Vec<String> = nodes
            .values()
            .filter(|n| query.matches(n))
            .map(|n| n.id.clone())
            .collect();
        if matching.is_empty() {
            return Ok(0);
        }

        // Check every increment before applying any of them
        for id in &matching {
            let current = nodes.get(id).and_then(|n| n.position).unwrap_or(0);
            if current.checked_add(by).is_none() {
                return Err(DatabaseError::position_overflow(id.clone()).into());
            }
        }

        self.take_write()?;
        for id in &matching {
            if let Some(node) = nodes.get_mut(id) {
                node.position = node.position.map(|p| p + by);
            }
        }
        Ok(matching.len() as u64)
    }

    async fn update_path(&self, id: &str, path: Vec<String>) -> Result<()> {
        let mut nodes = self.nodes.write().await;
        let node = nodes
            .get_mut(id)
            .ok_or_else(|| DatabaseError::document_not_found(id))?;
        self.take_write()?;
        node.path = path;
        Ok(())
    }

    async fn delete_node(&self, id: &str) -> Result<DeleteResult> {
        let mut nodes = self.nodes.write().await;
        self.take_write()?;
        Ok(match nodes.remove(id) {
            Some(_) => DeleteResult::existed(),
            None => DeleteResult::not_found(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ParentFilter;

    fn child(id: &str, parent: &str, position: u32) -> Node {
        Node::new_with_id(id, "page", id, Some(parent.to_string())).with_position(position)
    }

    #[tokio::test]
    async fn test_find_orders_by_position() {
        let store =
            InMemoryNodeStore::with_nodes([child("c", "p", 2), child("a", "p", 0), child("b", "p", 1)])
                .await;

        let found = store
            .find_nodes(
                &NodeQuery::new().parent(ParentFilter::Child("p".to_string())),
                SortOrder::PositionDesc,
            )
            .await
            .unwrap();
        let ids: Vec<&str> = found.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_increment_positions_touches_only_matches() {
        let store =
            InMemoryNodeStore::with_nodes([child("a", "p", 0), child("b", "p", 1), child("x", "q", 1)])
                .await;

        let changed = store
            .increment_positions(
                &NodeQuery::new()
                    .parent(ParentFilter::Child("p".to_string()))
                    .position_gte(1),
                1,
            )
            .await
            .unwrap();

        assert_eq!(changed, 1);
        assert_eq!(store.get_node("a").await.unwrap().unwrap().position, Some(0));
        assert_eq!(store.get_node("b").await.unwrap().unwrap().position, Some(2));
        assert_eq!(store.get_node("x").await.unwrap().unwrap().position, Some(1));
    }

    #[tokio::test]
    async fn test_set_positions_is_all_or_nothing() {
        let store = InMemoryNodeStore::with_nodes([child("a", "p", 0), child("b", "p", 1)]).await;

        let result = store
            .set_positions(&[("a".to_string(), 1), ("ghost".to_string(), 0)])
            .await;
        assert!(result.is_err());
        assert_eq!(store.get_node("a").await.unwrap().unwrap().position, Some(0));

        store
            .set_positions(&[("a".to_string(), 1), ("b".to_string(), 0)])
            .await
            .unwrap();
        assert_eq!(store.get_node("a").await.unwrap().unwrap().position, Some(1));
        assert_eq!(store.get_node("b").await.unwrap().unwrap().position, Some(0));
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = InMemoryNodeStore::with_nodes([child("a", "p", 0)]).await;
        store.fail_writes_after(1);

        store.update_position("a", 5).await.unwrap();
        let err = store.update_position("a", 6).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<DatabaseError>(),
            Some(&DatabaseError::InjectedFailure { limit: 1 })
        );
        assert_eq!(store.get_node("a").await.unwrap().unwrap().position, Some(5));

        store.clear_write_failures();
        store.update_position("a", 6).await.unwrap();
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_save_content_keeps_stored_position() {
        let store = InMemoryNodeStore::with_nodes([child("a", "p", 0)]).await;
        let mut stale = store.get_node("a").await.unwrap().unwrap();
        tokio_test::assert_ok!(store.update_position("a", 3).await);

        stale.title = "Renamed".to_string();
        let saved = tokio_test::assert_ok!(store.save_node_content(stale).await);

        assert_eq!(saved.position, Some(3));
        let stored = store.get_node("a").await.unwrap().unwrap();
        assert_eq!(stored.title, "Renamed");
        assert_eq!(stored.position, Some(3));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = InMemoryNodeStore::with_nodes([child("a", "p", 0)]).await;
        assert!(store.delete_node("a").await.unwrap().existed);
        assert!(!store.delete_node("a").await.unwrap().existed);
        assert!(store.is_empty().await);
    }
}
