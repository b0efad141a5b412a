//! Serialized sibling operations with retry
//!
//! `NodeService` moves are not isolated from each other: two concurrent
//! swaps in one sibling set may each pick a neighbour the other already
//! moved. Renumbering repairs the resulting disorder on the next write, but
//! callers that need every move applied exactly in order (a drag-reorder
//! UI, say) go through this queue instead.
//!
//! - One `tokio::sync::Mutex` per parent serializes moves within a set
//! - Transient store failures are retried with exponential backoff
//!
//! # Example
//!
//! ```rust
//! # use folio_core::operations::SiblingOperationQueue;
//! # use folio_core::services::NodeService;
//! # use std::sync::Arc;
//! # async fn example(service: Arc<NodeService>) -> Result<(), Box<dyn std::error::Error>> {
//! let queue = SiblingOperationQueue::new(service);
//!
//! // Retry up to 3 times with exponential backoff (10ms, 20ms, 40ms)
//! queue.move_lower_with_retry("node-123", 3).await?;
//! # Ok(())
//! # }
//! ```

use crate::models::Node;
use crate::services::{NodeService, NodeServiceError};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::Duration;

/// Lock key of a sibling set; `None` is the root set
type ParentKey = Option<String>;

/// Queue serializing moves per parent, retrying transient failures
pub struct SiblingOperationQueue {
    service: Arc<NodeService>,
    locks: Mutex<HashMap<ParentKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl SiblingOperationQueue {
    pub fn new(service: Arc<NodeService>) -> Self {
        Self {
            service,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn service(&self) -> &Arc<NodeService> {
        &self.service
    }

    fn lock_for(&self, parent: &ParentKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(parent.clone()).or_default().clone()
    }

    /// `NodeService::move_lower` under the parent's lock
    pub async fn move_lower_with_retry(
        &self,
        node_id: &str,
        max_retries: usize,
    ) -> Result<bool, NodeServiceError> {
        self.with_retry("move_lower", node_id, max_retries, move || async move {
            let node = self.service.require_node(node_id).await?;
            let lock = self.lock_for(&node.parent_id);
            let _guard = lock.lock().await;
            self.service.move_lower(node_id).await
        })
        .await
    }

    /// `NodeService::move_higher` under the parent's lock
    pub async fn move_higher_with_retry(
        &self,
        node_id: &str,
        max_retries: usize,
    ) -> Result<bool, NodeServiceError> {
        self.with_retry("move_higher", node_id, max_retries, move || async move {
            let node = self.service.require_node(node_id).await?;
            let lock = self.lock_for(&node.parent_id);
            let _guard = lock.lock().await;
            self.service.move_higher(node_id).await
        })
        .await
    }

    /// `NodeService::reparent` holding both the old and the new parent's
    /// locks, always taken in key order
    pub async fn reparent_with_retry(
        &self,
        node_id: &str,
        new_parent_id: Option<&str>,
        max_retries: usize,
    ) -> Result<Node, NodeServiceError> {
        self.with_retry("reparent", node_id, max_retries, move || async move {
            let node = self.service.require_node(node_id).await?;
            let target: ParentKey = new_parent_id.map(str::to_string);

            let mut keys = vec![node.parent_id.clone(), target];
            keys.sort();
            keys.dedup();
            let locks: Vec<_> = keys.iter().map(|key| self.lock_for(key)).collect();
            let mut guards = Vec::with_capacity(locks.len());
            for lock in &locks {
                guards.push(lock.lock().await);
            }

            self.service.reparent(node_id, new_parent_id).await
        })
        .await
    }

    /// Run `operation`, retrying transient failures
    ///
    /// # Retry Behavior
    ///
    /// - **Retry on**: errors where `is_transient()` holds (store failures)
    /// - **Backoff**: Exponential (10ms, 20ms, 40ms, 80ms, ...)
    /// - **Other errors**: Fail immediately without retry
    async fn with_retry<T, F, Fut>(
        &self,
        label: &str,
        node_id: &str,
        max_retries: usize,
        mut operation: F,
    ) -> Result<T, NodeServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, NodeServiceError>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::debug!(
                            "{} succeeded after {} retry(ies) for node '{}'",
                            label,
                            attempt,
                            node_id
                        );
                    }
                    return Ok(value);
                }

                Err(e) if e.is_transient() && attempt < max_retries => {
                    tracing::debug!(
                        "{} attempt {}/{} for node '{}' failed: {}. Retrying...",
                        label,
                        attempt + 1,
                        max_retries + 1,
                        node_id,
                        e
                    );

                    let backoff_ms = 10u64 << attempt.min(16);
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;

                    attempt += 1;
                }

                Err(e) => {
                    if e.is_transient() {
                        tracing::warn!(
                            "Max retries ({}) exceeded for node '{}' {} operation",
                            max_retries,
                            node_id,
                            label
                        );
                    }
                    return Err(e);
                }
            }
        }
    }
}
