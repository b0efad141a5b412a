//! Publish Scheduler
//!
//! Derives a node's temporal state from its publish window and applies the
//! one-shot publish/hide requests at save time. Nothing here is persisted
//! as a separate flag: state is recomputed on every read.
//!
//! All comparisons are inclusive. At the exact instant `published_at == now`
//! a node is both published and pending.

use crate::models::{Node, NodeQuery, PublishRequest};
use crate::services::Clock;
use chrono::{DateTime, Months, Utc};
use std::sync::Arc;

/// Default open-ended expiry applied by publish and hide requests
pub const DEFAULT_PUBLISH_HORIZON_YEARS: u32 = 10;

/// `published_at` set, reached, and `published_to` unset or not yet passed
pub fn is_published(node: &Node, now: DateTime<Utc>) -> bool {
    node.published_at.is_some_and(|at| at <= now) && node.published_to.map_or(true, |to| to >= now)
}

/// `published_at` unset or not yet passed
pub fn is_pending(node: &Node, now: DateTime<Utc>) -> bool {
    node.published_at.map_or(true, |at| at >= now)
}

/// `published_to` set and reached
pub fn is_expired(node: &Node, now: DateTime<Utc>) -> bool {
    node.published_to.is_some_and(|to| to <= now)
}

/// The three predicates evaluated against one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishStatus {
    pub published: bool,
    pub pending: bool,
    pub expired: bool,
}

impl PublishStatus {
    pub fn at(node: &Node, now: DateTime<Utc>) -> Self {
        Self {
            published: is_published(node, now),
            pending: is_pending(node, now),
            expired: is_expired(node, now),
        }
    }
}

/// Publish-state evaluation bound to a clock and expiry horizon
#[derive(Debug, Clone)]
pub struct PublishScheduler {
    clock: Arc<dyn Clock>,
    horizon_years: u32,
}

impl PublishScheduler {
    pub fn new(clock: Arc<dyn Clock>, horizon_years: u32) -> Self {
        Self {
            clock,
            horizon_years,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn horizon_years(&self) -> u32 {
        self.horizon_years
    }

    pub fn status(&self, node: &Node) -> PublishStatus {
        PublishStatus::at(node, self.now())
    }

    pub fn is_published(&self, node: &Node) -> bool {
        is_published(node, self.now())
    }

    pub fn is_pending(&self, node: &Node) -> bool {
        is_pending(node, self.now())
    }

    pub fn is_expired(&self, node: &Node) -> bool {
        is_expired(node, self.now())
    }

    /// `now` plus the configured horizon in calendar years
    pub fn horizon_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_months(Months::new(self.horizon_years.saturating_mul(12)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Apply a publish/hide request to the window before persistence.
    ///
    /// Publish fills whichever bound is unset and never overwrites an
    /// existing schedule. Hide runs after publish and wins: it clears
    /// `published_at` and pushes `published_to` to the horizon.
    pub fn apply_request(&self, node: &mut Node, request: PublishRequest, now: DateTime<Utc>) {
        if request.publish {
            if node.published_at.is_none() {
                node.published_at = Some(now);
            }
            if node.published_to.is_none() {
                node.published_to = Some(self.horizon_from(now));
            }
        }
        if request.hide {
            node.published_at = None;
            node.published_to = Some(self.horizon_from(now));
        }
        if !request.is_empty() {
            tracing::debug!(
                "Applied publish request {:?} to node {}: window {:?}..{:?}",
                request,
                node.id,
                node.published_at,
                node.published_to
            );
        }
    }

    /// Store filter selecting nodes published at `now`.
    ///
    /// Matches `is_published`: a missing `published_to` is open-ended.
    pub fn published_query(&self, now: DateTime<Utc>) -> NodeQuery {
        NodeQuery::new()
            .published_at_lte(now)
            .published_to_gte(now)
    }
}
