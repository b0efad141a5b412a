//! Node Query Types
//!
//! `NodeQuery` is the filter handed to the storage collaborator for ordered
//! finds and filtered multi-updates. It also knows how to evaluate itself
//! against a node, which lets simple backends filter in memory.

use crate::models::{Node, Permalink};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Restricts a query to one sibling set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentFilter {
    /// Nodes without a parent
    Root,
    /// Nodes whose parent is the given id
    Child(String),
}

impl ParentFilter {
    /// Filter for the sibling set a node with `parent_id` belongs to
    pub fn of(parent_id: Option<&str>) -> Self {
        match parent_id {
            Some(id) => Self::Child(id.to_string()),
            None => Self::Root,
        }
    }

    fn matches(&self, parent_id: Option<&str>) -> bool {
        match self {
            Self::Root => parent_id.is_none(),
            Self::Child(id) => parent_id == Some(id.as_str()),
        }
    }
}

/// Filter over stored nodes. Unset criteria match everything.
///
/// ```rust
/// # use folio_core::models::{NodeQuery, ParentFilter};
/// // "every other sibling of node-1 at position 2 or later"
/// let query = NodeQuery::new()
///     .parent(ParentFilter::Child("parent".into()))
///     .exclude_id("node-1")
///     .position_gte(2);
/// # let _ = query;
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeQuery {
    pub parent: Option<ParentFilter>,
    pub exclude_id: Option<String>,
    pub position_gte: Option<u32>,
    pub position_gt: Option<u32>,
    pub position_lt: Option<u32>,
    pub permalink: Option<Permalink>,
    pub node_types: Option<Vec<String>>,
    /// `publishedAt` set and at or before this instant
    pub published_at_lte: Option<DateTime<Utc>>,
    /// `publishedTo` unset or at or after this instant
    pub published_to_gte: Option<DateTime<Utc>>,
    /// Nodes whose cached path contains this ancestor id
    pub ancestor: Option<String>,
}

impl NodeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parent(mut self, parent: ParentFilter) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn exclude_id(mut self, id: impl Into<String>) -> Self {
        self.exclude_id = Some(id.into());
        self
    }

    pub fn position_gte(mut self, position: u32) -> Self {
        self.position_gte = Some(position);
        self
    }

    pub fn position_gt(mut self, position: u32) -> Self {
        self.position_gt = Some(position);
        self
    }

    pub fn position_lt(mut self, position: u32) -> Self {
        self.position_lt = Some(position);
        self
    }

    pub fn permalink(mut self, permalink: Permalink) -> Self {
        self.permalink = Some(permalink);
        self
    }

    pub fn node_types(mut self, node_types: Vec<String>) -> Self {
        self.node_types = Some(node_types);
        self
    }

    pub fn published_at_lte(mut self, instant: DateTime<Utc>) -> Self {
        self.published_at_lte = Some(instant);
        self
    }

    pub fn published_to_gte(mut self, instant: DateTime<Utc>) -> Self {
        self.published_to_gte = Some(instant);
        self
    }

    pub fn ancestor(mut self, id: impl Into<String>) -> Self {
        self.ancestor = Some(id.into());
        self
    }

    /// Evaluate the filter against one node
    pub fn matches(&self, node: &Node) -> bool {
        if let Some(parent) = &self.parent {
            if !parent.matches(node.parent_id.as_deref()) {
                return false;
            }
        }
        if let Some(id) = &self.exclude_id {
            if &node.id == id {
                return false;
            }
        }
        // Position comparisons never match an unset position
        if let Some(min) = self.position_gte {
            if !node.position.is_some_and(|p| p >= min) {
                return false;
            }
        }
        if let Some(min) = self.position_gt {
            if !node.position.is_some_and(|p| p > min) {
                return false;
            }
        }
        if let Some(max) = self.position_lt {
            if !node.position.is_some_and(|p| p < max) {
                return false;
            }
        }
        if let Some(permalink) = &self.permalink {
            if &node.permalink != permalink {
                return false;
            }
        }
        if let Some(types) = &self.node_types {
            if !types.contains(&node.node_type) {
                return false;
            }
        }
        if let Some(instant) = self.published_at_lte {
            if !node.published_at.is_some_and(|at| at <= instant) {
                return false;
            }
        }
        if let Some(instant) = self.published_to_gte {
            if node.published_to.is_some_and(|to| to < instant) {
                return false;
            }
        }
        if let Some(ancestor) = &self.ancestor {
            if !node.path.contains(ancestor) {
                return false;
            }
        }
        true
    }
}

/// Sort key for ordered finds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    PositionAsc,
    PositionDesc,
    TitleAsc,
    CreatedAtAsc,
    CreatedAtDesc,
}

impl SortOrder {
    /// Total order over nodes for this key.
    ///
    /// Unset positions sort after every set one; ties fall back to the id so
    /// the order is deterministic even when positions collide.
    pub fn compare(&self, a: &Node, b: &Node) -> Ordering {
        let primary = match self {
            Self::PositionAsc => compare_positions(a.position, b.position),
            Self::PositionDesc => compare_positions(b.position, a.position),
            Self::TitleAsc => a.title.cmp(&b.title),
            Self::CreatedAtAsc => a.created_at.cmp(&b.created_at),
            Self::CreatedAtDesc => b.created_at.cmp(&a.created_at),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

fn compare_positions(a: Option<u32>, b: Option<u32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn child(parent: &str, position: u32) -> Node {
        Node::new("page", "n", Some(parent.to_string())).with_position(position)
    }

    #[test]
    fn test_sibling_filter_excludes_self() {
        let node = child("p", 1);
        let query = NodeQuery::new()
            .parent(ParentFilter::Child("p".to_string()))
            .exclude_id(node.id.clone());
        assert!(!query.matches(&node));
        assert!(query.matches(&child("p", 1)));
        assert!(!query.matches(&child("other", 1)));
        assert!(!query.matches(&Node::new("page", "root", None)));
    }

    #[test]
    fn test_root_filter() {
        let query = NodeQuery::new().parent(ParentFilter::of(None));
        assert!(query.matches(&Node::new("page", "root", None)));
        assert!(!query.matches(&child("p", 0)));
    }

    #[test]
    fn test_position_bounds() {
        let query = NodeQuery::new().position_gte(2);
        assert!(query.matches(&child("p", 2)));
        assert!(!query.matches(&child("p", 1)));
        assert!(!query.matches(&Node::new("page", "unplaced", None)));

        let query = NodeQuery::new().position_gt(1).position_lt(3);
        assert!(query.matches(&child("p", 2)));
        assert!(!query.matches(&child("p", 3)));
    }

    #[test]
    fn test_publish_window_treats_missing_end_as_open() {
        let now = Utc::now();
        let query = NodeQuery::new().published_at_lte(now).published_to_gte(now);

        let open = Node::new("page", "open", None).with_publish_window(Some(now), None);
        let closed = Node::new("page", "closed", None)
            .with_publish_window(Some(now - Duration::days(2)), Some(now - Duration::days(1)));
        let unscheduled = Node::new("page", "draft", None);

        assert!(query.matches(&open));
        assert!(!query.matches(&closed));
        assert!(!query.matches(&unscheduled));
    }

    #[test]
    fn test_position_order_puts_unset_last_and_breaks_ties_by_id() {
        let mut a = child("p", 1);
        a.id = "a".to_string();
        let mut b = child("p", 1);
        b.id = "b".to_string();
        let mut c = Node::new("page", "c", Some("p".to_string()));
        c.id = "0".to_string();

        let mut nodes = vec![c.clone(), b.clone(), a.clone()];
        nodes.sort_by(|x, y| SortOrder::PositionAsc.compare(x, y));
        let ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "0"]);
    }
}
