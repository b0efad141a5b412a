//! Permission Evaluator
//!
//! Coarse group-based authorization. Each node carries one group list per
//! `PermissionKind`; an empty list leaves that kind unrestricted.

use crate::models::{Node, PermissionKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The acting user as seen by permission checks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub groups: BTreeSet<String>,
    #[serde(default)]
    pub admin: bool,
}

impl User {
    pub fn new<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            groups: groups.into_iter().map(Into::into).collect(),
            admin: false,
        }
    }

    pub fn admin() -> Self {
        Self {
            groups: BTreeSet::new(),
            admin: true,
        }
    }
}

/// Admin, unrestricted list, or any shared group
pub fn allowed_for(node: &Node, user: &User, kind: PermissionKind) -> bool {
    let groups = node.permissions.groups(kind);
    user.admin || groups.is_empty() || !groups.is_disjoint(&user.groups)
}

pub fn updatable_by(node: &Node, user: &User) -> bool {
    allowed_for(node, user, PermissionKind::Updatable)
}

pub fn destroyable_by(node: &Node, user: &User) -> bool {
    allowed_for(node, user, PermissionKind::Destroyable)
}

pub fn publishable_by(node: &Node, user: &User) -> bool {
    allowed_for(node, user, PermissionKind::Publishable)
}

pub fn viewable_by(node: &Node, user: &User) -> bool {
    allowed_for(node, user, PermissionKind::Viewable)
}

/// Roots are creatable by anyone; children need update rights on the parent
pub fn creatable_by(parent: Option<&Node>, user: &User) -> bool {
    parent.map_or(true, |parent| updatable_by(parent, user))
}

/// Copy all four group lists from `parent`. Creation-time only.
pub fn inherit_permissions(node: &mut Node, parent: Option<&Node>) {
    if let Some(parent) = parent {
        node.permissions = parent.permissions.clone();
    }
}

/// Union of every group mentioned on the node
pub fn all_groups(node: &Node) -> BTreeSet<String> {
    node.permissions.all_groups()
}

/// Group list of `kind` rendered for editing, e.g. `"editors, staff"`
pub fn groups_list(node: &Node, kind: PermissionKind) -> String {
    node.permissions
        .groups(kind)
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse an edited group list: lower-cased, comma separated, blanks dropped
pub fn parse_groups_list(text: &str) -> BTreeSet<String> {
    text.split(',')
        .map(|group| group.trim().to_lowercase())
        .filter(|group| !group.is_empty())
        .collect()
}
