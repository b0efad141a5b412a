//! Slot Types
//!
//! Slots are fixed, named, indexed attachment points on a node. Each slot
//! belongs to a slot group (e.g. `main`, `wide`, `small`) and is addressed
//! as `<group>_slot_<index>`, the same key used in the stored document.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const SLOT_INFIX: &str = "_slot_";

/// Address of one slot: its group name and zero-based index
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    pub group: String,
    pub index: usize,
}

impl SlotKey {
    pub fn new(group: impl Into<String>, index: usize) -> Self {
        Self {
            group: group.into(),
            index,
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.group, SLOT_INFIX, self.index)
    }
}

/// Error returned when a string is not of the form `<group>_slot_<index>`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid slot key: {0}")]
pub struct InvalidSlotKey(pub String);

impl FromStr for SlotKey {
    type Err = InvalidSlotKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (group, index) = s
            .rsplit_once(SLOT_INFIX)
            .ok_or_else(|| InvalidSlotKey(s.to_string()))?;
        if group.is_empty() {
            return Err(InvalidSlotKey(s.to_string()));
        }
        let index = index
            .parse::<usize>()
            .map_err(|_| InvalidSlotKey(s.to_string()))?;
        Ok(Self::new(group, index))
    }
}

impl Serialize for SlotKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Embedded sub-content held by a slot.
///
/// `component_type` is the concrete type checked against the slot group's
/// allow-list; `fields` carries the component's own data untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub component_type: String,

    #[serde(default)]
    pub fields: serde_json::Value,
}

impl Component {
    pub fn new(component_type: impl Into<String>, fields: serde_json::Value) -> Self {
        Self {
            component_type: component_type.into(),
            fields,
        }
    }
}
