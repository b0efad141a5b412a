//! Shared fixtures for service tests

use crate::db::{InMemoryNodeStore, NodeStore};
use crate::models::{NodeQuery, ParentFilter, SortOrder};
use crate::services::{CreateNodeParams, FixedClock, NodeService};
use crate::templates::{SlotGroup, TemplateRegistry, TemplateSchema};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

pub(crate) fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

/// `page` and `landing` are roots; `landing` only accepts articles and has
/// three wide slots that take plain content, `article` has one.
pub(crate) fn registry() -> TemplateRegistry {
    TemplateRegistry::builder()
        .slot_group(SlotGroup::new("main", ["content"]))
        .slot_group(SlotGroup::new("wide", ["content", "gallery"]))
        .slot_group(SlotGroup::new("small", ["quote"]))
        .template(
            TemplateSchema::new("page")
                .root()
                .sub_templates(["page", "article"])
                .slots("main", 1)
                .slots("wide", 3),
        )
        .template(
            TemplateSchema::new("landing")
                .root()
                .sub_templates(["article"])
                .slots("wide", 3)
                .slot_components("wide", ["content"])
                .slots("small", 2),
        )
        .template(TemplateSchema::new("article").slots("main", 1).slots("wide", 1))
        .build()
        .unwrap()
}

pub(crate) struct Fixture {
    pub service: NodeService,
    pub store: Arc<InMemoryNodeStore>,
    pub clock: Arc<FixedClock>,
}

pub(crate) fn fixture() -> Fixture {
    let store = Arc::new(InMemoryNodeStore::new());
    let clock = Arc::new(FixedClock::new(start()));
    let service = NodeService::with_clock(store.clone(), Arc::new(registry()), clock.clone());
    Fixture {
        service,
        store,
        clock,
    }
}

pub(crate) fn params(node_type: &str, title: &str, parent_id: Option<&str>) -> CreateNodeParams {
    CreateNodeParams {
        node_type: node_type.to_string(),
        title: title.to_string(),
        parent_id: parent_id.map(str::to_string),
        ..Default::default()
    }
}

/// `(title, position)` of a sibling set in stored position order
pub(crate) async fn sibling_positions(
    store: &InMemoryNodeStore,
    parent_id: Option<&str>,
) -> Vec<(String, u32)> {
    store
        .find_nodes(
            &NodeQuery::new().parent(ParentFilter::of(parent_id)),
            SortOrder::PositionAsc,
        )
        .await
        .unwrap()
        .into_iter()
        .map(|n| (n.title, n.position.unwrap_or(u32::MAX)))
        .collect()
}

pub(crate) async fn assert_dense(store: &InMemoryNodeStore, parent_id: Option<&str>) {
    let positions: Vec<u32> = sibling_positions(store, parent_id)
        .await
        .into_iter()
        .map(|(_, p)| p)
        .collect();
    let expected: Vec<u32> = (0..positions.len() as u32).collect();
    assert_eq!(positions, expected, "sibling positions are not dense");
}

pub(crate) async fn titles(store: &InMemoryNodeStore, parent_id: Option<&str>) -> Vec<String> {
    sibling_positions(store, parent_id)
        .await
        .into_iter()
        .map(|(title, _)| title)
        .collect()
}
