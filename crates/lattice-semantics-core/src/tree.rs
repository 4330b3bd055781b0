//! Update records and the tree diff engine.
//!
//! A [`SemanticsUpdate`] is what the engine hands to the platform bridge: a
//! flat list of node records to upsert plus a list of node ids to remove.
//! The platform treats an update for an id it has not seen as an addition,
//! so there is no separate "add" kind.
//!
//! [`compute_diff`] is a pure function over two trees. It never touches an
//! owner, which keeps reconciliation testable in isolation. Nodes are
//! matched by [`NodeId`], not by instance, so a node rebuilt this frame with
//! the same stable id as last frame's is the same logical node.

use std::collections::{HashMap, HashSet};

use serde::{Serialize, Serializer};

use crate::actions::SupportedActions;
use crate::config::SemanticsConfiguration;
use crate::geometry::Rect;
use crate::logging::targets;
use crate::node::{NodeId, NodeIdAllocator, SemanticsNode};
use crate::properties::{CustomSemanticsAction, SemanticsFlags, SemanticsRole};

/// A batch of changes to deliver to the platform.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticsUpdate {
    /// Nodes that were added or modified.
    pub updates: Vec<SemanticsNodeUpdate>,
    /// Ids of nodes that were removed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub removals: Vec<NodeId>,
}

impl SemanticsUpdate {
    /// Whether the batch contains no changes.
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.removals.is_empty()
    }

    /// Total number of upserts and removals.
    pub fn len(&self) -> usize {
        self.updates.len() + self.removals.len()
    }

    /// The update record for `id`, if present.
    pub fn update_for(&self, id: NodeId) -> Option<&SemanticsNodeUpdate> {
        self.updates.iter().find(|update| update.id == id)
    }

    /// Encode the batch as JSON for a channel-based bridge.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// The wire record for a single node.
///
/// Empty strings, absent numbers, a zero heading level and empty lists are
/// omitted from the encoded form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticsNodeUpdate {
    /// Node id.
    pub id: NodeId,
    /// Global bounds, flattened into `left`/`top`/`right`/`bottom`.
    #[serde(flatten)]
    pub rect: Rect,
    /// Accessible name.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub label: String,
    /// Current value as text.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value: String,
    /// Usage hint.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hint: String,
    /// Widget role.
    pub role: SemanticsRole,
    /// State flags, encoded as their raw bits.
    #[serde(serialize_with = "serialize_flags")]
    pub flags: SemanticsFlags,
    /// Actions with a registered handler, encoded as their raw bits.
    #[serde(serialize_with = "serialize_actions")]
    pub actions: SupportedActions,
    /// Children in traversal order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub child_ids: Vec<NodeId>,
    /// Numeric value of a range control.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<f64>,
    /// Lower bound of a range control.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    /// Upper bound of a range control.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    /// Current scroll offset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_position: Option<f64>,
    /// Minimum scroll offset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_extent_min: Option<f64>,
    /// Maximum scroll offset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_extent_max: Option<f64>,
    /// Heading level, or 0 when the node is not a heading.
    #[serde(skip_serializing_if = "is_zero")]
    pub heading_level: u8,
    /// Application-defined actions.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_actions: Vec<CustomSemanticsAction>,
}

impl SemanticsNodeUpdate {
    /// Capture the current state of `node`.
    pub fn from_node(node: &SemanticsNode) -> Self {
        let child_ids = node.child_ids();
        let rect = node.rect();
        node.read_config(|config| Self::from_parts(node.id(), rect, config, child_ids))
    }

    fn from_parts(
        id: NodeId,
        rect: Rect,
        config: &SemanticsConfiguration,
        child_ids: Vec<NodeId>,
    ) -> Self {
        let props = &config.properties;
        Self {
            id,
            rect,
            label: props.label.clone(),
            value: props.value.clone(),
            hint: props.hint.clone(),
            role: props.role,
            flags: props.flags,
            actions: config.supported_actions(),
            child_ids,
            current_value: props.current_value,
            min_value: props.min_value,
            max_value: props.max_value,
            scroll_position: props.scroll_position,
            scroll_extent_min: props.scroll_extent_min,
            scroll_extent_max: props.scroll_extent_max,
            heading_level: props.heading_level,
            custom_actions: props.custom_actions.clone(),
        }
    }
}

fn serialize_flags<S: Serializer>(flags: &SemanticsFlags, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(flags.bits())
}

fn serialize_actions<S: Serializer>(
    actions: &SupportedActions,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(actions.bits())
}

fn is_zero(level: &u8) -> bool {
    *level == 0
}

/// Compute the changes needed to turn `old_root` into `new_root`.
///
/// Removals list every id reachable from `old_root` but not from
/// `new_root`, in pre-order. Updates list every node of `new_root` that is
/// new or whose record differs from the old node with the same id, in
/// pre-order. Unchanged nodes are omitted.
pub fn compute_diff(old_root: Option<&SemanticsNode>, new_root: Option<&SemanticsNode>) -> SemanticsUpdate {
    let old_nodes = flatten_tree(old_root);
    let new_nodes = flatten_tree(new_root);

    let mut old_by_id: HashMap<NodeId, &SemanticsNode> = HashMap::with_capacity(old_nodes.len());
    for node in &old_nodes {
        old_by_id.insert(node.id(), node);
    }
    let mut new_ids = HashSet::with_capacity(new_nodes.len());
    for node in &new_nodes {
        new_ids.insert(node.id());
    }

    let mut removals = Vec::new();
    let mut seen_removed = HashSet::new();
    for node in &old_nodes {
        let id = node.id();
        if !new_ids.contains(&id) && seen_removed.insert(id) {
            removals.push(id);
        }
    }

    let updates: Vec<SemanticsNodeUpdate> = new_nodes
        .iter()
        .filter_map(|node| {
            let record = SemanticsNodeUpdate::from_node(node);
            match old_by_id.get(&node.id()) {
                Some(old) if SemanticsNodeUpdate::from_node(old) == record => None,
                _ => Some(record),
            }
        })
        .collect();

    tracing::trace!(
        target: targets::DIFF,
        old = old_nodes.len(),
        new = new_nodes.len(),
        updates = updates.len(),
        removals = removals.len(),
        "computed semantics diff"
    );

    SemanticsUpdate { updates, removals }
}

/// Build a node with a fresh id, the given content and children.
///
/// Mostly useful for tests and tooling that assemble trees by hand.
pub fn build_semantics_tree(
    allocator: &NodeIdAllocator,
    config: SemanticsConfiguration,
    rect: Rect,
    children: &[SemanticsNode],
) -> SemanticsNode {
    let node = SemanticsNode::with_config(allocator.next_id(), rect, config);
    for child in children {
        node.add_child(child);
    }
    node
}

/// Every node of the tree rooted at `root`, in pre-order.
pub fn flatten_tree(root: Option<&SemanticsNode>) -> Vec<SemanticsNode> {
    let mut nodes = Vec::new();
    if let Some(root) = root {
        root.visit(|node| {
            nodes.push(node.clone());
            true
        });
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::SemanticsAction;
    use crate::properties::SemanticsProperties;

    fn labeled(id: u64, label: &str) -> SemanticsNode {
        let mut config = SemanticsConfiguration::new();
        config.properties.label = label.into();
        SemanticsNode::with_config(NodeId::new(id), Rect::new(0.0, 0.0, 100.0, 40.0), config)
    }

    fn tree(root: (u64, &str), children: &[(u64, &str)]) -> SemanticsNode {
        let root = labeled(root.0, root.1);
        for (id, label) in children {
            root.add_child(&labeled(*id, label));
        }
        root
    }

    #[test]
    fn test_diff_both_empty() {
        assert!(compute_diff(None, None).is_empty());
    }

    #[test]
    fn test_diff_addition() {
        let new = tree((1, "root"), &[(2, "a"), (3, "b")]);
        let diff = compute_diff(None, Some(&new));

        assert!(diff.removals.is_empty());
        let ids: Vec<_> = diff.updates.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![NodeId::new(1), NodeId::new(2), NodeId::new(3)]);
    }

    #[test]
    fn test_diff_removal_single_node() {
        let old = labeled(1, "root");
        let diff = compute_diff(Some(&old), None);
        assert_eq!(diff.removals, vec![NodeId::new(1)]);
        assert!(diff.updates.is_empty());
    }

    #[test]
    fn test_diff_removal_lists_root_first() {
        let old = tree((1, "root"), &[(2, "a"), (3, "b")]);
        let diff = compute_diff(Some(&old), None);
        assert_eq!(diff.removals.first(), Some(&NodeId::new(1)));
        assert_eq!(diff.removals.len(), 3);
    }

    #[test]
    fn test_diff_modification() {
        let old = tree((1, "root"), &[(2, "a"), (3, "b")]);
        let new = tree((1, "root"), &[(2, "a"), (3, "changed")]);

        let diff = compute_diff(Some(&old), Some(&new));
        assert!(diff.removals.is_empty());
        assert_eq!(diff.updates.len(), 1);
        assert_eq!(diff.updates[0].id, NodeId::new(3));
        assert_eq!(diff.updates[0].label, "changed");
    }

    #[test]
    fn test_diff_child_removed_updates_parent() {
        let old = tree((1, "root"), &[(2, "a"), (3, "b")]);
        let new = tree((1, "root"), &[(2, "a")]);

        let diff = compute_diff(Some(&old), Some(&new));
        assert_eq!(diff.removals, vec![NodeId::new(3)]);
        // The parent's child list changed, so it is re-sent.
        assert_eq!(diff.updates.len(), 1);
        assert_eq!(diff.updates[0].id, NodeId::new(1));
        assert_eq!(diff.updates[0].child_ids, vec![NodeId::new(2)]);
    }

    #[test]
    fn test_diff_identical_trees_from_different_instances() {
        let old = tree((1, "root"), &[(2, "a"), (3, "b")]);
        let new = tree((1, "root"), &[(2, "a"), (3, "b")]);
        assert!(!old.ptr_eq(&new));
        assert!(compute_diff(Some(&old), Some(&new)).is_empty());
    }

    #[test]
    fn test_diff_detects_rect_and_action_changes() {
        let old = labeled(1, "root");
        let moved = labeled(1, "root");
        moved.set_rect(Rect::new(5.0, 0.0, 100.0, 40.0));
        assert_eq!(compute_diff(Some(&old), Some(&moved)).updates.len(), 1);

        let tappable = labeled(1, "root");
        tappable.update_config(|c| c.actions_mut().set_handler(SemanticsAction::Tap, |_| {}));
        let diff = compute_diff(Some(&old), Some(&tappable));
        assert_eq!(diff.updates.len(), 1);
        assert_eq!(diff.updates[0].actions, SupportedActions::TAP);
    }

    #[test]
    fn test_flatten_tree() {
        assert!(flatten_tree(None).is_empty());
        let root = tree((1, "root"), &[(2, "a"), (3, "b")]);
        let ids: Vec<_> = flatten_tree(Some(&root)).iter().map(SemanticsNode::id).collect();
        assert_eq!(ids, vec![NodeId::new(1), NodeId::new(2), NodeId::new(3)]);
    }

    #[test]
    fn test_build_semantics_tree() {
        let ids = NodeIdAllocator::new();
        let child = SemanticsNode::new(&ids);
        let root = build_semantics_tree(
            &ids,
            SemanticsConfiguration {
                properties: SemanticsProperties {
                    label: "Form".into(),
                    ..Default::default()
                },
                ..Default::default()
            },
            Rect::new(0.0, 0.0, 320.0, 480.0),
            &[child.clone()],
        );
        assert_eq!(root.child_count(), 1);
        assert!(child.parent().is_some_and(|p| p.ptr_eq(&root)));
        assert_eq!(root.properties().label, "Form");
    }

    #[test]
    fn test_update_json_encoding() {
        let node = labeled(4, "Play");
        node.update_config(|c| {
            c.properties.role = SemanticsRole::Button;
            c.properties.flags = SemanticsFlags::IS_BUTTON | SemanticsFlags::IS_ENABLED;
            c.actions_mut().set_handler(SemanticsAction::Tap, |_| {});
        });
        node.add_child(&labeled(5, "icon"));

        let update = SemanticsUpdate {
            updates: vec![SemanticsNodeUpdate::from_node(&node)],
            removals: vec![NodeId::new(9)],
        };
        let json: serde_json::Value = serde_json::from_str(&update.to_json().unwrap()).unwrap();
        let record = &json["updates"][0];

        assert_eq!(record["id"], 4);
        assert_eq!(record["left"], 0.0);
        assert_eq!(record["bottom"], 40.0);
        assert_eq!(record["label"], "Play");
        assert_eq!(record["role"], "button");
        assert_eq!(
            record["flags"],
            (SemanticsFlags::IS_BUTTON | SemanticsFlags::IS_ENABLED).bits()
        );
        assert_eq!(record["actions"], SupportedActions::TAP.bits());
        assert_eq!(record["childIds"], serde_json::json!([5]));
        assert!(record.get("value").is_none());
        assert!(record.get("currentValue").is_none());
        assert!(record.get("headingLevel").is_none());
        assert_eq!(json["removals"], serde_json::json!([9]));
    }

    #[test]
    fn test_update_json_emits_set_optional_fields() {
        let node = labeled(6, "Chapter");
        node.update_config(|c| {
            c.properties.heading_level = 2;
            c.properties.current_value = Some(0.5);
            c.properties.scroll_extent_max = Some(300.0);
        });

        let record = serde_json::to_value(SemanticsNodeUpdate::from_node(&node)).unwrap();
        assert_eq!(record["headingLevel"], 2);
        assert_eq!(record["currentValue"], 0.5);
        assert_eq!(record["scrollExtentMax"], 300.0);
        assert!(record.get("scrollExtentMin").is_none());
        assert!(record.get("childIds").is_none());
    }
}
