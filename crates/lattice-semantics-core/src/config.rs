//! Semantics configuration: what a render object contributes to the tree.

use crate::actions::{ActionRegistry, SupportedActions};
use crate::properties::{SemanticsFlags, SemanticsProperties};

/// The semantic description produced by a render object for one frame.
///
/// A configuration combines four structural booleans with the node's
/// [`SemanticsProperties`] and an optional [`ActionRegistry`].
#[derive(Debug, Clone, Default)]
pub struct SemanticsConfiguration {
    /// This render object creates its own semantics node instead of merging
    /// into an ancestor.
    pub is_semantic_boundary: bool,

    /// The semantics of all descendants fold into this node, which is then
    /// announced as a single unit.
    pub is_merging_semantics_of_descendants: bool,

    /// Child nodes are wired explicitly rather than inferred from the render
    /// tree.
    pub explicit_child_nodes: bool,

    /// The node blocks user actions (e.g. a modal barrier).
    pub is_blocking_user_actions: bool,

    /// Semantic property values.
    pub properties: SemanticsProperties,

    /// Action handlers, if the node is interactive.
    pub actions: Option<ActionRegistry>,
}

impl SemanticsConfiguration {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the configuration carries no semantic information at all.
    pub fn is_empty(&self) -> bool {
        !self.is_semantic_boundary
            && !self.is_merging_semantics_of_descendants
            && !self.explicit_child_nodes
            && !self.is_blocking_user_actions
            && self.properties.is_empty()
            && !self.has_actions()
    }

    /// Whether a non-empty action registry is attached.
    pub fn has_actions(&self) -> bool {
        self.actions.as_ref().is_some_and(|actions| !actions.is_empty())
    }

    /// The supported-action set of the attached registry.
    pub fn supported_actions(&self) -> SupportedActions {
        self.actions
            .as_ref()
            .map(ActionRegistry::supported_actions)
            .unwrap_or_default()
    }

    /// Mutable access to the action registry, creating it on first use.
    pub fn actions_mut(&mut self) -> &mut ActionRegistry {
        self.actions.get_or_insert_with(ActionRegistry::new)
    }

    /// Infer focusability from content.
    ///
    /// Hidden or already-focusable configurations are left alone. Otherwise
    /// a configuration with any properties or handlers becomes focusable.
    /// This is the only inferred semantics in the model; the tree builder
    /// calls it exactly once per built configuration.
    pub fn ensure_focusable(&mut self) {
        let flags = self.properties.flags;
        if flags.contains(SemanticsFlags::IS_HIDDEN) || flags.contains(SemanticsFlags::IS_FOCUSABLE)
        {
            return;
        }
        if !self.properties.is_empty() || self.has_actions() {
            self.properties.flags |= SemanticsFlags::IS_FOCUSABLE;
        }
    }

    /// Merge `other` into this configuration.
    ///
    /// Booleans are OR'd, properties merge with `other` winning on scalar
    /// conflicts, and action registries are unioned.
    pub fn merge(&mut self, other: &SemanticsConfiguration) {
        self.is_semantic_boundary |= other.is_semantic_boundary;
        self.is_merging_semantics_of_descendants |= other.is_merging_semantics_of_descendants;
        self.explicit_child_nodes |= other.explicit_child_nodes;
        self.is_blocking_user_actions |= other.is_blocking_user_actions;
        self.properties.merge_in_place(&other.properties);
        if let Some(other_actions) = &other.actions {
            self.actions_mut().merge(other_actions);
        }
    }
}
