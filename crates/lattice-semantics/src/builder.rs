//! Per-frame construction of the semantics tree from the render tree.
//!
//! The render tree is an external collaborator; it is reached through two
//! capability traits:
//!
//! - [`RenderSemantics`] is implemented by every render object the builder
//!   walks. It supplies the object's identity, its bounds in global
//!   coordinates and its children.
//! - [`DescribesSemantics`] is implemented by render objects that contribute
//!   semantics. A render object without the capability contributes nothing,
//!   which is a missing capability rather than an absent callback.
//!
//! # Building rules
//!
//! For each render object the builder calls the description callback exactly
//! once, then:
//!
//! - An object that claims a boundary or describes any content gets its own
//!   node, with an id issued by [`SemanticsOwner::get_stable_id`].
//! - An object with empty semantics is pruned; its children are hoisted into
//!   the nearest enclosing node.
//! - A node that merges its descendants folds their configurations into its
//!   own and gets no children. Its own declarations win over theirs.
//! - A node that declares explicit child nodes gets no inferred children.
//!
//! Focusability is inferred once per built configuration, and top-level
//! nodes are wrapped in a synthetic root with id [`NodeId::ROOT`].

use lattice_semantics_core::logging::{span_names, targets};
use lattice_semantics_core::{
    NodeId, Rect, SemanticsConfiguration, SemanticsFlags, SemanticsNode, SemanticsOwner, StableKey,
};

/// The description callback of a render object.
pub trait DescribesSemantics {
    /// Fill `config` with this object's semantics.
    ///
    /// The return value says whether the object considers itself a
    /// semantic boundary. It is a hint: an object returning `false` still
    /// gets a node when it describes non-empty content.
    fn describe_semantics_configuration(&self, config: &mut SemanticsConfiguration) -> bool;
}

/// A render object as seen by the semantics tree builder.
pub trait RenderSemantics {
    /// The identity used to issue a stable node id.
    fn semantics_key(&self) -> StableKey;

    /// Bounding rectangle in global coordinates.
    fn semantics_bounds(&self) -> Rect;

    /// Visit the direct children in paint order.
    fn visit_semantics_children(&self, visitor: &mut dyn FnMut(&dyn RenderSemantics));

    /// The description callback, if this object contributes semantics.
    fn as_describes_semantics(&self) -> Option<&dyn DescribesSemantics> {
        None
    }
}

/// Options for [`SemanticsTreeBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderOptions {
    /// Infer focusability of every built configuration.
    pub ensure_focusable: bool,
    /// Always wrap the top-level nodes in a synthetic root.
    ///
    /// When disabled, a single top-level node becomes the root itself.
    /// Several top-level nodes are always wrapped.
    pub wrap_in_synthetic_root: bool,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            ensure_focusable: true,
            wrap_in_synthetic_root: true,
        }
    }
}

/// Builds a semantics tree from a render tree, once per frame.
pub struct SemanticsTreeBuilder<'a> {
    owner: &'a SemanticsOwner,
    options: BuilderOptions,
}

impl<'a> SemanticsTreeBuilder<'a> {
    /// Create a builder issuing ids from `owner`.
    pub fn new(owner: &'a SemanticsOwner) -> Self {
        Self::with_options(owner, BuilderOptions::default())
    }

    /// Create a builder with custom options.
    pub fn with_options(owner: &'a SemanticsOwner, options: BuilderOptions) -> Self {
        Self { owner, options }
    }

    /// Build the semantics tree for `root`.
    ///
    /// Returns `None` only when synthetic wrapping is disabled and the render
    /// tree contributes no semantics at all.
    pub fn build(&self, root: &dyn RenderSemantics) -> Option<SemanticsNode> {
        let _span = tracing::trace_span!(target: targets::BUILDER, span_names::BUILD).entered();

        let mut top_level = Vec::new();
        self.build_into(root, &mut top_level);

        if !self.options.wrap_in_synthetic_root && top_level.len() <= 1 {
            return top_level.pop();
        }

        let synthetic = SemanticsNode::with_id(NodeId::ROOT);
        synthetic.set_rect(root.semantics_bounds());
        for node in &top_level {
            synthetic.add_child(node);
        }
        tracing::trace!(target: targets::BUILDER, top_level = top_level.len(), "built semantics tree");
        Some(synthetic)
    }

    fn build_into(&self, render: &dyn RenderSemantics, out: &mut Vec<SemanticsNode>) {
        let mut config = SemanticsConfiguration::new();
        let claimed_boundary = render
            .as_describes_semantics()
            .is_some_and(|describer| describer.describe_semantics_configuration(&mut config));

        if !claimed_boundary && !config.is_semantic_boundary && config.is_empty() {
            render.visit_semantics_children(&mut |child: &dyn RenderSemantics| {
                self.build_into(child, out)
            });
            return;
        }

        let node = SemanticsNode::with_id(self.owner.get_stable_id(render.semantics_key()));
        node.set_rect(render.semantics_bounds());

        if config.is_merging_semantics_of_descendants {
            let mut merged = SemanticsConfiguration::new();
            render.visit_semantics_children(&mut |child: &dyn RenderSemantics| {
                fold_descendant(child, &mut merged)
            });
            merged.merge(&config);
            config = merged;
        } else if !config.explicit_child_nodes {
            let mut children = Vec::new();
            render.visit_semantics_children(&mut |child: &dyn RenderSemantics| {
                self.build_into(child, &mut children)
            });
            for child in &children {
                node.add_child(child);
            }
        }

        if self.options.ensure_focusable {
            config.ensure_focusable();
        }
        node.set_config(config);
        out.push(node);
    }
}

/// Fold the semantics of `render` and its subtree into `target`.
///
/// Hidden subtrees are skipped.
fn fold_descendant(render: &dyn RenderSemantics, target: &mut SemanticsConfiguration) {
    let mut config = SemanticsConfiguration::new();
    if let Some(describer) = render.as_describes_semantics() {
        describer.describe_semantics_configuration(&mut config);
    }
    if config.properties.has_flag(SemanticsFlags::IS_HIDDEN) {
        return;
    }

    target.properties.merge_in_place(&config.properties);
    if let Some(actions) = &config.actions {
        target.actions_mut().merge(actions);
    }
    render.visit_semantics_children(&mut |child: &dyn RenderSemantics| {
        fold_descendant(child, target)
    });
}
