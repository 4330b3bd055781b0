//! Logging and debugging facilities for the semantics engine.
//!
//! This module provides:
//! - Target and span names for filtering the engine's `tracing` output
//! - Debug visualization for semantics trees
//!
//! # Tracing Integration
//!
//! The engine uses the `tracing` crate for instrumentation and never installs
//! a subscriber itself. To see logs, install one in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("lattice_semantics_core::owner=debug")
//!     .init();
//! ```
//!
//! # Debug Visualization
//!
//! Use [`SemanticsTreeDebug`] to dump a tree:
//!
//! ```ignore
//! use lattice_semantics_core::logging::SemanticsTreeDebug;
//!
//! let debug = SemanticsTreeDebug::new();
//! println!("{}", debug.format_tree(&root));
//! ```

use std::fmt::{self, Write as FmtWrite};

use crate::node::SemanticsNode;
use crate::owner::SemanticsOwner;

/// Span names used by the semantics engine.
pub mod span_names {
    /// Root replacement and index rebuild.
    pub const SET_ROOT: &str = "lattice_semantics::set_root";
    /// Incremental or full update emission.
    pub const EMIT: &str = "lattice_semantics::emit";
    /// Reconciliation of a rebuilt tree against the current one.
    pub const RECONCILE: &str = "lattice_semantics::reconcile";
    /// Per-frame tree construction from the render tree.
    pub const BUILD: &str = "lattice_semantics::build";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Semantics owner target.
    pub const OWNER: &str = "lattice_semantics_core::owner";
    /// Semantics node target.
    pub const NODE: &str = "lattice_semantics_core::node";
    /// Diff engine target.
    pub const DIFF: &str = "lattice_semantics_core::diff";
    /// Tree builder target.
    pub const BUILDER: &str = "lattice_semantics::builder";
    /// Platform binding target.
    pub const BINDING: &str = "lattice_semantics::binding";
    /// AccessKit bridge target.
    pub const ACCESSKIT: &str = "lattice_semantics::accesskit";
}

/// Style options for tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Compact representation without branch lines.
    Compact,
}

/// Configuration for tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Whether to show node ids.
    pub show_ids: bool,
    /// Whether to show roles.
    pub show_roles: bool,
    /// Whether to show flags and supported actions.
    pub show_flags: bool,
    /// Whether to show the bounding rectangle.
    pub show_rects: bool,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: true,
            show_roles: true,
            show_flags: false,
            show_rects: false,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Create options for detailed debugging output.
    pub fn detailed() -> Self {
        Self {
            show_flags: true,
            show_rects: true,
            ..Default::default()
        }
    }

    /// Create options for minimal output.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_roles: false,
            show_flags: false,
            show_rects: false,
            ..Default::default()
        }
    }
}

/// Debug utility for visualizing semantics trees.
#[derive(Debug, Clone, Default)]
pub struct SemanticsTreeDebug {
    options: TreeFormatOptions,
}

impl SemanticsTreeDebug {
    /// Create a new debug visualizer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a debug visualizer with custom options.
    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Format the tree currently held by `owner`.
    pub fn format_owner(&self, owner: &SemanticsOwner) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "Semantics Tree ({} nodes):", owner.node_count());
        match owner.root() {
            Some(root) => {
                let _ = self.write_tree(&root, &mut output);
            }
            None => output.push_str("  (empty)\n"),
        }
        output
    }

    /// Format the subtree rooted at `root`.
    pub fn format_tree(&self, root: &SemanticsNode) -> String {
        let mut output = String::new();
        let _ = self.write_tree(root, &mut output);
        output
    }

    /// Write the subtree rooted at `root` into `out`.
    pub fn write_tree<W: FmtWrite>(&self, root: &SemanticsNode, out: &mut W) -> fmt::Result {
        let mut open_levels = Vec::new();
        self.write_subtree(root, 0, true, &mut open_levels, out)
    }

    /// A `Display` adapter for the subtree rooted at `root`.
    pub fn display<'a>(&'a self, root: &'a SemanticsNode) -> DisplayTree<'a> {
        DisplayTree { debug: self, root }
    }

    fn write_subtree<W: FmtWrite>(
        &self,
        node: &SemanticsNode,
        depth: usize,
        is_last: bool,
        open_levels: &mut Vec<bool>,
        out: &mut W,
    ) -> fmt::Result {
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return Ok(());
        }

        self.write_prefix(depth, is_last, open_levels, out)?;
        self.write_label(node, out)?;
        out.write_char('\n')?;

        let children = node.children();
        let count = children.len();
        if depth > 0 {
            open_levels.push(!is_last);
        }
        for (i, child) in children.iter().enumerate() {
            self.write_subtree(child, depth + 1, i + 1 == count, open_levels, out)?;
        }
        if depth > 0 {
            open_levels.pop();
        }
        Ok(())
    }

    fn write_prefix<W: FmtWrite>(
        &self,
        depth: usize,
        is_last: bool,
        open_levels: &[bool],
        out: &mut W,
    ) -> fmt::Result {
        if depth == 0 {
            return Ok(());
        }

        let (branch, tee, corner) = match self.options.style {
            TreeStyle::Ascii => ("|", "+--", "`--"),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500}", "\u{2514}\u{2500}\u{2500}"),
            TreeStyle::Compact => ("", "-", "-"),
        };

        for &open in open_levels {
            out.write_str(if open { branch } else { " " })?;
            for _ in 0..self.options.indent_size {
                out.write_char(' ')?;
            }
        }
        out.write_str(if is_last { corner } else { tee })?;
        out.write_char(' ')
    }

    fn write_label<W: FmtWrite>(&self, node: &SemanticsNode, out: &mut W) -> fmt::Result {
        let rect = node.rect();
        node.read_config(|config| {
            let props = &config.properties;
            if self.options.show_roles {
                write!(out, "{} ", props.role)?;
            }

            let text = if !props.label.is_empty() {
                props.label.as_str()
            } else {
                props.value.as_str()
            };
            if text.is_empty() {
                out.write_str("(unlabeled)")?;
            } else {
                write!(out, "{text:?}")?;
            }

            if self.options.show_ids {
                write!(out, " [{}]", node.id())?;
            }
            if self.options.show_flags {
                if !props.flags.is_empty() {
                    write!(out, " flags={:?}", props.flags)?;
                }
                let actions = config.supported_actions();
                if !actions.is_empty() {
                    write!(out, " actions={actions:?}")?;
                }
            }
            if self.options.show_rects {
                write!(
                    out,
                    " @({}, {}, {}x{})",
                    rect.left(),
                    rect.top(),
                    rect.width(),
                    rect.height()
                )?;
            }
            if node.is_dirty() {
                out.write_str(" *")?;
            }
            Ok(())
        })
    }
}

/// `Display` adapter returned by [`SemanticsTreeDebug::display`].
pub struct DisplayTree<'a> {
    debug: &'a SemanticsTreeDebug,
    root: &'a SemanticsNode,
}

impl fmt::Display for DisplayTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.debug.write_tree(self.root, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SemanticsConfiguration;
    use crate::geometry::Rect;
    use crate::node::NodeId;
    use crate::properties::{SemanticsFlags, SemanticsRole};

    fn node(id: u64, label: &str, role: SemanticsRole) -> SemanticsNode {
        let mut config = SemanticsConfiguration::new();
        config.properties.label = label.into();
        config.properties.role = role;
        let node = SemanticsNode::with_config(NodeId::new(id), Rect::new(0.0, 0.0, 10.0, 10.0), config);
        node.clear_dirty();
        node
    }

    fn sample() -> SemanticsNode {
        let root = node(1, "window", SemanticsRole::None);
        let list = node(2, "items", SemanticsRole::List);
        list.add_child(&node(3, "first", SemanticsRole::ListItem));
        root.add_child(&list);
        root.add_child(&node(4, "OK", SemanticsRole::Button));
        root
    }

    #[test]
    fn test_tree_format_single() {
        let output = SemanticsTreeDebug::new().format_tree(&node(7, "Play", SemanticsRole::Button));
        assert_eq!(output, "button \"Play\" [#7]\n");
    }

    #[test]
    fn test_tree_format_hierarchy() {
        let output = SemanticsTreeDebug::new().format_tree(&sample());
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("none \"window\""));
        assert!(lines[1].starts_with("\u{251c}\u{2500}\u{2500} list"));
        assert!(lines[2].contains("listItem \"first\" [#3]"));
        assert!(lines[2].starts_with("\u{2502}"));
        assert!(lines[3].starts_with("\u{2514}\u{2500}\u{2500} button"));
    }

    #[test]
    fn test_tree_format_minimal() {
        let output = SemanticsTreeDebug::with_options(TreeFormatOptions::minimal())
            .format_tree(&node(7, "test", SemanticsRole::Button));
        assert!(output.contains("\"test\""));
        assert!(!output.contains("button"));
        assert!(!output.contains('['));
    }

    #[test]
    fn test_tree_format_detailed_and_dirty() {
        let n = node(9, "Agree", SemanticsRole::Checkbox);
        n.update_config(|c| c.properties.flags = SemanticsFlags::IS_CHECKED);
        n.mark_dirty();
        let output = SemanticsTreeDebug::with_options(TreeFormatOptions::detailed()).format_tree(&n);
        assert!(output.contains("IS_CHECKED"));
        assert!(output.contains("@(0, 0, 10x10)"));
        assert!(output.trim_end().ends_with('*'));
    }

    #[test]
    fn test_max_depth() {
        let options = TreeFormatOptions {
            max_depth: Some(1),
            style: TreeStyle::Ascii,
            ..Default::default()
        };
        let output = SemanticsTreeDebug::with_options(options).format_tree(&sample());
        assert!(!output.contains("first"));
        assert!(output.contains("+-- list"));
        assert!(output.contains("`-- button"));
    }

    #[test]
    fn test_display_adapter() {
        let debug = SemanticsTreeDebug::new();
        let root = sample();
        assert_eq!(debug.display(&root).to_string(), debug.format_tree(&root));
    }

    #[test]
    fn test_format_empty_owner() {
        let owner = SemanticsOwner::new();
        let output = SemanticsTreeDebug::new().format_owner(&owner);
        assert!(output.contains("Semantics Tree (0 nodes)"));
        assert!(output.contains("(empty)"));
    }
}
