//! Core semantics engine for Lattice Semantics.
//!
//! This crate maintains the accessibility (semantics) tree of a retained-mode
//! UI and keeps a native accessibility service in sync with it:
//!
//! - **Value Types**: Roles, flags and per-node properties with a merge operator
//! - **Action Registry**: Per-node handlers for platform-invoked actions
//! - **Configuration**: What a render object contributes to the tree
//! - **Semantics Node**: Thread-safe tree nodes with dirty tracking
//! - **Semantics Owner**: Root holder, id index, stable ids and update emission
//! - **Diff Engine**: Pure comparison of two trees into an update batch
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use lattice_semantics_core::{
//!     ActionArgs, NodeId, SemanticsAction, SemanticsOwner, SemanticsRole,
//! };
//!
//! let owner = SemanticsOwner::new();
//! let sent = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&sent);
//! owner.set_update_callback(move |update| sink.lock().push(update));
//!
//! let button = owner.create_node();
//! button.update_config(|config| {
//!     config.properties.label = "Submit".into();
//!     config.properties.role = SemanticsRole::Button;
//!     config.actions_mut().set_handler(SemanticsAction::Tap, |_| println!("tapped"));
//! });
//! owner.set_root(Some(button.clone()));
//! owner.send_full_update();
//! assert_eq!(sent.lock().len(), 1);
//!
//! assert!(owner.perform_action(button.id(), SemanticsAction::Tap, &ActionArgs::None));
//! assert!(!owner.perform_action(NodeId::new(999), SemanticsAction::Tap, &ActionArgs::None));
//! ```

pub mod actions;
mod config;
mod error;
pub mod geometry;
pub mod logging;
mod node;
mod owner;
pub mod properties;
pub mod tree;

pub use actions::{ActionArgs, ActionHandler, ActionRegistry, SemanticsAction, SupportedActions};
pub use config::SemanticsConfiguration;
pub use error::{BridgeError, Result, SemanticsError};
pub use geometry::{Point, Rect, Size};
pub use logging::{SemanticsTreeDebug, TreeFormatOptions, TreeStyle};
pub use node::{NodeId, NodeIdAllocator, SemanticsNode};
pub use owner::{SemanticsOwner, StableKey, UpdateCallback};
pub use properties::{
    CustomSemanticsAction, SemanticsFlags, SemanticsProperties, SemanticsRole, TextSelection,
};
pub use tree::{
    SemanticsNodeUpdate, SemanticsUpdate, build_semantics_tree, compute_diff, flatten_tree,
};
