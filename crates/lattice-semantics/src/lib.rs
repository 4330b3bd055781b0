//! Lattice Semantics - accessibility semantics for retained-mode UIs.
//!
//! This is the umbrella crate. It re-exports the core engine and adds the
//! pieces that sit between a render tree and the platform:
//!
//! - [`SemanticsTreeBuilder`]: builds the semantics tree from render objects
//! - [`SemanticsBinding`]: connects an owner to the native accessibility service
//! - [`lint`]: accessibility checks over a finished tree
//! - `accesskit_bridge`: AccessKit tree updates and action requests
//!   (feature `accesskit`, on by default)
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use lattice_semantics::{SemanticsBinding, SemanticsOwner};
//!
//! let binding = SemanticsBinding::new();
//! binding.set_send_function(|update| {
//!     println!("{} changes", update.len());
//!     Ok(())
//! });
//! binding.set_owner(Some(Arc::new(SemanticsOwner::new())));
//! binding.set_enabled(true);
//! ```

pub use lattice_semantics_core::*;

mod binding;
mod builder;
pub mod lint;

#[cfg(feature = "accesskit")]
pub mod accesskit_bridge;

pub use binding::{ActionInterceptor, SemanticsBinding, SendFunction};
pub use builder::{BuilderOptions, DescribesSemantics, RenderSemantics, SemanticsTreeBuilder};
pub use lint::{LintOptions, LintResult, LintRule, Severity};

#[cfg(feature = "accesskit")]
pub use accesskit_bridge::AccessKitBridge;
