//! The rendezvous point between the semantics owner and the platform.
//!
//! Platform glue and the semantics owner come up at different times: the
//! native side may enable accessibility or install its send function before
//! the first frame creates an owner. [`SemanticsBinding`] holds whichever
//! pieces exist and wires them together as they arrive.
//!
//! Updates flow owner → binding → send function, and are dropped while the
//! binding is disabled, when no send function is installed, or when they are
//! empty. Action requests flow platform → binding → interceptor → owner.
//!
//! There is no process-wide instance; hosts create one binding per window
//! (or per test) and share it by cloning.

use std::fmt;
use std::sync::{Arc, Weak};

use lattice_semantics_core::logging::targets;
use lattice_semantics_core::{
    ActionArgs, BridgeError, NodeId, SemanticsAction, SemanticsNode, SemanticsOwner,
    SemanticsUpdate,
};
use parking_lot::RwLock;

use crate::builder::{BuilderOptions, RenderSemantics, SemanticsTreeBuilder};

/// Delivers an update to the native accessibility service.
pub type SendFunction = Arc<dyn Fn(&SemanticsUpdate) -> Result<(), BridgeError> + Send + Sync>;

/// Intercepts action requests before they reach the owner.
///
/// Returning `true` marks the action as handled.
pub type ActionInterceptor = Arc<dyn Fn(NodeId, SemanticsAction, &ActionArgs) -> bool + Send + Sync>;

#[derive(Default)]
struct BindingState {
    owner: Option<Arc<SemanticsOwner>>,
    enabled: bool,
    send_fn: Option<SendFunction>,
    action_fn: Option<ActionInterceptor>,
    builder_options: BuilderOptions,
}

#[derive(Default)]
struct BindingInner {
    state: RwLock<BindingState>,
}

impl BindingInner {
    fn send_update(&self, update: SemanticsUpdate) {
        let (enabled, send_fn) = {
            let state = self.state.read();
            (state.enabled, state.send_fn.clone())
        };

        if !enabled {
            tracing::trace!(target: targets::BINDING, "accessibility disabled, dropping update");
            return;
        }
        let Some(send_fn) = send_fn else {
            tracing::trace!(target: targets::BINDING, "no send function, dropping update");
            return;
        };
        if update.is_empty() {
            return;
        }

        if let Err(err) = send_fn(&update) {
            tracing::warn!(
                target: targets::BINDING,
                error = %err,
                updates = update.updates.len(),
                removals = update.removals.len(),
                "failed to deliver semantics update"
            );
        }
    }

    fn owner_if_enabled(&self) -> Option<Arc<SemanticsOwner>> {
        let state = self.state.read();
        if state.enabled { state.owner.clone() } else { None }
    }
}

/// Connects a [`SemanticsOwner`] to the platform accessibility service.
#[derive(Clone, Default)]
pub struct SemanticsBinding {
    inner: Arc<BindingInner>,
}

impl SemanticsBinding {
    /// Create a disabled binding with no owner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `owner`, routing its updates through this binding.
    ///
    /// The previous owner, if any, is detached. When accessibility is
    /// already enabled, a full update is sent right away.
    pub fn set_owner(&self, owner: Option<Arc<SemanticsOwner>>) {
        let (enabled, previous) = {
            let mut state = self.inner.state.write();
            let previous = std::mem::replace(&mut state.owner, owner.clone());
            (state.enabled, previous)
        };

        if let Some(previous) = previous {
            previous.clear_update_callback();
        }
        let Some(owner) = owner else {
            return;
        };

        let weak: Weak<BindingInner> = Arc::downgrade(&self.inner);
        owner.set_update_callback(move |update| {
            if let Some(inner) = weak.upgrade() {
                inner.send_update(update);
            }
        });
        tracing::debug!(target: targets::BINDING, enabled, "semantics owner attached");

        if enabled {
            owner.send_full_update();
        }
    }

    /// The attached owner.
    pub fn owner(&self) -> Option<Arc<SemanticsOwner>> {
        self.inner.state.read().owner.clone()
    }

    /// Enable or disable delivery of updates.
    ///
    /// Turning accessibility on sends a full update.
    pub fn set_enabled(&self, enabled: bool) {
        let (was_enabled, owner) = {
            let mut state = self.inner.state.write();
            let was_enabled = std::mem::replace(&mut state.enabled, enabled);
            (was_enabled, state.owner.clone())
        };

        if was_enabled != enabled {
            tracing::debug!(target: targets::BINDING, enabled, "accessibility toggled");
        }
        if enabled && !was_enabled {
            if let Some(owner) = owner {
                owner.send_full_update();
            }
        }
    }

    /// Whether updates are delivered.
    pub fn is_enabled(&self) -> bool {
        self.inner.state.read().enabled
    }

    /// Install the function that delivers updates to the platform.
    pub fn set_send_function<F>(&self, send: F)
    where
        F: Fn(&SemanticsUpdate) -> Result<(), BridgeError> + Send + Sync + 'static,
    {
        self.inner.state.write().send_fn = Some(Arc::new(send));
    }

    /// Remove the send function. Updates are dropped until a new one is set.
    pub fn clear_send_function(&self) {
        self.inner.state.write().send_fn = None;
    }

    /// Install an interceptor that sees every action before the owner.
    pub fn set_action_callback<F>(&self, callback: F)
    where
        F: Fn(NodeId, SemanticsAction, &ActionArgs) -> bool + Send + Sync + 'static,
    {
        self.inner.state.write().action_fn = Some(Arc::new(callback));
    }

    /// Remove the action interceptor.
    pub fn clear_action_callback(&self) {
        self.inner.state.write().action_fn = None;
    }

    /// Options used by [`flush_frame`](Self::flush_frame).
    pub fn set_builder_options(&self, options: BuilderOptions) {
        self.inner.state.write().builder_options = options;
    }

    /// Route an action request from the platform.
    ///
    /// The interceptor gets the first chance; otherwise the owner dispatches
    /// to the node's handler. Returns whether anyone handled the action.
    pub fn handle_action(&self, id: NodeId, action: SemanticsAction, args: &ActionArgs) -> bool {
        let (action_fn, owner) = {
            let state = self.inner.state.read();
            (state.action_fn.clone(), state.owner.clone())
        };

        if action_fn.is_some_and(|intercept| intercept(id, action, args)) {
            return true;
        }
        owner.is_some_and(|owner| owner.perform_action(id, action, args))
    }

    /// Send the whole tree, e.g. after the platform side was reset.
    pub fn request_full_update(&self) {
        if let Some(owner) = self.inner.owner_if_enabled() {
            owner.send_full_update();
        }
    }

    /// Send pending incremental changes.
    pub fn flush_semantics(&self) {
        if let Some(owner) = self.inner.owner_if_enabled() {
            owner.send_semantics_update();
        }
    }

    /// Rebuild the tree from `render_root`, reconcile it and send the changes.
    ///
    /// The tree is kept current even while disabled so actions keep
    /// resolving; only delivery is skipped. Returns the reconciled diff, or
    /// `None` without an owner.
    #[tracing::instrument(skip_all, target = "lattice_semantics::binding", level = "trace")]
    pub fn flush_frame(&self, render_root: &dyn RenderSemantics) -> Option<SemanticsUpdate> {
        let (owner, options, enabled) = {
            let state = self.inner.state.read();
            (state.owner.clone()?, state.builder_options.clone(), state.enabled)
        };

        let root = SemanticsTreeBuilder::with_options(&owner, options).build(render_root);
        let diff = owner.reconcile(root);
        if enabled {
            owner.send_semantics_update();
        }
        Some(diff)
    }

    /// Mark `node` dirty in the attached owner.
    pub fn mark_node_dirty(&self, node: &SemanticsNode) {
        if let Some(owner) = self.owner() {
            owner.mark_dirty(node);
        }
    }

    /// Look up a node in the attached owner.
    pub fn find_node_by_id(&self, id: NodeId) -> Option<SemanticsNode> {
        self.owner()?.find_node_by_id(id)
    }
}

impl fmt::Debug for SemanticsBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("SemanticsBinding")
            .field("enabled", &state.enabled)
            .field("has_owner", &state.owner.is_some())
            .field("has_send_function", &state.send_fn.is_some())
            .field("has_action_callback", &state.action_fn.is_some())
            .finish()
    }
}

static_assertions::assert_impl_all!(SemanticsBinding: Send, Sync);

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use lattice_semantics_core::{Rect, SemanticsConfiguration};
    use parking_lot::Mutex;

    use super::*;

    fn recording_binding() -> (SemanticsBinding, Arc<Mutex<Vec<SemanticsUpdate>>>) {
        let binding = SemanticsBinding::new();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&sent);
        binding.set_send_function(move |update| {
            sink.lock().push(update.clone());
            Ok(())
        });
        (binding, sent)
    }

    fn owner_with_root() -> (Arc<SemanticsOwner>, SemanticsNode) {
        let owner = Arc::new(SemanticsOwner::new());
        let root = owner.create_node();
        root.update_config(|c| c.properties.label = "root".into());
        owner.set_root(Some(root.clone()));
        (owner, root)
    }

    #[test]
    fn test_disabled_binding_drops_updates() {
        let (binding, sent) = recording_binding();
        let (owner, root) = owner_with_root();
        binding.set_owner(Some(Arc::clone(&owner)));

        owner.mark_dirty(&root);
        owner.send_semantics_update();
        assert!(sent.lock().is_empty());
    }

    #[test]
    fn test_enabling_sends_full_update() {
        let (binding, sent) = recording_binding();
        let (owner, root) = owner_with_root();
        binding.set_owner(Some(owner));

        binding.set_enabled(true);
        assert_eq!(sent.lock().len(), 1);
        assert_eq!(sent.lock()[0].updates[0].id, root.id());

        // Already on: no second full update.
        binding.set_enabled(true);
        assert_eq!(sent.lock().len(), 1);
    }

    #[test]
    fn test_attaching_owner_while_enabled_sends_full_update() {
        let (binding, sent) = recording_binding();
        binding.set_enabled(true);
        assert!(sent.lock().is_empty());

        let (owner, _root) = owner_with_root();
        binding.set_owner(Some(owner));
        assert_eq!(sent.lock().len(), 1);
    }

    #[test]
    fn test_flush_semantics() {
        let (binding, sent) = recording_binding();
        let (owner, root) = owner_with_root();
        binding.set_owner(Some(Arc::clone(&owner)));
        binding.set_enabled(true);

        root.update_config(|c| c.properties.value = "changed".into());
        binding.mark_node_dirty(&root);
        binding.flush_semantics();

        let batches = sent.lock();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].updates[0].value, "changed");
    }

    #[test]
    fn test_send_failure_is_logged_and_dropped() {
        let binding = SemanticsBinding::new();
        binding.set_send_function(|_| Err(BridgeError::Disconnected));
        let (owner, root) = owner_with_root();
        binding.set_owner(Some(Arc::clone(&owner)));
        binding.set_enabled(true);

        owner.mark_dirty(&root);
        binding.flush_semantics();
        assert!(!owner.has_dirty_nodes());
    }

    #[test]
    fn test_handle_action_prefers_interceptor() {
        let binding = SemanticsBinding::new();
        let owner = Arc::new(SemanticsOwner::new());
        let handled_by_node = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&handled_by_node);

        let mut config = SemanticsConfiguration::new();
        config
            .actions_mut()
            .set_handler(SemanticsAction::Tap, move |_| flag.store(true, Ordering::SeqCst));
        let node = SemanticsNode::with_config(NodeId::new(42), Rect::ZERO, config);
        owner.set_root(Some(node));
        binding.set_owner(Some(owner));

        binding.set_action_callback(|_, action, _| action == SemanticsAction::Dismiss);
        assert!(binding.handle_action(NodeId::new(42), SemanticsAction::Dismiss, &ActionArgs::None));
        assert!(!handled_by_node.load(Ordering::SeqCst));

        assert!(binding.handle_action(NodeId::new(42), SemanticsAction::Tap, &ActionArgs::None));
        assert!(handled_by_node.load(Ordering::SeqCst));
        assert!(!binding.handle_action(NodeId::new(99), SemanticsAction::Tap, &ActionArgs::None));
    }

    #[test]
    fn test_no_owner_is_harmless() {
        let binding = SemanticsBinding::new();
        binding.set_enabled(true);
        binding.flush_semantics();
        binding.request_full_update();
        assert!(!binding.handle_action(NodeId::new(1), SemanticsAction::Tap, &ActionArgs::None));
        assert!(binding.find_node_by_id(NodeId::new(1)).is_none());
    }

    #[test]
    fn test_replacing_owner_detaches_previous() {
        let (binding, sent) = recording_binding();
        binding.set_enabled(true);
        let (first, first_root) = owner_with_root();
        binding.set_owner(Some(Arc::clone(&first)));
        let (second, _) = owner_with_root();
        binding.set_owner(Some(second));
        let before = sent.lock().len();

        first.mark_dirty(&first_root);
        first.send_semantics_update();
        assert_eq!(sent.lock().len(), before);
    }
}
