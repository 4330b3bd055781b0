//! The semantics owner: root holder, id index, dirty set and emission.
//!
//! A [`SemanticsOwner`] holds the current semantics tree and is the single
//! point through which the platform reaches it. Tree construction and
//! emission happen on the UI thread, while action requests from the native
//! accessibility service may arrive on any thread, so all state sits behind
//! one `RwLock`.
//!
//! # Emission
//!
//! [`send_semantics_update`](SemanticsOwner::send_semantics_update) and
//! [`send_full_update`](SemanticsOwner::send_full_update) snapshot and clear
//! under the write lock, release it, and only then invoke the update
//! callback. The callback may therefore mutate the tree (or mark nodes
//! dirty) without deadlocking. A node marked dirty concurrently with an
//! emission either lands in the snapshot or survives to the next one.
//!
//! # Stable ids
//!
//! Render objects are rebuilt wholesale each frame, but native services key
//! nodes by id. [`get_stable_id`](SemanticsOwner::get_stable_id) maps an
//! opaque [`StableKey`] to an id that never changes for the owner's
//! lifetime. Stable ids and fresh ids from
//! [`create_node`](SemanticsOwner::create_node) come from the same
//! allocator and never collide.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::actions::{ActionArgs, SemanticsAction};
use crate::logging::{span_names, targets};
use crate::node::{NodeId, NodeIdAllocator, NodeRef, SemanticsNode};
use crate::tree::{SemanticsNodeUpdate, SemanticsUpdate, compute_diff};

/// Opaque identity of a render object, used to issue stable node ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StableKey(u64);

impl StableKey {
    /// Create a key from a raw render-object identity.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw key value.
    #[inline]
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for StableKey {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Callback receiving each emitted batch.
pub type UpdateCallback = Arc<dyn Fn(SemanticsUpdate) + Send + Sync>;

#[derive(Default)]
struct OwnerState {
    root: Option<SemanticsNode>,
    nodes_by_id: HashMap<NodeId, SemanticsNode>,
    dirty_set: HashSet<NodeRef>,
    dirty_order: Vec<SemanticsNode>,
    stable_ids: HashMap<StableKey, NodeId>,
    pending_removals: Vec<NodeId>,
    on_update: Option<UpdateCallback>,
}

impl OwnerState {
    fn rebuild_index(&mut self) {
        self.nodes_by_id.clear();
        if let Some(root) = &self.root {
            let index = &mut self.nodes_by_id;
            root.visit(|node| {
                index.insert(node.id(), node.clone());
                true
            });
        }
    }

    fn mark_dirty(&mut self, node: &SemanticsNode) {
        node.mark_dirty();
        if self.dirty_set.insert(NodeRef(node.clone())) {
            self.dirty_order.push(node.clone());
        }
    }

    fn take_dirty(&mut self) -> Vec<SemanticsNode> {
        self.dirty_set.clear();
        std::mem::take(&mut self.dirty_order)
    }

    /// The callback, if an emission is possible at all.
    fn emission_callback(&self) -> Option<UpdateCallback> {
        let callback = self.on_update.as_ref()?;
        if self.root.is_none() && self.pending_removals.is_empty() {
            return None;
        }
        Some(Arc::clone(callback))
    }
}

/// Holds the semantics tree and mediates all access to it.
pub struct SemanticsOwner {
    allocator: NodeIdAllocator,
    state: RwLock<OwnerState>,
}

impl SemanticsOwner {
    /// Create an owner with its own id allocator.
    pub fn new() -> Self {
        Self::with_allocator(NodeIdAllocator::new())
    }

    /// Create an owner that issues ids from `allocator`.
    pub fn with_allocator(allocator: NodeIdAllocator) -> Self {
        Self {
            allocator,
            state: RwLock::new(OwnerState::default()),
        }
    }

    /// The allocator backing this owner's ids.
    pub fn allocator(&self) -> &NodeIdAllocator {
        &self.allocator
    }

    /// Create a node with a fresh id from this owner's allocator.
    pub fn create_node(&self) -> SemanticsNode {
        SemanticsNode::new(&self.allocator)
    }

    /// The stable id for `key`, allocating one on first use.
    ///
    /// The mapping is permanent: entries are never removed, so an id is never
    /// reissued to a different logical node.
    pub fn get_stable_id(&self, key: StableKey) -> NodeId {
        if let Some(id) = self.state.read().stable_ids.get(&key) {
            return *id;
        }
        let mut state = self.state.write();
        *state
            .stable_ids
            .entry(key)
            .or_insert_with(|| self.allocator.next_id())
    }

    /// Register the callback that receives emitted batches.
    pub fn set_update_callback<F>(&self, callback: F)
    where
        F: Fn(SemanticsUpdate) + Send + Sync + 'static,
    {
        self.state.write().on_update = Some(Arc::new(callback));
    }

    /// Remove the update callback. Later emissions become no-ops.
    pub fn clear_update_callback(&self) {
        self.state.write().on_update = None;
    }

    /// Replace the root and rebuild the id index.
    ///
    /// The previous tree is discarded. Pass `None` to clear the tree.
    pub fn set_root(&self, root: Option<SemanticsNode>) {
        let _span = tracing::trace_span!(target: targets::OWNER, span_names::SET_ROOT).entered();
        let mut state = self.state.write();
        state.root = root;
        state.rebuild_index();
        tracing::trace!(target: targets::OWNER, nodes = state.nodes_by_id.len(), "semantics root replaced");
    }

    /// The current root.
    pub fn root(&self) -> Option<SemanticsNode> {
        self.state.read().root.clone()
    }

    /// Number of nodes in the current tree.
    pub fn node_count(&self) -> usize {
        self.state.read().nodes_by_id.len()
    }

    /// Look up a node of the current tree by id.
    pub fn find_node_by_id(&self, id: NodeId) -> Option<SemanticsNode> {
        self.state.read().nodes_by_id.get(&id).cloned()
    }

    /// Mark `node` as changed so the next incremental update carries it.
    pub fn mark_dirty(&self, node: &SemanticsNode) {
        self.state.write().mark_dirty(node);
    }

    /// Whether any node is waiting to be emitted.
    pub fn has_dirty_nodes(&self) -> bool {
        !self.state.read().dirty_set.is_empty()
    }

    /// Clear the dirty set and the dirty bit of every node in it.
    pub fn clear_dirty_nodes(&self) {
        let mut state = self.state.write();
        for node in state.take_dirty() {
            node.clear_dirty();
        }
    }

    /// Emit the dirty nodes, plus any queued removals.
    ///
    /// No-op without a callback, or without a root when no removals are
    /// queued. The callback is not invoked when there is nothing to send.
    pub fn send_semantics_update(&self) {
        let _span =
            tracing::trace_span!(target: targets::OWNER, span_names::EMIT, kind = "incremental")
                .entered();
        let (callback, update) = {
            let mut state = self.state.write();
            let Some(callback) = state.emission_callback() else {
                return;
            };
            let dirty = state.take_dirty();
            let updates = dirty
                .iter()
                .map(|node| {
                    let record = SemanticsNodeUpdate::from_node(node);
                    node.clear_dirty();
                    record
                })
                .collect();
            let removals = std::mem::take(&mut state.pending_removals);
            (callback, SemanticsUpdate { updates, removals })
        };

        emit(callback, update, "incremental");
    }

    /// Emit every node of the current tree, plus any queued removals.
    ///
    /// Clears all dirty bits and the dirty set. Used for first paint and to
    /// resynchronize after the platform side was reset.
    pub fn send_full_update(&self) {
        let _span =
            tracing::trace_span!(target: targets::OWNER, span_names::EMIT, kind = "full").entered();
        let (callback, update) = {
            let mut state = self.state.write();
            let Some(callback) = state.emission_callback() else {
                return;
            };
            let mut updates = Vec::with_capacity(state.nodes_by_id.len());
            if let Some(root) = &state.root {
                root.visit(|node| {
                    updates.push(SemanticsNodeUpdate::from_node(node));
                    node.clear_dirty();
                    true
                });
            }
            for node in state.take_dirty() {
                node.clear_dirty();
            }
            let removals = std::mem::take(&mut state.pending_removals);
            (callback, SemanticsUpdate { updates, removals })
        };

        emit(callback, update, "full");
    }

    /// Dispatch `action` to the node with `id`.
    ///
    /// Returns `false` if the node does not exist (e.g. a stale request for a
    /// removed node) or has no handler for `action`.
    pub fn perform_action(&self, id: NodeId, action: SemanticsAction, args: &ActionArgs) -> bool {
        let Some(node) = self.find_node_by_id(id) else {
            tracing::trace!(target: targets::OWNER, %id, %action, "action for unknown node");
            return false;
        };
        node.perform_action(action, args)
    }

    /// Replace the tree with `new_root`, scheduling exactly what changed.
    ///
    /// Every added or modified node of the new tree is marked dirty and every
    /// removed id is queued for the next emission. Nodes marked dirty but not
    /// yet emitted stay dirty when their id survives into the new tree, even
    /// if the rebuilt node compares equal. Returns the computed diff.
    pub fn reconcile(&self, new_root: Option<SemanticsNode>) -> SemanticsUpdate {
        let _span = tracing::trace_span!(target: targets::OWNER, span_names::RECONCILE).entered();
        let mut state = self.state.write();
        let old_root = std::mem::replace(&mut state.root, new_root);
        let diff = compute_diff(old_root.as_ref(), state.root.as_ref());
        state.rebuild_index();

        // Unsent changes carry over to the node that replaces them.
        let pending = state.take_dirty();
        for node in &pending {
            node.clear_dirty();
        }
        if let Some(root) = &state.root {
            root.visit(|node| {
                node.clear_dirty();
                true
            });
        }
        let carried = pending.iter().map(SemanticsNode::id);
        let changed = diff.updates.iter().map(|update| update.id);
        for id in carried.chain(changed) {
            if let Some(node) = state.nodes_by_id.get(&id).cloned() {
                state.mark_dirty(&node);
            }
        }

        let OwnerState {
            nodes_by_id,
            pending_removals,
            ..
        } = &mut *state;
        pending_removals.retain(|id| !nodes_by_id.contains_key(id));
        for id in &diff.removals {
            if !pending_removals.contains(id) {
                pending_removals.push(*id);
            }
        }

        tracing::debug!(
            target: targets::OWNER,
            updates = diff.updates.len(),
            removals = diff.removals.len(),
            "reconciled semantics tree"
        );
        diff
    }
}

impl Default for SemanticsOwner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SemanticsOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("SemanticsOwner")
            .field("root", &state.root.as_ref().map(SemanticsNode::id))
            .field("nodes", &state.nodes_by_id.len())
            .field("dirty", &state.dirty_set.len())
            .field("stable_ids", &state.stable_ids.len())
            .field("pending_removals", &state.pending_removals.len())
            .finish()
    }
}

fn emit(callback: UpdateCallback, update: SemanticsUpdate, kind: &'static str) {
    if update.is_empty() {
        tracing::debug!(target: targets::OWNER, kind, "nothing to emit");
        return;
    }
    tracing::debug!(
        target: targets::OWNER,
        kind,
        updates = update.updates.len(),
        removals = update.removals.len(),
        "emitting semantics update"
    );
    callback(update);
}

static_assertions::assert_impl_all!(SemanticsOwner: Send, Sync);
