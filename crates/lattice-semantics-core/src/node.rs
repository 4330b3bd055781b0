//! Semantics tree nodes.
//!
//! A [`SemanticsNode`] is a cheap, thread-safe handle to a node in the
//! accessibility tree. Nodes are created fresh each frame for every render
//! boundary; a node from a previous frame with the same [`NodeId`] is never
//! mutated into the new one, it is simply discarded and the diff engine
//! compares the two by value.
//!
//! # Ownership
//!
//! The child list is the only ownership edge. The parent link is a weak
//! observation pointer that is written exclusively by
//! [`add_child`](SemanticsNode::add_child),
//! [`remove_child`](SemanticsNode::remove_child) and
//! [`clear_children`](SemanticsNode::clear_children), so it always reflects
//! current tree membership.
//!
//! # Locking
//!
//! Each node guards its data with its own `RwLock`. No method holds more than
//! one node lock at a time, and action handlers run after the lock has been
//! released so a handler may freely mutate the node it was invoked on.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde::Serialize;

use crate::actions::{ActionArgs, SemanticsAction};
use crate::config::SemanticsConfiguration;
use crate::geometry::Rect;
use crate::logging::targets;
use crate::properties::{SemanticsFlags, SemanticsProperties};

/// Identifies a semantics node, both inside the engine and on the platform.
///
/// Id `0` is reserved for the synthetic root and is never handed out by a
/// [`NodeIdAllocator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// The reserved id of the synthetic root node.
    pub const ROOT: NodeId = NodeId(0);

    /// Create a node id from a raw value.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric value, for interop with platform APIs.
    #[inline]
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    /// Whether this is the reserved synthetic root id.
    #[inline]
    pub const fn is_root(self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for NodeId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues monotonically increasing node ids, starting at 1.
///
/// Each [`SemanticsOwner`](crate::SemanticsOwner) owns one allocator, so
/// independent owners never share an id sequence.
#[derive(Debug)]
pub struct NodeIdAllocator {
    next: AtomicU64,
}

impl NodeIdAllocator {
    /// Create an allocator whose first id is 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next id.
    pub fn next_id(&self) -> NodeId {
        NodeId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// The id the next call to [`next_id`](Self::next_id) will return.
    pub fn peek(&self) -> NodeId {
        NodeId(self.next.load(Ordering::Relaxed))
    }
}

impl Default for NodeIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

struct NodeInner {
    id: NodeId,
    dirty: AtomicBool,
    data: RwLock<NodeData>,
}

struct NodeData {
    rect: Rect,
    config: SemanticsConfiguration,
    parent: Weak<NodeInner>,
    children: Vec<SemanticsNode>,
}

/// A node in the semantics tree.
///
/// Cloning a `SemanticsNode` clones the handle, not the node.
#[derive(Clone)]
pub struct SemanticsNode {
    inner: Arc<NodeInner>,
}

impl SemanticsNode {
    /// Create a node with a fresh id from `allocator`.
    pub fn new(allocator: &NodeIdAllocator) -> Self {
        Self::with_id(allocator.next_id())
    }

    /// Create a node with a specific id.
    ///
    /// Use this with stable ids so a render object keeps the same node id
    /// across frames.
    pub fn with_id(id: NodeId) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                id,
                dirty: AtomicBool::new(true),
                data: RwLock::new(NodeData {
                    rect: Rect::ZERO,
                    config: SemanticsConfiguration::default(),
                    parent: Weak::new(),
                    children: Vec::new(),
                }),
            }),
        }
    }

    /// Create a node with an id, bounds and configuration.
    pub fn with_config(id: NodeId, rect: Rect, config: SemanticsConfiguration) -> Self {
        let node = Self::with_id(id);
        {
            let mut data = node.inner.data.write();
            data.rect = rect;
            data.config = config;
        }
        node
    }

    /// The node id.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// The bounding rectangle in global coordinates.
    pub fn rect(&self) -> Rect {
        self.inner.data.read().rect
    }

    /// Set the bounding rectangle.
    pub fn set_rect(&self, rect: Rect) {
        self.inner.data.write().rect = rect;
    }

    /// A copy of the node's configuration.
    pub fn config(&self) -> SemanticsConfiguration {
        self.inner.data.read().config.clone()
    }

    /// A copy of the node's properties.
    pub fn properties(&self) -> SemanticsProperties {
        self.inner.data.read().config.properties.clone()
    }

    /// Replace the node's configuration.
    pub fn set_config(&self, config: SemanticsConfiguration) {
        self.inner.data.write().config = config;
    }

    /// Read the configuration in place.
    pub fn read_config<R>(&self, f: impl FnOnce(&SemanticsConfiguration) -> R) -> R {
        f(&self.inner.data.read().config)
    }

    /// Mutate the configuration in place.
    ///
    /// This does not mark the node dirty; call
    /// [`SemanticsOwner::mark_dirty`](crate::SemanticsOwner::mark_dirty) once
    /// `f` has returned so the change is emitted.
    ///
    /// The node's lock is held while `f` runs. Do not call into the owner
    /// from inside `f`: the owner locks itself before its nodes, so taking
    /// the two locks in the opposite order here can deadlock against a
    /// concurrent emission.
    pub fn update_config<R>(&self, f: impl FnOnce(&mut SemanticsConfiguration) -> R) -> R {
        f(&mut self.inner.data.write().config)
    }

    /// Whether a specific flag is set.
    pub fn has_flag(&self, flag: SemanticsFlags) -> bool {
        self.inner.data.read().config.properties.flags.contains(flag)
    }

    /// The parent node, if this node is attached to one that is still alive.
    pub fn parent(&self) -> Option<SemanticsNode> {
        self.inner
            .data
            .read()
            .parent
            .upgrade()
            .map(|inner| SemanticsNode { inner })
    }

    /// A snapshot of the child list.
    pub fn children(&self) -> Vec<SemanticsNode> {
        self.inner.data.read().children.clone()
    }

    /// The ids of the children, in order.
    pub fn child_ids(&self) -> Vec<NodeId> {
        self.inner
            .data
            .read()
            .children
            .iter()
            .map(SemanticsNode::id)
            .collect()
    }

    /// Number of direct children.
    pub fn child_count(&self) -> usize {
        self.inner.data.read().children.len()
    }

    /// Append `child`, detaching it from its current parent first.
    ///
    /// Adding a node to itself or to one of its own descendants would create
    /// a cycle; such calls are ignored.
    pub fn add_child(&self, child: &SemanticsNode) {
        if self.ptr_eq(child) || self.has_ancestor(child) {
            tracing::warn!(
                target: targets::NODE,
                parent = %self.id(),
                child = %child.id(),
                "refusing to add a node as a child of itself or its descendant"
            );
            return;
        }

        if let Some(previous) = child.parent() {
            previous.remove_child(child);
        }
        child.inner.data.write().parent = Arc::downgrade(&self.inner);
        self.inner.data.write().children.push(child.clone());
    }

    /// Remove `child` from this node's children.
    ///
    /// Returns `false` if `child` was not a child of this node.
    pub fn remove_child(&self, child: &SemanticsNode) -> bool {
        let removed = {
            let mut data = self.inner.data.write();
            match data.children.iter().position(|c| c.ptr_eq(child)) {
                Some(index) => {
                    data.children.remove(index);
                    true
                }
                None => false,
            }
        };
        if removed {
            child.inner.data.write().parent = Weak::new();
        }
        removed
    }

    /// Detach all children.
    pub fn clear_children(&self) {
        let children = std::mem::take(&mut self.inner.data.write().children);
        for child in children {
            child.inner.data.write().parent = Weak::new();
        }
    }

    /// Mark the node as needing to be sent to the platform.
    #[inline]
    pub fn mark_dirty(&self) {
        self.inner.dirty.store(true, Ordering::Release);
    }

    /// Whether the node needs to be sent to the platform.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.load(Ordering::Acquire)
    }

    /// Mark the node as clean.
    #[inline]
    pub fn clear_dirty(&self) {
        self.inner.dirty.store(false, Ordering::Release);
    }

    /// Perform an action through the node's action registry.
    ///
    /// Returns `false` if the node has no handler for `action`. The handler
    /// runs without any node lock held.
    pub fn perform_action(&self, action: SemanticsAction, args: &ActionArgs) -> bool {
        let handler = self
            .inner
            .data
            .read()
            .config
            .actions
            .as_ref()
            .and_then(|actions| actions.handler(action).cloned());

        match handler {
            Some(handler) => {
                tracing::trace!(target: targets::NODE, id = %self.id(), %action, "performing action");
                handler(args);
                true
            }
            None => false,
        }
    }

    /// Depth-first search of this subtree for a node with `id`.
    pub fn find_node_by_id(&self, id: NodeId) -> Option<SemanticsNode> {
        if self.id() == id {
            return Some(self.clone());
        }
        self.children()
            .iter()
            .find_map(|child| child.find_node_by_id(id))
    }

    /// Visit the subtree depth-first in pre-order.
    ///
    /// Returning `false` from `visitor` aborts the entire walk, not just the
    /// current subtree. Returns `false` if the walk was stopped early.
    pub fn visit<F>(&self, mut visitor: F) -> bool
    where
        F: FnMut(&SemanticsNode) -> bool,
    {
        self.visit_with(&mut visitor)
    }

    fn visit_with<F>(&self, visitor: &mut F) -> bool
    where
        F: FnMut(&SemanticsNode) -> bool,
    {
        if !visitor(self) {
            return false;
        }
        for child in self.children() {
            if !child.visit_with(visitor) {
                return false;
            }
        }
        true
    }

    /// Whether both handles point at the same node.
    #[inline]
    pub fn ptr_eq(&self, other: &SemanticsNode) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn has_ancestor(&self, candidate: &SemanticsNode) -> bool {
        let mut current = self.parent();
        while let Some(node) = current {
            if node.ptr_eq(candidate) {
                return true;
            }
            current = node.parent();
        }
        false
    }
}

impl fmt::Debug for SemanticsNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.inner.data.read();
        f.debug_struct("SemanticsNode")
            .field("id", &self.inner.id)
            .field("rect", &data.rect)
            .field("label", &data.config.properties.label)
            .field("role", &data.config.properties.role)
            .field("dirty", &self.is_dirty())
            .field("children", &data.children.len())
            .finish()
    }
}

/// Pointer-identity key for a node, used by the owner's dirty set.
///
/// Two distinct node instances with the same [`NodeId`] (e.g. from different
/// frames) are distinct keys.
#[derive(Clone)]
pub(crate) struct NodeRef(pub(crate) SemanticsNode);

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.0.ptr_eq(&other.0)
    }
}

impl Eq for NodeRef {}

impl Hash for NodeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0.inner).hash(state);
    }
}

static_assertions::assert_impl_all!(SemanticsNode: Send, Sync);
static_assertions::assert_impl_all!(NodeIdAllocator: Send, Sync);
