//! AccessKit integration.
//!
//! [`AccessKitBridge`] translates [`SemanticsUpdate`] batches into
//! [`accesskit::TreeUpdate`]s and AccessKit action requests back into
//! semantics actions. It is stateful: the first update after creation or
//! [`reset`](AccessKitBridge::reset) carries the tree root, and focus is
//! tracked across batches.
//!
//! AccessKit has no explicit removal; a node disappears once no parent lists
//! it as a child. Removals are therefore only used to move focus off a node
//! that is going away.
//!
//! # Wiring
//!
//! ```ignore
//! let bridge = AccessKitBridge::new();
//! binding.set_send_function(bridge.into_send_function(move |tree_update| {
//!     adapter.update_if_active(|| tree_update);
//!     Ok(())
//! }));
//!
//! // In the adapter's action handler:
//! AccessKitBridge::dispatch(&binding, &request);
//! ```

use std::sync::Arc;

use accesskit::{
    Action, ActionData, ActionRequest, CustomAction, Node, Role, Toggled, Tree, TreeUpdate,
};
use lattice_semantics_core::logging::targets;
use lattice_semantics_core::{
    ActionArgs, BridgeError, NodeId, Rect, SemanticsAction, SemanticsFlags, SemanticsNodeUpdate,
    SemanticsRole, SemanticsUpdate,
};
use parking_lot::Mutex;

use crate::binding::SemanticsBinding;

/// Convert an engine node id into an AccessKit node id.
#[inline]
pub fn to_accesskit_id(id: NodeId) -> accesskit::NodeId {
    accesskit::NodeId(id.as_raw())
}

/// Convert an AccessKit node id into an engine node id.
#[inline]
pub fn from_accesskit_id(id: accesskit::NodeId) -> NodeId {
    NodeId::new(id.0)
}

/// The AccessKit role announced for a node record.
pub fn accesskit_role(update: &SemanticsNodeUpdate) -> Role {
    let flags = update.flags;
    match update.role {
        SemanticsRole::Button => Role::Button,
        SemanticsRole::Checkbox => Role::CheckBox,
        SemanticsRole::Radio => Role::RadioButton,
        SemanticsRole::Switch => Role::Switch,
        SemanticsRole::TextField if flags.contains(SemanticsFlags::IS_OBSCURED) => {
            Role::PasswordInput
        }
        SemanticsRole::TextField if flags.contains(SemanticsFlags::IS_MULTILINE) => {
            Role::MultilineTextInput
        }
        SemanticsRole::TextField => Role::TextInput,
        SemanticsRole::Link => Role::Link,
        SemanticsRole::Image => Role::Image,
        SemanticsRole::Slider => Role::Slider,
        SemanticsRole::ProgressIndicator => Role::ProgressIndicator,
        SemanticsRole::Tab => Role::Tab,
        SemanticsRole::TabBar => Role::TabList,
        SemanticsRole::List => Role::List,
        SemanticsRole::ListItem => Role::ListItem,
        SemanticsRole::ScrollView => Role::ScrollView,
        SemanticsRole::Header => Role::Heading,
        SemanticsRole::Alert => Role::Alert,
        SemanticsRole::Menu => Role::Menu,
        SemanticsRole::MenuItem => Role::MenuItem,
        SemanticsRole::Popup => Role::Dialog,
        SemanticsRole::None => role_from_flags(update),
    }
}

fn role_from_flags(update: &SemanticsNodeUpdate) -> Role {
    let flags = update.flags;
    if update.id.is_root() {
        Role::Window
    } else if flags.contains(SemanticsFlags::IS_BUTTON) {
        Role::Button
    } else if flags.contains(SemanticsFlags::IS_TEXT_FIELD) {
        Role::TextInput
    } else if flags.contains(SemanticsFlags::IS_SLIDER) {
        Role::Slider
    } else if flags.contains(SemanticsFlags::IS_IMAGE) {
        Role::Image
    } else if flags.contains(SemanticsFlags::IS_HEADER) {
        Role::Heading
    } else if !update.label.is_empty() && update.child_ids.is_empty() {
        Role::Label
    } else {
        Role::GenericContainer
    }
}

/// The AccessKit action exposing `action`, if there is one.
pub fn accesskit_action(action: SemanticsAction) -> Option<Action> {
    Some(match action {
        SemanticsAction::Tap => Action::Click,
        SemanticsAction::LongPress => Action::ShowContextMenu,
        SemanticsAction::ScrollLeft => Action::ScrollLeft,
        SemanticsAction::ScrollRight => Action::ScrollRight,
        SemanticsAction::ScrollUp => Action::ScrollUp,
        SemanticsAction::ScrollDown => Action::ScrollDown,
        SemanticsAction::Increase => Action::Increment,
        SemanticsAction::Decrease => Action::Decrement,
        SemanticsAction::ShowOnScreen => Action::ScrollIntoView,
        SemanticsAction::SetSelection => Action::SetTextSelection,
        SemanticsAction::SetText => Action::SetValue,
        SemanticsAction::Focus => Action::Focus,
        SemanticsAction::Unfocus => Action::Blur,
        SemanticsAction::CustomAction => Action::CustomAction,
        SemanticsAction::MoveCursorForwardByCharacter
        | SemanticsAction::MoveCursorBackwardByCharacter
        | SemanticsAction::MoveCursorForwardByWord
        | SemanticsAction::MoveCursorBackwardByWord
        | SemanticsAction::Copy
        | SemanticsAction::Cut
        | SemanticsAction::Paste
        | SemanticsAction::Dismiss => return None,
    })
}

/// The semantics action an AccessKit action requests, if there is one.
pub fn semantics_action(action: Action) -> Option<SemanticsAction> {
    Some(match action {
        Action::Click => SemanticsAction::Tap,
        Action::ShowContextMenu => SemanticsAction::LongPress,
        Action::ScrollLeft => SemanticsAction::ScrollLeft,
        Action::ScrollRight => SemanticsAction::ScrollRight,
        Action::ScrollUp => SemanticsAction::ScrollUp,
        Action::ScrollDown => SemanticsAction::ScrollDown,
        Action::Increment => SemanticsAction::Increase,
        Action::Decrement => SemanticsAction::Decrease,
        Action::ScrollIntoView => SemanticsAction::ShowOnScreen,
        Action::SetTextSelection => SemanticsAction::SetSelection,
        Action::SetValue | Action::ReplaceSelectedText => SemanticsAction::SetText,
        Action::Focus => SemanticsAction::Focus,
        Action::Blur => SemanticsAction::Unfocus,
        Action::CustomAction => SemanticsAction::CustomAction,
        _ => return None,
    })
}

/// Build the AccessKit node for a single record.
pub fn build_node(update: &SemanticsNodeUpdate) -> Node {
    let mut node = Node::new(accesskit_role(update));
    let flags = update.flags;

    node.set_bounds(accesskit_rect(update.rect));

    if !update.label.is_empty() {
        node.set_label(update.label.as_str());
    }
    if !update.value.is_empty() {
        node.set_value(update.value.as_str());
    }
    if !update.hint.is_empty() {
        node.set_description(update.hint.as_str());
    }

    for action in update.actions.actions() {
        if let Some(action) = accesskit_action(action) {
            node.add_action(action);
        }
    }
    if flags.contains(SemanticsFlags::IS_FOCUSABLE) {
        node.add_action(Action::Focus);
    }

    if !update.child_ids.is_empty() {
        node.set_children(
            update
                .child_ids
                .iter()
                .copied()
                .map(to_accesskit_id)
                .collect::<Vec<_>>(),
        );
    }

    if let Some(value) = update.current_value {
        node.set_numeric_value(value);
    }
    if let Some(min) = update.min_value {
        node.set_min_numeric_value(min);
    }
    if let Some(max) = update.max_value {
        node.set_max_numeric_value(max);
    }
    if let Some(position) = update.scroll_position {
        node.set_scroll_y(position);
    }
    if let Some(min) = update.scroll_extent_min {
        node.set_scroll_y_min(min);
    }
    if let Some(max) = update.scroll_extent_max {
        node.set_scroll_y_max(max);
    }
    if update.heading_level > 0 {
        node.set_level(usize::from(update.heading_level));
    }

    // Switches report toggled, checkboxes and radios report checked.
    if flags.contains(SemanticsFlags::HAS_TOGGLED_STATE) {
        node.set_toggled(toggled(flags.contains(SemanticsFlags::IS_TOGGLED)));
    } else if flags.contains(SemanticsFlags::HAS_CHECKED_STATE) {
        node.set_toggled(toggled(flags.contains(SemanticsFlags::IS_CHECKED)));
    }
    if flags.contains(SemanticsFlags::HAS_SELECTED_STATE) {
        node.set_selected(flags.contains(SemanticsFlags::IS_SELECTED));
    }
    if flags.contains(SemanticsFlags::HAS_EXPANDED_STATE) {
        node.set_expanded(flags.contains(SemanticsFlags::IS_EXPANDED));
    }
    if flags.contains(SemanticsFlags::HAS_ENABLED_STATE) && !flags.contains(SemanticsFlags::IS_ENABLED)
    {
        node.set_disabled();
    }
    if flags.contains(SemanticsFlags::IS_HIDDEN) {
        node.set_hidden();
    }
    if flags.contains(SemanticsFlags::IS_READ_ONLY) {
        node.set_read_only();
    }

    let custom_actions: Vec<CustomAction> = update
        .custom_actions
        .iter()
        .filter_map(|custom| match i32::try_from(custom.id) {
            Ok(id) => Some(CustomAction {
                id,
                description: custom.label.as_str().into(),
            }),
            Err(_) => {
                tracing::warn!(
                    target: targets::ACCESSKIT,
                    node = %update.id,
                    action_id = custom.id,
                    "custom action id out of range, skipped"
                );
                None
            }
        })
        .collect();
    if !custom_actions.is_empty() {
        node.set_custom_actions(custom_actions);
    }

    node
}

fn accesskit_rect(rect: Rect) -> accesskit::Rect {
    accesskit::Rect {
        x0: rect.left() as f64,
        y0: rect.top() as f64,
        x1: rect.right() as f64,
        y1: rect.bottom() as f64,
    }
}

#[inline]
fn toggled(on: bool) -> Toggled {
    if on { Toggled::True } else { Toggled::False }
}

/// Stateful translator between the engine and AccessKit.
#[derive(Debug, Clone)]
pub struct AccessKitBridge {
    root: NodeId,
    focus: NodeId,
    tree_sent: bool,
}

impl Default for AccessKitBridge {
    fn default() -> Self {
        Self::with_root(NodeId::ROOT)
    }
}

impl AccessKitBridge {
    /// A bridge for trees rooted at the synthetic root.
    pub fn new() -> Self {
        Self::default()
    }

    /// A bridge for trees rooted at `root`.
    pub fn with_root(root: NodeId) -> Self {
        Self {
            root,
            focus: root,
            tree_sent: false,
        }
    }

    /// The id announced as the tree root.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The node currently reported as focused.
    pub fn focus(&self) -> NodeId {
        self.focus
    }

    /// Forget what was sent. The next update announces the tree again.
    pub fn reset(&mut self) {
        self.tree_sent = false;
        self.focus = self.root;
    }

    /// Translate `update` into an AccessKit tree update.
    pub fn tree_update(&mut self, update: &SemanticsUpdate) -> TreeUpdate {
        if update.removals.contains(&self.focus) {
            self.focus = self.root;
        }

        let mut nodes = Vec::with_capacity(update.updates.len());
        for record in &update.updates {
            if record.flags.contains(SemanticsFlags::IS_FOCUSED) {
                self.focus = record.id;
            } else if record.id == self.focus {
                self.focus = self.root;
            }
            nodes.push((to_accesskit_id(record.id), build_node(record)));
        }

        let tree = if self.tree_sent {
            None
        } else {
            self.tree_sent = true;
            Some(Tree::new(to_accesskit_id(self.root)))
        };

        tracing::trace!(
            target: targets::ACCESSKIT,
            nodes = nodes.len(),
            full = tree.is_some(),
            focus = %self.focus,
            "built accesskit tree update"
        );

        TreeUpdate {
            nodes,
            tree,
            focus: to_accesskit_id(self.focus),
        }
    }

    /// Translate an AccessKit action request into a semantics action.
    ///
    /// Returns `None` for actions with no semantics counterpart or requests
    /// missing the data their action needs.
    pub fn action_request(request: &ActionRequest) -> Option<(NodeId, SemanticsAction, ActionArgs)> {
        let target = from_accesskit_id(request.target);
        let Some(action) = semantics_action(request.action) else {
            tracing::debug!(
                target: targets::ACCESSKIT,
                action = ?request.action,
                node = %target,
                "unsupported accesskit action"
            );
            return None;
        };

        let args = match (action, &request.data) {
            (SemanticsAction::SetText, Some(ActionData::Value(text))) => ActionArgs::SetText {
                text: text.to_string(),
            },
            (SemanticsAction::SetSelection, Some(ActionData::SetTextSelection(selection))) => {
                ActionArgs::SetSelection {
                    base: selection.anchor.character_index,
                    extent: selection.focus.character_index,
                }
            }
            (SemanticsAction::CustomAction, Some(ActionData::CustomAction(id))) => {
                ActionArgs::CustomAction {
                    action_id: i64::from(*id),
                }
            }
            (SemanticsAction::SetText | SemanticsAction::SetSelection | SemanticsAction::CustomAction, _) => {
                tracing::warn!(
                    target: targets::ACCESSKIT,
                    action = action.name(),
                    node = %target,
                    "accesskit action request is missing its data"
                );
                return None;
            }
            _ => ActionArgs::None,
        };

        Some((target, action, args))
    }

    /// Route an AccessKit action request through `binding`.
    pub fn dispatch(binding: &SemanticsBinding, request: &ActionRequest) -> bool {
        Self::action_request(request)
            .is_some_and(|(id, action, args)| binding.handle_action(id, action, &args))
    }

    /// Wrap the bridge into a send function for
    /// [`SemanticsBinding::set_send_function`].
    pub fn into_send_function<F>(
        self,
        deliver: F,
    ) -> impl Fn(&SemanticsUpdate) -> Result<(), BridgeError> + Send + Sync + 'static
    where
        F: Fn(TreeUpdate) -> Result<(), BridgeError> + Send + Sync + 'static,
    {
        let bridge = Arc::new(Mutex::new(self));
        move |update: &SemanticsUpdate| {
            let tree_update = bridge.lock().tree_update(update);
            deliver(tree_update)
        }
    }
}
