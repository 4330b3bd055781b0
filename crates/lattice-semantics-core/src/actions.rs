//! Accessibility actions and the per-node action registry.
//!
//! An [`ActionRegistry`] maps each [`SemanticsAction`] kind to a handler
//! closure. The registry is pure dispatch: handlers may mutate widget state
//! (a tap toggling a checkbox, a scroll moving a viewport), the registry has
//! no opinion about it.
//!
//! Handlers are reference counted, so cloning a registry (as happens when
//! configurations are merged) shares the closures instead of copying them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

use crate::error::{Result, SemanticsError};

/// An accessibility action that can be performed on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticsAction {
    /// The primary action (tap/click).
    Tap,
    /// A long press.
    LongPress,
    /// Scroll the content left.
    ScrollLeft,
    /// Scroll the content right.
    ScrollRight,
    /// Scroll the content up.
    ScrollUp,
    /// Scroll the content down.
    ScrollDown,
    /// Increase the value (e.g. a slider).
    Increase,
    /// Decrease the value (e.g. a slider).
    Decrease,
    /// Scroll this node into view.
    ShowOnScreen,
    /// Move the text cursor forward by one character.
    MoveCursorForwardByCharacter,
    /// Move the text cursor backward by one character.
    MoveCursorBackwardByCharacter,
    /// Move the text cursor forward by one word.
    MoveCursorForwardByWord,
    /// Move the text cursor backward by one word.
    MoveCursorBackwardByWord,
    /// Set the text selection range.
    SetSelection,
    /// Replace the text content.
    SetText,
    /// Copy the selected content.
    Copy,
    /// Cut the selected content.
    Cut,
    /// Paste clipboard content.
    Paste,
    /// Request accessibility focus.
    Focus,
    /// Remove accessibility focus.
    Unfocus,
    /// Dismiss a dismissible element (e.g. a dialog).
    Dismiss,
    /// Perform a custom action by id.
    CustomAction,
}

impl SemanticsAction {
    /// Every action kind, in bit order.
    pub const ALL: [SemanticsAction; 22] = [
        Self::Tap,
        Self::LongPress,
        Self::ScrollLeft,
        Self::ScrollRight,
        Self::ScrollUp,
        Self::ScrollDown,
        Self::Increase,
        Self::Decrease,
        Self::ShowOnScreen,
        Self::MoveCursorForwardByCharacter,
        Self::MoveCursorBackwardByCharacter,
        Self::MoveCursorForwardByWord,
        Self::MoveCursorBackwardByWord,
        Self::SetSelection,
        Self::SetText,
        Self::Copy,
        Self::Cut,
        Self::Paste,
        Self::Focus,
        Self::Unfocus,
        Self::Dismiss,
        Self::CustomAction,
    ];

    /// The bit representing this action in a [`SupportedActions`] set.
    pub fn bit(self) -> SupportedActions {
        SupportedActions::from_bits_retain(1 << (self as u64))
    }

    /// The wire name of the action.
    pub fn name(self) -> &'static str {
        match self {
            Self::Tap => "tap",
            Self::LongPress => "longPress",
            Self::ScrollLeft => "scrollLeft",
            Self::ScrollRight => "scrollRight",
            Self::ScrollUp => "scrollUp",
            Self::ScrollDown => "scrollDown",
            Self::Increase => "increase",
            Self::Decrease => "decrease",
            Self::ShowOnScreen => "showOnScreen",
            Self::MoveCursorForwardByCharacter => "moveCursorForwardByCharacter",
            Self::MoveCursorBackwardByCharacter => "moveCursorBackwardByCharacter",
            Self::MoveCursorForwardByWord => "moveCursorForwardByWord",
            Self::MoveCursorBackwardByWord => "moveCursorBackwardByWord",
            Self::SetSelection => "setSelection",
            Self::SetText => "setText",
            Self::Copy => "copy",
            Self::Cut => "cut",
            Self::Paste => "paste",
            Self::Focus => "focus",
            Self::Unfocus => "unfocus",
            Self::Dismiss => "dismiss",
            Self::CustomAction => "customAction",
        }
    }

    /// Look up an action by its wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.name() == name)
    }
}

impl fmt::Display for SemanticsAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// The set of actions a node supports, as sent to the platform.
    ///
    /// Bit `n` corresponds to the `n`th variant of [`SemanticsAction`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SupportedActions: u64 {
        const TAP = 1 << 0;
        const LONG_PRESS = 1 << 1;
        const SCROLL_LEFT = 1 << 2;
        const SCROLL_RIGHT = 1 << 3;
        const SCROLL_UP = 1 << 4;
        const SCROLL_DOWN = 1 << 5;
        const INCREASE = 1 << 6;
        const DECREASE = 1 << 7;
        const SHOW_ON_SCREEN = 1 << 8;
        const MOVE_CURSOR_FORWARD_BY_CHARACTER = 1 << 9;
        const MOVE_CURSOR_BACKWARD_BY_CHARACTER = 1 << 10;
        const MOVE_CURSOR_FORWARD_BY_WORD = 1 << 11;
        const MOVE_CURSOR_BACKWARD_BY_WORD = 1 << 12;
        const SET_SELECTION = 1 << 13;
        const SET_TEXT = 1 << 14;
        const COPY = 1 << 15;
        const CUT = 1 << 16;
        const PASTE = 1 << 17;
        const FOCUS = 1 << 18;
        const UNFOCUS = 1 << 19;
        const DISMISS = 1 << 20;
        const CUSTOM_ACTION = 1 << 21;
    }
}

impl SupportedActions {
    /// Iterate the individual action kinds in this set.
    pub fn actions(self) -> impl Iterator<Item = SemanticsAction> {
        SemanticsAction::ALL
            .into_iter()
            .filter(move |action| self.contains(action.bit()))
    }
}

/// Arguments accompanying an action request from the platform.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActionArgs {
    /// The action carries no arguments.
    #[default]
    None,
    /// Arguments for [`SemanticsAction::SetSelection`].
    SetSelection { base: usize, extent: usize },
    /// Arguments for [`SemanticsAction::SetText`].
    SetText { text: String },
    /// Arguments for [`SemanticsAction::CustomAction`].
    CustomAction { action_id: i64 },
    /// Arguments for the cursor movement actions.
    MoveCursor { extend_selection: bool },
}

impl ActionArgs {
    /// Extract the text of a `SetText` request.
    pub fn text(&self) -> Result<&str> {
        match self {
            Self::SetText { text } => Ok(text),
            _ => Err(SemanticsError::invalid_arguments(SemanticsAction::SetText, "SetText")),
        }
    }

    /// Extract the `(base, extent)` of a `SetSelection` request.
    pub fn selection(&self) -> Result<(usize, usize)> {
        match self {
            Self::SetSelection { base, extent } => Ok((*base, *extent)),
            _ => Err(SemanticsError::invalid_arguments(
                SemanticsAction::SetSelection,
                "SetSelection",
            )),
        }
    }

    /// Extract the custom action id of a `CustomAction` request.
    pub fn custom_action_id(&self) -> Result<i64> {
        match self {
            Self::CustomAction { action_id } => Ok(*action_id),
            _ => Err(SemanticsError::invalid_arguments(
                SemanticsAction::CustomAction,
                "CustomAction",
            )),
        }
    }
}

/// A handler invoked when the platform performs an action on a node.
pub type ActionHandler = Arc<dyn Fn(&ActionArgs) + Send + Sync>;

/// Action handlers for a single semantics node.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    handlers: HashMap<SemanticsAction, ActionHandler>,
}

impl ActionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `action`, replacing any existing one.
    pub fn set_handler<F>(&mut self, action: SemanticsAction, handler: F)
    where
        F: Fn(&ActionArgs) + Send + Sync + 'static,
    {
        self.handlers.insert(action, Arc::new(handler));
    }

    /// Builder-style form of [`set_handler`](Self::set_handler).
    pub fn with_handler<F>(mut self, action: SemanticsAction, handler: F) -> Self
    where
        F: Fn(&ActionArgs) + Send + Sync + 'static,
    {
        self.set_handler(action, handler);
        self
    }

    /// The handler registered for `action`, if any.
    pub fn handler(&self, action: SemanticsAction) -> Option<&ActionHandler> {
        self.handlers.get(&action)
    }

    /// Whether a handler is registered for `action`.
    pub fn has_action(&self, action: SemanticsAction) -> bool {
        self.handlers.contains_key(&action)
    }

    /// Invoke the handler for `action`.
    ///
    /// Returns `false` when no handler is registered. That is a normal
    /// negative result, not a fault.
    pub fn perform_action(&self, action: SemanticsAction, args: &ActionArgs) -> bool {
        match self.handlers.get(&action) {
            Some(handler) => {
                handler(args);
                true
            }
            None => false,
        }
    }

    /// The set of actions with a registered handler.
    pub fn supported_actions(&self) -> SupportedActions {
        self.handlers
            .keys()
            .fold(SupportedActions::empty(), |set, action| set | action.bit())
    }

    /// Union `other`'s handlers into this registry.
    ///
    /// On a conflict, `other`'s handler replaces the existing one.
    pub fn merge(&mut self, other: &ActionRegistry) {
        self.handlers.extend(
            other
                .handlers
                .iter()
                .map(|(action, handler)| (*action, Arc::clone(handler))),
        );
    }

    /// Remove all handlers.
    pub fn clear(&mut self) {
        self.handlers.clear();
    }

    /// Whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("supported", &self.supported_actions())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;

    #[test]
    fn test_action_bits_match_flag_constants() {
        assert_eq!(SemanticsAction::Tap.bit(), SupportedActions::TAP);
        assert_eq!(SemanticsAction::ScrollDown.bit(), SupportedActions::SCROLL_DOWN);
        assert_eq!(SemanticsAction::Paste.bit(), SupportedActions::PASTE);
        assert_eq!(SemanticsAction::CustomAction.bit(), SupportedActions::CUSTOM_ACTION);
        let all = SemanticsAction::ALL
            .iter()
            .fold(SupportedActions::empty(), |set, a| set | a.bit());
        assert_eq!(all, SupportedActions::all());
    }

    #[test]
    fn test_action_names_round_trip() {
        for action in SemanticsAction::ALL {
            assert_eq!(SemanticsAction::from_name(action.name()), Some(action));
        }
        assert_eq!(SemanticsAction::from_name("explode"), None);
    }

    #[test]
    fn test_perform_action_invokes_handler() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let mut registry = ActionRegistry::new();
        registry.set_handler(SemanticsAction::Tap, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(registry.perform_action(SemanticsAction::Tap, &ActionArgs::None));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_perform_missing_action_returns_false() {
        let registry = ActionRegistry::new();
        assert!(!registry.perform_action(SemanticsAction::Tap, &ActionArgs::None));
        assert!(registry.handler(SemanticsAction::Tap).is_none());
    }

    #[test]
    fn test_handler_receives_args() {
        let received = Arc::new(Mutex::new(String::new()));
        let sink = Arc::clone(&received);
        let registry = ActionRegistry::new().with_handler(SemanticsAction::SetText, move |args| {
            if let Ok(text) = args.text() {
                *sink.lock() = text.to_string();
            }
        });

        let args = ActionArgs::SetText {
            text: "hello".into(),
        };
        assert!(registry.perform_action(SemanticsAction::SetText, &args));
        assert_eq!(*received.lock(), "hello");
    }

    #[test]
    fn test_supported_actions() {
        let registry = ActionRegistry::new()
            .with_handler(SemanticsAction::Tap, |_| {})
            .with_handler(SemanticsAction::ScrollUp, |_| {});

        let supported = registry.supported_actions();
        assert_eq!(supported, SupportedActions::TAP | SupportedActions::SCROLL_UP);
        let kinds: Vec<_> = supported.actions().collect();
        assert_eq!(kinds, vec![SemanticsAction::Tap, SemanticsAction::ScrollUp]);
        assert_eq!(ActionRegistry::new().supported_actions(), SupportedActions::empty());
    }

    #[test]
    fn test_merge_later_wins() {
        let winner = Arc::new(AtomicUsize::new(0));
        let first = Arc::clone(&winner);
        let second = Arc::clone(&winner);

        let mut base = ActionRegistry::new()
            .with_handler(SemanticsAction::Tap, move |_| first.store(1, Ordering::SeqCst))
            .with_handler(SemanticsAction::Focus, |_| {});
        let other = ActionRegistry::new()
            .with_handler(SemanticsAction::Tap, move |_| second.store(2, Ordering::SeqCst))
            .with_handler(SemanticsAction::Dismiss, |_| {});

        base.merge(&other);
        assert_eq!(base.len(), 3);
        assert!(base.has_action(SemanticsAction::Dismiss));
        base.perform_action(SemanticsAction::Tap, &ActionArgs::None);
        assert_eq!(winner.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_clear() {
        let mut registry = ActionRegistry::new().with_handler(SemanticsAction::Copy, |_| {});
        assert!(!registry.is_empty());
        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_args_extraction() {
        let args = ActionArgs::SetSelection { base: 2, extent: 5 };
        assert_eq!(args.selection().unwrap(), (2, 5));
        assert!(args.text().is_err());
        assert_eq!(
            ActionArgs::CustomAction { action_id: 9 }.custom_action_id().unwrap(),
            9
        );
    }
}
