//! Semantic value types: roles, flags, and per-node properties.
//!
//! These are the leaf types of the semantics engine. Everything here is plain
//! data; the only behavior is the [`SemanticsProperties::merge`] operator and
//! the [`SemanticsProperties::is_empty`] predicate that the configuration and
//! tree builder rely on.
//!
//! # Merge Algebra
//!
//! Every field merges either as *overwrite-if-present-in-other* (strings,
//! role, numeric values, heading level, selection, sort key) or as a
//! *monotonic union* (flags are OR'd, custom actions are appended). As a
//! consequence:
//!
//! - `SemanticsProperties::default()` is a two-sided identity element.
//! - Folding a chain of ancestor properties left-to-right or pairwise gives
//!   the same result.
//! - No flag bit is ever cleared by a merge.

use std::fmt;

use bitflags::bitflags;
use serde::Serialize;

/// The role of a semantics node, as announced by assistive technology.
///
/// Purely descriptive: the engine never branches on a role. `None` is the
/// absent value and never overwrites another role during a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SemanticsRole {
    /// No specific role.
    #[default]
    None,
    /// A clickable button.
    Button,
    /// A checkbox control.
    Checkbox,
    /// A radio button.
    Radio,
    /// A toggle switch.
    Switch,
    /// A text input field.
    TextField,
    /// A hyperlink.
    Link,
    /// An image.
    Image,
    /// A slider control.
    Slider,
    /// A progress indicator.
    ProgressIndicator,
    /// A single tab.
    Tab,
    /// A tab bar container.
    TabBar,
    /// A list container.
    List,
    /// An item within a list.
    ListItem,
    /// A scrollable container.
    ScrollView,
    /// A header or title.
    Header,
    /// An alert or dialog.
    Alert,
    /// A menu.
    Menu,
    /// An item within a menu.
    MenuItem,
    /// A popup.
    Popup,
}

impl SemanticsRole {
    /// The wire name of the role ("textField", "progressIndicator", ...).
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Button => "button",
            Self::Checkbox => "checkbox",
            Self::Radio => "radio",
            Self::Switch => "switch",
            Self::TextField => "textField",
            Self::Link => "link",
            Self::Image => "image",
            Self::Slider => "slider",
            Self::ProgressIndicator => "progressIndicator",
            Self::Tab => "tab",
            Self::TabBar => "tabBar",
            Self::List => "list",
            Self::ListItem => "listItem",
            Self::ScrollView => "scrollView",
            Self::Header => "header",
            Self::Alert => "alert",
            Self::Menu => "menu",
            Self::MenuItem => "menuItem",
            Self::Popup => "popup",
        }
    }

    /// Whether this is the absent role.
    #[inline]
    pub fn is_none(self) -> bool {
        self == Self::None
    }
}

impl fmt::Display for SemanticsRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Boolean state facts about a semantics node.
    ///
    /// Flags are only ever combined with bitwise OR during a merge; nothing in
    /// the engine clears a flag implicitly.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SemanticsFlags: u64 {
        /// The node has a checked state.
        const HAS_CHECKED_STATE = 1 << 0;
        /// The node is currently checked.
        const IS_CHECKED = 1 << 1;
        /// The node has a selected state.
        const HAS_SELECTED_STATE = 1 << 2;
        /// The node is currently selected.
        const IS_SELECTED = 1 << 3;
        /// The node has an enabled state.
        const HAS_ENABLED_STATE = 1 << 4;
        /// The node is currently enabled.
        const IS_ENABLED = 1 << 5;
        /// The node can receive accessibility focus.
        const IS_FOCUSABLE = 1 << 6;
        /// The node currently has focus.
        const IS_FOCUSED = 1 << 7;
        /// The node behaves as a button.
        const IS_BUTTON = 1 << 8;
        /// The node is a text field.
        const IS_TEXT_FIELD = 1 << 9;
        /// The node is read-only.
        const IS_READ_ONLY = 1 << 10;
        /// The node content is obscured (e.g. a password).
        const IS_OBSCURED = 1 << 11;
        /// The text field is multiline.
        const IS_MULTILINE = 1 << 12;
        /// The node is a slider.
        const IS_SLIDER = 1 << 13;
        /// Content updates should be announced.
        const IS_LIVE_REGION = 1 << 14;
        /// The node has a toggled state.
        const HAS_TOGGLED_STATE = 1 << 15;
        /// The node is currently toggled on.
        const IS_TOGGLED = 1 << 16;
        /// The node scrolls implicitly.
        const HAS_IMPLICIT_SCROLLING = 1 << 17;
        /// The node is hidden from accessibility.
        const IS_HIDDEN = 1 << 18;
        /// The node is a header.
        const IS_HEADER = 1 << 19;
        /// The node is an image.
        const IS_IMAGE = 1 << 20;
        /// The node names a navigation route.
        const NAMES_ROUTE = 1 << 21;
        /// The node scopes a navigation route.
        const SCOPES_ROUTE = 1 << 22;
        /// Selection is mutually exclusive within the group (radio group).
        const IS_IN_MUTUALLY_EXCLUSIVE_GROUP = 1 << 23;
        /// The node has an expanded/collapsed state.
        const HAS_EXPANDED_STATE = 1 << 24;
        /// The node is currently expanded.
        const IS_EXPANDED = 1 << 25;
    }
}

/// A custom accessibility action exposed by a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CustomSemanticsAction {
    /// Identifies the action when the platform invokes it.
    pub id: i64,
    /// Human-readable description of the action.
    pub label: String,
}

impl CustomSemanticsAction {
    /// Create a custom action.
    pub fn new(id: i64, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }
}

/// A text selection range (character offsets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct TextSelection {
    /// Where the selection started.
    pub base: usize,
    /// Where the selection currently ends.
    pub extent: usize,
}

/// Semantic property values for a node.
///
/// Empty strings, [`SemanticsRole::None`], `None` optionals, a zero heading
/// level and an empty custom action list all mean "absent".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SemanticsProperties {
    /// Primary text description.
    pub label: String,
    /// Current value (slider position, text content, ...).
    pub value: String,
    /// Guidance on the result of the primary action.
    pub hint: String,
    /// Additional information shown on hover or long press.
    pub tooltip: String,
    /// Semantic role.
    pub role: SemanticsRole,
    /// Boolean state flags.
    pub flags: SemanticsFlags,
    /// Current numeric value for range controls.
    pub current_value: Option<f64>,
    /// Minimum numeric value for range controls.
    pub min_value: Option<f64>,
    /// Maximum numeric value for range controls.
    pub max_value: Option<f64>,
    /// Scroll position of a scrollable container.
    pub scroll_position: Option<f64>,
    /// Minimum scroll extent.
    pub scroll_extent_min: Option<f64>,
    /// Maximum scroll extent.
    pub scroll_extent_max: Option<f64>,
    /// Heading level (1-6, 0 for none).
    pub heading_level: u8,
    /// Selected text range.
    pub text_selection: Option<TextSelection>,
    /// Custom ordering key for accessibility traversal.
    pub sort_key: Option<f64>,
    /// Custom actions, in declaration order.
    pub custom_actions: Vec<CustomSemanticsAction>,
}

impl SemanticsProperties {
    /// Create empty properties.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether every field holds its absent value.
    pub fn is_empty(&self) -> bool {
        self.label.is_empty()
            && self.value.is_empty()
            && self.hint.is_empty()
            && self.tooltip.is_empty()
            && self.role.is_none()
            && self.flags.is_empty()
            && self.current_value.is_none()
            && self.min_value.is_none()
            && self.max_value.is_none()
            && self.scroll_position.is_none()
            && self.scroll_extent_min.is_none()
            && self.scroll_extent_max.is_none()
            && self.heading_level == 0
            && self.text_selection.is_none()
            && self.sort_key.is_none()
            && self.custom_actions.is_empty()
    }

    /// Merge `other` on top of `self`, returning the combined properties.
    ///
    /// Present scalar values in `other` win, flags are OR'd and custom
    /// actions are appended after `self`'s.
    pub fn merge(&self, other: &SemanticsProperties) -> SemanticsProperties {
        let mut result = self.clone();
        result.merge_in_place(other);
        result
    }

    /// In-place form of [`merge`](Self::merge).
    pub fn merge_in_place(&mut self, other: &SemanticsProperties) {
        overwrite_string(&mut self.label, &other.label);
        overwrite_string(&mut self.value, &other.value);
        overwrite_string(&mut self.hint, &other.hint);
        overwrite_string(&mut self.tooltip, &other.tooltip);
        if !other.role.is_none() {
            self.role = other.role;
        }

        self.flags |= other.flags;

        overwrite_option(&mut self.current_value, other.current_value);
        overwrite_option(&mut self.min_value, other.min_value);
        overwrite_option(&mut self.max_value, other.max_value);
        overwrite_option(&mut self.scroll_position, other.scroll_position);
        overwrite_option(&mut self.scroll_extent_min, other.scroll_extent_min);
        overwrite_option(&mut self.scroll_extent_max, other.scroll_extent_max);
        if other.heading_level != 0 {
            self.heading_level = other.heading_level;
        }
        overwrite_option(&mut self.text_selection, other.text_selection);
        overwrite_option(&mut self.sort_key, other.sort_key);

        self.custom_actions
            .extend(other.custom_actions.iter().cloned());
    }

    /// Whether a specific flag is set.
    #[inline]
    pub fn has_flag(&self, flag: SemanticsFlags) -> bool {
        self.flags.contains(flag)
    }
}

#[inline]
fn overwrite_string(target: &mut String, source: &str) {
    if !source.is_empty() {
        source.clone_into(target);
    }
}

#[inline]
fn overwrite_option<T: Copy>(target: &mut Option<T>, source: Option<T>) {
    if source.is_some() {
        *target = source;
    }
}
