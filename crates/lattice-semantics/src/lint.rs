//! Accessibility lint checks over a semantics tree.
//!
//! Lints flag common authoring mistakes: interactive elements nobody can
//! name, images without alt text, touch targets too small to hit reliably.
//!
//! ```
//! use lattice_semantics::lint::{self, Severity};
//! use lattice_semantics::{NodeId, Rect, SemanticsConfiguration, SemanticsNode, SemanticsRole};
//!
//! let mut config = SemanticsConfiguration::new();
//! config.properties.role = SemanticsRole::Button;
//! let root = SemanticsNode::with_config(NodeId::new(1), Rect::new(0.0, 0.0, 64.0, 64.0), config);
//!
//! let results = lint::lint_tree(Some(&root));
//! assert!(lint::has_errors(&results));
//! assert_eq!(results[0].severity, Severity::Error);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use lattice_semantics_core::{
    NodeId, SemanticsFlags, SemanticsNode, SemanticsProperties, SemanticsRole,
};

/// Minimum recommended touch target edge, in logical pixels.
pub const DEFAULT_MIN_TOUCH_TARGET: f32 = 48.0;

/// How serious a lint finding is. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Worth knowing, not necessarily a problem.
    Info,
    /// A likely problem that should be addressed.
    Warning,
    /// An accessibility violation.
    Error,
}

impl Severity {
    /// Lowercase name ("info", "warning", "error").
    pub fn name(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The rule a finding came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LintRule {
    /// Interactive element with neither label nor value.
    MissingLabel,
    /// Image without alt text.
    ImageMissingAlt,
    /// Interactive element below the minimum touch target.
    TouchTargetSize,
    /// Button without a label.
    EmptyButton,
    /// Slider without a current value.
    MissingValue,
    /// Text field without hint or label.
    MissingHint,
}

impl LintRule {
    /// Every rule, in evaluation order.
    pub const ALL: [LintRule; 6] = [
        Self::MissingLabel,
        Self::EmptyButton,
        Self::ImageMissingAlt,
        Self::MissingValue,
        Self::TouchTargetSize,
        Self::MissingHint,
    ];

    /// Kebab-case identifier ("missing-label", ...).
    pub fn name(self) -> &'static str {
        match self {
            Self::MissingLabel => "missing-label",
            Self::ImageMissingAlt => "image-missing-alt",
            Self::TouchTargetSize => "touch-target-size",
            Self::EmptyButton => "empty-button",
            Self::MissingValue => "missing-value",
            Self::MissingHint => "missing-hint",
        }
    }

    /// The severity findings of this rule carry.
    pub fn severity(self) -> Severity {
        match self {
            Self::MissingLabel | Self::EmptyButton => Severity::Error,
            Self::ImageMissingAlt | Self::MissingValue | Self::TouchTargetSize => {
                Severity::Warning
            }
            Self::MissingHint => Severity::Info,
        }
    }
}

impl fmt::Display for LintRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single lint finding.
#[derive(Debug, Clone, PartialEq)]
pub struct LintResult {
    /// The offending node.
    pub node_id: NodeId,
    /// How serious the finding is.
    pub severity: Severity,
    /// Which rule produced it.
    pub rule: LintRule,
    /// What is wrong.
    pub message: String,
    /// How to fix it.
    pub suggestion: String,
}

impl LintResult {
    fn new(
        node_id: NodeId,
        rule: LintRule,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            node_id,
            severity: rule.severity(),
            rule,
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }
}

impl fmt::Display for LintResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}: {}", self.severity, self.rule, self.node_id, self.message)
    }
}

/// Which rules run and how findings are filtered.
#[derive(Debug, Clone)]
pub struct LintOptions {
    /// Keep [`Severity::Info`] findings.
    pub include_info: bool,
    /// Minimum touch target edge for the touch-target-size rule.
    pub min_touch_target_size: f32,
    /// Rules to skip.
    pub disabled_rules: BTreeSet<LintRule>,
}

impl Default for LintOptions {
    fn default() -> Self {
        Self {
            include_info: false,
            min_touch_target_size: DEFAULT_MIN_TOUCH_TARGET,
            disabled_rules: BTreeSet::new(),
        }
    }
}

impl LintOptions {
    /// Options reporting every finding of every rule.
    pub fn all() -> Self {
        Self {
            include_info: true,
            ..Self::default()
        }
    }

    /// Skip `rule`.
    pub fn disable(mut self, rule: LintRule) -> Self {
        self.disabled_rules.insert(rule);
        self
    }

    fn keeps(&self, result: &LintResult) -> bool {
        !self.disabled_rules.contains(&result.rule)
            && (self.include_info || result.severity > Severity::Info)
    }
}

/// Run every rule over the tree, in pre-order. Info findings are included.
pub fn lint_tree(root: Option<&SemanticsNode>) -> Vec<LintResult> {
    collect(root, DEFAULT_MIN_TOUCH_TARGET)
}

/// Run the rules selected by `options` over the tree.
pub fn lint_with_options(root: Option<&SemanticsNode>, options: &LintOptions) -> Vec<LintResult> {
    let mut results = collect(root, options.min_touch_target_size);
    results.retain(|result| options.keeps(result));
    results
}

/// Whether any finding is an error.
pub fn has_errors(results: &[LintResult]) -> bool {
    results.iter().any(|r| r.severity == Severity::Error)
}

/// Whether any finding is a warning or worse.
pub fn has_warnings(results: &[LintResult]) -> bool {
    results.iter().any(|r| r.severity >= Severity::Warning)
}

/// Findings at or above `min`.
pub fn filter_by_severity(results: &[LintResult], min: Severity) -> Vec<LintResult> {
    results.iter().filter(|r| r.severity >= min).cloned().collect()
}

/// Findings grouped by rule, each group in tree order.
pub fn group_by_rule(results: &[LintResult]) -> BTreeMap<LintRule, Vec<LintResult>> {
    let mut groups: BTreeMap<LintRule, Vec<LintResult>> = BTreeMap::new();
    for result in results {
        groups.entry(result.rule).or_default().push(result.clone());
    }
    groups
}

fn collect(root: Option<&SemanticsNode>, min_touch_target: f32) -> Vec<LintResult> {
    let mut results = Vec::new();
    if let Some(root) = root {
        root.visit(|node| {
            lint_node(node, min_touch_target, &mut results);
            true
        });
    }
    results
}

fn lint_node(node: &SemanticsNode, min_touch_target: f32, out: &mut Vec<LintResult>) {
    let id = node.id();
    let rect = node.rect();
    let (props, interactive) = node.read_config(|c| (c.properties.clone(), c.has_actions()));

    if interactive && props.label.is_empty() && props.value.is_empty() {
        out.push(LintResult::new(
            id,
            LintRule::MissingLabel,
            "Interactive element is missing an accessibility label",
            "Add a label describing what this element does",
        ));
    }

    if is_kind(&props, SemanticsRole::Button, SemanticsFlags::IS_BUTTON) && props.label.is_empty() {
        out.push(LintResult::new(
            id,
            LintRule::EmptyButton,
            "Button is missing an accessibility label",
            "Add a label describing the button's action",
        ));
    }

    if is_kind(&props, SemanticsRole::Image, SemanticsFlags::IS_IMAGE)
        && props.label.is_empty()
        && !props.has_flag(SemanticsFlags::IS_HIDDEN)
    {
        out.push(LintResult::new(
            id,
            LintRule::ImageMissingAlt,
            "Image is missing alt text",
            "Add a label, or mark the image hidden if it is decorative",
        ));
    }

    if is_kind(&props, SemanticsRole::Slider, SemanticsFlags::IS_SLIDER)
        && props.current_value.is_none()
    {
        out.push(LintResult::new(
            id,
            LintRule::MissingValue,
            "Slider is missing current value",
            "Set the current, minimum and maximum values",
        ));
    }

    let (width, height) = (rect.width(), rect.height());
    if interactive
        && width > 0.0
        && height > 0.0
        && (width < min_touch_target || height < min_touch_target)
    {
        out.push(LintResult::new(
            id,
            LintRule::TouchTargetSize,
            format!(
                "Touch target is too small ({width:.0}x{height:.0}). \
                 Minimum recommended size is {min_touch_target:.0}x{min_touch_target:.0}"
            ),
            format!(
                "Increase the size or add padding to meet the \
                 {min_touch_target:.0}x{min_touch_target:.0} minimum touch target"
            ),
        ));
    }

    if is_kind(&props, SemanticsRole::TextField, SemanticsFlags::IS_TEXT_FIELD)
        && props.hint.is_empty()
        && props.label.is_empty()
    {
        out.push(LintResult::new(
            id,
            LintRule::MissingHint,
            "Text field could benefit from a hint or label",
            "Add a hint to help users understand the expected input",
        ));
    }
}

#[inline]
fn is_kind(props: &SemanticsProperties, role: SemanticsRole, flag: SemanticsFlags) -> bool {
    props.role == role || props.has_flag(flag)
}
