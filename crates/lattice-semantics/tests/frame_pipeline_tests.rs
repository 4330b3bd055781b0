//! Integration tests for the per-frame pipeline: render tree to builder,
//! reconciliation, binding and platform delivery.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lattice_semantics::lint::{self, LintRule};
use lattice_semantics::{
    ActionArgs, DescribesSemantics, NodeId, Rect, RenderSemantics, SemanticsAction,
    SemanticsBinding, SemanticsConfiguration, SemanticsOwner, SemanticsRole, SemanticsTreeDebug,
    SemanticsUpdate, StableKey,
};
use parking_lot::Mutex;

fn setup() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("lattice_semantics=trace,lattice_semantics_core=trace")
        .with_test_writer()
        .try_init();
}

/// A minimal widget as the render tree would present it.
#[derive(Clone)]
enum Widget {
    Column(u64, Vec<Widget>),
    Text(u64, String),
    Button(u64, String, Arc<AtomicUsize>),
    Slider(u64, f64),
}

impl Widget {
    fn key(&self) -> u64 {
        match self {
            Self::Column(key, _)
            | Self::Text(key, _)
            | Self::Button(key, _, _)
            | Self::Slider(key, _) => *key,
        }
    }
}

impl RenderSemantics for Widget {
    fn semantics_key(&self) -> StableKey {
        StableKey::new(self.key())
    }

    fn semantics_bounds(&self) -> Rect {
        Rect::new(0.0, self.key() as f32 * 50.0, 200.0, 48.0)
    }

    fn visit_semantics_children(&self, visitor: &mut dyn FnMut(&dyn RenderSemantics)) {
        if let Self::Column(_, children) = self {
            for child in children {
                visitor(child);
            }
        }
    }

    fn as_describes_semantics(&self) -> Option<&dyn DescribesSemantics> {
        match self {
            Self::Column(..) => None,
            _ => Some(self),
        }
    }
}

impl DescribesSemantics for Widget {
    fn describe_semantics_configuration(&self, config: &mut SemanticsConfiguration) -> bool {
        match self {
            Self::Column(..) => return false,
            Self::Text(_, text) => config.properties.label = text.clone(),
            Self::Button(_, label, taps) => {
                config.properties.label = label.clone();
                config.properties.role = SemanticsRole::Button;
                let taps = Arc::clone(taps);
                config.actions_mut().set_handler(SemanticsAction::Tap, move |_| {
                    taps.fetch_add(1, Ordering::SeqCst);
                });
            }
            Self::Slider(_, value) => {
                config.properties.label = "Volume".into();
                config.properties.role = SemanticsRole::Slider;
                config.properties.current_value = Some(*value);
                config.properties.min_value = Some(0.0);
                config.properties.max_value = Some(1.0);
            }
        }
        true
    }
}

struct Harness {
    binding: SemanticsBinding,
    owner: Arc<SemanticsOwner>,
    sent: Arc<Mutex<Vec<SemanticsUpdate>>>,
}

impl Harness {
    fn new() -> Self {
        setup();
        let binding = SemanticsBinding::new();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&sent);
        binding.set_send_function(move |update| {
            sink.lock().push(update.clone());
            Ok(())
        });
        let owner = Arc::new(SemanticsOwner::new());
        binding.set_owner(Some(Arc::clone(&owner)));
        binding.set_enabled(true);
        Self { binding, owner, sent }
    }

    fn frame(&self, root: &Widget) -> SemanticsUpdate {
        self.binding.flush_frame(root).expect("owner attached")
    }

    fn take_sent(&self) -> Vec<SemanticsUpdate> {
        std::mem::take(&mut *self.sent.lock())
    }
}

fn screen(taps: &Arc<AtomicUsize>, title: &str, with_slider: bool) -> Widget {
    let mut children = vec![
        Widget::Text(1, title.to_string()),
        Widget::Button(2, "Play".into(), Arc::clone(taps)),
    ];
    if with_slider {
        children.push(Widget::Slider(3, 0.5));
    }
    Widget::Column(100, children)
}

#[test]
fn test_first_frame_sends_whole_tree() {
    let harness = Harness::new();
    let taps = Arc::new(AtomicUsize::new(0));

    let diff = harness.frame(&screen(&taps, "Now playing", true));
    assert_eq!(diff.updates.len(), 4);
    assert!(diff.removals.is_empty());

    let sent = harness.take_sent();
    assert_eq!(sent.len(), 1);
    let ids: Vec<NodeId> = sent[0].updates.iter().map(|u| u.id).collect();
    assert_eq!(ids[0], NodeId::ROOT);
    assert_eq!(sent[0].updates[0].child_ids, ids[1..].to_vec());
}

#[test]
fn test_unchanged_frame_sends_nothing() {
    let harness = Harness::new();
    let taps = Arc::new(AtomicUsize::new(0));
    harness.frame(&screen(&taps, "Now playing", true));
    harness.take_sent();

    let diff = harness.frame(&screen(&taps, "Now playing", true));
    assert!(diff.is_empty());
    assert!(harness.take_sent().is_empty());
}

#[test]
fn test_changed_label_sends_single_update() {
    let harness = Harness::new();
    let taps = Arc::new(AtomicUsize::new(0));
    harness.frame(&screen(&taps, "Now playing", true));
    harness.take_sent();

    harness.frame(&screen(&taps, "Paused", true));
    let sent = harness.take_sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].updates.len(), 1);
    assert_eq!(sent[0].updates[0].label, "Paused");
}

#[test]
fn test_removed_widget_is_reported() {
    let harness = Harness::new();
    let taps = Arc::new(AtomicUsize::new(0));
    harness.frame(&screen(&taps, "Now playing", true));
    let slider_id = harness.owner.get_stable_id(StableKey::new(3));
    harness.take_sent();

    harness.frame(&screen(&taps, "Now playing", false));
    let sent = harness.take_sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].removals, vec![slider_id]);
    // The root's child list changed.
    assert_eq!(sent[0].updates.len(), 1);
    assert_eq!(sent[0].updates[0].id, NodeId::ROOT);
    assert!(harness.binding.find_node_by_id(slider_id).is_none());
}

#[test]
fn test_platform_action_reaches_widget() {
    let harness = Harness::new();
    let taps = Arc::new(AtomicUsize::new(0));
    harness.frame(&screen(&taps, "Now playing", true));

    let button_id = harness.owner.get_stable_id(StableKey::new(2));
    assert!(harness.binding.handle_action(button_id, SemanticsAction::Tap, &ActionArgs::None));
    assert_eq!(taps.load(Ordering::SeqCst), 1);

    // Handlers from the latest frame are the ones invoked.
    let later_taps = Arc::new(AtomicUsize::new(0));
    harness.frame(&screen(&later_taps, "Now playing", true));
    assert!(harness.binding.handle_action(button_id, SemanticsAction::Tap, &ActionArgs::None));
    assert_eq!(later_taps.load(Ordering::SeqCst), 1);
    assert_eq!(taps.load(Ordering::SeqCst), 1);
}

#[test]
fn test_disabled_binding_keeps_tree_current() {
    let harness = Harness::new();
    harness.binding.set_enabled(false);
    let taps = Arc::new(AtomicUsize::new(0));

    harness.frame(&screen(&taps, "Now playing", true));
    assert!(harness.take_sent().is_empty());
    assert_eq!(harness.owner.node_count(), 4);

    harness.binding.set_enabled(true);
    let sent = harness.take_sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].updates.len(), 4);
}

#[test]
fn test_json_and_debug_output() {
    let harness = Harness::new();
    let taps = Arc::new(AtomicUsize::new(0));
    let diff = harness.frame(&screen(&taps, "Now playing", false));

    let json: serde_json::Value = serde_json::from_str(&diff.to_json().unwrap()).unwrap();
    assert_eq!(json["updates"][2]["label"], "Play");
    assert_eq!(json["updates"][2]["role"], "button");
    assert!(json.get("removals").is_none());

    let dump = SemanticsTreeDebug::new().format_owner(&harness.owner);
    assert!(dump.starts_with("Semantics Tree (3 nodes):"));
    assert!(dump.contains("button \"Play\""));
}

#[test]
fn test_lint_built_tree() {
    let harness = Harness::new();
    let taps = Arc::new(AtomicUsize::new(0));
    let root = Widget::Column(100, vec![Widget::Button(2, String::new(), taps)]);
    harness.frame(&root);

    let results = lint::lint_tree(harness.owner.root().as_ref());
    let rules: Vec<LintRule> = results.iter().map(|r| r.rule).collect();
    assert_eq!(rules, vec![LintRule::MissingLabel, LintRule::EmptyButton]);
}

#[cfg(feature = "accesskit")]
#[test]
fn test_accesskit_round_trip() {
    use lattice_semantics::AccessKitBridge;

    setup();
    let binding = SemanticsBinding::new();
    let delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&delivered);
    binding.set_send_function(AccessKitBridge::new().into_send_function(move |update| {
        sink.lock().push(update);
        Ok(())
    }));
    let owner = Arc::new(SemanticsOwner::new());
    binding.set_owner(Some(Arc::clone(&owner)));
    binding.set_enabled(true);

    let taps = Arc::new(AtomicUsize::new(0));
    binding.flush_frame(&screen(&taps, "Now playing", true));

    let button_id = owner.get_stable_id(StableKey::new(2));
    {
        let delivered = delivered.lock();
        assert_eq!(delivered.len(), 1);
        let first = &delivered[0];
        assert_eq!(first.tree.as_ref().map(|t| t.root), Some(accesskit::NodeId(0)));
        let (_, button) = first
            .nodes
            .iter()
            .find(|(id, _)| id.0 == button_id.as_raw())
            .expect("button node");
        assert_eq!(button.role(), accesskit::Role::Button);
        assert!(button.supports_action(accesskit::Action::Click));
    }

    let request = accesskit::ActionRequest {
        action: accesskit::Action::Click,
        target: accesskit::NodeId(button_id.as_raw()),
        data: None,
    };
    assert!(AccessKitBridge::dispatch(&binding, &request));
    assert_eq!(taps.load(Ordering::SeqCst), 1);
}
