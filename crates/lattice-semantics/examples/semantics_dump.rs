//! Build a semantics tree for a small form, print it, lint it and show the
//! update batches a platform bridge would receive.
//!
//! Run with: cargo run -p lattice-semantics --example semantics_dump

use std::sync::Arc;

use lattice_semantics::lint::{self, LintOptions};
use lattice_semantics::{
    ActionArgs, DescribesSemantics, Rect, RenderSemantics, SemanticsAction, SemanticsBinding,
    SemanticsConfiguration, SemanticsFlags, SemanticsOwner, SemanticsRole, SemanticsTreeDebug,
    StableKey, TreeFormatOptions,
};

struct Field {
    key: u64,
    bounds: Rect,
    role: SemanticsRole,
    label: &'static str,
    interactive: bool,
}

struct Form {
    fields: Vec<Field>,
}

impl RenderSemantics for Form {
    fn semantics_key(&self) -> StableKey {
        StableKey::new(0)
    }

    fn semantics_bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, 320.0, 480.0)
    }

    fn visit_semantics_children(&self, visitor: &mut dyn FnMut(&dyn RenderSemantics)) {
        for field in &self.fields {
            visitor(field);
        }
    }
}

impl RenderSemantics for Field {
    fn semantics_key(&self) -> StableKey {
        StableKey::new(self.key)
    }

    fn semantics_bounds(&self) -> Rect {
        self.bounds
    }

    fn visit_semantics_children(&self, _visitor: &mut dyn FnMut(&dyn RenderSemantics)) {}

    fn as_describes_semantics(&self) -> Option<&dyn DescribesSemantics> {
        Some(self)
    }
}

impl DescribesSemantics for Field {
    fn describe_semantics_configuration(&self, config: &mut SemanticsConfiguration) -> bool {
        config.properties.role = self.role;
        config.properties.label = self.label.into();
        if self.role == SemanticsRole::Checkbox {
            config.properties.flags |= SemanticsFlags::HAS_CHECKED_STATE;
        }
        if self.interactive {
            let label = self.label;
            config
                .actions_mut()
                .set_handler(SemanticsAction::Tap, move |_| println!("  -> {label:?} tapped"));
        }
        true
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let form = Form {
        fields: vec![
            Field {
                key: 1,
                bounds: Rect::new(16.0, 16.0, 288.0, 48.0),
                role: SemanticsRole::TextField,
                label: "",
                interactive: true,
            },
            Field {
                key: 2,
                bounds: Rect::new(16.0, 80.0, 24.0, 24.0),
                role: SemanticsRole::Checkbox,
                label: "Remember me",
                interactive: true,
            },
            Field {
                key: 3,
                bounds: Rect::new(16.0, 120.0, 288.0, 48.0),
                role: SemanticsRole::Button,
                label: "Sign in",
                interactive: true,
            },
        ],
    };

    let binding = SemanticsBinding::new();
    binding.set_send_function(|update| {
        println!("platform <- {} updates, {} removals", update.updates.len(), update.removals.len());
        Ok(())
    });
    let owner = Arc::new(SemanticsOwner::new());
    binding.set_owner(Some(Arc::clone(&owner)));
    binding.set_enabled(true);

    binding.flush_frame(&form);

    println!();
    print!("{}", SemanticsTreeDebug::with_options(TreeFormatOptions::detailed()).format_owner(&owner));

    println!();
    println!("Lint:");
    for result in lint::lint_with_options(owner.root().as_ref(), &LintOptions::all()) {
        println!("  {result}");
        println!("    {}", result.suggestion);
    }

    println!();
    let sign_in = owner.get_stable_id(StableKey::new(3));
    binding.handle_action(sign_in, SemanticsAction::Tap, &ActionArgs::None);

    // A second identical frame produces no traffic.
    binding.flush_frame(&form);
}
