//! Keeps the `required` constraint in step with step visibility.
//!
//! A control's effective `required` state is its declared state while its step is
//! visible, and absent otherwise. The declared state survives in an inert marker
//! attribute so it can be restored once the step comes back.

use serde::Serialize;

use crate::config::MarkerConfig;
use crate::document::{Document, NodeId};
use crate::registry::{StepDefinition, VisibleSequence};

const REQUIRED: &str = "required";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RequiredChanges {
    pub demoted: usize,
    pub restored: usize,
}

pub fn reconcile(
    doc: &mut Document,
    markers: &MarkerConfig,
    declared: &[StepDefinition],
    visible: &VisibleSequence,
) -> RequiredChanges {
    let mut changes = RequiredChanges::default();
    for step in declared {
        let step_visible = visible.contains(step.node);
        for control in step.fields(doc) {
            let required = doc.has_attr(control, REQUIRED);
            if required && !step_visible {
                doc.set_attr(control, &markers.demoted_required, "true");
                doc.remove_attr(control, REQUIRED);
                changes.demoted += 1;
            } else if !required
                && step_visible
                && doc.attr(control, &markers.demoted_required) == Some("true")
            {
                doc.set_attr(control, REQUIRED, "true");
                doc.remove_attr(control, &markers.demoted_required);
                changes.restored += 1;
            }
        }
    }
    if changes != RequiredChanges::default() {
        tracing::debug!(
            demoted = changes.demoted,
            restored = changes.restored,
            "required constraints reconciled"
        );
    }
    changes
}

/// Controls whose `required` was lifted for one submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[must_use = "suspended constraints must be restored when the submission is rejected"]
pub struct SuspendedRequired {
    nodes: Vec<NodeId>,
}

impl SuspendedRequired {
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Puts `required` back on every suspended control.
    pub fn restore(self, doc: &mut Document, markers: &MarkerConfig) {
        for node in self.nodes {
            if doc.has_attr(node, &markers.suspended_required) {
                doc.set_attr(node, REQUIRED, "true");
                doc.remove_attr(node, &markers.suspended_required);
            }
        }
    }
}

/// Lifts `required` from every control under `form` that is not individually
/// visible, i.e. hidden by markup between it and its step (or anywhere above it
/// when it sits outside any step).
pub fn suspend_hidden_required(
    doc: &mut Document,
    markers: &MarkerConfig,
    form: NodeId,
) -> SuspendedRequired {
    let candidates = doc.query_all(form, |element| {
        element.is_control() && element.attrs.contains_key(REQUIRED)
    });
    let mut nodes = Vec::new();
    for control in candidates {
        let owning_step = doc
            .parent(control)
            .and_then(|parent| doc.closest(parent, |element| element.attrs.contains_key(&markers.step)))
            .filter(|step| doc.contains(form, *step));
        let visible = match owning_step {
            Some(step) => doc.is_rendered_within(control, step),
            None => doc.is_rendered(control),
        };
        if !visible {
            doc.set_attr(control, &markers.suspended_required, "true");
            doc.remove_attr(control, REQUIRED);
            nodes.push(control);
        }
    }
    SuspendedRequired { nodes }
}
