use serde::Serialize;

use crate::document::{Document, NodeId};
use crate::registry::{StepDefinition, VisibleSequence};
use crate::validity::{ValidityReport, check_validity, report_validity};

/// First failing control of the first failing visible step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepFailure {
    pub step_index: usize,
    pub report: ValidityReport,
}

/// A control is individually visible when nothing between it and its step hides it.
pub fn is_individually_visible(doc: &Document, step: &StepDefinition, control: NodeId) -> bool {
    doc.is_rendered_within(control, step.node)
}

/// Validates the step's individually visible controls, stopping at the first
/// invalid one and surfacing its report.
pub fn validate_step(doc: &mut Document, step: &StepDefinition) -> Result<(), ValidityReport> {
    for control in step.fields(doc) {
        if !is_individually_visible(doc, step, control) {
            continue;
        }
        report_validity(doc, control)?;
    }
    Ok(())
}

/// Same walk as [`validate_step`] without touching the document.
pub fn check_step(doc: &Document, step: &StepDefinition) -> Result<(), ValidityReport> {
    step.fields(doc)
        .into_iter()
        .filter(|control| is_individually_visible(doc, step, *control))
        .try_for_each(|control| check_validity(doc, control))
}

pub fn validate_all(doc: &mut Document, visible: &VisibleSequence) -> Result<(), StepFailure> {
    for (step_index, step) in visible.iter().enumerate() {
        validate_step(doc, step).map_err(|report| StepFailure { step_index, report })?;
    }
    Ok(())
}
