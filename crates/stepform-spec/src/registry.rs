use serde::Serialize;

use crate::condition::{ConditionCache, FieldSource, ScopedFields};
use crate::config::MarkerConfig;
use crate::document::{Document, NodeId};

/// A declared step, discovered by scanning the form in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepDefinition {
    pub node: NodeId,
    /// Position in declaration order.
    pub order: usize,
    pub name: Option<String>,
    pub condition: Option<String>,
}

impl StepDefinition {
    /// Interactive controls inside the step, read fresh from the document.
    pub fn fields(&self, doc: &Document) -> Vec<NodeId> {
        doc.controls(self.node)
    }

    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

/// Order-preserving subset of declared steps whose condition currently holds.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct VisibleSequence {
    steps: Vec<StepDefinition>,
}

impl VisibleSequence {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&StepDefinition> {
        self.steps.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StepDefinition> {
        self.steps.iter()
    }

    pub fn as_slice(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn last_index(&self) -> Option<usize> {
        self.steps.len().checked_sub(1)
    }

    /// Index of the step rooted at `node`, if it is visible.
    pub fn position_of(&self, node: NodeId) -> Option<usize> {
        self.steps.iter().position(|step| step.node == node)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.position_of(node).is_some()
    }

    /// Clamps `index` into the sequence bounds; `None` when empty.
    pub fn clamp(&self, index: usize) -> Option<usize> {
        self.last_index().map(|last| index.min(last))
    }

    pub fn orders(&self) -> Vec<usize> {
        self.steps.iter().map(|step| step.order).collect()
    }
}

impl<'a> IntoIterator for &'a VisibleSequence {
    type Item = &'a StepDefinition;
    type IntoIter = std::slice::Iter<'a, StepDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

/// Result of one recompute: every declared step plus the visible ones.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StepSnapshot {
    pub declared: Vec<StepDefinition>,
    pub visible: VisibleSequence,
}

/// Scans step markers under a form and filters them by condition.
#[derive(Debug, Clone)]
pub struct StepRegistry {
    form: NodeId,
    markers: MarkerConfig,
    conditions: ConditionCache,
}

impl StepRegistry {
    pub fn new(form: NodeId, markers: MarkerConfig) -> Self {
        Self {
            form,
            markers,
            conditions: ConditionCache::new(),
        }
    }

    pub fn form(&self) -> NodeId {
        self.form
    }

    pub fn markers(&self) -> &MarkerConfig {
        &self.markers
    }

    /// Removes decorative divider markers; run once at initialization.
    pub fn excise_dividers(&self, doc: &mut Document) -> usize {
        let dividers = doc.query_all_with_attr(self.form, &self.markers.divider);
        let mut removed = 0;
        for divider in dividers {
            if doc.remove(divider).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    /// Declared steps in document order.
    pub fn scan(&self, doc: &Document) -> Vec<StepDefinition> {
        doc.query_all_with_attr(self.form, &self.markers.step)
            .into_iter()
            .enumerate()
            .map(|(order, node)| StepDefinition {
                node,
                order,
                name: non_empty(doc.attr(node, &self.markers.step_name))
                    .or_else(|| non_empty(doc.attr(node, &self.markers.step))),
                condition: non_empty(doc.attr(node, &self.markers.condition)),
            })
            .collect()
    }

    pub fn filter(&mut self, doc: &Document, steps: &[StepDefinition]) -> VisibleSequence {
        let fields = ScopedFields::new(doc, self.form);
        self.filter_with(steps, &fields)
    }

    /// Keeps steps without a condition and steps whose condition holds.
    pub fn filter_with<S: FieldSource + ?Sized>(
        &mut self,
        steps: &[StepDefinition],
        fields: &S,
    ) -> VisibleSequence {
        let steps = steps
            .iter()
            .filter(|step| match &step.condition {
                Some(condition) => self.conditions.evaluate(condition, fields),
                None => true,
            })
            .cloned()
            .collect();
        VisibleSequence { steps }
    }

    pub fn recompute(&mut self, doc: &Document) -> StepSnapshot {
        let declared = self.scan(doc);
        let visible = self.filter(doc, &declared);
        tracing::trace!(
            declared = declared.len(),
            visible = visible.len(),
            "steps recomputed"
        );
        StepSnapshot { declared, visible }
    }
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.filter(|value| !value.trim().is_empty())
        .map(str::to_string)
}
