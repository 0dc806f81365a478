use std::time::Instant;

use stepform_spec::{Document, NodeId, RenderPayload, WizardConfig};

use crate::controller::StepForm;

/// Every wizard instance found in one document.
#[derive(Debug, Clone, Default)]
pub struct StepFormSession {
    forms: Vec<StepForm>,
}

impl StepFormSession {
    /// Creates one instance per wrapper. Wrappers that fail configuration are
    /// skipped after a single error log.
    pub fn initialize(doc: &mut Document, config: &WizardConfig) -> Self {
        let markers = &config.markers;
        let wrappers = doc.query_all(doc.root(), |element| {
            element.attrs.get(&markers.wrapper_attr) == Some(&markers.wrapper_value)
        });
        let mut forms = Vec::with_capacity(wrappers.len());
        for wrapper in wrappers {
            match StepForm::init(doc, wrapper, config) {
                Ok(form) => forms.push(form),
                Err(err) => tracing::error!(wrapper = wrapper.index(), %err, "skipping step form"),
            }
        }
        // Setup writes (divider removal, nav rendering) are not user changes.
        doc.take_mutations();
        tracing::info!(count = forms.len(), "initialized {} step forms", forms.len());
        Self { forms }
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }

    pub fn forms(&self) -> &[StepForm] {
        &self.forms
    }

    pub fn get(&self, index: usize) -> Option<&StepForm> {
        self.forms.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut StepForm> {
        self.forms.get_mut(index)
    }

    /// Instance attached to `wrapper`.
    pub fn by_wrapper(&mut self, wrapper: NodeId) -> Option<&mut StepForm> {
        self.forms.iter_mut().find(|form| form.wrapper() == wrapper)
    }

    /// Looks an instance up by the wrapper or form `id` attribute.
    pub fn by_id(&mut self, id: &str) -> Option<&mut StepForm> {
        self.forms.iter_mut().find(|form| form.id() == Some(id))
    }

    /// Drains the document's mutation log and hands each record to the instance
    /// whose form contains its target. Returns how many records were routed.
    pub fn dispatch_mutations(&mut self, doc: &mut Document, now: Instant) -> usize {
        let mut routed = 0;
        for record in doc.take_mutations() {
            if let Some(form) = self
                .forms
                .iter_mut()
                .find(|form| form.owns(doc, record.target))
                && form.observe(&record, now)
            {
                routed += 1;
            }
        }
        routed
    }

    /// Earliest pending debounce deadline across instances.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.forms
            .iter()
            .filter_map(StepForm::pending_deadline)
            .min()
    }

    /// Fires every instance whose quiet period has elapsed, collecting the fresh
    /// payloads.
    pub fn poll(&mut self, doc: &mut Document, now: Instant) -> Vec<RenderPayload> {
        let mut payloads = Vec::new();
        for form in &mut self.forms {
            match form.poll(doc, now) {
                Ok(Some(payload)) => payloads.push(payload),
                Ok(None) => {}
                Err(err) => tracing::error!(form = form.id().unwrap_or("-"), %err, "recompute failed"),
            }
        }
        payloads
    }
}
