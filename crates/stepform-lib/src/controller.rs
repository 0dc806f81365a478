use std::time::{Duration, Instant};

use serde::Serialize;
use stepform_spec::render::{button_state, nav_entries};
use stepform_spec::required::reconcile;
use stepform_spec::{
    Document, FormOptions, KeyEvent, LastButtonMode, MutationRecord, NodeId, NodeSpec, Progress,
    ProgressReporter, RenderPayload, RenderStatus, StepFailure, StepRegistry, StepSnapshot,
    ValidityReport, WizardConfig, build_render_payload, is_individually_visible, report_validity,
    suspend_hidden_required, validate_all, validate_step,
};

use crate::StepFormError;
use crate::reactor::{ChangeReactor, Trigger};

const STEP_INDEX_ATTR: &str = "data-step-index";

/// A position the user left, remembered for "back".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub index: usize,
    pub step: NodeId,
}

/// Current position plus back-history for one wizard instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NavigationState {
    current: Option<usize>,
    current_step: Option<NodeId>,
    history: Vec<HistoryEntry>,
}

impl NavigationState {
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn current_step(&self) -> Option<NodeId> {
        self.current_step
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    fn set(&mut self, index: usize, step: NodeId) {
        self.current = Some(index);
        self.current_step = Some(step);
    }

    fn clear_current(&mut self) {
        self.current = None;
        self.current_step = None;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Every visible step passed; `suspended` constraints stay lifted.
    Accepted { suspended: usize },
    Rejected(StepFailure),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Moved { from: usize, to: usize },
    /// The visible sequence changed under the user; the action was not applied.
    Resynced { to: usize },
    Unchanged,
    Blocked(ValidityReport),
    Submitted(SubmitOutcome),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyOutcome {
    Ignored,
    /// Plain Enter was swallowed without navigating.
    DefaultPrevented,
    Handled(Transition),
}

#[derive(Debug, Clone, Copy, Default)]
struct Chrome {
    prev: Option<NodeId>,
    next: Option<NodeId>,
    nav_container: Option<NodeId>,
    progress_wrap: Option<NodeId>,
}

/// One wizard instance bound to a wrapper element.
#[derive(Debug, Clone)]
pub struct StepForm {
    id: Option<String>,
    wrapper: NodeId,
    form: NodeId,
    registry: StepRegistry,
    options: FormOptions,
    chrome: Chrome,
    progress: ProgressReporter,
    default_label: String,
    snapshot: StepSnapshot,
    state: NavigationState,
    reactor: ChangeReactor,
    submitted: bool,
    /// Entry nodes owned by the nav container, reused across renders.
    nav_nodes: Vec<NodeId>,
}

impl StepForm {
    pub fn init(
        doc: &mut Document,
        wrapper: NodeId,
        config: &WizardConfig,
    ) -> Result<Self, StepFormError> {
        let form = doc
            .query_first(wrapper, |element| element.tag == "form")
            .ok_or_else(|| StepFormError::configuration(wrapper, "form not found in wrapper"))?;
        let markers = config.markers.clone();
        let options = FormOptions::from_form(doc, form, config);
        let chrome = Chrome {
            prev: doc.query_attr(wrapper, &markers.nav_button, Some("prev")),
            next: doc.query_attr(wrapper, &markers.nav_button, Some("next")),
            nav_container: doc.query_attr(wrapper, &markers.nav_steps, Some("container")),
            progress_wrap: doc.query_attr(wrapper, &markers.progress_wrap, None),
        };

        let mut default_label = "Next".to_string();
        if let Some(next) = chrome.next {
            let declared = doc
                .attr(next, &markers.default_label)
                .filter(|label| !label.trim().is_empty())
                .map(str::to_string);
            match declared {
                Some(label) => default_label = label,
                None => {
                    let text = doc.text(next).trim().to_string();
                    if !text.is_empty() {
                        default_label = text;
                    }
                    if options.change_last_button {
                        doc.set_attr(next, &markers.default_label, default_label.clone());
                    }
                }
            }
        }

        let id = doc
            .attr(wrapper, "id")
            .or_else(|| doc.attr(form, "id"))
            .map(str::to_string);
        let progress = ProgressReporter::locate(doc, wrapper, &markers);
        let registry = StepRegistry::new(form, markers);
        let dividers = registry.excise_dividers(doc);

        let mut instance = Self {
            id,
            wrapper,
            form,
            registry,
            options,
            chrome,
            progress,
            default_label,
            snapshot: StepSnapshot::default(),
            state: NavigationState::default(),
            reactor: ChangeReactor::new(
                Duration::from_millis(config.debounce_ms),
                config.watch_structure,
            ),
            submitted: false,
            nav_nodes: Vec::new(),
        };

        match instance.show_step(doc, 0, false) {
            Ok(_) | Err(StepFormError::EmptyVisibleSet) => {}
            Err(err) => return Err(err),
        }
        doc.set_display(wrapper, "block");
        doc.set_style(wrapper, "opacity", "1");

        tracing::info!(
            form = instance.id.as_deref().unwrap_or("-"),
            declared = instance.snapshot.declared.len(),
            visible = instance.snapshot.visible.len(),
            dividers,
            "step form initialized"
        );
        Ok(instance)
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn wrapper(&self) -> NodeId {
        self.wrapper
    }

    pub fn form(&self) -> NodeId {
        self.form
    }

    pub fn options(&self) -> &FormOptions {
        &self.options
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn snapshot(&self) -> &StepSnapshot {
        &self.snapshot
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub fn current_step_index(&self) -> Option<usize> {
        self.state.current
    }

    /// Whether a mutation on `node` concerns this instance. Nodes the engine renders
    /// itself are excluded.
    pub fn owns(&self, doc: &Document, node: NodeId) -> bool {
        doc.contains(self.form, node)
            && !self
                .chrome
                .nav_container
                .is_some_and(|container| doc.contains(container, node))
    }

    pub fn payload(&self) -> RenderPayload {
        let mut payload = build_render_payload(
            self.id.as_deref(),
            &self.snapshot.visible,
            self.state.current,
            &self.last_button_mode(),
        );
        if self.submitted && payload.status == RenderStatus::Active {
            payload.status = RenderStatus::Submitted;
        }
        payload
    }

    pub fn advance(&mut self, doc: &mut Document) -> Result<Transition, StepFormError> {
        let (current, displaced) = self.sync(doc)?;
        if displaced {
            return Ok(Transition::Resynced { to: current });
        }
        let step = self
            .snapshot
            .visible
            .get(current)
            .cloned()
            .ok_or(StepFormError::EmptyVisibleSet)?;
        if let Err(report) = validate_step(doc, &step) {
            tracing::warn!(
                form = self.id.as_deref().unwrap_or("-"),
                step = current,
                kind = ?report.kind,
                "step failed validation"
            );
            return Ok(Transition::Blocked(report));
        }
        if current + 1 >= self.snapshot.visible.len() {
            if self.options.change_last_button {
                return self.submit(doc).map(Transition::Submitted);
            }
            return Ok(Transition::Unchanged);
        }
        self.state.history.push(HistoryEntry {
            index: current,
            step: step.node,
        });
        let to = self.show_step(doc, current + 1, true)?;
        tracing::debug!(from = current, to, "advanced");
        Ok(Transition::Moved { from: current, to })
    }

    pub fn retreat(&mut self, doc: &mut Document) -> Result<Transition, StepFormError> {
        let (current, _) = self.sync(doc)?;
        let visible = &self.snapshot.visible;
        let target = match self.state.history.pop() {
            Some(entry) => visible
                .position_of(entry.step)
                .or_else(|| visible.clamp(entry.index)),
            None if current > 0 => Some(current - 1),
            None => None,
        };
        let Some(target) = target else {
            return Ok(Transition::Unchanged);
        };
        let to = self.show_step(doc, target, true)?;
        tracing::debug!(from = current, to, "retreated");
        Ok(Transition::Moved { from: current, to })
    }

    /// Jumps back to an earlier visible step without validating the current one.
    pub fn go_to_step(
        &mut self,
        doc: &mut Document,
        target: usize,
    ) -> Result<Transition, StepFormError> {
        let (current, _) = self.sync(doc)?;
        if target >= current {
            tracing::debug!(current, target, "jump ignored");
            return Ok(Transition::Unchanged);
        }
        if let Some(step) = self.state.current_step {
            self.state.history.push(HistoryEntry {
                index: current,
                step,
            });
        }
        let to = self.show_step(doc, target, true)?;
        tracing::debug!(from = current, to, "jumped");
        Ok(Transition::Moved { from: current, to })
    }

    /// Click on a rendered nav entry.
    pub fn select_nav_entry(
        &mut self,
        doc: &mut Document,
        entry: NodeId,
    ) -> Result<Transition, StepFormError> {
        match doc
            .attr(entry, STEP_INDEX_ATTR)
            .and_then(|raw| raw.parse::<usize>().ok())
        {
            Some(index) => self.go_to_step(doc, index),
            None => Ok(Transition::Unchanged),
        }
    }

    /// True when the current step passes (or there is no step to check).
    pub fn validate_current_step(&mut self, doc: &mut Document) -> bool {
        let Ok((current, _)) = self.sync(doc) else {
            return true;
        };
        match self.snapshot.visible.get(current).cloned() {
            Some(step) => validate_step(doc, &step).is_ok(),
            None => true,
        }
    }

    pub fn submit(&mut self, doc: &mut Document) -> Result<SubmitOutcome, StepFormError> {
        self.recompute(doc);
        let suspended = suspend_hidden_required(doc, self.registry.markers(), self.form);
        match validate_all(doc, &self.snapshot.visible) {
            Ok(()) => {
                let suspended = suspended.len();
                for chrome in [
                    self.chrome.prev,
                    self.chrome.next,
                    self.chrome.nav_container,
                    self.chrome.progress_wrap,
                ]
                .into_iter()
                .flatten()
                {
                    doc.set_display(chrome, "none");
                }
                self.submitted = true;
                tracing::info!(
                    form = self.id.as_deref().unwrap_or("-"),
                    suspended,
                    "form submitted"
                );
                Ok(SubmitOutcome::Accepted { suspended })
            }
            Err(failure) => {
                suspended.restore(doc, self.registry.markers());
                let visible = &self.snapshot.visible;
                self.state.history.retain(|entry| {
                    visible
                        .position_of(entry.step)
                        .is_some_and(|position| position < failure.step_index)
                });
                let shown = self.show_step(doc, failure.step_index, true)?;
                let report = report_validity(doc, failure.report.node)
                    .err()
                    .unwrap_or(failure.report);
                tracing::warn!(
                    form = self.id.as_deref().unwrap_or("-"),
                    step = shown,
                    kind = ?report.kind,
                    "submission rejected"
                );
                Ok(SubmitOutcome::Rejected(StepFailure {
                    step_index: shown,
                    report,
                }))
            }
        }
    }

    pub fn handle_key(
        &mut self,
        doc: &mut Document,
        event: &KeyEvent,
    ) -> Result<KeyOutcome, StepFormError> {
        if !self.options.keyboard_nav {
            return Ok(KeyOutcome::Ignored);
        }
        if let Some(target) = event.target
            && (!doc.contains(self.form, target)
                || doc.element(target).is_some_and(|element| element.tag == "textarea"))
        {
            return Ok(KeyOutcome::Ignored);
        }
        if self.options.next_key.matches(event) {
            return self.advance(doc).map(KeyOutcome::Handled);
        }
        if self.options.prev_key.matches(event) {
            return self.retreat(doc).map(KeyOutcome::Handled);
        }
        if !event.is_enter() {
            return Ok(KeyOutcome::Ignored);
        }
        let (current, _) = self.sync(doc)?;
        if current + 1 == self.snapshot.visible.len()
            && let Some(step) = self.snapshot.visible.get(current).cloned()
            && validate_step(doc, &step).is_ok()
        {
            return self
                .submit(doc)
                .map(|outcome| KeyOutcome::Handled(Transition::Submitted(outcome)));
        }
        Ok(KeyOutcome::DefaultPrevented)
    }

    pub fn notify_change(&mut self, now: Instant) -> bool {
        self.reactor.notify(Trigger::FieldChange, now)
    }

    pub fn notify_structure(&mut self, now: Instant) -> bool {
        self.reactor.notify(Trigger::Structure, now)
    }

    pub fn observe(&mut self, record: &MutationRecord, now: Instant) -> bool {
        self.reactor.observe(record, now)
    }

    pub fn pending_deadline(&self) -> Option<Instant> {
        self.reactor.deadline()
    }

    /// Runs the debounced recompute once its quiet period has elapsed.
    pub fn poll(
        &mut self,
        doc: &mut Document,
        now: Instant,
    ) -> Result<Option<RenderPayload>, StepFormError> {
        let Some(coalesced) = self.reactor.poll(now) else {
            return Ok(None);
        };
        tracing::debug!(
            form = self.id.as_deref().unwrap_or("-"),
            coalesced,
            "recomputing visible steps"
        );
        self.reconcile_after_filter(doc)?;
        Ok(Some(self.payload()))
    }

    /// Re-derives the visible sequence and keeps the user on the same step when it
    /// survived, clamping otherwise.
    pub fn reconcile_after_filter(&mut self, doc: &mut Document) -> Result<(), StepFormError> {
        match self.sync(doc) {
            Ok((index, false)) => self.render(doc, index, false).map(|_| ()),
            Ok((_, true)) | Err(StepFormError::EmptyVisibleSet) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Recomputes and re-anchors the current position. When the current step is
    /// gone, the clamped step is rendered and `true` is returned alongside.
    fn sync(&mut self, doc: &mut Document) -> Result<(usize, bool), StepFormError> {
        self.recompute(doc);
        let kept = self
            .state
            .current_step
            .and_then(|step| self.snapshot.visible.position_of(step));
        match kept {
            Some(index) => {
                self.state.current = Some(index);
                Ok((index, false))
            }
            None => {
                let index = self.render(doc, self.state.current.unwrap_or(0), false)?;
                tracing::debug!(index, "current step hidden, position clamped");
                Ok((index, true))
            }
        }
    }

    /// Re-derives the step snapshot and brings `required` in line with it, even
    /// when nothing is left to display.
    fn recompute(&mut self, doc: &mut Document) {
        self.snapshot = self.registry.recompute(doc);
        reconcile(
            doc,
            self.registry.markers(),
            &self.snapshot.declared,
            &self.snapshot.visible,
        );
    }

    fn show_step(
        &mut self,
        doc: &mut Document,
        index: usize,
        focus: bool,
    ) -> Result<usize, StepFormError> {
        self.recompute(doc);
        self.render(doc, index, focus)
    }

    fn render(
        &mut self,
        doc: &mut Document,
        index: usize,
        focus: bool,
    ) -> Result<usize, StepFormError> {
        for step in &self.snapshot.declared {
            doc.set_display(step.node, "none");
            doc.set_attr(step.node, "aria-hidden", "true");
            doc.set_attr(step.node, "role", "tabpanel");
        }
        let visible = &self.snapshot.visible;
        let Some((index, step)) = visible
            .clamp(index)
            .and_then(|index| visible.get(index).map(|step| (index, step.clone())))
        else {
            self.state.clear_current();
            tracing::warn!(
                form = self.id.as_deref().unwrap_or("-"),
                "no steps are available to display"
            );
            return Err(StepFormError::EmptyVisibleSet);
        };

        doc.set_display(step.node, "block");
        doc.set_attr(step.node, "aria-hidden", "false");
        self.state.set(index, step.node);

        self.render_nav(doc, index)?;
        self.render_buttons(doc, index);
        self.progress
            .apply(doc, &Progress::new(index, self.snapshot.visible.len()));

        if focus
            && let Some(first) = step
                .fields(doc)
                .into_iter()
                .find(|control| is_individually_visible(doc, &step, *control))
        {
            doc.focus(first);
        }
        tracing::debug!(index, step = step.label(), focus, "step shown");
        Ok(index)
    }

    fn render_nav(&mut self, doc: &mut Document, index: usize) -> Result<(), StepFormError> {
        let Some(container) = self.chrome.nav_container else {
            return Ok(());
        };
        for child in doc.children(container).to_vec() {
            doc.remove(child)?;
        }
        for (position, entry) in nav_entries(&self.snapshot.visible, index)
            .into_iter()
            .enumerate()
        {
            let node = match self.nav_nodes.get(position) {
                Some(&node) => {
                    doc.reattach(container, node)?;
                    node
                }
                None => {
                    let node = doc.append_child(container, &NodeSpec::new("div"))?;
                    self.nav_nodes.push(node);
                    node
                }
            };
            doc.set_attr(node, "role", "tab");
            doc.set_attr(node, "aria-selected", entry.is_active.to_string());
            doc.set_attr(node, "tabindex", if entry.is_active { "0" } else { "-1" });
            doc.set_attr(node, STEP_INDEX_ATTR, entry.index.to_string());
            if entry.is_active {
                doc.set_attr(node, "class", "is-active");
            } else if !entry.clickable {
                doc.set_attr(node, "class", "is-deactive");
            } else {
                doc.remove_attr(node, "class");
            }
            doc.set_text(node, entry.name);
        }
        Ok(())
    }

    fn render_buttons(&self, doc: &mut Document, index: usize) {
        let total = self.snapshot.visible.len();
        let state = button_state(total, index, &self.last_button_mode());
        let display = |shown: bool| if shown { "inline-block" } else { "none" };

        if let Some(prev) = self.chrome.prev {
            doc.set_display(prev, display(state.prev_visible));
            doc.set_attr(prev, "aria-disabled", (index == 0).to_string());
        }
        if let Some(next) = self.chrome.next {
            doc.set_display(next, display(state.next_visible));
            doc.set_attr(next, "aria-disabled", (index + 1 >= total).to_string());
            if let Some(label) = &state.next_label {
                doc.set_text(next, label.clone());
            }
        }
        let submits = doc.query_all(self.form, |element| {
            element.attrs.get("type").is_some_and(|kind| kind == "submit")
        });
        for submit in submits {
            doc.set_display(submit, display(state.submit_visible));
        }
    }

    fn last_button_mode(&self) -> LastButtonMode {
        LastButtonMode {
            enabled: self.options.change_last_button,
            submit_label: self.options.submit_label.clone(),
            default_label: self.default_label.clone(),
        }
    }
}
