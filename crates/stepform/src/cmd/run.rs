use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use stepform_lib::{StepForm, StepFormError, StepFormSession};
use stepform_spec::{
    DefaultStepFrontend, Document, KeyEvent, NodeId, RenderPayload, StepFrontend, WizardConfig,
};

use super::inspect::load_document;

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Document tree (JSON node spec)
    #[arg(value_name = "DOCUMENT")]
    pub document: PathBuf,
    /// Session script (JSON)
    #[arg(long, value_name = "script.json")]
    pub script: PathBuf,
    /// Wizard to drive, by wrapper or form id; overrides the script
    #[arg(long, value_name = "ID")]
    pub form: Option<String>,
    /// Emit one JSON document instead of text
    #[arg(long = "json", default_value_t = false)]
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub form: Option<String>,
    pub actions: Vec<ScriptAction>,
}

fn checked_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScriptAction {
    /// Sets a field's value, as typing would.
    Set { field: String, value: String },
    /// Checks or unchecks a checkbox or radio; `value` picks a group member.
    Check {
        field: String,
        #[serde(default)]
        value: Option<String>,
        #[serde(default = "checked_default")]
        checked: bool,
    },
    Next,
    Prev,
    Jump { index: usize },
    Key {
        key: String,
        #[serde(default)]
        ctrl: bool,
        #[serde(default)]
        alt: bool,
        #[serde(default)]
        shift: bool,
        #[serde(default)]
        meta: bool,
        /// Field the key is pressed in.
        #[serde(default)]
        field: Option<String>,
    },
    Submit,
    /// Advances the virtual clock, letting pending recomputes fire.
    Wait { ms: u64 },
}

impl ScriptAction {
    fn label(&self) -> String {
        match self {
            ScriptAction::Set { field, value } => format!("set {field} = {value:?}"),
            ScriptAction::Check { field, checked, .. } => format!("check {field} = {checked}"),
            ScriptAction::Next => "next".into(),
            ScriptAction::Prev => "prev".into(),
            ScriptAction::Jump { index } => format!("jump {index}"),
            ScriptAction::Key { key, .. } => format!("key {key}"),
            ScriptAction::Submit => "submit".into(),
            ScriptAction::Wait { ms } => format!("wait {ms}ms"),
        }
    }
}

/// Per-action record of the replay.
#[derive(Debug, Serialize)]
pub struct ReplayEntry {
    pub action: ScriptAction,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub outcome: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// Drives one wizard with a virtual clock.
pub struct Replay {
    doc: Document,
    session: StepFormSession,
    target: usize,
    started: Instant,
    elapsed: Duration,
}

impl Replay {
    pub fn new(mut doc: Document, config: &WizardConfig, form: Option<&str>) -> Result<Self> {
        let session = StepFormSession::initialize(&mut doc, config);
        let target = match form {
            Some(id) => session
                .forms()
                .iter()
                .position(|candidate| candidate.id() == Some(id))
                .ok_or_else(|| anyhow!("no step form with id '{id}'"))?,
            None if session.is_empty() => bail!("document contains no step forms"),
            None => 0,
        };
        Ok(Self {
            doc,
            session,
            target,
            started: Instant::now(),
            elapsed: Duration::ZERO,
        })
    }

    fn now(&self) -> Instant {
        self.started + self.elapsed
    }

    fn drive<T>(
        &mut self,
        action: impl FnOnce(&mut StepForm, &mut Document) -> Result<T, StepFormError>,
    ) -> Result<T> {
        let target = self.target;
        let form = self
            .session
            .get_mut(target)
            .ok_or_else(|| anyhow!("step form {target} is not available"))?;
        Ok(action(form, &mut self.doc)?)
    }

    pub fn payload(&self) -> Option<RenderPayload> {
        self.session.get(self.target).map(StepForm::payload)
    }

    fn field(&self, name: &str, value: Option<&str>) -> Result<NodeId> {
        let scope = self
            .session
            .get(self.target)
            .map(StepForm::form)
            .ok_or_else(|| anyhow!("step form {} is not available", self.target))?;
        let candidates = self.doc.controls_named(scope, name);
        let found = match value {
            Some(value) => candidates
                .into_iter()
                .find(|node| self.doc.value(*node) == value),
            None => candidates.into_iter().next(),
        };
        found.ok_or_else(|| anyhow!("no field named '{name}' in the form"))
    }

    /// Applies one action and returns its outcome plus the payload of the driven
    /// wizard, when it changed.
    pub fn apply(&mut self, action: &ScriptAction) -> Result<ReplayEntry> {
        let outcome = match action {
            ScriptAction::Set { field, value } => {
                let node = self.field(field, None)?;
                self.doc.set_value(node, value.clone());
                let now = self.now();
                self.session.dispatch_mutations(&mut self.doc, now);
                Value::Null
            }
            ScriptAction::Check {
                field,
                value,
                checked,
            } => {
                let node = self.field(field, value.as_deref())?;
                self.doc.set_checked(node, *checked);
                let now = self.now();
                self.session.dispatch_mutations(&mut self.doc, now);
                Value::Null
            }
            ScriptAction::Next => serde_json::to_value(self.drive(|form, doc| form.advance(doc))?)?,
            ScriptAction::Prev => serde_json::to_value(self.drive(|form, doc| form.retreat(doc))?)?,
            ScriptAction::Jump { index } => {
                serde_json::to_value(self.drive(|form, doc| form.go_to_step(doc, *index))?)?
            }
            ScriptAction::Key {
                key,
                ctrl,
                alt,
                shift,
                meta,
                field,
            } => {
                let target = match field {
                    Some(name) => Some(self.field(name, None)?),
                    None => None,
                };
                let event = KeyEvent {
                    key: key.clone(),
                    ctrl: *ctrl,
                    alt: *alt,
                    shift: *shift,
                    meta: *meta,
                    target,
                };
                serde_json::to_value(self.drive(|form, doc| form.handle_key(doc, &event))?)?
            }
            ScriptAction::Submit => serde_json::to_value(self.drive(|form, doc| form.submit(doc))?)?,
            ScriptAction::Wait { ms } => {
                self.elapsed += Duration::from_millis(*ms);
                let now = self.now();
                let fired = self.session.poll(&mut self.doc, now);
                json!({ "recomputed": fired.len() })
            }
        };
        let payload = match action {
            ScriptAction::Set { .. } | ScriptAction::Check { .. } => None,
            _ => self
                .payload()
                .map(|payload| DefaultStepFrontend.render_json_ui(&payload)),
        };
        Ok(ReplayEntry {
            action: action.clone(),
            outcome,
            payload,
        })
    }
}

pub fn load_script(path: &Path) -> Result<Script> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse script {}", path.display()))
}

pub fn run(args: &RunArgs, config: &WizardConfig) -> Result<()> {
    let doc = load_document(&args.document)?;
    let script = load_script(&args.script)?;
    let target = args.form.as_deref().or(script.form.as_deref());
    let mut replay = Replay::new(doc, config, target)?;

    let initial = replay
        .payload()
        .ok_or_else(|| anyhow!("step form is not available"))?;
    let mut entries = Vec::with_capacity(script.actions.len());
    if !args.json {
        println!("{}", DefaultStepFrontend.render_text_ui(&initial));
    }
    for action in &script.actions {
        let entry = replay.apply(action)?;
        if !args.json {
            println!();
            println!("> {}", action.label());
            if !entry.outcome.is_null() {
                println!("{}", entry.outcome);
            }
            if entry.payload.is_some()
                && let Some(payload) = replay.payload()
            {
                println!("{}", DefaultStepFrontend.render_text_ui(&payload));
            }
        }
        entries.push(entry);
    }

    if args.json {
        let output = json!({
            "initial": DefaultStepFrontend.render_json_ui(&initial),
            "steps": entries,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    }
    Ok(())
}
