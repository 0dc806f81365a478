use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use serde_json::Value;
use stepform_lib::{StepForm, StepFormSession};
use stepform_spec::{DefaultStepFrontend, Document, StepFrontend, WizardConfig};

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Document tree (JSON node spec)
    #[arg(value_name = "DOCUMENT")]
    pub document: PathBuf,
    /// Emit JSON instead of text
    #[arg(long = "json", default_value_t = false)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
pub struct StepSummary {
    pub order: usize,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    pub visible: bool,
}

#[derive(Debug, Serialize)]
pub struct FormSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub steps: Vec<StepSummary>,
    pub payload: Value,
}

pub fn load_document(path: &Path) -> Result<Document> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read document {}", path.display()))?;
    Document::from_json(&raw)
        .with_context(|| format!("failed to parse document {}", path.display()))
}

pub fn summarize(form: &StepForm) -> FormSummary {
    let snapshot = form.snapshot();
    let steps = snapshot
        .declared
        .iter()
        .map(|step| StepSummary {
            order: step.order,
            name: step.label().to_string(),
            condition: step.condition.clone(),
            visible: snapshot.visible.contains(step.node),
        })
        .collect();
    FormSummary {
        id: form.id().map(str::to_string),
        steps,
        payload: DefaultStepFrontend.render_json_ui(&form.payload()),
    }
}

pub fn run(args: &InspectArgs, config: &WizardConfig) -> Result<()> {
    let mut doc = load_document(&args.document)?;
    let session = StepFormSession::initialize(&mut doc, config);
    let summaries = session.forms().iter().map(summarize).collect::<Vec<_>>();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }
    if summaries.is_empty() {
        println!("No step forms found in {}", args.document.display());
        return Ok(());
    }
    for (form, summary) in session.forms().iter().zip(&summaries) {
        let visible = summary.steps.iter().filter(|step| step.visible).count();
        println!(
            "Form {}: {} declared, {} visible",
            summary.id.as_deref().unwrap_or("(unnamed)"),
            summary.steps.len(),
            visible
        );
        for step in &summary.steps {
            let mark = if step.visible { "x" } else { " " };
            let name = if step.name.is_empty() { "(unnamed)" } else { step.name.as_str() };
            match &step.condition {
                Some(condition) => {
                    println!("  [{mark}] {} {name}  when {condition}", step.order)
                }
                None => println!("  [{mark}] {} {name}", step.order),
            }
        }
        println!("{}", DefaultStepFrontend.render_text_ui(&form.payload()));
    }
    Ok(())
}
