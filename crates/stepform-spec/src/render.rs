use serde::Serialize;
use serde_json::{Value, json};

use crate::progress::Progress;
use crate::registry::VisibleSequence;

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStatus {
    /// A step is on screen.
    Active,
    /// Every declared step is condition-hidden.
    Empty,
    /// The form was submitted and navigation chrome is hidden.
    Submitted,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::Active => "active",
            RenderStatus::Empty => "empty",
            RenderStatus::Submitted => "submitted",
        }
    }
}

/// One navigation marker per visible step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavEntry {
    pub index: usize,
    pub name: String,
    pub is_active: bool,
    pub is_past: bool,
    /// Earlier markers (and the active one) accept clicks.
    pub clickable: bool,
}

/// Visibility and labelling of the navigation controls.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ButtonState {
    pub prev_visible: bool,
    pub next_visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_label: Option<String>,
    /// The next control submits the form instead of advancing.
    pub next_submits: bool,
    pub submit_visible: bool,
}

/// How the next button behaves on the last step.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LastButtonMode {
    pub enabled: bool,
    pub submit_label: String,
    pub default_label: String,
}

/// Collected payload handed to frontends after every transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_id: Option<String>,
    pub status: RenderStatus,
    pub current_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
    pub steps: Vec<NavEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
    pub buttons: ButtonState,
}

pub fn nav_entries(visible: &VisibleSequence, current: usize) -> Vec<NavEntry> {
    visible
        .iter()
        .enumerate()
        .map(|(index, step)| NavEntry {
            index,
            name: step.label().to_string(),
            is_active: index == current,
            is_past: index < current,
            clickable: index <= current,
        })
        .collect()
}

pub fn button_state(total: usize, current: usize, mode: &LastButtonMode) -> ButtonState {
    let is_last = current + 1 >= total;
    let mut state = ButtonState {
        prev_visible: current > 0,
        next_visible: !is_last,
        next_label: None,
        next_submits: false,
        submit_visible: is_last && !mode.enabled,
    };
    if mode.enabled {
        if is_last {
            state.next_visible = true;
            state.next_submits = true;
            state.next_label = Some(mode.submit_label.clone());
        } else {
            state.next_label = Some(mode.default_label.clone());
        }
    }
    state
}

pub fn build_render_payload(
    form_id: Option<&str>,
    visible: &VisibleSequence,
    current: Option<usize>,
    mode: &LastButtonMode,
) -> RenderPayload {
    let form_id = form_id.map(str::to_string);
    match current.and_then(|index| visible.get(index).map(|step| (index, step))) {
        Some((index, step)) => RenderPayload {
            form_id,
            status: RenderStatus::Active,
            current_index: Some(index),
            current_step: Some(step.label().to_string()),
            steps: nav_entries(visible, index),
            progress: Some(Progress::new(index, visible.len())),
            buttons: button_state(visible.len(), index, mode),
        },
        None => RenderPayload {
            form_id,
            status: RenderStatus::Empty,
            current_index: None,
            current_step: None,
            steps: Vec::new(),
            progress: None,
            buttons: ButtonState::default(),
        },
    }
}

pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    let title = payload.form_id.as_deref().unwrap_or("form");
    lines.push(format!("Form: {} ({})", title, payload.status.as_str()));
    match (&payload.progress, &payload.current_step) {
        (Some(progress), Some(step)) => {
            let step = if step.is_empty() { "(unnamed)" } else { step };
            lines.push(format!(
                "Step {}/{}: {} [{:.0}%]",
                progress.current, progress.total, step, progress.percentage
            ));
        }
        _ => lines.push("No step to display".to_string()),
    }
    if !payload.steps.is_empty() {
        let markers = payload
            .steps
            .iter()
            .map(|entry| {
                let name = if entry.name.is_empty() {
                    format!("#{}", entry.index + 1)
                } else {
                    entry.name.clone()
                };
                if entry.is_active {
                    format!("[{}]", name)
                } else if entry.is_past {
                    format!("{}*", name)
                } else {
                    name
                }
            })
            .collect::<Vec<_>>();
        lines.push(format!("Steps: {}", markers.join(" > ")));
    }
    let mut controls = Vec::new();
    if payload.buttons.prev_visible {
        controls.push("prev".to_string());
    }
    if payload.buttons.next_visible {
        let label = payload.buttons.next_label.as_deref().unwrap_or("next");
        controls.push(label.to_string());
    }
    if payload.buttons.submit_visible {
        controls.push("submit".to_string());
    }
    if !controls.is_empty() {
        lines.push(format!("Controls: {}", controls.join(", ")));
    }
    lines.join("\n")
}

pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let steps = payload
        .steps
        .iter()
        .map(|entry| {
            json!({
                "index": entry.index,
                "name": entry.name,
                "active": entry.is_active,
                "past": entry.is_past,
                "clickable": entry.clickable,
            })
        })
        .collect::<Vec<_>>();
    let progress = payload
        .progress
        .map(|progress| {
            json!({
                "current": progress.current,
                "total": progress.total,
                "percentage": progress.percentage,
            })
        })
        .unwrap_or(Value::Null);
    json!({
        "form_id": payload.form_id,
        "status": payload.status.as_str(),
        "current_index": payload.current_index,
        "current_step": payload.current_step,
        "steps": steps,
        "progress": progress,
        "buttons": {
            "prev": payload.buttons.prev_visible,
            "next": payload.buttons.next_visible,
            "next_label": payload.buttons.next_label,
            "next_submits": payload.buttons.next_submits,
            "submit": payload.buttons.submit_visible,
        },
    })
}
