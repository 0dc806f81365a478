use serde::{Deserialize, Serialize};

use crate::document::{Document, NodeId};
use crate::keys::KeyCombo;

/// Attribute names the engine looks for in the host document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    /// Attribute and value identifying a wizard wrapper (`ms="wrapper"`).
    pub wrapper_attr: String,
    pub wrapper_value: String,
    pub step: String,
    pub step_name: String,
    pub condition: String,
    pub divider: String,
    pub keyboard_nav: String,
    pub next_key: String,
    pub prev_key: String,
    /// `ms-nav="prev"` / `ms-nav="next"` buttons.
    pub nav_button: String,
    /// `ms-nav-steps="container"` receives nav entries.
    pub nav_steps: String,
    pub progress_wrap: String,
    pub progress_bar: String,
    pub current_step: String,
    pub total_steps: String,
    pub change_last_button: String,
    pub submit_label: String,
    pub default_label: String,
    /// Inert marker standing in for `required` while a step is hidden.
    pub demoted_required: String,
    /// Marker for `required` suspended during a submission attempt.
    pub suspended_required: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            wrapper_attr: "ms".into(),
            wrapper_value: "wrapper".into(),
            step: "ms-step".into(),
            step_name: "ms-step-name".into(),
            condition: "data-condition".into(),
            divider: "ms-step-divider".into(),
            keyboard_nav: "ms-keyboard-nav".into(),
            next_key: "data-next-key".into(),
            prev_key: "data-prev-key".into(),
            nav_button: "ms-nav".into(),
            nav_steps: "ms-nav-steps".into(),
            progress_wrap: "ms-progress-wrap".into(),
            progress_bar: "ms-progress-bar".into(),
            current_step: "ms-current-step".into(),
            total_steps: "ms-total-steps".into(),
            change_last_button: "data-change-last-button".into(),
            submit_label: "data-submit-label".into(),
            default_label: "data-default-label".into(),
            demoted_required: "data-required".into(),
            suspended_required: "data-original-required".into(),
        }
    }
}

/// Engine-wide settings shared by every wizard instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardConfig {
    pub markers: MarkerConfig,
    /// Quiet interval before a burst of changes triggers a recompute.
    pub debounce_ms: u64,
    pub default_next_key: String,
    pub default_prev_key: String,
    /// Also react to child-list mutations, not only field changes.
    pub watch_structure: bool,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            markers: MarkerConfig::default(),
            debounce_ms: 100,
            default_next_key: "Shift+Enter".into(),
            default_prev_key: "Alt+Enter".into(),
            watch_structure: true,
        }
    }
}

/// Per-form options read from the form element's attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormOptions {
    pub keyboard_nav: bool,
    pub next_key: KeyCombo,
    pub prev_key: KeyCombo,
    pub change_last_button: bool,
    pub submit_label: String,
}

impl FormOptions {
    pub fn from_form(doc: &Document, form: NodeId, config: &WizardConfig) -> Self {
        let markers = &config.markers;
        let combo = |attr: &str, fallback: &str| {
            doc.attr(form, attr)
                .filter(|raw| !raw.trim().is_empty())
                .unwrap_or(fallback)
                .parse::<KeyCombo>()
                .unwrap_or_default()
        };
        Self {
            keyboard_nav: doc.has_attr(form, &markers.keyboard_nav),
            next_key: combo(&markers.next_key, &config.default_next_key),
            prev_key: combo(&markers.prev_key, &config.default_prev_key),
            change_last_button: doc.has_attr(form, &markers.change_last_button),
            submit_label: doc
                .attr(form, &markers.submit_label)
                .filter(|label| !label.trim().is_empty())
                .unwrap_or("Submit")
                .to_string(),
        }
    }
}
