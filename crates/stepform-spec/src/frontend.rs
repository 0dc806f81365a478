//! Output surfaces for a wizard's [`RenderPayload`].
//!
//! The payload describes one step-navigation state: current step, nav entries,
//! progress and button visibility. Frontends only decide how that state is
//! shown; they never move between steps themselves.

use serde_json::Value;

use crate::render::{RenderPayload, render_json_ui, render_text};

pub trait StepFrontend {
    /// Human-readable summary, one line per aspect of the current step.
    fn render_text_ui(&self, payload: &RenderPayload) -> String;
    /// Machine-readable view; `steps` mirrors the nav entries in visible order.
    fn render_json_ui(&self, payload: &RenderPayload) -> Value;
}

/// Renders through [`render_text`] and [`render_json_ui`] unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultStepFrontend;

impl StepFrontend for DefaultStepFrontend {
    fn render_text_ui(&self, payload: &RenderPayload) -> String {
        render_text(payload)
    }

    fn render_json_ui(&self, payload: &RenderPayload) -> Value {
        render_json_ui(payload)
    }
}
