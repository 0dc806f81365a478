use serde::Serialize;

use crate::config::MarkerConfig;
use crate::document::{Document, NodeId};

/// Position of the current step within the visible sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    /// One-based step number.
    pub current: usize,
    pub total: usize,
    pub percentage: f64,
}

impl Progress {
    pub fn new(index: usize, total: usize) -> Self {
        let current = index + 1;
        let percentage = if total > 1 {
            (index as f64 / (total - 1) as f64) * 100.0
        } else {
            100.0
        };
        Self {
            current,
            total,
            percentage,
        }
    }

    pub fn is_last(&self) -> bool {
        self.current == self.total
    }
}

/// Writes progress into the wrapper's bar and counter elements, when present.
#[derive(Debug, Clone, Copy)]
pub struct ProgressReporter {
    bar: Option<NodeId>,
    current: Option<NodeId>,
    total: Option<NodeId>,
}

impl ProgressReporter {
    pub fn locate(doc: &Document, wrapper: NodeId, markers: &MarkerConfig) -> Self {
        Self {
            bar: doc.query_attr(wrapper, &markers.progress_bar, None),
            current: doc.query_attr(wrapper, &markers.current_step, None),
            total: doc.query_attr(wrapper, &markers.total_steps, None),
        }
    }

    pub fn apply(&self, doc: &mut Document, progress: &Progress) {
        if let Some(bar) = self.bar {
            doc.set_style(bar, "width", format!("{}%", progress.percentage));
        }
        if let Some(current) = self.current {
            doc.set_text(current, progress.current.to_string());
        }
        if let Some(total) = self.total {
            doc.set_text(total, progress.total.to_string());
        }
    }
}
