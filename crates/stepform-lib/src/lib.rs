pub mod controller;
pub mod reactor;
pub mod session;

use stepform_spec::{DocumentError, NodeId};
use thiserror::Error;

pub use controller::{
    HistoryEntry, KeyOutcome, NavigationState, StepForm, SubmitOutcome, Transition,
};
pub use reactor::{ChangeReactor, Debouncer, Trigger};
pub use session::StepFormSession;

#[derive(Debug, Error)]
pub enum StepFormError {
    #[error("wrapper {wrapper:?} is missing required markup: {reason}")]
    Configuration { wrapper: NodeId, reason: String },
    #[error("no steps are available to display")]
    EmptyVisibleSet,
    #[error("document error: {0}")]
    Document(#[from] DocumentError),
}

impl StepFormError {
    pub fn configuration(wrapper: NodeId, reason: impl Into<String>) -> Self {
        Self::Configuration {
            wrapper,
            reason: reason.into(),
        }
    }
}
