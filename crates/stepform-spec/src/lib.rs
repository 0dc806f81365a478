#![allow(missing_docs)]

pub mod condition;
pub mod config;
pub mod document;
pub mod frontend;
pub mod gate;
pub mod keys;
pub mod progress;
pub mod registry;
pub mod render;
pub mod required;
pub mod validity;

pub use condition::{
    ConditionCache, ConditionExpression, FieldSource, FieldValue, MalformedCondition, Operator,
    ScopedFields, evaluate, parse_numeric_prefix,
};
pub use config::{FormOptions, MarkerConfig, WizardConfig};
pub use document::{
    Document, DocumentError, Element, MutationKind, MutationRecord, NodeId, NodeSpec,
};
pub use frontend::{DefaultStepFrontend, StepFrontend};
pub use gate::{StepFailure, check_step, is_individually_visible, validate_all, validate_step};
pub use keys::{KeyCombo, KeyEvent};
pub use progress::{Progress, ProgressReporter};
pub use registry::{StepDefinition, StepRegistry, StepSnapshot, VisibleSequence};
pub use render::{
    ButtonState, LastButtonMode, NavEntry, RenderPayload, RenderStatus, build_render_payload,
    render_json_ui, render_text,
};
pub use required::{RequiredChanges, SuspendedRequired, suspend_hidden_required};
pub use validity::{ValidityKind, ValidityReport, check_validity, report_validity, will_validate};
