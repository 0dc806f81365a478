use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::document::NodeId;

const MODIFIERS: [&str; 4] = ["ctrl", "alt", "shift", "meta"];

/// Modifier set plus key, parsed from strings such as `"Shift+Enter"`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyCombo {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
    /// Lower-cased key name; `None` when the combo only lists modifiers.
    pub key: Option<String>,
}

impl FromStr for KeyCombo {
    type Err = Infallible;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let lowered = raw.to_lowercase();
        let parts: Vec<&str> = lowered.split('+').map(str::trim).collect();
        Ok(Self {
            ctrl: parts.contains(&"ctrl"),
            alt: parts.contains(&"alt"),
            shift: parts.contains(&"shift"),
            meta: parts.contains(&"meta"),
            key: parts
                .iter()
                .find(|part| !MODIFIERS.contains(*part))
                .map(|part| part.to_string()),
        })
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        for (on, label) in [
            (self.ctrl, "Ctrl"),
            (self.alt, "Alt"),
            (self.shift, "Shift"),
            (self.meta, "Meta"),
        ] {
            if on {
                parts.push(label.to_string());
            }
        }
        if let Some(key) = &self.key {
            parts.push(key.clone());
        }
        f.write_str(&parts.join("+"))
    }
}

/// A keydown as delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: String,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub meta: bool,
    /// Element the event was dispatched on, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<NodeId>,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn on(mut self, target: NodeId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn is_enter(&self) -> bool {
        self.key == "Enter"
    }
}

impl KeyCombo {
    /// Exact modifier match plus case-insensitive key match.
    pub fn matches(&self, event: &KeyEvent) -> bool {
        event.ctrl == self.ctrl
            && event.alt == self.alt
            && event.shift == self.shift
            && event.meta == self.meta
            && self
                .key
                .as_deref()
                .is_some_and(|key| event.key.to_lowercase() == key)
    }
}
