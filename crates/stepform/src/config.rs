use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use stepform_spec::WizardConfig;

/// Reads a TOML wizard configuration, or the defaults when no path is given.
pub fn load(path: Option<&Path>) -> Result<WizardConfig> {
    let Some(path) = path else {
        return Ok(WizardConfig::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: WizardConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    tracing::debug!(path = %path.display(), debounce_ms = config.debounce_ms, "config loaded");
    Ok(config)
}
