//! Session configuration: an optional JSON file, then command-line overrides.

use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result};
use burrow_core::{SessionConfig, SyntaxErrorPolicy};

/// Settings given on the command line; `None`/`false` leaves the file value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub prompt_name: Option<String>,
    pub auto_indent: bool,
    pub syntax_errors: Option<SyntaxErrorPolicy>,
    pub command_prefix: Option<String>,
}

impl Overrides {
    pub fn apply(&self, mut config: SessionConfig) -> SessionConfig {
        if let Some(name) = &self.prompt_name {
            config = config.with_prompt_name(name.clone());
        }
        if self.auto_indent {
            config = config.with_auto_indent(true);
        }
        if let Some(policy) = self.syntax_errors {
            config = config.with_syntax_errors(policy);
        }
        if self.command_prefix.is_some() {
            config = config.with_command_prefix(self.command_prefix.clone());
        }
        config
    }
}

/// Read a JSON config file. Missing keys take their defaults.
pub fn load(path: Option<&Path>) -> Result<SessionConfig> {
    let Some(path) = path else {
        return Ok(SessionConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: SessionConfig = serde_json::from_str(&text)
        .with_context(|| format!("invalid config {}", path.display()))?;
    tracing::debug!(path = %path.display(), ?config, "loaded config");
    Ok(config)
}
