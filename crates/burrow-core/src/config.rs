//! Session configuration.
//!
//! Configuration is an explicit value handed to [`crate::Session::new`];
//! nested sessions receive a clone of their parent's configuration.

use serde::{Deserialize, Serialize};

use crate::accumulator::SyntaxErrorPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Leading word of every prompt.
    pub prompt_name: String,
    /// Re-indent continuation lines using the oracle's indent level.
    pub auto_indent: bool,
    /// One level of indentation for `auto_indent`.
    pub indent: String,
    pub syntax_errors: SyntaxErrorPolicy,
    /// When set, only lines starting with this prefix can be commands.
    pub command_prefix: Option<String>,
    /// Evaluate a complete buffer right after a command returns normally.
    pub eval_after_command: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            prompt_name: "burrow".to_string(),
            auto_indent: false,
            indent: "  ".to_string(),
            syntax_errors: SyntaxErrorPolicy::default(),
            command_prefix: None,
            eval_after_command: true,
        }
    }
}

impl SessionConfig {
    pub fn with_prompt_name(mut self, name: impl Into<String>) -> Self {
        self.prompt_name = name.into();
        self
    }

    pub fn with_auto_indent(mut self, enabled: bool) -> Self {
        self.auto_indent = enabled;
        self
    }

    pub fn with_syntax_errors(mut self, policy: SyntaxErrorPolicy) -> Self {
        self.syntax_errors = policy;
        self
    }

    pub fn with_command_prefix(mut self, prefix: Option<String>) -> Self {
        self.command_prefix = prefix.filter(|p| !p.is_empty());
        self
    }

    pub fn with_eval_after_command(mut self, enabled: bool) -> Self {
        self.eval_after_command = enabled;
        self
    }

    /// The indentation unit when auto-indent is on.
    pub(crate) fn indent_unit(&self) -> Option<&str> {
        self.auto_indent.then_some(self.indent.as_str())
    }
}
