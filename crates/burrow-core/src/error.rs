//! Error types.
//!
//! Two families live here:
//! - [`ReplError`]: host/environment faults. These are the only errors that
//!   may end a session loop early.
//! - [`Failure`]: recoverable failures (syntax errors, evaluation failures,
//!   rejected command arguments). They are reported to the user and the loop
//!   keeps going.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ReplError {
    #[error("input error: {0}")]
    Input(String),

    #[error("invalid command pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// A malformed unit reported by the completeness oracle.
    Syntax,
    /// Raised by evaluated code or by a command action.
    Evaluation,
    /// A matched command rejected its arguments.
    CommandArgument,
}

/// A reported (never propagated) failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    /// Short class name, e.g. `ZeroDivisionError`.
    pub name: String,
    pub message: String,
}

impl Failure {
    pub fn syntax(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Syntax,
            name: "SyntaxError".to_string(),
            message: message.into(),
        }
    }

    pub fn evaluation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Evaluation,
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn command_argument(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::CommandArgument,
            name: "ArgumentError".to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}
