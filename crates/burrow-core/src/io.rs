//! Input/output collaborator contracts.

use std::fmt;

use crate::error::{Failure, ReplError};

/// Where input lines come from (a line editor, a script, a test queue).
pub trait LineSource {
    /// Show `prompt` and read one line.
    ///
    /// `Ok(None)` is the end-of-input signal (Ctrl-D, end of script).
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, ReplError>;
}

/// Where results, failures and notices go.
///
/// For every completed unit the session calls exactly one of
/// [`Output::present`] or [`Output::present_failure`].
pub trait Output {
    fn present(&mut self, value: &Value);
    fn present_failure(&mut self, failure: &Failure);
    /// Short status message such as the buffer-cleared notice.
    fn notice(&mut self, message: &str);
    /// Free-form text printed by commands (help, listings).
    fn print(&mut self, text: &str);
}

/// The opaque result of evaluating a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Presented, but renders as nothing.
    Nothing,
    /// The evaluator's display representation of the produced value.
    Inspected(String),
}

impl Value {
    pub fn inspected(repr: impl Into<String>) -> Self {
        Value::Inspected(repr.into())
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Value::Nothing)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nothing => Ok(()),
            Value::Inspected(repr) => f.write_str(repr),
        }
    }
}
