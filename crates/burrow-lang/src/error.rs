use burrow_core::Failure;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}, column {column}: {problem}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub problem: ParseProblem,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseProblem {
    /// The offending token, or `end-of-input`.
    #[error("unexpected {0}")]
    Unexpected(String),

    #[error("nesting too deep")]
    TooDeep,
}

impl ParseError {
    /// Locate `rest` (a suffix of `source`) and describe the token there.
    pub(crate) fn at(source: &str, rest: &str) -> Self {
        let offset = source.len().saturating_sub(rest.len());
        Self::located(source, offset, ParseProblem::Unexpected(describe_token(rest)))
    }

    /// Nesting limit exceeded at byte `offset` of `source`.
    pub(crate) fn too_deep(source: &str, offset: usize) -> Self {
        Self::located(source, offset, ParseProblem::TooDeep)
    }

    fn located(source: &str, offset: usize, problem: ParseProblem) -> Self {
        let consumed = &source[..offset.min(source.len())];
        let line = consumed.matches('\n').count() + 1;
        let column = consumed
            .rfind('\n')
            .map_or(consumed.len(), |nl| consumed.len() - nl - 1)
            + 1;
        Self {
            line,
            column,
            problem,
        }
    }
}

fn describe_token(rest: &str) -> String {
    let rest = rest.trim_start_matches([' ', '\t']);
    let Some(first) = rest.chars().next() else {
        return "end-of-input".to_string();
    };
    if first == '\n' {
        return "end-of-line".to_string();
    }
    if first.is_ascii_alphanumeric() || first == '_' {
        let word: String = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        return format!("`{word}`");
    }
    format!("`{first}`")
}

impl From<ParseError> for Failure {
    fn from(err: ParseError) -> Self {
        Failure::syntax(err.to_string())
    }
}

/// Errors raised while running a program. Each maps to a Ruby-style class
/// name when reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("divided by 0")]
    ZeroDivision,

    #[error("undefined local variable or method `{name}' for {receiver}")]
    UndefinedName { name: String, receiver: String },

    #[error("undefined method `{name}' for {receiver}")]
    UndefinedMethod { name: String, receiver: String },

    #[error("{0}")]
    Type(String),

    #[error("wrong number of arguments (given {given}, expected {expected})")]
    Arity { given: usize, expected: usize },

    #[error("integer overflow")]
    Overflow,

    #[error("integer literal {0} out of range")]
    LiteralOutOfRange(String),

    #[error("stack level too deep")]
    StackTooDeep,

    #[error("{0}")]
    Session(String),
}

impl RuntimeError {
    pub fn class_name(&self) -> &'static str {
        match self {
            RuntimeError::ZeroDivision => "ZeroDivisionError",
            RuntimeError::UndefinedName { .. } | RuntimeError::UndefinedMethod { .. } => {
                "NameError"
            }
            RuntimeError::Type(_) => "TypeError",
            RuntimeError::Arity { .. } => "ArgumentError",
            RuntimeError::Overflow | RuntimeError::LiteralOutOfRange(_) => "RangeError",
            RuntimeError::StackTooDeep => "SystemStackError",
            RuntimeError::Session(_) => "RuntimeError",
        }
    }
}

impl From<RuntimeError> for Failure {
    fn from(err: RuntimeError) -> Self {
        Failure::evaluation(err.class_name(), err.to_string())
    }
}
