//! Burrow: nested interactive sessions
//!
//! This crate is the language-agnostic core of a read-eval-print loop:
//! - a line accumulator that decides "command vs. continuation vs. complete unit",
//! - a context stack tracking which evaluation target is active,
//! - a command registry with ordered composition and override-on-conflict,
//! - and the session driver that wires them together and can spawn nested
//!   sessions on behalf of evaluated code.
//!
//! The target language itself is supplied from outside through the
//! [`CompletenessOracle`] and [`Evaluator`] traits; terminal I/O through
//! [`LineSource`] and [`Output`].

pub mod accumulator;
pub mod builtins;
pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod io;
pub mod prompt;
pub mod session;
pub mod testing;

pub use accumulator::{
    AccumulatorState, Completeness, CompletenessOracle, Feed, LineAccumulator, PendingBuffer,
    SyntaxErrorPolicy,
};
pub use command::{
    split_command_line, Command, CommandContext, CommandError, CommandMatch, CommandOutcome,
    CommandSet, Flag, MatchRule, Options,
};
pub use config::SessionConfig;
pub use context::{Context, ContextId, ContextStack, PopOutcome};
pub use error::{Failure, FailureKind, ReplError};
pub use io::{LineSource, Output, Value};
pub use prompt::PromptState;
pub use session::{Collaborators, Evaluator, ExitReason, Session, SessionExit, SessionHost};

/// Notice emitted whenever in-progress input is thrown away on request.
pub const BUFFER_CLEARED_NOTICE: &str = "Input buffer cleared!";
