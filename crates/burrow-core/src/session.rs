//! The session driver.
//!
//! One [`Session`] owns a context stack, a line accumulator, a resolved
//! command set and its configuration. Each loop iteration renders a prompt,
//! reads one line, routes it through command matching and then the
//! accumulator, and presents evaluation results. The loop ends when the
//! context stack is empty.
//!
//! Nested sessions are started by evaluated code through [`SessionHost`]: the
//! child gets its own accumulator and a stack seeded with the requested
//! context, and runs to completion while the parent is suspended inside its
//! evaluation call. End of input in the child only ends the child.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::accumulator::{AccumulatorState, CompletenessOracle, Feed, LineAccumulator};
use crate::command::{Command, CommandContext, CommandError, CommandOutcome, CommandSet, Options};
use crate::config::SessionConfig;
use crate::context::{Context, ContextStack, PopOutcome};
use crate::error::{Failure, ReplError};
use crate::io::{LineSource, Output, Value};
use crate::prompt::PromptState;
use crate::BUFFER_CLEARED_NOTICE;

/// The external interpreter for the target language.
pub trait Evaluator {
    /// Execute a complete unit against `target`.
    ///
    /// `host` is the only way evaluated code may affect sessions: it can
    /// start a nested session. The evaluator must not touch the caller's
    /// context stack otherwise.
    fn evaluate(
        &mut self,
        source: &str,
        target: &Context,
        host: &mut dyn SessionHost,
    ) -> Result<Value, Failure>;

    /// Turn a navigation argument (e.g. `cd 10`) into a context, evaluating
    /// `expr` against `current`.
    fn resolve_context(&mut self, expr: &str, current: &Context) -> Result<Context, Failure>;

    /// `context` left the stack for good. Evaluators that keep per-context
    /// state drop it here.
    fn release(&mut self, _context: &Context) {}
}

/// Capability handed to evaluated code.
pub trait SessionHost {
    /// Session nesting depth of the caller (0 for the outermost session).
    fn depth(&self) -> usize;

    /// Build a new session bound to `target` and drive it until it exits.
    /// The caller's own stack and buffer are untouched.
    fn start_session(
        &mut self,
        target: Context,
        evaluator: &mut dyn Evaluator,
    ) -> Result<SessionExit, ReplError>;
}

/// Borrowed collaborators shared by a session and all of its children.
pub struct Collaborators<'a> {
    pub input: &'a mut dyn LineSource,
    pub output: &'a mut dyn Output,
    pub oracle: &'a dyn CompletenessOracle,
}

impl<'a> Collaborators<'a> {
    pub fn new(
        input: &'a mut dyn LineSource,
        output: &'a mut dyn Output,
        oracle: &'a dyn CompletenessOracle,
    ) -> Self {
        Self {
            input,
            output,
            oracle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// A command popped the last context.
    StackExhausted,
    /// End of input popped the last context.
    EndOfInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionExit {
    pub reason: ExitReason,
    pub depth: usize,
}

pub struct Session {
    stack: ContextStack,
    accumulator: LineAccumulator,
    commands: Arc<CommandSet>,
    config: SessionConfig,
    depth: usize,
}

impl Session {
    pub fn new(target: Context, commands: Arc<CommandSet>, config: SessionConfig) -> Self {
        let accumulator = LineAccumulator::new(config.syntax_errors)
            .with_auto_indent(config.indent_unit());
        Self {
            stack: ContextStack::new(target),
            accumulator,
            commands,
            config,
            depth: 0,
        }
    }

    /// Mark this session as nested `depth` levels deep (prompt only).
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn stack(&self) -> &ContextStack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut ContextStack {
        &mut self.stack
    }

    pub fn accumulator(&self) -> &LineAccumulator {
        &self.accumulator
    }

    pub fn commands(&self) -> &CommandSet {
        &self.commands
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_finished(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn state(&self) -> AccumulatorState {
        self.accumulator.state()
    }

    /// Prompt for the current state; `None` once the session is finished.
    pub fn prompt(&self) -> Option<String> {
        let current = self.stack.current()?;
        let prompt = PromptState {
            name: &self.config.prompt_name,
            label: current.label(),
            stack_depth: self.stack.nesting_level(),
            session_depth: self.depth,
            state: self.accumulator.state(),
        };
        Some(prompt.to_string())
    }

    /// Drive the loop until the context stack is empty.
    pub fn run_to_exit(
        &mut self,
        io: &mut Collaborators<'_>,
        evaluator: &mut dyn Evaluator,
    ) -> Result<SessionExit, ReplError> {
        debug!(
            depth = self.depth,
            context = %self.stack.current().map(Context::label).unwrap_or_default(),
            "session started"
        );
        loop {
            if let Some(exit) = self.step(io, evaluator)? {
                debug!(depth = self.depth, reason = ?exit.reason, "session finished");
                return Ok(exit);
            }
        }
    }

    /// One read-route-print iteration. Returns the exit once the stack is empty.
    pub fn step(
        &mut self,
        io: &mut Collaborators<'_>,
        evaluator: &mut dyn Evaluator,
    ) -> Result<Option<SessionExit>, ReplError> {
        let Some(prompt) = self.prompt() else {
            return Ok(Some(self.exit(ExitReason::StackExhausted)));
        };

        match io.input.read_line(&prompt)? {
            Some(line) => {
                self.handle_line(&line, io, evaluator)?;
                if self.stack.is_empty() {
                    return Ok(Some(self.exit(ExitReason::StackExhausted)));
                }
            }
            None => {
                self.handle_end_of_input(evaluator);
                if self.stack.is_empty() {
                    return Ok(Some(self.exit(ExitReason::EndOfInput)));
                }
            }
        }
        Ok(None)
    }

    /// Route one input line: command first, otherwise the accumulator.
    pub fn handle_line(
        &mut self,
        line: &str,
        io: &mut Collaborators<'_>,
        evaluator: &mut dyn Evaluator,
    ) -> Result<(), ReplError> {
        let commands = Arc::clone(&self.commands);
        if let Some(candidate) = self.command_text(line) {
            if let Some(found) = commands.find(candidate) {
                debug!(command = found.command.trigger(), "dispatching command");
                let Some(options) = self.parse_options(found.command, &found.args, io) else {
                    return Ok(());
                };
                let before = self.accumulator.buffer().clone();
                let outcome = {
                    let mut ctx = CommandContext {
                        args: &found.args,
                        captures: &found.captures,
                        options,
                        stack: &mut self.stack,
                        buffer: self.accumulator.buffer_mut(),
                        output: &mut *io.output,
                        evaluator: &mut *evaluator,
                        commands: &commands,
                    };
                    found.command.run(&mut ctx)
                };
                let edited = *self.accumulator.buffer() != before;
                return self.after_command(
                    found.command.trigger(),
                    outcome,
                    edited,
                    io,
                    evaluator,
                );
            }
        }

        let feed = self.accumulator.feed(line, io.oracle);
        self.dispatch_feed(feed, io, evaluator)
    }

    /// End-of-input: drop pending input and pop one context.
    pub fn handle_end_of_input(&mut self, evaluator: &mut dyn Evaluator) {
        if self.accumulator.clear() {
            debug!("pending input discarded at end of input");
        }
        match self.stack.pop() {
            PopOutcome::Resumed { removed } => {
                debug!(context = removed.label(), "context popped at end of input");
                evaluator.release(&removed);
            }
            PopOutcome::Exhausted { removed } => {
                debug!(context = removed.label(), "last context popped at end of input");
                evaluator.release(&removed);
            }
            PopOutcome::Empty => {}
        }
    }

    fn command_text<'l>(&self, line: &'l str) -> Option<&'l str> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        match self.config.command_prefix.as_deref() {
            Some(prefix) => trimmed.strip_prefix(prefix),
            None => Some(trimmed),
        }
    }

    fn parse_options(
        &self,
        command: &Command,
        args: &str,
        io: &mut Collaborators<'_>,
    ) -> Option<Options> {
        match command.parse_options(args) {
            Ok(options) => Some(options),
            Err(err) => {
                io.output
                    .present_failure(&Failure::command_argument(format!(
                        "{}: {err}",
                        command.trigger()
                    )));
                None
            }
        }
    }

    fn after_command(
        &mut self,
        trigger: &str,
        outcome: Result<CommandOutcome, CommandError>,
        edited: bool,
        io: &mut Collaborators<'_>,
        evaluator: &mut dyn Evaluator,
    ) -> Result<(), ReplError> {
        match outcome {
            Ok(CommandOutcome::Continue) => {
                if self.stack.is_empty() {
                    self.accumulator.clear();
                    return Ok(());
                }
                // An untouched buffer was already judged when its last line came in.
                if self.config.eval_after_command && edited {
                    let feed = self.accumulator.assess(io.oracle);
                    return self.dispatch_feed(feed, io, evaluator);
                }
                self.accumulator.settle();
                Ok(())
            }
            Ok(CommandOutcome::Evaluate) => {
                match self.accumulator.take_unit() {
                    Some(source) => return self.evaluate(&source, io, evaluator),
                    None => warn!(command = trigger, "forced evaluation of an empty buffer"),
                }
                Ok(())
            }
            Ok(CommandOutcome::ClearBuffer) => {
                self.accumulator.clear();
                io.output.notice(BUFFER_CLEARED_NOTICE);
                Ok(())
            }
            Err(CommandError::UnknownArgument(message)) => {
                self.accumulator.settle();
                io.output
                    .present_failure(&Failure::command_argument(format!("{trigger}: {message}")));
                Ok(())
            }
            Err(CommandError::Failed(message)) => {
                self.accumulator.settle();
                io.output
                    .present_failure(&Failure::evaluation("CommandError", message));
                Ok(())
            }
        }
    }

    fn dispatch_feed(
        &mut self,
        feed: Feed,
        io: &mut Collaborators<'_>,
        evaluator: &mut dyn Evaluator,
    ) -> Result<(), ReplError> {
        match feed {
            Feed::Complete(source) => self.evaluate(&source, io, evaluator),
            Feed::SyntaxError { message, .. } => {
                io.output.present_failure(&Failure::syntax(message));
                Ok(())
            }
            Feed::Idle | Feed::Incomplete | Feed::Held(_) => Ok(()),
        }
    }

    fn evaluate(
        &mut self,
        source: &str,
        io: &mut Collaborators<'_>,
        evaluator: &mut dyn Evaluator,
    ) -> Result<(), ReplError> {
        let Some(target) = self.stack.current().cloned() else {
            return Ok(());
        };

        let (result, fault) = {
            let mut host = Nesting {
                io: &mut *io,
                commands: &self.commands,
                config: &self.config,
                depth: self.depth,
                fault: None,
            };
            let result = evaluator.evaluate(source, &target, &mut host);
            (result, host.fault)
        };
        if let Some(fault) = fault {
            return Err(fault);
        }

        match result {
            Ok(value) => io.output.present(&value),
            Err(failure) => {
                debug!(name = %failure.name, "evaluation failed");
                io.output.present_failure(&failure);
            }
        }
        Ok(())
    }

    fn exit(&self, reason: ExitReason) -> SessionExit {
        SessionExit {
            reason,
            depth: self.depth,
        }
    }
}

/// [`SessionHost`] for one evaluation call of a parent session.
struct Nesting<'s, 'a> {
    io: &'s mut Collaborators<'a>,
    commands: &'s Arc<CommandSet>,
    config: &'s SessionConfig,
    depth: usize,
    fault: Option<ReplError>,
}

impl SessionHost for Nesting<'_, '_> {
    fn depth(&self) -> usize {
        self.depth
    }

    fn start_session(
        &mut self,
        target: Context,
        evaluator: &mut dyn Evaluator,
    ) -> Result<SessionExit, ReplError> {
        let mut child = Session::new(target, Arc::clone(self.commands), self.config.clone())
            .with_depth(self.depth + 1);
        let exit = child.run_to_exit(self.io, evaluator);
        if let Err(err) = &exit {
            self.fault = Some(err.clone());
        }
        exit
    }
}
