//! Command registry and dispatch contract.
//!
//! Commands are immutable descriptors: a match rule, declared option flags,
//! a description and an action. A [`CommandSet`] maps triggers to commands;
//! sets compose by ordered import where later entries override earlier ones
//! with the same trigger.
//!
//! Resolution picks the command with the longest matched prefix of the input
//! line; ties go to the most recently added command.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use clap::{Arg, ArgAction};
use regex::Regex;
use thiserror::Error;

use crate::accumulator::PendingBuffer;
use crate::context::{Context, ContextStack};
use crate::error::ReplError;
use crate::io::Output;
use crate::session::Evaluator;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    /// The command rejected its arguments.
    #[error("{0}")]
    UnknownArgument(String),

    #[error("{0}")]
    Failed(String),
}

/// What the session should do once a command action returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Normal prompt cycle. With `eval_after_command` on, a buffer the
    /// command edited is re-checked and, when complete, evaluated right away.
    Continue,
    /// Evaluate whatever is in the pending buffer now, complete or not.
    Evaluate,
    /// Drop the pending buffer and tell the user.
    ClearBuffer,
}

/// A boolean option a command declares, e.g. `-n/--no-numbers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flag {
    pub long: &'static str,
    pub short: Option<char>,
    pub help: &'static str,
}

impl Flag {
    pub const fn new(long: &'static str, short: Option<char>, help: &'static str) -> Self {
        Self { long, short, help }
    }
}

/// Parsed arguments handed to an action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    flags: BTreeSet<&'static str>,
    positional: Vec<String>,
}

impl Options {
    pub fn flag(&self, long: &str) -> bool {
        self.flags.contains(long)
    }

    pub fn positional(&self) -> &[String] {
        &self.positional
    }
}

// ============================================================================
// Match rules
// ============================================================================

#[derive(Debug, Clone)]
pub enum MatchRule {
    /// `name` alone, or `name` followed by whitespace and arguments.
    Literal(String),
    /// A regular expression anchored at the start of the line.
    Pattern { source: String, regex: Regex },
}

/// A successful rule match against one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    /// Length of the matched prefix; larger is a better match.
    pub score: usize,
    /// Text after the trigger, left-trimmed.
    pub args: String,
    /// Capture groups of a pattern rule (empty string for unmatched groups).
    pub captures: Vec<String>,
}

impl MatchRule {
    pub fn pattern(source: &str) -> Result<Self, ReplError> {
        let regex =
            Regex::new(&format!("^(?:{source})")).map_err(|e| ReplError::InvalidPattern {
                pattern: source.to_string(),
                source: e,
            })?;
        Ok(MatchRule::Pattern {
            source: source.to_string(),
            regex,
        })
    }

    /// The registry key: the literal name or the pattern source.
    pub fn trigger(&self) -> &str {
        match self {
            MatchRule::Literal(name) => name,
            MatchRule::Pattern { source, .. } => source,
        }
    }

    pub fn matches(&self, line: &str) -> Option<RuleMatch> {
        match self {
            MatchRule::Literal(name) => {
                let rest = line.strip_prefix(name.as_str())?;
                if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
                    return None;
                }
                Some(RuleMatch {
                    score: name.len(),
                    args: rest.trim_start().to_string(),
                    captures: Vec::new(),
                })
            }
            MatchRule::Pattern { regex, .. } => {
                let caps = regex.captures(line)?;
                let whole = caps.get(0)?;
                let captures = caps
                    .iter()
                    .skip(1)
                    .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                    .collect();
                Some(RuleMatch {
                    score: whole.end(),
                    args: line[whole.end()..].trim_start().to_string(),
                    captures,
                })
            }
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

/// Everything an action may touch while it runs.
///
/// Borrows end with the action; commands cannot keep references to session
/// state between invocations.
pub struct CommandContext<'a> {
    /// Raw text after the trigger.
    pub args: &'a str,
    pub captures: &'a [String],
    pub options: Options,
    pub stack: &'a mut ContextStack,
    pub buffer: &'a mut PendingBuffer,
    pub output: &'a mut dyn Output,
    pub evaluator: &'a mut dyn Evaluator,
    pub commands: &'a CommandSet,
}

impl CommandContext<'_> {
    /// The active context, if the stack is not empty.
    pub fn target(&self) -> Option<&Context> {
        self.stack.current()
    }
}

pub type Action =
    dyn Fn(&mut CommandContext<'_>) -> Result<CommandOutcome, CommandError> + Send + Sync;

#[derive(Clone)]
pub struct Command {
    rule: MatchRule,
    description: String,
    flags: Vec<Flag>,
    action: Arc<Action>,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("trigger", &self.trigger())
            .field("description", &self.description)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

impl Command {
    pub fn literal<F>(name: impl Into<String>, description: impl Into<String>, action: F) -> Self
    where
        F: Fn(&mut CommandContext<'_>) -> Result<CommandOutcome, CommandError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            rule: MatchRule::Literal(name.into()),
            description: description.into(),
            flags: Vec::new(),
            action: Arc::new(action),
        }
    }

    pub fn pattern<F>(
        pattern: &str,
        description: impl Into<String>,
        action: F,
    ) -> Result<Self, ReplError>
    where
        F: Fn(&mut CommandContext<'_>) -> Result<CommandOutcome, CommandError>
            + Send
            + Sync
            + 'static,
    {
        Ok(Self {
            rule: MatchRule::pattern(pattern)?,
            description: description.into(),
            flags: Vec::new(),
            action: Arc::new(action),
        })
    }

    pub fn with_flag(mut self, flag: Flag) -> Self {
        self.flags.push(flag);
        self
    }

    pub fn rule(&self) -> &MatchRule {
        &self.rule
    }

    pub fn trigger(&self) -> &str {
        self.rule.trigger()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn flags(&self) -> &[Flag] {
        &self.flags
    }

    pub fn usage(&self) -> String {
        let mut out = format!("{} - {}", self.trigger(), self.description);
        for flag in &self.flags {
            let short = flag.short.map(|c| format!("-{c}, ")).unwrap_or_default();
            out.push_str(&format!("\n  {short}--{:<16} {}", flag.long, flag.help));
        }
        out
    }

    /// Tokenise `args` and parse declared flags with clap. Commands without
    /// flags get the raw tokens as positionals.
    pub fn parse_options(&self, args: &str) -> Result<Options, CommandError> {
        let tokens = split_command_line(args);
        if self.flags.is_empty() {
            return Ok(Options {
                flags: BTreeSet::new(),
                positional: tokens,
            });
        }

        let mut parser = clap::Command::new(self.trigger().to_string())
            .no_binary_name(true)
            .disable_help_flag(true)
            .disable_version_flag(true)
            .arg(Arg::new("args").num_args(0..).action(ArgAction::Append));
        for flag in &self.flags {
            let mut arg = Arg::new(flag.long)
                .long(flag.long)
                .help(flag.help)
                .action(ArgAction::SetTrue);
            if let Some(short) = flag.short {
                arg = arg.short(short);
            }
            parser = parser.arg(arg);
        }

        let matches = parser.try_get_matches_from(tokens).map_err(|e| {
            let rendered = e.to_string();
            let first = rendered.lines().next().unwrap_or_default();
            CommandError::UnknownArgument(first.trim_start_matches("error: ").to_string())
        })?;

        let flags = self
            .flags
            .iter()
            .filter(|f| matches.get_flag(f.long))
            .map(|f| f.long)
            .collect();
        let positional = matches
            .get_many::<String>("args")
            .map(|vals| vals.cloned().collect())
            .unwrap_or_default();
        Ok(Options { flags, positional })
    }

    pub fn run(&self, ctx: &mut CommandContext<'_>) -> Result<CommandOutcome, CommandError> {
        (self.action)(ctx)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// A resolved command for one input line.
#[derive(Debug, Clone)]
pub struct CommandMatch<'a> {
    pub command: &'a Command,
    pub args: String,
    pub captures: Vec<String>,
}

/// Ordered trigger → command mapping.
#[derive(Debug, Clone, Default)]
pub struct CommandSet {
    commands: Vec<Command>,
}

impl CommandSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `sources` left to right; later sets override earlier ones.
    pub fn build<I>(sources: I) -> Self
    where
        I: IntoIterator<Item = CommandSet>,
    {
        sources.into_iter().fold(Self::new(), |mut acc, set| {
            acc.import(&set);
            acc
        })
    }

    /// Add a command, replacing any command with the same trigger. The new
    /// command becomes the most recent one.
    pub fn add(&mut self, command: Command) -> &mut Self {
        self.commands.retain(|c| c.trigger() != command.trigger());
        self.commands.push(command);
        self
    }

    pub fn with(mut self, command: Command) -> Self {
        self.add(command);
        self
    }

    /// Merge every command of `other`, overriding on trigger collision.
    pub fn import(&mut self, other: &CommandSet) -> &mut Self {
        for command in &other.commands {
            self.add(command.clone());
        }
        self
    }

    pub fn get(&self, trigger: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.trigger() == trigger)
    }

    pub fn remove(&mut self, trigger: &str) -> Option<Command> {
        let index = self.commands.iter().position(|c| c.trigger() == trigger)?;
        Some(self.commands.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Resolve `line` to at most one command.
    pub fn find(&self, line: &str) -> Option<CommandMatch<'_>> {
        let mut best: Option<(&Command, RuleMatch)> = None;
        for command in &self.commands {
            let Some(found) = command.rule.matches(line) else {
                continue;
            };
            let better = match &best {
                Some((_, current)) => found.score >= current.score,
                None => true,
            };
            if better {
                best = Some((command, found));
            }
        }
        best.map(|(command, found)| CommandMatch {
            command,
            args: found.args,
            captures: found.captures,
        })
    }
}

// ============================================================================
// Tokenizer
// ============================================================================

/// Shell-ish split: whitespace separated, `"..."` groups, `\` escapes.
pub fn split_command_line(line: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                quoted = true;
            }
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() || quoted {
                    out.push(std::mem::take(&mut current));
                }
                quoted = false;
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() || quoted {
        out.push(current);
    }

    out
}
