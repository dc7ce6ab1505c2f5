//! Line accumulation state machine.
//!
//! The accumulator owns the pending buffer and decides, after every appended
//! line, whether the buffer is a complete unit (handed out for evaluation),
//! still incomplete (keep reading), or malformed (handled per
//! [`SyntaxErrorPolicy`]).
//!
//! State invariant: an empty buffer means [`AccumulatorState::Ready`]; a
//! non-empty buffer means `Accumulating` or `Error`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Answer of the completeness oracle for a piece of source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completeness {
    Complete,
    Incomplete,
    SyntaxError(String),
}

/// External judge of "is this source a complete unit".
///
/// Must be deterministic for identical input.
pub trait CompletenessOracle {
    fn check(&self, source: &str) -> Completeness;

    /// Block depth after `source`, used for auto-indent.
    fn indent_level(&self, _source: &str) -> usize {
        0
    }
}

/// What to do when the oracle reports a syntax error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntaxErrorPolicy {
    /// Report immediately and drop the buffer.
    #[default]
    Discard,
    /// Report immediately, keep the buffer and keep accumulating.
    Surface,
    /// Report nothing; keep the buffer and show the error prompt until the
    /// buffer is cleared or the oracle changes its mind.
    Hold,
}

impl FromStr for SyntaxErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discard" => Ok(Self::Discard),
            "surface" => Ok(Self::Surface),
            "hold" => Ok(Self::Hold),
            other => Err(format!(
                "unknown syntax error policy `{other}` (expected discard, surface or hold)"
            )),
        }
    }
}

impl fmt::Display for SyntaxErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Discard => "discard",
            Self::Surface => "surface",
            Self::Hold => "hold",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulatorState {
    Ready,
    Accumulating,
    Error,
}

// ============================================================================
// Pending buffer
// ============================================================================

/// Raw input lines not yet evaluated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingBuffer {
    lines: Vec<String>,
}

impl PendingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The buffered source, lines joined with `\n`.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn push_line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Replace the whole buffer with `source` (split on newlines).
    pub fn replace(&mut self, source: &str) {
        self.lines = source.lines().map(str::to_string).collect();
    }

    /// Replace line `index` (0-based). Returns `false` when out of range.
    pub fn set_line(&mut self, index: usize, text: impl Into<String>) -> bool {
        match self.lines.get_mut(index) {
            Some(line) => {
                *line = text.into();
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Take the buffered source and leave the buffer empty.
    pub fn take(&mut self) -> String {
        let text = self.text();
        self.lines.clear();
        text
    }
}

// ============================================================================
// Accumulator
// ============================================================================

/// What feeding a line (or re-assessing the buffer) produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feed {
    /// Nothing buffered; nothing to do.
    Idle,
    /// A complete unit, already removed from the buffer.
    Complete(String),
    Incomplete,
    /// A syntax error to report now. `retained` tells whether the buffer was kept.
    SyntaxError { message: String, retained: bool },
    /// A syntax error held silently under [`SyntaxErrorPolicy::Hold`].
    Held(String),
}

#[derive(Debug, Clone)]
pub struct LineAccumulator {
    buffer: PendingBuffer,
    state: AccumulatorState,
    policy: SyntaxErrorPolicy,
    indent: Option<String>,
    held_error: Option<String>,
}

impl LineAccumulator {
    pub fn new(policy: SyntaxErrorPolicy) -> Self {
        Self {
            buffer: PendingBuffer::new(),
            state: AccumulatorState::Ready,
            policy,
            indent: None,
            held_error: None,
        }
    }

    /// Enable auto-indent of continuation lines with `unit` per level.
    pub fn with_auto_indent(mut self, unit: Option<&str>) -> Self {
        self.indent = unit.map(str::to_string);
        self
    }

    pub fn state(&self) -> AccumulatorState {
        self.state
    }

    pub fn buffer(&self) -> &PendingBuffer {
        &self.buffer
    }

    /// Mutable access for commands. Call [`LineAccumulator::assess`] or
    /// [`LineAccumulator::settle`] afterwards to restore the state invariant.
    pub fn buffer_mut(&mut self) -> &mut PendingBuffer {
        &mut self.buffer
    }

    /// The syntax error being held under [`SyntaxErrorPolicy::Hold`].
    pub fn held_error(&self) -> Option<&str> {
        self.held_error.as_deref()
    }

    /// Append one raw input line and ask the oracle about the buffer.
    pub fn feed(&mut self, line: &str, oracle: &dyn CompletenessOracle) -> Feed {
        if self.buffer.is_empty() && line.trim().is_empty() {
            return Feed::Idle;
        }
        let stored = self.indented(line, oracle);
        self.buffer.push_line(stored);
        self.assess(oracle)
    }

    /// Re-derive the state from the current buffer contents.
    pub fn assess(&mut self, oracle: &dyn CompletenessOracle) -> Feed {
        self.held_error = None;
        if self.buffer.is_empty() {
            self.state = AccumulatorState::Ready;
            return Feed::Idle;
        }

        match oracle.check(&self.buffer.text()) {
            Completeness::Complete => {
                self.state = AccumulatorState::Ready;
                Feed::Complete(self.buffer.take())
            }
            Completeness::Incomplete => {
                self.state = AccumulatorState::Accumulating;
                Feed::Incomplete
            }
            Completeness::SyntaxError(message) => match self.policy {
                SyntaxErrorPolicy::Discard => {
                    debug!(lines = self.buffer.len(), "discarding malformed input");
                    self.buffer.clear();
                    self.state = AccumulatorState::Ready;
                    Feed::SyntaxError {
                        message,
                        retained: false,
                    }
                }
                SyntaxErrorPolicy::Surface => {
                    self.state = AccumulatorState::Accumulating;
                    Feed::SyntaxError {
                        message,
                        retained: true,
                    }
                }
                SyntaxErrorPolicy::Hold => {
                    self.state = AccumulatorState::Error;
                    self.held_error = Some(message.clone());
                    Feed::Held(message)
                }
            },
        }
    }

    /// Restore the state invariant without consulting the oracle.
    pub fn settle(&mut self) {
        if self.buffer.is_empty() {
            self.state = AccumulatorState::Ready;
            self.held_error = None;
        } else if self.state == AccumulatorState::Ready {
            self.state = AccumulatorState::Accumulating;
        }
    }

    /// Empty the buffer. Returns whether anything was discarded.
    pub fn clear(&mut self) -> bool {
        let had_input = !self.buffer.is_empty();
        self.buffer.clear();
        self.state = AccumulatorState::Ready;
        self.held_error = None;
        had_input
    }

    /// Take whatever is buffered for forced evaluation, complete or not.
    pub fn take_unit(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            self.settle();
            return None;
        }
        let source = self.buffer.take();
        self.state = AccumulatorState::Ready;
        self.held_error = None;
        Some(source)
    }

    fn indented(&self, line: &str, oracle: &dyn CompletenessOracle) -> String {
        let Some(unit) = self.indent.as_deref() else {
            return line.to_string();
        };
        if self.buffer.is_empty() {
            return line.to_string();
        }

        // A closing line dedents itself, an opening line does not indent itself.
        let before = self.buffer.text();
        let after = format!("{before}\n{line}");
        let level = oracle
            .indent_level(&before)
            .min(oracle.indent_level(&after));
        format!("{}{}", unit.repeat(level), line.trim_start())
    }
}
