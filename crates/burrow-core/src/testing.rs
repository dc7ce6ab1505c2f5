//! Test doubles for driving sessions without a terminal.
//!
//! [`ScriptedInput`] replays a queue of lines (`None` entries are Ctrl-D) and
//! remembers every prompt it was shown; [`RecordingOutput`] keeps everything
//! the session presented, in order.

use std::collections::VecDeque;

use crate::error::{Failure, ReplError};
use crate::io::{LineSource, Output, Value};

#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    queue: VecDeque<Option<String>>,
    prompts: Vec<String>,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue ordinary lines.
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut input = Self::new();
        for line in lines {
            input.push(line);
        }
        input
    }

    pub fn push(&mut self, line: impl Into<String>) -> &mut Self {
        self.queue.push_back(Some(line.into()));
        self
    }

    /// Queue an end-of-input signal.
    pub fn push_eof(&mut self) -> &mut Self {
        self.queue.push_back(None);
        self
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// Every prompt shown so far, one per read.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn last_prompt(&self) -> Option<&str> {
        self.prompts.last().map(String::as_str)
    }
}

impl LineSource for ScriptedInput {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, ReplError> {
        self.prompts.push(prompt.to_string());
        Ok(self.queue.pop_front().flatten())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Value(Value),
    Failure(Failure),
    Notice(String),
    Print(String),
}

#[derive(Debug, Clone, Default)]
pub struct RecordingOutput {
    events: Vec<Event>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Presented values rendered the way a terminal shows them (`=> 10`);
    /// `Value::Nothing` renders as an empty string.
    pub fn values(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Value(v) => Some(render_value(v)),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<&Failure> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Failure(f) => Some(f),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Notice(n) => Some(n.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Everything, one entry per line, as plain text.
    pub fn transcript(&self) -> String {
        self.events
            .iter()
            .map(|e| match e {
                Event::Value(v) => render_value(v),
                Event::Failure(f) => f.to_string(),
                Event::Notice(n) | Event::Print(n) => n.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Nothing => String::new(),
        Value::Inspected(repr) => format!("=> {repr}"),
    }
}

impl Output for RecordingOutput {
    fn present(&mut self, value: &Value) {
        self.events.push(Event::Value(value.clone()));
    }

    fn present_failure(&mut self, failure: &Failure) {
        self.events.push(Event::Failure(failure.clone()));
    }

    fn notice(&mut self, message: &str) {
        self.events.push(Event::Notice(message.to_string()));
    }

    fn print(&mut self, text: &str) {
        self.events.push(Event::Print(text.to_string()));
    }
}
