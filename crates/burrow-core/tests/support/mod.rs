//! A toy target language for driving sessions in tests.
//!
//! - `def NAME` opens a block, `end` closes it; `#bad` anywhere is malformed.
//! - `self` evaluates to the current context label.
//! - `nest X` starts a nested session bound to a context labelled `X`.
//! - `depth` reports the session depth; `boom` raises.
//! - anything else evaluates to itself.

#![allow(dead_code)]

use std::sync::Arc;

use burrow_core::builtins::default_commands;
use burrow_core::testing::{RecordingOutput, ScriptedInput};
use burrow_core::{
    Collaborators, CommandSet, Completeness, CompletenessOracle, Context, Evaluator, Failure,
    Session, SessionConfig, SessionExit, SessionHost, Value,
};

pub struct Blocks;

impl Blocks {
    fn depth(source: &str) -> i64 {
        source
            .lines()
            .fold(0i64, |depth, line| match line.split_whitespace().next() {
                Some("def") => depth + 1,
                Some("end") => depth - 1,
                _ => depth,
            })
    }
}

impl CompletenessOracle for Blocks {
    fn check(&self, source: &str) -> Completeness {
        let depth = Self::depth(source);
        if depth < 0 || source.contains("#bad") {
            Completeness::SyntaxError("unexpected end-of-block".to_string())
        } else if depth > 0 {
            Completeness::Incomplete
        } else {
            Completeness::Complete
        }
    }

    fn indent_level(&self, source: &str) -> usize {
        Self::depth(source).max(0) as usize
    }
}

#[derive(Debug, Default)]
pub struct Toy {
    /// (source, context label) for every evaluation, in order.
    pub evaluated: Vec<(String, String)>,
    /// Labels of released contexts, in order.
    pub released: Vec<String>,
}

impl Evaluator for Toy {
    fn evaluate(
        &mut self,
        source: &str,
        target: &Context,
        host: &mut dyn SessionHost,
    ) -> Result<Value, Failure> {
        self.evaluated
            .push((source.to_string(), target.label().to_string()));
        let unit = source.trim();

        if let Some(rest) = unit.strip_prefix("def ") {
            let name = rest.split_whitespace().next().unwrap_or_default();
            return Ok(Value::inspected(format!(":{name}")));
        }
        if let Some(label) = unit.strip_prefix("nest ") {
            host.start_session(Context::new(label.trim()), self)
                .map_err(|e| Failure::evaluation("HostError", e.to_string()))?;
            return Ok(Value::Nothing);
        }
        match unit {
            "self" => Ok(Value::inspected(target.label())),
            "depth" => Ok(Value::inspected(host.depth().to_string())),
            "boom" => Err(Failure::evaluation("RuntimeError", "boom")),
            other => Ok(Value::inspected(other)),
        }
    }

    fn resolve_context(&mut self, expr: &str, _current: &Context) -> Result<Context, Failure> {
        if expr == "boom" {
            return Err(Failure::evaluation("RuntimeError", "boom"));
        }
        Ok(Context::new(expr))
    }

    fn release(&mut self, context: &Context) {
        self.released.push(context.label().to_string());
    }
}

pub struct Run {
    pub input: ScriptedInput,
    pub output: RecordingOutput,
    pub toy: Toy,
    pub session: Session,
    pub exit: SessionExit,
}

pub fn session_with(commands: CommandSet, config: SessionConfig) -> Session {
    Session::new(Context::main(), Arc::new(commands), config)
}

/// Run a fresh session over `input` until it exits.
pub fn run_with(input: ScriptedInput, commands: CommandSet, config: SessionConfig) -> Run {
    let mut input = input;
    let mut output = RecordingOutput::new();
    let mut toy = Toy::default();
    let mut session = session_with(commands, config);
    let exit = {
        let mut io = Collaborators::new(&mut input, &mut output, &Blocks);
        session.run_to_exit(&mut io, &mut toy).expect("session runs")
    };
    Run {
        input,
        output,
        toy,
        session,
        exit,
    }
}

pub fn run(input: ScriptedInput) -> Run {
    run_with(input, default_commands(), SessionConfig::default())
}

/// Feed lines one at a time through `Session::step`, returning the prompt
/// shown after each line.
pub fn step_lines(
    session: &mut Session,
    toy: &mut Toy,
    output: &mut RecordingOutput,
    lines: &[&str],
) -> Vec<String> {
    let mut prompts = Vec::new();
    for line in lines {
        let mut input = ScriptedInput::lines([*line]);
        let mut io = Collaborators::new(&mut input, &mut *output, &Blocks);
        session.step(&mut io, toy).expect("step");
        prompts.push(session.prompt().unwrap_or_default());
    }
    prompts
}
