use burrow_core::{Failure, FailureKind, Output, Value};
use colored::Colorize;

/// Writes session output to stdout and keeps a count of reported failures.
#[derive(Debug, Default)]
pub struct TerminalOutput {
    failures: usize,
}

impl TerminalOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> usize {
        self.failures
    }
}

impl Output for TerminalOutput {
    fn present(&mut self, value: &Value) {
        if let Value::Inspected(repr) = value {
            println!("{} {repr}", "=>".cyan().bold());
        }
    }

    fn present_failure(&mut self, failure: &Failure) {
        self.failures += 1;
        let name = match failure.kind {
            FailureKind::Syntax | FailureKind::Evaluation => failure.name.red().bold(),
            FailureKind::CommandArgument => failure.name.yellow().bold(),
        };
        println!("{name}: {}", failure.message.red());
    }

    fn notice(&mut self, message: &str) {
        println!("{}", message.yellow());
    }

    fn print(&mut self, text: &str) {
        println!("{text}");
    }
}
