//! Line sources for the shell.
//!
//! Interactive input uses `rustyline` for line editing and history. A
//! minimal stdin-based fallback exists behind `--no-default-features`.
//! Scripts replay a fixed list of lines and then report end-of-input on every
//! read, which unwinds whatever sessions are still open.

use std::collections::VecDeque;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{anyhow, Context as _, Result};
use burrow_core::{LineSource, ReplError};
use colored::Colorize;

/// Read script lines from `path` (`-` is stdin) followed by `extra` lines.
pub fn script_lines(path: Option<&Path>, extra: &[String]) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    if let Some(path) = path {
        let text = if path.as_os_str() == "-" {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read script from stdin")?;
            buf
        } else {
            fs::read_to_string(path)
                .with_context(|| format!("failed to read script {}", path.display()))?
        };
        lines.extend(text.lines().map(str::to_string));
    }
    lines.extend(extra.iter().cloned());
    Ok(lines)
}

pub struct ScriptInput {
    lines: VecDeque<String>,
    echo: bool,
}

impl ScriptInput {
    pub fn new(lines: Vec<String>, echo: bool) -> Self {
        Self {
            lines: lines.into(),
            echo,
        }
    }
}

impl LineSource for ScriptInput {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, ReplError> {
        let line = self.lines.pop_front();
        if self.echo {
            if let Some(line) = &line {
                println!("{}{line}", prompt.dimmed());
            }
        }
        Ok(line)
    }
}

#[cfg(feature = "repl-rustyline")]
pub struct Terminal {
    editor: rustyline::DefaultEditor,
}

#[cfg(feature = "repl-rustyline")]
impl Terminal {
    pub fn new() -> Result<Self> {
        let editor = rustyline::DefaultEditor::new()
            .map_err(|e| anyhow!("failed to init rustyline: {e}"))?;
        Ok(Self { editor })
    }
}

#[cfg(feature = "repl-rustyline")]
impl LineSource for Terminal {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, ReplError> {
        use rustyline::error::ReadlineError;

        loop {
            match self.editor.readline(prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        self.editor
                            .add_history_entry(line.as_str())
                            .map_err(|e| ReplError::Input(format!("failed to record history: {e}")))?;
                    }
                    return Ok(Some(line));
                }
                Err(ReadlineError::Eof) => return Ok(None),
                Err(ReadlineError::Interrupted) => continue,
                Err(e) => return Err(ReplError::Input(format!("readline error: {e}"))),
            }
        }
    }
}

#[cfg(not(feature = "repl-rustyline"))]
pub struct Terminal;

#[cfg(not(feature = "repl-rustyline"))]
impl Terminal {
    pub fn new() -> Result<Self> {
        Ok(Self)
    }
}

#[cfg(not(feature = "repl-rustyline"))]
impl LineSource for Terminal {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, ReplError> {
        use std::io::Write;

        print!("{prompt}");
        io::stdout()
            .flush()
            .map_err(|e| ReplError::Input(e.to_string()))?;

        let mut line = String::new();
        let read = io::stdin()
            .read_line(&mut line)
            .map_err(|e| ReplError::Input(e.to_string()))?;
        if read == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }
}
