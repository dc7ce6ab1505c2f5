//! Burrow CLI
//!
//! An interactive shell for the burrow demo language, with nested sessions
//! (`session(expr)`), context navigation (`cd`, `exit`, `jump-to`) and
//! multi-line input. Scripts can be replayed with `--script` / `--cmd`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use burrow_core::builtins::default_commands;
use burrow_core::{Collaborators, LineSource, Session, SessionExit, SyntaxErrorPolicy};
use burrow_lang::{Interpreter, Oracle};
use clap::{ArgAction, Parser};
use colored::Colorize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod config;
mod input;
mod output;

use input::{ScriptInput, Terminal};
use output::TerminalOutput;

#[derive(Parser)]
#[command(name = "burrow")]
#[command(author, version, about = "Burrow: a nested interactive shell")]
struct Cli {
    /// Replay lines from a file (`-` reads stdin) instead of prompting.
    #[arg(long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// An input line to run (repeatable; runs after `--script`).
    #[arg(long = "cmd", value_name = "LINE")]
    commands: Vec<String>,

    /// Do not echo script lines.
    #[arg(long)]
    quiet: bool,

    /// Exit with a non-zero status if any failure was reported.
    #[arg(long)]
    strict: bool,

    /// JSON session configuration file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Re-indent continuation lines.
    #[arg(long)]
    auto_indent: bool,

    /// What to do with syntax errors: discard, surface or hold.
    #[arg(long, value_name = "POLICY")]
    syntax_errors: Option<SyntaxErrorPolicy>,

    /// Leading word of the prompt.
    #[arg(long, value_name = "NAME")]
    prompt_name: Option<String>,

    /// Only lines starting with this prefix are treated as commands.
    #[arg(long, value_name = "PREFIX")]
    command_prefix: Option<String>,

    /// More log output on stderr (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn overrides(&self) -> config::Overrides {
        config::Overrides {
            prompt_name: self.prompt_name.clone(),
            auto_indent: self.auto_indent,
            syntax_errors: self.syntax_errors,
            command_prefix: self.command_prefix.clone(),
        }
    }

    fn is_scripted(&self) -> bool {
        self.script.is_some() || !self.commands.is_empty()
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.overrides().apply(config::load(cli.config.as_deref())?);
    debug!(?config, "session config");

    let mut interpreter = Interpreter::new();
    let root = interpreter.root();
    let mut session = Session::new(root, Arc::new(default_commands()), config);
    let mut output = TerminalOutput::new();

    let exit = if cli.is_scripted() {
        let lines = input::script_lines(cli.script.as_deref(), &cli.commands)?;
        let mut input = ScriptInput::new(lines, !cli.quiet);
        run(&mut session, &mut input, &mut output, &mut interpreter)?
    } else {
        println!("{}", "burrow".green().bold());
        println!("Type `help` for commands, `exit` or Ctrl-D to leave.\n");
        let mut input = Terminal::new()?;
        run(&mut session, &mut input, &mut output, &mut interpreter)?
    };
    debug!(reason = ?exit.reason, failures = output.failures(), "session ended");

    if cli.strict && output.failures() > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn run(
    session: &mut Session,
    input: &mut dyn LineSource,
    output: &mut TerminalOutput,
    interpreter: &mut Interpreter,
) -> Result<SessionExit> {
    let oracle = Oracle;
    let mut io = Collaborators::new(input, output, &oracle);
    session
        .run_to_exit(&mut io, interpreter)
        .map_err(|e| anyhow!("session aborted: {e}"))
}
