//! Built-in commands.
//!
//! These manipulate the pending buffer and the context stack. Target
//! languages usually compose them with their own set:
//!
//! ```ignore
//! let commands = CommandSet::build([default_commands(), my_language_commands()]);
//! ```

use crate::command::{Command, CommandContext, CommandError, CommandOutcome, CommandSet, Flag};
use crate::context::{Context, PopOutcome};

pub fn default_commands() -> CommandSet {
    CommandSet::new()
        .with(Command::literal(
            "!",
            "Clear the input buffer",
            |_| Ok(CommandOutcome::ClearBuffer),
        ))
        .with(
            Command::literal("show-input", "Show the contents of the input buffer", cmd_show_input)
                .with_flag(Flag::new("no-numbers", Some('n'), "Omit line numbers")),
        )
        .with(Command::literal(
            "amend-line",
            "Replace a line of the input buffer: amend-line [N] <text>",
            cmd_amend_line,
        ))
        .with(Command::literal(
            "cd",
            "Move into a new context (`cd ..` goes up, `cd /` or `cd` goes to the root)",
            cmd_cd,
        ))
        .with(Command::literal(
            "exit",
            "Leave the current context; leaving the last one ends the session",
            cmd_exit,
        ))
        .with(Command::literal(
            "exit-all",
            "Leave every context and end the session",
            cmd_exit_all,
        ))
        .with(Command::literal(
            "jump-to",
            "Jump back to nesting level N: jump-to <N>",
            cmd_jump_to,
        ))
        .with(Command::literal(
            "nesting",
            "Show the context nesting levels",
            cmd_nesting,
        ))
        .with(Command::literal(
            "help",
            "List commands, or describe one: help [command]",
            cmd_help,
        ))
}

fn no_arguments(ctx: &CommandContext<'_>, name: &str) -> Result<(), CommandError> {
    if ctx.options.positional().is_empty() {
        return Ok(());
    }
    Err(CommandError::UnknownArgument(format!(
        "{name} takes no arguments (got `{}`)",
        ctx.args
    )))
}

fn cmd_show_input(ctx: &mut CommandContext<'_>) -> Result<CommandOutcome, CommandError> {
    no_arguments(ctx, "show-input")?;
    if ctx.buffer.is_empty() {
        ctx.output.print("(input buffer is empty)");
        return Ok(CommandOutcome::Continue);
    }
    let numbered = !ctx.options.flag("no-numbers");
    let text = render_buffer(ctx.buffer.lines(), numbered);
    ctx.output.print(&text);
    Ok(CommandOutcome::Continue)
}

fn render_buffer(lines: &[String], numbered: bool) -> String {
    if !numbered {
        return lines.join("\n");
    }
    let width = lines.len().to_string().len();
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>width$}: {line}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

fn cmd_amend_line(ctx: &mut CommandContext<'_>) -> Result<CommandOutcome, CommandError> {
    if ctx.buffer.is_empty() {
        return Err(CommandError::Failed("no input to amend".to_string()));
    }

    let args = ctx.args.trim();
    if args.is_empty() {
        return Err(CommandError::UnknownArgument(
            "amend-line expects replacement text".to_string(),
        ));
    }
    let (line_no, text) = match args.split_once(char::is_whitespace) {
        Some((first, rest)) => match first.parse::<usize>() {
            Ok(n) => (n, rest.trim_start()),
            Err(_) => (ctx.buffer.len(), args),
        },
        None => match args.parse::<usize>() {
            Ok(n) => (n, ""),
            Err(_) => (ctx.buffer.len(), args),
        },
    };

    if line_no == 0 || line_no > ctx.buffer.len() {
        return Err(CommandError::UnknownArgument(format!(
            "line {line_no} is out of range (buffer has {} line(s))",
            ctx.buffer.len()
        )));
    }
    ctx.buffer.set_line(line_no - 1, text);

    let rendered = render_buffer(ctx.buffer.lines(), true);
    ctx.output.print(&rendered);
    Ok(CommandOutcome::Continue)
}

fn cmd_cd(ctx: &mut CommandContext<'_>) -> Result<CommandOutcome, CommandError> {
    let target = ctx.args.trim();
    match target {
        "" | "/" => {
            let removed = ctx.stack.unwind_to(0);
            release(ctx, &removed);
        }
        ".." => {
            if ctx.stack.len() > 1 {
                let popped = ctx.stack.pop();
                release(ctx, popped.removed());
            }
        }
        expr => {
            let current = ctx
                .stack
                .current()
                .cloned()
                .ok_or_else(|| CommandError::Failed("no active context".to_string()))?;
            let next = ctx
                .evaluator
                .resolve_context(expr, &current)
                .map_err(|failure| CommandError::Failed(failure.to_string()))?;
            tracing::debug!(from = current.label(), to = next.label(), "cd");
            ctx.stack.push(next);
        }
    }
    Ok(CommandOutcome::Continue)
}

fn cmd_exit(ctx: &mut CommandContext<'_>) -> Result<CommandOutcome, CommandError> {
    no_arguments(ctx, "exit")?;
    let popped = ctx.stack.pop();
    if let PopOutcome::Exhausted { removed } = &popped {
        tracing::debug!(context = removed.label(), "last context left");
    }
    release(ctx, popped.removed());
    Ok(CommandOutcome::Continue)
}

fn cmd_exit_all(ctx: &mut CommandContext<'_>) -> Result<CommandOutcome, CommandError> {
    no_arguments(ctx, "exit-all")?;
    let removed = ctx.stack.clear();
    release(ctx, &removed);
    Ok(CommandOutcome::Continue)
}

fn cmd_jump_to(ctx: &mut CommandContext<'_>) -> Result<CommandOutcome, CommandError> {
    let [level] = ctx.options.positional() else {
        return Err(CommandError::UnknownArgument(
            "jump-to expects exactly one nesting level".to_string(),
        ));
    };
    let max = ctx.stack.nesting_level();
    let level: usize = level.parse().map_err(|_| {
        CommandError::UnknownArgument(format!("`{level}` is not a nesting level"))
    })?;
    if level > max {
        return Err(CommandError::UnknownArgument(format!(
            "invalid nesting level {level} (valid levels are 0-{max})"
        )));
    }
    if level == max {
        ctx.output.notice(&format!("Already at nesting level {level}"));
        return Ok(CommandOutcome::Continue);
    }
    let removed = ctx.stack.unwind_to(level);
    release(ctx, &removed);
    Ok(CommandOutcome::Continue)
}

/// Hand contexts that left the stack back to the evaluator.
fn release<'c>(ctx: &mut CommandContext<'_>, removed: impl IntoIterator<Item = &'c Context>) {
    for context in removed {
        ctx.evaluator.release(context);
    }
}

fn cmd_nesting(ctx: &mut CommandContext<'_>) -> Result<CommandOutcome, CommandError> {
    no_arguments(ctx, "nesting")?;
    let current = ctx.stack.nesting_level();
    let mut out = String::from("Nesting status:\n--");
    for (level, context) in ctx.stack.iter().enumerate() {
        out.push_str(&format!("\n{level}. {}", describe_level(level, context)));
        if level == current {
            out.push_str(" <- current");
        }
    }
    ctx.output.print(&out);
    Ok(CommandOutcome::Continue)
}

fn describe_level(level: usize, context: &Context) -> String {
    if level == 0 {
        format!("{} (top level)", context.label())
    } else {
        context.label().to_string()
    }
}

fn cmd_help(ctx: &mut CommandContext<'_>) -> Result<CommandOutcome, CommandError> {
    if let [name] = ctx.options.positional() {
        let command = ctx
            .commands
            .get(name)
            .ok_or_else(|| CommandError::UnknownArgument(format!("no command named `{name}`")))?;
        let usage = command.usage();
        ctx.output.print(&usage);
        return Ok(CommandOutcome::Continue);
    }

    let mut commands: Vec<&Command> = ctx.commands.iter().collect();
    commands.sort_by(|a, b| a.trigger().cmp(b.trigger()));
    let width = commands
        .iter()
        .map(|c| c.trigger().len())
        .max()
        .unwrap_or(0);
    let mut out = String::from("Commands:");
    for command in commands {
        out.push_str(&format!(
            "\n  {:<width$}  {}",
            command.trigger(),
            command.description()
        ));
    }
    ctx.output.print(&out);
    Ok(CommandOutcome::Continue)
}
