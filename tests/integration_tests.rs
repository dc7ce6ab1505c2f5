//! Integration tests for the complete burrow stack
//!
//! These drive a real [`Session`] with the demo language's oracle and
//! interpreter through scripted input:
//! - multi-line units and commands issued mid-expression
//! - context navigation and per-context state
//! - nested sessions started from evaluated code
//!
//! Run with: cargo test --test integration_tests

use std::sync::Arc;

use burrow_core::builtins::default_commands;
use burrow_core::testing::{Event, RecordingOutput, ScriptedInput};
use burrow_core::{
    Collaborators, Command, CommandOutcome, CommandSet, ExitReason, FailureKind, Session,
    SessionConfig, SessionExit, SyntaxErrorPolicy, BUFFER_CLEARED_NOTICE,
};
use burrow_lang::{Interpreter, Object, Oracle};

struct Transcript {
    input: ScriptedInput,
    output: RecordingOutput,
    interpreter: Interpreter,
    exit: SessionExit,
}

fn drive(input: ScriptedInput, commands: CommandSet, config: SessionConfig) -> Transcript {
    let mut input = input;
    let mut output = RecordingOutput::new();
    let mut interpreter = Interpreter::new();
    let root = interpreter.root();
    let mut session = Session::new(root, Arc::new(commands), config);
    let exit = {
        let mut io = Collaborators::new(&mut input, &mut output, &Oracle);
        session
            .run_to_exit(&mut io, &mut interpreter)
            .expect("session runs")
    };
    Transcript {
        input,
        output,
        interpreter,
        exit,
    }
}

fn drive_lines(lines: &[&str]) -> Transcript {
    drive(
        ScriptedInput::lines(lines.iter().copied()),
        default_commands(),
        SessionConfig::default(),
    )
}

// ============================================================================
// Multi-line input and commands
// ============================================================================

#[test]
fn test_clear_mid_definition_then_evaluate() {
    let t = drive_lines(&["def a", "!", "5"]);

    assert_eq!(t.output.notices(), vec![BUFFER_CLEARED_NOTICE]);
    assert_eq!(t.output.values(), vec!["=> 5"]);
    assert_eq!(t.interpreter.methods().count(), 0);
    assert_eq!(
        &t.input.prompts()[..3],
        &["burrow(main)> ", "burrow(main)* ", "burrow(main)> "]
    );
}

#[test]
fn test_multi_line_definition_and_call() {
    let t = drive_lines(&["def answer", "  6 * 7", "end", "answer + 0"]);
    assert_eq!(t.output.values(), vec!["=> :answer", "=> 42"]);
}

#[test]
fn test_open_parens_and_strings_continue() {
    let t = drive_lines(&["(1 +", "2)", "\"two", "lines\""]);
    assert_eq!(t.output.values(), vec!["=> 3", "=> \"two\\nlines\""]);
}

#[test]
fn test_command_replacing_buffer_evaluates_immediately() {
    let custom = CommandSet::new().with(Command::literal("hello!", "Say hello", |ctx| {
        ctx.buffer.replace("\"hello\"");
        Ok(CommandOutcome::Continue)
    }));
    let commands = CommandSet::build([default_commands(), custom]);

    let mut input = ScriptedInput::lines(["def pending", "hello!"]);
    input.push("exit-all");
    let t = drive(input, commands, SessionConfig::default());

    assert_eq!(t.output.values(), vec!["=> \"hello\""]);
    assert_eq!(
        t.input.prompts(),
        &["burrow(main)> ", "burrow(main)* ", "burrow(main)> "]
    );
}

#[test]
fn test_amend_line_fixes_a_broken_unit() {
    let t = drive_lines(&["def f", "1 +* 2", "show-input", "amend-line 2 1 + 2", "end", "f"]);

    // "1 +* 2" is still inside an open block, so it only fails once closed.
    let printed: Vec<&Event> = t
        .output
        .events()
        .iter()
        .filter(|e| matches!(e, Event::Print(_)))
        .collect();
    assert_eq!(printed[0], &Event::Print("1: def f\n2: 1 +* 2".to_string()));
    assert_eq!(t.output.values(), vec!["=> :f", "=> 3"]);
}

#[test]
fn test_syntax_error_discarded_by_default() {
    let t = drive_lines(&["1 2", "3"]);
    let failures = t.output.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, FailureKind::Syntax);
    assert_eq!(t.output.values(), vec!["=> 3"]);
}

#[test]
fn test_surfaced_syntax_error_survives_read_only_commands() {
    let config = SessionConfig::default().with_syntax_errors(SyntaxErrorPolicy::Surface);
    let t = drive(
        ScriptedInput::lines(["def a", "1)", "show-input", "nesting"]),
        default_commands(),
        config,
    );
    let failures = t.output.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].message, "unexpected `)`");
    assert_eq!(
        &t.input.prompts()[..4],
        &["burrow(main)> ", "burrow(main)* ", "burrow(main)* ", "burrow(main)* "]
    );
}

#[test]
fn test_runaway_nesting_is_reported_and_the_loop_goes_on() {
    let deep = format!("{}1{}", "(".repeat(500), ")".repeat(500));
    let t = drive_lines(&[deep.as_str(), "5"]);
    let failures = t.output.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, FailureKind::Syntax);
    assert_eq!(t.output.values(), vec!["=> 5"]);
}

#[test]
fn test_syntax_error_hold_policy_waits_for_a_fix() {
    let config = SessionConfig::default().with_syntax_errors(SyntaxErrorPolicy::Hold);
    let mut input = ScriptedInput::lines(["def f", "end", "end", "!", "1"]);
    input.push("exit");
    let t = drive(input, default_commands(), config);

    assert_eq!(
        t.input.prompts(),
        &[
            "burrow(main)> ",
            "burrow(main)* ",
            "burrow(main)> ",
            "burrow(main)! ",
            "burrow(main)> ",
            "burrow(main)> ",
        ]
    );
    assert!(t.output.failures().is_empty());
    assert_eq!(t.output.values(), vec!["=> :f", "=> 1"]);
}

#[test]
fn test_runtime_failures_keep_the_loop_alive() {
    let t = drive_lines(&["1 / 0", "missing", "\"a\" + 1", "2"]);
    let names: Vec<&str> = t
        .output
        .failures()
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(names, vec!["ZeroDivisionError", "NameError", "TypeError"]);
    assert_eq!(t.output.values(), vec!["=> 2"]);
}

#[test]
fn test_oversized_literal_is_a_range_error() {
    let t = drive_lines(&["99999999999999999999", "1"]);
    let failures = t.output.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].name, "RangeError");
    assert_eq!(t.output.values(), vec!["=> 1"]);
}

#[test]
fn test_auto_indent_reformats_blocks() {
    let config = SessionConfig::default().with_auto_indent(true);
    let t = drive(
        ScriptedInput::lines(["def f", "def g", "1", "    end", "show-input", "end"]),
        default_commands(),
        config,
    );
    assert_eq!(
        t.output.events()[0],
        Event::Print("1: def f\n2:   def g\n3:     1\n4:   end".to_string())
    );
    assert_eq!(t.output.values(), vec!["=> :f"]);
}

// ============================================================================
// Context navigation
// ============================================================================

#[test]
fn test_cd_changes_self_and_exit_pops() {
    let mut input = ScriptedInput::lines(["cd 10", "self", "exit", "self", "exit"]);
    input.push("never read");
    let t = drive(input, default_commands(), SessionConfig::default());

    assert_eq!(t.output.values(), vec!["=> 10", "=> main"]);
    assert_eq!(
        t.input.prompts(),
        &[
            "burrow(main)> ",
            "burrow(10):1> ",
            "burrow(10):1> ",
            "burrow(main)> ",
            "burrow(main)> ",
        ]
    );
    assert_eq!(t.exit.reason, ExitReason::StackExhausted);
    assert_eq!(t.input.remaining(), 1);
}

#[test]
fn test_locals_belong_to_their_context() {
    let t = drive_lines(&["x = 1", "cd 2 + 3", "self", "x", "x = 9", "cd ..", "x"]);
    assert_eq!(t.output.values(), vec!["=> 1", "=> 5", "=> 9", "=> 1"]);
    assert_eq!(t.output.failures().len(), 1);
    assert_eq!(t.output.failures()[0].name, "NameError");
}

#[test]
fn test_cd_with_an_erroring_expression_keeps_the_stack() {
    let t = drive_lines(&["cd 1 / 0", "self"]);
    assert_eq!(t.output.failures().len(), 1);
    assert_eq!(t.output.values(), vec!["=> main"]);
    assert_eq!(t.input.prompts()[1], "burrow(main)> ");
}

#[test]
fn test_left_contexts_are_released_by_the_interpreter() {
    let mut lines = Vec::new();
    for n in 0..200 {
        lines.push(format!("cd {n}"));
        lines.push(if n % 2 == 0 { "cd ..".to_string() } else { "exit".to_string() });
    }
    lines.extend(["cd 1", "cd 2", "jump-to 0", "cd 3", "cd /"].map(str::to_string));
    let t = drive_lines(&lines.iter().map(String::as_str).collect::<Vec<_>>());

    assert!(t.output.failures().is_empty());
    assert_eq!(t.exit.reason, ExitReason::EndOfInput);
    assert_eq!(t.interpreter.bound(), 0);
}

#[test]
fn test_jump_to_and_nesting_listing() {
    let t = drive_lines(&["cd 1", "cd \"two\"", "cd 3", "jump-to 1", "nesting"]);
    assert_eq!(
        t.output.events().last(),
        Some(&Event::Print(
            "Nesting status:\n--\n0. main (top level)\n1. 1 <- current".to_string()
        ))
    );
}

// ============================================================================
// Nested sessions
// ============================================================================

#[test]
fn test_nested_session_is_isolated_from_parent() {
    let mut input = ScriptedInput::lines([
        "cd 7",
        "y = 1",
        "session(10)",
        "self",
        "cd 99",
        "def half_typed",
    ]);
    input.push_eof(); // pops 99 and discards the half-typed definition
    input.push_eof(); // ends the nested session
    input.push("self");
    input.push("y");
    let t = drive(input, default_commands(), SessionConfig::default());

    assert_eq!(t.output.values(), vec!["=> 1", "=> 10", "", "=> 7", "=> 1"]);
    assert_eq!(
        t.input.prompts(),
        &[
            "burrow(main)> ",
            "burrow(7):1> ",
            "burrow(7):1> ",
            "burrow@1(10)> ",
            "burrow@1(10)> ",
            "burrow@1(99):1> ",
            "burrow@1(99):1* ",
            "burrow@1(10)> ",
            "burrow(7):1> ",
            "burrow(7):1> ",
            "burrow(7):1> ",
            "burrow(main)> ",
        ]
    );
}

#[test]
fn test_session_call_nests_and_end_of_input_returns() {
    let mut input = ScriptedInput::lines(["x = 3", "session(x * 2)", "self", "depth()", "x"]);
    input.push_eof();
    input.push("self");
    input.push("depth()");
    let t = drive(input, default_commands(), SessionConfig::default());

    assert_eq!(
        t.output.values(),
        vec!["=> 3", "=> 6", "=> 1", "", "=> main", "=> 0"]
    );
    let failures = t.output.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].name, "NameError");
    assert!(t.input.prompts().contains(&"burrow@1(6)> ".to_string()));
    assert_eq!(t.exit.depth, 0);
    assert_eq!(t.exit.reason, ExitReason::EndOfInput);
}

#[test]
fn test_deeply_nested_sessions_unwind_one_at_a_time() {
    let mut input = ScriptedInput::lines(["session(1)", "session(2)", "session(3)", "depth()"]);
    input.push_eof();
    input.push("depth()");
    input.push("exit-all");
    input.push("depth()");
    let t = drive(input, default_commands(), SessionConfig::default());

    assert_eq!(
        t.output.values(),
        vec!["=> 3", "", "=> 2", "", "=> 1", ""]
    );
    assert!(t.input.prompts().contains(&"burrow@3(3)> ".to_string()));
}

#[test]
fn test_nested_session_sees_methods_defined_by_parent() {
    let mut input = ScriptedInput::lines(["def twice", "self * 2", "end", "session(21)", "twice"]);
    input.push_eof();
    input.push("twice");
    let t = drive(input, default_commands(), SessionConfig::default());

    assert_eq!(t.output.values()[..3], ["=> :twice", "=> 42", ""]);
    assert_eq!(t.output.failures()[0].name, "NameError");
    assert_eq!(t.interpreter.methods().collect::<Vec<_>>(), vec!["twice"]);
}

#[test]
fn test_root_context_is_bound_to_main() {
    let mut interpreter = Interpreter::new();
    let root = interpreter.root();
    assert_eq!(interpreter.receiver(&root), Object::Main);
    assert_eq!(root.label(), "main");
}
