//! Tree-walking interpreter and the [`Evaluator`] implementation.
//!
//! Every [`Context`] handed out by the interpreter is bound to a receiver
//! object and owns its own local variables. Methods defined with `def` are
//! global and run with the caller's receiver and a fresh local scope.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use burrow_core::{
    Context, ContextId, Evaluator, Failure, ReplError, SessionExit, SessionHost, Value,
};
use tracing::debug;

use crate::ast::{BinOp, Expr, Stmt};
use crate::error::RuntimeError;
use crate::object::Object;
use crate::parser::parse_program;

/// Method call nesting allowed before `SystemStackError`.
pub const MAX_CALL_DEPTH: usize = 100;

/// Expression evaluation nesting allowed before `SystemStackError`. Counts
/// through method calls and nested sessions.
pub const MAX_EVAL_DEPTH: usize = 256;

/// Nested sessions `session(...)` may open before `SystemStackError`.
pub const MAX_SESSION_DEPTH: usize = 64;

#[derive(Debug, Clone)]
struct Frame {
    receiver: Object,
    locals: HashMap<String, Object>,
}

impl Frame {
    fn new(receiver: Object) -> Self {
        Self {
            receiver,
            locals: HashMap::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Interpreter {
    frames: HashMap<ContextId, Frame>,
    methods: BTreeMap<String, Arc<Vec<Stmt>>>,
    calls: usize,
    evals: usize,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh top-level context bound to `main`.
    pub fn root(&mut self) -> Context {
        let context = Context::main();
        self.frames
            .insert(context.id(), Frame::new(Object::Main));
        context
    }

    /// A fresh context bound to `receiver`, labelled with its inspect form.
    pub fn bind(&mut self, receiver: Object) -> Context {
        let context = Context::new(receiver.inspect());
        self.frames.insert(context.id(), Frame::new(receiver));
        context
    }

    /// The object a context is bound to. Contexts this interpreter never
    /// bound behave as `main`.
    pub fn receiver(&self, context: &Context) -> Object {
        self.frames
            .get(&context.id())
            .map_or(Object::Main, |frame| frame.receiver.clone())
    }

    /// Number of contexts currently bound.
    pub fn bound(&self) -> usize {
        self.frames.len()
    }

    pub fn local(&self, context: &Context, name: &str) -> Option<&Object> {
        self.frames.get(&context.id())?.locals.get(name)
    }

    /// Names of every method defined so far, sorted.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// Parse and run `source` against `context`.
    pub fn run(
        &mut self,
        source: &str,
        context: &Context,
        host: &mut dyn SessionHost,
    ) -> Result<(Object, bool), Failure> {
        let program = parse_program(source)?;
        let silent = program.last().is_some_and(Stmt::is_session_call);

        let mut frame = self
            .frames
            .remove(&context.id())
            .unwrap_or_else(|| Frame::new(Object::Main));
        let result = self.exec_block(&program, &mut frame, host);
        self.frames.insert(context.id(), frame);

        Ok((result?, silent))
    }

    fn exec_block(
        &mut self,
        body: &[Stmt],
        frame: &mut Frame,
        host: &mut dyn SessionHost,
    ) -> Result<Object, RuntimeError> {
        let mut last = Object::Nil;
        for stmt in body {
            last = self.exec(stmt, frame, host)?;
        }
        Ok(last)
    }

    fn exec(
        &mut self,
        stmt: &Stmt,
        frame: &mut Frame,
        host: &mut dyn SessionHost,
    ) -> Result<Object, RuntimeError> {
        match stmt {
            Stmt::Def { name, body } => {
                self.methods.insert(name.clone(), Arc::new(body.clone()));
                Ok(Object::Symbol(name.clone()))
            }
            Stmt::Assign { name, value } => {
                let value = self.eval(value, frame, host)?;
                frame.locals.insert(name.clone(), value.clone());
                Ok(value)
            }
            Stmt::Expr(expr) => self.eval(expr, frame, host),
        }
    }

    fn eval(
        &mut self,
        expr: &Expr,
        frame: &mut Frame,
        host: &mut dyn SessionHost,
    ) -> Result<Object, RuntimeError> {
        if self.evals >= MAX_EVAL_DEPTH {
            return Err(RuntimeError::StackTooDeep);
        }
        self.evals += 1;
        let result = self.eval_expr(expr, frame, host);
        self.evals -= 1;
        result
    }

    fn eval_expr(
        &mut self,
        expr: &Expr,
        frame: &mut Frame,
        host: &mut dyn SessionHost,
    ) -> Result<Object, RuntimeError> {
        match expr {
            Expr::Int(n) => Ok(Object::Int(*n)),
            Expr::HugeInt(digits) => Err(RuntimeError::LiteralOutOfRange(digits.clone())),
            Expr::Str(s) => Ok(Object::Str(s.clone())),
            Expr::Nil => Ok(Object::Nil),
            Expr::SelfRef => Ok(frame.receiver.clone()),
            Expr::Ident(name) => {
                if let Some(value) = frame.locals.get(name) {
                    return Ok(value.clone());
                }
                if self.methods.contains_key(name) {
                    return self.call(name, &[], frame, host);
                }
                Err(RuntimeError::UndefinedName {
                    name: name.clone(),
                    receiver: frame.receiver.inspect(),
                })
            }
            Expr::Call { name, args } => self.call(name, args, frame, host),
            Expr::Neg(inner) => match self.eval(inner, frame, host)? {
                Object::Int(n) => n.checked_neg().map(Object::Int).ok_or(RuntimeError::Overflow),
                other => Err(undefined_operator("-@", &other)),
            },
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs, frame, host)?;
                let rhs = self.eval(rhs, frame, host)?;
                binary(*op, lhs, rhs)
            }
        }
    }

    fn call(
        &mut self,
        name: &str,
        args: &[Expr],
        frame: &mut Frame,
        host: &mut dyn SessionHost,
    ) -> Result<Object, RuntimeError> {
        match name {
            "session" => {
                let [arg] = args else {
                    return Err(arity(args.len(), 1));
                };
                let receiver = self.eval(arg, frame, host)?;
                if host.depth() >= MAX_SESSION_DEPTH {
                    return Err(RuntimeError::StackTooDeep);
                }
                self.start_session(receiver, host)?;
                return Ok(Object::Nil);
            }
            "depth" => {
                if !args.is_empty() {
                    return Err(arity(args.len(), 0));
                }
                return Ok(Object::Int(host.depth() as i64));
            }
            _ => {}
        }

        let Some(body) = self.methods.get(name).cloned() else {
            return Err(RuntimeError::UndefinedMethod {
                name: name.to_string(),
                receiver: frame.receiver.inspect(),
            });
        };
        if !args.is_empty() {
            return Err(arity(args.len(), 0));
        }
        if self.calls >= MAX_CALL_DEPTH {
            return Err(RuntimeError::StackTooDeep);
        }

        let mut scope = Frame::new(frame.receiver.clone());
        self.calls += 1;
        let result = self.exec_block(&body, &mut scope, host);
        self.calls -= 1;
        result
    }

    fn start_session(
        &mut self,
        receiver: Object,
        host: &mut dyn SessionHost,
    ) -> Result<SessionExit, RuntimeError> {
        let context = self.bind(receiver);
        debug!(context = context.label(), depth = host.depth() + 1, "starting nested session");
        let exit = host
            .start_session(context.clone(), self)
            .map_err(|e| RuntimeError::Session(e.to_string()));
        self.frames.remove(&context.id());
        exit
    }
}

fn binary(op: BinOp, lhs: Object, rhs: Object) -> Result<Object, RuntimeError> {
    match (op, lhs, rhs) {
        (op, Object::Int(a), Object::Int(b)) => {
            let result = match op {
                BinOp::Add => a.checked_add(b),
                BinOp::Sub => a.checked_sub(b),
                BinOp::Mul => a.checked_mul(b),
                BinOp::Div if b == 0 => return Err(RuntimeError::ZeroDivision),
                BinOp::Div => floor_div(a, b),
            };
            result.map(Object::Int).ok_or(RuntimeError::Overflow)
        }
        (BinOp::Add, Object::Str(a), Object::Str(b)) => Ok(Object::Str(a + &b)),
        (BinOp::Add, Object::Str(_), other) => Err(RuntimeError::Type(format!(
            "no implicit conversion of {} into String",
            other.class_name()
        ))),
        (BinOp::Mul, Object::Str(s), Object::Int(n)) => {
            let times = usize::try_from(n)
                .map_err(|_| RuntimeError::Type("negative argument".to_string()))?;
            Ok(Object::Str(s.repeat(times)))
        }
        (_, Object::Int(_), other) => Err(RuntimeError::Type(format!(
            "{} can't be coerced into Integer",
            other.class_name()
        ))),
        (op, lhs, _) => Err(undefined_operator(op.symbol(), &lhs)),
    }
}

/// Integer division rounding toward negative infinity.
fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if (a % b != 0) && ((a < 0) != (b < 0)) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

fn undefined_operator(symbol: &str, receiver: &Object) -> RuntimeError {
    RuntimeError::UndefinedMethod {
        name: symbol.to_string(),
        receiver: format!("{}:{}", receiver.inspect(), receiver.class_name()),
    }
}

fn arity(given: usize, expected: usize) -> RuntimeError {
    RuntimeError::Arity { given, expected }
}

impl Evaluator for Interpreter {
    fn evaluate(
        &mut self,
        source: &str,
        target: &Context,
        host: &mut dyn SessionHost,
    ) -> Result<Value, Failure> {
        let (object, silent) = self.run(source, target, host)?;
        if silent {
            return Ok(Value::Nothing);
        }
        Ok(Value::inspected(object.inspect()))
    }

    fn resolve_context(&mut self, expr: &str, current: &Context) -> Result<Context, Failure> {
        let mut host = Detached;
        let (object, _) = self.run(expr, current, &mut host)?;
        Ok(self.bind(object))
    }

    fn release(&mut self, context: &Context) {
        self.frames.remove(&context.id());
    }
}

/// Host for evaluations that happen outside a session loop (navigation
/// arguments); it refuses to nest.
struct Detached;

impl SessionHost for Detached {
    fn depth(&self) -> usize {
        0
    }

    fn start_session(
        &mut self,
        _target: Context,
        _evaluator: &mut dyn Evaluator,
    ) -> Result<SessionExit, ReplError> {
        Err(ReplError::Input(
            "sessions cannot be started from a navigation argument".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_core::{ExitReason, FailureKind};

    /// Records nested-session requests without running them.
    #[derive(Default)]
    struct Recorder {
        depth: usize,
        started: Vec<String>,
    }

    impl SessionHost for Recorder {
        fn depth(&self) -> usize {
            self.depth
        }

        fn start_session(
            &mut self,
            target: Context,
            _evaluator: &mut dyn Evaluator,
        ) -> Result<SessionExit, ReplError> {
            self.started.push(target.label().to_string());
            Ok(SessionExit {
                reason: ExitReason::EndOfInput,
                depth: self.depth + 1,
            })
        }
    }

    fn eval(interp: &mut Interpreter, ctx: &Context, source: &str) -> Result<Value, Failure> {
        interp.evaluate(source, ctx, &mut Recorder::default())
    }

    fn shown(interp: &mut Interpreter, ctx: &Context, source: &str) -> String {
        match eval(interp, ctx, source) {
            Ok(value) => value.to_string(),
            Err(failure) => panic!("{source:?} failed: {failure}"),
        }
    }

    #[test]
    fn arithmetic_and_strings() {
        let mut interp = Interpreter::new();
        let main = interp.root();
        assert_eq!(shown(&mut interp, &main, "1 + 2 * 3"), "7");
        assert_eq!(shown(&mut interp, &main, "-7 / 2"), "-4");
        assert_eq!(shown(&mut interp, &main, "7 / 2"), "3");
        assert_eq!(shown(&mut interp, &main, "\"ab\" + \"c\""), "\"abc\"");
        assert_eq!(shown(&mut interp, &main, "\"ab\" * 2"), "\"abab\"");
        assert_eq!(shown(&mut interp, &main, ""), "nil");
    }

    #[test]
    fn named_failures() {
        let mut interp = Interpreter::new();
        let main = interp.root();
        let cases = [
            ("1 / 0", "ZeroDivisionError"),
            ("nope", "NameError"),
            ("nope()", "NameError"),
            ("1 + \"a\"", "TypeError"),
            ("\"a\" + 1", "TypeError"),
            ("nil + 1", "NameError"),
            ("depth(1)", "ArgumentError"),
            ("9223372036854775807 + 1", "RangeError"),
            ("99999999999999999999", "RangeError"),
        ];
        for (source, name) in cases {
            let failure = eval(&mut interp, &main, source).unwrap_err();
            assert_eq!(failure.kind, FailureKind::Evaluation, "{source}");
            assert_eq!(failure.name, name, "{source}");
        }

        let failure = eval(&mut interp, &main, "1 +* 2").unwrap_err();
        assert_eq!(failure.kind, FailureKind::Syntax);
    }

    #[test]
    fn definitions_are_global_and_locals_are_per_context() {
        let mut interp = Interpreter::new();
        let main = interp.root();
        assert_eq!(shown(&mut interp, &main, "def answer\n  42\nend"), ":answer");
        assert_eq!(shown(&mut interp, &main, "x = answer + 1"), "43");
        assert_eq!(interp.local(&main, "x"), Some(&Object::Int(43)));

        let ten = interp.resolve_context("10", &main).unwrap();
        assert_eq!(ten.label(), "10");
        assert_eq!(shown(&mut interp, &ten, "self"), "10");
        assert_eq!(shown(&mut interp, &ten, "answer()"), "42");
        assert!(eval(&mut interp, &ten, "x").is_err());
        assert_eq!(shown(&mut interp, &main, "self"), "main");
        assert_eq!(interp.methods().collect::<Vec<_>>(), vec!["answer"]);
    }

    #[test]
    fn method_locals_do_not_leak() {
        let mut interp = Interpreter::new();
        let main = interp.root();
        shown(&mut interp, &main, "def f\n  y = 5\n  y\nend");
        assert_eq!(shown(&mut interp, &main, "f"), "5");
        assert!(eval(&mut interp, &main, "y").is_err());
    }

    #[test]
    fn runaway_recursion_is_an_error() {
        let mut interp = Interpreter::new();
        let main = interp.root();
        shown(&mut interp, &main, "def loop_forever\n  loop_forever()\nend");
        let failure = eval(&mut interp, &main, "loop_forever").unwrap_err();
        assert_eq!(failure.name, "SystemStackError");
        assert_eq!(shown(&mut interp, &main, "1"), "1");
    }

    #[test]
    fn deep_expressions_across_calls_are_an_error() {
        let mut interp = Interpreter::new();
        let main = interp.root();
        let body = format!("{}dig{}", "1 + (".repeat(12), ")".repeat(12));
        shown(&mut interp, &main, &format!("def dig\n  {body}\nend"));

        let failure = eval(&mut interp, &main, "dig").unwrap_err();
        assert_eq!(failure.name, "SystemStackError");
        assert_eq!(interp.evals, 0);
        assert_eq!(interp.calls, 0);
        assert_eq!(shown(&mut interp, &main, "2 * 3"), "6");
    }

    #[test]
    fn released_contexts_drop_their_frames() {
        let mut interp = Interpreter::new();
        let main = interp.root();
        for _ in 0..1000 {
            let ten = interp.resolve_context("10", &main).unwrap();
            interp.release(&ten);
        }
        assert_eq!(interp.bound(), 1);
        assert_eq!(interp.receiver(&main), Object::Main);
    }

    #[test]
    fn session_call_asks_the_host_and_renders_nothing() {
        let mut interp = Interpreter::new();
        let main = interp.root();
        let mut host = Recorder {
            depth: 3,
            ..Recorder::default()
        };
        let value = interp.evaluate("session(2 * 5)", &main, &mut host).unwrap();
        assert_eq!(value, Value::Nothing);
        assert_eq!(host.started, vec!["10"]);

        let value = interp.evaluate("depth()", &main, &mut host).unwrap();
        assert_eq!(value, Value::inspected("3"));

        let value = interp.evaluate("session(1); 5", &main, &mut host).unwrap();
        assert_eq!(value, Value::inspected("5"));
        assert_eq!(interp.bound(), 1);
    }

    #[test]
    fn session_nesting_is_bounded() {
        let mut interp = Interpreter::new();
        let main = interp.root();
        let mut host = Recorder {
            depth: MAX_SESSION_DEPTH,
            ..Recorder::default()
        };
        let failure = interp.evaluate("session(1)", &main, &mut host).unwrap_err();
        assert_eq!(failure.name, "SystemStackError");
        assert!(host.started.is_empty());
    }

    #[test]
    fn navigation_cannot_nest() {
        let mut interp = Interpreter::new();
        let main = interp.root();
        let failure = interp.resolve_context("session(1)", &main).unwrap_err();
        assert_eq!(failure.name, "RuntimeError");
    }
}
