//! Burrow demo language
//!
//! A tiny Ruby-flavoured language used to exercise the session core end to
//! end. It supplies both collaborators the core needs:
//! - [`Oracle`] answers "is this buffer a complete unit?",
//! - [`Interpreter`] evaluates units against contexts and can start nested
//!   sessions through `session(expr)`.
//!
//! ```text
//! def greet
//!   "hello"
//! end
//! x = 2 * (3 + 4)
//! session(x)      # nested session bound to 14
//! ```

pub mod ast;
pub mod error;
pub mod interp;
pub mod object;
pub mod oracle;
pub mod parser;
mod scan;

pub use ast::{BinOp, Expr, Stmt};
pub use error::{ParseError, ParseProblem, RuntimeError};
pub use interp::Interpreter;
pub use object::Object;
pub use oracle::Oracle;
pub use parser::parse_program;
