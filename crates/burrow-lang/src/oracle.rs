use burrow_core::{Completeness, CompletenessOracle};

use crate::error::ParseError;
use crate::parser::parse_program;
use crate::scan::scan;

/// Completeness oracle for the demo language.
///
/// Open strings, parentheses, `def` blocks and a trailing operator make a
/// buffer incomplete. A stray closer, nesting beyond the parser's limits, or
/// a balanced buffer that does not parse, is a syntax error.
#[derive(Debug, Clone, Copy, Default)]
pub struct Oracle;

impl CompletenessOracle for Oracle {
    fn check(&self, source: &str) -> Completeness {
        let scanned = scan(source);
        if let Some(token) = scanned.stray {
            return Completeness::SyntaxError(format!("unexpected `{token}`"));
        }
        if let Some(offset) = scanned.too_deep {
            return Completeness::SyntaxError(ParseError::too_deep(source, offset).to_string());
        }
        if scanned.is_open() {
            return Completeness::Incomplete;
        }
        match parse_program(source) {
            Ok(_) => Completeness::Complete,
            Err(err) => Completeness::SyntaxError(err.to_string()),
        }
    }

    fn indent_level(&self, source: &str) -> usize {
        scan(source).blocks
    }
}
