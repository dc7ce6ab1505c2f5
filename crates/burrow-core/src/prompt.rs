//! Prompt rendering.
//!
//! The prompt encodes the current context label, the context stack depth,
//! the session nesting depth and the accumulator state:
//!
//! ```text
//! burrow(main)>      ready, root context, outermost session
//! burrow(main)*      accumulating a multi-line unit
//! burrow(main)!      holding a syntax error
//! burrow(10):1>      one `cd` deep
//! burrow@1(10)>      inside a nested session
//! ```

use std::fmt;

use crate::accumulator::AccumulatorState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptState<'a> {
    pub name: &'a str,
    pub label: &'a str,
    pub stack_depth: usize,
    pub session_depth: usize,
    pub state: AccumulatorState,
}

impl PromptState<'_> {
    pub fn marker(&self) -> char {
        match self.state {
            AccumulatorState::Ready => '>',
            AccumulatorState::Accumulating => '*',
            AccumulatorState::Error => '!',
        }
    }
}

impl fmt::Display for PromptState<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)?;
        if self.session_depth > 0 {
            write!(f, "@{}", self.session_depth)?;
        }
        write!(f, "({})", self.label)?;
        if self.stack_depth > 0 {
            write!(f, ":{}", self.stack_depth)?;
        }
        write!(f, "{} ", self.marker())
    }
}
