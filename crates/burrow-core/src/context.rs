//! Evaluation contexts and the context stack.
//!
//! A [`Context`] is an opaque handle to "the thing currently evaluated
//! against". The core only needs identity and a display label; what a context
//! actually refers to is the evaluator's business (keyed by [`ContextId`]).

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Identity-compared handle plus a label used in prompts.
#[derive(Debug, Clone)]
pub struct Context {
    id: ContextId,
    label: Arc<str>,
}

impl Context {
    /// Create a fresh context. Every call yields a distinct identity, even
    /// for equal labels.
    pub fn new(label: impl Into<String>) -> Self {
        let id = ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed));
        Self {
            id,
            label: Arc::from(label.into()),
        }
    }

    /// The conventional top-level context.
    pub fn main() -> Self {
        Self::new("main")
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Context {}

impl Hash for Context {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

// ============================================================================
// Stack
// ============================================================================

/// Result of [`ContextStack::pop`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopOutcome {
    /// A context was removed and the one beneath it is current again.
    Resumed { removed: Context },
    /// The last context was removed; the owning session must terminate.
    Exhausted { removed: Context },
    /// Nothing left to pop.
    Empty,
}

impl PopOutcome {
    pub fn is_exhausted(&self) -> bool {
        !matches!(self, PopOutcome::Resumed { .. })
    }

    pub fn removed(&self) -> Option<&Context> {
        match self {
            PopOutcome::Resumed { removed } | PopOutcome::Exhausted { removed } => Some(removed),
            PopOutcome::Empty => None,
        }
    }
}

/// Ordered stack of contexts; the current context is the last element.
///
/// The bottom element (the root) is only removed by an explicit pop. An empty
/// stack is the terminal signal for the session that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextStack {
    frames: Vec<Context>,
}

impl ContextStack {
    pub fn new(root: Context) -> Self {
        Self { frames: vec![root] }
    }

    pub fn push(&mut self, context: Context) {
        self.frames.push(context);
    }

    pub fn pop(&mut self) -> PopOutcome {
        match self.frames.pop() {
            Some(removed) if self.frames.is_empty() => PopOutcome::Exhausted { removed },
            Some(removed) => PopOutcome::Resumed { removed },
            None => PopOutcome::Empty,
        }
    }

    pub fn current(&self) -> Option<&Context> {
        self.frames.last()
    }

    pub fn root(&self) -> Option<&Context> {
        self.frames.first()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Zero at the root, one after a single push, and so on.
    pub fn nesting_level(&self) -> usize {
        self.frames.len().saturating_sub(1)
    }

    pub fn get(&self, level: usize) -> Option<&Context> {
        self.frames.get(level)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Context> {
        self.frames.iter()
    }

    /// Pop back until `level` is the current nesting level. Returns the
    /// removed contexts, innermost first. Never removes the root.
    pub fn unwind_to(&mut self, level: usize) -> Vec<Context> {
        let keep = level.saturating_add(1).max(1);
        let mut removed = Vec::new();
        while self.frames.len() > keep {
            if let Some(ctx) = self.frames.pop() {
                removed.push(ctx);
            }
        }
        removed
    }

    /// Remove every context, including the root.
    pub fn clear(&mut self) -> Vec<Context> {
        let mut removed: Vec<Context> = self.frames.drain(..).collect();
        removed.reverse();
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contexts_compare_by_identity_not_label() {
        let a = Context::new("10");
        let b = Context::new("10");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(a.label(), b.label());
    }

    #[test]
    fn pop_above_root_resumes_parent() {
        let main = Context::main();
        let ten = Context::new("10");
        let mut stack = ContextStack::new(main.clone());
        stack.push(ten.clone());

        assert_eq!(stack.pop(), PopOutcome::Resumed { removed: ten });
        assert_eq!(stack.current(), Some(&main));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn popping_the_root_exhausts_the_stack() {
        let main = Context::main();
        let mut stack = ContextStack::new(main.clone());

        assert_eq!(stack.pop(), PopOutcome::Exhausted { removed: main });
        assert!(stack.is_empty());
        assert_eq!(stack.current(), None);
        assert_eq!(stack.pop(), PopOutcome::Empty);
    }

    #[test]
    fn unwind_to_keeps_the_root() {
        let mut stack = ContextStack::new(Context::main());
        stack.push(Context::new("a"));
        stack.push(Context::new("b"));
        stack.push(Context::new("c"));

        let removed = stack.unwind_to(1);
        let labels: Vec<&str> = removed.iter().map(Context::label).collect();
        assert_eq!(labels, vec!["c", "b"]);
        assert_eq!(stack.current().map(Context::label), Some("a"));

        stack.unwind_to(0);
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.current().map(Context::label), Some("main"));
    }
}
