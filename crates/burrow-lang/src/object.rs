use std::fmt;

/// A runtime value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    Nil,
    Int(i64),
    Str(String),
    Symbol(String),
    /// The top-level object.
    Main,
}

impl Object {
    /// The representation shown after `=>` and used as a context label.
    pub fn inspect(&self) -> String {
        match self {
            Object::Nil => "nil".to_string(),
            Object::Int(n) => n.to_string(),
            Object::Str(s) => inspect_str(s),
            Object::Symbol(name) => format!(":{name}"),
            Object::Main => "main".to_string(),
        }
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            Object::Nil => "NilClass",
            Object::Int(_) => "Integer",
            Object::Str(_) => "String",
            Object::Symbol(_) => "Symbol",
            Object::Main => "Object",
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inspect())
    }
}

fn inspect_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
