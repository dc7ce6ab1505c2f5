//! Lexical pre-pass shared by the oracle and the parser.
//!
//! One walk over the source tracks open strings, parentheses and `def`
//! blocks, and produces a normalised copy for the parser in which comments
//! are blanked out and line breaks that cannot end a statement (inside
//! parentheses, after a binary operator) become spaces. Byte offsets are
//! preserved so parse errors point into the original text.

/// Open parentheses plus `def` blocks allowed at any point.
pub(crate) const MAX_NESTING: usize = 64;

#[derive(Debug, Default)]
pub(crate) struct Scan {
    pub normalized: String,
    pub in_string: bool,
    pub parens: usize,
    pub blocks: usize,
    /// First closing token with nothing to close.
    pub stray: Option<&'static str>,
    /// The last significant character is an operator or a comma.
    pub dangling: bool,
    /// Byte offset of the first opener beyond [`MAX_NESTING`].
    pub too_deep: Option<usize>,
}

impl Scan {
    pub fn is_open(&self) -> bool {
        self.in_string || self.parens > 0 || self.blocks > 0 || self.dangling
    }

    fn opened(&mut self, at: usize) {
        if self.parens + self.blocks > MAX_NESTING {
            self.too_deep.get_or_insert(at);
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn continues_line(c: char) -> bool {
    matches!(c, '+' | '-' | '*' | '/' | '=' | ',')
}

pub(crate) fn scan(source: &str) -> Scan {
    let mut scan = Scan {
        normalized: String::with_capacity(source.len()),
        ..Scan::default()
    };
    let mut in_comment = false;
    let mut escaped = false;
    let mut word = String::new();
    let mut last: Option<char> = None;

    for (at, c) in source.char_indices() {
        if in_comment {
            if c == '\n' {
                in_comment = false;
                push_newline(&mut scan, last);
            } else {
                blank(&mut scan.normalized, c);
            }
            continue;
        }

        if scan.in_string {
            scan.normalized.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                scan.in_string = false;
                last = Some('"');
            }
            continue;
        }

        if is_word_char(c) {
            word.push(c);
            scan.normalized.push(c);
            last = Some(c);
            continue;
        }
        close_word(&mut scan, &mut word, at);

        match c {
            '#' => {
                in_comment = true;
                blank(&mut scan.normalized, c);
            }
            '"' => {
                scan.in_string = true;
                scan.normalized.push(c);
            }
            '\n' => push_newline(&mut scan, last),
            '(' => {
                scan.parens += 1;
                scan.opened(at);
                scan.normalized.push(c);
            }
            ')' => {
                if scan.parens == 0 {
                    scan.stray.get_or_insert(")");
                } else {
                    scan.parens -= 1;
                }
                scan.normalized.push(c);
            }
            c => scan.normalized.push(c),
        }
        if !c.is_whitespace() && c != '#' {
            last = Some(c);
        }
    }
    close_word(&mut scan, &mut word, source.len());

    scan.dangling = !scan.in_string && last.is_some_and(continues_line);
    scan
}

/// `end` is the byte offset just past `word`.
fn close_word(scan: &mut Scan, word: &mut String, end: usize) {
    match word.as_str() {
        "def" => {
            scan.blocks += 1;
            scan.opened(end - word.len());
        }
        "end" if scan.blocks == 0 => {
            scan.stray.get_or_insert("end");
        }
        "end" => scan.blocks -= 1,
        _ => {}
    }
    word.clear();
}

fn push_newline(scan: &mut Scan, last: Option<char>) {
    if scan.parens > 0 || last.is_some_and(continues_line) {
        scan.normalized.push(' ');
    } else {
        scan.normalized.push('\n');
    }
}

fn blank(out: &mut String, c: char) {
    out.extend(std::iter::repeat(' ').take(c.len_utf8()));
}
