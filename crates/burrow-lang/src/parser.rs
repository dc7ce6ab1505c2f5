//! Parser for the demo language.
//!
//! Statements are separated by newlines or `;`. The grammar, loosely:
//!
//! ```text
//! program := stmt ((";" | "\n") stmt)*
//! stmt    := "def" NAME ["()"] sep (stmt sep)* "end"
//!          | NAME "=" expr
//!          | expr
//! expr    := term (("+" | "-") term)*
//! term    := unary (("*" | "/") unary)*
//! unary   := "-"* atom
//! atom    := INT | STRING | "nil" | "self" | "(" expr ")" | NAME ["(" args ")"]
//! ```
//!
//! Parsing runs on the output of the lexical pre-pass, so comments are gone
//! and line breaks inside parentheses or after an operator are plain spaces.
//! The pre-pass also bounds parenthesis and block nesting; expression trees
//! are bounded by [`MAX_EXPR_DEPTH`].

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take_while},
    character::complete::{anychar, char, digit1, one_of, satisfy, space0, space1},
    combinator::{all_consuming, cut, map, map_res, not, opt, recognize, value, verify},
    error::{Error, ErrorKind},
    multi::{many0, many0_count, many1_count, separated_list0},
    sequence::{delimited, pair, terminated, tuple},
    IResult,
};

use crate::ast::{BinOp, Expr, Stmt};
use crate::error::ParseError;
use crate::scan::scan;

const KEYWORDS: &[&str] = &["def", "end", "nil", "self"];

/// Deepest expression tree the parser builds.
pub const MAX_EXPR_DEPTH: usize = 128;

/// Parse a complete unit.
pub fn parse_program(source: &str) -> Result<Vec<Stmt>, ParseError> {
    let scanned = scan(source);
    let normalized = scanned.normalized;
    if let Some(offset) = scanned.too_deep {
        return Err(ParseError::too_deep(&normalized, offset));
    }
    match program(&normalized) {
        Ok((_, stmts)) => Ok(stmts),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) if e.code == ErrorKind::TooLarge => {
            let offset = normalized.len() - e.input.len();
            Err(ParseError::too_deep(&normalized, offset))
        }
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
            Err(ParseError::at(&normalized, e.input))
        }
        Err(nom::Err::Incomplete(_)) => Err(ParseError::at(&normalized, "")),
    }
}

fn program(input: &str) -> IResult<&str, Vec<Stmt>> {
    all_consuming(delimited(
        pair(space0, many0_count(separator)),
        separated_list0(many1_count(separator), statement),
        pair(many0_count(separator), space0),
    ))(input)
}

fn separator(input: &str) -> IResult<&str, char> {
    delimited(space0, one_of(";\n\r"), space0)(input)
}

// ============================================================================
// Statements
// ============================================================================

fn statement(input: &str) -> IResult<&str, Stmt> {
    alt((definition, assignment, map(expr, Stmt::Expr)))(input)
}

fn definition(input: &str) -> IResult<&str, Stmt> {
    let (input, _) = keyword("def")(input)?;
    let (input, _) = space1(input)?;
    let (input, name) = name(input)?;
    let (input, _) = opt(tuple((space0, char('('), space0, char(')'))))(input)?;
    let (input, _) = many1_count(separator)(input)?;
    let (input, body) = many0(terminated(statement, many1_count(separator)))(input)?;
    let (input, _) = keyword("end")(input)?;
    Ok((input, Stmt::Def { name, body }))
}

fn assignment(input: &str) -> IResult<&str, Stmt> {
    let (input, (name, _, _, _, value)) =
        tuple((name, space0, char('='), space0, cut(expr)))(input)?;
    Ok((input, Stmt::Assign { name, value }))
}

// ============================================================================
// Expressions
// ============================================================================

pub(crate) fn expr(input: &str) -> IResult<&str, Expr> {
    chain("+-", term)(input)
}

fn term(input: &str) -> IResult<&str, Expr> {
    chain("*/", unary)(input)
}

/// `operand (op operand)*`, folded to the left.
fn chain(
    ops: &'static str,
    operand: fn(&str) -> IResult<&str, Expr>,
) -> impl FnMut(&str) -> IResult<&str, Expr> {
    move |input| {
        let (mut input, mut lhs) = operand(input)?;
        let mut height = lhs.depth();
        loop {
            let (after_op, op) = match operator(ops)(input) {
                Ok(found) => found,
                Err(nom::Err::Error(_)) => return Ok((input, lhs)),
                Err(e) => return Err(e),
            };
            let (rest, rhs) = cut(operand)(after_op)?;
            height = 1 + height.max(rhs.depth());
            if height > MAX_EXPR_DEPTH {
                return Err(too_deep(input));
            }
            lhs = Expr::binary(op, lhs, rhs);
            input = rest;
        }
    }
}

fn too_deep(input: &str) -> nom::Err<Error<&str>> {
    nom::Err::Failure(Error::new(input, ErrorKind::TooLarge))
}

fn operator(ops: &'static str) -> impl FnMut(&str) -> IResult<&str, BinOp> {
    move |input| {
        map_res(delimited(space0, one_of(ops), space0), |c| {
            BinOp::from_char(c).ok_or(ErrorKind::OneOf)
        })(input)
    }
}

fn unary(input: &str) -> IResult<&str, Expr> {
    let (rest, (signs, operand)) = pair(many0_count(pair(char('-'), space0)), atom)(input)?;
    if signs + operand.depth() > MAX_EXPR_DEPTH {
        return Err(too_deep(input));
    }
    let negated = (0..signs).fold(operand, |e, _| Expr::Neg(Box::new(e)));
    Ok((rest, negated))
}

fn atom(input: &str) -> IResult<&str, Expr> {
    alt((
        integer,
        map(string_literal, Expr::Str),
        value(Expr::Nil, keyword("nil")),
        value(Expr::SelfRef, keyword("self")),
        delimited(pair(char('('), space0), expr, pair(space0, char(')'))),
        call_or_ident,
    ))(input)
}

fn call_or_ident(input: &str) -> IResult<&str, Expr> {
    let (input, name) = name(input)?;
    let (input, args) = opt(delimited(
        pair(char('('), space0),
        separated_list0(tuple((space0, char(','), space0)), expr),
        pair(space0, char(')')),
    ))(input)?;
    let expr = match args {
        Some(args) => Expr::Call { name, args },
        None => Expr::Ident(name),
    };
    Ok((input, expr))
}

// ============================================================================
// Tokens
// ============================================================================

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic() || c == '_'),
        take_while(is_word_char),
    ))(input)
}

fn name(input: &str) -> IResult<&str, String> {
    map(verify(identifier, |id: &str| !KEYWORDS.contains(&id)), str::to_string)(input)
}

fn keyword(kw: &'static str) -> impl FnMut(&str) -> IResult<&str, &str> {
    move |input| terminated(tag(kw), not(satisfy(is_word_char)))(input)
}

fn integer(input: &str) -> IResult<&str, Expr> {
    map(terminated(digit1, not(satisfy(is_word_char))), |digits: &str| {
        digits
            .parse::<i64>()
            .map_or_else(|_| Expr::HugeInt(digits.to_string()), Expr::Int)
    })(input)
}

/// `"..."` with `\n` and `\t` escapes; any other escaped character stands
/// for itself.
fn string_literal(input: &str) -> IResult<&str, String> {
    let escape = alt((
        value("\n", char('n')),
        value("\t", char('t')),
        recognize(anychar),
    ));
    let body = escaped_transform(is_not("\"\\"), '\\', escape);
    delimited(char('"'), map(opt(body), Option::unwrap_or_default), char('"'))(input)
}
