use winnow::combinator::{alt, cut_err, opt, separated};
use winnow::error::{StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::literal;

use crate::ast::Expr;
use crate::parse_utils::{float_literal, ident, int_literal, kw, quoted_string, ws_skip};

#[cfg(test)]
mod tests;

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Parse a complete rule formula into an expression tree.
///
/// The whole input must be consumed: trailing characters after a complete
/// expression are a parse error.
pub fn parse_formula(input: &str) -> anyhow::Result<Expr> {
    formula
        .parse(input)
        .map_err(|e| anyhow::anyhow!("parse error: {e}"))
}

fn formula(input: &mut &str) -> ModalResult<Expr> {
    let e = expr.parse_next(input)?;
    ws_skip.parse_next(input)?;
    Ok(e)
}

// ---------------------------------------------------------------------------
// Expression grammar
// ---------------------------------------------------------------------------

/// `expr := boolean | number | string | env | array | range | call`
///
/// Alternatives are tried in this order, so the keywords `true`, `false`,
/// and `env` win over a function-call identifier with the same spelling.
fn expr(input: &mut &str) -> ModalResult<Expr> {
    ws_skip.parse_next(input)?;
    alt((
        boolean,
        number,
        quoted_string.map(Expr::Str),
        env_get,
        bracketed,
        call,
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "expression",
    )))
    .parse_next(input)
}

fn boolean(input: &mut &str) -> ModalResult<Expr> {
    alt((
        kw("true").map(|_| Expr::Bool(true)),
        kw("false").map(|_| Expr::Bool(false)),
    ))
    .parse_next(input)
}

/// Float is attempted first so that `0.5` is not read as `0` followed by a
/// stray `.5`.
fn number(input: &mut &str) -> ModalResult<Expr> {
    alt((float_literal.map(Expr::Float), int_literal.map(Expr::Int))).parse_next(input)
}

/// `env := "env" "[" string "]"`; the key must be a string literal.
fn env_get(input: &mut &str) -> ModalResult<Expr> {
    kw("env").parse_next(input)?;
    ws_skip.parse_next(input)?;
    cut_err(literal("["))
        .context(StrContext::Expected(StrContextValue::Description(
            "'[' after env",
        )))
        .parse_next(input)?;
    ws_skip.parse_next(input)?;
    let key = cut_err(quoted_string)
        .context(StrContext::Expected(StrContextValue::Description(
            "string key inside env[...]",
        )))
        .parse_next(input)?;
    ws_skip.parse_next(input)?;
    cut_err(literal("]"))
        .context(StrContext::Expected(StrContextValue::Description(
            "closing bracket",
        )))
        .parse_next(input)?;
    Ok(Expr::EnvGet(Box::new(Expr::Str(key))))
}

/// `array := "[" (expr ("," expr)*)? "]"` or `range := "[" expr ":" expr "]"`.
///
/// Both share the bracket prefix; the separator after the first element
/// decides which form this is (`:` → range, `,` or `]` → array).
fn bracketed(input: &mut &str) -> ModalResult<Expr> {
    literal("[").parse_next(input)?;
    ws_skip.parse_next(input)?;

    // Empty array
    if opt(literal("]")).parse_next(input)?.is_some() {
        return Ok(Expr::Array(Vec::new()));
    }

    let first = expr.parse_next(input)?;
    ws_skip.parse_next(input)?;

    if opt(literal(":")).parse_next(input)?.is_some() {
        let hi = cut_err(expr).parse_next(input)?;
        ws_skip.parse_next(input)?;
        cut_err(literal("]"))
            .context(StrContext::Expected(StrContextValue::Description(
                "closing bracket after range",
            )))
            .parse_next(input)?;
        return Ok(Expr::Range(Box::new(first), Box::new(hi)));
    }

    let mut items = vec![first];
    while opt(literal(",")).parse_next(input)?.is_some() {
        let item = cut_err(expr).parse_next(input)?;
        items.push(item);
        ws_skip.parse_next(input)?;
    }
    cut_err(literal("]"))
        .context(StrContext::Expected(StrContextValue::Description(
            "',' or ']' in array",
        )))
        .parse_next(input)?;
    Ok(Expr::Array(items))
}

/// `call := IDENT "(" (expr ("," expr)*)? ")"`
fn call(input: &mut &str) -> ModalResult<Expr> {
    let name = ident.parse_next(input)?;
    ws_skip.parse_next(input)?;
    literal("(").parse_next(input)?;
    ws_skip.parse_next(input)?;

    // Empty args?
    if opt(literal(")")).parse_next(input)?.is_some() {
        return Ok(Expr::Call {
            name: name.to_string(),
            args: vec![],
        });
    }

    let args: Vec<Expr> = separated(1.., expr, (ws_skip, literal(","))).parse_next(input)?;
    ws_skip.parse_next(input)?;
    cut_err(literal(")"))
        .context(StrContext::Expected(StrContextValue::Description(
            "closing parenthesis",
        )))
        .parse_next(input)?;

    Ok(Expr::Call {
        name: name.to_string(),
        args,
    })
}
