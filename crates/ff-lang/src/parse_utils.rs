use winnow::ascii::multispace0;
use winnow::combinator::{cut_err, opt};
use winnow::error::{ContextError, ErrMode, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{any, literal, take_while};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Function-name identifier: a letter followed by letters, digits, or `_`.
pub fn ident<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    // First character must be alphabetic (not digit, not underscore).
    if !input.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(ErrMode::Backtrack(ContextError::new()));
    }
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_').parse_next(input)
}

// ---------------------------------------------------------------------------
// Strings
// ---------------------------------------------------------------------------

/// Quote-delimited string literal.
///
/// Backslash escapes are permitted and kept verbatim in the result; only the
/// surrounding quotes are stripped. An unterminated string is a hard error.
pub fn quoted_string(input: &mut &str) -> ModalResult<String> {
    literal("\"").parse_next(input)?;
    let mut content = String::new();
    loop {
        let run = take_while(0.., |c: char| c != '"' && c != '\\').parse_next(input)?;
        content.push_str(run);
        if opt(literal("\\")).parse_next(input)?.is_some() {
            let escaped = cut_err(any)
                .context(StrContext::Expected(StrContextValue::Description(
                    "character after backslash",
                )))
                .parse_next(input)?;
            content.push('\\');
            content.push(escaped);
        } else {
            break;
        }
    }
    cut_err(literal("\""))
        .context(StrContext::Expected(StrContextValue::Description(
            "closing quote",
        )))
        .parse_next(input)?;
    Ok(content)
}

// ---------------------------------------------------------------------------
// Whitespace
// ---------------------------------------------------------------------------

/// Skip any run of whitespace.
pub fn ws_skip(input: &mut &str) -> ModalResult<()> {
    let _ = multispace0.parse_next(input)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Keyword matching with word boundary
// ---------------------------------------------------------------------------

/// Match an exact keyword string, ensuring it's not a prefix of a longer
/// identifier (i.e. the next character is not alphanumeric or `_`).
pub fn kw<'a>(keyword: &'static str) -> impl FnMut(&mut &'a str) -> ModalResult<()> {
    move |input: &mut &'a str| {
        let saved = *input;
        literal(keyword).parse_next(input)?;
        if input.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_') {
            *input = saved;
            return Err(ErrMode::Backtrack(ContextError::new()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Number literals
// ---------------------------------------------------------------------------

/// Float literal: `[-]? digits? "." digits`.
///
/// The integer part is optional (`.5` is valid) but the fractional digits are
/// not, so `5.` backtracks and is left for [`int_literal`] to pick up.
pub fn float_literal(input: &mut &str) -> ModalResult<f64> {
    let neg = opt(literal("-")).parse_next(input)?.is_some();
    let int_part = opt(take_while(1.., |c: char| c.is_ascii_digit())).parse_next(input)?;
    literal(".").parse_next(input)?;
    let frac_part = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    let text = format!(
        "{}{}.{}",
        if neg { "-" } else { "" },
        int_part.unwrap_or("0"),
        frac_part
    );
    text.parse()
        .map_err(|_| ErrMode::Cut(ContextError::new()))
}

/// Integer literal: `[-]? digits`, rejected when it does not fit in i64.
pub fn int_literal(input: &mut &str) -> ModalResult<i64> {
    let neg = opt(literal("-")).parse_next(input)?.is_some();
    let digits = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    let text = if neg {
        format!("-{digits}")
    } else {
        digits.to_string()
    };
    text.parse()
        .map_err(|_| ErrMode::Cut(ContextError::new()))
}
