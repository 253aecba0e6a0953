//! Text to [`Value`].
//!
//! A recursive-descent reader built on nom. Everything after `;` up to the end of the line
//! is a comment. Once a list, string or prefix form has been opened, a failure inside it is
//! not backtracked, so errors point at the offending position rather than at the opener.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, multispace1, not_line_ending, one_of},
    combinator::{all_consuming, cut, opt, recognize, value},
    error::ErrorKind,
    multi::many0_count,
    sequence::pair,
};

use crate::ast::{Symbol, Value, sym};
use crate::list::List;
use crate::{Error, MAX_PARSE_DEPTH, ParseError, ParseErrorKind};

/// Characters other than alphanumerics allowed in symbols.
const SYMBOL_SPECIAL_CHARS: &str = "!$%&*+-./:<=>?@^_~";

fn is_symbol_char(c: char) -> bool {
    c.is_alphanumeric() || SYMBOL_SPECIAL_CHARS.contains(c)
}

fn fail<T>(input: &str, code: ErrorKind) -> IResult<&str, T> {
    Err(nom::Err::Failure(nom::error::Error::new(input, code)))
}

/// Convert nom parsing errors to structured parse errors
fn to_parse_error(input: &str, error: nom::Err<nom::error::Error<&str>>) -> ParseError {
    match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let offset = input.len().saturating_sub(e.input.len());
            if e.code == ErrorKind::TooLarge {
                ParseError::with_context(
                    ParseErrorKind::TooDeeplyNested,
                    format!("Expression too deeply nested (max depth: {MAX_PARSE_DEPTH})"),
                    input,
                    offset,
                )
            } else if e.input.is_empty() {
                ParseError::with_context(
                    ParseErrorKind::Incomplete,
                    "Unexpected end of input",
                    input,
                    offset,
                )
            } else {
                let near: String = e.input.chars().take(10).collect();
                ParseError::with_context(
                    ParseErrorKind::InvalidSyntax,
                    format!("Invalid syntax at position {offset} near '{near}'"),
                    input,
                    offset,
                )
            }
        }
        nom::Err::Incomplete(_) => {
            ParseError::new(ParseErrorKind::Incomplete, "Incomplete input", None, None)
        }
    }
}

/// Skip whitespace and comments
fn skip_atmosphere(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0_count(alt((
            multispace1,
            recognize(pair(char(';'), not_line_ending)),
        ))),
    )
    .parse(input)
}

fn decimal_digits(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_digit()).parse(input)
}

/// Parse a decimal literal with optional sign, fraction and exponent
fn number_literal(token: &str) -> Option<f64> {
    let validated: IResult<&str, ()> = all_consuming(value(
        (),
        (
            opt(one_of("+-")),
            decimal_digits,
            opt(pair(char('.'), take_while(|c: char| c.is_ascii_digit()))),
            opt((one_of("eE"), opt(one_of("+-")), decimal_digits)),
        ),
    ))
    .parse(token);
    // The grammar only checks the shape; the whole token is converted
    validated.ok()?;
    token.parse().ok()
}

/// A token is numeric if it starts with a digit, optionally after a sign.
fn looks_numeric(token: &str) -> bool {
    token
        .strip_prefix(['+', '-'])
        .unwrap_or(token)
        .starts_with(|c: char| c.is_ascii_digit())
}

/// Parse a symbol-character run: number, boolean, keyword or symbol
fn parse_atom(input: &str) -> IResult<&str, Value> {
    let (remaining, token) = take_while1(is_symbol_char).parse(input)?;

    let atom = match token {
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        _ if looks_numeric(token) => match number_literal(token) {
            Some(n) => Value::Number(n),
            // Starts like a number but isn't one, e.g. 123abc
            None => return fail(input, ErrorKind::Float),
        },
        _ => match token.strip_prefix(':') {
            Some(name) if !name.is_empty() => Value::Keyword(Symbol::new(name)),
            _ => Value::Symbol(Symbol::new(token)),
        },
    };
    Ok((remaining, atom))
}

/// Parse a boolean (#t or #f)
fn parse_hash(input: &str) -> IResult<&str, Value> {
    let (remaining, token) = recognize(pair(char('#'), take_while(is_symbol_char))).parse(input)?;
    match token {
        "#t" => Ok((remaining, Value::Boolean(true))),
        "#f" => Ok((remaining, Value::Boolean(false))),
        _ => fail(input, ErrorKind::Tag),
    }
}

/// Parse a string literal
fn parse_string(input: &str) -> IResult<&str, Value> {
    let (mut remaining, _) = char('"').parse(input)?;
    let mut text = String::new();

    loop {
        let mut chars = remaining.chars();
        match chars.next() {
            Some('"') => return Ok((chars.as_str(), Value::Text(text))),
            Some('\\') => {
                match chars.next() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('r') => text.push('\r'),
                    Some('\\') => text.push('\\'),
                    Some('"') => text.push('"'),
                    // Unknown escape sequence
                    Some(_) => return fail(remaining, ErrorKind::Char),
                    // Backslash at end of input
                    None => return fail(chars.as_str(), ErrorKind::Char),
                }
                remaining = chars.as_str();
            }
            Some(ch) => {
                text.push(ch);
                remaining = chars.as_str();
            }
            // Reached end of input without finding closing quote
            None => return fail(remaining, ErrorKind::Char),
        }
    }
}

/// Parse a list; elements may be separated by any atmosphere, or none where unambiguous
fn parse_list(input: &str, depth: usize) -> IResult<&str, Value> {
    let (mut input, _) = char('(').parse(input)?;
    let mut items = Vec::new();

    loop {
        let (remaining, ()) = skip_atmosphere(input)?;
        if let Some(remaining) = remaining.strip_prefix(')') {
            return Ok((remaining, Value::List(List::from(items))));
        }
        if remaining.is_empty() {
            return fail(remaining, ErrorKind::Char);
        }
        let (remaining, item) = cut(|i| parse_datum(i, depth + 1)).parse(remaining)?;
        items.push(item);
        input = remaining;
    }
}

/// Parse 'x `x ,x ,@x into their long forms
fn parse_prefixed(input: &str, depth: usize) -> IResult<&str, Value> {
    let (input, name) = alt((
        value("unquote-splicing", tag(",@")),
        value("unquote", tag(",")),
        value("quote", tag("'")),
        value("quasiquote", tag("`")),
    ))
    .parse(input)?;
    let (input, datum) = cut(|i| parse_datum(i, depth + 1)).parse(input)?;
    Ok((input, Value::List(List::from(vec![sym(name), datum]))))
}

fn parse_datum(input: &str, depth: usize) -> IResult<&str, Value> {
    if depth >= MAX_PARSE_DEPTH {
        return fail(input, ErrorKind::TooLarge);
    }
    alt((
        |i| parse_list(i, depth),
        |i| parse_prefixed(i, depth),
        parse_string,
        parse_hash,
        parse_atom,
    ))
    .parse(input)
}

/// Read exactly one datum from `input`. Surrounding whitespace and comments are allowed.
pub fn read(input: &str) -> Result<Value, Error> {
    fn padded_datum(input: &str) -> IResult<&str, Value> {
        let (input, ()) = skip_atmosphere(input)?;
        let (input, datum) = parse_datum(input, 0)?;
        let (input, ()) = skip_atmosphere(input)?;
        Ok((input, datum))
    }

    match padded_datum(input) {
        Ok(("", datum)) => Ok(datum),
        Ok((remaining, _)) => Err(ParseError::with_context(
            ParseErrorKind::TrailingContent,
            format!("Unexpected remaining input: '{remaining}'"),
            input,
            input.len() - remaining.len(),
        )
        .into()),
        Err(e) => Err(to_parse_error(input, e).into()),
    }
}

/// Read every datum in `input`, in order. Empty input yields no datums.
pub fn read_all(input: &str) -> Result<Vec<Value>, Error> {
    let mut datums = Vec::new();
    let mut remaining = input;
    loop {
        let (rest, ()) = skip_atmosphere(remaining).map_err(|e| to_parse_error(input, e))?;
        if rest.is_empty() {
            return Ok(datums);
        }
        let (rest, datum) = parse_datum(rest, 0).map_err(|e| to_parse_error(input, e))?;
        datums.push(datum);
        remaining = rest;
    }
}
