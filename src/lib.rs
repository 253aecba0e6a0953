//! gigl - a small Lisp interpreter
//!
//! This crate evaluates s-expression data against a lexically-scoped environment. It
//! supports closures, proper tail calls and a non-hygienic macro system built on
//! ellipsis pattern matching (in the style of `syntax-rules`).
//!
//! ```lisp
//! (defn fact (n acc) (if (= n 0) acc (fact (- n 1) (* n acc))))
//! (fact 10 1)                       ; 3628800
//! `(1 ,@(list 2 3) 4)               ; (1 2 3 4)
//! (defmacro swap! (a b)
//!   `(let ((tmp ,a)) (begin (set! ,a ,b) (set! ,b tmp))))
//! ```
//!
//! ## Semantics in brief
//!
//! - Only double-precision numbers; no numeric tower.
//! - `#f` and `nil` are false, everything else is true.
//! - `define` never overwrites an existing binding in the same scope, use `set!`.
//! - Macros are expanded textually and the expansion is evaluated in the global
//!   environment. There is no hygiene.
//!
//! ## Modules
//!
//! - `ast`: the [`Value`] type and construction helpers
//! - `list`: the persistent [`List`] used for both code and data
//! - `environment`: chained lexical scopes
//! - `procedure`: closures and native builtins
//! - `pattern`: the macro pattern matcher
//! - `macros`: macro definitions, the macro table and template substitution
//! - `builtinops`: the builtin function registry
//! - `evaluator`: the eval/apply loop and special forms
//! - `reader`: text to [`Value`] (feature `reader`)
//! - `prelude`: language-level library procedures (feature `prelude`)

use thiserror::Error;

/// Maximum nesting depth accepted by the reader.
///
/// The reader is recursive, so this bounds its stack usage for hostile input.
pub const MAX_PARSE_DEPTH: usize = 256;

/// Categorizes the different kinds of parsing errors.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ParseErrorKind {
    /// Invalid or unexpected syntax (bad tokens, malformed expressions)
    InvalidSyntax,
    /// Input ended before the expression was complete (EOF, unterminated string, unclosed parens)
    Incomplete,
    /// Expression nesting exceeded [`MAX_PARSE_DEPTH`]
    TooDeeplyNested,
    /// Extra input found after a complete, valid expression
    TrailingContent,
}

/// A structured error providing detailed information about a parsing failure.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    /// Context snippet from the input showing where the error occurred (max 60 chars)
    pub context: Option<String>,
    /// The problematic token or character encountered, if identifiable
    pub found: Option<String>,
}

impl ParseError {
    pub fn new(
        kind: ParseErrorKind,
        message: impl Into<String>,
        context: Option<String>,
        found: Option<String>,
    ) -> Self {
        ParseError {
            kind,
            message: message.into(),
            context,
            found,
        }
    }

    /// Create a ParseError with context extracted from `input` around `offset`
    pub fn with_context(
        kind: ParseErrorKind,
        message: impl Into<String>,
        input: &str,
        offset: usize,
    ) -> Self {
        const MAX_CONTEXT: usize = 60;
        const LEADING_CHARS: usize = 15;

        // `offset` counts bytes; step back whole characters from it
        let offset = (0..=offset.min(input.len()))
            .rev()
            .find(|&i| input.is_char_boundary(i))
            .unwrap_or(0);
        let start = input[..offset]
            .char_indices()
            .rev()
            .nth(LEADING_CHARS - 1)
            .map_or(0, |(i, _)| i);
        let snippet: String = input[start..].chars().take(MAX_CONTEXT).collect();
        let found = input[offset..].split_whitespace().next().map(str::to_owned);

        let mut context = String::new();
        if start > 0 {
            context.push_str("[...]");
        }
        context.push_str(&snippet.replace('\n', "\\n").replace('\r', ""));
        if start + snippet.len() < input.len() {
            context.push_str("[...]");
        }

        Self::new(kind, message, Some(context), found)
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(found) = &self.found {
            write!(f, "\nFound: {found}")?;
        }
        if let Some(context) = &self.context {
            write!(f, "\nContext: {context}")?;
        }
        Ok(())
    }
}

/// Error type for every fallible operation in the interpreter.
///
/// Errors always propagate to the caller of [`Evaluator::eval`]; the evaluator never
/// recovers locally. Bindings made by `define`/`set!`/`defmacro` before the failing
/// step are kept.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("ParseError: {0}")]
    Parse(ParseError),
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),
    #[error("Unknown expression: {0}")]
    UnknownExpression(String),
    #[error("Malformed {form}: {reason}")]
    MalformedSpecialForm { form: &'static str, reason: String },
    #[error("Unable to redefine existing symbol {0}")]
    Redefinition(String),
    #[error("Attempt to set! unbound symbol {0}: use define instead")]
    UnboundAssignment(String),
    #[error("Cannot unquote outside of a quasiquoted expression")]
    UnquoteOutsideQuasiquote,
    #[error("Invalid macro pattern: {0}")]
    InvalidMacroPattern(String),
    #[error("No clause of macro {name} matches {form}")]
    MacroMatchFailure { name: String, form: String },
    #[error("Type mismatch: expected {expected}, got {found}")]
    TypeMismatch { expected: &'static str, found: String },
    #[error("ArityError: {name} expected {expected} arguments but got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },
    #[error("{0}")]
    User(String),
}

impl Error {
    pub(crate) fn malformed(form: &'static str, reason: impl Into<String>) -> Self {
        Error::MalformedSpecialForm {
            form,
            reason: reason.into(),
        }
    }

    pub(crate) fn type_mismatch(expected: &'static str, found: &Value) -> Self {
        Error::TypeMismatch {
            expected,
            found: format!("{} {found}", found.type_name()),
        }
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::Parse(e)
    }
}

pub mod ast;
pub mod builtinops;
pub mod environment;
pub mod evaluator;
pub mod list;
pub mod macros;
pub mod pattern;
pub mod procedure;

#[cfg(feature = "reader")]
pub mod reader;

#[cfg(feature = "prelude")]
pub mod prelude;

pub use ast::{Symbol, Value};
pub use environment::Environment;
pub use evaluator::{Config, Evaluator};
pub use list::List;
