//! This module defines the core value type of the interpreter. The main enum, [`Value`],
//! is a closed set of variants covering every runtime datum: numbers, text, booleans,
//! symbols, keywords, lists, user procedures, native builtins and `nil`. Source code is
//! represented with the same type, so the reader produces `Value`s and the evaluator
//! consumes them.
//!
//! Ergonomic helper functions such as [`val`], [`sym`], [`kw`] and [`empty`] are provided
//! for building values in code and tests, along with `From` conversions for common Rust
//! types and fallible `TryFrom<&Value>` conversions used by the builtin library.

use crate::Error;
use crate::list::List;
use crate::procedure::{Builtin, Procedure};
use std::borrow::Borrow;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

thread_local! {
    static INTERNER: RefCell<HashSet<Rc<str>>> = RefCell::new(HashSet::new());
}

/// An interned identifier.
///
/// All symbols with the same name created on one thread share a single allocation, so
/// comparison is usually a pointer check.
#[derive(Clone)]
pub struct Symbol(Rc<str>);

impl Symbol {
    pub fn new(name: &str) -> Self {
        INTERNER.with(|interner| {
            let mut interner = interner.borrow_mut();
            if let Some(existing) = interner.get(name) {
                return Symbol(Rc::clone(existing));
            }
            let interned: Rc<str> = Rc::from(name);
            interner.insert(Rc::clone(&interned));
            Symbol(interned)
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol::new(name)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Core value type of the interpreter.
///
/// To build values, use the helper functions:
/// - `val(42)` for values, `sym("name")` for symbols, `empty()` for the empty list
/// - `val([1, 2, 3])` for homogeneous lists
/// - `val(vec![sym("op"), val(42)])` for mixed lists
#[derive(Clone)]
pub enum Value {
    /// Double-precision numbers (the only numeric type)
    Number(f64),
    /// String literals
    Text(String),
    /// Booleans, `#t` and `#f`
    Boolean(bool),
    /// Identifiers
    Symbol(Symbol),
    /// Self-evaluating `:name` tokens
    Keyword(Symbol),
    /// Lists, including the empty list
    List(List),
    /// User-defined closures
    Procedure(Rc<Procedure>),
    /// Native functions
    Builtin(Builtin),
    /// The absent value, e.g. the result of `define` or of `if` without an else branch
    Nil,
}

impl Value {
    /// Everything except `#f` and `nil` counts as true.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Boolean(false) | Value::Nil)
    }

    /// Returns the symbol if this value is one.
    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the list if this value is one.
    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// True if this is the symbol `name`.
    pub fn is_symbol(&self, name: &str) -> bool {
        matches!(self, Value::Symbol(s) if s.as_str() == name)
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Boolean(_) => "boolean",
            Value::Symbol(_) => "symbol",
            Value::Keyword(_) => "keyword",
            Value::List(_) => "list",
            Value::Procedure(_) => "procedure",
            Value::Builtin(_) => "builtin",
            Value::Nil => "nil",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Text(s) => write!(f, "Text({s:?})"),
            Value::Boolean(b) => write!(f, "Boolean({b})"),
            Value::Symbol(s) => write!(f, "Symbol({s})"),
            Value::Keyword(s) => write!(f, "Keyword({s})"),
            Value::List(list) => write!(f, "List{list:?}"),
            Value::Procedure(p) => write!(f, "Procedure(params={:?}, body={})", p.params, p.body),
            Value::Builtin(b) => write!(f, "Builtin({})", b.name),
            Value::Nil => write!(f, "Nil"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => {
                write!(f, "\"")?;
                for ch in s.chars() {
                    match ch {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\t' => write!(f, "\\t")?,
                        '\r' => write!(f, "\\r")?,
                        c => write!(f, "{c}")?,
                    }
                }
                write!(f, "\"")
            }
            Value::Boolean(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::Keyword(s) => write!(f, ":{s}"),
            Value::List(list) => write!(f, "{list}"),
            Value::Procedure(_) => write!(f, "#<procedure>"),
            Value::Builtin(b) => write!(f, "#<builtin:{}>", b.name),
            Value::Nil => write!(f, "nil"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Keyword(a), Value::Keyword(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            // Closures compare by identity, builtins by name
            (Value::Procedure(a), Value::Procedure(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a.name == b.name,
            (Value::Nil, Value::Nil) => true,
            _ => false,
        }
    }
}

// From trait implementations for Value - enables .into() conversion
impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Number(f64::from(n))
            }
        }
    };
}

impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(u8);
impl_from_integer!(u16);
impl_from_integer!(u32);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Symbol> for Value {
    fn from(s: Symbol) -> Self {
        Value::Symbol(s)
    }
}

impl From<List> for Value {
    fn from(list: List) -> Self {
        Value::List(list)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::List(arr.into_iter().map(Into::into).collect())
    }
}

// Fallible conversions from `&Value` back into Rust types, used at the builtin boundary.

impl TryFrom<&Value> for f64 {
    type Error = Error;

    fn try_from(value: &Value) -> Result<f64, Error> {
        match value {
            Value::Number(n) => Ok(*n),
            other => Err(Error::type_mismatch("number", other)),
        }
    }
}

impl TryFrom<&Value> for bool {
    type Error = Error;

    fn try_from(value: &Value) -> Result<bool, Error> {
        match value {
            Value::Boolean(b) => Ok(*b),
            other => Err(Error::type_mismatch("boolean", other)),
        }
    }
}

impl<'a> TryFrom<&'a Value> for &'a List {
    type Error = Error;

    fn try_from(value: &'a Value) -> Result<&'a List, Error> {
        match value {
            Value::List(list) => Ok(list),
            other => Err(Error::type_mismatch("list", other)),
        }
    }
}

/// Helper function for creating symbols - works great in mixed lists!
pub fn sym<S: AsRef<str>>(name: S) -> Value {
    Value::Symbol(Symbol::new(name.as_ref()))
}

/// Helper function for creating keywords, `kw("else")` is `:else`
pub fn kw<S: AsRef<str>>(name: S) -> Value {
    Value::Keyword(Symbol::new(name.as_ref()))
}

/// Helper function for creating Values from anything convertible
pub fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// Helper function for the empty list
pub fn empty() -> Value {
    Value::List(List::new())
}

#[cfg(test)]
mod helper_function_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_helper_functions_data_driven() {
        let test_cases = vec![
            (val(42), Value::Number(42.0)),
            (val(-17), Value::Number(-17.0)),
            (val(2.5), Value::Number(2.5)),
            (val(255u8), Value::Number(255.0)),
            (val(true), Value::Boolean(true)),
            (val("hello"), Value::Text("hello".to_owned())),
            (sym("foo-bar?"), Value::Symbol(Symbol::new("foo-bar?"))),
            (kw("else"), Value::Keyword(Symbol::new("else"))),
            (empty(), Value::List(List::new())),
            (
                val([1, 2, 3]),
                Value::List(List::from(vec![val(1), val(2), val(3)])),
            ),
            (
                val(vec![sym("op"), val(42), val("result")]),
                Value::List(List::from(vec![sym("op"), val(42), val("result")])),
            ),
        ];

        for (i, (actual, expected)) in test_cases.into_iter().enumerate() {
            assert_eq!(actual, expected, "test case {}", i + 1);
        }
    }

    #[test]
    fn test_symbols_are_interned() {
        let a = Symbol::new("lambda");
        let b = Symbol::new("lambda");
        assert!(Rc::ptr_eq(&a.0, &b.0));
        assert_eq!(a, b);
        assert_ne!(a, Symbol::new("λ"));
    }

    #[test]
    fn test_symbol_and_text_never_coerce() {
        assert_ne!(sym("x"), val("x"));
        assert_ne!(sym("else"), kw("else"));
    }

    #[test]
    fn test_display() {
        let cases = vec![
            (val(3), "3"),
            (val(0.5), "0.5"),
            (val("a\"b"), "\"a\\\"b\""),
            (val(false), "#f"),
            (kw("key"), ":key"),
            (Value::Nil, "nil"),
            (val(vec![sym("+"), val(1), val([2, 3])]), "(+ 1 (2 3))"),
            (empty(), "()"),
        ];
        for (value, expected) in cases {
            assert_eq!(value.to_string(), expected);
        }
    }

    #[test]
    fn test_truthiness() {
        assert!(!val(false).is_truthy());
        assert!(!Value::Nil.is_truthy());
        assert!(val(0).is_truthy());
        assert!(empty().is_truthy());
        assert!(val("").is_truthy());
    }
}
