//! Built-in operations registry.
//!
//! Every name the evaluator knows natively lives in one registry: the special forms, which
//! receive their operands unevaluated and are dispatched by the evaluator itself, and the
//! builtin functions, which are bound in the global environment and called with evaluated
//! arguments like any other procedure.
//!
//! ```lisp
//! (+ 1 2 3)             ; 6
//! (< 1 2 3)             ; #t, comparisons chain over adjacent pairs
//! (cons 1 (list 2 3))   ; (1 2 3)
//! (equal? '(1 2) '(1 2)); #t
//! ```
//!
//! ## Functions vs Special Forms
//!
//! - **Functions**: Evaluate all arguments before application (e.g., `+`, `not`, `car`)
//! - **Special Forms**: Control evaluation of their operands (e.g., `if`, `define`, `quote`)
//!
//! ## Error Handling
//!
//! - **Type Safety**: arithmetic and comparison reject non-numbers, list operations reject
//!   non-lists. There is no coercion between types.
//! - **Arity Checking**: argument counts are validated before a builtin runs.
//! - **Proper lists only**: `cons` requires a list as its second argument.
//!
//! ## Adding New Operations
//!
//! 1. **Implement the function** following the signature `fn(args: &[Value]) -> Result<Value, Error>`
//! 2. **Add to BUILTIN_OPS** with its identifier and arity
//! 3. **Update the evaluator** if it's a special form requiring custom evaluation logic
//! 4. **Add tests** covering edge cases and error conditions

use crate::Error;
use crate::ast::{Symbol, Value};
use crate::environment::Environment;
use crate::list::List;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::LazyLock;

/// Accepted argument counts of an operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    /// Inclusive bounds
    Range(usize, usize),
    Any,
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
            Arity::Range(min, max) => (min..=max).contains(&count),
            Arity::Any => true,
        }
    }

    /// Check `count` against this arity, naming `name` in the error.
    pub fn validate(self, name: &str, count: usize) -> Result<(), Error> {
        if self.accepts(count) {
            Ok(())
        } else {
            Err(Error::Arity {
                name: name.to_owned(),
                expected: self.to_string(),
                got: count,
            })
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
            Arity::Range(min, max) => write!(f, "{min} to {max}"),
            Arity::Any => write!(f, "any number of"),
        }
    }
}

/// Special forms handled directly by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialForm {
    Quote,
    Quasiquote,
    Unquote,
    UnquoteSplicing,
    If,
    Cond,
    Set,
    Define,
    Lambda,
    Defn,
    Defmacro,
    Let,
    Begin,
    Apply,
}

/// Represents the implementation of a built-in expression (function or special form)
#[derive(Debug, Clone, Copy)]
pub enum OpKind {
    /// Regular function that takes evaluated arguments and returns a value
    Function(fn(&[Value]) -> Result<Value, Error>),
    /// Special form that receives its operands unevaluated
    SpecialForm(SpecialForm),
}

/// Definition of a built-in operation
#[derive(Debug, Clone)]
pub struct BuiltinOp {
    /// The identifier this operation is bound to
    pub id: &'static str,
    /// The implementation of this operation (function or special form)
    pub op_kind: OpKind,
    /// Expected number of arguments
    pub arity: Arity,
}

impl PartialEq for BuiltinOp {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl BuiltinOp {
    /// Check if this operation is a special form
    pub fn is_special_form(&self) -> bool {
        matches!(self.op_kind, OpKind::SpecialForm(_))
    }
}

//
// Builtin Function Implementations
//

fn numbers(args: &[Value]) -> impl Iterator<Item = Result<f64, Error>> + '_ {
    args.iter().map(f64::try_from)
}

fn list_arg(value: &Value) -> Result<&List, Error> {
    <&List>::try_from(value)
}

// Macro to generate numeric comparison functions
macro_rules! numeric_comparison {
    ($name:ident, $op:tt) => {
        fn $name(args: &[Value]) -> Result<Value, Error> {
            let values = numbers(args).collect::<Result<Vec<_>, _>>()?;
            // Chain comparisons: all adjacent pairs must satisfy the comparison
            Ok(Value::Boolean(values.windows(2).all(|pair| pair[0] $op pair[1])))
        }
    };
}

// Generate all comparison functions
numeric_comparison!(builtin_eq, ==);
numeric_comparison!(builtin_lt, <);
numeric_comparison!(builtin_gt, >);
numeric_comparison!(builtin_le, <=);
numeric_comparison!(builtin_ge, >=);

fn builtin_add(args: &[Value]) -> Result<Value, Error> {
    let mut sum = 0.0;
    for n in numbers(args) {
        sum += n?;
    }
    Ok(Value::Number(sum))
}

fn builtin_mul(args: &[Value]) -> Result<Value, Error> {
    let mut product = 1.0;
    for n in numbers(args) {
        product *= n?;
    }
    Ok(Value::Number(product))
}

// Macro for the left folds that take a unary form: (- x) negates, (/ x) reciprocates
macro_rules! inverse_fold {
    ($name:ident, $op:tt, $identity:expr) => {
        fn $name(args: &[Value]) -> Result<Value, Error> {
            let mut iter = numbers(args);
            let Some(first) = iter.next() else {
                return Err(Error::Arity {
                    name: stringify!($op).to_owned(),
                    expected: Arity::AtLeast(1).to_string(),
                    got: 0,
                });
            };
            let first = first?;
            let mut iter = iter.peekable();
            if iter.peek().is_none() {
                return Ok(Value::Number($identity $op first));
            }
            let mut result = first;
            for n in iter {
                result = result $op n?;
            }
            Ok(Value::Number(result))
        }
    };
}

inverse_fold!(builtin_sub, -, 0.0);
inverse_fold!(builtin_div, /, 1.0);

fn builtin_rem(args: &[Value]) -> Result<Value, Error> {
    match args {
        [a, b] => Ok(Value::Number(f64::try_from(a)? % f64::try_from(b)?)),
        _ => Err(Error::Arity {
            name: "%".to_owned(),
            expected: "2".to_owned(),
            got: args.len(),
        }),
    }
}

fn builtin_not(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Boolean(!first(args)?.is_truthy()))
}

fn builtin_equal(args: &[Value]) -> Result<Value, Error> {
    // Structural equality for all types; different types are simply unequal
    Ok(Value::Boolean(args.windows(2).all(|pair| pair[0] == pair[1])))
}

fn builtin_cons(args: &[Value]) -> Result<Value, Error> {
    match args {
        [first, rest] => Ok(Value::List(List::cons(first.clone(), list_arg(rest)?))),
        _ => Err(Error::Arity {
            name: "cons".to_owned(),
            expected: "2".to_owned(),
            got: args.len(),
        }),
    }
}

fn builtin_car(args: &[Value]) -> Result<Value, Error> {
    let list = list_arg(first(args)?)?;
    list.head()
        .cloned()
        .ok_or_else(|| Error::type_mismatch("non-empty list", &Value::List(List::new())))
}

fn builtin_cdr(args: &[Value]) -> Result<Value, Error> {
    let list = list_arg(first(args)?)?;
    if list.is_empty() {
        return Err(Error::type_mismatch("non-empty list", &Value::List(List::new())));
    }
    Ok(Value::List(list.tail()))
}

fn builtin_list(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::List(args.iter().cloned().collect()))
}

fn builtin_append(args: &[Value]) -> Result<Value, Error> {
    let mut result = List::new();
    for arg in args.iter().rev() {
        result = List::append(list_arg(arg)?, &result);
    }
    Ok(Value::List(result))
}

fn builtin_length(args: &[Value]) -> Result<Value, Error> {
    let list = list_arg(first(args)?)?;
    Ok(Value::Number(list.len() as f64))
}

fn builtin_null(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Boolean(match first(args)? {
        Value::List(list) => list.is_empty(),
        Value::Nil => true,
        _ => false,
    }))
}

// Macro to generate single-argument type predicates
macro_rules! type_predicate {
    ($name:ident, $pattern:pat) => {
        fn $name(args: &[Value]) -> Result<Value, Error> {
            Ok(Value::Boolean(matches!(first(args)?, $pattern)))
        }
    };
}

type_predicate!(builtin_is_number, Value::Number(_));
type_predicate!(builtin_is_text, Value::Text(_));
type_predicate!(builtin_is_symbol, Value::Symbol(_));
type_predicate!(builtin_is_keyword, Value::Keyword(_));
type_predicate!(builtin_is_list, Value::List(_));
type_predicate!(builtin_is_procedure, Value::Procedure(_) | Value::Builtin(_));
type_predicate!(builtin_is_boolean, Value::Boolean(_));
type_predicate!(builtin_is_nil, Value::Nil);

fn builtin_error(args: &[Value]) -> Result<Value, Error> {
    let parts: Vec<String> = args
        .iter()
        .map(|value| match value {
            Value::Text(s) => s.clone(),
            _ => value.to_string(),
        })
        .collect();

    let message = if parts.is_empty() {
        "Error".to_owned()
    } else {
        parts.join(" ")
    };

    Err(Error::User(message))
}

fn first(args: &[Value]) -> Result<&Value, Error> {
    args.first().ok_or_else(|| Error::Arity {
        name: "builtin".to_owned(),
        expected: "1".to_owned(),
        got: 0,
    })
}

macro_rules! function {
    ($id:expr, $func:expr, $arity:expr) => {
        BuiltinOp {
            id: $id,
            op_kind: OpKind::Function($func),
            arity: $arity,
        }
    };
}

macro_rules! special_form {
    ($id:expr, $form:ident, $arity:expr) => {
        BuiltinOp {
            id: $id,
            op_kind: OpKind::SpecialForm(SpecialForm::$form),
            arity: $arity,
        }
    };
}

/// Global registry of all built-in operations.
static BUILTIN_OPS: LazyLock<Vec<BuiltinOp>> = LazyLock::new(|| {
    vec![
        // Arithmetic operations
        function!("+", builtin_add, Arity::Any),
        function!("-", builtin_sub, Arity::AtLeast(1)),
        function!("*", builtin_mul, Arity::Any),
        function!("/", builtin_div, Arity::AtLeast(1)),
        function!("%", builtin_rem, Arity::Exact(2)),
        // Comparison operations
        function!("=", builtin_eq, Arity::AtLeast(2)),
        function!("<", builtin_lt, Arity::AtLeast(2)),
        function!(">", builtin_gt, Arity::AtLeast(2)),
        function!("<=", builtin_le, Arity::AtLeast(2)),
        function!(">=", builtin_ge, Arity::AtLeast(2)),
        function!("equal?", builtin_equal, Arity::Exact(2)),
        // Logical operations
        function!("not", builtin_not, Arity::Exact(1)),
        // List operations
        function!("cons", builtin_cons, Arity::Exact(2)),
        function!("car", builtin_car, Arity::Exact(1)),
        function!("cdr", builtin_cdr, Arity::Exact(1)),
        function!("list", builtin_list, Arity::Any),
        function!("append", builtin_append, Arity::Any),
        function!("length", builtin_length, Arity::Exact(1)),
        function!("null?", builtin_null, Arity::Exact(1)),
        // Type predicates
        function!("number?", builtin_is_number, Arity::Exact(1)),
        function!("text?", builtin_is_text, Arity::Exact(1)),
        function!("symbol?", builtin_is_symbol, Arity::Exact(1)),
        function!("keyword?", builtin_is_keyword, Arity::Exact(1)),
        function!("list?", builtin_is_list, Arity::Exact(1)),
        function!("procedure?", builtin_is_procedure, Arity::Exact(1)),
        function!("boolean?", builtin_is_boolean, Arity::Exact(1)),
        function!("nil?", builtin_is_nil, Arity::Exact(1)),
        // Error handling
        function!("error", builtin_error, Arity::Any),
        // Special forms
        special_form!("quote", Quote, Arity::Exact(1)),
        special_form!("quasiquote", Quasiquote, Arity::Exact(1)),
        special_form!("unquote", Unquote, Arity::Any),
        special_form!("unquote-splicing", UnquoteSplicing, Arity::Any),
        special_form!("if", If, Arity::Range(2, 3)),
        special_form!("cond", Cond, Arity::Any),
        special_form!("set!", Set, Arity::Exact(2)),
        special_form!("define", Define, Arity::Exact(2)),
        special_form!("lambda", Lambda, Arity::AtLeast(2)),
        special_form!("λ", Lambda, Arity::AtLeast(2)),
        special_form!("defn", Defn, Arity::AtLeast(3)),
        special_form!("defmacro", Defmacro, Arity::AtLeast(2)),
        special_form!("let", Let, Arity::AtLeast(2)),
        special_form!("begin", Begin, Arity::Any),
        special_form!("apply", Apply, Arity::Exact(2)),
    ]
});

/// Lazy static map from id to BuiltinOp (private - use find_op)
static BUILTIN_INDEX: LazyLock<HashMap<&'static str, &'static BuiltinOp>> = LazyLock::new(|| {
    let ops: &'static [BuiltinOp] = BUILTIN_OPS.as_slice();
    ops.iter().map(|op| (op.id, op)).collect()
});

/// Get all builtin operations
pub fn get_builtin_ops() -> &'static [BuiltinOp] {
    BUILTIN_OPS.as_slice()
}

/// Find a builtin operation by its identifier
pub fn find_op(id: &str) -> Option<&'static BuiltinOp> {
    BUILTIN_INDEX.get(id).copied()
}

/// Find a special form by its keyword
pub(crate) fn find_special_form(id: &str) -> Option<(&'static BuiltinOp, SpecialForm)> {
    find_op(id).and_then(|op| match op.op_kind {
        OpKind::SpecialForm(form) => Some((op, form)),
        OpKind::Function(_) => None,
    })
}

/// Bind every builtin function into `env`, each behind its arity check.
pub fn populate_environment(env: &Environment) {
    for op in get_builtin_ops() {
        if let OpKind::Function(func) = op.op_kind {
            let (id, arity) = (op.id, op.arity);
            env.register_builtin_closure(
                id,
                Rc::new(move |args: &[Value]| {
                    arity.validate(id, args.len())?;
                    func(args)
                }),
            );
        }
    }
}

/// Create a global environment with built-in functions and the `nil` constant
pub fn create_global_env() -> Environment {
    let env = Environment::new();
    populate_environment(&env);
    env.bind(Symbol::new("nil"), Value::Nil);
    env
}
