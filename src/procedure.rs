//! Callable values: user closures and native builtins.

use crate::Error;
use crate::ast::{Symbol, Value};
use crate::environment::Environment;
use crate::list::List;
use std::fmt;
use std::rc::Rc;

/// Signature shared by every native function.
pub type BuiltinFn = dyn Fn(&[Value]) -> Result<Value, Error>;

/// Parameter specification of a closure.
#[derive(Debug, Clone, PartialEq)]
pub enum Params {
    /// Ordered parameter names, bound positionally
    Fixed(Vec<Symbol>),
    /// A single name bound to the whole argument list
    Rest(Symbol),
}

impl Params {
    /// Parse a parameter specification: a list of distinct symbols, or a single symbol.
    pub fn parse(form: &'static str, params: &Value) -> Result<Params, Error> {
        match params {
            Value::Symbol(name) => Ok(Params::Rest(name.clone())),
            Value::List(list) => {
                let mut names: Vec<Symbol> = Vec::with_capacity(list.len());
                for param in list {
                    let Value::Symbol(name) = param else {
                        return Err(Error::malformed(
                            form,
                            format!("parameters must be symbols, got {param}"),
                        ));
                    };
                    if names.contains(name) {
                        return Err(Error::malformed(
                            form,
                            format!("duplicate parameter name: {name}"),
                        ));
                    }
                    names.push(name.clone());
                }
                Ok(Params::Fixed(names))
            }
            other => Err(Error::malformed(
                form,
                format!("parameters must be a list or a symbol, got {other}"),
            )),
        }
    }
}

/// A user-defined closure.
///
/// Procedures capture the environment they were created in by reference, so later
/// `define`s in that environment are visible to the body.
pub struct Procedure {
    pub params: Params,
    pub body: Value,
    pub env: Environment,
}

impl Procedure {
    pub fn new(params: Params, body: Value, env: &Environment) -> Self {
        Procedure {
            params,
            body,
            env: env.clone(),
        }
    }

    /// Build a closure from the unevaluated parts of a `lambda`-like form.
    ///
    /// Several body forms are wrapped in a single `begin`.
    pub fn from_parts(
        form: &'static str,
        params: &Value,
        body: &[Value],
        env: &Environment,
    ) -> Result<Self, Error> {
        let params = Params::parse(form, params)?;
        let body = body_from_forms(form, body)?;
        Ok(Procedure::new(params, body, env))
    }

    /// Create the invocation frame for a call with `args`, parented to the captured
    /// environment.
    ///
    /// The frame is reclaimed when the call's result no longer references it. A closure
    /// defined into the frame it captures forms an `Rc` cycle, and that frame stays
    /// allocated for the life of the process, so a tail loop defining such a helper on every
    /// iteration grows memory by one frame per iteration.
    pub fn bind_arguments(&self, args: Vec<Value>) -> Result<Environment, Error> {
        let frame = Environment::with_outer(&self.env);
        match &self.params {
            Params::Fixed(names) => {
                if names.len() != args.len() {
                    return Err(Error::Arity {
                        name: "#<procedure>".to_owned(),
                        expected: names.len().to_string(),
                        got: args.len(),
                    });
                }
                for (name, arg) in names.iter().zip(args) {
                    frame.bind(name.clone(), arg);
                }
            }
            Params::Rest(name) => frame.bind(name.clone(), Value::List(List::from(args))),
        }
        Ok(frame)
    }
}

/// A single body expression: one form as-is, several wrapped in `begin`.
pub(crate) fn body_from_forms(form: &'static str, body: &[Value]) -> Result<Value, Error> {
    match body {
        [] => Err(Error::malformed(form, "missing body")),
        [single] => Ok(single.clone()),
        many => {
            let forms = std::iter::once(crate::ast::sym("begin")).chain(many.iter().cloned());
            Ok(Value::List(forms.collect()))
        }
    }
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Procedure")
            .field("params", &self.params)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

/// A native function bound in an environment.
#[derive(Clone)]
pub struct Builtin {
    pub name: &'static str,
    pub func: Rc<BuiltinFn>,
}

impl Builtin {
    pub fn call(&self, args: &[Value]) -> Result<Value, Error> {
        (self.func)(args)
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Builtin({})", self.name)
    }
}
