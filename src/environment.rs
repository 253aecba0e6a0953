use crate::Error;
use crate::ast::{Symbol, Value};
use crate::procedure::{Builtin, BuiltinFn};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

struct Frame {
    bindings: RefCell<HashMap<Symbol, Value>>,
    outer: Option<Environment>,
}

/// Lexical scope for variable bindings.
///
/// An `Environment` is a cheap, shared handle: cloning it yields another reference to the
/// same bindings table. Closures keep their defining scope alive through such a handle.
#[derive(Clone)]
pub struct Environment(Rc<Frame>);

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// A new root scope with no outer environment.
    pub fn new() -> Self {
        Environment(Rc::new(Frame {
            bindings: RefCell::new(HashMap::new()),
            outer: None,
        }))
    }

    /// A new empty scope nested inside `outer`.
    pub fn with_outer(outer: &Environment) -> Self {
        Environment(Rc::new(Frame {
            bindings: RefCell::new(HashMap::new()),
            outer: Some(outer.clone()),
        }))
    }

    pub fn outer(&self) -> Option<&Environment> {
        self.0.outer.as_ref()
    }

    /// True for a root scope.
    pub fn is_global(&self) -> bool {
        self.0.outer.is_none()
    }

    /// True if both handles refer to the same scope.
    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// The innermost scope, starting from this one, that binds `name`.
    pub fn find(&self, name: &str) -> Option<Environment> {
        let mut env = self;
        loop {
            if env.0.bindings.borrow().contains_key(name) {
                return Some(env.clone());
            }
            env = env.0.outer.as_ref()?;
        }
    }

    /// Look up `name` in this scope and its outer scopes.
    pub fn get(&self, name: &str) -> Option<Value> {
        let mut env = self;
        loop {
            if let Some(value) = env.0.bindings.borrow().get(name) {
                return Some(value.clone());
            }
            env = env.0.outer.as_ref()?;
        }
    }

    /// True if `name` is bound directly in this scope (outer scopes are not consulted).
    pub fn contains_local(&self, name: &str) -> bool {
        self.0.bindings.borrow().contains_key(name)
    }

    /// Bind `name` in this scope. Fails if this scope already binds it.
    pub fn define(&self, name: Symbol, value: Value) -> Result<(), Error> {
        let mut bindings = self.0.bindings.borrow_mut();
        if bindings.contains_key(&name) {
            return Err(Error::Redefinition(name.to_string()));
        }
        bindings.insert(name, value);
        Ok(())
    }

    /// Rebind `name` in the innermost scope that already binds it.
    pub fn set(&self, name: &Symbol, value: Value) -> Result<(), Error> {
        let env = self
            .find(name.as_str())
            .ok_or_else(|| Error::UnboundAssignment(name.to_string()))?;
        env.0.bindings.borrow_mut().insert(name.clone(), value);
        Ok(())
    }

    /// Insert without the redefinition check. Used for parameter binding in fresh frames.
    pub(crate) fn bind(&self, name: Symbol, value: Value) {
        self.0.bindings.borrow_mut().insert(name, value);
    }

    /// Register a native function in this scope, replacing any previous binding of `name`.
    ///
    /// # Example
    /// ```
    /// use gigl::{Evaluator, Value};
    /// use gigl::Error;
    ///
    /// fn answer(_args: &[Value]) -> Result<Value, Error> {
    ///     Ok(Value::Number(42.0))
    /// }
    ///
    /// let evaluator = Evaluator::new();
    /// evaluator.global().register_builtin_function("answer", answer);
    /// // Now (answer) can be called from evaluated expressions
    /// ```
    pub fn register_builtin_function(&self, name: &'static str, func: fn(&[Value]) -> Result<Value, Error>) {
        self.register_builtin_closure(name, Rc::new(func));
    }

    /// Register a native closure in this scope. The closure may capture host state.
    pub fn register_builtin_closure(&self, name: &'static str, func: Rc<BuiltinFn>) {
        self.bind(Symbol::new(name), Value::Builtin(Builtin { name, func }));
    }

    /// Get all bindings in this environment and its outer scopes, inner scopes shadowing
    /// outer ones. Returns (name, value) pairs sorted by name.
    pub fn get_all_bindings(&self) -> Vec<(Symbol, Value)> {
        let mut bindings = HashMap::new();

        if let Some(outer) = &self.0.outer {
            bindings.extend(outer.get_all_bindings());
        }
        for (name, value) in self.0.bindings.borrow().iter() {
            bindings.insert(name.clone(), value.clone());
        }

        let mut result: Vec<_> = bindings.into_iter().collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .0
            .bindings
            .borrow()
            .keys()
            .map(ToString::to_string)
            .collect();
        f.debug_struct("Environment")
            .field("bindings", &names)
            .field("outer", &self.0.outer)
            .finish()
    }
}
