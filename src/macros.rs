//! Macro definitions.
//!
//! Two kinds of macro are supported, both installed with `defmacro`:
//!
//! ```lisp
//! ;; Transformer: the body computes the expansion from the bound pattern variables
//! (defmacro swap! (a b)
//!   `(let ((tmp ,a)) (begin (set! ,a ,b) (set! ,b tmp))))
//!
//! ;; Substitution: the first matching clause's template is instantiated
//! (defmacro my-or
//!   (syntax-rules ()
//!     ((_) #f)
//!     ((_ e) e)
//!     ((_ e r ...) (if e e (my-or r ...)))))
//! ```
//!
//! Expansion is purely textual: pattern variables in the template are replaced by the
//! argument forms they matched and nothing is renamed.

use crate::Error;
use crate::ast::{Symbol, Value, sym};
use crate::list::List;
use crate::environment::Environment;
use crate::pattern::{Bindings, Pattern};
use crate::procedure::{Params, Procedure, body_from_forms};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::trace;

/// How a matched clause produces its expansion.
#[derive(Debug, Clone)]
pub enum Expansion {
    /// A closure over the pattern's variables; its result is the expansion
    Transformer(Rc<Procedure>),
    /// A form instantiated by substituting bound variables
    Template(Value),
}

#[derive(Debug, Clone)]
pub struct Clause {
    pub pattern: Pattern,
    pub expansion: Expansion,
}

/// A named macro with one or more clauses, tried in order.
#[derive(Debug, Clone)]
pub struct Macro {
    pub name: Symbol,
    pub clauses: Vec<Clause>,
}

impl Macro {
    /// Build a macro from the operands of `defmacro` that follow the name.
    ///
    /// `(syntax-rules ...)` as the only operand selects substitution clauses; otherwise the
    /// first operand is the argument pattern and the rest is the transformer body, closed
    /// over `env`.
    pub fn from_definition(name: Symbol, operands: &[Value], env: &Environment) -> Result<Macro, Error> {
        match operands {
            [Value::List(rules)] if rules.head().is_some_and(|h| h.is_symbol("syntax-rules")) => {
                Self::from_syntax_rules(name, &rules.tail())
            }
            [params, body @ ..] => {
                let pattern = match params {
                    // A lone symbol binds the whole argument list
                    Value::Symbol(_) => Pattern::parse(&crate::list![params.clone(), sym("...")])?,
                    other => Pattern::from_value(other, &[])?,
                };
                let names: Vec<Symbol> = pattern.variables().cloned().collect();
                let body = body_from_forms("defmacro", body)?;
                let transformer = Procedure::new(Params::Fixed(names), body, env);
                Ok(Macro {
                    name,
                    clauses: vec![Clause {
                        pattern,
                        expansion: Expansion::Transformer(Rc::new(transformer)),
                    }],
                })
            }
            [] => Err(Error::malformed("defmacro", "missing parameters and body")),
        }
    }

    /// Parse `((literal ...) (pattern template) ...)`, the operands of `syntax-rules`.
    fn from_syntax_rules(name: Symbol, rules: &List) -> Result<Macro, Error> {
        let Some((literals, clauses)) = rules.uncons() else {
            return Err(Error::malformed("syntax-rules", "missing literals list"));
        };
        let Value::List(literals) = literals else {
            return Err(Error::malformed(
                "syntax-rules",
                format!("literals must be a list, got {literals}"),
            ));
        };
        let literals = literals
            .iter()
            .map(|lit| match lit {
                Value::Symbol(s) => Ok(s.clone()),
                other => Err(Error::malformed(
                    "syntax-rules",
                    format!("literals must be symbols, got {other}"),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let clauses = clauses
            .iter()
            .map(|clause| {
                let (pattern, template) = match clause.as_list().map(List::to_vec).as_deref() {
                    Some([pattern, template]) => (pattern.clone(), template.clone()),
                    _ => {
                        return Err(Error::malformed(
                            "syntax-rules",
                            format!("clause must be (pattern template), got {clause}"),
                        ));
                    }
                };
                // The keyword position of the pattern is ignored
                let Value::List(pattern) = &pattern else {
                    return Err(Error::InvalidMacroPattern(format!(
                        "pattern must be a list, got {pattern}"
                    )));
                };
                Ok(Clause {
                    pattern: Pattern::with_literals(&pattern.tail(), &literals)?,
                    expansion: Expansion::Template(template),
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(Macro { name, clauses })
    }

    /// Find the first clause matching the unevaluated argument forms `args`.
    pub fn select(&self, args: &List) -> Result<(&Clause, Bindings), Error> {
        let candidate = Value::List(args.clone());
        for clause in &self.clauses {
            let mut bindings = Bindings::new();
            if clause.pattern.matches(&candidate, &mut bindings) {
                trace!(name = %self.name, pattern = %clause.pattern, "macro clause matched");
                return Ok((clause, bindings));
            }
        }
        Err(Error::MacroMatchFailure {
            name: self.name.to_string(),
            form: List::cons(Value::Symbol(self.name.clone()), args).to_string(),
        })
    }
}

/// Instantiate a `syntax-rules` template with the bindings of a successful match.
pub fn instantiate(template: &Value, pattern: &Pattern, bindings: &Bindings) -> Result<Value, Error> {
    let depths: HashMap<&Symbol, usize> = pattern
        .variable_depths()
        .iter()
        .map(|(name, depth)| (name, *depth))
        .collect();
    let substitution: Substitution = bindings
        .iter()
        .map(|(name, value)| {
            let depth = depths.get(name).copied().unwrap_or(0);
            (name.clone(), (value.clone(), depth))
        })
        .collect();
    substitute(template, &substitution)
}

/// Bound value and remaining ellipsis depth of each pattern variable.
type Substitution = HashMap<Symbol, (Value, usize)>;

fn substitute(template: &Value, substitution: &Substitution) -> Result<Value, Error> {
    match template {
        Value::Symbol(name) => match substitution.get(name) {
            Some((value, 0)) => Ok(value.clone()),
            Some(_) => Err(Error::malformed(
                "syntax-rules",
                format!("{name} is repeated in the pattern and must be followed by ... in the template"),
            )),
            None => Ok(template.clone()),
        },
        Value::List(list) => {
            let elements = list.to_vec();
            let mut result = Vec::with_capacity(elements.len());
            let mut i = 0;
            while i < elements.len() {
                let element = &elements[i];
                if element.is_symbol("...") {
                    return Err(Error::malformed(
                        "syntax-rules",
                        format!("... must follow a template element in {template}"),
                    ));
                }
                if elements.get(i + 1).is_some_and(|next| next.is_symbol("...")) {
                    result.extend(substitute_repetition(element, substitution)?);
                    i += 2;
                } else {
                    result.push(substitute(element, substitution)?);
                    i += 1;
                }
            }
            Ok(Value::List(List::from(result)))
        }
        _ => Ok(template.clone()),
    }
}

/// Instantiate `element` once per repetition of the repeated variables it mentions.
fn substitute_repetition(element: &Value, substitution: &Substitution) -> Result<Vec<Value>, Error> {
    let mut mentioned = Vec::new();
    collect_symbols(element, &mut mentioned);

    let mut repeated: Vec<(&Symbol, &List)> = Vec::new();
    for name in mentioned {
        if let Some((value, depth)) = substitution.get(name) {
            if *depth == 0 {
                continue;
            }
            let Value::List(values) = value else {
                return Err(Error::type_mismatch("list", value));
            };
            repeated.push((name, values));
        }
    }

    let Some(count) = repeated.first().map(|(_, values)| values.len()) else {
        return Err(Error::malformed(
            "syntax-rules",
            format!("no repeated pattern variable in {element} ..."),
        ));
    };
    if let Some((name, _)) = repeated.iter().find(|(_, values)| values.len() != count) {
        return Err(Error::malformed(
            "syntax-rules",
            format!("{name} repeats a different number of times than its neighbours"),
        ));
    }

    let mut iterators: Vec<_> = repeated
        .iter()
        .map(|(name, values)| (*name, values.iter()))
        .collect();
    let mut result = Vec::with_capacity(count);
    for _ in 0..count {
        let mut inner = substitution.clone();
        for (name, values) in &mut iterators {
            if let (Some(value), Some((_, depth))) = (values.next(), substitution.get(*name)) {
                inner.insert((*name).clone(), (value.clone(), depth - 1));
            }
        }
        result.push(substitute(element, &inner)?);
    }
    Ok(result)
}

fn collect_symbols<'a>(template: &'a Value, out: &mut Vec<&'a Symbol>) {
    match template {
        Value::Symbol(name) => {
            if !out.contains(&name) {
                out.push(name);
            }
        }
        Value::List(list) => {
            for element in list {
                collect_symbols(element, out);
            }
        }
        _ => {}
    }
}
