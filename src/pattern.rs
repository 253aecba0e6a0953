//! Ellipsis pattern matching for macros.
//!
//! A [`Pattern`] is parsed once from a macro's declared pattern list and can then be matched
//! against any number of candidate forms. The element immediately before a `...` token is
//! *repeating*: it consumes every remaining candidate element and binds each variable it
//! contains to the list of values matched across the repetitions.
//!
//! ```lisp
//! ;; pattern            candidate            bindings
//! (a (b ...) c)         (1 (2 3 4) 5)        a = 1, b = (2 3 4), c = 5
//! ((k v) ...)           ((x 1) (y 2))        k = (x y), v = (1 2)
//! (x _ x)               (7 8 7)              x = 7
//! ```
//!
//! Matching is linear and never backtracks.

use crate::Error;
use crate::ast::{Symbol, Value};
use crate::list::List;
use std::collections::HashMap;
use tracing::trace;

/// Variable bindings produced by a successful match.
pub type Bindings = HashMap<Symbol, Value>;

const ELLIPSIS: &str = "...";
const WILDCARD: &str = "_";

/// One position in a pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternElement {
    /// Binds the candidate element
    Variable(Symbol),
    /// `_`, matches anything and binds nothing
    Wildcard,
    /// Must equal the candidate element
    Literal(Value),
    /// Candidate element must be a list matching the sub-pattern
    Nested(Pattern),
}

impl PatternElement {
    fn collect_variables(&self, depth: usize, out: &mut Vec<(Symbol, usize)>) {
        match self {
            PatternElement::Variable(name) => {
                if !out.iter().any(|(existing, _)| existing == name) {
                    out.push((name.clone(), depth));
                }
            }
            PatternElement::Nested(pattern) => {
                for slot in &pattern.slots {
                    let depth = if slot.repeating { depth + 1 } else { depth };
                    slot.element.collect_variables(depth, out);
                }
            }
            PatternElement::Wildcard | PatternElement::Literal(_) => {}
        }
    }

    fn matches(&self, candidate: &Value, bindings: &mut Bindings) -> bool {
        match self {
            PatternElement::Wildcard => true,
            PatternElement::Literal(expected) => expected == candidate,
            PatternElement::Variable(name) => match bindings.get(name) {
                // A variable that appears twice must see the same value both times
                Some(previous) => previous == candidate,
                None => {
                    bindings.insert(name.clone(), candidate.clone());
                    true
                }
            },
            PatternElement::Nested(pattern) => match candidate {
                Value::List(list) => pattern.match_list(list, bindings),
                _ => false,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    element: PatternElement,
    repeating: bool,
}

/// A parsed macro pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    slots: Vec<Slot>,
    /// Every variable in the tree with its ellipsis depth, in order of first appearance
    variables: Vec<(Symbol, usize)>,
}

impl Pattern {
    /// Parse a pattern in which every symbol other than `_` and `...` is a variable.
    pub fn parse(list: &List) -> Result<Pattern, Error> {
        Self::with_literals(list, &[])
    }

    /// Parse a pattern; symbols in `literals` match only themselves.
    pub fn with_literals(list: &List, literals: &[Symbol]) -> Result<Pattern, Error> {
        let mut slots: Vec<Slot> = Vec::with_capacity(list.len());
        let mut seen_ellipsis = false;

        for element in list {
            if element.is_symbol(ELLIPSIS) {
                if seen_ellipsis {
                    return Err(Error::InvalidMacroPattern(format!(
                        "more than one ... in {list}"
                    )));
                }
                let Some(previous) = slots.last_mut() else {
                    return Err(Error::InvalidMacroPattern(format!(
                        "... must follow an element in {list}"
                    )));
                };
                previous.repeating = true;
                seen_ellipsis = true;
                continue;
            }
            if seen_ellipsis {
                return Err(Error::InvalidMacroPattern(format!(
                    "{element} follows a repeating element in {list}"
                )));
            }

            let element = match element {
                Value::Symbol(s) if s.as_str() == WILDCARD => PatternElement::Wildcard,
                Value::Symbol(s) if literals.contains(s) => PatternElement::Literal(element.clone()),
                Value::Symbol(s) => PatternElement::Variable(s.clone()),
                Value::List(sub) => PatternElement::Nested(Self::with_literals(sub, literals)?),
                atom => PatternElement::Literal(atom.clone()),
            };
            slots.push(Slot {
                element,
                repeating: false,
            });
        }

        let mut variables = Vec::new();
        for slot in &slots {
            slot.element
                .collect_variables(usize::from(slot.repeating), &mut variables);
        }

        Ok(Pattern { slots, variables })
    }

    /// Parse a pattern from an arbitrary value, rejecting non-lists.
    pub fn from_value(value: &Value, literals: &[Symbol]) -> Result<Pattern, Error> {
        match value {
            Value::List(list) => Self::with_literals(list, literals),
            other => Err(Error::InvalidMacroPattern(format!(
                "pattern must be a list, got {other}"
            ))),
        }
    }

    /// Declared variable names in order of first appearance.
    pub fn variables(&self) -> impl Iterator<Item = &Symbol> {
        self.variables.iter().map(|(name, _)| name)
    }

    /// Ellipsis depth of each declared variable: 0 for plain variables, 1 under one `...`.
    pub fn variable_depths(&self) -> &[(Symbol, usize)] {
        &self.variables
    }

    /// Match `candidate` against this pattern.
    ///
    /// On success the new bindings are added to `bindings` and `true` is returned. On failure
    /// `bindings` is left untouched.
    pub fn matches(&self, candidate: &Value, bindings: &mut Bindings) -> bool {
        let Value::List(list) = candidate else {
            return false;
        };

        let mut scratch = bindings.clone();
        if !self.match_list(list, &mut scratch) {
            trace!(pattern = %self, candidate = %candidate, "pattern did not match");
            return false;
        }
        if !self.variables().all(|name| scratch.contains_key(name)) {
            return false;
        }

        *bindings = scratch;
        true
    }

    fn match_list(&self, list: &List, bindings: &mut Bindings) -> bool {
        let repeating = self.slots.last().is_some_and(|slot| slot.repeating);
        let required = if repeating {
            self.slots.len() - 1
        } else {
            self.slots.len()
        };

        if list.len() < required || (!repeating && list.len() > required) {
            return false;
        }

        let mut items = list.iter();
        for slot in &self.slots {
            if slot.repeating {
                return Self::match_repetition(&slot.element, items.by_ref(), bindings);
            }
            let Some(item) = items.next() else {
                return false;
            };
            if !slot.element.matches(item, bindings) {
                return false;
            }
        }
        true
    }

    /// Match every remaining item against `element`, each in a fresh sub-match, and bind each
    /// contained variable to the list of its matches.
    fn match_repetition<'a>(
        element: &PatternElement,
        items: impl Iterator<Item = &'a Value>,
        bindings: &mut Bindings,
    ) -> bool {
        let mut names = Vec::new();
        element.collect_variables(0, &mut names);
        let mut collected: Vec<Vec<Value>> = vec![Vec::new(); names.len()];

        for item in items {
            let mut fresh = Bindings::new();
            if !element.matches(item, &mut fresh) {
                return false;
            }
            for ((name, _), values) in names.iter().zip(collected.iter_mut()) {
                match fresh.remove(name) {
                    Some(value) => values.push(value),
                    None => return false,
                }
            }
        }

        for ((name, _), values) in names.into_iter().zip(collected) {
            let value = Value::List(List::from(values));
            match bindings.get(&name) {
                Some(previous) if *previous != value => return false,
                Some(_) => {}
                None => {
                    bindings.insert(name, value);
                }
            }
        }
        true
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, slot) in self.slots.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            match &slot.element {
                PatternElement::Variable(name) => write!(f, "{name}")?,
                PatternElement::Wildcard => write!(f, "{WILDCARD}")?,
                PatternElement::Literal(value) => write!(f, "{value}")?,
                PatternElement::Nested(pattern) => write!(f, "{pattern}")?,
            }
            if slot.repeating {
                write!(f, " {ELLIPSIS}")?;
            }
        }
        write!(f, ")")
    }
}
