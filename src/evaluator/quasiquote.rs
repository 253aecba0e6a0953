//! Quasiquote template expansion.
//!
//! Nesting levels are not tracked: an `unquote` inside a nested quasiquote is evaluated
//! as if it belonged to the outermost one.

use super::Evaluator;
use crate::Error;
use crate::ast::Value;
use crate::environment::Environment;
use crate::list::List;

/// Recognize `(unquote e)` or `(unquote-splicing e)`, returning the form name and its
/// operands.
fn unquote_form(value: &Value) -> Option<(&'static str, Vec<Value>)> {
    let (head, rest) = value.as_list()?.uncons()?;
    let form = match head {
        Value::Symbol(s) if s.as_str() == "unquote" => "unquote",
        Value::Symbol(s) if s.as_str() == "unquote-splicing" => "unquote-splicing",
        _ => return None,
    };
    Some((form, rest.to_vec()))
}

fn single_operand(form: &'static str, operands: &[Value]) -> Result<Value, Error> {
    match operands {
        [operand] => Ok(operand.clone()),
        _ => Err(Error::malformed(
            form,
            format!("expected 1 operand, got {}", operands.len()),
        )),
    }
}

impl Evaluator {
    pub(super) fn quasiquote(&self, template: &Value, env: &Environment) -> Result<Value, Error> {
        match unquote_form(template) {
            Some(("unquote", operands)) => {
                self.eval(&single_operand("unquote", &operands)?, Some(env))
            }
            Some((form, _)) => Err(Error::malformed(
                form,
                "cannot splice outside of a list",
            )),
            None => match template {
                Value::List(list) => self.quasiquote_list(list, env).map(Value::List),
                other => Ok(other.clone()),
            },
        }
    }

    fn quasiquote_list(&self, list: &List, env: &Environment) -> Result<List, Error> {
        let mut items = Vec::with_capacity(list.len());
        for element in list {
            match unquote_form(element) {
                Some(("unquote-splicing", operands)) => {
                    let spliced = self.eval(&single_operand("unquote-splicing", &operands)?, Some(env))?;
                    let Value::List(spliced) = spliced else {
                        return Err(Error::type_mismatch("list", &spliced));
                    };
                    items.extend(spliced.iter().cloned());
                }
                Some(_) | None => items.push(self.quasiquote(element, env)?),
            }
        }
        Ok(List::from(items))
    }
}
