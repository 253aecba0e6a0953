//! Special forms. Operands arrive unevaluated and already arity-checked.

use super::{Evaluator, Step};
use crate::Error;
use crate::ast::{Symbol, Value};
use crate::builtinops::SpecialForm;
use crate::environment::Environment;
use crate::list::List;
use crate::macros::Macro;
use crate::procedure::{Params, Procedure, body_from_forms};
use std::rc::Rc;
use tracing::debug;

impl Evaluator {
    pub(super) fn special_form(
        &self,
        form: SpecialForm,
        id: &'static str,
        operands: &[Value],
        env: &Environment,
    ) -> Result<Step, Error> {
        match (form, operands) {
            (SpecialForm::Quote, [datum]) => Ok(Step::Return(datum.clone())),
            (SpecialForm::Quasiquote, [template]) => {
                self.quasiquote(template, env).map(Step::Return)
            }
            (SpecialForm::Unquote | SpecialForm::UnquoteSplicing, _) => {
                Err(Error::UnquoteOutsideQuasiquote)
            }
            (SpecialForm::If, [test, consequent, rest @ ..]) => {
                if self.eval(test, Some(env))?.is_truthy() {
                    Ok(Step::TailCall(consequent.clone(), env.clone()))
                } else {
                    match rest.first() {
                        Some(alternative) => Ok(Step::TailCall(alternative.clone(), env.clone())),
                        None => Ok(Step::Return(Value::Nil)),
                    }
                }
            }
            (SpecialForm::Cond, clauses) => self.eval_cond(clauses, env),
            (SpecialForm::Set, [target, value]) => {
                let name = expect_symbol(id, target)?;
                let value = self.eval(value, Some(env))?;
                env.set(name, value)?;
                Ok(Step::Return(Value::Nil))
            }
            (SpecialForm::Define, [target, value]) => {
                let name = expect_symbol(id, target)?;
                self.define(env, name, || self.eval(value, Some(env)))
            }
            (SpecialForm::Lambda, [params, body @ ..]) => {
                let proc = Procedure::from_parts(id, params, body, env)?;
                Ok(Step::Return(Value::Procedure(Rc::new(proc))))
            }
            (SpecialForm::Defn, [target, params, body @ ..]) => {
                let name = expect_symbol(id, target)?;
                self.define(env, name, || {
                    let proc = Procedure::from_parts(id, params, body, env)?;
                    Ok(Value::Procedure(Rc::new(proc)))
                })
            }
            (SpecialForm::Defmacro, [target, rest @ ..]) => {
                if !env.ptr_eq(&self.global) {
                    return Err(Error::malformed(id, "macros can only be defined at the top level"));
                }
                let name = expect_symbol(id, target)?;
                if self.is_macro(name.as_str()) {
                    return Err(Error::Redefinition(name.to_string()));
                }
                let mac = Macro::from_definition(name.clone(), rest, &self.global)?;
                self.install_macro(mac)?;
                Ok(Step::Return(Value::Nil))
            }
            (SpecialForm::Let, [bindings, body @ ..]) => self.eval_let(bindings, body, env),
            (SpecialForm::Begin, []) => Ok(Step::Return(Value::Nil)),
            (SpecialForm::Begin, [init @ .., last]) => {
                for expr in init {
                    self.eval(expr, Some(env))?;
                }
                Ok(Step::TailCall(last.clone(), env.clone()))
            }
            (SpecialForm::Apply, [callee, args]) => {
                let callee = self.eval(callee, Some(env))?;
                let args = self.eval(args, Some(env))?;
                let Value::List(args) = args else {
                    return Err(Error::type_mismatch("list", &args));
                };
                self.apply_step(&callee, args.to_vec())
            }
            // Unreachable once the registry arity has been checked
            (_, operands) => Err(Error::malformed(
                id,
                format!("unexpected operand count {}", operands.len()),
            )),
        }
    }

    /// Bind `name` in `env` to the value produced by `value`, refusing to shadow an existing
    /// binding in the same scope. The check runs first so a failed define never evaluates.
    fn define(
        &self,
        env: &Environment,
        name: &Symbol,
        value: impl FnOnce() -> Result<Value, Error>,
    ) -> Result<Step, Error> {
        if env.contains_local(name.as_str()) {
            return Err(Error::Redefinition(name.to_string()));
        }
        let value = value()?;
        debug!(%name, global = env.ptr_eq(&self.global), "define");
        env.define(name.clone(), value)?;
        Ok(Step::Return(Value::Nil))
    }

    fn eval_cond(&self, clauses: &[Value], env: &Environment) -> Result<Step, Error> {
        for clause in clauses {
            let Some((test, body)) = clause.as_list().and_then(List::uncons) else {
                return Err(Error::malformed(
                    "cond",
                    format!("clause must be a non-empty list, got {clause}"),
                ));
            };
            let test_value = match test {
                Value::Symbol(s) if s.as_str() == "else" => Value::Boolean(true),
                Value::Keyword(k) if k.as_str() == "else" => Value::Boolean(true),
                other => self.eval(other, Some(env))?,
            };
            if !test_value.is_truthy() {
                continue;
            }
            if body.is_empty() {
                return Ok(Step::Return(test_value));
            }
            return Ok(Step::TailCall(body_from_forms("cond", &body.to_vec())?, env.clone()));
        }
        Ok(Step::Return(Value::Nil))
    }

    /// `(let ((name value) ...) body ...)`: values are evaluated in the enclosing scope and
    /// bound together in a fresh one.
    fn eval_let(&self, bindings: &Value, body: &[Value], env: &Environment) -> Result<Step, Error> {
        let Value::List(bindings) = bindings else {
            return Err(Error::malformed(
                "let",
                format!("bindings must be a list, got {bindings}"),
            ));
        };

        let mut names = Vec::with_capacity(bindings.len());
        let mut forms = Vec::with_capacity(bindings.len());
        for binding in bindings {
            match binding.as_list().map(List::to_vec).as_deref() {
                Some([name, value]) => {
                    names.push(name.clone());
                    forms.push(value.clone());
                }
                _ => {
                    return Err(Error::malformed(
                        "let",
                        format!("binding must be (name value), got {binding}"),
                    ));
                }
            }
        }

        let params = Params::parse("let", &Value::List(names.into_iter().collect()))?;
        let body = body_from_forms("let", body)?;
        let values = forms
            .iter()
            .map(|form| self.eval(form, Some(env)))
            .collect::<Result<Vec<_>, _>>()?;
        let frame = Procedure::new(params, body.clone(), env).bind_arguments(values)?;
        Ok(Step::TailCall(body, frame))
    }
}

fn expect_symbol<'a>(form: &'static str, value: &'a Value) -> Result<&'a Symbol, Error> {
    value
        .as_symbol()
        .ok_or_else(|| Error::malformed(form, format!("expected a symbol, got {value}")))
}
