//! The eval/apply loop.
//!
//! Evaluation is a trampoline: [`Evaluator::eval`] repeatedly takes one [`Step`] on the
//! current `(expression, environment)` pair. A step either finishes with a value or names
//! the next pair to evaluate in tail position, in which case the loop rebinds and continues
//! without growing the host stack. Tail positions are the chosen branch of `if`, the chosen
//! clause of `cond`, the last form of `begin`, the body of `let`, procedure application
//! (including `apply`) and the expansion of a macro.
//!
//! Non-tail recursion (argument evaluation, the test of an `if`, the body of a macro
//! transformer) uses the host stack and is bounded by it.

use crate::Error;
use crate::ast::{Symbol, Value};
use crate::builtinops::{create_global_env, find_special_form};
use crate::environment::Environment;
use crate::list::List;
use crate::macros::{Expansion, Macro, instantiate};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, trace};

mod quasiquote;
mod special_forms;

/// Evaluator construction options.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Evaluate the standard prelude into the global environment at construction.
    /// Has no effect without the `prelude` feature.
    pub load_prelude: bool,
}

/// Result of a single evaluation step.
pub(crate) enum Step {
    /// Evaluation finished
    Return(Value),
    /// Continue with this expression in this environment
    TailCall(Value, Environment),
}

/// An interpreter instance: a global environment and a macro table.
///
/// Instances are independent of each other. Values hold `Rc`s, so an evaluator never crosses
/// threads.
///
/// A failed [`eval`](Evaluator::eval) does not roll back: bindings made by `define`, `set!`
/// or `defmacro` before the failing step are kept.
pub struct Evaluator {
    global: Environment,
    macros: RefCell<HashMap<Symbol, Rc<Macro>>>,
    config: Config,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    /// A new evaluator with builtins bound and an empty macro table.
    pub fn new() -> Self {
        Evaluator {
            global: create_global_env(),
            macros: RefCell::new(HashMap::new()),
            config: Config::default(),
        }
    }

    /// A new evaluator configured by `config`.
    pub fn with_config(config: Config) -> Result<Self, Error> {
        let evaluator = Evaluator {
            config,
            ..Self::new()
        };
        if evaluator.config.load_prelude {
            #[cfg(feature = "prelude")]
            crate::prelude::load(&evaluator)?;
            #[cfg(not(feature = "prelude"))]
            tracing::warn!("load_prelude requested but the prelude feature is disabled");
        }
        Ok(evaluator)
    }

    /// The global environment.
    pub fn global(&self) -> &Environment {
        &self.global
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// True if `name` is installed in the macro table.
    pub fn is_macro(&self, name: &str) -> bool {
        self.macros.borrow().contains_key(name)
    }

    /// Names of all installed macros, sorted.
    pub fn macro_names(&self) -> Vec<Symbol> {
        let mut names: Vec<Symbol> = self.macros.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// Evaluate `expr` in `env`, or in the global environment when `env` is `None`.
    pub fn eval(&self, expr: &Value, env: Option<&Environment>) -> Result<Value, Error> {
        let mut expr = expr.clone();
        let mut env = env.unwrap_or(&self.global).clone();
        loop {
            match self.step(&expr, &env)? {
                Step::Return(value) => return Ok(value),
                Step::TailCall(next, next_env) => {
                    expr = next;
                    env = next_env;
                }
            }
        }
    }

    /// Read every datum in `text` and evaluate them in order in the global environment,
    /// returning the last result (`nil` for empty input).
    #[cfg(feature = "reader")]
    pub fn eval_str(&self, text: &str) -> Result<Value, Error> {
        let mut result = Value::Nil;
        for expr in crate::reader::read_all(text)? {
            result = self.eval(&expr, None)?;
        }
        Ok(result)
    }

    /// Apply `callee` to already evaluated `args`.
    pub fn apply(&self, callee: &Value, args: Vec<Value>) -> Result<Value, Error> {
        match self.apply_step(callee, args)? {
            Step::Return(value) => Ok(value),
            Step::TailCall(body, env) => self.eval(&body, Some(&env)),
        }
    }

    /// Expand `form` once if it is a macro call, otherwise return it unchanged.
    pub fn macroexpand(&self, form: &Value) -> Result<Value, Error> {
        let Value::List(list) = form else {
            return Ok(form.clone());
        };
        match list.uncons() {
            Some((Value::Symbol(name), operands)) => match self.lookup_macro(name) {
                Some(mac) => self.expand(&mac, &operands),
                None => Ok(form.clone()),
            },
            _ => Ok(form.clone()),
        }
    }

    fn step(&self, expr: &Value, env: &Environment) -> Result<Step, Error> {
        match expr {
            // Self-evaluating forms
            Value::Number(_) | Value::Text(_) | Value::Boolean(_) | Value::Keyword(_) => {
                Ok(Step::Return(expr.clone()))
            }

            // Variable lookup
            Value::Symbol(name) => env
                .get(name.as_str())
                .map(Step::Return)
                .ok_or_else(|| Error::UnknownSymbol(name.to_string())),

            Value::List(list) => self.step_list(list, env),

            // Runtime-only values have no source form
            Value::Nil | Value::Procedure(_) | Value::Builtin(_) => {
                Err(Error::UnknownExpression(expr.to_string()))
            }
        }
    }

    fn step_list(&self, list: &List, env: &Environment) -> Result<Step, Error> {
        let Some((head, operands)) = list.uncons() else {
            return Err(Error::UnknownExpression("()".to_owned()));
        };

        if let Value::Symbol(name) = head {
            // Macros take precedence over everything else
            if let Some(mac) = self.lookup_macro(name) {
                let expansion = self.expand(&mac, &operands)?;
                return Ok(Step::TailCall(expansion, self.global.clone()));
            }
            if let Some((op, form)) = find_special_form(name.as_str()) {
                if !op.arity.accepts(operands.len()) {
                    return Err(Error::malformed(
                        op.id,
                        format!("expected {} operands, got {}", op.arity, operands.len()),
                    ));
                }
                return self.special_form(form, op.id, &operands.to_vec(), env);
            }
        }

        let callee = self.eval(head, Some(env))?;
        let args = operands
            .iter()
            .map(|arg| self.eval(arg, Some(env)))
            .collect::<Result<Vec<_>, _>>()?;
        self.apply_step(&callee, args)
    }

    fn apply_step(&self, callee: &Value, args: Vec<Value>) -> Result<Step, Error> {
        match callee {
            Value::Procedure(proc) => {
                let frame = proc.bind_arguments(args)?;
                trace!(body = %proc.body, "tail call");
                Ok(Step::TailCall(proc.body.clone(), frame))
            }
            Value::Builtin(builtin) => builtin.call(&args).map(Step::Return),
            other => Err(Error::type_mismatch("procedure", other)),
        }
    }

    fn lookup_macro(&self, name: &Symbol) -> Option<Rc<Macro>> {
        self.macros.borrow().get(name).cloned()
    }

    fn install_macro(&self, mac: Macro) -> Result<(), Error> {
        let mut macros = self.macros.borrow_mut();
        if macros.contains_key(&mac.name) {
            return Err(Error::Redefinition(mac.name.to_string()));
        }
        debug!(name = %mac.name, clauses = mac.clauses.len(), "macro installed");
        macros.insert(mac.name.clone(), Rc::new(mac));
        Ok(())
    }

    fn expand(&self, mac: &Macro, operands: &List) -> Result<Value, Error> {
        let (clause, bindings) = mac.select(operands)?;
        let expansion = match &clause.expansion {
            Expansion::Template(template) => instantiate(template, &clause.pattern, &bindings)?,
            Expansion::Transformer(transformer) => {
                let args = clause
                    .pattern
                    .variables()
                    .map(|name| bindings.get(name).cloned().unwrap_or(Value::Nil))
                    .collect();
                let frame = transformer.bind_arguments(args)?;
                self.eval(&transformer.body, Some(&frame))?
            }
        };
        trace!(name = %mac.name, %expansion, "macro expanded");
        Ok(expansion)
    }
}

#[cfg(all(test, feature = "reader"))]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::Error;
    use crate::ast::{empty, kw, sym, val};
    use crate::reader::read;
    use pretty_assertions::assert_eq;

    /// Test result variants for comprehensive testing
    #[derive(Debug)]
    enum TestResult {
        EvalResult(Value),           // Evaluation should succeed with this value
        SpecificError(&'static str), // Evaluation should fail with error containing this string
        Error,                       // Evaluation should fail (any error)
    }
    use TestResult::*;

    /// Test environment containing test cases that share state
    struct TestEnvironment(Vec<(&'static str, TestResult)>);

    /// Micro-helper for success cases in comprehensive tests
    fn success<T: Into<Value>>(value: T) -> TestResult {
        EvalResult(val(value))
    }

    /// Macro for setup expressions that return nil (like define)
    macro_rules! test_setup {
        ($expr:expr) => {
            ($expr, EvalResult(Value::Nil))
        };
    }

    /// Run tests in isolated evaluators with shared state
    fn run_tests_in_environment(test_environments: Vec<TestEnvironment>) {
        for (env_idx, TestEnvironment(test_cases)) in test_environments.iter().enumerate() {
            let evaluator = Evaluator::new();
            for (test_idx, (input, expected)) in test_cases.iter().enumerate() {
                let test_id = format!("Environment #{} test #{}", env_idx + 1, test_idx + 1);
                execute_test_case(input, expected, &evaluator, &test_id);
            }
        }
    }

    /// Execute a single test case with detailed error reporting
    fn execute_test_case(input: &str, expected: &TestResult, evaluator: &Evaluator, test_id: &str) {
        let expr = match read(input) {
            Ok(expr) => expr,
            Err(parse_err) => {
                panic!("{test_id}: unexpected parse error for '{input}': {parse_err:?}");
            }
        };

        match (evaluator.eval(&expr, None), expected) {
            (Ok(actual), EvalResult(expected_val)) => {
                assert_eq!(&actual, expected_val, "{test_id}: {input}");
            }
            (Err(_), Error) => {}
            (Err(e), SpecificError(expected_text)) => {
                let error_msg = format!("{e}");
                assert!(
                    error_msg.contains(expected_text),
                    "{test_id}: error should contain '{expected_text}', got: {error_msg}"
                );
            }
            (Ok(actual), Error) => {
                panic!("{test_id}: expected error for '{input}', got {actual:?}");
            }
            (Ok(actual), SpecificError(expected_text)) => {
                panic!("{test_id}: expected error containing '{expected_text}', got {actual:?}");
            }
            (Err(err), EvalResult(expected_val)) => {
                panic!("{test_id}: expected {expected_val:?} for '{input}', got error {err:?}");
            }
        }
    }

    /// Simplified test runner, one fresh evaluator per case
    fn run_comprehensive_tests(test_cases: Vec<(&str, TestResult)>) {
        for (i, (input, expected)) in test_cases.iter().enumerate() {
            let evaluator = Evaluator::new();
            let test_id = format!("#{}", i + 1);
            execute_test_case(input, expected, &evaluator, &test_id);
        }
    }

    #[test]
    fn test_comprehensive_operations_data_driven() {
        let test_cases = vec![
            // === SELF-EVALUATING FORMS ===
            ("42", success(42)),
            ("-2.5", success(-2.5)),
            ("#t", success(true)),
            ("#f", success(false)),
            ("\"hello\"", success("hello")),
            ("\"with\\\"quotes\"", success("with\"quotes")),
            (":key", EvalResult(kw("key"))),
            ("nil", EvalResult(Value::Nil)),
            // === ARITHMETIC ===
            ("(+ 1 2 3)", success(6)),
            ("(+)", success(0)),
            ("(- 10)", success(-10)),
            ("(* 2 3 4)", success(24)),
            ("(/ 10 4)", success(2.5)),
            ("(% 10 4)", success(2)),
            ("(+ (* 2 3) (- 8 2))", success(12)),
            ("(+ 1 \"2\")", SpecificError("Type mismatch")),
            // === COMPARISON AND EQUALITY ===
            ("(= 5 5)", success(true)),
            ("(< 1 2 3)", success(true)),
            ("(>= 3 5)", success(false)),
            ("(equal? '(1 (2)) (list 1 (list 2)))", success(true)),
            ("(equal? 'a \"a\")", success(false)),
            ("(< 1)", SpecificError("ArityError")),
            // === QUOTE ===
            ("(quote hello)", success(sym("hello"))),
            ("(quote (1 2 3))", success([1, 2, 3])),
            ("'(+ 1 2)", success([sym("+"), val(1), val(2)])),
            ("'()", EvalResult(empty())),
            ("''x", success([sym("quote"), sym("x")])),
            ("(quote)", SpecificError("Malformed quote")),
            ("(quote a b)", SpecificError("Malformed quote")),
            // === IF AND TRUTHINESS ===
            ("(if #t 1 2)", success(1)),
            ("(if #f 1 2)", success(2)),
            ("(if #f 1)", EvalResult(Value::Nil)),
            ("(if nil 1 2)", success(2)),
            ("(if 0 1 2)", success(1)),
            ("(if \"\" 1 2)", success(1)),
            ("(if '() 1 2)", success(1)),
            ("(if #t)", SpecificError("Malformed if")),
            ("(if #t 1 2 3)", SpecificError("Malformed if")),
            // === COND ===
            ("(cond (#f 1) (#t 2) (else 3))", success(2)),
            ("(cond (#f 1) (else 3))", success(3)),
            ("(cond (#f 1) (:else 4))", success(4)),
            ("(cond (#f 1))", EvalResult(Value::Nil)),
            ("(cond)", EvalResult(Value::Nil)),
            ("(cond ((+ 1 1)))", success(2)),
            ("(cond (#t 1 2 3))", success(3)),
            ("(cond 1)", SpecificError("Malformed cond")),
            ("(cond ())", SpecificError("Malformed cond")),
            // === LAMBDA AND APPLICATION ===
            ("((lambda (x) (* x x)) 4)", success(16)),
            ("((λ (x y) (+ x y)) 1 2)", success(3)),
            ("((lambda () 42))", success(42)),
            ("((lambda args args) 1 2 3)", success([1, 2, 3])),
            ("((lambda (x) 1 2 x) 3)", success(3)),
            ("((if #t + *) 2 3)", success(5)),
            ("((lambda (x) x))", SpecificError("ArityError")),
            ("((lambda (x) x) 1 2)", SpecificError("ArityError")),
            ("(lambda (x x) x)", SpecificError("duplicate parameter")),
            ("(lambda (1) x)", SpecificError("Malformed lambda")),
            ("(lambda (x))", SpecificError("Malformed lambda")),
            ("(1 2 3)", SpecificError("expected procedure")),
            ("(\"f\" 1)", SpecificError("expected procedure")),
            // === LET ===
            ("(let ((x 1) (y 2)) (+ x y))", success(3)),
            ("(let () 5)", success(5)),
            ("(let ((x 1)) (define y 2) (+ x y))", success(3)),
            ("(let ((x 1) (x 2)) x)", SpecificError("duplicate parameter")),
            ("(let ((x)) x)", SpecificError("Malformed let")),
            ("(let (x) x)", SpecificError("Malformed let")),
            ("(let x x)", SpecificError("Malformed let")),
            // === BEGIN ===
            ("(begin)", EvalResult(Value::Nil)),
            ("(begin 1 2 3)", success(3)),
            // === APPLY ===
            ("(apply + '(1 2 3))", success(6)),
            ("(apply (lambda (a b) (- a b)) (list 5 3))", success(2)),
            ("(apply + 1)", SpecificError("Type mismatch")),
            // === LISTS ===
            ("(car (list 1 2 3))", success(1)),
            ("(cdr (list 1 2 3))", success([2, 3])),
            ("(cons 1 (list 2 3))", success([1, 2, 3])),
            ("(cons 1 2)", SpecificError("Type mismatch")),
            ("(car '())", Error),
            ("(append '(1 2) '(3) '())", success([1, 2, 3])),
            ("(length '(1 2 3))", success(3)),
            // === QUASIQUOTE ===
            ("`(1 ,@(list 2 3) 4)", success([1, 2, 3, 4])),
            ("`(1 ,(+ 1 1) 3)", success([1, 2, 3])),
            ("`x", success(sym("x"))),
            ("`5", success(5)),
            ("`,(+ 1 2)", success(3)),
            ("`(a (b ,(+ 1 1)) c)", success(vec![sym("a"), val(vec![sym("b"), val(2)]), sym("c")])),
            ("`(,@'() 1)", success([1])),
            ("`(,@1)", SpecificError("Type mismatch")),
            ("`,@(list 1)", SpecificError("Malformed unquote-splicing")),
            ("`(1 (unquote))", SpecificError("Malformed unquote")),
            ("`(1 (unquote 1 2))", SpecificError("Malformed unquote")),
            (",x", SpecificError("outside of a quasiquoted")),
            ("(unquote-splicing x)", SpecificError("outside of a quasiquoted")),
            // === ERRORS ===
            ("undefined-variable", SpecificError("Unknown symbol: undefined-variable")),
            ("()", SpecificError("Unknown expression")),
            ("(error \"boom\" 42)", SpecificError("boom 42")),
        ];

        run_comprehensive_tests(test_cases);
    }

    #[test]
    fn test_stateful_definitions() {
        let test_environments = vec![
            TestEnvironment(vec![
                test_setup!("(define x 1)"),
                ("x", success(1)),
                ("(define x 2)", SpecificError("Unable to redefine existing symbol x")),
                ("x", success(1)),
                test_setup!("(set! x 5)"),
                ("x", success(5)),
                ("(set! y 1)", SpecificError("Attempt to set! unbound symbol y")),
                ("(define 1 2)", SpecificError("Malformed define")),
            ]),
            TestEnvironment(vec![
                ("(begin (define x 1) (define x 2))", SpecificError("redefine")),
                // The first define survives the failed begin
                ("x", success(1)),
            ]),
            TestEnvironment(vec![("(begin (define x 1) (set! x 2) x)", success(2))]),
            TestEnvironment(vec![
                // Closures capture by reference and see later set!s
                test_setup!("(define n 1)"),
                test_setup!("(defn get-n () n)"),
                test_setup!("(set! n 7)"),
                ("(get-n)", success(7)),
                // set! inside a closure writes where the binding lives
                test_setup!("(defn bump () (set! n (+ n 1)))"),
                test_setup!("(bump)"),
                ("n", success(8)),
            ]),
            TestEnvironment(vec![
                // Shadowing in a procedure frame does not touch the global
                test_setup!("(define v 10)"),
                ("((lambda (v) (define w v) w) 3)", success(3)),
                ("v", success(10)),
                ("w", SpecificError("Unknown symbol")),
            ]),
            TestEnvironment(vec![
                test_setup!("(defn make-counter () (let ((count 0)) (lambda () (set! count (+ count 1)) count)))"),
                test_setup!("(define c1 (make-counter))"),
                test_setup!("(define c2 (make-counter))"),
                ("(c1)", success(1)),
                ("(c1)", success(2)),
                ("(c2)", success(1)),
            ]),
            TestEnvironment(vec![
                test_setup!("(defn fact (n) (if (= n 0) 1 (* n (fact (- n 1)))))"),
                ("(fact 10)", success(3_628_800)),
                ("(defn fact (n) n)", SpecificError("redefine")),
                ("(defn 5 (n) n)", SpecificError("Malformed defn")),
            ]),
        ];

        run_tests_in_environment(test_environments);
    }

    #[test]
    fn test_macros() {
        let test_environments = vec![
            TestEnvironment(vec![
                test_setup!("(defmacro my-if (c t e) `(cond (,c ,t) (else ,e)))"),
                ("(my-if #t 1 2)", success(1)),
                ("(my-if #f 1 2)", success(2)),
                ("(my-if #t 1)", SpecificError("No clause of macro my-if matches (my-if #t 1)")),
                ("(defmacro my-if (a) a)", SpecificError("redefine")),
            ]),
            TestEnvironment(vec![
                test_setup!("(defmacro my-list (items ...) `(list ,@items))"),
                ("(my-list 1 (+ 1 1) 3)", success([1, 2, 3])),
                ("(my-list)", EvalResult(empty())),
            ]),
            TestEnvironment(vec![
                test_setup!("(defmacro quoted-args args `(quote ,args))"),
                ("(quoted-args a b c)", success([sym("a"), sym("b"), sym("c")])),
            ]),
            TestEnvironment(vec![
                test_setup!(
                    "(defmacro my-or (syntax-rules () ((_) #f) ((_ e) e) ((_ e r ...) (if e e (my-or r ...)))))"
                ),
                ("(my-or)", success(false)),
                ("(my-or #f 3)", success(3)),
                ("(my-or #f #f)", success(false)),
            ]),
            TestEnvironment(vec![
                // Macros are only definable at the top level
                ("((lambda () (defmacro m (x) x)))", SpecificError("Malformed defmacro")),
                ("(defmacro 1 (x) x)", SpecificError("Malformed defmacro")),
                ("(defmacro m (x ... y ...) x)", SpecificError("Invalid macro pattern")),
            ]),
        ];

        run_tests_in_environment(test_environments);
    }

    #[test]
    fn test_macro_expansion_is_evaluated_globally() {
        // Non-hygienic expansion: the expansion refers to `x`, which resolves in the global
        // environment rather than in the caller's frame
        let evaluator = Evaluator::new();
        evaluator.eval_str("(define x 'global)").unwrap();
        evaluator.eval_str("(defmacro get-x () 'x)").unwrap();
        assert_eq!(
            evaluator.eval_str("((lambda (x) (get-x)) 'local)").unwrap(),
            sym("global")
        );
        assert!(evaluator.is_macro("get-x"));
        assert_eq!(evaluator.macro_names(), vec![Symbol::new("get-x")]);
    }

    #[test]
    fn test_macroexpand() {
        let evaluator = Evaluator::new();
        evaluator
            .eval_str("(defmacro unless2 (syntax-rules () ((_ c e) (if c nil e))))")
            .unwrap();
        let form = read("(unless2 ready (go))").unwrap();
        assert_eq!(
            evaluator.macroexpand(&form).unwrap(),
            read("(if ready nil (go))").unwrap()
        );
        let plain = read("(+ 1 2)").unwrap();
        assert_eq!(evaluator.macroexpand(&plain).unwrap(), plain);
    }

    #[test]
    fn test_eval_in_explicit_environment() {
        let evaluator = Evaluator::new();
        let local = Environment::with_outer(evaluator.global());
        local.define(Symbol::new("z"), val(9)).unwrap();

        let expr = read("(+ z 1)").unwrap();
        assert_eq!(evaluator.eval(&expr, Some(&local)).unwrap(), val(10));
        assert!(matches!(
            evaluator.eval(&expr, None),
            Err(Error::UnknownSymbol(_))
        ));
    }

    #[test]
    fn test_apply_from_host() {
        let evaluator = Evaluator::new();
        let square = evaluator.eval_str("(lambda (x) (* x x))").unwrap();
        assert_eq!(evaluator.apply(&square, vec![val(7)]).unwrap(), val(49));

        let plus = evaluator.global().get("+").unwrap();
        assert_eq!(evaluator.apply(&plus, vec![val(1), val(2)]).unwrap(), val(3));
        assert!(evaluator.apply(&val(1), vec![]).is_err());
    }

    #[test]
    fn test_host_registered_builtin() {
        fn forty_two(_args: &[Value]) -> Result<Value, Error> {
            Ok(val(42))
        }

        let evaluator = Evaluator::new();
        evaluator
            .global()
            .register_builtin_function("forty-two", forty_two);
        assert_eq!(evaluator.eval_str("(+ (forty-two) 1)").unwrap(), val(43));

        let calls = Rc::new(std::cell::Cell::new(0));
        let counter = Rc::clone(&calls);
        evaluator.global().register_builtin_closure(
            "tick",
            Rc::new(move |_args: &[Value]| -> Result<Value, Error> {
                counter.set(counter.get() + 1);
                Ok(Value::Nil)
            }),
        );
        evaluator.eval_str("(begin (tick) (tick))").unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_runtime_values_are_not_expressions() {
        let evaluator = Evaluator::new();
        let plus = evaluator.global().get("+").unwrap();
        let square = evaluator.eval_str("(lambda (x) (* x x))").unwrap();

        for value in [Value::Nil, plus.clone(), square] {
            assert!(
                matches!(evaluator.eval(&value, None), Err(Error::UnknownExpression(_))),
                "{value} should not evaluate"
            );
        }

        // Also when spliced into the head of a form
        let form = val(vec![plus, val(1), val(2)]);
        assert!(matches!(
            evaluator.eval(&form, None),
            Err(Error::UnknownExpression(_))
        ));

        // The `nil` symbol still names the nil value
        assert_eq!(evaluator.eval(&sym("nil"), None).unwrap(), Value::Nil);
    }

    #[test]
    fn test_deep_tail_recursion() {
        let evaluator = Evaluator::new();
        evaluator
            .eval_str("(defn count-down (n) (if (= n 0) 'done (count-down (- n 1))))")
            .unwrap();
        assert_eq!(
            evaluator.eval_str("(count-down 1000000)").unwrap(),
            sym("done")
        );
    }

    #[test]
    fn test_config() {
        let evaluator = Evaluator::with_config(Config::default()).unwrap();
        assert!(!evaluator.config().load_prelude);
        assert!(evaluator.global().get("map").is_none());
    }
}
