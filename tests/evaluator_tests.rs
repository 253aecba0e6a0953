//! End-to-end evaluation through the public API.

#![cfg(feature = "reader")]
#![expect(clippy::unwrap_used)] // test code OK

use gigl::ast::{sym, val};
use gigl::reader::{read, read_all};
use gigl::{Environment, Error, Evaluator, Value};
use pretty_assertions::assert_eq;

fn eval(evaluator: &Evaluator, source: &str) -> Result<Value, Error> {
    evaluator.eval_str(source)
}

#[test]
fn literals_evaluate_to_themselves() {
    let evaluator = Evaluator::new();
    for source in ["42", "-1.5", "0.125", "\"text\"", "#t", "#f", ":key"] {
        let datum = read(source).unwrap();
        assert_eq!(evaluator.eval(&datum, None).unwrap(), datum, "{source}");
    }
    assert_eq!(eval(&evaluator, "(list 1.5 2)").unwrap(), val(vec![val(1.5), val(2)]));
    // nil reads as a symbol bound to the nil value
    assert_eq!(read("nil").unwrap(), sym("nil"));
    assert_eq!(eval(&evaluator, "nil").unwrap(), Value::Nil);
}

#[test]
fn quote_returns_its_operand_unevaluated() {
    let evaluator = Evaluator::new();
    assert_eq!(eval(&evaluator, "(quote (1 2 3))").unwrap(), val([1, 2, 3]));
    assert_eq!(
        eval(&evaluator, "'(undefined (stuff))").unwrap(),
        val(vec![sym("undefined"), val(vec![sym("stuff")])])
    );
}

#[test]
fn if_selects_a_branch() {
    let evaluator = Evaluator::new();
    assert_eq!(eval(&evaluator, "(if #t 1 2)").unwrap(), val(1));
    assert_eq!(eval(&evaluator, "(if #f 1 2)").unwrap(), val(2));
    assert_eq!(eval(&evaluator, "(if #f 1)").unwrap(), Value::Nil);
    // The untaken branch is never evaluated
    assert_eq!(eval(&evaluator, "(if #t 1 (error \"no\"))").unwrap(), val(1));
}

#[test]
fn redefinition_is_an_error_and_set_mutates() {
    let evaluator = Evaluator::new();
    assert!(matches!(
        eval(&evaluator, "(begin (define x 1) (define x 2))"),
        Err(Error::Redefinition(name)) if name == "x"
    ));

    let evaluator = Evaluator::new();
    assert_eq!(eval(&evaluator, "(begin (define x 1) (set! x 2) x)").unwrap(), val(2));
    assert!(matches!(
        eval(&evaluator, "(set! never-defined 1)"),
        Err(Error::UnboundAssignment(name)) if name == "never-defined"
    ));
}

#[test]
fn definitions_resolve_after_unrelated_child_defines() {
    let evaluator = Evaluator::new();
    eval(&evaluator, "(define shared 5)").unwrap();
    eval(&evaluator, "(defn child () (define shared 99) shared)").unwrap();
    assert_eq!(eval(&evaluator, "(child)").unwrap(), val(99));
    assert_eq!(eval(&evaluator, "shared").unwrap(), val(5));
}

#[test]
fn splicing_quasiquote() {
    let evaluator = Evaluator::new();
    assert_eq!(
        eval(&evaluator, "`(1 ,@(list 2 3) 4)").unwrap(),
        val([1, 2, 3, 4])
    );
    eval(&evaluator, "(define xs '(b c))").unwrap();
    assert_eq!(
        eval(&evaluator, "`(a ,@xs ,(car xs) (nested ,@xs))").unwrap(),
        val(vec![
            sym("a"),
            sym("b"),
            sym("c"),
            sym("b"),
            val(vec![sym("nested"), sym("b"), sym("c")]),
        ])
    );
}

#[test]
fn unquote_outside_quasiquote() {
    let evaluator = Evaluator::new();
    assert_eq!(eval(&evaluator, ",x"), Err(Error::UnquoteOutsideQuasiquote));
    assert_eq!(eval(&evaluator, ",@x"), Err(Error::UnquoteOutsideQuasiquote));
}

#[test]
fn a_million_tail_calls() {
    let evaluator = Evaluator::new();
    eval(
        &evaluator,
        "(defn loop (n acc) (if (= n 0) acc (loop (- n 1) (+ acc 1))))",
    )
    .unwrap();
    assert_eq!(eval(&evaluator, "(loop 1000000 0)").unwrap(), val(1_000_000));
}

#[test]
fn tail_calls_through_cond_let_begin_and_apply() {
    let evaluator = Evaluator::new();
    eval(
        &evaluator,
        "(defn spin (n)
           (cond ((= n 0) 'done)
                 (else (let ((m (- n 1)))
                         (begin 'ignored (apply spin (list m)))))))",
    )
    .unwrap();
    assert_eq!(eval(&evaluator, "(spin 200000)").unwrap(), sym("done"));
}

#[test]
fn mutual_recursion_in_tail_position() {
    let evaluator = Evaluator::new();
    for source in read_all(
        "(defn my-even? (n) (if (= n 0) #t (my-odd? (- n 1))))
         (defn my-odd? (n) (if (= n 0) #f (my-even? (- n 1))))",
    )
    .unwrap()
    {
        evaluator.eval(&source, None).unwrap();
    }
    assert_eq!(eval(&evaluator, "(my-even? 100001)").unwrap(), val(false));
}

#[test]
fn closures_capture_their_scope() {
    let evaluator = Evaluator::new();
    eval(&evaluator, "(defn adder (n) (λ (x) (+ x n)))").unwrap();
    eval(&evaluator, "(define add5 (adder 5))").unwrap();
    eval(&evaluator, "(define add10 (adder 10))").unwrap();
    assert_eq!(eval(&evaluator, "(add5 1)").unwrap(), val(6));
    assert_eq!(eval(&evaluator, "(add10 1)").unwrap(), val(11));
    // Rest parameters collect every argument
    assert_eq!(
        eval(&evaluator, "((λ args (length args)) 1 2 3 4)").unwrap(),
        val(4)
    );
}

#[test]
fn failed_eval_keeps_earlier_definitions() {
    let evaluator = Evaluator::new();
    let err = eval(&evaluator, "(begin (define kept 1) (car '()))").unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }), "{err}");
    assert_eq!(eval(&evaluator, "kept").unwrap(), val(1));
    // The evaluator is still usable afterwards
    assert_eq!(eval(&evaluator, "(+ kept 1)").unwrap(), val(2));
}

#[test]
fn builtin_errors_propagate_unchanged() {
    let evaluator = Evaluator::new();
    assert_eq!(
        eval(&evaluator, "(error \"custom\" 'failure)"),
        Err(Error::User("custom failure".to_owned()))
    );
    assert!(matches!(
        eval(&evaluator, "(+ 1 'a)"),
        Err(Error::TypeMismatch { expected: "number", .. })
    ));
    assert!(matches!(
        eval(&evaluator, "(car 1 2)"),
        Err(Error::Arity { got: 2, .. })
    ));
    assert!(matches!(
        eval(&evaluator, "(undefined-fn 1)"),
        Err(Error::UnknownSymbol(name)) if name == "undefined-fn"
    ));
    assert!(matches!(eval(&evaluator, "(1"), Err(Error::Parse(_))));
}

#[test]
fn host_functions_and_environments() {
    fn double(args: &[Value]) -> Result<Value, Error> {
        match args {
            [Value::Number(n)] => Ok(Value::Number(n * 2.0)),
            _ => Err(Error::User("double takes one number".to_owned())),
        }
    }

    let evaluator = Evaluator::new();
    evaluator.global().register_builtin_function("double", double);
    assert_eq!(eval(&evaluator, "(double 21)").unwrap(), val(42));
    assert_eq!(
        eval(&evaluator, "(map-free-call)").unwrap_err(),
        Error::UnknownSymbol("map-free-call".to_owned())
    );

    // Scopes made by the host behave like procedure frames
    let scope = Environment::with_outer(evaluator.global());
    evaluator
        .eval(&read("(define local 3)").unwrap(), Some(&scope))
        .unwrap();
    assert_eq!(
        evaluator.eval(&read("(double local)").unwrap(), Some(&scope)).unwrap(),
        val(6)
    );
    assert!(evaluator.global().get("local").is_none());

    let names: Vec<String> = evaluator
        .global()
        .get_all_bindings()
        .into_iter()
        .map(|(name, _)| name.to_string())
        .collect();
    assert!(names.contains(&"double".to_owned()));
    assert!(names.contains(&"car".to_owned()));
}

#[test]
fn evaluators_are_independent() {
    let first = Evaluator::new();
    let second = Evaluator::new();
    eval(&first, "(define only-here 1)").unwrap();
    eval(&first, "(defmacro only-here-too () 1)").unwrap();
    assert!(eval(&second, "only-here").is_err());
    assert!(!second.is_macro("only-here-too"));
}

#[cfg(feature = "prelude")]
#[test]
fn prelude_is_opt_in() {
    use gigl::Config;
    use gigl::ast::empty;

    let bare = Evaluator::new();
    assert!(eval(&bare, "(map car '())").is_err());

    let loaded = Evaluator::with_config(Config { load_prelude: true }).unwrap();
    assert_eq!(eval(&loaded, "(map car '())").unwrap(), empty());
    assert_eq!(
        eval(&loaded, "(filter (λ (x) (> x 1)) (map abs '(-3 1 -2)))").unwrap(),
        val([3, 2])
    );
}
