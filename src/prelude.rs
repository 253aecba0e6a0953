//! Library procedures and macros written in the language itself.
//!
//! Loaded into the global environment by [`Evaluator::with_config`] when
//! [`Config::load_prelude`](crate::Config::load_prelude) is set.

use crate::Error;
use crate::evaluator::Evaluator;
use tracing::debug;

/// Definitions in load order. Later entries may use earlier ones.
const PRELUDE: &[&str] = &[
    "(defn compose (f g) (λ (x) (f (g x))))",
    "(defn repeat (f) (compose f f))",
    "(defn flip (f) (λ (a b) (f b a)))",
    "(defn curry (f a) (λ (b) (f a b)))",
    "(defn abs (n) ((if (> n 0) + -) 0 n))",
    "(defn caar (lst) (car (car lst)))",
    "(defn cadr (lst) (car (cdr lst)))",
    "(defn cdar (lst) (cdr (car lst)))",
    "(defn cddr (lst) (cdr (cdr lst)))",
    "(defn foldl (f acc lst) (if (null? lst) acc (foldl f (f acc (car lst)) (cdr lst))))",
    "(defn reverse (lst) (foldl (flip cons) (list) lst))",
    // Right fold over the reversed list keeps the recursion in tail position
    "(defn foldr (f acc lst) (foldl (flip f) acc (reverse lst)))",
    "(defn map (f lst) (foldr (λ (x acc) (cons (f x) acc)) (list) lst))",
    "(defn filter (f lst) (foldr (λ (x acc) (if (f x) (cons x acc) acc)) (list) lst))",
    "(defn even? (n) (= (% n 2) 0))",
    "(defn odd? (n) (not (even? n)))",
    "(define head car)",
    "(define tail cdr)",
    "(define : cons)",
    "(defn NOT (x) (if x #f #t))",
    "(defn OR (lst) (cond ((null? lst) #f) ((car lst) #t) (else (OR (cdr lst)))))",
    "(defn AND (lst)
       (cond ((null? lst) #t)
             ((null? (cdr lst)) (car lst))
             ((car lst) (AND (cdr lst)))
             (else #f)))",
    // Pairs up two lists with f, stopping at the shorter one
    "(defn combine (f)
       (λ (xs ys)
         (cond ((null? xs) (list))
               ((null? ys) (list))
               (else (f (list (car xs) (car ys)) ((combine f) (cdr xs) (cdr ys)))))))",
    "(define zip (combine cons))",
    "(defmacro when (syntax-rules () ((_ c body ...) (if c (begin body ...)))))",
    "(defmacro unless (syntax-rules () ((_ c body ...) (if c nil (begin body ...)))))",
];

/// Evaluate the prelude into `evaluator`'s global environment.
///
/// Fails with [`Error::Redefinition`] if any prelude name is already bound.
pub fn load(evaluator: &Evaluator) -> Result<(), Error> {
    for source in PRELUDE {
        evaluator.eval_str(source)?;
    }
    debug!(definitions = PRELUDE.len(), "prelude loaded");
    Ok(())
}
