#![allow(dead_code)]

use std::rc::Rc;

use cadlisp::{Interpreter, LispError, MemoryHost, Value};

/// Evaluate in a fresh session.
pub fn eval(input: &str) -> Value {
    let interp = Interpreter::new();
    interp
        .eval_str(input)
        .unwrap_or_else(|e| panic!("evaluation failed for `{input}`: {e}"))
}

/// Evaluate in a fresh session and render the result readably.
pub fn show(input: &str) -> String {
    eval(input).to_string()
}

/// Evaluate in a fresh session, expecting an error.
pub fn eval_err(input: &str) -> LispError {
    let interp = Interpreter::new();
    match interp.eval_str(input) {
        Ok(v) => panic!("expected error for `{input}`, got {v}"),
        Err(e) => e,
    }
}

/// A session attached to an in-memory drawing.
pub fn with_drawing() -> (Interpreter, Rc<MemoryHost>) {
    let host = Rc::new(MemoryHost::new());
    let interp = Interpreter::builder().with_host(host.clone()).build();
    (interp, host)
}

/// Generate one test per `name: "source" => expected` entry.
#[macro_export]
macro_rules! eval_tests {
    ($($name:ident : $input:expr => $expected:expr),* $(,)?) => {
        $(
            #[test]
            fn $name() {
                let result = common::eval($input);
                assert_eq!(result, $expected, "{}", $input);
            }
        )*
    };
}

/// Generate one test per `name: "source"` entry that must fail.
#[macro_export]
macro_rules! eval_error_tests {
    ($($name:ident : $input:expr),* $(,)?) => {
        $(
            #[test]
            fn $name() {
                let interp = cadlisp::Interpreter::new();
                assert!(interp.eval_str($input).is_err(), "should error: {}", $input);
            }
        )*
    };
}
