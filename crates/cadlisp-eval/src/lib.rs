#![allow(clippy::mutable_key_type)]
mod config;
mod eval;
mod interpreter;
mod prelude;
mod special_forms;
mod stack;

pub use config::InterpreterConfig;
pub use eval::{apply_macro, call_value, eval_value, EvalResult, Trampoline};
pub use interpreter::Interpreter;
pub use prelude::PRELUDE;
pub use special_forms::SPECIAL_FORM_NAMES;
