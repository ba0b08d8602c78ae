#![allow(clippy::mutable_key_type)]
pub mod context;
pub mod env;
pub mod error;
pub mod file;
pub mod host;
pub mod registry;
pub mod value;

pub use context::{call_callback, eval_callback, CallFn, EvalContext, EvalFn, DEFAULT_MAX_EVAL_DEPTH};
pub use env::Env;
pub use error::{
    check_args_at_least, check_args_between, check_args_even, check_args_is, CallFrame, LispError,
    Span, StackTrace,
};
pub use file::{FileMode, LispFile};
pub use host::{group_code, group_value, HostBridge, MemoryHost, NullHost, Point, SysVar};
pub use lasso::Spur;
pub use registry::{builtin, BuiltinDef, BuiltinFn, Registry};
pub use value::{
    compare_spurs, dotted_tail, intern, is_dotted, resolve, with_resolved, Lambda, NativeFn,
    Value,
};
