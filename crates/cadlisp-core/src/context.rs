use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::env::Env;
use crate::error::{CallFrame, LispError, StackTrace};
use crate::host::{HostBridge, NullHost};
use crate::value::Value;

/// Evaluate a form in an environment.
pub type EvalFn = fn(&EvalContext, &Value, &Env) -> Result<Value, LispError>;

/// Apply a callable to already-evaluated arguments.
pub type CallFn = fn(&EvalContext, &Value, &[Value]) -> Result<Value, LispError>;

pub const DEFAULT_MAX_EVAL_DEPTH: usize = 10_000;

/// Per-session interpreter state shared by the evaluator and the builtins.
///
/// The evaluator installs its entry points here so builtins such as `map`,
/// `apply` and `eval` can re-enter it without a crate dependency cycle.
pub struct EvalContext {
    pub call_stack: RefCell<Vec<CallFrame>>,
    pub eval_depth: Cell<usize>,
    pub max_eval_depth: Cell<usize>,
    root_env: RefCell<Option<Env>>,
    host: RefCell<Rc<dyn HostBridge>>,
    eval_fn: Cell<Option<EvalFn>>,
    call_fn: Cell<Option<CallFn>>,
}

impl EvalContext {
    pub fn new() -> Self {
        EvalContext {
            call_stack: RefCell::new(Vec::new()),
            eval_depth: Cell::new(0),
            max_eval_depth: Cell::new(DEFAULT_MAX_EVAL_DEPTH),
            root_env: RefCell::new(None),
            host: RefCell::new(Rc::new(NullHost)),
            eval_fn: Cell::new(None),
            call_fn: Cell::new(None),
        }
    }

    pub fn with_host(host: Rc<dyn HostBridge>) -> Self {
        let ctx = Self::new();
        ctx.set_host(host);
        ctx
    }

    pub fn set_host(&self, host: Rc<dyn HostBridge>) {
        *self.host.borrow_mut() = host;
    }

    pub fn host(&self) -> Rc<dyn HostBridge> {
        self.host.borrow().clone()
    }

    pub fn set_root_env(&self, env: Env) {
        *self.root_env.borrow_mut() = Some(env);
    }

    /// The session's global environment.
    pub fn root_env(&self) -> Result<Env, LispError> {
        self.root_env
            .borrow()
            .clone()
            .ok_or_else(|| LispError::eval("no global environment installed"))
    }

    pub fn set_eval_callbacks(&self, eval: EvalFn, call: CallFn) {
        self.eval_fn.set(Some(eval));
        self.call_fn.set(Some(call));
    }

    pub fn push_call_frame(&self, frame: CallFrame) {
        self.call_stack.borrow_mut().push(frame);
    }

    pub fn call_stack_depth(&self) -> usize {
        self.call_stack.borrow().len()
    }

    pub fn truncate_call_stack(&self, depth: usize) {
        self.call_stack.borrow_mut().truncate(depth);
    }

    pub fn capture_stack_trace(&self) -> StackTrace {
        let stack = self.call_stack.borrow();
        StackTrace(stack.iter().rev().cloned().collect())
    }

    pub fn set_max_eval_depth(&self, depth: usize) {
        self.max_eval_depth.set(depth);
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluate `expr` in `env` through the installed evaluator.
pub fn eval_callback(ctx: &EvalContext, expr: &Value, env: &Env) -> Result<Value, LispError> {
    match ctx.eval_fn.get() {
        Some(f) => f(ctx, expr, env),
        None => Err(LispError::eval("no evaluator installed")),
    }
}

/// Apply `func` to `args` without tail-call elision.
///
/// Builtins are called directly; lambdas go through the installed evaluator.
pub fn call_callback(ctx: &EvalContext, func: &Value, args: &[Value]) -> Result<Value, LispError> {
    match func {
        Value::BuiltIn(native) => native.call(ctx, args),
        _ => match ctx.call_fn.get() {
            Some(f) => f(ctx, func, args),
            None => Err(LispError::eval("no evaluator installed")),
        },
    }
}
