//! cadlisp: an embeddable AutoLISP-flavoured interpreter for CAD scripting.
//!
//! This crate is the embedding API. It ties the reader, the core builtins and
//! the evaluator into one [`Interpreter`], and lets the application plug in
//! its drawing through a [`HostBridge`].
//!
//! # Quick Start
//!
//! ```no_run
//! use cadlisp::{InterpreterBuilder, Value};
//!
//! let interp = InterpreterBuilder::new().build();
//! let result = interp.eval_str("(+ 1 2)").unwrap();
//! assert_eq!(result, Value::Int(3));
//! ```

use std::path::Path;
use std::rc::Rc;

pub use cadlisp_core::{
    builtin, intern, resolve, with_resolved, BuiltinDef, Env, EvalContext, HostBridge, LispError,
    MemoryHost, NativeFn, NullHost, Registry, StackTrace, SysVar, Value,
};
pub use cadlisp_eval::{InterpreterConfig, SPECIAL_FORM_NAMES};
pub use cadlisp_reader::{read_many, read_str};

/// Result of evaluating a cadlisp expression.
pub type EvalResult = Result<Value>;

pub type Result<T> = std::result::Result<T, LispError>;

/// Builder for configuring and constructing an [`Interpreter`].
///
/// By default the core builtins and the prelude are installed and the session
/// has no host attached.
pub struct InterpreterBuilder {
    stdlib: bool,
    config: InterpreterConfig,
    extra: Registry,
    host: Option<Rc<dyn HostBridge>>,
}

impl Default for InterpreterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InterpreterBuilder {
    pub fn new() -> Self {
        Self {
            stdlib: true,
            config: InterpreterConfig::default(),
            extra: Registry::new(),
            host: None,
        }
    }

    /// Enable or disable the core builtins (default: `true`).
    pub fn with_stdlib(mut self, enable: bool) -> Self {
        self.stdlib = enable;
        self
    }

    pub fn without_stdlib(self) -> Self {
        self.with_stdlib(false)
    }

    /// Enable or disable the prelude (default: `true`).
    pub fn with_prelude(mut self, enable: bool) -> Self {
        self.config.load_prelude = enable;
        self
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_max_eval_depth(mut self, depth: usize) -> Self {
        self.config.max_eval_depth = depth;
        self
    }

    pub fn with_argv(mut self, argv: Vec<String>) -> Self {
        self.config.argv = argv;
        self
    }

    /// Add builtins on top of the core set. Later entries replace earlier ones
    /// with the same name.
    pub fn with_registry(mut self, registry: &Registry) -> Self {
        self.extra.extend(registry);
        self
    }

    pub fn with_host(mut self, host: Rc<dyn HostBridge>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn build(self) -> Interpreter {
        let mut registry = if self.stdlib {
            cadlisp_stdlib::core_registry()
        } else {
            Registry::new()
        };
        registry.extend(&self.extra);
        tracing::debug!(
            builtins = registry.len(),
            prelude = self.config.load_prelude,
            "building interpreter"
        );

        let inner = cadlisp_eval::Interpreter::with_registry(self.config, &registry);
        if let Some(host) = self.host {
            inner.set_host(host);
        }
        Interpreter { inner }
    }
}

/// A cadlisp interpreter session.
///
/// Use [`InterpreterBuilder`] for fine-grained control, or
/// [`Interpreter::new`] for the core builtins plus prelude.
pub struct Interpreter {
    inner: cadlisp_eval::Interpreter,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        InterpreterBuilder::new().build()
    }

    pub fn builder() -> InterpreterBuilder {
        InterpreterBuilder::new()
    }

    /// Evaluate a single parsed [`Value`] in the global environment.
    pub fn eval(&self, expr: &Value) -> EvalResult {
        self.inner.eval(expr)
    }

    /// Read and evaluate every form in `input`, returning the last value.
    ///
    /// Definitions persist across calls, so a function defined in one call
    /// can be used in the next.
    pub fn eval_str(&self, input: &str) -> EvalResult {
        self.inner.eval_str(input)
    }

    pub fn load_file(&self, path: impl AsRef<Path>) -> EvalResult {
        self.inner.load_file(path)
    }

    /// Register a native function callable from scripts.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use cadlisp::{Interpreter, LispError, Value};
    ///
    /// let interp = Interpreter::new();
    /// interp.register_fn("square", |args: &[Value]| match args {
    ///     [Value::Int(n)] => Ok(Value::Int(n * n)),
    ///     [other] => Err(LispError::type_error("integer", other.type_name())),
    ///     _ => Err(LispError::arity("square", "1 arg", args.len())),
    /// });
    /// ```
    pub fn register_fn<F>(&self, name: &str, f: F)
    where
        F: Fn(&[Value]) -> Result<Value> + 'static,
    {
        self.define(name, Value::native_fn(NativeFn::simple(name, f)));
    }

    pub fn define(&self, name: &str, value: Value) {
        self.inner.define(name, value);
    }

    pub fn set_host(&self, host: Rc<dyn HostBridge>) {
        self.inner.set_host(host);
    }

    pub fn global_env(&self) -> &Env {
        self.inner.global_env()
    }

    pub fn context(&self) -> &EvalContext {
        self.inner.context()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seven(_: &str, _: &EvalContext, _: &[Value]) -> Result<Value> {
        Ok(Value::Int(7))
    }

    static EXTRA: &[BuiltinDef] = &[builtin("seven", seven)];

    #[test]
    fn default_session() {
        let interp = Interpreter::new();
        assert_eq!(interp.eval_str("(+ 1 2)").unwrap(), Value::Int(3));
        assert_eq!(interp.eval_str("T").unwrap(), Value::Bool(true));
    }

    #[test]
    fn without_stdlib_keeps_extra_builtins() {
        let interp = Interpreter::builder()
            .without_stdlib()
            .with_prelude(false)
            .with_registry(&Registry::with_tables(&[EXTRA]))
            .build();
        assert_eq!(interp.eval_str("(seven)").unwrap(), Value::Int(7));
        assert!(interp.eval_str("(+ 1 2)").is_err());
    }

    #[test]
    fn extra_builtins_override_core() {
        let mut registry = Registry::new();
        registry.add_native(NativeFn::simple("abs", |_| Ok(Value::string("mine"))));
        let interp = Interpreter::builder().with_registry(&registry).build();
        assert_eq!(interp.eval_str("(abs -1)").unwrap(), Value::string("mine"));
    }

    #[test]
    fn register_fn_is_callable() {
        let interp = Interpreter::new();
        interp.register_fn("square", |args| match args {
            [Value::Int(n)] => Ok(Value::Int(n * n)),
            _ => Err(LispError::eval("bad")),
        });
        assert_eq!(
            interp.eval_str("(mapcar square '(1 2 3))").unwrap().to_string(),
            "(1 4 9)"
        );
    }

    #[test]
    fn host_is_attached() {
        let host = Rc::new(MemoryHost::new());
        let interp = Interpreter::builder().with_host(host.clone()).build();
        interp.eval_str("(command \"CIRCLE\" '(0 0) 5)").unwrap();
        assert_eq!(host.commands().len(), 1);
    }

    #[test]
    fn argv_and_depth_settings() {
        let interp = Interpreter::builder()
            .with_argv(vec!["x".into()])
            .with_max_eval_depth(64)
            .build();
        assert_eq!(interp.eval_str("(car *ARGV*)").unwrap(), Value::string("x"));
        assert!(interp
            .eval_str("(defun f (n) (+ 1 (f n))) (f 1)")
            .is_err());
    }
}
