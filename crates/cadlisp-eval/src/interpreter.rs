use std::path::Path;
use std::rc::Rc;

use cadlisp_core::{intern, Env, EvalContext, HostBridge, LispError, Registry, Value};
use cadlisp_reader::Reader;

use crate::config::InterpreterConfig;
use crate::eval::{call_value, eval_value, EvalResult};
use crate::prelude::PRELUDE;

/// One interpreter session: the global environment plus its evaluation context.
///
/// Sessions are independent; errors abort only the current evaluation and
/// leave the global environment usable.
pub struct Interpreter {
    ctx: EvalContext,
    global_env: Env,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// A session with every core builtin and the prelude.
    pub fn new() -> Self {
        Self::with_registry(
            InterpreterConfig::default(),
            &cadlisp_stdlib::core_registry(),
        )
    }

    pub fn with_config(config: InterpreterConfig) -> Self {
        Self::with_registry(config, &cadlisp_stdlib::core_registry())
    }

    /// A session whose global environment holds exactly `registry`'s builtins.
    pub fn with_registry(config: InterpreterConfig, registry: &Registry) -> Self {
        let ctx = EvalContext::new();
        ctx.set_eval_callbacks(eval_value, call_value);
        ctx.set_max_eval_depth(config.max_eval_depth);

        let global_env = Env::new();
        registry.install(&global_env);
        ctx.set_root_env(global_env.clone());

        let argv = config.argv.iter().map(|a| Value::string(a)).collect();
        global_env.set(intern("*ARGV*"), Value::list(argv));

        let interp = Interpreter { ctx, global_env };
        if config.load_prelude {
            if let Err(e) = interp.eval_str(PRELUDE) {
                tracing::warn!(error = %e, "prelude failed to load");
            }
        }
        interp
    }

    pub fn context(&self) -> &EvalContext {
        &self.ctx
    }

    pub fn global_env(&self) -> &Env {
        &self.global_env
    }

    pub fn set_host(&self, host: Rc<dyn HostBridge>) {
        self.ctx.set_host(host);
    }

    /// Bind `name` in the global environment.
    pub fn define(&self, name: &str, value: Value) {
        self.global_env.set(intern(name), value);
    }

    pub fn eval(&self, expr: &Value) -> EvalResult {
        eval_value(&self.ctx, expr, &self.global_env)
    }

    /// Read and evaluate every form in `input`, returning the last value.
    pub fn eval_str(&self, input: &str) -> EvalResult {
        tracing::debug!(len = input.len(), "evaluating source");
        let mut result = Value::Nil;
        for form in Reader::new(input)? {
            result = self.eval(&form?)?;
        }
        Ok(result)
    }

    /// Evaluate a script file in the global environment.
    pub fn load_file(&self, path: impl AsRef<Path>) -> EvalResult {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading script");
        let source = std::fs::read_to_string(path)
            .map_err(|e| LispError::Io(format!("Cannot open {}: {e}", path.display())))?;
        self.eval_str(&source)
    }
}
