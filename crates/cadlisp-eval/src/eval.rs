use std::rc::Rc;

use cadlisp_core::{resolve, CallFrame, Env, EvalContext, Lambda, LispError, Value};

use crate::special_forms;
use crate::stack::ensure_sufficient_stack;

/// One evaluation step: either a finished value or a form to continue with.
pub enum Trampoline {
    Value(Value),
    Eval(Value, Env),
}

pub type EvalResult = Result<Value, LispError>;

/// Truncates the call stack back to its entry depth on drop.
struct CallStackGuard<'a> {
    ctx: &'a EvalContext,
    entry_depth: usize,
}

impl Drop for CallStackGuard<'_> {
    fn drop(&mut self) {
        self.ctx.truncate_call_stack(self.entry_depth);
    }
}

/// Restores the nesting counter on drop.
struct DepthGuard<'a> {
    ctx: &'a EvalContext,
    depth: usize,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.ctx.eval_depth.set(self.depth);
    }
}

/// Evaluate `expr` in `env`.
///
/// Tail positions loop inside one call; only non-tail sub-evaluations nest,
/// and their depth is bounded by the context's `max_eval_depth`.
pub fn eval_value(ctx: &EvalContext, expr: &Value, env: &Env) -> EvalResult {
    let depth = ctx.eval_depth.get();
    let max = ctx.max_eval_depth.get();
    if depth >= max {
        return Err(LispError::eval(format!(
            "maximum evaluation depth ({max}) exceeded"
        )));
    }
    ctx.eval_depth.set(depth + 1);
    let _depth = DepthGuard { ctx, depth };
    ensure_sufficient_stack(|| eval_loop(ctx, expr, env))
}

fn eval_loop(ctx: &EvalContext, expr: &Value, env: &Env) -> EvalResult {
    let mut current_expr = expr.clone();
    let mut current_env = env.clone();
    let entry_depth = ctx.call_stack_depth();
    let _guard = CallStackGuard { ctx, entry_depth };

    loop {
        match eval_step(ctx, &current_expr, &current_env) {
            Ok(Trampoline::Value(v)) => return Ok(v),
            Ok(Trampoline::Eval(next_expr, next_env)) => {
                // A tail call replaces the frames pushed since entry with the newest one.
                {
                    let mut stack = ctx.call_stack.borrow_mut();
                    if stack.len() > entry_depth + 1 {
                        let top = stack.pop();
                        stack.truncate(entry_depth);
                        stack.extend(top);
                    }
                }
                current_expr = next_expr;
                current_env = next_env;
            }
            Err(e) => return Err(e.with_stack_trace(ctx.capture_stack_trace())),
        }
    }
}

fn eval_step(ctx: &EvalContext, expr: &Value, env: &Env) -> Result<Trampoline, LispError> {
    match expr {
        Value::Symbol(name) => env.lookup(*name).map(Trampoline::Value),
        Value::Vector(items) => {
            let mut result = Vec::with_capacity(items.len());
            for item in items.iter() {
                result.push(eval_value(ctx, item, env)?);
            }
            Ok(Trampoline::Value(Value::vector(result)))
        }
        Value::HashMap(map) => {
            let mut result = hashbrown::HashMap::with_capacity(map.len());
            for (k, v) in map.iter() {
                let ek = eval_value(ctx, k, env)?;
                let ev = eval_value(ctx, v, env)?;
                result.insert(ek, ev);
            }
            Ok(Trampoline::Value(Value::HashMap(Rc::new(result))))
        }
        Value::List(items) if !items.is_empty() => eval_list(ctx, &items[0], &items[1..], env),
        other => Ok(Trampoline::Value(other.clone())),
    }
}

fn eval_list(
    ctx: &EvalContext,
    head: &Value,
    args: &[Value],
    env: &Env,
) -> Result<Trampoline, LispError> {
    if let Value::Symbol(spur) = head {
        if special_forms::is_overridable(*spur) {
            if let Some(Value::Lambda(mac)) = env.get(*spur) {
                if mac.is_macro {
                    let expanded = apply_macro(ctx, &mac, args)?;
                    return Ok(Trampoline::Eval(expanded, env.clone()));
                }
            }
        }
        if let Some(result) = special_forms::try_eval_special(*spur, args, env, ctx) {
            return result;
        }
    }

    let func = eval_value(ctx, head, env)?;
    match &func {
        Value::Lambda(lambda) if lambda.is_macro => {
            // The expansion is fed back into the loop rather than evaluated recursively.
            let expanded = apply_macro(ctx, lambda, args)?;
            Ok(Trampoline::Eval(expanded, env.clone()))
        }
        Value::Lambda(lambda) => {
            let eval_args = eval_args(ctx, args, env)?;
            ctx.push_call_frame(CallFrame {
                name: lambda_name(lambda),
            });
            apply_lambda(lambda, &eval_args)
        }
        Value::BuiltIn(native) => {
            let eval_args = eval_args(ctx, args, env)?;
            ctx.push_call_frame(CallFrame {
                name: native.name.clone(),
            });
            // On error the frame stays for the trace.
            let v = native.call(ctx, &eval_args)?;
            ctx.truncate_call_stack(ctx.call_stack_depth().saturating_sub(1));
            Ok(Trampoline::Value(v))
        }
        other => Err(not_callable(other)),
    }
}

fn eval_args(ctx: &EvalContext, args: &[Value], env: &Env) -> Result<Vec<Value>, LispError> {
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        out.push(eval_value(ctx, arg, env)?);
    }
    Ok(out)
}

pub(crate) fn lambda_name(lambda: &Lambda) -> String {
    match lambda.name {
        Some(name) => resolve(name),
        None if lambda.is_macro => "<macro>".to_string(),
        None => "<lambda>".to_string(),
    }
}

pub(crate) fn not_callable(value: &Value) -> LispError {
    LispError::eval(format!(
        "{} is not a function ({})",
        value.print(true),
        value.type_name()
    ))
}

/// Bind a lambda's parameters and hand its body back to the loop.
fn apply_lambda(lambda: &Lambda, args: &[Value]) -> Result<Trampoline, LispError> {
    let env = Env::bind(&lambda.env, &lambda_name(lambda), &lambda.params, args)?;
    Ok(Trampoline::Eval(lambda.body.clone(), env))
}

/// Run a macro body over unevaluated argument forms, producing the expansion.
pub fn apply_macro(ctx: &EvalContext, mac: &Lambda, args: &[Value]) -> EvalResult {
    let env = Env::bind(&mac.env, &lambda_name(mac), &mac.params, args)?;
    eval_value(ctx, &mac.body, &env)
}

/// Apply `func` to evaluated arguments and return its result.
///
/// This is the entry point builtins re-enter through (`map`, `apply`, `swap!`).
pub fn call_value(ctx: &EvalContext, func: &Value, args: &[Value]) -> EvalResult {
    match func {
        Value::BuiltIn(native) => native.call(ctx, args),
        Value::Lambda(lambda) if !lambda.is_macro => {
            let entry_depth = ctx.call_stack_depth();
            let _guard = CallStackGuard { ctx, entry_depth };
            ctx.push_call_frame(CallFrame {
                name: lambda_name(lambda),
            });
            let env = Env::bind(&lambda.env, &lambda_name(lambda), &lambda.params, args)?;
            eval_value(ctx, &lambda.body, &env)
        }
        other => Err(not_callable(other)),
    }
}
