//! Dialog tiles, shown and driven by the host.

use cadlisp_core::{builtin, check_arity, BuiltinDef, EvalContext, LispError, Value};

use crate::{int_arg, str_arg, t_or_nil};

pub static BUILTINS: &[BuiltinDef] = &[
    builtin("load_dialog", load_dialog),
    builtin("unload_dialog", unload_dialog),
    builtin("new_dialog", new_dialog),
    builtin("set_tile", set_tile),
    builtin("get_tile", get_tile),
    builtin("mode_tile", mode_tile),
    builtin("action_tile", action_tile),
    builtin("start_dialog", start_dialog),
    builtin("done_dialog", done_dialog),
    builtin("term_dialog", term_dialog),
];

/// A positive handle, or -1 when the file cannot be loaded.
fn load_dialog(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    let path = str_arg(&args[0])?;
    let id = ctx.host().load_dialog(path);
    tracing::debug!(path, ?id, "load_dialog");
    Ok(Value::Int(id.unwrap_or(-1)))
}

fn unload_dialog(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    ctx.host().unload_dialog(int_arg(&args[0])?);
    Ok(Value::Nil)
}

/// `(new_dialog name id)`
fn new_dialog(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2);
    let dialog = str_arg(&args[0])?;
    let id = int_arg(&args[1])?;
    Ok(t_or_nil(ctx.host().new_dialog(dialog, id)))
}

fn set_tile(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2);
    let key = str_arg(&args[0])?;
    let value = str_arg(&args[1])?;
    Ok(t_or_nil(ctx.host().set_tile(key, value)))
}

fn get_tile(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    Ok(ctx
        .host()
        .get_tile(str_arg(&args[0])?)
        .map_or(Value::Nil, |v| Value::string(&v)))
}

fn mode_tile(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2);
    let key = str_arg(&args[0])?;
    let mode = int_arg(&args[1])?;
    Ok(t_or_nil(ctx.host().mode_tile(key, mode)))
}

/// `(action_tile key expr-string)`; the host runs the expression when the
/// tile is activated.
fn action_tile(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2);
    let key = str_arg(&args[0])?;
    let action = str_arg(&args[1])?;
    Ok(t_or_nil(ctx.host().action_tile(key, action)))
}

fn start_dialog(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 0);
    Ok(ctx.host().start_dialog().map_or(Value::Nil, Value::Int))
}

/// `(done_dialog [status])` returns the dialog's last position as `(x y)`.
fn done_dialog(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 0..=1);
    let status = match args.first() {
        None | Some(Value::Nil) => None,
        Some(v) => Some(int_arg(v)?),
    };
    Ok(ctx
        .host()
        .done_dialog(status)
        .map_or(Value::Nil, |(x, y)| {
            Value::list(vec![Value::Int(x), Value::Int(y)])
        }))
}

fn term_dialog(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 0);
    ctx.host().term_dialog();
    Ok(Value::Nil)
}
