use std::cell::RefCell;
use std::rc::Rc;

use cadlisp_core::{builtin, call_callback, check_arity, BuiltinDef, EvalContext, LispError, Value};

pub static BUILTINS: &[BuiltinDef] = &[
    builtin("atom", atom),
    builtin("deref", deref),
    builtin("reset!", reset),
    builtin("swap!", swap),
];

fn cell_arg(value: &Value) -> Result<&Rc<RefCell<Value>>, LispError> {
    match value {
        Value::Atom(cell) => Ok(cell),
        _ => Err(LispError::type_error("atom", value.type_name())),
    }
}

fn atom(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    Ok(Value::atom(args[0].clone()))
}

fn deref(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    Ok(cell_arg(&args[0])?.borrow().clone())
}

fn reset(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2);
    *cell_arg(&args[0])?.borrow_mut() = args[1].clone();
    Ok(args[1].clone())
}

/// `(swap! a f x ...)` stores `(f @a x ...)` and returns it.
fn swap(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2..);
    let cell = cell_arg(&args[0])?;
    let current = cell.borrow().clone();
    let mut call_args = Vec::with_capacity(args.len() - 1);
    call_args.push(current);
    call_args.extend(args[2..].iter().cloned());
    // The borrow is released before calling out, so `f` may read the atom.
    let updated = call_callback(ctx, &args[1], &call_args)?;
    *cell.borrow_mut() = updated.clone();
    Ok(updated)
}
