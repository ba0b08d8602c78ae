//! Interactive input (`getint`, `getpoint`, `entsel`, ...) answered by the host.
//!
//! Each builtin returns nil when the host has no user to ask or the user
//! cancels. Prompt and base point arguments may come in either order.

use cadlisp_core::{builtin, check_arity, BuiltinDef, EvalContext, LispError, Point, Value};

use crate::{int_arg, str_arg};

pub static BUILTINS: &[BuiltinDef] = &[
    builtin("initget", initget),
    builtin("getint", getint),
    builtin("getreal", getreal),
    builtin("getstring", getstring),
    builtin("getpoint", getpoint),
    builtin("getcorner", getcorner),
    builtin("getdist", getdist),
    builtin("getangle", getangle),
    builtin("getorient", getorient),
    builtin("getkword", getkword),
    builtin("entsel", entsel),
    builtin("getfiled", getfiled),
];

/// A list of two or three numbers.
pub(crate) fn point_arg(value: &Value) -> Result<Point, LispError> {
    let coords = value
        .as_seq()
        .ok_or_else(|| LispError::type_error("point", value.type_name()))?;
    let mut point = [0.0; 3];
    if !(2..=3).contains(&coords.len()) {
        return Err(LispError::type_error("point", "list of wrong length"));
    }
    for (slot, c) in point.iter_mut().zip(coords) {
        *slot = c
            .as_real()
            .ok_or_else(|| LispError::type_error("number", c.type_name()))?;
    }
    Ok(point)
}

pub(crate) fn point_value(point: Point) -> Value {
    Value::list(point.into_iter().map(Value::Real).collect())
}

/// `[prompt] [base]` in any order; nil arguments are skipped.
fn prompt_and_base(args: &[Value]) -> Result<(&str, Option<Point>), LispError> {
    let mut prompt = "";
    let mut base = None;
    for arg in args {
        match arg {
            Value::Nil => {}
            Value::String(s) => prompt = s.as_str(),
            other => base = Some(point_arg(other)?),
        }
    }
    Ok((prompt, base))
}

fn optional_prompt(args: &[Value]) -> Result<&str, LispError> {
    match args.first() {
        None | Some(Value::Nil) => Ok(""),
        Some(v) => str_arg(v),
    }
}

fn real_or_nil(value: Option<f64>) -> Value {
    value.map_or(Value::Nil, Value::Real)
}

/// `(initget [bits] [keywords])`
fn initget(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 0..=2);
    let mut bits = 0;
    let mut keywords = "";
    for arg in args {
        match arg {
            Value::Int(_) => bits = int_arg(arg)?,
            Value::Nil => {}
            other => keywords = str_arg(other)?,
        }
    }
    ctx.host().initget(bits, keywords);
    Ok(Value::Nil)
}

fn getint(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 0..=1);
    let prompt = optional_prompt(args)?;
    Ok(ctx.host().getint(prompt).map_or(Value::Nil, Value::Int))
}

fn getreal(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 0..=1);
    let prompt = optional_prompt(args)?;
    Ok(real_or_nil(ctx.host().getreal(prompt)))
}

/// `(getstring [cr] [prompt])`: a non-nil `cr` allows spaces in the reply.
fn getstring(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 0..=2);
    let (allow_spaces, rest) = match args {
        [flag, rest @ ..] if args.len() == 2 => (flag.is_truthy(), rest),
        _ => (false, args),
    };
    let prompt = optional_prompt(rest)?;
    Ok(ctx
        .host()
        .getstring(prompt, allow_spaces)
        .map_or(Value::Nil, |s| Value::string(&s)))
}

fn getpoint(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 0..=2);
    let (prompt, base) = prompt_and_base(args)?;
    Ok(ctx.host().getpoint(prompt, base).map_or(Value::Nil, point_value))
}

/// `(getcorner base [prompt])`: the base point is required.
fn getcorner(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1..=2);
    let (prompt, base) = prompt_and_base(args)?;
    let base = base.ok_or_else(|| LispError::type_error("point", "nil"))?;
    Ok(ctx.host().getcorner(prompt, base).map_or(Value::Nil, point_value))
}

fn getdist(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 0..=2);
    let (prompt, base) = prompt_and_base(args)?;
    Ok(real_or_nil(ctx.host().getdist(prompt, base)))
}

fn getangle(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 0..=2);
    let (prompt, base) = prompt_and_base(args)?;
    Ok(real_or_nil(ctx.host().getangle(prompt, base)))
}

fn getorient(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 0..=2);
    let (prompt, base) = prompt_and_base(args)?;
    Ok(real_or_nil(ctx.host().getorient(prompt, base)))
}

fn getkword(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 0..=1);
    let prompt = optional_prompt(args)?;
    Ok(ctx
        .host()
        .getkword(prompt)
        .map_or(Value::Nil, |k| Value::string(&k)))
}

/// `(entsel [prompt])` returns `(ename (x y z))`.
fn entsel(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 0..=1);
    let prompt = optional_prompt(args)?;
    Ok(ctx.host().entsel(prompt).map_or(Value::Nil, |(id, point)| {
        Value::list(vec![Value::Ename(id), point_value(point)])
    }))
}

/// `(getfiled title default ext flags)`
fn getfiled(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 4);
    let title = str_arg(&args[0])?;
    let default = str_arg(&args[1])?;
    let ext = str_arg(&args[2])?;
    let flags = int_arg(&args[3])?;
    Ok(ctx
        .host()
        .getfiled(title, default, ext, flags)
        .map_or(Value::Nil, |f| Value::string(&f)))
}
