use std::f64::consts::TAU;

use cadlisp_core::{builtin, check_arity, BuiltinDef, EvalContext, LispError, Value};
use rand::Rng;

use crate::{int_arg, num_arg, seq_arg};

pub static BUILTINS: &[BuiltinDef] = &[
    builtin("expt", expt),
    builtin("sqrt", sqrt),
    builtin("exp", exp),
    builtin("log", log),
    builtin("log10", log10),
    builtin("sin", sin),
    builtin("cos", cos),
    builtin("tan", tan),
    builtin("atan", atan),
    builtin("rand", rand_real),
    builtin("rand-int", rand_int),
    builtin("angle", angle),
    builtin("polar", polar),
];

fn unary(name: &str, args: &[Value], f: fn(f64) -> f64) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    Ok(Value::Real(f(num_arg(&args[0])?)))
}

fn undefined(name: &str) -> LispError {
    LispError::eval(format!("{name}: function undefined for argument"))
}

fn expt(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2);
    if let (Value::Int(base), Value::Int(power)) = (&args[0], &args[1]) {
        if let Ok(power) = u32::try_from(*power) {
            if let Some(n) = base.checked_pow(power) {
                return Ok(Value::Int(n));
            }
        }
    }
    Ok(Value::Real(num_arg(&args[0])?.powf(num_arg(&args[1])?)))
}

fn sqrt(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    let x = num_arg(&args[0])?;
    if x < 0.0 {
        return Err(undefined(name));
    }
    Ok(Value::Real(x.sqrt()))
}

fn exp(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    unary(name, args, f64::exp)
}

fn logarithm(name: &str, args: &[Value], f: fn(f64) -> f64) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    let x = num_arg(&args[0])?;
    if x <= 0.0 {
        return Err(undefined(name));
    }
    Ok(Value::Real(f(x)))
}

fn log(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    logarithm(name, args, f64::ln)
}

fn log10(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    logarithm(name, args, f64::log10)
}

fn sin(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    unary(name, args, f64::sin)
}

fn cos(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    unary(name, args, f64::cos)
}

fn tan(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    unary(name, args, f64::tan)
}

/// `(atan y)` or `(atan y x)`.
fn atan(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1..=2);
    let y = num_arg(&args[0])?;
    match args.get(1) {
        Some(x) => Ok(Value::Real(y.atan2(num_arg(x)?))),
        None => Ok(Value::Real(y.atan())),
    }
}

fn rand_real(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 0);
    Ok(Value::Real(rand::rng().random::<f64>()))
}

fn rand_int(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    let max = int_arg(&args[0])?;
    if max <= 0 {
        return Err(LispError::eval(format!("{name}: bound must be positive")));
    }
    Ok(Value::Int(rand::rng().random_range(0..max)))
}

/// Coordinates of a 2D or 3D point given as a list or vector of numbers.
fn point(value: &Value) -> Result<Vec<f64>, LispError> {
    let items = seq_arg(value)?;
    if !(2..=3).contains(&items.len()) {
        return Err(LispError::type_error("2D or 3D point", value.type_name()));
    }
    items.iter().map(num_arg).collect()
}

/// Angle in radians, in `[0, 2π)`, of the line from the first point to the second.
fn angle(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2);
    let from = point(&args[0])?;
    let to = point(&args[1])?;
    let a = (to[1] - from[1]).atan2(to[0] - from[0]);
    Ok(Value::Real(if a < 0.0 { a + TAU } else { a }))
}

/// The point at `angle` and `distance` from a base point; a 3D base keeps its z.
fn polar(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 3);
    let base = point(&args[0])?;
    let angle = num_arg(&args[1])?;
    let distance = num_arg(&args[2])?;
    let mut coords = vec![
        Value::Real(base[0] + distance * angle.cos()),
        Value::Real(base[1] + distance * angle.sin()),
    ];
    if let Some(z) = base.get(2) {
        coords.push(Value::Real(*z));
    }
    Ok(Value::list(coords))
}
