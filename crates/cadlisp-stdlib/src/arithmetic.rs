use cadlisp_core::{builtin, check_arity, BuiltinDef, EvalContext, LispError, Value};

use crate::{int_arg, num_arg};

pub static BUILTINS: &[BuiltinDef] = &[
    builtin("+", add),
    builtin("-", sub),
    builtin("*", mul),
    builtin("/", div),
    builtin("rem", rem),
    builtin("%", modulo),
    builtin("1+", inc),
    builtin("1-", dec),
    builtin("abs", abs),
    builtin("min", min),
    builtin("max", max),
    builtin("gcd", gcd),
    builtin("~", bit_not),
    builtin("logand", logand),
    builtin("logior", logior),
    builtin("fix", fix),
    builtin("float", float),
];

fn overflow(name: &str) -> LispError {
    LispError::eval(format!("{name}: integer overflow"))
}

fn has_real(args: &[Value]) -> bool {
    args.iter().any(|a| matches!(a, Value::Real(_)))
}

fn check_numbers(args: &[Value]) -> Result<(), LispError> {
    for arg in args {
        if !arg.is_number() {
            return Err(LispError::type_error("number", arg.type_name()));
        }
    }
    Ok(())
}

/// Left fold over the arguments. No arguments give 0 and a single argument is
/// returned as is; otherwise the whole fold is done in reals when any operand is
/// real.
fn fold(
    name: &str,
    args: &[Value],
    int_op: fn(i64, i64) -> Option<i64>,
    real_op: fn(f64, f64) -> f64,
    divides: bool,
) -> Result<Value, LispError> {
    check_numbers(args)?;
    match args {
        [] => return Ok(Value::Int(0)),
        [single] => return Ok(single.clone()),
        _ => {}
    }
    if has_real(args) {
        let mut acc = num_arg(&args[0])?;
        for arg in &args[1..] {
            let rhs = num_arg(arg)?;
            if divides && rhs == 0.0 {
                return Err(LispError::DivideByZero);
            }
            acc = real_op(acc, rhs);
        }
        Ok(Value::Real(acc))
    } else {
        let mut acc = int_arg(&args[0])?;
        for arg in &args[1..] {
            let rhs = int_arg(arg)?;
            if divides && rhs == 0 {
                return Err(LispError::DivideByZero);
            }
            acc = int_op(acc, rhs).ok_or_else(|| overflow(name))?;
        }
        Ok(Value::Int(acc))
    }
}

fn add(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    fold(name, args, i64::checked_add, |a, b| a + b, false)
}

fn sub(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    if let [single] = args {
        return match single {
            Value::Int(n) => n.checked_neg().map(Value::Int).ok_or_else(|| overflow(name)),
            Value::Real(f) => Ok(Value::Real(-f)),
            other => Err(LispError::type_error("number", other.type_name())),
        };
    }
    fold(name, args, i64::checked_sub, |a, b| a - b, false)
}

fn mul(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    fold(name, args, i64::checked_mul, |a, b| a * b, false)
}

fn div(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    fold(name, args, i64::checked_div, |a, b| a / b, true)
}

fn rem(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2..);
    fold(name, args, i64::checked_rem, |a, b| a % b, true)
}

/// Integer modulo; real operands give nil.
fn modulo(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2..);
    check_numbers(args)?;
    if has_real(args) {
        return Ok(Value::Nil);
    }
    fold(name, args, i64::checked_rem, |a, b| a % b, true)
}

fn step(name: &str, args: &[Value], delta: i64) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    match &args[0] {
        Value::Int(n) => n
            .checked_add(delta)
            .map(Value::Int)
            .ok_or_else(|| overflow(name)),
        Value::Real(f) => Ok(Value::Real(f + delta as f64)),
        other => Err(LispError::type_error("number", other.type_name())),
    }
}

fn inc(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    step(name, args, 1)
}

fn dec(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    step(name, args, -1)
}

fn abs(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    match &args[0] {
        Value::Int(n) => n.checked_abs().map(Value::Int).ok_or_else(|| overflow(name)),
        Value::Real(f) => Ok(Value::Real(f.abs())),
        other => Err(LispError::type_error("number", other.type_name())),
    }
}

fn extremum(name: &str, args: &[Value], pick_rhs: fn(f64, f64) -> bool) -> Result<Value, LispError> {
    check_arity!(args, name, 1..);
    check_numbers(args)?;
    let mut best = &args[0];
    for arg in &args[1..] {
        if pick_rhs(num_arg(best)?, num_arg(arg)?) {
            best = arg;
        }
    }
    if has_real(args) {
        Ok(Value::Real(num_arg(best)?))
    } else {
        Ok(best.clone())
    }
}

fn min(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    extremum(name, args, |best, x| x < best)
}

fn max(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    extremum(name, args, |best, x| x > best)
}

fn gcd(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2);
    let mut a = int_arg(&args[0])?.unsigned_abs();
    let mut b = int_arg(&args[1])?.unsigned_abs();
    while b != 0 {
        (a, b) = (b, a % b);
    }
    i64::try_from(a).map(Value::Int).map_err(|_| overflow(name))
}

/// Bitwise not; a real operand gives nil.
fn bit_not(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(!n)),
        Value::Real(_) => Ok(Value::Nil),
        other => Err(LispError::type_error("number", other.type_name())),
    }
}

/// Truncate a real toward zero, failing when the result does not fit an integer.
fn truncate_real(name: &str, f: f64) -> Result<i64, LispError> {
    if !f.is_finite() {
        return Err(LispError::eval(format!("{name}: value is not finite")));
    }
    let t = f.trunc();
    // i64::MAX is not representable as f64; 2^63 is the first value past it.
    if t >= -9_223_372_036_854_775_808.0 && t < 9_223_372_036_854_775_808.0 {
        Ok(t as i64)
    } else {
        Err(overflow(name))
    }
}

/// Reals are truncated to integers before combining.
fn bitwise(name: &str, args: &[Value], op: fn(i64, i64) -> i64) -> Result<Value, LispError> {
    check_numbers(args)?;
    let mut ints = Vec::with_capacity(args.len());
    for arg in args {
        ints.push(match arg {
            Value::Real(f) => truncate_real(name, *f)?,
            Value::Int(n) => *n,
            _ => 0,
        });
    }
    let mut ints = ints.into_iter();
    let Some(first) = ints.next() else {
        return Ok(Value::Int(0));
    };
    Ok(Value::Int(ints.fold(first, op)))
}

fn logand(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    bitwise(name, args, |a, b| a & b)
}

fn logior(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    bitwise(name, args, |a, b| a | b)
}

/// Truncate toward zero.
fn fix(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Real(f) => truncate_real(name, *f).map(Value::Int),
        other => Err(LispError::type_error("number", other.type_name())),
    }
}

fn float(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    Ok(Value::Real(num_arg(&args[0])?))
}
