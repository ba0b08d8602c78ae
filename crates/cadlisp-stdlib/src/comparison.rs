use std::cmp::Ordering;

use cadlisp_core::{builtin, check_arity, BuiltinDef, EvalContext, LispError, Value};

use crate::{num_arg, t_or_nil, values_equal};

pub static BUILTINS: &[BuiltinDef] = &[
    builtin("=", eq),
    builtin("/=", not_eq),
    builtin("<", lt),
    builtin(">", gt),
    builtin("<=", le),
    builtin(">=", ge),
    builtin("zero?", zero),
    builtin("zerop", zero),
    builtin("minus?", minus),
    builtin("minusp", minus),
];

fn eq(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2);
    Ok(Value::Bool(values_equal(&args[0], &args[1])))
}

fn not_eq(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2);
    Ok(Value::Bool(!values_equal(&args[0], &args[1])))
}

/// Two lists (or two vectors) order by length, strings lexically, numbers by
/// value with integer operands promoted when the other is real.
fn order(lhs: &Value, rhs: &Value) -> Result<Option<Ordering>, LispError> {
    match (lhs, rhs) {
        (Value::List(a), Value::List(b)) | (Value::Vector(a), Value::Vector(b)) => {
            Ok(Some(a.len().cmp(&b.len())))
        }
        (Value::String(a), Value::String(b)) => Ok(Some(a.cmp(b))),
        (Value::Int(a), Value::Int(b)) => Ok(Some(a.cmp(b))),
        _ => Ok(num_arg(lhs)?.partial_cmp(&num_arg(rhs)?)),
    }
}

fn compare(name: &str, args: &[Value], accept: fn(Ordering) -> bool) -> Result<Value, LispError> {
    check_arity!(args, name, 2);
    let ord = order(&args[0], &args[1])?;
    Ok(Value::Bool(ord.is_some_and(accept)))
}

fn lt(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    compare(name, args, Ordering::is_lt)
}

fn gt(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    compare(name, args, Ordering::is_gt)
}

fn le(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    compare(name, args, Ordering::is_le)
}

fn ge(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    compare(name, args, Ordering::is_ge)
}

/// `zero?`/`minus?` answer true or false, `zerop`/`minusp` answer T or nil.
fn sign_test(name: &str, args: &[Value], test: fn(f64) -> bool) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    let result = test(num_arg(&args[0])?);
    if name.ends_with('p') {
        Ok(t_or_nil(result))
    } else {
        Ok(Value::Bool(result))
    }
}

fn zero(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    sign_test(name, args, |x| x == 0.0)
}

fn minus(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    sign_test(name, args, |x| x < 0.0)
}

#[cfg(test)]
mod tests {
    use crate::testing::{call, int, ints, real};
    use cadlisp_core::{LispError, Value};

    #[test]
    fn test_equality() {
        assert_eq!(call("=", &[int(1), real(1.0)]).unwrap(), Value::Bool(true));
        assert_eq!(call("=", &[ints(&[1, 2]), ints(&[1, 2])]).unwrap(), Value::Bool(true));
        assert_eq!(
            call("/=", &[Value::string("a"), Value::string("b")]).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_equality_requires_two_args() {
        assert!(matches!(call("=", &[int(1)]), Err(LispError::Arity { .. })));
        assert!(matches!(
            call("=", &[int(1), int(1), int(1)]),
            Err(LispError::Arity { .. })
        ));
    }

    #[test]
    fn test_ordering() {
        assert_eq!(call("<", &[int(1), real(1.5)]).unwrap(), Value::Bool(true));
        assert_eq!(call(">=", &[int(2), int(2)]).unwrap(), Value::Bool(true));
        assert_eq!(
            call(">", &[Value::string("b"), Value::string("a")]).unwrap(),
            Value::Bool(true)
        );
        assert!(call("<", &[int(1), Value::string("a")]).is_err());
    }

    #[test]
    fn test_sequences_compare_by_length() {
        assert_eq!(call("<", &[ints(&[9]), ints(&[1, 2])]).unwrap(), Value::Bool(true));
        assert_eq!(
            call(">", &[ints(&[1, 2]), ints(&[5, 6])]).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_sign_predicates() {
        assert_eq!(call("zero?", &[real(0.0)]).unwrap(), Value::Bool(true));
        assert_eq!(call("zerop", &[int(3)]).unwrap(), Value::Nil);
        assert_eq!(call("minusp", &[int(-3)]).unwrap(), Value::Bool(true));
        assert_eq!(call("minus?", &[int(3)]).unwrap(), Value::Bool(false));
    }
}
