use cadlisp_core::{builtin, check_arity, BuiltinDef, EvalContext, LispError, Value};

use crate::{seq_arg, t_or_nil};

pub static BUILTINS: &[BuiltinDef] = &[
    builtin("nil?", is_nil),
    builtin("true?", is_true),
    builtin("false?", is_false),
    builtin("atom?", is_atom),
    builtin("integer?", is_integer),
    builtin("double?", is_double),
    builtin("number?", is_number),
    builtin("numberp", numberp),
    builtin("string?", is_string),
    builtin("symbol?", is_symbol),
    builtin("keyword?", is_keyword),
    builtin("list?", is_list),
    builtin("listp", listp),
    builtin("vector?", is_vector),
    builtin("map?", is_map),
    builtin("sequential?", is_sequential),
    builtin("fn?", is_fn),
    builtin("macro?", is_macro),
    builtin("file?", is_file),
    builtin("boolean?", is_boolean),
    builtin("empty?", is_empty),
    builtin("null", null),
    builtin("vl-consp", vl_consp),
    builtin("type?", type_of),
];

fn test(name: &str, args: &[Value], pred: fn(&Value) -> bool) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    Ok(Value::Bool(pred(&args[0])))
}

fn is_nil(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    test(name, args, Value::is_nil)
}

fn is_true(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    test(name, args, |v| matches!(v, Value::Bool(true)))
}

fn is_false(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    test(name, args, |v| matches!(v, Value::Bool(false)))
}

fn is_atom(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    test(name, args, |v| matches!(v, Value::Atom(_)))
}

fn is_integer(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    test(name, args, |v| matches!(v, Value::Int(_)))
}

fn is_double(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    test(name, args, |v| matches!(v, Value::Real(_)))
}

fn is_number(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    test(name, args, Value::is_number)
}

fn numberp(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    Ok(t_or_nil(args[0].is_number()))
}

fn is_string(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    test(name, args, |v| matches!(v, Value::String(_)))
}

fn is_symbol(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    test(name, args, |v| matches!(v, Value::Symbol(_)))
}

fn is_keyword(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    test(name, args, |v| matches!(v, Value::Keyword(_)))
}

fn is_list(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    test(name, args, |v| matches!(v, Value::List(_)))
}

/// T for lists and for nil, the empty list.
fn listp(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    Ok(t_or_nil(matches!(args[0], Value::List(_) | Value::Nil)))
}

fn is_vector(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    test(name, args, |v| matches!(v, Value::Vector(_)))
}

fn is_map(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    test(name, args, |v| matches!(v, Value::HashMap(_)))
}

fn is_sequential(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    test(name, args, |v| v.as_seq().is_some())
}

fn is_fn(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    test(name, args, |v| match v {
        Value::Lambda(l) => !l.is_macro,
        Value::BuiltIn(_) => true,
        _ => false,
    })
}

fn is_macro(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    test(name, args, |v| matches!(v, Value::Lambda(l) if l.is_macro))
}

fn is_file(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    test(name, args, |v| matches!(v, Value::File(_)))
}

fn is_boolean(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    test(name, args, |v| matches!(v, Value::Bool(_)))
}

fn is_empty(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    Ok(Value::Bool(seq_arg(&args[0])?.is_empty()))
}

fn null(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    Ok(t_or_nil(args[0].is_nil()))
}

/// T only for a dotted pair or dotted list.
fn vl_consp(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    Ok(t_or_nil(args[0].is_dotted()))
}

/// The AutoLISP type symbol of a value (`INT`, `REAL`, `STR`, `LIST`, `ENAME`, ...);
/// nil has no type.
fn type_of(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    if args[0].is_nil() {
        return Ok(Value::Nil);
    }
    Ok(Value::symbol(args[0].type_tag()))
}

#[cfg(test)]
mod tests {
    use crate::testing::{call, int, ints, real};
    use cadlisp_core::{NativeFn, Value};

    #[test]
    fn test_type_predicates() {
        assert_eq!(call("integer?", &[int(1)]).unwrap(), Value::Bool(true));
        assert_eq!(call("integer?", &[real(1.0)]).unwrap(), Value::Bool(false));
        assert_eq!(call("double?", &[real(1.0)]).unwrap(), Value::Bool(true));
        assert_eq!(call("keyword?", &[Value::keyword("k")]).unwrap(), Value::Bool(true));
        assert_eq!(call("sequential?", &[Value::vector(vec![])]).unwrap(), Value::Bool(true));
        assert_eq!(call("nil?", &[Value::Nil]).unwrap(), Value::Bool(true));
        assert_eq!(call("boolean?", &[Value::Bool(false)]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_autolisp_predicates_answer_t_or_nil() {
        assert_eq!(call("null", &[Value::Nil]).unwrap(), Value::Bool(true));
        assert_eq!(call("null", &[int(0)]).unwrap(), Value::Nil);
        assert_eq!(call("listp", &[Value::Nil]).unwrap(), Value::Bool(true));
        assert_eq!(call("numberp", &[Value::string("1")]).unwrap(), Value::Nil);
    }

    #[test]
    fn test_builtins_are_functions() {
        let f = Value::native_fn(NativeFn::simple("f", |_| Ok(Value::Nil)));
        assert_eq!(call("fn?", &[f.clone()]).unwrap(), Value::Bool(true));
        assert_eq!(call("macro?", &[f]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_vl_consp() {
        let pair = Value::dotted_pair(int(1), int(2));
        assert_eq!(call("vl-consp", &[pair]).unwrap(), Value::Bool(true));
        assert_eq!(call("vl-consp", &[ints(&[1, 2])]).unwrap(), Value::Nil);
    }

    #[test]
    fn test_type_symbols() {
        assert_eq!(call("type?", &[int(1)]).unwrap(), Value::symbol("INT"));
        assert_eq!(call("type?", &[Value::string("s")]).unwrap(), Value::symbol("STR"));
        assert_eq!(call("type?", &[Value::Ename(3)]).unwrap(), Value::symbol("ENAME"));
        assert_eq!(call("type?", &[Value::Nil]).unwrap(), Value::Nil);
    }

    #[test]
    fn test_empty() {
        assert_eq!(call("empty?", &[Value::empty_list()]).unwrap(), Value::Bool(true));
        assert_eq!(call("empty?", &[ints(&[1])]).unwrap(), Value::Bool(false));
        assert!(call("empty?", &[int(1)]).is_err());
    }
}
