use std::rc::Rc;

use cadlisp_core::{
    builtin, check_args_even, check_arity, BuiltinDef, EvalContext, LispError, Value,
};

pub static BUILTINS: &[BuiltinDef] = &[
    builtin("hash-map", hash_map),
    builtin("get", get),
    builtin("contains?", contains),
    builtin("dissoc", dissoc),
    builtin("keys", keys),
    builtin("vals", vals),
];

type Map = hashbrown::HashMap<Value, Value>;

fn map_arg(value: &Value) -> Result<&Map, LispError> {
    match value {
        Value::HashMap(map) => Ok(map),
        _ => Err(LispError::type_error("hash-map", value.type_name())),
    }
}

/// Entries sorted by key, so `keys` and `vals` line up and print stably.
fn sorted_entries(map: &Map) -> Vec<(&Value, &Value)> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|(a, _), (b, _)| a.cmp(b));
    entries
}

fn hash_map(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_args_even(name, args.len())?;
    Ok(Value::hashmap(
        args.chunks(2)
            .map(|kv| (kv[0].clone(), kv[1].clone()))
            .collect(),
    ))
}

fn get(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2);
    if args[0].is_nil() {
        return Ok(Value::Nil);
    }
    Ok(map_arg(&args[0])?.get(&args[1]).cloned().unwrap_or(Value::Nil))
}

fn contains(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2);
    if args[0].is_nil() {
        return Ok(Value::Nil);
    }
    Ok(Value::Bool(map_arg(&args[0])?.contains_key(&args[1])))
}

fn dissoc(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1..);
    let mut map = map_arg(&args[0])?.clone();
    for key in &args[1..] {
        map.remove(key);
    }
    Ok(Value::HashMap(Rc::new(map)))
}

fn keys(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    let entries = sorted_entries(map_arg(&args[0])?);
    Ok(Value::list(entries.into_iter().map(|(k, _)| k.clone()).collect()))
}

fn vals(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    let entries = sorted_entries(map_arg(&args[0])?);
    Ok(Value::list(entries.into_iter().map(|(_, v)| v.clone()).collect()))
}

#[cfg(test)]
mod tests {
    use crate::testing::{call, int};
    use cadlisp_core::Value;

    fn sample() -> Value {
        call(
            "hash-map",
            &[Value::keyword("b"), int(2), Value::keyword("a"), int(1)],
        )
        .unwrap()
    }

    #[test]
    fn test_hash_map_needs_pairs() {
        assert!(call("hash-map", &[int(1)]).is_err());
        assert_eq!(call("hash-map", &[]).unwrap(), Value::hashmap(vec![]));
    }

    #[test]
    fn test_lookup() {
        let m = sample();
        assert_eq!(call("get", &[m.clone(), Value::keyword("a")]).unwrap(), int(1));
        assert_eq!(call("get", &[m.clone(), Value::keyword("z")]).unwrap(), Value::Nil);
        assert_eq!(call("get", &[Value::Nil, Value::keyword("a")]).unwrap(), Value::Nil);
        assert_eq!(
            call("contains?", &[m, Value::keyword("b")]).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_keys_and_vals_are_ordered() {
        let m = sample();
        assert_eq!(call("keys", &[m.clone()]).unwrap().to_string(), "(:a :b)");
        assert_eq!(call("vals", &[m]).unwrap().to_string(), "(1 2)");
    }

    #[test]
    fn test_dissoc_leaves_original() {
        let m = sample();
        let smaller = call("dissoc", &[m.clone(), Value::keyword("a")]).unwrap();
        assert_eq!(smaller.to_string(), "{:b 2}");
        assert_eq!(m.to_string(), "{:a 1 :b 2}");
    }
}
