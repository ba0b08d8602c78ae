use cadlisp_core::{
    builtin, call_callback, check_arity, dotted_tail, eval_callback, BuiltinDef, EvalContext,
    LispError, Value,
};

use crate::{int_arg, seq_arg, t_or_nil, values_equal};

pub static BUILTINS: &[BuiltinDef] = &[
    builtin("list", list),
    builtin("cons", cons),
    builtin("car", car),
    builtin("cdr", cdr),
    builtin("cadr", cadr),
    builtin("caddr", caddr),
    builtin("first", first),
    builtin("rest", rest),
    builtin("last", last),
    builtin("nth", nth),
    builtin("count", count),
    builtin("concat", concat),
    builtin("conj", conj),
    builtin("reverse", reverse),
    builtin("seq", seq),
    builtin("vec", vec),
    builtin("vector", vector),
    builtin("apply", apply),
    builtin("map", map),
    builtin("mapcar", mapcar),
    builtin("member?", member),
    builtin("vl-position", vl_position),
    builtin("subst", subst),
    builtin("assoc", assoc),
];

/// Split a sequence into its proper elements and the dotted tail, if any.
fn split_dotted(items: &[Value]) -> (&[Value], Option<&Value>) {
    match dotted_tail(items) {
        Some(tail) => (&items[..items.len() - 2], Some(tail)),
        None => (items, None),
    }
}

/// The elements of a sequence that must not carry a dotted tail.
fn proper_arg(value: &Value) -> Result<&[Value], LispError> {
    match split_dotted(seq_arg(value)?) {
        (items, None) => Ok(items),
        (_, Some(_)) => Err(LispError::type_error("proper list", "dotted list")),
    }
}

/// Everything after the first element. `(a . b)` gives `b`.
fn tail_of(items: &[Value]) -> Value {
    if items.len() == 3 && dotted_tail(items).is_some() {
        return items[2].clone();
    }
    Value::list(items.get(1..).unwrap_or(&[]).to_vec())
}

/// A function argument to `apply`/`mapcar`: quoted names and lambda forms are
/// evaluated in the global environment first.
fn resolve_callable(ctx: &EvalContext, op: &Value) -> Result<Value, LispError> {
    match op {
        Value::Symbol(_) | Value::List(_) => eval_callback(ctx, op, &ctx.root_env()?),
        _ => Ok(op.clone()),
    }
}

fn list(_: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    Ok(Value::list(args.to_vec()))
}

/// Prepend to a sequence; any other non-nil tail makes a dotted pair.
fn cons(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2);
    let head = args[0].clone();
    match &args[1] {
        Value::Nil => Ok(Value::list(vec![head])),
        Value::List(items) | Value::Vector(items) => {
            let mut out = Vec::with_capacity(items.len() + 1);
            out.push(head);
            out.extend(items.iter().cloned());
            Ok(Value::list(out))
        }
        tail => Ok(Value::dotted_pair(head, tail.clone())),
    }
}

fn car(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    Ok(seq_arg(&args[0])?.first().cloned().unwrap_or(Value::Nil))
}

fn cdr(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    let items = seq_arg(&args[0])?;
    if items.is_empty() {
        return Ok(Value::empty_list());
    }
    Ok(tail_of(items))
}

fn nth_proper(args: &[Value], index: usize) -> Result<Value, LispError> {
    let (proper, _) = split_dotted(seq_arg(&args[0])?);
    Ok(proper.get(index).cloned().unwrap_or(Value::Nil))
}

fn cadr(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    nth_proper(args, 1)
}

fn caddr(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    nth_proper(args, 2)
}

fn first(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    Ok(seq_arg(&args[0])?.first().cloned().unwrap_or(Value::Nil))
}

fn rest(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    Ok(tail_of(seq_arg(&args[0])?))
}

fn last(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    Ok(seq_arg(&args[0])?.last().cloned().unwrap_or(Value::Nil))
}

/// Accepts both `(nth index seq)` and `(nth seq index)`. Out-of-range indices
/// and real indices give nil.
fn nth(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2);
    let (index, seq) = match (&args[0], &args[1]) {
        (Value::Real(_), _) | (_, Value::Real(_)) => return Ok(Value::Nil),
        (Value::Int(_), seq) => (&args[0], seq),
        (seq, index) => (index, seq),
    };
    let n = int_arg(index)?;
    let (proper, _) = split_dotted(seq_arg(seq)?);
    Ok(usize::try_from(n)
        .ok()
        .and_then(|i| proper.get(i))
        .cloned()
        .unwrap_or(Value::Nil))
}

fn count(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    let (proper, tail) = split_dotted(seq_arg(&args[0])?);
    Ok(Value::Int((proper.len() + usize::from(tail.is_some())) as i64))
}

/// Joins sequences. Only the last one may be dotted; its tail ends the result.
fn concat(_: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    let mut out = Vec::new();
    let Some((last, init)) = args.split_last() else {
        return Ok(Value::empty_list());
    };
    for arg in init {
        out.extend(proper_arg(arg)?.iter().cloned());
    }
    let (items, tail) = split_dotted(seq_arg(last)?);
    out.extend(items.iter().cloned());
    if let Some(tail) = tail {
        out.push(Value::symbol("."));
        out.push(tail.clone());
    }
    Ok(Value::list(out))
}

/// Lists grow at the front, vectors at the back.
fn conj(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1..);
    match &args[0] {
        Value::Vector(items) => {
            let mut out = items.as_ref().clone();
            out.extend(args[1..].iter().cloned());
            Ok(Value::vector(out))
        }
        other => {
            let items = seq_arg(other)?;
            let mut out: Vec<Value> = args[1..].iter().rev().cloned().collect();
            out.extend(items.iter().cloned());
            Ok(Value::list(out))
        }
    }
}

fn reverse(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    let mut items = proper_arg(&args[0])?.to_vec();
    items.reverse();
    Ok(Value::list(items))
}

/// A list view of a sequence or the characters of a string; empty input gives nil.
fn seq(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    match &args[0] {
        Value::String(s) if s.is_empty() => Ok(Value::Nil),
        Value::String(s) => Ok(Value::list(
            s.chars().map(|c| Value::string(&c.to_string())).collect(),
        )),
        other => {
            let items = seq_arg(other)
                .map_err(|_| LispError::eval(format!("'{other}' is not a string or sequence")))?;
            if items.is_empty() {
                Ok(Value::Nil)
            } else {
                Ok(Value::list(items.to_vec()))
            }
        }
    }
}

fn vec(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    Ok(Value::vector(proper_arg(&args[0])?.to_vec()))
}

fn vector(_: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    Ok(Value::vector(args.to_vec()))
}

/// `(apply f a b '(c d))` calls `f` with `a b c d`.
fn apply(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2..);
    let func = resolve_callable(ctx, &args[0])?;
    let spread = &args[args.len() - 1];
    let mut call_args = args[1..args.len() - 1].to_vec();
    call_args.extend(proper_arg(spread)?.iter().cloned());
    call_callback(ctx, &func, &call_args)
}

fn map(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2);
    let func = resolve_callable(ctx, &args[0])?;
    let items = proper_arg(&args[1])?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(call_callback(ctx, &func, std::slice::from_ref(item))?);
    }
    Ok(Value::list(out))
}

/// Calls the function with one element from each list, stopping at the shortest.
fn mapcar(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2..);
    let func = resolve_callable(ctx, &args[0])?;
    let lists = args[1..]
        .iter()
        .map(|a| seq_arg(a).map(|items| split_dotted(items).0))
        .collect::<Result<Vec<_>, _>>()?;
    let len = lists.iter().map(|l| l.len()).min().unwrap_or(0);
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        let row: Vec<Value> = lists.iter().map(|l| l[i].clone()).collect();
        out.push(call_callback(ctx, &func, &row)?);
    }
    Ok(Value::list(out))
}

fn member(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2);
    let (items, _) = split_dotted(seq_arg(&args[1])?);
    let found = items.iter().any(|v| values_equal(v, &args[0]));
    Ok(t_or_nil(found))
}

fn vl_position(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2);
    let (items, _) = split_dotted(seq_arg(&args[1])?);
    Ok(items
        .iter()
        .position(|v| values_equal(v, &args[0]))
        .map_or(Value::Nil, |i| Value::Int(i as i64)))
}

/// `(subst new old list)` replaces every top-level occurrence of `old`.
fn subst(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 3);
    let (new, old) = (&args[0], &args[1]);
    let (items, tail) = split_dotted(seq_arg(&args[2])?);
    let mut out: Vec<Value> = items
        .iter()
        .map(|v| if values_equal(v, old) { new.clone() } else { v.clone() })
        .collect();
    if let Some(tail) = tail {
        out.push(Value::symbol("."));
        out.push(tail.clone());
    }
    Ok(Value::list(out))
}

/// `(assoc key alist)` finds the first entry whose car is `key`. Given a map
/// first, `(assoc map k v ...)` returns the map with the pairs added.
fn assoc(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    if let Some(Value::HashMap(map)) = args.first() {
        cadlisp_core::check_args_even(name, args.len() - 1)?;
        let mut out = map.as_ref().clone();
        for pair in args[1..].chunks(2) {
            out.insert(pair[0].clone(), pair[1].clone());
        }
        return Ok(Value::HashMap(std::rc::Rc::new(out)));
    }
    check_arity!(args, name, 2);
    let key = &args[0];
    for entry in seq_arg(&args[1])? {
        if let Value::List(items) = entry {
            if items.first().is_some_and(|k| values_equal(k, key)) {
                return Ok(entry.clone());
            }
        }
    }
    Ok(Value::Nil)
}

#[cfg(test)]
mod tests {
    use crate::testing::{call, int, ints, real};
    use cadlisp_core::{LispError, Value};

    fn pair(a: i64, b: i64) -> Value {
        Value::dotted_pair(int(a), int(b))
    }

    #[test]
    fn test_list_zero_args() {
        assert_eq!(call("list", &[]).unwrap(), Value::empty_list());
    }

    #[test]
    fn test_cons() {
        assert_eq!(call("cons", &[int(1), ints(&[2, 3])]).unwrap(), ints(&[1, 2, 3]));
        assert_eq!(call("cons", &[int(1), Value::Nil]).unwrap(), ints(&[1]));
        let p = call("cons", &[int(1), int(2)]).unwrap();
        assert_eq!(p.to_string(), "(1 . 2)");
        assert_eq!(call("cdr", &[p.clone()]).unwrap(), int(2));
        assert_eq!(call("car", &[p]).unwrap(), int(1));
    }

    #[test]
    fn test_car_cdr_on_empty() {
        assert_eq!(call("car", &[Value::Nil]).unwrap(), Value::Nil);
        assert_eq!(call("car", &[Value::empty_list()]).unwrap(), Value::Nil);
        assert_eq!(call("cdr", &[Value::Nil]).unwrap(), Value::empty_list());
        assert!(call("car", &[int(1)]).is_err());
    }

    #[test]
    fn test_cdr_of_dotted_list() {
        let items = Value::list(vec![int(1), int(2), Value::symbol("."), int(3)]);
        assert_eq!(call("cdr", &[items.clone()]).unwrap().to_string(), "(2 . 3)");
        assert_eq!(call("cadr", &[items.clone()]).unwrap(), int(2));
        assert_eq!(call("caddr", &[items.clone()]).unwrap(), Value::Nil);
        assert_eq!(call("count", &[items]).unwrap(), int(3));
    }

    #[test]
    fn test_accessors() {
        let xs = ints(&[10, 20, 30]);
        assert_eq!(call("cadr", &[xs.clone()]).unwrap(), int(20));
        assert_eq!(call("caddr", &[xs.clone()]).unwrap(), int(30));
        assert_eq!(call("last", &[xs.clone()]).unwrap(), int(30));
        assert_eq!(call("rest", &[xs.clone()]).unwrap(), ints(&[20, 30]));
        assert_eq!(call("first", &[Value::Nil]).unwrap(), Value::Nil);
        assert_eq!(call("count", &[xs]).unwrap(), int(3));
        assert_eq!(call("count", &[Value::Nil]).unwrap(), int(0));
    }

    #[test]
    fn test_nth_either_order() {
        let xs = ints(&[10, 20, 30]);
        assert_eq!(call("nth", &[int(1), xs.clone()]).unwrap(), int(20));
        assert_eq!(call("nth", &[xs.clone(), int(2)]).unwrap(), int(30));
        assert_eq!(call("nth", &[int(7), xs.clone()]).unwrap(), Value::Nil);
        assert_eq!(call("nth", &[real(1.0), xs]).unwrap(), Value::Nil);
    }

    #[test]
    fn test_building() {
        assert_eq!(
            call("concat", &[ints(&[1]), Value::Nil, Value::vector(vec![int(2)])]).unwrap(),
            ints(&[1, 2])
        );
        assert_eq!(call("conj", &[ints(&[1, 2]), int(3), int(4)]).unwrap(), ints(&[4, 3, 1, 2]));
        assert_eq!(
            call("conj", &[Value::vector(vec![int(1)]), int(2)]).unwrap(),
            Value::vector(vec![int(1), int(2)])
        );
        assert_eq!(call("reverse", &[ints(&[1, 2, 3])]).unwrap(), ints(&[3, 2, 1]));
        assert_eq!(call("vec", &[ints(&[1])]).unwrap(), Value::vector(vec![int(1)]));
    }

    #[test]
    fn test_seq() {
        assert_eq!(call("seq", &[Value::empty_list()]).unwrap(), Value::Nil);
        assert_eq!(call("seq", &[Value::string("")]).unwrap(), Value::Nil);
        assert_eq!(call("seq", &[Value::string("ab")]).unwrap().to_string(), "(\"a\" \"b\")");
        assert!(call("seq", &[int(1)]).is_err());
    }

    #[test]
    fn test_searching() {
        let xs = ints(&[1, 2, 3]);
        assert_eq!(call("member?", &[real(2.0), xs.clone()]).unwrap(), Value::Bool(true));
        assert_eq!(call("member?", &[int(9), xs.clone()]).unwrap(), Value::Nil);
        assert_eq!(call("vl-position", &[int(3), xs.clone()]).unwrap(), int(2));
        assert_eq!(call("vl-position", &[int(4), xs]).unwrap(), Value::Nil);
    }

    #[test]
    fn test_subst_replaces_all() {
        assert_eq!(
            call("subst", &[int(0), int(1), ints(&[1, 2, 1])]).unwrap(),
            ints(&[0, 2, 0])
        );
    }

    #[test]
    fn test_assoc_lists_and_maps() {
        let alist = Value::list(vec![pair(8, 1), ints(&[10, 5, 5]), pair(62, 3)]);
        assert_eq!(call("assoc", &[int(62), alist.clone()]).unwrap(), pair(62, 3));
        assert_eq!(call("assoc", &[int(10), alist.clone()]).unwrap(), ints(&[10, 5, 5]));
        assert_eq!(call("assoc", &[int(99), alist]).unwrap(), Value::Nil);

        let map = Value::hashmap(vec![]);
        let map = call("assoc", &[map, Value::keyword("a"), int(1)]).unwrap();
        assert_eq!(map, Value::hashmap(vec![(Value::keyword("a"), int(1))]));
        assert!(call("assoc", &[map, Value::keyword("b")]).is_err());
    }

    #[test]
    fn test_concat_keeps_dotted_structure() {
        let joined = call("concat", &[ints(&[0]), pair(1, 2)]).unwrap();
        assert_eq!(joined.to_string(), "(0 1 . 2)");
        assert!(joined.is_dotted());
        assert!(matches!(
            call("concat", &[pair(1, 2), ints(&[3])]),
            Err(LispError::Type { .. })
        ));
        assert_eq!(call("concat", &[]).unwrap(), Value::empty_list());
    }

    #[test]
    fn test_dotted_lists_rejected_where_elements_are_rearranged() {
        let dotted = Value::list(vec![int(1), int(2), Value::symbol("."), int(3)]);
        assert!(matches!(call("reverse", &[dotted.clone()]), Err(LispError::Type { .. })));
        assert!(matches!(call("vec", &[dotted]), Err(LispError::Type { .. })));
    }

    #[test]
    fn test_searches_skip_the_dot_marker() {
        let dotted = Value::list(vec![int(1), int(2), Value::symbol("."), int(3)]);
        let dot = Value::symbol(".");
        assert_eq!(call("member?", &[dot.clone(), dotted.clone()]).unwrap(), Value::Nil);
        assert_eq!(call("vl-position", &[dot, dotted.clone()]).unwrap(), Value::Nil);
        assert_eq!(call("vl-position", &[int(2), dotted.clone()]).unwrap(), int(1));
        assert_eq!(
            call("subst", &[int(9), int(1), dotted]).unwrap().to_string(),
            "(9 2 . 3)"
        );
    }
}
