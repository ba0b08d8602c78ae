//! Drawing access through the session's [`HostBridge`].
//!
//! Entity and selection-set handles come back as `Ename`/`SelectionSet`
//! values; anything the host does not know about reads as nil.

use cadlisp_core::{
    builtin, check_arity, group_code, BuiltinDef, EvalContext, LispError, SysVar, Value,
};

use crate::str_arg;

pub static BUILTINS: &[BuiltinDef] = &[
    builtin("command", command),
    builtin("entmake", entmake),
    builtin("entget", entget),
    builtin("entlast", entlast),
    builtin("entnext", entnext),
    builtin("entdel", entdel),
    builtin("entmod", entmod),
    builtin("getvar", getvar),
    builtin("setvar", setvar),
    builtin("ssget", ssget),
    builtin("ssadd", ssadd),
    builtin("ssdel", ssdel),
    builtin("sslength", sslength),
    builtin("ssname", ssname),
    builtin("alert", alert),
    builtin("prompt", prompt),
];

fn ename_arg(value: &Value) -> Option<u64> {
    match value {
        Value::Ename(id) => Some(*id),
        _ => None,
    }
}

fn set_arg(value: &Value) -> Option<u64> {
    match value {
        Value::SelectionSet(id) => Some(*id),
        _ => None,
    }
}

fn alist_arg<'a>(name: &str, value: &'a Value) -> Result<&'a [Value], LispError> {
    match value {
        Value::Nil => Ok(&[]),
        Value::List(items) => Ok(items),
        _ => Err(LispError::eval(format!(
            "{name}: expected an association list, got {}",
            value.type_name()
        ))),
    }
}

fn entity_list(host_data: Option<Vec<Value>>) -> Value {
    host_data.map_or(Value::Nil, Value::list)
}

pub(crate) fn sysvar_to_value(var: SysVar) -> Value {
    match var {
        SysVar::Int(n) => Value::Int(n),
        SysVar::Real(f) => Value::Real(f),
        SysVar::Str(s) => Value::string(&s),
        SysVar::Point(coords) => Value::list(coords.into_iter().map(Value::Real).collect()),
    }
}

pub(crate) fn value_to_sysvar(name: &str, value: &Value) -> Result<SysVar, LispError> {
    match value {
        Value::Int(n) => Ok(SysVar::Int(*n)),
        Value::Real(f) => Ok(SysVar::Real(*f)),
        Value::String(s) => Ok(SysVar::Str(s.to_string())),
        Value::List(items) | Value::Vector(items) => items
            .iter()
            .map(|v| {
                v.as_real()
                    .ok_or_else(|| LispError::type_error("number", v.type_name()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(SysVar::Point),
        other => Err(LispError::eval(format!(
            "{name}: cannot store {} in a system variable",
            other.type_name()
        ))),
    }
}

/// One command-line token. Points join their coordinates with commas and
/// nil stands for pressing Enter.
fn command_token(value: &Value) -> String {
    match value {
        Value::Nil => String::new(),
        Value::List(items) | Value::Vector(items) if items.iter().all(Value::is_number) => items
            .iter()
            .map(|v| v.print(false))
            .collect::<Vec<_>>()
            .join(","),
        other => other.print(false),
    }
}

fn command(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1..);
    let tokens: Vec<String> = args.iter().map(command_token).collect();
    tracing::debug!(command = %tokens.join(" "), "host command");
    ctx.host().command(&tokens)?;
    Ok(Value::Nil)
}

/// Creates an entity and returns its stored description, or nil.
fn entmake(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    let data = alist_arg(name, &args[0])?;
    let host = ctx.host();
    Ok(entity_list(host.entmake(data).and_then(|id| host.entget(id))))
}

fn entget(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1..=2);
    Ok(entity_list(
        ename_arg(&args[0]).and_then(|id| ctx.host().entget(id)),
    ))
}

fn entlast(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 0);
    Ok(ctx.host().entlast().map_or(Value::Nil, Value::Ename))
}

/// `(entnext)` is the first entity, `(entnext e)` the one after `e`.
fn entnext(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 0..=1);
    let after = match args.first() {
        None | Some(Value::Nil) => None,
        Some(v) => match ename_arg(v) {
            Some(id) => Some(id),
            None => return Ok(Value::Nil),
        },
    };
    Ok(ctx.host().entnext(after).map_or(Value::Nil, Value::Ename))
}

fn entdel(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    match ename_arg(&args[0]) {
        Some(id) if ctx.host().entdel(id) => Ok(args[0].clone()),
        _ => Ok(Value::Nil),
    }
}

/// Applies an edited description; the entity is named by its `(-1 . ename)` entry.
fn entmod(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    let data = alist_arg(name, &args[0])?;
    let target = data
        .iter()
        .find(|entry| group_code(entry) == Some(-1))
        .and_then(cadlisp_core::group_value)
        .and_then(|v| ename_arg(&v));
    match target {
        Some(id) if ctx.host().entmod(id, data) => Ok(args[0].clone()),
        _ => Ok(Value::Nil),
    }
}

fn getvar(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    let var = str_arg(&args[0])?;
    Ok(ctx.host().getvar(var).map_or(Value::Nil, sysvar_to_value))
}

fn setvar(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2);
    let var = str_arg(&args[0])?;
    let value = value_to_sysvar(name, &args[1])?;
    ctx.host().setvar(var, value).map(sysvar_to_value)
}

/// `(ssget [mode] [filter])`. A leading string is the selection mode; a
/// trailing list of group-code entries is the filter.
fn ssget(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 0..=3);
    let mode = args.first().and_then(Value::as_str);
    let filter = args
        .last()
        .and_then(Value::as_list)
        .filter(|items| !items.is_empty() && items.iter().all(|e| group_code(e).is_some()));
    Ok(ctx
        .host()
        .ssget(mode, filter)
        .map_or(Value::Nil, Value::SelectionSet))
}

/// `(ssadd)` makes an empty set, `(ssadd e)` a set holding `e`, and
/// `(ssadd e ss)` adds `e` to `ss`.
fn ssadd(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 0..=2);
    let ent = match args.first() {
        None => None,
        Some(v) => match ename_arg(v) {
            Some(id) => Some(id),
            None => return Ok(Value::Nil),
        },
    };
    let set = match args.get(1) {
        None => None,
        Some(v) => match set_arg(v) {
            Some(id) => Some(id),
            None => return Ok(Value::Nil),
        },
    };
    Ok(ctx
        .host()
        .ssadd(ent, set)
        .map_or(Value::Nil, Value::SelectionSet))
}

fn ssdel(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2);
    match (ename_arg(&args[0]), set_arg(&args[1])) {
        (Some(ent), Some(set)) if ctx.host().ssdel(ent, set) => Ok(args[1].clone()),
        _ => Ok(Value::Nil),
    }
}

fn sslength(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    Ok(set_arg(&args[0])
        .and_then(|set| ctx.host().sslength(set))
        .map_or(Value::Nil, |n| Value::Int(n as i64)))
}

fn ssname(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2);
    let index = match &args[1] {
        Value::Int(n) => usize::try_from(*n).ok(),
        Value::Real(f) if *f >= 0.0 => Some(*f as usize),
        _ => None,
    };
    Ok(set_arg(&args[0])
        .zip(index)
        .and_then(|(set, idx)| ctx.host().ssname(set, idx))
        .map_or(Value::Nil, Value::Ename))
}

fn alert(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    ctx.host().alert(str_arg(&args[0])?);
    Ok(Value::Nil)
}

fn prompt(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    ctx.host().prompt(str_arg(&args[0])?);
    Ok(Value::Nil)
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::testing::{call, call_with, int, real};
    use cadlisp_core::{EvalContext, LispError, MemoryHost, Value};

    fn s(text: &str) -> Value {
        Value::string(text)
    }

    fn pair(code: i64, value: Value) -> Value {
        Value::dotted_pair(Value::Int(code), value)
    }

    fn line(layer: &str) -> Value {
        Value::list(vec![
            pair(0, s("LINE")),
            pair(8, s(layer)),
            Value::list(vec![int(10), real(0.0), real(0.0)]),
        ])
    }

    fn session() -> (Rc<MemoryHost>, EvalContext) {
        let host = Rc::new(MemoryHost::new());
        let ctx = EvalContext::with_host(host.clone());
        (host, ctx)
    }

    #[test]
    fn test_null_host() {
        assert_eq!(call("entlast", &[]).unwrap(), Value::Nil);
        assert_eq!(call("getvar", &[s("CLAYER")]).unwrap(), Value::Nil);
        assert!(matches!(
            call("command", &[s("LINE")]),
            Err(LispError::Host(_))
        ));
        assert_eq!(call("entget", &[int(5)]).unwrap(), Value::Nil);
    }

    #[test]
    fn test_entity_lifecycle() {
        let (host, ctx) = session();
        let made = call_with(&ctx, "entmake", &[line("0")]).unwrap();
        let first = made.as_list().unwrap()[0].clone();
        let ename = cadlisp_core::group_value(&first).unwrap();
        assert!(matches!(ename, Value::Ename(_)));

        assert_eq!(call_with(&ctx, "entlast", &[]).unwrap(), ename);
        assert_eq!(call_with(&ctx, "entnext", &[]).unwrap(), ename);
        assert_eq!(call_with(&ctx, "entnext", &[ename.clone()]).unwrap(), Value::Nil);
        assert_eq!(call_with(&ctx, "entget", &[ename.clone()]).unwrap(), made);

        let mut edited = made.as_list().unwrap().to_vec();
        edited[2] = pair(8, s("WALLS"));
        let edited = Value::list(edited);
        assert_eq!(call_with(&ctx, "entmod", &[edited.clone()]).unwrap(), edited);
        let stored = call_with(&ctx, "entget", &[ename.clone()]).unwrap();
        assert!(stored.as_list().unwrap().contains(&pair(8, s("WALLS"))));

        assert_eq!(call_with(&ctx, "entdel", &[ename.clone()]).unwrap(), ename);
        assert_eq!(call_with(&ctx, "entdel", &[ename]).unwrap(), Value::Nil);
        assert_eq!(host.entity_count(), 0);
    }

    #[test]
    fn test_entmake_without_type_fails() {
        let (_, ctx) = session();
        let data = Value::list(vec![pair(8, s("0"))]);
        assert_eq!(call_with(&ctx, "entmake", &[data]).unwrap(), Value::Nil);
        assert!(call_with(&ctx, "entmake", &[int(1)]).is_err());
    }

    #[test]
    fn test_entmod_needs_entity_name() {
        let (_, ctx) = session();
        assert_eq!(call_with(&ctx, "entmod", &[line("0")]).unwrap(), Value::Nil);
    }

    #[test]
    fn test_selection_sets() {
        let (_, ctx) = session();
        call_with(&ctx, "entmake", &[line("0")]).unwrap();
        call_with(&ctx, "entmake", &[line("WALLS")]).unwrap();
        let walls = call_with(&ctx, "entlast", &[]).unwrap();

        let all = call_with(&ctx, "ssget", &[s("X")]).unwrap();
        assert_eq!(call_with(&ctx, "sslength", &[all]).unwrap(), int(2));

        let filter = Value::list(vec![pair(8, s("WALLS"))]);
        let ss = call_with(&ctx, "ssget", &[s("X"), filter]).unwrap();
        assert!(matches!(ss, Value::SelectionSet(_)));
        assert_eq!(call_with(&ctx, "ssname", &[ss.clone(), int(0)]).unwrap(), walls);
        assert_eq!(call_with(&ctx, "ssname", &[ss.clone(), int(1)]).unwrap(), Value::Nil);
        assert_eq!(call_with(&ctx, "ssname", &[ss.clone(), int(-1)]).unwrap(), Value::Nil);

        assert_eq!(call_with(&ctx, "ssdel", &[walls.clone(), ss.clone()]).unwrap(), ss);
        assert_eq!(call_with(&ctx, "ssdel", &[walls.clone(), ss.clone()]).unwrap(), Value::Nil);
        assert_eq!(call_with(&ctx, "sslength", &[ss.clone()]).unwrap(), int(0));

        assert_eq!(call_with(&ctx, "ssadd", &[walls.clone(), ss.clone()]).unwrap(), ss);
        assert_eq!(call_with(&ctx, "sslength", &[ss]).unwrap(), int(1));

        let fresh = call_with(&ctx, "ssadd", &[]).unwrap();
        assert_eq!(call_with(&ctx, "sslength", &[fresh]).unwrap(), int(0));
        assert_eq!(call_with(&ctx, "ssadd", &[int(3)]).unwrap(), Value::Nil);
    }

    #[test]
    fn test_sysvars() {
        let (_, ctx) = session();
        assert_eq!(call_with(&ctx, "setvar", &[s("osmode"), int(33)]).unwrap(), int(33));
        assert_eq!(call_with(&ctx, "getvar", &[s("OSMODE")]).unwrap(), int(33));

        let point = Value::list(vec![int(1), real(2.5)]);
        call_with(&ctx, "setvar", &[s("LASTPOINT"), point]).unwrap();
        assert_eq!(
            call_with(&ctx, "getvar", &[s("lastpoint")]).unwrap(),
            Value::list(vec![real(1.0), real(2.5)])
        );
        assert!(call_with(&ctx, "setvar", &[s("X"), Value::keyword("k")]).is_err());
    }

    #[test]
    fn test_command_tokens_and_messages() {
        let (host, ctx) = session();
        let args = [
            s("LINE"),
            Value::list(vec![int(0), int(0)]),
            Value::list(vec![real(1.5), int(2)]),
            Value::Nil,
        ];
        assert_eq!(call_with(&ctx, "command", &args).unwrap(), Value::Nil);
        assert_eq!(host.commands(), vec!["LINE 0,0 1.5,2 ".to_string()]);
        assert!(call_with(&ctx, "command", &[]).is_err());

        call_with(&ctx, "alert", &[s("done")]).unwrap();
        call_with(&ctx, "prompt", &[s("Pick: ")]).unwrap();
        assert_eq!(host.messages(), vec!["done".to_string(), "Pick: ".to_string()]);
    }
}
