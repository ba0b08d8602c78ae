#![allow(clippy::mutable_key_type)]
mod arithmetic;
mod atom;
mod comparison;
mod dialog;
mod host;
mod input;
mod io;
mod list;
mod map;
mod math;
mod predicates;
mod string;
mod system;

use cadlisp_core::{BuiltinDef, Env, LispError, Registry, Value};

/// Every builtin table, in installation order.
pub static CORE: &[&[BuiltinDef]] = &[
    arithmetic::BUILTINS,
    math::BUILTINS,
    comparison::BUILTINS,
    predicates::BUILTINS,
    list::BUILTINS,
    map::BUILTINS,
    string::BUILTINS,
    atom::BUILTINS,
    io::BUILTINS,
    system::BUILTINS,
    host::BUILTINS,
    input::BUILTINS,
    dialog::BUILTINS,
];

pub fn core_registry() -> Registry {
    Registry::with_tables(CORE)
}

/// Bind every core builtin into `env`, returning how many were installed.
pub fn install_core(env: &Env) -> usize {
    core_registry().install(env)
}

pub(crate) fn int_arg(value: &Value) -> Result<i64, LispError> {
    match value {
        Value::Int(n) => Ok(*n),
        _ => Err(LispError::type_error("integer", value.type_name())),
    }
}

pub(crate) fn num_arg(value: &Value) -> Result<f64, LispError> {
    value
        .as_real()
        .ok_or_else(|| LispError::type_error("number", value.type_name()))
}

pub(crate) fn str_arg(value: &Value) -> Result<&str, LispError> {
    value
        .as_str()
        .ok_or_else(|| LispError::type_error("string", value.type_name()))
}

/// The elements of a list or vector; nil is the empty sequence.
pub(crate) fn seq_arg(value: &Value) -> Result<&[Value], LispError> {
    match value {
        Value::Nil => Ok(&[]),
        _ => value
            .as_seq()
            .ok_or_else(|| LispError::type_error("sequence", value.type_name())),
    }
}

/// AutoLISP-style predicate result: `T` for true, nil otherwise.
pub(crate) fn t_or_nil(b: bool) -> Value {
    if b {
        Value::Bool(true)
    } else {
        Value::Nil
    }
}

/// Equality used by `=`, `member?`, `assoc` and friends: numbers compare across
/// integer and real, lists and vectors compare element-wise.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(_), Value::Real(_)) | (Value::Real(_), Value::Int(_)) => {
            a.as_real() == b.as_real()
        }
        (Value::List(_) | Value::Vector(_), Value::List(_) | Value::Vector(_)) => {
            match (a.as_seq(), b.as_seq()) {
                (Some(xs), Some(ys)) => {
                    xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
                }
                _ => false,
            }
        }
        (Value::HashMap(x), Value::HashMap(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| values_equal(v, w)))
        }
        _ => a == b,
    }
}

pub(crate) fn print_values(args: &[Value], sep: &str, readably: bool) -> String {
    args.iter()
        .map(|v| v.print(readably))
        .collect::<Vec<_>>()
        .join(sep)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_core_binds_everything() {
        let env = Env::new();
        let count = install_core(&env);
        assert_eq!(count, core_registry().len());
        for name in [
            "+", "car", "strcase", "entget", "wcmatch", "vl-position", "getpoint", "new_dialog",
            "with-meta", "readline",
        ] {
            assert!(env.get_str(name).is_some(), "{name} missing");
        }
    }

    #[test]
    fn names_are_unique() {
        let registry = core_registry();
        let names = registry.names();
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), names.len());
    }

    #[test]
    fn cross_type_equality() {
        assert!(values_equal(&Value::Int(2), &Value::Real(2.0)));
        assert!(values_equal(
            &Value::list(vec![Value::Int(1)]),
            &Value::vector(vec![Value::Real(1.0)])
        ));
        assert!(!values_equal(&Value::string("1"), &Value::Int(1)));
    }
}
