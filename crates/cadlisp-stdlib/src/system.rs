use std::cell::Cell;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use cadlisp_core::{
    builtin, check_arity, eval_callback, BuiltinDef, EvalContext, Lambda, LispError, NativeFn,
    Value,
};
use chrono::{DateTime, Datelike, Local, Timelike};
use regex::Regex;

use crate::string::wildcard_to_regex;
use crate::{int_arg, str_arg, t_or_nil};

pub static BUILTINS: &[BuiltinDef] = &[
    builtin("time-ms", time_ms),
    builtin("timeout", timeout),
    builtin("getenv", getenv),
    builtin("eval", eval),
    builtin("throw", throw),
    builtin("exit", exit),
    builtin("bound?", bound),
    builtin("boundp", bound),
    builtin("vl-filename-base", filename_base),
    builtin("vl-filename-directory", filename_directory),
    builtin("vl-filename-extension", filename_extension),
    builtin("vl-file-size", file_size),
    builtin("vl-file-delete", file_delete),
    builtin("vl-file-rename", file_rename),
    builtin("vl-file-directory-p", file_directory_p),
    builtin("vl-directory-files", directory_files),
    builtin("vl-mkdir", mkdir),
    builtin("vl-file-copy", file_copy),
    builtin("vl-file-systime", file_systime),
    builtin("vl-filename-mktemp", filename_mktemp),
    builtin("meta", meta),
    builtin("with-meta", with_meta),
];

thread_local! {
    static TEMP_COUNTER: Cell<u32> = const { Cell::new(0) };
}

fn time_ms(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 0);
    let ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| LispError::eval(e.to_string()))?
        .as_millis();
    Ok(Value::Int(ms as i64))
}

/// Block the interpreter for the given number of milliseconds.
fn timeout(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    let ms = int_arg(&args[0])?.max(0) as u64;
    std::thread::sleep(Duration::from_millis(ms));
    Ok(Value::Nil)
}

fn getenv(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    Ok(std::env::var(str_arg(&args[0])?).map_or(Value::Nil, |v| Value::string(&v)))
}

/// Evaluate a form in the global environment.
fn eval(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    eval_callback(ctx, &args[0], &ctx.root_env()?)
}

fn throw(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    Err(LispError::UserThrow(args[0].clone()))
}

/// Abort the running script; `try*` does not intercept this.
fn exit(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 0..=1);
    let code = match args.first() {
        Some(v) => i32::try_from(int_arg(v)?).unwrap_or(1),
        None => 0,
    };
    Err(LispError::Exit(code))
}

/// Whether a quoted symbol has a non-nil global value. `bound?` answers
/// true/false, `boundp` T/nil.
fn bound(name: &str, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    let is_bound = match args[0].as_symbol_spur() {
        Some(sym) => ctx
            .root_env()?
            .get(sym)
            .is_some_and(|v| !v.is_nil()),
        None => false,
    };
    if name == "boundp" {
        Ok(t_or_nil(is_bound))
    } else {
        Ok(Value::Bool(is_bound))
    }
}

fn filename_base(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    let stem = Path::new(str_arg(&args[0])?)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Value::string(&stem))
}

fn filename_directory(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    let path = Path::new(str_arg(&args[0])?);
    let dir = path
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Value::string(&dir))
}

/// The extension with its leading dot, or nil.
fn filename_extension(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    Ok(Path::new(str_arg(&args[0])?)
        .extension()
        .map_or(Value::Nil, |ext| {
            Value::string(&format!(".{}", ext.to_string_lossy()))
        }))
}

/// Size in bytes, 0 for a directory, nil when missing.
fn file_size(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    match std::fs::metadata(str_arg(&args[0])?) {
        Ok(meta) if meta.is_dir() => Ok(Value::Int(0)),
        Ok(meta) => Ok(Value::Int(meta.len() as i64)),
        Err(_) => Ok(Value::Nil),
    }
}

fn file_delete(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    Ok(t_or_nil(std::fs::remove_file(str_arg(&args[0])?).is_ok()))
}

/// Fails (nil) when the source is missing or the target already exists.
fn file_rename(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2);
    let from = str_arg(&args[0])?;
    let to = str_arg(&args[1])?;
    if !Path::new(from).exists() || Path::new(to).exists() {
        return Ok(Value::Nil);
    }
    Ok(t_or_nil(std::fs::rename(from, to).is_ok()))
}

fn file_directory_p(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    Ok(t_or_nil(Path::new(str_arg(&args[0])?).is_dir()))
}

/// `(vl-directory-files [dir [pattern [what]]])` lists entry names sorted by
/// name. `what` is -1 for directories only, 1 for files only, 0 for both.
fn directory_files(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 0..=3);
    let dir = match args.first() {
        None | Some(Value::Nil) => ".",
        Some(v) => str_arg(v)?,
    };
    let pattern = match args.get(1) {
        None | Some(Value::Nil) => None,
        Some(v) => {
            let re = format!("^(?s:{})$", wildcard_to_regex(str_arg(v)?));
            Some(Regex::new(&re).map_err(|e| LispError::eval(format!("{name}: {e}")))?)
        }
    };
    let what = match args.get(2) {
        None | Some(Value::Nil) => 0,
        Some(v) => int_arg(v)?,
    };
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Ok(Value::Nil);
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(LispError::io)?;
        let is_dir = entry.path().is_dir();
        if (what < 0 && !is_dir) || (what > 0 && is_dir) {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if pattern.as_ref().is_some_and(|re| !re.is_match(&file_name)) {
            continue;
        }
        names.push(file_name);
    }
    names.sort();
    Ok(Value::list(names.iter().map(|n| Value::string(n)).collect()))
}

fn mkdir(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    Ok(t_or_nil(std::fs::create_dir(str_arg(&args[0])?).is_ok()))
}

/// `(vl-file-copy from to [append])` returns the number of bytes copied.
/// Without `append` an existing target is left alone and the result is nil.
fn file_copy(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2..=3);
    let from = str_arg(&args[0])?;
    let to = str_arg(&args[1])?;
    let append = args.get(2).is_some_and(Value::is_truthy);
    if !Path::new(from).is_file() {
        return Ok(Value::Nil);
    }
    let copied = if append {
        let Ok(data) = std::fs::read(from) else {
            return Ok(Value::Nil);
        };
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(to)
            .and_then(|mut f| f.write_all(&data))
            .ok()
            .map(|()| data.len() as u64)
    } else if Path::new(to).exists() {
        None
    } else {
        std::fs::copy(from, to).ok()
    };
    Ok(copied.map_or(Value::Nil, |n| Value::Int(n as i64)))
}

/// Last modification time in local time as
/// `(year month weekday day hours minutes seconds milliseconds)`, weekday 0 for Sunday.
fn file_systime(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    let Ok(modified) = std::fs::metadata(str_arg(&args[0])?).and_then(|m| m.modified()) else {
        return Ok(Value::Nil);
    };
    let t: DateTime<Local> = modified.into();
    let fields = [
        i64::from(t.year()),
        i64::from(t.month()),
        i64::from(t.weekday().num_days_from_sunday()),
        i64::from(t.day()),
        i64::from(t.hour()),
        i64::from(t.minute()),
        i64::from(t.second()),
        i64::from(t.timestamp_subsec_millis()),
    ];
    Ok(Value::list(fields.into_iter().map(Value::Int).collect()))
}

fn optional_str(args: &[Value], index: usize) -> Result<Option<&str>, LispError> {
    match args.get(index) {
        None | Some(Value::Nil) => Ok(None),
        Some(v) => str_arg(v).map(Some),
    }
}

/// `(vl-filename-mktemp [pattern [dir [ext]]])` names a file that does not
/// exist yet: the pattern's stem plus three hex digits. An absolute pattern
/// keeps its directory, otherwise `dir` or the system temp directory is used.
fn filename_mktemp(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 0..=3);
    let pattern = Path::new(optional_str(args, 0)?.unwrap_or("tmpfile_"));
    let stem = pattern
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = match optional_str(args, 2)? {
        Some(ext) if ext.starts_with('.') || ext.is_empty() => ext.to_string(),
        Some(ext) => format!(".{ext}"),
        None => pattern
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default(),
    };
    let dir = match (pattern.is_absolute(), optional_str(args, 1)?) {
        (true, _) => pattern.parent().map(Path::to_path_buf).unwrap_or_default(),
        (false, Some(dir)) => PathBuf::from(dir),
        (false, None) => std::env::temp_dir(),
    };
    for _ in 0..0x1000 {
        let n = TEMP_COUNTER.with(|c| {
            let next = (c.get() + 1) % 0x1000;
            c.set(next);
            next
        });
        let candidate = dir.join(format!("{stem}{n:03x}{ext}"));
        if !candidate.exists() {
            return Ok(Value::string(&candidate.to_string_lossy()));
        }
    }
    Ok(Value::Nil)
}

/// Metadata attached to a function with `with-meta`; nil for anything else.
fn meta(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    Ok(match &args[0] {
        Value::Lambda(lambda) => lambda.meta.clone(),
        Value::BuiltIn(native) => native.meta.clone(),
        _ => Value::Nil,
    })
}

/// A copy of the function carrying `meta`; the original is unchanged.
fn with_meta(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2);
    let meta = args[1].clone();
    match &args[0] {
        Value::Lambda(lambda) => Ok(Value::lambda(Lambda {
            meta,
            ..(**lambda).clone()
        })),
        Value::BuiltIn(native) => Ok(Value::native_fn(NativeFn::with_meta(
            native.clone(),
            meta,
        ))),
        other => Err(LispError::type_error("function", other.type_name())),
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{call, call_with, int};
    use cadlisp_core::{intern, Env, EvalContext, LispError, NativeFn, Value};

    fn s(text: &str) -> Value {
        Value::string(text)
    }

    fn path_in(dir: &tempfile::TempDir, name: &str) -> String {
        dir.path().join(name).to_string_lossy().into_owned()
    }

    #[test]
    fn test_throw_and_exit() {
        match call("throw", &[int(7)]) {
            Err(LispError::UserThrow(v)) => assert_eq!(v, int(7)),
            other => panic!("expected throw, got {other:?}"),
        }
        assert!(matches!(call("exit", &[]), Err(LispError::Exit(0))));
        assert!(matches!(call("exit", &[int(3)]), Err(LispError::Exit(3))));
    }

    #[test]
    fn test_bound_checks_global_env() {
        let ctx = EvalContext::new();
        let env = Env::new();
        env.set(intern("x"), int(1));
        env.set(intern("empty"), Value::Nil);
        ctx.set_root_env(env);
        let bound = |name: &str, sym: &str| call_with(&ctx, name, &[Value::symbol(sym)]).unwrap();
        assert_eq!(bound("bound?", "x"), Value::Bool(true));
        assert_eq!(bound("bound?", "empty"), Value::Bool(false));
        assert_eq!(bound("boundp", "y"), Value::Nil);
        assert_eq!(bound("boundp", "x"), Value::Bool(true));
    }

    #[test]
    fn test_eval_needs_evaluator() {
        let ctx = EvalContext::new();
        ctx.set_root_env(Env::new());
        assert!(call_with(&ctx, "eval", &[int(1)]).is_err());
    }

    #[test]
    fn test_getenv_missing() {
        assert_eq!(
            call("getenv", &[s("CADLISP_SURELY_UNSET_VARIABLE")]).unwrap(),
            Value::Nil
        );
    }

    #[test]
    fn test_time_ms_is_positive() {
        assert!(matches!(call("time-ms", &[]).unwrap(), Value::Int(n) if n > 0));
        assert_eq!(call("timeout", &[int(0)]).unwrap(), Value::Nil);
    }

    #[test]
    fn test_filename_parts() {
        let p = s("/drawings/site/plan.dxf");
        assert_eq!(call("vl-filename-base", &[p.clone()]).unwrap(), s("plan"));
        assert_eq!(call("vl-filename-directory", &[p.clone()]).unwrap(), s("/drawings/site"));
        assert_eq!(call("vl-filename-extension", &[p]).unwrap(), s(".dxf"));
        assert_eq!(call("vl-filename-extension", &[s("README")]).unwrap(), Value::Nil);
        assert_eq!(call("vl-filename-directory", &[s("plan.dxf")]).unwrap(), s(""));
    }

    #[test]
    fn test_file_operations() {
        let dir = tempfile::tempdir().unwrap();
        let a = path_in(&dir, "a.lsp");
        let b = path_in(&dir, "b.lsp");
        std::fs::write(&a, "(princ)").unwrap();

        assert_eq!(call("vl-file-size", &[s(&a)]).unwrap(), int(7));
        assert_eq!(call("vl-file-rename", &[s(&a), s(&b)]).unwrap(), Value::Bool(true));
        assert_eq!(call("vl-file-size", &[s(&a)]).unwrap(), Value::Nil);
        assert_eq!(call("vl-file-delete", &[s(&b)]).unwrap(), Value::Bool(true));
        assert_eq!(call("vl-file-delete", &[s(&b)]).unwrap(), Value::Nil);
    }

    #[test]
    fn test_directories() {
        let dir = tempfile::tempdir().unwrap();
        let sub = path_in(&dir, "blocks");
        assert_eq!(call("vl-mkdir", &[s(&sub)]).unwrap(), Value::Bool(true));
        assert_eq!(call("vl-mkdir", &[s(&sub)]).unwrap(), Value::Nil);
        assert_eq!(call("vl-file-directory-p", &[s(&sub)]).unwrap(), Value::Bool(true));
        assert_eq!(call("vl-file-size", &[s(&sub)]).unwrap(), int(0));

        std::fs::write(path_in(&dir, "b.lsp"), "").unwrap();
        std::fs::write(path_in(&dir, "a.lsp"), "").unwrap();
        std::fs::write(path_in(&dir, "notes.txt"), "").unwrap();
        let root = s(&dir.path().to_string_lossy());

        assert_eq!(
            call("vl-directory-files", &[root.clone(), s("*.lsp")]).unwrap(),
            Value::list(vec![s("a.lsp"), s("b.lsp")])
        );
        assert_eq!(
            call("vl-directory-files", &[root.clone(), Value::Nil, int(-1)]).unwrap(),
            Value::list(vec![s("blocks")])
        );
        assert_eq!(
            call("vl-directory-files", &[root, Value::Nil, int(1)]).unwrap(),
            Value::list(vec![s("a.lsp"), s("b.lsp"), s("notes.txt")])
        );
        assert_eq!(
            call("vl-directory-files", &[s(&path_in(&dir, "nope"))]).unwrap(),
            Value::Nil
        );
    }

    #[test]
    fn test_file_copy() {
        let dir = tempfile::tempdir().unwrap();
        let a = path_in(&dir, "a.lsp");
        let b = path_in(&dir, "b.lsp");
        std::fs::write(&a, "(princ)").unwrap();

        assert_eq!(call("vl-file-copy", &[s(&a), s(&b)]).unwrap(), int(7));
        assert_eq!(call("vl-file-copy", &[s(&a), s(&b)]).unwrap(), Value::Nil);
        let t = Value::Bool(true);
        assert_eq!(call("vl-file-copy", &[s(&a), s(&b), t]).unwrap(), int(7));
        assert_eq!(std::fs::read_to_string(&b).unwrap(), "(princ)(princ)");
        let missing = path_in(&dir, "missing.lsp");
        assert_eq!(call("vl-file-copy", &[s(&missing), s(&b)]).unwrap(), Value::Nil);
    }

    #[test]
    fn test_file_systime() {
        let dir = tempfile::tempdir().unwrap();
        let a = path_in(&dir, "a.lsp");
        std::fs::write(&a, "").unwrap();
        let stamp = call("vl-file-systime", &[s(&a)]).unwrap();
        let fields = stamp.as_list().unwrap();
        assert_eq!(fields.len(), 8);
        assert!(matches!(fields[0], Value::Int(y) if y >= 2000));
        assert!(matches!(fields[1], Value::Int(m) if (1..=12).contains(&m)));
        assert!(matches!(fields[2], Value::Int(w) if (0..=6).contains(&w)));
        assert_eq!(
            call("vl-file-systime", &[s(&path_in(&dir, "nope"))]).unwrap(),
            Value::Nil
        );
    }

    #[test]
    fn test_filename_mktemp() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_string_lossy().into_owned();
        let first = call("vl-filename-mktemp", &[s("plot.plt"), s(&root)]).unwrap();
        let first = first.as_str().unwrap().to_string();
        let path = std::path::Path::new(&first);
        assert_eq!(path.parent(), Some(dir.path()));
        let file_name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(file_name.starts_with("plot") && file_name.ends_with(".plt"));
        assert_eq!(file_name.len(), "plot".len() + 3 + ".plt".len());

        std::fs::write(&first, "").unwrap();
        let second = call("vl-filename-mktemp", &[s("plot.plt"), s(&root)]).unwrap();
        assert_ne!(second.as_str().unwrap(), first);

        let absolute = path_in(&dir, "log.txt");
        let named = call("vl-filename-mktemp", &[s(&absolute), Value::Nil, s("csv")]).unwrap();
        assert!(named.as_str().unwrap().ends_with(".csv"));
        assert!(named.as_str().unwrap().starts_with(&root));
    }

    #[test]
    fn test_meta_on_builtins() {
        let seven = Value::native_fn(NativeFn::simple("seven", |_| Ok(int(7))));
        assert_eq!(call("meta", &[seven.clone()]).unwrap(), Value::Nil);
        let tagged = call("with-meta", &[seven.clone(), Value::keyword("pure")]).unwrap();
        assert_eq!(call("meta", &[tagged.clone()]).unwrap(), Value::keyword("pure"));
        assert_eq!(call("meta", &[seven]).unwrap(), Value::Nil);
        match tagged {
            Value::BuiltIn(f) => assert_eq!(f.call(&EvalContext::new(), &[]).unwrap(), int(7)),
            other => panic!("expected builtin, got {other:?}"),
        }
        assert_eq!(call("meta", &[int(1)]).unwrap(), Value::Nil);
        assert!(call("with-meta", &[int(1), Value::Nil]).is_err());
    }
}
