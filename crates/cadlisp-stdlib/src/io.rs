use std::io::{BufRead, Read, Write};
use std::rc::Rc;

use cadlisp_core::{
    builtin, check_arity, BuiltinDef, EvalContext, FileMode, LispError, LispFile, Value,
};

use crate::{int_arg, print_values, str_arg};

pub static BUILTINS: &[BuiltinDef] = &[
    builtin("prn", prn),
    builtin("println", println),
    builtin("princ", princ),
    builtin("prin1", prin1),
    builtin("print", print),
    builtin("terpri", terpri),
    builtin("slurp", slurp),
    builtin("open", open),
    builtin("close", close),
    builtin("read-line", read_line),
    builtin("readline", readline),
    builtin("write-line", write_line),
    builtin("read-char", read_char),
    builtin("write-char", write_char),
];

fn file_arg(value: &Value) -> Result<&LispFile, LispError> {
    match value {
        Value::File(file) => Ok(file),
        _ => Err(LispError::type_error("file", value.type_name())),
    }
}

/// Optional trailing file argument; nil means standard output.
fn target(args: &[Value], index: usize) -> Result<Option<&LispFile>, LispError> {
    match args.get(index) {
        None | Some(Value::Nil) => Ok(None),
        Some(v) => file_arg(v).map(Some),
    }
}

fn emit(file: Option<&LispFile>, text: &str) -> Result<(), LispError> {
    match file {
        Some(f) => f.write_str(text),
        None => {
            let mut out = std::io::stdout().lock();
            out.write_all(text.as_bytes()).map_err(LispError::io)?;
            out.flush().map_err(LispError::io)
        }
    }
}

fn prn(_: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    emit(None, &format!("{}\n", print_values(args, " ", true)))?;
    Ok(Value::Nil)
}

fn println(_: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    emit(None, &format!("{}\n", print_values(args, " ", false)))?;
    Ok(Value::Nil)
}

/// Shared body of `princ`, `prin1` and `print`: `(f [value [file]])` writes the
/// value and returns it. With no value they write a newline.
fn print_one(
    name: &str,
    args: &[Value],
    readably: bool,
    decorate: fn(String) -> String,
) -> Result<Value, LispError> {
    check_arity!(args, name, 0..=2);
    let Some(value) = args.first() else {
        emit(None, "\n")?;
        return Ok(Value::Nil);
    };
    emit(target(args, 1)?, &decorate(value.print(readably)))?;
    Ok(value.clone())
}

fn princ(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    print_one(name, args, false, |s| s)
}

fn prin1(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    print_one(name, args, true, |s| s)
}

fn print(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    print_one(name, args, true, |s| format!("\n{s} "))
}

fn terpri(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 0);
    emit(None, "\n")?;
    Ok(Value::Nil)
}

fn slurp(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    let path = str_arg(&args[0])?;
    let text = std::fs::read_to_string(path)
        .map_err(|e| LispError::Io(format!("Cannot open {path}: {e}")))?;
    Ok(Value::string(&text))
}

/// `(open path mode)`; nil when the file cannot be opened.
fn open(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2);
    let path = str_arg(&args[0])?;
    let mode_str = str_arg(&args[1])?;
    let mode = FileMode::parse(mode_str)
        .ok_or_else(|| LispError::eval(format!("{name}: invalid mode \"{mode_str}\"")))?;
    match LispFile::open(path, mode) {
        Ok(file) => Ok(Value::File(Rc::new(file))),
        Err(e) => {
            tracing::debug!(path, error = %e, "open failed");
            Ok(Value::Nil)
        }
    }
}

fn close(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    file_arg(&args[0])?.close()?;
    Ok(Value::Nil)
}

fn stdin_line() -> Result<Option<String>, LispError> {
    let mut line = String::new();
    let n = std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(LispError::io)?;
    if n == 0 {
        return Ok(None);
    }
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Some(line))
}

/// Next line from the file, or from standard input without one; nil at end.
fn read_line(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 0..=1);
    let line = match target(args, 0)? {
        Some(file) => file.read_line()?,
        None => stdin_line()?,
    };
    Ok(line.map_or(Value::Nil, |l| Value::string(&l)))
}

/// `(readline prompt)` prints the prompt and reads a line from standard input.
fn readline(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    let prompt = str_arg(&args[0])?;
    emit(None, prompt)?;
    Ok(stdin_line()?.map_or(Value::Nil, |l| Value::string(&l)))
}

fn write_line(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1..=2);
    let text = str_arg(&args[0])?;
    emit(target(args, 1)?, &format!("{text}\n"))?;
    Ok(args[0].clone())
}

/// Character code of the next character, nil at end of input.
fn read_char(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 0..=1);
    let ch = match target(args, 0)? {
        Some(file) => file.read_char()?,
        None => {
            let mut byte = [0u8; 1];
            match std::io::stdin().lock().read(&mut byte).map_err(LispError::io)? {
                0 => None,
                _ => Some(char::from(byte[0])),
            }
        }
    };
    Ok(ch.map_or(Value::Nil, |c| Value::Int(c as i64)))
}

fn write_char(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1..=2);
    let code = int_arg(&args[0])?;
    let ch = u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| LispError::eval(format!("{name}: invalid character code {code}")))?;
    emit(target(args, 1)?, &ch.to_string())?;
    Ok(args[0].clone())
}

#[cfg(test)]
mod tests {
    use crate::testing::{call, int};
    use cadlisp_core::Value;

    fn s(text: &str) -> Value {
        Value::string(text)
    }

    fn path_value(dir: &tempfile::TempDir, name: &str) -> Value {
        s(dir.path().join(name).to_str().unwrap())
    }

    #[test]
    fn test_write_then_read_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = path_value(&dir, "out.txt");

        let f = call("open", &[path.clone(), s("w")]).unwrap();
        assert!(matches!(f, Value::File(_)));
        assert_eq!(call("write-line", &[s("first"), f.clone()]).unwrap(), s("first"));
        call("princ", &[int(42), f.clone()]).unwrap();
        call("write-char", &[int(10), f.clone()]).unwrap();
        call("prin1", &[s("q"), f.clone()]).unwrap();
        call("close", &[f]).unwrap();

        let f = call("open", &[path.clone(), s("r")]).unwrap();
        assert_eq!(call("read-line", &[f.clone()]).unwrap(), s("first"));
        assert_eq!(call("read-char", &[f.clone()]).unwrap(), int('4' as i64));
        assert_eq!(call("read-line", &[f.clone()]).unwrap(), s("2"));
        assert_eq!(call("read-line", &[f.clone()]).unwrap(), s("\"q\""));
        assert_eq!(call("read-line", &[f.clone()]).unwrap(), Value::Nil);
        call("close", &[f]).unwrap();

        assert_eq!(call("slurp", &[path]).unwrap(), s("first\n42\n\"q\""));
    }

    #[test]
    fn test_append_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = path_value(&dir, "log.txt");
        for line in ["a", "b"] {
            let f = call("open", &[path.clone(), s("a")]).unwrap();
            call("write-line", &[s(line), f.clone()]).unwrap();
            call("close", &[f]).unwrap();
        }
        assert_eq!(call("slurp", &[path]).unwrap(), s("a\nb\n"));
    }

    #[test]
    fn test_open_failures() {
        let dir = tempfile::tempdir().unwrap();
        let missing = path_value(&dir, "missing.txt");
        assert_eq!(call("open", &[missing.clone(), s("r")]).unwrap(), Value::Nil);
        assert!(call("open", &[missing.clone(), s("x")]).is_err());
        assert!(call("slurp", &[missing]).is_err());
    }

    #[test]
    fn test_reading_a_write_handle_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let f = call("open", &[path_value(&dir, "w.txt"), s("w")]).unwrap();
        assert!(call("read-line", &[f.clone()]).is_err());
        call("close", &[f]).unwrap();
    }

    #[test]
    fn test_readline_needs_a_prompt_string() {
        assert!(call("readline", &[]).is_err());
        assert!(call("readline", &[int(1)]).is_err());
    }

    #[test]
    fn test_print_returns_value() {
        assert_eq!(call("princ", &[s("")]).unwrap(), s(""));
        assert!(call("princ", &[int(1), int(2)]).is_err());
    }
}
