use cadlisp_core::{builtin, check_arity, BuiltinDef, EvalContext, LispError, Value};
use regex::Regex;

use crate::{int_arg, print_values, str_arg, t_or_nil};

pub static BUILTINS: &[BuiltinDef] = &[
    builtin("str", str),
    builtin("pr-str", pr_str),
    builtin("strcase", strcase),
    builtin("strlen", strlen),
    builtin("substr", substr),
    builtin("ascii", ascii),
    builtin("chr", chr),
    builtin("atoi", atoi),
    builtin("atof", atof),
    builtin("symbol", symbol),
    builtin("keyword", keyword),
    builtin("read-string", read_string),
    builtin("wcmatch", wcmatch),
];

fn str(_: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    Ok(Value::string(&print_values(args, "", false)))
}

fn pr_str(_: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    Ok(Value::string(&print_values(args, " ", true)))
}

/// Upper-cases, or lower-cases when the optional flag is true.
fn strcase(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1..=2);
    let s = str_arg(&args[0])?;
    let lower = args.get(1).is_some_and(Value::is_truthy);
    Ok(Value::string(&if lower {
        s.to_lowercase()
    } else {
        s.to_uppercase()
    }))
}

/// Total character count of all string arguments.
fn strlen(_: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    let mut total = 0;
    for arg in args {
        total += str_arg(arg)?.chars().count();
    }
    Ok(Value::Int(total as i64))
}

/// `(substr s start [length])` with a 1-based start.
fn substr(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2..=3);
    let s = str_arg(&args[0])?;
    let start = int_arg(&args[1])?;
    if start < 1 {
        return Err(LispError::eval(format!("{name}: start must be at least 1")));
    }
    let skip = usize::try_from(start - 1).unwrap_or(usize::MAX);
    let chars = s.chars().skip(skip);
    let out: String = match args.get(2) {
        Some(len) => {
            let len = int_arg(len)?;
            chars.take(usize::try_from(len).unwrap_or(0)).collect()
        }
        None => chars.collect(),
    };
    Ok(Value::string(&out))
}

/// Code of the first character; 0 for an empty string or a non-string.
fn ascii(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    let code = args[0]
        .as_str()
        .and_then(|s| s.chars().next())
        .map_or(0, |c| c as i64);
    Ok(Value::Int(code))
}

fn chr(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    let code = match &args[0] {
        Value::Real(f) => *f as i64,
        other => int_arg(other)?,
    };
    let out = u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .map(String::from)
        .unwrap_or_default();
    Ok(Value::string(&out))
}

/// Length of the longest numeric prefix of `s`: sign, digits and, for reals,
/// a fraction and exponent.
fn numeric_prefix(s: &str, allow_real: bool) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    let digits_start = i;
    while bytes.get(i).is_some_and(u8::is_ascii_digit) {
        i += 1;
    }
    let mut has_digits = i > digits_start;
    if allow_real && bytes.get(i) == Some(&b'.') {
        let frac_start = i + 1;
        let mut j = frac_start;
        while bytes.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }
        if j > frac_start || has_digits {
            has_digits |= j > frac_start;
            i = j;
        }
    }
    if !has_digits {
        return 0;
    }
    if allow_real && matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_start = j;
        while bytes.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    i
}

/// Leading integer of a string, 0 when there is none.
fn atoi(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    let s = args[0].as_str().unwrap_or("").trim_start();
    let n = s[..numeric_prefix(s, false)].parse().unwrap_or(0);
    Ok(Value::Int(n))
}

/// Leading real of a string, 0.0 when there is none.
fn atof(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    let s = args[0].as_str().unwrap_or("").trim_start();
    let f = s[..numeric_prefix(s, true)].parse().unwrap_or(0.0);
    Ok(Value::Real(f))
}

fn symbol(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    Ok(Value::symbol(str_arg(&args[0])?))
}

fn keyword(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    match &args[0] {
        Value::Keyword(_) => Ok(args[0].clone()),
        Value::String(s) => Ok(Value::keyword(s.trim_start_matches(':'))),
        _ => Err(LispError::eval("keyword expects a keyword or string")),
    }
}

fn read_string(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 1);
    cadlisp_reader::read_str(str_arg(&args[0])?)
}

/// Translate one AutoLISP wildcard alternative into a regex body.
pub(crate) fn wildcard_to_regex(pattern: &str) -> String {
    let mut out = String::new();
    let mut chars = pattern.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '#' => out.push_str("[0-9]"),
            '@' => out.push_str("[[:alpha:]]"),
            '.' => out.push_str("[^[:alnum:]]"),
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '`' => {
                if let Some(escaped) = chars.next() {
                    out.push_str(&regex::escape(&escaped.to_string()));
                }
            }
            '[' => {
                out.push('[');
                if chars.peek() == Some(&'~') {
                    chars.next();
                    out.push('^');
                }
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                    match c {
                        '\\' | '[' | '^' | '&' | '~' => {
                            out.push('\\');
                            out.push(c);
                        }
                        _ => out.push(c),
                    }
                }
                out.push(']');
            }
            c => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out
}

/// Wildcard match. The pattern is a comma-separated list of alternatives;
/// a leading `~` negates an alternative.
fn wcmatch(name: &str, _: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
    check_arity!(args, name, 2);
    let text = str_arg(&args[0])?;
    let pattern = str_arg(&args[1])?;
    for alternative in pattern.split(',') {
        let (negated, body) = match alternative.strip_prefix('~') {
            Some(rest) if !rest.is_empty() => (true, rest),
            _ => (false, alternative),
        };
        let re = Regex::new(&format!("^(?s:{})$", wildcard_to_regex(body)))
            .map_err(|e| LispError::eval(format!("{name}: invalid pattern: {e}")))?;
        if re.is_match(text) != negated {
            return Ok(t_or_nil(true));
        }
    }
    Ok(Value::Nil)
}
