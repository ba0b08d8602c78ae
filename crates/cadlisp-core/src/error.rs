use std::fmt;

use crate::value::Value;

/// Check arity of a builtin's arguments, returning `LispError::Arity` on mismatch.
///
/// # Forms
///
/// ```ignore
/// check_arity!(args, name, 2);        // exactly 2
/// check_arity!(args, name, 1..=3);    // 1 to 3 inclusive
/// check_arity!(args, name, 2..);      // 2 or more
/// ```
#[macro_export]
macro_rules! check_arity {
    ($args:expr, $name:expr, $exact:literal) => {
        $crate::check_args_is($name, $exact, $args.len())?;
    };
    ($args:expr, $name:expr, $lo:literal ..= $hi:literal) => {
        $crate::check_args_between($name, $lo, $hi, $args.len())?;
    };
    ($args:expr, $name:expr, $lo:literal ..) => {
        $crate::check_args_at_least($name, $lo, $args.len())?;
    };
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Fails unless exactly `expected` arguments were supplied.
pub fn check_args_is(name: &str, expected: usize, got: usize) -> Result<usize, LispError> {
    if got != expected {
        return Err(LispError::arity(
            name,
            format!("{expected} arg{}", plural(expected)),
            got,
        ));
    }
    Ok(got)
}

pub fn check_args_between(
    name: &str,
    min: usize,
    max: usize,
    got: usize,
) -> Result<usize, LispError> {
    if got < min || got > max {
        return Err(LispError::arity(
            name,
            format!("between {min} and {max} arg{}", plural(max)),
            got,
        ));
    }
    Ok(got)
}

pub fn check_args_at_least(name: &str, min: usize, got: usize) -> Result<usize, LispError> {
    if got < min {
        return Err(LispError::arity(
            name,
            format!("at least {min} arg{}", plural(min)),
            got,
        ));
    }
    Ok(got)
}

pub fn check_args_even(name: &str, got: usize) -> Result<usize, LispError> {
    if got % 2 != 0 {
        return Err(LispError::arity(name, "an even number of args", got));
    }
    Ok(got)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

impl Span {
    pub fn point(line: usize, col: usize) -> Self {
        Span { line, col }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// A single frame in a call stack trace.
#[derive(Debug, Clone)]
pub struct CallFrame {
    pub name: String,
}

/// A captured stack trace (innermost first).
#[derive(Debug, Clone)]
pub struct StackTrace(pub Vec<CallFrame>);

impl fmt::Display for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for frame in &self.0 {
            writeln!(f, "  at {}", frame.name)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum LispError {
    #[error("Syntax error at {span}: {message}")]
    Reader { message: String, span: Span },

    #[error("'{0}' not found")]
    Unbound(String),

    #[error("\"{name}\" expects {expected}, {got} supplied")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },

    #[error("Type error: expected {expected}, got {got}")]
    Type { expected: String, got: String },

    #[error("Division by zero")]
    DivideByZero,

    #[error("Exception: {0}")]
    UserThrow(Value),

    #[error("Eval error: {0}")]
    Eval(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Host error: {0}")]
    Host(String),

    #[error("exit requested with status {0}")]
    Exit(i32),

    #[error("{inner}")]
    WithTrace {
        inner: Box<LispError>,
        trace: StackTrace,
    },
}

impl LispError {
    pub fn eval(msg: impl Into<String>) -> Self {
        LispError::Eval(msg.into())
    }

    pub fn type_error(expected: impl Into<String>, got: impl Into<String>) -> Self {
        LispError::Type {
            expected: expected.into(),
            got: got.into(),
        }
    }

    pub fn arity(name: impl Into<String>, expected: impl Into<String>, got: usize) -> Self {
        LispError::Arity {
            name: name.into(),
            expected: expected.into(),
            got,
        }
    }

    pub fn io(err: impl fmt::Display) -> Self {
        LispError::Io(err.to_string())
    }

    pub fn host(msg: impl Into<String>) -> Self {
        LispError::Host(msg.into())
    }

    /// Wrap this error with a stack trace (no-op if already wrapped).
    pub fn with_stack_trace(self, trace: StackTrace) -> Self {
        if trace.0.is_empty() {
            return self;
        }
        match self {
            LispError::WithTrace { .. } => self,
            other => LispError::WithTrace {
                inner: Box::new(other),
                trace,
            },
        }
    }

    pub fn stack_trace(&self) -> Option<&StackTrace> {
        match self {
            LispError::WithTrace { trace, .. } => Some(trace),
            _ => None,
        }
    }

    pub fn inner(&self) -> &LispError {
        match self {
            LispError::WithTrace { inner, .. } => inner.inner(),
            other => other,
        }
    }

    /// Whether `try*` may intercept this error. Only `exit` unwinds past it.
    pub fn is_catchable(&self) -> bool {
        !matches!(self.inner(), LispError::Exit(_))
    }

    /// The value a `catch*` handler binds: a thrown value as-is, otherwise the message.
    pub fn to_value(&self) -> Value {
        match self.inner() {
            LispError::UserThrow(val) => val.clone(),
            other => Value::string(&other.to_string()),
        }
    }
}
