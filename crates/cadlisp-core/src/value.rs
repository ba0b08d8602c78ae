use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use lasso::{Rodeo, Spur};

use crate::context::EvalContext;
use crate::env::Env;
use crate::error::LispError;
use crate::file::LispFile;
use crate::registry::BuiltinDef;

thread_local! {
    static INTERNER: RefCell<Rodeo> = RefCell::new(Rodeo::default());
}

/// Intern a string, returning a Spur key.
pub fn intern(s: &str) -> Spur {
    INTERNER.with(|r| r.borrow_mut().get_or_intern(s))
}

/// Resolve a Spur key back to a String.
pub fn resolve(spur: Spur) -> String {
    INTERNER.with(|r| r.borrow().resolve(&spur).to_string())
}

/// Resolve a Spur and call f with the &str, avoiding allocation.
pub fn with_resolved<F, R>(spur: Spur, f: F) -> R
where
    F: FnOnce(&str) -> R,
{
    INTERNER.with(|r| {
        let interner = r.borrow();
        f(interner.resolve(&spur))
    })
}

/// Compare two Spurs by their resolved string content (lexicographic).
pub fn compare_spurs(a: Spur, b: Spur) -> std::cmp::Ordering {
    if a == b {
        return std::cmp::Ordering::Equal;
    }
    INTERNER.with(|r| {
        let interner = r.borrow();
        interner.resolve(&a).cmp(interner.resolve(&b))
    })
}

/// A native function callable from Lisp code.
pub type NativeFnInner = dyn Fn(&EvalContext, &[Value]) -> Result<Value, LispError>;

pub struct NativeFn {
    pub name: String,
    pub func: Box<NativeFnInner>,
    /// Attached by `with-meta`; nil otherwise.
    pub meta: Value,
}

impl NativeFn {
    pub fn simple(
        name: impl Into<String>,
        f: impl Fn(&[Value]) -> Result<Value, LispError> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Box::new(move |_ctx, args| f(args)),
            meta: Value::Nil,
        }
    }

    pub fn with_ctx(
        name: impl Into<String>,
        f: impl Fn(&EvalContext, &[Value]) -> Result<Value, LispError> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Box::new(f),
            meta: Value::Nil,
        }
    }

    /// Wrap a registry entry. The entry's function receives the name it was bound under.
    pub fn from_def(def: &BuiltinDef) -> Self {
        let name = def.name;
        let func = def.func;
        Self {
            name: name.to_string(),
            func: Box::new(move |ctx, args| func(name, ctx, args)),
            meta: Value::Nil,
        }
    }

    pub fn call(&self, ctx: &EvalContext, args: &[Value]) -> Result<Value, LispError> {
        (self.func)(ctx, args)
    }

    /// A new builtin calling `inner`, carrying `meta`.
    pub fn with_meta(inner: Rc<NativeFn>, meta: Value) -> Self {
        Self {
            name: inner.name.clone(),
            func: Box::new(move |ctx, args| inner.call(ctx, args)),
            meta,
        }
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<builtin {}>", self.name)
    }
}

/// A user-defined function or macro: parameter names, a body form and the captured scope.
#[derive(Debug, Clone)]
pub struct Lambda {
    pub params: Vec<Spur>,
    pub body: Value,
    pub env: Env,
    pub is_macro: bool,
    pub name: Option<Spur>,
    pub meta: Value,
}

/// The core Value type for all interpreter data.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Real(f64),
    String(Rc<String>),
    Symbol(Spur),
    Keyword(Spur),
    List(Rc<Vec<Value>>),
    Vector(Rc<Vec<Value>>),
    HashMap(Rc<hashbrown::HashMap<Value, Value>>),
    Atom(Rc<RefCell<Value>>),
    Lambda(Rc<Lambda>),
    BuiltIn(Rc<NativeFn>),
    File(Rc<LispFile>),
    Ename(u64),
    SelectionSet(u64),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Real(_) => "real",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Keyword(_) => "keyword",
            Value::List(_) => "list",
            Value::Vector(_) => "vector",
            Value::HashMap(_) => "map",
            Value::Atom(_) => "atom",
            Value::Lambda(l) if l.is_macro => "macro",
            Value::Lambda(_) => "function",
            Value::BuiltIn(_) => "builtin",
            Value::File(_) => "file",
            Value::Ename(_) => "entity",
            Value::SelectionSet(_) => "selection set",
        }
    }

    /// The AutoLISP-style type tag reported by `type?`.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Value::Nil => "NIL",
            Value::Bool(_) => "BOOL",
            Value::Int(_) => "INT",
            Value::Real(_) => "REAL",
            Value::String(_) => "STR",
            Value::Symbol(_) => "SYM",
            Value::Keyword(_) => "KEYWORD",
            Value::List(_) => "LIST",
            Value::Vector(_) => "VECTOR",
            Value::HashMap(_) => "MAP",
            Value::Atom(_) => "ATOM",
            Value::Lambda(_) => "USUBR",
            Value::BuiltIn(_) => "SUBR",
            Value::File(_) => "FILE",
            Value::Ename(_) => "ENAME",
            Value::SelectionSet(_) => "PICKSET",
        }
    }

    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Real(_))
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Lambda(_) | Value::BuiltIn(_))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view; integers widen to f64.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<String> {
        match self {
            Value::Symbol(s) => Some(resolve(*s)),
            _ => None,
        }
    }

    pub fn as_symbol_spur(&self) -> Option<Spur> {
        match self {
            Value::Symbol(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_keyword_spur(&self) -> Option<Spur> {
        match self {
            Value::Keyword(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    /// Elements of a list or vector.
    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) | Value::Vector(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_symbol_named(&self, name: &str) -> bool {
        match self {
            Value::Symbol(s) => with_resolved(*s, |n| n == name),
            _ => false,
        }
    }

    pub fn symbol(s: &str) -> Value {
        Value::Symbol(intern(s))
    }

    pub fn keyword(s: &str) -> Value {
        Value::Keyword(intern(s))
    }

    pub fn string(s: &str) -> Value {
        Value::String(Rc::new(s.to_string()))
    }

    pub fn list(v: Vec<Value>) -> Value {
        Value::List(Rc::new(v))
    }

    pub fn empty_list() -> Value {
        Value::List(Rc::new(Vec::new()))
    }

    pub fn vector(v: Vec<Value>) -> Value {
        Value::Vector(Rc::new(v))
    }

    pub fn hashmap(entries: Vec<(Value, Value)>) -> Value {
        let map: hashbrown::HashMap<Value, Value> = entries.into_iter().collect();
        Value::HashMap(Rc::new(map))
    }

    pub fn atom(v: Value) -> Value {
        Value::Atom(Rc::new(RefCell::new(v)))
    }

    pub fn bool(b: bool) -> Value {
        Value::Bool(b)
    }

    pub fn native_fn(f: NativeFn) -> Value {
        Value::BuiltIn(Rc::new(f))
    }

    pub fn lambda(l: Lambda) -> Value {
        Value::Lambda(Rc::new(l))
    }

    /// A two-element cons cell `(head . tail)`.
    pub fn dotted_pair(head: Value, tail: Value) -> Value {
        Value::list(vec![head, Value::symbol("."), tail])
    }

    /// Whether this is a list ending in the `. tail` suffix.
    pub fn is_dotted(&self) -> bool {
        match self {
            Value::List(items) => is_dotted(items),
            _ => false,
        }
    }

    /// Render the value. Readable output quotes and escapes strings so the reader
    /// can parse it back.
    pub fn print(&self, readably: bool) -> String {
        let mut out = String::new();
        write_value(&mut out, self, readably);
        out
    }
}

/// Whether a slice of list items encodes a dotted list.
pub fn is_dotted(items: &[Value]) -> bool {
    items.len() >= 3 && items[items.len() - 2].is_symbol_named(".")
}

/// The tail of a dotted list, if the items encode one.
pub fn dotted_tail(items: &[Value]) -> Option<&Value> {
    if is_dotted(items) {
        items.last()
    } else {
        None
    }
}

fn write_seq(out: &mut String, items: &[Value], open: char, close: char, readably: bool) {
    out.push(open);
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        write_value(out, item, readably);
    }
    out.push(close);
}

fn write_value(out: &mut String, value: &Value, readably: bool) {
    use std::fmt::Write as _;
    match value {
        Value::Nil => out.push_str("nil"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Int(n) => {
            let _ = write!(out, "{n}");
        }
        Value::Real(n) => {
            if n.is_finite() && n.fract() == 0.0 {
                let _ = write!(out, "{n:.1}");
            } else {
                let _ = write!(out, "{n}");
            }
        }
        Value::String(s) => {
            if readably {
                out.push('"');
                for ch in s.chars() {
                    match ch {
                        '"' => out.push_str("\\\""),
                        '\\' => out.push_str("\\\\"),
                        '\n' => out.push_str("\\n"),
                        '\t' => out.push_str("\\t"),
                        '\r' => out.push_str("\\r"),
                        c => out.push(c),
                    }
                }
                out.push('"');
            } else {
                out.push_str(s);
            }
        }
        Value::Symbol(s) => with_resolved(*s, |name| out.push_str(name)),
        Value::Keyword(s) => with_resolved(*s, |name| {
            out.push(':');
            out.push_str(name);
        }),
        Value::List(items) => write_seq(out, items, '(', ')', readably),
        Value::Vector(items) => write_seq(out, items, '[', ']', readably),
        Value::HashMap(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(k1, _), (k2, _)| k1.cmp(k2));
            out.push('{');
            for (i, (k, v)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_value(out, k, readably);
                out.push(' ');
                write_value(out, v, readably);
            }
            out.push('}');
        }
        Value::Atom(cell) => {
            out.push_str("(atom ");
            write_value(out, &cell.borrow(), readably);
            out.push(')');
        }
        Value::Lambda(l) => {
            let kind = if l.is_macro { "macro" } else { "function" };
            match l.name {
                Some(name) => with_resolved(name, |n| {
                    let _ = write!(out, "#<{kind} {n}>");
                }),
                None => {
                    let _ = write!(out, "#<{kind}>");
                }
            }
        }
        Value::BuiltIn(native) => {
            let _ = write!(out, "#<builtin {}>", native.name);
        }
        Value::File(file) => {
            let _ = write!(out, "#<file \"{}\">", file.path().display());
        }
        Value::Ename(id) => {
            let _ = write!(out, "<Entity name: {id:x}>");
        }
        Value::SelectionSet(id) => {
            let _ = write!(out, "<Selection set: {id}>");
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Nil => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(n) => n.hash(state),
            Value::Real(f) => f.to_bits().hash(state),
            Value::String(s) => s.hash(state),
            Value::Symbol(s) => s.hash(state),
            Value::Keyword(s) => s.hash(state),
            Value::List(l) => l.hash(state),
            Value::Vector(v) => v.hash(state),
            Value::Ename(id) | Value::SelectionSet(id) => id.hash(state),
            Value::Atom(a) => (Rc::as_ptr(a) as usize).hash(state),
            Value::Lambda(l) => (Rc::as_ptr(l) as usize).hash(state),
            Value::BuiltIn(n) => (Rc::as_ptr(n) as usize).hash(state),
            Value::File(f) => (Rc::as_ptr(f) as usize).hash(state),
            Value::HashMap(_) => {}
        }
    }
}

// Structural for data, identity for mutable cells and callables.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Real(a), Value::Real(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Keyword(a), Value::Keyword(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Vector(a), Value::Vector(b)) => a == b,
            (Value::HashMap(a), Value::HashMap(b)) => a == b,
            (Value::Atom(a), Value::Atom(b)) => Rc::ptr_eq(a, b),
            (Value::Lambda(a), Value::Lambda(b)) => Rc::ptr_eq(a, b),
            (Value::BuiltIn(a), Value::BuiltIn(b)) => Rc::ptr_eq(a, b),
            (Value::File(a), Value::File(b)) => Rc::ptr_eq(a, b),
            (Value::Ename(a), Value::Ename(b)) => a == b,
            (Value::SelectionSet(a), Value::SelectionSet(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        fn type_order(v: &Value) -> u8 {
            match v {
                Value::Nil => 0,
                Value::Bool(_) => 1,
                Value::Int(_) => 2,
                Value::Real(_) => 3,
                Value::String(_) => 4,
                Value::Symbol(_) => 5,
                Value::Keyword(_) => 6,
                Value::List(_) => 7,
                Value::Vector(_) => 8,
                Value::HashMap(_) => 9,
                Value::Ename(_) => 10,
                Value::SelectionSet(_) => 11,
                _ => 12,
            }
        }
        match (self, other) {
            (Value::Nil, Value::Nil) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Real(a), Value::Real(b)) => a.total_cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Symbol(a), Value::Symbol(b)) => compare_spurs(*a, *b),
            (Value::Keyword(a), Value::Keyword(b)) => compare_spurs(*a, *b),
            (Value::List(a), Value::List(b)) => a.cmp(b),
            (Value::Vector(a), Value::Vector(b)) => a.cmp(b),
            (Value::Ename(a), Value::Ename(b)) => a.cmp(b),
            (Value::SelectionSet(a), Value::SelectionSet(b)) => a.cmp(b),
            _ => type_order(self).cmp(&type_order(other)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.print(true))
    }
}
