use std::cell::Cell;
use std::rc::Rc;

use cadlisp_core::{
    check_args_at_least, check_args_between, check_args_is, intern, resolve, Env, EvalContext,
    Lambda, LispError, Spur, Value,
};

use crate::eval::{self, Trampoline};

/// Interned heads of every special form, compared by `Spur` on each list evaluation.
struct SpecialFormSpurs {
    and: Spur,
    catch: Spur,
    cond: Spur,
    def: Spur,
    defmacro: Spur,
    defun: Spur,
    do_: Spur,
    fn_: Spur,
    foreach: Spur,
    if_: Spur,
    lambda: Spur,
    let_star: Spur,
    macroexpand: Spur,
    or: Spur,
    progn: Spur,
    quasiquote: Spur,
    quote: Spur,
    repeat: Spur,
    set_bang: Spur,
    setq: Spur,
    splice_unquote: Spur,
    try_: Spur,
    unquote: Spur,
    while_: Spur,
}

impl SpecialFormSpurs {
    fn init() -> Self {
        Self {
            and: intern("and"),
            catch: intern("catch*"),
            cond: intern("cond"),
            def: intern("def!"),
            defmacro: intern("defmacro!"),
            defun: intern("defun"),
            do_: intern("do"),
            fn_: intern("fn*"),
            foreach: intern("foreach"),
            if_: intern("if"),
            lambda: intern("lambda"),
            let_star: intern("let*"),
            macroexpand: intern("macroexpand"),
            or: intern("or"),
            progn: intern("progn"),
            quasiquote: intern("quasiquote"),
            quote: intern("quote"),
            repeat: intern("repeat"),
            set_bang: intern("set!"),
            setq: intern("setq"),
            splice_unquote: intern("splice-unquote"),
            try_: intern("try*"),
            unquote: intern("unquote"),
            while_: intern("while"),
        }
    }
}

thread_local! {
    static SF: Cell<Option<&'static SpecialFormSpurs>> = const { Cell::new(None) };
}

fn special_forms() -> &'static SpecialFormSpurs {
    SF.with(|cell| match cell.get() {
        Some(sf) => sf,
        None => {
            let sf: &'static SpecialFormSpurs = Box::leak(Box::new(SpecialFormSpurs::init()));
            cell.set(Some(sf));
            sf
        }
    })
}

/// Every name the evaluator treats as a special form. Used by the REPL for completion.
pub const SPECIAL_FORM_NAMES: &[&str] = &[
    "and",
    "cond",
    "def!",
    "defmacro!",
    "defun",
    "do",
    "fn*",
    "foreach",
    "if",
    "lambda",
    "let*",
    "macroexpand",
    "or",
    "progn",
    "quasiquote",
    "quote",
    "repeat",
    "set!",
    "setq",
    "try*",
    "while",
];

/// Forms a user macro of the same name may replace: the AutoLISP control and
/// definition forms. The core forms (`if`, `def!`, `fn*`, ...) cannot be shadowed.
pub(crate) fn is_overridable(head: Spur) -> bool {
    let sf = special_forms();
    [
        sf.and, sf.cond, sf.defun, sf.foreach, sf.lambda, sf.or, sf.progn, sf.repeat, sf.setq,
        sf.while_,
    ]
    .contains(&head)
}

pub fn try_eval_special(
    head: Spur,
    args: &[Value],
    env: &Env,
    ctx: &EvalContext,
) -> Option<Result<Trampoline, LispError>> {
    let sf = special_forms();

    if head == sf.if_ {
        Some(eval_if(args, env, ctx))
    } else if head == sf.def {
        Some(eval_def(args, env, ctx))
    } else if head == sf.let_star {
        Some(eval_let_star(args, env, ctx))
    } else if head == sf.do_ || head == sf.progn {
        Some(eval_body(args, env, ctx))
    } else if head == sf.fn_ || head == sf.lambda {
        Some(eval_fn(args, env, None).map(Trampoline::Value))
    } else if head == sf.setq || head == sf.set_bang {
        Some(eval_setq(head, args, env, ctx))
    } else if head == sf.cond {
        Some(eval_cond(args, env, ctx))
    } else if head == sf.and {
        Some(eval_and(args, env, ctx))
    } else if head == sf.or {
        Some(eval_or(args, env, ctx))
    } else if head == sf.defun {
        Some(eval_defun(args, env))
    } else if head == sf.quote {
        Some(eval_quote(args))
    } else if head == sf.quasiquote {
        Some(eval_quasiquote(args, env, ctx))
    } else if head == sf.defmacro {
        Some(eval_defmacro(args, env, ctx))
    } else if head == sf.macroexpand {
        Some(eval_macroexpand(args, env, ctx))
    } else if head == sf.try_ {
        Some(eval_try(args, env, ctx))
    } else if head == sf.while_ {
        Some(eval_while(args, env, ctx))
    } else if head == sf.repeat {
        Some(eval_repeat(args, env, ctx))
    } else if head == sf.foreach {
        Some(eval_foreach(args, env, ctx))
    } else {
        None
    }
}

/// Evaluate all forms but the last and hand the last back to the loop.
fn eval_body(body: &[Value], env: &Env, ctx: &EvalContext) -> Result<Trampoline, LispError> {
    let Some((last, init)) = body.split_last() else {
        return Ok(Trampoline::Value(Value::Nil));
    };
    for expr in init {
        eval::eval_value(ctx, expr, env)?;
    }
    Ok(Trampoline::Eval(last.clone(), env.clone()))
}

/// Evaluate a body for its value without tail elision (loop bodies).
fn run_body(body: &[Value], env: &Env, ctx: &EvalContext) -> Result<Value, LispError> {
    let mut result = Value::Nil;
    for expr in body {
        result = eval::eval_value(ctx, expr, env)?;
    }
    Ok(result)
}

/// A multi-form body stored in a lambda becomes one `(do ...)` form.
fn body_form(body: &[Value]) -> Value {
    match body {
        [] => Value::Nil,
        [single] => single.clone(),
        _ => {
            let mut form = Vec::with_capacity(body.len() + 1);
            form.push(Value::symbol("do"));
            form.extend_from_slice(body);
            Value::list(form)
        }
    }
}

fn symbol_arg(form: &str, value: &Value) -> Result<Spur, LispError> {
    value.as_symbol_spur().ok_or_else(|| {
        LispError::eval(format!(
            "{form}: expected a symbol, got {}",
            value.type_name()
        ))
    })
}

fn eval_quote(args: &[Value]) -> Result<Trampoline, LispError> {
    check_args_is("quote", 1, args.len())?;
    Ok(Trampoline::Value(args[0].clone()))
}

fn eval_if(args: &[Value], env: &Env, ctx: &EvalContext) -> Result<Trampoline, LispError> {
    check_args_between("if", 2, 3, args.len())?;
    let cond = eval::eval_value(ctx, &args[0], env)?;
    if cond.is_truthy() {
        Ok(Trampoline::Eval(args[1].clone(), env.clone()))
    } else if let Some(alt) = args.get(2) {
        Ok(Trampoline::Eval(alt.clone(), env.clone()))
    } else {
        Ok(Trampoline::Value(Value::Nil))
    }
}

/// `(def! name expr)` binds in the current frame and returns the value.
fn eval_def(args: &[Value], env: &Env, ctx: &EvalContext) -> Result<Trampoline, LispError> {
    check_args_is("def!", 2, args.len())?;
    let name = symbol_arg("def!", &args[0])?;
    let val = match eval::eval_value(ctx, &args[1], env)? {
        Value::Lambda(lambda) if lambda.name.is_none() => Value::lambda(Lambda {
            name: Some(name),
            ..(*lambda).clone()
        }),
        other => other,
    };
    env.set(name, val.clone());
    Ok(Trampoline::Value(val))
}

/// `(let* (a 1 b (+ a 1)) body...)`: sequential bindings in a fresh frame.
fn eval_let_star(args: &[Value], env: &Env, ctx: &EvalContext) -> Result<Trampoline, LispError> {
    check_args_at_least("let*", 1, args.len())?;
    let bindings = args[0]
        .as_seq()
        .ok_or_else(|| LispError::eval("let*: bindings must be a list or vector"))?;
    if bindings.len() % 2 != 0 {
        return Err(LispError::eval(
            "let*: bindings must alternate names and values",
        ));
    }
    let new_env = Env::with_parent(Rc::new(env.clone()));
    for pair in bindings.chunks(2) {
        let name = symbol_arg("let*", &pair[0])?;
        let val = eval::eval_value(ctx, &pair[1], &new_env)?;
        new_env.set(name, val);
    }
    eval_body(&args[1..], &new_env, ctx)
}

fn lambda_params(form: &str, value: &Value) -> Result<Vec<Spur>, LispError> {
    let items = match value {
        Value::Nil => &[][..],
        _ => value.as_seq().ok_or_else(|| {
            LispError::eval(format!(
                "{form}: parameters must be a list, got {}",
                value.type_name()
            ))
        })?,
    };
    items.iter().map(|p| symbol_arg(form, p)).collect()
}

/// `(fn* (params) body...)`, capturing the current environment.
fn eval_fn(args: &[Value], env: &Env, name: Option<Spur>) -> Result<Value, LispError> {
    check_args_at_least("fn*", 1, args.len())?;
    let params = lambda_params("fn*", &args[0])?;
    Ok(Value::lambda(Lambda {
        params,
        body: body_form(&args[1..]),
        env: env.clone(),
        is_macro: false,
        name,
        meta: Value::Nil,
    }))
}

/// `(defun name (params [/ locals]) body...)` binds a named function and
/// returns its name.
fn eval_defun(args: &[Value], env: &Env) -> Result<Trampoline, LispError> {
    check_args_at_least("defun", 2, args.len())?;
    let name = symbol_arg("defun", &args[0])?;
    let lambda = eval_fn(&args[1..], env, Some(name))?;
    env.set(name, lambda);
    Ok(Trampoline::Value(Value::Symbol(name)))
}

/// `(setq a 1 b 2)` rebinds each name where it is defined, creating
/// unknown names globally. Returns the last value.
fn eval_setq(
    head: Spur,
    args: &[Value],
    env: &Env,
    ctx: &EvalContext,
) -> Result<Trampoline, LispError> {
    let form = resolve(head);
    check_args_at_least(&form, 2, args.len())?;
    if args.len() % 2 != 0 {
        return Err(LispError::eval(format!(
            "{form}: expects name/value pairs"
        )));
    }
    let mut last = Value::Nil;
    for pair in args.chunks(2) {
        let name = symbol_arg(&form, &pair[0])?;
        last = eval::eval_value(ctx, &pair[1], env)?;
        env.assign(name, last.clone());
    }
    Ok(Trampoline::Value(last))
}

/// A clause holding only its test yields the test's value.
fn eval_cond(args: &[Value], env: &Env, ctx: &EvalContext) -> Result<Trampoline, LispError> {
    for clause in args {
        let items = clause
            .as_list()
            .filter(|items| !items.is_empty())
            .ok_or_else(|| LispError::eval("cond: each clause must be a non-empty list"))?;
        let test = eval::eval_value(ctx, &items[0], env)?;
        if test.is_truthy() {
            if items.len() == 1 {
                return Ok(Trampoline::Value(test));
            }
            return eval_body(&items[1..], env, ctx);
        }
    }
    Ok(Trampoline::Value(Value::Nil))
}

fn eval_and(args: &[Value], env: &Env, ctx: &EvalContext) -> Result<Trampoline, LispError> {
    let Some((last, init)) = args.split_last() else {
        return Ok(Trampoline::Value(Value::Bool(true)));
    };
    for expr in init {
        let val = eval::eval_value(ctx, expr, env)?;
        if !val.is_truthy() {
            return Ok(Trampoline::Value(val));
        }
    }
    Ok(Trampoline::Eval(last.clone(), env.clone()))
}

fn eval_or(args: &[Value], env: &Env, ctx: &EvalContext) -> Result<Trampoline, LispError> {
    let Some((last, init)) = args.split_last() else {
        return Ok(Trampoline::Value(Value::Nil));
    };
    for expr in init {
        let val = eval::eval_value(ctx, expr, env)?;
        if val.is_truthy() {
            return Ok(Trampoline::Value(val));
        }
    }
    Ok(Trampoline::Eval(last.clone(), env.clone()))
}

fn eval_while(args: &[Value], env: &Env, ctx: &EvalContext) -> Result<Trampoline, LispError> {
    check_args_at_least("while", 1, args.len())?;
    let mut result = Value::Nil;
    while eval::eval_value(ctx, &args[0], env)?.is_truthy() {
        result = run_body(&args[1..], env, ctx)?;
    }
    Ok(Trampoline::Value(result))
}

/// `(repeat n body...)` runs the body `n` times and yields its last value.
fn eval_repeat(args: &[Value], env: &Env, ctx: &EvalContext) -> Result<Trampoline, LispError> {
    check_args_at_least("repeat", 1, args.len())?;
    let count = match eval::eval_value(ctx, &args[0], env)? {
        Value::Int(n) => n,
        other => return Err(LispError::type_error("integer", other.type_name())),
    };
    let mut result = Value::Nil;
    for _ in 0..count.max(0) {
        result = run_body(&args[1..], env, ctx)?;
    }
    Ok(Trampoline::Value(result))
}

/// `(foreach name seq body...)` binds each element in turn in a fresh frame.
fn eval_foreach(args: &[Value], env: &Env, ctx: &EvalContext) -> Result<Trampoline, LispError> {
    check_args_at_least("foreach", 2, args.len())?;
    let name = symbol_arg("foreach", &args[0])?;
    let seq = eval::eval_value(ctx, &args[1], env)?;
    let items = match &seq {
        Value::Nil => &[][..],
        other => other
            .as_seq()
            .ok_or_else(|| LispError::type_error("list", other.type_name()))?,
    };
    let loop_env = Env::with_parent(Rc::new(env.clone()));
    let mut result = Value::Nil;
    for item in items {
        loop_env.set(name, item.clone());
        result = run_body(&args[2..], &loop_env, ctx)?;
    }
    Ok(Trampoline::Value(result))
}

fn eval_quasiquote(args: &[Value], env: &Env, ctx: &EvalContext) -> Result<Trampoline, LispError> {
    check_args_is("quasiquote", 1, args.len())?;
    Ok(Trampoline::Value(expand_quasiquote(&args[0], env, ctx)?))
}

/// The form inside `(head x)` when `value` is exactly that two-element list.
fn unwrap_form(value: &Value, head: Spur) -> Option<&Value> {
    match value.as_list()? {
        [h, inner] if h.as_symbol_spur() == Some(head) => Some(inner),
        _ => None,
    }
}

fn expand_quasiquote(val: &Value, env: &Env, ctx: &EvalContext) -> Result<Value, LispError> {
    let sf = special_forms();
    if let Some(inner) = unwrap_form(val, sf.unquote) {
        return eval::eval_value(ctx, inner, env);
    }
    let (items, is_vector) = match val {
        Value::List(items) => (items, false),
        Value::Vector(items) => (items, true),
        _ => return Ok(val.clone()),
    };
    let mut result = Vec::with_capacity(items.len());
    for item in items.iter() {
        if let Some(inner) = unwrap_form(item, sf.splice_unquote) {
            match eval::eval_value(ctx, inner, env)? {
                Value::Nil => {}
                spliced => {
                    let parts = spliced
                        .as_seq()
                        .ok_or_else(|| LispError::type_error("list", spliced.type_name()))?;
                    result.extend(parts.iter().cloned());
                }
            }
            continue;
        }
        result.push(expand_quasiquote(item, env, ctx)?);
    }
    Ok(if is_vector {
        Value::vector(result)
    } else {
        Value::list(result)
    })
}

/// `(defmacro! name fn-expr)` marks the evaluated function as a macro.
fn eval_defmacro(args: &[Value], env: &Env, ctx: &EvalContext) -> Result<Trampoline, LispError> {
    check_args_is("defmacro!", 2, args.len())?;
    let name = symbol_arg("defmacro!", &args[0])?;
    let mac = match eval::eval_value(ctx, &args[1], env)? {
        Value::Lambda(lambda) => Value::lambda(Lambda {
            is_macro: true,
            name: Some(name),
            ..(*lambda).clone()
        }),
        other => {
            return Err(LispError::type_error("function", other.type_name()));
        }
    };
    env.set(name, mac.clone());
    Ok(Trampoline::Value(mac))
}

/// The macro a form's head names, if any.
fn macro_of(form: &Value, env: &Env) -> Option<Rc<Lambda>> {
    let head = form.as_list()?.first()?.as_symbol_spur()?;
    match env.get(head)? {
        Value::Lambda(lambda) if lambda.is_macro => Some(lambda),
        _ => None,
    }
}

/// `(macroexpand form)` expands repeatedly without evaluating the result.
fn eval_macroexpand(args: &[Value], env: &Env, ctx: &EvalContext) -> Result<Trampoline, LispError> {
    check_args_is("macroexpand", 1, args.len())?;
    let mut form = args[0].clone();
    while let Some(mac) = macro_of(&form, env) {
        let call_args = form.as_list().map(|items| items[1..].to_vec()).unwrap_or_default();
        form = eval::apply_macro(ctx, &mac, &call_args)?;
    }
    Ok(Trampoline::Value(form))
}

/// `(try* expr (catch* name handler...))`. The handler sees the thrown value,
/// or the message of any other error. `exit` is never caught.
fn eval_try(args: &[Value], env: &Env, ctx: &EvalContext) -> Result<Trampoline, LispError> {
    let sf = special_forms();
    check_args_between("try*", 1, 2, args.len())?;
    let Some(clause) = args.get(1) else {
        return Ok(Trampoline::Eval(args[0].clone(), env.clone()));
    };
    let catch_form = clause
        .as_list()
        .filter(|items| items.len() >= 2 && items[0].as_symbol_spur() == Some(sf.catch))
        .ok_or_else(|| LispError::eval("try*: expected (catch* name handler...)"))?;
    let name = symbol_arg("catch*", &catch_form[1])?;

    match eval::eval_value(ctx, &args[0], env) {
        Ok(val) => Ok(Trampoline::Value(val)),
        Err(err) if err.is_catchable() => {
            tracing::trace!(error = %err, "caught by try*");
            let catch_env = Env::with_parent(Rc::new(env.clone()));
            catch_env.set(name, err.to_value());
            eval_body(&catch_form[2..], &catch_env, ctx)
        }
        Err(err) => Err(err),
    }
}
