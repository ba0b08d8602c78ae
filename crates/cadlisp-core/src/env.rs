use std::cell::RefCell;
use std::rc::Rc;

use hashbrown::HashMap as SpurMap;
use lasso::Spur;

use crate::error::LispError;
use crate::value::{intern, resolve, with_resolved, Value};

/// A lexical scope: bindings for this frame plus a link to the enclosing one.
///
/// Cloning an `Env` shares its bindings, so closures and the frame that created
/// them observe the same mutations.
#[derive(Debug, Clone)]
pub struct Env {
    pub bindings: Rc<RefCell<SpurMap<Spur, Value>>>,
    pub parent: Option<Rc<Env>>,
}

impl Env {
    pub fn new() -> Self {
        Env {
            bindings: Rc::new(RefCell::new(SpurMap::new())),
            parent: None,
        }
    }

    pub fn with_parent(parent: Rc<Env>) -> Self {
        tracing::trace!("creating child environment");
        Env {
            bindings: Rc::new(RefCell::new(SpurMap::new())),
            parent: Some(parent),
        }
    }

    /// Build a call frame binding `params` to `args`.
    ///
    /// `&` collects the remaining arguments into a list bound to the single name
    /// after it. `/` ends the parameters; the names after it are locals bound to nil.
    pub fn bind(
        outer: &Env,
        name: &str,
        params: &[Spur],
        args: &[Value],
    ) -> Result<Env, LispError> {
        let env = Env::with_parent(Rc::new(outer.clone()));
        let amp = intern("&");
        let slash = intern("/");
        let mut next = 0;
        let mut idx = 0;
        while idx < params.len() {
            let param = params[idx];
            if param == amp {
                let rest = match &params[idx + 1..] {
                    [rest] => *rest,
                    [rest, marker, locals @ ..] if *marker == slash => {
                        for local in locals {
                            env.set(*local, Value::Nil);
                        }
                        *rest
                    }
                    _ => {
                        return Err(LispError::eval(format!(
                            "{name}: there must be one parameter after the &"
                        )))
                    }
                };
                let collected = args.get(next..).unwrap_or(&[]).to_vec();
                env.set(rest, Value::list(collected));
                return Ok(env);
            }
            if param == slash {
                for local in &params[idx + 1..] {
                    env.set(*local, Value::Nil);
                }
                break;
            }
            match args.get(next) {
                Some(arg) => env.set(param, arg.clone()),
                None => {
                    return Err(LispError::arity(
                        name,
                        expected_args(positional_count(params, amp, slash)),
                        args.len(),
                    ))
                }
            }
            next += 1;
            idx += 1;
        }
        if next != args.len() {
            return Err(LispError::arity(
                name,
                expected_args(positional_count(params, amp, slash)),
                args.len(),
            ));
        }
        Ok(env)
    }

    pub fn get(&self, name: Spur) -> Option<Value> {
        if let Some(val) = self.bindings.borrow().get(&name) {
            Some(val.clone())
        } else if let Some(parent) = &self.parent {
            parent.get(name)
        } else {
            None
        }
    }

    /// Like `get`, but an unbound name is an error.
    pub fn lookup(&self, name: Spur) -> Result<Value, LispError> {
        self.get(name)
            .ok_or_else(|| LispError::Unbound(resolve(name)))
    }

    pub fn get_str(&self, name: &str) -> Option<Value> {
        self.get(intern(name))
    }

    /// The frame in the chain that binds `name`.
    pub fn find(&self, name: Spur) -> Option<Env> {
        if self.bindings.borrow().contains_key(&name) {
            Some(self.clone())
        } else {
            self.parent.as_ref().and_then(|p| p.find(name))
        }
    }

    /// Bind in this frame only.
    pub fn set(&self, name: Spur, val: Value) {
        self.bindings.borrow_mut().insert(name, val);
    }

    pub fn set_str(&self, name: &str, val: Value) {
        self.set(intern(name), val);
    }

    /// Rebind `name` where it is already defined, or in the root frame when unbound.
    pub fn assign(&self, name: Spur, val: Value) {
        match self.find(name) {
            Some(frame) => frame.set(name, val),
            None => self.root().set(name, val),
        }
    }

    pub fn root(&self) -> Env {
        let mut current = self.clone();
        while let Some(parent) = current.parent.clone() {
            current = (*parent).clone();
        }
        current
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Names bound in this frame, sorted.
    pub fn local_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .bindings
            .borrow()
            .keys()
            .map(|k| with_resolved(*k, str::to_string))
            .collect();
        names.sort();
        names
    }
}

fn expected_args(n: usize) -> String {
    if n == 1 {
        "1 arg".to_string()
    } else {
        format!("{n} args")
    }
}

fn positional_count(params: &[Spur], amp: Spur, slash: Spur) -> usize {
    params
        .iter()
        .take_while(|p| **p != amp && **p != slash)
        .count()
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}
