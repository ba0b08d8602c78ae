//! Name-to-builtin tables and their installation into an environment.
//!
//! Each group of primitives is a `static` slice of [`BuiltinDef`] entries, so the
//! set of names available at start-up is fixed at compile time and independent of
//! where the primitives are defined. A [`Registry`] collects tables (and ad-hoc
//! native closures from embedders) and binds them into the global environment.

use std::rc::Rc;

use crate::context::EvalContext;
use crate::env::Env;
use crate::error::LispError;
use crate::value::{intern, NativeFn, Value};

/// A primitive's native body. The first argument is the name it was invoked
/// through, so aliases report errors under the name the script used.
pub type BuiltinFn = fn(&str, &EvalContext, &[Value]) -> Result<Value, LispError>;

#[derive(Clone, Copy)]
pub struct BuiltinDef {
    pub name: &'static str,
    pub func: BuiltinFn,
}

impl std::fmt::Debug for BuiltinDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BuiltinDef({})", self.name)
    }
}

/// Shorthand for a table entry.
pub const fn builtin(name: &'static str, func: BuiltinFn) -> BuiltinDef {
    BuiltinDef { name, func }
}

#[derive(Default)]
pub struct Registry {
    tables: Vec<&'static [BuiltinDef]>,
    natives: Vec<Rc<NativeFn>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tables(tables: &[&'static [BuiltinDef]]) -> Self {
        Registry {
            tables: tables.to_vec(),
            natives: Vec::new(),
        }
    }

    pub fn add_table(&mut self, table: &'static [BuiltinDef]) -> &mut Self {
        self.tables.push(table);
        self
    }

    pub fn add_native(&mut self, native: NativeFn) -> &mut Self {
        self.natives.push(Rc::new(native));
        self
    }

    /// Merge another registry's entries after this one's.
    pub fn extend(&mut self, other: &Registry) -> &mut Self {
        self.tables.extend(other.tables.iter().copied());
        self.natives.extend(other.natives.iter().cloned());
        self
    }

    /// Number of entries, counting duplicates.
    pub fn len(&self) -> usize {
        self.tables.iter().map(|t| t.len()).sum::<usize>() + self.natives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All names, in installation order.
    pub fn names(&self) -> Vec<&str> {
        self.tables
            .iter()
            .flat_map(|t| t.iter().map(|d| d.name))
            .chain(self.natives.iter().map(|n| n.name.as_str()))
            .collect()
    }

    /// Bind every entry into `env`. When a name repeats, the later entry wins.
    pub fn install(&self, env: &Env) -> usize {
        let mut count = 0;
        for table in &self.tables {
            for def in table.iter() {
                env.set(intern(def.name), Value::native_fn(NativeFn::from_def(def)));
                count += 1;
            }
        }
        for native in &self.natives {
            env.set(intern(&native.name), Value::BuiltIn(native.clone()));
            count += 1;
        }
        tracing::debug!(count, "installed builtins");
        count
    }
}
