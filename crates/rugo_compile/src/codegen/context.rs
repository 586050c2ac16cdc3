//! Code-generation context: scopes, constants, callables, namespaces.
//!
//! The generator is the only stage that knows names. The context tracks,
//! while walking the AST:
//!
//! - the stack of declared-name scopes, so the first assignment emits a
//!   declaration and later ones an assignment;
//! - which top-level names are promoted to package scope (referenced
//!   from `def` bodies);
//! - constants (leading-uppercase bindings) for reassignment errors;
//! - user-function arities for call-site checking;
//! - which namespace each `use`/`import`/`require` claimed.

use rugo_base::names::is_constant_name;
use rugo_base::{Result, RugoError};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;

/// What a namespace resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceKind {
    /// Stdlib module; calls go through its package-level instance.
    Stdlib,
    /// Bridged native package; calls go through `rugoB_*` glue.
    Bridge,
    /// Required user file; calls go to prefixed user functions.
    User { prefix: String },
}

/// A known user function.
#[derive(Debug, Clone)]
pub struct UserFn {
    /// Emitted Go name (`u_greet`, `u_util_pad`).
    pub go_name: String,
    pub arity: usize,
}

pub struct Ctx {
    /// Path of the unit being generated, for diagnostics and `//line`.
    pub path: String,
    /// Original source line of the statement being generated.
    pub line: u32,
    scopes: Vec<FxHashSet<String>>,
    /// Top-level names promoted to package scope.
    globals: FxHashSet<String>,
    /// Callable user functions: bare name, or `ns.name` for requires.
    pub funcs: FxHashMap<String, UserFn>,
    pub namespaces: FxHashMap<String, NamespaceKind>,
    /// Wrapper/unwrap helper keys referenced by generated bridge calls.
    pub used_helpers: BTreeSet<String>,
    /// Inside a function/lambda body (affects `return` emission).
    pub in_function: bool,
    /// Distinguishes promoted globals of different source units.
    pub global_prefix: String,
    /// Required-unit namespace for bare-name function resolution.
    pub fn_prefix: Option<String>,
    /// Promoted globals that have received their first assignment.
    assigned_globals: FxHashSet<String>,
    /// Names hoisted to a `var` declaration ahead of an `if` (Rugo's
    /// if-arms are scope-transparent, Go blocks are not); the first real
    /// assignment consumes the entry instead of re-declaring.
    hoisted: FxHashSet<String>,
    tmp: u32,
}

/// Saved scope state for test-block isolation.
pub struct IsolationState {
    scopes: Vec<FxHashSet<String>>,
    globals: FxHashSet<String>,
}

impl Ctx {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line: 0,
            scopes: vec![FxHashSet::default()],
            globals: FxHashSet::default(),
            funcs: FxHashMap::default(),
            namespaces: FxHashMap::default(),
            used_helpers: BTreeSet::new(),
            in_function: false,
            global_prefix: String::new(),
            fn_prefix: None,
            assigned_globals: FxHashSet::default(),
            hoisted: FxHashSet::default(),
            tmp: 0,
        }
    }

    /// Declares `name` ahead of its first assignment (if-arm hoisting).
    /// Returns `false` when the name was already visible.
    pub fn predeclare(&mut self, name: &str) -> bool {
        if self.is_declared(name) {
            return false;
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string());
        }
        self.hoisted.insert(name.to_string());
        true
    }

    /// Consumes a pending hoisted declaration for `name`.
    pub fn take_hoisted(&mut self, name: &str) -> bool {
        self.hoisted.remove(name)
    }

    /// Records an assignment to a promoted global; a second assignment
    /// to a constant-named global is the reassignment error.
    pub fn assign_global(&mut self, name: &str) -> Result<()> {
        if !self.assigned_globals.insert(name.to_string()) && is_constant_name(name) {
            return Err(RugoError::at(
                format!("cannot reassign constant {}", name),
                &self.path,
                self.line,
            ));
        }
        Ok(())
    }

    /// Test blocks are isolated from the top-level scope: swap in a
    /// fresh scope stack (and hide globals) for the block's duration.
    pub fn enter_isolated(&mut self) -> IsolationState {
        IsolationState {
            scopes: std::mem::replace(&mut self.scopes, vec![FxHashSet::default()]),
            globals: std::mem::take(&mut self.globals),
        }
    }

    pub fn exit_isolated(&mut self, saved: IsolationState) {
        self.scopes = saved.scopes;
        self.globals = saved.globals;
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(FxHashSet::default());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.scopes.iter().any(|s| s.contains(name)) || self.globals.contains(name)
    }

    /// Declares `name` in the current scope. Returns `true` when this is
    /// the first declaration (emit a `var` declaration), `false` for a
    /// reassignment. Constant reassignment is a compile error at the
    /// current line.
    pub fn declare(&mut self, name: &str) -> Result<bool> {
        if self.is_declared(name) {
            if is_constant_name(name) {
                return Err(RugoError::at(
                    format!("cannot reassign constant {}", name),
                    &self.path,
                    self.line,
                ));
            }
            return Ok(false);
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string());
        }
        Ok(true)
    }

    pub fn promote_global(&mut self, name: &str) {
        self.globals.insert(name.to_string());
    }

    pub fn is_global(&self, name: &str) -> bool {
        self.globals.contains(name)
    }

    pub fn globals(&self) -> impl Iterator<Item = &String> {
        self.globals.iter()
    }

    /// Emitted Go name of a variable reference.
    pub fn var_name(&self, name: &str) -> String {
        if self.globals.contains(name) {
            format!("g_{}{}", self.global_prefix, name)
        } else {
            format!("v_{}", name)
        }
    }

    pub fn fresh_tmp(&mut self) -> String {
        self.tmp += 1;
        format!("rugoTmp{}", self.tmp)
    }

    pub fn error(&self, message: impl Into<String>) -> RugoError {
        RugoError::at(message, &self.path, self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_declaration_then_reassignment() {
        let mut ctx = Ctx::new("t.rugo");
        assert!(ctx.declare("x").unwrap());
        assert!(!ctx.declare("x").unwrap());
    }

    #[test]
    fn constants_cannot_be_reassigned() {
        let mut ctx = Ctx::new("t.rugo");
        ctx.line = 1;
        assert!(ctx.declare("PI").unwrap());
        ctx.line = 2;
        let err = ctx.declare("PI").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.to_string().contains("cannot reassign constant PI"));
    }

    #[test]
    fn scopes_nest_and_pop() {
        let mut ctx = Ctx::new("t.rugo");
        ctx.declare("outer").unwrap();
        ctx.push_scope();
        ctx.declare("inner").unwrap();
        assert!(ctx.is_declared("outer"));
        assert!(ctx.is_declared("inner"));
        ctx.pop_scope();
        assert!(!ctx.is_declared("inner"));
    }

    #[test]
    fn globals_rename_to_g_prefix() {
        let mut ctx = Ctx::new("t.rugo");
        ctx.promote_global("count");
        assert_eq!(ctx.var_name("count"), "g_count");
        assert_eq!(ctx.var_name("local"), "v_local");
    }
}
