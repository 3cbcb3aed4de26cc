//! Runtime environment: dynamic scopes and instance tables
//!
//! Dynamic scopes are allocated fresh for every function call, every `for`
//! loop, every loop iteration, and every taken `if` body, so two recursive
//! activations of the same function never share scope identity. Scopes obey
//! a strict stack discipline, which lets the arena pop entries as they exit.
//!
//! Lookups reuse [`crate::resolve::can_access`]: an instance is visible when
//! its owning scope is the requester or one of the requester's ancestors,
//! and global instances (`owner == None`) are visible everywhere.

use super::eval::Callable;
use super::value::ValueRef;
use crate::resolve::{FuncId, VarId, can_access};

/// Index of a live dynamic scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeId(u32);

/// Stack-disciplined arena of dynamic scopes
#[derive(Debug, Default)]
pub struct ScopeArena {
    parents: Vec<Option<ScopeId>>,
}

impl ScopeArena {
    /// Push a scope under `parent`; `None` parents a function activation at
    /// the global scope
    pub fn enter(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.parents.len() as u32);
        self.parents.push(parent);
        id
    }

    /// Pop `scope`; it must be the most recently entered one
    pub fn exit(&mut self, scope: ScopeId) {
        debug_assert_eq!(self.parents.len(), scope.0 as usize + 1);
        self.parents.pop();
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.parents[scope.0 as usize]
    }
}

/// A bound variable
#[derive(Debug)]
pub struct VarInstance {
    pub id: VarId,
    pub name: String,
    /// Owning scope; `None` never occurs for variables today but keeps the
    /// accessibility law uniform
    pub owner: Option<ScopeId>,
    pub value: ValueRef,
}

/// A bound function
#[derive(Debug)]
pub struct FuncInstance {
    pub id: FuncId,
    pub name: String,
    pub owner: Option<ScopeId>,
    pub callable: Callable,
}

/// Runtime tables, scanned most-recent-first like the compile-time ones
#[derive(Debug, Default)]
pub struct Environment {
    scopes: ScopeArena,
    variables: Vec<VarInstance>,
    functions: Vec<FuncInstance>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        self.scopes.enter(parent)
    }

    /// Release every variable owned by `scope`, then pop the scope. Dropping
    /// a binding drops one owner of its value; a value with no other owner
    /// is released here, and weak pointers at it go dangling.
    pub fn exit_scope(&mut self, scope: ScopeId) {
        self.variables.retain(|v| v.owner != Some(scope));
        self.scopes.exit(scope);
    }

    pub fn bind_variable(&mut self, instance: VarInstance) {
        self.variables.push(instance);
    }

    pub fn bind_function(&mut self, instance: FuncInstance) {
        self.functions.push(instance);
    }

    pub fn variable(&self, id: VarId, requester: Option<ScopeId>) -> Option<&VarInstance> {
        self.variables
            .iter()
            .rev()
            .find(|v| v.id == id && can_access(v.owner, requester, |s| self.scopes.parent(s)))
    }

    pub fn variable_mut(
        &mut self,
        id: VarId,
        requester: Option<ScopeId>,
    ) -> Option<&mut VarInstance> {
        let scopes = &self.scopes;
        self.variables
            .iter_mut()
            .rev()
            .find(|v| v.id == id && can_access(v.owner, requester, |s| scopes.parent(s)))
    }

    pub fn function(&self, id: FuncId, requester: Option<ScopeId>) -> Option<&FuncInstance> {
        self.functions
            .iter()
            .rev()
            .find(|f| f.id == id && can_access(f.owner, requester, |s| self.scopes.parent(s)))
    }

    /// Visible functions with this name, most recent first; used to locate
    /// the entry point
    pub fn functions_named<'a>(
        &'a self,
        name: &'a str,
        requester: Option<ScopeId>,
    ) -> impl Iterator<Item = &'a FuncInstance> {
        self.functions.iter().rev().filter(move |f| {
            f.name == name && can_access(f.owner, requester, |s| self.scopes.parent(s))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Span;
    use crate::diagnostics::RuntimeError;
    use crate::interp::natives::NativeContext;
    use crate::interp::value::Value;
    use std::rc::Rc;

    fn noop(
        _: &mut NativeContext<'_>,
        _: Vec<ValueRef>,
        _: Span,
    ) -> Result<ValueRef, RuntimeError> {
        Ok(Value::Void.into_ref())
    }

    fn bind(env: &mut Environment, id: u32, owner: Option<ScopeId>, value: ValueRef) {
        env.bind_variable(VarInstance {
            id: VarId(id),
            name: format!("v{id}"),
            owner,
            value,
        });
    }

    #[test]
    fn test_exit_scope_releases_values() {
        let mut env = Environment::new();
        let scope = env.enter_scope(None);
        let value = Value::Int(1).into_ref();
        bind(&mut env, 0, Some(scope), Rc::clone(&value));
        assert_eq!(Rc::strong_count(&value), 2);

        env.exit_scope(scope);
        assert_eq!(Rc::strong_count(&value), 1);
    }

    #[test]
    fn test_sibling_scopes_are_invisible() {
        let mut env = Environment::new();
        let outer = env.enter_scope(None);
        let inner = env.enter_scope(Some(outer));
        bind(&mut env, 0, Some(inner), Value::Int(1).into_ref());

        assert!(env.variable(VarId(0), Some(inner)).is_some());
        assert!(env.variable(VarId(0), Some(outer)).is_none());

        env.exit_scope(inner);
        let sibling = env.enter_scope(Some(outer));
        assert!(env.variable(VarId(0), Some(sibling)).is_none());
    }

    #[test]
    fn test_function_name_scan_filters_by_accessibility() {
        let mut env = Environment::new();
        env.bind_function(FuncInstance {
            id: FuncId(0),
            name: "f".into(),
            owner: None,
            callable: Callable::Native(noop),
        });

        let scope = env.enter_scope(None);
        env.bind_function(FuncInstance {
            id: FuncId(1),
            name: "f".into(),
            owner: Some(scope),
            callable: Callable::Native(noop),
        });

        // From inside the scope both are visible, most recent first; from
        // the global requester only the global instance is.
        let ids: Vec<FuncId> = env.functions_named("f", Some(scope)).map(|f| f.id).collect();
        assert_eq!(ids, vec![FuncId(1), FuncId(0)]);
        let ids: Vec<FuncId> = env.functions_named("f", None).map(|f| f.id).collect();
        assert_eq!(ids, vec![FuncId(0)]);
    }

    #[test]
    fn test_call_scopes_do_not_see_caller_locals() {
        let mut env = Environment::new();
        let caller = env.enter_scope(None);
        bind(&mut env, 0, Some(caller), Value::Int(1).into_ref());

        // A function activation parents at the global scope
        let callee = env.enter_scope(None);
        assert!(env.variable(VarId(0), Some(callee)).is_none());
    }
}
