//! Compile-time symbol tables
//!
//! Two flat tables, scanned most-recent-first so shadowing falls out of scan
//! order. Ids are globally unique for the whole parse and are never recycled,
//! even after `clear_scope` removes the symbols that carried them; the
//! evaluator relies on that when it binds runtime instances by id.

use super::{BodyArena, BodyId, can_access};
use crate::types::TypeDesc;
use serde::{Deserialize, Serialize};

/// Unique function id, assigned in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FuncId(pub u32);

/// Unique variable id, assigned in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VarId(pub u32);

/// A declared function signature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuncSig {
    pub id: FuncId,
    pub name: String,
    pub params: Vec<TypeDesc>,
    pub return_type: TypeDesc,
    /// Owning body; `None` for top-level declarations
    pub owner: Option<BodyId>,
}

/// A declared variable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarSym {
    pub id: VarId,
    pub name: String,
    pub ty: TypeDesc,
    /// Owning body; parameters are owned by their function's body
    pub owner: Option<BodyId>,
}

/// Symbol table the parser resolves against while it parses
#[derive(Debug, Default)]
pub struct SymbolTable {
    functions: Vec<FuncSig>,
    variables: Vec<VarSym>,
    next_func: u32,
    next_var: u32,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_function(
        &mut self,
        name: impl Into<String>,
        params: Vec<TypeDesc>,
        return_type: TypeDesc,
        owner: Option<BodyId>,
    ) -> FuncId {
        let id = FuncId(self.next_func);
        self.next_func += 1;
        self.functions.push(FuncSig {
            id,
            name: name.into(),
            params,
            return_type,
            owner,
        });
        id
    }

    pub fn declare_variable(
        &mut self,
        name: impl Into<String>,
        ty: TypeDesc,
        owner: Option<BodyId>,
    ) -> VarId {
        let id = VarId(self.next_var);
        self.next_var += 1;
        self.variables.push(VarSym {
            id,
            name: name.into(),
            ty,
            owner,
        });
        id
    }

    /// Resolve a call site: name plus per-argument acceptability, in
    /// declaration order, so the first syntactic match wins.
    pub fn resolve_function(
        &self,
        name: &str,
        args: &[TypeDesc],
        requester: Option<BodyId>,
        bodies: &BodyArena,
    ) -> Option<&FuncSig> {
        self.functions.iter().find(|f| {
            f.name == name
                && f.params.len() == args.len()
                && f.params.iter().zip(args).all(|(p, a)| p.accepts(a))
                && can_access(f.owner, requester, |b| bodies.parent(b))
        })
    }

    /// Resolve a variable reference, most recent declaration first
    pub fn resolve_variable(
        &self,
        name: &str,
        requester: Option<BodyId>,
        bodies: &BodyArena,
    ) -> Option<&VarSym> {
        self.variables
            .iter()
            .rev()
            .find(|v| v.name == name && can_access(v.owner, requester, |b| bodies.parent(b)))
    }

    /// Drop every variable owned by `body`; called when the parser leaves a
    /// block. Ids are not reused.
    pub fn clear_scope(&mut self, body: BodyId) {
        self.variables.retain(|v| v.owner != Some(body));
    }

    /// All function signatures in id order
    pub fn into_functions(self) -> Vec<FuncSig> {
        self.functions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadowing_resolves_most_recent() {
        let mut bodies = BodyArena::new();
        let outer = bodies.alloc(None);
        let inner = bodies.alloc(Some(outer));

        let mut table = SymbolTable::new();
        let first = table.declare_variable("x", TypeDesc::int(), Some(outer));
        let second = table.declare_variable("x", TypeDesc::float(), Some(inner));

        let hit = table.resolve_variable("x", Some(inner), &bodies).unwrap();
        assert_eq!(hit.id, second);

        table.clear_scope(inner);
        let hit = table.resolve_variable("x", Some(inner), &bodies).unwrap();
        assert_eq!(hit.id, first);
    }

    #[test]
    fn test_scope_nesting_blocks_siblings() {
        let mut bodies = BodyArena::new();
        let outer = bodies.alloc(None);
        let inner = bodies.alloc(Some(outer));
        let sibling = bodies.alloc(Some(outer));

        let mut table = SymbolTable::new();
        table.declare_variable("x", TypeDesc::int(), Some(inner));
        assert!(table.resolve_variable("x", Some(sibling), &bodies).is_none());
        assert!(table.resolve_variable("x", Some(outer), &bodies).is_none());
    }

    #[test]
    fn test_ids_are_never_recycled() {
        let mut bodies = BodyArena::new();
        let body = bodies.alloc(None);

        let mut table = SymbolTable::new();
        let a = table.declare_variable("a", TypeDesc::int(), Some(body));
        table.clear_scope(body);
        let b = table.declare_variable("b", TypeDesc::int(), Some(body));
        assert_ne!(a, b);
        assert_eq!(b, VarId(a.0 + 1));
    }

    #[test]
    fn test_overload_resolution_prefers_declaration_order() {
        let bodies = BodyArena::new();
        let mut table = SymbolTable::new();
        let by_float = table.declare_function("f", vec![TypeDesc::float()], TypeDesc::void(), None);
        let by_int = table.declare_function("f", vec![TypeDesc::int()], TypeDesc::void(), None);

        // An int argument widens into the float overload, which was declared
        // first, so declaration order decides even with an exact match later.
        let hit = table
            .resolve_function("f", &[TypeDesc::int()], None, &bodies)
            .unwrap();
        assert_eq!(hit.id, by_float);

        let hit = table
            .resolve_function("f", &[TypeDesc::float()], None, &bodies)
            .unwrap();
        assert_eq!(hit.id, by_float);
        assert_ne!(by_int, by_float);
    }

    #[test]
    fn test_arity_must_match() {
        let bodies = BodyArena::new();
        let mut table = SymbolTable::new();
        table.declare_function("f", vec![TypeDesc::int()], TypeDesc::void(), None);
        assert!(table.resolve_function("f", &[], None, &bodies).is_none());
        assert!(
            table
                .resolve_function("f", &[TypeDesc::int(), TypeDesc::int()], None, &bodies)
                .is_none()
        );
    }
}
