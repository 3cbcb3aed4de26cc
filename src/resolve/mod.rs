//! Lexical bodies and the accessibility law
//!
//! Bodies form a tree rooted at the global scope, which is the `None`
//! sentinel rather than an arena entry. The parser allocates one body per
//! function, `for` loop, and `if` block; the evaluator keeps a parallel
//! arena of dynamic scopes and reuses [`can_access`] for its lookups.

mod symbols;

pub use symbols::{FuncId, FuncSig, SymbolTable, VarId, VarSym};

use serde::{Deserialize, Serialize};

/// Index of a lexical body within a [`BodyArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BodyId(pub u32);

/// Arena of lexical bodies, each recording only its parent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BodyArena {
    parents: Vec<Option<BodyId>>,
}

impl BodyArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a body under `parent`; `None` means the global scope
    pub fn alloc(&mut self, parent: Option<BodyId>) -> BodyId {
        let id = BodyId(self.parents.len() as u32);
        self.parents.push(parent);
        id
    }

    pub fn parent(&self, body: BodyId) -> Option<BodyId> {
        self.parents[body.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}

/// Whether a symbol owned by `owner` is visible to a lookup made from
/// `requester`.
///
/// Global symbols (`owner == None`) are visible everywhere. Otherwise the
/// owner must appear on the requester's parent chain: a body sees its own
/// symbols and those of every enclosing body, and nothing from sibling or
/// inner bodies.
pub fn can_access<I, P>(owner: Option<I>, requester: Option<I>, parent_of: P) -> bool
where
    I: Copy + PartialEq,
    P: Fn(I) -> Option<I>,
{
    let Some(owner) = owner else {
        return true;
    };
    let mut cursor = requester;
    while let Some(body) = cursor {
        if body == owner {
            return true;
        }
        cursor = parent_of(body);
    }
    false
}
