//! Abstract syntax tree
//!
//! The parser type-checks while it parses, so every expression node already
//! carries its static `TypeDesc`, and variable and function references carry
//! the numeric id the evaluator resolves through the runtime tables.

use crate::common::Span;
use crate::resolve::{BodyArena, BodyId, FuncId, FuncSig, VarId};
use crate::types::TypeDesc;
use serde::{Deserialize, Serialize};

/// A fully parsed and checked program
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub stmts: Vec<Stmt>,
    /// Every function signature declared during the parse, natives included,
    /// in id order
    pub functions: Vec<FuncSig>,
    /// Lexical body tree recorded while parsing
    pub bodies: BodyArena,
}

// ==================== STATEMENTS ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    FuncDecl(FuncDecl),
    VarDecl(VarDecl),
    Assign(Assign),
    Call(Call),
    For(ForStmt),
    If(IfStmt),
    Return(ReturnStmt),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::FuncDecl(s) => s.span,
            Stmt::VarDecl(s) => s.span,
            Stmt::Assign(s) => s.span,
            Stmt::Call(s) => s.span,
            Stmt::For(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::Return(s) => s.span,
        }
    }
}

/// Function declaration; `body` is `None` for a bodyless (forward or native)
/// declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuncDecl {
    pub id: FuncId,
    pub name: String,
    pub params: Vec<ParamDecl>,
    pub return_type: TypeDesc,
    pub body_id: BodyId,
    pub body: Option<Vec<Stmt>>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDecl {
    pub id: VarId,
    pub name: String,
    pub ty: TypeDesc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarDecl {
    pub id: VarId,
    pub name: String,
    pub ty: TypeDesc,
    pub value: Expr,
    pub span: Span,
}

/// Assignment; the target is either a variable or a dereference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assign {
    pub target: Expr,
    pub value: Expr,
    pub span: Span,
}

/// A resolved call, used both as a statement and as an expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    pub id: FuncId,
    pub name: String,
    pub args: Vec<Expr>,
    pub ret: TypeDesc,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForStmt {
    pub body_id: BodyId,
    pub init: Option<Box<Stmt>>,
    pub condition: Option<Expr>,
    pub step: Option<Box<Stmt>>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IfStmt {
    pub body_id: BodyId,
    pub condition: Expr,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnStmt {
    pub value: Expr,
    pub span: Span,
}

// ==================== EXPRESSIONS ====================

/// An expression with its statically determined type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: TypeDesc,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprKind {
    IntLit(i64),
    FloatLit(f64),
    CharLit(char),
    /// Array literal; only string literals produce these today
    ArrayLit(Vec<Expr>),
    /// A resolved variable reference
    Var { id: VarId, name: String },
    Call(Call),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// Address-of: `&expr`
    Ref(Box<Expr>),
    /// Dereference: `*expr`
    Deref(Box<Expr>),
    /// Indexing: `value[index]`
    Index {
        value: Box<Expr>,
        index: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Lt,
    Gt,
    Le,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}
