//! Recursive descent parser with inline checking
//!
//! The parser resolves every name and checks every type while it parses, so
//! an `Ok` parse is also a checked program. It stops at the first error.
//!
//! Precedence, loosest to tightest: relational/additive (`+ - = > < >= <=
//! ==`), multiplicative (`* /`), indexing (`value[index]`), unary (`- !`),
//! primary. The two-character operators are assembled here from adjacent
//! single-character tokens by a one-token peek.

use crate::ast::*;
use crate::common::Span;
use crate::diagnostics::{ParseError, SourceFile};
use crate::interp::NativeRegistry;
use crate::lexer::{Token, TokenKind};
use crate::resolve::{BodyArena, BodyId, SymbolTable};
use crate::types::{TypeDesc, ValueKind};
use miette::NamedSource;

/// Parse a token stream into a checked program.
///
/// The registry's bindings are declared into the function table first, in
/// registry order, so their ids match the ones the evaluator binds.
pub fn parse(
    tokens: &[Token],
    file: &SourceFile,
    natives: &NativeRegistry,
) -> Result<Program, ParseError> {
    let mut parser = Parser::new(tokens, file);
    for binding in natives.bindings() {
        parser
            .symbols
            .declare_function(binding.name, binding.params.clone(), binding.ret.clone(), None);
    }
    let program = parser.parse_program()?;
    tracing::debug!(
        file = %file.name,
        functions = program.functions.len(),
        bodies = program.bodies.len(),
        "parsed"
    );
    Ok(program)
}

/// Parser state
struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    file: &'a SourceFile,
    symbols: SymbolTable,
    bodies: BodyArena,
    /// Lexical body being parsed; `None` at the top level
    current_body: Option<BodyId>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token], file: &'a SourceFile) -> Self {
        Self {
            tokens,
            pos: 0,
            file,
            symbols: SymbolTable::new(),
            bodies: BodyArena::new(),
            current_body: None,
        }
    }

    // ==================== CURSOR ====================

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or_else(|| {
            self.tokens
                .last()
                .expect("token stream should have at least EOF")
        })
    }

    fn peek(&self) -> TokenKind {
        self.current().kind
    }

    fn peek_n(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek() == kind
    }

    fn advance(&mut self) -> &Token {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        // The token that was current before the bump
        &self.tokens[self.pos.saturating_sub(1)]
    }

    /// Advance over `kind` if it is current
    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&Token, ParseError> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.err_expected(format!("`{kind}`")))
        }
    }

    fn span(&self) -> Span {
        self.current().span
    }

    /// Span of the most recently consumed token
    fn prev_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].span
    }

    // ==================== ERRORS ====================

    fn src(&self) -> NamedSource<String> {
        self.file.to_named_source()
    }

    fn err_expected(&self, expected: impl Into<String>) -> ParseError {
        ParseError::ExpectedToken {
            expected: expected.into(),
            found: format!("`{}`", self.peek()),
            span: self.span().into(),
            src: self.src(),
        }
    }

    fn err_unknown_statement(&self, span: Span) -> ParseError {
        ParseError::UnknownStatement {
            span: span.into(),
            src: self.src(),
        }
    }

    fn err_incorrect_type(
        &self,
        expected: impl Into<String>,
        found: &TypeDesc,
        span: Span,
    ) -> ParseError {
        ParseError::IncorrectType {
            expected: expected.into(),
            found: found.to_string(),
            span: span.into(),
            src: self.src(),
        }
    }

    fn err_expected_value(&self, span: Span) -> ParseError {
        ParseError::ExpectedValue {
            span: span.into(),
            src: self.src(),
        }
    }

    // ==================== PROGRAM ====================

    fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut stmts = Vec::new();
        while !self.at(TokenKind::Eof) {
            if !self.peek().is_type_keyword() {
                return Err(self.err_unknown_statement(self.span()));
            }
            let return_type = self.parse_type()?;
            let decl = self.parse_function_declaration(return_type)?;
            stmts.push(Stmt::FuncDecl(decl));
        }
        Ok(Program {
            stmts,
            functions: std::mem::take(&mut self.symbols).into_functions(),
            bodies: std::mem::take(&mut self.bodies),
        })
    }

    // ==================== DECLARATIONS ====================

    fn parse_function_declaration(
        &mut self,
        return_type: TypeDesc,
    ) -> Result<FuncDecl, ParseError> {
        let start = self.span();
        let name = self.expect(TokenKind::Ident)?.text.clone();
        self.expect(TokenKind::LParen)?;

        let body_id = self.bodies.alloc(self.current_body);
        let mut params = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                let ty = self.parse_type()?;
                let pname = self.expect(TokenKind::Ident)?.text.clone();
                let id = self
                    .symbols
                    .declare_variable(&pname, ty.clone(), Some(body_id));
                params.push(ParamDecl {
                    id,
                    name: pname,
                    ty,
                });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;

        // Registered before the body parses so the body can recurse
        let id = self.symbols.declare_function(
            &name,
            params.iter().map(|p| p.ty.clone()).collect(),
            return_type.clone(),
            self.current_body,
        );

        let body = if self.eat(TokenKind::Semi) {
            self.symbols.clear_scope(body_id);
            None
        } else {
            Some(self.parse_block(body_id)?)
        };

        Ok(FuncDecl {
            id,
            name,
            params,
            return_type,
            body_id,
            body,
            span: start.merge(self.prev_span()),
        })
    }

    fn parse_var_decl(&mut self, ty: TypeDesc, start: Span) -> Result<VarDecl, ParseError> {
        if ty.is_void() {
            return Err(self.err_incorrect_type("a non-void type", &ty, start));
        }
        let name = self.expect(TokenKind::Ident)?.text.clone();
        self.expect(TokenKind::Eq)?;
        let value = self.parse_binary()?;
        if !ty.accepts(&value.ty) {
            return Err(self.err_incorrect_type(ty.to_string(), &value.ty, value.span));
        }
        let id = self.symbols.declare_variable(&name, ty.clone(), self.current_body);
        Ok(VarDecl {
            id,
            name,
            ty,
            value,
            span: start.merge(self.prev_span()),
        })
    }

    fn parse_type(&mut self) -> Result<TypeDesc, ParseError> {
        let mut ty = match self.peek() {
            TokenKind::Void => TypeDesc::void(),
            TokenKind::Int => TypeDesc::int(),
            TokenKind::Float => TypeDesc::float(),
            TokenKind::Char => TypeDesc::char(),
            _ => return Err(self.err_expected("a type")),
        };
        self.advance();
        loop {
            if self.eat(TokenKind::Star) {
                ty = TypeDesc::pointer_to(ty);
            } else if self.at(TokenKind::LBracket) && self.peek_n(1) == TokenKind::RBracket {
                self.advance();
                self.advance();
                ty = TypeDesc::array_of(ty);
            } else {
                break;
            }
        }
        Ok(ty)
    }

    // ==================== STATEMENTS ====================

    fn parse_block(&mut self, body_id: BodyId) -> Result<Vec<Stmt>, ParseError> {
        self.expect(TokenKind::LBrace)?;
        let saved = self.current_body;
        self.current_body = Some(body_id);

        let mut stmts = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            stmts.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RBrace)?;

        self.symbols.clear_scope(body_id);
        self.current_body = saved;
        Ok(stmts)
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        match self.peek() {
            TokenKind::For => self.parse_for(),
            TokenKind::If => self.parse_if(),
            TokenKind::Return => {
                let stmt = self.parse_return()?;
                self.expect(TokenKind::Semi)?;
                Ok(stmt)
            }
            kind if kind.is_type_keyword() => {
                let start = self.span();
                let ty = self.parse_type()?;
                let decl = self.parse_var_decl(ty, start)?;
                self.expect(TokenKind::Semi)?;
                Ok(Stmt::VarDecl(decl))
            }
            TokenKind::Star | TokenKind::Ident => {
                let stmt = self.parse_simple_statement()?;
                self.expect(TokenKind::Semi)?;
                Ok(stmt)
            }
            _ => Err(self.err_unknown_statement(self.span())),
        }
    }

    /// An assignment or a call, without the trailing semicolon; also the
    /// `for` loop's init and step position
    fn parse_simple_statement(&mut self) -> Result<Stmt, ParseError> {
        match self.peek() {
            TokenKind::Ident if self.peek_n(1) == TokenKind::LParen => {
                Ok(Stmt::Call(self.parse_func_call()?))
            }
            TokenKind::Ident | TokenKind::Star => self.parse_assign(),
            _ => Err(self.err_unknown_statement(self.span())),
        }
    }

    fn parse_assign(&mut self) -> Result<Stmt, ParseError> {
        let start = self.span();
        let target = self.parse_value()?;
        if !matches!(target.kind, ExprKind::Var { .. } | ExprKind::Deref(_)) {
            return Err(self.err_unknown_statement(target.span));
        }
        self.expect(TokenKind::Eq)?;
        let value = self.parse_binary()?;
        if !target.ty.accepts(&value.ty) {
            return Err(self.err_incorrect_type(target.ty.to_string(), &value.ty, value.span));
        }
        Ok(Stmt::Assign(Assign {
            target,
            value,
            span: start.merge(self.prev_span()),
        }))
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let start = self.span();
        self.expect(TokenKind::If)?;
        let condition = self.parse_binary()?;
        let body_id = self.bodies.alloc(self.current_body);
        let body = self.parse_block(body_id)?;
        Ok(Stmt::If(IfStmt {
            body_id,
            condition,
            body,
            span: start.merge(self.prev_span()),
        }))
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        let start = self.span();
        self.expect(TokenKind::For)?;
        self.expect(TokenKind::LParen)?;

        // The loop's own body owns the init variable, so the whole header
        // parses inside it.
        let body_id = self.bodies.alloc(self.current_body);
        let saved = self.current_body;
        self.current_body = Some(body_id);

        let init = if self.eat(TokenKind::Semi) {
            None
        } else {
            let stmt = if self.peek().is_type_keyword() {
                let ty_start = self.span();
                let ty = self.parse_type()?;
                Stmt::VarDecl(self.parse_var_decl(ty, ty_start)?)
            } else {
                self.parse_simple_statement()?
            };
            self.expect(TokenKind::Semi)?;
            Some(Box::new(stmt))
        };

        let condition = if self.eat(TokenKind::Semi) {
            None
        } else {
            let cond = self.parse_binary()?;
            if !cond.ty.is_integer() {
                return Err(self.err_incorrect_type("int", &cond.ty, cond.span));
            }
            self.expect(TokenKind::Semi)?;
            Some(cond)
        };

        let step = if self.at(TokenKind::RParen) {
            None
        } else {
            Some(Box::new(self.parse_simple_statement()?))
        };
        self.expect(TokenKind::RParen)?;

        let body = self.parse_block(body_id)?;
        self.current_body = saved;

        Ok(Stmt::For(ForStmt {
            body_id,
            init,
            condition,
            step,
            body,
            span: start.merge(self.prev_span()),
        }))
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        let start = self.span();
        self.expect(TokenKind::Return)?;
        let value = self.parse_binary()?;
        Ok(Stmt::Return(ReturnStmt {
            value,
            span: start.merge(self.prev_span()),
        }))
    }

    // ==================== EXPRESSIONS ====================

    fn parse_binary(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                // A bare `=` ends the expression; `==` is equality
                TokenKind::Eq if self.peek_n(1) == TokenKind::Eq => BinaryOp::Eq,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Lt => BinaryOp::Lt,
                _ => break,
            };
            let op = match op {
                BinaryOp::Eq => {
                    self.advance();
                    self.advance();
                    BinaryOp::Eq
                }
                BinaryOp::Gt if self.peek_n(1) == TokenKind::Eq => {
                    self.advance();
                    self.advance();
                    BinaryOp::Ge
                }
                BinaryOp::Lt if self.peek_n(1) == TokenKind::Eq => {
                    self.advance();
                    self.advance();
                    BinaryOp::Le
                }
                other => {
                    self.advance();
                    other
                }
            };
            let right = self.parse_multiplicative()?;
            left = self.binary_expr(op, left, right)?;
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_array_element()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            self.advance();
            let right = self.parse_array_element()?;
            left = self.binary_expr(op, left, right)?;
        }
        Ok(left)
    }

    /// Both operands must be numeric; the result is float as soon as either
    /// side is, otherwise the left type.
    fn binary_expr(&mut self, op: BinaryOp, left: Expr, right: Expr) -> Result<Expr, ParseError> {
        if !left.ty.is_numeric() {
            return Err(self.err_incorrect_type("int or float", &left.ty, left.span));
        }
        if !right.ty.is_numeric() {
            return Err(self.err_incorrect_type("int or float", &right.ty, right.span));
        }
        let ty = if left.ty.kind == ValueKind::Float || right.ty.kind == ValueKind::Float {
            TypeDesc::float()
        } else {
            left.ty.clone()
        };
        let span = left.span.merge(right.span);
        Ok(Expr {
            kind: ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            ty,
            span,
        })
    }

    fn parse_array_element(&mut self) -> Result<Expr, ParseError> {
        let mut value = self.parse_unary()?;
        while self.eat(TokenKind::LBracket) {
            let index = self.parse_binary()?;
            self.expect(TokenKind::RBracket)?;
            if !index.ty.is_integer() {
                return Err(self.err_incorrect_type("int", &index.ty, index.span));
            }
            let Some(element) = value.ty.element().cloned() else {
                return Err(self.err_incorrect_type("an array or pointer", &value.ty, value.span));
            };
            let span = value.span.merge(self.prev_span());
            value = Expr {
                kind: ExprKind::Index {
                    value: Box::new(value),
                    index: Box::new(index),
                },
                ty: element,
                span,
            };
        }
        Ok(value)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let start = self.span();
        let op = match self.peek() {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            _ => None,
        };
        let Some(op) = op else {
            return self.parse_value();
        };
        self.advance();
        let operand = self.parse_value()?;
        if !operand.ty.is_numeric() {
            return Err(self.err_incorrect_type("int or float", &operand.ty, operand.span));
        }
        let ty = operand.ty.clone();
        let span = start.merge(operand.span);
        Ok(Expr {
            kind: ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            ty,
            span,
        })
    }

    fn parse_value(&mut self) -> Result<Expr, ParseError> {
        let start = self.span();
        match self.peek() {
            TokenKind::Number => {
                let text = self.advance().text.clone();
                let n: f64 = text
                    .parse()
                    .map_err(|_| self.err_expected_value(start))?;
                // A fractional part of zero still parses as an integer
                if n.fract() == 0.0 {
                    Ok(Expr {
                        kind: ExprKind::IntLit(n as i64),
                        ty: TypeDesc::int(),
                        span: start,
                    })
                } else {
                    Ok(Expr {
                        kind: ExprKind::FloatLit(n),
                        ty: TypeDesc::float(),
                        span: start,
                    })
                }
            }
            TokenKind::CharLit => {
                let text = self.advance().text.clone();
                let c = text.chars().next().ok_or(self.err_expected_value(start))?;
                Ok(Expr {
                    kind: ExprKind::CharLit(c),
                    ty: TypeDesc::char(),
                    span: start,
                })
            }
            TokenKind::StringLit => {
                let text = self.advance().text.clone();
                // Strings are char arrays with one trailing NUL
                let elements = text
                    .chars()
                    .chain(std::iter::once('\0'))
                    .map(|c| Expr {
                        kind: ExprKind::CharLit(c),
                        ty: TypeDesc::char(),
                        span: start,
                    })
                    .collect();
                Ok(Expr {
                    kind: ExprKind::ArrayLit(elements),
                    ty: TypeDesc::array_of(TypeDesc::char()),
                    span: start,
                })
            }
            TokenKind::Ident => {
                if self.peek_n(1) == TokenKind::LParen {
                    let call = self.parse_func_call()?;
                    return Ok(Expr {
                        ty: call.ret.clone(),
                        span: call.span,
                        kind: ExprKind::Call(call),
                    });
                }
                let name = self.advance().text.clone();
                let Some(sym) =
                    self.symbols
                        .resolve_variable(&name, self.current_body, &self.bodies)
                else {
                    return Err(ParseError::UnknownVariable {
                        name,
                        span: start.into(),
                        src: self.src(),
                    });
                };
                Ok(Expr {
                    ty: sym.ty.clone(),
                    kind: ExprKind::Var { id: sym.id, name },
                    span: start,
                })
            }
            TokenKind::Star => {
                self.advance();
                let operand = self.parse_binary()?;
                let Some(pointee) = operand.ty.element().cloned() else {
                    return Err(self.err_incorrect_type(
                        "an array or pointer",
                        &operand.ty,
                        operand.span,
                    ));
                };
                let span = start.merge(operand.span);
                Ok(Expr {
                    kind: ExprKind::Deref(Box::new(operand)),
                    ty: pointee,
                    span,
                })
            }
            TokenKind::Amp => {
                self.advance();
                let operand = self.parse_binary()?;
                let ty = TypeDesc::pointer_to(operand.ty.clone());
                let span = start.merge(operand.span);
                Ok(Expr {
                    kind: ExprKind::Ref(Box::new(operand)),
                    ty,
                    span,
                })
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_binary()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            _ => Err(self.err_expected_value(start)),
        }
    }

    fn parse_func_call(&mut self) -> Result<Call, ParseError> {
        let start = self.span();
        let name = self.expect(TokenKind::Ident)?.text.clone();
        self.expect(TokenKind::LParen)?;

        let mut args = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                args.push(self.parse_binary()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        let span = start.merge(self.prev_span());

        let arg_types: Vec<TypeDesc> = args.iter().map(|a| a.ty.clone()).collect();
        let Some(sig) =
            self.symbols
                .resolve_function(&name, &arg_types, self.current_body, &self.bodies)
        else {
            return Err(ParseError::UnknownFunction {
                name,
                span: start.into(),
                src: self.src(),
            });
        };

        Ok(Call {
            id: sig.id,
            name,
            args,
            ret: sig.return_type.clone(),
            span,
        })
    }
}
