//! Statement and expression evaluation
//!
//! Statement evaluation returns `Ok(Some(value))` when a `return` is in
//! flight; the signal propagates out of nested blocks and loops until the
//! enclosing call consumes it. Expression evaluation produces a [`ValueRef`];
//! dereferencing a true pointer yields the aliased value itself, not a copy,
//! which is what makes in-place pointer writes observable.

use std::rc::Rc;

use crate::ast::*;
use crate::common::Span;
use crate::diagnostics::RuntimeError;
use crate::types::ValueKind;

use super::env::{Environment, FuncInstance, ScopeId, VarInstance};
use super::natives::{NativeContext, NativeFn, NativeRegistry};
use super::value::{ArrayValue, PointerValue, Value, ValueRef};

/// What a function instance runs when called
#[derive(Clone)]
pub enum Callable {
    User(Rc<FuncDecl>),
    Native(NativeFn),
}

impl std::fmt::Debug for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Callable::User(decl) => write!(f, "User({})", decl.name),
            Callable::Native(_) => write!(f, "Native"),
        }
    }
}

/// Tree-walking evaluator
pub struct Interpreter {
    env: Environment,
    registry: NativeRegistry,
    /// Output captured from natives, one line per entry
    output: Vec<String>,
    /// Echo native output to stdout
    echo: bool,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_registry(NativeRegistry::with_builtins())
    }

    pub fn with_registry(registry: NativeRegistry) -> Self {
        Interpreter {
            env: Environment::new(),
            registry,
            output: Vec::new(),
            echo: false,
        }
    }

    /// Echo native output to stdout as it is produced
    pub fn echo_output(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Captured output lines (for testing)
    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Run a program from its entry point: a zero-argument `main`
    pub fn run(&mut self, program: &Program) -> Result<Value, RuntimeError> {
        self.install(program)?;

        let main = self
            .env
            .functions_named("main", None)
            .find(|f| match &f.callable {
                Callable::User(decl) => decl.params.is_empty(),
                Callable::Native(_) => false,
            })
            .ok_or(RuntimeError::EntryPointNotFound)?;
        let callable = main.callable.clone();

        tracing::debug!("entering main");
        let result = self.call(callable, Vec::new(), Span::default())?;
        let value = result.borrow().clone();
        Ok(value)
    }

    /// Bind natives (registry order, so ids line up with the parse) and then
    /// every top-level declaration.
    fn install(&mut self, program: &Program) -> Result<(), RuntimeError> {
        for (index, binding) in self.registry.bindings().iter().enumerate() {
            self.env.bind_function(FuncInstance {
                id: crate::resolve::FuncId(index as u32),
                name: binding.name.to_string(),
                owner: None,
                callable: Callable::Native(binding.func),
            });
        }

        for stmt in &program.stmts {
            let Stmt::FuncDecl(decl) = stmt else {
                return Err(RuntimeError::UnknownStatement {
                    span: stmt.span().into(),
                });
            };
            // A bodyless declaration whose signature matches a native binds
            // to that native, the way an injected header binds its runtime.
            let callable = if decl.body.is_none() {
                let params: Vec<_> = decl.params.iter().map(|p| p.ty.clone()).collect();
                match self.registry.find(&decl.name, &params) {
                    Some(binding) => Callable::Native(binding.func),
                    None => Callable::User(Rc::new(decl.clone())),
                }
            } else {
                Callable::User(Rc::new(decl.clone()))
            };
            self.env.bind_function(FuncInstance {
                id: decl.id,
                name: decl.name.clone(),
                owner: None,
                callable,
            });
        }
        Ok(())
    }

    // ==================== CALLS ====================

    fn call(
        &mut self,
        callable: Callable,
        args: Vec<ValueRef>,
        span: Span,
    ) -> Result<ValueRef, RuntimeError> {
        match callable {
            Callable::Native(func) => {
                let mut ctx = NativeContext {
                    output: &mut self.output,
                    echo: self.echo,
                };
                func(&mut ctx, args, span)
            }
            Callable::User(decl) => {
                let Some(body) = &decl.body else {
                    // Forward declaration with no native behind it
                    return Ok(Value::Void.into_ref());
                };

                // Function activations parent at the global scope: callees
                // never see caller locals.
                let scope = self.env.enter_scope(None);
                for (param, arg) in decl.params.iter().zip(args) {
                    self.env.bind_variable(VarInstance {
                        id: param.id,
                        name: param.name.clone(),
                        owner: Some(scope),
                        value: arg,
                    });
                }

                let result = self.eval_body(body, scope);
                self.env.exit_scope(scope);

                Ok(result?.unwrap_or_else(|| Value::Void.into_ref()))
            }
        }
    }

    fn eval_call(&mut self, call: &Call, scope: ScopeId) -> Result<ValueRef, RuntimeError> {
        let callable = self
            .env
            .function(call.id, Some(scope))
            .ok_or_else(|| RuntimeError::Internal {
                message: format!("unresolved function `{}`", call.name),
                span: call.span.into(),
            })?
            .callable
            .clone();

        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            args.push(self.eval_expr(arg, scope)?);
        }
        self.call(callable, args, call.span)
    }

    // ==================== STATEMENTS ====================

    /// Run statements in `scope`; `Some` is a return in flight
    fn eval_body(
        &mut self,
        stmts: &[Stmt],
        scope: ScopeId,
    ) -> Result<Option<ValueRef>, RuntimeError> {
        for stmt in stmts {
            if let Some(value) = self.eval_stmt(stmt, scope)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    fn eval_stmt(
        &mut self,
        stmt: &Stmt,
        scope: ScopeId,
    ) -> Result<Option<ValueRef>, RuntimeError> {
        match stmt {
            Stmt::FuncDecl(decl) => Err(RuntimeError::UnknownStatement {
                span: decl.span.into(),
            }),
            Stmt::Call(call) => {
                self.eval_call(call, scope)?;
                Ok(None)
            }
            Stmt::VarDecl(decl) => {
                let value = self.eval_expr(&decl.value, scope)?;
                self.env.bind_variable(VarInstance {
                    id: decl.id,
                    name: decl.name.clone(),
                    owner: Some(scope),
                    value,
                });
                Ok(None)
            }
            Stmt::Assign(assign) => {
                self.eval_assign(assign, scope)?;
                Ok(None)
            }
            Stmt::If(stmt) => {
                let condition = self.eval_expr(&stmt.condition, scope)?;
                let truthy = condition.borrow().is_truthy();
                if !truthy {
                    return Ok(None);
                }
                let body_scope = self.env.enter_scope(Some(scope));
                let result = self.eval_body(&stmt.body, body_scope);
                self.env.exit_scope(body_scope);
                result
            }
            Stmt::For(stmt) => self.eval_for(stmt, scope),
            Stmt::Return(stmt) => {
                let value = self.eval_expr(&stmt.value, scope)?;
                Ok(Some(value))
            }
        }
    }

    /// RHS first, then the target. Assigning through a variable rebinds it;
    /// assigning through a dereference writes the aliased storage in place.
    fn eval_assign(&mut self, assign: &Assign, scope: ScopeId) -> Result<(), RuntimeError> {
        let value = self.eval_expr(&assign.value, scope)?;
        match &assign.target.kind {
            ExprKind::Var { id, name } => {
                let instance = self.env.variable_mut(*id, Some(scope)).ok_or_else(|| {
                    RuntimeError::Internal {
                        message: format!("unresolved variable `{name}`"),
                        span: assign.target.span.into(),
                    }
                })?;
                instance.value = value;
                Ok(())
            }
            ExprKind::Deref(_) => {
                let target = self.eval_expr(&assign.target, scope)?;
                let source = value.borrow().clone();
                target.borrow_mut().set(source);
                Ok(())
            }
            _ => Err(RuntimeError::UnknownStatement {
                span: assign.span.into(),
            }),
        }
    }

    /// Condition, body, step; the loop header's variable lives in the loop
    /// scope, each iteration's body in a scope of its own.
    fn eval_for(
        &mut self,
        stmt: &ForStmt,
        scope: ScopeId,
    ) -> Result<Option<ValueRef>, RuntimeError> {
        let loop_scope = self.env.enter_scope(Some(scope));

        let result = (|| -> Result<Option<ValueRef>, RuntimeError> {
            if let Some(init) = &stmt.init {
                self.eval_stmt(init, loop_scope)?;
            }
            loop {
                if let Some(condition) = &stmt.condition {
                    let value = self.eval_expr(condition, loop_scope)?;
                    let truthy = value.borrow().is_truthy();
                    if !truthy {
                        return Ok(None);
                    }
                }

                let body_scope = self.env.enter_scope(Some(loop_scope));
                let flow = self.eval_body(&stmt.body, body_scope);
                self.env.exit_scope(body_scope);
                if let Some(value) = flow? {
                    return Ok(Some(value));
                }

                if let Some(step) = &stmt.step {
                    self.eval_stmt(step, loop_scope)?;
                }
            }
        })();

        self.env.exit_scope(loop_scope);
        result
    }

    // ==================== EXPRESSIONS ====================

    fn eval_expr(&mut self, expr: &Expr, scope: ScopeId) -> Result<ValueRef, RuntimeError> {
        match &expr.kind {
            ExprKind::IntLit(n) => Ok(Value::Int(*n).into_ref()),
            ExprKind::FloatLit(x) => Ok(Value::Float(*x).into_ref()),
            ExprKind::CharLit(c) => Ok(Value::Char(*c).into_ref()),
            ExprKind::ArrayLit(elements) => self.eval_array_lit(expr, elements, scope),
            ExprKind::Var { id, name } => {
                let instance = self.env.variable(*id, Some(scope)).ok_or_else(|| {
                    RuntimeError::Internal {
                        message: format!("unresolved variable `{name}`"),
                        span: expr.span.into(),
                    }
                })?;
                Ok(Rc::clone(&instance.value))
            }
            ExprKind::Call(call) => self.eval_call(call, scope),
            ExprKind::Binary { op, left, right } => {
                let lhs = self.eval_expr(left, scope)?;
                let rhs = self.eval_expr(right, scope)?;
                eval_binary(*op, &lhs, &rhs, expr.span)
            }
            ExprKind::Unary { op, operand } => {
                let value = self.eval_expr(operand, scope)?;
                eval_unary(*op, &value, expr.span)
            }
            ExprKind::Ref(operand) => {
                let target = self.eval_expr(operand, scope)?;
                Ok(Value::Pointer(PointerValue {
                    pointee: Rc::downgrade(&target),
                })
                .into_ref())
            }
            ExprKind::Deref(operand) => {
                let value = self.eval_expr(operand, scope)?;
                let inner = value.borrow();
                match &*inner {
                    // The aliased value itself; writes through it are
                    // observable at every other owner
                    Value::Pointer(p) => {
                        p.pointee
                            .upgrade()
                            .ok_or(RuntimeError::DanglingPointer {
                                span: expr.span.into(),
                            })
                    }
                    // Dereferencing an array reads its first element
                    Value::Array(array) => {
                        if array.capacity() == 0 {
                            return Err(RuntimeError::IndexOutOfRange {
                                index: 0,
                                capacity: 0,
                                span: expr.span.into(),
                            });
                        }
                        Ok(array.at(0).into_ref())
                    }
                    other => Err(RuntimeError::IncorrectType {
                        message: format!("cannot dereference {}", other.type_name()),
                        span: expr.span.into(),
                    }),
                }
            }
            ExprKind::Index { value, index } => {
                let target = self.eval_expr(value, scope)?;
                let index_value = self.eval_expr(index, scope)?;
                let index = index_value.borrow().as_int();
                if index < 0 {
                    return Err(RuntimeError::NegativeIndex {
                        index,
                        span: expr.span.into(),
                    });
                }
                let target = target.borrow();
                let Value::Array(array) = &*target else {
                    return Err(RuntimeError::IncorrectType {
                        message: format!("cannot index {}", target.type_name()),
                        span: expr.span.into(),
                    });
                };
                if index as usize >= array.capacity() {
                    return Err(RuntimeError::IndexOutOfRange {
                        index,
                        capacity: array.capacity(),
                        span: expr.span.into(),
                    });
                }
                Ok(array.at(index as usize).into_ref())
            }
        }
    }

    /// Array literals come from string literals, so the elements are known
    /// to share one kind; storage is chosen from the static element type.
    fn eval_array_lit(
        &mut self,
        expr: &Expr,
        elements: &[Expr],
        scope: ScopeId,
    ) -> Result<ValueRef, RuntimeError> {
        let element_kind = expr
            .ty
            .element()
            .map(|t| t.kind)
            .unwrap_or(ValueKind::Character);
        let array = match element_kind {
            ValueKind::Integer => {
                let mut data = Vec::with_capacity(elements.len());
                for element in elements {
                    data.push(self.eval_expr(element, scope)?.borrow().as_int());
                }
                ArrayValue::Ints(data)
            }
            ValueKind::Float => {
                let mut data = Vec::with_capacity(elements.len());
                for element in elements {
                    data.push(self.eval_expr(element, scope)?.borrow().as_float());
                }
                ArrayValue::Floats(data)
            }
            _ => {
                let mut data = Vec::with_capacity(elements.len());
                for element in elements {
                    let value = self.eval_expr(element, scope)?;
                    let c = match &*value.borrow() {
                        Value::Char(c) => *c,
                        other => {
                            return Err(RuntimeError::IncorrectType {
                                message: format!(
                                    "array element should be char, found {}",
                                    other.type_name()
                                ),
                                span: element.span.into(),
                            });
                        }
                    };
                    data.push(c);
                }
                ArrayValue::Chars(data)
            }
        };
        Ok(Value::Array(array).into_ref())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Arithmetic runs through float and narrows back to int only when both
/// operands were ints; comparisons yield 1 or 0 under the same rule.
fn eval_binary(
    op: BinaryOp,
    lhs: &ValueRef,
    rhs: &ValueRef,
    span: Span,
) -> Result<ValueRef, RuntimeError> {
    let left = lhs.borrow();
    let right = rhs.borrow();
    for operand in [&*left, &*right] {
        if !matches!(operand, Value::Int(_) | Value::Float(_)) {
            return Err(RuntimeError::IncorrectType {
                message: format!("expected a number, found {}", operand.type_name()),
                span: span.into(),
            });
        }
    }

    let a = left.as_float();
    let b = right.as_float();
    if op == BinaryOp::Div && b == 0.0 {
        return Err(RuntimeError::DivisionByZero { span: span.into() });
    }
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Eq => (a == b) as i64 as f64,
        BinaryOp::Lt => (a < b) as i64 as f64,
        BinaryOp::Gt => (a > b) as i64 as f64,
        BinaryOp::Le => (a <= b) as i64 as f64,
        BinaryOp::Ge => (a >= b) as i64 as f64,
    };

    let both_int = matches!((&*left, &*right), (Value::Int(_), Value::Int(_)));
    let value = if both_int {
        Value::Int(result as i64)
    } else {
        Value::Float(result)
    };
    Ok(value.into_ref())
}

fn eval_unary(op: UnaryOp, operand: &ValueRef, span: Span) -> Result<ValueRef, RuntimeError> {
    let value = operand.borrow();
    let result = match (op, &*value) {
        (UnaryOp::Neg, Value::Int(n)) => Value::Int(-n),
        (UnaryOp::Neg, Value::Float(x)) => Value::Float(-x),
        (UnaryOp::Not, Value::Int(n)) => Value::Int((*n == 0) as i64),
        (UnaryOp::Not, Value::Float(x)) => Value::Float((*x == 0.0) as i64 as f64),
        (_, other) => {
            return Err(RuntimeError::IncorrectType {
                message: format!("expected a number, found {}", other.type_name()),
                span: span.into(),
            });
        }
    };
    Ok(result.into_ref())
}
