//! Parser integration tests
//!
//! The parser checks while it parses, so these cover grammar, inline type
//! checking, and name resolution together.

use cinder::ast::{BinaryOp, Expr, ExprKind, Program, Stmt};
use cinder::diagnostics::ParseError;

fn parse(source: &str) -> Result<Program, ParseError> {
    cinder::parse("test.cn", source)
}

fn parse_ok(source: &str) -> Program {
    match parse(source) {
        Ok(program) => program,
        Err(e) => panic!("Parse failed: {e}"),
    }
}

/// The expression of the first `return` in `main`'s body
fn main_return_expr(program: &Program) -> &Expr {
    for stmt in &program.stmts {
        let Stmt::FuncDecl(decl) = stmt else { continue };
        if decl.name != "main" {
            continue;
        }
        for stmt in decl.body.as_deref().unwrap_or(&[]) {
            if let Stmt::Return(ret) = stmt {
                return &ret.value;
            }
        }
    }
    panic!("no return in main");
}

// ==================== Declarations ====================

#[test]
fn test_function_declaration_parses() {
    let program = parse_ok(
        r#"
int add(int a, int b) {
    return a + b;
}
"#,
    );
    assert_eq!(program.stmts.len(), 1);
    let Stmt::FuncDecl(decl) = &program.stmts[0] else {
        panic!("expected a function declaration");
    };
    assert_eq!(decl.name, "add");
    assert_eq!(decl.params.len(), 2);
    assert!(decl.body.is_some());
}

#[test]
fn test_natives_take_the_first_ids() {
    let program = parse_ok("int main() { return 0; }");
    // Four printf overloads precede user declarations
    assert_eq!(program.functions.len(), 5);
    let main = program.functions.last().unwrap();
    assert_eq!(main.name, "main");
    assert_eq!(main.id.0, 4);
}

#[test]
fn test_bodyless_declaration() {
    let program = parse_ok("int speak(int x);");
    let Stmt::FuncDecl(decl) = &program.stmts[0] else {
        panic!("expected a function declaration");
    };
    assert!(decl.body.is_none());
}

#[test]
fn test_nested_declarator_types() {
    parse_ok(
        r#"
int main() {
    int a = 1;
    int* p = &a;
    int** q = &p;
    return **q;
}
"#,
    );
}

#[test]
fn test_void_variable_is_rejected() {
    let err = parse("int main() { void v = 0; return 0; }").unwrap_err();
    assert!(matches!(err, ParseError::IncorrectType { .. }));
}

#[test]
fn test_top_level_must_be_a_declaration() {
    let err = parse("return 1;").unwrap_err();
    assert!(matches!(err, ParseError::UnknownStatement { .. }));
}

#[test]
fn test_stray_top_level_semicolon_is_rejected() {
    let err = parse("int speak(int x);;").unwrap_err();
    assert!(matches!(err, ParseError::UnknownStatement { .. }));
}

#[test]
fn test_nested_function_declaration_is_rejected() {
    let err = parse("int main() { int f() { return 1; } }").unwrap_err();
    assert!(matches!(err, ParseError::ExpectedToken { .. }));
}

// ==================== Types ====================

#[test]
fn test_var_decl_type_mismatch() {
    let err = parse("int main() { int a = 1.5; return a; }").unwrap_err();
    assert!(matches!(err, ParseError::IncorrectType { .. }));
}

#[test]
fn test_int_widens_into_float_declaration() {
    parse_ok("int main() { float f = 1; return 0; }");
}

#[test]
fn test_assignment_type_mismatch() {
    let err = parse(
        r#"
int main() {
    int a = 1;
    a = 2.5;
    return a;
}
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ParseError::IncorrectType { .. }));
}

#[test]
fn test_binary_operands_must_be_numeric() {
    let err = parse(
        r#"
int main() {
    int a = 1;
    int* p = &a;
    return p + 1;
}
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ParseError::IncorrectType { .. }));
}

#[test]
fn test_deref_requires_indirection() {
    let err = parse("int main() { int a = 1; return *a; }").unwrap_err();
    assert!(matches!(err, ParseError::IncorrectType { .. }));
}

#[test]
fn test_for_condition_must_be_integer() {
    let err = parse("int main() { for (int i = 0; 1.5; ) { } return 0; }").unwrap_err();
    assert!(matches!(err, ParseError::IncorrectType { .. }));
}

#[test]
fn test_index_must_be_integer() {
    let err = parse(
        r#"
int main() {
    char[] s = "hi";
    char c = s[1.5];
    return 0;
}
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ParseError::IncorrectType { .. }));
}

// ==================== Resolution ====================

#[test]
fn test_unknown_variable() {
    let err = parse("int main() { return nope; }").unwrap_err();
    assert!(matches!(err, ParseError::UnknownVariable { .. }));
}

#[test]
fn test_unknown_function() {
    let err = parse("int main() { return nope(); }").unwrap_err();
    assert!(matches!(err, ParseError::UnknownFunction { .. }));
}

#[test]
fn test_overload_mismatch_is_unknown_function() {
    // `printf` exists, but no overload takes two arguments
    let err = parse(r#"int main() { printf("a", 1); return 0; }"#).unwrap_err();
    assert!(matches!(err, ParseError::UnknownFunction { name, .. } if name == "printf"));
}

#[test]
fn test_block_local_is_invisible_after_block() {
    let err = parse(
        r#"
int main() {
    if 1 {
        int inner = 2;
    }
    return inner;
}
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ParseError::UnknownVariable { name, .. } if name == "inner"));
}

#[test]
fn test_loop_variable_is_invisible_after_loop() {
    let err = parse(
        r#"
int main() {
    for (int i = 0; i < 3; i = i + 1) { }
    return i;
}
"#,
    )
    .unwrap_err();
    assert!(matches!(err, ParseError::UnknownVariable { name, .. } if name == "i"));
}

#[test]
fn test_shadowing_declarations_get_distinct_ids() {
    let program = parse_ok(
        r#"
int main() {
    int x = 1;
    if x {
        int x = 2;
        printf(x);
    }
    return x;
}
"#,
    );
    let Stmt::FuncDecl(decl) = &program.stmts[0] else {
        panic!("expected a function declaration");
    };
    let body = decl.body.as_ref().unwrap();
    let Stmt::VarDecl(outer) = &body[0] else {
        panic!("expected outer declaration");
    };
    let Stmt::If(if_stmt) = &body[1] else {
        panic!("expected if");
    };
    let Stmt::VarDecl(inner) = &if_stmt.body[0] else {
        panic!("expected inner declaration");
    };
    assert_ne!(outer.id, inner.id);

    // The final return resolves to the outer declaration again
    let Stmt::Return(ret) = &body[2] else {
        panic!("expected return");
    };
    let ExprKind::Var { id, .. } = &ret.value.kind else {
        panic!("expected a variable reference");
    };
    assert_eq!(*id, outer.id);
}

// ==================== Expressions ====================

#[test]
fn test_precedence_shape() {
    let program = parse_ok("int main() { return 2 + 3 * 4; }");
    let expr = main_return_expr(&program);
    let ExprKind::Binary { op, right, .. } = &expr.kind else {
        panic!("expected a binary expression");
    };
    assert_eq!(*op, BinaryOp::Add);
    assert!(matches!(
        right.kind,
        ExprKind::Binary {
            op: BinaryOp::Mul,
            ..
        }
    ));
}

#[test]
fn test_left_associativity_shape() {
    let program = parse_ok("int main() { return 10 - 3 - 4; }");
    let expr = main_return_expr(&program);
    let ExprKind::Binary { op, left, .. } = &expr.kind else {
        panic!("expected a binary expression");
    };
    assert_eq!(*op, BinaryOp::Sub);
    assert!(matches!(
        left.kind,
        ExprKind::Binary {
            op: BinaryOp::Sub,
            ..
        }
    ));
}

#[test]
fn test_two_character_operators() {
    for (source, op) in [
        ("int main() { return 1 == 2; }", BinaryOp::Eq),
        ("int main() { return 1 >= 2; }", BinaryOp::Ge),
        ("int main() { return 1 <= 2; }", BinaryOp::Le),
    ] {
        let program = parse_ok(source);
        let expr = main_return_expr(&program);
        let ExprKind::Binary { op: found, .. } = &expr.kind else {
            panic!("expected a binary expression");
        };
        assert_eq!(*found, op);
    }
}

#[test]
fn test_bare_equals_ends_the_expression() {
    let err = parse("int main() { int a = 1 = 2; return a; }").unwrap_err();
    assert!(matches!(err, ParseError::ExpectedToken { .. }));
}

#[test]
fn test_missing_semicolon() {
    let err = parse("int main() { return 1 }").unwrap_err();
    assert!(matches!(err, ParseError::ExpectedToken { .. }));
}

#[test]
fn test_missing_value() {
    let err = parse("int main() { int a = ; return 0; }").unwrap_err();
    assert!(matches!(err, ParseError::ExpectedValue { .. }));
}

#[test]
fn test_string_literal_gains_trailing_nul() {
    let program = parse_ok(
        r#"
int main() {
    char[] s = "hi";
    return 0;
}
"#,
    );
    let Stmt::FuncDecl(decl) = &program.stmts[0] else {
        panic!("expected a function declaration");
    };
    let Stmt::VarDecl(var) = &decl.body.as_ref().unwrap()[0] else {
        panic!("expected a variable declaration");
    };
    let ExprKind::ArrayLit(elements) = &var.value.kind else {
        panic!("expected an array literal");
    };
    assert_eq!(elements.len(), 3);
    assert!(matches!(elements[2].kind, ExprKind::CharLit('\0')));
}

#[test]
fn test_invalid_token() {
    let err = parse("int main() { return 1 @ 2; }").unwrap_err();
    assert!(matches!(err, ParseError::InvalidToken { .. }));
}

#[test]
fn test_unused_punctuation_is_a_parse_error_not_a_lex_error() {
    // `.` and `:` lex, so the parser reports them where they appear
    let err = parse("int main() { int a = 1; return a.b; }").unwrap_err();
    assert!(matches!(err, ParseError::ExpectedToken { .. }));

    let err = parse("int main() { : return 0; }").unwrap_err();
    assert!(matches!(err, ParseError::UnknownStatement { .. }));
}
