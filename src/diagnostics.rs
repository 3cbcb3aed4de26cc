//! Diagnostic reporting with source locations
//!
//! Parse-time and run-time errors are separate enums because only the parser
//! stops on the first error with the offending source attached; the evaluator
//! reports spans and the driver attaches the source text.

use crate::common::Span;
use miette::{Diagnostic, NamedSource, SourceSpan};
use std::sync::Arc;
use thiserror::Error;

/// Source file for error reporting
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub content: Arc<str>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: Arc::from(content.into()),
        }
    }

    pub fn to_named_source(&self) -> NamedSource<String> {
        NamedSource::new(self.name.clone(), self.content.to_string())
    }
}

/// Convert our Span to miette's SourceSpan
impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        SourceSpan::new(span.start.into(), span.len())
    }
}

/// Parse-time diagnostic. The parser stops at the first of these.
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum ParseError {
    #[error("Unrecognized token")]
    #[diagnostic(code(parse::invalid_token))]
    InvalidToken {
        #[label("not a valid token")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("Unknown statement")]
    #[diagnostic(
        code(parse::unknown_statement),
        help("statements are declarations, assignments, calls, `if`, `for` and `return`")
    )]
    UnknownStatement {
        #[label("cannot start a statement")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("Unknown function `{name}`")]
    #[diagnostic(
        code(parse::unknown_function),
        help("overloads are matched by name and by the type of every argument")
    )]
    UnknownFunction {
        name: String,
        #[label("no visible declaration matches these arguments")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("Unknown variable `{name}`")]
    #[diagnostic(code(parse::unknown_variable))]
    UnknownVariable {
        name: String,
        #[label("not found in this scope")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("Out of memory")]
    #[diagnostic(code(parse::out_of_memory))]
    OutOfMemory {
        #[label("while parsing this")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("Expected {expected}, found {found}")]
    #[diagnostic(code(parse::expected_token))]
    ExpectedToken {
        expected: String,
        found: String,
        #[label("unexpected token here")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("Incorrect type: expected `{expected}`, found `{found}`")]
    #[diagnostic(code(parse::incorrect_type))]
    IncorrectType {
        expected: String,
        found: String,
        #[label("type mismatch here")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },

    #[error("Expected a value")]
    #[diagnostic(code(parse::expected_value))]
    ExpectedValue {
        #[label("a value is required here")]
        span: SourceSpan,
        #[source_code]
        src: NamedSource<String>,
    },
}

/// Run-time diagnostic. Evaluation stops at the first of these; the driver
/// attaches the source text when rendering.
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum RuntimeError {
    #[error("Incorrect type: {message}")]
    #[diagnostic(code(runtime::incorrect_type))]
    IncorrectType {
        message: String,
        #[label("while evaluating this")]
        span: SourceSpan,
    },

    #[error("Out of memory")]
    #[diagnostic(code(runtime::out_of_memory))]
    OutOfMemory {
        #[label("while evaluating this")]
        span: SourceSpan,
    },

    #[error("Entry point not found")]
    #[diagnostic(
        code(runtime::entry_point_not_found),
        help("programs start at a zero-argument function named `main`")
    )]
    EntryPointNotFound,

    #[error("Negative array index {index}")]
    #[diagnostic(code(runtime::negative_index))]
    NegativeIndex {
        index: i64,
        #[label("index evaluates to {index}")]
        span: SourceSpan,
    },

    #[error("Index {index} out of range for capacity {capacity}")]
    #[diagnostic(code(runtime::index_out_of_range))]
    IndexOutOfRange {
        index: i64,
        capacity: usize,
        #[label("out of range here")]
        span: SourceSpan,
    },

    #[error("Division by zero")]
    #[diagnostic(code(runtime::division_by_zero))]
    DivisionByZero {
        #[label("divisor evaluates to zero")]
        span: SourceSpan,
    },

    #[error("Dangling pointer")]
    #[diagnostic(
        code(runtime::dangling_pointer),
        help("the value this pointer aliased has already been released")
    )]
    DanglingPointer {
        #[label("dereferenced here")]
        span: SourceSpan,
    },

    #[error("Unknown statement")]
    #[diagnostic(code(runtime::unknown_statement))]
    UnknownStatement {
        #[label("cannot evaluate this statement")]
        span: SourceSpan,
    },

    #[error("Unknown expression")]
    #[diagnostic(code(runtime::unknown_expression))]
    UnknownExpression {
        #[label("cannot evaluate this expression")]
        span: SourceSpan,
    },

    #[error("Internal invariant violated: {message}")]
    #[diagnostic(code(runtime::internal))]
    Internal {
        message: String,
        #[label("while evaluating this")]
        span: SourceSpan,
    },
}
