//! cinder: a small C-like scripting language
//!
//! A type-checking recursive-descent parser and a reference-counted
//! tree-walking evaluator. The parser resolves every variable and function
//! reference while it parses, so a program that parses is also checked; the
//! evaluator walks the checked tree directly.
//!
//! # Architecture
//!
//! ```text
//! Source → Lexer → Parser (checking + resolution) → Program → Interpreter
//! ```
//!
//! # Example
//!
//! ```c
//! int add(int a, int b) {
//!     return a + b;
//! }
//!
//! int main() {
//!     printf("starting");
//!     return add(2, 3);
//! }
//! ```

pub mod ast;
pub mod common;
pub mod diagnostics;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod resolve;
pub mod types;

// Re-export diagnostics for convenience
pub use diagnostics::{ParseError, RuntimeError, SourceFile};

// Re-exports for convenience
pub use ast::Program;
pub use interp::{Interpreter, NativeRegistry, Value};

/// Interpreter version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parse and check source code
pub fn parse(name: &str, source: &str) -> Result<Program, ParseError> {
    let file = SourceFile::new(name, source);
    let tokens = lexer::lex(&file)?;
    parser::parse(&tokens, &file, &NativeRegistry::with_builtins())
}

/// Parse, check, and run source code, returning `main`'s result
pub fn interpret(name: &str, source: &str) -> miette::Result<Value> {
    let file = SourceFile::new(name, source);
    let tokens = lexer::lex(&file)?;
    let program = parser::parse(&tokens, &file, &NativeRegistry::with_builtins())?;
    let mut interpreter = Interpreter::new().echo_output(true);
    interpreter
        .run(&program)
        .map_err(|e| miette::Report::new(e).with_source_code(file.to_named_source()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
