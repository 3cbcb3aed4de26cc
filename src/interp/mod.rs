//! Tree-walking evaluator
//!
//! Values are reference counted: the `Rc` strong count of a [`value::ValueRef`]
//! is the number of owners (bindings plus in-flight temporaries). Pointers
//! hold weak aliases and never keep their target alive.

pub mod env;
pub mod eval;
pub mod natives;
pub mod value;

pub use env::Environment;
pub use eval::Interpreter;
pub use natives::NativeRegistry;
pub use value::{Value, ValueRef};
