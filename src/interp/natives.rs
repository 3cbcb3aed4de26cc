//! Native function bindings
//!
//! The registry replaces the standard-library headers a preprocessor would
//! inject: each binding is a name, a parameter signature, and a Rust
//! callback. The driver declares the registry into the parser's function
//! table before any source parses, and the evaluator binds the same entries
//! in the same order, so the ids baked into call sites always resolve.

use super::value::{ArrayValue, Value, ValueRef};
use crate::common::Span;
use crate::diagnostics::RuntimeError;
use crate::types::TypeDesc;

/// Context handed to native callbacks
pub struct NativeContext<'a> {
    /// Captured output lines
    pub output: &'a mut Vec<String>,
    /// Also write to stdout
    pub echo: bool,
}

impl NativeContext<'_> {
    pub fn emit(&mut self, line: String) {
        if self.echo {
            println!("{line}");
        }
        self.output.push(line);
    }
}

/// A native callback; it owns its arguments and must return a value
pub type NativeFn =
    fn(&mut NativeContext<'_>, Vec<ValueRef>, Span) -> Result<ValueRef, RuntimeError>;

/// A registered native function
pub struct NativeBinding {
    pub name: &'static str,
    pub params: Vec<TypeDesc>,
    pub ret: TypeDesc,
    pub func: NativeFn,
}

/// The set of natives available to a program
pub struct NativeRegistry {
    bindings: Vec<NativeBinding>,
}

impl NativeRegistry {
    pub fn empty() -> Self {
        NativeRegistry {
            bindings: Vec::new(),
        }
    }

    /// The built-in `printf` overload family: one per printable first
    /// parameter type, selected like any other overload.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(
            "printf",
            vec![TypeDesc::pointer_to(TypeDesc::char())],
            TypeDesc::void(),
            printf_str,
        );
        registry.register("printf", vec![TypeDesc::int()], TypeDesc::void(), printf_int);
        registry.register(
            "printf",
            vec![TypeDesc::float()],
            TypeDesc::void(),
            printf_float,
        );
        registry.register(
            "printf",
            vec![TypeDesc::char()],
            TypeDesc::void(),
            printf_char,
        );
        registry
    }

    pub fn register(
        &mut self,
        name: &'static str,
        params: Vec<TypeDesc>,
        ret: TypeDesc,
        func: NativeFn,
    ) {
        self.bindings.push(NativeBinding {
            name,
            params,
            ret,
            func,
        });
    }

    pub fn bindings(&self) -> &[NativeBinding] {
        &self.bindings
    }

    /// Find a native matching a bodyless declaration's signature
    pub fn find(&self, name: &str, params: &[TypeDesc]) -> Option<&NativeBinding> {
        self.bindings.iter().find(|b| {
            b.name == name
                && b.params.len() == params.len()
                && b.params.iter().zip(params).all(|(p, d)| p.accepts(d))
        })
    }
}

impl Default for NativeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for NativeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeRegistry")
            .field("bindings", &self.bindings.len())
            .finish()
    }
}

fn first_arg(args: Vec<ValueRef>, span: Span) -> Result<ValueRef, RuntimeError> {
    args.into_iter().next().ok_or(RuntimeError::Internal {
        message: "native called with no arguments".into(),
        span: span.into(),
    })
}

fn printf_str(
    ctx: &mut NativeContext<'_>,
    args: Vec<ValueRef>,
    span: Span,
) -> Result<ValueRef, RuntimeError> {
    let arg = first_arg(args, span)?;
    let line = match &*arg.borrow() {
        Value::Array(ArrayValue::Chars(chars)) => {
            chars.iter().take_while(|c| **c != '\0').collect::<String>()
        }
        other => {
            return Err(RuntimeError::IncorrectType {
                message: format!("printf expected a char array, found {}", other.type_name()),
                span: span.into(),
            });
        }
    };
    ctx.emit(line);
    Ok(Value::Void.into_ref())
}

fn printf_int(
    ctx: &mut NativeContext<'_>,
    args: Vec<ValueRef>,
    span: Span,
) -> Result<ValueRef, RuntimeError> {
    let arg = first_arg(args, span)?;
    let line = arg.borrow().as_int().to_string();
    ctx.emit(line);
    Ok(Value::Void.into_ref())
}

fn printf_float(
    ctx: &mut NativeContext<'_>,
    args: Vec<ValueRef>,
    span: Span,
) -> Result<ValueRef, RuntimeError> {
    let arg = first_arg(args, span)?;
    let line = format!("{:.6}", arg.borrow().as_float());
    ctx.emit(line);
    Ok(Value::Void.into_ref())
}

fn printf_char(
    ctx: &mut NativeContext<'_>,
    args: Vec<ValueRef>,
    span: Span,
) -> Result<ValueRef, RuntimeError> {
    let arg = first_arg(args, span)?;
    let line = match &*arg.borrow() {
        Value::Char(c) => c.to_string(),
        other => other.to_string(),
    };
    ctx.emit(line);
    Ok(Value::Void.into_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_overloads_are_distinct() {
        let registry = NativeRegistry::with_builtins();
        assert_eq!(registry.bindings().len(), 4);
        assert!(registry.find("printf", &[TypeDesc::int()]).is_some());
        assert!(
            registry
                .find("printf", &[TypeDesc::array_of(TypeDesc::char())])
                .is_some()
        );
        assert!(registry.find("printf", &[TypeDesc::void()]).is_none());
        assert!(registry.find("puts", &[TypeDesc::int()]).is_none());
    }

    #[test]
    fn test_printf_str_stops_at_nul() {
        let mut output = Vec::new();
        let mut ctx = NativeContext {
            output: &mut output,
            echo: false,
        };
        let arg = Value::Array(ArrayValue::Chars(vec!['h', 'i', '\0', 'x'])).into_ref();
        printf_str(&mut ctx, vec![arg], Span::default()).unwrap();
        assert_eq!(output, vec!["hi".to_string()]);
    }
}
