//! Runtime values
//!
//! A [`ValueRef`] is shared by every owner of a value: the binding that
//! declared it, any binding that aliased it through a dereference, and the
//! temporaries of the expression being evaluated. Dropping the last owner
//! releases the value; pointers only hold [`std::rc::Weak`] handles, so a
//! pointer whose target is gone upgrades to `None` and the evaluator reports
//! it instead of reading freed storage.

use crate::types::ValueKind;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Shared, mutable handle to a runtime value
pub type ValueRef = Rc<RefCell<Value>>;

/// Runtime value
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Void,
    Char(char),
    Int(i64),
    Float(f64),
    Array(ArrayValue),
    Pointer(PointerValue),
}

/// Homogeneous array storage
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValue {
    Chars(Vec<char>),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
}

impl ArrayValue {
    pub fn capacity(&self) -> usize {
        match self {
            ArrayValue::Chars(v) => v.len(),
            ArrayValue::Ints(v) => v.len(),
            ArrayValue::Floats(v) => v.len(),
        }
    }

    /// Copy out the element at `index`; the caller has bounds-checked
    pub fn at(&self, index: usize) -> Value {
        match self {
            ArrayValue::Chars(v) => Value::Char(v[index]),
            ArrayValue::Ints(v) => Value::Int(v[index]),
            ArrayValue::Floats(v) => Value::Float(v[index]),
        }
    }
}

/// A non-owning alias of another value
#[derive(Debug, Clone)]
pub struct PointerValue {
    pub pointee: Weak<RefCell<Value>>,
}

impl Value {
    pub fn into_ref(self) -> ValueRef {
        Rc::new(RefCell::new(self))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Void => ValueKind::Void,
            Value::Char(_) => ValueKind::Character,
            Value::Int(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::Array(_) => ValueKind::Array,
            Value::Pointer(_) => ValueKind::Pointer,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Void => "void",
            Value::Char(_) => "char",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Array(_) => "array",
            Value::Pointer(_) => "pointer",
        }
    }

    /// Numeric view, also used for truth tests: zero is false
    pub fn as_int(&self) -> i64 {
        match self {
            Value::Int(n) => *n,
            Value::Float(f) => *f as i64,
            Value::Char(c) => *c as i64,
            _ => 0,
        }
    }

    pub fn as_float(&self) -> f64 {
        match self {
            Value::Int(n) => *n as f64,
            Value::Float(f) => *f,
            Value::Char(c) => *c as u32 as f64,
            _ => 0.0,
        }
    }

    pub fn is_truthy(&self) -> bool {
        self.as_int() != 0
    }

    /// Overwrite this value in place, so every alias observes the write.
    /// A float target stays float when assigned an int.
    pub fn set(&mut self, source: Value) {
        match (&*self, source) {
            (Value::Float(_), Value::Int(n)) => *self = Value::Float(n as f64),
            (_, source) => *self = source,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Void, Value::Void) => true,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Pointer(a), Value::Pointer(b)) => a.pointee.ptr_eq(&b.pointee),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => write!(f, "void"),
            Value::Char(c) => write!(f, "{c}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Array(ArrayValue::Chars(chars)) => {
                for c in chars.iter().take_while(|c| **c != '\0') {
                    write!(f, "{c}")?;
                }
                Ok(())
            }
            Value::Array(ArrayValue::Ints(v)) => write!(f, "{v:?}"),
            Value::Array(ArrayValue::Floats(v)) => write!(f, "{v:?}"),
            Value::Pointer(p) => {
                if p.pointee.strong_count() == 0 {
                    write!(f, "<dangling>")
                } else {
                    write!(f, "<pointer>")
                }
            }
        }
    }
}
