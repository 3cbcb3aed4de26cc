//! Static type descriptions
//!
//! Every expression node carries a `TypeDesc`. Assignability is structural
//! with one widening rule: an integer is accepted wherever a float is
//! expected, never the other way around.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The shape of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Void,
    Character,
    Integer,
    Float,
    /// Reserved: the `struct` keyword is lexed but no declaration syntax
    /// exists yet, so nothing constructs this kind today
    Structure,
    Array,
    Pointer,
}

/// A static type: a kind, an optional nominal identity, and for arrays and
/// pointers the element/pointee type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDesc {
    pub kind: ValueKind,
    /// Nominal id for named types; `None` for structural types
    pub nominal: Option<u32>,
    pub name: Option<String>,
    pub target: Option<Box<TypeDesc>>,
}

impl TypeDesc {
    pub fn primitive(kind: ValueKind) -> Self {
        TypeDesc {
            kind,
            nominal: None,
            name: None,
            target: None,
        }
    }

    pub fn void() -> Self {
        Self::primitive(ValueKind::Void)
    }

    pub fn int() -> Self {
        Self::primitive(ValueKind::Integer)
    }

    pub fn float() -> Self {
        Self::primitive(ValueKind::Float)
    }

    pub fn char() -> Self {
        Self::primitive(ValueKind::Character)
    }

    pub fn array_of(element: TypeDesc) -> Self {
        TypeDesc {
            kind: ValueKind::Array,
            nominal: None,
            name: None,
            target: Some(Box::new(element)),
        }
    }

    pub fn pointer_to(pointee: TypeDesc) -> Self {
        TypeDesc {
            kind: ValueKind::Pointer,
            nominal: None,
            name: None,
            target: Some(Box::new(pointee)),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.kind, ValueKind::Integer | ValueKind::Float)
    }

    pub fn is_integer(&self) -> bool {
        self.kind == ValueKind::Integer
    }

    pub fn is_void(&self) -> bool {
        self.kind == ValueKind::Void
    }

    /// The element type of an array, or the pointee of a pointer
    pub fn element(&self) -> Option<&TypeDesc> {
        self.target.as_deref()
    }

    /// Whether a value of type `actual` is acceptable where `self` is
    /// expected.
    ///
    /// Arrays and pointers are interchangeable containers: both sides must be
    /// one of the two and their targets must be mutually acceptable. Nominal
    /// types match by id and kind. An integer widens into an expected float;
    /// a float never narrows into an expected integer.
    pub fn accepts(&self, actual: &TypeDesc) -> bool {
        let indirect = |k: ValueKind| matches!(k, ValueKind::Array | ValueKind::Pointer);
        if indirect(self.kind) || indirect(actual.kind) {
            if !(indirect(self.kind) && indirect(actual.kind)) {
                return false;
            }
            return match (self.element(), actual.element()) {
                (Some(expected), Some(found)) => expected.accepts(found),
                _ => false,
            };
        }
        if let Some(id) = self.nominal {
            return actual.nominal == Some(id) && self.kind == actual.kind;
        }
        if self.kind == ValueKind::Float && actual.kind == ValueKind::Integer {
            return true;
        }
        self.kind == actual.kind
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ValueKind::Void => write!(f, "void"),
            ValueKind::Character => write!(f, "char"),
            ValueKind::Integer => write!(f, "int"),
            ValueKind::Float => write!(f, "float"),
            ValueKind::Structure => match &self.name {
                Some(name) => write!(f, "struct {name}"),
                None => write!(f, "struct"),
            },
            ValueKind::Array => match self.element() {
                Some(element) => write!(f, "{element}[]"),
                None => write!(f, "?[]"),
            },
            ValueKind::Pointer => match self.element() {
                Some(pointee) => write!(f, "{pointee}*"),
                None => write!(f, "?*"),
            },
        }
    }
}
