//! The runtime object model: plain [`Value`]s and a [`Heap`] of identity-carrying objects.
//!
//! Primitives, strings and enum values are carried inline. Structs, arrays,
//! lists and maps live in the [`Heap`] arena and are referenced through
//! [`Value::Ref`]. Two `Ref`s to the same [`ObjectId`] are the same object,
//! so shared references and cycles are plain edges between heap slots.
//!
//! ```
//! use wv_reflect::value::{DynamicStruct, Heap, Value};
//!
//! let mut heap = Heap::new();
//! let a = heap.insert(DynamicStruct::new("demo::Node").with("value", 1));
//! let b = heap.insert(DynamicStruct::new("demo::Node").with("value", 2).with("next", a));
//! heap.get_struct_mut(a).unwrap().set("next", b);
//!
//! let next = heap.get_struct(a).unwrap().get("next").unwrap().as_object().unwrap();
//! assert_eq!(next, b);
//! ```

// -----------------------------------------------------------------------------
// Modules

mod dynamic;
mod graph_eq;
mod heap;

// -----------------------------------------------------------------------------
// Exports

pub use dynamic::{DynamicArray, DynamicList, DynamicMap, DynamicStruct};
pub use heap::{Heap, Object, ObjectId};

use alloc::string::String;
use alloc::sync::Arc;

use thiserror::Error;

use crate::info::Ty;

// -----------------------------------------------------------------------------
// Value

/// A value in an object graph.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Char(char),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    /// A shared string. Clones share the allocation, which is the string's identity.
    Str(Arc<str>),
    /// An enum value of the registered enum at `ty`.
    Enum { ty: Arc<str>, bits: i64 },
    /// A reference to a heap object.
    Ref(ObjectId),
}

impl Value {
    /// Creates a [`Value::Str`].
    #[inline]
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::Str(s.into())
    }

    /// Creates a [`Value::Enum`].
    #[inline]
    pub fn enumeration(ty: impl Into<Arc<str>>, bits: i64) -> Self {
        Value::Enum {
            ty: ty.into(),
            bits,
        }
    }

    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the type of an inline value.
    ///
    /// `None` for [`Value::Null`] and [`Value::Ref`], whose type lives on the heap.
    pub fn inline_ty(&self) -> Option<Ty> {
        let ty = match self {
            Value::Null | Value::Ref(_) => return None,
            Value::Bool(_) => Ty::Bool,
            Value::Char(_) => Ty::Char,
            Value::I8(_) => Ty::I8,
            Value::I16(_) => Ty::I16,
            Value::I32(_) => Ty::I32,
            Value::I64(_) => Ty::I64,
            Value::U8(_) => Ty::U8,
            Value::U16(_) => Ty::U16,
            Value::U32(_) => Ty::U32,
            Value::U64(_) => Ty::U64,
            Value::F32(_) => Ty::F32,
            Value::F64(_) => Ty::F64,
            Value::Str(_) => Ty::String,
            Value::Enum { ty, .. } => Ty::Named(ty.clone()),
        };
        Some(ty)
    }

    /// A short name of the variant, used in error messages.
    pub const fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Char(_) => "char",
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U8(_) => "u8",
            Value::U16(_) => "u16",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Str(_) => "string",
            Value::Enum { .. } => "enum",
            Value::Ref(_) => "object",
        }
    }

    /// Returns the string slice of a [`Value::Str`].
    pub fn as_str(&self) -> Result<&str, CastError> {
        match self {
            Value::Str(s) => Ok(s.as_ref()),
            other => Err(CastError::new("string", other)),
        }
    }

    /// Returns the shared string of a [`Value::Str`].
    pub fn as_arc_str(&self) -> Result<&Arc<str>, CastError> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(CastError::new("string", other)),
        }
    }

    /// Returns the bits of a [`Value::Enum`].
    pub fn as_enum_bits(&self) -> Result<i64, CastError> {
        match self {
            Value::Enum { bits, .. } => Ok(*bits),
            other => Err(CastError::new("enum", other)),
        }
    }

    /// Returns the target of a [`Value::Ref`].
    pub fn as_object(&self) -> Result<ObjectId, CastError> {
        match self {
            Value::Ref(id) => Ok(*id),
            other => Err(CastError::new("object", other)),
        }
    }
}

macro_rules! impl_primitive {
    ($($variant:ident, $ty:ty, $name:literal, $as_fn:ident;)*) => {
        impl Value {
            $(
                #[doc = concat!("Returns the `", $name, "` of a [`Value::", stringify!($variant), "`].")]
                #[inline]
                pub fn $as_fn(&self) -> Result<$ty, CastError> {
                    match self {
                        Value::$variant(v) => Ok(*v),
                        other => Err(CastError::new($name, other)),
                    }
                }
            )*
        }

        $(
            impl From<$ty> for Value {
                #[inline]
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }
        )*
    };
}

impl_primitive! {
    Bool, bool, "bool", as_bool;
    Char, char, "char", as_char;
    I8, i8, "i8", as_i8;
    I16, i16, "i16", as_i16;
    I32, i32, "i32", as_i32;
    I64, i64, "i64", as_i64;
    U8, u8, "u8", as_u8;
    U16, u16, "u16", as_u16;
    U32, u32, "u32", as_u32;
    U64, u64, "u64", as_u64;
    F32, f32, "f32", as_f32;
    F64, f64, "f64", as_f64;
}

impl From<&str> for Value {
    #[inline]
    fn from(value: &str) -> Self {
        Value::Str(Arc::from(value))
    }
}

impl From<String> for Value {
    #[inline]
    fn from(value: String) -> Self {
        Value::Str(Arc::from(value))
    }
}

impl From<Arc<str>> for Value {
    #[inline]
    fn from(value: Arc<str>) -> Self {
        Value::Str(value)
    }
}

impl From<ObjectId> for Value {
    #[inline]
    fn from(value: ObjectId) -> Self {
        Value::Ref(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    #[inline]
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

// -----------------------------------------------------------------------------
// CastError

/// A typed read of a [`Value`] or heap object did not match its contents.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("cannot read {found} as {expected}")]
pub struct CastError {
    pub expected: &'static str,
    pub found: &'static str,
}

impl CastError {
    #[inline]
    pub(crate) const fn new(expected: &'static str, found: &Value) -> Self {
        Self {
            expected,
            found: found.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CastError, Value};
    use crate::info::Ty;

    #[test]
    fn typed_reads() {
        assert_eq!(Value::from(45).as_i32(), Ok(45));
        assert_eq!(Value::from("x").as_str(), Ok("x"));
        assert_eq!(
            Value::Null.as_i32(),
            Err(CastError {
                expected: "i32",
                found: "null"
            })
        );
        assert!(Value::from(1u8).as_i32().is_err());
    }

    #[test]
    fn inline_types() {
        assert_eq!(Value::from(1.5f32).inline_ty(), Some(Ty::F32));
        assert_eq!(Value::enumeration("E", 1).inline_ty(), Some(Ty::named("E")));
        assert_eq!(Value::Null.inline_ty(), None);
        assert_eq!(Value::from(None::<i32>), Value::Null);
    }
}
