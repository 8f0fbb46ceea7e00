use alloc::string::{String, ToString};
use alloc::sync::Arc;
use core::fmt;
use core::str::FromStr;

use thiserror::Error;

// -----------------------------------------------------------------------------
// Ty

/// A type identity understood by the serialization engine.
///
/// Every `Ty` has a canonical name, produced by [`Display`](fmt::Display)
/// and parsed back by [`Ty::parse`]:
///
/// | variant | name |
/// |---------|------|
/// | [`Ty::Object`] | `object` |
/// | primitives | `bool` `char` `i8` .. `i64` `u8` .. `u64` `f32` `f64` |
/// | [`Ty::String`] | `string` |
/// | [`Ty::Named`] | the registered path, e.g. `game::Player` |
/// | [`Ty::Array`] | `i32[]`, `string[,]`, `game::Player[][]` |
/// | [`Ty::List`] | `List<i32>` |
/// | [`Ty::Map`] | `Map<string,object>` |
///
/// # Examples
///
/// ```
/// use wv_reflect::info::Ty;
///
/// let ty = Ty::map(Ty::String, Ty::array_n(Ty::I32, 2));
/// assert_eq!(ty.to_string(), "Map<string,i32[,]>");
/// assert_eq!(Ty::parse("Map<string,i32[,]>").unwrap(), ty);
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Ty {
    /// The universal base type. A slot declared `object` may hold anything.
    Object,
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,
    /// A registered struct or enum, identified by its path.
    Named(Arc<str>),
    /// A rectangular array with the given element type and rank.
    Array(Arc<Ty>, usize),
    List(Arc<Ty>),
    Map(Arc<Ty>, Arc<Ty>),
}

impl Ty {
    /// Creates a [`Ty::Named`].
    #[inline]
    pub fn named(path: impl Into<Arc<str>>) -> Self {
        Ty::Named(path.into())
    }

    /// Creates a one-dimensional [`Ty::Array`].
    #[inline]
    pub fn array(elem: Ty) -> Self {
        Ty::Array(Arc::new(elem), 1)
    }

    /// Creates a [`Ty::Array`] of the given rank.
    ///
    /// A rank of zero is treated as one.
    #[inline]
    pub fn array_n(elem: Ty, rank: usize) -> Self {
        Ty::Array(Arc::new(elem), rank.max(1))
    }

    /// Creates a [`Ty::List`].
    #[inline]
    pub fn list(elem: Ty) -> Self {
        Ty::List(Arc::new(elem))
    }

    /// Creates a [`Ty::Map`].
    #[inline]
    pub fn map(key: Ty, value: Ty) -> Self {
        Ty::Map(Arc::new(key), Arc::new(value))
    }

    /// Returns `true` for `bool`, `char` and the numeric types.
    pub const fn is_primitive(&self) -> bool {
        matches!(
            self,
            Ty::Bool
                | Ty::Char
                | Ty::I8
                | Ty::I16
                | Ty::I32
                | Ty::I64
                | Ty::U8
                | Ty::U16
                | Ty::U32
                | Ty::U64
                | Ty::F32
                | Ty::F64
        )
    }

    /// Returns `true` if arrays of this element type may use the condensed text form.
    #[inline]
    pub const fn is_condensable(&self) -> bool {
        self.is_primitive() || matches!(self, Ty::String)
    }

    /// Returns the path of a [`Ty::Named`].
    #[inline]
    pub fn as_named(&self) -> Option<&str> {
        match self {
            Ty::Named(path) => Some(path.as_ref()),
            _ => None,
        }
    }

    /// Returns the element type and rank of a [`Ty::Array`].
    #[inline]
    pub fn as_array(&self) -> Option<(&Ty, usize)> {
        match self {
            Ty::Array(elem, rank) => Some((elem.as_ref(), *rank)),
            _ => None,
        }
    }

    /// Parses a canonical type name.
    ///
    /// Parsing only checks the shape of the name. Whether a named path is
    /// known is decided by [`TypeRegistry::resolve`](crate::registry::TypeRegistry::resolve).
    pub fn parse(name: &str) -> Result<Ty, ParseTyError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ParseTyError::Empty);
        }
        let malformed = || ParseTyError::Malformed(name.to_string());

        if let Some(stripped) = name.strip_suffix(']') {
            let open = stripped.rfind('[').ok_or_else(malformed)?;
            let commas = &stripped[open + 1..];
            if !commas.chars().all(|c| c == ',') {
                return Err(malformed());
            }
            let elem = Ty::parse(&stripped[..open])?;
            return Ok(Ty::Array(Arc::new(elem), commas.len() + 1));
        }

        if let Some(inner) = generic_arguments(name, "List") {
            return Ok(Ty::list(Ty::parse(inner)?));
        }

        if let Some(inner) = generic_arguments(name, "Map") {
            let (key, value) = split_top_level(inner).ok_or_else(malformed)?;
            return Ok(Ty::map(Ty::parse(key)?, Ty::parse(value)?));
        }

        let ty = match name {
            "object" => Ty::Object,
            "bool" => Ty::Bool,
            "char" => Ty::Char,
            "i8" => Ty::I8,
            "i16" => Ty::I16,
            "i32" => Ty::I32,
            "i64" => Ty::I64,
            "u8" => Ty::U8,
            "u16" => Ty::U16,
            "u32" => Ty::U32,
            "u64" => Ty::U64,
            "f32" => Ty::F32,
            "f64" => Ty::F64,
            "string" => Ty::String,
            path if is_valid_path(path) => Ty::Named(Arc::from(path)),
            _ => return Err(malformed()),
        };
        Ok(ty)
    }
}

fn generic_arguments<'a>(name: &'a str, head: &str) -> Option<&'a str> {
    name.strip_prefix(head)?
        .strip_prefix('<')?
        .strip_suffix('>')
}

// Splits `K,V` at the first comma outside of nested brackets.
fn split_top_level(inner: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    for (index, c) in inner.char_indices() {
        match c {
            '<' | '[' => depth += 1,
            '>' | ']' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => return Some((&inner[..index], &inner[index + 1..])),
            _ => {}
        }
    }
    None
}

fn is_valid_path(path: &str) -> bool {
    let mut chars = path.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '.'))
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self {
            Ty::Object => "object",
            Ty::Bool => "bool",
            Ty::Char => "char",
            Ty::I8 => "i8",
            Ty::I16 => "i16",
            Ty::I32 => "i32",
            Ty::I64 => "i64",
            Ty::U8 => "u8",
            Ty::U16 => "u16",
            Ty::U32 => "u32",
            Ty::U64 => "u64",
            Ty::F32 => "f32",
            Ty::F64 => "f64",
            Ty::String => "string",
            Ty::Named(path) => path.as_ref(),
            Ty::Array(elem, rank) => {
                write!(f, "{elem}[")?;
                for _ in 1..*rank {
                    f.write_str(",")?;
                }
                return f.write_str("]");
            }
            Ty::List(elem) => return write!(f, "List<{elem}>"),
            Ty::Map(key, value) => return write!(f, "Map<{key},{value}>"),
        };
        f.write_str(keyword)
    }
}

impl fmt::Debug for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ty({self})")
    }
}

impl FromStr for Ty {
    type Err = ParseTyError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ty::parse(s)
    }
}

// -----------------------------------------------------------------------------
// ParseTyError

/// The error returned by [`Ty::parse`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseTyError {
    #[error("type name is empty")]
    Empty,

    #[error("malformed type name `{0}`")]
    Malformed(String),
}
