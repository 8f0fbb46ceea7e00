//! Type descriptions fed to the [`TypeRegistry`](crate::registry::TypeRegistry).
//!
//! ## Menu
//!
//! - [`Ty`]: the type identity used everywhere in the engine, with a canonical text name.
//! - [`StructInfo`] / [`FieldInfo`]: builder-style declaration of a struct level and its fields.
//! - [`EnumInfo`] / [`VariantInfo`]: declaration of an integer-valued enum, optionally with flag semantics.
//! - [`TypeInfo`]: either of the two declarations.

// -----------------------------------------------------------------------------
// Modules

mod enum_info;
mod struct_info;
mod ty;

// -----------------------------------------------------------------------------
// Exports

pub use enum_info::{EnumInfo, VariantInfo};
pub use struct_info::{FieldInfo, StructInfo};
pub use ty::{ParseTyError, Ty};

// -----------------------------------------------------------------------------
// TypeInfo

/// A registered type declaration.
#[derive(Clone, Debug)]
pub enum TypeInfo {
    Struct(StructInfo),
    Enum(EnumInfo),
}

impl TypeInfo {
    /// Returns the declared path.
    #[inline]
    pub fn path(&self) -> &str {
        match self {
            TypeInfo::Struct(info) => info.path(),
            TypeInfo::Enum(info) => info.path(),
        }
    }

    #[inline]
    pub fn as_struct(&self) -> Option<&StructInfo> {
        match self {
            TypeInfo::Struct(info) => Some(info),
            TypeInfo::Enum(_) => None,
        }
    }

    #[inline]
    pub fn as_enum(&self) -> Option<&EnumInfo> {
        match self {
            TypeInfo::Enum(info) => Some(info),
            TypeInfo::Struct(_) => None,
        }
    }
}

impl From<StructInfo> for TypeInfo {
    #[inline]
    fn from(value: StructInfo) -> Self {
        TypeInfo::Struct(value)
    }
}

impl From<EnumInfo> for TypeInfo {
    #[inline]
    fn from(value: EnumInfo) -> Self {
        TypeInfo::Enum(value)
    }
}
