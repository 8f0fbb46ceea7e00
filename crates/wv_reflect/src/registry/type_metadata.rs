use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use crate::info::Ty;
use crate::serial::{ImplicitDeserializeFn, ImplicitSerializeFn};
use crate::value::{DynamicStruct, Value};

// -----------------------------------------------------------------------------
// FieldDescriptor

/// A serializable field, as resolved for one struct level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub(crate) declaring_type: Arc<str>,
    pub(crate) name: Arc<str>,
    pub(crate) xml_name: Arc<str>,
    pub(crate) ty: Ty,
    pub(crate) explicit_name: bool,
    pub(crate) element_name: Option<Arc<str>>,
}

impl FieldDescriptor {
    /// The path of the struct level declaring the field.
    #[inline]
    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    /// The field name inside [`DynamicStruct`].
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The node name before context renaming policies apply.
    #[inline]
    pub fn xml_name(&self) -> &str {
        &self.xml_name
    }

    /// `true` when the node name comes from [`FieldInfo::rename`](crate::info::FieldInfo::rename).
    #[inline]
    pub fn has_explicit_name(&self) -> bool {
        self.explicit_name
    }

    #[inline]
    pub fn ty(&self) -> &Ty {
        &self.ty
    }

    /// The per-element node name override for arrays and collections.
    #[inline]
    pub fn element_name(&self) -> Option<&str> {
        self.element_name.as_deref()
    }
}

// -----------------------------------------------------------------------------
// TypeMetadata

/// Cached serialization metadata of a struct type.
///
/// One `TypeMetadata` describes one level of a struct's base chain and links
/// to the metadata of its base. Built on first request by
/// [`TypeRegistry::get_type_metadata`](crate::registry::TypeRegistry::get_type_metadata)
/// and shared afterwards.
pub struct TypeMetadata {
    pub(crate) ty: Ty,
    pub(crate) path: Arc<str>,
    pub(crate) base: Option<Arc<TypeMetadata>>,
    pub(crate) fields: Vec<FieldDescriptor>,
    pub(crate) implicit_serializer: Option<ImplicitSerializeFn>,
    pub(crate) implicit_deserializer: Option<ImplicitDeserializeFn>,
    // Every declared field of the chain, skipped ones included.
    pub(crate) defaults: Vec<(Arc<str>, Value)>,
}

impl TypeMetadata {
    #[inline]
    pub fn ty(&self) -> &Ty {
        &self.ty
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the metadata of the base type.
    #[inline]
    pub fn base(&self) -> Option<&Arc<TypeMetadata>> {
        self.base.as_ref()
    }

    /// Serializable fields declared by this level only.
    #[inline]
    pub fn own_fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// This level followed by each base level, most derived first.
    pub fn levels(&self) -> impl Iterator<Item = &TypeMetadata> {
        core::iter::successors(Some(self), |meta| meta.base.as_deref())
    }

    /// Every serializable field of the chain: own fields first, then each base's.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.levels().flat_map(|meta| meta.fields.iter())
    }

    /// Returns the serializable field named `name` anywhere along the chain.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields().find(|f| f.name() == name)
    }

    #[inline]
    pub fn implicit_serializer(&self) -> Option<ImplicitSerializeFn> {
        self.implicit_serializer
    }

    #[inline]
    pub fn implicit_deserializer(&self) -> Option<ImplicitDeserializeFn> {
        self.implicit_deserializer
    }

    /// Creates an instance with every declared field at its default value.
    pub fn instantiate(&self) -> DynamicStruct {
        self.defaults
            .iter()
            .fold(DynamicStruct::new(self.path.clone()), |s, (name, value)| {
                s.with(name.clone(), value.clone())
            })
    }
}

impl fmt::Debug for TypeMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeMetadata")
            .field("ty", &self.ty)
            .field("base", &self.base.as_ref().map(|b| b.path()))
            .field("fields", &self.fields)
            .field("implicit_serializer", &self.implicit_serializer.is_some())
            .field("implicit_deserializer", &self.implicit_deserializer.is_some())
            .finish()
    }
}
