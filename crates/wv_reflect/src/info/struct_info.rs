use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use crate::info::Ty;
use crate::serial::{FieldRenamer, ImplicitDeserializeFn, ImplicitSerializeFn};

// -----------------------------------------------------------------------------
// FieldInfo

/// Declaration of a struct field.
///
/// # Examples
///
/// ```
/// use wv_reflect::info::{FieldInfo, Ty};
///
/// let field = FieldInfo::new("m_scores", Ty::array(Ty::I32))
///     .rename("Scores")
///     .element_name("Score");
///
/// assert_eq!(field.name(), "m_scores");
/// assert_eq!(field.serialized_name(), Some("Scores"));
/// assert_eq!(field.element_name_override(), Some("Score"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldInfo {
    name: Arc<str>,
    ty: Ty,
    serialized_name: Option<Arc<str>>,
    element_name: Option<Arc<str>>,
    skip: bool,
    explicit: bool,
}

impl FieldInfo {
    /// Creates a field named `name` declared as `ty`.
    #[inline]
    pub fn new(name: impl Into<Arc<str>>, ty: Ty) -> Self {
        Self {
            name: name.into(),
            ty,
            serialized_name: None,
            element_name: None,
            skip: false,
            explicit: false,
        }
    }

    /// Serializes the field under `name`.
    ///
    /// An explicit name is used verbatim, renaming policies never touch it.
    #[inline]
    pub fn rename(mut self, name: impl Into<Arc<str>>) -> Self {
        self.serialized_name = Some(name.into());
        self
    }

    /// Names the per-element nodes when the field holds an array or collection.
    #[inline]
    pub fn element_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.element_name = Some(name.into());
        self
    }

    /// Marks the field "do not serialize".
    #[inline]
    pub fn skip(mut self) -> Self {
        self.skip = true;
        self
    }

    /// Marks the field for serialization on types declared with
    /// [`StructInfo::explicit_only`].
    #[inline]
    pub fn explicit(mut self) -> Self {
        self.explicit = true;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn name_arc(&self) -> &Arc<str> {
        &self.name
    }

    #[inline]
    pub fn ty(&self) -> &Ty {
        &self.ty
    }

    #[inline]
    pub fn serialized_name(&self) -> Option<&str> {
        self.serialized_name.as_deref()
    }

    #[inline]
    pub fn element_name_override(&self) -> Option<&str> {
        self.element_name.as_deref()
    }

    #[inline]
    pub fn is_skipped(&self) -> bool {
        self.skip
    }

    #[inline]
    pub fn is_explicit(&self) -> bool {
        self.explicit
    }
}

// -----------------------------------------------------------------------------
// StructInfo

/// Declaration of a struct type: its path, optional base type, own fields
/// and the hooks it carries for its own serialization.
///
/// A `StructInfo` only describes one level. Fields of base types are declared
/// on the base's own `StructInfo` and linked through [`with_base`](Self::with_base).
///
/// # Examples
///
/// ```
/// use wv_reflect::info::{FieldInfo, StructInfo, Ty};
///
/// let info = StructInfo::new("zoo::Dog")
///     .with_base("zoo::Animal")
///     .with_field(FieldInfo::new("bark", Ty::String))
///     .with_field(FieldInfo::new("cache", Ty::Object).skip());
///
/// assert_eq!(info.path(), "zoo::Dog");
/// assert_eq!(info.base(), Some("zoo::Animal"));
/// assert_eq!(info.fields().len(), 2);
/// assert!(info.field("cache").unwrap().is_skipped());
/// ```
#[derive(Clone)]
pub struct StructInfo {
    path: Arc<str>,
    base: Option<Arc<str>>,
    fields: Vec<FieldInfo>,
    explicit_only: bool,
    do_not_serialize: bool,
    renamer: Option<Arc<dyn FieldRenamer>>,
    implicit_serializers: Vec<ImplicitSerializeFn>,
    implicit_deserializers: Vec<ImplicitDeserializeFn>,
}

impl StructInfo {
    /// Creates a declaration for the type at `path`.
    pub fn new(path: impl Into<Arc<str>>) -> Self {
        Self {
            path: path.into(),
            base: None,
            fields: Vec::new(),
            explicit_only: false,
            do_not_serialize: false,
            renamer: None,
            implicit_serializers: Vec::new(),
            implicit_deserializers: Vec::new(),
        }
    }

    /// Sets the base type. Base fields are serialized after this type's own fields.
    #[inline]
    pub fn with_base(mut self, base: impl Into<Arc<str>>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Appends a field in declaration order.
    #[inline]
    pub fn with_field(mut self, field: FieldInfo) -> Self {
        self.fields.push(field);
        self
    }

    /// Only fields marked [`FieldInfo::explicit`] are serialized.
    #[inline]
    pub fn explicit_only(mut self) -> Self {
        self.explicit_only = true;
        self
    }

    /// No field of this level is serialized.
    #[inline]
    pub fn do_not_serialize(mut self) -> Self {
        self.do_not_serialize = true;
        self
    }

    /// Renames this type's fields once, when its metadata is built.
    ///
    /// Fields with an explicit [`FieldInfo::rename`] are left alone.
    #[inline]
    pub fn with_renamer(mut self, renamer: Arc<dyn FieldRenamer>) -> Self {
        self.renamer = Some(renamer);
        self
    }

    /// Declares the type's own serialization entry point.
    ///
    /// Declaring more than one is reported when the type's metadata is first built.
    #[inline]
    pub fn with_implicit_serializer(mut self, hook: ImplicitSerializeFn) -> Self {
        self.implicit_serializers.push(hook);
        self
    }

    /// Declares the type's own deserialization entry point.
    ///
    /// Declaring more than one is reported when the type's metadata is first built.
    #[inline]
    pub fn with_implicit_deserializer(mut self, hook: ImplicitDeserializeFn) -> Self {
        self.implicit_deserializers.push(hook);
        self
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn path_arc(&self) -> &Arc<str> {
        &self.path
    }

    #[inline]
    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    #[inline]
    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    /// Returns the own field named `name`.
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name() == name)
    }

    #[inline]
    pub fn is_explicit_only(&self) -> bool {
        self.explicit_only
    }

    #[inline]
    pub fn is_do_not_serialize(&self) -> bool {
        self.do_not_serialize
    }

    #[inline]
    pub fn renamer(&self) -> Option<&Arc<dyn FieldRenamer>> {
        self.renamer.as_ref()
    }

    #[inline]
    pub fn implicit_serializers(&self) -> &[ImplicitSerializeFn] {
        &self.implicit_serializers
    }

    #[inline]
    pub fn implicit_deserializers(&self) -> &[ImplicitDeserializeFn] {
        &self.implicit_deserializers
    }
}

impl fmt::Debug for StructInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructInfo")
            .field("path", &self.path)
            .field("base", &self.base)
            .field("fields", &self.fields)
            .field("explicit_only", &self.explicit_only)
            .field("do_not_serialize", &self.do_not_serialize)
            .field("renamer", &self.renamer.is_some())
            .field("implicit_serializers", &self.implicit_serializers.len())
            .field("implicit_deserializers", &self.implicit_deserializers.len())
            .finish()
    }
}
