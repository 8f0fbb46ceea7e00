use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use wv_utils::hash::{HashMap, HashSet};
use wv_utils::sync;

use crate::info::{EnumInfo, StructInfo, Ty, TypeInfo};
use crate::registry::{FieldDescriptor, RegistryError, TypeMetadata};
use crate::value::{DynamicStruct, Value};

// -----------------------------------------------------------------------------
// TypeRegistry

/// The central store of type declarations and their cached metadata.
///
/// Declarations are added with [`register`](Self::register), which needs
/// exclusive access. Metadata is built lazily by
/// [`get_type_metadata`](Self::get_type_metadata) through a shared reference,
/// so a registry can be read from several threads once populated.
///
/// # Example
///
/// ```
/// use wv_reflect::info::{FieldInfo, StructInfo, Ty};
/// use wv_reflect::registry::TypeRegistry;
///
/// let mut registry = TypeRegistry::new();
/// registry.register(
///     StructInfo::new("zoo::Animal").with_field(FieldInfo::new("name", Ty::String)),
/// );
/// registry.register(
///     StructInfo::new("zoo::Dog")
///         .with_base("zoo::Animal")
///         .with_field(FieldInfo::new("m_bark", Ty::String)),
/// );
///
/// let meta = registry.get_type_metadata("zoo::Dog").unwrap();
/// let names: Vec<_> = meta.fields().map(|f| f.name()).collect();
/// assert_eq!(names, ["m_bark", "name"]);
///
/// assert_eq!(registry.resolve("zoo::Dog[]"), Some(Ty::array(Ty::named("zoo::Dog"))));
/// assert_eq!(registry.resolve("zoo::Cat"), None);
/// ```
#[derive(Default)]
pub struct TypeRegistry {
    types: HashMap<Arc<str>, TypeInfo>,
    metadata: RwLock<HashMap<Arc<str>, Arc<TypeMetadata>>>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    ///
    /// Primitive types, `string`, `object`, arrays, lists and maps are
    /// built into [`Ty`] and need no registration.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a type declaration.
    ///
    /// Returns `true` if the path was not registered before.
    ///
    /// The metadata cache only grows, except here: replacing a declaration
    /// drops every cached entry, so layouts built from the old declaration
    /// are never served again. Metadata handed out earlier stays valid.
    pub fn register(&mut self, info: impl Into<TypeInfo>) -> bool {
        let info = info.into();
        let path: Arc<str> = Arc::from(info.path());
        let replaced = self.types.insert(path, info).is_some();
        if replaced {
            sync::write(&self.metadata).clear();
        }
        !replaced
    }

    /// Shorthand for registering a [`StructInfo`].
    #[inline]
    pub fn register_struct(&mut self, info: StructInfo) -> bool {
        self.register(info)
    }

    /// Shorthand for registering an [`EnumInfo`].
    #[inline]
    pub fn register_enum(&mut self, info: EnumInfo) -> bool {
        self.register(info)
    }

    /// Registers every declaration submitted with [`submit_registration!`](crate::submit_registration).
    ///
    /// Returns `false` when the `auto_register` feature is disabled.
    #[cfg_attr(not(feature = "auto_register"), inline(always))]
    pub fn auto_register(&mut self) -> bool {
        #[cfg(feature = "auto_register")]
        {
            for registration in inventory::iter::<AutoRegistration> {
                (registration.register)(self);
            }
            true
        }
        #[cfg(not(feature = "auto_register"))]
        {
            false
        }
    }

    #[inline]
    pub fn contains(&self, path: &str) -> bool {
        self.types.contains_key(path)
    }

    #[inline]
    pub fn get(&self, path: &str) -> Option<&TypeInfo> {
        self.types.get(path)
    }

    #[inline]
    pub fn get_struct(&self, path: &str) -> Option<&StructInfo> {
        self.types.get(path)?.as_struct()
    }

    #[inline]
    pub fn get_enum(&self, path: &str) -> Option<&EnumInfo> {
        self.types.get(path)?.as_enum()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterates over the registered declarations in unspecified order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &TypeInfo> {
        self.types.values()
    }

    /// Returns `true` if every named path inside `ty` is registered.
    pub fn is_known(&self, ty: &Ty) -> bool {
        match ty {
            Ty::Named(path) => self.contains(path),
            Ty::Array(elem, _) | Ty::List(elem) => self.is_known(elem),
            Ty::Map(key, value) => self.is_known(key) && self.is_known(value),
            _ => true,
        }
    }

    /// Parses a type name and checks that it only refers to registered types.
    pub fn resolve(&self, name: &str) -> Option<Ty> {
        Ty::parse(name).ok().filter(|ty| self.is_known(ty))
    }

    /// The value a freshly created slot of type `ty` holds.
    ///
    /// Zero for numbers, `false`, `'\0'`, zero bits for registered enums,
    /// [`Value::Null`] for everything else (strings included).
    pub fn default_value(&self, ty: &Ty) -> Value {
        match ty {
            Ty::Bool => Value::Bool(false),
            Ty::Char => Value::Char('\0'),
            Ty::I8 => Value::I8(0),
            Ty::I16 => Value::I16(0),
            Ty::I32 => Value::I32(0),
            Ty::I64 => Value::I64(0),
            Ty::U8 => Value::U8(0),
            Ty::U16 => Value::U16(0),
            Ty::U32 => Value::U32(0),
            Ty::U64 => Value::U64(0),
            Ty::F32 => Value::F32(0.0),
            Ty::F64 => Value::F64(0.0),
            Ty::Named(path) if self.get_enum(path).is_some() => Value::Enum {
                ty: path.clone(),
                bits: 0,
            },
            _ => Value::Null,
        }
    }

    /// Creates an instance of the struct at `path` with every field at its default.
    #[inline]
    pub fn instantiate(&self, path: &str) -> Result<DynamicStruct, RegistryError> {
        Ok(self.get_type_metadata(path)?.instantiate())
    }

    /// Returns the metadata of the struct at `path`, building and caching it on first use.
    ///
    /// Concurrent first requests may build the metadata more than once;
    /// the first one stored wins and every caller receives that entry.
    pub fn get_type_metadata(&self, path: &str) -> Result<Arc<TypeMetadata>, RegistryError> {
        let mut visiting = Vec::new();
        self.metadata_inner(path, &mut visiting)
    }

    fn metadata_inner(
        &self,
        path: &str,
        visiting: &mut Vec<Arc<str>>,
    ) -> Result<Arc<TypeMetadata>, RegistryError> {
        if let Some(meta) = sync::read(&self.metadata).get(path) {
            return Ok(meta.clone());
        }

        let built = Arc::new(self.build_metadata(path, visiting)?);
        log::debug!(
            "built type metadata for `{path}` with {} own fields",
            built.fields.len()
        );

        let mut cache = sync::write(&self.metadata);
        Ok(cache
            .entry(built.path.clone())
            .or_insert(built)
            .clone())
    }

    fn build_metadata(
        &self,
        path: &str,
        visiting: &mut Vec<Arc<str>>,
    ) -> Result<TypeMetadata, RegistryError> {
        let info = match self.types.get(path) {
            Some(TypeInfo::Struct(info)) => info,
            Some(TypeInfo::Enum(_)) => return Err(RegistryError::NotAStruct(path.to_string())),
            None => return Err(RegistryError::UnknownType(path.to_string())),
        };
        if visiting.iter().any(|p| &**p == path) {
            return Err(RegistryError::BaseCycle(path.to_string()));
        }
        visiting.push(info.path_arc().clone());

        let base = match info.base() {
            Some(base) => Some(self.metadata_inner(base, visiting)?),
            None => None,
        };
        visiting.pop();

        let implicit_serializer = match info.implicit_serializers() {
            [] => None,
            [hook] => Some(*hook),
            _ => return Err(RegistryError::AmbiguousImplicitSerializer(path.to_string())),
        };
        let implicit_deserializer = match info.implicit_deserializers() {
            [] => None,
            [hook] => Some(*hook),
            _ => return Err(RegistryError::AmbiguousImplicitDeserializer(path.to_string())),
        };

        {
            let mut declared: HashSet<&str> = HashSet::default();
            if let Some(base) = &base {
                declared.extend(base.defaults.iter().map(|(name, _)| &**name));
            }
            for field in info.fields() {
                if !declared.insert(field.name()) {
                    return Err(RegistryError::DuplicateField {
                        ty: path.to_string(),
                        field: field.name().to_string(),
                    });
                }
            }
        }

        let fields = if info.is_do_not_serialize() {
            Vec::new()
        } else {
            info.fields()
                .iter()
                .filter(|f| !f.is_skipped() && (!info.is_explicit_only() || f.is_explicit()))
                .map(|f| {
                    let (xml_name, explicit_name) = match (f.serialized_name(), info.renamer()) {
                        (Some(name), _) => (Arc::from(name), true),
                        (None, Some(renamer)) => {
                            let renamed: String = renamer.rename(f.name(), path);
                            (Arc::from(renamed), false)
                        }
                        (None, None) => (f.name_arc().clone(), false),
                    };
                    FieldDescriptor {
                        declaring_type: info.path_arc().clone(),
                        name: f.name_arc().clone(),
                        xml_name,
                        ty: f.ty().clone(),
                        explicit_name,
                        element_name: f.element_name_override().map(Arc::from),
                    }
                })
                .collect()
        };

        let mut defaults: Vec<(Arc<str>, Value)> = info
            .fields()
            .iter()
            .map(|f| (f.name_arc().clone(), self.default_value(f.ty())))
            .collect();
        if let Some(base) = &base {
            defaults.extend(base.defaults.iter().cloned());
        }

        Ok(TypeMetadata {
            ty: Ty::Named(info.path_arc().clone()),
            path: info.path_arc().clone(),
            base,
            fields,
            implicit_serializer,
            implicit_deserializer,
            defaults,
        })
    }
}

impl core::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.types.keys()).finish()
    }
}

// -----------------------------------------------------------------------------
// AutoRegistration

/// A registration function collected by [`TypeRegistry::auto_register`].
///
/// Created through [`submit_registration!`](crate::submit_registration).
#[cfg(feature = "auto_register")]
pub struct AutoRegistration {
    register: fn(&mut TypeRegistry),
}

#[cfg(feature = "auto_register")]
impl AutoRegistration {
    #[inline]
    pub const fn new(register: fn(&mut TypeRegistry)) -> Self {
        Self { register }
    }
}

#[cfg(feature = "auto_register")]
inventory::collect!(AutoRegistration);

// -----------------------------------------------------------------------------
// TypeRegistryArc

/// A shared handle to a [`TypeRegistry`].
#[derive(Clone, Default)]
pub struct TypeRegistryArc {
    /// The wrapped [`TypeRegistry`].
    pub internal: Arc<RwLock<TypeRegistry>>,
}

impl TypeRegistryArc {
    /// Takes a read lock on the underlying [`TypeRegistry`].
    #[inline]
    pub fn read(&self) -> RwLockReadGuard<'_, TypeRegistry> {
        sync::read(&self.internal)
    }

    /// Takes a write lock on the underlying [`TypeRegistry`].
    #[inline]
    pub fn write(&self) -> RwLockWriteGuard<'_, TypeRegistry> {
        sync::write(&self.internal)
    }
}

impl From<TypeRegistry> for TypeRegistryArc {
    #[inline]
    fn from(value: TypeRegistry) -> Self {
        Self {
            internal: Arc::new(RwLock::new(value)),
        }
    }
}

impl core::fmt::Debug for TypeRegistryArc {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.read().fmt(f)
    }
}
