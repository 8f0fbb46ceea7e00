use alloc::borrow::Cow;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;

use wv_tree::{Document, NodeId};
use wv_utils::hash::HashSet;

use super::framework::{ListSurrogate, MapSurrogate};
use super::renamer::field_node_name;
use super::tracker::{Identity, SerializeTracker};
use super::{
    ContextFlags, FieldRenamer, SerializationContext, SerializeError, Surrogate, WireNames, codec,
};
use crate::info::Ty;
use crate::registry::{FieldDescriptor, RegistryError, TypeMetadata, TypeRegistry};
use crate::value::{DynamicArray, DynamicStruct, Heap, Object, ObjectId, Value};

// -----------------------------------------------------------------------------
// Serializer

/// Encodes an object graph into a [`Document`].
///
/// A serializer is one session: it owns the document under construction and
/// the identities written so far, and is consumed by
/// [`serialize`](Self::serialize). Surrogates receive it to encode nested
/// values with [`encode_value`](Self::encode_value) and
/// [`encode_child`](Self::encode_child).
///
/// # Encoding order
///
/// For each value the serializer tries, in order:
///
/// 1. null: the null attribute, nothing else;
/// 2. a repeated identity: the refer-to attribute, nothing else;
/// 3. the type attribute, when the runtime type differs from the declared
///    one or [`ContextFlags::VERBOSE_TYPES`] is set;
/// 4. the surrogates registered on the context for the runtime type, the
///    built-in list and map surrogates, then the type's implicit serializer;
/// 5. primitives, strings and enums as text;
/// 6. arrays, condensed or one node per element;
/// 7. structs, one child per field, most derived level first. Before each
///    base level, the surrogates of that base type may take over the rest.
///
/// # Examples
///
/// ```
/// use wv_reflect::info::{FieldInfo, StructInfo, Ty};
/// use wv_reflect::registry::TypeRegistry;
/// use wv_reflect::serial::Serializer;
/// use wv_reflect::value::{DynamicStruct, Heap, Value};
///
/// let mut registry = TypeRegistry::new();
/// registry.register(
///     StructInfo::new("game::Player")
///         .with_field(FieldInfo::new("m_name", Ty::String))
///         .with_field(FieldInfo::new("m_score", Ty::I32)),
/// );
///
/// let mut heap = Heap::new();
/// let player = heap.insert(
///     DynamicStruct::new("game::Player")
///         .with("m_name", "Homer")
///         .with("m_score", 42),
/// );
///
/// let doc = Serializer::new(&registry, &heap)
///     .serialize(&Value::Ref(player))
///     .unwrap();
/// assert_eq!(
///     doc.to_xml().unwrap(),
///     "<_Root><Name>Homer</Name><Score>42</Score></_Root>"
/// );
/// ```
pub struct Serializer<'a> {
    registry: &'a TypeRegistry,
    heap: &'a Heap,
    context: &'a SerializationContext,
    names: WireNames,
    flags: ContextFlags,
    renamer: Option<Arc<dyn FieldRenamer>>,
    doc: Document,
    tracker: SerializeTracker,
    element_name: Option<Arc<str>>,
    ignored: HashSet<Arc<str>>,
}

impl<'a> Serializer<'a> {
    /// Creates a session using the [global](SerializationContext::global) context.
    pub fn new(registry: &'a TypeRegistry, heap: &'a Heap) -> Self {
        let context = SerializationContext::global();
        Self {
            registry,
            heap,
            context,
            names: context.wire_names(),
            flags: context.flags(),
            renamer: context.field_renamer(),
            doc: Document::new(),
            tracker: SerializeTracker::default(),
            element_name: None,
            ignored: HashSet::default(),
        }
    }

    /// Uses `context` for this session.
    ///
    /// Names, flags and the field renamer are read once, here.
    /// Surrogates are looked up on the context as values are encoded.
    pub fn with_context(mut self, context: &'a SerializationContext) -> Self {
        self.context = context;
        self.names = context.wire_names();
        self.flags = context.flags();
        self.renamer = context.field_renamer();
        self
    }

    /// Encodes `value` under a root node, declared as its own runtime type.
    ///
    /// The root therefore carries no type attribute unless
    /// [`ContextFlags::VERBOSE_TYPES`] is set, and decoding it needs the
    /// expected type. Use [`serialize_as`](Self::serialize_as) with
    /// [`Ty::Object`] to always tag the root.
    pub fn serialize(self, value: &Value) -> Result<Document, SerializeError> {
        let declared = self.runtime_ty(value)?.unwrap_or(Ty::Object);
        self.serialize_as(value, &declared)
    }

    /// Encodes `value` under a root node, declared as `declared`.
    pub fn serialize_as(mut self, value: &Value, declared: &Ty) -> Result<Document, SerializeError> {
        let root = self.doc.create_root(&*self.names.root_element);
        self.encode_value(value, declared, root)?;
        Ok(self.doc)
    }

    // -------------------------------------------------------------------------
    // Accessors

    #[inline]
    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    #[inline]
    pub fn heap(&self) -> &'a Heap {
        self.heap
    }

    #[inline]
    pub fn context(&self) -> &'a SerializationContext {
        self.context
    }

    /// The wire names of this session.
    #[inline]
    pub fn names(&self) -> &WireNames {
        &self.names
    }

    /// The flags of this session.
    #[inline]
    pub fn flags(&self) -> ContextFlags {
        self.flags
    }

    #[inline]
    pub fn document(&self) -> &Document {
        &self.doc
    }

    #[inline]
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// The node name for the elements of the collection being encoded.
    ///
    /// Reflects a field's element name override while its surrogates run.
    pub fn element_name(&self) -> Arc<str> {
        self.element_name
            .clone()
            .unwrap_or_else(|| self.names.array_element.clone())
    }

    /// Skips the field declared as `field_name` in the struct level about to be walked.
    ///
    /// Meant for surrogates that write some fields themselves and return
    /// `false`. Only the fields of the type the surrogate was registered for
    /// are matched, fields of derived or base levels are not. The set is
    /// cleared once that level has been walked.
    pub fn ignore_field(&mut self, field_name: &str) {
        self.ignored.insert(Arc::from(field_name));
    }

    /// Returns the runtime type of `value`, `None` for null.
    pub fn runtime_ty(&self, value: &Value) -> Result<Option<Ty>, SerializeError> {
        match value {
            Value::Null => Ok(None),
            Value::Ref(id) => self
                .heap
                .ty_of(*id)
                .map(Some)
                .ok_or(SerializeError::DanglingObject(*id)),
            inline => Ok(inline.inline_ty()),
        }
    }

    // -------------------------------------------------------------------------
    // Encoding

    /// Appends a child named `name` to `parent` and encodes `value` into it.
    pub fn encode_child(
        &mut self,
        parent: NodeId,
        name: &str,
        value: &Value,
        declared: &Ty,
    ) -> Result<NodeId, SerializeError> {
        let child = self.doc.add_child(parent, name);
        self.encode_value(value, declared, child)?;
        Ok(child)
    }

    /// Encodes `value`, declared as `declared`, into the existing `node`.
    #[inline]
    pub fn encode_value(
        &mut self,
        value: &Value,
        declared: &Ty,
        node: NodeId,
    ) -> Result<(), SerializeError> {
        self.encode_value_with(value, declared, node, None)
    }

    // `element_name` overrides the element node name if `value` is an array or collection.
    fn encode_value_with(
        &mut self,
        value: &Value,
        declared: &Ty,
        node: NodeId,
        element_name: Option<&Arc<str>>,
    ) -> Result<(), SerializeError> {
        // Fields ignored for an enclosing struct survive nested values.
        let pending = core::mem::take(&mut self.ignored);
        let result = self.encode_node(value, declared, node, element_name);
        self.ignored = pending;
        result
    }

    fn encode_node(
        &mut self,
        value: &Value,
        declared: &Ty,
        node: NodeId,
        element_name: Option<&Arc<str>>,
    ) -> Result<(), SerializeError> {
        let Some(runtime) = self.runtime_ty(value)? else {
            log::trace!("encoding null");
            self.doc
                .set_attribute(node, &self.names.null_attribute, &*self.names.null_value);
            return Ok(());
        };

        let strings = self.flags.contains(ContextFlags::DUPLICATE_STRINGS_CAN_BE_REFERRED_TO);
        if let Some(identity) = Identity::of(value, strings) {
            let id_attribute = self.names.reference_id_attribute.clone();
            if let Some(id) = self
                .tracker
                .refer(identity, value, node, &mut self.doc, &id_attribute)
            {
                log::trace!("encoding reference to {id}");
                self.doc
                    .set_attribute(node, &self.names.refer_to_attribute, id.to_string());
                return Ok(());
            }
        }

        if self.flags.contains(ContextFlags::VERBOSE_TYPES) || runtime != *declared {
            self.doc
                .set_attribute(node, &self.names.type_attribute, runtime.to_string());
        }

        let outer = core::mem::replace(&mut self.element_name, element_name.cloned());
        let handled = self.dispatch(value, &runtime, declared, node);
        self.element_name = outer;
        if handled? {
            return Ok(());
        }

        match value {
            Value::Enum { ty, bits } => {
                log::trace!("encoding enum `{ty}`");
                let info = self
                    .registry
                    .get_enum(ty)
                    .ok_or_else(|| RegistryError::UnknownType(ty.to_string()))?;
                self.doc.set_text(node, codec::format_enum(info, *bits));
                Ok(())
            }
            Value::Ref(id) => self.encode_object(value, *id, node, element_name),
            inline => {
                log::trace!("encoding {}", inline.kind());
                let text = codec::format_primitive(inline)
                    .ok_or_else(|| SerializeError::Unsupported(inline.kind().into()))?;
                self.doc.set_text(node, text);
                Ok(())
            }
        }
    }

    fn encode_object(
        &mut self,
        value: &Value,
        id: ObjectId,
        node: NodeId,
        element_name: Option<&Arc<str>>,
    ) -> Result<(), SerializeError> {
        let heap = self.heap;
        match heap.get(id).ok_or(SerializeError::DanglingObject(id))? {
            Object::Struct(object) => self.encode_struct(value, object, node),
            Object::Array(array) => {
                let element_name = element_name.unwrap_or(&self.names.array_element).clone();
                self.encode_array(array, node, &element_name)
            }
            Object::List(list) => Err(SerializeError::Unsupported(list.ty().to_string())),
            Object::Map(map) => Err(SerializeError::Unsupported(map.ty().to_string())),
        }
    }

    fn encode_struct(
        &mut self,
        value: &Value,
        object: &DynamicStruct,
        node: NodeId,
    ) -> Result<(), SerializeError> {
        log::trace!("encoding struct `{}`", object.type_path());
        let meta = self.registry.get_type_metadata(object.type_path())?;

        for (depth, level) in meta.levels().enumerate() {
            if depth > 0 && self.dispatch_level(value, level, node)? {
                break;
            }
            let ignored = core::mem::take(&mut self.ignored);
            for field in level.own_fields() {
                if ignored.contains(field.name()) {
                    log::trace!("skipping ignored field `{}`", field.name());
                    continue;
                }
                let name = self.field_name(field);
                let child = self.doc.add_child(node, &*name);
                let field_value = match object.get(field.name()) {
                    Some(v) => Cow::Borrowed(v),
                    None => Cow::Owned(self.registry.default_value(field.ty())),
                };
                self.encode_value_with(&field_value, field.ty(), child, field.element_name.as_ref())?;
            }
        }
        Ok(())
    }

    fn encode_array(
        &mut self,
        array: &DynamicArray,
        node: NodeId,
        element_name: &str,
    ) -> Result<(), SerializeError> {
        log::trace!("encoding array `{}`", array.ty());
        let elem = array.elem_ty();

        self.doc.set_attribute(
            node,
            &self.names.array_attribute,
            join(array.lengths().iter()),
        );
        if array.lower_bounds().iter().any(|b| *b != 0) {
            self.doc.set_attribute(
                node,
                &self.names.array_lower_bound_attribute,
                join(array.lower_bounds().iter()),
            );
        }

        if elem.is_condensable() && !self.flags.contains(ContextFlags::EXPLICIT_ARRAY_ELEMENTS) {
            let tokens = array
                .items()
                .iter()
                .map(condensed_token)
                .collect::<Result<Vec<_>, _>>()?;
            let text = codec::encode_condensed(tokens.iter().map(Option::as_deref));
            if !text.is_empty() {
                self.doc.set_text(node, text);
            }
            return Ok(());
        }

        let remove_nulls = self.flags.contains(ContextFlags::REMOVE_NULL_VALUES);
        let all_indices = self.flags.contains(ContextFlags::ARRAY_ELEMENTS_INCLUDE_INDICES);
        let mut previous: Option<usize> = None;
        for (flat, item) in array.items().iter().enumerate() {
            if remove_nulls && item.is_null() {
                continue;
            }
            let child = self.doc.add_child(node, element_name);
            let contiguous = flat == previous.map_or(0, |p| p + 1);
            if all_indices || !contiguous {
                self.doc.set_attribute(
                    child,
                    &self.names.array_index_attribute,
                    join(array.indices_of(flat).iter()),
                );
            }
            previous = Some(flat);
            self.encode_value(item, elem, child)?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Surrogates

    fn dispatch(
        &mut self,
        value: &Value,
        runtime: &Ty,
        declared: &Ty,
        node: NodeId,
    ) -> Result<bool, SerializeError> {
        if let Some(chain) = self.context.surrogate(runtime)
            && chain.serialize(value, declared, node, self)?
        {
            return Ok(true);
        }
        match runtime {
            Ty::List(_) => ListSurrogate.serialize(value, declared, node, self),
            Ty::Map(..) => MapSurrogate.serialize(value, declared, node, self),
            Ty::Named(path) if self.registry.get_struct(path).is_some() => {
                let meta = self.registry.get_type_metadata(path)?;
                match meta.implicit_serializer() {
                    Some(hook) => hook(value, node, self),
                    None => Ok(false),
                }
            }
            _ => Ok(false),
        }
    }

    // Offers a base level of a struct to its own surrogates.
    fn dispatch_level(
        &mut self,
        value: &Value,
        level: &TypeMetadata,
        node: NodeId,
    ) -> Result<bool, SerializeError> {
        if let Some(chain) = self.context.surrogate(level.ty())
            && chain.serialize(value, level.ty(), node, self)?
        {
            return Ok(true);
        }
        match level.implicit_serializer() {
            Some(hook) => hook(value, node, self),
            None => Ok(false),
        }
    }

    fn field_name(&self, field: &FieldDescriptor) -> Arc<str> {
        field_node_name(
            field,
            self.renamer.as_deref(),
            self.flags.contains(ContextFlags::FIX_FIELD_NAMES),
        )
    }
}

fn condensed_token(value: &Value) -> Result<Option<String>, SerializeError> {
    match value {
        Value::Null => Ok(None),
        other => codec::format_primitive(other)
            .map(Some)
            .ok_or_else(|| {
                SerializeError::Unsupported(format!("{} in condensed array", other.kind()))
            }),
    }
}

fn join<T: ToString>(items: impl Iterator<Item = T>) -> String {
    items.map(|v| v.to_string()).collect::<Vec<_>>().join(",")
}
