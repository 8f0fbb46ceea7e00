use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::str::FromStr;

use wv_tree::{Document, NodeId};
use wv_utils::hash::HashSet;

use super::framework::{ListSurrogate, MapSurrogate};
use super::renamer::field_node_name;
use super::tracker::DeserializeTracker;
use super::{
    ContextFlags, DeserializeError, FieldRenamer, SerializationContext, Surrogate, WireNames,
    WorkingObject, codec,
};
use crate::info::{Ty, TypeInfo};
use crate::registry::{FieldDescriptor, TypeMetadata, TypeRegistry};
use crate::value::{DynamicArray, Heap, ObjectId, Value};

/// The largest number of elements a decoded array may hold.
///
/// Larger `_Array` lengths, or explicit indices past it, fail to decode.
pub const MAX_ARRAY_ELEMENTS: usize = 1 << 24;

// -----------------------------------------------------------------------------
// Deserializer

/// Decodes a [`Document`] into values allocated in a [`Heap`].
///
/// A deserializer is one session: it owns the table of reference ids seen
/// so far and is consumed by [`deserialize`](Self::deserialize). Surrogates
/// receive it to decode nested nodes with [`decode_node`](Self::decode_node).
///
/// # Decoding order
///
/// For each node the deserializer tries, in order:
///
/// 1. the null attribute: null;
/// 2. the refer-to attribute: the value registered under that id;
/// 3. the type: the type attribute, else the expected type. A type name
///    the registry does not know decodes to null, no type at all is an error;
/// 4. the surrogates registered on the context for that type, the built-in
///    list and map surrogates, then the type's implicit deserializer;
/// 5. primitives, strings and enums from the text;
/// 6. arrays, condensed or one node per element;
/// 7. structs, one child per field. Children matching no field are ignored.
///
/// # Examples
///
/// ```
/// use wv_reflect::info::{FieldInfo, StructInfo, Ty};
/// use wv_reflect::registry::TypeRegistry;
/// use wv_reflect::serial::Deserializer;
/// use wv_reflect::value::Heap;
/// use wv_tree::Document;
///
/// let mut registry = TypeRegistry::new();
/// registry.register(
///     StructInfo::new("game::Player")
///         .with_field(FieldInfo::new("m_name", Ty::String))
///         .with_field(FieldInfo::new("m_score", Ty::I32)),
/// );
///
/// let doc = Document::from_xml(
///     r#"<_Root _Type="game::Player"><Score>42</Score><Name>Homer</Name></_Root>"#,
/// )
/// .unwrap();
///
/// let mut heap = Heap::new();
/// let value = Deserializer::new(&registry, &doc, &mut heap)
///     .deserialize(None)
///     .unwrap();
///
/// let player = heap.get_struct(value.as_object().unwrap()).unwrap();
/// assert_eq!(player.get("m_name").unwrap().as_str(), Ok("Homer"));
/// assert_eq!(player.get("m_score").unwrap().as_i32(), Ok(42));
/// ```
pub struct Deserializer<'a> {
    registry: &'a TypeRegistry,
    doc: &'a Document,
    heap: &'a mut Heap,
    context: &'a SerializationContext,
    names: WireNames,
    flags: ContextFlags,
    renamer: Option<Arc<dyn FieldRenamer>>,
    tracker: DeserializeTracker,
    ignored: HashSet<Arc<str>>,
}

impl<'a> Deserializer<'a> {
    /// Creates a session using the [global](SerializationContext::global) context.
    pub fn new(registry: &'a TypeRegistry, doc: &'a Document, heap: &'a mut Heap) -> Self {
        let context = SerializationContext::global();
        Self {
            registry,
            doc,
            heap,
            context,
            names: context.wire_names(),
            flags: context.flags(),
            renamer: context.field_renamer(),
            tracker: DeserializeTracker::default(),
            ignored: HashSet::default(),
        }
    }

    /// Uses `context` for this session.
    ///
    /// Names, flags and the field renamer are read once, here.
    pub fn with_context(mut self, context: &'a SerializationContext) -> Self {
        self.context = context;
        self.names = context.wire_names();
        self.flags = context.flags();
        self.renamer = context.field_renamer();
        self
    }

    /// Decodes the root node.
    ///
    /// `expected` is used when the root carries no type attribute.
    pub fn deserialize(mut self, expected: Option<&Ty>) -> Result<Value, DeserializeError> {
        let root = self.doc.root().ok_or(DeserializeError::EmptyDocument)?;
        self.decode_node(root, expected)
    }

    // -------------------------------------------------------------------------
    // Accessors

    #[inline]
    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    #[inline]
    pub fn document(&self) -> &'a Document {
        self.doc
    }

    #[inline]
    pub fn heap(&self) -> &Heap {
        self.heap
    }

    #[inline]
    pub fn heap_mut(&mut self) -> &mut Heap {
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

    /// Skips the field declared as `field_name` in the struct level about to be walked.
    ///
    /// The counterpart of [`Serializer::ignore_field`](super::Serializer::ignore_field):
    /// a surrogate that decodes some fields itself and returns `false` keeps
    /// the engine from decoding them again. The set is cleared once the level
    /// has been walked.
    pub fn ignore_field(&mut self, field_name: &str) {
        self.ignored.insert(Arc::from(field_name));
    }

    #[inline]
    pub(crate) fn register_reference(&mut self, ref_id: &str, value: Value) {
        self.tracker.register(ref_id, value);
    }

    // -------------------------------------------------------------------------
    // Decoding

    /// Decodes `node`, falling back to `expected` when it carries no type attribute.
    pub fn decode_node(
        &mut self,
        node: NodeId,
        expected: Option<&Ty>,
    ) -> Result<Value, DeserializeError> {
        let pending = core::mem::take(&mut self.ignored);
        let result = self.decode_element(node, expected);
        self.ignored = pending;
        result
    }

    fn decode_element(
        &mut self,
        node: NodeId,
        expected: Option<&Ty>,
    ) -> Result<Value, DeserializeError> {
        let doc = self.doc;

        if doc.attribute(node, &self.names.null_attribute) == Some(&*self.names.null_value) {
            return Ok(Value::Null);
        }

        if let Some(ref_id) = doc.attribute(node, &self.names.refer_to_attribute) {
            log::trace!("decoding reference to {ref_id}");
            return self
                .tracker
                .get(ref_id)
                .cloned()
                .ok_or_else(|| DeserializeError::UnknownReference(ref_id.into()));
        }

        let ty = match doc.attribute(node, &self.names.type_attribute) {
            Some(name) => self.registry.resolve(name),
            None => match expected {
                Some(Ty::Object) | None => {
                    return Err(DeserializeError::MissingType(doc.name(node).into()));
                }
                Some(ty) => Some(ty.clone()).filter(|ty| self.registry.is_known(ty)),
            },
        };
        let Some(ty) = ty else {
            log::warn!(
                "type of node `{}` cannot be resolved, decoding it as null",
                doc.name(node)
            );
            return Ok(Value::Null);
        };
        log::trace!("decoding `{ty}`");

        let ref_id = doc
            .attribute(node, &self.names.reference_id_attribute)
            .map(String::from);
        let mut working = WorkingObject::new(ty.clone(), ref_id);

        if !self.dispatch(&mut working, &ty, node)? {
            self.decode_default(&mut working, &ty, node)?;
        }
        Ok(working.into_value().unwrap_or_default())
    }

    fn decode_default(
        &mut self,
        working: &mut WorkingObject,
        ty: &Ty,
        node: NodeId,
    ) -> Result<(), DeserializeError> {
        let doc = self.doc;
        let registry = self.registry;

        match ty {
            Ty::Array(elem, rank) => self.decode_array(working, elem, *rank, node),
            Ty::Named(path) => match registry.get(path) {
                Some(TypeInfo::Struct(_)) => self.decode_struct(working, path, node),
                Some(TypeInfo::Enum(info)) if !working.is_set() => {
                    let bits = codec::parse_enum(info, doc.text(node).unwrap_or_default())?;
                    working.set(Value::Enum { ty: path.clone(), bits }, self)
                }
                _ => Ok(()),
            },
            Ty::Object => Err(DeserializeError::MissingType(doc.name(node).into())),
            Ty::List(_) | Ty::Map(..) => Ok(()),
            primitive if !working.is_set() => {
                let value = codec::parse_primitive(primitive, doc.text(node).unwrap_or_default())?;
                working.set(value, self)
            }
            _ => Ok(()),
        }
    }

    fn decode_struct(
        &mut self,
        working: &mut WorkingObject,
        path: &str,
        node: NodeId,
    ) -> Result<(), DeserializeError> {
        let doc = self.doc;
        let meta = self.registry.get_type_metadata(path)?;

        let existing = match working.value() {
            Some(Value::Ref(id)) if self.heap.get_struct(*id).is_some() => Some(*id),
            Some(other) => return Err(mismatch(path, other)),
            None => None,
        };
        let id = match existing {
            Some(id) => id,
            None => {
                let id = self.heap.insert(meta.instantiate());
                working.set(Value::Ref(id), self)?;
                id
            }
        };

        let mut known: Vec<Arc<str>> = Vec::new();
        let mut complete = true;
        for (depth, level) in meta.levels().enumerate() {
            if depth > 0 && self.dispatch_level(working, level, node)? {
                complete = false;
                break;
            }
            let ignored = core::mem::take(&mut self.ignored);
            for field in level.own_fields() {
                let name = self.field_name(field);
                if ignored.contains(field.name()) {
                    log::trace!("skipping ignored field `{}`", field.name());
                    known.push(name);
                    continue;
                }
                if let Some(child) = doc.child_named(node, &name) {
                    let value = self.decode_node(child, Some(field.ty()))?;
                    if let Some(object) = self.heap.get_struct_mut(id) {
                        object.set(field.name.clone(), value);
                    }
                }
                known.push(name);
            }
        }

        if complete {
            for &child in doc.children(node) {
                let name = doc.name(child);
                if !known.iter().any(|k| &**k == name) {
                    log::warn!("ignoring node `{name}`, `{path}` has no such field");
                }
            }
        }
        Ok(())
    }

    fn decode_array(
        &mut self,
        working: &mut WorkingObject,
        elem: &Ty,
        rank: usize,
        node: NodeId,
    ) -> Result<(), DeserializeError> {
        let doc = self.doc;
        let array_ty = Ty::array_n(elem.clone(), rank);

        let lengths = match doc.attribute(node, &self.names.array_attribute) {
            Some(text) => Some(parse_list::<usize>(&self.names.array_attribute, text)?),
            None => None,
        };
        if let Some(lengths) = &lengths
            && lengths.len() != rank
        {
            return Err(DeserializeError::RankMismatch {
                expected: rank,
                found: lengths.len(),
            });
        }
        let lower = match doc.attribute(node, &self.names.array_lower_bound_attribute) {
            Some(text) => parse_list::<i64>(&self.names.array_lower_bound_attribute, text)?,
            None => alloc::vec![0; rank],
        };
        if lower.len() != rank {
            return Err(DeserializeError::RankMismatch {
                expected: rank,
                found: lower.len(),
            });
        }

        let children = doc.children(node);
        if children.is_empty() {
            log::trace!("decoding condensed `{array_ty}`");
            let tokens = match doc.text(node) {
                Some(_) if !elem.is_condensable() => {
                    return Err(DeserializeError::CondensedNonPrimitive(elem.to_string()));
                }
                Some(text) => codec::decode_condensed(text),
                None => Vec::new(),
            };
            let lengths = match lengths {
                Some(lengths) => lengths,
                None if rank == 1 => alloc::vec![tokens.len()],
                None => return Err(DeserializeError::RankMismatch { expected: rank, found: 1 }),
            };
            let id = self.array_for(working, elem, &lengths, &lower)?;

            for (flat, token) in tokens.into_iter().enumerate() {
                let value = match token {
                    Some(text) => codec::parse_primitive(elem, &text)?,
                    None => self.registry.default_value(elem),
                };
                let slot = self
                    .heap
                    .get_array_mut(id)
                    .and_then(|array| array.items_mut().get_mut(flat))
                    .ok_or_else(|| out_of_range(&flat, &array_ty))?;
                *slot = value;
            }
            return Ok(());
        }

        log::trace!("decoding explicit `{array_ty}`");
        if rank > 1 && lengths.is_none() {
            return Err(DeserializeError::RankMismatch { expected: rank, found: 1 });
        }
        let index_attribute = self.names.array_index_attribute.clone();
        let mut positions: Vec<Vec<i64>> = Vec::with_capacity(children.len());
        // An error once the previous index has no successor.
        let mut next: Result<Vec<i64>, DeserializeError> = Ok(lower.clone());
        for &child in children {
            let index = match doc.attribute(child, &index_attribute) {
                Some(text) => {
                    let index = parse_list::<i64>(&index_attribute, text)?;
                    if index.len() != rank {
                        return Err(DeserializeError::RankMismatch {
                            expected: rank,
                            found: index.len(),
                        });
                    }
                    index
                }
                None => next.clone()?,
            };
            next = successor(&index, &lower, lengths.as_deref())
                .ok_or_else(|| out_of_range(&join(&index), &array_ty));
            positions.push(index);
        }

        let lengths = match lengths {
            Some(lengths) => lengths,
            None => {
                let mut len = 0;
                for index in &positions {
                    let end = index[0]
                        .checked_sub(lower[0])
                        .and_then(|offset| offset.checked_add(1))
                        .and_then(|end| usize::try_from(end).ok())
                        .filter(|end| *end <= MAX_ARRAY_ELEMENTS)
                        .ok_or_else(|| out_of_range(&join(index), &array_ty))?;
                    len = len.max(end);
                }
                alloc::vec![len]
            }
        };
        let id = self.array_for(working, elem, &lengths, &lower)?;

        for (&child, index) in children.iter().zip(&positions) {
            let flat = self
                .heap
                .get_array(id)
                .and_then(|array| array.flat_index(index))
                .ok_or_else(|| out_of_range(&join(index), &array_ty))?;
            let value = self.decode_node(child, Some(elem))?;
            if let Some(slot) = self
                .heap
                .get_array_mut(id)
                .and_then(|array| array.items_mut().get_mut(flat))
            {
                *slot = value;
            }
        }
        Ok(())
    }

    // The array a surrogate already set, or a new one of the given shape.
    fn array_for(
        &mut self,
        working: &mut WorkingObject,
        elem: &Ty,
        lengths: &[usize],
        lower: &[i64],
    ) -> Result<ObjectId, DeserializeError> {
        match working.value() {
            Some(Value::Ref(id)) if self.heap.get_array(*id).is_some() => return Ok(*id),
            Some(other) => return Err(mismatch(&working.ty().to_string(), other)),
            None => {}
        }
        let total = lengths
            .iter()
            .try_fold(1usize, |total, len| total.checked_mul(*len))
            .filter(|total| *total <= MAX_ARRAY_ELEMENTS);
        if total.is_none() {
            return Err(DeserializeError::InvalidArrayAttribute {
                name: self.names.array_attribute.to_string(),
                value: lengths
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(","),
            });
        }
        let fill = self.registry.default_value(elem);
        let array = DynamicArray::filled(elem.clone(), lengths, fill).with_lower_bounds(lower);
        let id = self.heap.insert(array);
        working.set(Value::Ref(id), self)?;
        Ok(id)
    }

    // -------------------------------------------------------------------------
    // Surrogates

    fn dispatch(
        &mut self,
        working: &mut WorkingObject,
        ty: &Ty,
        node: NodeId,
    ) -> Result<bool, DeserializeError> {
        if let Some(chain) = self.context.surrogate(ty)
            && chain.deserialize(working, node, self)?
        {
            return Ok(true);
        }
        match ty {
            Ty::List(_) => ListSurrogate.deserialize(working, node, self),
            Ty::Map(..) => MapSurrogate.deserialize(working, node, self),
            Ty::Named(path) if self.registry.get_struct(path).is_some() => {
                let meta = self.registry.get_type_metadata(path)?;
                match meta.implicit_deserializer() {
                    Some(hook) => hook(working, node, self),
                    None => Ok(false),
                }
            }
            _ => Ok(false),
        }
    }

    // Offers a base level of a struct to its own surrogates.
    fn dispatch_level(
        &mut self,
        working: &mut WorkingObject,
        level: &TypeMetadata,
        node: NodeId,
    ) -> Result<bool, DeserializeError> {
        if let Some(chain) = self.context.surrogate(level.ty())
            && chain.deserialize(working, node, self)?
        {
            return Ok(true);
        }
        match level.implicit_deserializer() {
            Some(hook) => hook(working, node, self),
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

fn parse_list<T: FromStr>(name: &str, text: &str) -> Result<Vec<T>, DeserializeError> {
    text.split(',')
        .map(|part| part.trim().parse())
        .collect::<Result<_, _>>()
        .map_err(|_| DeserializeError::InvalidArrayAttribute {
            name: name.into(),
            value: text.into(),
        })
}

// The position after `index` in row-major order, `None` past `i64::MAX`.
fn successor(index: &[i64], lower: &[i64], lengths: Option<&[usize]>) -> Option<Vec<i64>> {
    let mut next = index.to_vec();
    for dim in (0..next.len()).rev() {
        next[dim] = next[dim].checked_add(1)?;
        let wrapped = match lengths {
            Some(lengths) if dim > 0 => {
                let offset = next[dim].checked_sub(lower[dim])?;
                usize::try_from(offset).is_ok_and(|offset| offset >= lengths[dim])
            }
            _ => false,
        };
        if !wrapped {
            break;
        }
        next[dim] = lower[dim];
    }
    Some(next)
}

fn join(index: &[i64]) -> String {
    index
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[cold]
fn out_of_range(index: &dyn core::fmt::Display, ty: &Ty) -> DeserializeError {
    DeserializeError::IndexOutOfRange {
        index: index.to_string(),
        ty: ty.to_string(),
    }
}

#[cold]
fn mismatch(expected: &str, found: &Value) -> DeserializeError {
    DeserializeError::TypeMismatch {
        expected: expected.into(),
        found: found.kind().into(),
    }
}
