use alloc::string::ToString;

use wv_tree::NodeId;

use super::{DeserializeError, Deserializer, SerializeError, Serializer, Surrogate, WorkingObject};
use crate::info::Ty;
use crate::value::Value;

const KEY: &str = "key";
const VALUE: &str = "value";

fn mismatch(expected: &Ty, found: &Value) -> DeserializeError {
    DeserializeError::TypeMismatch {
        expected: expected.to_string(),
        found: found.kind().into(),
    }
}

// -----------------------------------------------------------------------------
// ListSurrogate

/// Built-in handling of [`DynamicList`](crate::value::DynamicList):
/// one element node per item, in order.
///
/// Consulted after the surrogates registered on the context.
#[derive(Clone, Copy, Debug, Default)]
pub struct ListSurrogate;

impl Surrogate for ListSurrogate {
    fn serialize(
        &self,
        value: &Value,
        _declared: &Ty,
        node: NodeId,
        ser: &mut Serializer<'_>,
    ) -> Result<bool, SerializeError> {
        let Some(list) = value.as_object().ok().and_then(|id| ser.heap().get_list(id)) else {
            return Ok(false);
        };
        log::trace!("encoding list `{}`", list.ty());
        let element_name = ser.element_name();
        for item in list.items() {
            ser.encode_child(node, &element_name, item, list.elem_ty())?;
        }
        Ok(true)
    }

    fn deserialize(
        &self,
        working: &mut WorkingObject,
        node: NodeId,
        de: &mut Deserializer<'_>,
    ) -> Result<bool, DeserializeError> {
        let Ty::List(elem) = working.ty().clone() else {
            return Ok(false);
        };
        let list = working.get_existing_or_create(de)?;
        let id = list.as_object().map_err(|_| mismatch(working.ty(), &list))?;
        if de.heap().get_list(id).is_none() {
            return Err(mismatch(working.ty(), &list));
        }

        let doc = de.document();
        for &child in doc.children(node) {
            let item = de.decode_node(child, Some(&*elem))?;
            if let Some(list) = de.heap_mut().get_list_mut(id) {
                list.push(item);
            }
        }
        Ok(true)
    }
}

// -----------------------------------------------------------------------------
// MapSurrogate

/// Built-in handling of [`DynamicMap`](crate::value::DynamicMap):
/// one element node per entry, holding a `key` and a `value` node.
///
/// Consulted after the surrogates registered on the context.
#[derive(Clone, Copy, Debug, Default)]
pub struct MapSurrogate;

impl Surrogate for MapSurrogate {
    fn serialize(
        &self,
        value: &Value,
        _declared: &Ty,
        node: NodeId,
        ser: &mut Serializer<'_>,
    ) -> Result<bool, SerializeError> {
        let Some(map) = value.as_object().ok().and_then(|id| ser.heap().get_map(id)) else {
            return Ok(false);
        };
        log::trace!("encoding map `{}`", map.ty());
        let element_name = ser.element_name();
        for (key, value) in map.entries() {
            let entry = ser.document_mut().add_child(node, &*element_name);
            ser.encode_child(entry, KEY, key, map.key_ty())?;
            ser.encode_child(entry, VALUE, value, map.value_ty())?;
        }
        Ok(true)
    }

    fn deserialize(
        &self,
        working: &mut WorkingObject,
        node: NodeId,
        de: &mut Deserializer<'_>,
    ) -> Result<bool, DeserializeError> {
        let Ty::Map(key_ty, value_ty) = working.ty().clone() else {
            return Ok(false);
        };
        let map = working.get_existing_or_create(de)?;
        let id = map.as_object().map_err(|_| mismatch(working.ty(), &map))?;
        if de.heap().get_map(id).is_none() {
            return Err(mismatch(working.ty(), &map));
        }

        let doc = de.document();
        for &entry in doc.children(node) {
            let Some(key_node) = doc.child_named(entry, KEY) else {
                log::warn!("ignoring map entry without a `{KEY}` node");
                continue;
            };
            let key = de.decode_node(key_node, Some(&*key_ty))?;
            let value = match doc.child_named(entry, VALUE) {
                Some(value_node) => de.decode_node(value_node, Some(&*value_ty))?,
                None => de.registry().default_value(&value_ty),
            };
            if let Some(map) = de.heap_mut().get_map_mut(id) {
                map.insert(key, value);
            }
        }
        Ok(true)
    }
}
