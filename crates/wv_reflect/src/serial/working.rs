use alloc::string::String;
use alloc::vec::Vec;

use super::{DeserializeError, Deserializer};
use crate::info::Ty;
use crate::value::{DynamicArray, DynamicList, DynamicMap, Value};

/// The value under construction for one node during deserialization.
///
/// A working object is set at most once. Setting it also registers the
/// value under the node's reference id, so nodes decoded afterwards can
/// refer back to it, including the node's own descendants.
///
/// A surrogate may set the working object and still return `false`:
/// the engine then fills the value it was given instead of creating one.
#[derive(Debug)]
pub struct WorkingObject {
    ty: Ty,
    ref_id: Option<String>,
    value: Option<Value>,
}

impl WorkingObject {
    #[inline]
    pub(crate) fn new(ty: Ty, ref_id: Option<String>) -> Self {
        Self {
            ty,
            ref_id,
            value: None,
        }
    }

    /// The type resolved for the node.
    #[inline]
    pub fn ty(&self) -> &Ty {
        &self.ty
    }

    /// The reference id the node carries.
    #[inline]
    pub fn ref_id(&self) -> Option<&str> {
        self.ref_id.as_deref()
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    #[inline]
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Sets the working object.
    ///
    /// Fails with [`DeserializeError::AlreadySet`] when called a second time.
    pub fn set(
        &mut self,
        value: impl Into<Value>,
        de: &mut Deserializer<'_>,
    ) -> Result<(), DeserializeError> {
        if self.value.is_some() {
            return Err(DeserializeError::AlreadySet);
        }
        let value = value.into();
        if let Some(ref_id) = &self.ref_id {
            de.register_reference(ref_id, value.clone());
        }
        self.value = Some(value);
        Ok(())
    }

    /// Returns the working object, first setting it to a fresh value of its type when unset.
    ///
    /// Structs are created with every field at its default. Arrays, lists
    /// and maps are created empty, other types at their default value.
    pub fn get_existing_or_create(
        &mut self,
        de: &mut Deserializer<'_>,
    ) -> Result<Value, DeserializeError> {
        if let Some(value) = &self.value {
            return Ok(value.clone());
        }
        let value = match &self.ty {
            Ty::Named(path) if de.registry().get_struct(path).is_some() => {
                let instance = de.registry().instantiate(path)?;
                Value::Ref(de.heap_mut().insert(instance))
            }
            Ty::Array(elem, rank) => {
                let lengths: Vec<usize> = alloc::vec![0; *rank];
                let array = DynamicArray::filled(Ty::clone(elem), &lengths, Value::Null);
                Value::Ref(de.heap_mut().insert(array))
            }
            Ty::List(elem) => Value::Ref(de.heap_mut().insert(DynamicList::new(Ty::clone(elem)))),
            Ty::Map(key, value) => Value::Ref(
                de.heap_mut()
                    .insert(DynamicMap::new(Ty::clone(key), Ty::clone(value))),
            ),
            ty => de.registry().default_value(ty),
        };
        self.set(value.clone(), de)?;
        Ok(value)
    }

    /// Consumes the working object, returning its value.
    #[inline]
    pub(crate) fn into_value(self) -> Option<Value> {
        self.value
    }
}
