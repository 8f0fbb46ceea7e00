use slotmap::SlotMap;

use crate::info::Ty;
use crate::value::{DynamicArray, DynamicList, DynamicMap, DynamicStruct};

slotmap::new_key_type! {
    /// The identity of a heap object.
    pub struct ObjectId;
}

// -----------------------------------------------------------------------------
// Object

/// An identity-carrying value stored in a [`Heap`].
#[derive(Clone, Debug, PartialEq)]
pub enum Object {
    Struct(DynamicStruct),
    Array(DynamicArray),
    List(DynamicList),
    Map(DynamicMap),
}

impl Object {
    /// Returns the runtime type of the object.
    pub fn ty(&self) -> Ty {
        match self {
            Object::Struct(s) => s.ty(),
            Object::Array(a) => a.ty(),
            Object::List(l) => l.ty(),
            Object::Map(m) => m.ty(),
        }
    }
}

macro_rules! impl_from_dynamic {
    ($($variant:ident, $ty:ty;)*) => {
        $(
            impl From<$ty> for Object {
                #[inline]
                fn from(value: $ty) -> Self {
                    Object::$variant(value)
                }
            }
        )*
    };
}

impl_from_dynamic! {
    Struct, DynamicStruct;
    Array, DynamicArray;
    List, DynamicList;
    Map, DynamicMap;
}

// -----------------------------------------------------------------------------
// Heap

/// An arena of [`Object`]s.
///
/// The serializer reads a heap, the deserializer allocates into one.
/// Objects are never moved, an [`ObjectId`] stays valid until the object is removed.
#[derive(Clone, Debug, Default)]
pub struct Heap {
    objects: SlotMap<ObjectId, Object>,
}

macro_rules! impl_typed_access {
    ($($variant:ident, $ty:ty, $get:ident, $get_mut:ident;)*) => {
        impl Heap {
            $(
                #[doc = concat!("Returns the object behind `id` if it is a [`", stringify!($ty), "`].")]
                #[inline]
                pub fn $get(&self, id: ObjectId) -> Option<&$ty> {
                    match self.objects.get(id)? {
                        Object::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                #[doc = concat!("Returns the object behind `id` mutably if it is a [`", stringify!($ty), "`].")]
                #[inline]
                pub fn $get_mut(&mut self, id: ObjectId) -> Option<&mut $ty> {
                    match self.objects.get_mut(id)? {
                        Object::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            )*
        }
    };
}

impl_typed_access! {
    Struct, DynamicStruct, get_struct, get_struct_mut;
    Array, DynamicArray, get_array, get_array_mut;
    List, DynamicList, get_list, get_list_mut;
    Map, DynamicMap, get_map, get_map_mut;
}

impl Heap {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves `object` into the heap and returns its identity.
    #[inline]
    pub fn insert(&mut self, object: impl Into<Object>) -> ObjectId {
        self.objects.insert(object.into())
    }

    #[inline]
    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id)
    }

    #[inline]
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(id)
    }

    #[inline]
    pub fn remove(&mut self, id: ObjectId) -> Option<Object> {
        self.objects.remove(id)
    }

    #[inline]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    /// Returns the runtime type of the object behind `id`.
    #[inline]
    pub fn ty_of(&self, id: ObjectId) -> Option<Ty> {
        self.objects.get(id).map(Object::ty)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterates over all objects in unspecified order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.objects.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::{Heap, Object};
    use crate::info::Ty;
    use crate::value::{DynamicList, DynamicStruct};

    #[test]
    fn typed_access() {
        let mut heap = Heap::new();
        let s = heap.insert(DynamicStruct::new("a::B").with("x", 1));
        let l = heap.insert(DynamicList::new(Ty::I32).with(1).with(2));

        assert!(heap.get_struct(s).is_some());
        assert!(heap.get_list(s).is_none());
        assert_eq!(heap.get_list(l).unwrap().len(), 2);
        assert_eq!(heap.ty_of(s), Some(Ty::named("a::B")));
        assert_eq!(heap.ty_of(l), Some(Ty::list(Ty::I32)));

        assert!(matches!(heap.remove(s), Some(Object::Struct(_))));
        assert!(!heap.contains(s));
        assert_eq!(heap.len(), 1);
    }
}
