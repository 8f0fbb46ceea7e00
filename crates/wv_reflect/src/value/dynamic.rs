use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::info::Ty;
use crate::value::Value;

// -----------------------------------------------------------------------------
// DynamicStruct

/// A struct instance: the registered type path and named field values.
///
/// Fields are kept in insertion order. A registered field missing here
/// reads as its type's default during serialization.
#[derive(Clone, Debug, PartialEq)]
pub struct DynamicStruct {
    ty: Arc<str>,
    fields: Vec<(Arc<str>, Value)>,
}

impl DynamicStruct {
    /// Creates an instance of `ty` without fields.
    #[inline]
    pub fn new(ty: impl Into<Arc<str>>) -> Self {
        Self {
            ty: ty.into(),
            fields: Vec::new(),
        }
    }

    /// Builder form of [`set`](Self::set).
    #[inline]
    pub fn with(mut self, name: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Sets a field, replacing the previous value if the field exists.
    pub fn set(&mut self, name: impl Into<Arc<str>>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Returns the type path.
    #[inline]
    pub fn type_path(&self) -> &str {
        &self.ty
    }

    #[inline]
    pub fn ty(&self) -> Ty {
        Ty::Named(self.ty.clone())
    }

    /// Returns the value of the field `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| &**n == name)
            .map(|(_, v)| v)
    }

    /// Returns the value of the field `name` mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields
            .iter_mut()
            .find(|(n, _)| &**n == name)
            .map(|(_, v)| v)
    }

    /// Returns the fields in insertion order.
    #[inline]
    pub fn fields(&self) -> impl ExactSizeIterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (&**n, v))
    }

    #[inline]
    pub fn field_len(&self) -> usize {
        self.fields.len()
    }
}

// -----------------------------------------------------------------------------
// DynamicArray

/// A rectangular array of any rank with per-dimension lower bounds.
///
/// Items are stored in row-major order: the last index varies fastest.
///
/// # Examples
///
/// ```
/// use wv_reflect::info::Ty;
/// use wv_reflect::value::{DynamicArray, Value};
///
/// let mut grid = DynamicArray::filled(Ty::I32, &[2, 3], Value::I32(0)).with_lower_bounds(&[1, 0]);
/// assert!(grid.set(&[2, 1], Value::I32(7)));
///
/// assert_eq!(grid.flat_index(&[2, 1]), Some(4));
/// assert_eq!(grid.indices_of(4), vec![2, 1]);
/// assert_eq!(grid.items()[4], Value::I32(7));
/// assert_eq!(grid.get(&[0, 0]), None);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct DynamicArray {
    elem: Ty,
    lengths: Vec<usize>,
    lower_bounds: Vec<i64>,
    items: Vec<Value>,
}

impl DynamicArray {
    /// Creates a one-dimensional, zero-based array holding `items`.
    pub fn new(elem: Ty, items: Vec<Value>) -> Self {
        Self {
            elem,
            lengths: alloc::vec![items.len()],
            lower_bounds: alloc::vec![0],
            items,
        }
    }

    /// Creates a zero-based array of the given shape with every item set to `fill`.
    ///
    /// An empty `lengths` slice creates an empty one-dimensional array.
    pub fn filled(elem: Ty, lengths: &[usize], fill: Value) -> Self {
        let lengths = if lengths.is_empty() {
            alloc::vec![0]
        } else {
            lengths.to_vec()
        };
        let total = lengths.iter().product();
        Self {
            elem,
            lower_bounds: alloc::vec![0; lengths.len()],
            lengths,
            items: alloc::vec![fill; total],
        }
    }

    /// Replaces the lower bounds. Missing trailing bounds are zero, extra bounds are ignored.
    pub fn with_lower_bounds(mut self, lower_bounds: &[i64]) -> Self {
        for (slot, bound) in self.lower_bounds.iter_mut().zip(lower_bounds) {
            *slot = *bound;
        }
        self
    }

    #[inline]
    pub fn elem_ty(&self) -> &Ty {
        &self.elem
    }

    #[inline]
    pub fn ty(&self) -> Ty {
        Ty::array_n(self.elem.clone(), self.rank())
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.lengths.len()
    }

    #[inline]
    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    #[inline]
    pub fn lower_bounds(&self) -> &[i64] {
        &self.lower_bounds
    }

    /// Total number of items across all dimensions.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    #[inline]
    pub fn items_mut(&mut self) -> &mut [Value] {
        &mut self.items
    }

    /// Converts bound-relative indices into a row-major position.
    pub fn flat_index(&self, indices: &[i64]) -> Option<usize> {
        if indices.len() != self.rank() {
            return None;
        }
        let mut flat = 0usize;
        for ((index, lower), length) in indices.iter().zip(&self.lower_bounds).zip(&self.lengths) {
            let offset = usize::try_from(index.checked_sub(*lower)?).ok()?;
            if offset >= *length {
                return None;
            }
            flat = flat * length + offset;
        }
        Some(flat)
    }

    /// Converts a row-major position into bound-relative indices.
    pub fn indices_of(&self, mut flat: usize) -> Vec<i64> {
        let mut indices = alloc::vec![0i64; self.rank()];
        for dim in (0..self.rank()).rev() {
            let length = self.lengths[dim].max(1);
            indices[dim] = (flat % length) as i64 + self.lower_bounds[dim];
            flat /= length;
        }
        indices
    }

    /// Returns the item at bound-relative `indices`.
    #[inline]
    pub fn get(&self, indices: &[i64]) -> Option<&Value> {
        self.items.get(self.flat_index(indices)?)
    }

    /// Sets the item at bound-relative `indices`, returns `false` when out of range.
    pub fn set(&mut self, indices: &[i64], value: Value) -> bool {
        match self.flat_index(indices) {
            Some(flat) => {
                self.items[flat] = value;
                true
            }
            None => false,
        }
    }
}

// -----------------------------------------------------------------------------
// DynamicList

/// A growable sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct DynamicList {
    elem: Ty,
    items: Vec<Value>,
}

impl DynamicList {
    #[inline]
    pub fn new(elem: Ty) -> Self {
        Self {
            elem,
            items: Vec::new(),
        }
    }

    /// Builder form of [`push`](Self::push).
    #[inline]
    pub fn with(mut self, value: impl Into<Value>) -> Self {
        self.items.push(value.into());
        self
    }

    #[inline]
    pub fn push(&mut self, value: impl Into<Value>) {
        self.items.push(value.into());
    }

    #[inline]
    pub fn elem_ty(&self) -> &Ty {
        &self.elem
    }

    #[inline]
    pub fn ty(&self) -> Ty {
        Ty::list(self.elem.clone())
    }

    #[inline]
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

// -----------------------------------------------------------------------------
// DynamicMap

/// An insertion-ordered map. Keys compare by value.
#[derive(Clone, Debug, PartialEq)]
pub struct DynamicMap {
    key: Ty,
    value: Ty,
    entries: Vec<(Value, Value)>,
}

impl DynamicMap {
    #[inline]
    pub fn new(key: Ty, value: Ty) -> Self {
        Self {
            key,
            value,
            entries: Vec::new(),
        }
    }

    /// Builder form of [`insert`](Self::insert).
    #[inline]
    pub fn with(mut self, key: impl Into<Value>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts an entry, returning the value it replaced.
    pub fn insert(&mut self, key: impl Into<Value>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(core::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    #[inline]
    pub fn key_ty(&self) -> &Ty {
        &self.key
    }

    #[inline]
    pub fn value_ty(&self) -> &Ty {
        &self.value
    }

    #[inline]
    pub fn ty(&self) -> Ty {
        Ty::map(self.key.clone(), self.value.clone())
    }

    #[inline]
    pub fn entries(&self) -> &[(Value, Value)] {
        &self.entries
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
