use wv_utils::hash::HashSet;

use crate::value::{Heap, Object, ObjectId, Value};

impl Heap {
    /// Compares two object graphs structurally, field by field and item by item.
    ///
    /// `a` is read from `self`, `b` from `other`. Object identities are not
    /// compared, only what they hold. A pair of objects already under comparison
    /// is assumed equal, so cyclic graphs terminate.
    ///
    /// # Examples
    ///
    /// ```
    /// use wv_reflect::value::{DynamicStruct, Heap, Value};
    ///
    /// let mut left = Heap::new();
    /// let a = left.insert(DynamicStruct::new("N").with("v", 1));
    /// left.get_struct_mut(a).unwrap().set("next", a);
    ///
    /// let mut right = Heap::new();
    /// let b = right.insert(DynamicStruct::new("N").with("v", 1));
    /// right.get_struct_mut(b).unwrap().set("next", b);
    ///
    /// assert!(left.graph_eq(&Value::Ref(a), &right, &Value::Ref(b)));
    /// ```
    pub fn graph_eq(&self, a: &Value, other: &Heap, b: &Value) -> bool {
        let mut visiting = HashSet::default();
        value_eq(self, a, other, b, &mut visiting)
    }
}

fn value_eq(
    left: &Heap,
    a: &Value,
    right: &Heap,
    b: &Value,
    visiting: &mut HashSet<(ObjectId, ObjectId)>,
) -> bool {
    match (a, b) {
        (Value::Ref(x), Value::Ref(y)) => object_eq(left, *x, right, *y, visiting),
        _ => a == b,
    }
}

fn object_eq(
    left: &Heap,
    x: ObjectId,
    right: &Heap,
    y: ObjectId,
    visiting: &mut HashSet<(ObjectId, ObjectId)>,
) -> bool {
    if !visiting.insert((x, y)) {
        return true;
    }
    let (Some(a), Some(b)) = (left.get(x), right.get(y)) else {
        return false;
    };

    match (a, b) {
        (Object::Struct(a), Object::Struct(b)) => {
            a.type_path() == b.type_path()
                && a.field_len() == b.field_len()
                && a.fields().all(|(name, va)| {
                    b.get(name)
                        .is_some_and(|vb| value_eq(left, va, right, vb, visiting))
                })
        }
        (Object::Array(a), Object::Array(b)) => {
            a.elem_ty() == b.elem_ty()
                && a.lengths() == b.lengths()
                && a.lower_bounds() == b.lower_bounds()
                && items_eq(left, a.items(), right, b.items(), visiting)
        }
        (Object::List(a), Object::List(b)) => {
            a.elem_ty() == b.elem_ty() && items_eq(left, a.items(), right, b.items(), visiting)
        }
        (Object::Map(a), Object::Map(b)) => {
            a.key_ty() == b.key_ty()
                && a.value_ty() == b.value_ty()
                && a.len() == b.len()
                && a.entries().iter().zip(b.entries()).all(|((ka, va), (kb, vb))| {
                    value_eq(left, ka, right, kb, visiting) && value_eq(left, va, right, vb, visiting)
                })
        }
        _ => false,
    }
}

fn items_eq(
    left: &Heap,
    a: &[Value],
    right: &Heap,
    b: &[Value],
    visiting: &mut HashSet<(ObjectId, ObjectId)>,
) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(va, vb)| value_eq(left, va, right, vb, visiting))
}
