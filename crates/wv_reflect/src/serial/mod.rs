//! Encoding object graphs into XML documents and back.
//!
//! ## Menu
//!
//! - [`Serializer`]: turns a [`Value`](crate::value::Value) and the heap it points into a [`Document`](wv_tree::Document).
//! - [`Deserializer`]: turns a document back into values allocated in a heap.
//! - [`SerializationContext`]: wire names, [`ContextFlags`], a field renamer
//!   and [`Surrogate`]s, inherited through a parent chain from the global context.
//! - [`ContextSettings`]: a serde-loadable description of a context.
//! - [`Surrogate`] / [`SurrogateChain`]: custom encoding registered per type.
//! - [`WorkingObject`]: the value a node decodes to, as seen by surrogates.
//! - [`codec`]: the text forms of primitives, enums and condensed arrays.
//!
//! ## Shared references
//!
//! Heap objects, and strings when
//! [`ContextFlags::DUPLICATE_STRINGS_CAN_BE_REFERRED_TO`] is set, are written
//! once. Later occurrences become an empty node carrying the refer-to
//! attribute, and the first node receives a reference id. Cycles need no
//! special treatment.
//!
//! ```
//! use wv_reflect::info::{FieldInfo, StructInfo, Ty};
//! use wv_reflect::registry::TypeRegistry;
//! use wv_reflect::serial::{Deserializer, Serializer};
//! use wv_reflect::value::{DynamicStruct, Heap, Value};
//!
//! let mut registry = TypeRegistry::new();
//! registry.register(
//!     StructInfo::new("demo::Node").with_field(FieldInfo::new("next", Ty::named("demo::Node"))),
//! );
//!
//! let mut heap = Heap::new();
//! let a = heap.insert(DynamicStruct::new("demo::Node"));
//! let b = heap.insert(DynamicStruct::new("demo::Node").with("next", a));
//! heap.get_struct_mut(a).unwrap().set("next", b);
//!
//! let doc = Serializer::new(&registry, &heap).serialize(&Value::Ref(a)).unwrap();
//! assert_eq!(
//!     doc.to_xml().unwrap(),
//!     r#"<_Root _RefID="1"><next><next _ReferTo="1"/></next></_Root>"#
//! );
//!
//! let mut decoded = Heap::new();
//! let root = Deserializer::new(&registry, &doc, &mut decoded)
//!     .deserialize(Some(&Ty::named("demo::Node")))
//!     .unwrap();
//! assert!(heap.graph_eq(&Value::Ref(a), &decoded, &root));
//! ```

// -----------------------------------------------------------------------------
// Modules

pub mod codec;

mod context;
mod de;
mod error;
mod framework;
mod renamer;
mod ser;
mod settings;
mod surrogate;
mod tracker;
mod working;

#[cfg(test)]
mod tests;

// -----------------------------------------------------------------------------
// Exports

pub use context::{ContextFlags, SerializationContext, WireName, WireNames};
pub use de::{Deserializer, MAX_ARRAY_ELEMENTS};
pub use error::{ArgumentError, DeserializeError, SerializeError};
pub use framework::{ListSurrogate, MapSurrogate};
pub use renamer::{FieldRenamer, FixMemberRenamer, ProtobufFieldRenamer, fix_field_name};
pub use ser::Serializer;
pub use settings::{ContextSettings, Preset};
pub use surrogate::{ImplicitDeserializeFn, ImplicitSerializeFn, Surrogate, SurrogateChain};
pub use working::WorkingObject;
