use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec;

use wv_tree::{Document, NodeId};

use crate::info::{EnumInfo, FieldInfo, StructInfo, Ty};
use crate::registry::{RegistryError, TypeRegistry};
use crate::serial::{
    DeserializeError, Deserializer, ProtobufFieldRenamer, SerializationContext, SerializeError,
    Serializer, Surrogate, WorkingObject,
};
use crate::value::{DynamicArray, DynamicList, DynamicMap, DynamicStruct, Heap, ObjectId, Value};

// -----------------------------------------------------------------------------
// Fixtures

fn badge_implicit(
    _value: &Value,
    node: NodeId,
    ser: &mut Serializer<'_>,
) -> Result<bool, SerializeError> {
    ser.document_mut().set_attribute(node, "implicit", "1");
    Ok(true)
}

fn zoo() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register(
        StructInfo::new("zoo::Animal")
            .with_field(FieldInfo::new("m_name", Ty::String))
            .with_field(FieldInfo::new("m_age", Ty::I32)),
    );
    registry.register(
        StructInfo::new("zoo::Dog")
            .with_base("zoo::Animal")
            .with_field(FieldInfo::new("m_tricks", Ty::array(Ty::String))),
    );
    registry.register(
        StructInfo::new("zoo::Node")
            .with_field(FieldInfo::new("value", Ty::I32))
            .with_field(FieldInfo::new("next", Ty::named("zoo::Node"))),
    );
    registry.register(StructInfo::new("zoo::Holder").with_field(FieldInfo::new("item", Ty::Object)));
    registry.register(
        StructInfo::new("zoo::Pair")
            .with_field(FieldInfo::new("first", Ty::String))
            .with_field(FieldInfo::new("second", Ty::String)),
    );
    registry.register(
        StructInfo::new("zoo::Badge")
            .with_field(FieldInfo::new("m_id", Ty::I32))
            .with_implicit_serializer(badge_implicit),
    );
    registry.register(
        StructInfo::new("zoo::Bag")
            .with_field(FieldInfo::new("items", Ty::list(Ty::I32)))
            .with_field(FieldInfo::new("counts", Ty::map(Ty::String, Ty::I32))),
    );
    registry.register(
        StructInfo::new("zoo::Kennel")
            .with_field(FieldInfo::new("dogs", Ty::list(Ty::String)).element_name("Dog")),
    );
    registry.register(
        StructInfo::new("zoo::Pen")
            .with_field(FieldInfo::new("access", Ty::named("zoo::Access"))),
    );
    registry.register(
        EnumInfo::new("zoo::Access")
            .with_variant("Read", 1)
            .with_variant("Write", 2)
            .with_variant("ReadWrite", 3)
            .with_variant("Execute", 4)
            .flags(),
    );
    registry
}

fn instance(registry: &TypeRegistry, path: &str) -> DynamicStruct {
    registry.instantiate(path).unwrap()
}

fn dog(registry: &TypeRegistry, heap: &mut Heap) -> ObjectId {
    let tricks = heap.insert(DynamicArray::new(
        Ty::String,
        vec![Value::from("sit"), Value::from("roll")],
    ));
    heap.insert(
        instance(registry, "zoo::Dog")
            .with("m_name", "Rex")
            .with("m_age", 3)
            .with("m_tricks", tricks),
    )
}

fn xml(doc: &Document) -> String {
    doc.to_xml().unwrap()
}

fn decode(registry: &TypeRegistry, text: &str, expected: Option<&Ty>) -> Result<(Heap, Value), DeserializeError> {
    let doc = Document::from_xml(text).unwrap();
    let mut heap = Heap::new();
    let value = Deserializer::new(registry, &doc, &mut heap).deserialize(expected)?;
    Ok((heap, value))
}

fn field<'h>(heap: &'h Heap, value: &Value, name: &str) -> &'h Value {
    heap.get_struct(value.as_object().unwrap())
        .unwrap()
        .get(name)
        .unwrap()
}

// -----------------------------------------------------------------------------
// Round trips

#[test]
fn concise_round_trip() {
    let registry = zoo();
    let mut heap = Heap::new();
    let rex = Value::Ref(dog(&registry, &mut heap));

    let doc = Serializer::new(&registry, &heap).serialize(&rex).unwrap();
    assert_eq!(
        xml(&doc),
        r#"<_Root><Tricks _Array="2">sit,roll</Tricks><Name>Rex</Name><Age>3</Age></_Root>"#
    );

    let mut decoded = Heap::new();
    let value = Deserializer::new(&registry, &doc, &mut decoded)
        .deserialize(Some(&Ty::named("zoo::Dog")))
        .unwrap();
    assert!(heap.graph_eq(&rex, &decoded, &value));
}

#[test]
fn verbose_round_trip() {
    let registry = zoo();
    let mut heap = Heap::new();
    let rex = Value::Ref(dog(&registry, &mut heap));

    let ctx = SerializationContext::new();
    ctx.set_verbose();
    let doc = Serializer::new(&registry, &heap)
        .with_context(&ctx)
        .serialize(&rex)
        .unwrap();

    let root = doc.root().unwrap();
    assert_eq!(doc.attribute(root, "_Type"), Some("zoo::Dog"));
    let tricks = doc.child_named(root, "Tricks").unwrap();
    assert_eq!(doc.children(tricks).len(), 2);
    let second = doc.children(tricks)[1];
    assert_eq!(doc.name(second), "_Element");
    assert_eq!(doc.attribute(second, "_Index"), Some("1"));
    assert_eq!(doc.attribute(second, "_Type"), Some("string"));

    // The root is tagged, so no expected type is needed.
    let mut decoded = Heap::new();
    let value = Deserializer::new(&registry, &doc, &mut decoded)
        .with_context(&ctx)
        .deserialize(None)
        .unwrap();
    assert!(heap.graph_eq(&rex, &decoded, &value));
}

#[test]
fn round_trip_through_xml_text() {
    let registry = zoo();
    let mut heap = Heap::new();
    let rex = Value::Ref(dog(&registry, &mut heap));

    let text = Serializer::new(&registry, &heap)
        .serialize_as(&rex, &Ty::Object)
        .unwrap()
        .to_xml_pretty(2)
        .unwrap();

    let (decoded, value) = decode(&registry, &text, None).unwrap();
    assert!(heap.graph_eq(&rex, &decoded, &value));
}

#[test]
fn flag_enum_field() {
    let registry = zoo();
    let mut heap = Heap::new();
    let pen = Value::Ref(heap.insert(
        instance(&registry, "zoo::Pen").with("access", Value::enumeration("zoo::Access", 7)),
    ));

    let doc = Serializer::new(&registry, &heap).serialize(&pen).unwrap();
    assert_eq!(xml(&doc), "<_Root><access>ReadWrite, Execute</access></_Root>");

    let mut decoded = Heap::new();
    let value = Deserializer::new(&registry, &doc, &mut decoded)
        .deserialize(Some(&Ty::named("zoo::Pen")))
        .unwrap();
    assert_eq!(field(&decoded, &value, "access").as_enum_bits(), Ok(7));
}

// -----------------------------------------------------------------------------
// References

#[test]
fn cycle_writes_one_reference() {
    let registry = zoo();
    let mut heap = Heap::new();
    let a = heap.insert(instance(&registry, "zoo::Node").with("value", 1));
    let b = heap.insert(instance(&registry, "zoo::Node").with("value", 2).with("next", a));
    heap.get_struct_mut(a).unwrap().set("next", b);

    let doc = Serializer::new(&registry, &heap)
        .serialize(&Value::Ref(a))
        .unwrap();
    let text = xml(&doc);
    assert_eq!(text.matches("_ReferTo").count(), 1);
    assert_eq!(text.matches("_RefID").count(), 1);

    let mut decoded = Heap::new();
    let value = Deserializer::new(&registry, &doc, &mut decoded)
        .deserialize(Some(&Ty::named("zoo::Node")))
        .unwrap();
    assert!(heap.graph_eq(&Value::Ref(a), &decoded, &value));

    let next = field(&decoded, &value, "next").clone();
    assert_eq!(field(&decoded, &next, "next"), &value);
}

#[test]
fn self_reference() {
    let registry = zoo();
    let mut heap = Heap::new();
    let node = heap.insert(instance(&registry, "zoo::Node"));
    heap.get_struct_mut(node).unwrap().set("next", node);

    let doc = Serializer::new(&registry, &heap)
        .serialize(&Value::Ref(node))
        .unwrap();
    assert_eq!(
        xml(&doc),
        r#"<_Root _RefID="1"><value>0</value><next _ReferTo="1"/></_Root>"#
    );

    let mut decoded = Heap::new();
    let value = Deserializer::new(&registry, &doc, &mut decoded)
        .deserialize(Some(&Ty::named("zoo::Node")))
        .unwrap();
    assert_eq!(field(&decoded, &value, "next"), &value);
}

#[test]
fn duplicate_strings() {
    let registry = zoo();
    let mut heap = Heap::new();
    let echo: Arc<str> = Arc::from("echo");
    let pair = Value::Ref(heap.insert(
        instance(&registry, "zoo::Pair")
            .with("first", echo.clone())
            .with("second", echo),
    ));

    let doc = Serializer::new(&registry, &heap).serialize(&pair).unwrap();
    assert_eq!(
        xml(&doc),
        r#"<_Root><first _RefID="1">echo</first><second _ReferTo="1"/></_Root>"#
    );

    let mut decoded = Heap::new();
    let value = Deserializer::new(&registry, &doc, &mut decoded)
        .deserialize(Some(&Ty::named("zoo::Pair")))
        .unwrap();
    let first = field(&decoded, &value, "first").as_arc_str().unwrap();
    let second = field(&decoded, &value, "second").as_arc_str().unwrap();
    assert!(Arc::ptr_eq(first, second));

    let ctx = SerializationContext::new();
    ctx.set_duplicate_strings_can_be_referred_to(false);
    let doc = Serializer::new(&registry, &heap)
        .with_context(&ctx)
        .serialize(&pair)
        .unwrap();
    assert_eq!(
        xml(&doc),
        "<_Root><first>echo</first><second>echo</second></_Root>"
    );
}

#[test]
fn unknown_reference() {
    let registry = zoo();
    let result = decode(
        &registry,
        r#"<_Root _Type="zoo::Node"><next _ReferTo="9"/></_Root>"#,
        None,
    );
    assert_eq!(result.err(), Some(DeserializeError::UnknownReference("9".into())));
}

// -----------------------------------------------------------------------------
// Types

#[test]
fn object_slots_tag_their_values() {
    let registry = zoo();
    let mut heap = Heap::new();
    let holder = Value::Ref(heap.insert(instance(&registry, "zoo::Holder").with("item", 5)));

    let doc = Serializer::new(&registry, &heap).serialize(&holder).unwrap();
    assert_eq!(xml(&doc), r#"<_Root><item _Type="i32">5</item></_Root>"#);

    let mut decoded = Heap::new();
    let value = Deserializer::new(&registry, &doc, &mut decoded)
        .deserialize(Some(&Ty::named("zoo::Holder")))
        .unwrap();
    assert_eq!(field(&decoded, &value, "item"), &Value::I32(5));

    let ctx = SerializationContext::new();
    ctx.set_verbose();
    let doc = Serializer::new(&registry, &heap)
        .with_context(&ctx)
        .serialize(&holder)
        .unwrap();
    let item = doc.child_named(doc.root().unwrap(), "item").unwrap();
    assert_eq!(doc.attribute(item, "_Type"), Some("i32"));
}

#[test]
fn typed_fields_are_tagged_only_when_verbose() {
    let registry = zoo();
    let mut heap = Heap::new();
    let animal = Value::Ref(heap.insert(instance(&registry, "zoo::Animal").with("m_age", 4)));

    let doc = Serializer::new(&registry, &heap).serialize(&animal).unwrap();
    let age = doc.child_named(doc.root().unwrap(), "Age").unwrap();
    assert_eq!(doc.attribute(age, "_Type"), None);

    let ctx = SerializationContext::new();
    ctx.set_verbose();
    let doc = Serializer::new(&registry, &heap)
        .with_context(&ctx)
        .serialize(&animal)
        .unwrap();
    let age = doc.child_named(doc.root().unwrap(), "Age").unwrap();
    assert_eq!(doc.attribute(age, "_Type"), Some("i32"));
}

#[test]
fn missing_type() {
    let registry = zoo();

    assert_eq!(
        decode(&registry, "<_Root>45</_Root>", None).err(),
        Some(DeserializeError::MissingType("_Root".into()))
    );
    assert_eq!(
        decode(&registry, "<_Root>45</_Root>", Some(&Ty::Object)).err(),
        Some(DeserializeError::MissingType("_Root".into()))
    );

    let (_, value) = decode(&registry, "<_Root>45</_Root>", Some(&Ty::I32)).unwrap();
    assert_eq!(value, Value::I32(45));
}

#[test]
fn unknown_type_decodes_as_null() {
    let registry = zoo();
    let (heap, value) = decode(&registry, r#"<_Root _Type="zoo::Ghost"><a>1</a></_Root>"#, None).unwrap();
    assert_eq!(value, Value::Null);
    assert!(heap.is_empty());
}

#[test]
fn invalid_text() {
    let registry = zoo();
    assert_eq!(
        decode(&registry, r#"<_Root _Type="i32">x</_Root>"#, None).err(),
        Some(DeserializeError::InvalidPrimitive {
            ty: "i32".into(),
            text: "x".into(),
        })
    );
    assert!(matches!(
        decode(&registry, r#"<_Root _Type="zoo::Access">Fly</_Root>"#, None),
        Err(DeserializeError::InvalidEnum { .. })
    ));
}

#[test]
fn unknown_children_are_ignored() {
    let registry = zoo();
    let (heap, value) = decode(
        &registry,
        r#"<_Root _Type="zoo::Animal"><Color>brown</Color><Name>Rex</Name></_Root>"#,
        None,
    )
    .unwrap();
    assert_eq!(field(&heap, &value, "m_name").as_str(), Ok("Rex"));
    assert_eq!(field(&heap, &value, "m_age"), &Value::I32(0));
}

#[test]
fn broken_declarations_fail_when_used() {
    let mut registry = zoo();
    registry.register(StructInfo::new("zoo::Orphan").with_base("zoo::Missing"));

    let mut heap = Heap::new();
    let orphan = Value::Ref(heap.insert(DynamicStruct::new("zoo::Orphan")));
    let err = Serializer::new(&registry, &heap)
        .serialize(&orphan)
        .unwrap_err();
    assert_eq!(
        err,
        SerializeError::Registry(RegistryError::UnknownType("zoo::Missing".into()))
    );

    // Unrelated types keep working.
    let rex = Value::Ref(dog(&registry, &mut heap));
    assert!(Serializer::new(&registry, &heap).serialize(&rex).is_ok());
}

// -----------------------------------------------------------------------------
// Arrays

#[test]
fn condensed_strings() {
    let registry = zoo();
    let mut heap = Heap::new();
    let words = Value::Ref(heap.insert(DynamicArray::new(
        Ty::String,
        vec![
            Value::from("Hello"),
            Value::Null,
            Value::from("to"),
            Value::from(""),
            Value::from("all"),
        ],
    )));

    let doc = Serializer::new(&registry, &heap).serialize(&words).unwrap();
    assert_eq!(xml(&doc), r#"<_Root _Array="5">Hello,,to,\_,all</_Root>"#);

    let mut decoded = Heap::new();
    let value = Deserializer::new(&registry, &doc, &mut decoded)
        .deserialize(Some(&Ty::array(Ty::String)))
        .unwrap();
    assert!(heap.graph_eq(&words, &decoded, &value));

    let words = Value::Ref(heap.insert(DynamicArray::new(
        Ty::String,
        vec![
            Value::from("hello,"),
            Value::from("homer"),
            Value::from(""),
            Value::from("!"),
            Value::Null,
            Value::from("what?"),
        ],
    )));
    let doc = Serializer::new(&registry, &heap).serialize(&words).unwrap();
    let root = doc.root().unwrap();
    assert_eq!(doc.text(root), Some(r"hello\`,homer,\_,!,,what?"));

    let mut decoded = Heap::new();
    let value = Deserializer::new(&registry, &doc, &mut decoded)
        .deserialize(Some(&Ty::array(Ty::String)))
        .unwrap();
    let items = decoded.get_array(value.as_object().unwrap()).unwrap().items();
    assert_eq!(items[2], Value::from(""));
    assert_eq!(items[4], Value::Null);
    assert!(heap.graph_eq(&words, &decoded, &value));
}

#[test]
fn sparse_explicit_array() {
    let registry = zoo();
    let (heap, value) = decode(
        &registry,
        r#"<_Root _Type="i32[]"><_Element _Index="1">5</_Element><_Element _Index="4">9</_Element></_Root>"#,
        None,
    )
    .unwrap();
    let array = heap.get_array(value.as_object().unwrap()).unwrap();
    assert_eq!(array.lengths(), &[5]);
    assert_eq!(
        array.items(),
        &[Value::I32(0), Value::I32(5), Value::I32(0), Value::I32(0), Value::I32(9)]
    );

    // Elements without an index follow the previous one.
    let (heap, value) = decode(
        &registry,
        concat!(
            r#"<_Root _Type="i32[]">"#,
            r#"<_Element _Index="1">11</_Element><_Element>22</_Element><_Element _Index="4">44</_Element>"#,
            "</_Root>"
        ),
        None,
    )
    .unwrap();
    let array = heap.get_array(value.as_object().unwrap()).unwrap();
    assert_eq!(
        array.items(),
        &[Value::I32(0), Value::I32(11), Value::I32(22), Value::I32(0), Value::I32(44)]
    );
}

#[test]
fn multi_dimensional_with_lower_bounds() {
    let registry = zoo();
    let mut heap = Heap::new();
    let mut grid = DynamicArray::filled(Ty::I32, &[2, 3], Value::I32(0)).with_lower_bounds(&[1, -1]);
    assert!(grid.set(&[1, -1], Value::I32(7)));
    assert!(grid.set(&[2, 1], Value::I32(9)));
    let grid = Value::Ref(heap.insert(grid));

    let doc = Serializer::new(&registry, &heap).serialize(&grid).unwrap();
    assert_eq!(
        xml(&doc),
        r#"<_Root _Array="2,3" _LowerBound="1,-1">7,0,0,0,0,9</_Root>"#
    );
    let mut decoded = Heap::new();
    let value = Deserializer::new(&registry, &doc, &mut decoded)
        .deserialize(Some(&Ty::array_n(Ty::I32, 2)))
        .unwrap();
    assert!(heap.graph_eq(&grid, &decoded, &value));

    let ctx = SerializationContext::new();
    ctx.set_all_arrays_have_explicit_elements(true);
    let doc = Serializer::new(&registry, &heap)
        .with_context(&ctx)
        .serialize(&grid)
        .unwrap();
    assert_eq!(doc.children(doc.root().unwrap()).len(), 6);
    let mut decoded = Heap::new();
    let value = Deserializer::new(&registry, &doc, &mut decoded)
        .with_context(&ctx)
        .deserialize(Some(&Ty::array_n(Ty::I32, 2)))
        .unwrap();
    assert!(heap.graph_eq(&grid, &decoded, &value));
}

#[test]
fn rank_needs_lengths() {
    let registry = zoo();
    assert_eq!(
        decode(
            &registry,
            r#"<_Root _Type="i32[,]"><_Element>1</_Element></_Root>"#,
            None
        )
        .err(),
        Some(DeserializeError::RankMismatch {
            expected: 2,
            found: 1
        })
    );
}

#[test]
fn condensed_needs_primitive_elements() {
    let registry = zoo();
    assert_eq!(
        decode(
            &registry,
            r#"<_Root _Type="zoo::Node[]" _Array="2">a,b</_Root>"#,
            None
        )
        .err(),
        Some(DeserializeError::CondensedNonPrimitive("zoo::Node".into()))
    );
}

#[test]
fn null_elements() {
    let registry = zoo();
    let mut heap = Heap::new();
    let one = heap.insert(instance(&registry, "zoo::Node").with("value", 1));
    let two = heap.insert(instance(&registry, "zoo::Node").with("value", 2));
    let nodes = Value::Ref(heap.insert(DynamicArray::new(
        Ty::named("zoo::Node"),
        vec![Value::Ref(one), Value::Null, Value::Ref(two)],
    )));

    let doc = Serializer::new(&registry, &heap).serialize(&nodes).unwrap();
    assert_eq!(
        xml(&doc),
        concat!(
            r#"<_Root _Array="3">"#,
            r#"<_Element><value>1</value><next _Null="1"/></_Element>"#,
            r#"<_Element _Index="2"><value>2</value><next _Null="1"/></_Element>"#,
            "</_Root>"
        )
    );
    let mut decoded = Heap::new();
    let value = Deserializer::new(&registry, &doc, &mut decoded)
        .deserialize(Some(&Ty::array(Ty::named("zoo::Node"))))
        .unwrap();
    assert!(heap.graph_eq(&nodes, &decoded, &value));

    let ctx = SerializationContext::new();
    ctx.set_remove_null_values(false);
    let doc = Serializer::new(&registry, &heap)
        .with_context(&ctx)
        .serialize(&nodes)
        .unwrap();
    let root = doc.root().unwrap();
    assert_eq!(doc.children(root).len(), 3);
    let middle = doc.children(root)[1];
    assert_eq!(doc.attribute(middle, "_Null"), Some("1"));
    assert_eq!(doc.attribute(doc.children(root)[2], "_Index"), None);
}

#[test]
fn indices_past_the_last_position() {
    let registry = zoo();
    let max = i64::MAX;

    let text = format!(r#"<_Root _Type="i32[]"><_Element _Index="{max}">1</_Element></_Root>"#);
    assert!(matches!(
        decode(&registry, &text, None),
        Err(DeserializeError::IndexOutOfRange { .. })
    ));

    let text = format!(
        r#"<_Root _Type="i32[]" _Array="2"><_Element _Index="{max}">1</_Element><_Element>2</_Element></_Root>"#
    );
    assert!(matches!(
        decode(&registry, &text, None),
        Err(DeserializeError::IndexOutOfRange { .. })
    ));
}

#[test]
fn oversized_lengths_are_rejected() {
    let registry = zoo();
    assert_eq!(
        decode(
            &registry,
            r#"<_Root _Type="i32[,]" _Array="4294967296,4294967296">1</_Root>"#,
            None
        )
        .err(),
        Some(DeserializeError::InvalidArrayAttribute {
            name: "_Array".into(),
            value: "4294967296,4294967296".into(),
        })
    );
    assert_eq!(
        decode(&registry, r#"<_Root _Type="i32[]" _Array="100000000">1</_Root>"#, None).err(),
        Some(DeserializeError::InvalidArrayAttribute {
            name: "_Array".into(),
            value: "100000000".into(),
        })
    );
}

// -----------------------------------------------------------------------------
// Naming

#[test]
fn renames_and_member_prefixes() {
    let mut registry = TypeRegistry::new();
    registry.register(
        StructInfo::new("zoo::Tag")
            .with_field(FieldInfo::new("m_id", Ty::I32).rename("ID"))
            .with_field(FieldInfo::new("m_label", Ty::String))
            .with_field(FieldInfo::new("m_cache", Ty::I32).skip()),
    );
    let mut heap = Heap::new();
    let tag = Value::Ref(heap.insert(
        instance(&registry, "zoo::Tag")
            .with("m_id", 1)
            .with("m_label", "x")
            .with("m_cache", 99),
    ));

    let doc = Serializer::new(&registry, &heap).serialize(&tag).unwrap();
    assert_eq!(xml(&doc), "<_Root><ID>1</ID><Label>x</Label></_Root>");

    let mut decoded = Heap::new();
    let value = Deserializer::new(&registry, &doc, &mut decoded)
        .deserialize(Some(&Ty::named("zoo::Tag")))
        .unwrap();
    assert_eq!(field(&decoded, &value, "m_label").as_str(), Ok("x"));
    assert_eq!(field(&decoded, &value, "m_cache"), &Value::I32(0));

    let ctx = SerializationContext::new();
    ctx.set_fix_field_names(false);
    let doc = Serializer::new(&registry, &heap)
        .with_context(&ctx)
        .serialize(&tag)
        .unwrap();
    assert_eq!(xml(&doc), "<_Root><ID>1</ID><m_label>x</m_label></_Root>");

    ctx.set_field_renamer(Arc::new(|name: &str, _: &str| name.to_uppercase()));
    let doc = Serializer::new(&registry, &heap)
        .with_context(&ctx)
        .serialize(&tag)
        .unwrap();
    assert_eq!(xml(&doc), "<_Root><ID>1</ID><M_LABEL>x</M_LABEL></_Root>");
}

#[test]
fn explicit_only_fields() {
    let mut registry = TypeRegistry::new();
    registry.register(
        StructInfo::new("zoo::Sparse")
            .explicit_only()
            .with_field(FieldInfo::new("a", Ty::I32).explicit())
            .with_field(FieldInfo::new("b", Ty::I32)),
    );
    let mut heap = Heap::new();
    let sparse = Value::Ref(heap.insert(instance(&registry, "zoo::Sparse").with("a", 1).with("b", 2)));

    let doc = Serializer::new(&registry, &heap).serialize(&sparse).unwrap();
    assert_eq!(xml(&doc), "<_Root><a>1</a></_Root>");
}

#[test]
fn short_names() {
    let registry = zoo();
    let mut heap = Heap::new();
    let holder = Value::Ref(heap.insert(instance(&registry, "zoo::Holder")));

    let ctx = SerializationContext::new();
    ctx.set_concise();
    let doc = Serializer::new(&registry, &heap)
        .with_context(&ctx)
        .serialize_as(&holder, &Ty::Object)
        .unwrap();
    assert_eq!(xml(&doc), r#"<_R _T="zoo::Holder"><item _N="1"/></_R>"#);

    let mut decoded = Heap::new();
    let value = Deserializer::new(&registry, &doc, &mut decoded)
        .with_context(&ctx)
        .deserialize(None)
        .unwrap();
    assert!(heap.graph_eq(&holder, &decoded, &value));
}

#[test]
fn protobuf_names() {
    let registry = zoo();
    let mut heap = Heap::new();
    let pair = Value::Ref(heap.insert(
        instance(&registry, "zoo::Pair")
            .with("first", "a")
            .with("second", "b"),
    ));

    let ctx = SerializationContext::new();
    ctx.set_field_renamer(Arc::new(ProtobufFieldRenamer));
    let doc = Serializer::new(&registry, &heap)
        .with_context(&ctx)
        .serialize(&pair)
        .unwrap();
    assert_eq!(xml(&doc), "<_Root><First>a</First><Second>b</Second></_Root>");

    let mut decoded = Heap::new();
    let value = Deserializer::new(&registry, &doc, &mut decoded)
        .with_context(&ctx)
        .deserialize(Some(&Ty::named("zoo::Pair")))
        .unwrap();
    assert!(heap.graph_eq(&pair, &decoded, &value));
}

// -----------------------------------------------------------------------------
// Collections

#[test]
fn lists_and_maps() {
    let registry = zoo();
    let mut heap = Heap::new();
    let items = heap.insert(DynamicList::new(Ty::I32).with(1).with(2));
    let counts = heap.insert(DynamicMap::new(Ty::String, Ty::I32).with("a", 1));
    let bag = Value::Ref(heap.insert(
        instance(&registry, "zoo::Bag")
            .with("items", items)
            .with("counts", counts),
    ));

    let doc = Serializer::new(&registry, &heap).serialize(&bag).unwrap();
    assert_eq!(
        xml(&doc),
        concat!(
            "<_Root>",
            "<items><_Element>1</_Element><_Element>2</_Element></items>",
            "<counts><_Element><key>a</key><value>1</value></_Element></counts>",
            "</_Root>"
        )
    );

    let mut decoded = Heap::new();
    let value = Deserializer::new(&registry, &doc, &mut decoded)
        .deserialize(Some(&Ty::named("zoo::Bag")))
        .unwrap();
    assert!(heap.graph_eq(&bag, &decoded, &value));
}

#[test]
fn element_name_override() {
    let registry = zoo();
    let mut heap = Heap::new();
    let dogs = heap.insert(DynamicList::new(Ty::String).with("Rex").with("Fido"));
    let kennel = Value::Ref(heap.insert(instance(&registry, "zoo::Kennel").with("dogs", dogs)));

    let doc = Serializer::new(&registry, &heap).serialize(&kennel).unwrap();
    assert_eq!(
        xml(&doc),
        "<_Root><dogs><Dog>Rex</Dog><Dog>Fido</Dog></dogs></_Root>"
    );

    let mut decoded = Heap::new();
    let value = Deserializer::new(&registry, &doc, &mut decoded)
        .deserialize(Some(&Ty::named("zoo::Kennel")))
        .unwrap();
    assert!(heap.graph_eq(&kennel, &decoded, &value));
}

// -----------------------------------------------------------------------------
// Surrogates

struct Text(&'static str);

impl Surrogate for Text {
    fn serialize(
        &self,
        _value: &Value,
        _declared: &Ty,
        node: NodeId,
        ser: &mut Serializer<'_>,
    ) -> Result<bool, SerializeError> {
        ser.document_mut().set_text(node, self.0);
        Ok(true)
    }
}

struct Mark {
    bit: u32,
    handled: bool,
}

impl Surrogate for Mark {
    fn serialize(
        &self,
        _value: &Value,
        _declared: &Ty,
        node: NodeId,
        ser: &mut Serializer<'_>,
    ) -> Result<bool, SerializeError> {
        let doc = ser.document_mut();
        let bits = doc
            .attribute(node, "bits")
            .and_then(|b| b.parse::<u32>().ok())
            .unwrap_or(0);
        doc.set_attribute(node, "bits", (bits | self.bit).to_string());
        Ok(self.handled)
    }
}

// Writes the name of an animal as an attribute and claims the rest of the struct.
struct AnimalTag;

impl Surrogate for AnimalTag {
    fn serialize(
        &self,
        value: &Value,
        _declared: &Ty,
        node: NodeId,
        ser: &mut Serializer<'_>,
    ) -> Result<bool, SerializeError> {
        let id = value.as_object().map_err(SerializeError::custom)?;
        let name = ser
            .heap()
            .get_struct(id)
            .and_then(|s| s.get("m_name"))
            .and_then(|v| v.as_str().ok())
            .unwrap_or_default();
        ser.document_mut().set_attribute(node, "animal", name);
        Ok(true)
    }

    fn deserialize(
        &self,
        working: &mut WorkingObject,
        node: NodeId,
        de: &mut Deserializer<'_>,
    ) -> Result<bool, DeserializeError> {
        let Some(name) = de.document().attribute(node, "animal") else {
            return Ok(false);
        };
        let id = working
            .get_existing_or_create(de)?
            .as_object()
            .map_err(DeserializeError::custom)?;
        if let Some(animal) = de.heap_mut().get_struct_mut(id) {
            animal.set("m_name", name);
        }
        Ok(true)
    }
}

// Hands the engine a longer array to fill.
struct Oversized;

impl Surrogate for Oversized {
    fn deserialize(
        &self,
        working: &mut WorkingObject,
        _node: NodeId,
        de: &mut Deserializer<'_>,
    ) -> Result<bool, DeserializeError> {
        let id = de
            .heap_mut()
            .insert(DynamicArray::filled(Ty::I32, &[3], Value::I32(-1)));
        working.set(Value::Ref(id), de)?;
        Ok(false)
    }
}

#[test]
fn context_surrogates_come_before_implicit_serializers() {
    let registry = zoo();
    let mut heap = Heap::new();
    let badge = Value::Ref(heap.insert(instance(&registry, "zoo::Badge")));

    let doc = Serializer::new(&registry, &heap).serialize(&badge).unwrap();
    assert_eq!(xml(&doc), r#"<_Root implicit="1"/>"#);

    let ctx = SerializationContext::new();
    ctx.register_surrogate(Ty::named("zoo::Badge"), Arc::new(Text("custom")));
    let doc = Serializer::new(&registry, &heap)
        .with_context(&ctx)
        .serialize(&badge)
        .unwrap();
    assert_eq!(xml(&doc), "<_Root>custom</_Root>");
}

#[test]
fn every_surrogate_in_a_chain_runs() {
    let registry = zoo();
    let mut heap = Heap::new();
    let animal = Value::Ref(heap.insert(instance(&registry, "zoo::Animal")));

    let ctx = SerializationContext::new();
    let ty = Ty::named("zoo::Animal");
    ctx.register_surrogate(ty.clone(), Arc::new(Mark { bit: 1, handled: false }));
    ctx.register_surrogate(ty.clone(), Arc::new(Mark { bit: 2, handled: true }));
    ctx.register_surrogate(ty, Arc::new(Mark { bit: 4, handled: false }));

    let doc = Serializer::new(&registry, &heap)
        .with_context(&ctx)
        .serialize(&animal)
        .unwrap();
    assert_eq!(xml(&doc), r#"<_Root bits="7"/>"#);
}

#[test]
fn base_surrogate_takes_over_the_remaining_levels() {
    let registry = zoo();
    let mut heap = Heap::new();
    let tricks = heap.insert(DynamicArray::new(Ty::String, vec![Value::from("sit")]));
    let rex = Value::Ref(heap.insert(
        instance(&registry, "zoo::Dog")
            .with("m_name", "Rex")
            .with("m_age", 3)
            .with("m_tricks", tricks),
    ));

    let ctx = SerializationContext::new();
    ctx.register_surrogate(Ty::named("zoo::Animal"), Arc::new(AnimalTag));
    let doc = Serializer::new(&registry, &heap)
        .with_context(&ctx)
        .serialize(&rex)
        .unwrap();
    assert_eq!(
        xml(&doc),
        r#"<_Root animal="Rex"><Tricks _Array="1">sit</Tricks></_Root>"#
    );

    let mut decoded = Heap::new();
    let value = Deserializer::new(&registry, &doc, &mut decoded)
        .with_context(&ctx)
        .deserialize(Some(&Ty::named("zoo::Dog")))
        .unwrap();
    assert_eq!(field(&decoded, &value, "m_name").as_str(), Ok("Rex"));
    assert_eq!(field(&decoded, &value, "m_age"), &Value::I32(0));
    let tricks = field(&decoded, &value, "m_tricks").as_object().unwrap();
    assert_eq!(decoded.get_array(tricks).unwrap().items(), &[Value::from("sit")]);
}

#[test]
fn partial_surrogate_result_is_filled() {
    let registry = zoo();
    let ctx = SerializationContext::new();
    ctx.register_surrogate(Ty::array(Ty::I32), Arc::new(Oversized));

    let doc = Document::from_xml(r#"<_Root _Type="i32[]" _Array="2">4,5</_Root>"#).unwrap();
    let mut heap = Heap::new();
    let value = Deserializer::new(&registry, &doc, &mut heap)
        .with_context(&ctx)
        .deserialize(None)
        .unwrap();
    let array = heap.get_array(value.as_object().unwrap()).unwrap();
    assert_eq!(
        array.items(),
        &[Value::I32(4), Value::I32(5), Value::I32(-1)]
    );
}

// Writes the friend by name and leaves the other fields to the engine.
struct FriendByName;

impl Surrogate for FriendByName {
    fn serialize(
        &self,
        value: &Value,
        _declared: &Ty,
        node: NodeId,
        ser: &mut Serializer<'_>,
    ) -> Result<bool, SerializeError> {
        ser.ignore_field("m_person");
        let heap = ser.heap();
        let name = value
            .as_object()
            .ok()
            .and_then(|id| heap.get_struct(id))
            .and_then(|friend| friend.get("m_person"))
            .and_then(|person| person.as_object().ok())
            .and_then(|id| heap.get_struct(id))
            .and_then(|person| person.get("m_name"))
            .and_then(|name| name.as_str().ok())
            .unwrap_or_default();
        let doc = ser.document_mut();
        let child = doc.add_child(node, "Person");
        doc.set_text(child, name);
        Ok(false)
    }

    fn deserialize(
        &self,
        working: &mut WorkingObject,
        node: NodeId,
        de: &mut Deserializer<'_>,
    ) -> Result<bool, DeserializeError> {
        de.ignore_field("m_person");
        let doc = de.document();
        let Some(name) = doc.child_named(node, "Person").and_then(|n| doc.text(n)) else {
            return Ok(false);
        };
        let person = de.registry().instantiate("zoo::Animal")?.with("m_name", name);
        let person = de.heap_mut().insert(person);
        let id = working
            .get_existing_or_create(de)?
            .as_object()
            .map_err(DeserializeError::custom)?;
        if let Some(friend) = de.heap_mut().get_struct_mut(id) {
            friend.set("m_person", person);
        }
        Ok(false)
    }
}

#[test]
fn partial_surrogate_fields_are_not_walked_again() {
    let mut registry = zoo();
    registry.register(
        StructInfo::new("zoo::Friend")
            .with_field(FieldInfo::new("m_person", Ty::named("zoo::Animal")))
            .with_field(FieldInfo::new("m_since", Ty::I32))
            .with_field(FieldInfo::new("m_pet", Ty::named("zoo::Animal"))),
    );
    let mut heap = Heap::new();
    let rex = heap.insert(instance(&registry, "zoo::Animal").with("m_name", "Rex"));
    let tom = heap.insert(instance(&registry, "zoo::Animal").with("m_name", "Tom"));
    let friend = Value::Ref(heap.insert(
        instance(&registry, "zoo::Friend")
            .with("m_person", rex)
            .with("m_since", 4)
            .with("m_pet", tom),
    ));

    let ctx = SerializationContext::new();
    ctx.register_surrogate(Ty::named("zoo::Friend"), Arc::new(FriendByName));
    let doc = Serializer::new(&registry, &heap)
        .with_context(&ctx)
        .serialize(&friend)
        .unwrap();
    // The pet is an animal too, its own fields are still written.
    assert_eq!(
        xml(&doc),
        concat!(
            "<_Root><Person>Rex</Person><Since>4</Since>",
            "<Pet><Name>Tom</Name><Age>0</Age></Pet></_Root>"
        )
    );

    let mut decoded = Heap::new();
    let value = Deserializer::new(&registry, &doc, &mut decoded)
        .with_context(&ctx)
        .deserialize(Some(&Ty::named("zoo::Friend")))
        .unwrap();
    assert!(heap.graph_eq(&friend, &decoded, &value));
}
