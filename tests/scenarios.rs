//! End-to-end binding scenarios: heap and in-place construction through a
//! bound class, reflection of plain types, and type queries.

use wirebind::{
    Bindings, BindingsBuilder, ClassDescriptor, ConversionError, Creator, NativeClass,
    ObjectHeap, Policy, PolicyList, ReflectVisitor, RegistryBuilder, TypeDescriptor, TypeDetail,
    TypeHash, TypeKind, TypedArgStorage, UnknownTypeError, WireKind, WireValue,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, Clone, PartialEq)]
struct Widget {
    id: i32,
    label: String,
}

impl NativeClass for Widget {
    const NAME: &'static str = "Widget";
}

fn widget_bindings() -> (Bindings, TypeHash) {
    init_logging();
    let mut builder = BindingsBuilder::new();
    let widget = builder
        .register_class::<Widget>()
        .constructor(
            Creator::infallible(|(id, label): (i32, String)| Widget { id, label })
                .with_policies(PolicyList::new().with(0, Policy::ByValue).with(1, Policy::ByConstRef)),
        )
        .getter("label", |w: &Widget| w.label.clone())
        .destructor()
        .build()
        .unwrap();
    (builder.build().unwrap(), widget)
}

#[test]
fn heap_construction_converts_or_names_the_failing_argument() {
    let (bindings, widget) = widget_bindings();
    let mut heap = ObjectHeap::new();

    let object = bindings
        .construct(widget, &[WireValue::Int(42), WireValue::from("x")], &mut heap)
        .unwrap();
    let handle = object.as_object().unwrap();
    assert_eq!(
        heap.get::<Widget>(handle),
        Some(&Widget {
            id: 42,
            label: "x".into()
        })
    );

    let err = bindings
        .construct(widget, &[WireValue::from("bad"), WireValue::from("x")], &mut heap)
        .unwrap_err();
    let conversion = err.as_conversion().expect("conversion error");
    assert_eq!(conversion.argument_index(), Some(0));
    assert_eq!(conversion.expected_type(), Some("int32_t"));
    assert_eq!(
        conversion.root(),
        &ConversionError::TypeMismatch {
            expected: "int32_t",
            actual: WireKind::String
        }
    );
    // only the first widget was built
    assert_eq!(heap.len(), 1);
}

#[test]
fn in_place_construction_matches_heap_construction() {
    let (bindings, widget) = widget_bindings();
    let mut heap = ObjectHeap::new();
    let args = [WireValue::Int(7), WireValue::from("y")];

    let mut slot = TypedArgStorage::<Widget>::new();
    bindings.construct_value(widget, &mut slot, &args, &mut heap).unwrap();
    assert!(heap.is_empty());

    let object = bindings.construct(widget, &args, &mut heap).unwrap();
    let handle = object.as_object().unwrap();
    assert_eq!(slot.get(), heap.get::<Widget>(handle));
    assert_eq!(
        slot.take(),
        Some(Widget {
            id: 7,
            label: "y".into()
        })
    );
}

#[derive(Default)]
struct Recorder {
    types: Vec<String>,
    classes: Vec<String>,
}

impl ReflectVisitor for Recorder {
    fn visit_type(&mut self, ty: &TypeDescriptor) {
        self.types.push(ty.name.clone());
    }

    fn visit_class(&mut self, class: &ClassDescriptor) {
        self.classes.push(class.name.clone());
    }
}

#[test]
fn reflect_visits_plain_types_in_registration_order() {
    init_logging();
    let mut builder = RegistryBuilder::new();
    builder.register_type("Handle", TypeKind::value::<u64>()).unwrap();
    builder.register_type("Blob", TypeKind::value::<[u8; 16]>()).unwrap();
    let registry = builder.build().unwrap();

    let mut recorder = Recorder::default();
    registry.reflect(&mut recorder);
    assert_eq!(recorder.types, ["Handle", "Blob"]);
    assert!(recorder.classes.is_empty());
}

#[test]
fn query_type_resolves_registered_handles_only() {
    init_logging();
    let mut builder = RegistryBuilder::new();
    let handle = builder.register_type("Handle", TypeKind::value::<u64>()).unwrap();
    let registry = builder.build().unwrap();

    let detail = registry.query_type(handle).unwrap();
    assert_eq!(detail.id(), handle);
    assert_eq!(detail.name(), "Handle");
    assert_eq!(detail.size(), 8);
    assert!(matches!(detail, TypeDetail::Type { class: None, .. }));

    let unregistered = TypeHash(handle.0.wrapping_add(1));
    assert_eq!(
        registry.query_type(unregistered),
        Err(UnknownTypeError {
            handle: unregistered
        })
    );
}

#[test]
fn bound_class_exposes_three_type_views() {
    let (bindings, widget) = widget_bindings();
    let class = bindings.registry().class(widget).unwrap();

    let names: Vec<_> = class
        .type_ids()
        .iter()
        .map(|id| bindings.query_type(*id).unwrap().name().to_string())
        .collect();
    assert_eq!(names, ["Widget", "Widget *", "const Widget *"]);

    let pointer = bindings.query_type(class.pointer_type).unwrap();
    assert_eq!(pointer.class().map(|c| c.id), Some(widget));
}

#[test]
fn destroyed_objects_are_unreachable() {
    let (bindings, widget) = widget_bindings();
    let mut heap = ObjectHeap::new();
    let object = bindings
        .construct(widget, &[WireValue::Int(1), WireValue::from("z")], &mut heap)
        .unwrap();
    let handle = object.as_object().unwrap();
    assert_eq!(
        bindings.get_property(handle, "label", &mut heap).unwrap(),
        WireValue::from("z")
    );

    bindings.destroy(handle, &mut heap).unwrap();
    assert!(heap.is_empty());
    assert!(bindings.get_property(handle, "label", &mut heap).is_err());
}
