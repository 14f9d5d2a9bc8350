//! Behavioral guarantees of conversion, construction and reflection.

use std::cell::Cell;

use wirebind::{
    ArgFromWire, ArgList, ArgPolicy, BindingsBuilder, ClassDescriptor, ConversionError, Creator, FromWire,
    MethodDescriptor, NativeClass, ObjectHandle, ObjectHeap, ObjectRef, Policy, PolicyList,
    PrimitiveDescriptor, ReflectVisitor, TypeDescriptor, TypeHash, TypedArgStorage, WireType,
    WireValue,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

thread_local! {
    static PROBES: Cell<usize> = const { Cell::new(0) };
}

/// An integer argument that counts how often it is converted.
#[derive(Debug, PartialEq)]
struct Probe(i64);

impl WireType for Probe {
    const TYPE_NAME: &'static str = "int64_t";
}

impl FromWire for Probe {
    fn from_wire(
        value: &WireValue,
        policy: ArgPolicy,
        heap: &mut ObjectHeap,
    ) -> Result<Self, ConversionError> {
        PROBES.with(|p| p.set(p.get() + 1));
        i64::from_wire(value, policy, heap).map(Probe)
    }
}

#[test]
fn conversion_is_left_to_right_and_short_circuits() {
    init_logging();
    let mut heap = ObjectHeap::new();
    let creator = Creator::infallible(|(a, b, c): (Probe, Probe, Probe)| a.0 + b.0 + c.0);

    PROBES.with(|p| p.set(0));
    let err = creator
        .create(&[WireValue::Int(1), WireValue::from("two"), WireValue::Int(3)], &mut heap)
        .unwrap_err();
    assert_eq!(err.as_conversion().and_then(|c| c.argument_index()), Some(1));
    assert_eq!(PROBES.with(Cell::get), 2);

    PROBES.with(|p| p.set(0));
    let sum = creator
        .create(&[WireValue::Int(1), WireValue::Int(2), WireValue::Int(3)], &mut heap)
        .unwrap();
    assert_eq!(*sum, 6);
    assert_eq!(PROBES.with(Cell::get), 3);
}

#[derive(Debug, Clone, PartialEq)]
struct Sample {
    count: u16,
    ratio: f32,
    tag: char,
    name: Option<String>,
}

impl NativeClass for Sample {
    const NAME: &'static str = "Sample";
}

#[test]
fn heap_and_in_place_construction_agree() {
    init_logging();
    let creator = Creator::infallible(|(count, ratio, tag, name): (u16, f32, char, Option<String>)| {
        Sample {
            count,
            ratio,
            tag,
            name,
        }
    })
    .with_policies(PolicyList::new().with(3, Policy::Nullable));

    let argument_lists = [
        [WireValue::Int(1), WireValue::Float(0.5), WireValue::from("a"), WireValue::Null],
        [WireValue::Int(65535), WireValue::Int(2), WireValue::from("z"), WireValue::from("n")],
        [WireValue::Float(3.0), WireValue::Float(-1.25), WireValue::from("q"), WireValue::Void],
    ];
    for args in &argument_lists {
        let mut heap = ObjectHeap::new();
        let boxed = creator.create(args, &mut heap).unwrap();
        let mut slot = TypedArgStorage::<Sample>::new();
        creator.create_value(&mut slot, args, &mut heap).unwrap();
        assert_eq!(slot.get(), Some(&*boxed));
    }
}

#[test]
fn incompatible_kinds_fail_without_touching_the_heap() {
    init_logging();
    let mut heap = ObjectHeap::new();
    let live = heap.allocate(Sample {
        count: 1,
        ratio: 1.0,
        tag: 'x',
        name: None,
    });
    let transfer = ArgPolicy::BY_VALUE.apply(Policy::Transfer);
    let strict = ArgPolicy::BY_VALUE.apply(Policy::Strict);

    let cases: [(WireValue, fn(&WireValue, ArgPolicy, &mut ObjectHeap) -> bool); 6] = [
        (WireValue::from("7"), |v, p, h| ArgFromWire::<i32>::new(p).get(v, h).is_err()),
        (WireValue::Float(1.5), |v, p, h| ArgFromWire::<u8>::new(p).get(v, h).is_err()),
        (WireValue::Int(1), |v, p, h| ArgFromWire::<bool>::new(p).get(v, h).is_err()),
        (WireValue::Null, |v, p, h| ArgFromWire::<Option<String>>::new(p).get(v, h).is_err()),
        (WireValue::from("ab"), |v, p, h| ArgFromWire::<char>::new(p).get(v, h).is_err()),
        (WireValue::Int(3), |v, p, h| ArgFromWire::<ObjectRef<Sample>>::new(p).get(v, h).is_err()),
    ];
    for policy in [ArgPolicy::BY_VALUE, transfer, strict] {
        for (value, fails) in &cases {
            assert!(fails(value, policy, &mut heap), "{value:?} converted under {policy}");
            assert_eq!(heap.len(), 1);
            assert_eq!(heap.ref_count(live), Some(1));
        }
    }

    // a transfer whose list fails later takes no reference either
    let policies = PolicyList::new().with(0, Policy::Transfer).resolve(2);
    let values = [WireValue::Object(live), WireValue::Int(0)];
    assert!(<(ObjectHandle, String)>::from_wire_list(&values, &policies, &mut heap).is_err());
    assert_eq!(heap.ref_count(live), Some(1));
}

#[derive(Default)]
struct Census {
    order: Vec<(char, TypeHash)>,
}

impl ReflectVisitor for Census {
    fn visit_primitive(&mut self, primitive: &PrimitiveDescriptor) {
        self.order.push(('p', primitive.id));
    }

    fn visit_type(&mut self, ty: &TypeDescriptor) {
        self.order.push(('t', ty.id));
    }

    fn visit_class(&mut self, class: &ClassDescriptor) {
        self.order.push(('c', class.id));
    }

    fn visit_method(&mut self, method: &MethodDescriptor) {
        self.order.push(('m', method.id));
    }
}

#[test]
fn reflect_is_exhaustive_and_stable() {
    init_logging();
    let mut builder = BindingsBuilder::new();
    builder
        .register_class::<Sample>()
        .constructor(Creator::infallible(|(count,): (u16,)| Sample {
            count,
            ratio: 0.0,
            tag: ' ',
            name: None,
        }))
        .getter("count", |s: &Sample| s.count)
        .destructor()
        .build()
        .unwrap();
    builder.function("twice", |(n,): (i64,)| n * 2).unwrap();
    let bindings = builder.build().unwrap();
    let registry = bindings.registry();

    let mut first = Census::default();
    bindings.reflect(&mut first);
    let mut second = Census::default();
    bindings.reflect(&mut second);
    assert_eq!(first.order, second.order);

    let expected = registry.primitives().len()
        + registry.types().len()
        + registry.classes().len()
        + registry.methods().len();
    assert_eq!(first.order.len(), expected);

    // categories in order, each entity once
    let kinds: String = first.order.iter().map(|(k, _)| *k).collect();
    let mut sorted: Vec<char> = kinds.chars().collect();
    sorted.sort_by_key(|k| "ptcm".find(*k));
    assert_eq!(kinds, sorted.into_iter().collect::<String>());
    let mut ids: Vec<_> = first.order.iter().map(|(k, id)| (*k, id.0)).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), expected);

    let mut methods = Vec::new();
    bindings.reflect_with(|_| {}, |_| {}, |_| {}, |m| methods.push(m.name.clone()));
    assert_eq!(methods, ["constructor", "count", "free", "twice"]);
}

#[test]
fn unknown_handles_are_reported() {
    init_logging();
    let bindings = BindingsBuilder::new().build().unwrap();
    let bogus = TypeHash::from_name("NeverRegistered");

    let err = bindings.query_type(bogus).unwrap_err();
    assert_eq!(err.handle, bogus);

    let mut called = false;
    assert!(bindings.query_type_with(bogus, |_| called = true).is_err());
    assert!(!called);

    let mut heap = ObjectHeap::new();
    assert!(bindings.construct(bogus, &[], &mut heap).unwrap_err().is_unknown_type());
}

#[test]
fn builtins_resolve_to_their_wire_names() {
    init_logging();
    let bindings = BindingsBuilder::new().build().unwrap();
    for (ty, name, size) in [
        (u32::type_hash(), "uint32_t", 4),
        (f64::type_hash(), "float64_t", 8),
        (i8::type_hash(), "int8_t", 1),
        (String::type_hash(), "std::string", std::mem::size_of::<String>()),
    ] {
        let detail = bindings.query_type(ty).unwrap();
        assert_eq!(detail.name(), name);
        assert_eq!(detail.size(), size);
    }
    assert!(bindings.query_type(u32::type_hash()).unwrap().is_primitive());
}
