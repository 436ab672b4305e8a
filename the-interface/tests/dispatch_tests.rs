use std::sync::Arc;

use the_interface::{
  DispatchConfig,
  DispatchError,
  Impls,
  Implementation,
  InterfaceDefinition,
  Object,
  OverwritePolicy,
  SlotDecl,
  Source,
  TypeDecl,
  TypeHierarchy,
  TypeKey,
  interface,
};

fn init() {
  let _ = env_logger::builder().is_test(true).try_init();
}

struct Base {
  id: u32,
}

struct Middle {
  base: Base,
}

struct Leaf {
  middle: Middle,
}

struct Unrelated;

fn leaf(id: u32) -> Leaf {
  Leaf {
    middle: Middle {
      base: Base { id },
    },
  }
}

fn chain() -> Arc<TypeHierarchy> {
  let hierarchy = TypeHierarchy::new();
  hierarchy
    .declare(TypeDecl::<Middle>::of().base::<Base>(|middle| &middle.base))
    .unwrap();
  hierarchy
    .declare(TypeDecl::<Leaf>::of().base::<Middle>(|leaf| &leaf.middle))
    .unwrap();
  Arc::new(hierarchy)
}

interface! {
  Show {
    method render: () => String = |_, ()| "<unknown>".to_string(),
  }
}

#[derive(Debug, PartialEq)]
struct Widget;

interface! {
  Factory {
    class make: () => Box<dyn Object>,
  }
}

interface! {
  Describe {
    method describe: () => String,
    class kind: () => &'static str,
    static sum: (i32, i32) => i32,
  }
}

#[test]
fn test_show_uses_registration_then_default() {
  init();
  let show = ShowInterface::new(Arc::new(TypeHierarchy::new())).unwrap();
  show
    .definition()
    .implement_for::<i64>(Impls::new().with(
      "render",
      Implementation::method(|value: &i64, ()| format!("int:{value}")),
    ))
    .unwrap();

  assert_eq!(show.render(&42_i64, ()).unwrap(), "int:42");
  assert_eq!(show.render(&Unrelated, ()).unwrap(), "<unknown>");
}

#[test]
fn test_factory_accepts_type_or_instance() {
  init();
  let factory = FactoryInterface::new(Arc::new(TypeHierarchy::new())).unwrap();
  factory
    .make_slot()
    .add_for::<Widget>(Implementation::class(|_, ()| {
      Box::new(Widget) as Box<dyn Object>
    }))
    .unwrap();

  let from_type = factory.make(TypeKey::of::<Widget>(), ()).unwrap();
  assert_eq!((*from_type).as_any().downcast_ref::<Widget>(), Some(&Widget));

  let from_instance = factory.make(&Widget, ()).unwrap();
  assert_eq!(
    (*from_instance).as_any().downcast_ref::<Widget>(),
    Some(&Widget)
  );

  match factory.make(TypeKey::of::<Unrelated>(), ()) {
    Err(DispatchError::UnimplementedOperation {
      operation,
      type_name,
    }) => {
      assert_eq!(operation, "Factory::make");
      assert_eq!(type_name, TypeKey::of::<Unrelated>().name());
    },
    other => panic!("expected an unimplemented operation, got {:?}", other.err()),
  }
}

#[test]
fn test_nearer_ancestor_wins() {
  let describe = DescribeInterface::new(chain()).unwrap();
  let slot = describe.describe_slot();
  slot
    .add_for::<Base>(Implementation::method(|base: &Base, ()| {
      format!("base {}", base.id)
    }))
    .unwrap();
  slot
    .add_for::<Middle>(Implementation::method(|middle: &Middle, ()| {
      format!("middle {}", middle.base.id)
    }))
    .unwrap();

  assert_eq!(describe.describe(&leaf(7), ()).unwrap(), "middle 7");
  assert_eq!(describe.describe(&Base { id: 1 }, ()).unwrap(), "base 1");
  assert_eq!(
    slot.resolve(TypeKey::of::<Leaf>()).unwrap().source,
    Source::Registered(TypeKey::of::<Middle>())
  );
}

#[test]
fn test_ancestry_without_projection_dispatches_dynamically() {
  struct Tagged;

  let hierarchy = TypeHierarchy::new();
  hierarchy
    .declare(TypeDecl::<Tagged>::of().nominal_base::<Base>())
    .unwrap();
  let describe = DescribeInterface::new(Arc::new(hierarchy)).unwrap();
  let slot = describe.describe_slot();

  // Typed bodies cannot be registered for a type they cannot borrow from.
  assert!(matches!(
    slot.add_for::<Tagged>(Implementation::method(|base: &Base, ()| base.id.to_string())),
    Err(DispatchError::InvalidRegistrant { .. })
  ));

  // A typed body on the base is found, but cannot borrow the receiver.
  slot
    .add_for::<Base>(Implementation::method(|base: &Base, ()| base.id.to_string()))
    .unwrap();
  assert!(matches!(
    describe.describe(&Tagged, ()),
    Err(DispatchError::InvalidReceiver { .. })
  ));

  slot
    .add_for::<Tagged>(Implementation::method_dyn(|receiver, ()| {
      receiver.type_key().name().to_string()
    }))
    .unwrap();
  assert_eq!(
    describe.describe(&Tagged, ()).unwrap(),
    TypeKey::of::<Tagged>().name()
  );
}

#[test]
fn test_c3_order_decides_between_bases() {
  struct Left;
  struct Right;
  struct Both;

  let hierarchy = TypeHierarchy::new();
  hierarchy
    .declare_nominal(TypeKey::of::<Both>(), &[
      TypeKey::of::<Left>(),
      TypeKey::of::<Right>(),
    ])
    .unwrap();
  let show = ShowInterface::new(Arc::new(hierarchy)).unwrap();
  let slot = show.render_slot();
  slot
    .add_for::<Right>(Implementation::method_dyn(|_, ()| "right".to_string()))
    .unwrap();
  assert_eq!(show.render(&Both, ()).unwrap(), "right");

  slot
    .add_for::<Left>(Implementation::method_dyn(|_, ()| "left".to_string()))
    .unwrap();
  assert_eq!(show.render(&Both, ()).unwrap(), "left");
}

#[test]
fn test_override_beats_registration() {
  init();
  let show = ShowInterface::new(chain()).unwrap();
  let definition = show.definition();

  definition
    .subclass_for::<Middle>(Impls::new().with(
      "render",
      Implementation::method(|middle: &Middle, ()| format!("override {}", middle.base.id)),
    ))
    .unwrap();
  // Registered afterwards, for the same type and for a descendant.
  definition
    .implement_for::<Middle>(Impls::new().with(
      "render",
      Implementation::method(|_: &Middle, ()| "registered".to_string()),
    ))
    .unwrap();
  definition
    .implement_for::<Leaf>(Impls::new().with(
      "render",
      Implementation::method(|_: &Leaf, ()| "registered leaf".to_string()),
    ))
    .unwrap();

  let middle = Middle {
    base: Base { id: 3 },
  };
  assert_eq!(show.render(&middle, ()).unwrap(), "override 3");
  assert_eq!(show.render(&leaf(4), ()).unwrap(), "override 4");
  assert_eq!(
    show.render_slot().resolve(TypeKey::of::<Leaf>()).unwrap().source,
    Source::Override(TypeKey::of::<Middle>())
  );

  // Base sits above the native member, so registrations still apply.
  assert_eq!(show.render(&Base { id: 5 }, ()).unwrap(), "<unknown>");
}

#[test]
fn test_native_member_without_override_falls_back_to_registrations() {
  let show = ShowInterface::new(chain()).unwrap();
  let definition = show.definition();

  definition.subclass_for::<Middle>(Impls::new()).unwrap();
  definition
    .implement_for::<Base>(Impls::new().with(
      "render",
      Implementation::method(|base: &Base, ()| format!("base {}", base.id)),
    ))
    .unwrap();

  assert!(definition.is_native(TypeKey::of::<Leaf>()));
  assert_eq!(show.render(&leaf(2), ()).unwrap(), "base 2");
}

#[test]
fn test_second_registration_replaces_first() {
  let show = ShowInterface::new(Arc::new(TypeHierarchy::new())).unwrap();
  let slot = show.render_slot();

  slot
    .add_for::<u8>(Implementation::method(|_: &u8, ()| "first".to_string()))
    .unwrap();
  slot
    .add_for::<u8>(Implementation::method(|_: &u8, ()| "second".to_string()))
    .unwrap();

  assert_eq!(show.render(&1_u8, ()).unwrap(), "second");
  assert_eq!(slot.table().len(), 1);
}

#[test]
fn test_reject_policy_from_config() {
  let config = DispatchConfig::from_toml("overwrite = \"reject\"").unwrap();
  let show = ShowInterface::with_config(Arc::new(TypeHierarchy::new()), config).unwrap();
  let impls = || {
    Impls::new().with(
      "render",
      Implementation::method(|_: &u8, ()| "byte".to_string()),
    )
  };

  show.definition().implement_for::<u8>(impls()).unwrap();
  assert!(matches!(
    show.definition().implement_for::<u8>(impls()),
    Err(DispatchError::DuplicateRegistration { .. })
  ));
  assert_eq!(show.definition().config().overwrite, OverwritePolicy::Reject);
}

#[test]
fn test_class_call_is_bound_to_the_target_type() {
  let describe = DescribeInterface::new(chain()).unwrap();
  describe
    .kind_slot()
    .add_for::<Base>(Implementation::class(|key, ()| key.name()))
    .unwrap();

  assert_eq!(
    describe.kind(TypeKey::of::<Leaf>(), ()).unwrap(),
    TypeKey::of::<Leaf>().name()
  );
  assert_eq!(
    describe.kind(&Base { id: 0 }, ()).unwrap(),
    TypeKey::of::<Base>().name()
  );
  assert!(describe.kind(TypeKey::of::<Unrelated>(), ()).is_err());
}

#[test]
fn test_static_call_only_receives_arguments() {
  let describe = DescribeInterface::new(chain()).unwrap();
  describe
    .sum_slot()
    .add_for::<Middle>(Implementation::static_fn(|(a, b)| a + b))
    .unwrap();

  assert_eq!(describe.sum(&leaf(9), (1, 2)).unwrap(), 3);
  assert_eq!(describe.sum(TypeKey::of::<Middle>(), (4, 5)).unwrap(), 9);
  assert!(matches!(
    describe.sum(TypeKey::of::<Base>(), (1, 1)),
    Err(DispatchError::UnimplementedOperation { .. })
  ));
}

#[test]
fn test_bulk_registration_is_all_or_nothing() {
  let describe = DescribeInterface::new(chain()).unwrap();
  let definition = describe.definition();

  let impls = Impls::new()
    .with(
      "describe",
      Implementation::method(|base: &Base, ()| base.id.to_string()),
    )
    .with("explode", Implementation::<(), ()>::static_fn(|()| ()));

  match definition.implement_for::<Base>(impls) {
    Err(DispatchError::UnknownOperation {
      operation,
      interface,
    }) => {
      assert_eq!(operation, "explode");
      assert_eq!(interface, "Describe");
    },
    other => panic!("expected an unknown operation, got {other:?}"),
  }

  assert!(describe.describe_slot().table().is_empty());
  assert!(!definition.is_implemented_by(TypeKey::of::<Base>()));
  assert!(matches!(
    describe.describe(&Base { id: 1 }, ()),
    Err(DispatchError::UnimplementedOperation { .. })
  ));
}

#[test]
fn test_registration_grants_virtual_membership() {
  let describe = DescribeInterface::new(chain()).unwrap();
  let definition = describe.definition();
  assert!(!definition.is_instance(&leaf(0)));

  definition
    .implement_for::<Middle>(
      Impls::new()
        .with(
          "describe",
          Implementation::method(|middle: &Middle, ()| middle.base.id.to_string()),
        )
        .with("kind", Implementation::class(|_, ()| "middle")),
    )
    .unwrap();

  assert!(definition.is_instance(&leaf(0)));
  assert!(definition.is_implemented_by(TypeKey::of::<Middle>()));
  assert!(!definition.is_implemented_by(TypeKey::of::<Base>()));
  assert!(!definition.is_native(TypeKey::of::<Middle>()));
  assert_eq!(definition.implementors(), vec![TypeKey::of::<Middle>()]);
  assert_eq!(
    definition.registered("kind").unwrap(),
    vec![TypeKey::of::<Middle>()]
  );
}

#[test]
fn test_root_registration_is_a_blanket_implementation() {
  let show = ShowInterface::new(chain()).unwrap();
  show
    .render_slot()
    .add(
      TypeKey::root(),
      Implementation::method_dyn(|receiver, ()| format!("any {}", receiver.type_key())),
    )
    .unwrap();

  assert_eq!(
    show.render(&Unrelated, ()).unwrap(),
    format!("any {}", TypeKey::of::<Unrelated>())
  );
  assert!(!show.definition().is_implemented_by(TypeKey::of::<Leaf>()));
}

#[test]
fn test_dynamic_calls_by_operation_name() {
  let definition = InterfaceDefinition::builder("Size", chain())
    .slot(SlotDecl::<(), usize>::method("size"))
    .slot(
      SlotDecl::<usize, usize>::static_fn("scale")
        .default(Implementation::static_fn(|n| n * 2)),
    )
    .build()
    .unwrap();

  definition
    .implement_for::<Base>(Impls::new().with(
      "size",
      Implementation::method(|base: &Base, ()| base.id as usize),
    ))
    .unwrap();

  assert_eq!(definition.call::<(), usize>("size", &leaf(11), ()).unwrap(), 11);
  let scaled: usize = definition.call_static("scale", &Unrelated, 21_usize).unwrap();
  assert_eq!(scaled, 42);

  assert!(matches!(
    definition.call::<(), usize>("missing", &Unrelated, ()),
    Err(DispatchError::UnknownOperation { .. })
  ));
  assert!(matches!(
    definition.call::<(), String>("size", &leaf(1), ()),
    Err(DispatchError::SignatureMismatch { .. })
  ));
  assert!(matches!(
    definition.call::<usize, usize>("scale", &Unrelated, 1),
    Err(DispatchError::ConventionMismatch { .. })
  ));
}

#[test]
fn test_concurrent_registration_and_calls() {
  let show = ShowInterface::new(chain()).unwrap();

  std::thread::scope(|scope| {
    for writer in 0..4_u32 {
      let show = &show;
      scope.spawn(move || {
        for round in 0..50_u32 {
          show
            .render_slot()
            .add_for::<Middle>(Implementation::method(move |_: &Middle, ()| {
              format!("{writer}:{round}")
            }))
            .unwrap();
        }
      });
    }
    for _ in 0..4 {
      let show = &show;
      scope.spawn(move || {
        for id in 0..50 {
          let rendered = show.render(&leaf(id), ()).unwrap();
          assert!(rendered == "<unknown>" || rendered.contains(':'));
        }
      });
    }
  });

  let rendered = show.render(&leaf(0), ()).unwrap();
  assert!(rendered.ends_with(":49"), "unexpected final value {rendered}");
  assert_eq!(show.render_slot().table().len(), 1);
}

#[test]
fn test_override_beats_registration_for_type_and_static_slots() {
  let describe = DescribeInterface::new(chain()).unwrap();
  let definition = describe.definition();

  definition
    .implement_for::<Leaf>(
      Impls::new()
        .with("kind", Implementation::class(|_, ()| "registered"))
        .with("sum", Implementation::static_fn(|(a, b): (i32, i32)| a - b)),
    )
    .unwrap();
  definition
    .subclass_for::<Middle>(
      Impls::new()
        .with("kind", Implementation::class(|key: TypeKey, ()| key.name()))
        .with("sum", Implementation::static_fn(|(a, b): (i32, i32)| a + b)),
    )
    .unwrap();

  // The override on Middle wins over the closer registration on Leaf, and the
  // class body still receives the target's own type.
  assert_eq!(
    describe.kind(TypeKey::of::<Leaf>(), ()).unwrap(),
    TypeKey::of::<Leaf>().name()
  );
  assert_eq!(
    describe.kind(&leaf(1), ()).unwrap(),
    TypeKey::of::<Leaf>().name()
  );
  assert_eq!(describe.sum(&leaf(1), (5, 3)).unwrap(), 8);
  assert_eq!(describe.sum(TypeKey::of::<Middle>(), (5, 3)).unwrap(), 8);
  assert_eq!(
    describe.kind_slot().resolve(TypeKey::of::<Leaf>()).unwrap().source,
    Source::Override(TypeKey::of::<Middle>())
  );
  assert_eq!(
    describe.sum_slot().resolve(TypeKey::of::<Leaf>()).unwrap().source,
    Source::Override(TypeKey::of::<Middle>())
  );

  // Base is above the native member and has nothing registered.
  assert!(matches!(
    describe.sum(TypeKey::of::<Base>(), (1, 1)),
    Err(DispatchError::UnimplementedOperation { .. })
  ));
}

#[test]
fn test_concurrent_bulk_registrations_do_not_interleave() {
  let config = DispatchConfig::default().with_overwrite(OverwritePolicy::Reject);

  for _ in 0..20 {
    let describe = DescribeInterface::with_config(chain(), config).unwrap();
    let definition = describe.definition();

    let outcomes: Vec<bool> = std::thread::scope(|scope| {
      let handles: Vec<_> = (0..4_i32)
        .map(|writer| {
          scope.spawn(move || {
            definition
              .implement_for::<Base>(
                Impls::new()
                  .with(
                    "describe",
                    Implementation::method(move |_: &Base, ()| writer.to_string()),
                  )
                  .with("sum", Implementation::static_fn(move |(_, _): (i32, i32)| writer)),
              )
              .is_ok()
          })
        })
        .collect();
      handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect()
    });

    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    let winner = describe.sum(TypeKey::of::<Base>(), (0, 0)).unwrap();
    assert_eq!(
      describe.describe(&Base { id: 0 }, ()).unwrap(),
      winner.to_string()
    );
  }
}
