use std::sync::Arc;

use the_interface::{
  DispatchError,
  Implementation,
  Object,
  TypeHierarchy,
  TypeKey,
  interface,
};

interface! {
    Factory {
        class make: () => Box<dyn Object>,
        static describe: () => &'static str = |()| "something",
    }
}

struct Widget;

struct Gadget;

fn main() {
  env_logger::init();

  let factory = match FactoryInterface::new(Arc::new(TypeHierarchy::new())) {
    Ok(factory) => factory,
    Err(err) => {
      eprintln!("{err}");
      return;
    },
  };

  let registered = factory
    .make_slot()
    .add_for::<Widget>(Implementation::class(|key, ()| {
      println!("making a {key}");
      Box::new(Widget) as Box<dyn Object>
    }))
    .and_then(|()| {
      factory
        .describe_slot()
        .add_for::<Widget>(Implementation::static_fn(|()| "a widget"))
    });
  if let Err(err) = registered {
    eprintln!("{err}");
    return;
  }

  for target in [TypeKey::of::<Widget>(), TypeKey::of::<Gadget>()] {
    let description = factory.describe(target, ()).unwrap_or("nothing");
    match factory.make(target, ()) {
      Ok(made) => println!("{target}: {description} -> {:?}", &*made),
      Err(err @ DispatchError::UnimplementedOperation { .. }) => {
        println!("{target}: {description} -> {err}")
      },
      Err(err) => eprintln!("{err}"),
    }
  }
}
