use std::sync::Arc;

use the_interface::{
  Impls,
  Implementation,
  TypeDecl,
  TypeHierarchy,
  interface,
};

interface! {
    Show {
        method render: () => String = |_, ()| "<unknown>".to_string(),
    }
}

struct Point {
  x: i32,
  y: i32,
}

struct LabeledPoint {
  point: Point,
  label: &'static str,
}

fn main() -> the_interface::Result<()> {
  env_logger::init();

  let hierarchy = TypeHierarchy::new();
  hierarchy.declare(TypeDecl::<LabeledPoint>::of().base::<Point>(|labeled| &labeled.point))?;
  let show = ShowInterface::new(Arc::new(hierarchy))?;

  show.definition().implement_for::<i64>(Impls::new().with(
    "render",
    Implementation::method(|value: &i64, ()| format!("int:{value}")),
  ))?;
  show.definition().implement_for::<Point>(Impls::new().with(
    "render",
    Implementation::method(|point: &Point, ()| format!("({}, {})", point.x, point.y)),
  ))?;

  let labeled = LabeledPoint {
    point: Point { x: 1, y: 2 },
    label: "origin-ish",
  };

  println!("{}", show.render(&42_i64, ())?);
  println!("{} {}", labeled.label, show.render(&labeled, ())?);
  println!("{}", show.render(&'x', ())?);

  Ok(())
}
