/// Declare an interface and a typed wrapper around it.
///
/// ```rust
/// use std::sync::Arc;
///
/// use the_interface::{
///   Implementation,
///   TypeHierarchy,
///   interface,
/// };
///
/// interface! {
///   pub Show {
///     method render: () => String = |_, ()| "<unknown>".to_string(),
///   }
/// }
///
/// let show = ShowInterface::new(Arc::new(TypeHierarchy::new())).unwrap();
/// show
///   .render_slot()
///   .add_for::<i64>(Implementation::method(|value: &i64, ()| format!("int:{value}")))
///   .unwrap();
///
/// assert_eq!(show.render(&42_i64, ()).unwrap(), "int:42");
/// assert_eq!(show.render(&"text", ()).unwrap(), "<unknown>");
/// ```
///
/// Each operation is `convention name: Args => Output`, optionally followed by
/// `= default`. The convention is one of
///
/// - `method`: dispatch on a receiver. Defaults take `(&dyn Object, Args)`.
/// - `class`: dispatch on a type or instance. The implementation receives the
///   target's `TypeKey`. Defaults take `(TypeKey, Args)`.
/// - `static`: dispatch on a type or instance that is not passed on. Defaults
///   take `Args`.
///
/// The generated `<Name>Interface` holds the [`InterfaceDefinition`] and one
/// typed handle per operation. Bulk registration goes through
/// [`definition`](InterfaceDefinition), per-operation registration through
/// the `<name>_slot()` accessors.
///
/// [`InterfaceDefinition`]: crate::InterfaceDefinition
#[macro_export]
macro_rules! interface {
  (
    $vis:vis $name:ident {
      $(
        $conv:ident $op:ident : $input:ty => $output:ty $(= $default:expr)?
      ),* $(,)?
    }
  ) => {
    $crate::paste::paste! {
      #[derive(Clone)]
      $vis struct [<$name Interface>] {
        definition: $crate::InterfaceDefinition,
        $(
          $op: ::std::sync::Arc<$crate::Slot<$input, $output>>,
        )*
      }

      impl [<$name Interface>] {
        pub const NAME: &'static str = stringify!($name);

        pub fn new(
          hierarchy: ::std::sync::Arc<$crate::TypeHierarchy>,
        ) -> $crate::Result<Self> {
          Self::with_config(hierarchy, $crate::DispatchConfig::default())
        }

        pub fn with_config(
          hierarchy: ::std::sync::Arc<$crate::TypeHierarchy>,
          config: $crate::DispatchConfig,
        ) -> $crate::Result<Self> {
          let definition = $crate::InterfaceDefinition::builder(Self::NAME, hierarchy)
            .config(config)
            $(
              .slot($crate::__interface_decl!($conv $op : $input => $output $(= $default)?))
            )*
            .build()?;

          Ok(Self {
            $(
              $op: definition.slot::<$input, $output>(stringify!($op))?,
            )*
            definition,
          })
        }

        pub fn definition(&self) -> &$crate::InterfaceDefinition {
          &self.definition
        }

        $(
          pub fn [<$op _slot>](&self) -> &::std::sync::Arc<$crate::Slot<$input, $output>> {
            &self.$op
          }

          $crate::__interface_call!($conv $op : $input => $output);
        )*
      }
    }
  };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __interface_decl {
  (method $op:ident : $input:ty => $output:ty) => {
    $crate::SlotDecl::<$input, $output>::method(stringify!($op))
  };
  (method $op:ident : $input:ty => $output:ty = $default:expr) => {
    $crate::SlotDecl::<$input, $output>::method(stringify!($op))
      .default($crate::Implementation::method_dyn($default))
  };
  (class $op:ident : $input:ty => $output:ty) => {
    $crate::SlotDecl::<$input, $output>::class(stringify!($op))
  };
  (class $op:ident : $input:ty => $output:ty = $default:expr) => {
    $crate::SlotDecl::<$input, $output>::class(stringify!($op))
      .default($crate::Implementation::class($default))
  };
  (static $op:ident : $input:ty => $output:ty) => {
    $crate::SlotDecl::<$input, $output>::static_fn(stringify!($op))
  };
  (static $op:ident : $input:ty => $output:ty = $default:expr) => {
    $crate::SlotDecl::<$input, $output>::static_fn(stringify!($op))
      .default($crate::Implementation::static_fn($default))
  };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __interface_call {
  (method $op:ident : $input:ty => $output:ty) => {
    pub fn $op(
      &self,
      receiver: &dyn $crate::Object,
      args: $input,
    ) -> $crate::Result<$output> {
      self.$op.call(receiver, args)
    }
  };
  (class $op:ident : $input:ty => $output:ty) => {
    pub fn $op<'a>(
      &self,
      target: impl ::std::convert::Into<$crate::Target<'a>>,
      args: $input,
    ) -> $crate::Result<$output> {
      self.$op.call_type(target, args)
    }
  };
  (static $op:ident : $input:ty => $output:ty) => {
    pub fn $op<'a>(
      &self,
      target: impl ::std::convert::Into<$crate::Target<'a>>,
      args: $input,
    ) -> $crate::Result<$output> {
      self.$op.call_static(target, args)
    }
  };
}
