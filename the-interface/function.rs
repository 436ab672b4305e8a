use std::{
  any::Any,
  sync::Arc,
};

use crate::{
  CallConvention,
  DispatchConfig,
  Implementation,
  Object,
  Result,
  Slot,
  TypeHierarchy,
};

/// A free-standing function dispatched on the runtime type of its first
/// argument.
///
/// ```rust
/// use std::sync::Arc;
///
/// use the_interface::{
///   DispatchFn,
///   TypeHierarchy,
/// };
///
/// let show = DispatchFn::<(), String>::new("show", Arc::new(TypeHierarchy::new()));
/// show.impl_for(|value: &i32, ()| format!("int: {value}")).unwrap();
/// show.impl_for(|value: &String, ()| format!("str: {value}")).unwrap();
///
/// assert_eq!(show.call(&1, ()).unwrap(), "int: 1");
/// assert_eq!(show.call(&"hello".to_string(), ()).unwrap(), "str: hello");
/// ```
pub struct DispatchFn<A, R> {
  slot: Arc<Slot<A, R>>,
}

impl<A, R> Clone for DispatchFn<A, R> {
  fn clone(&self) -> Self {
    Self {
      slot: self.slot.clone(),
    }
  }
}

impl<A: 'static, R: 'static> DispatchFn<A, R> {
  pub fn new(name: &'static str, hierarchy: Arc<TypeHierarchy>) -> Self {
    Self {
      slot: Arc::new(Slot::unchecked(
        name,
        CallConvention::Receiver,
        None,
        hierarchy,
        DispatchConfig::default(),
      )),
    }
  }

  /// A function that falls back to `f` when no registration matches.
  pub fn with_default(
    name: &'static str,
    hierarchy: Arc<TypeHierarchy>,
    f: impl Fn(&dyn Object, A) -> R + Send + Sync + 'static,
  ) -> Self {
    Self {
      slot: Arc::new(Slot::unchecked(
        name,
        CallConvention::Receiver,
        Some(Implementation::method_dyn(f)),
        hierarchy,
        DispatchConfig::default(),
      )),
    }
  }

  /// Fails when `default` is not a receiver implementation that accepts any
  /// receiver.
  pub fn with_config(
    name: &'static str,
    hierarchy: Arc<TypeHierarchy>,
    config: DispatchConfig,
    default: Option<Implementation<A, R>>,
  ) -> Result<Self> {
    let slot = Slot::new(name, CallConvention::Receiver, default, hierarchy, config)?;
    Ok(Self {
      slot: Arc::new(slot),
    })
  }

  /// Register `f` for `T` and every type declared to derive from it.
  pub fn impl_for<T: Any>(&self, f: impl Fn(&T, A) -> R + Send + Sync + 'static) -> Result<()> {
    self.slot.add_for::<T>(Implementation::method(f))
  }

  pub fn call(&self, receiver: &dyn Object, args: A) -> Result<R> {
    self.slot.call(receiver, args)
  }

  pub fn name(&self) -> &'static str {
    self.slot.name()
  }

  pub fn slot(&self) -> &Arc<Slot<A, R>> {
    &self.slot
  }
}
