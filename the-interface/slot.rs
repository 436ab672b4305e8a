//! Dispatchable operations.
//!
//! A [`Slot`] is one named operation. It owns the table of out-of-band
//! registrations, the overrides supplied by native subclasses of its
//! interface, and the operation's default body.

use std::{
  any::Any,
  fmt,
  sync::{
    Arc,
    Weak,
  },
};

use crate::{
  DispatchConfig,
  DispatchError,
  Object,
  OverwritePolicy,
  Result,
  Target,
  TypeHierarchy,
  TypeKey,
  interface::InterfaceInner,
  table::{
    DispatchTable,
    Resolved,
    Source,
  },
};

/// How a slot is called and which argument drives resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallConvention {
  /// The receiver's runtime type selects the implementation, which gets the
  /// receiver back.
  Receiver,
  /// A type (or an instance's type) selects the implementation, which gets
  /// that type.
  Type,
  /// A type (or an instance's type) selects the implementation, which only
  /// gets the remaining arguments.
  Static,
}

impl fmt::Display for CallConvention {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Receiver => "receiver",
      Self::Type => "type",
      Self::Static => "static",
    })
  }
}

type MethodFn<A, R> = dyn Fn(&dyn Object, &TypeHierarchy, A) -> Option<R> + Send + Sync;
type ClassFn<A, R> = dyn Fn(TypeKey, A) -> R + Send + Sync;
type StaticFn<A, R> = dyn Fn(A) -> R + Send + Sync;

enum Handler<A, R> {
  Method(Arc<MethodFn<A, R>>),
  Class(Arc<ClassFn<A, R>>),
  Static(Arc<StaticFn<A, R>>),
}

impl<A, R> Clone for Handler<A, R> {
  fn clone(&self) -> Self {
    match self {
      Self::Method(f) => Self::Method(f.clone()),
      Self::Class(f) => Self::Class(f.clone()),
      Self::Static(f) => Self::Static(f.clone()),
    }
  }
}

/// A callable body for one operation, taking `A` and producing `R`.
pub struct Implementation<A, R> {
  handler:  Handler<A, R>,
  receiver: Option<TypeKey>,
}

impl<A, R> Clone for Implementation<A, R> {
  fn clone(&self) -> Self {
    Self {
      handler:  self.handler.clone(),
      receiver: self.receiver,
    }
  }
}

impl<A: 'static, R: 'static> Implementation<A, R> {
  /// Receiver implementation written against `&T`.
  ///
  /// Receivers of a derived type are borrowed as `T` through the projections
  /// declared in the hierarchy.
  pub fn method<T: Any>(f: impl Fn(&T, A) -> R + Send + Sync + 'static) -> Self {
    let handler = move |object: &dyn Object, hierarchy: &TypeHierarchy, args: A| {
      hierarchy
        .downcast::<T>(object)
        .map(|receiver| f(receiver, args))
    };
    Self {
      handler:  Handler::Method(Arc::new(handler)),
      receiver: Some(TypeKey::of::<T>()),
    }
  }

  /// Receiver implementation that takes the receiver as is.
  pub fn method_dyn(f: impl Fn(&dyn Object, A) -> R + Send + Sync + 'static) -> Self {
    let handler =
      move |object: &dyn Object, _: &TypeHierarchy, args: A| Some(f(object, args));
    Self {
      handler:  Handler::Method(Arc::new(handler)),
      receiver: None,
    }
  }

  pub fn class(f: impl Fn(TypeKey, A) -> R + Send + Sync + 'static) -> Self {
    Self {
      handler:  Handler::Class(Arc::new(f)),
      receiver: None,
    }
  }

  pub fn static_fn(f: impl Fn(A) -> R + Send + Sync + 'static) -> Self {
    Self {
      handler:  Handler::Static(Arc::new(f)),
      receiver: None,
    }
  }
}

impl<A, R> Implementation<A, R> {
  pub fn convention(&self) -> CallConvention {
    match self.handler {
      Handler::Method(_) => CallConvention::Receiver,
      Handler::Class(_) => CallConvention::Type,
      Handler::Static(_) => CallConvention::Static,
    }
  }

  /// The receiver type a typed method implementation borrows.
  pub fn receiver(&self) -> Option<TypeKey> {
    self.receiver
  }
}

impl<A, R> fmt::Debug for Implementation<A, R> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Implementation")
      .field("convention", &self.convention())
      .field("receiver", &self.receiver)
      .finish()
  }
}

pub(crate) fn check_default<A, R>(
  operation: &str,
  convention: CallConvention,
  default: Option<&Implementation<A, R>>,
) -> Result<()> {
  match default {
    Some(default) if default.convention() != convention => {
      Err(DispatchError::InvalidRegistrant {
        operation: operation.to_string(),
        reason:    format!(
          "default is a {} implementation, expected {convention}",
          default.convention()
        ),
      })
    },
    // Typed bodies fail on receivers they cannot borrow from.
    Some(default) if default.receiver.is_some() => {
      Err(DispatchError::InvalidRegistrant {
        operation: operation.to_string(),
        reason:    "a default must accept any receiver".to_string(),
      })
    },
    _ => Ok(()),
  }
}

/// Which table of a slot a registration goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
  Registered,
  Override,
}

pub type Resolution<A, R> = Resolved<Implementation<A, R>>;

pub struct Slot<A, R> {
  name:       &'static str,
  qualified:  String,
  interface:  Option<&'static str>,
  convention: CallConvention,
  hierarchy:  Arc<TypeHierarchy>,
  config:     DispatchConfig,
  table:      DispatchTable<Implementation<A, R>>,
  overrides:  DispatchTable<Implementation<A, R>>,
  enclosing:  Option<Weak<InterfaceInner>>,
}

impl<A: 'static, R: 'static> Slot<A, R> {
  /// Create a slot outside of any interface.
  pub fn new(
    name: &'static str,
    convention: CallConvention,
    default: Option<Implementation<A, R>>,
    hierarchy: Arc<TypeHierarchy>,
    config: DispatchConfig,
  ) -> Result<Self> {
    check_default(name, convention, default.as_ref())?;
    Ok(Self::unchecked(name, convention, default, hierarchy, config))
  }

  pub(crate) fn unchecked(
    name: &'static str,
    convention: CallConvention,
    default: Option<Implementation<A, R>>,
    hierarchy: Arc<TypeHierarchy>,
    config: DispatchConfig,
  ) -> Self {
    Self {
      name,
      qualified: name.to_string(),
      interface: None,
      convention,
      hierarchy,
      config,
      table: DispatchTable::new(default),
      overrides: DispatchTable::new(None),
      enclosing: None,
    }
  }

  pub(crate) fn enclosed(
    mut self,
    interface: &'static str,
    enclosing: Weak<InterfaceInner>,
  ) -> Self {
    self.qualified = format!("{interface}::{}", self.name);
    self.interface = Some(interface);
    self.enclosing = Some(enclosing);
    self
  }

  pub fn name(&self) -> &'static str {
    self.name
  }

  /// `Interface::operation` for enclosed slots, the bare name otherwise.
  pub fn qualified_name(&self) -> &str {
    &self.qualified
  }

  pub fn convention(&self) -> CallConvention {
    self.convention
  }

  pub fn hierarchy(&self) -> &Arc<TypeHierarchy> {
    &self.hierarchy
  }

  pub fn config(&self) -> DispatchConfig {
    self.config
  }

  /// Out-of-band registrations and the default.
  pub fn table(&self) -> &DispatchTable<Implementation<A, R>> {
    &self.table
  }

  /// Register `implementation` for `key` and its descendants.
  pub fn add(&self, key: TypeKey, implementation: Implementation<A, R>) -> Result<()> {
    self.check(key, &implementation, Origin::Registered)?;
    self.insert(key, implementation, Origin::Registered)
  }

  pub fn add_for<T: Any>(&self, implementation: Implementation<A, R>) -> Result<()> {
    self.add(TypeKey::of::<T>(), implementation)
  }

  pub(crate) fn check(
    &self,
    key: TypeKey,
    implementation: &Implementation<A, R>,
    origin: Origin,
  ) -> Result<()> {
    if implementation.convention() != self.convention {
      return Err(self.invalid(format!(
        "expected a {} implementation, got a {} one",
        self.convention,
        implementation.convention()
      )));
    }
    if let Some(receiver) = implementation.receiver {
      if !self.hierarchy.can_upcast(key, receiver) {
        return Err(self.invalid(format!("{key} cannot be borrowed as {receiver}")));
      }
    }
    if self.config.overwrite == OverwritePolicy::Reject && self.tables(origin).contains(key) {
      return Err(self.duplicate(key));
    }
    Ok(())
  }

  pub(crate) fn insert(
    &self,
    key: TypeKey,
    implementation: Implementation<A, R>,
    origin: Origin,
  ) -> Result<()> {
    let table = self.tables(origin);
    match self.config.overwrite {
      OverwritePolicy::Reject => {
        if !table.add_new(key, implementation) {
          return Err(self.duplicate(key));
        }
      },
      OverwritePolicy::Warn => {
        if table.add(key, implementation).is_some() {
          log::warn!("{} for {key} replaced an earlier implementation", self.qualified);
        }
      },
      OverwritePolicy::Replace => {
        table.add(key, implementation);
      },
    }
    log::debug!("registered {} for {key} ({origin:?})", self.qualified);
    Ok(())
  }

  fn tables(&self, origin: Origin) -> &DispatchTable<Implementation<A, R>> {
    match origin {
      Origin::Registered => &self.table,
      Origin::Override => &self.overrides,
    }
  }

  /// Select the implementation for `key` without calling it.
  ///
  /// Overrides from native subclasses of the enclosing interface come first,
  /// then registrations, nearest ancestor first, then the default.
  pub fn resolve(&self, key: TypeKey) -> Option<Resolution<A, R>> {
    let ancestry = self.hierarchy.ancestry(key);
    let resolved = self
      .resolve_override(&ancestry)
      .or_else(|| self.table.resolve_or_default(&ancestry));
    match &resolved {
      Some(resolved) => {
        log::trace!("{} for {key} resolved to {:?}", self.qualified, resolved.source)
      },
      None => log::trace!("{} for {key} is unimplemented", self.qualified),
    }
    resolved
  }

  fn resolve_override(&self, ancestry: &[TypeKey]) -> Option<Resolution<A, R>> {
    let interface = self.enclosing.as_ref()?.upgrade()?;
    if !interface.is_native(ancestry) {
      return None;
    }
    let (key, implementation) = self.overrides.resolve(ancestry)?;
    Some(Resolved {
      implementation,
      source: Source::Override(key),
    })
  }

  /// Call a receiver slot.
  pub fn call(&self, receiver: &dyn Object, args: A) -> Result<R> {
    self.expect(CallConvention::Receiver)?;
    let key = receiver.type_key();
    let resolved = self.resolve(key).ok_or_else(|| self.unimplemented(key))?;
    let Handler::Method(handler) = &resolved.implementation.handler else {
      return Err(self.mismatch(resolved.implementation.convention()));
    };

    let hierarchy: &TypeHierarchy = &self.hierarchy;
    handler(receiver, hierarchy, args).ok_or_else(|| DispatchError::InvalidReceiver {
      operation: self.qualified.clone(),
      expected:  resolved
        .implementation
        .receiver
        .map_or("unknown", |receiver| receiver.name()),
      found:     key.name(),
    })
  }

  /// Call a type slot. The implementation receives the target's own type.
  pub fn call_type<'a>(&self, target: impl Into<Target<'a>>, args: A) -> Result<R> {
    self.expect(CallConvention::Type)?;
    self.dispatch_type(target.into(), args)
  }

  /// Call a static slot. The target only selects the implementation.
  pub fn call_static<'a>(&self, target: impl Into<Target<'a>>, args: A) -> Result<R> {
    self.expect(CallConvention::Static)?;
    self.dispatch_type(target.into(), args)
  }

  fn dispatch_type(&self, target: Target<'_>, args: A) -> Result<R> {
    let key = target.type_key();
    let resolved = self.resolve(key).ok_or_else(|| self.unimplemented(key))?;
    match &resolved.implementation.handler {
      Handler::Class(handler) => Ok(handler(key, args)),
      Handler::Static(handler) => Ok(handler(args)),
      Handler::Method(_) => Err(self.mismatch(CallConvention::Receiver)),
    }
  }

  fn expect(&self, found: CallConvention) -> Result<()> {
    if self.convention == found {
      Ok(())
    } else {
      Err(self.mismatch(found))
    }
  }

  fn mismatch(&self, found: CallConvention) -> DispatchError {
    DispatchError::ConventionMismatch {
      operation: self.qualified.clone(),
      expected: self.convention,
      found,
    }
  }

  fn unimplemented(&self, key: TypeKey) -> DispatchError {
    DispatchError::UnimplementedOperation {
      operation: self.qualified.clone(),
      type_name: key.name(),
    }
  }

  fn invalid(&self, reason: String) -> DispatchError {
    DispatchError::InvalidRegistrant {
      operation: self.qualified.clone(),
      reason,
    }
  }

  fn duplicate(&self, key: TypeKey) -> DispatchError {
    DispatchError::DuplicateRegistration {
      operation: self.qualified.clone(),
      type_name: key.name(),
    }
  }
}

impl<A, R> fmt::Debug for Slot<A, R> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Slot")
      .field("name", &self.qualified)
      .field("convention", &self.convention)
      .finish_non_exhaustive()
  }
}

/// Type-erased view of a slot, used where slots of different signatures sit
/// side by side.
pub(crate) trait ErasedSlot: Send + Sync {
  fn name(&self) -> &'static str;
  fn convention(&self) -> CallConvention;
  fn check_erased(
    &self,
    key: TypeKey,
    implementation: &(dyn Any + Send + Sync),
    origin: Origin,
  ) -> Result<()>;
  fn insert_erased(
    &self,
    key: TypeKey,
    implementation: Box<dyn Any + Send + Sync>,
    origin: Origin,
  ) -> Result<()>;
  fn registered(&self) -> Vec<TypeKey>;
  fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<A: 'static, R: 'static> Slot<A, R> {
  fn signature_mismatch(&self) -> DispatchError {
    DispatchError::SignatureMismatch {
      operation: self.qualified.clone(),
      interface: self.interface.unwrap_or(self.name),
    }
  }
}

impl<A: 'static, R: 'static> ErasedSlot for Slot<A, R> {
  fn name(&self) -> &'static str {
    self.name
  }

  fn convention(&self) -> CallConvention {
    self.convention
  }

  fn check_erased(
    &self,
    key: TypeKey,
    implementation: &(dyn Any + Send + Sync),
    origin: Origin,
  ) -> Result<()> {
    let implementation = implementation
      .downcast_ref::<Implementation<A, R>>()
      .ok_or_else(|| self.signature_mismatch())?;
    self.check(key, implementation, origin)
  }

  fn insert_erased(
    &self,
    key: TypeKey,
    implementation: Box<dyn Any + Send + Sync>,
    origin: Origin,
  ) -> Result<()> {
    let implementation = implementation
      .downcast::<Implementation<A, R>>()
      .map_err(|_| self.signature_mismatch())?;
    self.insert(key, *implementation, origin)
  }

  fn registered(&self) -> Vec<TypeKey> {
    self.table.keys()
  }

  fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
    self
  }
}
