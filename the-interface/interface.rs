//! Named groups of slots that types implement as a unit.
//!
//! A type joins an interface in one of two ways:
//!
//! - [`InterfaceDefinition::implement`] registers implementations out of band.
//!   The type becomes a virtual member and resolution goes through the slot
//!   tables like any other registration.
//! - [`InterfaceDefinition::subclass`] declares the type a native member. Its
//!   implementations are overrides and win over every registration, including
//!   registrations made later for the same type.
//!
//! Both take an [`Impls`] bundle and apply it all or nothing.

use std::{
  any::Any,
  fmt,
  sync::{
    Arc,
    Weak,
  },
};

use hashbrown::HashSet;
use indexmap::IndexMap;
use parking_lot::{
  Mutex,
  RwLock,
};

use crate::{
  CallConvention,
  DispatchConfig,
  DispatchError,
  Implementation,
  Object,
  Result,
  Slot,
  Target,
  TypeHierarchy,
  TypeKey,
  slot::{
    ErasedSlot,
    Origin,
    check_default,
  },
};

/// Declaration of one operation of an interface under construction.
pub struct SlotDecl<A, R> {
  name:       &'static str,
  convention: CallConvention,
  default:    Option<Implementation<A, R>>,
}

impl<A: 'static, R: 'static> SlotDecl<A, R> {
  pub fn method(name: &'static str) -> Self {
    Self::with_convention(name, CallConvention::Receiver)
  }

  pub fn class(name: &'static str) -> Self {
    Self::with_convention(name, CallConvention::Type)
  }

  pub fn static_fn(name: &'static str) -> Self {
    Self::with_convention(name, CallConvention::Static)
  }

  pub fn with_convention(name: &'static str, convention: CallConvention) -> Self {
    Self {
      name,
      convention,
      default: None,
    }
  }

  /// Body used for types with no implementation of their own.
  pub fn default(mut self, implementation: Implementation<A, R>) -> Self {
    self.default = Some(implementation);
    self
  }
}

/// A bundle of implementations keyed by operation name.
#[derive(Default)]
pub struct Impls {
  entries: IndexMap<&'static str, Box<dyn Any + Send + Sync>>,
}

impl Impls {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with<A: 'static, R: 'static>(
    mut self,
    operation: &'static str,
    implementation: Implementation<A, R>,
  ) -> Self {
    self.entries.insert(operation, Box::new(implementation));
    self
  }

  pub fn operations(&self) -> impl Iterator<Item = &'static str> + '_ {
    self.entries.keys().copied()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl fmt::Debug for Impls {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_list().entries(self.entries.keys()).finish()
  }
}

pub(crate) struct InterfaceInner {
  name:      &'static str,
  hierarchy: Arc<TypeHierarchy>,
  config:    DispatchConfig,
  slots:     IndexMap<&'static str, Arc<dyn ErasedSlot>>,
  natives:   RwLock<HashSet<TypeKey>>,
  virtuals:  RwLock<HashSet<TypeKey>>,
  /// Serializes bulk registrations.
  writer:    Mutex<()>,
}

impl InterfaceInner {
  /// Whether any type along `ancestry` is a native member.
  pub(crate) fn is_native(&self, ancestry: &[TypeKey]) -> bool {
    let natives = self.natives.read();
    ancestry.iter().any(|key| natives.contains(key))
  }

  fn is_virtual(&self, ancestry: &[TypeKey]) -> bool {
    let virtuals = self.virtuals.read();
    ancestry.iter().any(|key| virtuals.contains(key))
  }
}

struct SlotContext {
  interface: &'static str,
  hierarchy: Arc<TypeHierarchy>,
  config:    DispatchConfig,
  enclosing: Weak<InterfaceInner>,
}

type SlotFactory = Box<dyn FnOnce(SlotContext) -> Arc<dyn ErasedSlot>>;

pub struct InterfaceBuilder {
  name:      &'static str,
  hierarchy: Arc<TypeHierarchy>,
  config:    DispatchConfig,
  slots:     Vec<(&'static str, SlotFactory)>,
  error:     Option<DispatchError>,
}

impl InterfaceBuilder {
  pub fn config(mut self, config: DispatchConfig) -> Self {
    self.config = config;
    self
  }

  pub fn slot<A: 'static, R: 'static>(mut self, decl: SlotDecl<A, R>) -> Self {
    let SlotDecl {
      name,
      convention,
      default,
    } = decl;

    if self.error.is_none() {
      if self.slots.iter().any(|(existing, _)| *existing == name) {
        self.error = Some(DispatchError::DuplicateOperation {
          operation: name,
          interface: self.name,
        });
      } else if let Err(err) =
        check_default(&format!("{}::{name}", self.name), convention, default.as_ref())
      {
        self.error = Some(err);
      }
    }

    let factory = move |cx: SlotContext| -> Arc<dyn ErasedSlot> {
      Arc::new(
        Slot::unchecked(name, convention, default, cx.hierarchy, cx.config)
          .enclosed(cx.interface, cx.enclosing),
      )
    };
    self.slots.push((name, Box::new(factory)));
    self
  }

  /// Finish the interface. Fails on the first invalid declaration.
  pub fn build(self) -> Result<InterfaceDefinition> {
    if let Some(err) = self.error {
      return Err(err);
    }

    let Self {
      name,
      hierarchy,
      config,
      slots,
      ..
    } = self;

    let inner = Arc::new_cyclic(|enclosing: &Weak<InterfaceInner>| {
      let slots = slots
        .into_iter()
        .map(|(operation, factory)| {
          let cx = SlotContext {
            interface: name,
            hierarchy: hierarchy.clone(),
            config,
            enclosing: enclosing.clone(),
          };
          (operation, factory(cx))
        })
        .collect();
      InterfaceInner {
        name,
        hierarchy,
        config,
        slots,
        natives: RwLock::new(HashSet::new()),
        virtuals: RwLock::new(HashSet::new()),
        writer: Mutex::new(()),
      }
    });

    log::debug!(
      "defined interface {name} with {} operation(s)",
      inner.slots.len()
    );
    Ok(InterfaceDefinition { inner })
  }
}

/// A named set of dispatchable operations.
///
/// Cloning is cheap and every clone refers to the same registrations.
#[derive(Clone)]
pub struct InterfaceDefinition {
  inner: Arc<InterfaceInner>,
}

impl InterfaceDefinition {
  pub fn builder(name: &'static str, hierarchy: Arc<TypeHierarchy>) -> InterfaceBuilder {
    InterfaceBuilder {
      name,
      hierarchy,
      config: DispatchConfig::default(),
      slots: Vec::new(),
      error: None,
    }
  }

  pub fn name(&self) -> &'static str {
    self.inner.name
  }

  pub fn hierarchy(&self) -> &Arc<TypeHierarchy> {
    &self.inner.hierarchy
  }

  pub fn config(&self) -> DispatchConfig {
    self.inner.config
  }

  /// Operation names in declaration order.
  pub fn operations(&self) -> Vec<&'static str> {
    self.inner.slots.keys().copied().collect()
  }

  pub fn has_operation(&self, operation: &str) -> bool {
    self.inner.slots.contains_key(operation)
  }

  pub fn convention(&self, operation: &str) -> Option<CallConvention> {
    self.inner.slots.get(operation).map(|slot| slot.convention())
  }

  /// Typed handle to one operation.
  pub fn slot<A: 'static, R: 'static>(&self, operation: &str) -> Result<Arc<Slot<A, R>>> {
    let slot = self.erased(operation)?;
    Arc::clone(slot)
      .into_any()
      .downcast::<Slot<A, R>>()
      .map_err(|_| DispatchError::SignatureMismatch {
        operation: format!("{}::{operation}", self.name()),
        interface: self.name(),
      })
  }

  fn erased(&self, operation: &str) -> Result<&Arc<dyn ErasedSlot>> {
    self
      .inner
      .slots
      .get(operation)
      .ok_or_else(|| DispatchError::UnknownOperation {
        operation: operation.to_string(),
        interface: self.name(),
      })
  }

  /// Register `impls` for `key` and its descendants and make `key` a virtual
  /// member.
  ///
  /// Every entry is checked before any is inserted, and bulk registrations on
  /// one interface never interleave. A direct `Slot::add` racing with this
  /// call under `OverwritePolicy::Reject` can still fail an insert after
  /// earlier entries landed; the error is returned.
  pub fn implement(&self, key: TypeKey, impls: Impls) -> Result<()> {
    self.register(key, impls, Origin::Registered)
  }

  pub fn implement_for<T: Any>(&self, impls: Impls) -> Result<()> {
    self.implement(TypeKey::of::<T>(), impls)
  }

  /// Make `key` a native member whose implementations override any
  /// registration. Applied all or nothing, like [`implement`](Self::implement).
  pub fn subclass(&self, key: TypeKey, impls: Impls) -> Result<()> {
    self.register(key, impls, Origin::Override)
  }

  pub fn subclass_for<T: Any>(&self, impls: Impls) -> Result<()> {
    self.subclass(TypeKey::of::<T>(), impls)
  }

  fn register(&self, key: TypeKey, impls: Impls, origin: Origin) -> Result<()> {
    let _guard = self.inner.writer.lock();
    // Nothing is inserted until every entry checks out.
    let mut planned = Vec::with_capacity(impls.len());
    for (operation, implementation) in impls.entries {
      let slot = self.erased(operation)?;
      slot.check_erased(key, &*implementation, origin)?;
      planned.push((slot, implementation));
    }

    for (slot, implementation) in planned {
      slot.insert_erased(key, implementation, origin)?;
    }

    let members = match origin {
      Origin::Registered => &self.inner.virtuals,
      Origin::Override => &self.inner.natives,
    };
    members.write().insert(key);
    log::debug!("{key} joined {} ({origin:?})", self.name());
    Ok(())
  }

  /// Whether `key` or one of its ancestors joined the interface.
  pub fn is_implemented_by(&self, key: TypeKey) -> bool {
    let ancestry = self.inner.hierarchy.ancestry(key);
    self.inner.is_native(&ancestry) || self.inner.is_virtual(&ancestry)
  }

  pub fn is_instance(&self, value: &dyn Object) -> bool {
    self.is_implemented_by(value.type_key())
  }

  /// Whether `key` joined through [`subclass`](Self::subclass), directly or
  /// through an ancestor.
  pub fn is_native(&self, key: TypeKey) -> bool {
    self.inner.is_native(&self.inner.hierarchy.ancestry(key))
  }

  /// Types that joined directly, natives first.
  pub fn implementors(&self) -> Vec<TypeKey> {
    let natives = self.inner.natives.read();
    let virtuals = self.inner.virtuals.read();
    let mut members: Vec<TypeKey> = natives.iter().copied().collect();
    members.extend(virtuals.iter().filter(|key| !natives.contains(*key)));
    members
  }

  /// Types with an out-of-band registration for `operation`.
  pub fn registered(&self, operation: &str) -> Result<Vec<TypeKey>> {
    Ok(self.erased(operation)?.registered())
  }

  pub fn call<A: 'static, R: 'static>(
    &self,
    operation: &str,
    receiver: &dyn Object,
    args: A,
  ) -> Result<R> {
    self.slot::<A, R>(operation)?.call(receiver, args)
  }

  pub fn call_type<'a, A: 'static, R: 'static>(
    &self,
    operation: &str,
    target: impl Into<Target<'a>>,
    args: A,
  ) -> Result<R> {
    self.slot::<A, R>(operation)?.call_type(target, args)
  }

  pub fn call_static<'a, A: 'static, R: 'static>(
    &self,
    operation: &str,
    target: impl Into<Target<'a>>,
    args: A,
  ) -> Result<R> {
    self.slot::<A, R>(operation)?.call_static(target, args)
  }
}

impl fmt::Debug for InterfaceDefinition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("InterfaceDefinition")
      .field("name", &self.inner.name)
      .field("operations", &self.operations())
      .finish_non_exhaustive()
  }
}
