use std::sync::Arc;

use arc_swap::ArcSwap;
use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::TypeKey;

/// Where a resolved implementation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
  /// An override supplied by a native subclass, found at this ancestor.
  Override(TypeKey),
  /// An out-of-band registration, found at this ancestor.
  Registered(TypeKey),
  /// The table's default.
  Default,
}

#[derive(Debug, Clone)]
pub struct Resolved<I> {
  pub implementation: I,
  pub source:         Source,
}

/// Map from types to implementations plus an optional default.
///
/// Readers see an immutable snapshot and never block. Writers are serialized
/// and publish a fresh copy of the map, so a resolve racing an add sees either
/// the old or the new map, never a partial one.
pub struct DispatchTable<I> {
  registry: ArcSwap<HashMap<TypeKey, I>>,
  writer:   Mutex<()>,
  default:  Option<I>,
}

impl<I: Clone> DispatchTable<I> {
  pub fn new(default: Option<I>) -> Self {
    Self {
      registry: ArcSwap::from_pointee(HashMap::new()),
      writer: Mutex::new(()),
      default,
    }
  }

  /// Insert or replace the implementation for `key`, returning the replaced
  /// one.
  pub fn add(&self, key: TypeKey, implementation: I) -> Option<I> {
    let _guard = self.writer.lock();
    let mut next = HashMap::clone(&self.registry.load());
    let previous = next.insert(key, implementation);
    self.registry.store(Arc::new(next));
    previous
  }

  /// Insert the implementation unless `key` already has one.
  pub fn add_new(&self, key: TypeKey, implementation: I) -> bool {
    let _guard = self.writer.lock();
    let current = self.registry.load();
    if current.contains_key(&key) {
      return false;
    }
    let mut next = HashMap::clone(&current);
    next.insert(key, implementation);
    self.registry.store(Arc::new(next));
    true
  }

  /// Exact registration for `key`.
  pub fn lookup(&self, key: TypeKey) -> Option<I> {
    self.registry.load().get(&key).cloned()
  }

  /// Exact registration for `key`, falling back to the default.
  pub fn get(&self, key: TypeKey) -> Option<I> {
    self.lookup(key).or_else(|| self.default.clone())
  }

  /// First registration along `ancestry`. Nearer ancestors win.
  pub fn resolve(&self, ancestry: &[TypeKey]) -> Option<(TypeKey, I)> {
    let registry = self.registry.load();
    ancestry.iter().find_map(|key| {
      registry
        .get(key)
        .map(|implementation| (*key, implementation.clone()))
    })
  }

  pub fn resolve_or_default(&self, ancestry: &[TypeKey]) -> Option<Resolved<I>> {
    match self.resolve(ancestry) {
      Some((key, implementation)) => Some(Resolved {
        implementation,
        source: Source::Registered(key),
      }),
      None => self.default.clone().map(|implementation| Resolved {
        implementation,
        source: Source::Default,
      }),
    }
  }

  pub fn contains(&self, key: TypeKey) -> bool {
    self.registry.load().contains_key(&key)
  }

  pub fn default(&self) -> Option<&I> {
    self.default.as_ref()
  }

  pub fn keys(&self) -> Vec<TypeKey> {
    self.registry.load().keys().copied().collect()
  }

  pub fn len(&self) -> usize {
    self.registry.load().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
