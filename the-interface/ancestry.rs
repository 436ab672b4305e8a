//! Type ancestry.
//!
//! Rust types have no inheritance, so the hierarchy dispatch resolves against
//! is declared by the application: each type lists its direct bases in
//! precedence order, optionally with a projection to the embedded base value.
//! Ancestry chains are the C3 linearization of those declarations and always
//! end at [`TypeKey::root`].

use std::{
  any::Any,
  marker::PhantomData,
  sync::Arc,
};

use hashbrown::{
  HashMap,
  HashSet,
};
use parking_lot::RwLock;
use smallvec::{
  SmallVec,
  smallvec,
};

use crate::{
  DispatchError,
  Object,
  Result,
  TypeKey,
};

/// Ordered ancestry of a type, most specific first.
pub type Ancestry = Arc<[TypeKey]>;

trait Upcast: Send + Sync {
  fn upcast<'a>(&self, value: &'a dyn Any) -> Option<&'a dyn Any>;
}

struct Projection<T, U> {
  project: fn(&T) -> &U,
}

impl<T: Any, U: Any> Upcast for Projection<T, U> {
  fn upcast<'a>(&self, value: &'a dyn Any) -> Option<&'a dyn Any> {
    let value = value.downcast_ref::<T>()?;
    Some((self.project)(value))
  }
}

#[derive(Clone)]
struct Base {
  key:        TypeKey,
  projection: Option<Arc<dyn Upcast>>,
}

impl Base {
  fn nominal(key: TypeKey) -> Self {
    Self {
      key,
      projection: None,
    }
  }
}

type Bases = SmallVec<[Base; 2]>;

struct TypeEntry {
  bases: Bases,
  mro:   Ancestry,
}

/// Direct bases of `T`, in precedence order.
///
/// Declare bases before the types deriving from them: a base that is still
/// undeclared when a descendant names it is frozen without bases of its own.
pub struct TypeDecl<T> {
  bases:   Bases,
  _marker: PhantomData<fn() -> T>,
}

impl<T: Any> TypeDecl<T> {
  pub fn of() -> Self {
    Self {
      bases:   SmallVec::new(),
      _marker: PhantomData,
    }
  }

  /// Add a base that `T` embeds. Implementations written against `&U` can
  /// then be called with a `T` receiver.
  pub fn base<U: Any>(mut self, project: fn(&T) -> &U) -> Self {
    self.bases.push(Base {
      key:        TypeKey::of::<U>(),
      projection: Some(Arc::new(Projection { project })),
    });
    self
  }

  /// Add a base by name only. Resolution sees it, but typed implementations
  /// for `U` cannot borrow a `U` out of a `T`.
  pub fn nominal_base<U: Any>(mut self) -> Self {
    self.bases.push(Base::nominal(TypeKey::of::<U>()));
    self
  }
}

/// Registry of declared types and their linearized ancestry.
pub struct TypeHierarchy {
  types: RwLock<HashMap<TypeKey, TypeEntry>>,
}

impl Default for TypeHierarchy {
  fn default() -> Self {
    Self::new()
  }
}

impl TypeHierarchy {
  pub fn new() -> Self {
    Self {
      types: RwLock::new(HashMap::new()),
    }
  }

  /// Declare `T` with the bases in `decl`, returning its ancestry.
  ///
  /// Declarations are final. Bases not declared yet are implicitly declared
  /// with no bases, so a hierarchy has to be declared from the top down;
  /// declaring such a base afterwards fails with `AlreadyDeclared`.
  pub fn declare<T: Any>(&self, decl: TypeDecl<T>) -> Result<Ancestry> {
    self.declare_bases(TypeKey::of::<T>(), decl.bases)
  }

  /// Declare `key` with nominal bases only.
  pub fn declare_nominal(&self, key: TypeKey, bases: &[TypeKey]) -> Result<Ancestry> {
    self.declare_bases(key, bases.iter().copied().map(Base::nominal).collect())
  }

  fn declare_bases(&self, key: TypeKey, bases: Bases) -> Result<Ancestry> {
    let mut types = self.types.write();
    if key.is_root() || types.contains_key(&key) {
      return Err(DispatchError::AlreadyDeclared {
        type_name: key.name(),
      });
    }

    let mut seen = HashSet::new();
    if bases
      .iter()
      .any(|base| base.key == key || !seen.insert(base.key))
    {
      return Err(DispatchError::InconsistentHierarchy {
        type_name: key.name(),
      });
    }

    let keys: SmallVec<[TypeKey; 4]> = if bases.is_empty() {
      smallvec![TypeKey::root()]
    } else {
      bases.iter().map(|base| base.key).collect()
    };
    let base_mros: Vec<Ancestry> = keys
      .iter()
      .map(|base| match types.get(base) {
        Some(entry) => entry.mro.clone(),
        None => implicit_ancestry(*base),
      })
      .collect();

    let mro: Ancestry = linearize(key, &base_mros, &keys)
      .ok_or(DispatchError::InconsistentHierarchy {
        type_name: key.name(),
      })?
      .into();

    for base in keys.iter().filter(|base| !base.is_root()) {
      if !types.contains_key(base) {
        log::debug!("implicitly declared {base} as a base of {key}");
        types.insert(*base, TypeEntry {
          bases: SmallVec::new(),
          mro:   implicit_ancestry(*base),
        });
      }
    }

    log::debug!("declared {key} with ancestry {mro:?}");
    types.insert(key, TypeEntry {
      bases,
      mro: mro.clone(),
    });
    Ok(mro)
  }

  /// Ancestry of `key`, starting with `key` itself and ending at the root.
  /// Undeclared types only have the root as a base.
  pub fn ancestry(&self, key: TypeKey) -> Ancestry {
    match self.types.read().get(&key) {
      Some(entry) => entry.mro.clone(),
      None => implicit_ancestry(key),
    }
  }

  pub fn is_declared(&self, key: TypeKey) -> bool {
    self.types.read().contains_key(&key)
  }

  /// Direct bases of `key` in declaration order.
  pub fn bases(&self, key: TypeKey) -> Vec<TypeKey> {
    self
      .types
      .read()
      .get(&key)
      .map(|entry| entry.bases.iter().map(|base| base.key).collect())
      .unwrap_or_default()
  }

  pub fn is_subtype(&self, key: TypeKey, base: TypeKey) -> bool {
    base.is_root() || self.ancestry(key).contains(&base)
  }

  /// Whether a `from` value can be borrowed as a `to` value by following
  /// projections.
  pub fn can_upcast(&self, from: TypeKey, to: TypeKey) -> bool {
    reachable(&self.types.read(), from, to)
  }

  /// Borrow the `to` value embedded in `value`.
  pub fn upcast<'a>(&self, value: &'a dyn Object, to: TypeKey) -> Option<&'a dyn Any> {
    let from = value.type_key();
    if from == to {
      return Some(value.as_any());
    }
    project(&self.types.read(), value.as_any(), from, to)
  }

  pub fn downcast<'a, U: Any>(&self, value: &'a dyn Object) -> Option<&'a U> {
    if let Some(exact) = value.as_any().downcast_ref::<U>() {
      return Some(exact);
    }
    self.upcast(value, TypeKey::of::<U>())?.downcast_ref::<U>()
  }

  pub fn len(&self) -> usize {
    self.types.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

fn implicit_ancestry(key: TypeKey) -> Ancestry {
  if key.is_root() {
    Arc::from([key])
  } else {
    Arc::from([key, TypeKey::root()])
  }
}

/// C3 merge of the bases' linearizations followed by the bases themselves.
fn linearize(key: TypeKey, base_mros: &[Ancestry], bases: &[TypeKey]) -> Option<Vec<TypeKey>> {
  let mut sequences: Vec<&[TypeKey]> = base_mros.iter().map(|mro| &mro[..]).collect();
  sequences.push(bases);

  let mut result = vec![key];
  loop {
    sequences.retain(|sequence| !sequence.is_empty());
    if sequences.is_empty() {
      return Some(result);
    }

    let candidate = sequences.iter().map(|sequence| sequence[0]).find(|candidate| {
      sequences
        .iter()
        .all(|sequence| !sequence[1..].contains(candidate))
    })?;

    result.push(candidate);
    for sequence in &mut sequences {
      if sequence[0] == candidate {
        *sequence = &sequence[1..];
      }
    }
  }
}

fn reachable(types: &HashMap<TypeKey, TypeEntry>, from: TypeKey, to: TypeKey) -> bool {
  if from == to {
    return true;
  }
  types.get(&from).is_some_and(|entry| {
    entry
      .bases
      .iter()
      .any(|base| base.projection.is_some() && reachable(types, base.key, to))
  })
}

fn project<'a>(
  types: &HashMap<TypeKey, TypeEntry>,
  value: &'a dyn Any,
  from: TypeKey,
  to: TypeKey,
) -> Option<&'a dyn Any> {
  if from == to {
    return Some(value);
  }
  let entry = types.get(&from)?;
  entry.bases.iter().find_map(|base| {
    let projection = base.projection.as_ref()?;
    if !reachable(types, base.key, to) {
      return None;
    }
    project(types, projection.upcast(value)?, base.key, to)
  })
}
