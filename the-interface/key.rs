//! Runtime type identity.
//!
//! A [`TypeKey`] names a concrete Rust type for the lifetime of the process.
//! Values are dispatched on through [`Object`], which every `'static` type
//! implements, so any `&T` coerces to the `&dyn Object` receivers the rest of
//! the crate takes.

use std::{
  any::{
    Any,
    TypeId,
    type_name,
  },
  fmt,
  hash::{
    Hash,
    Hasher,
  },
};

/// Identifier of a concrete type.
///
/// Equality and hashing only look at the [`TypeId`]; the name is carried along
/// for diagnostics.
#[derive(Clone, Copy)]
pub struct TypeKey {
  id:   TypeId,
  name: &'static str,
}

/// Marker for the universal base type. Never instantiated.
enum Root {}

impl TypeKey {
  pub fn of<T: ?Sized + Any>() -> Self {
    Self {
      id:   TypeId::of::<T>(),
      name: type_name::<T>(),
    }
  }

  /// The base every ancestry chain ends at.
  ///
  /// Registering an implementation for the root makes it a blanket
  /// implementation for every type.
  pub fn root() -> Self {
    Self {
      id:   TypeId::of::<Root>(),
      name: "any",
    }
  }

  #[inline]
  pub fn is_root(&self) -> bool {
    self.id == TypeId::of::<Root>()
  }

  #[inline]
  pub fn id(&self) -> TypeId {
    self.id
  }

  #[inline]
  pub fn name(&self) -> &'static str {
    self.name
  }
}

impl PartialEq for TypeKey {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
  }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.id.hash(state);
  }
}

impl fmt::Debug for TypeKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "TypeKey({})", self.name)
  }
}

impl fmt::Display for TypeKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name)
  }
}

/// A value whose concrete type can be recovered at runtime.
///
/// Implemented for every `T: Any`. Note that a `Box<dyn Object>` is itself an
/// `Object` with the box's type; pass `&*boxed` to dispatch on the contents.
pub trait Object: Any {
  fn type_key(&self) -> TypeKey;
  fn as_any(&self) -> &dyn Any;
}

impl<T: Any> Object for T {
  #[inline]
  fn type_key(&self) -> TypeKey {
    TypeKey::of::<T>()
  }

  #[inline]
  fn as_any(&self) -> &dyn Any {
    self
  }
}

impl fmt::Debug for dyn Object {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Object({})", self.type_key())
  }
}

/// First argument of a type or static dispatch call.
#[derive(Clone, Copy, Debug)]
pub enum Target<'a> {
  Type(TypeKey),
  Instance(&'a dyn Object),
}

impl<'a> Target<'a> {
  pub fn instance(value: &'a dyn Object) -> Self {
    Self::Instance(value)
  }

  /// The type resolution walks the ancestry of.
  pub fn type_key(&self) -> TypeKey {
    match *self {
      Self::Type(key) => key,
      Self::Instance(value) => value.type_key(),
    }
  }
}

impl From<TypeKey> for Target<'_> {
  fn from(key: TypeKey) -> Self {
    Self::Type(key)
  }
}

impl<'a, T: Any> From<&'a T> for Target<'a> {
  fn from(value: &'a T) -> Self {
    Self::Instance(value)
  }
}
