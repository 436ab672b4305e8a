//! # the-interface
//!
//! Open, runtime-extensible single dispatch.
//!
//! Operations are grouped into interfaces. Implementations can be attached to
//! any `'static` type after the fact, and a call picks the implementation
//! registered for the nearest ancestor of the receiver's runtime type.
//!
//! ## Core Concepts
//!
//! - **Type hierarchy**: Rust has no inheritance, so ancestry is declared
//!   explicitly in a [`TypeHierarchy`] and linearized the way C3 does it
//! - **Slots**: One dispatchable operation with its own registration table,
//!   an optional default and one of three call conventions
//! - **Interfaces**: A named, fixed set of slots. Types join in bulk, either
//!   as virtual members (out-of-band registration) or as native members whose
//!   implementations override any registration
//! - **Lock-free reads**: Resolution reads an immutable snapshot; writers are
//!   serialized and publish a new table
//!
//! ## Basic Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use the_interface::{
//!   Impls,
//!   Implementation,
//!   InterfaceDefinition,
//!   SlotDecl,
//!   TypeDecl,
//!   TypeHierarchy,
//! };
//!
//! struct Animal {
//!   name: &'static str,
//! }
//!
//! struct Dog {
//!   animal: Animal,
//! }
//!
//! let hierarchy = TypeHierarchy::new();
//! hierarchy
//!   .declare(TypeDecl::<Dog>::of().base::<Animal>(|dog| &dog.animal))
//!   .unwrap();
//!
//! let speak = InterfaceDefinition::builder("Speak", Arc::new(hierarchy))
//!   .slot(
//!     SlotDecl::<(), String>::method("speak")
//!       .default(Implementation::method_dyn(|_, ()| "...".to_string())),
//!   )
//!   .build()
//!   .unwrap();
//!
//! speak
//!   .implement_for::<Animal>(Impls::new().with(
//!     "speak",
//!     Implementation::method(|animal: &Animal, ()| format!("{} makes a sound", animal.name)),
//!   ))
//!   .unwrap();
//!
//! let rex = Dog {
//!   animal: Animal { name: "Rex" },
//! };
//! assert_eq!(speak.call::<(), String>("speak", &rex, ()).unwrap(), "Rex makes a sound");
//! assert_eq!(speak.call::<(), String>("speak", &3_u8, ()).unwrap(), "...");
//! assert!(speak.is_instance(&rex));
//! ```
//!
//! ## Declarative Interfaces
//!
//! The [`interface!`] macro generates a typed wrapper with one method per
//! operation:
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use the_interface::{
//!   Impls,
//!   Implementation,
//!   Object,
//!   TypeHierarchy,
//!   interface,
//! };
//!
//! struct Widget;
//!
//! interface! {
//!   Factory {
//!     class make: () => Box<dyn Object>,
//!   }
//! }
//!
//! let factory = FactoryInterface::new(Arc::new(TypeHierarchy::new())).unwrap();
//! factory
//!   .definition()
//!   .implement_for::<Widget>(Impls::new().with(
//!     "make",
//!     Implementation::class(|_, ()| Box::new(Widget) as Box<dyn Object>),
//!   ))
//!   .unwrap();
//!
//! let made = factory.make(&Widget, ()).unwrap();
//! assert!((*made).as_any().is::<Widget>());
//! assert!(factory.make(&0_u8, ()).is_err());
//! ```
//!
//! ## Configuration
//!
//! [`DispatchConfig`] controls what happens when a type is registered twice
//! for the same operation. It can be read from TOML:
//!
//! ```rust
//! use the_interface::{
//!   DispatchConfig,
//!   OverwritePolicy,
//! };
//!
//! let config = DispatchConfig::from_toml("overwrite = \"reject\"").unwrap();
//! assert_eq!(config.overwrite, OverwritePolicy::Reject);
//! ```

mod ancestry;
mod config;
mod define;
mod error;
mod function;
mod interface;
mod key;
mod slot;
mod table;

pub use ancestry::{
  Ancestry,
  TypeDecl,
  TypeHierarchy,
};
pub use config::{
  DispatchConfig,
  OverwritePolicy,
};
pub use error::{
  DispatchError,
  Result,
};
pub use function::DispatchFn;
pub use interface::{
  Impls,
  InterfaceBuilder,
  InterfaceDefinition,
  SlotDecl,
};
pub use key::{
  Object,
  Target,
  TypeKey,
};
pub use paste;
pub use slot::{
  CallConvention,
  Implementation,
  Resolution,
  Slot,
};
pub use table::{
  DispatchTable,
  Resolved,
  Source,
};
