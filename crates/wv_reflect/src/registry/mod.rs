//! Type registry and the per-type metadata cache.
//!
//! ## Menu
//!
//! - [`TypeRegistry`]: stores [`TypeInfo`] declarations and lazily builds [`TypeMetadata`].
//! - [`TypeRegistryArc`]: a cloneable, lock-protected handle to a shared registry.
//! - [`TypeMetadata`] / [`FieldDescriptor`]: the resolved serializable fields of a struct level.
//! - [`RegistryError`]: a declaration that cannot be turned into metadata.
//!
//! ## auto_register
//!
//! See [`TypeRegistry::auto_register`].
//!
//! Declarations submitted through [`submit_registration!`](crate::submit_registration)
//! are collected with the `inventory` crate. Platforms without support for it
//! simply collect nothing.
//!
//! [`TypeInfo`]: crate::info::TypeInfo

// -----------------------------------------------------------------------------
// Modules

mod error;
mod type_metadata;
mod type_registry;

// -----------------------------------------------------------------------------
// Exports

pub use error::RegistryError;
pub use type_metadata::{FieldDescriptor, TypeMetadata};
pub use type_registry::{TypeRegistry, TypeRegistryArc};

#[cfg(feature = "auto_register")]
pub use type_registry::AutoRegistration;
