#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

pub mod info;
pub mod registry;
pub mod serial;
pub mod value;

// -----------------------------------------------------------------------------
// Macro exports

#[doc(hidden)]
pub mod __macro_exports {
    #[cfg(feature = "auto_register")]
    pub use inventory;
}

/// Submits a registration function, run by [`TypeRegistry::auto_register`].
///
/// Expands to nothing when the `auto_register` feature is disabled.
///
/// # Examples
///
/// ```
/// use wv_reflect::info::{FieldInfo, StructInfo, Ty};
/// use wv_reflect::registry::TypeRegistry;
///
/// fn register_player(registry: &mut TypeRegistry) {
///     registry.register(StructInfo::new("game::Player").with_field(FieldInfo::new("name", Ty::String)));
/// }
///
/// wv_reflect::submit_registration!(register_player);
/// ```
///
/// [`TypeRegistry::auto_register`]: crate::registry::TypeRegistry::auto_register
#[cfg(feature = "auto_register")]
#[macro_export]
macro_rules! submit_registration {
    ($register:path) => {
        $crate::__macro_exports::inventory::submit! {
            $crate::registry::AutoRegistration::new($register)
        }
    };
}

/// Submits a registration function, run by [`TypeRegistry::auto_register`].
///
/// Expands to nothing when the `auto_register` feature is disabled.
///
/// [`TypeRegistry::auto_register`]: crate::registry::TypeRegistry::auto_register
#[cfg(not(feature = "auto_register"))]
#[macro_export]
macro_rules! submit_registration {
    ($register:path) => {};
}
