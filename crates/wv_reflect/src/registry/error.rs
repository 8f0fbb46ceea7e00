use alloc::string::String;

use thiserror::Error;

// -----------------------------------------------------------------------------
// RegistryError

/// A type declaration could not be turned into metadata.
///
/// Declarations are validated lazily: these errors surface the first time
/// the metadata of an affected type is requested, not at registration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistryError {
    #[error("type `{0}` is not registered")]
    UnknownType(String),

    #[error("type `{0}` is not a struct")]
    NotAStruct(String),

    #[error("type `{0}` declares more than one implicit serializer")]
    AmbiguousImplicitSerializer(String),

    #[error("type `{0}` declares more than one implicit deserializer")]
    AmbiguousImplicitDeserializer(String),

    #[error("field `{field}` of `{ty}` is declared more than once along its base chain")]
    DuplicateField { ty: String, field: String },

    #[error("base chain of `{0}` is cyclic")]
    BaseCycle(String),
}
