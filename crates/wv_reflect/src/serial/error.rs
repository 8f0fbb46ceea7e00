use alloc::string::{String, ToString};
use core::fmt::Display;

use thiserror::Error;

use crate::registry::RegistryError;
use crate::value::ObjectId;

// -----------------------------------------------------------------------------
// ArgumentError

/// A surrogate-table operation received an unusable type name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ArgumentError {
    #[error("type name is empty")]
    EmptyTypeName,

    #[error("`{0}` is not a valid type name")]
    MalformedTypeName(String),
}

// -----------------------------------------------------------------------------
// SerializeError

/// An object graph could not be encoded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SerializeError {
    #[error("object {0:?} is not in the heap")]
    DanglingObject(ObjectId),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("cannot serialize {0}")]
    Unsupported(String),

    /// Raised by application surrogates.
    #[error("{0}")]
    Custom(String),
}

impl SerializeError {
    /// Creates a [`SerializeError::Custom`].
    #[inline]
    pub fn custom(msg: impl Display) -> Self {
        Self::Custom(msg.to_string())
    }
}

// -----------------------------------------------------------------------------
// DeserializeError

/// A tree could not be decoded into an object graph.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeserializeError {
    #[error("document has no root node")]
    EmptyDocument,

    #[error("node `{0}` carries no type and none is expected")]
    MissingType(String),

    #[error("reference `{0}` does not name an earlier node")]
    UnknownReference(String),

    #[error("condensed text cannot hold elements of type `{0}`")]
    CondensedNonPrimitive(String),

    #[error("`{text}` is not a valid `{ty}`")]
    InvalidPrimitive { ty: String, text: String },

    #[error("`{text}` is not a value of enum `{ty}`")]
    InvalidEnum { ty: String, text: String },

    #[error("attribute `{name}` has invalid value `{value}`")]
    InvalidArrayAttribute { name: String, value: String },

    #[error("index `{index}` is out of range for `{ty}`")]
    IndexOutOfRange { index: String, ty: String },

    #[error("expected {expected} array dimensions, found {found}")]
    RankMismatch { expected: usize, found: usize },

    #[error("working object is already set")]
    AlreadySet,

    #[error("expected a `{expected}`, found a `{found}`")]
    TypeMismatch { expected: String, found: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Raised by application surrogates.
    #[error("{0}")]
    Custom(String),
}

impl DeserializeError {
    /// Creates a [`DeserializeError::Custom`].
    #[inline]
    pub fn custom(msg: impl Display) -> Self {
        Self::Custom(msg.to_string())
    }
}
