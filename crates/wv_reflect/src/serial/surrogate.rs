use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use wv_tree::NodeId;

use super::{DeserializeError, Deserializer, SerializeError, Serializer, WorkingObject};
use crate::info::Ty;
use crate::value::Value;

// -----------------------------------------------------------------------------
// Hooks

/// A type's own serialization entry point, declared with
/// [`StructInfo::with_implicit_serializer`](crate::info::StructInfo::with_implicit_serializer).
///
/// Returns `true` when the value is fully written to the node.
pub type ImplicitSerializeFn =
    fn(value: &Value, node: NodeId, ser: &mut Serializer<'_>) -> Result<bool, SerializeError>;

/// A type's own deserialization entry point, declared with
/// [`StructInfo::with_implicit_deserializer`](crate::info::StructInfo::with_implicit_deserializer).
///
/// Returns `true` when the working object is fully populated.
pub type ImplicitDeserializeFn = fn(
    working: &mut WorkingObject,
    node: NodeId,
    de: &mut Deserializer<'_>,
) -> Result<bool, DeserializeError>;

// -----------------------------------------------------------------------------
// Surrogate

/// An external handler taking over part or all of a type's (de)serialization.
///
/// Registered on a [`SerializationContext`](super::SerializationContext) for an
/// exact type. Returning `Ok(true)` reports the value as fully handled, the
/// engine then skips every later handler and its default walk. `Ok(false)`
/// lets the engine continue, possibly with a working object the surrogate
/// already set.
///
/// Both methods decline by default, so a surrogate may implement a single
/// direction.
///
/// # Examples
///
/// ```
/// use wv_reflect::info::Ty;
/// use wv_reflect::serial::{SerializeError, Serializer, Surrogate};
/// use wv_reflect::value::Value;
/// use wv_tree::NodeId;
///
/// struct Shout;
///
/// impl Surrogate for Shout {
///     fn serialize(
///         &self,
///         value: &Value,
///         _declared: &Ty,
///         node: NodeId,
///         ser: &mut Serializer<'_>,
///     ) -> Result<bool, SerializeError> {
///         let text = value.as_str().map_err(SerializeError::custom)?.to_uppercase();
///         ser.document_mut().set_text(node, text);
///         Ok(true)
///     }
/// }
/// ```
pub trait Surrogate: Send + Sync {
    #[inline]
    fn serialize(
        &self,
        value: &Value,
        declared: &Ty,
        node: NodeId,
        ser: &mut Serializer<'_>,
    ) -> Result<bool, SerializeError> {
        let _ = (value, declared, node, ser);
        Ok(false)
    }

    #[inline]
    fn deserialize(
        &self,
        working: &mut WorkingObject,
        node: NodeId,
        de: &mut Deserializer<'_>,
    ) -> Result<bool, DeserializeError> {
        let _ = (working, node, de);
        Ok(false)
    }
}

// -----------------------------------------------------------------------------
// SurrogateChain

/// The surrogates registered for one type, in registration order.
///
/// Every handler runs on every call, whatever the others report.
/// The chain reports `true` if any handler did.
#[derive(Clone, Default)]
pub struct SurrogateChain {
    handlers: Vec<Arc<dyn Surrogate>>,
}

impl SurrogateChain {
    #[inline]
    pub const fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Appends a handler.
    #[inline]
    pub fn push(&mut self, handler: Arc<dyn Surrogate>) {
        self.handlers.push(handler);
    }

    /// Builder form of [`push`](Self::push).
    #[inline]
    pub fn with(mut self, handler: Arc<dyn Surrogate>) -> Self {
        self.push(handler);
        self
    }

    /// Appends the handlers of `b` to those of `a`.
    ///
    /// A missing side leaves the other unchanged.
    pub fn combine(a: Option<SurrogateChain>, b: Option<SurrogateChain>) -> Option<SurrogateChain> {
        match (a, b) {
            (Some(mut a), Some(b)) => {
                a.handlers.extend(b.handlers);
                Some(a)
            }
            (a, None) => a,
            (None, b) => b,
        }
    }

    #[inline]
    pub fn handlers(&self) -> &[Arc<dyn Surrogate>] {
        &self.handlers
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl From<Arc<dyn Surrogate>> for SurrogateChain {
    #[inline]
    fn from(value: Arc<dyn Surrogate>) -> Self {
        Self::new().with(value)
    }
}

impl Surrogate for SurrogateChain {
    fn serialize(
        &self,
        value: &Value,
        declared: &Ty,
        node: NodeId,
        ser: &mut Serializer<'_>,
    ) -> Result<bool, SerializeError> {
        let mut handled = false;
        for handler in &self.handlers {
            handled |= handler.serialize(value, declared, node, ser)?;
        }
        Ok(handled)
    }

    fn deserialize(
        &self,
        working: &mut WorkingObject,
        node: NodeId,
        de: &mut Deserializer<'_>,
    ) -> Result<bool, DeserializeError> {
        let mut handled = false;
        for handler in &self.handlers {
            handled |= handler.deserialize(working, node, de)?;
        }
        Ok(handled)
    }
}

impl fmt::Debug for SurrogateChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurrogateChain")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
