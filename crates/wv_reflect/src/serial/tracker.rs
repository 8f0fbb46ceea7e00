use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;

use wv_tree::{Document, NodeId};
use wv_utils::hash::HashMap;

use crate::value::{ObjectId, Value};

// -----------------------------------------------------------------------------
// SerializeTracker

/// The identity of a value that can be written once and referred to afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Identity {
    Object(ObjectId),
    Str(usize),
}

impl Identity {
    /// Strings only have an identity when `strings` is set.
    pub(crate) fn of(value: &Value, strings: bool) -> Option<Self> {
        match value {
            Value::Ref(id) => Some(Identity::Object(*id)),
            Value::Str(s) if strings => Some(Identity::Str(Arc::as_ptr(s).cast::<u8>().addr())),
            _ => None,
        }
    }
}

struct Written {
    node: NodeId,
    ref_id: Option<u64>,
}

/// Identities written during one serialize call.
///
/// Reference ids are handed out lazily: the first node of an identity only
/// receives its id attribute once a second occurrence refers to it.
#[derive(Default)]
pub(crate) struct SerializeTracker {
    written: HashMap<Identity, Written>,
    next_id: u64,
    // Keeps tracked strings alive so their addresses are not reused.
    pinned: Vec<Arc<str>>,
}

impl SerializeTracker {
    /// Records `value` as written to `node`, or returns the id of its earlier node.
    ///
    /// On the first repeat the earlier node receives `id_attribute`.
    pub(crate) fn refer(
        &mut self,
        identity: Identity,
        value: &Value,
        node: NodeId,
        doc: &mut Document,
        id_attribute: &str,
    ) -> Option<u64> {
        match self.written.get_mut(&identity) {
            Some(written) => {
                let id = match written.ref_id {
                    Some(id) => id,
                    None => {
                        self.next_id += 1;
                        let id = self.next_id;
                        written.ref_id = Some(id);
                        doc.set_attribute(written.node, id_attribute, id.to_string());
                        log::debug!("assigned reference id {id} to {identity:?}");
                        id
                    }
                };
                Some(id)
            }
            None => {
                if let Value::Str(s) = value {
                    self.pinned.push(s.clone());
                }
                self.written.insert(
                    identity,
                    Written {
                        node,
                        ref_id: None,
                    },
                );
                None
            }
        }
    }
}

// -----------------------------------------------------------------------------
// DeserializeTracker

/// Values registered under their reference id during one deserialize call.
#[derive(Default)]
pub(crate) struct DeserializeTracker {
    registered: HashMap<String, Value>,
}

impl DeserializeTracker {
    #[inline]
    pub(crate) fn register(&mut self, ref_id: &str, value: Value) {
        self.registered.insert(ref_id.into(), value);
    }

    #[inline]
    pub(crate) fn get(&self, ref_id: &str) -> Option<&Value> {
        self.registered.get(ref_id)
    }
}
