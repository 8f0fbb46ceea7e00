#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod document;
mod error;
mod xml;

// -----------------------------------------------------------------------------
// Top-level exports

pub use document::{Document, Node, NodeId};
pub use error::TreeError;
