#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use wv_reflect as reflect;
pub use wv_tree as tree;
pub use wv_utils as utils;
