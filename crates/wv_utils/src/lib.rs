#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// no_std support

#[cfg(feature = "std")]
extern crate std;

// -----------------------------------------------------------------------------
// Modules

pub mod hash;

#[cfg(feature = "std")]
pub mod sync;
