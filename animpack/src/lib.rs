//! Compression codec for uniformly sampled skeletal animation clips.
//!
//! A clip (rotations and translations per bone, per frame) compresses into a
//! compact self-describing binary artifact; poses decompress back at any
//! time with bounded error. The crate is IO-free: it operates on in-memory
//! values and byte slices. The optional `json` feature adds a textual clip
//! frontend.

#![forbid(unsafe_code)]

mod algorithm;
mod artifact;
mod bitset;
mod compress;
mod decode;
mod error;
mod error_metric;
mod formats;
mod memory;
mod model;
mod packing;
mod stream;

#[cfg(feature = "json")]
pub mod json;

pub use algorithm::*;
pub use artifact::{ClipHeader, ClipView, CompressedClip, INVALID_OFFSET};
pub use decode::*;
pub use error::*;
pub use error_metric::*;
pub use formats::*;
pub use memory::*;
pub use model::*;

#[cfg(test)]
mod packing_tests;

#[cfg(test)]
mod compress_tests;
