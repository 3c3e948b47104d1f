//! Decoder for legacy Spine 2.x binary skeleton exports (unofficial).
//!
//! Produces a [`SkeletonDocument`]: bones, IK constraints, slots, skins,
//! events and keyframed animations, with cross references resolved to names.
//! Writing the document back out is left to the caller; with the `serde`
//! feature every document type implements `serde::Serialize` using the
//! interchange field names.

#![forbid(unsafe_code)]

mod error;
mod model;
mod options;

pub mod binary;

pub use error::*;
pub use model::*;
pub use options::*;
