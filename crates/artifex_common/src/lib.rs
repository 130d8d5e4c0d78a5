//! Shared foundational types used across the artifex build engine.
//!
//! This crate provides content hashing, modification-time stamps, file
//! fingerprints, and lexical path normalization.

#![warn(missing_docs)]

pub mod fingerprint;
pub mod hash;
pub mod path;

pub use fingerprint::{Fingerprint, ModTime};
pub use hash::ContentHash;
pub use path::normalize;
