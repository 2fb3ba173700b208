//! Core primitives for the ZEA protocol.
//!
//! This crate holds everything both sides of a proof must agree on byte for
//! byte: the native MiMC hash, note commitments and serial numbers, the
//! Diffie-Hellman session records, the mask-chain stream cipher, canonical
//! byte encodings, and the wire payload models.

/// Foundational primitive types and helpers shared across crates.
pub mod base;
/// Wire payload models used across the workspace.
pub mod schema;

pub use base::{cipher, dh, encoding, keys, mimc, note};
