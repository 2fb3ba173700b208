//! Base cryptographic primitives.

/// Mask-chain stream cipher over the outer scalar field.
pub mod cipher;
/// Diffie-Hellman sessions on the inner curve.
pub mod dh;
/// Canonical byte encodings for field elements and curve points.
pub mod encoding;
/// Spending keys and derived owner identifiers.
pub mod keys;
/// Native MiMC hash and PRF.
pub mod mimc;
/// Notes, commitments and serial numbers.
pub mod note;
