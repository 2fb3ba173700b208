//! Groth16 proving and verification for the ZEA circuits.
//!
//! One registry owns the per-kind parameters (loaded from disk or
//! generated once), the instance types turn wire payloads into ordered
//! public-input vectors, and thin prover/verifier wrappers produce and
//! check 192-byte proof blobs.

mod error;
/// Public-input assembly per circuit kind.
pub mod instance;
/// Circuit kind enumeration and parameter-cache layout.
pub mod kind;
/// Proof creation and encoding.
pub mod prover;
/// Parameter registry and on-disk cache.
pub mod registry;
/// Proof decoding and verification.
pub mod verifier;


pub use error::{InstanceError, ProofError, SetupError, VerificationError};
pub use kind::CircuitKind;
pub use registry::{CircuitParams, ParamsRegistry};
