//! Proof creation and encoding.

use bellman::Circuit;
use bellman::groth16::{Proof, create_random_proof};
use bls12_381::{Bls12, Scalar};
use rand::RngCore;

use crate::error::{ProofError, VerificationError};
use crate::registry::CircuitParams;

/// Size in bytes of an encoded Groth16 proof (compressed A, B, C).
pub const GROTH_PROOF_SIZE: usize = 192;

/// Create a proof for any of the ZEA circuits.
///
/// # Errors
/// Fails when the witness does not satisfy the circuit (for example a
/// conservation violation); nothing is emitted in that case.
pub fn create_proof<C: Circuit<Scalar>>(
    params: &CircuitParams,
    circuit: C,
    rng: &mut impl RngCore,
) -> Result<Proof<Bls12>, ProofError> {
    Ok(create_random_proof(circuit, &params.params, rng)?)
}

/// Encode a proof to its 192-byte wire form.
///
/// # Panics
/// Panics if the proof cannot be serialized (should never happen with
/// valid proofs).
#[must_use]
pub fn encode_proof(proof: &Proof<Bls12>) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(GROTH_PROOF_SIZE);
    proof
        .write(&mut bytes)
        .expect("should be able to serialize a proof");
    bytes
}

/// Decode a proof from its wire form.
///
/// # Errors
/// Rejects blobs of the wrong length or with invalid group encodings.
pub fn decode_proof(bytes: &[u8]) -> Result<Proof<Bls12>, VerificationError> {
    if bytes.len() != GROTH_PROOF_SIZE {
        return Err(VerificationError::ProofLength(bytes.len()));
    }
    Proof::read(bytes).map_err(VerificationError::ProofDecoding)
}
