//! Proof verification.

use bellman::groth16::verify_proof;
use bls12_381::Scalar;

use crate::error::VerificationError;
use crate::prover::decode_proof;
use crate::registry::CircuitParams;

/// Verify a wire proof blob against an ordered public-input vector.
///
/// # Errors
/// Rejects undecodable blobs and proofs that do not verify.
pub fn verify_proof_bytes(
    params: &CircuitParams,
    proof: &[u8],
    inputs: &[Scalar],
) -> Result<(), VerificationError> {
    let proof = decode_proof(proof)?;
    verify_proof(&params.pvk, &proof, inputs).map_err(|_| VerificationError::InvalidProof)
}
