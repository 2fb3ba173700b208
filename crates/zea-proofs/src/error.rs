//! Error types for the proving crate.

use std::path::PathBuf;

use zea_core::encoding::EncodingError;

/// Errors during parameter loading or generation. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// Reading or writing a parameter file failed.
    #[error("parameter file {path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// A parameter file did not decode.
    #[error("malformed parameter file {path}: {source}")]
    Malformed {
        /// The file involved.
        path: PathBuf,
        /// Underlying decode failure.
        #[source]
        source: std::io::Error,
    },
    /// Parameter generation failed during circuit synthesis.
    #[error("parameter generation failed: {0}")]
    Generation(#[from] bellman::SynthesisError),
    /// A circuit kind has no entry in the registry.
    #[error("no parameters loaded for circuit kind `{0}`")]
    MissingKind(crate::kind::CircuitKind),
}

/// Errors during proof creation.
#[derive(Debug, thiserror::Error)]
pub enum ProofError {
    /// The witness does not satisfy the circuit (e.g. a conservation
    /// violation); no proof is produced.
    #[error("proof creation failed: {0}")]
    Synthesis(#[from] bellman::SynthesisError),
}

/// Errors while turning a wire payload into a public-input vector.
#[derive(Debug, thiserror::Error)]
pub enum InstanceError {
    /// A field or point encoding in the payload is invalid.
    #[error("invalid instance encoding: {0}")]
    Encoding(#[from] EncodingError),
    /// The payload's slot count is not a supported circuit arity.
    #[error("unsupported arity {0}")]
    UnsupportedArity(usize),
    /// Input and output slot counts disagree.
    #[error("input/output arity mismatch: {inputs} inputs, {outputs} outputs")]
    ArityMismatch {
        /// Number of input slots.
        inputs: usize,
        /// Number of output slots.
        outputs: usize,
    },
}

/// Errors during proof verification.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    /// The proof blob is not a valid 192-byte Groth16 proof.
    #[error("proof decoding failed: {0}")]
    ProofDecoding(#[source] std::io::Error),
    /// The proof blob has the wrong length.
    #[error("proof blob is {0} bytes, expected 192")]
    ProofLength(usize),
    /// The instance could not be reconstructed from the payload.
    #[error(transparent)]
    Instance(#[from] InstanceError),
    /// The proof does not verify against the derived public inputs.
    #[error("proof does not verify")]
    InvalidProof,
}
