//! Circuit gadgets shared by the transfer, register and auction circuits.

mod cipher;
mod dh;
mod mimc;

pub use cipher::expose_encryption;
pub use dh::{DhAssignment, DhPoints, DhRole, witness_dh};
pub use mimc::{MimcGadget, mimc_encrypt, mimc_hash};

use bellman::gadgets::num::AllocatedNum;
use bellman::{ConstraintSystem, SynthesisError};
use bls12_381::Scalar;

/// Allocate a witness value and immediately expose it as a public input.
pub(crate) fn alloc_public<CS: ConstraintSystem<Scalar>>(
    mut cs: CS,
    value: Option<Scalar>,
) -> Result<AllocatedNum<Scalar>, SynthesisError> {
    let num = AllocatedNum::alloc(cs.namespace(|| "value"), || {
        value.ok_or(SynthesisError::AssignmentMissing)
    })?;
    num.inputize(cs.namespace(|| "input"))?;
    Ok(num)
}

/// Allocate a private witness value.
pub(crate) fn alloc_private<CS: ConstraintSystem<Scalar>>(
    mut cs: CS,
    value: Option<Scalar>,
) -> Result<AllocatedNum<Scalar>, SynthesisError> {
    AllocatedNum::alloc(cs.namespace(|| "value"), || {
        value.ok_or(SynthesisError::AssignmentMissing)
    })
}

/// Enforce equality of two allocated numbers.
#[allow(
    clippy::arithmetic_side_effects,
    reason = "R1CS constraint building uses +/- operators for linear combinations"
)]
pub(crate) fn enforce_equal<CS: ConstraintSystem<Scalar>>(
    cs: &mut CS,
    annotation: &str,
    a: &AllocatedNum<Scalar>,
    b: &AllocatedNum<Scalar>,
) {
    cs.enforce(
        || annotation.to_owned(),
        |lc| lc + a.get_variable() - b.get_variable(),
        |lc| lc + CS::one(),
        |lc| lc,
    );
}
