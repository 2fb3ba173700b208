//! In-circuit mask-chain encryption.
//!
//! Rebuilds the mask chain `t_1 = H(S.u, S.v)`, `t_{j+1} = H(t_j)` from the
//! witnessed shared point and exposes each `c_j = m_j + t_j` as a public
//! input, in schedule order. Used both to prove a fresh encryption
//! (transfer, register) and to prove decryption consistency (auction): the
//! ciphertext of the witnessed plaintext must reproduce the public one.

use bellman::gadgets::num::AllocatedNum;
use bellman::{ConstraintSystem, SynthesisError};
use bls12_381::Scalar;
use sapling::circuit::ecc::EdwardsPoint;

use crate::gadgets::mimc::mimc_hash;

/// Expose the mask-chain encryption of `plaintext` under `shared` as
/// consecutive public inputs. Returns nothing; the ciphertext exists only
/// in the public input vector.
///
/// # Errors
/// Returns `SynthesisError` if constraint synthesis fails.
#[allow(
    clippy::arithmetic_side_effects,
    reason = "R1CS constraint building uses +/- operators for linear combinations"
)]
pub fn expose_encryption<CS: ConstraintSystem<Scalar>>(
    mut cs: CS,
    shared: &EdwardsPoint,
    plaintext: &[AllocatedNum<Scalar>],
) -> Result<(), SynthesisError> {
    // t_1 = H(S.u, S.v)
    let mut mask = mimc_hash(
        cs.namespace(|| "mask 0"),
        &[shared.get_u().clone(), shared.get_v().clone()],
    )?;

    for (j, msg) in plaintext.iter().enumerate() {
        let cipher = AllocatedNum::alloc(cs.namespace(|| format!("ciphertext {j}")), || {
            msg.get_value()
                .and_then(|m| mask.get_value().map(|t| m + t))
                .ok_or(SynthesisError::AssignmentMissing)
        })?;
        cipher.inputize(cs.namespace(|| format!("ciphertext {j} input")))?;
        cs.enforce(
            || format!("ciphertext {j} masks plaintext"),
            |lc| lc + msg.get_variable() + mask.get_variable(),
            |lc| lc + CS::one(),
            |lc| lc + cipher.get_variable(),
        );

        // t_{j+1} = H(t_j); the last chain step is only needed for the
        // next element.
        if j + 1 < plaintext.len() {
            mask = mimc_hash(cs.namespace(|| format!("mask {}", j + 1)), &[mask.clone()])?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::arithmetic_side_effects,
        reason = "unit-test"
    )]

    use bellman::gadgets::test::TestConstraintSystem;
    use ff::Field as _;
    use group::Group as _;
    use rand_core::SeedableRng as _;
    use rand_xorshift::XorShiftRng;
    use zea_core::cipher;

    use super::*;

    #[test]
    fn circuit_ciphertext_matches_native() {
        let mut rng = XorShiftRng::from_seed([31_u8; 16]);
        let shared = jubjub::ExtendedPoint::from(jubjub::SubgroupPoint::random(&mut rng));
        let plaintext: [Scalar; 5] = core::array::from_fn(|_| Scalar::random(&mut rng));
        let expected = cipher::encrypt(&shared, &plaintext);

        let mut cs = TestConstraintSystem::<Scalar>::new();
        let shared_var =
            EdwardsPoint::witness(cs.namespace(|| "shared"), Some(shared)).unwrap();
        let plain_vars: Vec<AllocatedNum<Scalar>> = plaintext
            .iter()
            .enumerate()
            .map(|(i, m)| {
                AllocatedNum::alloc(cs.namespace(|| format!("plain {i}")), || Ok(*m)).unwrap()
            })
            .collect();

        expose_encryption(cs.namespace(|| "encrypt"), &shared_var, &plain_vars).unwrap();

        assert!(cs.is_satisfied());
        // Public inputs: ONE plus the five ciphertext elements, in order.
        assert_eq!(cs.num_inputs(), 6);
        for (j, c) in expected.iter().enumerate() {
            assert_eq!(
                cs.get_input(j + 1, &format!("encrypt/ciphertext {j} input/input variable")),
                *c
            );
        }
    }
}
