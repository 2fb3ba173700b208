//! In-circuit MiMC.
//!
//! Mirrors `zea_core::mimc` constraint for constraint: the same round
//! constants, the x^5 round function with a final key addition, and
//! Miyaguchi-Preneel chaining. Each round costs three constraints (two
//! squarings and one multiplication); the round input `t + k + c` is a
//! linear combination and needs no extra variable.

use bellman::gadgets::num::AllocatedNum;
use bellman::{ConstraintSystem, SynthesisError};
use bls12_381::Scalar;
use zea_core::mimc::round_constants;

#[allow(
    clippy::arithmetic_side_effects,
    reason = "R1CS constraint building uses +/- operators for linear combinations"
)]
fn mimc_round<CS: ConstraintSystem<Scalar>>(
    mut cs: CS,
    t: &AllocatedNum<Scalar>,
    key: &AllocatedNum<Scalar>,
    c: Scalar,
) -> Result<AllocatedNum<Scalar>, SynthesisError> {
    let u_value = t
        .get_value()
        .and_then(|t| key.get_value().map(|k| t + k + c));

    let square = AllocatedNum::alloc(cs.namespace(|| "u^2"), || {
        u_value.map(|u| u.square()).ok_or(SynthesisError::AssignmentMissing)
    })?;
    cs.enforce(
        || "u * u = u^2",
        |lc| lc + t.get_variable() + key.get_variable() + (c, CS::one()),
        |lc| lc + t.get_variable() + key.get_variable() + (c, CS::one()),
        |lc| lc + square.get_variable(),
    );

    let quad = square.square(cs.namespace(|| "u^4"))?;

    let fifth = AllocatedNum::alloc(cs.namespace(|| "u^5"), || {
        u_value
            .map(|u| u.square().square() * u)
            .ok_or(SynthesisError::AssignmentMissing)
    })?;
    cs.enforce(
        || "u^4 * u = u^5",
        |lc| lc + quad.get_variable(),
        |lc| lc + t.get_variable() + key.get_variable() + (c, CS::one()),
        |lc| lc + fifth.get_variable(),
    );

    Ok(fifth)
}

/// The keyed MiMC permutation `E_k(m)` as a gadget.
///
/// # Errors
/// Returns `SynthesisError` if constraint synthesis fails.
#[allow(
    clippy::arithmetic_side_effects,
    reason = "R1CS constraint building uses +/- operators for linear combinations"
)]
pub fn mimc_encrypt<CS: ConstraintSystem<Scalar>>(
    mut cs: CS,
    msg: &AllocatedNum<Scalar>,
    key: &AllocatedNum<Scalar>,
) -> Result<AllocatedNum<Scalar>, SynthesisError> {
    let mut t = msg.clone();
    for (i, c) in round_constants().iter().enumerate() {
        t = mimc_round(cs.namespace(|| format!("round {i}")), &t, key, *c)?;
    }

    // Final key addition.
    let out = AllocatedNum::alloc(cs.namespace(|| "keyed output"), || {
        t.get_value()
            .and_then(|t| key.get_value().map(|k| t + k))
            .ok_or(SynthesisError::AssignmentMissing)
    })?;
    cs.enforce(
        || "t + k = out",
        |lc| lc + t.get_variable() + key.get_variable(),
        |lc| lc + CS::one(),
        |lc| lc + out.get_variable(),
    );
    Ok(out)
}

/// Incremental in-circuit MiMC hash state (Miyaguchi-Preneel mode).
pub struct MimcGadget {
    state: AllocatedNum<Scalar>,
}

impl MimcGadget {
    /// A fresh hasher whose state is constrained to zero.
    ///
    /// # Errors
    /// Returns `SynthesisError` if constraint synthesis fails.
    #[allow(
        clippy::arithmetic_side_effects,
        reason = "R1CS constraint building uses +/- operators for linear combinations"
    )]
    pub fn new<CS: ConstraintSystem<Scalar>>(mut cs: CS) -> Result<Self, SynthesisError> {
        let state = AllocatedNum::alloc(cs.namespace(|| "initial state"), || Ok(Scalar::zero()))?;
        cs.enforce(
            || "initial state is zero",
            |lc| lc + state.get_variable(),
            |lc| lc + CS::one(),
            |lc| lc,
        );
        Ok(Self { state })
    }

    /// Absorb one element.
    ///
    /// # Errors
    /// Returns `SynthesisError` if constraint synthesis fails.
    #[allow(
        clippy::arithmetic_side_effects,
        reason = "R1CS constraint building uses +/- operators for linear combinations"
    )]
    pub fn update<CS: ConstraintSystem<Scalar>>(
        &mut self,
        mut cs: CS,
        msg: &AllocatedNum<Scalar>,
    ) -> Result<(), SynthesisError> {
        let encrypted = mimc_encrypt(cs.namespace(|| "permutation"), msg, &self.state)?;

        let next = AllocatedNum::alloc(cs.namespace(|| "state"), || {
            encrypted
                .get_value()
                .and_then(|e| self.state.get_value().map(|h| (e, h)))
                .and_then(|(e, h)| msg.get_value().map(|m| e + h + m))
                .ok_or(SynthesisError::AssignmentMissing)
        })?;
        cs.enforce(
            || "miyaguchi-preneel chaining",
            |lc| lc + encrypted.get_variable() + self.state.get_variable() + msg.get_variable(),
            |lc| lc + CS::one(),
            |lc| lc + next.get_variable(),
        );
        self.state = next;
        Ok(())
    }

    /// Squeeze the digest.
    #[must_use]
    pub fn finalize(self) -> AllocatedNum<Scalar> {
        self.state
    }
}

/// `H(x_1, ..., x_n)` as a gadget.
///
/// # Errors
/// Returns `SynthesisError` if constraint synthesis fails.
pub fn mimc_hash<CS: ConstraintSystem<Scalar>>(
    mut cs: CS,
    inputs: &[AllocatedNum<Scalar>],
) -> Result<AllocatedNum<Scalar>, SynthesisError> {
    let mut h = MimcGadget::new(cs.namespace(|| "state init"))?;
    for (i, x) in inputs.iter().enumerate() {
        h.update(cs.namespace(|| format!("absorb {i}")), x)?;
    }
    Ok(h.finalize())
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
    use rand_core::SeedableRng as _;
    use rand_xorshift::XorShiftRng;
    use zea_core::mimc;

    use super::*;

    #[test]
    fn gadget_matches_native_hash() {
        let mut rng = XorShiftRng::from_seed([21_u8; 16]);

        for len in 1..=6 {
            let inputs: Vec<Scalar> = (0..len).map(|_| Scalar::random(&mut rng)).collect();
            let expected = mimc::hash(&inputs);

            let mut cs = TestConstraintSystem::<Scalar>::new();
            let allocated: Vec<AllocatedNum<Scalar>> = inputs
                .iter()
                .enumerate()
                .map(|(i, x)| {
                    AllocatedNum::alloc(cs.namespace(|| format!("input {i}")), || Ok(*x)).unwrap()
                })
                .collect();
            let digest = mimc_hash(cs.namespace(|| "hash"), &allocated).unwrap();

            assert!(cs.is_satisfied());
            assert_eq!(digest.get_value().unwrap(), expected);
        }
    }

    #[test]
    fn gadget_matches_native_permutation() {
        let mut rng = XorShiftRng::from_seed([22_u8; 16]);
        let key = Scalar::random(&mut rng);
        let msg = Scalar::random(&mut rng);

        let mut cs = TestConstraintSystem::<Scalar>::new();
        let key_var = AllocatedNum::alloc(cs.namespace(|| "key"), || Ok(key)).unwrap();
        let msg_var = AllocatedNum::alloc(cs.namespace(|| "msg"), || Ok(msg)).unwrap();
        let out = mimc_encrypt(cs.namespace(|| "encrypt"), &msg_var, &key_var).unwrap();

        assert!(cs.is_satisfied());
        assert_eq!(out.get_value().unwrap(), mimc::encrypt(key, msg));
        // Three constraints per round plus the final key addition.
        assert_eq!(cs.num_constraints(), 3 * mimc::MIMC_ROUNDS + 1);
    }
}
