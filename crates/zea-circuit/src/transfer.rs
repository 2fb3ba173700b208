//! The transfer circuit family: N consumed notes to N minted notes.
//!
//! Public inputs, in order: for each input slot i `(old_coins_i,
//! old_energy_i, cm_old_i, sn_old_i, pk_old_i)`; for each output slot j
//! `(new_coins_j, new_energy_j, cm_new_j, c_new_j[0..6])`; then the
//! exchange points `G, G*b, G*r` as affine `(u, v)` pairs. The sender
//! proves with its ephemeral secret `r`.
//!
//! N is a compile-time parameter; each arity is a distinct circuit kind
//! with its own Groth16 parameters.

use bellman::gadgets::num::AllocatedNum;
use bellman::{Circuit, ConstraintSystem, SynthesisError};
use bls12_381::Scalar;

use crate::gadgets::{
    DhAssignment, DhRole, alloc_private, alloc_public, enforce_equal, expose_encryption,
    mimc_hash, witness_dh,
};

/// Witness assignment for one consumed note.
#[derive(Debug, Clone, Copy, Default)]
pub struct OldNoteAssignment {
    /// Coin amount (public).
    pub coins: Option<Scalar>,
    /// Energy amount (public).
    pub energy: Option<Scalar>,
    /// Note commitment (public).
    pub cm: Option<Scalar>,
    /// Revealed serial number (public).
    pub sn: Option<Scalar>,
    /// Owner identifier (public).
    pub pk: Option<Scalar>,
    /// Spending key (private).
    pub sk: Option<Scalar>,
    /// Nullifier seed (private).
    pub rho: Option<Scalar>,
    /// Commitment randomness (private).
    pub rcm: Option<Scalar>,
}

/// Witness assignment for one minted note.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewNoteAssignment {
    /// Coin amount (public).
    pub coins: Option<Scalar>,
    /// Energy amount (public).
    pub energy: Option<Scalar>,
    /// Note commitment (public).
    pub cm: Option<Scalar>,
    /// Recipient owner identifier (private; travels only encrypted).
    pub pk: Option<Scalar>,
    /// Nullifier seed (private).
    pub rho: Option<Scalar>,
    /// Commitment randomness (private).
    pub rcm: Option<Scalar>,
}

/// Instance of the N-to-N transfer circuit.
#[derive(Debug, Clone)]
pub struct TransferCircuit<const N: usize> {
    /// Consumed note slots.
    pub old: [OldNoteAssignment; N],
    /// Minted note slots.
    pub new: [NewNoteAssignment; N],
    /// The sender's exchange witness (`secret` is `r`).
    pub dh: DhAssignment,
}

impl<const N: usize> TransferCircuit<N> {
    /// An unassigned instance, used for parameter generation.
    #[must_use]
    pub fn blank() -> Self {
        Self {
            old: [OldNoteAssignment::default(); N],
            new: [NewNoteAssignment::default(); N],
            dh: DhAssignment::default(),
        }
    }

    /// Number of public inputs this arity exposes (excluding the
    /// constant-one input).
    #[allow(
        clippy::arithmetic_side_effects,
        reason = "N is at most 3; the count cannot overflow"
    )]
    #[must_use]
    pub const fn public_input_len() -> usize {
        // 5 per input slot, 9 per output slot, 6 point coordinates.
        14 * N + 6
    }
}

#[allow(
    clippy::arithmetic_side_effects,
    reason = "R1CS constraint building uses +/- operators for linear combinations"
)]
impl<const N: usize> Circuit<Scalar> for TransferCircuit<N> {
    fn synthesize<CS: ConstraintSystem<Scalar>>(self, cs: &mut CS) -> Result<(), SynthesisError> {
        // Witness the exchange first; its points are exposed last so the
        // slot fields stay at the head of the input vector.
        let dh = witness_dh(cs.namespace(|| "dh"), &self.dh, DhRole::Initiator)?;

        let mut old_coins_vars = Vec::with_capacity(N);
        let mut old_energy_vars = Vec::with_capacity(N);
        for (i, slot) in self.old.iter().enumerate() {
            let cs = &mut cs.namespace(|| format!("old note {i}"));

            let coins = alloc_public(cs.namespace(|| "coins"), slot.coins)?;
            let energy = alloc_public(cs.namespace(|| "energy"), slot.energy)?;
            let cm = alloc_public(cs.namespace(|| "cm"), slot.cm)?;
            let sn = alloc_public(cs.namespace(|| "sn"), slot.sn)?;
            let pk = alloc_public(cs.namespace(|| "pk"), slot.pk)?;

            let sk = alloc_private(cs.namespace(|| "sk"), slot.sk)?;
            let rho = alloc_private(cs.namespace(|| "rho"), slot.rho)?;
            let rcm = alloc_private(cs.namespace(|| "rcm"), slot.rcm)?;

            let cm_check = mimc_hash(
                cs.namespace(|| "commitment"),
                &[coins.clone(), energy.clone(), rho.clone(), rcm],
            )?;
            enforce_equal(cs, "commitment opens", &cm_check, &cm);

            let sn_check = mimc_hash(cs.namespace(|| "serial"), &[sk.clone(), rho])?;
            enforce_equal(cs, "serial derives from sk", &sn_check, &sn);

            let pk_check = mimc_hash(cs.namespace(|| "owner"), &[sk])?;
            enforce_equal(cs, "owner derives from sk", &pk_check, &pk);

            old_coins_vars.push(coins);
            old_energy_vars.push(energy);
        }

        let mut new_coins_vars = Vec::with_capacity(N);
        let mut new_energy_vars = Vec::with_capacity(N);
        for (j, slot) in self.new.iter().enumerate() {
            let cs = &mut cs.namespace(|| format!("new note {j}"));

            let coins = alloc_public(cs.namespace(|| "coins"), slot.coins)?;
            let energy = alloc_public(cs.namespace(|| "energy"), slot.energy)?;
            let cm = alloc_public(cs.namespace(|| "cm"), slot.cm)?;

            let pk = alloc_private(cs.namespace(|| "pk"), slot.pk)?;
            let rho = alloc_private(cs.namespace(|| "rho"), slot.rho)?;
            let rcm = alloc_private(cs.namespace(|| "rcm"), slot.rcm)?;

            let cm_check = mimc_hash(
                cs.namespace(|| "commitment"),
                &[coins.clone(), energy.clone(), rho.clone(), rcm.clone()],
            )?;
            enforce_equal(cs, "commitment opens", &cm_check, &cm);

            expose_encryption(
                cs.namespace(|| "ciphertext"),
                &dh.shared,
                &[pk, coins.clone(), energy.clone(), rho, rcm, cm],
            )?;

            new_coins_vars.push(coins);
            new_energy_vars.push(energy);
        }

        enforce_conservation(cs, "coin conservation", &old_coins_vars, &new_coins_vars);
        enforce_conservation(cs, "energy conservation", &old_energy_vars, &new_energy_vars);

        dh.inputize(cs.namespace(|| "dh inputs"))
    }
}

#[allow(
    clippy::arithmetic_side_effects,
    reason = "R1CS constraint building uses +/- operators for linear combinations"
)]
fn enforce_conservation<CS: ConstraintSystem<Scalar>>(
    cs: &mut CS,
    annotation: &str,
    old: &[AllocatedNum<Scalar>],
    new: &[AllocatedNum<Scalar>],
) {
    cs.enforce(
        || annotation.to_owned(),
        |mut lc| {
            for var in old {
                lc = lc + var.get_variable();
            }
            lc
        },
        |lc| lc + CS::one(),
        |mut lc| {
            for var in new {
                lc = lc + var.get_variable();
            }
            lc
        },
    );
}
