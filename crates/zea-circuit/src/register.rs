//! The register circuit: a sealed bid envelope over a freshly committed
//! auction note.
//!
//! Public inputs, in order: `cm_in`, `c_aux[0..5]`, `coins_in`,
//! `energy_in`, `bid`; then the exchange points `G, G*b, G*r`. The bidder
//! proves with its ephemeral secret `r` from the session with the
//! auctioneer.
//!
//! No conservation is enforced: registering moves no value, it binds the
//! bid and the entering note's spending key into a ciphertext only the
//! auctioneer can open.

use bellman::{Circuit, ConstraintSystem, SynthesisError};
use bls12_381::Scalar;

use crate::gadgets::{
    DhAssignment, DhRole, alloc_private, alloc_public, enforce_equal, expose_encryption,
    mimc_hash, witness_dh,
};

/// Instance of the register circuit.
#[derive(Debug, Clone, Default)]
pub struct RegisterCircuit {
    /// Commitment of the note entering the auction (public).
    pub cm_in: Option<Scalar>,
    /// Coin amount of the entering note (public).
    pub coins_in: Option<Scalar>,
    /// Energy amount of the entering note (public).
    pub energy_in: Option<Scalar>,
    /// The bid (public).
    pub bid: Option<Scalar>,
    /// Nullifier seed of the entering note (private).
    pub rho_in: Option<Scalar>,
    /// Commitment randomness of the entering note (private).
    pub rcm_in: Option<Scalar>,
    /// Spending key of the entering note (private).
    pub sk_in: Option<Scalar>,
    /// Owner identifier of the entering note (private, bound to `sk_in`).
    pub pk_in: Option<Scalar>,
    /// Destination identifier for cleared value (private, sealed).
    pub pk_out: Option<Scalar>,
    /// The bidder's exchange witness (`secret` is `r`).
    pub dh: DhAssignment,
}

impl RegisterCircuit {
    /// An unassigned instance, used for parameter generation.
    #[must_use]
    pub fn blank() -> Self {
        Self::default()
    }

    /// Number of public inputs (excluding the constant-one input).
    #[must_use]
    pub const fn public_input_len() -> usize {
        // cm_in + 5 ciphertext elements + coins + energy + bid + 6 point
        // coordinates.
        15
    }
}

impl Circuit<Scalar> for RegisterCircuit {
    fn synthesize<CS: ConstraintSystem<Scalar>>(self, cs: &mut CS) -> Result<(), SynthesisError> {
        let dh = witness_dh(cs.namespace(|| "dh"), &self.dh, DhRole::Initiator)?;

        let coins = alloc_private(cs.namespace(|| "coins"), self.coins_in)?;
        let energy = alloc_private(cs.namespace(|| "energy"), self.energy_in)?;
        let bid = alloc_private(cs.namespace(|| "bid"), self.bid)?;
        let rho = alloc_private(cs.namespace(|| "rho"), self.rho_in)?;
        let rcm = alloc_private(cs.namespace(|| "rcm"), self.rcm_in)?;
        let sk = alloc_private(cs.namespace(|| "sk"), self.sk_in)?;
        let pk_in = alloc_private(cs.namespace(|| "pk_in"), self.pk_in)?;
        let pk_out = alloc_private(cs.namespace(|| "pk_out"), self.pk_out)?;

        // cm_in opens to the witnessed note contents.
        let cm_in = alloc_public(cs.namespace(|| "cm_in"), self.cm_in)?;
        let cm_check = mimc_hash(
            cs.namespace(|| "commitment"),
            &[coins.clone(), energy.clone(), rho, rcm],
        )?;
        enforce_equal(cs, "commitment opens", &cm_check, &cm_in);

        // The sealed envelope: (pk_out, sk_in, bid, coins, energy).
        expose_encryption(
            cs.namespace(|| "aux ciphertext"),
            &dh.shared,
            &[
                pk_out,
                sk.clone(),
                bid.clone(),
                coins.clone(),
                energy.clone(),
            ],
        )?;

        // Amounts and bid are part of the public instance.
        coins.inputize(cs.namespace(|| "coins input"))?;
        energy.inputize(cs.namespace(|| "energy input"))?;
        bid.inputize(cs.namespace(|| "bid input"))?;

        // The claimed owner identifier derives from the sealed key.
        let pk_check = mimc_hash(cs.namespace(|| "owner"), &[sk])?;
        enforce_equal(cs, "owner derives from sk", &pk_check, &pk_in);

        dh.inputize(cs.namespace(|| "dh inputs"))
    }
}
