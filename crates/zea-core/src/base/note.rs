//! Notes, commitments and serial numbers.
//!
//! A note commits to a two-asset value `(coins, energy)` under a per-note
//! nullifier seed `rho` and commitment randomness `rcm`:
//! `cm = H(coins, energy, rho, rcm)`. Spending a note reveals its serial
//! number `sn = H(sk, rho)`, which the validator records to make the spend
//! unrepeatable. The owner identifier is deliberately outside the
//! commitment preimage; ownership is enforced by the circuits through
//! `pk = H(sk)`.

use bls12_381::Scalar;
use ff::Field as _;
use rand_core::RngCore;

use crate::base::mimc;

/// A two-asset value tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gamma {
    /// Coin amount.
    pub coins: Scalar,
    /// Energy amount.
    pub energy: Scalar,
}

impl Gamma {
    /// A value tuple from plain integers.
    #[must_use]
    pub fn new(coins: u64, energy: u64) -> Self {
        Self {
            coins: Scalar::from(coins),
            energy: Scalar::from(energy),
        }
    }
}

/// The secret opening of a note commitment.
#[derive(Debug, Clone, Copy)]
pub struct NoteOpening {
    /// The committed value.
    pub value: Gamma,
    /// Per-note nullifier seed.
    pub rho: Scalar,
    /// Commitment randomness.
    pub rcm: Scalar,
}

impl NoteOpening {
    /// Sample fresh `(rho, rcm)` for a value.
    pub fn random(value: Gamma, rng: &mut impl RngCore) -> Self {
        Self {
            value,
            rho: Scalar::random(&mut *rng),
            rcm: Scalar::random(rng),
        }
    }

    /// The commitment this opening produces.
    #[must_use]
    pub fn commitment(&self) -> Scalar {
        commitment(&self.value, self.rho, self.rcm)
    }
}

/// A full note: opening, owner, and cached commitment.
#[derive(Debug, Clone, Copy)]
pub struct Note {
    /// The committed value.
    pub value: Gamma,
    /// Owner identifier `H(sk)`.
    pub pk_owner: Scalar,
    /// Per-note nullifier seed.
    pub rho: Scalar,
    /// Commitment randomness.
    pub rcm: Scalar,
    /// The commitment `H(coins, energy, rho, rcm)`.
    pub cm: Scalar,
}

impl Note {
    /// Mint a note for `pk_owner` with fresh randomness.
    pub fn mint(value: Gamma, pk_owner: Scalar, rng: &mut impl RngCore) -> Self {
        Self::from_opening(&NoteOpening::random(value, rng), pk_owner)
    }

    /// Assemble a note from an opening, computing the commitment.
    #[must_use]
    pub fn from_opening(opening: &NoteOpening, pk_owner: Scalar) -> Self {
        Self {
            value: opening.value,
            pk_owner,
            rho: opening.rho,
            rcm: opening.rcm,
            cm: opening.commitment(),
        }
    }

    /// The secret opening of this note.
    #[must_use]
    pub const fn opening(&self) -> NoteOpening {
        NoteOpening {
            value: self.value,
            rho: self.rho,
            rcm: self.rcm,
        }
    }

    /// Whether the cached commitment matches the opening.
    ///
    /// Recomputed on acceptance paths to catch mutation in transit.
    #[must_use]
    pub fn verify_commitment(&self) -> bool {
        self.opening().commitment() == self.cm
    }

    /// The serial number this note reveals when spent with `sk`.
    #[must_use]
    pub fn serial_number(&self, sk: Scalar) -> Scalar {
        nullifier(sk, self.rho)
    }
}

/// `cm = H(coins, energy, rho, rcm)`.
#[must_use]
pub fn commitment(value: &Gamma, rho: Scalar, rcm: Scalar) -> Scalar {
    mimc::hash(&[value.coins, value.energy, rho, rcm])
}

/// `sn = H(sk, rho)`.
#[must_use]
pub fn nullifier(sk: Scalar, rho: Scalar) -> Scalar {
    mimc::prf(sk, rho)
}
