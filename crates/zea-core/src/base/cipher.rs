//! Mask-chain stream cipher over the outer scalar field.
//!
//! Under a shared inner-curve point `S`, the mask chain is
//! `t_1 = H(S.u, S.v)`, `t_{j+1} = H(t_j)`; element `j` of a plaintext is
//! blinded additively: `c_j = m_j + t_j`. Decryption subtracts the same
//! chain. The circuits rebuild the identical chain from their witnessed
//! `S`, so a ciphertext accepted in a proof is exactly what the session
//! holder will decrypt.
//!
//! Three fixed schedules are in use: the 6-element note encoding, the
//! 5-element auction auxiliary encoding, and the 3-element withdraw
//! encoding (the withdraw circuit itself is not wired into the pipeline).

use bls12_381::Scalar;

use crate::base::mimc;
use crate::base::note::{Gamma, Note, NoteOpening};

/// Length of a note ciphertext.
pub const NOTE_CIPHERTEXT_LEN: usize = 6;
/// Length of an auction auxiliary ciphertext.
pub const AUX_CIPHERTEXT_LEN: usize = 5;
/// Length of a withdraw ciphertext.
pub const WITHDRAW_CIPHERTEXT_LEN: usize = 3;

/// The deterministic mask chain derived from a shared point.
#[derive(Debug, Clone)]
pub struct MaskChain {
    next: Scalar,
}

impl MaskChain {
    /// Start the chain at `t_1 = H(S.u, S.v)`.
    #[must_use]
    pub fn new(shared: &jubjub::ExtendedPoint) -> Self {
        let affine = jubjub::AffinePoint::from(shared);
        Self {
            next: mimc::hash(&[affine.get_u(), affine.get_v()]),
        }
    }

    /// Take the next mask element.
    pub fn next_mask(&mut self) -> Scalar {
        let t = self.next;
        self.next = mimc::hash(&[t]);
        t
    }
}

/// Encrypt a fixed-length plaintext under the shared point.
#[allow(
    clippy::arithmetic_side_effects,
    reason = "prime-field arithmetic wraps by definition"
)]
#[must_use]
pub fn encrypt<const K: usize>(shared: &jubjub::ExtendedPoint, plain: &[Scalar; K]) -> [Scalar; K] {
    let mut chain = MaskChain::new(shared);
    plain.map(|m| m + chain.next_mask())
}

/// Decrypt a fixed-length ciphertext under the shared point.
#[allow(
    clippy::arithmetic_side_effects,
    reason = "prime-field arithmetic wraps by definition"
)]
#[must_use]
pub fn decrypt<const K: usize>(
    shared: &jubjub::ExtendedPoint,
    cipher: &[Scalar; K],
) -> [Scalar; K] {
    let mut chain = MaskChain::new(shared);
    cipher.map(|c| c - chain.next_mask())
}

/// Plaintext of the note encoding: `(pk_owner, coins, energy, rho, rcm, cm)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotePlaintext {
    /// Owner identifier of the transmitted note.
    pub pk_owner: Scalar,
    /// Coin amount.
    pub coins: Scalar,
    /// Energy amount.
    pub energy: Scalar,
    /// Nullifier seed.
    pub rho: Scalar,
    /// Commitment randomness.
    pub rcm: Scalar,
    /// The note commitment.
    pub cm: Scalar,
}

impl NotePlaintext {
    /// The transmitted fields of a note, in schedule order.
    #[must_use]
    pub const fn from_note(note: &Note) -> Self {
        Self {
            pk_owner: note.pk_owner,
            coins: note.value.coins,
            energy: note.value.energy,
            rho: note.rho,
            rcm: note.rcm,
            cm: note.cm,
        }
    }

    /// Schedule order used by both the native cipher and the circuits.
    #[must_use]
    pub const fn to_elements(&self) -> [Scalar; NOTE_CIPHERTEXT_LEN] {
        [
            self.pk_owner,
            self.coins,
            self.energy,
            self.rho,
            self.rcm,
            self.cm,
        ]
    }

    /// Encrypt under the shared point.
    #[must_use]
    pub fn encrypt(&self, shared: &jubjub::ExtendedPoint) -> [Scalar; NOTE_CIPHERTEXT_LEN] {
        encrypt(shared, &self.to_elements())
    }

    /// Decrypt a note ciphertext.
    #[must_use]
    pub fn decrypt(
        shared: &jubjub::ExtendedPoint,
        cipher: &[Scalar; NOTE_CIPHERTEXT_LEN],
    ) -> Self {
        let [pk_owner, coins, energy, rho, rcm, cm] = decrypt(shared, cipher);
        Self {
            pk_owner,
            coins,
            energy,
            rho,
            rcm,
            cm,
        }
    }

    /// Reassemble the note, if the transmitted commitment matches the
    /// transmitted opening.
    #[must_use]
    pub fn into_note(self) -> Option<Note> {
        let note = Note {
            value: Gamma {
                coins: self.coins,
                energy: self.energy,
            },
            pk_owner: self.pk_owner,
            rho: self.rho,
            rcm: self.rcm,
            cm: self.cm,
        };
        note.verify_commitment().then_some(note)
    }

    /// The opening carried by this plaintext.
    #[must_use]
    pub const fn opening(&self) -> NoteOpening {
        NoteOpening {
            value: Gamma {
                coins: self.coins,
                energy: self.energy,
            },
            rho: self.rho,
            rcm: self.rcm,
        }
    }
}

/// Plaintext of the auction auxiliary encoding:
/// `(pk_out, sk_in, bid, coins, energy)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuxPlaintext {
    /// Where the bidder wants cleared value sent.
    pub pk_out: Scalar,
    /// Spending key of the note entering the auction.
    pub sk_in: Scalar,
    /// The sealed bid.
    pub bid: Scalar,
    /// Coin amount of the entering note.
    pub coins: Scalar,
    /// Energy amount of the entering note.
    pub energy: Scalar,
}

impl AuxPlaintext {
    /// Schedule order used by both the native cipher and the circuits.
    #[must_use]
    pub const fn to_elements(&self) -> [Scalar; AUX_CIPHERTEXT_LEN] {
        [self.pk_out, self.sk_in, self.bid, self.coins, self.energy]
    }

    /// Encrypt under the shared point.
    #[must_use]
    pub fn encrypt(&self, shared: &jubjub::ExtendedPoint) -> [Scalar; AUX_CIPHERTEXT_LEN] {
        encrypt(shared, &self.to_elements())
    }

    /// Decrypt an auxiliary ciphertext.
    #[must_use]
    pub fn decrypt(shared: &jubjub::ExtendedPoint, cipher: &[Scalar; AUX_CIPHERTEXT_LEN]) -> Self {
        let [pk_out, sk_in, bid, coins, energy] = decrypt(shared, cipher);
        Self {
            pk_out,
            sk_in,
            bid,
            coins,
            energy,
        }
    }
}

/// Plaintext of the withdraw encoding: `(pk_out, sk_in, bid)`.
///
/// The withdraw circuit is a future extension; only the encoding exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawPlaintext {
    /// Transparent destination identifier.
    pub pk_out: Scalar,
    /// Spending key of the withdrawn note.
    pub sk_in: Scalar,
    /// The bid being withdrawn.
    pub bid: Scalar,
}

impl WithdrawPlaintext {
    /// Schedule order.
    #[must_use]
    pub const fn to_elements(&self) -> [Scalar; WITHDRAW_CIPHERTEXT_LEN] {
        [self.pk_out, self.sk_in, self.bid]
    }

    /// Encrypt under the shared point.
    #[must_use]
    pub fn encrypt(&self, shared: &jubjub::ExtendedPoint) -> [Scalar; WITHDRAW_CIPHERTEXT_LEN] {
        encrypt(shared, &self.to_elements())
    }

    /// Decrypt a withdraw ciphertext.
    #[must_use]
    pub fn decrypt(
        shared: &jubjub::ExtendedPoint,
        cipher: &[Scalar; WITHDRAW_CIPHERTEXT_LEN],
    ) -> Self {
        let [pk_out, sk_in, bid] = decrypt(shared, cipher);
        Self { pk_out, sk_in, bid }
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::indexing_slicing,
        clippy::arithmetic_side_effects,
        reason = "unit-test"
    )]

    use ff::Field as _;
    use group::Group as _;
    use rand_core::SeedableRng as _;
    use rand_xorshift::XorShiftRng;

    use super::*;
    use crate::base::keys::KeyPair;

    fn rng() -> XorShiftRng {
        XorShiftRng::from_seed([
            0x31, 0x8d, 0x17, 0xdb, 0x37, 0x32, 0x54, 0x06, 0xbc, 0xe5, 0x58, 0x62, 0xbe, 0x3d,
            0x76, 0x3d,
        ])
    }

    fn shared_point(rng: &mut XorShiftRng) -> jubjub::ExtendedPoint {
        jubjub::ExtendedPoint::from(jubjub::SubgroupPoint::random(rng))
    }

    #[test]
    fn round_trip_all_schedules() {
        let mut rng = rng();
        let shared = shared_point(&mut rng);

        let three: [Scalar; WITHDRAW_CIPHERTEXT_LEN] =
            core::array::from_fn(|_| Scalar::random(&mut rng));
        let five: [Scalar; AUX_CIPHERTEXT_LEN] =
            core::array::from_fn(|_| Scalar::random(&mut rng));
        let six: [Scalar; NOTE_CIPHERTEXT_LEN] =
            core::array::from_fn(|_| Scalar::random(&mut rng));

        assert_eq!(decrypt(&shared, &encrypt(&shared, &three)), three);
        assert_eq!(decrypt(&shared, &encrypt(&shared, &five)), five);
        assert_eq!(decrypt(&shared, &encrypt(&shared, &six)), six);
    }

    #[test]
    fn wrong_key_scrambles() {
        let mut rng = rng();
        let shared = shared_point(&mut rng);
        let other = shared_point(&mut rng);
        let plain: [Scalar; AUX_CIPHERTEXT_LEN] =
            core::array::from_fn(|_| Scalar::random(&mut rng));
        assert_ne!(decrypt(&other, &encrypt(&shared, &plain)), plain);
    }

    #[test]
    fn note_plaintext_round_trip() {
        let mut rng = rng();
        let shared = shared_point(&mut rng);
        let owner = KeyPair::random(&mut rng);
        let note = crate::base::note::Note::mint(
            crate::base::note::Gamma::new(9, 10),
            owner.pk(),
            &mut rng,
        );

        let cipher = NotePlaintext::from_note(&note).encrypt(&shared);
        let plain = NotePlaintext::decrypt(&shared, &cipher);
        let recovered = plain.into_note().unwrap();
        assert_eq!(recovered.cm, note.cm);
        assert_eq!(recovered.pk_owner, owner.pk());
    }

    #[test]
    fn tampered_note_ciphertext_fails_reassembly() {
        let mut rng = rng();
        let shared = shared_point(&mut rng);
        let owner = KeyPair::random(&mut rng);
        let note = crate::base::note::Note::mint(
            crate::base::note::Gamma::new(9, 10),
            owner.pk(),
            &mut rng,
        );

        let mut cipher = NotePlaintext::from_note(&note).encrypt(&shared);
        cipher[3] += Scalar::ONE;
        assert!(NotePlaintext::decrypt(&shared, &cipher).into_note().is_none());
    }

    #[test]
    fn masks_differ_per_position() {
        let mut rng = rng();
        let shared = shared_point(&mut rng);
        let mut chain = MaskChain::new(&shared);
        let t1 = chain.next_mask();
        let t2 = chain.next_mask();
        assert_ne!(t1, t2);
        assert_eq!(t2, mimc::hash(&[t1]));
    }
}
