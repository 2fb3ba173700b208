//! Native MiMC over the BLS12-381 scalar field.
//!
//! The permutation is `x -> (x + k + c_i)^5` for [`MIMC_ROUNDS`] rounds
//! followed by a final key addition; the hash runs it in Miyaguchi-Preneel
//! mode. The exponent 5 is coprime to `r - 1` for this field, so each round
//! is a bijection. The in-circuit gadget consumes [`round_constants`] and
//! must stay constraint-for-constraint equal to this evaluation: every
//! public commitment, serial number and ciphertext is recomputed on both
//! sides.

use std::sync::OnceLock;

use bls12_381::Scalar;
use ff::Field;

/// Number of rounds of the MiMC permutation.
///
/// `ceil(log_5(2^255))`, the minimum for the algebraic degree to cover the
/// field.
pub const MIMC_ROUNDS: usize = 110;

/// Domain-separation seed the round constants are derived from.
const CONSTANTS_SEED: &[u8] = b"zea.mimc.bls12-381.v1";

/// The shared round constants.
///
/// Constant `i` is `BLAKE2b-512(seed || BE64(i))` reduced into the field.
/// Derived once per process.
#[must_use]
pub fn round_constants() -> &'static [Scalar; MIMC_ROUNDS] {
    static CONSTANTS: OnceLock<[Scalar; MIMC_ROUNDS]> = OnceLock::new();
    CONSTANTS.get_or_init(|| {
        let mut constants = [Scalar::ZERO; MIMC_ROUNDS];
        for (i, slot) in (0_u64..).zip(constants.iter_mut()) {
            let digest = blake2b_simd::Params::new()
                .hash_length(64)
                .to_state()
                .update(CONSTANTS_SEED)
                .update(&i.to_be_bytes())
                .finalize();
            let mut wide = [0_u8; 64];
            wide.copy_from_slice(digest.as_bytes());
            *slot = Scalar::from_bytes_wide(&wide);
        }
        constants
    })
}

/// The keyed MiMC permutation: `E_k(m)`.
#[allow(
    clippy::arithmetic_side_effects,
    reason = "prime-field arithmetic wraps by definition"
)]
#[must_use]
pub fn encrypt(key: Scalar, msg: Scalar) -> Scalar {
    let mut t = msg;
    for c in round_constants() {
        let u = t + key + c;
        t = u.square().square() * u;
    }
    t + key
}

/// Incremental MiMC hash state (Miyaguchi-Preneel mode).
#[derive(Debug, Clone, Default)]
pub struct Mimc {
    state: Scalar,
}

impl Mimc {
    /// A fresh hasher with zero state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb one field element.
    #[allow(
        clippy::arithmetic_side_effects,
        reason = "prime-field arithmetic wraps by definition"
    )]
    pub fn update(&mut self, msg: Scalar) -> &mut Self {
        self.state = encrypt(self.state, msg) + self.state + msg;
        self
    }

    /// Squeeze the digest.
    #[must_use]
    pub const fn finalize(&self) -> Scalar {
        self.state
    }
}

/// `H(x_1, ..., x_n)`: absorb in order, squeeze one element.
#[must_use]
pub fn hash(inputs: &[Scalar]) -> Scalar {
    let mut h = Mimc::new();
    for x in inputs {
        h.update(*x);
    }
    h.finalize()
}

/// The serial-number PRF: `sn = H(sk, rho)`.
#[must_use]
pub fn prf(sk: Scalar, rho: Scalar) -> Scalar {
    hash(&[sk, rho])
}

/// Owner-identifier derivation: `pk = H(sk)`.
#[must_use]
pub fn derive_pk(sk: Scalar) -> Scalar {
    hash(&[sk])
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::indexing_slicing,
        clippy::arithmetic_side_effects,
        reason = "unit-test"
    )]

    use rand_core::SeedableRng as _;
    use rand_xorshift::XorShiftRng;

    use super::*;

    fn rng() -> XorShiftRng {
        XorShiftRng::from_seed([
            0x58, 0x62, 0xbe, 0x3d, 0x76, 0x3d, 0x31, 0x8d, 0x17, 0xdb, 0x37, 0x32, 0x54, 0x06,
            0xbc, 0xe5,
        ])
    }

    #[test]
    fn constants_are_stable_and_distinct() {
        let constants = round_constants();
        assert_eq!(constants.len(), MIMC_ROUNDS);
        for pair in constants.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
        // Re-derivation returns the same table.
        assert_eq!(round_constants()[0], constants[0]);
    }

    #[test]
    fn hash_is_deterministic() {
        let mut rng = rng();
        let a = Scalar::random(&mut rng);
        let b = Scalar::random(&mut rng);
        assert_eq!(hash(&[a, b]), hash(&[a, b]));
        assert_ne!(hash(&[a, b]), hash(&[b, a]));
        assert_ne!(hash(&[a]), hash(&[a, Scalar::ZERO]));
    }

    #[test]
    fn prf_separates_keys_and_seeds() {
        let mut rng = rng();
        let sk = Scalar::random(&mut rng);
        let rho = Scalar::random(&mut rng);
        assert_eq!(prf(sk, rho), prf(sk, rho));
        assert_ne!(prf(sk, rho), prf(rho, sk));
        assert_ne!(prf(sk, rho), prf(sk, rho + Scalar::ONE));
    }

    #[test]
    fn incremental_matches_oneshot() {
        let mut rng = rng();
        let inputs: Vec<Scalar> = (0..6).map(|_| Scalar::random(&mut rng)).collect();
        let mut h = Mimc::new();
        for x in &inputs {
            h.update(*x);
        }
        assert_eq!(h.finalize(), hash(&inputs));
    }
}
