//! Spending keys and owner identifiers.
//!
//! A key pair is `(sk, pk)` with `pk = H(sk)`. The identifier doubles as
//! the note-ownership key and the peer-facing identity a Diffie-Hellman
//! session is negotiated for; the spending key never leaves its holder
//! except inside the sealed auction envelope.

use bls12_381::Scalar;
use ff::Field as _;
use rand_core::RngCore;

use crate::base::mimc;

/// A spending key together with its derived owner identifier.
#[derive(Debug, Clone, Copy)]
pub struct KeyPair {
    sk: Scalar,
    pk: Scalar,
}

impl KeyPair {
    /// Sample a fresh key pair.
    ///
    /// Production callers must pass a cryptographically secure generator;
    /// test suites seed a deterministic one.
    pub fn random(rng: &mut impl RngCore) -> Self {
        Self::from_sk(Scalar::random(rng))
    }

    /// Derive the pair from an existing spending key.
    #[must_use]
    pub fn from_sk(sk: Scalar) -> Self {
        Self {
            sk,
            pk: mimc::derive_pk(sk),
        }
    }

    /// The secret spending key.
    #[must_use]
    pub const fn sk(&self) -> Scalar {
        self.sk
    }

    /// The public owner identifier `H(sk)`.
    #[must_use]
    pub const fn pk(&self) -> Scalar {
        self.pk
    }
}

#[cfg(test)]
mod tests {
    use rand_core::SeedableRng as _;
    use rand_xorshift::XorShiftRng;

    use super::*;

    #[test]
    fn pk_is_hash_of_sk() {
        let mut rng = XorShiftRng::from_seed([3_u8; 16]);
        let pair = KeyPair::random(&mut rng);
        assert_eq!(pair.pk(), mimc::hash(&[pair.sk()]));
        assert_eq!(KeyPair::from_sk(pair.sk()).pk(), pair.pk());
    }
}
