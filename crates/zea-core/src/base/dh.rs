//! Diffie-Hellman sessions on the inner curve.
//!
//! Two peers agree on a shared point with a two-message exchange: the
//! initiator sends `A = G * r`, the responder replies `B = G * b`, and both
//! compute `S = G * (r * b)`. Session records follow one convention on both
//! sides: `partner_public` holds the counter-party's point,
//! `ephemeral_public` the locally generated one.
//!
//! The generator `G` is a fixed transparent parameter equal in every
//! process; deriving it from per-process randomness would break interop
//! between independently started nodes.

use std::sync::OnceLock;

use group::Group as _;
use rand_core::RngCore;

/// Peer identifier used to index sessions and routing tables.
pub type PeerId = u64;

/// Domain-separation tag the common generator is derived from.
const GENERATOR_SEED: &[u8] = b"zea.dh.generator.v1";

fn derive_inner_scalar(tag: &[u8]) -> jubjub::Fr {
    let digest = blake2b_simd::Params::new()
        .hash_length(64)
        .to_state()
        .update(tag)
        .finalize();
    let mut wide = [0_u8; 64];
    wide.copy_from_slice(digest.as_bytes());
    jubjub::Fr::from_bytes_wide(&wide)
}

/// The common generator `G`: the prime-order subgroup generator scaled by
/// a fixed derived scalar. Identical in every process.
#[must_use]
pub fn generator() -> jubjub::ExtendedPoint {
    static GENERATOR: OnceLock<jubjub::ExtendedPoint> = OnceLock::new();
    *GENERATOR.get_or_init(|| {
        jubjub::ExtendedPoint::from(jubjub::SubgroupPoint::generator())
            * derive_inner_scalar(GENERATOR_SEED)
    })
}

/// The local half of an exchange still waiting for the responder's point.
#[derive(Debug, Clone)]
pub struct PendingExchange {
    secret: jubjub::Fr,
    /// `A = G * r`, already sent to the peer.
    pub ephemeral_public: jubjub::ExtendedPoint,
}

impl PendingExchange {
    /// Initiator step: sample `r`, compute `A = G * r`.
    pub fn initiate(rng: &mut impl RngCore) -> Self {
        let mut secret_bytes = [0_u8; 64];
        rng.fill_bytes(&mut secret_bytes);
        let secret = jubjub::Fr::from_bytes_wide(&secret_bytes);
        Self {
            ephemeral_public: generator() * secret,
            secret,
        }
    }

    /// Initiator completion: fold in the responder's `B`, producing the
    /// settled session.
    #[must_use]
    pub fn complete(self, peer: PeerId, partner_public: jubjub::ExtendedPoint) -> DhSession {
        DhSession {
            peer,
            shared: partner_public * self.secret,
            partner_public,
            ephemeral_public: self.ephemeral_public,
            secret: self.secret,
        }
    }
}

/// A settled session with one peer.
#[derive(Debug, Clone)]
pub struct DhSession {
    /// The counter-party this session is with.
    pub peer: PeerId,
    /// The counter-party's public point.
    pub partner_public: jubjub::ExtendedPoint,
    /// The locally generated public point.
    pub ephemeral_public: jubjub::ExtendedPoint,
    /// The shared point `S`.
    pub shared: jubjub::ExtendedPoint,
    secret: jubjub::Fr,
}

impl DhSession {
    /// Responder step: receive `A`, sample `b`, settle immediately.
    /// The point to send back is [`DhSession::ephemeral_public`].
    pub fn respond(
        peer: PeerId,
        partner_public: jubjub::ExtendedPoint,
        rng: &mut impl RngCore,
    ) -> Self {
        PendingExchange::initiate(rng).complete(peer, partner_public)
    }

    /// The local ephemeral secret.
    #[must_use]
    pub const fn secret(&self) -> jubjub::Fr {
        self.secret
    }
}

#[cfg(test)]
mod tests {
    use rand_core::SeedableRng as _;
    use rand_xorshift::XorShiftRng;

    use super::*;

    #[test]
    fn generator_is_stable_and_not_identity() {
        assert_eq!(generator(), generator());
        assert!(!bool::from(generator().is_identity()));
    }

    #[test]
    fn both_ends_agree_on_the_shared_point() {
        let mut rng = XorShiftRng::from_seed([11_u8; 16]);

        // Initiator (peer 1) -> responder (peer 2).
        let pending = PendingExchange::initiate(&mut rng);
        let responder = DhSession::respond(1, pending.ephemeral_public, &mut rng);
        let initiator = pending.complete(2, responder.ephemeral_public);

        assert_eq!(initiator.shared, responder.shared);

        // Bit-for-bit affine agreement.
        let a = jubjub::AffinePoint::from(&initiator.shared);
        let b = jubjub::AffinePoint::from(&responder.shared);
        assert_eq!(a.get_u(), b.get_u());
        assert_eq!(a.get_v(), b.get_v());

        // Each side stores the other's point as partner_public.
        assert_eq!(initiator.partner_public, responder.ephemeral_public);
        assert_eq!(responder.partner_public, initiator.ephemeral_public);
    }

    #[test]
    fn distinct_exchanges_yield_distinct_keys() {
        let mut rng = XorShiftRng::from_seed([12_u8; 16]);
        let p1 = PendingExchange::initiate(&mut rng);
        let p2 = PendingExchange::initiate(&mut rng);
        let r1 = DhSession::respond(1, p1.ephemeral_public, &mut rng);
        let r2 = DhSession::respond(1, p2.ephemeral_public, &mut rng);
        assert_ne!(
            p1.complete(2, r1.ephemeral_public).shared,
            p2.complete(2, r2.ephemeral_public).shared
        );
    }
}
