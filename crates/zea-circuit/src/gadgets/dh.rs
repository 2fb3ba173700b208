//! In-circuit Diffie-Hellman binding.
//!
//! A prover holding one side's ephemeral secret shows that (a) the public
//! point it claims as its own really is `G * secret` and (b) the shared
//! point feeding the cipher is `partner * secret`. The three exchange
//! points `(G, G*b, G*r)` are public inputs; the shared point and the
//! secret stay private.

use bellman::gadgets::boolean;
use bellman::{ConstraintSystem, SynthesisError};
use bls12_381::Scalar;
use sapling::circuit::ecc::EdwardsPoint;

use crate::gadgets::enforce_equal;

/// Which exchange half the prover holds the secret for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DhRole {
    /// The prover knows `r`: `G*r` is its own point, `G*b` the partner's.
    Initiator,
    /// The prover knows `b`: `G*b` is its own point, `G*r` the partner's.
    Responder,
}

/// Witness values for the DH binding gadget.
#[derive(Debug, Clone, Copy, Default)]
pub struct DhAssignment {
    /// The common generator `G`.
    pub generator: Option<jubjub::ExtendedPoint>,
    /// The responder's public point `G*b`.
    pub g_b: Option<jubjub::ExtendedPoint>,
    /// The initiator's public point `G*r`.
    pub g_r: Option<jubjub::ExtendedPoint>,
    /// The prover's ephemeral secret (`r` or `b` depending on role).
    pub secret: Option<jubjub::Fr>,
    /// The shared point `S`.
    pub shared: Option<jubjub::ExtendedPoint>,
}

/// The witnessed exchange points, ready for deferred input exposure.
pub struct DhPoints {
    g: EdwardsPoint,
    g_b: EdwardsPoint,
    g_r: EdwardsPoint,
    /// The shared point, private, feeding the cipher gadget.
    pub shared: EdwardsPoint,
}

impl DhPoints {
    /// Expose `(G, G*b, G*r)` as public inputs, in that order, each as an
    /// affine `(u, v)` pair.
    ///
    /// # Errors
    /// Returns `SynthesisError` if constraint synthesis fails.
    pub fn inputize<CS: ConstraintSystem<Scalar>>(
        &self,
        mut cs: CS,
    ) -> Result<(), SynthesisError> {
        self.g.inputize(cs.namespace(|| "generator"))?;
        self.g_b.inputize(cs.namespace(|| "g_b"))?;
        self.g_r.inputize(cs.namespace(|| "g_r"))?;
        Ok(())
    }
}

/// Witness the exchange and enforce the binding constraints.
///
/// Input exposure is deferred to [`DhPoints::inputize`] so the caller
/// controls where the points land in the public input order.
///
/// # Errors
/// Returns `SynthesisError` if constraint synthesis fails.
pub fn witness_dh<CS: ConstraintSystem<Scalar>>(
    mut cs: CS,
    assignment: &DhAssignment,
    role: DhRole,
) -> Result<DhPoints, SynthesisError> {
    let g = EdwardsPoint::witness(cs.namespace(|| "generator"), assignment.generator)?;
    g.assert_not_small_order(cs.namespace(|| "generator not small order"))?;

    let g_b = EdwardsPoint::witness(cs.namespace(|| "g_b"), assignment.g_b)?;
    let g_r = EdwardsPoint::witness(cs.namespace(|| "g_r"), assignment.g_r)?;
    let shared = EdwardsPoint::witness(cs.namespace(|| "shared point"), assignment.shared)?;

    let secret_bits =
        boolean::field_into_boolean_vec_le(cs.namespace(|| "secret bits"), assignment.secret)?;

    let (own, partner) = match role {
        DhRole::Initiator => (&g_r, &g_b),
        DhRole::Responder => (&g_b, &g_r),
    };

    // G * secret must equal the point the prover published.
    let own_check = g.mul(cs.namespace(|| "generator * secret"), &secret_bits)?;
    enforce_equal(&mut cs, "own point u", own_check.get_u(), own.get_u());
    enforce_equal(&mut cs, "own point v", own_check.get_v(), own.get_v());

    // partner * secret must equal the shared point feeding the cipher.
    let shared_check = partner.mul(cs.namespace(|| "partner * secret"), &secret_bits)?;
    enforce_equal(&mut cs, "shared point u", shared_check.get_u(), shared.get_u());
    enforce_equal(&mut cs, "shared point v", shared_check.get_v(), shared.get_v());

    Ok(DhPoints { g, g_b, g_r, shared })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "unit-test")]

    use bellman::gadgets::test::TestConstraintSystem;
    use rand_core::SeedableRng as _;
    use rand_xorshift::XorShiftRng;
    use zea_core::dh::{self, DhSession, PendingExchange};

    use super::*;

    fn exchange(rng: &mut XorShiftRng) -> (DhSession, DhSession) {
        let pending = PendingExchange::initiate(rng);
        let responder = DhSession::respond(1, pending.ephemeral_public, rng);
        let initiator = pending.complete(2, responder.ephemeral_public);
        (initiator, responder)
    }

    fn assignment_for(session: &DhSession, role: DhRole) -> DhAssignment {
        match role {
            DhRole::Initiator => DhAssignment {
                generator: Some(dh::generator()),
                g_b: Some(session.partner_public),
                g_r: Some(session.ephemeral_public),
                secret: Some(session.secret()),
                shared: Some(session.shared),
            },
            DhRole::Responder => DhAssignment {
                generator: Some(dh::generator()),
                g_b: Some(session.ephemeral_public),
                g_r: Some(session.partner_public),
                secret: Some(session.secret()),
                shared: Some(session.shared),
            },
        }
    }

    #[test]
    fn binding_holds_for_both_roles() {
        let mut rng = XorShiftRng::from_seed([41_u8; 16]);
        let (initiator, responder) = exchange(&mut rng);

        for (session, role) in [
            (&initiator, DhRole::Initiator),
            (&responder, DhRole::Responder),
        ] {
            let mut cs = TestConstraintSystem::<Scalar>::new();
            let points = witness_dh(
                cs.namespace(|| "dh"),
                &assignment_for(session, role),
                role,
            )
            .unwrap();
            points.inputize(cs.namespace(|| "dh inputs")).unwrap();
            assert!(cs.is_satisfied());
            // ONE plus three (u, v) pairs.
            assert_eq!(cs.num_inputs(), 7);
        }
    }

    #[test]
    fn wrong_secret_fails() {
        let mut rng = XorShiftRng::from_seed([42_u8; 16]);
        let (initiator, _) = exchange(&mut rng);
        let (other, _) = exchange(&mut rng);

        let mut assignment = assignment_for(&initiator, DhRole::Initiator);
        assignment.secret = Some(other.secret());

        let mut cs = TestConstraintSystem::<Scalar>::new();
        witness_dh(cs.namespace(|| "dh"), &assignment, DhRole::Initiator).unwrap();
        assert!(!cs.is_satisfied());
    }

    #[test]
    fn wrong_shared_point_fails() {
        let mut rng = XorShiftRng::from_seed([43_u8; 16]);
        let (initiator, _) = exchange(&mut rng);
        let (other, _) = exchange(&mut rng);

        let mut assignment = assignment_for(&initiator, DhRole::Initiator);
        assignment.shared = Some(other.shared);

        let mut cs = TestConstraintSystem::<Scalar>::new();
        witness_dh(cs.namespace(|| "dh"), &assignment, DhRole::Initiator).unwrap();
        assert!(!cs.is_satisfied());
    }
}
