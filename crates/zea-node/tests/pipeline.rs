//! End-to-end protocol scenarios.
//!
//! These drive the validator and auctioneer against real loopback sockets
//! for the session layer and DH fetches, with one shared parameter
//! registry (trusted setup is the slow part, so it runs once for the whole
//! file).

#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    reason = "integration test"
)]

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use rand::rngs::OsRng;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use zea_core::dh::{DhSession, PendingExchange, PeerId};
use zea_core::keys::KeyPair;
use zea_core::note::{Gamma, Note};
use zea_core::schema::Message;
use zea_node::auctioneer::Auctioneer;
use zea_node::builder::{
    BuilderError, RegisterSpec, TransferSpec, build_register, build_transfer,
};
use zea_node::node::NodeContext;
use zea_node::peers::PeerTable;
use zea_node::session::SessionManager;
use zea_node::validator::{RejectReason, Validator};
use zea_proofs::{CircuitKind, ParamsRegistry, ProofError};

const VALIDATOR_ID: PeerId = 0;
const AUCTIONEER_ID: PeerId = 1;
const BIDDER_1: PeerId = 2;
const BIDDER_2: PeerId = 3;

fn registry() -> Arc<ParamsRegistry> {
    static REGISTRY: OnceLock<Arc<ParamsRegistry>> = OnceLock::new();
    Arc::clone(REGISTRY.get_or_init(|| {
        let dir = std::env::temp_dir().join(format!("zea-params-test-{}", std::process::id()));
        Arc::new(
            ParamsRegistry::load_or_generate(
                &dir,
                &[
                    CircuitKind::Transfer1,
                    CircuitKind::Transfer2,
                    CircuitKind::Register,
                    CircuitKind::Auction2,
                ],
                &mut OsRng,
            )
            .unwrap(),
        )
    }))
}

/// Serve a node's session layer (DH exchange + parameter fetches) on a
/// loopback socket.
async fn serve_sessions(id: PeerId) -> (Arc<SessionManager>, SocketAddr) {
    let sessions = Arc::new(SessionManager::new(id));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let ctx = Arc::new(NodeContext {
        id,
        sessions: Arc::clone(&sessions),
        submissions: None,
    });
    tokio::spawn(zea_node::node::serve(listener, ctx));
    (sessions, addr)
}

/// Settle a session pair directly between two in-process managers.
fn pair_sessions(
    a: &SessionManager,
    a_id: PeerId,
    b: &SessionManager,
    b_id: PeerId,
) -> (DhSession, DhSession) {
    let pending = PendingExchange::initiate(&mut OsRng);
    let responder = DhSession::respond(a_id, pending.ephemeral_public, &mut OsRng);
    let initiator = pending.complete(b_id, responder.ephemeral_public);
    a.store(initiator.clone());
    b.store(responder.clone());
    (initiator, responder)
}

struct Harness {
    validator: Validator,
    validator_sessions: Arc<SessionManager>,
    auctioneer_sessions: Arc<SessionManager>,
    auctioneer_addr: SocketAddr,
}

async fn harness() -> Harness {
    let registry = registry();
    let (auctioneer_sessions, auctioneer_addr) = serve_sessions(AUCTIONEER_ID).await;
    let validator_sessions = Arc::new(SessionManager::new(VALIDATOR_ID));

    let peers = PeerTable::new([(AUCTIONEER_ID, auctioneer_addr)]);
    let validator = Validator::new(
        VALIDATOR_ID,
        registry,
        peers,
        Arc::clone(&validator_sessions),
        None,
    );
    Harness {
        validator,
        validator_sessions,
        auctioneer_sessions,
        auctioneer_addr,
    }
}

/// S1: a 2-to-2 transfer with fresh inputs is accepted and appended.
#[tokio::test(flavor = "multi_thread")]
async fn transfer_two_to_two_happy_path() {
    let registry = registry();
    let (_recipient_sessions, recipient_addr) = serve_sessions(5).await;
    let sender_sessions = SessionManager::new(BIDDER_1);
    let session = sender_sessions.establish(5, recipient_addr).await.unwrap();

    let validator_sessions = Arc::new(SessionManager::new(VALIDATOR_ID));
    let mut validator = Validator::new(
        VALIDATOR_ID,
        Arc::clone(&registry),
        PeerTable::new([(5, recipient_addr)]),
        validator_sessions,
        None,
    );

    let owner1 = KeyPair::random(&mut OsRng);
    let owner2 = KeyPair::random(&mut OsRng);
    let recipient = KeyPair::random(&mut OsRng);
    let spec = TransferSpec {
        old_notes: [
            Note::mint(Gamma::new(12, 5), owner1.pk(), &mut OsRng),
            Note::mint(Gamma::new(10, 8), owner2.pk(), &mut OsRng),
        ],
        old_keys: [owner1, owner2],
        recipients: [
            (Gamma::new(9, 10), recipient.pk()),
            (Gamma::new(13, 3), recipient.pk()),
        ],
    };
    let built = build_transfer::<2>(&registry, &session, BIDDER_1, 5, &spec, &mut OsRng).unwrap();

    let reject = validator.submit(&Message::Tx(built.payload.clone())).await;
    assert_eq!(reject, None);
    assert_eq!(validator.nullifier_count(), 2);
    assert_eq!(validator.commitments().len(), 2);
    assert_eq!(validator.transfer_log().len(), 1);
    assert_eq!(
        validator.commitments()[0],
        built.payload.outputs[0].cm
    );
}

/// S2: a conservation violation fails inside the prover; nothing is
/// emitted on the wire.
#[tokio::test(flavor = "multi_thread")]
async fn conservation_violation_fails_in_prover() {
    let registry = registry();
    let (_, recipient_addr) = serve_sessions(6).await;
    let sender_sessions = SessionManager::new(BIDDER_1);
    let session = sender_sessions.establish(6, recipient_addr).await.unwrap();

    let owner1 = KeyPair::random(&mut OsRng);
    let owner2 = KeyPair::random(&mut OsRng);
    let recipient = KeyPair::random(&mut OsRng);
    let spec = TransferSpec {
        old_notes: [
            Note::mint(Gamma::new(12, 5), owner1.pk(), &mut OsRng),
            Note::mint(Gamma::new(10, 8), owner2.pk(), &mut OsRng),
        ],
        old_keys: [owner1, owner2],
        // 22 coins in, 23 out.
        recipients: [
            (Gamma::new(9, 10), recipient.pk()),
            (Gamma::new(14, 3), recipient.pk()),
        ],
    };

    let err = build_transfer::<2>(&registry, &session, BIDDER_1, 6, &spec, &mut OsRng)
        .expect_err("unbalanced witness must not prove");
    assert!(matches!(
        err,
        BuilderError::Proof(ProofError::Synthesis(_))
    ));
}

/// S3: replaying a transfer with the same openings is a double spend; the
/// first submission's state is untouched.
#[tokio::test(flavor = "multi_thread")]
async fn double_spend_is_rejected() {
    let registry = registry();
    let (_, recipient_addr) = serve_sessions(7).await;
    let sender_sessions = SessionManager::new(BIDDER_1);
    let session = sender_sessions.establish(7, recipient_addr).await.unwrap();

    let validator_sessions = Arc::new(SessionManager::new(VALIDATOR_ID));
    let mut validator = Validator::new(
        VALIDATOR_ID,
        Arc::clone(&registry),
        PeerTable::new([(7, recipient_addr)]),
        validator_sessions,
        None,
    );

    let owner1 = KeyPair::random(&mut OsRng);
    let owner2 = KeyPair::random(&mut OsRng);
    let recipient = KeyPair::random(&mut OsRng);
    let spec = TransferSpec {
        old_notes: [
            Note::mint(Gamma::new(12, 5), owner1.pk(), &mut OsRng),
            Note::mint(Gamma::new(10, 8), owner2.pk(), &mut OsRng),
        ],
        old_keys: [owner1, owner2],
        recipients: [
            (Gamma::new(9, 10), recipient.pk()),
            (Gamma::new(13, 3), recipient.pk()),
        ],
    };
    let built = build_transfer::<2>(&registry, &session, BIDDER_1, 7, &spec, &mut OsRng).unwrap();

    assert_eq!(validator.submit(&Message::Tx(built.payload.clone())).await, None);
    let commitments_after_first = validator.commitments().len();

    assert_eq!(
        validator.submit(&Message::Tx(built.payload)).await,
        Some(RejectReason::DoubleSpend)
    );
    assert_eq!(validator.nullifier_count(), 2);
    assert_eq!(validator.commitments().len(), commitments_after_first);
    assert_eq!(validator.transfer_log().len(), 1);
}

/// S4: two registrations clear through a two-slot auction; the validator
/// verifies both sub-proofs and appends two nullifiers and two
/// commitments for the settlement.
#[tokio::test(flavor = "multi_thread")]
async fn register_and_auction_two_bidders() {
    let registry = registry();
    let mut h = harness().await;

    // Bidders register over their sessions with the auctioneer.
    let mut registrations = Vec::new();
    for (bidder, coins, energy, bid) in [(BIDDER_1, 13, 2, 13), (BIDDER_2, 15, 1, 15)] {
        let bidder_sessions = SessionManager::new(bidder);
        let session = bidder_sessions
            .establish(AUCTIONEER_ID, h.auctioneer_addr)
            .await
            .unwrap();

        let owner = KeyPair::random(&mut OsRng);
        let spec = RegisterSpec {
            old_note: Note::mint(Gamma::new(coins, energy), owner.pk(), &mut OsRng),
            old_key: owner,
            bid,
            payout_pk: owner.pk(),
        };
        let built =
            build_register(&registry, &session, bidder, AUCTIONEER_ID, &spec, &mut OsRng)
                .unwrap();

        assert_eq!(
            h.validator
                .submit(&Message::Register(built.payload.clone()))
                .await,
            None
        );
        registrations.push(built.payload);
    }
    assert_eq!(h.validator.pending_registrations().len(), 2);
    let nullifiers_before = h.validator.nullifier_count();
    let commitments_before = h.validator.commitments().len();

    // The auctioneer consumes the forwarded registrations.
    let mut auctioneer = Auctioneer::new(
        AUCTIONEER_ID,
        Arc::clone(&registry),
        PeerTable::default(),
        Arc::clone(&h.auctioneer_sessions),
        VALIDATOR_ID,
        2,
    );
    for payload in &registrations {
        auctioneer.accept_registration(payload).unwrap();
    }
    assert!(auctioneer.ready());

    // Auctioneer and validator settle a session directly.
    let (auctioneer_side, _validator_side) = pair_sessions(
        &h.auctioneer_sessions,
        AUCTIONEER_ID,
        &h.validator_sessions,
        VALIDATOR_ID,
    );

    let payload = auctioneer.build_settlement(&auctioneer_side).unwrap();
    assert_eq!(h.validator.submit(&Message::Auction(payload)).await, None);

    assert_eq!(h.validator.nullifier_count(), nullifiers_before + 2);
    assert_eq!(h.validator.commitments().len(), commitments_before + 2);
    assert_eq!(h.validator.auction_log().len(), 1);
    assert!(h.validator.pending_registrations().is_empty());
}

/// S5: a flipped bit in the sealed envelope invalidates the registration.
#[tokio::test(flavor = "multi_thread")]
async fn tampered_aux_ciphertext_is_rejected() {
    let registry = registry();
    let mut h = harness().await;

    let bidder_sessions = SessionManager::new(BIDDER_1);
    let session = bidder_sessions
        .establish(AUCTIONEER_ID, h.auctioneer_addr)
        .await
        .unwrap();

    let owner = KeyPair::random(&mut OsRng);
    let spec = RegisterSpec {
        old_note: Note::mint(Gamma::new(13, 2), owner.pk(), &mut OsRng),
        old_key: owner,
        bid: 13,
        payout_pk: owner.pk(),
    };
    let mut built =
        build_register(&registry, &session, BIDDER_1, AUCTIONEER_ID, &spec, &mut OsRng).unwrap();

    built.payload.aux[0][31] ^= 0x01;

    assert_eq!(
        h.validator.submit(&Message::Register(built.payload)).await,
        Some(RejectReason::InvalidProof)
    );
    assert_eq!(h.validator.nullifier_count(), 0);
    assert!(h.validator.pending_registrations().is_empty());
}

/// S6: both ends of a socket exchange agree on the shared point
/// bit for bit.
#[tokio::test(flavor = "multi_thread")]
async fn dh_exchange_agrees_across_sockets() {
    let (responder_sessions, addr) = serve_sessions(8).await;
    let initiator_sessions = SessionManager::new(9);

    let initiator = initiator_sessions.establish(8, addr).await.unwrap();
    let responder = responder_sessions.get(9).unwrap();

    let a = jubjub::AffinePoint::from(&initiator.shared);
    let b = jubjub::AffinePoint::from(&responder.shared);
    assert_eq!(
        zea_core::encoding::scalar_to_bytes(&a.get_u()),
        zea_core::encoding::scalar_to_bytes(&b.get_u())
    );
    assert_eq!(
        zea_core::encoding::scalar_to_bytes(&a.get_v()),
        zea_core::encoding::scalar_to_bytes(&b.get_v())
    );

    // Re-establishing returns the retained session instead of a new one.
    let again = initiator_sessions.establish(8, addr).await.unwrap();
    assert_eq!(again.shared, initiator.shared);
}
