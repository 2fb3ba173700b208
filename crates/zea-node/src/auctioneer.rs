//! The auctioneer: envelope decryption, clearing, minting, proving.
//!
//! Accepted registrations arrive from the validator. For each one the
//! auctioneer opens the note ciphertext and the sealed envelope with its
//! session key for that bidder, cross-checks them, and queues the bid. A
//! full batch triggers clearing: output notes are minted for the sealed
//! payout identifiers, and the combined result (minting transfer plus
//! clearing proof) is submitted to the validator.

use std::sync::Arc;

use bls12_381::Scalar;
use rand::rngs::OsRng;
use tokio::sync::mpsc;
use tracing::{info, warn};
use zea_circuit::AuctionCircuit;
use zea_circuit::auction::AuctionSlotAssignment;
use zea_core::cipher::{AuxPlaintext, NotePlaintext};
use zea_core::dh::{DhSession, PeerId};
use zea_core::encoding::{scalar_from_bytes, scalar_to_bytes};
use zea_core::keys::KeyPair;
use zea_core::mimc;
use zea_core::note::{Gamma, Note};
use zea_core::schema::{
    AuctionPayload, AuctionSlot, AuxCiphertextBytes, Message, NoteCiphertextBytes,
    RegisterPayload,
};
use zea_proofs::prover::{create_proof, encode_proof};
use zea_proofs::{CircuitKind, ParamsRegistry};

use crate::builder::{BuilderError, TransferSpec, build_transfer, responder_assignment};
use crate::peers::PeerTable;
use crate::session::{SessionError, SessionManager};
use crate::transport::{self, TransportError};

/// Auctioneer-side failures.
#[derive(Debug, thiserror::Error)]
pub enum AuctioneerError {
    /// No session exists with the registering bidder.
    #[error("no session with bidder {0}")]
    UnknownPeer(PeerId),
    /// A ciphertext decrypted inconsistently; the slot is dropped before
    /// proving.
    #[error("registration decrypts inconsistently: {0}")]
    Consistency(&'static str),
    /// Building or proving the result failed; no state changes.
    #[error(transparent)]
    Builder(#[from] BuilderError),
    /// The session with the validator could not be established.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// Submitting the result failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The configured auction size has no matching circuit.
    #[error("unsupported auction size {0}")]
    WrongArity(usize),
    /// The validator's address is not in the routing table.
    #[error("validator address unknown")]
    NoValidatorRoute,
}

/// A decrypted, consistency-checked registration awaiting clearing.
#[derive(Debug, Clone)]
pub struct RegisteredBid {
    /// The registering bidder.
    pub bidder: PeerId,
    /// The auction-entry note, fully opened.
    pub entry_note: Note,
    /// Its spending key, recovered from the envelope.
    pub entry_sk: Scalar,
    /// Where the bidder wants cleared value minted.
    pub payout_pk: Scalar,
    /// The sealed bid.
    pub bid: Scalar,
    /// The original envelope ciphertext (replayed in the public result).
    pub aux: AuxCiphertextBytes,
    /// The session with this bidder.
    pub session: DhSession,
}

/// The auctioneer's state and collaborator handles.
pub struct Auctioneer {
    node_id: PeerId,
    registry: Arc<ParamsRegistry>,
    peers: PeerTable,
    sessions: Arc<SessionManager>,
    validator: PeerId,
    auction_size: usize,
    pending: Vec<RegisteredBid>,
}

impl Auctioneer {
    /// A fresh auctioneer clearing batches of `auction_size` bids.
    #[must_use]
    pub fn new(
        node_id: PeerId,
        registry: Arc<ParamsRegistry>,
        peers: PeerTable,
        sessions: Arc<SessionManager>,
        validator: PeerId,
        auction_size: usize,
    ) -> Self {
        Self {
            node_id,
            registry,
            peers,
            sessions,
            validator,
            auction_size,
            pending: Vec::new(),
        }
    }

    /// Drain forwarded registrations, settling whenever a batch fills.
    pub async fn run(mut self, mut rx: mpsc::Receiver<Message>) {
        while let Some(message) = rx.recv().await {
            let Message::Register(payload) = message else {
                continue;
            };
            match self.accept_registration(&payload) {
                Ok(()) => info!(
                    node = self.node_id,
                    from = payload.transfer.sender,
                    pending = self.pending.len(),
                    "registration queued"
                ),
                Err(err) => {
                    warn!(node = self.node_id, error = %err, "registration dropped");
                    continue;
                }
            }
            if self.ready() {
                if let Err(err) = self.settle().await {
                    // Nothing was consumed; the batch retries on the next
                    // registration.
                    warn!(node = self.node_id, error = %err, "auction settlement failed");
                }
            }
        }
    }

    /// Whether a full batch is queued.
    #[must_use]
    pub fn ready(&self) -> bool {
        self.pending.len() >= self.auction_size
    }

    /// The queued bids.
    #[must_use]
    pub fn pending(&self) -> &[RegisteredBid] {
        &self.pending
    }

    /// Decrypt and cross-check one forwarded registration.
    ///
    /// # Errors
    /// Missing sessions and inconsistent ciphertexts drop the slot.
    pub fn accept_registration(
        &mut self,
        payload: &RegisterPayload,
    ) -> Result<(), AuctioneerError> {
        let bidder = payload.transfer.sender;
        let session = self
            .sessions
            .get(bidder)
            .ok_or(AuctioneerError::UnknownPeer(bidder))?;

        let [output] = payload.transfer.outputs.as_slice() else {
            return Err(AuctioneerError::Consistency("inner transfer arity"));
        };

        let entry_note = decrypt_note(&session, &output.ciphertext)?;
        if scalar_to_bytes(&entry_note.cm) != payload.cm_in {
            return Err(AuctioneerError::Consistency("entry commitment"));
        }

        let aux = decrypt_aux(&session, &payload.aux)?;
        if aux.coins != entry_note.value.coins || aux.energy != entry_note.value.energy {
            return Err(AuctioneerError::Consistency("envelope amounts"));
        }
        if mimc::derive_pk(aux.sk_in) != entry_note.pk_owner {
            return Err(AuctioneerError::Consistency("envelope spending key"));
        }

        tracing::debug!(
            node = self.node_id,
            bidder,
            cm = %zea_core::encoding::fmt_digest(&entry_note.cm),
            "registration decrypted"
        );
        self.pending.push(RegisteredBid {
            bidder,
            entry_note,
            entry_sk: aux.sk_in,
            payout_pk: aux.pk_out,
            bid: aux.bid,
            aux: payload.aux,
            session,
        });
        Ok(())
    }

    /// Build the settlement payload for the current batch without
    /// submitting it.
    ///
    /// # Errors
    /// Fails on unsupported sizes and proving failures; the queue is
    /// untouched either way.
    pub fn build_settlement(
        &self,
        validator_session: &DhSession,
    ) -> Result<AuctionPayload, AuctioneerError> {
        let batch: Vec<RegisteredBid> =
            self.pending.iter().take(self.auction_size).cloned().collect();
        dispatch_build(
            &self.registry,
            self.node_id,
            self.validator,
            validator_session,
            &batch,
            self.auction_size,
        )
    }

    /// Clear the queued batch, prove, and submit the result.
    ///
    /// # Errors
    /// Any failure leaves the queue untouched for a retry.
    pub async fn settle(&mut self) -> Result<(), AuctioneerError> {
        let batch: Vec<RegisteredBid> =
            self.pending.iter().take(self.auction_size).cloned().collect();

        let validator_addr = self
            .peers
            .addr_of(self.validator)
            .ok_or(AuctioneerError::NoValidatorRoute)?;
        let validator_session = self
            .sessions
            .establish(self.validator, validator_addr)
            .await?;

        let registry = Arc::clone(&self.registry);
        let node_id = self.node_id;
        let validator = self.validator;
        let size = self.auction_size;
        let batch_for_proving = batch.clone();

        // Proving is CPU-bound; keep it off the async worker.
        let payload = tokio::task::spawn_blocking(move || {
            dispatch_build(
                &registry,
                node_id,
                validator,
                &validator_session,
                &batch_for_proving,
                size,
            )
        })
        .await
        .map_err(|_| AuctioneerError::Consistency("proving task cancelled"))??;

        transport::send_oneshot(validator_addr, &Message::Auction(payload)).await?;

        let consumed: Vec<PeerId> = batch.iter().map(|b| b.bidder).collect();
        self.pending.retain(|b| !consumed.contains(&b.bidder));
        info!(node = self.node_id, cleared = consumed.len(), "auction settled");
        Ok(())
    }
}

fn dispatch_build(
    registry: &ParamsRegistry,
    node_id: PeerId,
    validator: PeerId,
    validator_session: &DhSession,
    batch: &[RegisteredBid],
    size: usize,
) -> Result<AuctionPayload, AuctioneerError> {
    match size {
        2 => build_result::<2>(registry, node_id, validator, validator_session, batch),
        3 => build_result::<3>(registry, node_id, validator, validator_session, batch),
        n => Err(AuctioneerError::WrongArity(n)),
    }
}

/// The clearing function over the full bid vector.
///
/// Identity per slot: each winner is paid exactly what it brought in. A
/// richer allocation rule replaces this function and the circuit's
/// per-slot equality constraints together.
fn clearing(bids: &[RegisteredBid]) -> Vec<Gamma> {
    bids.iter().map(|b| b.entry_note.value).collect()
}

fn decrypt_note(
    session: &DhSession,
    ciphertext: &NoteCiphertextBytes,
) -> Result<Note, AuctioneerError> {
    let mut elements = [Scalar::zero(); 6];
    for (slot, raw) in elements.iter_mut().zip(ciphertext.iter()) {
        *slot =
            scalar_from_bytes(raw).map_err(|_| AuctioneerError::Consistency("note ciphertext"))?;
    }
    NotePlaintext::decrypt(&session.shared, &elements)
        .into_note()
        .ok_or(AuctioneerError::Consistency("note opening"))
}

fn decrypt_aux(
    session: &DhSession,
    ciphertext: &AuxCiphertextBytes,
) -> Result<AuxPlaintext, AuctioneerError> {
    let mut elements = [Scalar::zero(); 5];
    for (slot, raw) in elements.iter_mut().zip(ciphertext.iter()) {
        *slot = scalar_from_bytes(raw)
            .map_err(|_| AuctioneerError::Consistency("aux ciphertext"))?;
    }
    Ok(AuxPlaintext::decrypt(&session.shared, &elements))
}

#[allow(
    clippy::indexing_slicing,
    reason = "batch length is checked against N by the caller dispatch"
)]
fn build_result<const N: usize>(
    registry: &ParamsRegistry,
    node_id: PeerId,
    validator: PeerId,
    validator_session: &DhSession,
    batch: &[RegisteredBid],
) -> Result<AuctionPayload, AuctioneerError> {
    if batch.len() < N {
        return Err(AuctioneerError::WrongArity(batch.len()));
    }
    let cleared = clearing(batch);

    // Mint the cleared outputs through the N-input transfer; its minted
    // notes are the same ones the clearing proof opens.
    let old_notes: [Note; N] = core::array::from_fn(|i| batch[i].entry_note);
    let old_keys: [KeyPair; N] = core::array::from_fn(|i| KeyPair::from_sk(batch[i].entry_sk));
    let recipients: [(Gamma, Scalar); N] =
        core::array::from_fn(|i| (cleared[i], batch[i].payout_pk));

    let transfer = build_transfer::<N>(
        registry,
        validator_session,
        node_id,
        validator,
        &TransferSpec {
            old_notes,
            old_keys,
            recipients,
        },
        &mut OsRng,
    )?;

    let mut slots = [AuctionSlotAssignment::default(); N];
    let mut wire_slots = Vec::with_capacity(N);
    for i in 0..N {
        let bid = &batch[i];
        let minted = &transfer.minted[i];

        slots[i] = AuctionSlotAssignment {
            in_coins: Some(bid.entry_note.value.coins),
            in_energy: Some(bid.entry_note.value.energy),
            in_cm: Some(bid.entry_note.cm),
            in_sn: Some(bid.entry_note.serial_number(bid.entry_sk)),
            in_pk: Some(bid.entry_note.pk_owner),
            out_coins: Some(minted.value.coins),
            out_energy: Some(minted.value.energy),
            out_cm: Some(minted.cm),
            out_pk: Some(minted.pk_owner),
            in_sk: Some(bid.entry_sk),
            in_rho: Some(bid.entry_note.rho),
            in_rcm: Some(bid.entry_note.rcm),
            bid: Some(bid.bid),
            out_rho: Some(minted.rho),
            out_rcm: Some(minted.rcm),
            dh: responder_assignment(&bid.session),
        };

        wire_slots.push(AuctionSlot {
            bidder: bid.bidder,
            input: transfer.payload.inputs[i],
            out_coins: scalar_to_bytes(&minted.value.coins),
            out_energy: scalar_to_bytes(&minted.value.energy),
            out_cm: scalar_to_bytes(&minted.cm),
            out_pk: scalar_to_bytes(&minted.pk_owner),
            aux: bid.aux,
            out_rho: scalar_to_bytes(&minted.rho),
            out_rcm: scalar_to_bytes(&minted.rcm),
        });
    }

    let kind = CircuitKind::auction_for_arity(N).ok_or(AuctioneerError::WrongArity(N))?;
    let circuit = AuctionCircuit::<N> { slots };
    let proof = encode_proof(
        &create_proof(registry.get(kind).map_err(BuilderError::from)?, circuit, &mut OsRng)
            .map_err(BuilderError::from)?,
    );

    Ok(AuctionPayload {
        transfer: transfer.payload,
        slots: wire_slots,
        proof,
    })
}
