//! The validator: proof checking and the append-only ledger.
//!
//! One validator task owns the nullifier set, the commitment sequence, the
//! per-kind transaction logs and the pending-registration list, and
//! processes one submission at a time; that single consumer is the
//! protocol's total order. Counter-party exchange parameters are fetched
//! on demand and never trusted from the submitter. Proof verification
//! runs on the blocking pool; no state is held across it.

use std::collections::HashSet;
use std::sync::Arc;

use bls12_381::Scalar;
use tokio::sync::mpsc;
use tracing::{info, warn};
use zea_core::dh::{self, PeerId};
use zea_core::encoding::{FieldBytes, point_from_coordinates};
use zea_core::schema::{
    AuctionPayload, DhRequest, DhResponse, Message, RegisterPayload, TransferPayload,
};
use zea_proofs::instance::{
    AuctionInstance, AuctionSlotInstance, DhTriple, RegisterInstance, TransferInstance,
};
use zea_proofs::verifier::verify_proof_bytes;
use zea_proofs::{CircuitKind, ParamsRegistry};

use crate::peers::PeerTable;
use crate::session::SessionManager;
use crate::transport;

/// Reason code attached to every rejection log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    /// Payload shape or encoding is invalid.
    #[error("malformed_payload")]
    MalformedPayload,
    /// Slot count is not a supported circuit arity.
    #[error("wrong_arity")]
    WrongArity,
    /// The counter-party is not in the routing table.
    #[error("unknown_peer")]
    UnknownPeer,
    /// The counter-party's exchange parameters could not be fetched in
    /// time; the transaction is rejected, never silently accepted.
    #[error("dh_fetch_failed")]
    DhFetchFailed,
    /// A proof failed verification against the derived public witness.
    #[error("invalid_proof")]
    InvalidProof,
    /// An input serial number was already revealed.
    #[error("double_spend")]
    DoubleSpend,
    /// An auction slot references no accepted registration.
    #[error("unknown_registration")]
    UnknownRegistration,
    /// An auction slot disagrees with its accepted registration.
    #[error("registration_mismatch")]
    RegistrationMismatch,
    /// Parameters for the required circuit kind are unavailable.
    #[error("setup_missing")]
    SetupMissing,
    /// The verification task was cancelled.
    #[error("internal")]
    Internal,
}

/// An accepted registration waiting for the auctioneer.
#[derive(Debug, Clone)]
pub struct PendingRegistration {
    /// The registering bidder.
    pub bidder: PeerId,
    /// The full accepted payload.
    pub payload: RegisterPayload,
}

/// The validator's state and collaborator handles.
pub struct Validator {
    node_id: PeerId,
    registry: Arc<ParamsRegistry>,
    peers: PeerTable,
    sessions: Arc<SessionManager>,
    auctioneer: Option<PeerId>,
    nullifiers: HashSet<FieldBytes>,
    commitments: Vec<FieldBytes>,
    transfer_log: Vec<TransferPayload>,
    register_log: Vec<RegisterPayload>,
    auction_log: Vec<AuctionPayload>,
    pending_registrations: Vec<PendingRegistration>,
}

impl Validator {
    /// A fresh validator with empty ledger state.
    #[must_use]
    pub fn new(
        node_id: PeerId,
        registry: Arc<ParamsRegistry>,
        peers: PeerTable,
        sessions: Arc<SessionManager>,
        auctioneer: Option<PeerId>,
    ) -> Self {
        Self {
            node_id,
            registry,
            peers,
            sessions,
            auctioneer,
            nullifiers: HashSet::new(),
            commitments: Vec::new(),
            transfer_log: Vec::new(),
            register_log: Vec::new(),
            auction_log: Vec::new(),
            pending_registrations: Vec::new(),
        }
    }

    /// Drain the submission channel, one transaction at a time.
    pub async fn run(mut self, mut rx: mpsc::Receiver<Message>) {
        while let Some(message) = rx.recv().await {
            self.submit(&message).await;
        }
    }

    /// Process one submission, logging the outcome. Returns the reject
    /// reason for callers that need it (tests, the inline run loop).
    pub async fn submit(&mut self, message: &Message) -> Option<RejectReason> {
        let (kind, sender, outcome) = match message {
            Message::Tx(payload) => (
                "transfer",
                payload.sender,
                self.process_transfer(payload).await,
            ),
            Message::Register(payload) => (
                "register",
                payload.transfer.sender,
                self.process_register(payload).await,
            ),
            Message::Auction(payload) => (
                "auction",
                payload.transfer.sender,
                self.process_auction(payload).await,
            ),
            Message::DiffieHellman(_)
            | Message::DhRequest(_)
            | Message::DhResponse(_)
            | Message::Relay(_) => return None,
        };

        match outcome {
            Ok(()) => {
                info!(
                    node = self.node_id,
                    from = sender,
                    kind,
                    nullifiers = self.nullifiers.len(),
                    commitments = self.commitments.len(),
                    "transaction accepted"
                );
                None
            }
            Err(reason) => {
                warn!(
                    node = self.node_id,
                    from = sender,
                    kind,
                    reason = %reason,
                    "transaction rejected"
                );
                Some(reason)
            }
        }
    }

    /// Number of revealed serial numbers.
    #[must_use]
    pub fn nullifier_count(&self) -> usize {
        self.nullifiers.len()
    }

    /// The append-only commitment sequence.
    #[must_use]
    pub fn commitments(&self) -> &[FieldBytes] {
        &self.commitments
    }

    /// Accepted transfers, in order.
    #[must_use]
    pub fn transfer_log(&self) -> &[TransferPayload] {
        &self.transfer_log
    }

    /// Accepted registrations, in order.
    #[must_use]
    pub fn register_log(&self) -> &[RegisterPayload] {
        &self.register_log
    }

    /// Accepted auction results, in order.
    #[must_use]
    pub fn auction_log(&self) -> &[AuctionPayload] {
        &self.auction_log
    }

    /// Registrations not yet consumed by an auction.
    #[must_use]
    pub fn pending_registrations(&self) -> &[PendingRegistration] {
        &self.pending_registrations
    }

    async fn process_transfer(&mut self, payload: &TransferPayload) -> Result<(), RejectReason> {
        let dh = self.fetch_dh(payload.target, payload.sender).await?;
        let instance = TransferInstance::from_payload(payload, dh)
            .map_err(|_| RejectReason::MalformedPayload)?;

        self.verify(instance.kind, payload.proof.clone(), instance.to_inputs())
            .await?;

        let serials = fresh_serials(&self.nullifiers, payload.inputs.iter().map(|i| i.sn))?;
        self.apply_transfer(payload, serials);
        Ok(())
    }

    async fn process_register(&mut self, payload: &RegisterPayload) -> Result<(), RejectReason> {
        // The inner transfer must be the one-input kind and its minted
        // note must be the one the envelope commits to.
        let [output] = payload.transfer.outputs.as_slice() else {
            return Err(RejectReason::WrongArity);
        };
        if output.cm != payload.cm_in {
            return Err(RejectReason::MalformedPayload);
        }

        // One fetch serves both proofs: the register circuit binds the
        // same session as the inner transfer.
        let dh = self
            .fetch_dh(payload.transfer.target, payload.transfer.sender)
            .await?;

        let transfer_instance = TransferInstance::from_payload(&payload.transfer, dh)
            .map_err(|_| RejectReason::MalformedPayload)?;
        if transfer_instance.kind != CircuitKind::Transfer1 {
            return Err(RejectReason::WrongArity);
        }
        self.verify(
            CircuitKind::Transfer1,
            payload.transfer.proof.clone(),
            transfer_instance.to_inputs(),
        )
        .await?;

        let register_instance = RegisterInstance::from_payload(payload, dh)
            .map_err(|_| RejectReason::MalformedPayload)?;
        self.verify(
            CircuitKind::Register,
            payload.proof.clone(),
            register_instance.to_inputs(),
        )
        .await?;

        let serials = fresh_serials(
            &self.nullifiers,
            payload.transfer.inputs.iter().map(|i| i.sn),
        )?;
        self.apply_register(payload, serials);

        self.forward_to_auctioneer(payload).await;
        Ok(())
    }

    async fn process_auction(&mut self, payload: &AuctionPayload) -> Result<(), RejectReason> {
        AuctionInstance::arity_of(payload).map_err(|_| RejectReason::WrongArity)?;
        if payload.slots.len() != payload.transfer.inputs.len() {
            return Err(RejectReason::WrongArity);
        }

        // The minting transfer and the clearing proof must consume the
        // same notes and mint the same outputs.
        for (slot, input) in payload.slots.iter().zip(&payload.transfer.inputs) {
            if slot.input.sn != input.sn || slot.input.cm != input.cm {
                return Err(RejectReason::MalformedPayload);
            }
        }
        for (slot, output) in payload.slots.iter().zip(&payload.transfer.outputs) {
            if slot.out_cm != output.cm
                || slot.out_coins != output.coins
                || slot.out_energy != output.energy
            {
                return Err(RejectReason::MalformedPayload);
            }
        }

        // Every slot must replay an accepted registration verbatim.
        for slot in &payload.slots {
            let pending = self
                .pending_registrations
                .iter()
                .find(|p| p.bidder == slot.bidder)
                .ok_or(RejectReason::UnknownRegistration)?;
            if pending.payload.cm_in != slot.input.cm
                || pending.payload.aux != slot.aux
                || pending.payload.coins_in != slot.input.coins
                || pending.payload.energy_in != slot.input.energy
            {
                return Err(RejectReason::RegistrationMismatch);
            }
        }

        // The minting transfer targets this validator; its session with
        // the auctioneer resolves locally.
        let transfer_dh = self
            .fetch_dh(payload.transfer.target, payload.transfer.sender)
            .await?;
        let transfer_instance = TransferInstance::from_payload(&payload.transfer, transfer_dh)
            .map_err(|_| RejectReason::MalformedPayload)?;
        self.verify(
            transfer_instance.kind,
            payload.transfer.proof.clone(),
            transfer_instance.to_inputs(),
        )
        .await?;

        // Per-slot parameters come from the auctioneer's session with
        // each bidder.
        let mut slots = Vec::with_capacity(payload.slots.len());
        for slot in &payload.slots {
            let dh = self.fetch_dh(payload.transfer.sender, slot.bidder).await?;
            slots.push(
                AuctionSlotInstance::from_payload(slot, dh)
                    .map_err(|_| RejectReason::MalformedPayload)?,
            );
        }
        let auction_instance =
            AuctionInstance::new(slots).map_err(|_| RejectReason::WrongArity)?;
        self.verify(
            auction_instance.kind,
            payload.proof.clone(),
            auction_instance.to_inputs(),
        )
        .await?;

        let serials = fresh_serials(
            &self.nullifiers,
            payload.transfer.inputs.iter().map(|i| i.sn),
        )?;
        self.apply_auction(payload, serials);
        Ok(())
    }

    /// Fetch the counter-party's exchange parameters: locally when the
    /// counter-party is this node, otherwise with a `dh_request` round
    /// trip. A timeout rejects the pending transaction.
    async fn fetch_dh(
        &self,
        counterparty: PeerId,
        sender: PeerId,
    ) -> Result<DhTriple, RejectReason> {
        let response = if counterparty == self.node_id {
            self.sessions
                .params_for(sender)
                .map_err(|_| RejectReason::UnknownPeer)?
        } else {
            let addr = self
                .peers
                .addr_of(counterparty)
                .ok_or(RejectReason::UnknownPeer)?;
            let request = Message::DhRequest(DhRequest { sender });
            match transport::request(addr, &request).await {
                Ok(Message::DhResponse(response)) => response,
                Ok(_) => return Err(RejectReason::MalformedPayload),
                Err(_) => return Err(RejectReason::DhFetchFailed),
            }
        };
        triple_from_response(&response)
    }

    async fn verify(
        &self,
        kind: CircuitKind,
        proof: Vec<u8>,
        inputs: Vec<Scalar>,
    ) -> Result<(), RejectReason> {
        let registry = Arc::clone(&self.registry);
        tokio::task::spawn_blocking(move || {
            let params = registry.get(kind).map_err(|_| RejectReason::SetupMissing)?;
            verify_proof_bytes(params, &proof, &inputs).map_err(|_| RejectReason::InvalidProof)
        })
        .await
        .map_err(|_| RejectReason::Internal)?
    }

    fn apply_transfer(&mut self, payload: &TransferPayload, serials: Vec<FieldBytes>) {
        self.nullifiers.extend(serials);
        self.commitments
            .extend(payload.outputs.iter().map(|o| o.cm));
        self.transfer_log.push(payload.clone());
    }

    fn apply_register(&mut self, payload: &RegisterPayload, serials: Vec<FieldBytes>) {
        self.nullifiers.extend(serials);
        self.commitments
            .extend(payload.transfer.outputs.iter().map(|o| o.cm));
        self.register_log.push(payload.clone());
        self.pending_registrations.push(PendingRegistration {
            bidder: payload.transfer.sender,
            payload: payload.clone(),
        });
    }

    fn apply_auction(&mut self, payload: &AuctionPayload, serials: Vec<FieldBytes>) {
        self.nullifiers.extend(serials);
        self.commitments
            .extend(payload.transfer.outputs.iter().map(|o| o.cm));
        let consumed: Vec<PeerId> = payload.slots.iter().map(|s| s.bidder).collect();
        self.pending_registrations
            .retain(|p| !consumed.contains(&p.bidder));
        self.auction_log.push(payload.clone());
    }

    async fn forward_to_auctioneer(&self, payload: &RegisterPayload) {
        let Some(auctioneer) = self.auctioneer else {
            return;
        };
        let Some(addr) = self.peers.addr_of(auctioneer) else {
            warn!(node = self.node_id, auctioneer, "auctioneer address unknown");
            return;
        };
        if let Err(err) =
            transport::send_oneshot(addr, &Message::Register(payload.clone())).await
        {
            // The registration stays accepted; the auctioneer can be fed
            // again from the pending list.
            warn!(node = self.node_id, auctioneer, error = %err, "forwarding registration failed");
        }
    }
}

/// Check that every serial number is fresh, both against the ledger and
/// within the submission itself.
fn fresh_serials(
    ledger: &HashSet<FieldBytes>,
    serials: impl Iterator<Item = FieldBytes>,
) -> Result<Vec<FieldBytes>, RejectReason> {
    let mut fresh = Vec::new();
    for sn in serials {
        if ledger.contains(&sn) || fresh.contains(&sn) {
            return Err(RejectReason::DoubleSpend);
        }
        fresh.push(sn);
    }
    Ok(fresh)
}

/// Interpret a `dh_response` as the proof's exchange triple: the stored
/// partner point is the prover's own (`G*r` slot for transfers, `G*r`
/// position always), the responder's own point fills the `G*b` slot.
fn triple_from_response(response: &DhResponse) -> Result<DhTriple, RejectReason> {
    let g_r = point_from_coordinates(&response.partner_public.u, &response.partner_public.v)
        .map_err(|_| RejectReason::MalformedPayload)?;
    let g_b = point_from_coordinates(&response.ephemeral_public.u, &response.ephemeral_public.v)
        .map_err(|_| RejectReason::MalformedPayload)?;
    Ok(DhTriple {
        generator: dh::generator(),
        g_b,
        g_r,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "unit-test")]

    use super::*;

    #[test]
    fn fresh_serials_rejects_ledger_and_intra_submission_duplicates() {
        let mut ledger = HashSet::new();
        let a = [1_u8; 32];
        let b = [2_u8; 32];
        ledger.insert(a);

        assert_eq!(
            fresh_serials(&ledger, [b, b].into_iter()),
            Err(RejectReason::DoubleSpend)
        );
        assert_eq!(
            fresh_serials(&ledger, [a].into_iter()),
            Err(RejectReason::DoubleSpend)
        );
        assert_eq!(fresh_serials(&ledger, [b].into_iter()), Ok(vec![b]));
    }
}
