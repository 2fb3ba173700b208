//! Transaction builders.
//!
//! Builders sample per-note randomness, compute commitments, serial
//! numbers and ciphertexts natively, assemble the matching circuit
//! witness, prove, and package the wire payload. Given the same
//! randomness every derived public field is identical, so test suites
//! seed the generator.

use bls12_381::Scalar;
use rand::RngCore;
use zea_circuit::gadgets::DhAssignment;
use zea_circuit::transfer::{NewNoteAssignment, OldNoteAssignment};
use zea_circuit::{RegisterCircuit, TransferCircuit};
use zea_core::cipher::{AuxPlaintext, NotePlaintext};
use zea_core::dh::{self, DhSession, PeerId};
use zea_core::encoding::scalar_to_bytes;
use zea_core::keys::KeyPair;
use zea_core::note::{Gamma, Note};
use zea_core::schema::{RegisterPayload, TransferInput, TransferOutput, TransferPayload};
use zea_proofs::prover::{create_proof, encode_proof};
use zea_proofs::{CircuitKind, ParamsRegistry, ProofError, SetupError};

/// Builder failures.
#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
    /// Proving failed; for an unsatisfiable witness (e.g. a conservation
    /// violation) nothing is emitted.
    #[error(transparent)]
    Proof(#[from] ProofError),
    /// The registry has no parameters for the required circuit kind.
    #[error(transparent)]
    Setup(#[from] SetupError),
    /// The arity has no matching circuit kind.
    #[error("unsupported arity {0}")]
    UnsupportedArity(usize),
}

/// The exchange witness for a prover holding the session's own secret,
/// with its own point in the `G*r` slot (transfer and register proofs).
#[must_use]
pub fn initiator_assignment(session: &DhSession) -> DhAssignment {
    DhAssignment {
        generator: Some(dh::generator()),
        g_b: Some(session.partner_public),
        g_r: Some(session.ephemeral_public),
        secret: Some(session.secret()),
        shared: Some(session.shared),
    }
}

/// The exchange witness for a prover holding the session's own secret,
/// with its own point in the `G*b` slot (auction proofs).
#[must_use]
pub fn responder_assignment(session: &DhSession) -> DhAssignment {
    DhAssignment {
        generator: Some(dh::generator()),
        g_b: Some(session.ephemeral_public),
        g_r: Some(session.partner_public),
        secret: Some(session.secret()),
        shared: Some(session.shared),
    }
}

/// What a transfer spends and who receives the minted notes.
#[derive(Debug, Clone, Copy)]
pub struct TransferSpec<const N: usize> {
    /// The notes being consumed.
    pub old_notes: [Note; N],
    /// Their owners' key pairs.
    pub old_keys: [KeyPair; N],
    /// Value and owner identifier per minted note.
    pub recipients: [(Gamma, Scalar); N],
}

/// A packaged transfer plus the sender-side openings of the minted notes.
#[derive(Debug, Clone)]
pub struct BuiltTransfer {
    /// The wire payload.
    pub payload: TransferPayload,
    /// The minted notes with their secret openings.
    pub minted: Vec<Note>,
}

/// Build and prove an N-to-N transfer.
///
/// # Errors
/// Fails on missing parameters or an unsatisfiable witness.
pub fn build_transfer<const N: usize>(
    registry: &ParamsRegistry,
    session: &DhSession,
    sender: PeerId,
    target: PeerId,
    spec: &TransferSpec<N>,
    rng: &mut impl RngCore,
) -> Result<BuiltTransfer, BuilderError> {
    let kind = CircuitKind::transfer_for_arity(N).ok_or(BuilderError::UnsupportedArity(N))?;

    let mut old = [OldNoteAssignment::default(); N];
    let mut inputs = Vec::with_capacity(N);
    for ((slot, note), key) in old.iter_mut().zip(&spec.old_notes).zip(&spec.old_keys) {
        let sn = note.serial_number(key.sk());
        *slot = OldNoteAssignment {
            coins: Some(note.value.coins),
            energy: Some(note.value.energy),
            cm: Some(note.cm),
            sn: Some(sn),
            pk: Some(key.pk()),
            sk: Some(key.sk()),
            rho: Some(note.rho),
            rcm: Some(note.rcm),
        };
        inputs.push(TransferInput {
            coins: scalar_to_bytes(&note.value.coins),
            energy: scalar_to_bytes(&note.value.energy),
            cm: scalar_to_bytes(&note.cm),
            sn: scalar_to_bytes(&sn),
            pk: scalar_to_bytes(&key.pk()),
        });
    }

    let mut new = [NewNoteAssignment::default(); N];
    let mut outputs = Vec::with_capacity(N);
    let mut minted = Vec::with_capacity(N);
    for (slot, (value, pk)) in new.iter_mut().zip(&spec.recipients) {
        let note = Note::mint(*value, *pk, rng);
        let ciphertext = NotePlaintext::from_note(&note).encrypt(&session.shared);
        *slot = NewNoteAssignment {
            coins: Some(note.value.coins),
            energy: Some(note.value.energy),
            cm: Some(note.cm),
            pk: Some(note.pk_owner),
            rho: Some(note.rho),
            rcm: Some(note.rcm),
        };
        outputs.push(TransferOutput {
            coins: scalar_to_bytes(&note.value.coins),
            energy: scalar_to_bytes(&note.value.energy),
            cm: scalar_to_bytes(&note.cm),
            ciphertext: ciphertext.map(|c| scalar_to_bytes(&c)),
        });
        minted.push(note);
    }

    let circuit = TransferCircuit::<N> {
        old,
        new,
        dh: initiator_assignment(session),
    };
    let proof = encode_proof(&create_proof(registry.get(kind)?, circuit, rng)?);

    Ok(BuiltTransfer {
        payload: TransferPayload {
            sender,
            target,
            inputs,
            outputs,
            proof,
        },
        minted,
    })
}

/// What a registration commits: the spent note, the bid, and where
/// cleared value should go.
#[derive(Debug, Clone, Copy)]
pub struct RegisterSpec {
    /// The note funding the auction entry.
    pub old_note: Note,
    /// Its owner's key pair.
    pub old_key: KeyPair,
    /// The sealed bid.
    pub bid: u64,
    /// Owner identifier the cleared output should be minted for.
    pub payout_pk: Scalar,
}

/// A packaged registration plus the bidder-side secrets.
#[derive(Debug, Clone)]
pub struct BuiltRegister {
    /// The wire payload.
    pub payload: RegisterPayload,
    /// The note that entered the auction.
    pub entry_note: Note,
    /// Its freshly sampled key pair (also sealed to the auctioneer).
    pub entry_key: KeyPair,
}

/// Build and prove a registration: a one-input transfer minting the
/// auction-entry note, plus the sealed bid envelope.
///
/// # Errors
/// Fails on missing parameters or an unsatisfiable witness.
///
/// # Panics
/// Panics if the inner one-input transfer mints no note, which its arity
/// rules out.
pub fn build_register(
    registry: &ParamsRegistry,
    session: &DhSession,
    sender: PeerId,
    auctioneer: PeerId,
    spec: &RegisterSpec,
    rng: &mut impl RngCore,
) -> Result<BuiltRegister, BuilderError> {
    // The entry note gets a fresh key; its secret rides in the envelope so
    // the auctioneer can consume the note when clearing.
    let entry_key = KeyPair::random(rng);

    let inner = build_transfer::<1>(
        registry,
        session,
        sender,
        auctioneer,
        &TransferSpec {
            old_notes: [spec.old_note],
            old_keys: [spec.old_key],
            recipients: [(spec.old_note.value, entry_key.pk())],
        },
        rng,
    )?;
    let entry_note = *inner
        .minted
        .first()
        .expect("one-input transfer mints exactly one note");

    let bid = Scalar::from(spec.bid);
    let aux = AuxPlaintext {
        pk_out: spec.payout_pk,
        sk_in: entry_key.sk(),
        bid,
        coins: entry_note.value.coins,
        energy: entry_note.value.energy,
    }
    .encrypt(&session.shared);

    let circuit = RegisterCircuit {
        cm_in: Some(entry_note.cm),
        coins_in: Some(entry_note.value.coins),
        energy_in: Some(entry_note.value.energy),
        bid: Some(bid),
        rho_in: Some(entry_note.rho),
        rcm_in: Some(entry_note.rcm),
        sk_in: Some(entry_key.sk()),
        pk_in: Some(entry_key.pk()),
        pk_out: Some(spec.payout_pk),
        dh: initiator_assignment(session),
    };
    let proof = encode_proof(&create_proof(registry.get(CircuitKind::Register)?, circuit, rng)?);

    Ok(BuiltRegister {
        payload: RegisterPayload {
            transfer: inner.payload,
            cm_in: scalar_to_bytes(&entry_note.cm),
            aux: aux.map(|c| scalar_to_bytes(&c)),
            coins_in: scalar_to_bytes(&entry_note.value.coins),
            energy_in: scalar_to_bytes(&entry_note.value.energy),
            bid: scalar_to_bytes(&bid),
            proof,
        },
        entry_note,
        entry_key,
    })
}
