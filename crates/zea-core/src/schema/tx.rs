//! Transaction payload models.
//!
//! These carry exactly the public data a validator needs to rebuild the
//! Groth16 input vector off the wire, plus the opaque proof blobs. Arity
//! is implied by vector lengths; validators reject unsupported arities.

use serde::{Deserialize, Serialize};

use crate::base::dh::PeerId;
use crate::base::encoding::FieldBytes;

/// A 6-element note ciphertext in big-endian field bytes.
pub type NoteCiphertextBytes = [FieldBytes; 6];
/// A 5-element auction auxiliary ciphertext in big-endian field bytes.
pub type AuxCiphertextBytes = [FieldBytes; 5];

/// Public data of one consumed note.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TransferInput {
    /// Coin amount of the consumed note.
    pub coins: FieldBytes,
    /// Energy amount of the consumed note.
    pub energy: FieldBytes,
    /// The consumed note's commitment.
    pub cm: FieldBytes,
    /// The revealed serial number.
    pub sn: FieldBytes,
    /// The consumed note's owner identifier.
    pub pk: FieldBytes,
}

/// Public data of one minted note.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TransferOutput {
    /// Coin amount of the minted note.
    pub coins: FieldBytes,
    /// Energy amount of the minted note.
    pub energy: FieldBytes,
    /// The minted note's commitment.
    pub cm: FieldBytes,
    /// The note ciphertext for the recipient slot.
    pub ciphertext: NoteCiphertextBytes,
}

/// A transfer transaction: N consumed notes, N minted notes, one proof.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferPayload {
    /// Originating node.
    pub sender: PeerId,
    /// The peer whose session with `sender` carries the output
    /// ciphertexts; the validator fetches its DH parameters on demand.
    pub target: PeerId,
    /// Consumed notes, in slot order.
    pub inputs: Vec<TransferInput>,
    /// Minted notes, in slot order.
    pub outputs: Vec<TransferOutput>,
    /// Groth16 proof for the matching transfer circuit.
    pub proof: Vec<u8>,
}

/// A registration: the inner one-input transfer plus the sealed bid
/// envelope and its own proof.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterPayload {
    /// The encapsulated one-input transfer minting the auction-entry note.
    pub transfer: TransferPayload,
    /// Commitment of the note entering the auction; must equal the inner
    /// transfer's single output commitment.
    pub cm_in: FieldBytes,
    /// The auxiliary ciphertext sealing `(pk_out, sk_in, bid, coins,
    /// energy)` to the auctioneer.
    pub aux: AuxCiphertextBytes,
    /// Coin amount of the entering note.
    pub coins_in: FieldBytes,
    /// Energy amount of the entering note.
    pub energy_in: FieldBytes,
    /// The bid.
    pub bid: FieldBytes,
    /// Groth16 proof for the register circuit.
    pub proof: Vec<u8>,
}

/// Per-bidder slot of an auction result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AuctionSlot {
    /// The bidder whose registration this slot consumes; the validator
    /// fetches the auctioneer's session with this peer on demand.
    pub bidder: PeerId,
    /// Public data of the consumed auction-entry note.
    pub input: TransferInput,
    /// Coin amount of the cleared output note.
    pub out_coins: FieldBytes,
    /// Energy amount of the cleared output note.
    pub out_energy: FieldBytes,
    /// Commitment of the cleared output note.
    pub out_cm: FieldBytes,
    /// Owner identifier of the cleared output note.
    pub out_pk: FieldBytes,
    /// The auxiliary ciphertext from the slot's registration.
    pub aux: AuxCiphertextBytes,
    /// Sampled nullifier seed of the output note.
    pub out_rho: FieldBytes,
    /// Sampled commitment randomness of the output note.
    pub out_rcm: FieldBytes,
}

/// An auction result: the minting transfer plus the clearing proof.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionPayload {
    /// The N-input transfer minting the cleared output notes.
    pub transfer: TransferPayload,
    /// Per-bidder public witness data, in slot order.
    pub slots: Vec<AuctionSlot>,
    /// Groth16 proof for the matching auction circuit.
    pub proof: Vec<u8>,
}
