//! Public-input assembly.
//!
//! Each instance type mirrors one circuit's public-input order element for
//! element; the validator rebuilds the vector from the wire payload and
//! the counter-party's fetched exchange points. These orders are the
//! boundary contract fixed by this implementation:
//!
//! * transfer: per input `(coins, energy, cm, sn, pk)`, per output
//!   `(coins, energy, cm, c[0..6])`, then `G, G*b, G*r` as `(u, v)` pairs;
//! * register: `cm_in, c_aux[0..5], coins_in, energy_in, bid`, then the
//!   points;
//! * auction: per slot `(in_coins, in_energy, in_cm, in_sn, in_pk,
//!   out_coins, out_energy, out_cm, out_pk, c_aux[0..5])` then that slot's
//!   points. The output serial number is deliberately absent: deriving it
//!   takes the winner's spending key.

use bls12_381::Scalar;
use zea_core::encoding::{FieldBytes, scalar_from_bytes};
use zea_core::schema::{AuctionPayload, AuctionSlot, RegisterPayload, TransferPayload};

use crate::error::InstanceError;
use crate::kind::CircuitKind;

/// The three exchange points a proof is verified against.
#[derive(Debug, Clone, Copy)]
pub struct DhTriple {
    /// The common generator `G`.
    pub generator: jubjub::ExtendedPoint,
    /// The responder's point `G*b`.
    pub g_b: jubjub::ExtendedPoint,
    /// The initiator's point `G*r`.
    pub g_r: jubjub::ExtendedPoint,
}

impl DhTriple {
    fn push_coordinates(&self, inputs: &mut Vec<Scalar>) {
        for point in [&self.generator, &self.g_b, &self.g_r] {
            let affine = jubjub::AffinePoint::from(point);
            inputs.push(affine.get_u());
            inputs.push(affine.get_v());
        }
    }
}

fn decode(bytes: &FieldBytes) -> Result<Scalar, InstanceError> {
    Ok(scalar_from_bytes(bytes)?)
}

fn decode_ciphertext<const K: usize>(
    bytes: &[FieldBytes; K],
) -> Result<[Scalar; K], InstanceError> {
    let mut out = [Scalar::zero(); K];
    for (slot, raw) in out.iter_mut().zip(bytes.iter()) {
        *slot = decode(raw)?;
    }
    Ok(out)
}

/// One decoded transfer input slot.
#[derive(Debug, Clone, Copy)]
pub struct TransferInputInstance {
    /// Coin amount.
    pub coins: Scalar,
    /// Energy amount.
    pub energy: Scalar,
    /// Note commitment.
    pub cm: Scalar,
    /// Revealed serial number.
    pub sn: Scalar,
    /// Owner identifier.
    pub pk: Scalar,
}

/// One decoded transfer output slot.
#[derive(Debug, Clone, Copy)]
pub struct TransferOutputInstance {
    /// Coin amount.
    pub coins: Scalar,
    /// Energy amount.
    pub energy: Scalar,
    /// Note commitment.
    pub cm: Scalar,
    /// The note ciphertext.
    pub ciphertext: [Scalar; 6],
}

/// Decoded public instance of a transfer proof.
#[derive(Debug, Clone)]
pub struct TransferInstance {
    /// The matching circuit kind for this arity.
    pub kind: CircuitKind,
    /// Input slots.
    pub inputs: Vec<TransferInputInstance>,
    /// Output slots.
    pub outputs: Vec<TransferOutputInstance>,
    /// The exchange points.
    pub dh: DhTriple,
}

impl TransferInstance {
    /// Decode a wire payload against fetched exchange points.
    ///
    /// # Errors
    /// Rejects unsupported arities, input/output count mismatches and
    /// non-canonical encodings.
    pub fn from_payload(
        payload: &TransferPayload,
        dh: DhTriple,
    ) -> Result<Self, InstanceError> {
        if payload.inputs.len() != payload.outputs.len() {
            return Err(InstanceError::ArityMismatch {
                inputs: payload.inputs.len(),
                outputs: payload.outputs.len(),
            });
        }
        let kind = CircuitKind::transfer_for_arity(payload.inputs.len())
            .ok_or(InstanceError::UnsupportedArity(payload.inputs.len()))?;

        let inputs = payload
            .inputs
            .iter()
            .map(|slot| {
                Ok(TransferInputInstance {
                    coins: decode(&slot.coins)?,
                    energy: decode(&slot.energy)?,
                    cm: decode(&slot.cm)?,
                    sn: decode(&slot.sn)?,
                    pk: decode(&slot.pk)?,
                })
            })
            .collect::<Result<Vec<_>, InstanceError>>()?;

        let outputs = payload
            .outputs
            .iter()
            .map(|slot| {
                Ok(TransferOutputInstance {
                    coins: decode(&slot.coins)?,
                    energy: decode(&slot.energy)?,
                    cm: decode(&slot.cm)?,
                    ciphertext: decode_ciphertext(&slot.ciphertext)?,
                })
            })
            .collect::<Result<Vec<_>, InstanceError>>()?;

        Ok(Self {
            kind,
            inputs,
            outputs,
            dh,
        })
    }

    /// The ordered Groth16 public-input vector.
    #[must_use]
    pub fn to_inputs(&self) -> Vec<Scalar> {
        let mut inputs = Vec::new();
        for slot in &self.inputs {
            inputs.extend([slot.coins, slot.energy, slot.cm, slot.sn, slot.pk]);
        }
        for slot in &self.outputs {
            inputs.extend([slot.coins, slot.energy, slot.cm]);
            inputs.extend(slot.ciphertext);
        }
        self.dh.push_coordinates(&mut inputs);
        inputs
    }
}

/// Decoded public instance of a register proof.
#[derive(Debug, Clone)]
pub struct RegisterInstance {
    /// Commitment of the note entering the auction.
    pub cm_in: Scalar,
    /// The sealed envelope ciphertext.
    pub aux: [Scalar; 5],
    /// Coin amount of the entering note.
    pub coins_in: Scalar,
    /// Energy amount of the entering note.
    pub energy_in: Scalar,
    /// The bid.
    pub bid: Scalar,
    /// The exchange points.
    pub dh: DhTriple,
}

impl RegisterInstance {
    /// Decode a wire payload against fetched exchange points.
    ///
    /// # Errors
    /// Rejects non-canonical encodings.
    pub fn from_payload(
        payload: &RegisterPayload,
        dh: DhTriple,
    ) -> Result<Self, InstanceError> {
        Ok(Self {
            cm_in: decode(&payload.cm_in)?,
            aux: decode_ciphertext(&payload.aux)?,
            coins_in: decode(&payload.coins_in)?,
            energy_in: decode(&payload.energy_in)?,
            bid: decode(&payload.bid)?,
            dh,
        })
    }

    /// The ordered Groth16 public-input vector.
    #[must_use]
    pub fn to_inputs(&self) -> Vec<Scalar> {
        let mut inputs = vec![self.cm_in];
        inputs.extend(self.aux);
        inputs.extend([self.coins_in, self.energy_in, self.bid]);
        self.dh.push_coordinates(&mut inputs);
        inputs
    }
}

/// One decoded auction slot.
#[derive(Debug, Clone, Copy)]
pub struct AuctionSlotInstance {
    /// The consumed registered note's public fields.
    pub input: TransferInputInstance,
    /// Coin amount of the cleared output.
    pub out_coins: Scalar,
    /// Energy amount of the cleared output.
    pub out_energy: Scalar,
    /// Commitment of the cleared output.
    pub out_cm: Scalar,
    /// Owner identifier of the cleared output.
    pub out_pk: Scalar,
    /// The slot's envelope ciphertext.
    pub aux: [Scalar; 5],
    /// The slot's exchange points (auctioneer-bidder session).
    pub dh: DhTriple,
}

impl AuctionSlotInstance {
    /// Decode one wire slot against its fetched exchange points.
    ///
    /// # Errors
    /// Rejects non-canonical encodings.
    pub fn from_payload(slot: &AuctionSlot, dh: DhTriple) -> Result<Self, InstanceError> {
        Ok(Self {
            input: TransferInputInstance {
                coins: decode(&slot.input.coins)?,
                energy: decode(&slot.input.energy)?,
                cm: decode(&slot.input.cm)?,
                sn: decode(&slot.input.sn)?,
                pk: decode(&slot.input.pk)?,
            },
            out_coins: decode(&slot.out_coins)?,
            out_energy: decode(&slot.out_energy)?,
            out_cm: decode(&slot.out_cm)?,
            out_pk: decode(&slot.out_pk)?,
            aux: decode_ciphertext(&slot.aux)?,
            dh,
        })
    }
}

/// Decoded public instance of an auction proof.
#[derive(Debug, Clone)]
pub struct AuctionInstance {
    /// The matching circuit kind for this slot count.
    pub kind: CircuitKind,
    /// Per-bidder slots, in registration order.
    pub slots: Vec<AuctionSlotInstance>,
}

impl AuctionInstance {
    /// Assemble from decoded slots.
    ///
    /// # Errors
    /// Rejects unsupported slot counts.
    pub fn new(slots: Vec<AuctionSlotInstance>) -> Result<Self, InstanceError> {
        let kind = CircuitKind::auction_for_arity(slots.len())
            .ok_or(InstanceError::UnsupportedArity(slots.len()))?;
        Ok(Self { kind, slots })
    }

    /// The supported slot count of a payload, checked before DH fetches.
    ///
    /// # Errors
    /// Rejects unsupported slot counts.
    pub fn arity_of(payload: &AuctionPayload) -> Result<CircuitKind, InstanceError> {
        CircuitKind::auction_for_arity(payload.slots.len())
            .ok_or(InstanceError::UnsupportedArity(payload.slots.len()))
    }

    /// The ordered Groth16 public-input vector.
    #[must_use]
    pub fn to_inputs(&self) -> Vec<Scalar> {
        let mut inputs = Vec::new();
        for slot in &self.slots {
            inputs.extend([
                slot.input.coins,
                slot.input.energy,
                slot.input.cm,
                slot.input.sn,
                slot.input.pk,
                slot.out_coins,
                slot.out_energy,
                slot.out_cm,
                slot.out_pk,
            ]);
            inputs.extend(slot.aux);
            slot.dh.push_coordinates(&mut inputs);
        }
        inputs
    }
}
