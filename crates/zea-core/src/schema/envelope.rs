//! The tagged wire envelope and its per-tag payloads.
//!
//! A frame carries `{ kind, payload }` where `payload` is the bincode
//! encoding of the tag's struct. Unknown tags and undecodable payloads are
//! hard rejects.

use serde::{Deserialize, Serialize};

use crate::base::dh::PeerId;
use crate::base::encoding::FieldBytes;
use crate::schema::tx::{AuctionPayload, RegisterPayload, TransferPayload};

/// Peer-to-peer Diffie-Hellman exchange message.
pub const TAG_DIFFIE_HELLMAN: &str = "DiffieHellman";
/// Validator-to-recipient request for session parameters.
pub const TAG_DH_REQUEST: &str = "dh_request";
/// Recipient-to-validator session parameters.
pub const TAG_DH_RESPONSE: &str = "dh_response";
/// A transfer transaction.
pub const TAG_TX: &str = "tx";
/// A registration (inner one-input transfer plus bid envelope).
pub const TAG_REGISTER: &str = "register";
/// An auction result (minting transfer plus clearing proof).
pub const TAG_AUCTION: &str = "auction";
/// Opaque relay message.
pub const TAG_RELAY: &str = "relay";

/// Subtype of the initiator's exchange message.
pub const DH_SUBTYPE_A: &str = "A";
/// Subtype of the responder's exchange message.
pub const DH_SUBTYPE_B: &str = "B";

/// Affine `(u, v)` coordinates of an inner-curve point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointBytes {
    /// Big-endian `u` coordinate.
    pub u: FieldBytes,
    /// Big-endian `v` coordinate.
    pub v: FieldBytes,
}

/// One half of the two-message Diffie-Hellman exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DhHello {
    /// The sending peer.
    pub sender: PeerId,
    /// `"A"` from the initiator, `"B"` from the responder.
    pub subtype: String,
    /// The ephemeral public point.
    pub value: PointBytes,
}

/// Validator asking a transaction's counter-party for the session it holds
/// with `sender`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DhRequest {
    /// The peer whose session parameters are requested.
    pub sender: PeerId,
}

/// Session parameters returned for a [`DhRequest`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DhResponse {
    /// The counter-party's public point as stored by the responder.
    pub partner_public: PointBytes,
    /// The responder's own ephemeral public point.
    pub ephemeral_public: PointBytes,
}

/// Opaque relay payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relay {
    /// Free-form message.
    pub message: String,
}

/// The outer wire envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Tag selecting the payload type.
    pub kind: String,
    /// bincode encoding of the tag's payload struct.
    pub payload: Vec<u8>,
}

/// Errors raised while interpreting wire bytes.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The envelope tag is not one of the known message kinds.
    #[error("unknown message kind `{0}`")]
    UnknownKind(String),
    /// The payload bytes do not decode as the tag's struct.
    #[error("malformed `{kind}` payload: {source}")]
    MalformedPayload {
        /// The envelope tag whose payload failed to decode.
        kind: &'static str,
        /// Underlying codec failure.
        #[source]
        source: bincode::Error,
    },
    /// The envelope itself does not decode.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(#[source] bincode::Error),
}

/// A decoded message, dispatched by pattern matching.
#[derive(Debug, Clone)]
pub enum Message {
    /// Peer-to-peer DH exchange step.
    DiffieHellman(DhHello),
    /// Validator-initiated session-parameter fetch.
    DhRequest(DhRequest),
    /// Reply to a session-parameter fetch.
    DhResponse(DhResponse),
    /// Transfer transaction.
    Tx(TransferPayload),
    /// Registration.
    Register(RegisterPayload),
    /// Auction result.
    Auction(AuctionPayload),
    /// Opaque relay.
    Relay(Relay),
}

fn encode_payload<T: Serialize>(kind: &'static str, value: &T) -> Result<Envelope, SchemaError> {
    let payload =
        bincode::serialize(value).map_err(|source| SchemaError::MalformedPayload { kind, source })?;
    Ok(Envelope {
        kind: kind.to_owned(),
        payload,
    })
}

fn decode_payload<T: for<'de> Deserialize<'de>>(
    kind: &'static str,
    payload: &[u8],
) -> Result<T, SchemaError> {
    bincode::deserialize(payload).map_err(|source| SchemaError::MalformedPayload { kind, source })
}

impl Message {
    /// The envelope tag this message travels under.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::DiffieHellman(_) => TAG_DIFFIE_HELLMAN,
            Self::DhRequest(_) => TAG_DH_REQUEST,
            Self::DhResponse(_) => TAG_DH_RESPONSE,
            Self::Tx(_) => TAG_TX,
            Self::Register(_) => TAG_REGISTER,
            Self::Auction(_) => TAG_AUCTION,
            Self::Relay(_) => TAG_RELAY,
        }
    }

    /// Wrap into the wire envelope.
    ///
    /// # Errors
    /// Fails only if the payload cannot be bincode-encoded.
    pub fn into_envelope(&self) -> Result<Envelope, SchemaError> {
        match self {
            Self::DiffieHellman(p) => encode_payload(TAG_DIFFIE_HELLMAN, p),
            Self::DhRequest(p) => encode_payload(TAG_DH_REQUEST, p),
            Self::DhResponse(p) => encode_payload(TAG_DH_RESPONSE, p),
            Self::Tx(p) => encode_payload(TAG_TX, p),
            Self::Register(p) => encode_payload(TAG_REGISTER, p),
            Self::Auction(p) => encode_payload(TAG_AUCTION, p),
            Self::Relay(p) => encode_payload(TAG_RELAY, p),
        }
    }

    /// Interpret a received envelope.
    ///
    /// # Errors
    /// Unknown tags and undecodable payloads are hard rejects.
    pub fn from_envelope(envelope: &Envelope) -> Result<Self, SchemaError> {
        match envelope.kind.as_str() {
            TAG_DIFFIE_HELLMAN => Ok(Self::DiffieHellman(decode_payload(
                TAG_DIFFIE_HELLMAN,
                &envelope.payload,
            )?)),
            TAG_DH_REQUEST => Ok(Self::DhRequest(decode_payload(
                TAG_DH_REQUEST,
                &envelope.payload,
            )?)),
            TAG_DH_RESPONSE => Ok(Self::DhResponse(decode_payload(
                TAG_DH_RESPONSE,
                &envelope.payload,
            )?)),
            TAG_TX => Ok(Self::Tx(decode_payload(TAG_TX, &envelope.payload)?)),
            TAG_REGISTER => Ok(Self::Register(decode_payload(
                TAG_REGISTER,
                &envelope.payload,
            )?)),
            TAG_AUCTION => Ok(Self::Auction(decode_payload(
                TAG_AUCTION,
                &envelope.payload,
            )?)),
            TAG_RELAY => Ok(Self::Relay(decode_payload(TAG_RELAY, &envelope.payload)?)),
            other => Err(SchemaError::UnknownKind(other.to_owned())),
        }
    }
}

impl Envelope {
    /// Serialise for framing.
    ///
    /// # Errors
    /// Fails only if bincode encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SchemaError> {
        bincode::serialize(self).map_err(SchemaError::MalformedEnvelope)
    }

    /// Deserialise a received frame.
    ///
    /// # Errors
    /// Rejects bytes that do not decode as an envelope.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SchemaError> {
        bincode::deserialize(bytes).map_err(SchemaError::MalformedEnvelope)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "unit-test")]

    use super::*;

    #[test]
    fn envelope_round_trip() {
        let msg = Message::DhRequest(DhRequest { sender: 7 });
        let envelope = msg.into_envelope().unwrap();
        assert_eq!(envelope.kind, TAG_DH_REQUEST);

        let bytes = envelope.to_bytes().unwrap();
        let decoded = Message::from_envelope(&Envelope::from_bytes(&bytes).unwrap()).unwrap();
        match decoded {
            Message::DhRequest(req) => assert_eq!(req.sender, 7),
            Message::DiffieHellman(_)
            | Message::DhResponse(_)
            | Message::Tx(_)
            | Message::Register(_)
            | Message::Auction(_)
            | Message::Relay(_) => panic!("wrong variant"),
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let envelope = Envelope {
            kind: "gossip".to_owned(),
            payload: vec![],
        };
        assert!(matches!(
            Message::from_envelope(&envelope),
            Err(SchemaError::UnknownKind(_))
        ));
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let msg = Message::DiffieHellman(DhHello {
            sender: 1,
            subtype: DH_SUBTYPE_A.to_owned(),
            value: PointBytes {
                u: [0_u8; 32],
                v: [0_u8; 32],
            },
        });
        let mut envelope = msg.into_envelope().unwrap();
        envelope.payload.truncate(4);
        assert!(matches!(
            Message::from_envelope(&envelope),
            Err(SchemaError::MalformedPayload { .. })
        ));
    }
}
