//! Wire payload models.
//!
//! Everything here is plain serialisable data; algebraic interpretation
//! (and rejection of non-canonical bytes) happens at the boundary of the
//! component consuming a payload.

mod envelope;
mod tx;

pub use envelope::{
    DhHello, DhRequest, DhResponse, Envelope, Message, PointBytes, Relay, SchemaError,
    DH_SUBTYPE_A, DH_SUBTYPE_B, TAG_AUCTION, TAG_DH_REQUEST, TAG_DH_RESPONSE, TAG_DIFFIE_HELLMAN,
    TAG_REGISTER, TAG_RELAY, TAG_TX,
};
pub use tx::{
    AuctionPayload, AuctionSlot, AuxCiphertextBytes, NoteCiphertextBytes, RegisterPayload,
    TransferInput, TransferOutput, TransferPayload,
};
