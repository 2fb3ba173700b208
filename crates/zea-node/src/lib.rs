//! Node harness for the ZEA protocol.
//!
//! A node is one acceptor task plus one task per inbound connection,
//! dispatching on the decoded message sum type. Role workers (validator,
//! auctioneer) each run as a single task fed by a channel, which gives the
//! protocol its total order. Outbound operations are short-lived dials
//! with deadlines.

/// The auctioneer: envelope decryption, clearing, minting, proving.
pub mod auctioneer;
/// Transaction builders.
pub mod builder;
/// Accept loop, dispatch, and node assembly.
pub mod node;
/// Static peer routing table.
pub mod peers;
/// Diffie-Hellman session management.
pub mod session;
/// Length-prefixed framing over TCP.
pub mod transport;
/// The validator: proof checking and the append-only ledger.
pub mod validator;

pub use node::{NodeConfig, NodeError, Role};
