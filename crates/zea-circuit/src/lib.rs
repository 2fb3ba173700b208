//! Arithmetic circuits for the ZEA protocol.
//!
//! Three circuit families share one gadget layer: `TransferCircuit<N>`
//! (N inputs to N outputs, value-preserving), `RegisterCircuit` (bid
//! envelope over a freshly committed auction note), and
//! `AuctionCircuit<N>` (per-slot consistency between registered notes,
//! sealed bids and cleared outputs).
//!
//! Every circuit exposes its public inputs in a fixed, documented order;
//! the instance builders in `zea-proofs` mirror that order element for
//! element.

/// Reusable gadgets: MiMC, the mask-chain cipher, and DH binding.
pub mod gadgets;

/// The auction clearing circuit.
pub mod auction;
/// The register circuit.
pub mod register;
/// The transfer circuit family.
pub mod transfer;

pub use auction::AuctionCircuit;
pub use register::RegisterCircuit;
pub use transfer::TransferCircuit;
