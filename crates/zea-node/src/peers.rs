//! Static peer routing table.
//!
//! Peer addresses come from bootstrap configuration at startup and do not
//! change over the process lifetime; discovery is out of scope.

use std::collections::HashMap;
use std::net::SocketAddr;

use zea_core::dh::PeerId;

/// Immutable peer-id-to-address table.
#[derive(Debug, Clone, Default)]
pub struct PeerTable {
    entries: HashMap<PeerId, SocketAddr>,
}

impl PeerTable {
    /// Build from bootstrap entries.
    #[must_use]
    pub fn new(entries: impl IntoIterator<Item = (PeerId, SocketAddr)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// The address of a peer, if known.
    #[must_use]
    pub fn addr_of(&self, peer: PeerId) -> Option<SocketAddr> {
        self.entries.get(&peer).copied()
    }
}
