//! Diffie-Hellman session management.
//!
//! Sessions are created lazily on first interaction with a peer and
//! retained for the process lifetime, at most one per peer. The initiator
//! dials, sends its `"A"` point and waits for the responder's `"B"` under
//! a deadline; if the reply does not arrive, the provisional half is
//! discarded with the connection.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;

use rand::rngs::OsRng;
use rand::RngCore;
use tokio::net::TcpStream;
use zea_core::dh::{DhSession, PeerId, PendingExchange};
use zea_core::encoding::{EncodingError, point_from_coordinates, point_to_coordinates};
use zea_core::schema::{
    DH_SUBTYPE_A, DH_SUBTYPE_B, DhHello, DhResponse, Message, PointBytes,
};

use crate::transport::{TransportError, recv_message, send_message};

/// Deadline for a full two-message exchange, dial included.
pub const DH_DEADLINE: Duration = Duration::from_secs(10);

/// Session-layer failures.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The exchange failed at the transport level.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// A received point did not decode.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    /// The wire message's subtype was not the expected one.
    #[error("unexpected DH message subtype `{0}`")]
    MalformedPayload(String),
    /// An operation needed a session that does not exist.
    #[error("no session with peer {0}")]
    UnknownPeer(PeerId),
    /// The exchange did not complete within [`DH_DEADLINE`].
    #[error("DH exchange timed out")]
    Timeout,
}

/// Encode a point as wire coordinates.
#[must_use]
pub fn point_bytes(point: &jubjub::ExtendedPoint) -> PointBytes {
    let (u, v) = point_to_coordinates(point);
    PointBytes { u, v }
}

/// The per-peer session table.
pub struct SessionManager {
    local_id: PeerId,
    sessions: Mutex<HashMap<PeerId, DhSession>>,
}

impl SessionManager {
    /// An empty table for the given local node id.
    #[must_use]
    pub fn new(local_id: PeerId) -> Self {
        Self {
            local_id,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// The settled session with a peer, if one exists.
    ///
    /// # Panics
    /// Panics if the session table lock is poisoned.
    #[must_use]
    pub fn get(&self, peer: PeerId) -> Option<DhSession> {
        self.sessions
            .lock()
            .expect("session table poisoned")
            .get(&peer)
            .cloned()
    }

    /// Retain a settled session, replacing any previous one with the peer.
    ///
    /// # Panics
    /// Panics if the session table lock is poisoned.
    pub fn store(&self, session: DhSession) {
        self.sessions
            .lock()
            .expect("session table poisoned")
            .insert(session.peer, session);
    }

    /// Return the existing session with `peer`, or run the initiator side
    /// of the exchange against `addr`.
    ///
    /// # Errors
    /// Transport failures, malformed replies and the deadline all abort
    /// the exchange; the provisional half is discarded.
    pub async fn establish(
        &self,
        peer: PeerId,
        addr: SocketAddr,
    ) -> Result<DhSession, SessionError> {
        if let Some(session) = self.get(peer) {
            return Ok(session);
        }

        let local_id = self.local_id;
        let session = tokio::time::timeout(DH_DEADLINE, async move {
            let mut stream = TcpStream::connect(addr)
                .await
                .map_err(TransportError::from)?;

            let pending = PendingExchange::initiate(&mut OsRng);
            let hello = Message::DiffieHellman(DhHello {
                sender: local_id,
                subtype: DH_SUBTYPE_A.to_owned(),
                value: point_bytes(&pending.ephemeral_public),
            });
            send_message(&mut stream, &hello).await?;

            match recv_message(&mut stream).await? {
                Message::DiffieHellman(reply) if reply.subtype == DH_SUBTYPE_B => {
                    let partner = point_from_coordinates(&reply.value.u, &reply.value.v)?;
                    Ok(pending.complete(peer, partner))
                }
                Message::DiffieHellman(reply) => {
                    Err(SessionError::MalformedPayload(reply.subtype))
                }
                other => Err(SessionError::MalformedPayload(other.kind().to_owned())),
            }
        })
        .await
        .map_err(|_| SessionError::Timeout)??;

        self.store(session.clone());
        Ok(session)
    }

    /// Responder side of the exchange: settle immediately and produce the
    /// `"B"` reply.
    ///
    /// # Errors
    /// Rejects any subtype other than `"A"` and undecodable points.
    pub fn handle_hello(
        &self,
        hello: &DhHello,
        rng: &mut impl RngCore,
    ) -> Result<Message, SessionError> {
        if hello.subtype != DH_SUBTYPE_A {
            return Err(SessionError::MalformedPayload(hello.subtype.clone()));
        }
        let partner = point_from_coordinates(&hello.value.u, &hello.value.v)?;
        let session = DhSession::respond(hello.sender, partner, rng);
        let reply = Message::DiffieHellman(DhHello {
            sender: self.local_id,
            subtype: DH_SUBTYPE_B.to_owned(),
            value: point_bytes(&session.ephemeral_public),
        });
        self.store(session);
        Ok(reply)
    }

    /// Answer a validator's parameter fetch for the session with `peer`.
    ///
    /// # Errors
    /// Fails with `UnknownPeer` when no session exists.
    pub fn params_for(&self, peer: PeerId) -> Result<DhResponse, SessionError> {
        let session = self.get(peer).ok_or(SessionError::UnknownPeer(peer))?;
        Ok(DhResponse {
            partner_public: point_bytes(&session.partner_public),
            ephemeral_public: point_bytes(&session.ephemeral_public),
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "unit-test")]

    use rand_core::SeedableRng as _;
    use rand_xorshift::XorShiftRng;
    use zea_core::encoding::point_from_coordinates;

    use super::*;

    #[test]
    fn responder_settles_and_replies_with_b() {
        let mut rng = XorShiftRng::from_seed([101_u8; 16]);
        let manager = SessionManager::new(2);

        let pending = PendingExchange::initiate(&mut rng);
        let hello = DhHello {
            sender: 1,
            subtype: DH_SUBTYPE_A.to_owned(),
            value: point_bytes(&pending.ephemeral_public),
        };

        let reply = manager.handle_hello(&hello, &mut rng).unwrap();
        let Message::DiffieHellman(reply) = reply else {
            panic!("wrong reply kind");
        };
        assert_eq!(reply.subtype, DH_SUBTYPE_B);
        assert_eq!(reply.sender, 2);

        // Completing the initiator side agrees with the stored session.
        let b = point_from_coordinates(&reply.value.u, &reply.value.v).unwrap();
        let initiator = pending.complete(2, b);
        let stored = manager.get(1).unwrap();
        assert_eq!(stored.shared, initiator.shared);
    }

    #[test]
    fn wrong_subtype_is_malformed() {
        let mut rng = XorShiftRng::from_seed([102_u8; 16]);
        let manager = SessionManager::new(2);
        let pending = PendingExchange::initiate(&mut rng);
        let hello = DhHello {
            sender: 1,
            subtype: DH_SUBTYPE_B.to_owned(),
            value: point_bytes(&pending.ephemeral_public),
        };
        assert!(matches!(
            manager.handle_hello(&hello, &mut rng),
            Err(SessionError::MalformedPayload(_))
        ));
    }

    #[test]
    fn params_require_a_session() {
        let manager = SessionManager::new(2);
        assert!(matches!(
            manager.params_for(5),
            Err(SessionError::UnknownPeer(5))
        ));

        let mut rng = XorShiftRng::from_seed([103_u8; 16]);
        let pending = PendingExchange::initiate(&mut rng);
        let hello = DhHello {
            sender: 5,
            subtype: DH_SUBTYPE_A.to_owned(),
            value: point_bytes(&pending.ephemeral_public),
        };
        manager.handle_hello(&hello, &mut rng).unwrap();

        let params = manager.params_for(5).unwrap();
        // The stored partner point is the initiator's A.
        let partner =
            point_from_coordinates(&params.partner_public.u, &params.partner_public.v).unwrap();
        assert_eq!(partner, pending.ephemeral_public);
    }
}
