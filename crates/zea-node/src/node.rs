//! Node assembly: accept loop, per-connection dispatch, role workers.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use rand::rngs::OsRng;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{info, warn};
use zea_core::dh::PeerId;
use zea_core::keys::KeyPair;
use zea_core::note::{Gamma, Note};
use zea_core::schema::Message;
use zea_proofs::{CircuitKind, ParamsRegistry, SetupError};

use crate::auctioneer::Auctioneer;
use crate::builder::{BuilderError, RegisterSpec, build_register};
use crate::peers::PeerTable;
use crate::session::{SessionError, SessionManager};
use crate::transport::{self, TransportError, recv_message, send_message};
use crate::validator::Validator;

/// Role a node plays in the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Orders transactions and maintains the append-only sets.
    Validator,
    /// Collects registrations and clears auctions.
    Auctioneer,
    /// Holds notes, transfers and registers bids.
    Bidder,
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "validator" => Ok(Self::Validator),
            "auctioneer" => Ok(Self::Auctioneer),
            "bidder" => Ok(Self::Bidder),
            other => Err(format!(
                "invalid role `{other}`; expected validator, auctioneer or bidder"
            )),
        }
    }
}

/// A bidder's startup action: mint a demo note and register it.
#[derive(Debug, Clone, Copy)]
pub struct AutoRegister {
    /// Coin amount of the demo note.
    pub coins: u64,
    /// Energy amount of the demo note.
    pub energy: u64,
    /// The sealed bid.
    pub bid: u64,
}

/// Node launch configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// This node's identifier.
    pub id: PeerId,
    /// Listen port.
    pub port: u16,
    /// Protocol role.
    pub role: Role,
    /// Bootstrap peer addresses.
    pub peers: Vec<(PeerId, SocketAddr)>,
    /// The validator's node id.
    pub validator: PeerId,
    /// The auctioneer's node id, where one participates.
    pub auctioneer: Option<PeerId>,
    /// Directory holding per-kind circuit parameters.
    pub params_dir: PathBuf,
    /// Number of registrations per auction batch.
    pub auction_size: usize,
    /// Optional bidder startup action.
    pub auto_register: Option<AutoRegister>,
}

/// Fatal node failures.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// The listen socket could not be bound.
    #[error("bind failed: {0}")]
    Bind(#[source] std::io::Error),
    /// Circuit parameters could not be loaded or generated.
    #[error(transparent)]
    Setup(#[from] SetupError),
    /// A required session could not be established.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// A startup transaction could not be built.
    #[error(transparent)]
    Builder(#[from] BuilderError),
    /// A startup transaction could not be sent.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// A peer id has no configured address.
    #[error("no route to peer {0}")]
    NoRoute(PeerId),
    /// A bidder was started without an auctioneer id.
    #[error("bidder requires an auctioneer id")]
    MissingAuctioneer,
    /// The parameter-loading task was cancelled.
    #[error("parameter loading interrupted")]
    SetupInterrupted,
}

/// Shared state every inbound connection dispatches against.
pub struct NodeContext {
    /// This node's identifier.
    pub id: PeerId,
    /// The session table.
    pub sessions: Arc<SessionManager>,
    /// Channel into the role worker, when this node runs one.
    pub submissions: Option<mpsc::Sender<Message>>,
}

/// Run a node to completion.
///
/// # Errors
/// Bind and setup failures are fatal; the caller exits non-zero.
pub async fn run(config: NodeConfig) -> Result<(), NodeError> {
    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .map_err(NodeError::Bind)?;
    info!(node = config.id, port = config.port, role = ?config.role, "node listening");

    let params_dir = config.params_dir.clone();
    let registry = Arc::new(
        tokio::task::spawn_blocking(move || {
            ParamsRegistry::load_or_generate(&params_dir, &CircuitKind::ALL, &mut OsRng)
        })
        .await
        .map_err(|_| NodeError::SetupInterrupted)??,
    );

    let sessions = Arc::new(SessionManager::new(config.id));
    let peers = PeerTable::new(config.peers.iter().copied());

    let submissions = match config.role {
        Role::Validator => {
            let (tx, rx) = mpsc::channel(64);
            let validator = Validator::new(
                config.id,
                Arc::clone(&registry),
                peers.clone(),
                Arc::clone(&sessions),
                config.auctioneer,
            );
            tokio::spawn(validator.run(rx));
            Some(tx)
        }
        Role::Auctioneer => {
            let (tx, rx) = mpsc::channel(64);
            let auctioneer = Auctioneer::new(
                config.id,
                Arc::clone(&registry),
                peers.clone(),
                Arc::clone(&sessions),
                config.validator,
                config.auction_size,
            );
            tokio::spawn(auctioneer.run(rx));
            Some(tx)
        }
        Role::Bidder => None,
    };

    let ctx = Arc::new(NodeContext {
        id: config.id,
        sessions: Arc::clone(&sessions),
        submissions,
    });

    if let (Role::Bidder, Some(action)) = (config.role, config.auto_register) {
        let auctioneer = config.auctioneer.ok_or(NodeError::MissingAuctioneer)?;
        tokio::spawn(auto_register(
            config.id,
            Arc::clone(&registry),
            Arc::clone(&sessions),
            peers.clone(),
            auctioneer,
            config.validator,
            action,
        ));
    }

    serve(listener, ctx).await;
    Ok(())
}

/// Accept loop: one task per inbound connection.
pub async fn serve(listener: TcpListener, ctx: Arc<NodeContext>) {
    loop {
        match listener.accept().await {
            Ok((stream, remote)) => {
                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move {
                    if let Err(err) = handle_connection(stream, &ctx).await {
                        // Per-connection errors close that connection and
                        // never touch protocol state.
                        warn!(node = ctx.id, %remote, error = %err, "connection closed");
                    }
                });
            }
            Err(err) => {
                warn!(error = %err, "accept failed");
            }
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    ctx: &NodeContext,
) -> Result<(), TransportError> {
    loop {
        let message = match recv_message(&mut stream).await {
            Ok(message) => message,
            // Clean EOF between frames ends the connection quietly.
            Err(TransportError::Io(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        match message {
            Message::DiffieHellman(hello) => {
                match ctx.sessions.handle_hello(&hello, &mut OsRng) {
                    Ok(reply) => send_message(&mut stream, &reply).await?,
                    Err(err) => {
                        warn!(node = ctx.id, error = %err, "DH exchange rejected");
                        return Ok(());
                    }
                }
            }
            Message::DhRequest(request) => match ctx.sessions.params_for(request.sender) {
                Ok(response) => {
                    send_message(&mut stream, &Message::DhResponse(response)).await?;
                }
                Err(err) => {
                    // Closing without a reply surfaces as a fetch failure
                    // on the validator side.
                    warn!(node = ctx.id, error = %err, "DH parameters unavailable");
                    return Ok(());
                }
            },
            Message::Tx(_) | Message::Register(_) | Message::Auction(_) => {
                if let Some(submissions) = &ctx.submissions {
                    if submissions.send(message).await.is_err() {
                        warn!(node = ctx.id, "role worker stopped");
                        return Ok(());
                    }
                } else {
                    warn!(node = ctx.id, kind = message.kind(), "no worker for transaction");
                }
            }
            Message::DhResponse(_) => {
                warn!(node = ctx.id, "unsolicited dh_response");
            }
            Message::Relay(relay) => {
                info!(node = ctx.id, message = relay.message, "relay");
            }
        }
    }
}

/// Bidder startup flow: session with the auctioneer, demo note, register.
async fn auto_register(
    node_id: PeerId,
    registry: Arc<ParamsRegistry>,
    sessions: Arc<SessionManager>,
    peers: PeerTable,
    auctioneer: PeerId,
    validator: PeerId,
    action: AutoRegister,
) {
    let result = async {
        let auctioneer_addr = peers
            .addr_of(auctioneer)
            .ok_or(NodeError::NoRoute(auctioneer))?;
        let validator_addr = peers.addr_of(validator).ok_or(NodeError::NoRoute(validator))?;

        let session = sessions.establish(auctioneer, auctioneer_addr).await?;

        // Demo funding note; bidders self-issue their starting balance.
        let owner = KeyPair::random(&mut OsRng);
        let note = Note::mint(Gamma::new(action.coins, action.energy), owner.pk(), &mut OsRng);

        let spec = RegisterSpec {
            old_note: note,
            old_key: owner,
            bid: action.bid,
            payout_pk: owner.pk(),
        };
        let registry = Arc::clone(&registry);
        let session_for_proof = session.clone();
        let built = tokio::task::spawn_blocking(move || {
            build_register(
                &registry,
                &session_for_proof,
                node_id,
                auctioneer,
                &spec,
                &mut OsRng,
            )
        })
        .await
        .map_err(|_| NodeError::SetupInterrupted)??;

        transport::send_oneshot(validator_addr, &Message::Register(built.payload)).await?;
        Ok::<(), NodeError>(())
    }
    .await;

    match result {
        Ok(()) => info!(node = node_id, bid = action.bid, "registration submitted"),
        Err(err) => warn!(node = node_id, error = %err, "auto-registration failed"),
    }
}
