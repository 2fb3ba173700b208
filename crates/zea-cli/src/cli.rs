//! Command-line interface for the `zea` node binary.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use eyre::{Result, eyre};
use zea_core::dh::PeerId;
use zea_node::node::{AutoRegister, NodeConfig, Role};

/// Environment variable overriding the parameter-cache directory.
pub const ZEA_PARAMS_DIR: &str = "ZEA_PARAMS_DIR";

/// Command-line interface definition.
#[derive(Debug, Parser)]
#[command(name = "zea")]
#[command(about = "Zero-knowledge energy auction node")]
pub struct Cli {
    /// CLI top-level command.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Run a node.
    Node {
        /// Node arguments.
        #[command(flatten)]
        args: NodeArgs,
    },
    /// Generate (or refresh) the circuit parameters for every kind.
    Setup {
        /// Parameter-cache directory.
        #[arg(long, env = ZEA_PARAMS_DIR)]
        params_dir: Option<PathBuf>,
    },
}

/// Arguments for `zea node`.
#[derive(Debug, clap::Args)]
pub struct NodeArgs {
    /// Listen port.
    #[arg(long)]
    pub port: u16,
    /// This node's identifier.
    #[arg(long)]
    pub id: PeerId,
    /// Protocol role.
    #[arg(long, value_parser = parse_role)]
    pub role: Role,
    /// Peer bootstrap entries, `id=host:port`, repeatable.
    #[arg(long = "peer", value_parser = parse_peer)]
    pub peers: Vec<(PeerId, SocketAddr)>,
    /// The validator's node id.
    #[arg(long, default_value_t = 0)]
    pub validator: PeerId,
    /// The auctioneer's node id, where one participates.
    #[arg(long)]
    pub auctioneer: Option<PeerId>,
    /// Parameter-cache directory.
    #[arg(long, env = ZEA_PARAMS_DIR)]
    pub params_dir: Option<PathBuf>,
    /// Registrations per auction batch (2 or 3).
    #[arg(long, default_value_t = 2)]
    pub auction_size: usize,
    /// Bidder startup action: `coins,energy,bid`.
    #[arg(long, value_parser = parse_auto_register)]
    pub register: Option<AutoRegister>,
}

/// Resolve the parameter directory, defaulting under the user data dir.
#[must_use]
pub fn params_dir_or_default(dir: Option<PathBuf>) -> PathBuf {
    dir.unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("zea")
            .join("params")
    })
}

impl NodeArgs {
    /// Assemble the node configuration.
    #[must_use]
    pub fn into_config(self) -> NodeConfig {
        NodeConfig {
            id: self.id,
            port: self.port,
            role: self.role,
            peers: self.peers,
            validator: self.validator,
            auctioneer: self.auctioneer,
            params_dir: params_dir_or_default(self.params_dir),
            auction_size: self.auction_size,
            auto_register: self.register,
        }
    }
}

pub fn parse_role(s: &str) -> Result<Role> {
    s.parse().map_err(|e: String| eyre!(e))
}

pub fn parse_peer(s: &str) -> Result<(PeerId, SocketAddr)> {
    let (id, addr) = s
        .split_once('=')
        .ok_or_else(|| eyre!("expected `id=host:port`, got `{s}`"))?;
    Ok((id.parse()?, addr.parse()?))
}

pub fn parse_auto_register(s: &str) -> Result<AutoRegister> {
    let parts: Vec<&str> = s.split(',').collect();
    let [coins, energy, bid] = parts.as_slice() else {
        return Err(eyre!("expected `coins,energy,bid`, got `{s}`"));
    };
    Ok(AutoRegister {
        coins: coins.trim().parse()?,
        energy: energy.trim().parse()?,
        bid: bid.trim().parse()?,
    })
}
