//! devp2p node descriptors and identity helpers.

use alloy_primitives::{hex, keccak256, B256, B512};
use secp256k1::PublicKey;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

/// Unique identifier of a node, the keccak-256 hash of its public key.
pub type NodeId = B256;

/// Uncompressed secp256k1 public key of a node without the `0x04` prefix.
///
/// This is the identity a peer presents in its hello message.
pub type PeerId = B512;

/// Default devp2p listening port.
pub const DEFAULT_PORT: u16 = 30303;

/// URL scheme of node descriptors.
const ENODE_SCHEME: &str = "enode://";

/// Derives a node's identifier from its public key.
pub fn node_id(public_key: &PeerId) -> NodeId {
    keccak256(public_key)
}

/// Converts a secp256k1 public key into its devp2p identity form.
pub fn peer_id(public_key: &PublicKey) -> PeerId {
    let serialized = public_key.serialize_uncompressed();
    PeerId::from_slice(&serialized[1..])
}

/// Errors that can occur while parsing an `enode://` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeParseError {
    /// The URL does not start with `enode://`.
    MissingScheme,
    /// The public key is not 64 hex encoded bytes of a valid curve point.
    InvalidPublicKey,
    /// The `ip:port` section is missing or malformed.
    InvalidAddress,
    /// The `discport` query parameter is malformed.
    InvalidDiscoveryPort,
}

impl fmt::Display for NodeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeParseError::MissingScheme => write!(f, "node URL must start with '{ENODE_SCHEME}'"),
            NodeParseError::InvalidPublicKey => write!(f, "invalid node public key"),
            NodeParseError::InvalidAddress => write!(f, "invalid node address, expected ip:port"),
            NodeParseError::InvalidDiscoveryPort => write!(f, "invalid discport parameter"),
        }
    }
}

impl std::error::Error for NodeParseError {}

/// Describes a devp2p node as taken from its latest known signed record.
///
/// Two descriptors with the same [`NodeId`] describe the same node, the one
/// with the higher sequence number being fresher.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    /// Identifier derived from the public key.
    pub id: NodeId,
    /// The node's public key.
    pub public_key: PeerId,
    /// IP address the node is reachable on.
    pub ip: IpAddr,
    /// Port of the devp2p TCP listener.
    pub tcp_port: u16,
    /// Port of the discovery UDP listener.
    pub udp_port: u16,
    /// Sequence number of the record this descriptor was taken from.
    pub seq: u64,
}

impl Node {
    /// Create a descriptor with sequence number zero.
    pub fn new(public_key: PeerId, ip: IpAddr, tcp_port: u16, udp_port: u16) -> Self {
        Node {
            id: node_id(&public_key),
            public_key,
            ip,
            tcp_port,
            udp_port,
            seq: 0,
        }
    }

    /// Returns the descriptor with the given record sequence number.
    pub fn with_seq(mut self, seq: u64) -> Self {
        self.seq = seq;
        self
    }

    /// Socket address of the node's TCP listener.
    pub fn tcp_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.tcp_port)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{ENODE_SCHEME}{}@{}",
            hex::encode(self.public_key),
            self.tcp_addr()
        )?;
        if self.udp_port != self.tcp_port {
            write!(f, "?discport={}", self.udp_port)?;
        }
        Ok(())
    }
}

impl FromStr for Node {
    type Err = NodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix(ENODE_SCHEME)
            .ok_or(NodeParseError::MissingScheme)?;
        let (key, rest) = rest.split_once('@').ok_or(NodeParseError::InvalidAddress)?;

        let key_bytes = hex::decode(key).map_err(|_| NodeParseError::InvalidPublicKey)?;
        if key_bytes.len() != 64 {
            return Err(NodeParseError::InvalidPublicKey);
        }
        // Reject keys which are not on the curve.
        let mut uncompressed = [0x04u8; 65];
        uncompressed[1..].copy_from_slice(&key_bytes);
        PublicKey::from_slice(&uncompressed).map_err(|_| NodeParseError::InvalidPublicKey)?;
        let public_key = PeerId::from_slice(&key_bytes);

        let (address, query) = match rest.split_once('?') {
            Some((address, query)) => (address, Some(query)),
            None => (rest, None),
        };
        let socket_addr =
            SocketAddr::from_str(address).map_err(|_| NodeParseError::InvalidAddress)?;

        let mut udp_port = socket_addr.port();
        if let Some(query) = query {
            for pair in query.split('&') {
                if let Some(port) = pair.strip_prefix("discport=") {
                    udp_port = port
                        .parse()
                        .map_err(|_| NodeParseError::InvalidDiscoveryPort)?;
                }
            }
        }

        Ok(Node::new(
            public_key,
            socket_addr.ip(),
            socket_addr.port(),
            udp_port,
        ))
    }
}
