mod client_id;
mod connection;
pub mod message;
mod node;
mod transport;

pub use client_id::{ClientId, ClientIdError};
pub use connection::{
    default_capabilities, negotiate_capabilities, Connection, ConnectionConfiguration,
    ConnectionError, Request, TcpConnection, DEFAULT_CONNECTION_TIMEOUT,
    DEFAULT_HANDSHAKE_TIMEOUT, ETH_PROTOCOL, MAX_TRACKED_REQUESTS, NON_LISTENING_PORT,
};
pub use message::{
    Capability, DisconnectReason, Hello, Message, MessageError, Status, ERROR_CODE, P2P_VERSION,
};
pub use node::{node_id, peer_id, Node, NodeId, NodeParseError, PeerId, DEFAULT_PORT};
pub use transport::{
    Frame, FramedReader, FramedTransport, FramedWriter, Transport, TransportError, MAX_FRAME_SIZE,
};

pub use alloy_primitives::{Bytes, FixedBytes, B256, U256};
pub use secp256k1::SecretKey;
