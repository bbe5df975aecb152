//! devp2p peer connection.
//!
//! A [`Connection`] is one session with one peer over a frame [`Transport`].
//! It covers the hello and status exchange, typed message reads and writes
//! through the [`codec`](crate::message::codec), state-sync response
//! correlation and the bookkeeping of outstanding block requests.
//!
//! # Examples
//!
//! Dialing a node to learn its client and chain.
//!
//! ```no_run
//! use devp2p_peers_connection::{Connection, ConnectionConfiguration, Node};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let node: Node = "enode://d860a01f9722d78051619d1e2351aba3f43f943f6f00718d1b9baa4101932a1f5011f16bb2b1bb35db20d6fe28fa0bf09636d26a87d31de9ec6203eeedb1f666@18.138.108.67:30303".parse()?;
//! let config = ConnectionConfiguration::random();
//!
//! let mut connection = Connection::tcp(node, config).await?;
//! let (hello, status) = connection.peer_info().await?;
//! println!("{} on network {}", hello.name, status.network_id);
//! # Ok(())
//! # }
//! ```

mod configuration;
mod error;
mod handshake;
mod requests;
mod tcp;

pub use configuration::{
    default_capabilities, ConnectionConfiguration, DEFAULT_CONNECTION_TIMEOUT,
    DEFAULT_HANDSHAKE_TIMEOUT, NON_LISTENING_PORT,
};
pub use error::ConnectionError;
pub use handshake::{negotiate_capabilities, ETH_PROTOCOL};
pub use requests::{Request, MAX_TRACKED_REQUESTS};
pub use tcp::TcpConnection;

use crate::message::{
    codec, Capability, GetBlockBodies, GetBlockHeaders, GetBlockHeadersRequest, HashOrNumber,
    Hello, Message, MessageError, Status,
};
use crate::node::Node;
use crate::transport::Transport;
use alloy_primitives::B256;
use log::debug;
use requests::RequestQueue;
use std::fmt;
use std::time::Duration;

/// A session with a single devp2p peer.
///
/// The connection owns its transport. It does not implement `Clone` since the
/// transport cannot be duplicated.
#[derive(Debug)]
pub struct Connection<T> {
    node: Node,
    configuration: ConnectionConfiguration,
    transport: T,
    negotiated: Vec<Capability>,
    requests: RequestQueue,
    request_id: u64,
}

impl<T: Transport> Connection<T> {
    /// Create a connection over an established transport.
    ///
    /// No messages are exchanged until [`Connection::peer_info`], or any read
    /// or write, is called.
    ///
    /// # Arguments
    ///
    /// * `node` - The remote node.
    /// * `configuration` - Configuration for the session.
    /// * `transport` - Frame channel to the remote node.
    pub fn new(node: Node, configuration: ConnectionConfiguration, transport: T) -> Self {
        Self {
            node,
            configuration,
            transport,
            negotiated: Vec::new(),
            requests: RequestQueue::default(),
            request_id: 0,
        }
    }

    /// The remote node.
    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn configuration(&self) -> &ConnectionConfiguration {
        &self.configuration
    }

    /// Capabilities shared with the peer, empty until the hello exchange ran.
    pub fn negotiated_capabilities(&self) -> &[Capability] {
        &self.negotiated
    }

    pub(crate) fn set_negotiated(&mut self, capabilities: Vec<Capability>) {
        self.negotiated = capabilities;
    }

    /// Exchange hello and status messages with the peer.
    ///
    /// Bounded by the configured handshake timeout. The connection is meant to
    /// be dropped afterwards.
    ///
    /// # Returns
    ///
    /// * `Ok((Hello, Status))` - The peer's hello and chain status.
    /// * `Err(ConnectionError)` - The peer disconnected, shares no eth
    ///   version, sent an invalid frame, or did not answer in time.
    pub async fn peer_info(&mut self) -> Result<(Hello, Status), ConnectionError> {
        let timeout = self.configuration.handshake_timeout;
        match tokio::time::timeout(timeout, handshake::exchange_peer_info(self)).await {
            Ok(result) => result,
            Err(_) => Err(ConnectionError::Timeout),
        }
    }

    /// Read the next frame and decode it.
    ///
    /// Transport failures come back as errors, undecodable frames as
    /// [`Message::Error`].
    pub(crate) async fn receive(&mut self) -> Result<Message, ConnectionError> {
        let frame = self.transport.read_frame().await?;
        Ok(codec::decode(frame.code, &frame.payload))
    }

    /// Read the next message from the peer.
    ///
    /// Never fails: transport errors, malformed payloads and unknown codes
    /// are reported as [`Message::Error`].
    pub async fn read(&mut self) -> Message {
        match self.receive().await {
            Ok(message) => {
                if let Message::Error(e) = &message {
                    debug!("Undecodable frame from {}: {e}", self.node);
                }
                message
            }
            Err(e) => Message::Error(MessageError::Read(e.to_string())),
        }
    }

    /// Send a message to the peer, tagged with its own code.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The message was written.
    /// * `Err(ConnectionError::InvalidMessage)` - The message is an error
    ///   value, which has no wire form.
    /// * `Err(ConnectionError)` - The transport failed.
    pub async fn write(&mut self, message: &Message) -> Result<(), ConnectionError> {
        let frame = codec::encode(message).ok_or(ConnectionError::InvalidMessage)?;
        self.transport.write_frame(frame).await?;
        Ok(())
    }

    /// Read until a state-sync message answering `request_id` arrives.
    ///
    /// Frames of other families and state-sync messages answering other
    /// requests are skipped.
    ///
    /// # Returns
    ///
    /// * `Ok(Message)` - The matching state-sync message.
    /// * `Err(ConnectionError::Timeout)` - Nothing matched within `timeout`.
    /// * `Err(ConnectionError::InvalidFrame)` - A state-sync frame was malformed.
    /// * `Err(ConnectionError)` - The transport failed.
    pub async fn read_state_sync_response(
        &mut self,
        request_id: u64,
        timeout: Duration,
    ) -> Result<Message, ConnectionError> {
        match tokio::time::timeout(timeout, self.next_state_sync_message(request_id)).await {
            Ok(result) => result,
            Err(_) => Err(ConnectionError::Timeout),
        }
    }

    async fn next_state_sync_message(
        &mut self,
        request_id: u64,
    ) -> Result<Message, ConnectionError> {
        loop {
            let frame = self.transport.read_frame().await?;
            if !codec::is_state_sync(frame.code) {
                continue;
            }
            match codec::decode(frame.code, &frame.payload) {
                Message::Error(e) => return Err(ConnectionError::InvalidFrame(e)),
                message if message.request_id() == request_id => return Ok(message),
                message => {
                    debug!(
                        "Skipping {} for request {} while waiting for {request_id}",
                        message.kind(),
                        message.request_id()
                    );
                }
            }
        }
    }

    /// Allocate the next request id.
    ///
    /// Ids start at one and increase monotonically for the lifetime of the
    /// connection, zero is never handed out.
    pub fn next_request_id(&mut self) -> u64 {
        self.request_id += 1;
        self.request_id
    }

    /// Request the body of a block and remember which block it was for.
    ///
    /// # Returns
    ///
    /// The id of the sent request, to be passed to [`Connection::take_request`]
    /// when the block bodies response arrives.
    pub async fn request_block_bodies(&mut self, hash: B256) -> Result<u64, ConnectionError> {
        let request_id = self.next_request_id();
        let message = Message::GetBlockBodies(GetBlockBodies {
            request_id,
            hashes: vec![hash],
        });
        self.write(&message).await?;
        self.requests.push(Request {
            id: request_id,
            block_hash: hash,
        });
        Ok(request_id)
    }

    /// Request `amount` consecutive headers starting at `origin`.
    pub async fn request_block_headers(
        &mut self,
        origin: impl Into<HashOrNumber>,
        amount: u64,
    ) -> Result<u64, ConnectionError> {
        let origin = origin.into();
        let request_id = self.next_request_id();
        let message = Message::GetBlockHeaders(GetBlockHeaders {
            request_id,
            request: GetBlockHeadersRequest {
                origin,
                amount,
                skip: 0,
                reverse: false,
            },
        });
        self.write(&message).await?;
        if let HashOrNumber::Hash(hash) = origin {
            self.requests.push(Request {
                id: request_id,
                block_hash: hash,
            });
        }
        Ok(request_id)
    }

    /// Remove and return the outstanding request with the given id.
    pub fn take_request(&mut self, request_id: u64) -> Option<Request> {
        self.requests.take(request_id)
    }

    /// Number of outstanding requests being tracked.
    pub fn outstanding_requests(&self) -> usize {
        self.requests.len()
    }
}

impl<T> fmt::Display for Connection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Connection to {}", self.node)?;
        if !self.negotiated.is_empty() {
            let capabilities: Vec<String> =
                self.negotiated.iter().map(|c| c.to_string()).collect();
            write!(f, " [{}]", capabilities.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{
        code, AccountRange, ByteCodes, Disconnects, DisconnectReason, ForkId, Ping,
        NewPooledTransactionHashes66, P2P_VERSION,
    };
    use crate::node::peer_id;
    use crate::transport::{Frame, FramedTransport};
    use alloy_primitives::{FixedBytes, U256};
    use alloy_rlp::Encodable;
    use secp256k1::{PublicKey, Secp256k1, SecretKey};
    use std::net::{IpAddr, Ipv4Addr};
    use tokio::io::{AsyncRead, AsyncWrite};
    use tokio_test::io::Builder as MockIoBuilder;

    const REMOTE_KEY: [u8; 32] = [0x33; 32];

    fn remote_node() -> Node {
        let secret = SecretKey::from_slice(&REMOTE_KEY).unwrap();
        let public = PublicKey::from_secret_key(&Secp256k1::new(), &secret);
        Node::new(
            peer_id(&public),
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            30303,
            30303,
        )
    }

    fn test_config() -> ConnectionConfiguration {
        ConnectionConfiguration::non_listening(SecretKey::from_slice(&[0x44; 32]).unwrap())
    }

    fn create_test_connection<R, W>(reader: R, writer: W) -> Connection<FramedTransport<R, W>>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        Connection::new(remote_node(), test_config(), FramedTransport::new(reader, writer))
    }

    fn raw_frame(message: &Message) -> Vec<u8> {
        let frame = codec::encode(message).unwrap();
        raw_bytes(frame)
    }

    fn raw_bytes(frame: Frame) -> Vec<u8> {
        let mut body = Vec::new();
        frame.code.encode(&mut body);
        body.extend_from_slice(&frame.payload);
        let mut data = (body.len() as u32).to_be_bytes().to_vec();
        data.extend_from_slice(&body);
        data
    }

    fn remote_hello(capabilities: Vec<Capability>) -> Hello {
        Hello {
            version: P2P_VERSION,
            name: "Geth/v1.13.5-stable".to_string(),
            capabilities,
            listen_port: 30303,
            id: remote_node().public_key,
        }
    }

    fn remote_status() -> Status {
        Status {
            protocol_version: 68,
            network_id: 1,
            total_difficulty: U256::from(100u64),
            head: B256::repeat_byte(0xaa),
            genesis: B256::repeat_byte(0xbb),
            fork_id: ForkId {
                hash: FixedBytes::new([0xdc, 0xe9, 0x6c, 0x2d]),
                next: 0,
            },
        }
    }

    #[tokio::test]
    async fn test_read_message() {
        let hashes = NewPooledTransactionHashes66(vec![B256::repeat_byte(1)]);
        let bytes = raw_frame(&Message::NewPooledTransactionHashes66(hashes.clone()));
        let mock_reader = MockIoBuilder::new().read(&bytes).build();
        let mut connection = create_test_connection(mock_reader, Vec::new());

        assert_eq!(
            connection.read().await,
            Message::NewPooledTransactionHashes66(hashes)
        );
    }

    #[tokio::test]
    async fn test_read_unknown_code_and_closed_stream() {
        let bytes = raw_bytes(Frame::new(0x0e, vec![0xc0]));
        let mock_reader = MockIoBuilder::new().read(&bytes).build();
        let mut connection = create_test_connection(mock_reader, Vec::new());

        assert_eq!(
            connection.read().await,
            Message::Error(MessageError::UnknownCode(0x0e))
        );
        // The mock stream is exhausted, reads now fail without panicking.
        assert!(matches!(
            connection.read().await,
            Message::Error(MessageError::Read(_))
        ));
    }

    #[tokio::test]
    async fn test_write_error_message_rejected() {
        let mock_reader = MockIoBuilder::new().build();
        let mut connection = create_test_connection(mock_reader, Vec::new());

        let result = connection
            .write(&Message::Error(MessageError::UnknownCode(1)))
            .await;
        assert!(matches!(result, Err(ConnectionError::InvalidMessage)));
    }

    #[tokio::test]
    async fn test_peer_info() {
        let incoming = [
            raw_frame(&Message::Hello(remote_hello(vec![
                Capability::new("eth", 67),
                Capability::new("eth", 68),
                Capability::new("snap", 1),
            ]))),
            raw_frame(&Message::Ping(Ping)),
            raw_frame(&Message::Status(remote_status())),
        ]
        .concat();
        let mock_reader = MockIoBuilder::new().read(&incoming).build();
        let mut connection = create_test_connection(mock_reader, Vec::new());

        let (hello, status) = connection.peer_info().await.unwrap();
        assert_eq!(hello.name, "Geth/v1.13.5-stable");
        assert_eq!(status, remote_status());
        assert_eq!(
            connection.negotiated_capabilities(),
            &[Capability::new("eth", 68), Capability::new("snap", 1)]
        );
    }

    #[tokio::test]
    async fn test_peer_info_disconnect() {
        let incoming = raw_frame(&Message::Disconnects(Disconnects(vec![
            DisconnectReason::TooManyPeers,
        ])));
        let mock_reader = MockIoBuilder::new().read(&incoming).build();
        let mut connection = create_test_connection(mock_reader, Vec::new());

        let result = connection.peer_info().await;
        assert!(matches!(
            result,
            Err(ConnectionError::Disconnected(DisconnectReason::TooManyPeers))
        ));
    }

    #[tokio::test]
    async fn test_peer_info_no_shared_capability() {
        let incoming = raw_frame(&Message::Hello(remote_hello(vec![Capability::new(
            "les", 4,
        )])));
        let mock_reader = MockIoBuilder::new().read(&incoming).build();
        let mut connection = create_test_connection(mock_reader, Vec::new());

        let result = connection.peer_info().await;
        assert!(matches!(result, Err(ConnectionError::NoSharedCapability)));
    }

    #[tokio::test]
    async fn test_peer_info_unexpected_identity() {
        let mut hello = remote_hello(vec![Capability::new("eth", 68)]);
        hello.id = crate::node::PeerId::repeat_byte(0x01);
        let incoming = raw_frame(&Message::Hello(hello));
        let mock_reader = MockIoBuilder::new().read(&incoming).build();
        let mut connection = create_test_connection(mock_reader, Vec::new());

        let result = connection.peer_info().await;
        assert!(matches!(result, Err(ConnectionError::UnexpectedIdentity)));
    }

    #[tokio::test]
    async fn test_state_sync_response_skips_other_messages() {
        let incoming = [
            raw_frame(&Message::Ping(Ping)),
            raw_frame(&Message::ByteCodes(ByteCodes {
                request_id: 6,
                codes: vec![],
            })),
            raw_frame(&Message::AccountRange(AccountRange {
                request_id: 7,
                accounts: vec![],
                proof: vec![],
            })),
        ]
        .concat();
        let mock_reader = MockIoBuilder::new().read(&incoming).build();
        let mut connection = create_test_connection(mock_reader, Vec::new());

        let message = connection
            .read_state_sync_response(7, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(message.code(), code::ACCOUNT_RANGE);
        assert_eq!(message.request_id(), 7);
    }

    #[tokio::test]
    async fn test_state_sync_response_malformed() {
        let incoming = raw_bytes(Frame::new(code::ACCOUNT_RANGE, vec![0xc1, 0x07]));
        let mock_reader = MockIoBuilder::new().read(&incoming).build();
        let mut connection = create_test_connection(mock_reader, Vec::new());

        let result = connection
            .read_state_sync_response(7, Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(ConnectionError::InvalidFrame(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_sync_response_timeout() {
        let (local, _remote) = tokio::io::duplex(1024);
        let (reader, writer) = tokio::io::split(local);
        let mut connection = create_test_connection(reader, writer);

        let result = connection
            .read_state_sync_response(1, Duration::from_secs(5))
            .await;
        assert!(matches!(result, Err(ConnectionError::Timeout)));
    }

    #[tokio::test]
    async fn test_request_tracking() {
        let mock_reader = MockIoBuilder::new().build();
        let mut connection = create_test_connection(mock_reader, Vec::new());

        let hash = B256::repeat_byte(0x42);
        let first = connection.request_block_bodies(hash).await.unwrap();
        let second = connection.request_block_headers(hash, 1).await.unwrap();
        let third = connection.request_block_headers(100u64, 1).await.unwrap();
        assert_eq!((first, second, third), (1, 2, 3));
        assert_eq!(connection.outstanding_requests(), 2);

        let request = connection.take_request(first).unwrap();
        assert_eq!(request.block_hash, hash);
        assert!(connection.take_request(first).is_none());
        assert!(connection.take_request(third).is_none());
    }
}
