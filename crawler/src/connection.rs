//! Peer dialing abstractions for testing and mocking.
//!
//! This module provides the [`PeerDialer`] trait the crawl engine uses to
//! learn a node's hello and chain status, enabling dependency injection for
//! testing without modifying the core crawler logic.

use devp2p_peers_connection::{
    ClientId, Connection, ConnectionConfiguration, ConnectionError, Hello, Node, Status,
};
use log::debug;
use std::future::Future;

/// Dials nodes and reports what they announce.
pub trait PeerDialer: Send + Sync + 'static {
    /// Connect to the node and exchange hello and status messages.
    ///
    /// The connection is dropped once the exchange finished.
    ///
    /// # Returns
    ///
    /// * `Ok((Hello, Status))` - The node's hello and chain status.
    /// * `Err(ConnectionError)` - The node was unreachable or rejected us.
    fn peer_info(
        &self,
        node: &Node,
    ) -> impl Future<Output = Result<(Hello, Status), ConnectionError>> + Send;
}

/// Standard dialer that opens real TCP connections.
#[derive(Debug, Clone)]
pub struct TcpPeerDialer {
    config: ConnectionConfiguration,
}

impl TcpPeerDialer {
    /// Create a new dialer with the given connection configuration.
    pub fn new(config: ConnectionConfiguration) -> Self {
        Self { config }
    }

    pub fn configuration(&self) -> &ConnectionConfiguration {
        &self.config
    }

    /// Returns the dialer advertising the given client identifier.
    pub fn with_client_id(mut self, client_id: ClientId) -> Self {
        self.config = self.config.with_client_id(client_id);
        self
    }
}

impl PeerDialer for TcpPeerDialer {
    fn peer_info(
        &self,
        node: &Node,
    ) -> impl Future<Output = Result<(Hello, Status), ConnectionError>> + Send {
        let node = node.clone();
        let config = self.config.clone();
        async move {
            let mut connection = Connection::tcp(node, config).await?;
            let info = connection.peer_info().await;
            if let Err(e) = &info {
                debug!("Peer info exchange with {} failed: {e}", connection.node());
            }
            info
        }
    }
}

#[cfg(test)]
pub mod test_utils {
    //! Test utilities for exercising the crawl engine without a network.

    use super::*;
    use devp2p_peers_connection::message::ForkId;
    use devp2p_peers_connection::{Capability, NodeId, B256, P2P_VERSION, U256};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Status announced by a scripted peer on the given network.
    pub fn status(network_id: u64) -> Status {
        Status {
            protocol_version: 68,
            network_id,
            total_difficulty: U256::from(1u64),
            head: B256::repeat_byte(0x01),
            genesis: B256::repeat_byte(0x02),
            fork_id: ForkId::default(),
        }
    }

    /// Mock dialer answering from a table of reachable peers.
    ///
    /// Peers without an entry are unreachable. Clones share their table and
    /// call counter.
    #[derive(Debug, Clone, Default)]
    pub struct MockDialer {
        networks: Arc<Mutex<HashMap<NodeId, u64>>>,
        calls: Arc<AtomicUsize>,
    }

    impl MockDialer {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make a node reachable, announcing the given network id.
        pub fn add_peer(&self, id: NodeId, network_id: u64) {
            self.networks.lock().unwrap().insert(id, network_id);
        }

        /// Number of dial attempts.
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl PeerDialer for MockDialer {
        fn peer_info(
            &self,
            node: &Node,
        ) -> impl Future<Output = Result<(Hello, Status), ConnectionError>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let network_id = self.networks.lock().unwrap().get(&node.id).copied();
            let public_key = node.public_key;
            async move {
                let network_id = network_id.ok_or(ConnectionError::Timeout)?;
                let hello = Hello {
                    version: P2P_VERSION,
                    name: "Geth/v1.13.5-stable".to_string(),
                    capabilities: vec![Capability::new("eth", 68)],
                    listen_port: 30303,
                    id: public_key,
                };
                Ok((hello, status(network_id)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_utils::MockDialer;
    use super::*;
    use devp2p_peers_connection::PeerId;
    use std::net::{IpAddr, Ipv4Addr};
    use tokio::net::TcpListener;

    fn node(byte: u8) -> Node {
        Node::new(
            PeerId::repeat_byte(byte),
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            30303,
            30303,
        )
    }

    #[tokio::test]
    async fn test_mock_dialer() {
        let dialer = MockDialer::new();
        dialer.add_peer(node(1).id, 137);

        let (hello, status) = dialer.peer_info(&node(1)).await.unwrap();
        assert_eq!(hello.id, node(1).public_key);
        assert_eq!(status.network_id, 137);

        assert!(matches!(
            dialer.peer_info(&node(2)).await,
            Err(ConnectionError::Timeout)
        ));
        assert_eq!(dialer.calls(), 2);
    }

    #[tokio::test]
    async fn test_tcp_dialer_peer_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Accept and hang up straight away.
            let _ = listener.accept().await;
        });

        let target = Node::new(PeerId::repeat_byte(3), addr.ip(), addr.port(), addr.port());
        let dialer = TcpPeerDialer::new(ConnectionConfiguration::random());
        let result = dialer.peer_info(&target).await;
        assert!(matches!(result, Err(ConnectionError::TransportFailed(_))));
    }
}
