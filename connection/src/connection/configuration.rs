//! Connection configuration types and constants.

use crate::client_id::ClientId;
use crate::message::Capability;
use crate::node::{peer_id, PeerId};
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use std::fmt;
use std::time::Duration;

/// Default timeout for connection establishment.
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for the hello and status exchange.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Port advertised in hello messages by a node which does not accept
/// incoming connections.
pub const NON_LISTENING_PORT: u16 = 0;

/// Capabilities advertised when none are configured: eth/66 through eth/68
/// and snap/1.
pub fn default_capabilities() -> Vec<Capability> {
    vec![
        Capability::new("eth", 66),
        Capability::new("eth", 67),
        Capability::new("eth", 68),
        Capability::new("snap", 1),
    ]
}

/// Configuration used to build a connection.
#[derive(Debug, Clone)]
pub struct ConnectionConfiguration {
    /// Node key identifying the local side of the session.
    pub secret_key: SecretKey,
    /// Client identifier advertised in the hello message.
    pub client_id: ClientId,
    /// Sub-protocols advertised in the hello message.
    pub capabilities: Vec<Capability>,
    /// Port advertised in the hello message.
    pub listen_port: u16,
    /// Timeout for connection establishment.
    pub connection_timeout: Duration,
    /// Timeout for the hello and status exchange.
    pub handshake_timeout: Duration,
}

impl ConnectionConfiguration {
    /// Creates a configuration for a non-listening node with the given key.
    ///
    /// The configuration advertises the default client id and capabilities,
    /// which suits crawlers that query peers without accepting connections.
    ///
    /// # Arguments
    ///
    /// * `secret_key` - The node key used for the session.
    pub fn non_listening(secret_key: SecretKey) -> Self {
        Self {
            secret_key,
            client_id: ClientId::default(),
            capabilities: default_capabilities(),
            listen_port: NON_LISTENING_PORT,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Creates a non-listening configuration with a freshly generated node key.
    pub fn random() -> Self {
        Self::non_listening(SecretKey::new(&mut secp256k1::rand::thread_rng()))
    }

    /// Set the client identifier advertised to peers.
    pub fn with_client_id(mut self, client_id: ClientId) -> Self {
        self.client_id = client_id;
        self
    }

    /// Set the advertised capabilities.
    pub fn with_capabilities(mut self, capabilities: Vec<Capability>) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Set the timeout for connection establishment.
    ///
    /// The default is 10 seconds, long enough for high-latency links while
    /// failing quickly on unreachable peers.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use devp2p_peers_connection::ConnectionConfiguration;
    ///
    /// let config = ConnectionConfiguration::random()
    ///     .with_connection_timeout(Duration::from_secs(30));
    /// assert_eq!(config.connection_timeout, Duration::from_secs(30));
    /// ```
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the timeout for the hello and status exchange.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// The public key matching the configured node key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_secret_key(&Secp256k1::new(), &self.secret_key)
    }

    /// The identity advertised in hello messages.
    pub fn peer_id(&self) -> PeerId {
        peer_id(&self.public_key())
    }
}

impl fmt::Display for ConnectionConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let capabilities: Vec<String> = self.capabilities.iter().map(|c| c.to_string()).collect();
        write!(
            f,
            "ConnectionConfiguration {{ client_id: \"{}\", capabilities: [{}], listen_port: {} }}",
            self.client_id,
            capabilities.join(", "),
            self.listen_port
        )
    }
}
