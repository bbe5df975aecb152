//! Builder pattern for configuring and creating crawler instances.

use crate::connection::{PeerDialer, TcpPeerDialer};
use crate::crawler::Crawler;
use crate::iterator::NodeIterator;
use crate::node_set::NodeSet;
use crate::resolver::Resolver;
use crate::session::CrawlSession;
use devp2p_peers_connection::{ClientId, ClientIdError};
use std::fmt;
use std::time::Duration;

/// Default minimum time between two checks of the same node.
pub const DEFAULT_REVALIDATE_INTERVAL: Duration = Duration::from_secs(10 * 60);
/// Network id which disables the network filter.
const ANY_NETWORK: u64 = 0;

/// Errors that can occur during crawler configuration.
#[derive(Debug, Clone)]
pub enum CrawlerBuilderError {
    /// Client id doesn't follow the required format.
    InvalidClientId(ClientIdError),
}

impl fmt::Display for CrawlerBuilderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlerBuilderError::InvalidClientId(err) => {
                write!(f, "Invalid client id: {err}")
            }
        }
    }
}

impl std::error::Error for CrawlerBuilderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CrawlerBuilderError::InvalidClientId(err) => Some(err),
        }
    }
}

/// Builder for creating a customized [`Crawler`] instance.
///
/// # Example
///
/// ```
/// # fn main() -> Result<(), devp2p_peers_crawler::CrawlerBuilderError> {
/// use devp2p_peers_crawler::{
///     ConnectionConfiguration, CrawlerBuilder, DialResolver, NodeSet, TcpPeerDialer,
/// };
/// use std::time::Duration;
///
/// let dialer = TcpPeerDialer::new(ConnectionConfiguration::random());
/// let resolver = DialResolver::new(dialer.clone());
///
/// let crawler = CrawlerBuilder::new(NodeSet::new(), resolver, dialer)
///     .with_client_id("devp2p-crawler/v0.1.0")?
///     .with_network_id(1)
///     .with_revalidate_interval(Duration::from_secs(30 * 60))
///     .build();
/// # Ok(())
/// # }
/// ```
pub struct CrawlerBuilder<R, D> {
    /// Nodes to revalidate.
    input: NodeSet,
    resolver: R,
    dialer: D,
    /// Additional sources of candidate nodes.
    iterators: Vec<Box<dyn NodeIterator>>,
    /// Minimum time between two checks of the same node.
    revalidate_interval: Duration,
    /// Expected network id.
    network_id: u64,
}

impl<R: Resolver, D: PeerDialer> CrawlerBuilder<R, D> {
    /// Create a new crawler builder.
    ///
    /// # Arguments
    ///
    /// * `input` - The node set to revalidate. Its scored records seed the output.
    /// * `resolver` - Source of fresh node records.
    /// * `dialer` - Used to check the network of a node.
    ///
    /// # Returns
    ///
    /// A new `CrawlerBuilder` instance.
    pub fn new(input: NodeSet, resolver: R, dialer: D) -> Self {
        CrawlerBuilder {
            input,
            resolver,
            dialer,
            iterators: Vec::new(),
            revalidate_interval: DEFAULT_REVALIDATE_INTERVAL,
            network_id: ANY_NETWORK,
        }
    }

    /// Add a source of candidate nodes, e.g. a discovery walk.
    ///
    /// # Arguments
    ///
    /// * `iterator` - The source, closed when the crawl stops.
    ///
    /// # Returns
    ///
    /// Self for method chaining.
    pub fn with_iterator<I: NodeIterator + 'static>(mut self, iterator: I) -> Self {
        self.iterators.push(Box::new(iterator));
        self
    }

    /// Set the minimum time between two checks of the same node.
    ///
    /// # Arguments
    ///
    /// * `interval` - Nodes checked more recently are skipped (defaults to 10 minutes).
    ///
    /// # Returns
    ///
    /// Self for method chaining.
    pub fn with_revalidate_interval(mut self, interval: Duration) -> Self {
        self.revalidate_interval = interval;
        self
    }

    /// Only keep nodes announcing the given network id.
    ///
    /// Every candidate is dialed for its status when a network id is set,
    /// which slows the crawl down considerably. Zero disables the filter.
    ///
    /// # Arguments
    ///
    /// * `network_id` - The expected network id (defaults to 0).
    ///
    /// # Returns
    ///
    /// Self for method chaining.
    pub fn with_network_id(mut self, network_id: u64) -> Self {
        self.network_id = network_id;
        self
    }

    /// Build the crawler with the configured options.
    ///
    /// # Returns
    ///
    /// A configured `Crawler` instance.
    pub fn build(self) -> Crawler<R, D> {
        // Nodes failing revalidation are dropped from the output during the run.
        // Records without a score never enter it.
        let output: NodeSet = self
            .input
            .iter()
            .filter(|record| record.score > 0)
            .cloned()
            .collect();
        let session = CrawlSession::new(
            output,
            self.resolver,
            self.dialer,
            self.revalidate_interval,
            self.network_id,
        );
        Crawler::new(session, self.input, self.iterators)
    }
}

impl<R: Resolver> CrawlerBuilder<R, TcpPeerDialer> {
    /// Set a custom client id for the network filter's connections.
    ///
    /// The client id identifies the crawler to other nodes. It must follow
    /// the "Name/Version" convention.
    ///
    /// # Arguments
    ///
    /// * `client_id` - The client id string to use.
    ///
    /// # Returns
    ///
    /// * `Ok(Self)` - The builder for method chaining if validation succeeds.
    /// * `Err(CrawlerBuilderError)` - If the client id format is invalid.
    pub fn with_client_id<S: Into<String>>(
        mut self,
        client_id: S,
    ) -> Result<Self, CrawlerBuilderError> {
        let client_id = ClientId::new(client_id).map_err(CrawlerBuilderError::InvalidClientId)?;
        self.dialer = self.dialer.with_client_id(client_id);
        Ok(self)
    }
}
