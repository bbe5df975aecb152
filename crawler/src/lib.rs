mod builder;
mod connection;
mod crawler;
mod iterator;
mod node_set;
mod resolver;
mod session;

pub use builder::{CrawlerBuilder, CrawlerBuilderError, DEFAULT_REVALIDATE_INTERVAL};
pub use connection::{PeerDialer, TcpPeerDialer};
pub use crawler::Crawler;
pub use iterator::{NodeIterator, NodeSetIterator, ReceiverIterator};
pub use node_set::{should_skip, truncated_now, NodeRecord, NodeSet};
pub use resolver::{DialResolver, ResolveError, Resolver};
pub use session::{CrawlStats, UpdateOutcome};

// Re-exports.
pub use devp2p_peers_connection::{
    ClientId, ConnectionConfiguration, ConnectionError, Hello, Node, NodeId, NodeParseError,
    PeerId, SecretKey, Status,
};
