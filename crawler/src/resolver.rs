//! Refreshing node records.

use crate::connection::PeerDialer;
use devp2p_peers_connection::{ConnectionError, Node};
use log::debug;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Errors returned by a [`Resolver`].
#[derive(Debug)]
pub enum ResolveError {
    /// The node did not answer in time.
    Timeout,
    /// The node answered without a usable record.
    InvalidRecord(String),
    /// Talking to the node failed.
    Connection(ConnectionError),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::Timeout => write!(f, "Record request timed out"),
            ResolveError::InvalidRecord(reason) => write!(f, "Invalid node record: {reason}"),
            ResolveError::Connection(err) => write!(f, "Record request failed: {err}"),
        }
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResolveError::Timeout => None,
            ResolveError::InvalidRecord(_) => None,
            ResolveError::Connection(err) => Some(err),
        }
    }
}

impl From<ConnectionError> for ResolveError {
    fn from(err: ConnectionError) -> Self {
        match err {
            ConnectionError::Timeout => ResolveError::Timeout,
            err => ResolveError::Connection(err),
        }
    }
}

/// Answers "give me the latest signed record of this node" queries.
///
/// Usually backed by a discovery protocol. Implementations must be cheap to
/// share between the crawl workers.
pub trait Resolver: Send + Sync + 'static {
    /// Request the node's current record.
    ///
    /// # Returns
    ///
    /// * `Ok(Node)` - The node's descriptor built from its latest record.
    /// * `Err(ResolveError)` - The node did not provide a record.
    fn request_record(&self, node: &Node)
        -> impl Future<Output = Result<Node, ResolveError>> + Send;
}

impl<R: Resolver> Resolver for Arc<R> {
    fn request_record(
        &self,
        node: &Node,
    ) -> impl Future<Output = Result<Node, ResolveError>> + Send {
        (**self).request_record(node)
    }
}

/// A resolver which checks liveness by dialing the node.
///
/// A node counts as resolved when it completes the hello and status exchange.
/// The returned descriptor is the dialed one, so sequence numbers never move.
/// Useful when no discovery service is at hand.
#[derive(Debug, Clone)]
pub struct DialResolver<D> {
    dialer: D,
}

impl<D: PeerDialer> DialResolver<D> {
    pub fn new(dialer: D) -> Self {
        DialResolver { dialer }
    }
}

impl<D: PeerDialer> Resolver for DialResolver<D> {
    fn request_record(
        &self,
        node: &Node,
    ) -> impl Future<Output = Result<Node, ResolveError>> + Send {
        let node = node.clone();
        async move {
            let (hello, status) = self.dialer.peer_info(&node).await?;
            debug!("{node} is alive: {} ({status})", hello.name);
            Ok(node)
        }
    }
}

#[cfg(test)]
pub mod test_utils {
    //! Scripted resolver for testing the crawl engine.

    use super::*;
    use devp2p_peers_connection::NodeId;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Resolver answering from a fixed table of records.
    ///
    /// Nodes without an entry fail to resolve.
    #[derive(Debug, Default)]
    pub struct MockResolver {
        records: Mutex<HashMap<NodeId, Node>>,
        calls: AtomicUsize,
        calls_per_node: Mutex<HashMap<NodeId, usize>>,
    }

    impl MockResolver {
        pub fn new() -> Self {
            Self::default()
        }

        /// Answer queries for `record.id` with `record`.
        pub fn add_record(&self, record: Node) {
            self.records.lock().unwrap().insert(record.id, record);
        }

        /// Answer queries for `id` with the record of a different node.
        pub fn add_record_for(&self, id: NodeId, record: Node) {
            self.records.lock().unwrap().insert(id, record);
        }

        /// Total number of queries.
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Number of queries for one node.
        pub fn calls_for(&self, id: &NodeId) -> usize {
            self.calls_per_node
                .lock()
                .unwrap()
                .get(id)
                .copied()
                .unwrap_or(0)
        }
    }

    impl Resolver for MockResolver {
        fn request_record(
            &self,
            node: &Node,
        ) -> impl Future<Output = Result<Node, ResolveError>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self
                .calls_per_node
                .lock()
                .unwrap()
                .entry(node.id)
                .or_insert(0) += 1;
            let result = self
                .records
                .lock()
                .unwrap()
                .get(&node.id)
                .cloned()
                .ok_or(ResolveError::Timeout);
            async move { result }
        }
    }
}
