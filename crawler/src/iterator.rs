//! Sources of candidate nodes.

use devp2p_peers_connection::Node;
use futures::future::{self, BoxFuture, FutureExt};
use tokio::sync::mpsc;

/// A closable asynchronous sequence of candidate nodes.
///
/// Discovery sources implement this to feed a crawl. A source may be finite,
/// like a fixed list, or unbounded, like a live discovery walk.
pub trait NodeIterator: Send {
    /// The next candidate, `None` once the source is exhausted or closed.
    ///
    /// The returned future must be cancellation safe: dropping it before
    /// completion must not lose a node.
    fn next(&mut self) -> BoxFuture<'_, Option<Node>>;

    /// Stop the source. Later calls to [`NodeIterator::next`] return `None`.
    fn close(&mut self) {}
}

impl<I: NodeIterator + ?Sized> NodeIterator for Box<I> {
    fn next(&mut self) -> BoxFuture<'_, Option<Node>> {
        (**self).next()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Replays a fixed list of nodes.
#[derive(Debug)]
pub struct NodeSetIterator {
    nodes: std::vec::IntoIter<Node>,
    closed: bool,
}

impl NodeSetIterator {
    pub fn new(nodes: Vec<Node>) -> Self {
        NodeSetIterator {
            nodes: nodes.into_iter(),
            closed: false,
        }
    }
}

impl NodeIterator for NodeSetIterator {
    fn next(&mut self) -> BoxFuture<'_, Option<Node>> {
        let node = if self.closed { None } else { self.nodes.next() };
        future::ready(node).boxed()
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Yields nodes pushed through a channel, e.g. by a discovery task.
///
/// The iterator ends once every sender is dropped or it is closed.
#[derive(Debug)]
pub struct ReceiverIterator {
    receiver: mpsc::Receiver<Node>,
}

impl ReceiverIterator {
    pub fn new(receiver: mpsc::Receiver<Node>) -> Self {
        ReceiverIterator { receiver }
    }

    /// Create an iterator together with the sender feeding it.
    pub fn channel(capacity: usize) -> (mpsc::Sender<Node>, Self) {
        let (sender, receiver) = mpsc::channel(capacity);
        (sender, ReceiverIterator::new(receiver))
    }
}

impl NodeIterator for ReceiverIterator {
    fn next(&mut self) -> BoxFuture<'_, Option<Node>> {
        self.receiver.recv().boxed()
    }

    fn close(&mut self) {
        self.receiver.close();
    }
}
