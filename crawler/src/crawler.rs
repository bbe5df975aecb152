use crate::connection::PeerDialer;
use crate::iterator::{NodeIterator, NodeSetIterator};
use crate::node_set::NodeSet;
use crate::resolver::Resolver;
use crate::session::{wait_for_shutdown, CrawlSession, CrawlStats};
use devp2p_peers_connection::Node;
use log::{debug, error, info};
use std::future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

/// Interval between two progress reports.
const STATUS_INTERVAL: Duration = Duration::from_secs(8);

/// A crawler for devp2p networks.
///
/// The crawler revalidates the nodes of an input set and every node emitted by
/// its discovery iterators, keeping the ones which still answer with a fresh
/// record. Each revalidation adjusts the node's liveness score and nodes whose
/// score drops to zero are removed from the output.
///
/// Use [`CrawlerBuilder`](crate::CrawlerBuilder) to create one.
pub struct Crawler<R, D> {
    session: CrawlSession<R, D>,
    /// Snapshot of the nodes the crawl started from.
    input: NodeSet,
    /// Discovery sources, without the input set.
    iterators: Vec<Box<dyn NodeIterator>>,
}

impl<R: Resolver, D: PeerDialer> Crawler<R, D> {
    pub(crate) fn new(
        session: CrawlSession<R, D>,
        input: NodeSet,
        iterators: Vec<Box<dyn NodeIterator>>,
    ) -> Self {
        Crawler {
            session,
            input,
            iterators,
        }
    }

    /// Live counters of the crawl, shared with the workers.
    pub fn stats(&self) -> Arc<CrawlStats> {
        self.session.stats()
    }

    /// Crawl until every source is exhausted or the timeout expires.
    ///
    /// # Termination
    ///
    /// * **Natural completion** - Every iterator, including the one replaying
    ///   the input set, is exhausted.
    /// * **Timeout** - The timeout is armed once the input set was replayed and
    ///   counts from the start of the run. `Duration::ZERO` disables it.
    ///
    /// Shutdown stops every iterator, waits for them to report back and then
    /// waits for the workers. Candidates already queued are still processed.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Maximum duration of the crawl once the input is replayed.
    /// * `threads` - Number of concurrent revalidation workers, at least one.
    ///
    /// # Returns
    ///
    /// The revalidated node set.
    pub async fn run(self, timeout: Duration, threads: usize) -> NodeSet {
        let Crawler {
            session,
            input,
            mut iterators,
        } = self;
        let threads = threads.max(1);
        let start = Instant::now();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (queue_tx, queue_rx) = mpsc::channel::<Node>(threads);
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<usize>();

        // The input set is replayed by the last iterator.
        let input_index = iterators.len();
        iterators.push(Box::new(NodeSetIterator::new(input.nodes())));
        let mut live = iterators.len();

        for (index, iterator) in iterators.into_iter().enumerate() {
            tokio::spawn(feed(
                index,
                iterator,
                queue_tx.clone(),
                shutdown_rx.clone(),
                done_tx.clone(),
            ));
        }
        drop(queue_tx);
        drop(done_tx);

        let queue = Arc::new(Mutex::new(queue_rx));
        let workers: Vec<JoinHandle<()>> = (0..threads)
            .map(|_| {
                tokio::spawn(
                    session
                        .clone()
                        .work(Arc::clone(&queue), shutdown_rx.clone()),
                )
            })
            .collect();
        info!(
            "Crawling {} input nodes and {} discovery sources with {threads} workers",
            input.len(),
            live - 1
        );

        let stats = session.stats();
        let mut status = time::interval_at(start + STATUS_INTERVAL, STATUS_INTERVAL);
        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                done = done_rx.recv() => {
                    let Some(index) = done else {
                        break;
                    };
                    if index == input_index {
                        info!("Revalidation of input set is done ({} nodes)", input.len());
                        if !timeout.is_zero() {
                            deadline = Some(start + timeout);
                        }
                    }
                    live -= 1;
                    if live == 0 {
                        info!("All node sources exhausted");
                        break;
                    }
                }
                _ = sleep_until(deadline) => {
                    info!("Crawl timeout reached");
                    break;
                }
                _ = status.tick() => {
                    info!("Crawling in progress: {stats}");
                }
            }
        }

        // Workers and feeders observe the same signal, feeders close their
        // iterator on the way out.
        let _ = shutdown_tx.send(true);
        while live > 0 {
            if done_rx.recv().await.is_none() {
                break;
            }
            live -= 1;
        }
        for worker in workers {
            if let Err(e) = worker.await {
                error!("Crawl worker failed: {e}");
            }
        }

        info!("Crawl finished: {stats}");
        session.snapshot().await
    }
}

/// Sleeps until the deadline, forever when there is none.
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}

/// Pushes the candidates of one iterator into the work queue until it is
/// exhausted or shutdown is signalled, then reports its index.
async fn feed(
    index: usize,
    mut iterator: Box<dyn NodeIterator>,
    queue: mpsc::Sender<Node>,
    mut shutdown: watch::Receiver<bool>,
    done: mpsc::UnboundedSender<usize>,
) {
    loop {
        let node = tokio::select! {
            node = iterator.next() => node,
            _ = wait_for_shutdown(&mut shutdown) => break,
        };
        let Some(node) = node else {
            debug!("Node source {index} exhausted");
            break;
        };
        tokio::select! {
            sent = queue.send(node) => {
                if sent.is_err() {
                    break;
                }
            }
            _ = wait_for_shutdown(&mut shutdown) => break,
        }
    }

    iterator.close();
    let _ = done.send(index);
}
