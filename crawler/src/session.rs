//! Internal session coordination for crawling operations.
//!
//! This module contains the [`CrawlSession`] which holds the shared output set
//! and applies the revalidation state machine to each candidate node. Worker
//! tasks spawned by the [`Crawler`](crate::Crawler) each own a clone of the
//! session.

use crate::connection::PeerDialer;
use crate::node_set::{should_skip, truncated_now, NodeRecord, NodeSet};
use crate::resolver::Resolver;
use devp2p_peers_connection::Node;
use log::debug;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{mpsc, watch, Mutex, RwLock};

/// What a single revalidation did to the output set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The node's score dropped to zero and it was deleted.
    Removed,
    /// The node was checked recently, nothing was done.
    SkipRecent,
    /// The node is on another network or never answered.
    SkipIncompatible,
    /// The node answered for the first time.
    Added,
    /// A known node was revalidated.
    Updated,
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateOutcome::Removed => write!(f, "removed"),
            UpdateOutcome::SkipRecent => write!(f, "skipped (recent)"),
            UpdateOutcome::SkipIncompatible => write!(f, "skipped (incompatible)"),
            UpdateOutcome::Added => write!(f, "added"),
            UpdateOutcome::Updated => write!(f, "updated"),
        }
    }
}

/// Running tally of update outcomes.
#[derive(Debug, Default)]
pub struct CrawlStats {
    added: AtomicU64,
    updated: AtomicU64,
    removed: AtomicU64,
    skip_recent: AtomicU64,
    skip_incompatible: AtomicU64,
}

impl CrawlStats {
    pub fn record(&self, outcome: UpdateOutcome) {
        let counter = match outcome {
            UpdateOutcome::Removed => &self.removed,
            UpdateOutcome::SkipRecent => &self.skip_recent,
            UpdateOutcome::SkipIncompatible => &self.skip_incompatible,
            UpdateOutcome::Added => &self.added,
            UpdateOutcome::Updated => &self.updated,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn added(&self) -> u64 {
        self.added.load(Ordering::Relaxed)
    }

    pub fn updated(&self) -> u64 {
        self.updated.load(Ordering::Relaxed)
    }

    pub fn removed(&self) -> u64 {
        self.removed.load(Ordering::Relaxed)
    }

    pub fn skip_recent(&self) -> u64 {
        self.skip_recent.load(Ordering::Relaxed)
    }

    pub fn skip_incompatible(&self) -> u64 {
        self.skip_incompatible.load(Ordering::Relaxed)
    }
}

impl fmt::Display for CrawlStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "added={} updated={} removed={} ignored(recent)={} ignored(incompatible)={}",
            self.added(),
            self.updated(),
            self.removed(),
            self.skip_recent(),
            self.skip_incompatible()
        )
    }
}

/// Internal coordinator for a crawling session.
///
/// # Locking
///
/// The output set sits behind a read-write lock. A revalidation reads the
/// current record under the shared lock, performs all network I/O without
/// holding any lock, and stores the result under the exclusive lock. The read
/// and the final write are not atomic as a pair; the last writer wins.
pub(crate) struct CrawlSession<R, D> {
    /// Revalidated nodes, seeded with the input set.
    output: Arc<RwLock<NodeSet>>,
    resolver: Arc<R>,
    dialer: Arc<D>,
    /// Nodes checked more recently than this are skipped.
    revalidate_interval: Duration,
    /// Expected network id, zero disables the network filter.
    network_id: u64,
    stats: Arc<CrawlStats>,
}

// Manual impl, the derive would require `R: Clone` and `D: Clone`.
impl<R, D> Clone for CrawlSession<R, D> {
    fn clone(&self) -> Self {
        CrawlSession {
            output: Arc::clone(&self.output),
            resolver: Arc::clone(&self.resolver),
            dialer: Arc::clone(&self.dialer),
            revalidate_interval: self.revalidate_interval,
            network_id: self.network_id,
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<R: Resolver, D: PeerDialer> CrawlSession<R, D> {
    /// Create a new crawl session.
    ///
    /// # Arguments
    ///
    /// * `output` - Initial contents of the output set.
    /// * `resolver` - Source of fresh node records.
    /// * `dialer` - Used for the network filter.
    /// * `revalidate_interval` - Minimum time between two checks of a node.
    /// * `network_id` - Expected network id, zero for none.
    pub fn new(
        output: NodeSet,
        resolver: R,
        dialer: D,
        revalidate_interval: Duration,
        network_id: u64,
    ) -> Self {
        CrawlSession {
            output: Arc::new(RwLock::new(output)),
            resolver: Arc::new(resolver),
            dialer: Arc::new(dialer),
            revalidate_interval,
            network_id,
            stats: Arc::new(CrawlStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<CrawlStats> {
        Arc::clone(&self.stats)
    }

    /// Copy of the current output set.
    pub async fn snapshot(&self) -> NodeSet {
        self.output.read().await.clone()
    }

    /// Whether the node on the other end of `candidate` belongs to the
    /// expected network.
    async fn is_compatible(&self, candidate: &Node) -> bool {
        match self.dialer.peer_info(candidate).await {
            Ok((hello, status)) => {
                debug!("{candidate} announced {} ({status})", hello.name);
                !should_skip(self.network_id, &status)
            }
            Err(e) => {
                debug!("Dialing {candidate} failed: {e}");
                false
            }
        }
    }

    /// Revalidates a single candidate and stores the result.
    ///
    /// # Returns
    ///
    /// What happened to the candidate's record.
    pub async fn update_node(&self, candidate: Node) -> UpdateOutcome {
        let known = self.output.read().await.get(&candidate.id).cloned();

        if let Some(last_check) = known.as_ref().and_then(|record| record.last_check) {
            // A check stamped in the future counts as recent.
            let elapsed = SystemTime::now()
                .duration_since(last_check)
                .unwrap_or(Duration::ZERO);
            if elapsed < self.revalidate_interval {
                debug!("Skipping recently checked node {}", candidate.id);
                return UpdateOutcome::SkipRecent;
            }
        }

        if self.network_id != 0 && !self.is_compatible(&candidate).await {
            return UpdateOutcome::SkipIncompatible;
        }

        let mut record = known.unwrap_or_else(|| NodeRecord::new(candidate.clone()));
        let mut outcome = UpdateOutcome::Updated;
        let now = truncated_now();
        record.last_check = Some(now);

        match self.resolver.request_record(&candidate).await {
            Ok(fresh) if fresh.id == candidate.id => {
                if fresh.seq >= record.seq() {
                    record.node = fresh;
                }
                record.score = record.score.saturating_add(1);
                if record.first_response.is_none() {
                    record.first_response = Some(now);
                    outcome = UpdateOutcome::Added;
                }
                record.last_response = Some(now);
            }
            result => {
                match result {
                    Ok(fresh) => {
                        debug!("{} answered with a record for {}", candidate.id, fresh.id)
                    }
                    Err(e) => debug!("Record request for {} failed: {e}", candidate.id),
                }
                if record.score == 0 {
                    debug!("Skipping node {} without a record", candidate.id);
                    return UpdateOutcome::SkipIncompatible;
                }
                record.score /= 2;
            }
        }

        let mut output = self.output.write().await;
        if record.score == 0 {
            debug!("Removing node {}", candidate.id);
            output.remove(&candidate.id);
            return UpdateOutcome::Removed;
        }

        debug!(
            "Updating node {} (seq {}, score {})",
            candidate.id,
            record.seq(),
            record.score
        );
        output.insert(record);
        outcome
    }

    /// Worker loop: revalidates queued candidates until shutdown.
    ///
    /// Buffered candidates are preferred over the shutdown signal. Once the
    /// queue is closed the worker idles until shutdown.
    pub async fn work(
        self,
        queue: Arc<Mutex<mpsc::Receiver<Node>>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            let next = tokio::select! {
                biased;
                node = async { queue.lock().await.recv().await } => node,
                _ = wait_for_shutdown(&mut shutdown) => return,
            };

            match next {
                Some(node) => {
                    let outcome = self.update_node(node).await;
                    self.stats.record(outcome);
                }
                None => {
                    wait_for_shutdown(&mut shutdown).await;
                    return;
                }
            }
        }
    }
}

/// Resolves once shutdown was signalled or the signal's sender is gone.
pub(crate) async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
