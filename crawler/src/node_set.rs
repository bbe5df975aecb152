//! Scored node records and the set holding them.

use devp2p_peers_connection::{Node, NodeId, Status};
use std::collections::hash_map;
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// What the crawler knows about a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    /// Latest known descriptor, carrying the record sequence number.
    pub node: Node,
    /// Liveness score. Records in a crawl output always have a score above zero.
    pub score: u32,
    /// Time of the first successful revalidation.
    pub first_response: Option<SystemTime>,
    /// Time of the latest successful revalidation.
    pub last_response: Option<SystemTime>,
    /// Time of the latest revalidation attempt.
    pub last_check: Option<SystemTime>,
}

impl NodeRecord {
    /// A record for a node which was never checked.
    pub fn new(node: Node) -> Self {
        NodeRecord {
            node,
            score: 0,
            first_response: None,
            last_response: None,
            last_check: None,
        }
    }

    /// Returns the record with the given score.
    pub fn with_score(mut self, score: u32) -> Self {
        self.score = score;
        self
    }

    /// Returns the record with the given last check time.
    pub fn with_last_check(mut self, last_check: SystemTime) -> Self {
        self.last_check = Some(last_check);
        self
    }

    pub fn id(&self) -> NodeId {
        self.node.id
    }

    /// Sequence number of the record the descriptor was taken from.
    pub fn seq(&self) -> u64 {
        self.node.seq
    }
}

/// Node records keyed by node id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSet(HashMap<NodeId, NodeRecord>);

impl NodeSet {
    pub fn new() -> Self {
        NodeSet(HashMap::new())
    }

    /// Insert a record, replacing any record with the same id.
    pub fn insert(&mut self, record: NodeRecord) -> Option<NodeRecord> {
        self.0.insert(record.id(), record)
    }

    pub fn get(&self, id: &NodeId) -> Option<&NodeRecord> {
        self.0.get(id)
    }

    pub fn remove(&mut self, id: &NodeId) -> Option<NodeRecord> {
        self.0.remove(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.0.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Descriptors of all nodes in the set, in no particular order.
    pub fn nodes(&self) -> Vec<Node> {
        self.0.values().map(|record| record.node.clone()).collect()
    }

    pub fn iter(&self) -> hash_map::Values<'_, NodeId, NodeRecord> {
        self.0.values()
    }
}

impl FromIterator<NodeRecord> for NodeSet {
    fn from_iter<I: IntoIterator<Item = NodeRecord>>(iter: I) -> Self {
        NodeSet(iter.into_iter().map(|record| (record.id(), record)).collect())
    }
}

impl IntoIterator for NodeSet {
    type Item = NodeRecord;
    type IntoIter = hash_map::IntoValues<NodeId, NodeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_values()
    }
}

/// The current time truncated to whole seconds.
pub fn truncated_now() -> SystemTime {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);
    UNIX_EPOCH + Duration::from_secs(secs)
}

/// Whether a peer announcing `status` is on a different network than the
/// expected one.
///
/// An expected network id of zero disables the filter.
pub fn should_skip(expected_network_id: u64, status: &Status) -> bool {
    expected_network_id != 0 && status.network_id != expected_network_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use devp2p_peers_connection::message::ForkId;
    use devp2p_peers_connection::{PeerId, B256, U256};
    use std::net::{IpAddr, Ipv4Addr};

    fn node(byte: u8) -> Node {
        Node::new(
            PeerId::repeat_byte(byte),
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, byte)),
            30303,
            30303,
        )
    }

    fn status(network_id: u64) -> Status {
        Status {
            protocol_version: 68,
            network_id,
            total_difficulty: U256::ZERO,
            head: B256::ZERO,
            genesis: B256::ZERO,
            fork_id: ForkId::default(),
        }
    }

    #[test]
    fn test_node_set_operations() {
        let mut set: NodeSet = vec![NodeRecord::new(node(1)), NodeRecord::new(node(2))]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&node(1).id));

        let replaced = set.insert(NodeRecord::new(node(1)).with_score(4));
        assert_eq!(replaced.map(|r| r.score), Some(0));
        assert_eq!(set.get(&node(1).id).map(|r| r.score), Some(4));

        assert!(set.remove(&node(2).id).is_some());
        assert_eq!(set.nodes(), vec![node(1)]);
    }

    #[test]
    fn test_truncated_now() {
        let now = truncated_now();
        let since_epoch = now.duration_since(UNIX_EPOCH).unwrap();
        assert_eq!(since_epoch.subsec_nanos(), 0);
        assert!(SystemTime::now() >= now);
    }

    #[test]
    fn test_should_skip() {
        // No filter configured.
        assert!(!should_skip(0, &status(5)));
        assert!(!should_skip(1, &status(1)));
        assert!(should_skip(1, &status(5)));
    }
}
