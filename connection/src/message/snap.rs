//! State-sync (`snap`) protocol messages.
//!
//! Every packet carries its request id as the first list element.

use alloy_primitives::{Bytes, B256};
use alloy_rlp::{RlpDecodable, RlpEncodable};

#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct GetAccountRange {
    pub request_id: u64,
    /// State root to serve the range from.
    pub root: B256,
    /// First account hash of the range.
    pub origin: B256,
    /// Last account hash of the range.
    pub limit: B256,
    /// Soft limit on the response size.
    pub bytes: u64,
}

/// A single account in slim state format.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct AccountData {
    pub hash: B256,
    pub body: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct AccountRange {
    pub request_id: u64,
    pub accounts: Vec<AccountData>,
    pub proof: Vec<Bytes>,
}

#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct GetStorageRanges {
    pub request_id: u64,
    pub root: B256,
    pub accounts: Vec<B256>,
    pub origin: Bytes,
    pub limit: Bytes,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct StorageData {
    pub hash: B256,
    pub body: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct StorageRanges {
    pub request_id: u64,
    /// Storage slots per requested account.
    pub slots: Vec<Vec<StorageData>>,
    pub proof: Vec<Bytes>,
}

#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct GetByteCodes {
    pub request_id: u64,
    pub hashes: Vec<B256>,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct ByteCodes {
    pub request_id: u64,
    pub codes: Vec<Bytes>,
}

#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct GetTrieNodes {
    pub request_id: u64,
    pub root: B256,
    /// Trie node paths, grouped by account.
    pub paths: Vec<Vec<Bytes>>,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct TrieNodes {
    pub request_id: u64,
    pub nodes: Vec<Bytes>,
}
