//! Chain-sync (`eth`) protocol messages.
//!
//! Request and response packets use the eth/66 envelope: a two item list of
//! the request id and the packet payload. Headers, transactions and blocks are
//! relayed as opaque [`RawRlp`] items.

use super::raw::RawRlp;
use alloy_primitives::{Bytes, FixedBytes, B256, U256};
use alloy_rlp::{
    BufMut, Decodable, Encodable, Header, RlpDecodable, RlpDecodableWrapper, RlpEncodable,
    RlpEncodableWrapper, EMPTY_STRING_CODE,
};
use std::fmt;

/// Fork identifier as defined by EIP-2124.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, RlpEncodable, RlpDecodable)]
pub struct ForkId {
    /// CRC32 checksum of the genesis hash and passed fork block numbers.
    pub hash: FixedBytes<4>,
    /// Block number or timestamp of the next upcoming fork, zero if unknown.
    pub next: u64,
}

/// Chain status exchanged right after the hello handshake.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct Status {
    pub protocol_version: u64,
    pub network_id: u64,
    pub total_difficulty: U256,
    pub head: B256,
    pub genesis: B256,
    pub fork_id: ForkId,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "eth/{} network={} head={} genesis={}",
            self.protocol_version, self.network_id, self.head, self.genesis
        )
    }
}

/// A block announcement entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct BlockHashNumber {
    pub hash: B256,
    pub number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, RlpEncodableWrapper, RlpDecodableWrapper)]
pub struct NewBlockHashes(pub Vec<BlockHashNumber>);

#[derive(Debug, Clone, PartialEq, Eq, RlpEncodableWrapper, RlpDecodableWrapper)]
pub struct Transactions(pub Vec<RawRlp>);

/// Starting block of a header request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashOrNumber {
    Hash(B256),
    Number(u64),
}

impl From<B256> for HashOrNumber {
    fn from(hash: B256) -> Self {
        HashOrNumber::Hash(hash)
    }
}

impl From<u64> for HashOrNumber {
    fn from(number: u64) -> Self {
        HashOrNumber::Number(number)
    }
}

impl Encodable for HashOrNumber {
    fn encode(&self, out: &mut dyn BufMut) {
        match self {
            HashOrNumber::Hash(hash) => hash.encode(out),
            HashOrNumber::Number(number) => number.encode(out),
        }
    }

    fn length(&self) -> usize {
        match self {
            HashOrNumber::Hash(hash) => hash.length(),
            HashOrNumber::Number(number) => number.length(),
        }
    }
}

impl Decodable for HashOrNumber {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        // A 32 byte string is a hash, anything else must be a number.
        match buf.first() {
            Some(&prefix) if prefix == EMPTY_STRING_CODE + 32 => {
                B256::decode(buf).map(HashOrNumber::Hash)
            }
            Some(_) => u64::decode(buf).map(HashOrNumber::Number),
            None => Err(alloy_rlp::Error::InputTooShort),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct GetBlockHeadersRequest {
    pub origin: HashOrNumber,
    pub amount: u64,
    pub skip: u64,
    pub reverse: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct GetBlockHeaders {
    pub request_id: u64,
    pub request: GetBlockHeadersRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct BlockHeaders {
    pub request_id: u64,
    pub headers: Vec<RawRlp>,
}

#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct GetBlockBodies {
    pub request_id: u64,
    pub hashes: Vec<B256>,
}

/// Body of a block: its transactions, uncle headers and, after Shanghai,
/// withdrawals.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockBody {
    pub transactions: Vec<RawRlp>,
    pub uncles: Vec<RawRlp>,
    pub withdrawals: Option<Vec<RawRlp>>,
}

impl BlockBody {
    fn payload_length(&self) -> usize {
        self.transactions.length()
            + self.uncles.length()
            + self.withdrawals.as_ref().map_or(0, |w| w.length())
    }
}

impl Encodable for BlockBody {
    fn encode(&self, out: &mut dyn BufMut) {
        Header {
            list: true,
            payload_length: self.payload_length(),
        }
        .encode(out);
        self.transactions.encode(out);
        self.uncles.encode(out);
        if let Some(withdrawals) = &self.withdrawals {
            withdrawals.encode(out);
        }
    }

    fn length(&self) -> usize {
        let payload_length = self.payload_length();
        payload_length + alloy_rlp::length_of_length(payload_length)
    }
}

impl Decodable for BlockBody {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let header = Header::decode(buf)?;
        if !header.list {
            return Err(alloy_rlp::Error::UnexpectedString);
        }
        if buf.len() < header.payload_length {
            return Err(alloy_rlp::Error::InputTooShort);
        }

        let mut payload = &buf[..header.payload_length];
        let transactions = Decodable::decode(&mut payload)?;
        let uncles = Decodable::decode(&mut payload)?;
        let withdrawals = if payload.is_empty() {
            None
        } else {
            Some(Decodable::decode(&mut payload)?)
        };
        if !payload.is_empty() {
            return Err(alloy_rlp::Error::ListLengthMismatch {
                expected: header.payload_length,
                got: header.payload_length - payload.len(),
            });
        }

        *buf = &buf[header.payload_length..];
        Ok(BlockBody {
            transactions,
            uncles,
            withdrawals,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct BlockBodies {
    pub request_id: u64,
    pub bodies: Vec<BlockBody>,
}

/// Full block propagation.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct NewBlock {
    pub block: RawRlp,
    pub total_difficulty: U256,
}

/// Pooled transaction announcement as sent by eth/66 and eth/67 peers.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodableWrapper, RlpDecodableWrapper)]
pub struct NewPooledTransactionHashes66(pub Vec<B256>);

/// Pooled transaction announcement carrying transaction types and sizes,
/// as sent by eth/68 peers.
#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct NewPooledTransactionHashes {
    pub types: Bytes,
    pub sizes: Vec<u32>,
    pub hashes: Vec<B256>,
}

impl NewPooledTransactionHashes {
    /// Whether every announced hash has a matching type and size.
    pub fn is_consistent(&self) -> bool {
        self.types.len() == self.hashes.len() && self.sizes.len() == self.hashes.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct GetPooledTransactions {
    pub request_id: u64,
    pub hashes: Vec<B256>,
}

#[derive(Debug, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct PooledTransactions {
    pub request_id: u64,
    pub transactions: Vec<RawRlp>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_or_number() {
        let hash = HashOrNumber::Hash(B256::repeat_byte(0x11));
        let encoded = alloy_rlp::encode(hash);
        assert_eq!(encoded[0], 0xa0);
        assert_eq!(HashOrNumber::decode(&mut &encoded[..]).unwrap(), hash);

        let number = HashOrNumber::Number(1_000_000);
        let encoded = alloy_rlp::encode(number);
        assert_eq!(HashOrNumber::decode(&mut &encoded[..]).unwrap(), number);

        let zero = alloy_rlp::encode(HashOrNumber::Number(0));
        assert_eq!(zero, vec![0x80]);
        assert_eq!(
            HashOrNumber::decode(&mut &zero[..]).unwrap(),
            HashOrNumber::Number(0)
        );
    }

    #[test]
    fn test_get_block_headers_envelope() {
        let request = GetBlockHeaders {
            request_id: 7,
            request: GetBlockHeadersRequest {
                origin: HashOrNumber::Number(100),
                amount: 2,
                skip: 0,
                reverse: false,
            },
        };
        let encoded = alloy_rlp::encode(request);
        // [7, [100, 2, 0, 0]]
        assert_eq!(encoded, vec![0xc6, 0x07, 0xc4, 0x64, 0x02, 0x80, 0x80]);
        assert_eq!(GetBlockHeaders::decode(&mut &encoded[..]).unwrap(), request);
    }

    #[test]
    fn test_block_body_with_and_without_withdrawals() {
        let legacy = BlockBody {
            transactions: vec![RawRlp::from_value(&vec![1u64, 2])],
            uncles: vec![],
            withdrawals: None,
        };
        let encoded = alloy_rlp::encode(&legacy);
        assert_eq!(encoded.len(), legacy.length());
        assert_eq!(BlockBody::decode(&mut &encoded[..]).unwrap(), legacy);

        let shanghai = BlockBody {
            withdrawals: Some(vec![RawRlp::from_value(&vec![3u64])]),
            ..legacy
        };
        let encoded = alloy_rlp::encode(&shanghai);
        assert_eq!(BlockBody::decode(&mut &encoded[..]).unwrap(), shanghai);
    }

    #[test]
    fn test_status_round_trip() {
        let status = Status {
            protocol_version: 68,
            network_id: 1,
            total_difficulty: U256::from(17_179_869_184u64),
            head: B256::repeat_byte(0x01),
            genesis: B256::repeat_byte(0x02),
            fork_id: ForkId {
                hash: FixedBytes::new([0xfc, 0x64, 0xec, 0x04]),
                next: 1_150_000,
            },
        };
        let encoded = alloy_rlp::encode(&status);
        assert_eq!(Status::decode(&mut &encoded[..]).unwrap(), status);
    }

    #[test]
    fn test_pooled_hashes_consistency() {
        let announcement = NewPooledTransactionHashes {
            types: Bytes::from(vec![0x02, 0x00]),
            sizes: vec![120, 98],
            hashes: vec![B256::repeat_byte(1), B256::repeat_byte(2)],
        };
        assert!(announcement.is_consistent());

        let truncated = NewPooledTransactionHashes {
            sizes: vec![120],
            ..announcement
        };
        assert!(!truncated.is_consistent());
    }
}
