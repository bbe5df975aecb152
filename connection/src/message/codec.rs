//! Conversion between typed messages and wire frames.
//!
//! Decoding is driven by a per-code list of candidate decoders which are tried
//! in order until one accepts the payload. Two codes carry more than one
//! shape: disconnect (a reason list, or a bare reason from older clients) and
//! the pooled transaction announcement (typed eth/68 form, or the eth/66 hash
//! list).

use super::*;
use crate::transport::Frame;
use alloy_rlp::Decodable;

/// Decodes a payload into one specific message shape.
pub type Decoder = fn(&[u8]) -> alloy_rlp::Result<Message>;

/// Decode `payload` as `T`, rejecting any bytes left over.
fn decode_as<T>(payload: &[u8]) -> alloy_rlp::Result<Message>
where
    T: Decodable + Into<Message>,
{
    let mut buf = payload;
    let value = T::decode(&mut buf)?;
    if !buf.is_empty() {
        return Err(alloy_rlp::Error::Custom("trailing bytes after message"));
    }
    Ok(value.into())
}

/// Candidate decoders for a code in the order they are tried.
///
/// Returns an empty slice for unknown codes.
pub fn decoders(code: u64) -> &'static [Decoder] {
    match code {
        code::HELLO => &[decode_as::<Hello>],
        code::DISCONNECT => &[decode_as::<Disconnects>, decode_as::<Disconnect>],
        code::PING => &[decode_as::<Ping>],
        code::PONG => &[decode_as::<Pong>],
        code::STATUS => &[decode_as::<Status>],
        code::NEW_BLOCK_HASHES => &[decode_as::<NewBlockHashes>],
        code::TRANSACTIONS => &[decode_as::<Transactions>],
        code::GET_BLOCK_HEADERS => &[decode_as::<GetBlockHeaders>],
        code::BLOCK_HEADERS => &[decode_as::<BlockHeaders>],
        code::GET_BLOCK_BODIES => &[decode_as::<GetBlockBodies>],
        code::BLOCK_BODIES => &[decode_as::<BlockBodies>],
        code::NEW_BLOCK => &[decode_as::<NewBlock>],
        code::NEW_POOLED_TRANSACTION_HASHES => &[
            decode_as::<NewPooledTransactionHashes>,
            decode_as::<NewPooledTransactionHashes66>,
        ],
        code::GET_POOLED_TRANSACTIONS => &[decode_as::<GetPooledTransactions>],
        code::POOLED_TRANSACTIONS => &[decode_as::<PooledTransactions>],
        code::GET_ACCOUNT_RANGE => &[decode_as::<GetAccountRange>],
        code::ACCOUNT_RANGE => &[decode_as::<AccountRange>],
        code::GET_STORAGE_RANGES => &[decode_as::<GetStorageRanges>],
        code::STORAGE_RANGES => &[decode_as::<StorageRanges>],
        code::GET_BYTE_CODES => &[decode_as::<GetByteCodes>],
        code::BYTE_CODES => &[decode_as::<ByteCodes>],
        code::GET_TRIE_NODES => &[decode_as::<GetTrieNodes>],
        code::TRIE_NODES => &[decode_as::<TrieNodes>],
        _ => &[],
    }
}

/// Whether a code belongs to the state-sync family.
pub fn is_state_sync(code: u64) -> bool {
    (code::GET_ACCOUNT_RANGE..=code::TRIE_NODES).contains(&code)
}

/// Decode a frame payload received with `code`.
///
/// Never fails: unknown codes and payloads no candidate accepts are returned
/// as [`Message::Error`], carrying the error of the last candidate tried.
pub fn decode(code: u64, payload: &[u8]) -> Message {
    let candidates = decoders(code);
    if candidates.is_empty() {
        return Message::Error(MessageError::UnknownCode(code));
    }

    let mut error = alloy_rlp::Error::Custom("no decoder");
    for decoder in candidates {
        match decoder(payload) {
            Ok(message) => return message,
            Err(e) => error = e,
        }
    }
    Message::Error(MessageError::Decode { code, error })
}

/// Encode a message into a frame tagged with its own code.
///
/// Returns `None` for [`Message::Error`], which has no wire form.
pub fn encode(message: &Message) -> Option<Frame> {
    let payload = match message {
        Message::Hello(m) => alloy_rlp::encode(m),
        Message::Disconnect(m) => alloy_rlp::encode(m),
        Message::Disconnects(m) => alloy_rlp::encode(m),
        Message::Ping(m) => alloy_rlp::encode(m),
        Message::Pong(m) => alloy_rlp::encode(m),
        Message::Status(m) => alloy_rlp::encode(m),
        Message::NewBlockHashes(m) => alloy_rlp::encode(m),
        Message::Transactions(m) => alloy_rlp::encode(m),
        Message::GetBlockHeaders(m) => alloy_rlp::encode(m),
        Message::BlockHeaders(m) => alloy_rlp::encode(m),
        Message::GetBlockBodies(m) => alloy_rlp::encode(m),
        Message::BlockBodies(m) => alloy_rlp::encode(m),
        Message::NewBlock(m) => alloy_rlp::encode(m),
        Message::NewPooledTransactionHashes66(m) => alloy_rlp::encode(m),
        Message::NewPooledTransactionHashes(m) => alloy_rlp::encode(m),
        Message::GetPooledTransactions(m) => alloy_rlp::encode(m),
        Message::PooledTransactions(m) => alloy_rlp::encode(m),
        Message::GetAccountRange(m) => alloy_rlp::encode(m),
        Message::AccountRange(m) => alloy_rlp::encode(m),
        Message::GetStorageRanges(m) => alloy_rlp::encode(m),
        Message::StorageRanges(m) => alloy_rlp::encode(m),
        Message::GetByteCodes(m) => alloy_rlp::encode(m),
        Message::ByteCodes(m) => alloy_rlp::encode(m),
        Message::GetTrieNodes(m) => alloy_rlp::encode(m),
        Message::TrieNodes(m) => alloy_rlp::encode(m),
        Message::Error(_) => return None,
    };
    Some(Frame::new(message.code(), payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::PeerId;
    use alloy_primitives::{Bytes, FixedBytes, B256, U256};

    fn round_trip(message: Message) {
        let frame = encode(&message).unwrap();
        assert_eq!(frame.code, message.code());
        assert_eq!(decode(frame.code, &frame.payload), message);
    }

    #[test]
    fn test_control_round_trips() {
        round_trip(Message::Hello(Hello {
            version: P2P_VERSION,
            name: "devp2p-peers/v0.1.0".to_string(),
            capabilities: vec![Capability::new("eth", 68)],
            listen_port: 0,
            id: PeerId::repeat_byte(0x42),
        }));
        round_trip(Message::Disconnects(Disconnects(vec![
            DisconnectReason::TooManyPeers,
        ])));
        round_trip(Message::Disconnect(Disconnect {
            reason: DisconnectReason::ClientQuitting,
        }));
        round_trip(Message::Ping(Ping));
        round_trip(Message::Pong(Pong));
    }

    #[test]
    fn test_chain_sync_round_trips() {
        round_trip(Message::Status(Status {
            protocol_version: 68,
            network_id: 1,
            total_difficulty: U256::from(1u64 << 40),
            head: B256::repeat_byte(3),
            genesis: B256::repeat_byte(4),
            fork_id: ForkId {
                hash: FixedBytes::new([1, 2, 3, 4]),
                next: 0,
            },
        }));
        round_trip(Message::GetBlockHeaders(GetBlockHeaders {
            request_id: 9,
            request: GetBlockHeadersRequest {
                origin: HashOrNumber::Hash(B256::repeat_byte(5)),
                amount: 1,
                skip: 0,
                reverse: true,
            },
        }));
        round_trip(Message::BlockBodies(BlockBodies {
            request_id: 10,
            bodies: vec![BlockBody::default()],
        }));
        round_trip(Message::NewPooledTransactionHashes(
            NewPooledTransactionHashes {
                types: Bytes::from(vec![2]),
                sizes: vec![100],
                hashes: vec![B256::repeat_byte(6)],
            },
        ));
    }

    #[test]
    fn test_state_sync_round_trips() {
        round_trip(Message::GetAccountRange(GetAccountRange {
            request_id: 1,
            root: B256::repeat_byte(1),
            origin: B256::ZERO,
            limit: B256::repeat_byte(0xff),
            bytes: 512 * 1024,
        }));
        round_trip(Message::StorageRanges(StorageRanges {
            request_id: 2,
            slots: vec![vec![StorageData {
                hash: B256::repeat_byte(7),
                body: Bytes::from(vec![0x01]),
            }]],
            proof: vec![],
        }));
        round_trip(Message::GetTrieNodes(GetTrieNodes {
            request_id: 3,
            root: B256::repeat_byte(8),
            paths: vec![vec![Bytes::from(vec![0x12])]],
            bytes: 1024,
        }));
    }

    #[test]
    fn test_announcement_round_trips() {
        round_trip(Message::NewBlockHashes(NewBlockHashes(vec![
            BlockHashNumber {
                hash: B256::repeat_byte(0x11),
                number: 19_000_000,
            },
            BlockHashNumber {
                hash: B256::repeat_byte(0x12),
                number: 19_000_001,
            },
        ])));
        round_trip(Message::NewBlockHashes(NewBlockHashes(vec![])));
        round_trip(Message::Transactions(Transactions(vec![
            RawRlp::new(vec![0xc3, 0x01, 0x02, 0x03]),
            // Typed transactions travel as strings.
            RawRlp::from_value(&Bytes::from(vec![0x02, 0xaa, 0xbb])),
        ])));
        round_trip(Message::Transactions(Transactions(vec![])));
        round_trip(Message::NewBlock(NewBlock {
            block: RawRlp::new(vec![0xc3, 0xc0, 0xc0, 0xc0]),
            total_difficulty: U256::from(58_750_003_716_598_352_816_469u128),
        }));
        round_trip(Message::NewPooledTransactionHashes66(
            NewPooledTransactionHashes66(vec![B256::repeat_byte(0x21), B256::repeat_byte(0x22)]),
        ));
        round_trip(Message::NewPooledTransactionHashes66(
            NewPooledTransactionHashes66(vec![]),
        ));
    }

    #[test]
    fn test_block_request_round_trips() {
        round_trip(Message::GetBlockHeaders(GetBlockHeaders {
            request_id: 11,
            request: GetBlockHeadersRequest {
                origin: HashOrNumber::Number(17_034_870),
                amount: 192,
                skip: 1,
                reverse: false,
            },
        }));
        round_trip(Message::BlockHeaders(BlockHeaders {
            request_id: 11,
            headers: vec![RawRlp::new(vec![0xc2, 0x80, 0x80])],
        }));
        round_trip(Message::BlockHeaders(BlockHeaders {
            request_id: 12,
            headers: vec![],
        }));
        round_trip(Message::GetBlockBodies(GetBlockBodies {
            request_id: 13,
            hashes: vec![B256::repeat_byte(0x31), B256::repeat_byte(0x32)],
        }));
        round_trip(Message::BlockBodies(BlockBodies {
            request_id: 13,
            bodies: vec![
                BlockBody {
                    transactions: vec![RawRlp::new(vec![0xc1, 0x01])],
                    uncles: vec![],
                    withdrawals: None,
                },
                BlockBody {
                    transactions: vec![],
                    uncles: vec![],
                    withdrawals: Some(vec![]),
                },
                BlockBody {
                    transactions: vec![],
                    uncles: vec![RawRlp::new(vec![0xc0])],
                    withdrawals: Some(vec![RawRlp::new(vec![0xc2, 0x01, 0x02])]),
                },
            ],
        }));
        round_trip(Message::GetPooledTransactions(GetPooledTransactions {
            request_id: 14,
            hashes: vec![B256::repeat_byte(0x41)],
        }));
        round_trip(Message::PooledTransactions(PooledTransactions {
            request_id: 14,
            transactions: vec![RawRlp::from_value(&Bytes::from(vec![0x01, 0xcc]))],
        }));
        round_trip(Message::PooledTransactions(PooledTransactions {
            request_id: 15,
            transactions: vec![],
        }));
    }

    #[test]
    fn test_state_sync_response_round_trips() {
        round_trip(Message::AccountRange(AccountRange {
            request_id: 4,
            accounts: vec![AccountData {
                hash: B256::repeat_byte(0x51),
                body: Bytes::from(vec![0xc4, 0x01, 0x80, 0x80, 0x80]),
            }],
            proof: vec![Bytes::from(vec![0xde, 0xad])],
        }));
        round_trip(Message::AccountRange(AccountRange {
            request_id: 5,
            accounts: vec![],
            proof: vec![],
        }));
        round_trip(Message::GetStorageRanges(GetStorageRanges {
            request_id: 6,
            root: B256::repeat_byte(0x52),
            accounts: vec![B256::repeat_byte(0x53), B256::repeat_byte(0x54)],
            origin: Bytes::new(),
            limit: Bytes::from(vec![0xff; 32]),
            bytes: 512 * 1024,
        }));
        round_trip(Message::StorageRanges(StorageRanges {
            request_id: 7,
            slots: vec![],
            proof: vec![],
        }));
        round_trip(Message::GetByteCodes(GetByteCodes {
            request_id: 8,
            hashes: vec![B256::repeat_byte(0x55)],
            bytes: 1024,
        }));
        round_trip(Message::ByteCodes(ByteCodes {
            request_id: 8,
            codes: vec![Bytes::from(vec![0x60, 0x80, 0x60, 0x40]), Bytes::new()],
        }));
        round_trip(Message::TrieNodes(TrieNodes {
            request_id: 9,
            nodes: vec![Bytes::from(vec![0xc2, 0x80, 0x80])],
        }));
        round_trip(Message::TrieNodes(TrieNodes {
            request_id: 10,
            nodes: vec![],
        }));
    }

    #[test]
    fn test_disconnect_fallback() {
        // Reason list decodes as the list form.
        assert_eq!(
            decode(code::DISCONNECT, &[0xc1, 0x04]),
            Message::Disconnects(Disconnects(vec![DisconnectReason::TooManyPeers]))
        );
        // A bare reason falls back to the single form.
        assert_eq!(
            decode(code::DISCONNECT, &[0x04]),
            Message::Disconnect(Disconnect {
                reason: DisconnectReason::TooManyPeers
            })
        );
    }

    #[test]
    fn test_pooled_hashes_fallback() {
        let hashes = vec![B256::repeat_byte(1), B256::repeat_byte(2), B256::repeat_byte(3)];

        let legacy = alloy_rlp::encode(NewPooledTransactionHashes66(hashes.clone()));
        assert_eq!(
            decode(code::NEW_POOLED_TRANSACTION_HASHES, &legacy),
            Message::NewPooledTransactionHashes66(NewPooledTransactionHashes66(hashes.clone()))
        );

        let typed = NewPooledTransactionHashes {
            types: Bytes::from(vec![0, 2, 2]),
            sizes: vec![10, 20, 30],
            hashes,
        };
        let encoded = alloy_rlp::encode(&typed);
        assert_eq!(
            decode(code::NEW_POOLED_TRANSACTION_HASHES, &encoded),
            Message::NewPooledTransactionHashes(typed)
        );
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(
            decode(0x0f, &[0xc0]),
            Message::Error(MessageError::UnknownCode(0x0f))
        );
        assert_eq!(
            decode(41, &[0xc0]),
            Message::Error(MessageError::UnknownCode(41))
        );
    }

    #[test]
    fn test_malformed_payload() {
        let message = decode(code::STATUS, &[0xc2, 0x01]);
        assert!(matches!(
            message,
            Message::Error(MessageError::Decode {
                code: code::STATUS,
                ..
            })
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let message = decode(code::PING, &[0xc0, 0x00]);
        assert!(message.is_error());
    }

    #[test]
    fn test_error_has_no_wire_form() {
        assert!(encode(&Message::Error(MessageError::UnknownCode(1))).is_none());
    }

    #[test]
    fn test_state_sync_codes() {
        assert!(!is_state_sync(code::POOLED_TRANSACTIONS));
        assert!(is_state_sync(code::GET_ACCOUNT_RANGE));
        assert!(is_state_sync(code::TRIE_NODES));
        assert!(!is_state_sync(41));
    }
}
