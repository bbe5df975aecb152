//! Typed devp2p messages and their wire codes.
//!
//! Three message families share one code space on a session: the base
//! protocol control messages, the chain-sync (`eth`) family offset at 16 and
//! the state-sync (`snap`) family offset at 33. [`Message`] is the union of
//! all of them, and [`codec`] maps between messages and [`Frame`](crate::Frame)s.

pub mod codec;
pub mod control;
pub mod eth;
mod raw;
pub mod snap;

pub use control::{
    Capability, Disconnect, DisconnectReason, Disconnects, Hello, Ping, Pong, P2P_VERSION,
};
pub use eth::{
    BlockBodies, BlockBody, BlockHashNumber, BlockHeaders, ForkId, GetBlockBodies,
    GetBlockHeaders, GetBlockHeadersRequest, GetPooledTransactions, HashOrNumber, NewBlock,
    NewBlockHashes, NewPooledTransactionHashes, NewPooledTransactionHashes66,
    PooledTransactions, Status, Transactions,
};
pub use raw::RawRlp;
pub use snap::{
    AccountData, AccountRange, ByteCodes, GetAccountRange, GetByteCodes, GetStorageRanges,
    GetTrieNodes, StorageData, StorageRanges, TrieNodes,
};

use std::fmt;

/// Wire codes of every known message.
pub mod code {
    pub const HELLO: u64 = 0x00;
    pub const DISCONNECT: u64 = 0x01;
    pub const PING: u64 = 0x02;
    pub const PONG: u64 = 0x03;

    /// First code of the chain-sync family.
    pub const ETH_OFFSET: u64 = 16;
    pub const STATUS: u64 = 16;
    pub const NEW_BLOCK_HASHES: u64 = 17;
    pub const TRANSACTIONS: u64 = 18;
    pub const GET_BLOCK_HEADERS: u64 = 19;
    pub const BLOCK_HEADERS: u64 = 20;
    pub const GET_BLOCK_BODIES: u64 = 21;
    pub const BLOCK_BODIES: u64 = 22;
    pub const NEW_BLOCK: u64 = 23;
    pub const NEW_POOLED_TRANSACTION_HASHES: u64 = 24;
    pub const GET_POOLED_TRANSACTIONS: u64 = 25;
    pub const POOLED_TRANSACTIONS: u64 = 26;

    /// First code of the state-sync family.
    pub const SNAP_OFFSET: u64 = 33;
    pub const GET_ACCOUNT_RANGE: u64 = 33;
    pub const ACCOUNT_RANGE: u64 = 34;
    pub const GET_STORAGE_RANGES: u64 = 35;
    pub const STORAGE_RANGES: u64 = 36;
    pub const GET_BYTE_CODES: u64 = 37;
    pub const BYTE_CODES: u64 = 38;
    pub const GET_TRIE_NODES: u64 = 39;
    pub const TRIE_NODES: u64 = 40;
}

/// Code reported by [`Message::Error`], outside the range of any real message.
pub const ERROR_CODE: u64 = u64::MAX;

/// Why a frame could not be turned into a typed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    /// The transport failed to deliver a frame.
    Read(String),
    /// No decoder accepted the payload for a known code.
    Decode { code: u64, error: alloy_rlp::Error },
    /// The code does not belong to any supported message.
    UnknownCode(u64),
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageError::Read(e) => write!(f, "Failed to read frame: {e}"),
            MessageError::Decode { code, error } => {
                write!(f, "Failed to decode message with code {code}: {error}")
            }
            MessageError::UnknownCode(code) => write!(f, "Unknown message code {code}"),
        }
    }
}

impl std::error::Error for MessageError {}

/// Any message which can be sent or received on a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Hello(Hello),
    Disconnect(Disconnect),
    Disconnects(Disconnects),
    Ping(Ping),
    Pong(Pong),

    Status(Status),
    NewBlockHashes(NewBlockHashes),
    Transactions(Transactions),
    GetBlockHeaders(GetBlockHeaders),
    BlockHeaders(BlockHeaders),
    GetBlockBodies(GetBlockBodies),
    BlockBodies(BlockBodies),
    NewBlock(NewBlock),
    NewPooledTransactionHashes66(NewPooledTransactionHashes66),
    NewPooledTransactionHashes(NewPooledTransactionHashes),
    GetPooledTransactions(GetPooledTransactions),
    PooledTransactions(PooledTransactions),

    GetAccountRange(GetAccountRange),
    AccountRange(AccountRange),
    GetStorageRanges(GetStorageRanges),
    StorageRanges(StorageRanges),
    GetByteCodes(GetByteCodes),
    ByteCodes(ByteCodes),
    GetTrieNodes(GetTrieNodes),
    TrieNodes(TrieNodes),

    /// A frame which could not be read or decoded.
    Error(MessageError),
}

impl Message {
    /// The wire code of this message, [`ERROR_CODE`] for errors.
    pub fn code(&self) -> u64 {
        match self {
            Message::Hello(_) => code::HELLO,
            Message::Disconnect(_) | Message::Disconnects(_) => code::DISCONNECT,
            Message::Ping(_) => code::PING,
            Message::Pong(_) => code::PONG,
            Message::Status(_) => code::STATUS,
            Message::NewBlockHashes(_) => code::NEW_BLOCK_HASHES,
            Message::Transactions(_) => code::TRANSACTIONS,
            Message::GetBlockHeaders(_) => code::GET_BLOCK_HEADERS,
            Message::BlockHeaders(_) => code::BLOCK_HEADERS,
            Message::GetBlockBodies(_) => code::GET_BLOCK_BODIES,
            Message::BlockBodies(_) => code::BLOCK_BODIES,
            Message::NewBlock(_) => code::NEW_BLOCK,
            Message::NewPooledTransactionHashes66(_) | Message::NewPooledTransactionHashes(_) => {
                code::NEW_POOLED_TRANSACTION_HASHES
            }
            Message::GetPooledTransactions(_) => code::GET_POOLED_TRANSACTIONS,
            Message::PooledTransactions(_) => code::POOLED_TRANSACTIONS,
            Message::GetAccountRange(_) => code::GET_ACCOUNT_RANGE,
            Message::AccountRange(_) => code::ACCOUNT_RANGE,
            Message::GetStorageRanges(_) => code::GET_STORAGE_RANGES,
            Message::StorageRanges(_) => code::STORAGE_RANGES,
            Message::GetByteCodes(_) => code::GET_BYTE_CODES,
            Message::ByteCodes(_) => code::BYTE_CODES,
            Message::GetTrieNodes(_) => code::GET_TRIE_NODES,
            Message::TrieNodes(_) => code::TRIE_NODES,
            Message::Error(_) => ERROR_CODE,
        }
    }

    /// The request id correlating this message with a request, zero for
    /// messages which are not part of a request/response pair.
    pub fn request_id(&self) -> u64 {
        match self {
            Message::GetBlockHeaders(m) => m.request_id,
            Message::BlockHeaders(m) => m.request_id,
            Message::GetBlockBodies(m) => m.request_id,
            Message::BlockBodies(m) => m.request_id,
            Message::GetPooledTransactions(m) => m.request_id,
            Message::PooledTransactions(m) => m.request_id,
            Message::GetAccountRange(m) => m.request_id,
            Message::AccountRange(m) => m.request_id,
            Message::GetStorageRanges(m) => m.request_id,
            Message::StorageRanges(m) => m.request_id,
            Message::GetByteCodes(m) => m.request_id,
            Message::ByteCodes(m) => m.request_id,
            Message::GetTrieNodes(m) => m.request_id,
            Message::TrieNodes(m) => m.request_id,
            _ => 0,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Message::Error(_))
    }

    /// Whether this message belongs to the state-sync family.
    pub fn is_state_sync(&self) -> bool {
        codec::is_state_sync(self.code())
    }

    /// Short name of the message kind for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Hello(_) => "hello",
            Message::Disconnect(_) | Message::Disconnects(_) => "disconnect",
            Message::Ping(_) => "ping",
            Message::Pong(_) => "pong",
            Message::Status(_) => "status",
            Message::NewBlockHashes(_) => "new_block_hashes",
            Message::Transactions(_) => "transactions",
            Message::GetBlockHeaders(_) => "get_block_headers",
            Message::BlockHeaders(_) => "block_headers",
            Message::GetBlockBodies(_) => "get_block_bodies",
            Message::BlockBodies(_) => "block_bodies",
            Message::NewBlock(_) => "new_block",
            Message::NewPooledTransactionHashes66(_) | Message::NewPooledTransactionHashes(_) => {
                "new_pooled_transaction_hashes"
            }
            Message::GetPooledTransactions(_) => "get_pooled_transactions",
            Message::PooledTransactions(_) => "pooled_transactions",
            Message::GetAccountRange(_) => "get_account_range",
            Message::AccountRange(_) => "account_range",
            Message::GetStorageRanges(_) => "get_storage_ranges",
            Message::StorageRanges(_) => "storage_ranges",
            Message::GetByteCodes(_) => "get_byte_codes",
            Message::ByteCodes(_) => "byte_codes",
            Message::GetTrieNodes(_) => "get_trie_nodes",
            Message::TrieNodes(_) => "trie_nodes",
            Message::Error(_) => "error",
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Error(e) => write!(f, "error: {e}"),
            m if m.request_id() != 0 => write!(f, "{} (request {})", m.kind(), m.request_id()),
            m => f.write_str(m.kind()),
        }
    }
}

macro_rules! impl_from_message {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Message {
                fn from(message: $variant) -> Self {
                    Message::$variant(message)
                }
            }
        )*
    };
}

impl_from_message!(
    Hello,
    Disconnect,
    Disconnects,
    Ping,
    Pong,
    Status,
    NewBlockHashes,
    Transactions,
    GetBlockHeaders,
    BlockHeaders,
    GetBlockBodies,
    BlockBodies,
    NewBlock,
    NewPooledTransactionHashes66,
    NewPooledTransactionHashes,
    GetPooledTransactions,
    PooledTransactions,
    GetAccountRange,
    AccountRange,
    GetStorageRanges,
    StorageRanges,
    GetByteCodes,
    ByteCodes,
    GetTrieNodes,
    TrieNodes,
);

impl From<MessageError> for Message {
    fn from(error: MessageError) -> Self {
        Message::Error(error)
    }
}
