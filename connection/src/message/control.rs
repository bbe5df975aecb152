//! Base protocol (control) messages exchanged on every devp2p session.

use crate::node::PeerId;
use alloy_rlp::{BufMut, Decodable, Encodable, Header, RlpDecodable, RlpEncodable};
use std::fmt;

/// Version of the base protocol advertised in hello messages.
pub const P2P_VERSION: u64 = 5;

/// A sub-protocol name and version, e.g. `eth/68`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, RlpEncodable, RlpDecodable)]
pub struct Capability {
    pub name: String,
    pub version: u64,
}

impl Capability {
    pub fn new(name: impl Into<String>, version: u64) -> Self {
        Capability {
            name: name.into(),
            version,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)
    }
}

/// The protocol handshake.
///
/// Fields appended by newer protocol versions are ignored when decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hello {
    /// Base protocol version.
    pub version: u64,
    /// Client identifier, e.g. `Geth/v1.13.5-stable`.
    pub name: String,
    /// Supported sub-protocols.
    pub capabilities: Vec<Capability>,
    /// Advertised listening port, zero when not listening.
    pub listen_port: u64,
    /// The sender's public key.
    pub id: PeerId,
}

impl Hello {
    fn payload_length(&self) -> usize {
        self.version.length()
            + self.name.length()
            + self.capabilities.length()
            + self.listen_port.length()
            + self.id.length()
    }
}

impl Encodable for Hello {
    fn encode(&self, out: &mut dyn BufMut) {
        Header {
            list: true,
            payload_length: self.payload_length(),
        }
        .encode(out);
        self.version.encode(out);
        self.name.encode(out);
        self.capabilities.encode(out);
        self.listen_port.encode(out);
        self.id.encode(out);
    }

    fn length(&self) -> usize {
        let payload_length = self.payload_length();
        payload_length + alloy_rlp::length_of_length(payload_length)
    }
}

impl Decodable for Hello {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let header = Header::decode(buf)?;
        if !header.list {
            return Err(alloy_rlp::Error::UnexpectedString);
        }
        if buf.len() < header.payload_length {
            return Err(alloy_rlp::Error::InputTooShort);
        }

        let mut payload = &buf[..header.payload_length];
        let hello = Hello {
            version: Decodable::decode(&mut payload)?,
            name: Decodable::decode(&mut payload)?,
            capabilities: Decodable::decode(&mut payload)?,
            listen_port: Decodable::decode(&mut payload)?,
            id: Decodable::decode(&mut payload)?,
        };

        *buf = &buf[header.payload_length..];
        Ok(hello)
    }
}

/// Reason given by a peer for terminating the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisconnectReason {
    Requested,
    TcpError,
    ProtocolBreach,
    UselessPeer,
    TooManyPeers,
    AlreadyConnected,
    IncompatibleVersion,
    InvalidIdentity,
    ClientQuitting,
    UnexpectedIdentity,
    ConnectedToSelf,
    ReadTimeout,
    SubprotocolError,
    /// A reason code outside the defined set.
    Other(u8),
}

impl From<u8> for DisconnectReason {
    fn from(code: u8) -> Self {
        match code {
            0x00 => DisconnectReason::Requested,
            0x01 => DisconnectReason::TcpError,
            0x02 => DisconnectReason::ProtocolBreach,
            0x03 => DisconnectReason::UselessPeer,
            0x04 => DisconnectReason::TooManyPeers,
            0x05 => DisconnectReason::AlreadyConnected,
            0x06 => DisconnectReason::IncompatibleVersion,
            0x07 => DisconnectReason::InvalidIdentity,
            0x08 => DisconnectReason::ClientQuitting,
            0x09 => DisconnectReason::UnexpectedIdentity,
            0x0a => DisconnectReason::ConnectedToSelf,
            0x0b => DisconnectReason::ReadTimeout,
            0x10 => DisconnectReason::SubprotocolError,
            other => DisconnectReason::Other(other),
        }
    }
}

impl From<DisconnectReason> for u8 {
    fn from(reason: DisconnectReason) -> Self {
        match reason {
            DisconnectReason::Requested => 0x00,
            DisconnectReason::TcpError => 0x01,
            DisconnectReason::ProtocolBreach => 0x02,
            DisconnectReason::UselessPeer => 0x03,
            DisconnectReason::TooManyPeers => 0x04,
            DisconnectReason::AlreadyConnected => 0x05,
            DisconnectReason::IncompatibleVersion => 0x06,
            DisconnectReason::InvalidIdentity => 0x07,
            DisconnectReason::ClientQuitting => 0x08,
            DisconnectReason::UnexpectedIdentity => 0x09,
            DisconnectReason::ConnectedToSelf => 0x0a,
            DisconnectReason::ReadTimeout => 0x0b,
            DisconnectReason::SubprotocolError => 0x10,
            DisconnectReason::Other(other) => other,
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::Requested => write!(f, "disconnect requested"),
            DisconnectReason::TcpError => write!(f, "network error"),
            DisconnectReason::ProtocolBreach => write!(f, "breach of protocol"),
            DisconnectReason::UselessPeer => write!(f, "useless peer"),
            DisconnectReason::TooManyPeers => write!(f, "too many peers"),
            DisconnectReason::AlreadyConnected => write!(f, "already connected"),
            DisconnectReason::IncompatibleVersion => write!(f, "incompatible p2p protocol version"),
            DisconnectReason::InvalidIdentity => write!(f, "invalid node identity"),
            DisconnectReason::ClientQuitting => write!(f, "client quitting"),
            DisconnectReason::UnexpectedIdentity => write!(f, "unexpected identity"),
            DisconnectReason::ConnectedToSelf => write!(f, "connected to self"),
            DisconnectReason::ReadTimeout => write!(f, "read timeout"),
            DisconnectReason::SubprotocolError => write!(f, "subprotocol error"),
            DisconnectReason::Other(code) => write!(f, "unknown disconnect reason {code}"),
        }
    }
}

impl Encodable for DisconnectReason {
    fn encode(&self, out: &mut dyn BufMut) {
        u8::from(*self).encode(out);
    }

    fn length(&self) -> usize {
        u8::from(*self).length()
    }
}

impl Decodable for DisconnectReason {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        u8::decode(buf).map(DisconnectReason::from)
    }
}

/// Disconnect carrying a single bare reason, as sent by some clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disconnect {
    pub reason: DisconnectReason,
}

impl Encodable for Disconnect {
    fn encode(&self, out: &mut dyn BufMut) {
        self.reason.encode(out);
    }

    fn length(&self) -> usize {
        self.reason.length()
    }
}

impl Decodable for Disconnect {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        DisconnectReason::decode(buf).map(|reason| Disconnect { reason })
    }
}

/// Disconnect carrying a list of reasons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disconnects(pub Vec<DisconnectReason>);

impl Disconnects {
    /// The first listed reason, if any.
    pub fn reason(&self) -> Option<DisconnectReason> {
        self.0.first().copied()
    }
}

impl Encodable for Disconnects {
    fn encode(&self, out: &mut dyn BufMut) {
        self.0.encode(out);
    }

    fn length(&self) -> usize {
        self.0.length()
    }
}

impl Decodable for Disconnects {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        Vec::<DisconnectReason>::decode(buf).map(Disconnects)
    }
}

/// Encodes an empty list and accepts any list when decoding.
fn encode_empty_list(out: &mut dyn BufMut) {
    Header {
        list: true,
        payload_length: 0,
    }
    .encode(out);
}

fn skip_list(buf: &mut &[u8]) -> alloy_rlp::Result<()> {
    let header = Header::decode(buf)?;
    if !header.list {
        return Err(alloy_rlp::Error::UnexpectedString);
    }
    if buf.len() < header.payload_length {
        return Err(alloy_rlp::Error::InputTooShort);
    }
    *buf = &buf[header.payload_length..];
    Ok(())
}

/// Liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ping;

impl Encodable for Ping {
    fn encode(&self, out: &mut dyn BufMut) {
        encode_empty_list(out);
    }

    fn length(&self) -> usize {
        1
    }
}

impl Decodable for Ping {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        skip_list(buf).map(|_| Ping)
    }
}

/// Answer to a [`Ping`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pong;

impl Encodable for Pong {
    fn encode(&self, out: &mut dyn BufMut) {
        encode_empty_list(out);
    }

    fn length(&self) -> usize {
        1
    }
}

impl Decodable for Pong {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        skip_list(buf).map(|_| Pong)
    }
}
