//! Error types for connection handling.

use crate::message::{DisconnectReason, MessageError};
use crate::transport::TransportError;
use std::error::Error;
use std::fmt;
use std::io;

/// Errors that can occur during peer connection establishment and communication.
#[derive(Debug)]
pub enum ConnectionError {
    /// An I/O error occurred during network operations.
    Io(io::Error),
    /// The frame transport failed.
    TransportFailed(TransportError),
    /// A received frame could not be decoded where a specific message was required.
    InvalidFrame(MessageError),
    /// The peer ended the session.
    Disconnected(DisconnectReason),
    /// The peer shares no version of the chain-sync protocol with us.
    NoSharedCapability,
    /// The peer presented a different identity than the one dialed.
    UnexpectedIdentity,
    /// The peer sent a message which is not valid at this point of the session.
    UnexpectedMessage(u64),
    /// Attempted to send a message which has no wire form.
    InvalidMessage,
    /// The operation did not complete in time.
    Timeout,
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::Io(err) => write!(f, "Connection error: {err}"),
            ConnectionError::TransportFailed(err) => {
                write!(f, "Transport layer failed in peer connection: {err}")
            }
            ConnectionError::InvalidFrame(err) => write!(f, "Invalid frame from peer: {err}"),
            ConnectionError::Disconnected(reason) => write!(f, "Peer disconnected: {reason}"),
            ConnectionError::NoSharedCapability => {
                write!(f, "Peer shares no eth protocol version")
            }
            ConnectionError::UnexpectedIdentity => {
                write!(f, "Peer identity does not match the dialed node")
            }
            ConnectionError::UnexpectedMessage(code) => {
                write!(f, "Unexpected message with code {code}")
            }
            ConnectionError::InvalidMessage => write!(f, "Error messages cannot be sent"),
            ConnectionError::Timeout => write!(f, "Operation timed out"),
        }
    }
}

impl Error for ConnectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConnectionError::Io(err) => Some(err),
            ConnectionError::TransportFailed(err) => Some(err),
            ConnectionError::InvalidFrame(err) => Some(err),
            ConnectionError::Disconnected(_) => None,
            ConnectionError::NoSharedCapability => None,
            ConnectionError::UnexpectedIdentity => None,
            ConnectionError::UnexpectedMessage(_) => None,
            ConnectionError::InvalidMessage => None,
            ConnectionError::Timeout => None,
        }
    }
}

impl From<io::Error> for ConnectionError {
    fn from(err: io::Error) -> Self {
        ConnectionError::Io(err)
    }
}

impl From<TransportError> for ConnectionError {
    fn from(err: TransportError) -> Self {
        ConnectionError::TransportFailed(err)
    }
}

impl From<MessageError> for ConnectionError {
    fn from(err: MessageError) -> Self {
        ConnectionError::InvalidFrame(err)
    }
}
