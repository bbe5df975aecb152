//! Frame transport underneath a peer connection.
//!
//! A devp2p session multiplexes messages as frames, each carrying a numeric
//! message code and an RLP encoded payload. The [`Transport`] trait is the
//! byte-oriented channel a [`Connection`](crate::Connection) reads frames from
//! and writes frames to. Encryption and authentication of the channel (RLPx)
//! is the responsibility of the transport implementation.
//!
//! [`FramedTransport`] is the in-crate implementation: a length-prefixed
//! framing over any [`AsyncRead`](tokio::io::AsyncRead) and
//! [`AsyncWrite`](tokio::io::AsyncWrite) pair.
//!
//! # Example
//!
//! ```
//! use devp2p_peers_connection::{Frame, FramedTransport, Transport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (local, remote) = tokio::io::duplex(1024);
//! let (reader, writer) = tokio::io::split(local);
//! let mut transport = FramedTransport::new(reader, writer);
//!
//! // Send a ping (code 0x02, empty list payload).
//! transport.write_frame(Frame::new(0x02, vec![0xc0])).await?;
//! # drop(remote);
//! # Ok(())
//! # }
//! ```

mod framed;

pub use framed::{FramedReader, FramedTransport, FramedWriter, MAX_FRAME_SIZE};

use std::fmt;
use std::future::Future;
use std::io;

/// A single message frame: the message code and its encoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Protocol message code.
    pub code: u64,
    /// RLP encoded message body.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a new frame.
    pub fn new(code: u64, payload: Vec<u8>) -> Self {
        Frame { code, payload }
    }
}

/// Error types specific to the transport layer.
#[derive(Debug)]
pub enum TransportError {
    /// IO error during read/write operations.
    Io(io::Error),
    /// Frame length exceeds [`MAX_FRAME_SIZE`].
    FrameTooLarge(usize),
    /// Frame body does not start with a valid message code.
    MalformedFrame(alloy_rlp::Error),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Io(e) => write!(f, "IO error: {e}"),
            TransportError::FrameTooLarge(len) => {
                write!(f, "Frame of {len} bytes exceeds maximum of {MAX_FRAME_SIZE}")
            }
            TransportError::MalformedFrame(e) => write!(f, "Malformed frame: {e}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Io(e) => Some(e),
            TransportError::FrameTooLarge(_) => None,
            TransportError::MalformedFrame(_) => None,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        TransportError::Io(e)
    }
}

impl From<alloy_rlp::Error> for TransportError {
    fn from(e: alloy_rlp::Error) -> Self {
        TransportError::MalformedFrame(e)
    }
}

/// A byte-oriented channel which carries message frames to and from one peer.
pub trait Transport: Send {
    /// Read the next frame.
    ///
    /// Implementations should be cancellation safe so the read can be raced
    /// against a timer.
    fn read_frame(&mut self) -> impl Future<Output = Result<Frame, TransportError>> + Send;

    /// Write a frame.
    fn write_frame(
        &mut self,
        frame: Frame,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}
