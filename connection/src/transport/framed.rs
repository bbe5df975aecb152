//! Length-prefixed frame transport.
//!
//! Each frame on the wire is a 4 byte big-endian body length followed by the
//! body, which is the RLP encoded message code followed by the RLP encoded
//! message payload.

use super::{Frame, Transport, TransportError};
use alloy_rlp::{Decodable, Encodable};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Size of the frame length prefix in bytes.
const LENGTH_PREFIX_SIZE: usize = 4;

/// Maximum accepted frame body size, mirroring the RLPx 24-bit frame size limit.
pub const MAX_FRAME_SIZE: usize = 0xFF_FFFF;

/// State machine for the [`FramedReader`] read method.
///
/// The read can be interrupted (e.g. by `tokio::select!` or a timeout) and
/// resume where it left off on the next call without losing partially read data.
#[derive(Debug)]
enum ReadState {
    /// Reading the length prefix.
    ReadingLength {
        prefix: [u8; LENGTH_PREFIX_SIZE],
        bytes_read: usize,
    },
    /// Reading the frame body.
    ReadingBody { buffer: Vec<u8>, bytes_read: usize },
    /// An oversized frame was announced. Its body is never consumed, so the
    /// stream can not be resynchronized.
    Oversized(usize),
}

impl ReadState {
    fn reading_length() -> Self {
        ReadState::ReadingLength {
            prefix: [0u8; LENGTH_PREFIX_SIZE],
            bytes_read: 0,
        }
    }

    fn reading_body(body_len: usize) -> Self {
        ReadState::ReadingBody {
            buffer: vec![0u8; body_len],
            bytes_read: 0,
        }
    }
}

/// Reader half of a [`FramedTransport`].
#[derive(Debug)]
pub struct FramedReader<R> {
    state: ReadState,
    reader: R,
}

impl<R> FramedReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    /// Create a new frame reader.
    pub fn new(reader: R) -> Self {
        Self {
            state: ReadState::reading_length(),
            reader,
        }
    }

    /// Read the next frame.
    ///
    /// This function is cancellation safe. Once a frame exceeding
    /// [`MAX_FRAME_SIZE`] was announced every later read fails.
    pub async fn read(&mut self) -> Result<Frame, TransportError> {
        loop {
            match &mut self.state {
                ReadState::ReadingLength { prefix, bytes_read } => {
                    while *bytes_read < LENGTH_PREFIX_SIZE {
                        let n = self.reader.read(&mut prefix[*bytes_read..]).await?;
                        if n == 0 {
                            return Err(TransportError::Io(io::Error::new(
                                io::ErrorKind::UnexpectedEof,
                                "connection closed while reading frame length",
                            )));
                        }
                        *bytes_read += n;
                    }

                    let body_len = u32::from_be_bytes(*prefix) as usize;
                    if body_len > MAX_FRAME_SIZE {
                        self.state = ReadState::Oversized(body_len);
                        return Err(TransportError::FrameTooLarge(body_len));
                    }
                    self.state = ReadState::reading_body(body_len);
                }

                ReadState::Oversized(body_len) => {
                    return Err(TransportError::FrameTooLarge(*body_len));
                }

                ReadState::ReadingBody { buffer, bytes_read } => {
                    while *bytes_read < buffer.len() {
                        let n = self.reader.read(&mut buffer[*bytes_read..]).await?;
                        if n == 0 {
                            return Err(TransportError::Io(io::Error::new(
                                io::ErrorKind::UnexpectedEof,
                                "connection closed while reading frame body",
                            )));
                        }
                        *bytes_read += n;
                    }

                    let body = std::mem::take(buffer);
                    self.state = ReadState::reading_length();

                    let mut rest = &body[..];
                    let code = u64::decode(&mut rest)?;
                    return Ok(Frame::new(code, rest.to_vec()));
                }
            }
        }
    }
}

/// Writer half of a [`FramedTransport`].
#[derive(Debug)]
pub struct FramedWriter<W> {
    writer: W,
}

impl<W> FramedWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Create a new frame writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write a frame and flush the underlying writer.
    pub async fn write(&mut self, frame: Frame) -> Result<(), TransportError> {
        let body_len = frame.code.length() + frame.payload.len();
        if body_len > MAX_FRAME_SIZE {
            return Err(TransportError::FrameTooLarge(body_len));
        }

        let mut data = Vec::with_capacity(LENGTH_PREFIX_SIZE + body_len);
        data.extend_from_slice(&(body_len as u32).to_be_bytes());
        frame.code.encode(&mut data);
        data.extend_from_slice(&frame.payload);

        self.writer.write_all(&data).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// Length-prefixed frame transport over an async reader and writer.
#[derive(Debug)]
pub struct FramedTransport<R, W> {
    reader: FramedReader<R>,
    writer: FramedWriter<W>,
}

impl<R, W> FramedTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Create a new transport from the read and write halves of a stream.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: FramedReader::new(reader),
            writer: FramedWriter::new(writer),
        }
    }

    /// Split this transport into separate reader and writer halves.
    pub fn into_split(self) -> (FramedReader<R>, FramedWriter<W>) {
        (self.reader, self.writer)
    }
}

impl<R, W> Transport for FramedTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn read_frame(&mut self) -> Result<Frame, TransportError> {
        self.reader.read().await
    }

    async fn write_frame(&mut self, frame: Frame) -> Result<(), TransportError> {
        self.writer.write(frame).await
    }
}
