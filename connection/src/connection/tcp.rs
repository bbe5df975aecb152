//! TCP-specific connections.

use super::{Connection, ConnectionConfiguration, ConnectionError};
use crate::node::Node;
use crate::transport::FramedTransport;
use log::debug;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// A connection over a framed TCP stream.
pub type TcpConnection = Connection<FramedTransport<OwnedReadHalf, OwnedWriteHalf>>;

/// Establish a TCP stream with timeout and nodelay.
async fn establish_tcp_connection(
    socket_addr: SocketAddr,
    timeout: Duration,
) -> Result<TcpStream, ConnectionError> {
    match tokio::time::timeout(timeout, TcpStream::connect(socket_addr)).await {
        Ok(Ok(stream)) => {
            // Most devp2p messages are small, don't hold them back.
            stream.set_nodelay(true)?;
            Ok(stream)
        }
        Ok(Err(e)) => Err(ConnectionError::Io(e)),
        Err(_) => Err(ConnectionError::Timeout),
    }
}

impl TcpConnection {
    /// Open a TCP connection to a node.
    ///
    /// The connect is bounded by the configured connection timeout. No
    /// messages are exchanged yet, see [`Connection::peer_info`].
    ///
    /// # Arguments
    ///
    /// * `node` - The node to dial.
    /// * `configuration` - Configuration for the connection.
    ///
    /// # Returns
    ///
    /// * `Ok(`[`TcpConnection`]`)` - An open connection.
    /// * `Err(`[`ConnectionError`]`)` - The connect failed or timed out.
    pub async fn tcp(
        node: Node,
        configuration: ConnectionConfiguration,
    ) -> Result<Self, ConnectionError> {
        let socket_addr = node.tcp_addr();
        let stream =
            establish_tcp_connection(socket_addr, configuration.connection_timeout).await?;
        debug!("Connected to {node} over TCP");

        let (reader, writer) = stream.into_split();
        Ok(Connection::new(
            node,
            configuration,
            FramedTransport::new(reader, writer),
        ))
    }
}
