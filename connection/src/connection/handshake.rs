//! Hello and status exchange.

use super::{Connection, ConnectionError};
use crate::message::{
    code, Capability, DisconnectReason, Hello, Message, Pong, Status, P2P_VERSION,
};
use crate::transport::Transport;
use log::debug;

/// Name of the chain-sync sub-protocol.
pub const ETH_PROTOCOL: &str = "eth";

/// Picks the highest version of every sub-protocol both sides support.
///
/// The result is sorted by protocol name, the order in which message code
/// offsets are assigned.
pub fn negotiate_capabilities(ours: &[Capability], theirs: &[Capability]) -> Vec<Capability> {
    let mut shared: Vec<Capability> = Vec::new();
    for capability in ours.iter().filter(|c| theirs.contains(c)) {
        match shared.iter_mut().find(|s| s.name == capability.name) {
            Some(existing) if existing.version < capability.version => {
                existing.version = capability.version;
            }
            Some(_) => {}
            None => shared.push(capability.clone()),
        }
    }
    shared.sort_by(|a, b| a.name.cmp(&b.name));
    shared
}

/// Builds our hello message from the connection configuration.
pub(crate) fn local_hello<T: Transport>(connection: &Connection<T>) -> Hello {
    let configuration = connection.configuration();
    Hello {
        version: P2P_VERSION,
        name: configuration.client_id.to_string(),
        capabilities: configuration.capabilities.clone(),
        listen_port: configuration.listen_port as u64,
        id: configuration.peer_id(),
    }
}

/// Sends our hello and reads until the peer's hello and status arrived.
///
/// Pings are answered while waiting. The peer's status is echoed back so the
/// peer keeps the session open until we are done with it.
pub(crate) async fn exchange_peer_info<T: Transport>(
    connection: &mut Connection<T>,
) -> Result<(Hello, Status), ConnectionError> {
    let hello = local_hello(connection);
    connection.write(&Message::Hello(hello)).await?;

    let mut peer_hello: Option<Hello> = None;
    loop {
        match connection.receive().await? {
            Message::Hello(theirs) => {
                if theirs.id != connection.node().public_key {
                    return Err(ConnectionError::UnexpectedIdentity);
                }
                let shared = negotiate_capabilities(
                    &connection.configuration().capabilities,
                    &theirs.capabilities,
                );
                if !shared.iter().any(|c| c.name == ETH_PROTOCOL) {
                    return Err(ConnectionError::NoSharedCapability);
                }
                debug!(
                    "Received hello from {} ({}), negotiated {:?}",
                    connection.node(),
                    theirs.name,
                    shared
                );
                connection.set_negotiated(shared);
                peer_hello = Some(theirs);
            }
            Message::Status(status) => {
                let Some(hello) = peer_hello else {
                    return Err(ConnectionError::UnexpectedMessage(code::STATUS));
                };
                connection.write(&Message::Status(status.clone())).await?;
                return Ok((hello, status));
            }
            Message::Ping(_) => {
                connection.write(&Message::Pong(Pong)).await?;
            }
            Message::Disconnect(disconnect) => {
                return Err(ConnectionError::Disconnected(disconnect.reason));
            }
            Message::Disconnects(disconnects) => {
                return Err(ConnectionError::Disconnected(
                    disconnects.reason().unwrap_or(DisconnectReason::Requested),
                ));
            }
            Message::Error(error) => {
                return Err(ConnectionError::InvalidFrame(error));
            }
            other => {
                debug!(
                    "Ignoring {} from {} during handshake",
                    other.kind(),
                    connection.node()
                );
            }
        }
    }
}
