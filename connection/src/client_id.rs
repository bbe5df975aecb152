//! Client identifier validation for the devp2p hello message.
//!
//! devp2p clients identify themselves with a slash separated string such as
//! `Geth/v1.13.5-stable/linux-amd64/go1.21.4`. Only the leading name and version
//! components are required.

use std::fmt;

/// Errors that can occur during client identifier validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientIdError {
    /// The identifier must be `name/version[/...]` in printable ASCII.
    InvalidFormat,
    /// The name component is missing or empty.
    MissingName,
    /// The version component is missing or empty.
    MissingVersion,
}

impl fmt::Display for ClientIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientIdError::InvalidFormat => {
                write!(f, "Client id must follow format 'name/version[/...]'")
            }
            ClientIdError::MissingName => {
                write!(f, "Client id name component cannot be empty")
            }
            ClientIdError::MissingVersion => {
                write!(f, "Client id version component cannot be empty")
            }
        }
    }
}

impl std::error::Error for ClientIdError {}

/// A validated client identifier advertised in hello messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    /// Validate and wrap a client identifier.
    ///
    /// # Example
    ///
    /// ```
    /// use devp2p_peers_connection::ClientId;
    ///
    /// assert!(ClientId::new("Geth/v1.13.5-stable/linux-amd64").is_ok());
    /// assert!(ClientId::new("Geth").is_err());
    /// ```
    pub fn new<S: Into<String>>(client_id: S) -> Result<Self, ClientIdError> {
        let client_id = client_id.into();
        validate(&client_id)?;
        Ok(ClientId(client_id))
    }

    /// Builds a client identifier from its name and version.
    pub fn from_name_version(name: &str, version: &str) -> Self {
        ClientId(format!("{name}/v{version}"))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClientId {
    fn default() -> Self {
        ClientId::from_name_version("devp2p-peers", env!("CARGO_PKG_VERSION"))
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn validate(client_id: &str) -> Result<(), ClientIdError> {
    if client_id.is_empty() || !client_id.chars().all(|c| c.is_ascii_graphic()) {
        return Err(ClientIdError::InvalidFormat);
    }

    let mut parts = client_id.split('/');
    let name = parts.next().unwrap_or_default();
    let version = parts.next().ok_or(ClientIdError::InvalidFormat)?;

    if name.is_empty() {
        return Err(ClientIdError::MissingName);
    }
    if version.is_empty() {
        return Err(ClientIdError::MissingVersion);
    }

    Ok(())
}
