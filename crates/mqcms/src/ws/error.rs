//! Hub and registry errors.

use thiserror::Error;

use super::connection::{ConnectionId, ConnectionState};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("connection {0} is already registered")]
    DuplicateConnection(ConnectionId),

    #[error("connection {id} is {state} and cannot be registered")]
    NotLive {
        id: ConnectionId,
        state: ConnectionState,
    },
}

#[derive(Debug, Clone, Error)]
pub enum HubError {
    /// The hub actor has stopped and no longer accepts commands.
    #[error("hub '{0}' is unavailable")]
    Unavailable(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
