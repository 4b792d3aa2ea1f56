//! The set of live connections belonging to one hub.

use std::collections::HashMap;

use super::connection::{Connection, ConnectionId};
use super::error::RegistryError;

/// What to do with a connection after visiting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Keep,
    Remove,
}

/// Live connections keyed by id. Owned by a single hub actor, so no locking.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, conn: Connection) -> Result<(), RegistryError> {
        let id = conn.id();
        if !conn.state().is_live() {
            return Err(RegistryError::NotLive {
                id,
                state: conn.state(),
            });
        }
        if self.connections.contains_key(&id) {
            return Err(RegistryError::DuplicateConnection(id));
        }
        self.connections.insert(id, conn);
        Ok(())
    }

    /// Remove a connection. Removing an absent id is a no-op.
    pub fn remove(&mut self, id: ConnectionId) -> Option<Connection> {
        self.connections.remove(&id)
    }

    pub fn size(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub fn ids(&self) -> Vec<ConnectionId> {
        self.connections.keys().copied().collect()
    }

    /// Visit every connection present when the call starts, removing those
    /// the visitor rejects. Removed connections are returned to the caller.
    pub fn for_each<F>(&mut self, mut visit: F) -> Vec<Connection>
    where
        F: FnMut(&mut Connection) -> Visit,
    {
        let mut removed = Vec::new();
        for id in self.ids() {
            let Some(conn) = self.connections.get_mut(&id) else {
                continue;
            };
            if visit(conn) == Visit::Keep {
                continue;
            }
            removed.extend(self.connections.remove(&id));
        }
        removed
    }
}
