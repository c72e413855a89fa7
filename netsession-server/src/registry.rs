//! Registry of accepted client connections.

use netsession_transport::ConnectionHandle;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;

/// An accepted client connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientInfo {
    /// Transport handle of the connection.
    pub connection: ConnectionHandle,
    /// Human-readable description reported by the transport.
    pub description: String,
}

impl ClientInfo {
    /// Creates a new client entry.
    #[must_use]
    pub fn new(connection: ConnectionHandle, description: impl Into<String>) -> Self {
        Self {
            connection,
            description: description.into(),
        }
    }
}

impl fmt::Display for ClientInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// Maps live connection handles to their [`ClientInfo`].
///
/// Written only by the server's poll thread; read from any thread.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: RwLock<HashMap<ConnectionHandle, ClientInfo>>,
}

impl ClientRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a client.
    ///
    /// # Returns
    /// `false` if the handle was already registered. The existing entry is
    /// kept.
    pub fn insert(&self, client: ClientInfo) -> bool {
        let mut clients = self.clients.write();
        if clients.contains_key(&client.connection) {
            tracing::warn!("Client {} is already registered", client.connection);
            return false;
        }
        clients.insert(client.connection, client);
        true
    }

    /// Removes a client.
    pub fn remove(&self, connection: ConnectionHandle) -> Option<ClientInfo> {
        self.clients.write().remove(&connection)
    }

    /// Gets a client by handle.
    #[must_use]
    pub fn get(&self, connection: ConnectionHandle) -> Option<ClientInfo> {
        self.clients.read().get(&connection).cloned()
    }

    /// Returns true if the handle is registered.
    #[must_use]
    pub fn contains(&self, connection: ConnectionHandle) -> bool {
        self.clients.read().contains_key(&connection)
    }

    /// Returns a copy of every entry taken under one read lock.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<ConnectionHandle, ClientInfo> {
        self.clients.read().clone()
    }

    /// Returns the number of registered clients.
    #[must_use]
    pub fn count(&self) -> usize {
        self.clients.read().len()
    }

    /// Returns true if no client is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }

    /// Removes and returns every entry, ordered by handle.
    pub fn drain(&self) -> Vec<ClientInfo> {
        let mut clients: Vec<ClientInfo> = self.clients.write().drain().map(|(_, c)| c).collect();
        clients.sort_unstable_by_key(|client| client.connection);
        clients
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(raw: u32) -> ClientInfo {
        ClientInfo::new(
            ConnectionHandle::from_raw(raw),
            format!("#{raw} loopback 127.0.0.1:{}", 50000 + raw),
        )
    }

    #[test]
    fn test_insert_and_get() {
        let registry = ClientRegistry::new();
        assert!(registry.insert(client(1)));
        assert!(registry.insert(client(2)));

        assert_eq!(registry.count(), 2);
        assert_eq!(registry.get(ConnectionHandle::from_raw(1)), Some(client(1)));
        assert!(registry.contains(ConnectionHandle::from_raw(2)));
        assert!(registry.get(ConnectionHandle::from_raw(3)).is_none());
    }

    #[test]
    fn test_insert_duplicate_keeps_original() {
        let registry = ClientRegistry::new();
        assert!(registry.insert(client(1)));

        let impostor = ClientInfo::new(ConnectionHandle::from_raw(1), "other");
        assert!(!registry.insert(impostor));
        assert_eq!(registry.count(), 1);
        assert_eq!(registry.get(ConnectionHandle::from_raw(1)), Some(client(1)));
    }

    #[test]
    fn test_remove_once() {
        let registry = ClientRegistry::new();
        registry.insert(client(5));

        assert_eq!(registry.remove(ConnectionHandle::from_raw(5)), Some(client(5)));
        assert!(registry.remove(ConnectionHandle::from_raw(5)).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let registry = ClientRegistry::new();
        registry.insert(client(1));
        registry.insert(client(2));

        let snapshot = registry.snapshot();
        registry.remove(ConnectionHandle::from_raw(1));

        assert_eq!(snapshot.len(), 2);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_drain_sorted() {
        let registry = ClientRegistry::new();
        registry.insert(client(9));
        registry.insert(client(3));
        registry.insert(client(6));

        let drained: Vec<u32> = registry
            .drain()
            .iter()
            .map(|client| client.connection.raw())
            .collect();
        assert_eq!(drained, vec![3, 6, 9]);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_client_info_display() {
        assert_eq!(client(2).to_string(), "#2 loopback 127.0.0.1:50002");
    }
}
