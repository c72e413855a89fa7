//! Routing of server events to user callbacks.

use crate::registry::ClientInfo;
use netsession_core::{Buffer, CallbackSlot};
use std::sync::Arc;

/// Handler invoked for every non-empty message from a registered client.
pub type ServerDataCallback = dyn Fn(&ClientInfo, Buffer<'_>) + Send + Sync;

/// Handler invoked after a client is accepted and registered.
pub type ClientConnectedCallback = dyn Fn(&ClientInfo) + Send + Sync;

/// Handler invoked when a connected client goes away.
pub type ClientDisconnectedCallback = dyn Fn(&ClientInfo) + Send + Sync;

/// User callbacks registered on a server.
#[derive(Debug, Default)]
pub struct ServerCallbacks {
    /// Fired for received data.
    pub data_received: CallbackSlot<ServerDataCallback>,
    /// Fired for newly accepted clients.
    pub client_connected: CallbackSlot<ClientConnectedCallback>,
    /// Fired for clients that were connected and are now closed.
    pub client_disconnected: CallbackSlot<ClientDisconnectedCallback>,
}

impl ServerCallbacks {
    /// Creates a set of empty slots.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the data handler.
    pub fn on_data_received<F>(&self, handler: F)
    where
        F: Fn(&ClientInfo, Buffer<'_>) + Send + Sync + 'static,
    {
        self.data_received.set(Arc::new(handler));
    }

    /// Installs the connect handler.
    pub fn on_client_connected<F>(&self, handler: F)
    where
        F: Fn(&ClientInfo) + Send + Sync + 'static,
    {
        self.client_connected.set(Arc::new(handler));
    }

    /// Installs the disconnect handler.
    pub fn on_client_disconnected<F>(&self, handler: F)
    where
        F: Fn(&ClientInfo) + Send + Sync + 'static,
    {
        self.client_disconnected.set(Arc::new(handler));
    }

    /// Dispatches one message. Zero-length payloads are skipped.
    ///
    /// # Returns
    /// `true` if a handler ran.
    pub fn dispatch_data(&self, client: &ClientInfo, buffer: Buffer<'_>) -> bool {
        if buffer.is_empty() {
            tracing::debug!("Skipping empty message from {}", client);
            return false;
        }
        match self.data_received.get() {
            Some(handler) => {
                handler(client, buffer);
                true
            }
            None => false,
        }
    }

    /// Dispatches a connect event.
    pub fn dispatch_client_connected(&self, client: &ClientInfo) -> bool {
        match self.client_connected.get() {
            Some(handler) => {
                handler(client);
                true
            }
            None => false,
        }
    }

    /// Dispatches a disconnect event.
    pub fn dispatch_client_disconnected(&self, client: &ClientInfo) -> bool {
        match self.client_disconnected.get() {
            Some(handler) => {
                handler(client);
                true
            }
            None => false,
        }
    }
}
