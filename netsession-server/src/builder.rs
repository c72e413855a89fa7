//! Server builder and main server implementation.

use crate::error::ServerError;
use crate::registry::ClientInfo;
use crate::session::{ServerSession, ServerShared};
use netsession_core::{Buffer, PollConfig, PollWorker, RunFlag};
use netsession_transport::{ConnectionHandle, ResultCode, SendReliability, TransportProvider};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 27020;

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Port the listen socket is opened on.
    pub port: u16,
    /// Poll-loop cadence and thread name.
    pub poll: PollConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            poll: PollConfig::named("netsession-server"),
        }
    }
}

/// Builder for configuring and creating a server.
pub struct ServerBuilder<P: TransportProvider> {
    transport: Arc<P>,
    config: ServerConfig,
}

impl<P: TransportProvider> ServerBuilder<P> {
    /// Creates a new server builder with default settings.
    #[must_use]
    pub fn new(transport: Arc<P>) -> Self {
        Self {
            transport,
            config: ServerConfig::default(),
        }
    }

    /// Sets the listen port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets the delay between two poll-loop iterations.
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll = self.config.poll.interval(interval);
        self
    }

    /// Sets how many messages are pulled per receive call.
    #[must_use]
    pub fn receive_batch(mut self, batch: usize) -> Self {
        self.config.poll = self.config.poll.receive_batch(batch);
        self
    }

    /// Sets the name of the poll thread.
    #[must_use]
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.poll.thread_name = name.into();
        self
    }

    /// Builds the server. Nothing listens until [`Server::start`].
    #[must_use]
    pub fn build(self) -> Server<P> {
        Server {
            transport: self.transport,
            config: self.config,
            shared: Arc::new(ServerShared::default()),
            worker: PollWorker::new(),
        }
    }
}

/// The main server instance.
///
/// Accepts every incoming connection on its port and keeps a registry of the
/// connected clients. Callbacks run on the background poll thread.
pub struct Server<P: TransportProvider> {
    transport: Arc<P>,
    config: ServerConfig,
    shared: Arc<ServerShared>,
    worker: PollWorker,
}

impl<P: TransportProvider> Server<P> {
    /// Creates a server with the default configuration.
    #[must_use]
    pub fn new(transport: Arc<P>) -> Self {
        ServerBuilder::new(transport).build()
    }

    /// Returns a builder for a server on `transport`.
    #[must_use]
    pub fn builder(transport: Arc<P>) -> ServerBuilder<P> {
        ServerBuilder::new(transport)
    }

    /// Starts listening on the configured port.
    ///
    /// Returns immediately. Startup failures stop the loop and are reported
    /// through [`is_running`](Self::is_running) and
    /// [`debug_message`](Self::debug_message). Does nothing while running.
    pub fn start(&mut self) {
        if self.worker.is_running() {
            tracing::debug!("Server already running on port {}", self.config.port);
            return;
        }
        self.worker.join();
        self.shared.debug_message.write().clear();

        let session = ServerSession::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.shared),
            self.config.port,
            self.config.poll.clone(),
        );

        if let Err(e) = self
            .worker
            .spawn(&self.config.poll.thread_name, move |running| session.run(running))
        {
            let err = ServerError::from(e);
            tracing::error!("{}", err);
            self.shared.record_failure(&err);
        }
    }

    /// Stops the poll loop, closing every client connection with reason
    /// `"Server Shutdown"`.
    ///
    /// Blocks until the poll thread has exited. No disconnect callbacks fire.
    pub fn stop(&mut self) {
        if self.worker.is_running() {
            tracing::info!("Stopping server on port {}", self.config.port);
        }
        self.worker.stop();
    }

    /// Returns true while the poll loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    /// Returns the configured listen port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.config.port
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the last fatal error. Empty if none.
    #[must_use]
    pub fn debug_message(&self) -> String {
        self.shared.debug_message.read().clone()
    }

    /// Sends one message to one client.
    pub fn send_to(
        &self,
        client: &ClientInfo,
        buffer: Buffer<'_>,
        reliability: SendReliability,
    ) -> ResultCode {
        self.transport
            .send(client.connection, buffer.as_slice(), reliability)
    }

    /// Sends one message to every connected client except `exclude`.
    ///
    /// Failures are logged per client and do not stop the broadcast.
    ///
    /// # Returns
    /// The number of clients the transport accepted the message for.
    pub fn broadcast(
        &self,
        buffer: Buffer<'_>,
        exclude: Option<&ClientInfo>,
        reliability: SendReliability,
    ) -> usize {
        broadcast_to_clients(&*self.transport, &self.shared, buffer, exclude, reliability)
    }

    /// Returns a copy of the connected clients.
    #[must_use]
    pub fn connected_clients(&self) -> HashMap<ConnectionHandle, ClientInfo> {
        self.shared.registry.snapshot()
    }

    /// Returns the number of connected clients.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.shared.registry.count()
    }

    /// Returns a cloneable handle for use from other threads, including
    /// from inside callbacks.
    #[must_use]
    pub fn handle(&self) -> ServerHandle<P> {
        ServerHandle {
            transport: Arc::clone(&self.transport),
            shared: Arc::clone(&self.shared),
            running: self.worker.run_flag(),
        }
    }

    /// Sets the handler for data received from clients.
    pub fn set_on_data_received<F>(&self, callback: F)
    where
        F: Fn(&ClientInfo, Buffer<'_>) + Send + Sync + 'static,
    {
        self.shared.callbacks.on_data_received(callback);
    }

    /// Sets the handler fired for each accepted client.
    pub fn set_on_client_connected<F>(&self, callback: F)
    where
        F: Fn(&ClientInfo) + Send + Sync + 'static,
    {
        self.shared.callbacks.on_client_connected(callback);
    }

    /// Sets the handler fired when a connected client goes away.
    pub fn set_on_client_disconnected<F>(&self, callback: F)
    where
        F: Fn(&ClientInfo) + Send + Sync + 'static,
    {
        self.shared.callbacks.on_client_disconnected(callback);
    }

    /// Removes the data handler.
    pub fn clear_on_data_received(&self) {
        self.shared.callbacks.data_received.clear();
    }

    /// Removes the client-connected handler.
    pub fn clear_on_client_connected(&self) {
        self.shared.callbacks.client_connected.clear();
    }

    /// Removes the client-disconnected handler.
    pub fn clear_on_client_disconnected(&self) {
        self.shared.callbacks.client_disconnected.clear();
    }
}

impl<P: TransportProvider> Drop for Server<P> {
    fn drop(&mut self) {
        self.worker.stop();
    }
}

/// Cloneable, thread-safe view of a server.
pub struct ServerHandle<P: TransportProvider> {
    transport: Arc<P>,
    shared: Arc<ServerShared>,
    running: RunFlag,
}

impl<P: TransportProvider> Clone for ServerHandle<P> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            shared: Arc::clone(&self.shared),
            running: self.running.clone(),
        }
    }
}

impl<P: TransportProvider> ServerHandle<P> {
    /// Sends one message to one client. See [`Server::send_to`].
    pub fn send_to(
        &self,
        client: &ClientInfo,
        buffer: Buffer<'_>,
        reliability: SendReliability,
    ) -> ResultCode {
        self.transport
            .send(client.connection, buffer.as_slice(), reliability)
    }

    /// Sends one message to every connected client except `exclude`. See
    /// [`Server::broadcast`].
    pub fn broadcast(
        &self,
        buffer: Buffer<'_>,
        exclude: Option<&ClientInfo>,
        reliability: SendReliability,
    ) -> usize {
        broadcast_to_clients(&*self.transport, &self.shared, buffer, exclude, reliability)
    }

    /// Returns a copy of the connected clients.
    #[must_use]
    pub fn connected_clients(&self) -> HashMap<ConnectionHandle, ClientInfo> {
        self.shared.registry.snapshot()
    }

    /// Returns the number of connected clients.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.shared.registry.count()
    }

    /// Returns true while the owning server's poll loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.is_set()
    }
}

fn broadcast_to_clients<P: TransportProvider>(
    transport: &P,
    shared: &ServerShared,
    buffer: Buffer<'_>,
    exclude: Option<&ClientInfo>,
    reliability: SendReliability,
) -> usize {
    let excluded = exclude.map(|client| client.connection);
    let mut delivered = 0;

    for (connection, client) in shared.registry.snapshot() {
        if Some(connection) == excluded {
            continue;
        }
        match transport.send(connection, buffer.as_slice(), reliability) {
            ResultCode::Ok => delivered += 1,
            code => tracing::warn!("Broadcast to {} failed: {}", client, code),
        }
    }
    delivered
}
