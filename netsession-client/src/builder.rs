//! Client builder and main client implementation.

use crate::error::ClientError;
use crate::session::{ClientSession, ClientShared};
use crate::status::ConnectionStatus;
use netsession_core::{Buffer, PollConfig, PollWorker, RunFlag};
use netsession_transport::{ResultCode, SendReliability, TransportProvider};
use std::sync::Arc;
use std::time::Duration;

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Poll-loop cadence and thread name.
    pub poll: PollConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            poll: PollConfig::named("netsession-client"),
        }
    }
}

/// Builder for configuring and creating a client.
pub struct ClientBuilder<P: TransportProvider> {
    transport: Arc<P>,
    config: ClientConfig,
}

impl<P: TransportProvider> ClientBuilder<P> {
    /// Creates a new client builder on top of `transport`.
    #[must_use]
    pub fn new(transport: Arc<P>) -> Self {
        Self {
            transport,
            config: ClientConfig::default(),
        }
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

    /// Builds the client. No thread is started until [`Client::connect`].
    #[must_use]
    pub fn build(self) -> Client<P> {
        Client {
            transport: self.transport,
            config: self.config,
            shared: Arc::new(ClientShared::default()),
            worker: PollWorker::new(),
            server_address: None,
        }
    }
}

/// A client holding at most one connection to a server.
///
/// All network work happens on a background poll thread started by
/// [`connect`](Self::connect). Callbacks run on that thread.
pub struct Client<P: TransportProvider> {
    transport: Arc<P>,
    config: ClientConfig,
    shared: Arc<ClientShared>,
    worker: PollWorker,
    server_address: Option<String>,
}

impl<P: TransportProvider> Client<P> {
    /// Creates a client with the default configuration.
    #[must_use]
    pub fn new(transport: Arc<P>) -> Self {
        ClientBuilder::new(transport).build()
    }

    /// Returns a builder for a client on `transport`.
    #[must_use]
    pub fn builder(transport: Arc<P>) -> ClientBuilder<P> {
        ClientBuilder::new(transport)
    }

    /// Starts connecting to `server_address` (for example `"127.0.0.1:27020"`).
    ///
    /// Returns immediately with the status set to `Connecting`. Failures are
    /// reported through [`status`](Self::status),
    /// [`debug_message`](Self::debug_message) and the disconnected callback.
    /// Does nothing while the poll loop is already running.
    pub fn connect(&mut self, server_address: &str) {
        if self.worker.is_running() {
            tracing::debug!("Client already running, ignoring connect to {}", server_address);
            return;
        }
        // A loop that stopped itself may still be tearing down.
        self.worker.join();

        self.shared.tracker.begin_connecting();
        self.server_address = Some(server_address.to_string());

        let session = ClientSession::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.shared),
            server_address.to_string(),
            self.config.poll.clone(),
        );

        if let Err(e) = self
            .worker
            .spawn(&self.config.poll.thread_name, move |running| session.run(running))
        {
            let err = ClientError::from(e);
            tracing::error!("{}", err);
            self.shared.tracker.mark_failed(&err.to_string());
            self.shared.callbacks.dispatch_disconnected();
        }
    }

    /// Stops the poll loop and closes the connection.
    ///
    /// Blocks until the poll thread has exited. The disconnected callback is
    /// not fired for a local disconnect. Safe to call when not running.
    pub fn disconnect(&mut self) {
        if self.worker.is_running() {
            tracing::info!("Disconnecting client");
        }
        self.worker.stop();
    }

    /// Returns true while the poll loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    /// Returns the connection status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.shared.tracker.status()
    }

    /// Returns the last failure or close reason. Empty if none.
    #[must_use]
    pub fn debug_message(&self) -> String {
        self.shared.tracker.debug_message()
    }

    /// Returns the address given to the last [`connect`](Self::connect).
    #[must_use]
    pub fn server_address(&self) -> Option<&str> {
        self.server_address.as_deref()
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sends one message to the server.
    ///
    /// # Returns
    /// The transport's result, or `ResultCode::NoConnection` if no
    /// connection is live.
    pub fn send(&self, buffer: Buffer<'_>, reliability: SendReliability) -> ResultCode {
        send_to_server(&*self.transport, &self.shared, buffer, reliability)
    }

    /// Returns a cloneable handle for use from other threads, including
    /// from inside callbacks.
    #[must_use]
    pub fn handle(&self) -> ClientHandle<P> {
        ClientHandle {
            transport: Arc::clone(&self.transport),
            shared: Arc::clone(&self.shared),
            running: self.worker.run_flag(),
        }
    }

    /// Sets the handler for received messages.
    pub fn set_on_data_received<F>(&self, callback: F)
    where
        F: Fn(Buffer<'_>) + Send + Sync + 'static,
    {
        self.shared.callbacks.data_received.set(Arc::new(callback));
    }

    /// Sets the handler fired once the connection is established.
    pub fn set_on_connected<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.shared.callbacks.connected.set(Arc::new(callback));
    }

    /// Sets the handler fired when the connection fails or is lost.
    pub fn set_on_disconnected<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.shared.callbacks.disconnected.set(Arc::new(callback));
    }

    /// Removes the received-message handler.
    pub fn clear_on_data_received(&self) {
        self.shared.callbacks.data_received.clear();
    }

    /// Removes the connected handler.
    pub fn clear_on_connected(&self) {
        self.shared.callbacks.connected.clear();
    }

    /// Removes the disconnected handler.
    pub fn clear_on_disconnected(&self) {
        self.shared.callbacks.disconnected.clear();
    }
}

impl<P: TransportProvider> Drop for Client<P> {
    fn drop(&mut self) {
        self.worker.stop();
    }
}

/// Cloneable, thread-safe view of a client.
pub struct ClientHandle<P: TransportProvider> {
    transport: Arc<P>,
    shared: Arc<ClientShared>,
    running: RunFlag,
}

impl<P: TransportProvider> Clone for ClientHandle<P> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            shared: Arc::clone(&self.shared),
            running: self.running.clone(),
        }
    }
}

impl<P: TransportProvider> ClientHandle<P> {
    /// Sends one message to the server. See [`Client::send`].
    pub fn send(&self, buffer: Buffer<'_>, reliability: SendReliability) -> ResultCode {
        send_to_server(&*self.transport, &self.shared, buffer, reliability)
    }

    /// Returns the connection status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.shared.tracker.status()
    }

    /// Returns the last failure or close reason.
    #[must_use]
    pub fn debug_message(&self) -> String {
        self.shared.tracker.debug_message()
    }

    /// Returns true while the owning client's poll loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.is_set()
    }
}

fn send_to_server<P: TransportProvider>(
    transport: &P,
    shared: &ClientShared,
    buffer: Buffer<'_>,
    reliability: SendReliability,
) -> ResultCode {
    match shared.tracker.connection() {
        Some(connection) => transport.send(connection, buffer.as_slice(), reliability),
        None => ResultCode::NoConnection,
    }
}
