//! Client poll loop.

use crate::error::ClientError;
use crate::status::StatusTracker;
use netsession_core::{Buffer, CallbackSlot, PollConfig, RunFlag};
use netsession_transport::{
    ConnectionHandle, ConnectionState, ConnectionStatusChanged, ReceiveSource, StatusNotifier,
    StatusReceiver, TransportProvider, status_channel,
};
use std::sync::Arc;
use std::thread;

/// Handler invoked for every message received from the server.
pub type DataReceivedCallback = dyn Fn(Buffer<'_>) + Send + Sync;

/// Handler invoked once the connection is established.
pub type ConnectedCallback = dyn Fn() + Send + Sync;

/// Handler invoked when the connection fails or is lost.
pub type DisconnectedCallback = dyn Fn() + Send + Sync;

/// User callbacks registered on a client.
#[derive(Debug, Default)]
pub struct ClientCallbacks {
    /// Fired for every received message.
    pub data_received: CallbackSlot<DataReceivedCallback>,
    /// Fired on `Connecting → Connected`.
    pub connected: CallbackSlot<ConnectedCallback>,
    /// Fired when the connection fails or is lost.
    pub disconnected: CallbackSlot<DisconnectedCallback>,
}

impl ClientCallbacks {
    pub(crate) fn dispatch_data(&self, buffer: Buffer<'_>) {
        if let Some(handler) = self.data_received.get() {
            handler(buffer);
        }
    }

    pub(crate) fn dispatch_connected(&self) {
        if let Some(handler) = self.connected.get() {
            handler();
        }
    }

    pub(crate) fn dispatch_disconnected(&self) {
        if let Some(handler) = self.disconnected.get() {
            handler();
        }
    }
}

/// State shared between the client owner and its poll thread.
#[derive(Debug, Default)]
pub(crate) struct ClientShared {
    pub(crate) tracker: StatusTracker,
    pub(crate) callbacks: ClientCallbacks,
}

/// One run of the client poll loop, from connect to teardown.
pub(crate) struct ClientSession<P: TransportProvider> {
    transport: Arc<P>,
    shared: Arc<ClientShared>,
    server_address: String,
    poll: PollConfig,
}

impl<P: TransportProvider> ClientSession<P> {
    pub(crate) fn new(
        transport: Arc<P>,
        shared: Arc<ClientShared>,
        server_address: String,
        poll: PollConfig,
    ) -> Self {
        Self {
            transport,
            shared,
            server_address,
            poll,
        }
    }

    /// Runs the loop until `running` is cleared by the owner or by a fatal
    /// connection event.
    pub(crate) fn run(self, running: RunFlag) {
        let (notifier, notifications) = status_channel();

        if let Err(e) = self.open(notifier) {
            tracing::error!("{}", e);
            self.shared.tracker.mark_failed(&e.to_string());
            running.clear();
            self.shared.callbacks.dispatch_disconnected();
            return;
        }

        while running.is_set() {
            self.poll_incoming_messages(&running);
            self.poll_connection_state_changes(&running, &notifications);
            thread::sleep(self.poll.interval);
        }

        self.shutdown();
    }

    fn open(&self, notifier: StatusNotifier) -> Result<ConnectionHandle, ClientError> {
        self.transport.init().map_err(ClientError::TransportInit)?;

        let addr = self
            .transport
            .resolve_address(&self.server_address)
            .map_err(ClientError::AddressParse)?;

        tracing::info!("Connecting to server at {}", addr);
        let connection = self
            .transport
            .connect(addr, notifier)
            .map_err(ClientError::ConnectionCreate)?;
        self.shared.tracker.attach(connection);
        Ok(connection)
    }

    fn poll_incoming_messages(&self, running: &RunFlag) {
        while running.is_set() {
            let Some(connection) = self.shared.tracker.connection() else {
                return;
            };

            let messages = match self
                .transport
                .receive(ReceiveSource::Connection(connection), self.poll.receive_batch)
            {
                Ok(messages) => messages,
                Err(e) => {
                    let err = ClientError::Receive(e);
                    tracing::error!("{}", err);
                    self.close(running, connection, &err.to_string());
                    return;
                }
            };

            if messages.is_empty() {
                return;
            }

            for message in &messages {
                self.shared.callbacks.dispatch_data(Buffer::new(&message.data));
            }
        }
    }

    fn poll_connection_state_changes(&self, running: &RunFlag, notifications: &StatusReceiver) {
        self.transport.run_callbacks();
        for change in notifications.drain() {
            self.on_connection_status_changed(running, change);
        }
    }

    fn on_connection_status_changed(&self, running: &RunFlag, change: ConnectionStatusChanged) {
        if self.shared.tracker.connection() != Some(change.connection) {
            tracing::debug!(
                "Ignoring {} notification for stale {}",
                change.info.state,
                change.connection
            );
            return;
        }

        match change.info.state {
            state if state.is_closed() => {
                let reason = change.info.end_debug;
                if change.old_state.is_connecting() {
                    tracing::info!("Couldn't connect to the server: {}", reason);
                } else if state == ConnectionState::ProblemDetectedLocally {
                    tracing::info!("Lost connection with the server: {}", reason);
                } else {
                    tracing::info!("Disconnected from the server: {}", reason);
                }

                self.close(running, change.connection, &reason);
            }
            ConnectionState::Connected => {
                if self.shared.tracker.mark_connected() {
                    tracing::info!("Connected to the server");
                    self.shared.callbacks.dispatch_connected();
                }
            }
            _ => {}
        }
    }

    /// Ends the connection on a transport-side closure or a fatal receive
    /// error. The run flag is cleared only once the final status is written,
    /// and the disconnected callback fires last.
    fn close(&self, running: &RunFlag, connection: ConnectionHandle, reason: &str) {
        if self.shared.tracker.take_connection().is_some() {
            self.transport.close_connection(connection, None, false);
        }
        let status = self.shared.tracker.mark_closed(reason);
        tracing::debug!("Client status is now {}", status);
        running.clear();
        self.shared.callbacks.dispatch_disconnected();
    }

    fn shutdown(&self) {
        if let Some(connection) = self.shared.tracker.take_connection() {
            self.transport.close_connection(connection, None, false);
        }
        if self.shared.tracker.status().is_active() {
            tracing::info!("Client stopped, closing connection");
        }
        self.shared.tracker.mark_stopped();
    }
}
