//! Server poll loop: accepts clients, routes their data and tears everything
//! down on stop.

use crate::dispatcher::ServerCallbacks;
use crate::error::ServerError;
use crate::registry::{ClientInfo, ClientRegistry};
use netsession_core::{Buffer, PollConfig, RunFlag};
use netsession_transport::{
    ConnectionHandle, ConnectionState, ConnectionStatusChanged, ListenHandle, PollGroupHandle,
    ReceiveSource, StatusNotifier, StatusReceiver, TransportProvider, status_channel,
};
use parking_lot::RwLock;
use std::sync::Arc;
use std::thread;

/// Reason sent to every client when the server stops.
pub const SHUTDOWN_REASON: &str = "Server Shutdown";

/// State shared between the server owner and its poll thread.
#[derive(Debug, Default)]
pub(crate) struct ServerShared {
    pub(crate) registry: ClientRegistry,
    pub(crate) callbacks: ServerCallbacks,
    pub(crate) debug_message: RwLock<String>,
}

impl ServerShared {
    pub(crate) fn record_failure(&self, error: &ServerError) {
        *self.debug_message.write() = error.to_string();
    }
}

/// One run of the server poll loop, from listen to teardown.
pub(crate) struct ServerSession<P: TransportProvider> {
    transport: Arc<P>,
    shared: Arc<ServerShared>,
    port: u16,
    poll: PollConfig,
}

impl<P: TransportProvider> ServerSession<P> {
    pub(crate) fn new(
        transport: Arc<P>,
        shared: Arc<ServerShared>,
        port: u16,
        poll: PollConfig,
    ) -> Self {
        Self {
            transport,
            shared,
            port,
            poll,
        }
    }

    /// Runs the loop until `running` is cleared.
    pub(crate) fn run(self, running: RunFlag) {
        let (notifier, notifications) = status_channel();

        let (listen_socket, poll_group) = match self.open(notifier) {
            Ok(handles) => handles,
            Err(e) => {
                tracing::error!("{}", e);
                self.shared.record_failure(&e);
                running.clear();
                return;
            }
        };
        tracing::info!("Server listening on port {}", self.port);

        while running.is_set() {
            self.poll_incoming_messages(&running, poll_group);
            self.poll_connection_state_changes(listen_socket, poll_group, &notifications);
            thread::sleep(self.poll.interval);
        }

        self.shutdown(listen_socket, poll_group);
    }

    fn open(
        &self,
        notifier: StatusNotifier,
    ) -> Result<(ListenHandle, PollGroupHandle), ServerError> {
        self.transport.init().map_err(ServerError::TransportInit)?;

        let listen_socket = self
            .transport
            .listen(self.port, notifier)
            .map_err(ServerError::Listen)?;

        match self.transport.create_poll_group() {
            Ok(poll_group) => Ok((listen_socket, poll_group)),
            Err(e) => {
                self.transport.close_listen_socket(listen_socket);
                Err(ServerError::PollGroupCreate(e))
            }
        }
    }

    fn poll_incoming_messages(&self, running: &RunFlag, poll_group: PollGroupHandle) {
        while running.is_set() {
            let messages = match self
                .transport
                .receive(ReceiveSource::PollGroup(poll_group), self.poll.receive_batch)
            {
                Ok(messages) => messages,
                Err(e) => {
                    let err = ServerError::Receive(e);
                    tracing::error!("{}", err);
                    self.shared.record_failure(&err);
                    running.clear();
                    return;
                }
            };

            if messages.is_empty() {
                return;
            }

            for message in &messages {
                let Some(client) = self.shared.registry.get(message.connection) else {
                    tracing::warn!(
                        "Dropping {} bytes from unregistered {}",
                        message.len(),
                        message.connection
                    );
                    continue;
                };
                self.shared
                    .callbacks
                    .dispatch_data(&client, Buffer::new(&message.data));
            }
        }
    }

    fn poll_connection_state_changes(
        &self,
        listen_socket: ListenHandle,
        poll_group: PollGroupHandle,
        notifications: &StatusReceiver,
    ) {
        self.transport.run_callbacks();
        for change in notifications.drain() {
            self.on_connection_status_changed(listen_socket, poll_group, change);
        }
    }

    fn on_connection_status_changed(
        &self,
        listen_socket: ListenHandle,
        poll_group: PollGroupHandle,
        change: ConnectionStatusChanged,
    ) {
        match change.info.state {
            ConnectionState::Connecting => {
                if change.info.listen_socket != Some(listen_socket) {
                    return;
                }
                self.accept(change.connection, poll_group);
            }
            state if state.is_closed() => {
                let connection = change.connection;
                if change.old_state == ConnectionState::Connected {
                    match self.shared.registry.get(connection) {
                        Some(client) => {
                            tracing::info!(
                                "Connection {} closed: {}",
                                client,
                                change.info.end_debug
                            );
                            self.shared.callbacks.dispatch_client_disconnected(&client);
                        }
                        None => {
                            tracing::warn!("Closed connection {} was not registered", connection);
                        }
                    }
                }
                self.shared.registry.remove(connection);
                self.transport.close_connection(connection, None, false);
            }
            _ => {}
        }
    }

    fn accept(&self, connection: ConnectionHandle, poll_group: PollGroupHandle) {
        tracing::info!("Accepting connection {}", connection);

        let code = self.transport.accept_connection(connection);
        if !code.is_ok() {
            tracing::warn!("{}", ServerError::Accept { connection, code });
            self.transport.close_connection(connection, None, false);
            return;
        }

        if !self.transport.set_poll_group(connection, poll_group) {
            tracing::warn!("{}", ServerError::PollGroupAssign { connection });
            self.transport.close_connection(connection, None, false);
            return;
        }

        let description = self
            .transport
            .connection_info(connection)
            .map(|info| info.description)
            .filter(|description| !description.is_empty())
            .unwrap_or_else(|| connection.to_string());
        let client = ClientInfo::new(connection, description);

        if self.shared.registry.insert(client.clone()) {
            tracing::info!("Client connected: {}", client);
            self.shared.callbacks.dispatch_client_connected(&client);
        }
    }

    fn shutdown(&self, listen_socket: ListenHandle, poll_group: PollGroupHandle) {
        tracing::info!("Closing connections...");
        for client in self.shared.registry.drain() {
            self.transport
                .close_connection(client.connection, Some(SHUTDOWN_REASON), true);
        }
        self.transport.close_listen_socket(listen_socket);
        self.transport.destroy_poll_group(poll_group);
        tracing::info!("Server on port {} stopped", self.port);
    }
}
