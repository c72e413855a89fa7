//! In-process transport provider.
//!
//! [`LoopbackTransport`] connects sessions living in the same process. Listen
//! sockets are keyed by port only, every connection is a pair of linked
//! endpoints, and a send appends straight to the peer's inbox, so delivery is
//! immediate, ordered and lossless for both reliability modes.
//!
//! Notifications are queued and only handed to the session notifiers when
//! [`TransportProvider::run_callbacks`] is called, matching how real
//! providers defer status callbacks to the polling thread.
//!
//! Failures can be injected with [`LoopbackFaults`] to exercise error paths.

use crate::error::TransportError;
use crate::notify::StatusNotifier;
use crate::provider::TransportProvider;
use crate::types::{
    ConnectionHandle, ConnectionInfo, ConnectionState, ConnectionStatusChanged, ListenHandle,
    Message, PollGroupHandle, ReceiveSource, ResultCode, SendReliability,
};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Largest payload accepted by [`LoopbackTransport::send`].
pub const MAX_MESSAGE_SIZE: usize = 512 * 1024;

const LOOPBACK_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
const EPHEMERAL_PORT_BASE: u16 = 40000;

/// Failures to inject into a [`LoopbackTransport`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopbackFaults {
    /// Makes `init` fail with this message.
    pub init_failure: Option<String>,
    /// Makes `connect` fail to create the connection.
    pub fail_connect: bool,
    /// Makes `create_poll_group` fail.
    pub fail_poll_group_create: bool,
    /// Makes `accept_connection` return `InvalidState`.
    pub reject_accept: bool,
    /// Makes `set_poll_group` return false.
    pub fail_poll_group_assign: bool,
    /// Makes every `receive` call fail.
    pub fail_receive: bool,
}

#[derive(Debug)]
struct Endpoint {
    state: ConnectionState,
    peer: Option<ConnectionHandle>,
    notifier: StatusNotifier,
    listen_socket: Option<ListenHandle>,
    remote_addr: SocketAddr,
    poll_group: Option<PollGroupHandle>,
    inbox: VecDeque<Message>,
    next_message_number: u64,
    sent: u64,
    end_debug: String,
}

#[derive(Debug)]
struct Listener {
    port: u16,
    notifier: StatusNotifier,
}

#[derive(Debug, Default)]
struct LoopbackState {
    initialized: bool,
    next_raw: u32,
    faults: LoopbackFaults,
    listeners: HashMap<ListenHandle, Listener>,
    endpoints: HashMap<ConnectionHandle, Endpoint>,
    poll_groups: HashSet<PollGroupHandle>,
    pending: Vec<(StatusNotifier, ConnectionStatusChanged)>,
}

impl LoopbackState {
    fn allocate(&mut self) -> u32 {
        self.next_raw = self.next_raw.wrapping_add(1).max(1);
        self.next_raw
    }

    fn info(&self, connection: ConnectionHandle) -> Option<ConnectionInfo> {
        self.endpoints.get(&connection).map(|endpoint| ConnectionInfo {
            state: endpoint.state,
            listen_socket: endpoint.listen_socket,
            remote_addr: Some(endpoint.remote_addr),
            description: format!("#{} loopback {}", connection.raw(), endpoint.remote_addr),
            end_debug: endpoint.end_debug.clone(),
        })
    }

    /// Moves an endpoint to `new_state` and queues the notification.
    fn transition(
        &mut self,
        connection: ConnectionHandle,
        new_state: ConnectionState,
        end_debug: Option<&str>,
    ) {
        let Some(endpoint) = self.endpoints.get_mut(&connection) else {
            return;
        };
        let old_state = endpoint.state;
        endpoint.state = new_state;
        if let Some(reason) = end_debug {
            endpoint.end_debug = reason.to_string();
        }
        let notifier = endpoint.notifier.clone();

        if let Some(info) = self.info(connection) {
            self.pending.push((
                notifier,
                ConnectionStatusChanged {
                    connection,
                    info,
                    old_state,
                },
            ));
        }
    }

    fn is_open(&self, connection: ConnectionHandle) -> bool {
        self.endpoints.get(&connection).is_some_and(|endpoint| {
            endpoint.state.is_connecting() || endpoint.state == ConnectionState::Connected
        })
    }

    fn close(&mut self, connection: ConnectionHandle, reason: Option<&str>) -> bool {
        let Some(endpoint) = self.endpoints.remove(&connection) else {
            return false;
        };
        if let Some(peer) = endpoint.peer
            && self.is_open(peer)
        {
            self.transition(
                peer,
                ConnectionState::ClosedByPeer,
                Some(reason.unwrap_or("closed by peer")),
            );
        }
        true
    }
}

/// In-process [`TransportProvider`].
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    state: Mutex<LoopbackState>,
}

impl LoopbackTransport {
    /// Creates an uninitialised provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the injected faults.
    pub fn set_faults(&self, faults: LoopbackFaults) {
        self.state.lock().faults = faults;
    }

    /// Returns true once `init` succeeded.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    /// Simulates a locally detected problem (timeout, route loss) on a
    /// connection. Both ends move to `ProblemDetectedLocally`.
    ///
    /// # Returns
    /// `false` if the connection is unknown or already closed.
    pub fn sever(&self, connection: ConnectionHandle, reason: &str) -> bool {
        let mut state = self.state.lock();
        if !state.is_open(connection) {
            return false;
        }
        let peer = state.endpoints.get(&connection).and_then(|e| e.peer);
        state.transition(
            connection,
            ConnectionState::ProblemDetectedLocally,
            Some(reason),
        );
        if let Some(peer) = peer
            && state.is_open(peer)
        {
            state.transition(peer, ConnectionState::ProblemDetectedLocally, Some(reason));
        }
        true
    }

    /// Returns how many messages were successfully sent from `connection`.
    ///
    /// The count lives on the endpoint, so it reads 0 once the connection is
    /// closed.
    #[must_use]
    pub fn messages_sent_on(&self, connection: ConnectionHandle) -> u64 {
        self.state
            .lock()
            .endpoints
            .get(&connection)
            .map_or(0, |endpoint| endpoint.sent)
    }

    /// Returns the peer endpoint linked to `connection`.
    #[must_use]
    pub fn peer_of(&self, connection: ConnectionHandle) -> Option<ConnectionHandle> {
        self.state
            .lock()
            .endpoints
            .get(&connection)
            .and_then(|endpoint| endpoint.peer)
    }

    /// Returns the number of live connection endpoints.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.state.lock().endpoints.len()
    }

    /// Returns the number of open listen sockets.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    /// Returns the number of live poll groups.
    #[must_use]
    pub fn poll_group_count(&self) -> usize {
        self.state.lock().poll_groups.len()
    }
}

impl TransportProvider for LoopbackTransport {
    fn init(&self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if let Some(message) = &state.faults.init_failure {
            return Err(TransportError::init(message.clone()));
        }
        state.initialized = true;
        Ok(())
    }

    fn resolve_address(&self, address: &str) -> Result<SocketAddr, TransportError> {
        let trimmed = address.trim();
        if let Ok(addr) = trimmed.parse::<SocketAddr>() {
            return Ok(addr);
        }
        trimmed
            .parse::<IpAddr>()
            .map(|ip| SocketAddr::new(ip, 0))
            .map_err(|_| TransportError::address_parse(address))
    }

    fn connect(
        &self,
        addr: SocketAddr,
        notifier: StatusNotifier,
    ) -> Result<ConnectionHandle, TransportError> {
        let mut state = self.state.lock();
        if !state.initialized {
            return Err(TransportError::connect(addr, "transport not initialized"));
        }
        if state.faults.fail_connect {
            return Err(TransportError::connect(addr, "connection refused by provider"));
        }

        let client = ConnectionHandle::from_raw(state.allocate());
        let client_addr = SocketAddr::new(
            LOOPBACK_IP,
            EPHEMERAL_PORT_BASE.wrapping_add(client.raw() as u16),
        );
        state.endpoints.insert(
            client,
            Endpoint {
                state: ConnectionState::None,
                peer: None,
                notifier,
                listen_socket: None,
                remote_addr: addr,
                poll_group: None,
                inbox: VecDeque::new(),
                next_message_number: 0,
                sent: 0,
                end_debug: String::new(),
            },
        );
        state.transition(client, ConnectionState::Connecting, None);

        let listener = state
            .listeners
            .iter()
            .find(|(_, listener)| listener.port == addr.port())
            .map(|(handle, listener)| (*handle, listener.notifier.clone()));

        match listener {
            Some((listen_socket, listener_notifier)) => {
                let server = ConnectionHandle::from_raw(state.allocate());
                state.endpoints.insert(
                    server,
                    Endpoint {
                        state: ConnectionState::None,
                        peer: Some(client),
                        notifier: listener_notifier,
                        listen_socket: Some(listen_socket),
                        remote_addr: client_addr,
                        poll_group: None,
                        inbox: VecDeque::new(),
                        next_message_number: 0,
                        sent: 0,
                        end_debug: String::new(),
                    },
                );
                if let Some(endpoint) = state.endpoints.get_mut(&client) {
                    endpoint.peer = Some(server);
                }
                state.transition(server, ConnectionState::Connecting, None);
            }
            None => {
                let reason = format!("no listener on {}", addr);
                state.transition(
                    client,
                    ConnectionState::ProblemDetectedLocally,
                    Some(&reason),
                );
            }
        }

        tracing::debug!("Loopback connection {} to {}", client, addr);
        Ok(client)
    }

    fn listen(&self, port: u16, notifier: StatusNotifier) -> Result<ListenHandle, TransportError> {
        let mut state = self.state.lock();
        if !state.initialized {
            return Err(TransportError::listen(port, "transport not initialized"));
        }
        if state.listeners.values().any(|listener| listener.port == port) {
            return Err(TransportError::listen(port, "port already in use"));
        }

        let handle = ListenHandle::from_raw(state.allocate());
        state.listeners.insert(handle, Listener { port, notifier });
        Ok(handle)
    }

    fn close_listen_socket(&self, socket: ListenHandle) -> bool {
        let mut state = self.state.lock();
        if state.listeners.remove(&socket).is_none() {
            return false;
        }

        let attached: Vec<ConnectionHandle> = state
            .endpoints
            .iter()
            .filter(|(_, endpoint)| endpoint.listen_socket == Some(socket))
            .map(|(handle, _)| *handle)
            .collect();
        for connection in attached {
            state.close(connection, Some("listen socket closed"));
        }
        true
    }

    fn create_poll_group(&self) -> Result<PollGroupHandle, TransportError> {
        let mut state = self.state.lock();
        if !state.initialized {
            return Err(TransportError::poll_group("transport not initialized"));
        }
        if state.faults.fail_poll_group_create {
            return Err(TransportError::poll_group("poll group limit reached"));
        }

        let group = PollGroupHandle::from_raw(state.allocate());
        state.poll_groups.insert(group);
        Ok(group)
    }

    fn destroy_poll_group(&self, group: PollGroupHandle) -> bool {
        let mut state = self.state.lock();
        if !state.poll_groups.remove(&group) {
            return false;
        }
        for endpoint in state.endpoints.values_mut() {
            if endpoint.poll_group == Some(group) {
                endpoint.poll_group = None;
            }
        }
        true
    }

    fn send(
        &self,
        connection: ConnectionHandle,
        data: &[u8],
        _reliability: SendReliability,
    ) -> ResultCode {
        if data.len() > MAX_MESSAGE_SIZE {
            return ResultCode::LimitExceeded;
        }

        let mut state = self.state.lock();
        let (peer, message_number) = match state.endpoints.get_mut(&connection) {
            None => return ResultCode::NoConnection,
            Some(endpoint) if endpoint.state != ConnectionState::Connected => {
                return ResultCode::InvalidState;
            }
            Some(endpoint) => {
                endpoint.next_message_number += 1;
                (endpoint.peer, endpoint.next_message_number)
            }
        };

        let Some(peer) = peer else {
            return ResultCode::NoConnection;
        };
        let Some(receiver) = state.endpoints.get_mut(&peer) else {
            return ResultCode::NoConnection;
        };
        // Messages are tagged with the receiving endpoint's handle.
        receiver.inbox.push_back(Message {
            connection: peer,
            data: Bytes::copy_from_slice(data),
            message_number,
        });
        if let Some(sender) = state.endpoints.get_mut(&connection) {
            sender.sent += 1;
        }
        ResultCode::Ok
    }

    fn receive(&self, source: ReceiveSource, max: usize) -> Result<Vec<Message>, TransportError> {
        let mut state = self.state.lock();
        let max = max.max(1);

        match source {
            ReceiveSource::Connection(connection) => {
                if state.faults.fail_receive {
                    return Err(TransportError::InvalidConnection(connection));
                }
                let endpoint = state
                    .endpoints
                    .get_mut(&connection)
                    .ok_or(TransportError::InvalidConnection(connection))?;
                let count = endpoint.inbox.len().min(max);
                Ok(endpoint.inbox.drain(..count).collect())
            }
            ReceiveSource::PollGroup(group) => {
                if state.faults.fail_receive || !state.poll_groups.contains(&group) {
                    return Err(TransportError::InvalidPollGroup(group));
                }

                let mut members: Vec<ConnectionHandle> = state
                    .endpoints
                    .iter()
                    .filter(|(_, endpoint)| endpoint.poll_group == Some(group))
                    .map(|(handle, _)| *handle)
                    .collect();
                members.sort_unstable();

                let mut messages = Vec::new();
                for member in members {
                    if messages.len() >= max {
                        break;
                    }
                    if let Some(endpoint) = state.endpoints.get_mut(&member) {
                        let count = endpoint.inbox.len().min(max - messages.len());
                        messages.extend(endpoint.inbox.drain(..count));
                    }
                }
                Ok(messages)
            }
        }
    }

    fn accept_connection(&self, connection: ConnectionHandle) -> ResultCode {
        let mut state = self.state.lock();
        let peer = match state.endpoints.get(&connection) {
            None => return ResultCode::NoConnection,
            Some(endpoint)
                if endpoint.listen_socket.is_none()
                    || endpoint.state != ConnectionState::Connecting =>
            {
                return ResultCode::InvalidState;
            }
            Some(endpoint) => endpoint.peer,
        };
        if state.faults.reject_accept {
            return ResultCode::InvalidState;
        }

        state.transition(connection, ConnectionState::Connected, None);
        if let Some(peer) = peer
            && state
                .endpoints
                .get(&peer)
                .is_some_and(|endpoint| endpoint.state.is_connecting())
        {
            state.transition(peer, ConnectionState::Connected, None);
        }
        ResultCode::Ok
    }

    fn set_poll_group(&self, connection: ConnectionHandle, group: PollGroupHandle) -> bool {
        let mut state = self.state.lock();
        if state.faults.fail_poll_group_assign || !state.poll_groups.contains(&group) {
            return false;
        }
        match state.endpoints.get_mut(&connection) {
            Some(endpoint) => {
                endpoint.poll_group = Some(group);
                true
            }
            None => false,
        }
    }

    fn close_connection(
        &self,
        connection: ConnectionHandle,
        reason: Option<&str>,
        _linger: bool,
    ) -> bool {
        // Sends are delivered synchronously, so lingering has nothing to flush.
        self.state.lock().close(connection, reason)
    }

    fn run_callbacks(&self) {
        let pending = std::mem::take(&mut self.state.lock().pending);
        for (notifier, change) in pending {
            notifier.notify(change);
        }
    }

    fn connection_info(&self, connection: ConnectionHandle) -> Option<ConnectionInfo> {
        self.state.lock().info(connection)
    }
}
