//! The transport provider contract consumed by the session engines.
//!
//! A provider owns everything about moving bytes: handshakes,
//! retransmission, congestion control, address resolution. Sessions only
//! talk to it through this trait. Providers are shared between a session's
//! owner thread (for sends) and its poll thread, hence `Send + Sync` and
//! `&self` receivers everywhere.

use crate::error::TransportError;
use crate::notify::StatusNotifier;
use crate::types::{
    ConnectionHandle, ConnectionInfo, ListenHandle, Message, PollGroupHandle, ReceiveSource,
    ResultCode, SendReliability,
};
use std::net::SocketAddr;

/// Reliable/unreliable datagram transport used by clients and servers.
pub trait TransportProvider: Send + Sync + 'static {
    /// Initialises the networking subsystem. Must be idempotent.
    ///
    /// # Errors
    /// Returns `TransportError::Init` if the subsystem cannot start.
    fn init(&self) -> Result<(), TransportError>;

    /// Parses an address string such as `"127.0.0.1:27020"`.
    ///
    /// # Errors
    /// Returns `TransportError::AddressParse` carrying the offending string.
    fn resolve_address(&self, address: &str) -> Result<SocketAddr, TransportError>;

    /// Starts an outgoing connection.
    ///
    /// Progress is reported through `notifier` once `run_callbacks` runs.
    ///
    /// # Errors
    /// Returns an error if the connection object cannot be created at all.
    /// Failing to reach the peer is reported asynchronously instead.
    fn connect(
        &self,
        addr: SocketAddr,
        notifier: StatusNotifier,
    ) -> Result<ConnectionHandle, TransportError>;

    /// Opens a listen socket on `port`. Incoming connections are reported
    /// through `notifier` in the `Connecting` state.
    ///
    /// # Errors
    /// Returns `TransportError::Listen` if the socket cannot be created.
    fn listen(&self, port: u16, notifier: StatusNotifier) -> Result<ListenHandle, TransportError>;

    /// Closes a listen socket and every connection still attached to it.
    fn close_listen_socket(&self, socket: ListenHandle) -> bool;

    /// Creates a poll group.
    ///
    /// # Errors
    /// Returns `TransportError::PollGroup` if the group cannot be created.
    fn create_poll_group(&self) -> Result<PollGroupHandle, TransportError>;

    /// Destroys a poll group. Connections in it are left open.
    fn destroy_poll_group(&self, group: PollGroupHandle) -> bool;

    /// Sends one payload on a connection.
    fn send(
        &self,
        connection: ConnectionHandle,
        data: &[u8],
        reliability: SendReliability,
    ) -> ResultCode;

    /// Pulls up to `max` pending messages without blocking.
    ///
    /// # Errors
    /// Returns an error if the source handle is invalid.
    fn receive(&self, source: ReceiveSource, max: usize) -> Result<Vec<Message>, TransportError>;

    /// Accepts an incoming connection that is waiting in `Connecting`.
    fn accept_connection(&self, connection: ConnectionHandle) -> ResultCode;

    /// Assigns a connection to a poll group.
    fn set_poll_group(&self, connection: ConnectionHandle, group: PollGroupHandle) -> bool;

    /// Closes a connection and invalidates its handle. The peer is notified
    /// with `reason`. With `linger`, queued reliable data is flushed first.
    fn close_connection(
        &self,
        connection: ConnectionHandle,
        reason: Option<&str>,
        linger: bool,
    ) -> bool;

    /// Delivers every queued status notification to its notifier.
    fn run_callbacks(&self);

    /// Returns the current info for a connection.
    fn connection_info(&self, connection: ConnectionHandle) -> Option<ConnectionInfo>;
}
