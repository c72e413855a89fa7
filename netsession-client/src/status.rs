//! Client connection state machine.
//!
//! ```text
//! Disconnected ──connect──▶ Connecting ──Connected──▶ Connected
//!       ▲                       │                         │
//!       │                       ▼                         │
//!       │               FailedToConnect                   │
//!       └─────────────── closed / stopped ◀───────────────┘
//! ```
//!
//! The tracker is written only by the client's poll thread (plus the
//! synchronous `Connecting` step in `Client::connect`) and read from anywhere.

use netsession_transport::ConnectionHandle;
use parking_lot::RwLock;
use std::fmt;

/// Status of the client's single connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionStatus {
    /// Not connected. Initial state, and terminal after a close.
    #[default]
    Disconnected,
    /// Connection requested, waiting for the transport.
    Connecting,
    /// Connection established.
    Connected,
    /// The connection could never be established.
    FailedToConnect,
}

impl ConnectionStatus {
    /// Returns true while a connection attempt or connection is live.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::FailedToConnect => "failed to connect",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
struct TrackerState {
    status: ConnectionStatus,
    debug_message: String,
    connection: Option<ConnectionHandle>,
}

/// Status, debug message and live connection handle of one client.
#[derive(Debug, Default)]
pub struct StatusTracker {
    inner: RwLock<TrackerState>,
}

impl StatusTracker {
    /// Creates a tracker in `Disconnected`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.inner.read().status
    }

    /// Returns the last debug message.
    #[must_use]
    pub fn debug_message(&self) -> String {
        self.inner.read().debug_message.clone()
    }

    /// Returns the live connection handle, if any.
    #[must_use]
    pub fn connection(&self) -> Option<ConnectionHandle> {
        self.inner.read().connection
    }

    /// Starts a new attempt: any non-active status moves to `Connecting` and
    /// the debug message is cleared.
    ///
    /// # Returns
    /// `false` if a connection is already active.
    pub fn begin_connecting(&self) -> bool {
        let mut state = self.inner.write();
        if state.status.is_active() {
            return false;
        }
        state.status = ConnectionStatus::Connecting;
        state.debug_message.clear();
        state.connection = None;
        true
    }

    /// Records the handle of the outgoing connection.
    pub fn attach(&self, connection: ConnectionHandle) {
        self.inner.write().connection = Some(connection);
    }

    /// Removes and returns the connection handle. Later sends report
    /// `NoConnection`.
    pub fn take_connection(&self) -> Option<ConnectionHandle> {
        self.inner.write().connection.take()
    }

    /// `Connecting → Connected`.
    ///
    /// # Returns
    /// `false` (and no change) from any other status.
    pub fn mark_connected(&self) -> bool {
        let mut state = self.inner.write();
        if state.status != ConnectionStatus::Connecting {
            tracing::warn!("Ignoring connected notification while {}", state.status);
            return false;
        }
        state.status = ConnectionStatus::Connected;
        true
    }

    /// Records a transport-reported closure.
    ///
    /// A connection that never left `Connecting` ends in `FailedToConnect`,
    /// an established one in `Disconnected`.
    ///
    /// # Returns
    /// The new status.
    pub fn mark_closed(&self, reason: &str) -> ConnectionStatus {
        let mut state = self.inner.write();
        state.status = match state.status {
            ConnectionStatus::Connecting => ConnectionStatus::FailedToConnect,
            ConnectionStatus::FailedToConnect => ConnectionStatus::FailedToConnect,
            ConnectionStatus::Connected | ConnectionStatus::Disconnected => {
                ConnectionStatus::Disconnected
            }
        };
        state.debug_message = reason.to_string();
        state.connection = None;
        state.status
    }

    /// Records a fatal failure while establishing the connection.
    pub fn mark_failed(&self, reason: &str) {
        let mut state = self.inner.write();
        state.status = ConnectionStatus::FailedToConnect;
        state.debug_message = reason.to_string();
        state.connection = None;
    }

    /// Overwrites the debug message without changing status.
    pub fn set_debug_message(&self, message: &str) {
        self.inner.write().debug_message = message.to_string();
    }

    /// Records a local shutdown: an active status becomes `Disconnected`,
    /// terminal statuses are kept.
    pub fn mark_stopped(&self) {
        let mut state = self.inner.write();
        if state.status.is_active() {
            state.status = ConnectionStatus::Disconnected;
        }
        state.connection = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let tracker = StatusTracker::new();
        assert_eq!(tracker.status(), ConnectionStatus::Disconnected);
        assert!(tracker.debug_message().is_empty());
        assert!(tracker.connection().is_none());
    }

    #[test]
    fn test_connect_then_established() {
        let tracker = StatusTracker::new();
        assert!(tracker.begin_connecting());
        assert_eq!(tracker.status(), ConnectionStatus::Connecting);

        tracker.attach(ConnectionHandle::from_raw(3));
        assert!(tracker.mark_connected());
        assert_eq!(tracker.status(), ConnectionStatus::Connected);
        assert_eq!(tracker.connection(), Some(ConnectionHandle::from_raw(3)));
    }

    #[test]
    fn test_connected_requires_connecting() {
        let tracker = StatusTracker::new();
        assert!(!tracker.mark_connected());
        assert_eq!(tracker.status(), ConnectionStatus::Disconnected);

        tracker.mark_failed("boom");
        assert!(!tracker.mark_connected());
        assert_eq!(tracker.status(), ConnectionStatus::FailedToConnect);
    }

    #[test]
    fn test_begin_connecting_rejected_while_active() {
        let tracker = StatusTracker::new();
        assert!(tracker.begin_connecting());
        assert!(!tracker.begin_connecting());

        tracker.mark_connected();
        assert!(!tracker.begin_connecting());
    }

    #[test]
    fn test_closed_while_connecting_is_failure() {
        let tracker = StatusTracker::new();
        tracker.begin_connecting();
        tracker.attach(ConnectionHandle::from_raw(1));

        let status = tracker.mark_closed("timed out");
        assert_eq!(status, ConnectionStatus::FailedToConnect);
        assert_eq!(tracker.debug_message(), "timed out");
        assert!(tracker.connection().is_none());
    }

    #[test]
    fn test_closed_after_connected_is_disconnect() {
        let tracker = StatusTracker::new();
        tracker.begin_connecting();
        tracker.mark_connected();

        assert_eq!(
            tracker.mark_closed("Server Shutdown"),
            ConnectionStatus::Disconnected
        );
        assert_eq!(tracker.debug_message(), "Server Shutdown");
    }

    #[test]
    fn test_retry_after_failure_clears_message() {
        let tracker = StatusTracker::new();
        tracker.begin_connecting();
        tracker.mark_failed("invalid address - could not parse x");

        assert!(tracker.begin_connecting());
        assert_eq!(tracker.status(), ConnectionStatus::Connecting);
        assert!(tracker.debug_message().is_empty());
    }

    #[test]
    fn test_stopped_keeps_terminal_status() {
        let tracker = StatusTracker::new();
        tracker.begin_connecting();
        tracker.mark_stopped();
        assert_eq!(tracker.status(), ConnectionStatus::Disconnected);

        tracker.begin_connecting();
        tracker.mark_failed("nope");
        tracker.mark_stopped();
        assert_eq!(tracker.status(), ConnectionStatus::FailedToConnect);
    }

    #[test]
    fn test_take_connection() {
        let tracker = StatusTracker::new();
        tracker.attach(ConnectionHandle::from_raw(8));
        assert_eq!(tracker.take_connection(), Some(ConnectionHandle::from_raw(8)));
        assert_eq!(tracker.take_connection(), None);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ConnectionStatus::FailedToConnect.to_string(), "failed to connect");
        assert!(ConnectionStatus::Connecting.is_active());
        assert!(!ConnectionStatus::FailedToConnect.is_active());
    }
}
