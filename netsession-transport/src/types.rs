//! Handles, states and records exchanged with a transport provider.

use bytes::Bytes;
use std::fmt;
use std::net::SocketAddr;

macro_rules! opaque_handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// Wraps a raw provider-issued value.
            #[must_use]
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            /// Returns the raw provider-issued value.
            #[must_use]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

opaque_handle!(
    /// Opaque identifier of one logical peer-to-peer connection.
    ConnectionHandle,
    "conn"
);
opaque_handle!(
    /// Opaque identifier of a listen socket.
    ListenHandle,
    "listen"
);
opaque_handle!(
    /// Opaque identifier of a poll group.
    PollGroupHandle,
    "pollgroup"
);

/// Transport-level state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No connection, or the handle was destroyed.
    #[default]
    None,
    /// Handshake in progress. Incoming connections wait here until accepted.
    Connecting,
    /// Relayed connection looking for a route.
    FindingRoute,
    /// Connection established.
    Connected,
    /// The remote side closed the connection.
    ClosedByPeer,
    /// The local side detected a problem (timeout, unreachable peer...).
    ProblemDetectedLocally,
}

impl ConnectionState {
    /// Returns true for the two terminal "connection is gone" states.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::ClosedByPeer | Self::ProblemDetectedLocally)
    }

    /// Returns true while the connection is being established.
    #[must_use]
    pub const fn is_connecting(self) -> bool {
        matches!(self, Self::Connecting | Self::FindingRoute)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Connecting => "connecting",
            Self::FindingRoute => "finding-route",
            Self::Connected => "connected",
            Self::ClosedByPeer => "closed-by-peer",
            Self::ProblemDetectedLocally => "problem-detected-locally",
        };
        f.write_str(name)
    }
}

/// Snapshot of a connection as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionInfo {
    /// Current state.
    pub state: ConnectionState,
    /// Listen socket the connection arrived on, for incoming connections.
    pub listen_socket: Option<ListenHandle>,
    /// Remote address, when known.
    pub remote_addr: Option<SocketAddr>,
    /// Human readable description, suitable for logs.
    pub description: String,
    /// Reason text for a closed connection. Empty while open.
    pub end_debug: String,
}

/// Notification that a connection changed state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatusChanged {
    /// Connection that changed.
    pub connection: ConnectionHandle,
    /// Connection info after the change.
    pub info: ConnectionInfo,
    /// State before the change.
    pub old_state: ConnectionState,
}

/// Provider-defined outcome of a send or accept call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    /// Success.
    Ok,
    /// Generic failure.
    Fail,
    /// The handle does not name a live connection.
    NoConnection,
    /// An argument was rejected.
    InvalidParam,
    /// The connection is not in a state that allows the operation.
    InvalidState,
    /// A size or queue limit was exceeded.
    LimitExceeded,
    /// The request was dropped without being attempted.
    Ignored,
}

impl ResultCode {
    /// Returns true for [`ResultCode::Ok`].
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "ok",
            Self::Fail => "fail",
            Self::NoConnection => "no connection",
            Self::InvalidParam => "invalid parameter",
            Self::InvalidState => "invalid state",
            Self::LimitExceeded => "limit exceeded",
            Self::Ignored => "ignored",
        };
        f.write_str(name)
    }
}

/// Delivery guarantee requested for one send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SendReliability {
    /// Retransmitted until acknowledged.
    #[default]
    Reliable,
    /// Fire and forget.
    Unreliable,
}

impl From<bool> for SendReliability {
    fn from(reliable: bool) -> Self {
        if reliable {
            Self::Reliable
        } else {
            Self::Unreliable
        }
    }
}

/// Where a receive call pulls messages from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiveSource {
    /// A single connection.
    Connection(ConnectionHandle),
    /// Every connection assigned to a poll group.
    PollGroup(PollGroupHandle),
}

/// One inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Connection the message arrived on.
    pub connection: ConnectionHandle,
    /// Payload.
    pub data: Bytes,
    /// Per-connection sequence number assigned by the sender side.
    pub message_number: u64,
}

impl Message {
    /// Returns the payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
