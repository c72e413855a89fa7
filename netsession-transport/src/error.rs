//! Error types for transport operations.

use crate::types::{ConnectionHandle, ListenHandle, PollGroupHandle};
use std::net::SocketAddr;
use thiserror::Error;

/// Error type for transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The networking subsystem could not be initialised.
    #[error("transport initialization failed: {message}")]
    Init {
        /// Error message.
        message: String,
    },

    /// The provider was used before `init` succeeded.
    #[error("transport not initialized")]
    NotInitialized,

    /// Address string could not be parsed.
    #[error("invalid address - could not parse {address}")]
    AddressParse {
        /// The offending address string.
        address: String,
    },

    /// Outgoing connection could not be created.
    #[error("failed to create connection to {addr}: {message}")]
    Connect {
        /// Target address.
        addr: SocketAddr,
        /// Error message.
        message: String,
    },

    /// Listen socket could not be created.
    #[error("failed to listen on port {port}: {message}")]
    Listen {
        /// Requested port.
        port: u16,
        /// Error message.
        message: String,
    },

    /// Poll group could not be created.
    #[error("failed to create poll group: {message}")]
    PollGroup {
        /// Error message.
        message: String,
    },

    /// Unknown or destroyed connection handle.
    #[error("invalid connection handle {0}")]
    InvalidConnection(ConnectionHandle),

    /// Unknown or closed listen socket.
    #[error("invalid listen socket {0}")]
    InvalidListenSocket(ListenHandle),

    /// Unknown or destroyed poll group.
    #[error("invalid poll group {0}")]
    InvalidPollGroup(PollGroupHandle),
}

impl TransportError {
    /// Creates an initialization error.
    pub fn init(message: impl Into<String>) -> Self {
        Self::Init {
            message: message.into(),
        }
    }

    /// Creates an address parse error.
    pub fn address_parse(address: impl Into<String>) -> Self {
        Self::AddressParse {
            address: address.into(),
        }
    }

    /// Creates a connect error.
    pub fn connect(addr: SocketAddr, message: impl Into<String>) -> Self {
        Self::Connect {
            addr,
            message: message.into(),
        }
    }

    /// Creates a listen error.
    pub fn listen(port: u16, message: impl Into<String>) -> Self {
        Self::Listen {
            port,
            message: message.into(),
        }
    }

    /// Creates a poll group error.
    pub fn poll_group(message: impl Into<String>) -> Self {
        Self::PollGroup {
            message: message.into(),
        }
    }
}
