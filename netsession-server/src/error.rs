//! Error types for server operations.

use netsession_transport::{ConnectionHandle, ResultCode, TransportError};
use thiserror::Error;

/// Error type for server operations.
///
/// `TransportInit`, `Listen`, `PollGroupCreate` and `Receive` stop the poll
/// loop. `Accept` and `PollGroupAssign` only drop the affected connection.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The transport provider could not be initialised.
    #[error(transparent)]
    TransportInit(TransportError),

    /// The listen socket could not be created.
    #[error(transparent)]
    Listen(TransportError),

    /// The poll group could not be created.
    #[error(transparent)]
    PollGroupCreate(TransportError),

    /// An incoming connection could not be accepted.
    #[error("failed to accept connection {connection}: {code}")]
    Accept {
        /// The rejected connection.
        connection: ConnectionHandle,
        /// Result reported by the provider.
        code: ResultCode,
    },

    /// An accepted connection could not be added to the poll group.
    #[error("failed to set poll group for connection {connection}")]
    PollGroupAssign {
        /// The affected connection.
        connection: ConnectionHandle,
    },

    /// Receiving from the poll group failed.
    #[error("error checking for messages: {0}")]
    Receive(#[source] TransportError),

    /// The poll thread could not be started.
    #[error(transparent)]
    Spawn(#[from] netsession_core::CoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listen_error_display() {
        let err = ServerError::Listen(TransportError::listen(27020, "port already in use"));
        assert_eq!(
            err.to_string(),
            "failed to listen on port 27020: port already in use"
        );
    }

    #[test]
    fn test_accept_error_display() {
        let err = ServerError::Accept {
            connection: ConnectionHandle::from_raw(4),
            code: ResultCode::InvalidState,
        };
        assert!(err.to_string().starts_with("failed to accept connection conn#4"));
    }
}
