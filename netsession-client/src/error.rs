//! Error types for client operations.
//!
//! None of these cross the poll-loop boundary: the loop logs them and records
//! their text as the client's debug message.

use thiserror::Error;

/// Error type for client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport provider could not be initialised.
    #[error(transparent)]
    TransportInit(netsession_transport::TransportError),

    /// The server address could not be parsed.
    #[error(transparent)]
    AddressParse(netsession_transport::TransportError),

    /// The outgoing connection could not be created.
    #[error(transparent)]
    ConnectionCreate(netsession_transport::TransportError),

    /// Receiving from the connection failed.
    #[error("error checking for messages: {0}")]
    Receive(#[source] netsession_transport::TransportError),

    /// The poll thread could not be started.
    #[error(transparent)]
    Spawn(#[from] netsession_core::CoreError),
}
