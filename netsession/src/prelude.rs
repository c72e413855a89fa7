//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and traits.
//!
//! ```
//! use netsession::prelude::*;
//! ```

// Core types
pub use netsession_core::{Buffer, CoreError, PollConfig};

// Transport types
pub use netsession_transport::{
    ConnectionHandle, ConnectionState, LoopbackFaults, LoopbackTransport, ResultCode,
    SendReliability, TransportError, TransportProvider,
};

// Server types
pub use netsession_server::{
    ClientInfo, DEFAULT_PORT, SHUTDOWN_REASON, Server, ServerBuilder, ServerConfig, ServerError,
    ServerHandle,
};

// Client types
pub use netsession_client::{
    Client, ClientBuilder, ClientConfig, ClientError, ClientHandle, ConnectionStatus,
};
