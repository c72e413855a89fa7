//! # netsession Server
//!
//! Server side of netsession connections.
//!
//! This crate provides:
//! - Server builder with port and poll-loop configuration
//! - Registry of connected clients with consistent snapshots
//! - Callback dispatch for connect, disconnect and data events
//! - Unicast and broadcast sending, also through a cloneable handle

pub mod builder;
pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod session;

pub use builder::{DEFAULT_PORT, Server, ServerBuilder, ServerConfig, ServerHandle};
pub use dispatcher::{
    ClientConnectedCallback, ClientDisconnectedCallback, ServerCallbacks, ServerDataCallback,
};
pub use error::ServerError;
pub use registry::{ClientInfo, ClientRegistry};
pub use session::SHUTDOWN_REASON;
