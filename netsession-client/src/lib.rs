//! # netsession Client
//!
//! Client side of a netsession connection.
//!
//! This crate provides:
//! - Client builder with poll-loop configuration
//! - Connection status tracking (`Disconnected`, `Connecting`, `Connected`,
//!   `FailedToConnect`) with a human-readable debug message
//! - A background poll loop that dispatches data, connected and disconnected
//!   callbacks
//! - A cloneable handle for sending from other threads

pub mod builder;
pub mod error;
pub mod session;
pub mod status;

pub use builder::{Client, ClientBuilder, ClientConfig, ClientHandle};
pub use error::ClientError;
pub use session::{ClientCallbacks, ConnectedCallback, DataReceivedCallback, DisconnectedCallback};
pub use status::{ConnectionStatus, StatusTracker};
