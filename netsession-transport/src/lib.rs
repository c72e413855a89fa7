//! # netsession Transport
//!
//! The transport provider contract and its in-process implementation.
//!
//! This crate provides:
//! - [`TransportProvider`] - the interface sessions use to move bytes
//! - [`types`] - connection/listen/poll-group handles, states and messages
//! - [`notify`] - per-instance status notification channels
//! - [`loopback`] - [`LoopbackTransport`], an in-process provider

pub mod error;
pub mod loopback;
pub mod notify;
pub mod provider;
pub mod types;

pub use error::TransportError;
pub use loopback::{LoopbackFaults, LoopbackTransport, MAX_MESSAGE_SIZE};
pub use notify::{StatusNotifier, StatusReceiver, status_channel};
pub use provider::TransportProvider;
pub use types::{
    ConnectionHandle, ConnectionInfo, ConnectionState, ConnectionStatusChanged, ListenHandle,
    Message, PollGroupHandle, ReceiveSource, ResultCode, SendReliability,
};
