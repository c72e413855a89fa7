//! # netsession
//!
//! Callback-driven client/server sessions over a pluggable datagram
//! transport.
//!
//! A [`Client`](client::Client) holds one connection to a server; a
//! [`Server`](server::Server) accepts any number of clients and tracks them in
//! a registry. Each instance runs its own background poll thread that pulls
//! incoming messages, processes connection status changes and invokes the
//! user's callbacks. Transports implement
//! [`TransportProvider`](transport::TransportProvider); the in-process
//! [`LoopbackTransport`](transport::LoopbackTransport) ships with the crate.
//!
//! ## Quick Start
//!
//! ```no_run
//! use netsession::prelude::*;
//! use std::sync::Arc;
//!
//! let transport = Arc::new(LoopbackTransport::new());
//!
//! let mut server = Server::new(Arc::clone(&transport));
//! let handle = server.handle();
//! server.set_on_data_received(move |client, buffer| {
//!     handle.broadcast(buffer, Some(client), SendReliability::Reliable);
//! });
//! server.start();
//!
//! let mut client = Client::new(transport);
//! client.set_on_connected(|| println!("connected"));
//! client.connect("127.0.0.1:27020");
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`] - Borrowed buffers, callback slots, the poll worker
//! - [`transport`] - Transport provider contract and loopback provider
//! - [`client`] - Client-side session engine
//! - [`server`] - Server-side session engine

pub mod prelude;

/// Buffers, callback slots and the background poll worker.
pub mod core {
    pub use netsession_core::*;
}

/// Transport provider contract and the loopback provider.
pub mod transport {
    pub use netsession_transport::*;
}

/// Client-side session engine.
pub mod client {
    pub use netsession_client::*;
}

/// Server-side session engine.
pub mod server {
    pub use netsession_server::*;
}
