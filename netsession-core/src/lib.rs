//! # netsession Core
//!
//! Building blocks shared by the client and server session engines.
//!
//! This crate provides:
//! - [`Buffer`] borrowed view over one payload
//! - [`CallbackSlot`] optional, replaceable user handlers
//! - [`PollWorker`] background poll-loop thread with cooperative stop
//! - Error types for core operations

pub mod buffer;
pub mod callback;
pub mod error;
pub mod worker;

pub use buffer::Buffer;
pub use callback::CallbackSlot;
pub use error::{CoreError, Result};
pub use worker::{DEFAULT_POLL_INTERVAL, DEFAULT_RECEIVE_BATCH, PollConfig, PollWorker, RunFlag};
