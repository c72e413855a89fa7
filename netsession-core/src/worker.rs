//! Background poll-loop thread management.
//!
//! Every client or server instance owns exactly one [`PollWorker`]. The
//! worker runs the instance's loop body on a dedicated, named OS thread and
//! exposes a shared [`RunFlag`] that the loop checks at the top of each
//! iteration. Stopping is cooperative: [`PollWorker::stop`] clears the flag and
//! joins, so it returns within roughly one poll interval.

use crate::error::CoreError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Default delay between two poll-loop iterations.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Default number of messages pulled per receive call.
pub const DEFAULT_RECEIVE_BATCH: usize = 1;

/// Poll-loop cadence settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Sleep between iterations.
    pub interval: Duration,
    /// Maximum messages requested from the transport per receive call.
    pub receive_batch: usize,
    /// Name given to the background thread.
    pub thread_name: String,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            receive_batch: DEFAULT_RECEIVE_BATCH,
            thread_name: "netsession-poll".to_string(),
        }
    }
}

impl PollConfig {
    /// Creates a config with the given thread name and default cadence.
    #[must_use]
    pub fn named(thread_name: impl Into<String>) -> Self {
        Self {
            thread_name: thread_name.into(),
            ..Default::default()
        }
    }

    /// Sets the sleep between iterations.
    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the receive batch size. Zero is treated as one.
    #[must_use]
    pub fn receive_batch(mut self, batch: usize) -> Self {
        self.receive_batch = batch.max(1);
        self
    }
}

/// Shared run flag checked by the poll loop.
#[derive(Debug, Clone, Default)]
pub struct RunFlag {
    inner: Arc<AtomicBool>,
}

impl RunFlag {
    /// Creates a cleared flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true while the loop should keep running.
    #[inline]
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }

    /// Marks the loop as running.
    pub fn set(&self) {
        self.inner.store(true, Ordering::Release);
    }

    /// Asks the loop to exit at its next check.
    pub fn clear(&self) {
        self.inner.store(false, Ordering::Release);
    }
}

/// Owner of one background poll thread.
#[derive(Debug)]
pub struct PollWorker {
    running: RunFlag,
    thread: Option<JoinHandle<()>>,
}

impl PollWorker {
    /// Creates an idle worker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            running: RunFlag::new(),
            thread: None,
        }
    }

    /// Returns a clone of the run flag shared with the loop.
    #[must_use]
    pub fn run_flag(&self) -> RunFlag {
        self.running.clone()
    }

    /// Returns true while the loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.is_set()
    }

    /// Starts `body` on a new thread unless a loop is already running.
    ///
    /// A previous loop that exited on its own is joined first. The run flag
    /// is set before the thread starts, so `is_running` is true as soon as
    /// this returns `Ok(true)`.
    ///
    /// # Returns
    /// `Ok(false)` if a loop was already running and nothing was spawned.
    ///
    /// # Errors
    /// Returns `CoreError::Spawn` if the OS refuses to create the thread; the
    /// run flag is cleared again in that case.
    pub fn spawn<F>(&mut self, thread_name: &str, body: F) -> Result<bool, CoreError>
    where
        F: FnOnce(RunFlag) + Send + 'static,
    {
        if self.running.is_set() {
            return Ok(false);
        }
        self.join();

        self.running.set();
        let flag = self.running.clone();
        let spawned = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || body(flag));

        match spawned {
            Ok(handle) => {
                self.thread = Some(handle);
                Ok(true)
            }
            Err(e) => {
                self.running.clear();
                Err(CoreError::Spawn {
                    thread_name: thread_name.to_string(),
                    source: e,
                })
            }
        }
    }

    /// Clears the run flag and blocks until the loop thread has exited.
    pub fn stop(&mut self) {
        self.running.clear();
        self.join();
    }

    /// Blocks until the loop thread (if any) has exited.
    pub fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            if handle.thread().id() == thread::current().id() {
                // Joining ourselves would deadlock; the loop exits on its own.
                tracing::warn!("Poll loop asked to join itself, skipping join");
                return;
            }
            if handle.join().is_err() {
                tracing::error!("Poll loop thread panicked");
            }
        }
    }

    #[cfg(test)]
    fn has_thread(&self) -> bool {
        self.thread.is_some()
    }
}

impl Default for PollWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PollWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
