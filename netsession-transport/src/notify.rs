//! Per-instance delivery of connection status notifications.
//!
//! A session creates one channel with [`status_channel`], hands the
//! [`StatusNotifier`] to the provider when it connects or listens, and drains
//! the [`StatusReceiver`] on its own poll thread after calling
//! `run_callbacks`. Every session instance gets its own channel, so any number
//! of clients and servers can share one provider.

use crate::types::ConnectionStatusChanged;
use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};

/// Creates a notifier/receiver pair for one session instance.
#[must_use]
pub fn status_channel() -> (StatusNotifier, StatusReceiver) {
    let (tx, rx) = unbounded();
    (StatusNotifier { tx }, StatusReceiver { rx })
}

/// Provider-side handle used to deliver notifications to a session.
#[derive(Debug, Clone)]
pub struct StatusNotifier {
    tx: Sender<ConnectionStatusChanged>,
}

impl StatusNotifier {
    /// Delivers one notification.
    ///
    /// # Returns
    /// `false` if the session has gone away and the notification was dropped.
    pub fn notify(&self, change: ConnectionStatusChanged) -> bool {
        self.tx.send(change).is_ok()
    }
}

/// Session-side end of a notification channel.
#[derive(Debug)]
pub struct StatusReceiver {
    rx: Receiver<ConnectionStatusChanged>,
}

impl StatusReceiver {
    /// Returns the next pending notification without blocking.
    #[must_use]
    pub fn try_next(&self) -> Option<ConnectionStatusChanged> {
        match self.rx.try_recv() {
            Ok(change) => Some(change),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Drains every pending notification.
    pub fn drain(&self) -> impl Iterator<Item = ConnectionStatusChanged> + '_ {
        std::iter::from_fn(|| self.try_next())
    }

    /// Returns the number of pending notifications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Returns true if no notification is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
