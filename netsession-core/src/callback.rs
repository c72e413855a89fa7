//! Optional user callback slots.
//!
//! Each slot either holds a handler or is empty; dispatching to an empty slot
//! is a silent no-op. Handlers are cloned out of the slot before they run, so
//! a handler may replace or clear slots (its own included) without
//! deadlocking.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// A replaceable, optional handler of type `F` (usually a `dyn Fn`).
pub struct CallbackSlot<F: ?Sized> {
    handler: RwLock<Option<Arc<F>>>,
}

impl<F: ?Sized> CallbackSlot<F> {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handler: RwLock::new(None),
        }
    }

    /// Installs a handler, replacing any previous one.
    pub fn set(&self, handler: Arc<F>) {
        *self.handler.write() = Some(handler);
    }

    /// Removes the handler.
    pub fn clear(&self) {
        *self.handler.write() = None;
    }

    /// Returns true if a handler is installed.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.handler.read().is_some()
    }

    /// Returns the installed handler, if any.
    ///
    /// The read lock is released before this returns.
    #[must_use]
    pub fn get(&self) -> Option<Arc<F>> {
        self.handler.read().clone()
    }
}

impl<F: ?Sized> Default for CallbackSlot<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> fmt::Debug for CallbackSlot<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackSlot")
            .field("is_set", &self.is_set())
            .finish()
    }
}
