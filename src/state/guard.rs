//! Scoped flush of mutable crawl state.

use std::ops::{Deref, DerefMut};

use tracing::warn;

use super::StateError;

/// State that can be written back to durable storage.
pub trait Persist {
    /// Writes pending changes to disk.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the state cannot be persisted.
    fn flush(&mut self) -> Result<(), StateError>;
}

/// Exclusive borrow of a [`Persist`] value that is flushed when the scope ends.
///
/// Call [`release`](Self::release) on the success path to flush and observe
/// errors. If the guard is dropped instead (an error propagated with `?`, a
/// panic, or the owning future being cancelled) the state is still flushed and
/// any failure is logged.
pub struct FlushGuard<'a, T: Persist> {
    state: &'a mut T,
    released: bool,
}

impl<'a, T: Persist> FlushGuard<'a, T> {
    /// Takes exclusive access to `state` until the guard is released or dropped.
    pub fn new(state: &'a mut T) -> Self {
        Self {
            state,
            released: false,
        }
    }

    /// Flushes the state and ends the guarded scope.
    ///
    /// # Errors
    ///
    /// Returns the [`StateError`] from the final flush.
    pub fn release(mut self) -> Result<(), StateError> {
        self.released = true;
        self.state.flush()
    }
}

impl<T: Persist> Deref for FlushGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.state
    }
}

impl<T: Persist> DerefMut for FlushGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.state
    }
}

impl<T: Persist> Drop for FlushGuard<'_, T> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(error) = self.state.flush() {
            warn!(%error, "failed to flush state on abnormal exit");
        }
    }
}
