//! Scoped lock ownership
//!
//! A [`LockGuard`] releases its lease when dropped, so every exit path of a
//! critical section (early return, `?`, panic unwind) gives the lock back.

use stockade_core::{LockHandle, LockProvider, LockResult, ReleaseOutcome};
use tracing::warn;

/// RAII guard over a granted lease
pub struct LockGuard<'a> {
    provider: &'a dyn LockProvider,
    handle: LockHandle,
    released: bool,
}

impl<'a> LockGuard<'a> {
    /// Wrap a handle obtained from `provider`
    pub fn new(provider: &'a dyn LockProvider, handle: LockHandle) -> Self {
        Self {
            provider,
            handle,
            released: false,
        }
    }

    /// The granted lease
    pub fn handle(&self) -> &LockHandle {
        &self.handle
    }

    /// Release now and report whether the lease was still ours
    ///
    /// # Errors
    ///
    /// Returns the provider's error if the lock service fails.
    pub fn release(mut self) -> LockResult<ReleaseOutcome> {
        self.released = true;
        self.provider.release(&self.handle)
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.provider.release(&self.handle) {
            warn!(
                target: "stockade::lock",
                key = %self.handle.key,
                error = %e,
                "Failed to release lock on drop; lease expiry will free it"
            );
        }
    }
}

impl std::fmt::Debug for LockGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard")
            .field("handle", &self.handle)
            .field("released", &self.released)
            .finish()
    }
}
