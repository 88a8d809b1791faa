//! Retry and lease policies
//!
//! Each strategy that can give up carries its bounds as plain data so the
//! engine can build them from configuration.

use std::time::Duration;

// ============================================================================
// Optimistic retry
// ============================================================================

/// Bounds for the optimistic retry loop
///
/// # Example
/// ```text
/// let policy = RetryPolicy::default()
///     .with_max_attempts(5)
///     .with_backoff(Duration::from_millis(10));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts made before reporting `RetriesExhausted` (at least 1)
    pub max_attempts: u32,
    /// Fixed pause between a conflict and the next attempt
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            backoff: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with default bounds
    pub fn new() -> Self {
        Self::default()
    }

    /// A single attempt, no retry
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Set the attempt budget
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the pause between attempts
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

// ============================================================================
// Spin acquisition
// ============================================================================

/// Bounds for polling a lock with `try_acquire`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinPolicy {
    /// Probes made before reporting `LockNotAcquired` (at least 1)
    pub max_attempts: u32,
    /// Pause between probes
    pub retry_delay: Duration,
    /// Lease requested on each probe
    pub lease: Duration,
}

impl Default for SpinPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 100,
            retry_delay: Duration::from_millis(50),
            lease: Duration::from_secs(3),
        }
    }
}

impl SpinPolicy {
    /// Create a policy with default bounds
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the probe budget
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the pause between probes
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Set the lease duration
    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }
}

// ============================================================================
// Blocking lease acquisition
// ============================================================================

/// Bounds for a blocking lock wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeasePolicy {
    /// Longest time to wait for the lock
    pub wait_timeout: Duration,
    /// Lease requested once granted
    pub lease: Duration,
}

impl Default for LeasePolicy {
    fn default() -> Self {
        Self {
            wait_timeout: Duration::from_secs(5),
            lease: Duration::from_secs(3),
        }
    }
}

impl LeasePolicy {
    /// Create a policy with default bounds
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the wait timeout
    pub fn with_wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.wait_timeout = wait_timeout;
        self
    }

    /// Set the lease duration
    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }
}
