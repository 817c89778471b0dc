//! Wait Mechanisms
//!
//! Polling synchronization for page models: evaluate a predicate until it
//! holds or the timeout elapses, sleeping between attempts.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::result::{PageError, PageResult};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (5 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5_000;

/// Default polling interval (1 second)
pub const DEFAULT_RETRY_EVERY_MS: u64 = 1_000;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub retry_every_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            retry_every_ms: DEFAULT_RETRY_EVERY_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_retry_every(mut self, retry_every_ms: u64) -> Self {
        self.retry_every_ms = retry_every_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get polling interval as Duration
    #[must_use]
    pub const fn retry_every(&self) -> Duration {
        Duration::from_millis(self.retry_every_ms)
    }
}

// =============================================================================
// WAITING
// =============================================================================

/// Poll `predicate` until it returns true or `options.timeout_ms` elapses.
///
/// The predicate is always evaluated at least once, and a result that
/// arrives exactly at the deadline still counts.
///
/// # Errors
///
/// Returns [`PageError::Timeout`] if the predicate never held.
pub fn wait_until<F>(options: &WaitOptions, mut predicate: F) -> PageResult<()>
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    let timeout = options.timeout();
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        if predicate() {
            tracing::trace!(attempts, elapsed = ?start.elapsed(), "wait condition met");
            return Ok(());
        }
        std::thread::sleep(options.retry_every());
        if start.elapsed() > timeout {
            break;
        }
    }

    tracing::debug!(attempts, timeout_ms = options.timeout_ms, "wait condition timed out");
    Err(PageError::Timeout {
        ms: options.timeout_ms,
    })
}

/// Waiting capability shared by elements, pages and sessions
pub trait Waiters {
    /// Options used when none are given
    fn wait_options(&self) -> WaitOptions {
        WaitOptions::default()
    }

    /// Poll with this host's default options
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Timeout`] if the predicate never held.
    fn wait_until<F>(&self, predicate: F) -> PageResult<()>
    where
        F: FnMut() -> bool,
    {
        wait_until(&self.wait_options(), predicate)
    }

    /// Poll with explicit options
    ///
    /// # Errors
    ///
    /// Returns [`PageError::Timeout`] if the predicate never held.
    fn wait_until_with<F>(&self, options: &WaitOptions, predicate: F) -> PageResult<()>
    where
        F: FnMut() -> bool,
    {
        wait_until(options, predicate)
    }
}
