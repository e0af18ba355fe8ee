//! Polling cadence and wait budget for statement execution.

use std::time::Duration;

use crate::error::{Result, WarehouseMcpError};

/// Default delay between status polls, in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Default total wait budget, in seconds.
pub const DEFAULT_MAX_WAIT_SECS: u64 = 60;

/// How often to poll a statement and how long to wait for it overall.
///
/// Polling uses a fixed interval with no backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between polls.
    pub interval: Duration,

    /// Total budget, measured from submission.
    pub max_wait: Duration,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_wait: Duration) -> Self {
        Self { interval, max_wait }
    }

    /// Creates a policy from whole seconds.
    pub fn from_secs(interval_seconds: u64, max_wait_seconds: u64) -> Self {
        Self::new(
            Duration::from_secs(interval_seconds),
            Duration::from_secs(max_wait_seconds),
        )
    }

    /// Checks that the interval is positive and fits within the budget.
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(WarehouseMcpError::config(
                "poll interval must be greater than zero",
            ));
        }
        if self.max_wait.is_zero() {
            return Err(WarehouseMcpError::config(
                "max wait must be greater than zero",
            ));
        }
        if self.interval > self.max_wait {
            return Err(WarehouseMcpError::config(format!(
                "poll interval ({:?}) must not exceed max wait ({:?})",
                self.interval, self.max_wait
            )));
        }
        Ok(())
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_secs(DEFAULT_POLL_INTERVAL_SECS, DEFAULT_MAX_WAIT_SECS)
    }
}
