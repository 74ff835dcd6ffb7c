//! Progress accounting derived from the `total` and `overplus` counters

use tracing::info;

/// Minimum advance, in percentage points, between two queue-build log lines
const QUEUE_BUILD_LOG_STEP: u64 = 5;

/// Point-in-time view of a run's counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub total: u64,
    pub overplus: u64,
}

impl Progress {
    /// Build from raw store counters; negative values read as zero
    pub fn new(total: i64, overplus: i64) -> Self {
        Self {
            total: total.max(0) as u64,
            overplus: overplus.max(0) as u64,
        }
    }

    /// Requests that reached a terminal outcome
    pub fn completed(&self) -> u64 {
        if self.overplus == 0 {
            self.total
        } else {
            self.total.saturating_sub(self.overplus)
        }
    }

    /// Rounded percentage complete
    pub fn percent(&self) -> u64 {
        if self.total == 0 {
            return 100;
        }
        ((self.completed() as f64 / self.total as f64) * 100.0).round() as u64
    }

    pub fn is_log_point(&self, log_step: u64) -> bool {
        self.completed() % log_step.max(1) == 0
    }

    /// Emit the progress line when the completed count sits on a log step
    pub fn report(&self, log_step: u64) -> bool {
        if !self.is_log_point(log_step) {
            return false;
        }
        info!(
            percent = self.percent(),
            completed = self.completed(),
            remaining = self.overplus,
            total = self.total,
            "Crawl progress"
        );
        true
    }
}

/// Cadence logger for queue population
///
/// Only active when the caller supplied an expected queue length.
#[derive(Debug, Clone)]
pub struct QueueBuildProgress {
    expected: Option<u64>,
    last_logged: u64,
}

impl QueueBuildProgress {
    pub fn new(expected: Option<u64>) -> Self {
        Self {
            expected: expected.filter(|n| *n > 0),
            last_logged: 0,
        }
    }

    /// Record that `produced` descriptors have been consumed so far
    ///
    /// Returns the percentage when a log line was emitted.
    pub fn observe(&mut self, produced: u64, queue_len: u64) -> Option<u64> {
        let expected = self.expected?;
        let percent = ((produced as f64 / expected as f64) * 100.0).round() as u64;
        if percent < self.last_logged + QUEUE_BUILD_LOG_STEP {
            return None;
        }

        self.last_logged = percent;
        info!(percent, produced, expected, queue_len, "Building request queue");
        Some(percent)
    }
}
