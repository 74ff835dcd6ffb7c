use std::sync::atomic::{AtomicU64, Ordering};

/// Process-local outcome counters of the current run
#[derive(Debug, Default)]
pub struct RunStatus {
    success: AtomicU64,
    transport_failures: AtomicU64,
    handler_failures: AtomicU64,
}

impl RunStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self) {
        self.success.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "success", "Status incremented");
    }

    pub fn record_transport_failure(&self) {
        self.transport_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "transport_failures", "Status incremented");
    }

    pub fn record_handler_failure(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "handler_failures", "Status incremented");
    }

    pub fn reset(&self) {
        self.success.store(0, Ordering::Relaxed);
        self.transport_failures.store(0, Ordering::Relaxed);
        self.handler_failures.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RunStatusSnapshot {
        RunStatusSnapshot {
            success: self.success.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStatusSnapshot {
    pub success: u64,
    pub transport_failures: u64,
    pub handler_failures: u64,
}
