use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// End-of-run report
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub job: String,
    pub concurrency: usize,
    pub total: u64,
    pub success: u64,
    pub transport_failures: u64,
    pub handler_failures: u64,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn log(&self) {
        info!(
            run_id = %self.run_id,
            job = %self.job,
            elapsed_secs = self.elapsed.as_secs_f64(),
            concurrency = self.concurrency,
            total = self.total,
            success = self.success,
            transport_failures = self.transport_failures,
            handler_failures = self.handler_failures,
            "Crawl finished"
        );
    }
}
