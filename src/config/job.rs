use bon::Builder;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A named crawl job
///
/// The name determines the store namespace, so two runs with the same name
/// share (and resume) the same queue state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct JobConfig {
    #[builder(into)]
    pub name: String,
    #[serde(flatten)]
    #[builder(default)]
    pub options: JobOptions,
}

/// Tunables of a crawl job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[serde(default)]
pub struct JobOptions {
    /// Requests in flight at once
    #[builder(default = 1)]
    pub concurrency: usize,
    /// Pick up an interrupted run instead of rebuilding the queue
    #[serde(alias = "continue")]
    #[builder(default)]
    pub resume: bool,
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    #[builder(default = Duration::from_secs(10))]
    pub timeout: Duration,
    /// Completed requests between two progress lines
    #[builder(default = 2)]
    pub log_step: u64,
    /// Prepended to every request uri
    #[builder(default, into)]
    pub base_uri: String,
    /// Pause after each success or soft retry
    #[serde(with = "humantime_serde")]
    #[builder(default)]
    pub interval: Duration,
    /// Expected number of requests, enables queue-build progress lines
    pub queue_len: Option<u64>,
    /// Retries per request before it is handed to the error callback
    #[builder(default = 2)]
    pub retry_count: u32,
    /// Reserved, has no effect
    #[builder(default = true)]
    pub check_black: bool,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}
