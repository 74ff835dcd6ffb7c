//! Request-queue state machine of one crawl job
//!
//! All state lives in the [`Store`](crate::store::Store) under the job
//! namespace, see [`JobKeys`]:
//!
//! - `queue`: main queue, filled at the tail and drained from the head
//! - `queue:error`: failed requests with retry budget left, drained first
//! - `requesting`: in-flight map, dispatch slot -> serialized request
//! - `retry_count`: serialized request -> failures so far
//! - `total` / `overplus`: accepted and still-unresolved request counts
//! - `sets`: dedup set, only alive while the queue is being populated

mod keys;
mod state;

pub use keys::JobKeys;
pub use state::{PopulateReport, QueueSource, QueueState, ResumeReport};

use thiserror::Error;

use crate::request::RequestError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    #[error("Corrupt retry counter for {request}: {value}")]
    CorruptRetryCount { request: String, value: String },
}

pub type Result<T> = std::result::Result<T, QueueError>;
