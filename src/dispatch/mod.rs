//! Bounded-concurrency dispatch loop
//!
//! A [`Dispatcher`] owns one job. [`Dispatcher::run`] populates (or resumes)
//! the job's queue, then runs dispatch cycles until every request reached a
//! terminal outcome, and finally deletes the job's state from the store.
//!
//! Within a cycle, requests are popped from the store only when a pool slot
//! is free, and every completion is handled in the task driving the pool, so
//! queue state has a single writer.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use crawlbox::config::JobConfig;
//! use crawlbox::dispatch::Dispatcher;
//! use crawlbox::store::MemoryStore;
//!
//! let dispatcher = Dispatcher::builder()
//!     .config(JobConfig::builder().name("news").build())
//!     .store(Arc::new(MemoryStore::new()))
//!     .spider(Arc::new(NewsSpider))
//!     .build()?;
//!
//! let summary = dispatcher.run().await?;
//! println!("{} of {} fetched", summary.success, summary.total);
//! ```

mod completion;
mod dispatcher;
mod slots;
mod status;
mod summary;

pub use dispatcher::Dispatcher;
pub use status::{RunStatus, RunStatusSnapshot};
pub use summary::RunSummary;

use thiserror::Error;

use crate::config::ValidationError;
use crate::queue::QueueError;
use crate::store::StoreError;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Invalid job configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Transport setup failed: {0}")]
    Transport(#[from] TransportError),

    #[error("Dispatch stalled: {overplus} requests unresolved but nothing left to dispatch")]
    Stalled { overplus: u64 },
}

pub type Result<T> = std::result::Result<T, DispatchError>;
