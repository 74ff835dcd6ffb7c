//! Caller-supplied crawl logic

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::dispatch::{DispatchError, Dispatcher};
use crate::request::{CanonicalRequest, HeadersMap, RequestDescriptor};

/// Errors raised by spider callbacks
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("parse failed: {0}")]
    Parse(String),
    #[error("enqueue failed: {0}")]
    Enqueue(String),
    #[error("handler failed: {0}")]
    Failed(String),
}

impl From<DispatchError> for HandlerError {
    fn from(e: DispatchError) -> Self {
        Self::Enqueue(e.to_string())
    }
}

/// Result of checking a fetched page's content
///
/// A non-positive `status` is logged with the reasons; the request still
/// counts as resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub status: i32,
    pub error_reasons: Vec<String>,
}

impl ValidationOutcome {
    pub fn valid() -> Self {
        Self {
            status: 1,
            error_reasons: Vec::new(),
        }
    }

    pub fn invalid<I, S>(reasons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            status: 0,
            error_reasons: reasons.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status > 0
    }
}

/// A crawl job's request source and completion callbacks
#[async_trait]
pub trait Spider: Send + Sync {
    /// Fresh, lazy sequence of requests; called once per populated run
    fn requests(&self) -> Box<dyn Iterator<Item = RequestDescriptor> + '_>;

    /// Called once per request that was fetched successfully
    ///
    /// `dispatcher` may be used to add newly discovered requests.
    async fn on_success(
        &self,
        body: &Bytes,
        request: &CanonicalRequest,
        dispatcher: &Dispatcher,
        headers: &HeadersMap,
    ) -> Result<Option<ValidationOutcome>, HandlerError>;

    /// Called once per request whose retries are exhausted
    async fn on_error(
        &self,
        _request: &CanonicalRequest,
        _message: &str,
        _partial_body: Option<&Bytes>,
    ) {
    }
}
