//! HTTP transport used by the dispatcher
//!
//! The dispatcher only needs "send this canonical request, give me the page
//! or a failure". [`ReqwestTransport`] is the production implementation;
//! tests plug in scripted transports through the same trait.

mod http;

pub use http::{HttpConfig, ReqwestTransport};

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use thiserror::Error;

use crate::request::{CanonicalRequest, HeadersMap};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP {status}: {reason}")]
    Status {
        status: u16,
        reason: String,
        body: Bytes,
    },

    #[error("Request timed out")]
    Timeout,

    #[error("Too many redirects")]
    TooManyRedirects,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Cannot read multipart file {path}: {source}")]
    Multipart {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TransportError {
    /// Response body received before the failure, if any
    pub fn partial_body(&self) -> Option<&Bytes> {
        match self {
            Self::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// Successful response
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub status: u16,
    /// Response headers; repeated headers are joined with `", "`
    pub headers: HeadersMap,
    pub body: Bytes,
}

impl Page {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request; any non-2xx status is an error
    async fn send(&self, request: &CanonicalRequest) -> Result<Page>;
}
