//! Request descriptors and their canonical, serialized form
//!
//! Callers hand the dispatcher loosely shaped [`RequestDescriptor`]s: a bare
//! path or identifier, or a structured [`RequestSpec`]. The
//! [`RequestNormalizer`] turns each one into a [`CanonicalRequest`] whose
//! JSON serialization is the request's identity everywhere in the queue
//! (dedup member, queue element, retry-counter field).
//!
//! ## Example
//!
//! ```rust,ignore
//! use crawlbox::request::{RequestDescriptor, RequestNormalizer};
//!
//! let normalizer = RequestNormalizer::new("https://example.com/list/");
//! let request = normalizer.normalize(RequestDescriptor::from("page-2.html"))?;
//! assert_eq!(request.uri, "https://example.com/list/page-2.html");
//! let key = request.to_key()?;
//! ```

mod canonical;
mod descriptor;
mod normalize;

pub use canonical::{CanonicalRequest, HeadersMap, MultipartPart};
pub use descriptor::{RequestDescriptor, RequestSpec};
pub use normalize::{RequestNormalizer, validate_uri};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid uri '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("request encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RequestError>;
