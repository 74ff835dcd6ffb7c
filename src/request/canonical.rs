use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::Result;

pub type HeadersMap = BTreeMap<String, String>;

/// Normalized request record; its serialization is the request identity
///
/// Field order, sorted maps and skipped empty fields keep
/// [`CanonicalRequest::to_key`] deterministic, so two descriptors that
/// normalize to the same request also serialize to the same key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRequest {
    pub method: String,
    pub uri: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: HeadersMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub form_params: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub multipart: Vec<MultipartPart>,
    /// Per-request timeout overriding the job timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// One part of a multipart body
///
/// A part either carries inline `contents` or a `filepath` that is opened
/// only when the request is actually sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipartPart {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filepath: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: HeadersMap,
}

impl CanonicalRequest {
    pub fn get(uri: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            uri: uri.into(),
            headers: HeadersMap::new(),
            query: BTreeMap::new(),
            body: None,
            json: None,
            form_params: BTreeMap::new(),
            multipart: Vec::new(),
            timeout_ms: None,
        }
    }

    /// Serialized identity used as queue element and store key
    pub fn to_key(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_key(key: &str) -> Result<Self> {
        Ok(serde_json::from_str(key)?)
    }

    pub fn has_file_parts(&self) -> bool {
        self.multipart.iter().any(|part| part.filepath.is_some())
    }
}
