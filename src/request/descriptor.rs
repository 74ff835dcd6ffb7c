use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::canonical::{HeadersMap, MultipartPart};

/// Caller-supplied request, in any of the accepted shapes
///
/// Only the [`super::RequestNormalizer`] looks at the shape; everything
/// downstream works with [`super::CanonicalRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestDescriptor {
    /// Numeric identifier appended to the base uri
    Id(i64),
    /// Path (or full uri) appended to the base uri
    Path(String),
    /// Structured request
    Spec(RequestSpec),
}

/// Structured request descriptor; `method` defaults to GET
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestSpec {
    #[serde(default)]
    pub method: Option<String>,
    pub uri: String,
    #[serde(default)]
    pub headers: HeadersMap,
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub json: Option<Value>,
    #[serde(default)]
    pub form_params: BTreeMap<String, String>,
    #[serde(default)]
    pub multipart: Vec<MultipartPart>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl RequestSpec {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Default::default()
        }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn json(mut self, json: Value) -> Self {
        self.json = Some(json);
        self
    }
}

impl RequestDescriptor {
    /// Parse one line of a request list: a JSON value, or else a bare path
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        if line.starts_with('{') || line.starts_with('"') || line.parse::<i64>().is_ok() {
            if let Ok(descriptor) = serde_json::from_str(line) {
                return Some(descriptor);
            }
        }
        Some(Self::Path(line.to_string()))
    }
}

impl From<&str> for RequestDescriptor {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for RequestDescriptor {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl From<i64> for RequestDescriptor {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl From<RequestSpec> for RequestDescriptor {
    fn from(spec: RequestSpec) -> Self {
        Self::Spec(spec)
    }
}
