use url::{Host, Url};

use super::canonical::CanonicalRequest;
use super::descriptor::{RequestDescriptor, RequestSpec};
use super::{RequestError, Result};

const DEFAULT_SCHEME: &str = "http:";

/// Turns descriptors into validated canonical requests
#[derive(Debug, Clone, Default)]
pub struct RequestNormalizer {
    base_uri: String,
}

impl RequestNormalizer {
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
        }
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Normalize and validate one descriptor
    ///
    /// The base uri is prepended verbatim, the method is upper-cased
    /// (default GET) and a missing scheme becomes `http:`.
    pub fn normalize(&self, descriptor: RequestDescriptor) -> Result<CanonicalRequest> {
        let spec = match descriptor {
            RequestDescriptor::Id(id) => RequestSpec::new(id.to_string()),
            RequestDescriptor::Path(path) => RequestSpec::new(path),
            RequestDescriptor::Spec(spec) => spec,
        };

        let uri = validate_uri(&format!("{}{}", self.base_uri, spec.uri))?;
        let method = spec
            .method
            .map(|m| m.trim().to_ascii_uppercase())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "GET".to_string());

        Ok(CanonicalRequest {
            method,
            uri,
            headers: spec.headers,
            query: spec.query,
            body: spec.body,
            json: spec.json,
            form_params: spec.form_params,
            multipart: spec.multipart,
            timeout_ms: spec.timeout_ms,
        })
    }
}

/// Validate a uri, returning it with the default scheme applied
pub fn validate_uri(uri: &str) -> Result<String> {
    let invalid = |reason: &str| RequestError::InvalidUri {
        uri: uri.to_string(),
        reason: reason.to_string(),
    };

    // Url::parse would percent-encode or punycode these, changing the identity.
    if uri.chars().any(|c| c.is_ascii_whitespace() || c.is_ascii_control()) {
        return Err(invalid("contains whitespace or control characters"));
    }
    if !uri.is_ascii() {
        return Err(invalid("contains non-ASCII characters"));
    }

    let candidate = if scheme_of(uri).is_some() {
        uri.to_string()
    } else {
        format!("{DEFAULT_SCHEME}{uri}")
    };

    let scheme = scheme_of(&candidate).ok_or_else(|| invalid("missing scheme"))?;
    if !matches!(scheme.to_ascii_lowercase().as_str(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if !candidate[scheme.len() + 1..].starts_with("//") {
        return Err(invalid("missing authority"));
    }

    let parsed = Url::parse(&candidate).map_err(|e| invalid(&e.to_string()))?;
    match parsed.host() {
        Some(Host::Domain(domain)) if is_hostname(domain) => {}
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => {}
        Some(Host::Domain(_)) => return Err(invalid("malformed host")),
        None => return Err(invalid("missing host")),
    }

    Ok(candidate)
}

/// RFC 3986 scheme: ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ) before the first ':'
fn scheme_of(uri: &str) -> Option<&str> {
    let (scheme, _) = uri.split_once(':')?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    chars
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        .then_some(scheme)
}

fn is_hostname(domain: &str) -> bool {
    let domain = domain.strip_suffix('.').unwrap_or(domain);
    !domain.is_empty()
        && domain.split('.').all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}
