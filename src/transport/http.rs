//! reqwest-backed transport

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, Proxy, RequestBuilder};
use std::time::Duration;
use tracing::debug;

use super::{Page, Result, Transport, TransportError};
use crate::request::{CanonicalRequest, HeadersMap, MultipartPart};

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_redirects: usize,
    pub user_agent: String,
    pub proxy: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
            max_redirects: 10,
            user_agent: format!("crawlbox/{}", env!("CARGO_PKG_VERSION")),
            proxy: None,
        }
    }
}

/// Transport over a shared reqwest [`Client`]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: HttpConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects));

        if let Some(url) = &config.proxy {
            let proxy = Proxy::all(url)
                .map_err(|e| TransportError::InvalidRequest(format!("Invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::RequestFailed(e.to_string()))?;

        Ok(Self { client })
    }

    async fn build(&self, request: &CanonicalRequest) -> Result<RequestBuilder> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| TransportError::InvalidRequest(format!("method {}", request.method)))?;

        let mut builder = self
            .client
            .request(method, &request.uri)
            .headers(header_map(&request.headers)?);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ms) = request.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }

        if let Some(json) = &request.json {
            builder = builder.json(json);
        } else if !request.form_params.is_empty() {
            builder = builder.form(&request.form_params);
        } else if !request.multipart.is_empty() {
            builder = builder.multipart(multipart_form(&request.multipart).await?);
        } else if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        Ok(builder)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &CanonicalRequest) -> Result<Page> {
        debug!(method = %request.method, uri = %request.uri, "Sending request");

        // File parts are read here and dropped with the builder once sent.
        let builder = self.build(request).await?;

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else if e.is_redirect() {
                TransportError::TooManyRedirects
            } else {
                TransportError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        let headers = collect_headers(response.headers());
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::RequestFailed(format!("Failed to read body: {}", e))
            }
        })?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
                body,
            });
        }

        debug!(uri = %request.uri, status = status.as_u16(), size = body.len(), "Request completed");

        Ok(Page {
            status: status.as_u16(),
            headers,
            body,
        })
    }
}

fn header_map(headers: &HeadersMap) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| TransportError::InvalidRequest(format!("header name {}", name)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| TransportError::InvalidRequest(format!("header value for {}", name)))?;
        map.insert(name, value);
    }
    Ok(map)
}

fn collect_headers(headers: &HeaderMap) -> HeadersMap {
    let mut collected = HeadersMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        collected
            .entry(name.as_str().to_string())
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    collected
}

async fn multipart_form(parts: &[MultipartPart]) -> Result<Form> {
    let mut form = Form::new();
    for spec in parts {
        let mut part = match &spec.filepath {
            Some(path) => {
                let data = tokio::fs::read(path)
                    .await
                    .map_err(|source| TransportError::Multipart {
                        path: path.clone(),
                        source,
                    })?;
                let file_name = spec.filename.clone().or_else(|| {
                    path.file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                });
                let part = Part::bytes(data);
                match file_name {
                    Some(file_name) => part.file_name(file_name),
                    None => part,
                }
            }
            None => {
                let part = Part::text(spec.contents.clone().unwrap_or_default());
                match &spec.filename {
                    Some(file_name) => part.file_name(file_name.clone()),
                    None => part,
                }
            }
        };
        if !spec.headers.is_empty() {
            part = part.headers(header_map(&spec.headers)?);
        }
        form = form.part(spec.name.clone(), part);
    }
    Ok(form)
}
