//! Shared fixtures: a scripted transport and a recording spider

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use crawlbox::request::{CanonicalRequest, HeadersMap, RequestDescriptor};
use crawlbox::transport::{self, Page, Transport, TransportError};
use crawlbox::{Dispatcher, HandlerError, Spider, ValidationOutcome};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What the transport does for one attempt at a uri
#[derive(Debug, Clone)]
pub enum Step {
    Fail(u16),
    Hang,
}

/// Transport answering from a per-uri script; unscripted attempts succeed
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<HashMap<String, VecDeque<Step>>>,
    dispatched: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    latency: Duration,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Queue `steps` for the next attempts at `uri`
    pub fn script(self, uri: &str, steps: impl IntoIterator<Item = Step>) -> Self {
        self.script
            .lock()
            .unwrap()
            .entry(uri.to_string())
            .or_default()
            .extend(steps);
        self
    }

    /// Uris in the order they were handed to the transport
    pub fn dispatched(&self) -> Vec<String> {
        self.dispatched.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &CanonicalRequest) -> transport::Result<Page> {
        self.dispatched.lock().unwrap().push(request.uri.clone());
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        let step = self
            .script
            .lock()
            .unwrap()
            .get_mut(&request.uri)
            .and_then(VecDeque::pop_front);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match step {
            Some(Step::Fail(status)) => Err(TransportError::Status {
                status,
                reason: "Scripted failure".to_string(),
                body: Bytes::from(format!("failed {}", request.uri)),
            }),
            Some(Step::Hang) => std::future::pending().await,
            None => {
                let mut headers = HeadersMap::new();
                headers.insert("content-type".into(), "text/html".into());
                Ok(Page {
                    status: 200,
                    headers,
                    body: Bytes::from(format!("<html>{}</html>", request.uri)),
                })
            }
        }
    }
}

type SuccessHook = Box<
    dyn Fn(&CanonicalRequest, &Dispatcher) -> Result<Option<ValidationOutcome>, HandlerError>
        + Send
        + Sync,
>;

/// Spider serving a fixed request list and recording every callback
pub struct RecordingSpider {
    requests: Vec<RequestDescriptor>,
    hook: Option<SuccessHook>,
    panic_on_error: bool,
    pub successes: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<(String, String, Option<Bytes>)>>,
}

impl RecordingSpider {
    pub fn new<I, D>(requests: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<RequestDescriptor>,
    {
        Self {
            requests: requests.into_iter().map(Into::into).collect(),
            hook: None,
            panic_on_error: false,
            successes: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
        }
    }

    pub fn on_success_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&CanonicalRequest, &Dispatcher) -> Result<Option<ValidationOutcome>, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Record the failure, then panic inside `on_error`
    pub fn panicking_on_error(mut self) -> Self {
        self.panic_on_error = true;
        self
    }

    pub fn successes(&self) -> Vec<String> {
        self.successes.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<(String, String, Option<Bytes>)> {
        self.errors.lock().unwrap().clone()
    }
}

#[async_trait]
impl Spider for RecordingSpider {
    fn requests(&self) -> Box<dyn Iterator<Item = RequestDescriptor> + '_> {
        Box::new(self.requests.iter().cloned())
    }

    async fn on_success(
        &self,
        _body: &Bytes,
        request: &CanonicalRequest,
        dispatcher: &Dispatcher,
        _headers: &HeadersMap,
    ) -> Result<Option<ValidationOutcome>, HandlerError> {
        self.successes.lock().unwrap().push(request.uri.clone());
        match &self.hook {
            Some(hook) => hook(request, dispatcher),
            None => Ok(None),
        }
    }

    async fn on_error(&self, request: &CanonicalRequest, message: &str, partial_body: Option<&Bytes>) {
        self.errors.lock().unwrap().push((
            request.uri.clone(),
            message.to_string(),
            partial_body.cloned(),
        ));
        if self.panic_on_error {
            panic!("error handler bug");
        }
    }
}

pub fn uri(path: &str) -> String {
    format!("http://example.com/{path}")
}

pub fn uris(paths: &[&str]) -> Vec<String> {
    paths.iter().map(|p| uri(p)).collect()
}
