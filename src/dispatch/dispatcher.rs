use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::task::Poll;
use std::time::Instant;
use tracing::{Instrument, debug, error, info, info_span};
use uuid::Uuid;

use super::completion::{Attempt, Completion};
use super::slots::SlotPool;
use super::status::{RunStatus, RunStatusSnapshot};
use super::summary::RunSummary;
use super::{DispatchError, Result};
use crate::config::{HttpSettings, JobConfig, ValidationError, default_key_prefix, validate_job};
use crate::queue::{JobKeys, QueueError, QueueState};
use crate::request::{CanonicalRequest, RequestDescriptor, RequestNormalizer};
use crate::spider::Spider;
use crate::store::Store;
use crate::transport::{ReqwestTransport, Transport};

/// Drives one crawl job from population to teardown
pub struct Dispatcher {
    pub(super) job: JobConfig,
    pub(super) queue: QueueState,
    pub(super) spider: Arc<dyn Spider>,
    pub(super) transport: Arc<dyn Transport>,
    pub(super) status: RunStatus,
}

#[bon::bon]
impl Dispatcher {
    /// Validate the job and wire its collaborators
    ///
    /// Without an explicit `transport`, a [`ReqwestTransport`] is built from
    /// `http` (or its defaults) with the job timeout as request timeout.
    #[builder]
    pub fn new(
        config: JobConfig,
        store: Arc<dyn Store>,
        spider: Arc<dyn Spider>,
        transport: Option<Arc<dyn Transport>>,
        #[builder(into)] key_prefix: Option<String>,
        http: Option<HttpSettings>,
    ) -> Result<Self> {
        validate_job(&config)?;

        let key_prefix = key_prefix.unwrap_or_else(default_key_prefix);
        if key_prefix.is_empty() {
            return Err(ValidationError::EmptyKeyPrefix.into());
        }

        let transport: Arc<dyn Transport> = match transport {
            Some(transport) => transport,
            None => {
                let http = http.unwrap_or_default();
                Arc::new(ReqwestTransport::new(
                    http.client_config(config.options.timeout),
                )?)
            }
        };

        let queue = QueueState::new(
            store,
            JobKeys::new(&key_prefix, &config.name),
            RequestNormalizer::new(config.options.base_uri.clone()),
        );

        Ok(Self {
            job: config,
            queue,
            spider,
            transport,
            status: RunStatus::new(),
        })
    }
}

impl Dispatcher {
    /// Run the job to completion
    ///
    /// Resumes an interrupted run when the job has `resume` set and the
    /// store still holds unresolved work; otherwise rebuilds the queue from
    /// the spider's request source.
    pub async fn run(&self) -> Result<RunSummary> {
        let run_id = Uuid::now_v7();
        let span = info_span!("job", namespace = %self.namespace(), %run_id);
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid) -> Result<RunSummary> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let options = &self.job.options;
        self.status.reset();

        info!(
            concurrency = options.concurrency,
            resume = options.resume,
            retry_count = options.retry_count,
            "Starting crawl job"
        );

        if options.resume && self.queue.has_unfinished_run()? {
            self.queue.resume()?;
        } else {
            self.queue
                .populate(self.spider.requests(), options.queue_len)?;
        }

        loop {
            let overplus = self.queue.overplus()?;
            if overplus == 0 {
                break;
            }

            let handled = self.dispatch_cycle().await?;
            debug!(handled, "Dispatch cycle finished");

            if handled == 0 {
                let overplus = self.queue.overplus()?;
                if overplus > 0 {
                    return Err(DispatchError::Stalled { overplus });
                }
            }
        }

        let total = self.queue.total()?;
        self.queue.clear()?;

        let status = self.status.snapshot();
        let summary = RunSummary {
            run_id,
            job: self.job.name.clone(),
            concurrency: options.concurrency,
            total,
            success: status.success,
            transport_failures: status.transport_failures,
            handler_failures: status.handler_failures,
            elapsed: clock.elapsed(),
            started_at,
            finished_at: Utc::now(),
        };
        summary.log();
        Ok(summary)
    }

    /// One pass over the queues with at most `concurrency` requests in flight
    ///
    /// Returns the number of completions handled. The cycle ends once both
    /// queues were found empty and every outstanding request completed.
    async fn dispatch_cycle(&self) -> Result<u64> {
        let concurrency = self.job.options.concurrency;
        let slots = SlotPool::new(concurrency);
        let failure: Mutex<Option<QueueError>> = Mutex::new(None);

        let (slots_ref, failure_ref) = (&slots, &failure);
        let submissions =
            stream::poll_fn(move |_| Poll::Ready(self.submit_next(slots_ref, failure_ref)));
        let mut completions = submissions.buffer_unordered(concurrency);

        let mut handled = 0;
        while let Some(completion) = completions.next().await {
            let slot = completion.slot;
            self.complete(completion).await?;
            slots.release(slot);
            handled += 1;
        }

        if let Some(e) = failure.lock().unwrap_or_else(|e| e.into_inner()).take() {
            return Err(e.into());
        }
        Ok(handled)
    }

    /// Pop the next request, record it in flight and start sending it
    ///
    /// `None` ends the submission stream, either because both queues are
    /// empty or because the store failed; the failure is left in `failure`.
    fn submit_next<'a>(
        &'a self,
        slots: &SlotPool,
        failure: &Mutex<Option<QueueError>>,
    ) -> Option<impl Future<Output = Completion> + 'a> {
        let mut failure = failure.lock().unwrap_or_else(|e| e.into_inner());
        if failure.is_some() {
            return None;
        }
        let slot = slots.acquire()?;

        let key = match self.queue.next_request() {
            Ok(Some((key, source))) => {
                debug!(slot, ?source, "Dispatching request");
                key
            }
            Ok(None) => {
                slots.release(slot);
                return None;
            }
            Err(e) => {
                *failure = Some(e);
                slots.release(slot);
                return None;
            }
        };

        if let Err(e) = self.queue.mark_in_flight(slot, &key) {
            error!(request = %key, error = %e, "Popped request could not be recorded in flight");
            *failure = Some(e);
            slots.release(slot);
            return None;
        }

        let request = CanonicalRequest::from_key(&key);
        let transport = self.transport.clone();
        Some(async move {
            let attempt = match request {
                Ok(request) => {
                    let outcome = transport.send(&request).await;
                    Attempt::Sent { request, outcome }
                }
                Err(e) => Attempt::Undecodable(e.to_string()),
            };
            Completion { slot, key, attempt }
        })
    }

    /// Normalize and enqueue a request at the head of the main queue
    ///
    /// Returns `false` when the request is rejected as invalid.
    pub fn add_request(&self, descriptor: impl Into<RequestDescriptor>) -> Result<bool> {
        Ok(self.queue.insert_front(descriptor.into())?.is_some())
    }

    /// Requests waiting in the main queue
    pub fn request_length(&self) -> Result<u64> {
        Ok(self.queue.length()?)
    }

    pub fn request_total(&self) -> Result<u64> {
        Ok(self.queue.total()?)
    }

    pub fn request_overplus(&self) -> Result<u64> {
        Ok(self.queue.overplus()?)
    }

    pub fn namespace(&self) -> &str {
        self.queue.keys().namespace()
    }

    pub fn job(&self) -> &JobConfig {
        &self.job
    }

    /// Outcome counters of the current (or last) run
    pub fn status(&self) -> RunStatusSnapshot {
        self.status.snapshot()
    }

    /// Delete all stored state of the job
    pub fn clear(&self) -> Result<usize> {
        Ok(self.queue.clear()?)
    }
}
