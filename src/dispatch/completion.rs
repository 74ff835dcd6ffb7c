//! Completion handling: success and failure paths of a dispatched request

use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::{error, warn};

use super::Result;
use super::dispatcher::Dispatcher;
use crate::request::CanonicalRequest;
use crate::transport::{self, Page, TransportError};

/// A finished dispatch, tagged with the slot it occupied
pub(super) struct Completion {
    pub(super) slot: usize,
    pub(super) key: String,
    pub(super) attempt: Attempt,
}

pub(super) enum Attempt {
    Sent {
        request: CanonicalRequest,
        outcome: transport::Result<Page>,
    },
    /// The queued entry could not be decoded and was never sent
    Undecodable(String),
}

impl Dispatcher {
    pub(super) async fn complete(&self, completion: Completion) -> Result<()> {
        let Completion { slot, key, attempt } = completion;

        match attempt {
            Attempt::Sent {
                request,
                outcome: Ok(page),
            } => self.on_fulfilled(slot, key, request, page).await,
            Attempt::Sent {
                request,
                outcome: Err(e),
            } => self.on_rejected(slot, key, request, e).await,
            Attempt::Undecodable(reason) => self.on_undecodable(slot, key, reason),
        }
    }

    async fn on_fulfilled(
        &self,
        slot: usize,
        key: String,
        request: CanonicalRequest,
        page: Page,
    ) -> Result<()> {
        self.status.record_success();
        self.queue.resolve()?;
        let key = self.queue.take_in_flight(slot)?.unwrap_or(key);
        self.queue.clear_retry(&key)?;

        let handled = AssertUnwindSafe(self.spider.on_success(
            &page.body,
            &request,
            self,
            &page.headers,
        ))
        .catch_unwind()
        .await;

        match handled {
            Ok(Ok(Some(outcome))) if !outcome.is_valid() => {
                let mut reasons = outcome.error_reasons;
                reasons.sort();
                error!(
                    error_type = "save_validate",
                    request = %key,
                    status = outcome.status,
                    reasons = ?reasons,
                    time = %Utc::now().to_rfc3339(),
                    "Content validation failed"
                );
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                self.status.record_handler_failure();
                error!(
                    error_type = "crawler_exception",
                    request = %key,
                    error = %e,
                    time = %Utc::now().to_rfc3339(),
                    "Success handler failed"
                );
            }
            Err(panic) => {
                self.status.record_handler_failure();
                error!(
                    error_type = "crawler_exception",
                    request = %key,
                    error = %panic_message(panic.as_ref()),
                    time = %Utc::now().to_rfc3339(),
                    "Success handler panicked"
                );
            }
        }

        self.queue.progress()?.report(self.job.options.log_step);
        self.pause().await;
        Ok(())
    }

    async fn on_rejected(
        &self,
        slot: usize,
        key: String,
        request: CanonicalRequest,
        failure: TransportError,
    ) -> Result<()> {
        let key = self.queue.take_in_flight(slot)?.unwrap_or(key);
        self.status.record_transport_failure();

        let message = failure.to_string();
        error!(
            error_type = "request_fail",
            request = %key,
            error = %message,
            time = %Utc::now().to_rfc3339(),
            "Request failed"
        );

        let attempts = self.queue.retry_count(&key)?;
        if attempts >= self.job.options.retry_count {
            let handled = AssertUnwindSafe(self.spider.on_error(
                &request,
                &message,
                failure.partial_body(),
            ))
            .catch_unwind()
            .await;
            // Only success-handler failures are tallied.
            if let Err(panic) = handled {
                error!(
                    error_type = "crawler_exception",
                    request = %key,
                    error = %panic_message(panic.as_ref()),
                    "Error handler panicked"
                );
            }

            error!(
                error_type = "request_fail",
                request = %key,
                error = %message,
                retries = attempts,
                time = %Utc::now().to_rfc3339(),
                "Request abandoned after retries"
            );
            self.queue.resolve()?;
            self.queue.clear_retry(&key)?;
        } else {
            let failures = self.queue.schedule_retry(&key)?;
            warn!(request = %key, failures, "Request queued for retry");
            self.pause().await;
        }
        Ok(())
    }

    /// Entries that cannot be decoded are resolved without a retry
    fn on_undecodable(&self, slot: usize, key: String, reason: String) -> Result<()> {
        let key = self.queue.take_in_flight(slot)?.unwrap_or(key);
        self.status.record_transport_failure();
        error!(
            error_type = "request_fail",
            request = %key,
            error = %reason,
            time = %Utc::now().to_rfc3339(),
            "Dropping undecodable queue entry"
        );
        self.queue.resolve()?;
        self.queue.clear_retry(&key)?;
        Ok(())
    }

    /// Fixed post-completion pause
    async fn pause(&self) {
        let interval = self.job.options.interval;
        if !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}
