use std::sync::Arc;

use tracing::{debug, info, warn};

use super::keys::JobKeys;
use super::{QueueError, Result};
use crate::progress::{Progress, QueueBuildProgress};
use crate::request::{CanonicalRequest, RequestDescriptor, RequestNormalizer};
use crate::store::Store;

/// Outcome of populating the main queue from a request source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulateReport {
    pub produced: u64,
    pub accepted: u64,
    pub duplicates: u64,
    pub rejected: u64,
}

/// Outcome of rebuilding the queue of an interrupted run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResumeReport {
    /// Requests recovered from the in-flight map
    pub in_flight: u64,
    /// Requests recovered from the error queue
    pub retries: u64,
    pub overplus: u64,
    pub total: u64,
}

/// Queue a dequeued request came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueSource {
    Retry,
    Main,
}

/// Queue state of one job, persisted in a [`Store`]
///
/// Compound steps are built from the store's atomic primitives only; the
/// dispatcher is the single writer of a namespace during a run.
pub struct QueueState {
    store: Arc<dyn Store>,
    keys: JobKeys,
    normalizer: RequestNormalizer,
}

impl QueueState {
    pub fn new(store: Arc<dyn Store>, keys: JobKeys, normalizer: RequestNormalizer) -> Self {
        Self {
            store,
            keys,
            normalizer,
        }
    }

    pub fn keys(&self) -> &JobKeys {
        &self.keys
    }

    pub fn normalizer(&self) -> &RequestNormalizer {
        &self.normalizer
    }

    /// Whether a previous run left unresolved work behind
    pub fn has_unfinished_run(&self) -> Result<bool> {
        Ok(self.overplus()? > 0)
    }

    /// Fresh run: clear the namespace and enqueue every valid, distinct request
    pub fn populate<I>(&self, requests: I, expected: Option<u64>) -> Result<PopulateReport>
    where
        I: IntoIterator<Item = RequestDescriptor>,
    {
        info!(namespace = self.keys.namespace(), "Building request queue");
        self.clear()?;

        let mut report = PopulateReport::default();
        let mut cadence = QueueBuildProgress::new(expected);

        for descriptor in requests {
            report.produced += 1;

            match self.normalizer.normalize(descriptor) {
                Ok(request) => {
                    let key = request.to_key()?;
                    if self.store.set_add(&self.keys.sets, &key)? {
                        self.store.push_back(&self.keys.queue, &key)?;
                        report.accepted += 1;
                    } else {
                        report.duplicates += 1;
                    }
                }
                Err(e) => {
                    report.rejected += 1;
                    warn!(error = %e, "Skipping invalid request");
                }
            }

            cadence.observe(report.produced, report.accepted);
        }

        self.store.delete(&self.keys.sets)?;

        let len = self.store.list_len(&self.keys.queue)? as i64;
        self.store.counter_set(&self.keys.total, len)?;
        self.store.counter_set(&self.keys.overplus, len)?;

        info!(
            accepted = report.accepted,
            duplicates = report.duplicates,
            rejected = report.rejected,
            "Request queue built"
        );
        Ok(report)
    }

    /// Interrupted run: put unacknowledged requests back ahead of remaining work
    ///
    /// In-flight entries come first in slot order, followed by leftovers of
    /// the error queue. `total` keeps the value of the original run.
    pub fn resume(&self) -> Result<ResumeReport> {
        let mut in_flight = self.store.hash_get_all(&self.keys.requesting)?;
        in_flight.sort_by_key(|(slot, _)| slot.parse::<u64>().unwrap_or(u64::MAX));

        let mut pending: Vec<String> = in_flight.into_iter().map(|(_, key)| key).collect();
        let recovered_in_flight = pending.len() as u64;

        while let Some(key) = self.store.pop_front(&self.keys.error_queue)? {
            pending.push(key);
        }
        let recovered_retries = pending.len() as u64 - recovered_in_flight;

        for key in pending.iter().rev() {
            self.store.push_front(&self.keys.queue, key)?;
        }
        self.store.delete(&self.keys.requesting)?;

        let overplus = self.store.list_len(&self.keys.queue)?;
        self.store.counter_set(&self.keys.overplus, overplus as i64)?;
        let total = self.total()?;

        info!(
            in_flight = recovered_in_flight,
            retries = recovered_retries,
            overplus,
            total,
            "Resuming interrupted run"
        );
        Ok(ResumeReport {
            in_flight: recovered_in_flight,
            retries: recovered_retries,
            overplus,
            total,
        })
    }

    /// Mid-run insertion at the head of the main queue
    ///
    /// Returns the canonical request, or `None` when the descriptor is invalid.
    pub fn insert_front(&self, descriptor: RequestDescriptor) -> Result<Option<CanonicalRequest>> {
        let request = match self.normalizer.normalize(descriptor) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Rejected added request");
                return Ok(None);
            }
        };

        let key = request.to_key()?;
        self.store.push_front(&self.keys.queue, &key)?;
        self.store.counter_incr(&self.keys.total, 1)?;
        self.store.counter_incr(&self.keys.overplus, 1)?;
        debug!(request = %key, "Added request to queue front");
        Ok(Some(request))
    }

    /// Next request to dispatch, retries before fresh work
    pub fn next_request(&self) -> Result<Option<(String, QueueSource)>> {
        if let Some(key) = self.store.pop_front(&self.keys.error_queue)? {
            return Ok(Some((key, QueueSource::Retry)));
        }
        Ok(self
            .store
            .pop_front(&self.keys.queue)?
            .map(|key| (key, QueueSource::Main)))
    }

    pub fn mark_in_flight(&self, slot: usize, key: &str) -> Result<()> {
        self.store
            .hash_set(&self.keys.requesting, &slot.to_string(), key)?;
        Ok(())
    }

    /// Remove and return the request outstanding at `slot`
    pub fn take_in_flight(&self, slot: usize) -> Result<Option<String>> {
        let field = slot.to_string();
        let key = self.store.hash_get(&self.keys.requesting, &field)?;
        if key.is_some() {
            self.store.hash_del(&self.keys.requesting, &field)?;
        }
        Ok(key)
    }

    /// In-flight entries ordered by slot
    pub fn in_flight(&self) -> Result<Vec<(usize, String)>> {
        let mut entries: Vec<(usize, String)> = self
            .store
            .hash_get_all(&self.keys.requesting)?
            .into_iter()
            .filter_map(|(slot, key)| slot.parse().ok().map(|slot| (slot, key)))
            .collect();
        entries.sort_by_key(|(slot, _)| *slot);
        Ok(entries)
    }

    /// Failures recorded so far for a serialized request
    pub fn retry_count(&self, key: &str) -> Result<u32> {
        match self.store.hash_get(&self.keys.retry_count, key)? {
            Some(raw) => raw.parse().map_err(|_| QueueError::CorruptRetryCount {
                request: key.to_string(),
                value: raw,
            }),
            None => Ok(0),
        }
    }

    /// Queue a failed request for another attempt, returning its failure count
    pub fn schedule_retry(&self, key: &str) -> Result<i64> {
        self.store.push_back(&self.keys.error_queue, key)?;
        Ok(self.store.hash_incr(&self.keys.retry_count, key, 1)?)
    }

    pub fn clear_retry(&self, key: &str) -> Result<()> {
        self.store.hash_del(&self.keys.retry_count, key)?;
        Ok(())
    }

    /// Mark one request terminally resolved, returning the new `overplus`
    pub fn resolve(&self) -> Result<i64> {
        Ok(self.store.counter_incr(&self.keys.overplus, -1)?)
    }

    pub fn length(&self) -> Result<u64> {
        Ok(self.store.list_len(&self.keys.queue)?)
    }

    pub fn error_length(&self) -> Result<u64> {
        Ok(self.store.list_len(&self.keys.error_queue)?)
    }

    pub fn total(&self) -> Result<u64> {
        Ok(self.store.counter_get(&self.keys.total)?.unwrap_or(0).max(0) as u64)
    }

    pub fn overplus(&self) -> Result<u64> {
        Ok(self.store.counter_get(&self.keys.overplus)?.unwrap_or(0).max(0) as u64)
    }

    pub fn progress(&self) -> Result<Progress> {
        Ok(Progress::new(
            self.store.counter_get(&self.keys.total)?.unwrap_or(0),
            self.store.counter_get(&self.keys.overplus)?.unwrap_or(0),
        ))
    }

    /// Delete every key of the job, returning the number of keys removed
    pub fn clear(&self) -> Result<usize> {
        let removed = self.store.delete_prefix(&self.keys.wildcard())?;
        debug!(namespace = self.keys.namespace(), removed, "Cleared job state");
        Ok(removed)
    }
}
