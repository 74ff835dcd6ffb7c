//! Shared key/value store backing all crawl queue state
//!
//! The dispatcher keeps every queue, map and counter of a run in a [`Store`]
//! so that an interrupted run can be picked up again by a later process.
//! The trait mirrors the small set of primitives the queue needs:
//!
//! - lists with push/pop at both ends
//! - hashes (field -> value) with an atomic integer increment
//! - sets with insert-if-absent
//! - signed integer counters
//! - deletion of a single key or of every key under a prefix
//!
//! Two backends are provided: [`FjallStore`] persists to an embedded LSM
//! keyspace and survives restarts, [`MemoryStore`] lives in process memory.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crawlbox::store::{FjallStore, Store};
//!
//! let store = FjallStore::open("data/crawlbox")?;
//! store.push_back("crawlbox.news:queue", "{\"method\":\"GET\",\"uri\":\"http://a\"}")?;
//! let next = store.pop_front("crawlbox.news:queue")?;
//! ```

mod fjall_store;
mod keys;
mod memory;

pub use fjall_store::FjallStore;
pub use memory::MemoryStore;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Fjall error: {0}")]
    Fjall(#[from] fjall::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt value under key '{key}': {reason}")]
    Corrupt { key: String, reason: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Key/value primitives used by the crawl queue
///
/// Every method is atomic with respect to the other methods of the same
/// store handle. Keys of different kinds live in separate namespaces, so a
/// list and a counter may share a name without clashing.
pub trait Store: Send + Sync {
    /// Insert at the head of a list, returning the new length
    fn push_front(&self, key: &str, value: &str) -> Result<u64>;

    /// Insert at the tail of a list, returning the new length
    fn push_back(&self, key: &str, value: &str) -> Result<u64>;

    fn pop_front(&self, key: &str) -> Result<Option<String>>;

    fn pop_back(&self, key: &str) -> Result<Option<String>>;

    fn list_len(&self, key: &str) -> Result<u64>;

    /// Set a hash field, returning `true` when the field was newly created
    fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<bool>;

    fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>>;

    /// Remove a hash field, returning `true` when it existed
    fn hash_del(&self, key: &str, field: &str) -> Result<bool>;

    /// All fields of a hash, ordered by field name
    fn hash_get_all(&self, key: &str) -> Result<Vec<(String, String)>>;

    /// Add `delta` to an integer hash field (missing fields count as 0)
    fn hash_incr(&self, key: &str, field: &str, delta: i64) -> Result<i64>;

    /// Insert a set member, returning `true` when it was not present yet
    fn set_add(&self, key: &str, member: &str) -> Result<bool>;

    fn counter_get(&self, key: &str) -> Result<Option<i64>>;

    fn counter_set(&self, key: &str, value: i64) -> Result<()>;

    /// Add `delta` to a counter (missing counters count as 0)
    fn counter_incr(&self, key: &str, delta: i64) -> Result<i64>;

    /// Delete a key of any kind, returning `true` when something was removed
    fn delete(&self, key: &str) -> Result<bool>;

    /// Delete every key starting with `prefix`, returning the number of keys removed
    fn delete_prefix(&self, prefix: &str) -> Result<usize>;

    /// Make every write so far durable
    fn persist(&self) -> Result<()> {
        Ok(())
    }
}

/// Parse an integer stored as decimal text in a hash field
fn parse_int(key: &str, raw: &str) -> Result<i64> {
    raw.parse::<i64>().map_err(|e| StoreError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
