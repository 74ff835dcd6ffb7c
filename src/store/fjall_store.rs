use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use tracing::{debug, info};

use super::keys::{
    decode_counter, decode_list_bounds, decode_member_key, encode_counter, encode_list_bounds,
    encode_list_key, encode_member_key, encode_member_prefix,
};
use super::{Result, Store, StoreError, parse_int};

/// Fjall-backed persistent store for crawl queue state
///
/// Architecture:
/// - `lists` partition: ordered list elements, see [`encode_list_key`]
/// - `hashes` partition: hash fields
/// - `sets` partition: set members (empty values)
/// - `counters` partition: signed 64-bit counters
/// - `list_bounds` partition: head position and length of each non-empty
///   list, so pushes and pops touch one element instead of scanning
///
/// Single-key writes are atomic in fjall already. An element write and its
/// bounds update are committed in one batch. Read-modify-write operations
/// (list pushes, increments, insert-if-absent) additionally take
/// the store's write lock so concurrent callers sharing a handle never
/// interleave halfway through one of them.
#[derive(Clone)]
pub struct FjallStore {
    keyspace: Keyspace,
    lists: PartitionHandle,
    hashes: PartitionHandle,
    sets: PartitionHandle,
    counters: PartitionHandle,
    list_bounds: PartitionHandle,
    write_lock: Arc<Mutex<()>>,
}

impl FjallStore {
    /// Open or create a store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening Fjall store at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;

        let lists = keyspace.open_partition("lists", PartitionCreateOptions::default())?;
        let hashes = keyspace.open_partition("hashes", PartitionCreateOptions::default())?;
        let sets = keyspace.open_partition("sets", PartitionCreateOptions::default())?;
        let counters = keyspace.open_partition("counters", PartitionCreateOptions::default())?;
        let list_bounds =
            keyspace.open_partition("list_bounds", PartitionCreateOptions::default())?;

        info!("Fjall store opened successfully");
        Ok(Self {
            keyspace,
            lists,
            hashes,
            sets,
            counters,
            list_bounds,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The guarded value is `()`, so a poisoned lock holds no broken state.
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Head position and length of a list, `None` when it is empty
    fn list_bounds(&self, name: &str) -> Result<Option<(i64, u64)>> {
        match self.list_bounds.get(name)? {
            Some(raw) => decode_list_bounds(&raw)
                .map(Some)
                .ok_or_else(|| StoreError::Corrupt {
                    key: name.to_string(),
                    reason: "list bounds are not 16 bytes".to_string(),
                }),
            None => Ok(None),
        }
    }

    fn push(&self, name: &str, value: &str, front: bool) -> Result<u64> {
        let _guard = self.lock();

        let (head, position, len) = match self.list_bounds(name)? {
            Some((head, len)) if front => (head - 1, head - 1, len + 1),
            Some((head, len)) => (head, head + len as i64, len + 1),
            None => (0, 0, 1),
        };

        let mut batch = self.keyspace.batch();
        batch.insert(&self.lists, encode_list_key(name, position), value.as_bytes());
        batch.insert(&self.list_bounds, name.as_bytes(), encode_list_bounds(head, len).to_vec());
        batch.commit()?;

        debug!(list = name, position, len, "List push");
        Ok(len)
    }

    fn pop(&self, name: &str, front: bool) -> Result<Option<String>> {
        let _guard = self.lock();

        let Some((head, len)) = self.list_bounds(name)? else {
            return Ok(None);
        };
        let position = if front { head } else { head + len as i64 - 1 };
        let key = encode_list_key(name, position);
        let value = self.lists.get(&key)?.ok_or_else(|| StoreError::Corrupt {
            key: name.to_string(),
            reason: format!("missing list element at position {position}"),
        })?;

        let mut batch = self.keyspace.batch();
        batch.remove(&self.lists, key);
        if len == 1 {
            batch.remove(&self.list_bounds, name.as_bytes());
        } else {
            let head = if front { head + 1 } else { head };
            batch.insert(&self.list_bounds, name.as_bytes(), encode_list_bounds(head, len - 1).to_vec());
        }
        batch.commit()?;

        String::from_utf8(value.to_vec())
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                key: name.to_string(),
                reason: e.to_string(),
            })
    }

    fn member_partitions(&self) -> [(&'static str, &PartitionHandle); 3] {
        [
            ("lists", &self.lists),
            ("hashes", &self.hashes),
            ("sets", &self.sets),
        ]
    }
}

impl Store for FjallStore {
    fn push_front(&self, key: &str, value: &str) -> Result<u64> {
        self.push(key, value, true)
    }

    fn push_back(&self, key: &str, value: &str) -> Result<u64> {
        self.push(key, value, false)
    }

    fn pop_front(&self, key: &str) -> Result<Option<String>> {
        self.pop(key, true)
    }

    fn pop_back(&self, key: &str) -> Result<Option<String>> {
        self.pop(key, false)
    }

    fn list_len(&self, key: &str) -> Result<u64> {
        Ok(self.list_bounds(key)?.map_or(0, |(_, len)| len))
    }

    fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<bool> {
        let _guard = self.lock();
        let member = encode_member_key(key, field);
        let created = !self.hashes.contains_key(&member)?;
        self.hashes.insert(member, value.as_bytes())?;
        Ok(created)
    }

    fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>> {
        Ok(self
            .hashes
            .get(encode_member_key(key, field))?
            .map(|v| String::from_utf8_lossy(&v).into_owned()))
    }

    fn hash_del(&self, key: &str, field: &str) -> Result<bool> {
        let _guard = self.lock();
        let member = encode_member_key(key, field);
        let existed = self.hashes.contains_key(&member)?;
        if existed {
            self.hashes.remove(member)?;
        }
        Ok(existed)
    }

    fn hash_get_all(&self, key: &str) -> Result<Vec<(String, String)>> {
        let mut fields = Vec::new();
        for item in self.hashes.prefix(encode_member_prefix(key)) {
            let (raw_key, value) = item?;
            let field = decode_member_key(key, &raw_key).ok_or_else(|| StoreError::Corrupt {
                key: key.to_string(),
                reason: "hash field is not valid UTF-8".to_string(),
            })?;
            fields.push((field, String::from_utf8_lossy(&value).into_owned()));
        }
        Ok(fields)
    }

    fn hash_incr(&self, key: &str, field: &str, delta: i64) -> Result<i64> {
        let _guard = self.lock();
        let member = encode_member_key(key, field);
        let current = match self.hashes.get(&member)? {
            Some(raw) => parse_int(key, &String::from_utf8_lossy(&raw))?,
            None => 0,
        };
        let next = current + delta;
        self.hashes.insert(member, next.to_string().as_bytes())?;
        Ok(next)
    }

    fn set_add(&self, key: &str, member: &str) -> Result<bool> {
        let _guard = self.lock();
        let member = encode_member_key(key, member);
        if self.sets.contains_key(&member)? {
            return Ok(false);
        }
        self.sets.insert(member, b"")?;
        Ok(true)
    }

    fn counter_get(&self, key: &str) -> Result<Option<i64>> {
        match self.counters.get(key)? {
            Some(raw) => decode_counter(&raw).map(Some).ok_or_else(|| StoreError::Corrupt {
                key: key.to_string(),
                reason: "counter is not 8 bytes".to_string(),
            }),
            None => Ok(None),
        }
    }

    fn counter_set(&self, key: &str, value: i64) -> Result<()> {
        self.counters.insert(key, encode_counter(value))?;
        Ok(())
    }

    fn counter_incr(&self, key: &str, delta: i64) -> Result<i64> {
        let _guard = self.lock();
        let next = self.counter_get(key)?.unwrap_or(0) + delta;
        self.counter_set(key, next)?;
        Ok(next)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let _guard = self.lock();
        let mut batch = self.keyspace.batch();
        let mut removed = false;

        for (_, partition) in self.member_partitions() {
            for item in partition.prefix(encode_member_prefix(key)) {
                let (raw_key, _) = item?;
                batch.remove(partition, raw_key);
                removed = true;
            }
        }
        if self.list_bounds.contains_key(key)? {
            batch.remove(&self.list_bounds, key.as_bytes());
        }
        if self.counters.contains_key(key)? {
            batch.remove(&self.counters, key.as_bytes());
            removed = true;
        }

        batch.commit()?;
        Ok(removed)
    }

    fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        let _guard = self.lock();
        let mut batch = self.keyspace.batch();
        let mut names: HashSet<Vec<u8>> = HashSet::new();

        for (kind, partition) in self.member_partitions() {
            for item in partition.prefix(prefix) {
                let (raw_key, _) = item?;
                let name_len = raw_key.iter().position(|b| *b == 0).unwrap_or(raw_key.len());
                // Kinds are separate namespaces, tag the name with the partition.
                let mut name = kind.as_bytes().to_vec();
                name.push(0);
                name.extend_from_slice(&raw_key[..name_len]);
                names.insert(name);
                batch.remove(partition, raw_key);
            }
        }
        for item in self.counters.prefix(prefix) {
            let (raw_key, _) = item?;
            let mut name = b"counters\0".to_vec();
            name.extend_from_slice(&raw_key);
            names.insert(name);
            batch.remove(&self.counters, raw_key);
        }
        // Bounds belong to lists already counted above.
        for item in self.list_bounds.prefix(prefix) {
            let (raw_key, _) = item?;
            batch.remove(&self.list_bounds, raw_key);
        }

        batch.commit()?;
        debug!(prefix, removed = names.len(), "Deleted keys by prefix");
        Ok(names.len())
    }

    fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }
}
