use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use super::{Result, Store, parse_int};

#[derive(Debug, Default)]
struct State {
    lists: HashMap<String, VecDeque<String>>,
    hashes: HashMap<String, BTreeMap<String, String>>,
    sets: HashMap<String, BTreeSet<String>>,
    counters: HashMap<String, i64>,
}

/// In-process store with the same semantics as [`super::FjallStore`]
///
/// State is lost when the process exits; clones of an `Arc<MemoryStore>`
/// share it, which is enough to exercise resume within one process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // Every operation leaves the maps consistent before it can panic.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Store for MemoryStore {
    fn push_front(&self, key: &str, value: &str) -> Result<u64> {
        let mut state = self.state();
        let list = state.lists.entry(key.to_string()).or_default();
        list.push_front(value.to_string());
        Ok(list.len() as u64)
    }

    fn push_back(&self, key: &str, value: &str) -> Result<u64> {
        let mut state = self.state();
        let list = state.lists.entry(key.to_string()).or_default();
        list.push_back(value.to_string());
        Ok(list.len() as u64)
    }

    fn pop_front(&self, key: &str) -> Result<Option<String>> {
        Ok(self.state().lists.get_mut(key).and_then(VecDeque::pop_front))
    }

    fn pop_back(&self, key: &str) -> Result<Option<String>> {
        Ok(self.state().lists.get_mut(key).and_then(VecDeque::pop_back))
    }

    fn list_len(&self, key: &str) -> Result<u64> {
        Ok(self.state().lists.get(key).map_or(0, |l| l.len() as u64))
    }

    fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<bool> {
        let mut state = self.state();
        let hash = state.hashes.entry(key.to_string()).or_default();
        Ok(hash.insert(field.to_string(), value.to_string()).is_none())
    }

    fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>> {
        Ok(self
            .state()
            .hashes
            .get(key)
            .and_then(|h| h.get(field))
            .cloned())
    }

    fn hash_del(&self, key: &str, field: &str) -> Result<bool> {
        Ok(self
            .state()
            .hashes
            .get_mut(key)
            .is_some_and(|h| h.remove(field).is_some()))
    }

    fn hash_get_all(&self, key: &str) -> Result<Vec<(String, String)>> {
        Ok(self
            .state()
            .hashes
            .get(key)
            .map(|h| h.iter().map(|(f, v)| (f.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    fn hash_incr(&self, key: &str, field: &str, delta: i64) -> Result<i64> {
        let mut state = self.state();
        let hash = state.hashes.entry(key.to_string()).or_default();
        let current = match hash.get(field) {
            Some(raw) => parse_int(key, raw)?,
            None => 0,
        };
        let next = current + delta;
        hash.insert(field.to_string(), next.to_string());
        Ok(next)
    }

    fn set_add(&self, key: &str, member: &str) -> Result<bool> {
        let mut state = self.state();
        Ok(state
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string()))
    }

    fn counter_get(&self, key: &str) -> Result<Option<i64>> {
        Ok(self.state().counters.get(key).copied())
    }

    fn counter_set(&self, key: &str, value: i64) -> Result<()> {
        self.state().counters.insert(key.to_string(), value);
        Ok(())
    }

    fn counter_incr(&self, key: &str, delta: i64) -> Result<i64> {
        let mut state = self.state();
        let counter = state.counters.entry(key.to_string()).or_insert(0);
        *counter += delta;
        Ok(*counter)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let mut state = self.state();
        let mut removed = state.lists.remove(key).is_some_and(|l| !l.is_empty());
        removed |= state.hashes.remove(key).is_some_and(|h| !h.is_empty());
        removed |= state.sets.remove(key).is_some_and(|s| !s.is_empty());
        removed |= state.counters.remove(key).is_some();
        Ok(removed)
    }

    fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        let mut state = self.state();
        let before = state.lists.values().filter(|l| !l.is_empty()).count()
            + state.hashes.values().filter(|h| !h.is_empty()).count()
            + state.sets.values().filter(|s| !s.is_empty()).count()
            + state.counters.len();

        state.lists.retain(|k, _| !k.starts_with(prefix));
        state.hashes.retain(|k, _| !k.starts_with(prefix));
        state.sets.retain(|k, _| !k.starts_with(prefix));
        state.counters.retain(|k, _| !k.starts_with(prefix));

        let after = state.lists.values().filter(|l| !l.is_empty()).count()
            + state.hashes.values().filter(|h| !h.is_empty()).count()
            + state.sets.values().filter(|s| !s.is_empty()).count()
            + state.counters.len();
        Ok(before - after)
    }
}
