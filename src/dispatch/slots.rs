use std::collections::BTreeSet;
use std::sync::Mutex;

/// Free dispatch slot indices of one cycle, lowest first
#[derive(Debug)]
pub(super) struct SlotPool {
    free: Mutex<BTreeSet<usize>>,
}

impl SlotPool {
    pub(super) fn new(capacity: usize) -> Self {
        Self {
            free: Mutex::new((0..capacity).collect()),
        }
    }

    pub(super) fn acquire(&self) -> Option<usize> {
        self.free.lock().unwrap_or_else(|e| e.into_inner()).pop_first()
    }

    pub(super) fn release(&self, slot: usize) {
        self.free
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowest_free_slot_first() {
        let slots = SlotPool::new(3);
        assert_eq!(slots.acquire(), Some(0));
        assert_eq!(slots.acquire(), Some(1));
        assert_eq!(slots.acquire(), Some(2));
        assert_eq!(slots.acquire(), None);

        slots.release(1);
        assert_eq!(slots.acquire(), Some(1));
    }
}
