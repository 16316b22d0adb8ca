use std::{
    collections::HashSet,
    hash::Hash,
    sync::{Mutex, MutexGuard},
};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

struct Pending<K> {
    members: HashSet<K>,
    order: Vec<K>,
}

/// Deduplicating set of chunks waiting to be switched from frozen to dynamic.
///
/// Membership check and insertion happen under one lock acquisition, so two callers racing
/// on the same key see exactly one `true`. Drained once per tick, in insertion order.
pub struct UnfreezeQueue<K> {
    pending: Mutex<Pending<K>>,
}

impl<K: Copy + Eq + Hash> UnfreezeQueue<K> {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Pending {
                members: HashSet::new(),
                order: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Pending<K>> {
        // Nothing in here can be left half-updated by a panic, so a poisoned lock is still usable.
        self.pending.lock().unwrap_or_else(|poisoned| {
            warn!("Unfreeze queue lock was poisoned, recovering.");
            poisoned.into_inner()
        })
    }

    /// Returns `true` if `key` was not already queued.
    pub fn insert(&self, key: K) -> bool {
        let mut pending = self.lock();
        let inserted = pending.members.insert(key);
        if inserted {
            pending.order.push(key);
        }
        inserted
    }

    pub fn contains(&self, key: &K) -> bool {
        self.lock().members.contains(key)
    }

    pub fn len(&self) -> usize {
        self.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn reserve(&self, additional: usize) {
        let mut pending = self.lock();
        pending.members.reserve(additional);
        pending.order.reserve(additional);
    }

    /// Empties the queue, returning everything in the order it was inserted.
    pub fn drain(&self) -> Vec<K> {
        let mut pending = self.lock();
        pending.members.clear();
        std::mem::take(&mut pending.order)
    }
}

impl<K: Copy + Eq + Hash> Default for UnfreezeQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn second_insert_is_rejected() {
        let queue = UnfreezeQueue::new();
        assert!(queue.insert(3));
        assert!(!queue.insert(3));
        assert!(queue.insert(1));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.drain(), vec![3, 1]);
        assert!(queue.is_empty());
        assert!(queue.insert(3), "drained keys may be queued again");
    }

    #[test]
    fn racing_inserts_admit_each_key_once() {
        let queue = UnfreezeQueue::new();
        queue.reserve(64);
        let admitted = AtomicUsize::new(0);
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for k in 0..64u32 {
                        if queue.insert(k) {
                            admitted.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                });
            }
        });
        assert_eq!(admitted.load(Ordering::Relaxed), 64);
        let mut drained = queue.drain();
        drained.sort_unstable();
        assert_eq!(drained, (0..64).collect::<Vec<_>>());
    }
}
