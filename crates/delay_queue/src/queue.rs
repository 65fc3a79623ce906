//! Due-time ordered queue with identity dedup.
//!
//! Uses index-based separation:
//! - BinaryHeap stores lightweight slots (due-time + sequence + slab key)
//! - Slab stores the queued values
//!
//! Heap, slab and membership set sit behind one mutex so the residency check
//! and the insert are a single critical section.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::fmt;
use std::time::Duration;

use contracts::Identify;
use parking_lot::Mutex;
use slab::Slab;
use tokio::time::Instant;

/// Lightweight heap entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Slot {
    due: Instant,
    /// Push order, only makes ordering total
    seq: u64,
    slab_key: usize,
}

struct Entry<T> {
    value: T,
    identity: String,
    due: Instant,
}

struct Inner<T> {
    heap: BinaryHeap<Reverse<Slot>>,
    storage: Slab<Entry<T>>,
    /// Identities of resident items
    resident: HashSet<String>,
    next_seq: u64,
}

impl<T> Inner<T> {
    fn pop_root(&mut self) -> Option<QueueItem<T>> {
        let Reverse(slot) = self.heap.pop()?;
        let entry = self.storage.remove(slot.slab_key);
        self.resident.remove(&entry.identity);
        Some(QueueItem {
            value: entry.value,
            due: entry.due,
        })
    }

    fn root_due(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse(slot)| slot.due)
    }
}

/// Item removed from (or observed in) the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem<T> {
    pub value: T,
    /// Instant the item became eligible for delivery
    pub due: Instant,
}

/// Thread-safe TTL-deduplicating min-heap
pub struct DelayQueue<T> {
    inner: Mutex<Inner<T>>,
}

impl<T> fmt::Debug for DelayQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("DelayQueue")
            .field("len", &inner.heap.len())
            .field("next_due", &inner.root_due())
            .finish()
    }
}

impl<T> Default for DelayQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DelayQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                heap: BinaryHeap::new(),
                storage: Slab::new(),
                resident: HashSet::new(),
                next_seq: 0,
            }),
        }
    }

    /// Remove and return the item with the earliest due-time
    pub fn pop(&self) -> Option<QueueItem<T>> {
        self.inner.lock().pop_root()
    }

    /// Current item count
    pub fn len(&self) -> usize {
        self.inner.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Due-time of the root item
    pub fn next_due(&self) -> Option<Instant> {
        self.inner.lock().root_due()
    }

    /// Lazily remove every item due at or before the moment of this call
    ///
    /// The lock is taken per item, never held between items.
    pub fn drain_ready(&self) -> DrainReady<'_, T> {
        self.drain_ready_at(Instant::now())
    }

    /// `drain_ready` against an explicit cut-off
    pub fn drain_ready_at(&self, now: Instant) -> DrainReady<'_, T> {
        DrainReady { queue: self, now }
    }

    fn pop_due(&self, now: Instant) -> Option<QueueItem<T>> {
        let mut inner = self.inner.lock();
        match inner.root_due() {
            Some(due) if due <= now => inner.pop_root(),
            _ => None,
        }
    }
}

impl<T: Identify> DelayQueue<T> {
    /// Enqueue `item` to become due after `ttl`
    ///
    /// Returns `false` without touching the queue when an item with the same
    /// identity is already resident; its due-time is not refreshed.
    pub fn push(&self, item: T, ttl: Duration) -> bool {
        let identity = item.identity();
        let mut inner = self.inner.lock();

        if !inner.resident.insert(identity.clone()) {
            return false;
        }

        let due = Instant::now() + ttl;
        let slab_key = inner.storage.insert(Entry {
            value: item,
            identity,
            due,
        });
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.heap.push(Reverse(Slot { due, seq, slab_key }));
        true
    }

    /// Whether an item with this identity is waiting in the queue
    pub fn contains(&self, identity: &str) -> bool {
        self.inner.lock().resident.contains(identity)
    }
}

impl<T: Clone> DelayQueue<T> {
    /// Root item without removing it
    pub fn peek(&self) -> Option<QueueItem<T>> {
        let inner = self.inner.lock();
        let Reverse(slot) = inner.heap.peek()?;
        let entry = inner.storage.get(slot.slab_key)?;
        Some(QueueItem {
            value: entry.value.clone(),
            due: entry.due,
        })
    }
}

/// Finite iterator over due items, see [`DelayQueue::drain_ready`]
///
/// Stops at the first item still in the future; heap order guarantees every
/// remaining item is later still.
pub struct DrainReady<'a, T> {
    queue: &'a DelayQueue<T>,
    now: Instant,
}

impl<T> Iterator for DrainReady<'_, T> {
    type Item = QueueItem<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.queue.pop_due(self.now)
    }
}
