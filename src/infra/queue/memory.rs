//! In-memory priority queue over demand events.
//!
//! This is the single-global-queue design: one heap serves every priority
//! class, so cross-class ordering is strict. A higher-priority event is never
//! dequeued after an earlier-arrived lower-priority event when both are
//! present. Within one class, arrival order is preserved (FIFO) via a
//! monotonically increasing sequence assigned under the heap lock.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::core::event::DemandEvent;

/// Heap entry ordering events by (priority rank, arrival sequence).
struct QueuedEvent {
    seq: u64,
    event: DemandEvent,
}

impl PartialEq for QueuedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for QueuedEvent {}

impl PartialOrd for QueuedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the smallest
        // (priority rank, sequence) pair pops first.
        (other.event.priority, other.seq).cmp(&(self.event.priority, self.seq))
    }
}

/// Single global priority queue with FIFO ordering within a priority class.
///
/// `enqueue` never blocks and never drops (the heap is unbounded); consumers
/// suspend on a notification with a bounded poll timeout when the queue is
/// empty rather than spinning.
pub struct PriorityEventQueue {
    inner: Mutex<QueueInner>,
    notify: Notify,
}

struct QueueInner {
    heap: BinaryHeap<QueuedEvent>,
    next_seq: u64,
}

impl PriorityEventQueue {
    /// Create an empty queue.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                heap: BinaryHeap::new(),
                next_seq: 0,
            }),
            notify: Notify::new(),
        }
    }

    /// Enqueue an event. Never blocks, never drops.
    ///
    /// The arrival sequence is assigned under the heap lock, so FIFO within a
    /// priority class is exact with respect to lock acquisition order.
    pub fn enqueue(&self, event: DemandEvent) {
        {
            let mut inner = self.inner.lock();
            let seq = inner.next_seq;
            inner.next_seq += 1;
            tracing::debug!(event_id = %event.id, priority = ?event.priority, seq, "event enqueued");
            inner.heap.push(QueuedEvent { seq, event });
        }
        self.notify.notify_one();
    }

    /// Pop the front event, if any: lowest priority rank first, FIFO within
    /// equal rank.
    pub fn try_dequeue(&self) -> Option<DemandEvent> {
        self.inner.lock().heap.pop().map(|qe| qe.event)
    }

    /// Pop the front event, suspending up to `poll` on empty.
    ///
    /// Wakes early when an enqueue arrives; otherwise returns `None` after
    /// the bounded delay so callers can re-check shutdown conditions.
    pub async fn dequeue_wait(&self, poll: Duration) -> Option<DemandEvent> {
        if let Some(event) = self.try_dequeue() {
            return Some(event);
        }
        let _ = tokio::time::timeout(poll, self.notify.notified()).await;
        self.try_dequeue()
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.inner.lock().heap.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().heap.is_empty()
    }
}
