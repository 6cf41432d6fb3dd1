//! The single-producer, single-consumer Lamport-ordered request queue.
//!
//! Items are dispatched Lamport-ascending, FIFO on ties. Built on
//! `BinaryHeap` behind a `parking_lot::Mutex` rather than a channel
//! because ordering is by Lamport value, not arrival order — a plain
//! mpsc queue cannot express that reordering.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use parking_lot::Mutex;

use wx_core::WorkItem;

/// A queued item paired with the Lamport value and arrival sequence
/// that determine its dispatch order.
struct Entry<S> {
    lamport: u64,
    arrival_seq: u64,
    item: WorkItem<S>,
}

impl<S> PartialEq for Entry<S> {
    fn eq(&self, other: &Self) -> bool {
        self.lamport == other.lamport && self.arrival_seq == other.arrival_seq
    }
}
impl<S> Eq for Entry<S> {}

impl<S> PartialOrd for Entry<S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<S> Ord for Entry<S> {
    /// `BinaryHeap` is a max-heap; reversing Lamport (and then arrival
    /// sequence) makes the lowest Lamport / earliest arrival compare
    /// greatest, so `pop()` yields Lamport-ascending, FIFO-on-ties order.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .lamport
            .cmp(&self.lamport)
            .then_with(|| other.arrival_seq.cmp(&self.arrival_seq))
    }
}

/// Lamport-ordered priority queue of pending [`WorkItem`]s.
pub struct RequestQueue<S> {
    heap: Mutex<BinaryHeap<Entry<S>>>,
    next_seq: AtomicU64,
}

impl<S> RequestQueue<S> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Enqueues `item`, tagging it with the next arrival sequence number.
    pub fn enqueue(&self, item: WorkItem<S>) {
        let arrival_seq = self.next_seq.fetch_add(1, AtomicOrdering::Relaxed);
        let lamport = item.lamport();
        self.heap.lock().push(Entry {
            lamport,
            arrival_seq,
            item,
        });
    }

    /// Removes and returns the lowest-Lamport (earliest-arrival-on-tie)
    /// item, or `None` if the queue is empty.
    pub fn poll(&self) -> Option<WorkItem<S>> {
        self.heap.lock().pop().map(|entry| entry.item)
    }

    /// Current number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.lock().len()
    }

    /// `true` if the queue has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S> Default for RequestQueue<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use wx_core::Record;

    fn fetch(id: &str, lamport: u64) -> WorkItem<()> {
        WorkItem::Fetch {
            id: id.to_string(),
            lamport,
            socket: (),
        }
    }

    proptest! {
        /// Under any interleaving of enqueues, dispatch order is
        /// Lamport-ascending, and arrival order is preserved among
        /// items that share a Lamport value (FIFO on ties).
        #[test]
        fn dispatch_is_lamport_ascending_and_fifo_on_ties(
            lamports in proptest::collection::vec(0u64..10, 0..200)
        ) {
            let queue: RequestQueue<()> = RequestQueue::new();
            for (arrival_index, lamport) in lamports.iter().enumerate() {
                queue.enqueue(fetch(&arrival_index.to_string(), *lamport));
            }

            let mut dispatched = Vec::new();
            while let Some(item) = queue.poll() {
                if let WorkItem::Fetch { id, lamport, .. } = item {
                    dispatched.push((lamport, id.parse::<usize>().unwrap()));
                }
            }

            prop_assert_eq!(dispatched.len(), lamports.len());

            let dispatched_lamports: Vec<u64> = dispatched.iter().map(|(l, _)| *l).collect();
            let mut sorted_lamports = dispatched_lamports.clone();
            sorted_lamports.sort_unstable();
            prop_assert_eq!(dispatched_lamports, sorted_lamports);

            for pair in dispatched.windows(2) {
                let (lamport_a, arrival_a) = pair[0];
                let (lamport_b, arrival_b) = pair[1];
                if lamport_a == lamport_b {
                    prop_assert!(arrival_a < arrival_b);
                }
            }
        }
    }

    fn push(id: &str, lamport: u64) -> WorkItem<()> {
        WorkItem::Push {
            producer_id: id.to_string(),
            record: Record::from_json(json!({"id": id})).unwrap(),
            lamport,
            socket: (),
        }
    }

    #[test]
    fn poll_on_empty_queue_is_none() {
        let queue: RequestQueue<()> = RequestQueue::new();
        assert!(queue.poll().is_none());
    }

    #[test]
    fn dispatches_lowest_lamport_first() {
        let queue = RequestQueue::new();
        queue.enqueue(fetch("high", 10));
        queue.enqueue(fetch("low", 2));
        queue.enqueue(fetch("mid", 5));

        assert_eq!(queue.poll().unwrap().lamport(), 2);
        assert_eq!(queue.poll().unwrap().lamport(), 5);
        assert_eq!(queue.poll().unwrap().lamport(), 10);
        assert!(queue.poll().is_none());
    }

    #[test]
    fn ties_broken_by_arrival_order() {
        let queue = RequestQueue::new();
        queue.enqueue(push("first", 7));
        queue.enqueue(push("second", 7));
        queue.enqueue(push("third", 7));

        let order: Vec<String> = std::iter::from_fn(|| queue.poll())
            .map(|item| match item {
                WorkItem::Push { producer_id, .. } => producer_id,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }

    #[test]
    fn len_and_is_empty_track_contents() {
        let queue = RequestQueue::new();
        assert!(queue.is_empty());
        queue.enqueue(fetch("a", 1));
        assert_eq!(queue.len(), 1);
        queue.poll();
        assert!(queue.is_empty());
    }

    #[test]
    fn interleaved_enqueue_and_poll_preserve_order() {
        let queue = RequestQueue::new();
        queue.enqueue(fetch("a", 3));
        assert_eq!(queue.poll().unwrap().lamport(), 3);
        queue.enqueue(fetch("b", 1));
        queue.enqueue(fetch("c", 2));
        assert_eq!(queue.poll().unwrap().lamport(), 1);
        assert_eq!(queue.poll().unwrap().lamport(), 2);
    }

    #[test]
    fn concurrent_enqueue_preserves_total_count() {
        use std::sync::Arc;
        use std::thread;

        let queue = Arc::new(RequestQueue::new());
        let mut handles = vec![];
        for t in 0..8 {
            let queue = Arc::clone(&queue);
            handles.push(thread::spawn(move || {
                for i in 0..50 {
                    queue.enqueue(fetch("x", (t * 50 + i) as u64));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(queue.len(), 400);
    }
}
