//! Bounded FIFO admission queue with backpressure.
//!
//! Producers call [`BoundedQueue::try_enqueue`], which never waits: when the
//! queue is at capacity the item is refused and the producer reports the
//! refusal to its own caller. The single consumer awaits
//! [`BoundedQueue::dequeue`], which suspends while the queue is empty and
//! returns `None` once the queue has been closed and drained.
//!
//! # Sizing
//!
//! Capacity bounds memory, not throughput. Size it from the burst the
//! service should absorb while the worker is busy: at a 50ms processing cost
//! the worker drains 20 events/sec, so a capacity of 100 absorbs a five
//! second burst before callers see backpressure.

use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard, PoisonError},
};

use tokio::sync::Notify;

use crate::error::{Result, SluiceError};

/// Outcome of a non-blocking enqueue attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum EnqueueOutcome {
    /// The item was placed at the tail of the queue.
    Accepted,
    /// The item was refused and dropped.
    Rejected(Rejection),
}

impl EnqueueOutcome {
    /// Returns true if the item was admitted.
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Why an enqueue attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The queue held `capacity` items at the moment of the attempt.
    Full,
    /// The queue has been closed.
    Closed,
}

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Fixed-capacity FIFO shared by many producers and one consumer.
///
/// All capacity checks and slot reservations happen under one mutex, so the
/// resident count never exceeds the capacity and every admitted item is
/// handed to exactly one `dequeue` call.
pub struct BoundedQueue<T> {
    state: Mutex<QueueState<T>>,
    capacity: usize,
    item_available: Notify,
}

impl<T> BoundedQueue<T> {
    /// Creates an open, empty queue.
    ///
    /// # Errors
    ///
    /// Returns [`SluiceError::InvalidCapacity`] if `capacity` is 0.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(SluiceError::InvalidCapacity);
        }

        Ok(Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            capacity,
            item_available: Notify::new(),
        })
    }

    /// Attempts to place `item` at the tail without waiting.
    pub fn try_enqueue(&self, item: T) -> EnqueueOutcome {
        self.try_enqueue_with(|| item)
    }

    /// Attempts to admit an item built by `make_item`.
    ///
    /// `make_item` runs only after the capacity check passed and while the
    /// admission lock is held, so values it derives (such as acceptance
    /// timestamps) are ordered the same way as the queue.
    pub fn try_enqueue_with<F>(&self, make_item: F) -> EnqueueOutcome
    where
        F: FnOnce() -> T,
    {
        {
            let mut state = self.lock_state();
            if state.closed {
                return EnqueueOutcome::Rejected(Rejection::Closed);
            }
            if state.items.len() >= self.capacity {
                return EnqueueOutcome::Rejected(Rejection::Full);
            }
            state.items.push_back(make_item());
        }

        self.item_available.notify_one();
        EnqueueOutcome::Accepted
    }

    /// Removes and returns the head of the queue.
    ///
    /// Suspends while the queue is empty and open. Returns `None` once the
    /// queue is closed and every admitted item has been handed out.
    pub async fn dequeue(&self) -> Option<T> {
        loop {
            let notified = self.item_available.notified();
            tokio::pin!(notified);
            // Register before inspecting state so a close or enqueue that
            // lands between the check and the await still wakes us.
            notified.as_mut().enable();

            {
                let mut state = self.lock_state();
                if let Some(item) = state.items.pop_front() {
                    return Some(item);
                }
                if state.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Stops admitting items and wakes a suspended consumer.
    ///
    /// Items already queued remain available to `dequeue`. Returns true if
    /// this call closed the queue, false if it was already closed.
    pub fn close(&self) -> bool {
        let newly_closed = {
            let mut state = self.lock_state();
            !std::mem::replace(&mut state.closed, true)
        };

        self.item_available.notify_waiters();
        newly_closed
    }

    /// Returns true once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.lock_state().closed
    }

    /// Returns the number of items currently queued.
    pub fn len(&self) -> usize {
        self.lock_state().items.len()
    }

    /// Returns true if no items are queued.
    pub fn is_empty(&self) -> bool {
        self.lock_state().items.is_empty()
    }

    /// Returns the fixed capacity chosen at construction.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock_state(&self) -> MutexGuard<'_, QueueState<T>> {
        // A panic inside `make_item` poisons the lock without corrupting the
        // deque, so keep serving.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> std::fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock_state();
        f.debug_struct("BoundedQueue")
            .field("len", &state.items.len())
            .field("capacity", &self.capacity)
            .field("closed", &state.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;

    #[test]
    fn zero_capacity_is_rejected() {
        let result = BoundedQueue::<u32>::new(0);

        assert!(matches!(result, Err(SluiceError::InvalidCapacity)));
    }

    #[test]
    fn rejects_second_item_at_capacity_one() {
        let queue = BoundedQueue::new(1).unwrap();

        assert_eq!(queue.try_enqueue(1), EnqueueOutcome::Accepted);
        assert_eq!(queue.try_enqueue(2), EnqueueOutcome::Rejected(Rejection::Full));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn closed_queue_rejects_with_closed() {
        let queue = BoundedQueue::new(4).unwrap();

        assert!(queue.close());
        assert!(!queue.close(), "second close reports already closed");
        assert_eq!(queue.try_enqueue(1), EnqueueOutcome::Rejected(Rejection::Closed));
        assert!(queue.is_empty());
    }

    #[test]
    fn builder_is_not_invoked_when_rejected() {
        let queue = BoundedQueue::new(1).unwrap();
        let _ = queue.try_enqueue(0);

        let outcome = queue.try_enqueue_with(|| panic!("must not build a rejected item"));

        assert_eq!(outcome, EnqueueOutcome::Rejected(Rejection::Full));
    }

    #[tokio::test]
    async fn dequeues_in_fifo_order() {
        let queue = BoundedQueue::new(3).unwrap();
        for item in ["a", "b", "c"] {
            assert!(queue.try_enqueue(item).is_accepted());
        }

        assert_eq!(queue.dequeue().await, Some("a"));
        assert_eq!(queue.dequeue().await, Some("b"));
        assert_eq!(queue.dequeue().await, Some("c"));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn dequeue_frees_capacity() {
        let queue = BoundedQueue::new(1).unwrap();
        let _ = queue.try_enqueue(1);

        assert_eq!(queue.dequeue().await, Some(1));
        assert_eq!(queue.try_enqueue(2), EnqueueOutcome::Accepted);
    }

    #[tokio::test]
    async fn close_drains_before_reporting_closed() {
        let queue = BoundedQueue::new(2).unwrap();
        let _ = queue.try_enqueue(1);
        let _ = queue.try_enqueue(2);

        queue.close();

        assert_eq!(queue.dequeue().await, Some(1));
        assert_eq!(queue.dequeue().await, Some(2));
        assert_eq!(queue.dequeue().await, None);
        assert_eq!(queue.dequeue().await, None);
    }

    #[tokio::test]
    async fn suspended_consumer_wakes_on_enqueue() {
        let queue = Arc::new(BoundedQueue::new(1).unwrap());
        let consumer = tokio::spawn({
            let queue = queue.clone();
            async move { queue.dequeue().await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!consumer.is_finished(), "consumer should be suspended on an empty queue");

        let _ = queue.try_enqueue(7);

        let item = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer woke up")
            .expect("consumer task joined");
        assert_eq!(item, Some(7));
    }

    #[tokio::test]
    async fn suspended_consumer_wakes_on_close() {
        let queue = Arc::new(BoundedQueue::<u32>::new(1).unwrap());
        let consumer = tokio::spawn({
            let queue = queue.clone();
            async move { queue.dequeue().await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.close();

        let item = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer woke up")
            .expect("consumer task joined");
        assert_eq!(item, None);
    }

    #[test]
    fn debug_reports_occupancy() {
        let queue = BoundedQueue::new(5).unwrap();
        let _ = queue.try_enqueue(1);

        let rendered = format!("{queue:?}");

        assert!(rendered.contains("len: 1"));
        assert!(rendered.contains("capacity: 5"));
    }
}
