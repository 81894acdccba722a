use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Fixed-capacity FIFO between the update producer and the merge consumer.
///
/// On overflow the incoming item is dropped, not the queue head: the
/// producer is latency-sensitive and must never block, and window overlap
/// means dropped content reappears in the next update anyway.
pub struct UpdateRing<T> {
    inner: Mutex<VecDeque<T>>,
    capacity: usize,
}

impl<T> UpdateRing<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Returns `false` when the ring is full and the item was dropped.
    pub fn enqueue(&self, item: T) -> bool {
        let mut queue = self.lock();
        if queue.len() >= self.capacity {
            return false;
        }
        queue.push_back(item);
        true
    }

    pub fn dequeue(&self) -> Option<T> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// At most one free slot left.
    pub fn almost_full(&self) -> bool {
        self.lock().len() + 1 >= self.capacity
    }

    /// Wait until the ring holds at least one item, polling with a short
    /// sleep. No condition variable: the consumer cadence makes the poll
    /// cost irrelevant.
    pub async fn wait_nonempty(&self, poll_interval: Duration) {
        while self.is_empty() {
            tokio::time::sleep(poll_interval).await;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<T>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_preserved() {
        let ring = UpdateRing::new(4);
        for i in 0..4 {
            assert!(ring.enqueue(i));
        }
        for i in 0..4 {
            assert_eq!(ring.dequeue(), Some(i));
        }
        assert_eq!(ring.dequeue(), None);
    }

    #[test]
    fn overflow_drops_the_incoming_item() {
        let ring = UpdateRing::new(10);
        let mut saw_almost_full = false;

        for i in 0..11 {
            let accepted = ring.enqueue(i);
            saw_almost_full |= ring.almost_full();
            assert_eq!(accepted, i < 10, "11th item must be dropped");
        }

        assert!(saw_almost_full);
        assert_eq!(ring.len(), 10);

        // The retained ten are the first ten, in order.
        let drained: Vec<i32> = std::iter::from_fn(|| ring.dequeue()).collect();
        assert_eq!(drained, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn almost_full_flags_one_free_slot() {
        let ring = UpdateRing::new(3);
        ring.enqueue(1);
        assert!(!ring.almost_full());
        ring.enqueue(2);
        assert!(ring.almost_full());
        ring.dequeue();
        assert!(!ring.almost_full());
    }

    #[test]
    fn zero_capacity_clamps_to_one() {
        let ring = UpdateRing::new(0);
        assert!(ring.enqueue(1));
        assert!(!ring.enqueue(2));
        assert_eq!(ring.dequeue(), Some(1));
    }

    #[tokio::test]
    async fn wait_nonempty_returns_once_an_item_arrives() {
        use std::sync::Arc;

        let ring = Arc::new(UpdateRing::new(4));
        let waiter = {
            let ring = Arc::clone(&ring);
            tokio::spawn(async move {
                ring.wait_nonempty(Duration::from_millis(1)).await;
                ring.dequeue()
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        ring.enqueue(7);

        let got = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter must finish")
            .expect("waiter must not panic");
        assert_eq!(got, Some(7));
    }
}
