//! Bounded drop-oldest result bus.
//!
//! Acquisition correctness must never depend on the consumer: when the
//! logging/UI side falls behind, the oldest unconsumed results are
//! discarded and publishing continues without blocking. Consumers block
//! (with timeout) on the condition variable instead of polling.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::engine::CycleResult;

struct Inner {
    queue: Mutex<VecDeque<CycleResult>>,
    ready: Condvar,
    capacity: usize,
    dropped: AtomicU64,
}

/// Handle to the shared result queue. Clones share the same queue.
#[derive(Clone)]
pub struct ResultBus {
    inner: Arc<Inner>,
}

impl ResultBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
                ready: Condvar::new(),
                capacity: capacity.max(1),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Publish one result, discarding the oldest entry if full. Never
    /// blocks beyond the queue lock.
    pub fn publish(&self, result: CycleResult) {
        let mut queue = self.inner.queue.lock().expect("result bus poisoned");
        if queue.len() == self.inner.capacity {
            queue.pop_front();
            self.inner.dropped.fetch_add(1, Ordering::Relaxed);
        }
        queue.push_back(result);
        drop(queue);
        self.inner.ready.notify_one();
    }

    /// Take the oldest queued result without waiting.
    pub fn try_recv(&self) -> Option<CycleResult> {
        self.inner
            .queue
            .lock()
            .expect("result bus poisoned")
            .pop_front()
    }

    /// Wait up to `timeout` for a result.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<CycleResult> {
        let queue = self.inner.queue.lock().expect("result bus poisoned");
        let (mut queue, _) = self
            .inner
            .ready
            .wait_timeout_while(queue, timeout, |q| q.is_empty())
            .expect("result bus poisoned");
        queue.pop_front()
    }

    /// Results discarded because the consumer fell behind.
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.inner.queue.lock().expect("result bus poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn result(sequence: u64) -> CycleResult {
        CycleResult {
            sequence,
            wall_time: String::new(),
            flow_l_per_s: 0.0,
            stages: vec![],
            cumulative_power_w: 0.0,
            consistent: true,
            invalid_channels: vec![],
        }
    }

    #[test]
    fn overflow_drops_the_oldest() {
        let bus = ResultBus::new(2);
        bus.publish(result(0));
        bus.publish(result(1));
        bus.publish(result(2));

        assert_eq!(bus.dropped(), 1);
        assert_eq!(bus.try_recv().unwrap().sequence, 1);
        assert_eq!(bus.try_recv().unwrap().sequence, 2);
        assert!(bus.try_recv().is_none());
    }

    #[test]
    fn recv_timeout_wakes_on_publish() {
        let bus = ResultBus::new(4);
        let consumer = bus.clone();
        let handle = thread::spawn(move || consumer.recv_timeout(Duration::from_secs(5)));
        // Give the consumer a moment to park on the condvar.
        thread::sleep(Duration::from_millis(20));
        bus.publish(result(7));

        let received = handle.join().unwrap().expect("consumer timed out");
        assert_eq!(received.sequence, 7);
    }

    #[test]
    fn recv_timeout_expires_when_idle() {
        let bus = ResultBus::new(4);
        assert!(bus.recv_timeout(Duration::from_millis(10)).is_none());
    }
}
