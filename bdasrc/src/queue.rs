//! Bounded sample queue.
//!
//! Single producer (the driver's delivery thread), single consumer (the
//! pull side). The producer never waits for the consumer: when the queue is
//! full the oldest buffer is evicted. The consumer blocks until a buffer
//! arrives or a flush begins.

use std::collections::VecDeque;

use bytes::Bytes;
use log::{debug, trace, warn};
use parking_lot::{Condvar, Mutex};
use thiserror::Error;

/// Default queue capacity, in buffers.
pub const DEFAULT_CAPACITY: usize = 50;

/// One captured transport stream sample.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CapturedBuffer {
    data: Bytes,
}

impl CapturedBuffer {
    /// Copy a sample into an owned buffer.
    pub fn from_slice(data: &[u8]) -> Self {
        Self {
            data: Bytes::copy_from_slice(data),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl From<Bytes> for CapturedBuffer {
    fn from(data: Bytes) -> Self {
        Self { data }
    }
}

impl AsRef<[u8]> for CapturedBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// Returned by [`SampleQueue::pop`] while a flush is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Queue is flushing")]
pub struct Flushing;

/// What [`SampleQueue::push`] did with a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Queued without loss.
    Queued,
    /// Queued after evicting this many older buffers.
    Evicted(usize),
    /// Discarded because a flush is in progress.
    Discarded,
}

/// Queue counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Buffers accepted.
    pub enqueued: u64,
    /// Buffers handed to the consumer.
    pub dequeued: u64,
    /// Buffers evicted on overflow.
    pub dropped: u64,
    /// Buffers discarded during a flush, or cleared at its end.
    pub flushed: u64,
}

struct Inner {
    buffers: VecDeque<CapturedBuffer>,
    capacity: usize,
    flushing: bool,
    stats: QueueStats,
}

impl Inner {
    fn evict_to(&mut self, limit: usize) -> usize {
        let mut evicted = 0;
        while self.buffers.len() > limit {
            self.buffers.pop_front();
            evicted += 1;
        }
        self.stats.dropped += evicted as u64;
        evicted
    }
}

/// Bounded FIFO of captured buffers with flush support.
pub struct SampleQueue {
    inner: Mutex<Inner>,
    available: Condvar,
}

impl SampleQueue {
    /// Create a queue holding at most `capacity` buffers (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Inner {
                buffers: VecDeque::with_capacity(capacity),
                capacity,
                flushing: false,
                stats: QueueStats::default(),
            }),
            available: Condvar::new(),
        }
    }

    /// Append a buffer, evicting the oldest ones if the queue is full.
    ///
    /// Never blocks beyond the queue lock.
    pub fn push(&self, buffer: CapturedBuffer) -> EnqueueOutcome {
        let mut inner = self.inner.lock();
        if inner.flushing {
            inner.stats.flushed += 1;
            trace!("[Queue] Discarding {} bytes while flushing", buffer.len());
            return EnqueueOutcome::Discarded;
        }

        let limit = inner.capacity - 1;
        let evicted = inner.evict_to(limit);
        if evicted > 0 {
            warn!(
                "[Queue] Full, dropped {} oldest buffer(s) ({} dropped in total)",
                evicted, inner.stats.dropped
            );
        }

        inner.buffers.push_back(buffer);
        inner.stats.enqueued += 1;
        drop(inner);
        self.available.notify_one();

        if evicted > 0 {
            EnqueueOutcome::Evicted(evicted)
        } else {
            EnqueueOutcome::Queued
        }
    }

    /// Take the oldest buffer, waiting for one if the queue is empty.
    ///
    /// Returns [`Flushing`] without consuming anything once a flush has
    /// begun.
    pub fn pop(&self) -> Result<CapturedBuffer, Flushing> {
        let mut inner = self.inner.lock();
        loop {
            if inner.flushing {
                return Err(Flushing);
            }
            if let Some(buffer) = inner.buffers.pop_front() {
                inner.stats.dequeued += 1;
                return Ok(buffer);
            }
            self.available.wait(&mut inner);
        }
    }

    /// Take the oldest buffer if one is available.
    pub fn try_pop(&self) -> Result<Option<CapturedBuffer>, Flushing> {
        let mut inner = self.inner.lock();
        if inner.flushing {
            return Err(Flushing);
        }
        let buffer = inner.buffers.pop_front();
        if buffer.is_some() {
            inner.stats.dequeued += 1;
        }
        Ok(buffer)
    }

    /// Enter the flushing state and wake every waiting consumer.
    pub fn begin_flush(&self) {
        let mut inner = self.inner.lock();
        inner.flushing = true;
        drop(inner);
        self.available.notify_all();
        debug!("[Queue] Flush started");
    }

    /// Leave the flushing state, discarding everything buffered.
    pub fn end_flush(&self) {
        let mut inner = self.inner.lock();
        let cleared = inner.buffers.len();
        inner.buffers.clear();
        inner.stats.flushed += cleared as u64;
        inner.flushing = false;
        debug!("[Queue] Flush stopped, {} buffer(s) discarded", cleared);
    }

    /// Discard everything buffered and leave the flushing state.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.buffers.clear();
        inner.flushing = false;
        drop(inner);
        self.available.notify_all();
    }

    /// Discard everything buffered and stay flushing until the next
    /// [`SampleQueue::reset`] or [`SampleQueue::end_flush`]. Waiting
    /// consumers are released with [`Flushing`].
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        let cleared = inner.buffers.len();
        inner.buffers.clear();
        inner.stats.flushed += cleared as u64;
        inner.flushing = true;
        drop(inner);
        self.available.notify_all();
        debug!("[Queue] Closed, {} buffer(s) discarded", cleared);
    }

    /// Change the capacity, evicting the oldest buffers if needed.
    pub fn set_capacity(&self, capacity: usize) {
        let mut inner = self.inner.lock();
        inner.capacity = capacity.max(1);
        let limit = inner.capacity;
        let evicted = inner.evict_to(limit);
        if evicted > 0 {
            warn!("[Queue] Resized to {}, dropped {} buffer(s)", limit, evicted);
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    pub fn len(&self) -> usize {
        self.inner.lock().buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().buffers.is_empty()
    }

    pub fn is_flushing(&self) -> bool {
        self.inner.lock().flushing
    }

    pub fn stats(&self) -> QueueStats {
        self.inner.lock().stats
    }
}

impl Default for SampleQueue {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn buf(tag: u8) -> CapturedBuffer {
        CapturedBuffer::from_slice(&[tag; 4])
    }

    fn drain(queue: &SampleQueue) -> Vec<u8> {
        let mut tags = Vec::new();
        while let Ok(Some(buffer)) = queue.try_pop() {
            tags.push(buffer.as_slice()[0]);
        }
        tags
    }

    #[test]
    fn test_fifo_order() {
        let queue = SampleQueue::new(10);
        for tag in 0..5 {
            assert_eq!(queue.push(buf(tag)), EnqueueOutcome::Queued);
        }
        for tag in 0..5 {
            assert_eq!(queue.pop().unwrap().as_slice()[0], tag);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_keeps_most_recent() {
        let queue = SampleQueue::new(3);
        for tag in 0..10 {
            queue.push(buf(tag));
            assert!(queue.len() <= 3);
        }
        assert_eq!(drain(&queue), vec![7, 8, 9]);
        assert_eq!(queue.stats().dropped, 7);
    }

    #[test]
    fn test_one_past_capacity() {
        let queue = SampleQueue::new(4);
        for tag in 0..4 {
            assert_eq!(queue.push(buf(tag)), EnqueueOutcome::Queued);
        }
        assert_eq!(queue.len(), 4);
        assert_eq!(queue.push(buf(4)), EnqueueOutcome::Evicted(1));
        assert_eq!(queue.len(), 4);
        assert_eq!(drain(&queue), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_empty_buffers() {
        let queue = SampleQueue::new(2);
        for _ in 0..3 {
            queue.push(CapturedBuffer::from_slice(&[]));
        }
        assert_eq!(queue.len(), 2);
        let buffer = queue.pop().unwrap();
        assert!(buffer.is_empty());
        assert_eq!(buffer.len(), 0);
    }

    #[test]
    fn test_zero_capacity_is_one() {
        let queue = SampleQueue::new(0);
        assert_eq!(queue.capacity(), 1);
        queue.push(buf(1));
        queue.push(buf(2));
        assert_eq!(drain(&queue), vec![2]);
    }

    #[test]
    fn test_begin_flush_wakes_consumer() {
        let queue = Arc::new(SampleQueue::new(4));
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        };

        thread::sleep(Duration::from_millis(50));
        queue.begin_flush();
        assert_eq!(consumer.join().unwrap(), Err(Flushing));
    }

    #[test]
    fn test_flush_discards_and_resumes() {
        let queue = SampleQueue::new(4);
        queue.push(buf(1));
        queue.begin_flush();
        assert_eq!(queue.push(buf(2)), EnqueueOutcome::Discarded);
        assert_eq!(queue.pop(), Err(Flushing));
        // Nothing was consumed by the refused pop.
        assert_eq!(queue.len(), 1);

        queue.end_flush();
        assert!(queue.is_empty());
        assert!(!queue.is_flushing());

        let payload = [0x47u8, 0x1f, 0xff, 0x10, 0x00];
        queue.push(CapturedBuffer::from_slice(&payload));
        let buffer = queue.pop().unwrap();
        assert_eq!(buffer.as_slice(), &payload);
        assert_eq!(buffer.len(), payload.len());
        assert_eq!(queue.stats().flushed, 2);
    }

    #[test]
    fn test_producer_wakes_consumer() {
        let queue = Arc::new(SampleQueue::new(8));
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                (0..20)
                    .map(|_| queue.pop().map(|b| b.as_slice()[0]))
                    .collect::<Result<Vec<_>, _>>()
            })
        };

        for tag in 0..20 {
            queue.push(buf(tag));
            // Slow enough that the consumer keeps up.
            thread::sleep(Duration::from_millis(2));
        }

        let tags = consumer.join().unwrap().unwrap();
        assert_eq!(tags, (0..20).collect::<Vec<u8>>());
    }

    #[test]
    fn test_close_releases_consumer() {
        let queue = Arc::new(SampleQueue::new(4));
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        };

        thread::sleep(Duration::from_millis(50));
        queue.close();
        assert_eq!(consumer.join().unwrap(), Err(Flushing));

        // Stays closed until reset.
        assert_eq!(queue.push(buf(1)), EnqueueOutcome::Discarded);
        assert_eq!(queue.pop(), Err(Flushing));
        queue.reset();
        queue.push(buf(2));
        assert_eq!(queue.pop().unwrap().as_slice()[0], 2);
    }

    #[test]
    fn test_shrink_evicts_oldest() {
        let queue = SampleQueue::new(5);
        for tag in 0..5 {
            queue.push(buf(tag));
        }
        queue.set_capacity(2);
        assert_eq!(queue.capacity(), 2);
        assert_eq!(drain(&queue), vec![3, 4]);
    }
}
