//! Bounded block channel between the capture callback and the render loop
//!
//! The producer never blocks: when the queue is full it evicts the oldest
//! queued block and retries, so recent audio always wins over completeness.

use crate::audio::SampleBlock;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters shared by both ends of the channel
#[derive(Debug, Default)]
pub struct ChannelStats {
    enqueued: AtomicU64,
    dropped: AtomicU64,
}

impl ChannelStats {
    /// Blocks accepted from the producer
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    /// Blocks evicted before the consumer saw them
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Create a bounded block channel holding at most `capacity` blocks
///
/// A capacity of zero is raised to one; a rendezvous channel would make the
/// producer wait for the consumer.
pub fn block_channel(capacity: usize) -> (BlockProducer, BlockConsumer) {
    let capacity = capacity.max(1);
    let (tx, rx) = bounded(capacity);
    let stats = Arc::new(ChannelStats::default());

    let producer = BlockProducer {
        tx,
        evict: rx.clone(),
        stats: stats.clone(),
    };
    let consumer = BlockConsumer {
        rx,
        stats,
        capacity,
    };
    (producer, consumer)
}

/// Capture side of the channel
///
/// Not `Clone`: the drop-oldest retry loop assumes a single producer.
pub struct BlockProducer {
    tx: Sender<SampleBlock>,
    evict: Receiver<SampleBlock>,
    stats: Arc<ChannelStats>,
}

impl BlockProducer {
    /// Copy a block of interleaved samples into the queue
    pub fn push(&self, channels: u16, samples: &[f32]) {
        self.send(SampleBlock::new(channels, samples.to_vec()));
    }

    /// Enqueue an owned block, evicting the oldest block if the queue is full
    pub fn send(&self, block: SampleBlock) {
        let mut block = block;
        loop {
            match self.tx.try_send(block) {
                Ok(()) => {
                    self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                    return;
                }
                Err(TrySendError::Full(returned)) => {
                    block = returned;
                    if self.evict.try_recv().is_ok() {
                        self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }

    pub fn stats(&self) -> Arc<ChannelStats> {
        self.stats.clone()
    }
}

/// Render-loop side of the channel
pub struct BlockConsumer {
    rx: Receiver<SampleBlock>,
    stats: Arc<ChannelStats>,
    capacity: usize,
}

impl BlockConsumer {
    /// Take every block queued right now without waiting
    ///
    /// Blocks are handed to `f` in arrival order. Returns the number drained.
    pub fn drain<F: FnMut(SampleBlock)>(&self, mut f: F) -> usize {
        let mut count = 0;
        loop {
            match self.rx.try_recv() {
                Ok(block) => {
                    f(block);
                    count += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return count,
            }
        }
    }

    /// Blocks currently queued
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> Arc<ChannelStats> {
        self.stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn test_drain_preserves_arrival_order() {
        let (producer, consumer) = block_channel(8);
        producer.push(1, &[0.1]);
        producer.push(1, &[0.2]);
        producer.push(1, &[0.3]);

        let mut seen = Vec::new();
        let drained = consumer.drain(|block| seen.extend(block.samples));
        assert_eq!(drained, 3);
        assert_eq!(seen, vec![0.1, 0.2, 0.3]);
        assert!(consumer.is_empty());
    }

    #[test]
    fn test_full_queue_drops_oldest() {
        let (producer, consumer) = block_channel(2);
        for i in 0..5 {
            producer.push(1, &[i as f32]);
        }

        let mut seen = Vec::new();
        consumer.drain(|block| seen.push(block.samples[0]));
        assert_eq!(seen, vec![3.0, 4.0]);

        let stats = consumer.stats();
        assert_eq!(stats.enqueued(), 5);
        assert_eq!(stats.dropped(), 3);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let (producer, consumer) = block_channel(0);
        assert_eq!(consumer.capacity(), 1);
        producer.push(1, &[0.5]);
        producer.push(1, &[0.6]);
        assert_eq!(consumer.len(), 1);
    }

    #[test]
    fn test_producer_survives_dropped_consumer() {
        let (producer, consumer) = block_channel(4);
        drop(consumer);
        for _ in 0..10 {
            producer.send(SampleBlock::new(1, vec![0.0]));
        }
        assert_eq!(producer.stats().dropped(), 6);
    }

    #[test]
    fn test_sustained_overflow_stays_bounded() {
        let (producer, consumer) = block_channel(16);
        let stats = producer.stats();

        let writer = thread::spawn(move || {
            let block = vec![0.25f32; 1024];
            let deadline = Instant::now() + Duration::from_millis(300);
            while Instant::now() < deadline {
                producer.push(1, &block);
            }
        });

        // A stalled consumer that only looks occasionally
        let mut max_seen = 0;
        for _ in 0..10 {
            thread::sleep(Duration::from_millis(20));
            max_seen = max_seen.max(consumer.len());
        }
        writer.join().unwrap();

        assert!(max_seen <= 16);
        assert!(consumer.len() <= 16);
        assert!(stats.dropped() > 0);
        assert_eq!(
            stats.enqueued() - stats.dropped(),
            consumer.len() as u64
        );
    }
}
