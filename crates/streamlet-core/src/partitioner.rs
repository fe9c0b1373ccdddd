//! Partition selection for published messages.
//!
//! A [`PartitionStrategy`] maps `(message, partition count)` to a partition index.
//!
//! - **KeyHash**: CRC-32 of the key modulo the partition count, so every message
//!   sharing a key lands in the same partition. Keyless messages fall back to the
//!   strategy's own round-robin cursor.
//! - **RoundRobin**: cycles `0, 1, .., n-1, 0, ..` regardless of key.
//! - **Explicit**: pins every message to one partition index.
//!
//! Cursor state lives inside the strategy value, so two producers holding separate
//! strategies rotate independently and a shared strategy rotates once per call.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::message::Message;

/// Monotonic round-robin cursor.
#[derive(Debug, Default)]
pub struct RoundRobin {
    next: AtomicU64,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next index in `0..partition_count`.
    pub fn next(&self, partition_count: u32) -> u32 {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        (n % partition_count as u64) as u32
    }
}

/// Routing policy applied by [`Broker::publish`](crate::broker::Broker::publish).
#[derive(Debug)]
pub enum PartitionStrategy {
    /// Hash non-empty keys; keyless messages use the embedded cursor.
    KeyHash(RoundRobin),
    /// Rotate through partitions on every call.
    RoundRobin(RoundRobin),
    /// Always use the given partition index.
    Explicit(u32),
}

impl PartitionStrategy {
    pub fn key_hash() -> Self {
        Self::KeyHash(RoundRobin::new())
    }

    pub fn round_robin() -> Self {
        Self::RoundRobin(RoundRobin::new())
    }

    pub fn explicit(partition: u32) -> Self {
        Self::Explicit(partition)
    }

    /// Pick a partition for `message`.
    ///
    /// # Panics
    ///
    /// Panics if `partition_count` is zero. Topics always have at least one
    /// partition, so this only fires on a programming error.
    pub fn select_partition(&self, message: &Message, partition_count: u32) -> u32 {
        assert!(partition_count > 0, "partition_count must be positive");

        match self {
            Self::KeyHash(fallback) => match message.routing_key() {
                Some(key) => hash_partition(key, partition_count),
                None => fallback.next(partition_count),
            },
            Self::RoundRobin(cursor) => cursor.next(partition_count),
            Self::Explicit(partition) => *partition,
        }
    }
}

impl Default for PartitionStrategy {
    fn default() -> Self {
        Self::key_hash()
    }
}

/// Stable key hash: identical across processes and releases.
pub fn hash_partition(key: &str, partition_count: u32) -> u32 {
    crc32fast::hash(key.as_bytes()) % partition_count
}
