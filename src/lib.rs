#![forbid(unsafe_code)]
//! # Streamlet
//!
//! A single-node, in-memory message broker built on partitioned append-only
//! logs. Producers route records by key or round-robin, consumer groups split a
//! topic's partitions among their members, and committed offsets let a new
//! group member resume exactly where a previous one stopped.
//!
//! ## Crate Organization
//!
//! | Crate | Description |
//! |-------|-------------|
//! | [`streamlet-core`] | Partitions, topics, routing, consumer groups, the broker |
//! | `streamlet` | Configuration, logging, producer/consumer clients, CLI |
//!
//! [`streamlet-core`]: streamlet_core

// ── Re-exports from streamlet-core ───────────────────────────────────────────

pub use streamlet_core::{
    broker, consumer_group, message, partition, partitioner, topic, Broker, BrokerConfig,
    BrokerError, BrokerStats, ConsumerGroup, ErrorKind, GroupInfo, GroupState, Message,
    Partition, PartitionStrategy, PublishAck, RebalanceEvent, RebalanceListener, Topic,
    TopicInfo,
};

pub mod client;
pub mod config;
pub mod error;
pub mod telemetry;

pub use client::{Consumer, Producer, RecordMetadata};
pub use config::{Config, LogFormat, LoggingConfig};
pub use error::{Result, StreamletError};
