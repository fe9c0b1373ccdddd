#![forbid(unsafe_code)]
//! # streamlet-core
//!
//! Partitioned append-only logs, key-based and round-robin routing, consumer
//! groups with round-robin rebalancing, and resumable offset commits, behind a
//! single [`Broker`] entry point.
//!
//! ```
//! use streamlet_core::{Broker, Message, PartitionStrategy};
//!
//! let broker = Broker::new();
//! broker.create_topic("orders", 3).unwrap();
//!
//! let strategy = PartitionStrategy::key_hash();
//! let ack = broker
//!     .publish(Message::new("orders", Some("user-1".into()), "created"), &strategy)
//!     .unwrap();
//!
//! let assigned = broker.subscribe("consumer-1", "orders", "billing").unwrap();
//! assert!(assigned.contains(&ack.partition));
//!
//! let batch = broker
//!     .poll("consumer-1", "billing", "orders", ack.partition, 0, 10)
//!     .unwrap();
//! assert_eq!(batch.len(), 1);
//! broker.commit_offset("billing", "orders", ack.partition, 1).unwrap();
//! ```

pub mod broker;
pub mod consumer_group;
pub mod error;
pub mod message;
pub mod partition;
pub mod partitioner;
pub mod topic;

pub use broker::{Broker, BrokerConfig, BrokerStats, PublishAck};
pub use consumer_group::{
    assign_round_robin, Assignments, ConsumerGroup, ConsumerId, GroupInfo, GroupState,
    RebalanceEvent, RebalanceListener,
};
pub use error::{BrokerError, ErrorKind, Result};
pub use message::Message;
pub use partition::Partition;
pub use partitioner::{hash_partition, PartitionStrategy, RoundRobin};
pub use topic::{Topic, TopicInfo};
