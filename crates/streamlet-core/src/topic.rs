//! Topics: fixed sets of partition logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BrokerError, Result};
use crate::partition::Partition;

/// A named topic with a partition count fixed at creation.
#[derive(Debug)]
pub struct Topic {
    name: String,
    partitions: Vec<Partition>,
    created_at: DateTime<Utc>,
}

impl Topic {
    /// Create a topic with `num_partitions` empty logs.
    pub fn new(name: impl Into<String>, num_partitions: u32) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(BrokerError::invalid("topic name must not be empty"));
        }
        if num_partitions < 1 {
            return Err(BrokerError::invalid(format!(
                "topic '{}' needs at least one partition",
                name
            )));
        }

        let partitions = (0..num_partitions)
            .map(|pid| Partition::new(name.clone(), pid))
            .collect();

        Ok(Self {
            name,
            partitions,
            created_at: Utc::now(),
        })
    }

    /// Topic name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of partitions.
    pub fn num_partitions(&self) -> u32 {
        self.partitions.len() as u32
    }

    /// Creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Look up a partition by index.
    pub fn partition(&self, index: u32) -> Result<&Partition> {
        self.partitions
            .get(index as usize)
            .ok_or_else(|| BrokerError::PartitionNotFound {
                topic: self.name.clone(),
                partition: index,
            })
    }

    /// All partitions in index order.
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// Total number of records across partitions.
    pub fn message_count(&self) -> u64 {
        self.partitions.iter().map(|p| p.len() as u64).sum()
    }

    /// Serializable snapshot.
    pub fn info(&self) -> TopicInfo {
        TopicInfo {
            name: self.name.clone(),
            num_partitions: self.num_partitions(),
            created_at: self.created_at,
            message_count: self.message_count(),
        }
    }
}

/// Point-in-time description of a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicInfo {
    pub name: String,
    pub num_partitions: u32,
    pub created_at: DateTime<Utc>,
    pub message_count: u64,
}
