//! The broker: entry point for topic management, publishing, consumer groups,
//! polling and offset commits.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::consumer_group::{ConsumerGroup, GroupInfo, RebalanceListener};
use crate::error::{BrokerError, Result};
use crate::message::Message;
use crate::partitioner::PartitionStrategy;
use crate::topic::{Topic, TopicInfo};

/// Broker-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Partition count used by [`Broker::create_topic_with_defaults`].
    pub default_partitions: u32,
    /// Largest accepted payload in bytes.
    pub max_message_bytes: usize,
    /// Upper bound on records returned by a single poll.
    pub max_poll_records: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            default_partitions: 4,
            max_message_bytes: 1_048_576, // 1 MB
            max_poll_records: 500,
        }
    }
}

/// Aggregated broker statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerStats {
    pub total_topics: usize,
    pub total_partitions: usize,
    pub total_messages: u64,
    pub total_consumer_groups: usize,
}

/// Where a published message landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublishAck {
    pub partition: u32,
    pub offset: i64,
}

type GroupKey = (String, String);

/// Single-node, in-memory message broker.
///
/// Share it between producers and consumers with an `Arc`; every method takes
/// `&self`. Topics and groups live in concurrent maps, each partition and each
/// group carries its own lock, so unrelated topics never contend.
#[derive(Debug)]
pub struct Broker {
    topics: DashMap<String, Arc<Topic>>,
    /// Keyed by `(group_id, topic)`.
    groups: DashMap<GroupKey, Arc<ConsumerGroup>>,
    config: BrokerConfig,
    message_count: AtomicU64,
}

impl Broker {
    /// Create a broker with default configuration.
    pub fn new() -> Self {
        Self::with_config(BrokerConfig::default())
    }

    /// Create a broker with custom configuration.
    pub fn with_config(config: BrokerConfig) -> Self {
        Self {
            topics: DashMap::new(),
            groups: DashMap::new(),
            config,
            message_count: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    // ── Topic management ────────────────────────────────────────────────

    /// Create a topic with `num_partitions` partitions.
    ///
    /// A taken name fails with `TopicAlreadyExists` before the partition count
    /// is checked.
    pub fn create_topic(&self, name: &str, num_partitions: u32) -> Result<Arc<Topic>> {
        use dashmap::mapref::entry::Entry;

        match self.topics.entry(name.to_string()) {
            Entry::Occupied(_) => Err(BrokerError::TopicAlreadyExists(name.to_string())),
            Entry::Vacant(slot) => {
                let topic = Arc::new(Topic::new(name, num_partitions)?);
                slot.insert(Arc::clone(&topic));
                tracing::info!(topic = %name, partitions = num_partitions, "topic created");
                Ok(topic)
            }
        }
    }

    /// Create a topic using [`BrokerConfig::default_partitions`].
    pub fn create_topic_with_defaults(&self, name: &str) -> Result<Arc<Topic>> {
        self.create_topic(name, self.config.default_partitions)
    }

    /// Look up a topic.
    pub fn topic(&self, name: &str) -> Result<Arc<Topic>> {
        self.topics
            .get(name)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| BrokerError::TopicNotFound(name.to_string()))
    }

    /// List all topics, sorted by name.
    pub fn list_topics(&self) -> Vec<TopicInfo> {
        let mut topics: Vec<TopicInfo> = self.topics.iter().map(|r| r.value().info()).collect();
        topics.sort_by(|a, b| a.name.cmp(&b.name));
        topics
    }

    /// Next offset to be assigned in a partition.
    pub fn latest_offset(&self, topic: &str, partition: u32) -> Result<i64> {
        Ok(self.topic(topic)?.partition(partition)?.latest_offset())
    }

    // ── Publish ─────────────────────────────────────────────────────────

    /// Route `message` with `strategy` and append it.
    ///
    /// Nothing is appended when the topic, partition or size check fails.
    pub fn publish(&self, message: Message, strategy: &PartitionStrategy) -> Result<PublishAck> {
        let topic = self.topic(&message.topic)?;

        if message.value.len() > self.config.max_message_bytes {
            return Err(BrokerError::MessageTooLarge(
                message.value.len(),
                self.config.max_message_bytes,
            ));
        }

        let partition = strategy.select_partition(&message, topic.num_partitions());
        let offset = topic.partition(partition)?.append(message);
        self.message_count.fetch_add(1, Ordering::Relaxed);

        tracing::trace!(topic = %topic.name(), partition, offset, "message appended");
        Ok(PublishAck { partition, offset })
    }

    // ── Consumer groups ─────────────────────────────────────────────────

    fn group_for(&self, group_id: &str, topic: &Topic) -> Arc<ConsumerGroup> {
        let entry = self
            .groups
            .entry((group_id.to_string(), topic.name().to_string()))
            .or_insert_with(|| {
                tracing::info!(group = %group_id, topic = %topic.name(), "consumer group created");
                Arc::new(ConsumerGroup::new(
                    group_id,
                    topic.name(),
                    topic.num_partitions(),
                ))
            });
        Arc::clone(entry.value())
    }

    fn existing_group(&self, group_id: &str, topic: &str) -> Result<Arc<ConsumerGroup>> {
        self.groups
            .get(&(group_id.to_string(), topic.to_string()))
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| BrokerError::GroupNotFound {
                group: group_id.to_string(),
                topic: topic.to_string(),
            })
    }

    /// Join `consumer_id` to `group_id` on `topic`, creating the group on first
    /// use. The rebalance completes before this returns; the result is the
    /// consumer's assignment.
    pub fn subscribe(&self, consumer_id: &str, topic: &str, group_id: &str) -> Result<BTreeSet<u32>> {
        if consumer_id.is_empty() {
            return Err(BrokerError::invalid("consumer id must not be empty"));
        }
        let topic = self.topic(topic)?;
        let group = self.group_for(group_id, &topic);
        Ok(group.add_consumer(consumer_id))
    }

    /// Remove `consumer_id` from every group named `group_id`, whatever the
    /// topic. Returns how many memberships were dropped.
    pub fn unsubscribe(&self, consumer_id: &str, group_id: &str) -> usize {
        // No shard guard may be held while a group rebalances.
        let groups: Vec<Arc<ConsumerGroup>> = self
            .groups
            .iter()
            .filter(|r| r.key().0 == group_id)
            .map(|r| Arc::clone(r.value()))
            .collect();

        groups
            .iter()
            .filter(|g| g.remove_consumer(consumer_id))
            .count()
    }

    /// Current assignment of `consumer_id` in `(group_id, topic)`.
    pub fn assigned_partitions(
        &self,
        consumer_id: &str,
        group_id: &str,
        topic: &str,
    ) -> Result<BTreeSet<u32>> {
        Ok(self
            .existing_group(group_id, topic)?
            .assigned_partitions(consumer_id))
    }

    /// Register a rebalance listener on `(group_id, topic)`, creating the
    /// group if needed.
    pub fn on_rebalance(&self, group_id: &str, topic: &str, listener: RebalanceListener) -> Result<()> {
        let topic = self.topic(topic)?;
        self.group_for(group_id, &topic).add_listener(listener);
        Ok(())
    }

    /// Describe a consumer group.
    pub fn describe_group(&self, group_id: &str, topic: &str) -> Result<GroupInfo> {
        Ok(self.existing_group(group_id, topic)?.info())
    }

    /// All `(group_id, topic)` pairs, sorted.
    pub fn list_groups(&self) -> Vec<(String, String)> {
        let mut keys: Vec<GroupKey> = self.groups.iter().map(|r| r.key().clone()).collect();
        keys.sort();
        keys
    }

    // ── Poll / commit ───────────────────────────────────────────────────

    /// Read up to `limit` records from `partition`, starting at `from_offset`.
    ///
    /// The partition must currently be assigned to `consumer_id` in
    /// `(group_id, topic)`. Reading past the end returns an empty batch.
    pub fn poll(
        &self,
        consumer_id: &str,
        group_id: &str,
        topic: &str,
        partition: u32,
        from_offset: i64,
        limit: usize,
    ) -> Result<Vec<Message>> {
        if from_offset < 0 {
            return Err(BrokerError::invalid(format!(
                "poll offset must be non-negative, got {}",
                from_offset
            )));
        }
        let topic_ref = self.topic(topic)?;
        let log = topic_ref.partition(partition)?;
        let group = self.existing_group(group_id, topic)?;

        if !group.is_assigned(consumer_id, partition) {
            return Err(BrokerError::NotAssigned {
                consumer: consumer_id.to_string(),
                topic: topic.to_string(),
                partition,
            });
        }

        Ok(log.read(from_offset, limit.min(self.config.max_poll_records)))
    }

    /// Commit `offset` as the next record `group_id` will read from
    /// `partition`, creating the group on first use.
    ///
    /// Offsets beyond the log end are rejected; moving backwards is allowed
    /// and replays from the earlier position.
    pub fn commit_offset(&self, group_id: &str, topic: &str, partition: u32, offset: i64) -> Result<()> {
        let topic_ref = self.topic(topic)?;
        let latest = topic_ref.partition(partition)?.latest_offset();
        if offset > latest {
            tracing::warn!(
                group = %group_id,
                topic = %topic,
                partition,
                offset,
                latest,
                "rejected commit past log end"
            );
            return Err(BrokerError::OffsetOutOfRange {
                partition,
                offset,
                latest,
            });
        }
        self.group_for(group_id, &topic_ref)
            .commit_offset(partition, offset)
    }

    /// Committed offset for `(group_id, topic, partition)`; 0 if nothing was
    /// committed or the group does not exist yet.
    pub fn committed_offset(&self, group_id: &str, topic: &str, partition: u32) -> Result<i64> {
        self.topic(topic)?.partition(partition)?;
        Ok(self
            .groups
            .get(&(group_id.to_string(), topic.to_string()))
            .map(|g| g.committed_offset(partition))
            .unwrap_or(0))
    }

    // ── Stats ───────────────────────────────────────────────────────────

    /// Aggregate broker statistics.
    pub fn stats(&self) -> BrokerStats {
        BrokerStats {
            total_topics: self.topics.len(),
            total_partitions: self
                .topics
                .iter()
                .map(|r| r.value().num_partitions() as usize)
                .sum(),
            total_messages: self.message_count.load(Ordering::Relaxed),
            total_consumer_groups: self.groups.len(),
        }
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}
