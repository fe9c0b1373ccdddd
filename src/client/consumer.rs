use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use streamlet_core::{Broker, BrokerError, Message};
use uuid::Uuid;

use crate::error::Result;

/// A member of a consumer group on one topic.
///
/// Tracks a read position per assigned partition. Positions start at the
/// group's committed offset, advance as records are polled, and are written
/// back by [`commit`](Self::commit). A partition lost in a rebalance forgets its
/// position, so whoever picks it up next resumes from the last commit.
#[derive(Debug)]
pub struct Consumer {
    broker: Arc<Broker>,
    consumer_id: String,
    group_id: String,
    topic: String,
    positions: BTreeMap<u32, i64>,
}

impl Consumer {
    /// Consumer with a generated id of the form `{group_id}-{uuid}`.
    pub fn new(broker: Arc<Broker>, group_id: impl Into<String>, topic: impl Into<String>) -> Self {
        let group_id = group_id.into();
        let consumer_id = format!("{}-{}", group_id, Uuid::new_v4());
        Self::with_id(broker, consumer_id, group_id, topic)
    }

    pub fn with_id(
        broker: Arc<Broker>,
        consumer_id: impl Into<String>,
        group_id: impl Into<String>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            broker,
            consumer_id: consumer_id.into(),
            group_id: group_id.into(),
            topic: topic.into(),
            positions: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.consumer_id
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Join the group. Returns the partitions assigned after the rebalance.
    pub fn subscribe(&mut self) -> Result<BTreeSet<u32>> {
        let assigned = self
            .broker
            .subscribe(&self.consumer_id, &self.topic, &self.group_id)?;
        self.sync_positions(&assigned)?;
        Ok(assigned)
    }

    /// Partitions currently owned by this consumer.
    pub fn assignment(&self) -> Result<BTreeSet<u32>> {
        Ok(self
            .broker
            .assigned_partitions(&self.consumer_id, &self.group_id, &self.topic)?)
    }

    /// Current read position for `partition`, if tracked.
    pub fn position(&self, partition: u32) -> Option<i64> {
        self.positions.get(&partition).copied()
    }

    /// Move the read position for an assigned partition.
    pub fn seek(&mut self, partition: u32, offset: i64) -> Result<()> {
        if !self.assignment()?.contains(&partition) {
            return Err(BrokerError::NotAssigned {
                consumer: self.consumer_id.clone(),
                topic: self.topic.clone(),
                partition,
            }
            .into());
        }
        if offset < 0 {
            return Err(BrokerError::InvalidArgument(format!(
                "seek offset must be non-negative, got {}",
                offset
            ))
            .into());
        }
        self.positions.insert(partition, offset);
        Ok(())
    }

    /// Fetch up to `max_per_partition` records from each assigned partition.
    ///
    /// Returns an empty batch when nothing new is available. A partition that
    /// moves to another member between the assignment check and the read is
    /// skipped for this round.
    pub fn poll(&mut self, max_per_partition: usize) -> Result<Vec<Message>> {
        let assigned = self.assignment()?;
        self.sync_positions(&assigned)?;

        let mut batch = Vec::new();
        for partition in assigned {
            let from = self.positions.get(&partition).copied().unwrap_or(0);
            let records = match self.broker.poll(
                &self.consumer_id,
                &self.group_id,
                &self.topic,
                partition,
                from,
                max_per_partition,
            ) {
                Ok(records) => records,
                Err(BrokerError::NotAssigned { .. }) => {
                    self.positions.remove(&partition);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if let Some(last) = records.last().and_then(Message::offset) {
                self.positions.insert(partition, last + 1);
            }
            batch.extend(records);
        }
        Ok(batch)
    }

    /// Commit the current position of every partition this consumer still
    /// owns. Positions for partitions lost in a rebalance since the last poll
    /// are dropped instead of committed.
    pub fn commit(&mut self) -> Result<()> {
        let assigned = self.assignment()?;
        self.positions.retain(|p, _| assigned.contains(p));
        for (&partition, &offset) in &self.positions {
            self.broker
                .commit_offset(&self.group_id, &self.topic, partition, offset)?;
        }
        tracing::debug!(
            consumer = %self.consumer_id,
            group = %self.group_id,
            partitions = self.positions.len(),
            "positions committed"
        );
        Ok(())
    }

    /// Leave the group, triggering a rebalance for the remaining members.
    pub fn close(self) {
        self.broker.unsubscribe(&self.consumer_id, &self.group_id);
    }

    fn sync_positions(&mut self, assigned: &BTreeSet<u32>) -> Result<()> {
        self.positions.retain(|p, _| assigned.contains(p));
        for &partition in assigned {
            if !self.positions.contains_key(&partition) {
                let committed =
                    self.broker
                        .committed_offset(&self.group_id, &self.topic, partition)?;
                self.positions.insert(partition, committed);
            }
        }
        Ok(())
    }
}
