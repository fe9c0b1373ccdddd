//! Consumer groups: membership, partition assignment and committed offsets.
//!
//! A group is bound to one topic. Every membership change that leaves at least
//! one member triggers a full round-robin reassignment: members are ordered
//! lexically and partition `p` goes to `members[p % member_count]`. Assignments are recomputed from scratch each
//! time, so the result depends only on the current member set.
//!
//! Membership and assignment share one lock, so a reader observes either the
//! assignment before a join/leave or the one after it, never a mix. Committed
//! offsets live apart from membership and survive every rebalance, including the
//! group draining to zero members.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{BrokerError, Result};

/// Identifier of a consumer within a group.
pub type ConsumerId = String;

/// Partition assignment: consumer → owned partition indices.
pub type Assignments = BTreeMap<ConsumerId, BTreeSet<u32>>;

/// Callback invoked synchronously at the end of every rebalance.
///
/// Listeners run while the group's membership lock is held and must not call
/// back into the same group.
pub type RebalanceListener = Arc<dyn Fn(&RebalanceEvent) + Send + Sync>;

/// Lifecycle state, derived from membership size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupState {
    /// No members.
    Empty,
    /// At least one member holds an assignment.
    Active,
}

/// Emitted after each rebalance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceEvent {
    pub group_id: String,
    pub topic: String,
    pub generation: u64,
    pub assignments: Assignments,
}

/// Round-robin assignment over lexically ordered members.
pub fn assign_round_robin<'a, I>(members: I, num_partitions: u32) -> Assignments
where
    I: IntoIterator<Item = &'a ConsumerId>,
{
    let mut ordered: Vec<&ConsumerId> = members.into_iter().collect();
    ordered.sort();
    ordered.dedup();

    let mut result: Assignments = ordered
        .iter()
        .map(|id| ((*id).clone(), BTreeSet::new()))
        .collect();
    if ordered.is_empty() {
        return result;
    }

    for p in 0..num_partitions {
        let owner = ordered[p as usize % ordered.len()];
        if let Some(parts) = result.get_mut(owner) {
            parts.insert(p);
        }
    }
    result
}

#[derive(Debug, Default)]
struct Membership {
    assignments: Assignments,
    generation: u64,
}

/// A consumer group bound to one topic.
pub struct ConsumerGroup {
    group_id: String,
    topic: String,
    num_partitions: u32,
    membership: RwLock<Membership>,
    committed: DashMap<u32, i64>,
    listeners: RwLock<Vec<RebalanceListener>>,
    created_at: DateTime<Utc>,
}

impl std::fmt::Debug for ConsumerGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerGroup")
            .field("group_id", &self.group_id)
            .field("topic", &self.topic)
            .field("num_partitions", &self.num_partitions)
            .field("membership", &*self.membership.read())
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

impl ConsumerGroup {
    /// Create an empty group for a topic with `num_partitions` partitions.
    pub fn new(group_id: impl Into<String>, topic: impl Into<String>, num_partitions: u32) -> Self {
        Self {
            group_id: group_id.into(),
            topic: topic.into(),
            num_partitions,
            membership: RwLock::new(Membership::default()),
            committed: DashMap::new(),
            listeners: RwLock::new(Vec::new()),
            created_at: Utc::now(),
        }
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn num_partitions(&self) -> u32 {
        self.num_partitions
    }

    /// Register a rebalance listener.
    pub fn add_listener(&self, listener: RebalanceListener) {
        self.listeners.write().push(listener);
    }

    /// Add a member and rebalance. Re-adding an existing member only
    /// rebalances. Returns the member's new assignment.
    pub fn add_consumer(&self, consumer_id: &str) -> BTreeSet<u32> {
        let mut membership = self.membership.write();
        let is_new = !membership.assignments.contains_key(consumer_id);
        membership
            .assignments
            .entry(consumer_id.to_string())
            .or_default();
        self.rebalance_locked(&mut membership);

        let partitions = membership
            .assignments
            .get(consumer_id)
            .cloned()
            .unwrap_or_default();

        tracing::info!(
            group = %self.group_id,
            topic = %self.topic,
            consumer = %consumer_id,
            rejoin = !is_new,
            generation = membership.generation,
            partitions = ?partitions,
            "consumer joined group"
        );
        partitions
    }

    /// Remove a member. Unknown members are ignored; otherwise the remaining
    /// members, if any, are rebalanced. The last member leaving empties the
    /// group without a new generation. Returns whether the member was present.
    pub fn remove_consumer(&self, consumer_id: &str) -> bool {
        let mut membership = self.membership.write();
        if membership.assignments.remove(consumer_id).is_none() {
            return false;
        }
        if !membership.assignments.is_empty() {
            self.rebalance_locked(&mut membership);
        }

        tracing::info!(
            group = %self.group_id,
            topic = %self.topic,
            consumer = %consumer_id,
            remaining = membership.assignments.len(),
            "consumer left group"
        );
        true
    }

    /// Recompute the assignment for the current members. Returns the new
    /// generation.
    pub fn rebalance(&self) -> u64 {
        let mut membership = self.membership.write();
        self.rebalance_locked(&mut membership)
    }

    fn rebalance_locked(&self, membership: &mut Membership) -> u64 {
        membership.generation += 1;
        membership.assignments =
            assign_round_robin(membership.assignments.keys(), self.num_partitions);

        tracing::debug!(
            group = %self.group_id,
            topic = %self.topic,
            generation = membership.generation,
            members = membership.assignments.len(),
            "rebalance complete"
        );

        let listeners = self.listeners.read();
        if !listeners.is_empty() {
            let event = RebalanceEvent {
                group_id: self.group_id.clone(),
                topic: self.topic.clone(),
                generation: membership.generation,
                assignments: membership.assignments.clone(),
            };
            for listener in listeners.iter() {
                listener(&event);
            }
        }
        membership.generation
    }

    /// Partitions currently owned by `consumer_id`; empty for non-members.
    pub fn assigned_partitions(&self, consumer_id: &str) -> BTreeSet<u32> {
        self.membership
            .read()
            .assignments
            .get(consumer_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether `partition` is owned by `consumer_id` right now.
    pub fn is_assigned(&self, consumer_id: &str, partition: u32) -> bool {
        self.membership
            .read()
            .assignments
            .get(consumer_id)
            .is_some_and(|parts| parts.contains(&partition))
    }

    pub fn is_member(&self, consumer_id: &str) -> bool {
        self.membership.read().assignments.contains_key(consumer_id)
    }

    /// Snapshot of every member's assignment.
    pub fn assignments(&self) -> Assignments {
        self.membership.read().assignments.clone()
    }

    /// Member ids in lexical order.
    pub fn members(&self) -> Vec<ConsumerId> {
        self.membership.read().assignments.keys().cloned().collect()
    }

    pub fn member_count(&self) -> usize {
        self.membership.read().assignments.len()
    }

    pub fn state(&self) -> GroupState {
        if self.membership.read().assignments.is_empty() {
            GroupState::Empty
        } else {
            GroupState::Active
        }
    }

    /// Number of rebalances so far.
    pub fn generation(&self) -> u64 {
        self.membership.read().generation
    }

    /// Record `offset` as the group's position in `partition`.
    ///
    /// Only checks the partition index and sign; the upper bound against the
    /// log end is the broker's job since the group does not see the log.
    pub fn commit_offset(&self, partition: u32, offset: i64) -> Result<()> {
        if partition >= self.num_partitions {
            return Err(BrokerError::PartitionNotFound {
                topic: self.topic.clone(),
                partition,
            });
        }
        if offset < 0 {
            return Err(BrokerError::invalid(format!(
                "committed offset must be non-negative, got {}",
                offset
            )));
        }
        self.committed.insert(partition, offset);
        tracing::debug!(
            group = %self.group_id,
            topic = %self.topic,
            partition,
            offset,
            "offset committed"
        );
        Ok(())
    }

    /// Committed offset for `partition`, or 0 if never committed.
    pub fn committed_offset(&self, partition: u32) -> i64 {
        self.committed.get(&partition).map(|r| *r).unwrap_or(0)
    }

    /// Snapshot of all explicit commits.
    pub fn committed_offsets(&self) -> BTreeMap<u32, i64> {
        self.committed.iter().map(|r| (*r.key(), *r.value())).collect()
    }

    /// Serializable snapshot.
    pub fn info(&self) -> GroupInfo {
        let membership = self.membership.read();
        GroupInfo {
            group_id: self.group_id.clone(),
            topic: self.topic.clone(),
            state: if membership.assignments.is_empty() {
                GroupState::Empty
            } else {
                GroupState::Active
            },
            generation: membership.generation,
            assignments: membership.assignments.clone(),
            committed_offsets: self.committed_offsets(),
            created_at: self.created_at,
        }
    }
}

/// Point-in-time description of a consumer group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub group_id: String,
    pub topic: String,
    pub state: GroupState,
    pub generation: u64,
    pub assignments: Assignments,
    pub committed_offsets: BTreeMap<u32, i64>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::ErrorKind;

    fn set(parts: &[u32]) -> BTreeSet<u32> {
        parts.iter().copied().collect()
    }

    #[test]
    fn test_round_robin_assignment() {
        let members: Vec<ConsumerId> = vec!["c3".into(), "c1".into(), "c2".into()];
        let result = assign_round_robin(&members, 6);

        assert_eq!(result["c1"], set(&[0, 3]));
        assert_eq!(result["c2"], set(&[1, 4]));
        assert_eq!(result["c3"], set(&[2, 5]));
    }

    #[test]
    fn test_more_members_than_partitions() {
        let members: Vec<ConsumerId> = vec!["a".into(), "b".into(), "c".into()];
        let result = assign_round_robin(&members, 2);
        assert_eq!(result["a"], set(&[0]));
        assert_eq!(result["b"], set(&[1]));
        assert!(result["c"].is_empty());
    }

    #[test]
    fn test_assignment_empty_members() {
        let members: Vec<ConsumerId> = Vec::new();
        assert!(assign_round_robin(&members, 4).is_empty());
    }

    #[test]
    fn test_new_group() {
        let group = ConsumerGroup::new("g1", "t", 3);
        assert_eq!(group.group_id(), "g1");
        assert_eq!(group.topic(), "t");
        assert_eq!(group.state(), GroupState::Empty);
        assert_eq!(group.generation(), 0);
        assert!(group.members().is_empty());
    }

    #[test]
    fn test_join_and_leave_rebalances() {
        let group = ConsumerGroup::new("g", "t", 3);

        assert_eq!(group.add_consumer("c1"), set(&[0, 1, 2]));
        assert_eq!(group.state(), GroupState::Active);

        group.add_consumer("c2");
        assert_eq!(group.assigned_partitions("c1"), set(&[0, 2]));
        assert_eq!(group.assigned_partitions("c2"), set(&[1]));
        assert_eq!(group.generation(), 2);

        assert!(group.remove_consumer("c2"));
        assert_eq!(group.assigned_partitions("c1"), set(&[0, 1, 2]));
        assert!(group.assigned_partitions("c2").is_empty());
        assert_eq!(group.generation(), 3);
    }

    #[test]
    fn test_add_is_idempotent() {
        let group = ConsumerGroup::new("g", "t", 4);
        group.add_consumer("c1");
        group.add_consumer("c1");
        assert_eq!(group.member_count(), 1);
        assert_eq!(group.assigned_partitions("c1"), set(&[0, 1, 2, 3]));
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let group = ConsumerGroup::new("g", "t", 2);
        group.add_consumer("c1");
        let generation = group.generation();
        assert!(!group.remove_consumer("ghost"));
        assert_eq!(group.generation(), generation);
        assert_eq!(group.member_count(), 1);
    }

    #[test]
    fn test_last_leave_skips_rebalance() {
        let group = ConsumerGroup::new("g", "t", 2);
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let calls = Arc::clone(&calls);
            group.add_listener(Arc::new(move |_: &RebalanceEvent| {
                calls.fetch_add(1, Ordering::SeqCst);
            }));
        }

        group.add_consumer("c1");
        assert!(group.remove_consumer("c1"));

        assert_eq!(group.state(), GroupState::Empty);
        assert!(group.assignments().is_empty());
        assert_eq!(group.generation(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Rejoining starts the next generation.
        group.add_consumer("c2");
        assert_eq!(group.generation(), 2);
        assert_eq!(group.assigned_partitions("c2"), set(&[0, 1]));
    }

    #[test]
    fn test_offsets_survive_empty_group() {
        let group = ConsumerGroup::new("g", "t", 2);
        group.add_consumer("c1");
        group.commit_offset(1, 7).unwrap();
        group.remove_consumer("c1");

        assert_eq!(group.state(), GroupState::Empty);
        assert_eq!(group.committed_offset(1), 7);
        assert_eq!(group.committed_offset(0), 0);
    }

    #[test]
    fn test_commit_validation() {
        let group = ConsumerGroup::new("g", "t", 2);
        let err = group.commit_offset(2, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = group.commit_offset(0, -1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        group.commit_offset(0, 5).unwrap();
        group.commit_offset(0, 2).unwrap();
        assert_eq!(group.committed_offset(0), 2);
    }

    #[test]
    fn test_listeners_see_every_rebalance() {
        let group = ConsumerGroup::new("g", "t", 2);
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(RwLock::new(Vec::new()));
        {
            let calls = Arc::clone(&calls);
            let seen = Arc::clone(&seen);
            group.add_listener(Arc::new(move |event: &RebalanceEvent| {
                calls.fetch_add(1, Ordering::SeqCst);
                seen.write().push(event.clone());
            }));
        }

        group.add_consumer("c1");
        group.add_consumer("c2");
        group.remove_consumer("c1");

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let events = seen.read();
        assert_eq!(events[0].generation, 1);
        assert_eq!(events[1].assignments["c2"], set(&[1]));
        assert_eq!(events[2].assignments.len(), 1);
        assert_eq!(events[2].assignments["c2"], set(&[0, 1]));
    }

    #[test]
    fn test_info_snapshot() {
        let group = ConsumerGroup::new("g", "t", 2);
        group.add_consumer("c1");
        group.commit_offset(0, 3).unwrap();
        let info = group.info();
        assert_eq!(info.state, GroupState::Active);
        assert_eq!(info.generation, 1);
        assert_eq!(info.committed_offsets.get(&0), Some(&3));
    }
}
