//! Message record type.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A record published to a topic.
///
/// `partition` and `offset` stay unset until the message is appended to a
/// [`Partition`](crate::partition::Partition); the log fixes them exactly once and
/// only hands out copies afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier.
    pub id: Uuid,
    /// Target topic name.
    pub topic: String,
    /// Optional routing key.
    pub key: Option<String>,
    /// Record payload.
    pub value: Bytes,
    /// Application-level headers.
    pub headers: Vec<(String, Bytes)>,
    /// Producer-side creation time.
    pub timestamp: DateTime<Utc>,
    partition: Option<u32>,
    offset: Option<i64>,
}

impl Message {
    /// Create an unappended message for `topic`.
    pub fn new(topic: impl Into<String>, key: Option<String>, value: impl Into<Bytes>) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            key,
            value: value.into(),
            headers: Vec::new(),
            timestamp: Utc::now(),
            partition: None,
            offset: None,
        }
    }

    /// Attach an application header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Bytes>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Override the creation timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Partition the message was appended to, if any.
    pub fn partition(&self) -> Option<u32> {
        self.partition
    }

    /// Offset within its partition, if appended.
    pub fn offset(&self) -> Option<i64> {
        self.offset
    }

    /// Whether the message has been stored in a partition log.
    pub fn is_appended(&self) -> bool {
        self.offset.is_some()
    }

    /// Key as a routing input: empty keys count as absent.
    pub fn routing_key(&self) -> Option<&str> {
        self.key.as_deref().filter(|k| !k.is_empty())
    }

    pub(crate) fn assign(&mut self, partition: u32, offset: i64) {
        self.partition = Some(partition);
        self.offset = Some(offset);
    }
}
