//! Append-only partition log.

use parking_lot::RwLock;

use crate::message::Message;

/// An in-memory, append-only log for one `(topic, partition)` pair.
///
/// Appends take the write lock, so offsets are handed out in the same order the
/// records land in the log. Reads share the read lock and never see a record at
/// offset `o` without every offset below `o`.
#[derive(Debug)]
pub struct Partition {
    id: u32,
    topic: String,
    log: RwLock<Vec<Message>>,
}

impl Partition {
    /// Create an empty partition log.
    pub fn new(topic: impl Into<String>, id: u32) -> Self {
        Self {
            id,
            topic: topic.into(),
            log: RwLock::new(Vec::new()),
        }
    }

    /// Partition index within its topic.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Owning topic name.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Append a message and return its assigned offset.
    pub fn append(&self, mut message: Message) -> i64 {
        let mut log = self.log.write();
        let offset = log.len() as i64;
        message.assign(self.id, offset);
        log.push(message);
        offset
    }

    /// Read up to `limit` messages starting at `from_offset`.
    ///
    /// Offsets that are negative or at/after the end yield an empty batch.
    pub fn read(&self, from_offset: i64, limit: usize) -> Vec<Message> {
        let log = self.log.read();
        if from_offset < 0 || from_offset >= log.len() as i64 {
            return Vec::new();
        }
        log.iter()
            .skip(from_offset as usize)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Offset of the next record to be appended.
    pub fn latest_offset(&self) -> i64 {
        self.log.read().len() as i64
    }

    /// Earliest readable offset. Nothing is ever truncated, so this is 0.
    pub fn earliest_offset(&self) -> i64 {
        0
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.log.read().len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.log.read().is_empty()
    }
}
