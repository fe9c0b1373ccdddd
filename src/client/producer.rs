use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use streamlet_core::{Broker, Message, PartitionStrategy};

use crate::error::Result;

/// Where a produced record was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub topic: String,
    pub partition: u32,
    pub offset: i64,
}

/// Publishes records to one topic with a fixed routing strategy.
///
/// The strategy's round-robin cursor belongs to this producer, so keyless
/// records rotate per producer rather than per broker.
#[derive(Debug)]
pub struct Producer {
    broker: Arc<Broker>,
    topic: String,
    strategy: PartitionStrategy,
}

impl Producer {
    /// Producer using key-hash routing.
    pub fn new(broker: Arc<Broker>, topic: impl Into<String>) -> Self {
        Self::with_strategy(broker, topic, PartitionStrategy::key_hash())
    }

    pub fn with_strategy(
        broker: Arc<Broker>,
        topic: impl Into<String>,
        strategy: PartitionStrategy,
    ) -> Self {
        Self {
            broker,
            topic: topic.into(),
            strategy,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Publish `value` under an optional key.
    pub fn send(&self, key: Option<&str>, value: impl Into<Bytes>) -> Result<RecordMetadata> {
        self.send_message(Message::new(self.topic.clone(), key.map(String::from), value))
    }

    /// Publish a prepared message. Its topic is overwritten with this
    /// producer's topic.
    pub fn send_message(&self, mut message: Message) -> Result<RecordMetadata> {
        message.topic.clone_from(&self.topic);
        let ack = self.broker.publish(message, &self.strategy)?;
        Ok(RecordMetadata {
            topic: self.topic.clone(),
            partition: ack.partition,
            offset: ack.offset,
        })
    }
}
