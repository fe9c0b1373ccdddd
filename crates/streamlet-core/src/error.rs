//! Error types for the broker core.
//!
//! Every fallible broker operation returns [`BrokerError`]. Errors are reported
//! synchronously to the caller and never retried inside the broker.

use thiserror::Error;

/// Result alias used throughout the broker core.
pub type Result<T> = std::result::Result<T, BrokerError>;

/// Coarse error classification shared by all [`BrokerError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A topic, group or partition index does not exist.
    NotFound,
    /// A topic with the same name is already registered.
    AlreadyExists,
    /// An argument is outside its accepted domain.
    InvalidArgument,
    /// The consumer polled a partition it does not own.
    NotAssigned,
}

/// Errors produced by the broker.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrokerError {
    #[error("topic '{0}' already exists")]
    TopicAlreadyExists(String),

    #[error("topic '{0}' not found")]
    TopicNotFound(String),

    #[error("partition {partition} not found for topic '{topic}'")]
    PartitionNotFound { topic: String, partition: u32 },

    #[error("consumer group '{group}' not found for topic '{topic}'")]
    GroupNotFound { group: String, topic: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("partition {partition} of topic '{topic}' is not assigned to consumer '{consumer}'")]
    NotAssigned {
        consumer: String,
        topic: String,
        partition: u32,
    },

    /// A commit pointed past the end of the partition log.
    #[error("offset {offset} is beyond the end of partition {partition} (latest {latest})")]
    OffsetOutOfRange {
        partition: u32,
        offset: i64,
        latest: i64,
    },

    #[error("message exceeds max size ({0} > {1})")]
    MessageTooLarge(usize, usize),
}

impl BrokerError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TopicNotFound(_)
            | Self::PartitionNotFound { .. }
            | Self::GroupNotFound { .. } => ErrorKind::NotFound,
            Self::TopicAlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::InvalidArgument(_)
            | Self::OffsetOutOfRange { .. }
            | Self::MessageTooLarge(..) => ErrorKind::InvalidArgument,
            Self::NotAssigned { .. } => ErrorKind::NotAssigned,
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            BrokerError::TopicNotFound("t".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            BrokerError::PartitionNotFound {
                topic: "t".into(),
                partition: 9
            }
            .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            BrokerError::TopicAlreadyExists("t".into()).kind(),
            ErrorKind::AlreadyExists
        );
        assert_eq!(
            BrokerError::OffsetOutOfRange {
                partition: 0,
                offset: 10,
                latest: 2
            }
            .kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            BrokerError::NotAssigned {
                consumer: "c1".into(),
                topic: "t".into(),
                partition: 0
            }
            .kind(),
            ErrorKind::NotAssigned
        );
    }

    #[test]
    fn test_display() {
        let err = BrokerError::PartitionNotFound {
            topic: "orders".into(),
            partition: 7,
        };
        assert_eq!(err.to_string(), "partition 7 not found for topic 'orders'");
        assert_eq!(
            BrokerError::MessageTooLarge(10, 4).to_string(),
            "message exceeds max size (10 > 4)"
        );
    }
}
