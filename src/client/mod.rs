//! Producer and consumer wrappers over a shared [`Broker`](streamlet_core::Broker).
//!
//! Both hold an `Arc<Broker>` and only call its publish, subscribe, poll, commit
//! and unsubscribe operations.

mod consumer;
mod producer;

pub use consumer::Consumer;
pub use producer::{Producer, RecordMetadata};
