//! Producer/consumer client tests against a shared in-process broker,
//! plus configuration loading from disk.
#![allow(clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::sync::Arc;

use streamlet::{Broker, BrokerConfig, Config, Consumer, LogFormat, Message, PartitionStrategy, Producer};

fn drain(consumer: &mut Consumer) -> Vec<Message> {
    let mut all = Vec::new();
    loop {
        let batch = consumer.poll(16).unwrap();
        if batch.is_empty() {
            return all;
        }
        all.extend(batch);
    }
}

#[test]
fn test_group_consumes_every_record_once() {
    let broker = Arc::new(Broker::new());
    broker.create_topic("events", 6).unwrap();
    let producer = Producer::new(Arc::clone(&broker), "events");
    for i in 0..120 {
        producer
            .send(Some(&format!("user-{}", i % 10)), format!("e{}", i))
            .unwrap();
    }

    let mut a = Consumer::with_id(Arc::clone(&broker), "a", "analytics", "events");
    let mut b = Consumer::with_id(Arc::clone(&broker), "b", "analytics", "events");
    a.subscribe().unwrap();
    b.subscribe().unwrap();
    assert!(a.assignment().unwrap().is_disjoint(&b.assignment().unwrap()));

    let mut seen: BTreeMap<(u32, i64), usize> = BTreeMap::new();
    for m in drain(&mut a).into_iter().chain(drain(&mut b)) {
        *seen
            .entry((m.partition().unwrap(), m.offset().unwrap()))
            .or_default() += 1;
    }
    assert_eq!(seen.len(), 120);
    assert!(seen.values().all(|&n| n == 1));
}

#[test]
fn test_resume_across_consumer_restart() {
    let broker = Arc::new(Broker::new());
    broker.create_topic("orders", 2).unwrap();
    let producer =
        Producer::with_strategy(Arc::clone(&broker), "orders", PartitionStrategy::round_robin());
    for i in 0..10 {
        producer.send(None, format!("o{}", i)).unwrap();
    }

    let mut first = Consumer::new(Arc::clone(&broker), "billing", "orders");
    first.subscribe().unwrap();
    assert_eq!(first.poll(3).unwrap().len(), 6);
    first.commit().unwrap();
    first.close();

    for i in 10..14 {
        producer.send(None, format!("o{}", i)).unwrap();
    }

    let mut second = Consumer::new(Arc::clone(&broker), "billing", "orders");
    second.subscribe().unwrap();
    assert_eq!(second.position(0), Some(3));
    assert_eq!(second.position(1), Some(3));

    let rest = drain(&mut second);
    assert_eq!(rest.len(), 8);
    let values: Vec<String> = rest
        .iter()
        .map(|m| String::from_utf8(m.value.to_vec()).unwrap())
        .collect();
    assert!(!values.iter().any(|v| v == "o0" || v == "o1"));
    assert!(values.iter().any(|v| v == "o13"));
}

#[test]
fn test_explicit_strategy_and_headers() {
    let broker = Arc::new(Broker::new());
    broker.create_topic("audit", 3).unwrap();
    let producer = Producer::with_strategy(
        Arc::clone(&broker),
        "audit",
        PartitionStrategy::explicit(2),
    );

    let meta = producer
        .send_message(
            Message::new("ignored", Some("k".to_string()), "payload")
                .with_header("trace-id", "abc123"),
        )
        .unwrap();
    assert_eq!(meta.topic, "audit");
    assert_eq!(meta.partition, 2);
    assert_eq!(meta.offset, 0);

    let stored = broker.topic("audit").unwrap().partition(2).unwrap().read(0, 1);
    assert_eq!(stored[0].topic, "audit");
    assert_eq!(stored[0].headers.len(), 1);
    assert_eq!(stored[0].headers[0].0, "trace-id");
    assert_eq!(stored[0].headers[0].1.as_ref(), b"abc123");
}

#[test]
fn test_oversized_message_rejected() {
    let broker = Arc::new(Broker::with_config(BrokerConfig {
        max_message_bytes: 8,
        ..BrokerConfig::default()
    }));
    broker.create_topic("t", 1).unwrap();
    let producer = Producer::new(Arc::clone(&broker), "t");

    assert!(producer.send(None, "0123456789").is_err());
    assert!(producer.send(None, "ok").is_ok());
    assert_eq!(broker.latest_offset("t", 0).unwrap(), 1);
}

#[test]
fn test_config_file_drives_broker() {
    let path = std::env::temp_dir().join(format!("streamlet-{}.toml", uuid::Uuid::new_v4()));
    std::fs::write(
        &path,
        r#"
[broker]
default_partitions = 3
max_poll_records = 2

[logging]
level = "debug"
format = "json"
"#,
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    config.validate().unwrap();
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.broker.max_message_bytes, 1_048_576);

    let broker = Arc::new(Broker::with_config(config.broker));
    let topic = broker.create_topic_with_defaults("t").unwrap();
    assert_eq!(topic.num_partitions(), 3);

    let producer = Producer::with_strategy(Arc::clone(&broker), "t", PartitionStrategy::explicit(0));
    for i in 0..5 {
        producer.send(None, i.to_string()).unwrap();
    }
    broker.subscribe("c", "t", "g").unwrap();
    assert_eq!(broker.poll("c", "g", "t", 0, 0, 100).unwrap().len(), 2);
}

#[test]
fn test_missing_config_file_is_an_error() {
    let path = std::env::temp_dir().join("streamlet-does-not-exist.toml");
    assert!(Config::from_file(&path).is_err());
}
