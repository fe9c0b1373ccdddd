//! Streamlet - an in-memory partitioned-log message broker
//!
//! Entry point for the `streamlet` binary. The broker has no network listener;
//! the `run` command drives an in-process produce/consume workload against it.
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Instant;

use clap::{Parser, Subcommand};
use streamlet::client::{Consumer, Producer};
use streamlet::config::Config;
use streamlet::telemetry;
use streamlet::{Broker, PartitionStrategy, Result, StreamletError};
use tracing::{error, info};

/// Streamlet - an in-memory partitioned-log message broker
#[derive(Parser, Debug)]
#[command(name = "streamlet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (TOML)
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error (overrides config file)
    #[arg(
        short = 'l',
        long = "log-level",
        value_name = "LEVEL",
        env = "STREAMLET_LOG_LEVEL",
        global = true
    )]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Publish and consume a workload against an in-process broker
    Run {
        /// Topic to create
        #[arg(long, default_value = "events")]
        topic: String,

        /// Number of partitions (defaults to broker.default_partitions)
        #[arg(long)]
        partitions: Option<u32>,

        /// Total messages to publish
        #[arg(long, default_value_t = 10_000)]
        messages: usize,

        /// Number of producer threads
        #[arg(long, default_value_t = 2)]
        producers: usize,

        /// Number of consumers in the group
        #[arg(long, default_value_t = 2)]
        consumers: usize,

        /// Consumer group id
        #[arg(long, default_value = "streamlet-run")]
        group: String,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match Config::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Err(e) = config.validate() {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    match cli.command {
        Command::Config => match config.to_toml() {
            Ok(rendered) => {
                println!("{}", rendered);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {}", e);
                ExitCode::FAILURE
            }
        },
        Command::Run {
            topic,
            partitions,
            messages,
            producers,
            consumers,
            group,
        } => {
            if let Err(e) = telemetry::init_logging(&config.logging) {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            }
            let workload = Workload {
                topic,
                partitions: partitions.unwrap_or(config.broker.default_partitions),
                messages,
                producers: producers.max(1),
                consumers: consumers.max(1),
                group,
            };
            match run(config, workload) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    error!(error = %e, "workload failed");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

struct Workload {
    topic: String,
    partitions: u32,
    messages: usize,
    producers: usize,
    consumers: usize,
    group: String,
}

fn run(config: Config, workload: Workload) -> Result<()> {
    let broker = Arc::new(Broker::with_config(config.broker));
    broker.create_topic(&workload.topic, workload.partitions)?;

    let started = Instant::now();
    let per_producer = workload.messages.div_ceil(workload.producers);
    let handles: Vec<_> = (0..workload.producers)
        .map(|p| {
            let producer = Producer::with_strategy(
                Arc::clone(&broker),
                workload.topic.clone(),
                PartitionStrategy::key_hash(),
            );
            let start = p * per_producer;
            let end = (start + per_producer).min(workload.messages);
            thread::spawn(move || -> Result<usize> {
                for i in start..end {
                    let key = format!("key-{}", i % 64);
                    producer.send(Some(&key), format!("message-{}", i))?;
                }
                Ok(end.saturating_sub(start))
            })
        })
        .collect();

    let mut published = 0;
    for handle in handles {
        published += join(handle)?;
    }
    info!(
        topic = %workload.topic,
        published,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "publish phase complete"
    );

    // All consumers join before the first poll.
    let started = Instant::now();
    let barrier = Arc::new(Barrier::new(workload.consumers));
    let handles: Vec<_> = (0..workload.consumers)
        .map(|c| {
            let mut consumer = Consumer::with_id(
                Arc::clone(&broker),
                format!("{}-{}", workload.group, c),
                workload.group.clone(),
                workload.topic.clone(),
            );
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || -> Result<usize> {
                consumer.subscribe()?;
                barrier.wait();
                let mut consumed = 0;
                loop {
                    let batch = consumer.poll(500)?;
                    if batch.is_empty() {
                        break;
                    }
                    consumed += batch.len();
                    consumer.commit()?;
                }
                let assigned = consumer.assignment()?;
                info!(
                    consumer = %consumer.id(),
                    partitions = ?assigned,
                    consumed,
                    "consumer drained its partitions"
                );
                consumer.close();
                Ok(consumed)
            })
        })
        .collect();

    let mut consumed = 0;
    for handle in handles {
        consumed += join(handle)?;
    }

    let stats = broker.stats();
    info!(
        topic = %workload.topic,
        consumed,
        total_messages = stats.total_messages,
        consumer_groups = stats.total_consumer_groups,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "consume phase complete"
    );
    Ok(())
}

fn join(handle: thread::JoinHandle<Result<usize>>) -> Result<usize> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(StreamletError::Internal(
            "worker thread panicked".to_string(),
        )),
    }
}
