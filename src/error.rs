//! Error types for the Streamlet application crate.
//!
//! Broker failures keep their [`BrokerError`] detail; configuration and I/O
//! failures around it get their own variants.

use std::io;

use streamlet_core::BrokerError;
use thiserror::Error;

/// Main error type for Streamlet operations
#[derive(Error, Debug)]
pub enum StreamletError {
    /// Configuration parsing or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error returned by the broker core
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// Unexpected internal failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Underlying I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result alias for Streamlet operations
pub type Result<T> = std::result::Result<T, StreamletError>;
