//! Error types for hddpower

use std::io;
use thiserror::Error;

use crate::power::{ParseError, ProbeError};

/// Result type alias for hddpower operations
pub type Result<T> = std::result::Result<T, HddPowerError>;

/// Main error type for the exporter
#[derive(Error, Debug)]
pub enum HddPowerError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Probing a device failed
    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    /// Probe output had no recognizable state line
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// State has no ordinal value
    #[error("Unknown power state: {0}")]
    UnknownState(String),

    /// Prometheus registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// HTTP endpoint error
    #[error("Server error: {0}")]
    Server(String),
}
