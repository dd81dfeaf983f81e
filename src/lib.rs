//! # hddpower
//!
//! A Prometheus exporter for the power state of hard disks. Each configured
//! block device is queried with `hdparm -C` on a fixed interval and the
//! reported mode (`standby`, `active/idle`, `idle`, `NVcache_spindown`,
//! `NVcache_spinup`) is exposed over HTTP for scraping.
//!
//! ## Quick Start
//!
//! ```no_run
//! use hddpower::{Config, Exporter};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::with_devices(["/dev/sda", "/dev/sdb"]);
//! let exporter = Exporter::start(&config).await?;
//! exporter.run().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Metrics
//!
//! - `hddpower_errors{dev}` - failed probes per device
//! - `hddpower_state{dev}` - state ordinal (ordinal encoding)
//! - `hdd_power_state{dev,state}` - 1 for the current state (one-hot encoding)
//!
//! A device that fails to answer keeps its last reported state and has its
//! error counter incremented; other devices are unaffected.

pub mod config; // Configuration management with TOML persistence
pub mod error;
pub mod exporter;
pub mod metrics; // Prometheus registry and HTTP endpoint
pub mod poller;
pub mod power; // hdparm probing and state parsing

// Re-export main types
pub use config::Config;
pub use error::{HddPowerError, Result};
pub use exporter::Exporter;
pub use metrics::{Encoding, MetricRegistry, MetricsEndpoint};
pub use poller::{CycleReport, Poller, DEFAULT_POLL_INTERVAL};
pub use power::{HdparmProbe, ParseError, PowerProbe, PowerState, ProbeError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
