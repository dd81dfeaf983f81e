//! Configuration management for the exporter
//!
//! Settings can be loaded from a TOML file and overridden from the command
//! line. A minimal file only lists devices:
//!
//! ```toml
//! devices = ["/dev/sda", "/dev/sdb"]
//! ```

use crate::error::{HddPowerError, Result};
use crate::metrics::Encoding;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Exporter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Block devices to poll (e.g. "/dev/sda")
    #[serde(default)]
    pub devices: Vec<String>,
    /// Address the metrics endpoint binds to
    #[serde(default = "default_listen_address")]
    pub listen_address: IpAddr,
    /// Port the metrics endpoint binds to
    #[serde(default = "default_port")]
    pub port: u16,
    /// Seconds to sleep between poll cycles
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Seconds before a hung probe is killed
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
    /// Metric encoding: "ordinal" or "one-hot"
    #[serde(default)]
    pub encoding: Encoding,
    /// Path to the hdparm binary
    #[serde(default = "default_hdparm_path")]
    pub hdparm_path: PathBuf,
}

// Default value functions
fn default_listen_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    9004
}

fn default_poll_interval() -> u64 {
    crate::poller::DEFAULT_POLL_INTERVAL.as_secs()
}

fn default_probe_timeout() -> u64 {
    crate::power::DEFAULT_PROBE_TIMEOUT.as_secs()
}

fn default_hdparm_path() -> PathBuf {
    PathBuf::from(crate::power::DEFAULT_HDPARM)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            listen_address: default_listen_address(),
            port: default_port(),
            poll_interval_secs: default_poll_interval(),
            probe_timeout_secs: default_probe_timeout(),
            encoding: Encoding::default(),
            hdparm_path: default_hdparm_path(),
        }
    }
}

impl Config {
    /// Configuration polling the given devices with default settings
    pub fn with_devices<I, S>(devices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            devices: devices.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| HddPowerError::ConfigError(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).map_err(|e| {
            HddPowerError::ConfigError(format!("Failed to serialize config: {}", e))
        })?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Check the configuration before anything is started
    pub fn validate(&self) -> Result<()> {
        if self.devices.is_empty() {
            return Err(HddPowerError::ConfigError(
                "at least one device is required".to_string(),
            ));
        }
        if let Some(device) = self.devices.iter().find(|d| d.trim().is_empty()) {
            return Err(HddPowerError::ConfigError(format!(
                "invalid device path {:?}",
                device
            )));
        }
        if self.poll_interval_secs == 0 {
            return Err(HddPowerError::ConfigError(
                "poll interval must be at least one second".to_string(),
            ));
        }
        if self.probe_timeout_secs == 0 {
            return Err(HddPowerError::ConfigError(
                "probe timeout must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    /// Socket address for the metrics endpoint
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_address, self.port)
    }

    /// Time between poll cycles
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Upper bound for a single probe
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}
