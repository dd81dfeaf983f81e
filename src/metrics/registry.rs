//! Prometheus registry holding per-device power state and error counters

use parking_lot::RwLock;
use prometheus::proto::MetricFamily;
use prometheus::{CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::error::{HddPowerError, Result};
use crate::power::PowerState;

/// Counter of failed probes, labelled by device
pub const ERRORS_METRIC: &str = "hddpower_errors";
/// Ordinal gauge, labelled by device
pub const ORDINAL_STATE_METRIC: &str = "hddpower_state";
/// One-hot gauge, labelled by device and state
pub const ONE_HOT_STATE_METRIC: &str = "hdd_power_state";

/// How a device's power state is exposed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Encoding {
    /// `hddpower_state{dev}` holding the state's ordinal
    #[default]
    Ordinal,
    /// `hdd_power_state{dev,state}` holding 1 for the current state, 0 otherwise
    OneHot,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Ordinal => f.write_str("ordinal"),
            Encoding::OneHot => f.write_str("one-hot"),
        }
    }
}

impl FromStr for Encoding {
    type Err = HddPowerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ordinal" => Ok(Encoding::Ordinal),
            "one-hot" | "onehot" | "one_hot" => Ok(Encoding::OneHot),
            other => Err(HddPowerError::ConfigError(format!(
                "unknown encoding '{}' (expected 'ordinal' or 'one-hot')",
                other
            ))),
        }
    }
}

enum StateMetric {
    Ordinal {
        gauge: GaugeVec,
    },
    OneHot {
        gauge: GaugeVec,
        // Every state ever reported per device; never shrinks
        observed: HashMap<String, BTreeSet<String>>,
    },
}

struct Inner {
    registry: Registry,
    errors: CounterVec,
    state: StateMetric,
}

/// Registry of exported metrics
///
/// Updates for one device are applied under a write lock and scrapes gather
/// under a read lock, so a scrape never sees a partially applied update.
pub struct MetricRegistry {
    encoding: Encoding,
    inner: RwLock<Inner>,
}

impl MetricRegistry {
    /// Create an empty registry for the given encoding
    pub fn new(encoding: Encoding) -> Result<Self> {
        let registry = Registry::new();

        let errors = CounterVec::new(
            Opts::new(
                ERRORS_METRIC,
                "The number of errors encountered while attempting to gather information from devices",
            ),
            &["dev"],
        )?;
        registry.register(Box::new(errors.clone()))?;

        let state = match encoding {
            Encoding::Ordinal => {
                let gauge = GaugeVec::new(
                    Opts::new(
                        ORDINAL_STATE_METRIC,
                        "The device power state (0=standby, 1=active/idle, 2=idle, 3=NVcache_spindown, 4=NVcache_spinup)",
                    ),
                    &["dev"],
                )?;
                registry.register(Box::new(gauge.clone()))?;
                StateMetric::Ordinal { gauge }
            }
            Encoding::OneHot => {
                let gauge = GaugeVec::new(
                    Opts::new(
                        ONE_HOT_STATE_METRIC,
                        "Whether the device is in the given power state (1) or not (0)",
                    ),
                    &["dev", "state"],
                )?;
                registry.register(Box::new(gauge.clone()))?;
                StateMetric::OneHot {
                    gauge,
                    observed: HashMap::new(),
                }
            }
        };

        Ok(Self {
            encoding,
            inner: RwLock::new(Inner {
                registry,
                errors,
                state,
            }),
        })
    }

    /// Encoding selected at construction
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Record the current power state of a device
    ///
    /// With the ordinal encoding, states outside the known set fail with
    /// [`HddPowerError::UnknownState`] and leave the gauge untouched.
    pub fn update(&self, device: &str, state: &PowerState) -> Result<()> {
        let mut inner = self.inner.write();

        match &mut inner.state {
            StateMetric::Ordinal { gauge } => {
                let ordinal = state
                    .ordinal()
                    .ok_or_else(|| HddPowerError::UnknownState(state.label().to_string()))?;
                gauge
                    .get_metric_with_label_values(&[device])?
                    .set(f64::from(ordinal));
            }
            StateMetric::OneHot { gauge, observed } => {
                let states = observed.entry(device.to_string()).or_default();
                states.insert(state.label().to_string());

                for label in states.iter() {
                    let value = if label == state.label() { 1.0 } else { 0.0 };
                    gauge
                        .get_metric_with_label_values(&[device, label.as_str()])?
                        .set(value);
                }
            }
        }

        Ok(())
    }

    /// Count one failed probe for a device
    pub fn record_error(&self, device: &str) -> Result<()> {
        let inner = self.inner.read();
        inner.errors.get_metric_with_label_values(&[device])?.inc();
        Ok(())
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn render(&self) -> Result<String> {
        let families = self.gather();

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;

        String::from_utf8(buffer)
            .map_err(|e| HddPowerError::Server(format!("metrics are not valid UTF-8: {}", e)))
    }

    /// Current state gauge value
    ///
    /// `state` is ignored for the ordinal encoding. Returns `None` if the
    /// series has never been exposed.
    pub fn state_value(&self, device: &str, state: &PowerState) -> Option<f64> {
        match self.encoding {
            Encoding::Ordinal => self.sample(ORDINAL_STATE_METRIC, &[("dev", device)]),
            Encoding::OneHot => self.sample(
                ONE_HOT_STATE_METRIC,
                &[("dev", device), ("state", state.label())],
            ),
        }
    }

    /// Number of failed probes recorded for a device (0 if none)
    pub fn error_count(&self, device: &str) -> f64 {
        self.sample(ERRORS_METRIC, &[("dev", device)])
            .unwrap_or(0.0)
    }

    /// States ever exposed for a device in the one-hot encoding
    pub fn observed_states(&self, device: &str) -> BTreeSet<String> {
        let inner = self.inner.read();
        match &inner.state {
            StateMetric::OneHot { observed, .. } => {
                observed.get(device).cloned().unwrap_or_default()
            }
            StateMetric::Ordinal { .. } => BTreeSet::new(),
        }
    }

    fn gather(&self) -> Vec<MetricFamily> {
        self.inner.read().registry.gather()
    }

    // Reads through gather() so that looking up a series never creates it
    fn sample(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        let families = self.gather();
        let family = families.iter().find(|f| f.get_name() == name)?;

        family
            .get_metric()
            .iter()
            .find(|metric| {
                let pairs = metric.get_label();
                pairs.len() == labels.len()
                    && labels.iter().all(|(key, value)| {
                        pairs
                            .iter()
                            .any(|pair| pair.get_name() == *key && pair.get_value() == *value)
                    })
            })
            .map(|metric| {
                if metric.has_counter() {
                    metric.get_counter().get_value()
                } else {
                    metric.get_gauge().get_value()
                }
            })
    }
}

impl fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}
