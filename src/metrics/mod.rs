//! Prometheus metrics for drive power state
//!
//! Two mutually exclusive encodings are available, chosen when the registry
//! is built:
//!
//! | Encoding  | Series                              | Value                  |
//! |-----------|-------------------------------------|------------------------|
//! | `ordinal` | `hddpower_state{dev}`               | state ordinal (0..=4)  |
//! | `one-hot` | `hdd_power_state{dev,state}`        | 1 if current, else 0   |
//!
//! Both expose `hddpower_errors{dev}`, the number of failed probes.

pub mod endpoint;
pub mod registry;

pub use endpoint::MetricsEndpoint;
pub use registry::{
    Encoding, MetricRegistry, ERRORS_METRIC, ONE_HOT_STATE_METRIC, ORDINAL_STATE_METRIC,
};
