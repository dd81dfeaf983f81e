//! Poll loop: probes every device on a fixed interval and feeds the registry

use log::{debug, error, info};
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::metrics::MetricRegistry;
use crate::power::PowerProbe;

/// Default time between the end of one cycle and the start of the next
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Outcome of one pass over all devices
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Devices whose state was updated
    pub succeeded: usize,
    /// Devices that failed and were counted
    pub failed: usize,
}

/// Periodic poller
pub struct Poller {
    devices: Vec<String>,
    interval: Duration,
    probe: Box<dyn PowerProbe>,
    registry: Arc<MetricRegistry>,
}

impl Poller {
    /// Create a poller over `devices`, probed in order
    pub fn new(
        devices: Vec<String>,
        interval: Duration,
        probe: Box<dyn PowerProbe>,
        registry: Arc<MetricRegistry>,
    ) -> Self {
        Self {
            devices,
            interval,
            probe,
            registry,
        }
    }

    /// Devices polled each cycle
    pub fn devices(&self) -> &[String] {
        &self.devices
    }

    /// Sleep between cycles
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Probe each device once
    ///
    /// A failing device is logged and counted, and never stops the cycle.
    pub async fn poll_once(&self) -> CycleReport {
        let mut report = CycleReport::default();

        for device in &self.devices {
            match self.poll_device(device).await {
                Ok(()) => report.succeeded += 1,
                Err(err) => {
                    report.failed += 1;
                    error!("could not query device {}: {}", device, err);
                    if let Err(e) = self.registry.record_error(device) {
                        error!("could not count error for device {}: {}", device, e);
                    }
                }
            }
        }

        debug!(
            "poll cycle finished: {} succeeded, {} failed",
            report.succeeded, report.failed
        );
        report
    }

    async fn poll_device(&self, device: &str) -> Result<()> {
        let state = self.probe.probe(device).await?;
        debug!("device {} is {}", device, state);
        self.registry.update(device, &state)
    }

    /// Poll forever, sleeping `interval` after each cycle
    pub async fn run(&self) {
        info!(
            "polling {} device(s) every {:?}",
            self.devices.len(),
            self.interval
        );

        loop {
            self.poll_once().await;
            tokio::time::sleep(self.interval).await;
        }
    }
}
