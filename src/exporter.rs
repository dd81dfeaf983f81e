//! Exporter assembly: registry, probe, endpoint and poll loop

use log::info;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::metrics::{MetricRegistry, MetricsEndpoint};
use crate::poller::Poller;
use crate::power::{HdparmProbe, PowerProbe};

/// Running exporter
pub struct Exporter {
    registry: Arc<MetricRegistry>,
    endpoint: MetricsEndpoint,
    poller: Poller,
}

impl Exporter {
    /// Validate `config`, bind the metrics endpoint and prepare the poller
    /// with the hdparm probe.
    pub async fn start(config: &Config) -> Result<Self> {
        let probe = HdparmProbe::new(config.hdparm_path.clone(), config.probe_timeout());
        Self::start_with_probe(config, Box::new(probe)).await
    }

    /// Same as [`Exporter::start`] with a custom probe
    pub async fn start_with_probe(config: &Config, probe: Box<dyn PowerProbe>) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(MetricRegistry::new(config.encoding)?);

        let mut endpoint = MetricsEndpoint::new(registry.clone(), config.bind_addr());
        let addr = endpoint.start().await?;
        info!(
            "started prometheus exporter on {} ({} encoding)",
            addr, config.encoding
        );

        let poller = Poller::new(
            config.devices.clone(),
            config.poll_interval(),
            probe,
            registry.clone(),
        );

        Ok(Self {
            registry,
            endpoint,
            poller,
        })
    }

    /// Address the metrics endpoint is bound to
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.endpoint.local_addr()
    }

    /// Shared metric registry
    pub fn registry(&self) -> &Arc<MetricRegistry> {
        &self.registry
    }

    /// Poll loop
    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    /// Poll devices until the process is terminated
    pub async fn run(&self) {
        self.poller.run().await
    }

    /// Stop serving metrics
    pub async fn shutdown(mut self) {
        self.endpoint.stop().await;
    }
}
