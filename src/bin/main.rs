//! CLI tool for hddpower: Prometheus exporter for hdd power state using hdparm

use clap::Parser;
use hddpower::{Config, Encoding, Exporter};
use log::info;
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hddpower-exporter")]
#[command(about = "Prometheus exporter for hdd power state using hdparm", long_about = None)]
#[command(version)]
struct Cli {
    /// List of block devices
    #[arg(value_name = "DEV")]
    devices: Vec<String>,

    /// The port number to bind the Prometheus exporter to [default: 9004]
    #[arg(short, long)]
    port: Option<u16>,

    /// The address to bind the Prometheus exporter to [default: 0.0.0.0]
    #[arg(short, long)]
    listen_address: Option<IpAddr>,

    /// Seconds between poll cycles [default: 10]
    #[arg(short, long)]
    interval: Option<u64>,

    /// Seconds before a hung hdparm is killed [default: 30]
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Metric encoding: ordinal or one-hot [default: ordinal]
    #[arg(short, long)]
    encoding: Option<Encoding>,

    /// Path to the hdparm binary [default: hdparm]
    #[arg(long)]
    hdparm: Option<PathBuf>,

    /// TOML configuration file; command line flags take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> hddpower::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::default(),
        };

        if !self.devices.is_empty() {
            config.devices = self.devices;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(address) = self.listen_address {
            config.listen_address = address;
        }
        if let Some(interval) = self.interval {
            config.poll_interval_secs = interval;
        }
        if let Some(timeout) = self.timeout {
            config.probe_timeout_secs = timeout;
        }
        if let Some(encoding) = self.encoding {
            config.encoding = encoding;
        }
        if let Some(hdparm) = self.hdparm {
            config.hdparm_path = hdparm;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = cli.into_config()?;
    let exporter = Exporter::start(&config).await?;

    tokio::select! {
        _ = exporter.run() => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("received interrupt, shutting down");
        }
    }

    exporter.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn config_file(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "hddpower-cli-{}-{}.toml",
            std::process::id(),
            name
        ));
        let mut config = Config::with_devices(["/dev/sda", "/dev/sdb"]);
        config.port = 9100;
        config.poll_interval_secs = 60;
        config.hdparm_path = PathBuf::from("/usr/sbin/hdparm");
        config.save_to(&path).unwrap();
        path
    }

    fn parse(path: &Path, args: &[&str]) -> Config {
        let path = path.display().to_string();
        let mut argv = vec!["hddpower-exporter", "--config", path.as_str()];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().into_config().unwrap()
    }

    #[test]
    fn test_positional_devices_replace_file_devices() {
        let path = config_file("devices");
        let config = parse(&path, &["/dev/sdc", "--encoding", "one-hot"]);

        assert_eq!(config.devices, vec!["/dev/sdc".to_string()]);
        assert_eq!(config.encoding, Encoding::OneHot);
        assert_eq!(config.port, 9100);
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.hdparm_path, PathBuf::from("/usr/sbin/hdparm"));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_file_values_kept_without_flags() {
        let path = config_file("keep");
        let config = parse(&path, &["-p", "9200"]);

        assert_eq!(
            config.devices,
            vec!["/dev/sda".to_string(), "/dev/sdb".to_string()]
        );
        assert_eq!(config.port, 9200);
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.encoding, Encoding::Ordinal);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_defaults_without_config_file() {
        let config = Cli::try_parse_from(["hddpower-exporter", "-i", "5", "/dev/sda"])
            .unwrap()
            .into_config()
            .unwrap();
        let defaults = Config::default();

        assert_eq!(config.devices, vec!["/dev/sda".to_string()]);
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.port, defaults.port);
        assert_eq!(config.listen_address, defaults.listen_address);
        assert_eq!(config.hdparm_path, defaults.hdparm_path);
    }

    #[test]
    fn test_rejects_unknown_encoding() {
        assert!(Cli::try_parse_from(["hddpower-exporter", "--encoding", "binary"]).is_err());
    }
}
