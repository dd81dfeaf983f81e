//! Device probing through `hdparm -C`

use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

use super::state::{parse, ParseError, PowerState};

/// Default probe binary, looked up in `PATH`
pub const DEFAULT_HDPARM: &str = "hdparm";

/// Default upper bound for a single probe
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Failure to obtain the power state of one device
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Command could not be started (missing binary, permission denied)
    #[error("failed to run {binary} for {device}: {source}")]
    Spawn {
        binary: String,
        device: String,
        #[source]
        source: io::Error,
    },

    /// Command started but its output could not be collected
    #[error("failed to read output of {binary} for {device}: {source}")]
    Wait {
        binary: String,
        device: String,
        #[source]
        source: io::Error,
    },

    /// Command exited unsuccessfully
    #[error("{binary} exited with {status} for {device}{}", stderr_suffix(.stderr))]
    ExitStatus {
        binary: String,
        device: String,
        status: ExitStatus,
        stderr: String,
    },

    /// Command did not finish in time and was killed
    #[error("probe of {device} timed out after {timeout:?}")]
    Timeout { device: String, timeout: Duration },

    /// Command output had no state line
    #[error(transparent)]
    Parse(#[from] ParseError),
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {}", stderr)
    }
}

/// Source of device power states
///
/// Implementations must not retry; retry policy belongs to the caller.
#[async_trait]
pub trait PowerProbe: Send + Sync {
    /// Query the current power state of `device`
    async fn probe(&self, device: &str) -> Result<PowerState, ProbeError>;
}

/// Probe that runs `hdparm -C <device>`
#[derive(Debug, Clone)]
pub struct HdparmProbe {
    binary: PathBuf,
    timeout: Duration,
}

impl HdparmProbe {
    /// Create a probe running `binary` with the given per-call timeout
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    /// Path of the probe binary
    pub fn binary(&self) -> &PathBuf {
        &self.binary
    }

    /// Per-call timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for HdparmProbe {
    fn default() -> Self {
        Self::new(DEFAULT_HDPARM, DEFAULT_PROBE_TIMEOUT)
    }
}

#[async_trait]
impl PowerProbe for HdparmProbe {
    async fn probe(&self, device: &str) -> Result<PowerState, ProbeError> {
        let binary = self.binary.display().to_string();

        // kill_on_drop reaps the child when the timeout drops the future
        let child = Command::new(&self.binary)
            .arg("-C")
            .arg(device)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProbeError::Spawn {
                binary: binary.clone(),
                device: device.to_string(),
                source,
            })?;

        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| ProbeError::Wait {
                binary: binary.clone(),
                device: device.to_string(),
                source,
            })?,
            Err(_) => {
                return Err(ProbeError::Timeout {
                    device: device.to_string(),
                    timeout: self.timeout,
                })
            }
        };

        if !output.status.success() {
            return Err(ProbeError::ExitStatus {
                binary,
                device: device.to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(parse(&output.stdout)?)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::Path;

    // `sh -C <script>` runs the script with noclobber set, which lets a shell
    // script stand in for a device path.
    fn script(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "hddpower-probe-{}-{}.sh",
            std::process::id(),
            name
        ));
        std::fs::write(&path, body).unwrap();
        path
    }

    fn sh_probe(timeout: Duration) -> HdparmProbe {
        HdparmProbe::new("sh", timeout)
    }

    fn device(path: &Path) -> String {
        path.display().to_string()
    }

    #[tokio::test]
    async fn test_probe_success() {
        let path = script(
            "success",
            "printf '\\n/dev/sda:\\n drive state is:  standby\\n'\n",
        );
        let state = sh_probe(Duration::from_secs(5))
            .probe(&device(&path))
            .await
            .unwrap();
        assert_eq!(state, PowerState::Standby);
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_probe_unparseable_output() {
        let path = script("garbage", "echo 'HDIO_DRIVE_CMD(check) failed'\n");
        let err = sh_probe(Duration::from_secs(5))
            .probe(&device(&path))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Parse(_)));
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_probe_exit_status() {
        let path = script("exit", "echo 'No such device' >&2\nexit 2\n");
        let err = sh_probe(Duration::from_secs(5))
            .probe(&device(&path))
            .await
            .unwrap_err();
        match err {
            ProbeError::ExitStatus { stderr, status, .. } => {
                assert_eq!(stderr, "No such device");
                assert_eq!(status.code(), Some(2));
            }
            other => panic!("unexpected error: {other}"),
        }
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_exit_status_without_stderr() {
        let path = script("silent-exit", "exit 3\n");
        let err = sh_probe(Duration::from_secs(5))
            .probe(&device(&path))
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, ProbeError::ExitStatus { ref stderr, .. } if stderr.is_empty()));
        assert!(message.ends_with(&format!("for {}", device(&path))), "{}", message);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_wait_error_message() {
        let err = ProbeError::Wait {
            binary: "hdparm".into(),
            device: "/dev/sda".into(),
            source: io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"),
        };
        assert_eq!(
            err.to_string(),
            "failed to read output of hdparm for /dev/sda: pipe closed"
        );
    }

    #[tokio::test]
    async fn test_probe_timeout() {
        let path = script("hang", "sleep 5\n");
        let err = sh_probe(Duration::from_millis(100))
            .probe(&device(&path))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Timeout { .. }));
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_probe_missing_binary() {
        let probe = HdparmProbe::new("/nonexistent/hdparm", Duration::from_secs(1));
        let err = probe.probe("/dev/sda").await.unwrap_err();
        assert!(matches!(err, ProbeError::Spawn { .. }));
    }

    #[test]
    fn test_default_probe() {
        let probe = HdparmProbe::default();
        assert_eq!(probe.binary(), &PathBuf::from("hdparm"));
        assert_eq!(probe.timeout(), Duration::from_secs(30));
    }
}
