//! Power state type and `hdparm -C` output parsing

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Power mode reported by a drive
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerState {
    /// Spun down
    Standby,
    /// Active or idle (drive does not distinguish)
    ActiveIdle,
    /// Idle
    Idle,
    /// Hybrid drive: NV cache spun down
    NvCacheSpindown,
    /// Hybrid drive: NV cache spun up
    NvCacheSpinup,
    /// Any mode outside the known set, kept verbatim
    Other(String),
}

impl PowerState {
    /// Known states in ordinal order (as numbered by hdparm.c)
    pub const ALL: [PowerState; 5] = [
        PowerState::Standby,
        PowerState::ActiveIdle,
        PowerState::Idle,
        PowerState::NvCacheSpindown,
        PowerState::NvCacheSpinup,
    ];

    /// Map a label as printed by hdparm to a state
    pub fn from_label(label: &str) -> Self {
        match label {
            "standby" => PowerState::Standby,
            "active/idle" => PowerState::ActiveIdle,
            "idle" => PowerState::Idle,
            "NVcache_spindown" => PowerState::NvCacheSpindown,
            "NVcache_spinup" => PowerState::NvCacheSpinup,
            other => PowerState::Other(other.to_string()),
        }
    }

    /// Label exactly as printed by hdparm
    pub fn label(&self) -> &str {
        match self {
            PowerState::Standby => "standby",
            PowerState::ActiveIdle => "active/idle",
            PowerState::Idle => "idle",
            PowerState::NvCacheSpindown => "NVcache_spindown",
            PowerState::NvCacheSpinup => "NVcache_spinup",
            PowerState::Other(label) => label,
        }
    }

    /// Stable numeric value, `None` for states outside the known set
    pub fn ordinal(&self) -> Option<u8> {
        match self {
            PowerState::Standby => Some(0),
            PowerState::ActiveIdle => Some(1),
            PowerState::Idle => Some(2),
            PowerState::NvCacheSpindown => Some(3),
            PowerState::NvCacheSpinup => Some(4),
            PowerState::Other(_) => None,
        }
    }

    /// Check if the state is one of the known modes
    pub fn is_known(&self) -> bool {
        self.ordinal().is_some()
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Probe output without a `drive state is:` line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("could not find state in {output:?}")]
pub struct ParseError {
    /// Full command output, for diagnostics
    pub output: String,
}

fn state_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?m)drive state is:\s+(.+)$").expect("state pattern is valid"))
}

/// Parse the standard output of `hdparm -C <dev>`
///
/// Output looks like:
///
/// ```text
/// /dev/sda:
///  drive state is:  active/idle
/// ```
///
/// The first matching line wins. Output that is not plain ASCII is rejected.
pub fn parse(raw: &[u8]) -> Result<PowerState, ParseError> {
    if !raw.is_ascii() {
        return Err(ParseError {
            output: String::from_utf8_lossy(raw).into_owned(),
        });
    }

    let text = String::from_utf8_lossy(raw);
    state_pattern()
        .captures(&text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|label| !label.is_empty())
        .map(PowerState::from_label)
        .ok_or_else(|| ParseError {
            output: text.into_owned(),
        })
}
