//! Disk Power State Module
//!
//! Queries the power mode of ATA drives through `hdparm -C` and normalizes the
//! reported mode:
//! - `standby` (spun down)
//! - `active/idle`
//! - `idle`
//! - `NVcache_spindown` / `NVcache_spinup` (hybrid drives)
//!
//! Drives may also report modes outside this set (e.g. `unknown` or
//! `sleeping`); those are kept verbatim as [`PowerState::Other`].

pub mod probe;
pub mod state;

// Re-export commonly used types
pub use probe::{HdparmProbe, PowerProbe, ProbeError, DEFAULT_HDPARM, DEFAULT_PROBE_TIMEOUT};
pub use state::{parse, ParseError, PowerState};
