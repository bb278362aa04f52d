use bon::Builder;
use serde::{Deserialize, Serialize};

/// Default fabric clock the engines run at.
pub const DEFAULT_CLOCK_MHZ: f64 = 250.0;

/// Configuration struct containing options affecting how a run is driven
/// and reported.
#[derive(Debug, Clone, Copy, PartialEq, Builder)]
pub struct RuntimeConfig {
    /// enables debug logging
    #[builder(default)]
    pub debug_logging: bool,
    /// suppresses everything below errors
    #[builder(default)]
    pub quiet: bool,
    /// clock used to turn ticks into throughput
    #[builder(default = DEFAULT_CLOCK_MHZ)]
    pub clock_mhz: f64,
    /// ticks without any handshake on an active channel before it is
    /// reported as stalled
    #[builder(default = 1024)]
    pub stall_threshold: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RuntimeConfig {
    pub fn get_logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            quiet: self.quiet,
            debug_logging: self.debug_logging,
        }
    }
}

/// Configuration struct describing what settings a logger should be created
/// with.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingConfig {
    /// Whether or not to silence non-error messages. Will be overridden by
    /// `debug_logging` if set to true.
    pub quiet: bool,
    /// Whether or not to enable debug logging. If set to true, will override
    /// `quiet`.
    pub debug_logging: bool,
}

/// Deterministic back-pressure: every ready signal is held low for the
/// first `stall` ticks of each `period`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Builder, Serialize, Deserialize,
)]
pub struct BackPressure {
    pub period: u32,
    pub stall: u32,
}

impl BackPressure {
    pub fn stalls(&self, cycle: u64) -> bool {
        self.period != 0
            && cycle % u64::from(self.period) < u64::from(self.stall)
    }
}

/// Behaviour of the memory behind one channel port.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Builder, Serialize, Deserialize,
)]
#[serde(default)]
pub struct MemoryConfig {
    /// ticks between accepting a read address and the first data beat
    #[builder(default)]
    pub read_latency: u32,
    /// ticks between the last write beat and the write response
    #[builder(default)]
    pub write_latency: u32,
    pub back_pressure: Option<BackPressure>,
    /// bytes backed by the channel, accesses past it decode to an error
    pub capacity: Option<u64>,
    /// never asserts ready or valid, used to exercise stall handling
    #[builder(default)]
    pub unresponsive: bool,
}
