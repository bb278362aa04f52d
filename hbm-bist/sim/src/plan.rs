//! Test plans: a whole run described in one JSON document.
//!
//! ```json
//! {
//!   "channels": 4,
//!   "burst": "INCR",
//!   "bank_offset": 4096,
//!   "shared": { "channel_mask": 15, "data_pattern": 4096 },
//!   "channel": { "mode": "write", "burst_len": 16, "burst_quantity": 8 },
//!   "overrides": { "2": { "mode": "read", "burst_len": 16 } },
//!   "memory": { "read_latency": 20, "write_latency": 10 },
//!   "cycles": 100000
//! }
//! ```

use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

use bon::Builder;
use hbm_axi::{AxiDefaults, BurstType};
use hbm_engine::{ChannelConfig, MAX_CHANNELS, SharedConfig};
use serde::{Deserialize, Serialize};

use crate::{
    configuration::{MemoryConfig, RuntimeConfig},
    errors::{SimError, SimResult},
    logging::Logger,
    simulator::Simulator,
};

#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct TestPlan {
    /// size of the stack
    #[builder(default = 1)]
    pub channels: usize,
    #[builder(default)]
    pub burst: BurstType,
    /// issue single-beat bursts whatever the lengths say
    #[builder(default)]
    pub single: bool,
    /// word distance between the regions of neighbouring channels
    #[builder(default)]
    pub bank_offset: u32,
    /// loaded into the shared block, except `start` which the run controls
    #[builder(default)]
    pub shared: SharedConfig,
    /// applied to every channel before the overrides
    #[builder(default)]
    pub channel: ChannelConfig,
    /// per channel configurations replacing the template entirely
    #[builder(default)]
    pub overrides: BTreeMap<usize, ChannelConfig>,
    #[builder(default)]
    pub memory: MemoryConfig,
    /// ticks to run with `start` set
    #[builder(default = 10_000)]
    pub cycles: u64,
}

impl Default for TestPlan {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl TestPlan {
    pub fn from_file(path: &Path) -> SimResult<Self> {
        let file = File::open(path)?;
        let plan: Self = serde_json::from_reader(BufReader::new(file))?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(SimError::ChannelCount(self.channels).into());
        }
        if let Some(channel) =
            self.overrides.keys().find(|ch| **ch >= self.channels)
        {
            return Err(SimError::InvalidPlan(format!(
                "override for channel {channel} in a stack of {}",
                self.channels
            ))
            .into());
        }
        Ok(())
    }

    /// The configuration channel `index` runs with.
    pub fn channel_config(&self, index: usize) -> ChannelConfig {
        let mut config = match self.overrides.get(&index) {
            Some(config) => *config,
            None => {
                let offset = self.bank_offset.wrapping_mul(index as u32);
                ChannelConfig {
                    address: self.channel.address.wrapping_add(offset),
                    ..self.channel
                }
            }
        };
        if self.single {
            config.burst_len = 1;
            config.last_burst_len = 0;
        }
        config
    }

    /// Builds a simulator with every register loaded. The run is not
    /// started.
    pub fn build(
        &self,
        config: RuntimeConfig,
        logger: &Logger,
    ) -> SimResult<Simulator> {
        self.validate()?;
        let defaults = AxiDefaults::default().with_burst(self.burst);
        let mut sim = Simulator::new(
            self.channels,
            defaults,
            self.memory,
            config,
            logger,
        )?;

        *sim.shared_mut() = SharedConfig {
            start: false,
            ..self.shared
        };
        for index in 0..self.channels {
            *sim.engine_mut(index)?.config_mut() = self.channel_config(index);
        }
        Ok(sim)
    }
}
