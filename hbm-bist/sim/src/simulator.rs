use hbm_axi::{AxiDefaults, Handshakes};
use hbm_engine::{
    Engine, EngineState, MAX_CHANNELS, SharedConfig,
    csr::{CsrTarget, SharedReg},
};
use itertools::Itertools;

use crate::{
    configuration::{MemoryConfig, RuntimeConfig},
    errors::{SimError, SimResult},
    logging::{Logger, info, o, warn},
    memory::MemoryChannel,
    report::Report,
};

/// One engine and the memory behind its port.
#[derive(Debug, Clone)]
struct Slot {
    engine: Engine,
    memory: MemoryChannel,
    /// consecutive active ticks without a single handshake
    quiet_ticks: u64,
}

/// A stack of channel engines sharing one control block, evaluated in
/// lockstep.
///
/// The host side (`csr_*`, `shared_mut`, `engine_mut`) is only reachable
/// between ticks, so every engine sees the same shared values for a whole
/// tick.
#[derive(Debug, Clone)]
pub struct Simulator {
    shared: SharedConfig,
    slots: Vec<Slot>,
    cycle: u64,
    config: RuntimeConfig,
    logger: Logger,
}

impl Simulator {
    pub fn new(
        channels: usize,
        defaults: AxiDefaults,
        memory: MemoryConfig,
        config: RuntimeConfig,
        logger: &Logger,
    ) -> SimResult<Self> {
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(SimError::ChannelCount(channels).into());
        }

        let slots = (0..channels)
            .map(|index| -> SimResult<Slot> {
                let engine = Engine::new(index, defaults, logger)?;
                let memory = MemoryChannel::new(
                    memory,
                    &logger.new(o!("memory" => index)),
                );
                Ok(Slot {
                    engine,
                    memory,
                    quiet_ticks: 0,
                })
            })
            .collect::<SimResult<Vec<_>>>()?;

        Ok(Self {
            shared: SharedConfig::default(),
            slots,
            cycle: 0,
            config,
            logger: logger.clone(),
        })
    }

    pub fn channels(&self) -> usize {
        self.slots.len()
    }

    /// Ticks evaluated so far.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn shared(&self) -> &SharedConfig {
        &self.shared
    }

    pub fn shared_mut(&mut self) -> &mut SharedConfig {
        &mut self.shared
    }

    fn slot(&self, channel: usize) -> SimResult<&Slot> {
        let channels = self.channels();
        self.slots
            .get(channel)
            .ok_or_else(|| {
                SimError::NoSuchChannel { channel, channels }.into()
            })
    }

    fn slot_mut(&mut self, channel: usize) -> SimResult<&mut Slot> {
        let channels = self.channels();
        self.slots
            .get_mut(channel)
            .ok_or_else(|| {
                SimError::NoSuchChannel { channel, channels }.into()
            })
    }

    pub fn engine(&self, channel: usize) -> SimResult<&Engine> {
        Ok(&self.slot(channel)?.engine)
    }

    pub fn engine_mut(&mut self, channel: usize) -> SimResult<&mut Engine> {
        Ok(&mut self.slot_mut(channel)?.engine)
    }

    pub fn memory(&self, channel: usize) -> SimResult<&MemoryChannel> {
        Ok(&self.slot(channel)?.memory)
    }

    pub fn memory_mut(
        &mut self,
        channel: usize,
    ) -> SimResult<&mut MemoryChannel> {
        Ok(&mut self.slot_mut(channel)?.memory)
    }

    pub fn engines(&self) -> impl Iterator<Item = &Engine> {
        self.slots.iter().map(|slot| &slot.engine)
    }

    pub fn states(&self) -> Vec<EngineState> {
        self.engines().map(Engine::state).collect()
    }

    /// Every engine is parked in `Idle`.
    pub fn all_done(&self) -> bool {
        self.engines().all(|engine| engine.status().done())
    }

    /// Host read of the register at byte address `addr`.
    pub fn csr_read(&self, addr: u32) -> SimResult<u32> {
        match CsrTarget::decode(addr, self.channels())? {
            CsrTarget::Shared(reg) => Ok(self.shared.read_register(reg)),
            CsrTarget::Channel(channel, reg) => {
                Ok(self.engine(channel)?.read_register(reg))
            }
        }
    }

    /// Host write of the register at byte address `addr`.
    pub fn csr_write(&mut self, addr: u32, value: u32) -> SimResult<()> {
        match CsrTarget::decode(addr, self.channels())? {
            CsrTarget::Shared(reg) => {
                self.shared.write_register(reg, value);
                if reg == SharedReg::Start {
                    info!(self.logger, "start written";
                        "value" => value & 1,
                        "cycle" => self.cycle);
                }
            }
            CsrTarget::Channel(channel, reg) => {
                self.engine_mut(channel)?.write_register(reg, value)?
            }
        }
        Ok(())
    }

    pub fn start(&mut self) {
        info!(self.logger, "run started";
            "mask" => format!("{:#010x}", self.shared.channel_mask),
            "cycle" => self.cycle);
        self.shared.start = true;
    }

    /// Requests a stop. Engines finish at their next checkpoint.
    pub fn stop(&mut self) {
        info!(self.logger, "stop requested"; "cycle" => self.cycle);
        self.shared.start = false;
    }

    /// Evaluates one clock tick on every channel.
    pub fn tick(&mut self) {
        let shared = self.shared;
        let threshold = self.config.stall_threshold;

        for slot in &mut self.slots {
            let master = slot.engine.drive(&shared);
            let slave = slot.memory.respond(&master);
            let fired = Handshakes::resolve(&master, &slave);
            let active = slot.engine.state().is_active();

            slot.engine.step(&shared, &slave);
            slot.memory.commit(&master, &slave);

            if active && !fired.any() {
                slot.quiet_ticks += 1;
                if slot.quiet_ticks == threshold {
                    warn!(self.logger, "channel stalled";
                        "channel" => slot.engine.index(),
                        "state" => slot.engine.state().name(),
                        "ticks" => threshold);
                }
            } else {
                slot.quiet_ticks = 0;
            }
        }

        self.cycle += 1;
    }

    pub fn run(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.tick();
        }
    }

    /// Ticks until `done` holds, checking before every tick. Returns the
    /// number of ticks evaluated.
    pub fn run_until<F>(
        &mut self,
        mut done: F,
        max_cycles: u64,
    ) -> SimResult<u64>
    where
        F: FnMut(&Simulator) -> bool,
    {
        for elapsed in 0..max_cycles {
            if done(self) {
                return Ok(elapsed);
            }
            self.tick();
        }
        if done(self) {
            return Ok(max_cycles);
        }

        let states = self.states();
        warn!(self.logger, "gave up waiting";
            "cycles" => max_cycles,
            "states" => states.iter().map(|s| s.name()).join(","));
        Err(SimError::Timeout {
            cycles: max_cycles,
            states,
        }
        .into())
    }

    /// Stops the run and waits for every engine to reach `Idle`.
    pub fn drain(&mut self, max_cycles: u64) -> SimResult<u64> {
        self.stop();
        let elapsed = self.run_until(Simulator::all_done, max_cycles)?;
        info!(self.logger, "run stopped"; "cycle" => self.cycle);
        for engine in self.engines() {
            let status = engine.status();
            if status.has_error_response() {
                warn!(self.logger, "channel saw an error response";
                    "channel" => engine.index(),
                    "write_resp" => status.write_resp.bits(),
                    "read_resp" => status.read_resp.bits());
            }
        }
        Ok(elapsed)
    }

    /// Clears `start` and returns every engine and memory port to its
    /// power-on state. Configuration and stored words are kept.
    pub fn reset(&mut self) {
        self.shared.start = false;
        for slot in &mut self.slots {
            slot.engine.reset();
            slot.memory.reset();
            slot.quiet_ticks = 0;
        }
        self.cycle = 0;
        info!(self.logger, "stack reset");
    }

    /// Active channels that have gone at least `threshold` ticks without a
    /// handshake.
    pub fn stalled(&self, threshold: u64) -> Vec<usize> {
        self.slots
            .iter()
            .filter(|slot| slot.quiet_ticks >= threshold)
            .map(|slot| slot.engine.index())
            .collect()
    }

    pub fn report(&self) -> Report {
        Report::new(self, self.config.clock_mhz)
    }
}
