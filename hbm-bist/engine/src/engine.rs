use hbm_axi::{
    AddrChannel, AxiDefaults, DataWord, FULL_STROBE, Handshakes, MasterSignals,
    SlaveSignals, WriteData,
};
use slog::{Logger, debug, o, trace};

use crate::{
    ChannelConfig, ChannelStatus, EngineState, MAX_CHANNELS, Mode,
    SharedConfig,
    errors::{EngineError, EngineResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Write,
    Read,
}

impl Direction {
    fn issue(self) -> EngineState {
        match self {
            Direction::Write => EngineState::WriteIssue,
            Direction::Read => EngineState::ReadIssue,
        }
    }

    fn pause(self) -> EngineState {
        match self {
            Direction::Write => EngineState::WritePause,
            Direction::Read => EngineState::ReadPause,
        }
    }
}

impl From<Mode> for Direction {
    fn from(value: Mode) -> Self {
        match value {
            Mode::Read => Direction::Read,
            Mode::Write => Direction::Write,
        }
    }
}

/// Everything the engine latches at a clock edge.
#[derive(Debug, Clone, Copy, Default)]
struct Registers {
    status: ChannelStatus,
    /// beat of the current burst
    beat_counter: u32,
    /// bursts completed in the current sequence
    burst_counter: u32,
    /// ticks spent in the pause state
    delay_counter: u32,
    /// the address phase of the pending write burst has been accepted
    aw_accepted: bool,
    /// the first data beat of the pending write burst has been accepted
    w_accepted: bool,
}

impl Registers {
    /// Clears the counters of `dir` and moves to its issue state.
    fn begin_sequence(&mut self, dir: Direction) {
        self.status.ticks = 0;
        match dir {
            Direction::Write => self.status.total_writes = 0,
            Direction::Read => self.status.total_reads = 0,
        }
        self.beat_counter = 0;
        self.burst_counter = 0;
        self.delay_counter = 0;
        self.aw_accepted = false;
        self.w_accepted = false;
        self.status.state = dir.issue();
    }
}

/// The burst state machine of one memory channel.
#[derive(Debug, Clone)]
pub struct Engine {
    index: usize,
    defaults: AxiDefaults,
    config: ChannelConfig,
    regs: Registers,
    logger: Logger,
}

impl Engine {
    /// Creates the engine for channel `index`, which selects its bit in
    /// [SharedConfig::channel_mask].
    pub fn new(
        index: usize,
        defaults: AxiDefaults,
        logger: &Logger,
    ) -> EngineResult<Self> {
        if index >= MAX_CHANNELS {
            return Err(EngineError::ChannelOutOfRange(index));
        }

        Ok(Self {
            index,
            defaults,
            config: ChannelConfig::default(),
            regs: Registers::default(),
            logger: logger.new(o!("channel" => index)),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Host side access to the channel configuration.
    pub fn config_mut(&mut self) -> &mut ChannelConfig {
        &mut self.config
    }

    pub fn status(&self) -> &ChannelStatus {
        &self.regs.status
    }

    pub fn state(&self) -> EngineState {
        self.regs.status.state
    }

    pub fn beat_counter(&self) -> u32 {
        self.regs.beat_counter
    }

    pub fn burst_counter(&self) -> u32 {
        self.regs.burst_counter
    }

    pub fn delay_counter(&self) -> u32 {
        self.regs.delay_counter
    }

    /// Returns to `Idle` with every status register cleared. The
    /// configuration is left alone.
    pub fn reset(&mut self) {
        self.regs = Registers::default();
    }

    fn current_len(&self) -> u16 {
        self.config.len_for_burst(self.regs.burst_counter)
    }

    fn address_phase(&self, len: u16) -> AddrChannel {
        self.defaults.address(self.config.byte_address(), len)
    }

    fn write_beat(
        &self,
        shared: &SharedConfig,
        beat: u32,
        len: u16,
    ) -> WriteData {
        WriteData {
            data: DataWord::write_pattern(shared.data_pattern, beat),
            strb: FULL_STROBE,
            last: beat >= u32::from(len),
        }
    }

    /// The signals this engine drives onto its port for the current tick.
    /// Only depends on the registers latched at the previous edge and the
    /// shared block, never on what the slave drives.
    pub fn drive(&self, shared: &SharedConfig) -> MasterSignals {
        let regs = &self.regs;
        let len = self.current_len();

        match regs.status.state {
            EngineState::WriteIssue => MasterSignals {
                aw: (!regs.aw_accepted).then(|| self.address_phase(len)),
                w: (!regs.w_accepted)
                    .then(|| self.write_beat(shared, regs.beat_counter, len)),
                ..Default::default()
            },
            EngineState::WriteBeat => MasterSignals {
                w: Some(self.write_beat(shared, regs.beat_counter, len)),
                ..Default::default()
            },
            EngineState::WriteLast => MasterSignals {
                b_ready: true,
                ..Default::default()
            },
            EngineState::ReadIssue => MasterSignals {
                ar: Some(self.address_phase(len)),
                ..Default::default()
            },
            EngineState::ReadBeat => MasterSignals {
                r_ready: true,
                ..Default::default()
            },
            EngineState::Idle
            | EngineState::WritePause
            | EngineState::ReadPause => MasterSignals::default(),
        }
    }

    /// Advances the engine by one clock edge given what the slave drove
    /// during the tick.
    pub fn step(&mut self, shared: &SharedConfig, slave: &SlaveSignals) {
        let fired = Handshakes::resolve(&self.drive(shared), slave);
        let cur = self.regs;
        let mut next = cur;
        let state = cur.status.state;

        if state.is_active() {
            next.status.ticks = cur.status.ticks.wrapping_add(1);
        }

        match state {
            EngineState::Idle => {
                if shared.start && shared.is_enabled(self.index) {
                    next.begin_sequence(self.config.mode.into());
                    next.status.total_reads = 0;
                    next.status.total_writes = 0;
                }
            }
            EngineState::WriteIssue => {
                if fired.w {
                    next.status.total_writes =
                        cur.status.total_writes.wrapping_add(1);
                }
                let aw_done = cur.aw_accepted || fired.aw;
                let w_done = cur.w_accepted || fired.w;
                if aw_done && w_done {
                    next.aw_accepted = false;
                    next.w_accepted = false;
                    if self.current_len() != 0 {
                        next.beat_counter = 1;
                        next.status.state = EngineState::WriteBeat;
                    } else {
                        next.burst_counter = cur.burst_counter.wrapping_add(1);
                        next.status.state = EngineState::WriteLast;
                    }
                } else {
                    next.aw_accepted = aw_done;
                    next.w_accepted = w_done;
                }
            }
            EngineState::WriteBeat => {
                if fired.w {
                    next.status.total_writes =
                        cur.status.total_writes.wrapping_add(1);
                    if cur.beat_counter < u32::from(self.current_len()) {
                        next.beat_counter = cur.beat_counter + 1;
                    } else {
                        next.beat_counter = 0;
                        next.burst_counter = cur.burst_counter.wrapping_add(1);
                        next.status.state = EngineState::WriteLast;
                    }
                }
            }
            EngineState::WriteLast => {
                if let (true, Some(b)) = (fired.b, slave.b) {
                    next.status.write_resp = b.resp;
                    if self.config.completes_sequence(cur.burst_counter) {
                        self.finish_sequence(
                            shared,
                            Direction::Write,
                            &mut next,
                        );
                    } else {
                        next.beat_counter = 0;
                        next.status.state = EngineState::WriteIssue;
                    }
                }
            }
            EngineState::ReadIssue => {
                if fired.ar {
                    next.beat_counter = 0;
                    next.status.state = EngineState::ReadBeat;
                }
            }
            EngineState::ReadBeat => {
                if let (true, Some(r)) = (fired.r, slave.r) {
                    next.status.read_data = r.data;
                    next.status.read_resp = r.resp;
                    next.status.total_reads =
                        cur.status.total_reads.wrapping_add(1);
                    if r.last {
                        let completed = cur.burst_counter.wrapping_add(1);
                        next.burst_counter = completed;
                        next.beat_counter = 0;
                        if self.config.completes_sequence(completed) {
                            self.finish_sequence(
                                shared,
                                Direction::Read,
                                &mut next,
                            );
                        } else {
                            next.status.state = EngineState::ReadIssue;
                        }
                    } else {
                        next.beat_counter = cur.beat_counter.wrapping_add(1);
                    }
                }
            }
            EngineState::WritePause => {
                self.pause(shared, Direction::Write, &cur, &mut next)
            }
            EngineState::ReadPause => {
                self.pause(shared, Direction::Read, &cur, &mut next)
            }
        }

        if next.status.state != state {
            trace!(self.logger, "transition";
                "from" => state.name(),
                "to" => next.status.state.name(),
                "ticks" => next.status.ticks);
        }
        self.regs = next;
    }

    /// Sequence boundary: stop, pause or start over.
    fn finish_sequence(
        &self,
        shared: &SharedConfig,
        dir: Direction,
        next: &mut Registers,
    ) {
        if !shared.start {
            debug!(self.logger, "sequence complete, stopping";
                "reads" => next.status.total_reads,
                "writes" => next.status.total_writes,
                "ticks" => next.status.ticks);
            next.status.state = EngineState::Idle;
        } else if self.config.delay_bound > 0 || shared.force_pause {
            next.beat_counter = 0;
            next.burst_counter = 0;
            next.delay_counter = 0;
            next.status.state = dir.pause();
        } else {
            next.begin_sequence(dir);
        }
    }

    fn pause(
        &self,
        shared: &SharedConfig,
        dir: Direction,
        cur: &Registers,
        next: &mut Registers,
    ) {
        let bound = self.config.delay_bound;

        // a forced pause without a bound has nothing to count towards
        if !(shared.force_pause && bound == 0) {
            next.delay_counter = cur.delay_counter.wrapping_add(1);
        }

        if !shared.start {
            next.status.state = EngineState::Idle;
        } else if shared.force_pause {
            // held until the host releases it
        } else if bound == 0
            || u64::from(cur.delay_counter) + 1 >= u64::from(bound)
        {
            next.begin_sequence(dir);
        }
    }
}
