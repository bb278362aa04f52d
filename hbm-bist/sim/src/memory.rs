//! A model of the memory sitting behind one channel port.
//!
//! Storage is perfect: every write lands and every read returns what was last
//! written, or zero. At most one write burst and one read burst are in flight
//! at a time, which is all a single engine ever issues.

use ahash::AHashMap;
use hbm_axi::{
    AddrChannel, DataWord, Handshakes, MasterSignals, ReadData, Resp,
    SlaveSignals, WORD_BYTES, WriteResp,
};

use crate::{
    configuration::MemoryConfig,
    logging::{Logger, debug, warn},
};

#[derive(Debug, Clone, Copy)]
struct PendingWrite {
    addr: AddrChannel,
    beat: u32,
    resp: Resp,
}

#[derive(Debug, Clone, Copy)]
struct PendingResp {
    id: u8,
    resp: Resp,
    wait: u32,
}

#[derive(Debug, Clone, Copy)]
struct PendingRead {
    addr: AddrChannel,
    beat: u32,
    wait: u32,
}

#[derive(Debug, Clone)]
pub struct MemoryChannel {
    config: MemoryConfig,
    store: AHashMap<u64, DataWord>,
    cycle: u64,
    write: Option<PendingWrite>,
    write_resp: Option<PendingResp>,
    read: Option<PendingRead>,
    logger: Logger,
}

impl MemoryChannel {
    pub fn new(config: MemoryConfig, logger: &Logger) -> Self {
        Self {
            config,
            store: AHashMap::new(),
            cycle: 0,
            write: None,
            write_resp: None,
            read: None,
            logger: logger.clone(),
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut MemoryConfig {
        &mut self.config
    }

    /// Whether `addr` is backed by storage.
    pub fn in_range(&self, addr: u64) -> bool {
        self.config
            .capacity
            .is_none_or(|cap| addr.saturating_add(WORD_BYTES as u64) <= cap)
    }

    /// The word stored at byte address `addr`, rounded down to a word.
    pub fn peek(&self, addr: u64) -> DataWord {
        self.store
            .get(&word_aligned(addr))
            .copied()
            .unwrap_or_default()
    }

    /// Stores `data` at `addr` without going through the port.
    pub fn poke(&mut self, addr: u64, data: DataWord) {
        self.store.insert(word_aligned(addr), data);
    }

    /// Number of distinct words written so far.
    pub fn words_stored(&self) -> usize {
        self.store.len()
    }

    /// Drops any burst in flight. Stored data is kept.
    pub fn reset(&mut self) {
        self.write = None;
        self.write_resp = None;
        self.read = None;
    }

    fn load(&self, addr: u64) -> (DataWord, Resp) {
        if self.in_range(addr) {
            (self.peek(addr), Resp::Okay)
        } else {
            (DataWord::ZERO, Resp::DecErr)
        }
    }

    /// The signals driven back for this tick. Ready signals may follow the
    /// master's valid signals, as AXI allows; valid signals only depend on
    /// what was accepted in earlier ticks.
    pub fn respond(&self, master: &MasterSignals) -> SlaveSignals {
        if self.config.unresponsive {
            return SlaveSignals::default();
        }

        let stalled = self
            .config
            .back_pressure
            .is_some_and(|bp| bp.stalls(self.cycle));

        let aw_ready =
            !stalled && self.write.is_none() && self.write_resp.is_none();
        // data may arrive in the same tick as its address
        let w_ready = !stalled
            && (self.write.is_some() || (aw_ready && master.aw.is_some()));

        let b = self
            .write_resp
            .filter(|pending| pending.wait == 0)
            .map(|pending| WriteResp {
                id: pending.id,
                resp: pending.resp,
            });

        let r = self.read.filter(|pending| pending.wait == 0).map(|pending| {
            let (data, resp) =
                self.load(pending.addr.beat_address(pending.beat));
            ReadData {
                id: pending.addr.id,
                data,
                resp,
                last: pending.beat + 1 >= pending.addr.beats(),
            }
        });

        SlaveSignals {
            aw_ready,
            w_ready,
            b,
            ar_ready: !stalled && self.read.is_none(),
            r,
        }
    }

    /// Clock edge: applies every transfer that completed this tick.
    pub fn commit(&mut self, master: &MasterSignals, slave: &SlaveSignals) {
        let fired = Handshakes::resolve(master, slave);

        // responses already in flight age before new ones are queued
        match self.write_resp {
            Some(_) if fired.b => self.write_resp = None,
            Some(ref mut pending) if pending.wait > 0 => pending.wait -= 1,
            _ => {}
        }

        if let (true, Some(aw)) = (fired.aw, master.aw) {
            self.write = Some(PendingWrite {
                addr: aw,
                beat: 0,
                resp: Resp::Okay,
            });
        }

        if let (true, Some(w)) = (fired.w, master.w) {
            self.accept_beat(w.data, w.strb, w.last);
        }

        match self.read {
            Some(ref mut pending) if fired.r => {
                pending.beat += 1;
                if pending.beat >= pending.addr.beats() {
                    self.read = None;
                }
            }
            Some(ref mut pending) if pending.wait > 0 => pending.wait -= 1,
            _ => {}
        }

        if let (true, Some(ar)) = (fired.ar, master.ar) {
            self.read = Some(PendingRead {
                addr: ar,
                beat: 0,
                wait: self.config.read_latency,
            });
        }

        self.cycle += 1;
    }

    fn accept_beat(&mut self, data: DataWord, strb: u32, last: bool) {
        let Some(mut pending) = self.write else {
            warn!(self.logger, "write beat accepted without an address";
                "cycle" => self.cycle);
            return;
        };

        let addr = pending.addr.beat_address(pending.beat);
        if self.in_range(addr) {
            let merged = self.peek(addr).merge_strobed(&data, strb);
            self.poke(addr, merged);
        } else {
            debug!(self.logger, "write past capacity"; "addr" => addr);
            pending.resp = Resp::DecErr;
        }

        pending.beat += 1;
        let expected_last = pending.beat >= pending.addr.beats();
        if last != expected_last {
            warn!(self.logger, "WLAST does not match burst length";
                "beat" => pending.beat,
                "len" => pending.addr.len);
        }

        if last || expected_last {
            self.write = None;
            self.write_resp = Some(PendingResp {
                id: pending.addr.id,
                resp: pending.resp,
                wait: self.config.write_latency,
            });
        } else {
            self.write = Some(pending);
        }
    }
}

fn word_aligned(addr: u64) -> u64 {
    addr & !(WORD_BYTES as u64 - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{configuration::BackPressure, logging::discard};
    use hbm_axi::{AxiDefaults, BurstType, FULL_STROBE, WriteData};

    fn memory(config: MemoryConfig) -> MemoryChannel {
        MemoryChannel::new(config, &discard())
    }

    fn write_beat(lane: u32, last: bool) -> WriteData {
        WriteData {
            data: DataWord::from_lanes([lane; 8]),
            strb: FULL_STROBE,
            last,
        }
    }

    /// Drives one tick and returns what the memory answered.
    fn tick(mem: &mut MemoryChannel, master: MasterSignals) -> SlaveSignals {
        let slave = mem.respond(&master);
        mem.commit(&master, &slave);
        slave
    }

    #[test]
    fn write_then_read_back() {
        let mut mem = memory(MemoryConfig::default());
        let aw = AxiDefaults::default().address(0x40, 1);

        let slave = tick(
            &mut mem,
            MasterSignals {
                aw: Some(aw),
                w: Some(write_beat(1, false)),
                ..Default::default()
            },
        );
        assert!(slave.aw_ready && slave.w_ready);

        // address busy until the response is taken
        let slave = tick(
            &mut mem,
            MasterSignals {
                aw: Some(aw),
                w: Some(write_beat(2, true)),
                ..Default::default()
            },
        );
        assert!(!slave.aw_ready && slave.w_ready);

        let slave = tick(
            &mut mem,
            MasterSignals {
                b_ready: true,
                ..Default::default()
            },
        );
        assert_eq!(slave.b.map(|b| b.resp), Some(Resp::Okay));
        assert_eq!(mem.peek(0x40).lane(0), 1);
        assert_eq!(mem.peek(0x60).lane(0), 2);

        let slave = tick(
            &mut mem,
            MasterSignals {
                ar: Some(aw),
                ..Default::default()
            },
        );
        assert!(slave.ar_ready && slave.r.is_none());

        let mut lanes = vec![];
        for _ in 0..2 {
            let slave = tick(
                &mut mem,
                MasterSignals {
                    r_ready: true,
                    ..Default::default()
                },
            );
            let r = slave.r.unwrap();
            lanes.push((r.data.lane(0), r.last));
        }
        assert_eq!(lanes, vec![(1, false), (2, true)]);
    }

    #[test]
    fn data_waits_for_an_address() {
        let mem = memory(MemoryConfig::default());
        let slave = mem.respond(&MasterSignals {
            w: Some(write_beat(0, true)),
            ..Default::default()
        });
        assert!(!slave.w_ready);
    }

    #[test]
    fn read_latency_delays_first_beat() {
        let mut mem = memory(MemoryConfig::builder().read_latency(3).build());
        let ar = AxiDefaults::default().address(0, 0);
        tick(
            &mut mem,
            MasterSignals {
                ar: Some(ar),
                ..Default::default()
            },
        );
        let waits = (0..4)
            .take_while(|_| {
                tick(
                    &mut mem,
                    MasterSignals {
                        r_ready: true,
                        ..Default::default()
                    },
                )
                .r
                .is_none()
            })
            .count();
        assert_eq!(waits, 3);
    }

    #[test]
    fn write_response_latency() {
        let mut mem = memory(MemoryConfig::builder().write_latency(2).build());
        let aw = AxiDefaults::default().address(0, 0);
        tick(
            &mut mem,
            MasterSignals {
                aw: Some(aw),
                w: Some(write_beat(5, true)),
                ..Default::default()
            },
        );
        let master = MasterSignals {
            b_ready: true,
            ..Default::default()
        };
        assert!(tick(&mut mem, master.clone()).b.is_none());
        assert!(tick(&mut mem, master.clone()).b.is_none());
        assert!(tick(&mut mem, master.clone()).b.is_some());
        assert!(tick(&mut mem, master).b.is_none());
    }

    #[test]
    fn capacity_decodes_to_error() {
        let mut mem = memory(MemoryConfig::builder().capacity(0x40).build());
        assert!(mem.in_range(0x20));
        assert!(!mem.in_range(0x40));

        let aw = AxiDefaults::default().address(0x40, 0);
        tick(
            &mut mem,
            MasterSignals {
                aw: Some(aw),
                w: Some(write_beat(9, true)),
                ..Default::default()
            },
        );
        let slave = tick(
            &mut mem,
            MasterSignals {
                b_ready: true,
                ..Default::default()
            },
        );
        assert_eq!(slave.b.map(|b| b.resp), Some(Resp::DecErr));
        assert_eq!(mem.words_stored(), 0);

        mem.poke(0x40, DataWord::from_lanes([7; 8]));
        assert_eq!(mem.load(0x40), (DataWord::ZERO, Resp::DecErr));
    }

    #[test]
    fn back_pressure_holds_ready_low() {
        let mem = memory(
            MemoryConfig::builder()
                .back_pressure(
                    BackPressure::builder().period(2).stall(1).build(),
                )
                .build(),
        );
        let master = MasterSignals {
            ar: Some(AxiDefaults::default().address(0, 0)),
            ..Default::default()
        };
        assert!(!mem.respond(&master).ar_ready);
    }

    #[test]
    fn unresponsive_memory_drives_nothing() {
        let mut mem =
            memory(MemoryConfig::builder().unresponsive(true).build());
        let master = MasterSignals {
            aw: Some(AxiDefaults::default().address(0, 0)),
            w: Some(write_beat(0, true)),
            ar: Some(AxiDefaults::default().address(0, 0)),
            b_ready: true,
            r_ready: true,
        };
        for _ in 0..4 {
            assert_eq!(tick(&mut mem, master.clone()), SlaveSignals::default());
        }
    }

    #[test]
    fn fixed_bursts_hit_one_word() {
        let mut mem = memory(MemoryConfig::default());
        let aw = AxiDefaults::default()
            .with_burst(BurstType::Fixed)
            .address(0x100, 2);
        for (beat, last) in [(0, false), (1, false), (2, true)] {
            tick(
                &mut mem,
                MasterSignals {
                    aw: (beat == 0).then_some(aw),
                    w: Some(write_beat(beat, last)),
                    ..Default::default()
                },
            );
        }
        assert_eq!(mem.words_stored(), 1);
        assert_eq!(mem.peek(0x100).lane(0), 2);
    }
}
