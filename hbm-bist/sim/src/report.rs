use std::fmt::Display;

use hbm_axi::{Resp, WORD_BYTES};
use hbm_engine::{Engine, Mode};
use itertools::Itertools;
use serde::Serialize;

use crate::{errors::SimResult, simulator::Simulator};

/// Throughput of one channel over the sequence it last ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelReport {
    pub channel: usize,
    pub enabled: bool,
    pub mode: Mode,
    pub state: &'static str,
    pub ticks: u32,
    pub total_reads: u32,
    pub total_writes: u32,
    pub bytes: u64,
    pub gbps: f64,
    pub write_resp: Resp,
    pub read_resp: Resp,
    /// the last write response or read beat carried SLVERR or DECERR
    pub error_response: bool,
}

impl ChannelReport {
    fn new(engine: &Engine, enabled: bool, clock_mhz: f64) -> Self {
        let status = engine.status();
        let bytes = status.total_beats() * WORD_BYTES as u64;
        Self {
            channel: engine.index(),
            enabled,
            mode: engine.config().mode,
            state: status.state.name(),
            ticks: status.ticks,
            total_reads: status.total_reads,
            total_writes: status.total_writes,
            bytes,
            gbps: throughput_gbps(bytes, u64::from(status.ticks), clock_mhz),
            write_resp: status.write_resp,
            read_resp: status.read_resp,
            error_response: status.has_error_response(),
        }
    }
}

/// Bandwidth summary of a whole stack.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub cycles: u64,
    pub clock_mhz: f64,
    pub channels: Vec<ChannelReport>,
    pub total_bytes: u64,
    /// sum over the enabled channels, they run concurrently
    pub aggregate_gbps: f64,
}

impl Report {
    pub fn new(sim: &Simulator, clock_mhz: f64) -> Self {
        let shared = sim.shared();
        let channels = sim
            .engines()
            .map(|engine| {
                ChannelReport::new(
                    engine,
                    shared.is_enabled(engine.index()),
                    clock_mhz,
                )
            })
            .collect_vec();
        let enabled = || channels.iter().filter(|ch| ch.enabled);

        Self {
            cycles: sim.cycle(),
            clock_mhz,
            total_bytes: enabled().map(|ch| ch.bytes).sum(),
            aggregate_gbps: enabled().map(|ch| ch.gbps).sum(),
            channels,
        }
    }

    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Bytes moved over `ticks` clock cycles at `clock_mhz`, in GB/s.
pub fn throughput_gbps(bytes: u64, ticks: u64, clock_mhz: f64) -> f64 {
    if ticks == 0 {
        return 0.0;
    }
    bytes as f64 * clock_mhz / (ticks as f64 * 1e3)
}

impl Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{:>4} {:>5} {:>12} {:>10} {:>10} {:>10} {:>8} {:>5}",
            "ch", "mode", "state", "ticks", "reads", "writes", "GB/s", "resp"
        )?;
        for ch in self.channels.iter().filter(|ch| ch.enabled) {
            let mode = match ch.mode {
                Mode::Read => "read",
                Mode::Write => "write",
            };
            let resp = if ch.error_response { "error" } else { "ok" };
            writeln!(
                f,
                "{:>4} {:>5} {:>12} {:>10} {:>10} {:>10} {:>8.3} {:>5}",
                ch.channel,
                mode,
                ch.state,
                ch.ticks,
                ch.total_reads,
                ch.total_writes,
                ch.gbps,
                resp
            )?;
        }
        write!(
            f,
            "{} cycles at {} MHz, {} bytes, {:.3} GB/s aggregate",
            self.cycles, self.clock_mhz, self.total_bytes, self.aggregate_gbps
        )
    }
}
