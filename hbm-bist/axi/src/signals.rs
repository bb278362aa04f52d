use serde::{Deserialize, Serialize};

use crate::{BurstType, DataWord, Resp};

/// Payload of the AW and AR channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddrChannel {
    pub addr: u64,
    pub id: u8,
    /// number of beats minus one
    pub len: u16,
    pub size: u8,
    pub burst: BurstType,
    pub lock: bool,
    pub cache: u8,
    pub prot: u8,
    pub qos: u8,
}

impl AddrChannel {
    pub fn beats(&self) -> u32 {
        u32::from(self.len) + 1
    }

    pub fn beat_address(&self, beat: u32) -> u64 {
        self.burst.beat_address(self.addr, beat, self.len, self.size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteData {
    pub data: DataWord,
    /// one bit per byte lane
    pub strb: u32,
    pub last: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResp {
    pub id: u8,
    pub resp: Resp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadData {
    pub id: u8,
    pub data: DataWord,
    pub resp: Resp,
    pub last: bool,
}

/// Everything the master drives onto the port during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MasterSignals {
    pub aw: Option<AddrChannel>,
    pub w: Option<WriteData>,
    pub b_ready: bool,
    pub ar: Option<AddrChannel>,
    pub r_ready: bool,
}

/// Everything the slave drives onto the port during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlaveSignals {
    pub aw_ready: bool,
    pub w_ready: bool,
    pub b: Option<WriteResp>,
    pub ar_ready: bool,
    pub r: Option<ReadData>,
}

/// Which of the five channels completed a transfer this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Handshakes {
    pub aw: bool,
    pub w: bool,
    pub b: bool,
    pub ar: bool,
    pub r: bool,
}

impl Handshakes {
    pub fn resolve(master: &MasterSignals, slave: &SlaveSignals) -> Self {
        Self {
            aw: master.aw.is_some() && slave.aw_ready,
            w: master.w.is_some() && slave.w_ready,
            b: slave.b.is_some() && master.b_ready,
            ar: master.ar.is_some() && slave.ar_ready,
            r: slave.r.is_some() && master.r_ready,
        }
    }

    pub fn any(&self) -> bool {
        self.aw || self.w || self.b || self.ar || self.r
    }
}
