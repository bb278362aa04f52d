use hbm_axi::{DataWord, Resp};
use serde::Serialize;

use crate::EngineState;

/// Status registers of one channel. Only the owning engine writes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ChannelStatus {
    pub ticks: u32,
    pub total_reads: u32,
    pub total_writes: u32,
    /// last beat accepted on the read data channel
    pub read_data: DataWord,
    pub write_resp: Resp,
    pub read_resp: Resp,
    pub state: EngineState,
}

impl ChannelStatus {
    pub fn done(&self) -> bool {
        self.state == EngineState::Idle
    }

    pub fn state_indicator(&self) -> u32 {
        self.state.one_hot()
    }

    /// Whether the last write response or read beat reported SLVERR or
    /// DECERR.
    pub fn has_error_response(&self) -> bool {
        self.write_resp.is_error() || self.read_resp.is_error()
    }

    /// Beats moved in either direction since the sequence began.
    pub fn total_beats(&self) -> u64 {
        u64::from(self.total_reads) + u64::from(self.total_writes)
    }
}
