use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

use crate::signals::AddrChannel;

/// Memory attribute "Normal Non-cacheable Bufferable".
pub const CACHE_NORMAL_NON_CACHEABLE_BUFFERABLE: u8 = 0b0011;

/// Unprivileged, secure, data access.
pub const PROT_UNPRIVILEGED_SECURE_DATA: u8 = 0b000;

/// The two bit response code carried on the B and R channels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
pub enum Resp {
    #[default]
    Okay,
    ExOkay,
    SlvErr,
    DecErr,
}

impl Resp {
    /// Decodes the low two bits of `bits`.
    pub fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0b00 => Resp::Okay,
            0b01 => Resp::ExOkay,
            0b10 => Resp::SlvErr,
            _ => Resp::DecErr,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            Resp::Okay => 0b00,
            Resp::ExOkay => 0b01,
            Resp::SlvErr => 0b10,
            Resp::DecErr => 0b11,
        }
    }

    pub fn is_error(self) -> bool {
        matches!(self, Resp::SlvErr | Resp::DecErr)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum BurstType {
    Fixed,
    #[default]
    Incr,
    Wrap,
}

impl BurstType {
    pub fn bits(self) -> u8 {
        match self {
            BurstType::Fixed => 0b00,
            BurstType::Incr => 0b01,
            BurstType::Wrap => 0b10,
        }
    }

    /// Address of beat `beat` of a burst starting at `base` with `len + 1`
    /// beats of `2^size` bytes each.
    ///
    /// WRAP bursts are expected to have 2, 4, 8 or 16 beats; other lengths
    /// are not rejected and simply wrap on the window they describe.
    pub fn beat_address(self, base: u64, beat: u32, len: u16, size: u8) -> u64 {
        let offset = u64::from(beat) << size;
        match self {
            BurstType::Fixed => base,
            BurstType::Incr => base.wrapping_add(offset),
            BurstType::Wrap => {
                let window = (u64::from(len) + 1) << size;
                let lower = (base / window) * window;
                lower + (base - lower + offset) % window
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown burst type `{0}`, expected one of INCR, FIXED or WRAP")]
pub struct ParseBurstTypeError(String);

impl FromStr for BurstType {
    type Err = ParseBurstTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FIXED" => Ok(BurstType::Fixed),
            "INCR" => Ok(BurstType::Incr),
            "WRAP" => Ok(BurstType::Wrap),
            _ => Err(ParseBurstTypeError(s.to_string())),
        }
    }
}

impl Display for BurstType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BurstType::Fixed => write!(f, "FIXED"),
            BurstType::Incr => write!(f, "INCR"),
            BurstType::Wrap => write!(f, "WRAP"),
        }
    }
}

/// Address channel fields which are fixed for the lifetime of an engine.
/// None of these are reachable from the host registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxiDefaults {
    pub burst: BurstType,
    /// AxLOCK, normal access while clear
    pub lock: bool,
    pub cache: u8,
    pub prot: u8,
    pub qos: u8,
    pub id: u8,
    /// log2 of the bytes moved per beat
    pub size: u8,
}

impl Default for AxiDefaults {
    fn default() -> Self {
        Self {
            burst: BurstType::Incr,
            lock: false,
            cache: CACHE_NORMAL_NON_CACHEABLE_BUFFERABLE,
            prot: PROT_UNPRIVILEGED_SECURE_DATA,
            qos: 0,
            id: 0,
            size: crate::BEAT_SIZE,
        }
    }
}

impl AxiDefaults {
    #[must_use]
    pub fn with_burst(mut self, burst: BurstType) -> Self {
        self.burst = burst;
        self
    }

    /// Builds the address phase for a burst of `len + 1` beats at `addr`.
    pub fn address(&self, addr: u64, len: u16) -> AddrChannel {
        AddrChannel {
            addr,
            id: self.id,
            len,
            size: self.size,
            burst: self.burst,
            lock: self.lock,
            cache: self.cache,
            prot: self.prot,
            qos: self.qos,
        }
    }
}
