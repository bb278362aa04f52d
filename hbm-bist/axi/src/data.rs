use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Number of 32-bit lanes on the channel data bus.
pub const LANES: usize = 8;

/// Width of one data bus word in bytes.
pub const WORD_BYTES: usize = LANES * 4;

/// AXI `size` encoding for a full bus word (2^5 = 32 bytes per beat).
pub const BEAT_SIZE: u8 = 5;

/// Write strobe enabling every byte lane of a bus word.
pub const FULL_STROBE: u32 = u32::MAX;

/// One 256-bit bus word. Lane 0 holds bits `[31:0]`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
pub struct DataWord([u32; LANES]);

impl DataWord {
    pub const ZERO: DataWord = DataWord([0; LANES]);

    pub fn from_lanes(lanes: [u32; LANES]) -> Self {
        Self(lanes)
    }

    /// The payload driven on write beat `beat` for a given base pattern.
    /// Lane 0 carries `pattern + beat` so consecutive beats can be told apart,
    /// the other lanes carry the pattern unmodified.
    pub fn write_pattern(pattern: u32, beat: u32) -> Self {
        let mut lanes = [pattern; LANES];
        lanes[0] = pattern.wrapping_add(beat);
        Self(lanes)
    }

    pub fn lanes(&self) -> &[u32; LANES] {
        &self.0
    }

    /// # Panics
    /// Panics if `idx >= LANES`.
    pub fn lane(&self, idx: usize) -> u32 {
        self.0[idx]
    }

    pub fn to_le_bytes(&self) -> [u8; WORD_BYTES] {
        let mut out = [0; WORD_BYTES];
        for (chunk, lane) in out.chunks_exact_mut(4).zip(self.0.iter()) {
            chunk.copy_from_slice(&lane.to_le_bytes());
        }
        out
    }

    pub fn from_le_bytes(bytes: &[u8; WORD_BYTES]) -> Self {
        let mut lanes = [0; LANES];
        for (lane, chunk) in lanes.iter_mut().zip(bytes.chunks_exact(4)) {
            *lane =
                u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Self(lanes)
    }

    /// Merges `other` into `self`, keeping only the bytes enabled in `strb`.
    #[must_use]
    pub fn merge_strobed(&self, other: &DataWord, strb: u32) -> Self {
        if strb == FULL_STROBE {
            return *other;
        }
        let mut bytes = self.to_le_bytes();
        let incoming = other.to_le_bytes();
        for (idx, byte) in bytes.iter_mut().enumerate() {
            if strb & (1 << idx) != 0 {
                *byte = incoming[idx];
            }
        }
        Self::from_le_bytes(&bytes)
    }
}

impl From<[u32; LANES]> for DataWord {
    fn from(value: [u32; LANES]) -> Self {
        Self(value)
    }
}

impl From<DataWord> for [u32; LANES] {
    fn from(value: DataWord) -> Self {
        value.0
    }
}

impl Display for DataWord {
    /// Most significant lane first, the way the word appears on the bus.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "0x{}",
            self.0.iter().rev().map(|lane| format!("{lane:08x}")).join("_")
        )
    }
}
