use bon::Builder;
use serde::{Deserialize, Serialize};

/// Upper bound on the number of channels one shared block can address, one
/// bit of `channel_mask` each.
pub const MAX_CHANNELS: usize = 32;

/// Width of the host-visible word address.
pub const ADDRESS_BITS: u32 = 28;

/// Width of the burst length registers.
pub const BURST_LEN_BITS: u32 = 12;

/// The word address is shifted by this much to form a byte address, since a
/// bus word is 32 bytes wide.
pub const WORD_SHIFT: u32 = 5;

/// Keeps the low `width` bits of `value`.
pub(crate) fn mask_bits(value: u32, width: u32) -> u32 {
    if width >= u32::BITS {
        value
    } else {
        value & ((1 << width) - 1)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Read,
    #[default]
    Write,
}

impl Mode {
    /// Register encoding: 1 selects reads, 0 selects writes.
    pub fn from_bit(bit: u32) -> Self {
        if bit & 1 == 1 { Mode::Read } else { Mode::Write }
    }

    pub fn bit(self) -> u32 {
        match self {
            Mode::Read => 1,
            Mode::Write => 0,
        }
    }
}

/// Configuration broadcast to every engine of a stack. Only the host writes
/// it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Builder,
    Serialize,
    Deserialize,
)]
#[serde(default)]
pub struct SharedConfig {
    /// bit `i` set means channel `i` takes part in the run
    #[builder(default)]
    pub channel_mask: u32,
    /// level sensitive run/stop
    #[builder(default)]
    pub start: bool,
    /// base value of every write payload
    #[builder(default)]
    pub data_pattern: u32,
    /// holds every engine that reaches its pause state there
    #[builder(default)]
    pub force_pause: bool,
}

impl SharedConfig {
    pub fn is_enabled(&self, channel: usize) -> bool {
        channel < MAX_CHANNELS && (self.channel_mask >> channel) & 1 == 1
    }
}

/// Per-channel configuration. Written by the host, read by the engine.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Builder,
    Serialize,
    Deserialize,
)]
#[serde(default)]
pub struct ChannelConfig {
    #[builder(default)]
    pub mode: Mode,
    /// word address, 28 bits
    #[builder(default)]
    pub address: u32,
    /// beats per burst, 12 bits
    #[builder(default)]
    pub burst_len: u16,
    /// beats in the final burst of a sequence, 0 reuses `burst_len`
    #[builder(default)]
    pub last_burst_len: u16,
    /// bursts per sequence
    #[builder(default)]
    pub burst_quantity: u32,
    /// ticks spent in the pause state between sequences
    #[builder(default)]
    pub delay_bound: u32,
    #[builder(default)]
    pub ack: bool,
}

impl ChannelConfig {
    /// The byte address every burst of a sequence is issued at.
    pub fn byte_address(&self) -> u64 {
        u64::from(mask_bits(self.address, ADDRESS_BITS)) << WORD_SHIFT
    }

    /// Number of bursts in a sequence. A quantity of zero runs a single
    /// burst.
    pub fn effective_quantity(&self) -> u32 {
        self.burst_quantity.max(1)
    }

    /// Whether `completed` bursts make up a full sequence.
    pub fn completes_sequence(&self, completed: u32) -> bool {
        completed >= self.effective_quantity()
    }

    /// The AXI `len` (beats minus one) of the burst issued after `completed`
    /// bursts of the current sequence.
    ///
    /// Both length registers count beats; a length of zero is driven as a
    /// single beat.
    pub fn len_for_burst(&self, completed: u32) -> u16 {
        let burst_len = mask_bits(u32::from(self.burst_len), BURST_LEN_BITS);
        let last_len =
            mask_bits(u32::from(self.last_burst_len), BURST_LEN_BITS);
        let is_final = completed >= self.effective_quantity() - 1;
        let beats = if is_final && last_len > 0 {
            last_len
        } else {
            burst_len
        };
        beats.saturating_sub(1) as u16
    }
}
