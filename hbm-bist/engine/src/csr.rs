//! The host-facing register map.
//!
//! Registers are 32 bits wide and laid out LiteX style: every block gets a
//! region of [CSR_REGION_SIZE] bytes. Region 0 holds the shared block
//! (`hbm_common`), region `1 + i` holds channel `i` (`hbm_<i>`).

use serde::Serialize;

use crate::{
    ADDRESS_BITS, BURST_LEN_BITS, Engine, Mode, SharedConfig,
    config::mask_bits,
    errors::{EngineError, EngineResult},
};

pub const CSR_REGION_SIZE: u32 = 0x800;
pub const REGISTER_BYTES: u32 = 4;

const SHARED_PREFIX: &str = "hbm_common";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    ReadWrite,
    ReadOnly,
}

/// Declares a register block: an enum with one variant per register and
/// lookups for offset, access, width and name.
macro_rules! csr_block {
    (
        $(#[$attr:meta])*
        $block:ident {
            $(
                $reg:ident: $offset:literal, $access:ident,
                $width:literal, $name:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $block {
            $( $reg, )+
        }

        impl $block {
            pub const ALL: &'static [$block] = &[ $( $block::$reg, )+ ];

            pub fn offset(self) -> u32 {
                match self {
                    $( $block::$reg => $offset, )+
                }
            }

            pub fn access(self) -> Access {
                match self {
                    $( $block::$reg => Access::$access, )+
                }
            }

            /// Number of implemented bits, the rest read as zero.
            pub fn width(self) -> u32 {
                match self {
                    $( $block::$reg => $width, )+
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $( $block::$reg => $name, )+
                }
            }

            pub fn from_offset(offset: u32) -> Option<Self> {
                match offset {
                    $( $offset => Some($block::$reg), )+
                    _ => None,
                }
            }
        }
    };
}

csr_block! {
    /// Registers of the block shared by all channels.
    SharedReg {
        ChannelMask: 0x00, ReadWrite, 32, "channel_mask",
        Start: 0x04, ReadWrite, 1, "start",
        DataPattern: 0x08, ReadWrite, 32, "data_pattern",
        ForcePause: 0x0c, ReadWrite, 1, "force_pause",
    }
}

csr_block! {
    /// Registers of one channel engine.
    ChannelReg {
        Mode: 0x00, ReadWrite, 1, "mode",
        Address: 0x04, ReadWrite, 28, "address",
        BurstLen: 0x08, ReadWrite, 12, "burst_len",
        LastBurstLen: 0x0c, ReadWrite, 12, "last_burst_len",
        BurstQuantity: 0x10, ReadWrite, 32, "burst_quantity",
        DelayBound: 0x14, ReadWrite, 32, "delay_bound",
        Ack: 0x18, ReadWrite, 1, "ack",
        Ticks: 0x40, ReadOnly, 32, "ticks",
        TotalReads: 0x44, ReadOnly, 32, "total_reads",
        TotalWrites: 0x48, ReadOnly, 32, "total_writes",
        Done: 0x4c, ReadOnly, 1, "done",
        StateIndicator: 0x50, ReadOnly, 8, "state_indicator",
        WriteResp: 0x54, ReadOnly, 2, "write_resp",
        ReadResp: 0x58, ReadOnly, 2, "read_resp",
        ReadData0: 0x60, ReadOnly, 32, "read_data0",
        ReadData1: 0x64, ReadOnly, 32, "read_data1",
        ReadData2: 0x68, ReadOnly, 32, "read_data2",
        ReadData3: 0x6c, ReadOnly, 32, "read_data3",
        ReadData4: 0x70, ReadOnly, 32, "read_data4",
        ReadData5: 0x74, ReadOnly, 32, "read_data5",
        ReadData6: 0x78, ReadOnly, 32, "read_data6",
        ReadData7: 0x7c, ReadOnly, 32, "read_data7",
    }
}

impl ChannelReg {
    /// The `read_data` register holding `lane`, if any.
    pub fn read_data(lane: usize) -> Option<Self> {
        match lane {
            0 => Some(ChannelReg::ReadData0),
            1 => Some(ChannelReg::ReadData1),
            2 => Some(ChannelReg::ReadData2),
            3 => Some(ChannelReg::ReadData3),
            4 => Some(ChannelReg::ReadData4),
            5 => Some(ChannelReg::ReadData5),
            6 => Some(ChannelReg::ReadData6),
            7 => Some(ChannelReg::ReadData7),
            _ => None,
        }
    }

    fn lane(self) -> Option<usize> {
        (0..hbm_axi::LANES).find(|lane| Self::read_data(*lane) == Some(self))
    }
}

/// A decoded register address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CsrTarget {
    Shared(SharedReg),
    Channel(usize, ChannelReg),
}

impl CsrTarget {
    /// Decodes a byte address for a stack of `channels` engines.
    pub fn decode(addr: u32, channels: usize) -> EngineResult<Self> {
        if addr % REGISTER_BYTES != 0 {
            return Err(EngineError::UnalignedAddress(addr));
        }

        let region = (addr / CSR_REGION_SIZE) as usize;
        let offset = addr % CSR_REGION_SIZE;

        if region == 0 {
            return SharedReg::from_offset(offset)
                .map(CsrTarget::Shared)
                .ok_or(EngineError::UnmappedAddress(addr));
        }

        let channel = region - 1;
        if channel >= channels {
            return Err(EngineError::NoSuchChannel {
                addr,
                channel,
                channels,
            });
        }
        ChannelReg::from_offset(offset)
            .map(|reg| CsrTarget::Channel(channel, reg))
            .ok_or(EngineError::UnmappedAddress(addr))
    }

    pub fn address(self) -> u32 {
        match self {
            CsrTarget::Shared(reg) => reg.offset(),
            CsrTarget::Channel(channel, reg) => {
                (channel as u32 + 1) * CSR_REGION_SIZE + reg.offset()
            }
        }
    }

    pub fn access(self) -> Access {
        match self {
            CsrTarget::Shared(reg) => reg.access(),
            CsrTarget::Channel(_, reg) => reg.access(),
        }
    }

    pub fn width(self) -> u32 {
        match self {
            CsrTarget::Shared(reg) => reg.width(),
            CsrTarget::Channel(_, reg) => reg.width(),
        }
    }

    /// Full register name, e.g. `hbm_3_total_writes`.
    pub fn name(self) -> String {
        match self {
            CsrTarget::Shared(reg) => format!("{SHARED_PREFIX}_{}", reg.name()),
            CsrTarget::Channel(channel, reg) => {
                format!("hbm_{channel}_{}", reg.name())
            }
        }
    }
}

/// One row of the register map listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsrEntry {
    pub name: String,
    pub address: u32,
    pub access: Access,
    pub width: u32,
}

impl From<CsrTarget> for CsrEntry {
    fn from(target: CsrTarget) -> Self {
        Self {
            name: target.name(),
            address: target.address(),
            access: target.access(),
            width: target.width(),
        }
    }
}

/// Every register of a stack of `channels` engines, in address order.
pub fn register_map(channels: usize) -> Vec<CsrEntry> {
    let shared = SharedReg::ALL.iter().map(|reg| CsrTarget::Shared(*reg));
    let per_channel = (0..channels).flat_map(|channel| {
        ChannelReg::ALL
            .iter()
            .map(move |reg| CsrTarget::Channel(channel, *reg))
    });
    shared.chain(per_channel).map(CsrEntry::from).collect()
}

impl SharedConfig {
    pub fn read_register(&self, reg: SharedReg) -> u32 {
        match reg {
            SharedReg::ChannelMask => self.channel_mask,
            SharedReg::Start => u32::from(self.start),
            SharedReg::DataPattern => self.data_pattern,
            SharedReg::ForcePause => u32::from(self.force_pause),
        }
    }

    pub fn write_register(&mut self, reg: SharedReg, value: u32) {
        let value = mask_bits(value, reg.width());
        match reg {
            SharedReg::ChannelMask => self.channel_mask = value,
            SharedReg::Start => self.start = value == 1,
            SharedReg::DataPattern => self.data_pattern = value,
            SharedReg::ForcePause => self.force_pause = value == 1,
        }
    }
}

impl Engine {
    pub fn read_register(&self, reg: ChannelReg) -> u32 {
        let config = self.config();
        let status = self.status();
        match reg {
            ChannelReg::Mode => config.mode.bit(),
            ChannelReg::Address => mask_bits(config.address, ADDRESS_BITS),
            ChannelReg::BurstLen => {
                mask_bits(u32::from(config.burst_len), BURST_LEN_BITS)
            }
            ChannelReg::LastBurstLen => {
                mask_bits(u32::from(config.last_burst_len), BURST_LEN_BITS)
            }
            ChannelReg::BurstQuantity => config.burst_quantity,
            ChannelReg::DelayBound => config.delay_bound,
            ChannelReg::Ack => u32::from(config.ack),
            ChannelReg::Ticks => status.ticks,
            ChannelReg::TotalReads => status.total_reads,
            ChannelReg::TotalWrites => status.total_writes,
            ChannelReg::Done => u32::from(status.done()),
            ChannelReg::StateIndicator => status.state_indicator(),
            ChannelReg::WriteResp => status.write_resp.bits(),
            ChannelReg::ReadResp => status.read_resp.bits(),
            ChannelReg::ReadData0
            | ChannelReg::ReadData1
            | ChannelReg::ReadData2
            | ChannelReg::ReadData3
            | ChannelReg::ReadData4
            | ChannelReg::ReadData5
            | ChannelReg::ReadData6
            | ChannelReg::ReadData7 => reg
                .lane()
                .map(|lane| status.read_data.lane(lane))
                .unwrap_or_default(),
        }
    }

    /// Host write to a configuration register. Status registers belong to
    /// the engine and reject the write.
    pub fn write_register(
        &mut self,
        reg: ChannelReg,
        value: u32,
    ) -> EngineResult<()> {
        let value = mask_bits(value, reg.width());
        let config = self.config_mut();
        match reg {
            ChannelReg::Mode => config.mode = Mode::from_bit(value),
            ChannelReg::Address => config.address = value,
            ChannelReg::BurstLen => config.burst_len = value as u16,
            ChannelReg::LastBurstLen => config.last_burst_len = value as u16,
            ChannelReg::BurstQuantity => config.burst_quantity = value,
            ChannelReg::DelayBound => config.delay_bound = value,
            ChannelReg::Ack => config.ack = value == 1,
            ChannelReg::Ticks
            | ChannelReg::TotalReads
            | ChannelReg::TotalWrites
            | ChannelReg::Done
            | ChannelReg::StateIndicator
            | ChannelReg::WriteResp
            | ChannelReg::ReadResp
            | ChannelReg::ReadData0
            | ChannelReg::ReadData1
            | ChannelReg::ReadData2
            | ChannelReg::ReadData3
            | ChannelReg::ReadData4
            | ChannelReg::ReadData5
            | ChannelReg::ReadData6
            | ChannelReg::ReadData7 => {
                let target = CsrTarget::Channel(self.index(), reg);
                return Err(EngineError::ReadOnly {
                    name: target.name(),
                    addr: target.address(),
                });
            }
        }
        Ok(())
    }
}
