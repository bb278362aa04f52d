use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("channel {0} cannot be addressed by a 32-bit channel mask")]
    ChannelOutOfRange(usize),

    #[error("address {0:#x} is not aligned to a 32-bit register")]
    UnalignedAddress(u32),

    #[error("no register is mapped at address {0:#x}")]
    UnmappedAddress(u32),

    #[error("address {addr:#x} selects channel {channel} of {channels}")]
    NoSuchChannel {
        addr: u32,
        channel: usize,
        channels: usize,
    },

    #[error("register `{name}` at {addr:#x} is read-only")]
    ReadOnly { name: String, addr: u32 },
}
