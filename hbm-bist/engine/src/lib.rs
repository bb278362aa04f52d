//! The per-channel memory bandwidth engine.
//!
//! Each [Engine] owns one AXI4 master port and is evaluated once per clock
//! tick. A tick is split in two: [Engine::drive] produces the signals the
//! engine puts on the port from its current registers, and [Engine::step]
//! consumes the slave's answer and computes the registers for the next
//! tick. Nothing computed during a tick is observable before it ends.
//!
//! All engines of a memory stack share one [SharedConfig], which they only
//! ever read.

mod config;
pub mod csr;
mod engine;
pub mod errors;
mod state;
mod status;

pub use config::*;
pub use engine::Engine;
pub use state::EngineState;
pub use status::ChannelStatus;
