//! Drives a stack of channel engines against a model of the memory behind
//! them, one clock tick at a time.

pub mod configuration;
pub mod errors;
pub mod logging;
pub mod memory;
pub mod plan;
pub mod report;
pub mod simulator;

pub use memory::MemoryChannel;
pub use plan::TestPlan;
pub use report::Report;
pub use simulator::Simulator;
