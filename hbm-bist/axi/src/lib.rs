//! AXI4 port model shared by the bandwidth engine and the memory channel
//! models it is tested against.
//!
//! Every channel of the port is represented as an `Option` of its payload:
//! `Some` means `valid` is asserted for the current tick. Ready signals are
//! plain booleans. A handshake fires on a channel when both are high in the
//! same tick (see [Handshakes]).

mod data;
mod fields;
mod signals;

pub use data::*;
pub use fields::*;
pub use signals::*;
