use serde::Serialize;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum EngineState {
    #[default]
    Idle,
    WriteIssue,
    WriteBeat,
    WriteLast,
    WritePause,
    ReadIssue,
    ReadBeat,
    ReadPause,
}

impl EngineState {
    pub const ALL: [EngineState; 8] = [
        EngineState::Idle,
        EngineState::WriteIssue,
        EngineState::WriteBeat,
        EngineState::WriteLast,
        EngineState::WritePause,
        EngineState::ReadIssue,
        EngineState::ReadBeat,
        EngineState::ReadPause,
    ];

    /// The `state_indicator` register value: exactly one bit set, in the
    /// order of [EngineState::ALL].
    pub fn one_hot(self) -> u32 {
        1 << (self as u32)
    }

    pub fn name(self) -> &'static str {
        match self {
            EngineState::Idle => "idle",
            EngineState::WriteIssue => "write_issue",
            EngineState::WriteBeat => "write_beat",
            EngineState::WriteLast => "write_last",
            EngineState::WritePause => "write_pause",
            EngineState::ReadIssue => "read_issue",
            EngineState::ReadBeat => "read_beat",
            EngineState::ReadPause => "read_pause",
        }
    }

    pub fn is_pause(self) -> bool {
        matches!(self, EngineState::WritePause | EngineState::ReadPause)
    }

    /// States in which a transfer is in flight and `ticks` counts.
    pub fn is_active(self) -> bool {
        !self.is_pause() && self != EngineState::Idle
    }
}

impl Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
