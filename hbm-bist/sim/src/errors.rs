use hbm_engine::{EngineState, errors::EngineError};
use thiserror::Error;

/// A type alias for a result with an [BoxedSimError] as the error type
pub type SimResult<T> = Result<T, BoxedSimError>;

/// A wrapper type for [SimError]. This exists to allow a smaller return size
/// for results.
pub struct BoxedSimError(Box<SimError>);

impl BoxedSimError {
    pub fn inner(&self) -> &SimError {
        &self.0
    }
}

impl std::fmt::Display for BoxedSimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&*self.0, f)
    }
}

impl std::fmt::Debug for BoxedSimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self, f)
    }
}

impl std::error::Error for BoxedSimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl std::ops::Deref for BoxedSimError {
    type Target = SimError;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> From<T> for BoxedSimError
where
    T: Into<SimError>,
{
    fn from(e: T) -> Self {
        Self(Box::new(T::into(e)))
    }
}

/// Everything that can go wrong while setting up or driving a run.
#[derive(Debug, Error)]
pub enum SimError {
    /// Register access or engine construction failed
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("a stack holds between 1 and 32 channels, not {0}")]
    ChannelCount(usize),

    #[error("channel {channel} does not exist, the stack has {channels}")]
    NoSuchChannel { channel: usize, channels: usize },

    /// `run_until` gave up; carries the state of every channel at that point
    #[error("condition not met after {cycles} cycles, states: {states:?}")]
    Timeout {
        cycles: u64,
        states: Vec<EngineState>,
    },

    #[error("invalid test plan - {0}")]
    InvalidPlan(String),

    /// A wrapper for IO errors
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// A wrapper for serialization errors
    #[error(transparent)]
    SerializationError(#[from] serde_json::Error),
}
