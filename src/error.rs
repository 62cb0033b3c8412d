//! Error types.
//!
//! Every failure that reaches a caller of the session or command surface
//! is an [`Error`]. Rejected moves inside the search loop are a separate
//! [`MoveError`] and are handled locally by the engine.

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported to callers.
#[derive(Error, Debug)]
pub enum Error {
    /// The input could not be decoded into a schedule.
    #[error("format error: {0}")]
    Format(String),

    /// The operation needs a loaded schedule and none is present.
    #[error("no schedule loaded")]
    NoScheduleLoaded,

    /// Another optimization run (or load) is in flight.
    #[error("session is busy: an optimization run is in progress")]
    Busy,

    /// Optimizer settings out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Format(err.message().to_string())
    }
}

/// Reasons a move cannot be applied to a schedule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoveError {
    #[error("unknown task index {0}")]
    UnknownTask(usize),

    #[error("unknown resource index {0}")]
    UnknownResource(usize),

    #[error("task {task} would run past the horizon starting at bucket {start}")]
    OutsideHorizon { task: usize, start: u32 },

    #[error("task {0} appears more than once in the move")]
    DuplicateTask(usize),

    #[error("resource {resource} is full at bucket {bucket}")]
    CapacityExceeded { resource: usize, bucket: u32 },
}
