//! Error types for timeline definition and playback.

use thiserror::Error;

/// Result type for timeline operations.
pub type Result<T> = std::result::Result<T, TimelineError>;

/// Errors that can occur while defining or driving a timeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimelineError {
    /// `add` was called without enough of from/to/duration to place the animation.
    #[error("cannot resolve animation interval: need two of from, to and duration, or to/duration alone")]
    MissingInterval,

    /// A time literal could not be parsed.
    #[error("malformed time value: {0:?}")]
    MalformedTime(String),

    /// A playback rate that is NaN or infinite.
    #[error("invalid playback rate: {0}")]
    InvalidRate(f64),

    /// A `"@name"` delay or interpolator with no matching registered reference.
    #[error("unknown reference {0:?}")]
    UnknownReference(String),

    /// Definition call while effects are compiled and playing.
    #[error("timeline is active; cancel it before adding animations")]
    DefinitionLocked,
}
