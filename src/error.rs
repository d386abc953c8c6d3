use thiserror::Error;

use crate::playback::PlaybackState;

/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A decoded token is not in the code table and the transcoder is strict.
    #[error("Invalid token `{token}` at position {position}")]
    InvalidToken { token: String, position: usize },

    /// Unit duration or words-per-minute was not a positive finite number.
    #[error("Invalid speed: {0}")]
    InvalidSpeed(f64),

    #[error("Invalid tone frequency: {0} Hz")]
    InvalidFrequency(f32),

    /// A schedule with no tone events was handed to the player.
    #[error("Schedule has no tone events")]
    EmptySchedule,

    /// The host has no usable audio output.
    #[error("No audio output available: {0}")]
    UnsupportedDevice(String),

    #[error("Output device can not be suspended")]
    SuspendUnsupported,

    #[error("Can not {action} while {state:?}")]
    InvalidTransition {
        state: PlaybackState,
        action: &'static str,
    },

    /// The output device failed after it was opened.
    #[error("Device error: {0}")]
    Device(String),

    #[error("Code table conflict: {0}")]
    TableConflict(String),
}
