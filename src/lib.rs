//! Morse code transcoder and tone scheduler.
//!
//! Text is encoded into an [`EncodedLine`], timed by a [`TimingProfile`],
//! flattened into a [`Schedule`] of tone events and finally handed to a
//! [`PlaybackController`] that commits it to an audio device.

pub mod audio;
pub mod coding;
pub mod config;
pub mod error;
mod misc;
pub mod playback;
pub mod timing;

pub use audio::schedule::{Schedule, Scheduler, ToneEvent, DEFAULT_FREQUENCY};
pub use coding::{CodeTable, DecodePolicy, EncodedLine, Transcoder};
pub use error::{Error, Result};
pub use playback::{PlaybackController, PlaybackState};
pub use timing::TimingProfile;

/// Encodes text into its string form, tokens split by spaces and words by ` / `.
pub fn encode(text: &str) -> String {
    Transcoder::new(DecodePolicy::Lenient)
        .encode(text)
        .to_string()
}

/// Decodes a Morse string back into text.
/// With [`DecodePolicy::Strict`] an unknown token is an error, with
/// [`DecodePolicy::Lenient`] it is copied into the output as is.
pub fn decode(line: &str, policy: DecodePolicy) -> Result<String> {
    Transcoder::new(policy).decode(line)
}

/// Schedules a Morse string at the default frequency, without playing it.
pub fn build_schedule(line: &str, unit_ms: f64) -> Result<Schedule> {
    build_schedule_with_frequency(line, unit_ms, DEFAULT_FREQUENCY)
}

pub fn build_schedule_with_frequency(
    line: &str,
    unit_ms: f64,
    frequency: f32,
) -> Result<Schedule> {
    Scheduler::new(TimingProfile::from_unit(unit_ms)?)
        .frequency(frequency)
        .build(&EncodedLine::parse(line))
}
