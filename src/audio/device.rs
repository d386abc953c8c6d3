//! The seam between the playback controller and whatever makes the sound.

use std::sync::Arc;

use super::mixer::VoiceId;
use crate::error::{Error, Result};

/// Called by a device whenever a voice plays to its end.
/// Cancelled voices are never reported.
pub type FinishedCallback = Arc<dyn Fn(VoiceId) + Send + Sync>;

/// An open output with its own clock.
/// Tones are committed ahead of time at absolute positions on that clock.
pub trait OutputDevice: Send {
    fn now_ms(&self) -> f64;
    fn start_tone(&mut self, frequency_hz: f32, at_ms: f64, duration_ms: f64) -> VoiceId;
    /// Cancels a voice whether it is sounding or still in the future.
    fn cancel(&mut self, voice: VoiceId) -> bool;

    /// Freezes the clock and all output.
    fn suspend(&mut self) -> Result<()> {
        Err(Error::SuspendUnsupported)
    }

    fn resume(&mut self) -> Result<()> {
        Err(Error::SuspendUnsupported)
    }
}

/// Something that can open an [`OutputDevice`].
/// Opening must fail with [`Error::UnsupportedDevice`] right away if the host has no audio.
pub trait AudioBackend: Send + Sync {
    fn open(&self, on_finished: FinishedCallback) -> Result<Box<dyn OutputDevice>>;
}
