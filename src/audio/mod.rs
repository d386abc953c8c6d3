//! Audio utilities.
//! Tone generation, scheduling and the devices tones are played on.

pub mod cpal_device;
pub mod device;
pub mod mixer;
pub mod schedule;
pub mod tone;
pub mod virtual_device;

pub use cpal_device::CpalBackend;
pub use device::{AudioBackend, FinishedCallback, OutputDevice};
pub use mixer::VoiceId;
pub use virtual_device::VirtualBackend;
