//! An output device driven by hand instead of a sound card.
//! The clock only moves when [`VirtualBackend::advance`] is called, which makes
//! playback deterministic for tests and usable on hosts without audio.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use parking_lot::Mutex;

use super::{
    device::{AudioBackend, FinishedCallback, OutputDevice},
    mixer::{Mixer, SharedMixer, VoiceId},
};
use crate::error::{Error, Result};

pub struct VirtualBackend {
    sample_rate: u32,
    available: AtomicBool,
    outputs: Arc<Mutex<Vec<Output>>>,
}

/// Everything ever opened keeps rendering into the same virtual speaker,
/// so a voice left behind on a released device is still heard.
struct Output {
    mixer: SharedMixer,
    on_finished: FinishedCallback,
    suspended: bool,
    open: bool,
}

struct VirtualDevice {
    index: usize,
    mixer: SharedMixer,
    outputs: Arc<Mutex<Vec<Output>>>,
}

impl VirtualBackend {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            available: AtomicBool::new(true),
            outputs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A backend that behaves like a host with no audio output.
    pub fn unavailable() -> Self {
        let backend = Self::new(8000);
        backend.set_available(false);
        backend
    }

    /// Devices already open keep working, only later opens are affected.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Runs the clock forward and returns the mono samples that were played.
    /// Suspended devices do not move.
    pub fn advance(&self, ms: f64) -> Vec<f32> {
        let samples = (ms.max(0.0) * self.sample_rate as f64 / 1000.0).round() as usize;
        let running = self
            .outputs
            .lock()
            .iter()
            .filter(|x| !x.suspended)
            .map(|x| (x.mixer.clone(), x.on_finished.clone()))
            .collect::<Vec<_>>();

        let mut out = vec![0.0; samples];
        let mut scratch = vec![0.0; samples];
        for (mixer, on_finished) in running {
            for id in mixer.render(&mut scratch, 1) {
                on_finished(id);
            }

            out.iter_mut().zip(&scratch).for_each(|(o, s)| *o += s);
        }

        out
    }

    /// Number of devices currently held open.
    pub fn open_devices(&self) -> usize {
        self.outputs.lock().iter().filter(|x| x.open).count()
    }

    /// Voices still waiting or sounding on every device, open or not.
    pub fn pending_voices(&self) -> usize {
        self.outputs.lock().iter().map(|x| x.mixer.pending()).sum()
    }
}

impl AudioBackend for VirtualBackend {
    fn open(&self, on_finished: FinishedCallback) -> Result<Box<dyn OutputDevice>> {
        if !self.available.load(Ordering::Relaxed) {
            return Err(Error::UnsupportedDevice("virtual output disabled".to_owned()));
        }

        let mixer = SharedMixer::new(Mixer::new(self.sample_rate));
        let mut outputs = self.outputs.lock();
        outputs.push(Output {
            mixer: mixer.clone(),
            on_finished,
            suspended: false,
            open: true,
        });

        Ok(Box::new(VirtualDevice {
            index: outputs.len() - 1,
            mixer,
            outputs: self.outputs.clone(),
        }))
    }
}

impl VirtualDevice {
    fn set_suspended(&self, suspended: bool) {
        self.outputs.lock()[self.index].suspended = suspended;
    }
}

impl OutputDevice for VirtualDevice {
    fn now_ms(&self) -> f64 {
        self.mixer.now_ms()
    }

    fn start_tone(&mut self, frequency_hz: f32, at_ms: f64, duration_ms: f64) -> VoiceId {
        self.mixer.start_tone(frequency_hz, at_ms, duration_ms)
    }

    fn cancel(&mut self, voice: VoiceId) -> bool {
        self.mixer.cancel(voice)
    }

    fn suspend(&mut self) -> Result<()> {
        self.set_suspended(true);
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        self.set_suspended(false);
        Ok(())
    }
}

impl Drop for VirtualDevice {
    fn drop(&mut self) {
        let mut outputs = self.outputs.lock();
        let output = &mut outputs[self.index];
        output.open = false;
        output.suspended = false;
    }
}
