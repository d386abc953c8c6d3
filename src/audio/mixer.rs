//! Sample clock and voice arena shared by every output device.
//! Each committed tone is a voice with its own handle, so any of them can be
//! cancelled whether it is sounding or still waiting for its start time.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use parking_lot::Mutex;

use super::tone::SmoothTone;

static NEXT_VOICE: AtomicU64 = AtomicU64::new(0);

/// Handle to one committed tone.
/// Unique for the life of the process, so a late report from a released
/// device can never be mistaken for a voice of a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceId(u64);

struct Voice {
    id: VoiceId,
    start: u64,
    end: u64,
    tone: SmoothTone,
}

pub struct Mixer {
    sample_rate: u32,
    clock: u64,
    gain: f32,
    /// Sorted by start sample
    voices: Vec<Voice>,
    finished: Vec<VoiceId>,
}

/// A [`Mixer`] shared between a device handle and the thread rendering it.
#[derive(Clone)]
pub struct SharedMixer(Arc<Mutex<Mixer>>);

impl VoiceId {
    fn next() -> Self {
        Self(NEXT_VOICE.fetch_add(1, Ordering::Relaxed))
    }
}

impl Mixer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            clock: 0,
            gain: 1.0,
            voices: Vec::new(),
            finished: Vec::new(),
        }
    }

    pub fn gain(mut self, gain: f32) -> Self {
        self.gain = gain.clamp(0.0, 1.0);
        self
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Current position of the device clock in milliseconds.
    pub fn now_ms(&self) -> f64 {
        self.clock as f64 * 1000.0 / self.sample_rate as f64
    }

    fn to_samples(&self, ms: f64) -> u64 {
        (ms.max(0.0) * self.sample_rate as f64 / 1000.0).round() as u64
    }

    /// Commits a tone at an absolute time on the device clock.
    /// Times already in the past start on the next rendered sample.
    pub fn start_tone(&mut self, frequency: f32, at_ms: f64, duration_ms: f64) -> VoiceId {
        let start = self.to_samples(at_ms).max(self.clock);
        let len = self.to_samples(duration_ms).max(1);
        let id = VoiceId::next();

        let index = self.voices.partition_point(|x| x.start <= start);
        self.voices.insert(
            index,
            Voice {
                id,
                start,
                end: start.saturating_add(len),
                tone: SmoothTone::new(frequency, self.sample_rate, len as usize),
            },
        );

        id
    }

    /// Removes a voice, returns false if it already finished or was never here.
    pub fn cancel(&mut self, id: VoiceId) -> bool {
        let before = self.voices.len();
        self.voices.retain(|x| x.id != id);
        before != self.voices.len()
    }

    /// Voices that are sounding or waiting to sound.
    pub fn pending(&self) -> usize {
        self.voices.len()
    }

    /// Fills interleaved frames and advances the clock by one sample per frame.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);

        for frame in out.chunks_mut(channels) {
            let t = self.clock;
            let mut sample = 0.0;

            for voice in self.voices.iter_mut() {
                if voice.start > t {
                    break;
                }

                if t < voice.end {
                    sample += voice.tone.next().unwrap_or(0.0);
                }
            }

            frame.fill((sample * self.gain).clamp(-1.0, 1.0));
            self.clock += 1;
        }

        let clock = self.clock;
        let finished = &mut self.finished;
        self.voices.retain(|x| {
            if x.end <= clock {
                finished.push(x.id);
                return false;
            }
            true
        });
    }

    /// Voices that played to the end since the last call.
    pub fn take_finished(&mut self) -> Vec<VoiceId> {
        std::mem::take(&mut self.finished)
    }
}

impl SharedMixer {
    pub fn new(mixer: Mixer) -> Self {
        Self(Arc::new(Mutex::new(mixer)))
    }

    pub fn now_ms(&self) -> f64 {
        self.0.lock().now_ms()
    }

    pub fn start_tone(&self, frequency: f32, at_ms: f64, duration_ms: f64) -> VoiceId {
        self.0.lock().start_tone(frequency, at_ms, duration_ms)
    }

    pub fn cancel(&self, id: VoiceId) -> bool {
        self.0.lock().cancel(id)
    }

    pub fn pending(&self) -> usize {
        self.0.lock().pending()
    }

    /// Renders a buffer and returns the voices that finished in it.
    /// The lock is released before returning so the caller can run
    /// completion callbacks without holding it.
    pub fn render(&self, out: &mut [f32], channels: usize) -> Vec<VoiceId> {
        let mut mixer = self.0.lock();
        mixer.render(out, channels);
        mixer.take_finished()
    }
}

#[cfg(test)]
mod test {
    use super::Mixer;

    fn loud(s: &[f32]) -> bool {
        s.iter().any(|x| x.abs() > 0.01)
    }

    #[test]
    fn test_mixer_timing() {
        // 8 samples per ms
        let mut mixer = Mixer::new(8000);
        let id = mixer.start_tone(1000.0, 10.0, 5.0);

        let mut buf = vec![0.0; 80];
        mixer.render(&mut buf, 1);
        assert!(!loud(&buf));
        assert!(mixer.take_finished().is_empty());
        assert_eq!(mixer.now_ms(), 10.0);

        let mut buf = vec![0.0; 40];
        mixer.render(&mut buf, 1);
        assert!(loud(&buf));
        assert_eq!(mixer.take_finished(), vec![id]);
        assert_eq!(mixer.pending(), 0);
    }

    #[test]
    fn test_mixer_cancel_pending() {
        let mut mixer = Mixer::new(8000);
        let a = mixer.start_tone(1000.0, 0.0, 10.0);
        let b = mixer.start_tone(1000.0, 20.0, 10.0);

        let mut buf = vec![0.0; 40];
        mixer.render(&mut buf, 1);
        assert!(loud(&buf));

        assert!(mixer.cancel(a));
        assert!(mixer.cancel(b));
        assert!(!mixer.cancel(b));

        let mut buf = vec![0.0; 400];
        mixer.render(&mut buf, 1);
        assert!(!loud(&buf));
        assert!(mixer.take_finished().is_empty());
    }

    #[test]
    fn test_mixer_interleaved() {
        let mut mixer = Mixer::new(8000).gain(0.5);
        mixer.start_tone(1000.0, 0.0, 10.0);

        let mut buf = vec![0.0; 160];
        mixer.render(&mut buf, 2);
        assert_eq!(mixer.now_ms(), 10.0);
        assert!(buf.chunks(2).all(|x| x[0] == x[1]));
        assert!(buf.iter().all(|x| x.abs() <= 0.5));
    }

    #[test]
    fn test_mixer_past_start() {
        let mut mixer = Mixer::new(8000);
        let mut buf = vec![0.0; 80];
        mixer.render(&mut buf, 1);

        mixer.start_tone(1000.0, 0.0, 5.0);
        let mut buf = vec![0.0; 40];
        mixer.render(&mut buf, 1);
        assert!(loud(&buf));
    }

    #[test]
    fn test_mixer_huge_durations() {
        let mut mixer = Mixer::new(8000);
        mixer.start_tone(1000.0, 0.0, 1e300);
        mixer.start_tone(1000.0, 1e300, 1e300);

        let mut buf = vec![0.0; 800];
        mixer.render(&mut buf, 1);
        assert!(loud(&buf));
        assert_eq!(mixer.pending(), 2);
        assert!(mixer.take_finished().is_empty());
    }
}
