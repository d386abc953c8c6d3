use std::f32::consts::PI;

/// Sine wave generator.
#[derive(Clone, Copy, Debug)]
pub struct Tone {
    i: usize,
    tone: f32,
    sample_rate: f32,
    duration: Option<usize>,
}

/// A [`Tone`] with a linear fade in and out so keying does not click.
#[derive(Clone, Copy, Debug)]
pub struct SmoothTone {
    inner: Tone,
    duration: usize,
    ramp: usize,
}

impl Tone {
    pub fn new(tone: f32, sample_rate: u32) -> Self {
        Self {
            i: 0,
            sample_rate: sample_rate as f32,
            tone,
            duration: None,
        }
    }

    /// Length of the tone in samples.
    pub fn duration(mut self, duration: usize) -> Self {
        self.duration = Some(duration);
        self
    }
}

impl Iterator for Tone {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        self.i += 1;

        match self.duration {
            Some(i) if self.i > i => return None,
            _ => {}
        }

        Some((self.i as f32 * self.tone * 2.0 * PI / self.sample_rate).sin())
    }
}

impl SmoothTone {
    /// Default ramp length in seconds.
    pub const RAMP: f32 = 0.005;

    /// `duration` is in samples.
    pub fn new(tone: f32, sample_rate: u32, duration: usize) -> Self {
        Self {
            inner: Tone::new(tone, sample_rate).duration(duration),
            duration,
            ramp: 0,
        }
        .ramp(Self::RAMP)
    }

    /// Sets the fade in / fade out time in seconds.
    /// Clamped to half the tone so short dots still reach full volume.
    pub fn ramp(mut self, seconds: f32) -> Self {
        let ramp = (self.inner.sample_rate * seconds) as usize;
        self.ramp = ramp.min(self.duration / 2);
        self
    }

    pub fn len(&self) -> usize {
        self.duration
    }

    pub fn is_empty(&self) -> bool {
        self.duration == 0
    }
}

impl Iterator for SmoothTone {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let raw = self.inner.next()?;
        if self.ramp == 0 {
            return Some(raw);
        }

        let i = self.inner.i;
        let from_end = self.duration - i + 1;
        let gain = (i.min(from_end) as f32 / self.ramp as f32).min(1.0);

        Some(raw * gain)
    }
}
