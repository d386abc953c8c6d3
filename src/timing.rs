//! Morse timing.
//! Every duration is a small multiple of one unit, the length of a dot.

use std::time::Duration;

use serde::Serialize;

use crate::error::{Error, Result};

/// Length of one unit at 1 WPM, using `PARIS` (50 units) as the standard word.
pub const MS_PER_UNIT_AT_1_WPM: f64 = 1200.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimingProfile {
    unit_ms: f64,
}

impl TimingProfile {
    pub fn from_unit(unit_ms: f64) -> Result<Self> {
        if !unit_ms.is_finite() || unit_ms <= 0.0 {
            return Err(Error::InvalidSpeed(unit_ms));
        }

        Ok(Self { unit_ms })
    }

    pub fn from_wpm(wpm: f64) -> Result<Self> {
        if !wpm.is_finite() || wpm <= 0.0 {
            return Err(Error::InvalidSpeed(wpm));
        }

        Self::from_unit(MS_PER_UNIT_AT_1_WPM / wpm)
    }

    pub fn unit_ms(&self) -> f64 {
        self.unit_ms
    }

    pub fn unit(&self) -> Duration {
        Duration::from_secs_f64(self.unit_ms / 1000.0)
    }

    pub fn wpm(&self) -> f64 {
        MS_PER_UNIT_AT_1_WPM / self.unit_ms
    }

    pub fn dot(&self) -> f64 {
        self.unit_ms
    }

    pub fn dash(&self) -> f64 {
        self.unit_ms * 3.0
    }

    /// Silence between the symbols of one character
    pub fn intra_character_gap(&self) -> f64 {
        self.unit_ms
    }

    /// Silence between characters of one word
    pub fn inter_character_gap(&self) -> f64 {
        self.unit_ms * 3.0
    }

    pub fn inter_word_gap(&self) -> f64 {
        self.unit_ms * 7.0
    }
}
