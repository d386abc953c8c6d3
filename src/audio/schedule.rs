//! Tone scheduler.
//! Flattens an encoded line into timed tone events without touching any device.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    coding::{Element, EncodedLine, Symbol},
    error::{Error, Result},
    timing::TimingProfile,
};

/// Frequency used when the caller does not pick one.
pub const DEFAULT_FREQUENCY: f32 = 800.0;

/// One tone, relative to the start of its schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneEvent {
    pub frequency_hz: f32,
    pub start_offset_ms: f64,
    pub duration_ms: f64,
}

/// Ordered tone events for one message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    events: Vec<ToneEvent>,
    total_duration_ms: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    timing: TimingProfile,
    frequency: f32,
}

impl ToneEvent {
    pub fn end_ms(&self) -> f64 {
        self.start_offset_ms + self.duration_ms
    }
}

impl Schedule {
    pub fn events(&self) -> &[ToneEvent] {
        &self.events
    }

    /// Time from the start of the first tone to the end of the last.
    pub fn total_duration_ms(&self) -> f64 {
        self.total_duration_ms
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Scheduler {
    pub fn new(timing: TimingProfile) -> Self {
        Self {
            timing,
            frequency: DEFAULT_FREQUENCY,
        }
    }

    pub fn frequency(mut self, frequency: f32) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn build(&self, line: &EncodedLine) -> Result<Schedule> {
        if !self.frequency.is_finite() || self.frequency <= 0.0 {
            return Err(Error::InvalidFrequency(self.frequency));
        }

        let mut events = Vec::new();
        let mut cursor = 0.0;
        // Silence owed before the next tone, only once something has sounded
        let mut pending_gap: Option<f64> = None;

        for element in line.elements() {
            match element {
                Element::Token(token) => {
                    if let Some(gap) = pending_gap.take() {
                        cursor += gap;
                    }

                    for (i, symbol) in token.symbols().iter().enumerate() {
                        if i > 0 {
                            cursor += self.timing.intra_character_gap();
                        }

                        let duration_ms = match symbol {
                            Symbol::Dot => self.timing.dot(),
                            Symbol::Dash => self.timing.dash(),
                        };
                        events.push(ToneEvent {
                            frequency_hz: self.frequency,
                            start_offset_ms: cursor,
                            duration_ms,
                        });
                        cursor += duration_ms;
                    }
                }
                Element::LetterGap if !events.is_empty() => {
                    let gap = self.timing.inter_character_gap();
                    pending_gap = Some(pending_gap.map_or(gap, |x| x.max(gap)));
                }
                Element::WordGap if !events.is_empty() => {
                    pending_gap = Some(self.timing.inter_word_gap());
                }
                Element::LetterGap | Element::WordGap | Element::Literal(_) => {}
            }
        }

        debug!(
            events = events.len(),
            total_ms = cursor,
            unit_ms = self.timing.unit_ms(),
            "Built tone schedule"
        );

        Ok(Schedule {
            events,
            total_duration_ms: cursor,
        })
    }
}
