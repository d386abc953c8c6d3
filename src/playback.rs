//! Playback controller.
//!
//! Commits a [`Schedule`] to an output device and tracks the session through
//! `Idle → Scheduled → Playing → (Paused ↔ Playing) → Stopped → Idle`.
//! Starting a new session while one is active stops the old one first, so
//! there is never more than one session sounding.

use std::sync::{Arc, Weak};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    audio::{
        device::{AudioBackend, FinishedCallback, OutputDevice},
        mixer::VoiceId,
        schedule::Schedule,
    },
    error::{Error, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    Idle,
    /// Tones are being committed to the device
    Scheduled,
    Playing,
    Paused,
    /// Tearing down a session, always followed by `Idle`
    Stopped,
}

pub struct PlaybackController {
    backend: Arc<dyn AudioBackend>,
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    state: PlaybackState,
    /// Opened on the first play, released on stop
    device: Option<Box<dyn OutputDevice>>,
    session: Option<Session>,
    subscribers: Vec<Sender<PlaybackState>>,
}

/// Handles to every voice committed for one schedule.
struct Session {
    voices: Vec<VoiceId>,
    last: VoiceId,
}

impl PlaybackState {
    fn is_active(&self) -> bool {
        matches!(self, Self::Scheduled | Self::Playing | Self::Paused)
    }
}

impl PlaybackController {
    pub fn new(backend: Arc<dyn AudioBackend>) -> Self {
        Self {
            backend,
            inner: Arc::new(Mutex::new(Inner {
                state: PlaybackState::Idle,
                device: None,
                session: None,
                subscribers: Vec::new(),
            })),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.inner.lock().state
    }

    /// Every state change from now on is sent to the returned receiver.
    pub fn subscribe(&self) -> Receiver<PlaybackState> {
        let (tx, rx) = channel::unbounded();
        self.inner.lock().subscribers.push(tx);
        rx
    }

    /// Plays a schedule, stopping whatever was playing before.
    /// Returns once every tone is committed; the sound itself comes from the device.
    pub fn play(&self, schedule: &Schedule) -> Result<PlaybackState> {
        if schedule.is_empty() {
            return Err(Error::EmptySchedule);
        }

        loop {
            let mut inner = self.inner.lock();
            if inner.state.is_active() {
                info!("Cancelling previous session");
                let device = inner.stop();
                // Released outside the lock, a device thread may be waiting on it
                drop(inner);
                drop(device);
                continue;
            }

            return self.start(&mut inner, schedule);
        }
    }

    fn start(&self, inner: &mut Inner, schedule: &Schedule) -> Result<PlaybackState> {
        let mut device = match inner.device.take() {
            Some(device) => device,
            None => {
                debug!("Opening output device");
                self.backend.open(self.finished_callback())?
            }
        };

        inner.set_state(PlaybackState::Scheduled);
        let base = device.now_ms();
        let voices = schedule
            .events()
            .iter()
            .map(|x| device.start_tone(x.frequency_hz, base + x.start_offset_ms, x.duration_ms))
            .collect::<Vec<_>>();
        inner.device = Some(device);

        let Some(&last) = voices.last() else {
            inner.set_state(PlaybackState::Idle);
            return Err(Error::EmptySchedule);
        };

        info!(
            tones = voices.len(),
            duration_ms = schedule.total_duration_ms(),
            "Playback started"
        );
        inner.session = Some(Session { voices, last });
        inner.set_state(PlaybackState::Playing);

        Ok(inner.state)
    }

    /// Cancels every tone of the session, including ones that have not started yet,
    /// and releases the output device.
    pub fn stop(&self) -> Result<PlaybackState> {
        let device = {
            let mut inner = self.inner.lock();
            if inner.state == PlaybackState::Idle {
                return Err(Error::InvalidTransition {
                    state: inner.state,
                    action: "stop",
                });
            }

            inner.stop()
        };
        drop(device);

        Ok(PlaybackState::Idle)
    }

    pub fn pause(&self) -> Result<PlaybackState> {
        let mut inner = self.inner.lock();
        let state = inner.state;
        let device = match (state, inner.device.as_mut()) {
            (PlaybackState::Playing, Some(device)) => device,
            _ => {
                return Err(Error::InvalidTransition {
                    state,
                    action: "pause",
                })
            }
        };

        device.suspend()?;
        inner.set_state(PlaybackState::Paused);
        Ok(inner.state)
    }

    pub fn resume(&self) -> Result<PlaybackState> {
        let mut inner = self.inner.lock();
        let state = inner.state;
        let device = match (state, inner.device.as_mut()) {
            (PlaybackState::Paused, Some(device)) => device,
            _ => {
                return Err(Error::InvalidTransition {
                    state,
                    action: "resume",
                })
            }
        };

        device.resume()?;
        inner.set_state(PlaybackState::Playing);
        Ok(inner.state)
    }

    /// Moves a finished session back to `Idle` when the device reports its last tone.
    fn finished_callback(&self) -> FinishedCallback {
        let inner: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
        Arc::new(move |voice: VoiceId| {
            let Some(inner) = inner.upgrade() else {
                return;
            };

            let mut inner = inner.lock();
            let done = matches!(&inner.session, Some(session) if session.last == voice);
            if done && inner.state == PlaybackState::Playing {
                inner.session = None;
                info!("Playback finished");
                inner.set_state(PlaybackState::Idle);
            }
        })
    }
}

impl Inner {
    fn set_state(&mut self, state: PlaybackState) {
        if self.state == state {
            return;
        }

        debug!("Playback state {:?} -> {:?}", self.state, state);
        self.state = state;
        self.subscribers.retain(|x| x.send(state).is_ok());
    }

    /// Cancels the session and hands back the device so the caller can drop it unlocked.
    fn stop(&mut self) -> Option<Box<dyn OutputDevice>> {
        self.set_state(PlaybackState::Stopped);

        let mut cancelled = 0;
        if let (Some(session), Some(device)) = (self.session.take(), self.device.as_mut()) {
            cancelled = session
                .voices
                .iter()
                .filter(|x| device.cancel(**x))
                .count();
        }

        info!(cancelled, "Playback stopped");
        self.set_state(PlaybackState::Idle);
        self.device.take()
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        let device = {
            let mut inner = self.inner.lock();
            if let (Some(session), Some(device)) = (inner.session.take(), inner.device.as_mut()) {
                session.voices.iter().for_each(|x| {
                    device.cancel(*x);
                });
            }
            inner.device.take()
        };
        drop(device);
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::{PlaybackController, PlaybackState};
    use crate::{
        audio::{
            schedule::{Schedule, Scheduler},
            virtual_device::VirtualBackend,
        },
        coding::{DecodePolicy, Transcoder},
        error::Error,
        timing::TimingProfile,
    };

    const UNIT: f64 = 10.0;

    fn schedule(text: &str, frequency: f32) -> Schedule {
        let line = Transcoder::new(DecodePolicy::Strict).encode(text);
        Scheduler::new(TimingProfile::from_unit(UNIT).unwrap())
            .frequency(frequency)
            .build(&line)
            .unwrap()
    }

    fn setup() -> (Arc<VirtualBackend>, PlaybackController) {
        let backend = Arc::new(VirtualBackend::new(8000));
        let controller = PlaybackController::new(backend.clone());
        (backend, controller)
    }

    fn silent(samples: &[f32]) -> bool {
        samples.iter().all(|x| *x == 0.0)
    }

    #[test]
    fn test_play_to_completion() {
        let (backend, controller) = setup();
        let states = controller.subscribe();
        let sos = schedule("SOS", 800.0);

        assert_eq!(controller.play(&sos).unwrap(), PlaybackState::Playing);
        assert_eq!(backend.pending_voices(), 9);

        let played = backend.advance(sos.total_duration_ms() + UNIT);
        assert!(!silent(&played));
        assert_eq!(controller.state(), PlaybackState::Idle);
        assert_eq!(
            states.try_iter().collect::<Vec<_>>(),
            vec![
                PlaybackState::Scheduled,
                PlaybackState::Playing,
                PlaybackState::Idle
            ]
        );

        // The device stays open for the next message
        assert_eq!(backend.open_devices(), 1);
        drop(controller);
        assert_eq!(backend.open_devices(), 0);
    }

    #[test]
    fn test_play_timing_on_device() {
        let (backend, controller) = setup();
        controller.play(&schedule("E E", 800.0)).unwrap();

        // 80 samples per unit: E, 7 units of silence, E
        let played = backend.advance(9.0 * UNIT);
        assert!(!silent(&played[..80]));
        assert!(silent(&played[80..640]));
        assert!(!silent(&played[640..]));
    }

    #[test]
    fn test_play_empty_schedule() {
        let (backend, controller) = setup();
        let empty = schedule("", 800.0);

        assert_eq!(controller.play(&empty), Err(Error::EmptySchedule));
        assert_eq!(controller.state(), PlaybackState::Idle);
        assert_eq!(backend.open_devices(), 0);
    }

    #[test]
    fn test_play_without_audio() {
        let controller = PlaybackController::new(Arc::new(VirtualBackend::unavailable()));
        assert!(matches!(
            controller.play(&schedule("E", 800.0)),
            Err(Error::UnsupportedDevice(_))
        ));
        assert_eq!(controller.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_replacing_session_without_audio() {
        let (backend, controller) = setup();
        let states = controller.subscribe();
        let message = schedule("PARIS", 800.0);
        controller.play(&message).unwrap();
        backend.advance(2.0 * UNIT);

        backend.set_available(false);
        assert!(matches!(
            controller.play(&schedule("E", 800.0)),
            Err(Error::UnsupportedDevice(_))
        ));

        assert_eq!(controller.state(), PlaybackState::Idle);
        assert_eq!(backend.pending_voices(), 0);
        assert_eq!(backend.open_devices(), 0);
        assert!(silent(&backend.advance(message.total_duration_ms())));
        assert_eq!(
            states.try_iter().collect::<Vec<_>>(),
            vec![
                PlaybackState::Scheduled,
                PlaybackState::Playing,
                PlaybackState::Stopped,
                PlaybackState::Idle
            ]
        );

        // A later play can open the device again
        backend.set_available(true);
        assert_eq!(controller.play(&message).unwrap(), PlaybackState::Playing);
    }

    #[test]
    fn test_stop_cancels_future_tones() {
        let (backend, controller) = setup();
        let states = controller.subscribe();
        let message = schedule("PARIS PARIS", 800.0);
        controller.play(&message).unwrap();

        assert!(!silent(&backend.advance(5.0 * UNIT)));
        assert_eq!(controller.stop().unwrap(), PlaybackState::Idle);

        assert_eq!(backend.pending_voices(), 0);
        assert_eq!(backend.open_devices(), 0);
        assert!(silent(&backend.advance(message.total_duration_ms())));
        assert_eq!(
            states.try_iter().collect::<Vec<_>>(),
            vec![
                PlaybackState::Scheduled,
                PlaybackState::Playing,
                PlaybackState::Stopped,
                PlaybackState::Idle
            ]
        );
    }

    #[test]
    fn test_stop_when_idle() {
        let (_backend, controller) = setup();
        assert_eq!(
            controller.stop(),
            Err(Error::InvalidTransition {
                state: PlaybackState::Idle,
                action: "stop"
            })
        );
    }

    #[test]
    fn test_play_replaces_session() {
        let (backend, controller) = setup();
        let first = schedule("TTTTTTTT", 600.0);
        let second = schedule("EE", 1000.0);

        controller.play(&first).unwrap();
        backend.advance(2.0 * UNIT);
        controller.play(&second).unwrap();

        // Only the new session is left on any device
        assert_eq!(backend.pending_voices(), 2);
        assert_eq!(backend.open_devices(), 1);

        backend.advance(second.total_duration_ms());
        assert_eq!(controller.state(), PlaybackState::Idle);
        assert_eq!(backend.pending_voices(), 0);
        assert!(silent(&backend.advance(first.total_duration_ms())));
    }

    #[test]
    fn test_pause_and_resume() {
        let (backend, controller) = setup();
        let message = schedule("K", 800.0);
        controller.play(&message).unwrap();
        backend.advance(UNIT);

        assert_eq!(controller.pause().unwrap(), PlaybackState::Paused);
        assert!(silent(&backend.advance(10_000.0)));
        assert_eq!(controller.state(), PlaybackState::Paused);
        assert!(matches!(
            controller.pause(),
            Err(Error::InvalidTransition { .. })
        ));

        assert_eq!(controller.resume().unwrap(), PlaybackState::Playing);
        assert!(!silent(&backend.advance(message.total_duration_ms())));
        assert_eq!(controller.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_stop_while_paused() {
        let (backend, controller) = setup();
        controller.play(&schedule("MORSE", 800.0)).unwrap();
        controller.pause().unwrap();

        assert_eq!(controller.stop().unwrap(), PlaybackState::Idle);
        assert_eq!(backend.pending_voices(), 0);
        assert!(matches!(
            controller.resume(),
            Err(Error::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_new_speed_does_not_touch_playing_session() {
        let (backend, controller) = setup();
        let slow = schedule("T", 800.0);
        controller.play(&slow).unwrap();

        let line = Transcoder::new(DecodePolicy::Strict).encode("T");
        let fast = Scheduler::new(TimingProfile::from_wpm(60.0).unwrap())
            .build(&line)
            .unwrap();
        assert_ne!(fast, slow);

        // Still running at the old speed: 3 units of tone
        let played = backend.advance(3.0 * UNIT);
        assert!(!silent(&played[200..240]));
        assert_eq!(controller.state(), PlaybackState::Idle);
    }
}
