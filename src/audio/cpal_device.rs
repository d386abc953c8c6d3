//! Sound card output through cpal.
//!
//! cpal streams can not move between threads, so each open device owns a
//! thread that builds the stream, keeps it alive and runs pause / resume
//! requests. Finished voices are handed to a second thread that runs the
//! completion callback, keeping the audio callback itself free of any lock
//! the controller might hold.

use std::thread::{self, JoinHandle};

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig,
};
use crossbeam::channel::{self, Receiver, Sender};
use tracing::{debug, info, warn};

use super::{
    device::{AudioBackend, FinishedCallback, OutputDevice},
    mixer::{Mixer, SharedMixer, VoiceId},
};
use crate::{
    error::{Error, Result},
    misc::Similarity,
};

/// Opens the host's sound card.
pub struct CpalBackend {
    device: String,
    gain: f32,
}

struct CpalDevice {
    mixer: SharedMixer,
    commands: Sender<Command>,
    threads: Vec<JoinHandle<()>>,
}

enum Command {
    Pause(Sender<Result<()>>),
    Resume(Sender<Result<()>>),
    Close,
}

impl CpalBackend {
    /// `device` is matched against the host's output names, `"default"` picks the host default.
    pub fn new(device: impl Into<String>, gain: f32) -> Self {
        Self {
            device: device.into(),
            gain,
        }
    }
}

impl AudioBackend for CpalBackend {
    fn open(&self, on_finished: FinishedCallback) -> Result<Box<dyn OutputDevice>> {
        let (ready_tx, ready_rx) = channel::bounded(1);
        let (command_tx, command_rx) = channel::unbounded();
        let (finished_tx, finished_rx) = channel::unbounded::<VoiceId>();

        let wanted = self.device.to_lowercase();
        let gain = self.gain;
        let stream_thread = thread::Builder::new()
            .name("morse-audio".to_owned())
            .spawn(move || run_stream(&wanted, gain, finished_tx, ready_tx, command_rx))
            .map_err(|e| Error::Device(e.to_string()))?;

        // Surface device errors now instead of in the middle of playback
        let mixer = match ready_rx.recv() {
            Ok(Ok(mixer)) => mixer,
            Ok(Err(e)) => {
                let _ = stream_thread.join();
                return Err(e);
            }
            Err(_) => return Err(Error::Device("audio thread exited".to_owned())),
        };

        let notify_thread = thread::Builder::new()
            .name("morse-notify".to_owned())
            .spawn(move || {
                for id in finished_rx.iter() {
                    on_finished(id);
                }
            })
            .map_err(|e| Error::Device(e.to_string()))?;

        Ok(Box::new(CpalDevice {
            mixer,
            commands: command_tx,
            threads: vec![stream_thread, notify_thread],
        }))
    }
}

fn run_stream(
    wanted: &str,
    gain: f32,
    finished: Sender<VoiceId>,
    ready: Sender<Result<SharedMixer>>,
    commands: Receiver<Command>,
) {
    let stream = match build_stream(wanted, gain, finished) {
        Ok((stream, mixer)) => {
            let _ = ready.send(Ok(mixer));
            stream
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    for command in commands.iter() {
        match command {
            Command::Pause(reply) => {
                let _ = reply.send(stream.pause().map_err(|e| Error::Device(e.to_string())));
            }
            Command::Resume(reply) => {
                let _ = reply.send(stream.play().map_err(|e| Error::Device(e.to_string())));
            }
            Command::Close => break,
        }
    }

    debug!("Closing output stream");
}

fn build_stream(
    wanted: &str,
    gain: f32,
    finished: Sender<VoiceId>,
) -> Result<(Stream, SharedMixer)> {
    let host = cpal::default_host();
    let device = pick_device(&host, wanted)?;
    let supported = device
        .default_output_config()
        .map_err(|e| Error::UnsupportedDevice(e.to_string()))?;

    let sample_rate = supported.sample_rate().0;
    let format = supported.sample_format();
    let config: StreamConfig = supported.into();
    let mixer = SharedMixer::new(Mixer::new(sample_rate).gain(gain));

    info!(
        "Output hooked into `{}` ({} Hz, {} channels, {:?})",
        device.name().unwrap_or_default(),
        sample_rate,
        config.channels,
        format
    );

    let stream = match format {
        SampleFormat::F32 => build::<f32>(&device, &config, mixer.clone(), finished),
        SampleFormat::I16 => build::<i16>(&device, &config, mixer.clone(), finished),
        SampleFormat::U16 => build::<u16>(&device, &config, mixer.clone(), finished),
        other => Err(Error::UnsupportedDevice(format!(
            "unsupported sample format {other:?}"
        ))),
    }?;

    stream
        .play()
        .map_err(|e| Error::Device(e.to_string()))?;

    Ok((stream, mixer))
}

fn build<T>(
    device: &Device,
    config: &StreamConfig,
    mixer: SharedMixer,
    finished: Sender<VoiceId>,
) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let mut scratch = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _info: &cpal::OutputCallbackInfo| {
                scratch.resize(data.len(), 0.0);
                for id in mixer.render(&mut scratch, channels) {
                    let _ = finished.send(id);
                }

                for (out, sample) in data.iter_mut().zip(&scratch) {
                    *out = T::from_sample(*sample);
                }
            },
            |err| warn!("Output stream error: {err}"),
            None,
        )
        .map_err(|e| Error::UnsupportedDevice(e.to_string()))
}

/// Picks the output whose name is most similar to the one asked for.
fn pick_device(host: &cpal::Host, wanted: &str) -> Result<Device> {
    if wanted == "default" {
        return host
            .default_output_device()
            .ok_or_else(|| Error::UnsupportedDevice("no default output device".to_owned()));
    }

    host.output_devices()
        .map_err(|e| Error::UnsupportedDevice(e.to_string()))?
        .map(|x| {
            let name = x.name().unwrap_or_default().to_lowercase();
            (name.similarity(wanted), x)
        })
        .reduce(|a, b| if a.0 >= b.0 { a } else { b })
        .map(|x| x.1)
        .ok_or_else(|| Error::UnsupportedDevice(format!("no output device like `{wanted}`")))
}

impl CpalDevice {
    fn request(&self, command: fn(Sender<Result<()>>) -> Command) -> Result<()> {
        let (tx, rx) = channel::bounded(1);
        self.commands
            .send(command(tx))
            .map_err(|_| Error::Device("audio thread exited".to_owned()))?;
        rx.recv()
            .map_err(|_| Error::Device("audio thread exited".to_owned()))?
    }
}

impl OutputDevice for CpalDevice {
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
        self.request(Command::Pause)
            .map_err(|_| Error::SuspendUnsupported)
    }

    fn resume(&mut self) -> Result<()> {
        self.request(Command::Resume)
    }
}

impl Drop for CpalDevice {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Close);
        for i in self.threads.drain(..) {
            let _ = i.join();
        }
    }
}
