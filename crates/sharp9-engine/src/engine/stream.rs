//! CPAL output stream and the production engine handle
//!
//! The stream callback takes exclusive ownership of the [`PlayerCore`]; the
//! [`RealtimeEngine`] handle kept by the control thread only touches the
//! lock-free rings and the transport atomics.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, Stream, StreamConfig};

use crate::error::{AudioError, AudioResult};
use crate::stretch::MAX_PITCH_CENTS;
use crate::track::LoadedTrack;
use crate::types::StereoBuffer;

use super::command::{command_channel, event_channel, EngineCommand};
use super::player::{PlayerCore, MAX_BUFFER_SIZE, MAX_RATE, MIN_RATE};
use super::{EngineEvent, PracticeEngine, TransportAtomics};

/// Preferred sample rate when the device allows it
const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Default device buffer size in frames
const DEFAULT_BUFFER_FRAMES: u32 = 512;

/// Handle to the running audio engine
///
/// Dropping this stops audio output.
pub struct RealtimeEngine {
    _stream: Stream,
    commands: rtrb::Producer<EngineCommand>,
    events: rtrb::Consumer<EngineEvent>,
    atomics: Arc<TransportAtomics>,
    sample_rate: u32,
    stream_failed: Arc<AtomicBool>,
    fault_reported: bool,
}

impl RealtimeEngine {
    /// Open the default output device and start streaming
    pub fn start(buffer_frames: Option<u32>) -> AudioResult<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        log::info!("using audio device: {}", device_name);

        let supported = pick_output_config(&device)?;
        let sample_rate = supported.sample_rate().0;
        let buffer_frames = buffer_frames
            .unwrap_or(DEFAULT_BUFFER_FRAMES)
            .clamp(64, MAX_BUFFER_SIZE as u32);

        let stream_config = StreamConfig {
            channels: supported.channels(),
            sample_rate: supported.sample_rate(),
            buffer_size: BufferSize::Fixed(buffer_frames),
        };
        log::info!(
            "audio config: {} channels, {} Hz, {} frames (~{:.1} ms latency)",
            stream_config.channels,
            sample_rate,
            buffer_frames,
            buffer_frames as f32 / sample_rate as f32 * 1000.0
        );

        let (command_tx, mut command_rx) = command_channel();
        let (event_tx, event_rx) = event_channel();
        let atomics = Arc::new(TransportAtomics::new());
        let stream_failed = Arc::new(AtomicBool::new(false));

        // The callback owns the core outright; no lock is ever taken
        let mut core = PlayerCore::new(sample_rate, event_tx, atomics.clone());
        let mut render_buffer = StereoBuffer::silence(MAX_BUFFER_SIZE);
        let channels = stream_config.channels as usize;
        let failed_flag = stream_failed.clone();

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                    let n_frames = data.len() / channels;
                    render_buffer.set_len_from_capacity(n_frames.min(MAX_BUFFER_SIZE));

                    core.process_commands(&mut command_rx);
                    core.render(&mut render_buffer);

                    let samples = render_buffer.as_slice();
                    for (i, frame) in data.chunks_mut(channels).enumerate() {
                        if let Some(sample) = samples.get(i) {
                            frame[0] = sample.left;
                            if channels > 1 {
                                frame[1] = sample.right;
                            }
                            for ch in frame.iter_mut().skip(2) {
                                *ch = 0.0;
                            }
                        } else {
                            for ch in frame.iter_mut() {
                                *ch = 0.0;
                            }
                        }
                    }
                },
                move |err| {
                    log::error!("audio stream error: {}", err);
                    failed_flag.store(true, Ordering::SeqCst);
                },
                None,
            )
            .map_err(|e| AudioError::StreamBuildError(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;
        log::info!("audio stream started");

        Ok(Self {
            _stream: stream,
            commands: command_tx,
            events: event_rx,
            atomics,
            sample_rate,
            stream_failed,
            fault_reported: false,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn push(&mut self, cmd: EngineCommand) {
        if self.commands.push(cmd).is_err() {
            // Full ring means dozens of unprocessed commands; the audio
            // thread is wedged and a fault will surface shortly
            log::warn!("engine command queue full, command dropped");
        }
    }

    fn secs_to_frames(&self, secs: f64) -> u64 {
        (secs.max(0.0) * self.sample_rate as f64).round() as u64
    }
}

impl PracticeEngine for RealtimeEngine {
    fn install_track(&mut self, track: LoadedTrack) {
        self.push(EngineCommand::InstallTrack(Box::new(track)));
    }

    fn unload(&mut self) {
        self.push(EngineCommand::Unload);
    }

    fn play(&mut self, from_secs: Option<f64>) {
        let from_frame = from_secs.map(|s| self.secs_to_frames(s));
        self.push(EngineCommand::Play { from_frame });
    }

    fn pause(&mut self) {
        self.push(EngineCommand::Pause);
    }

    fn seek(&mut self, secs: f64) {
        let frame = self.secs_to_frames(secs);
        self.push(EngineCommand::Seek { frame });
    }

    fn set_rate(&mut self, rate: f64) {
        self.push(EngineCommand::SetRate(rate.clamp(MIN_RATE, MAX_RATE)));
    }

    fn set_pitch_semitones(&mut self, semitones: f64) {
        // The stretcher works in cents
        let cents = (semitones * 100.0).round() as i32;
        self.push(EngineCommand::SetPitchCents(
            cents.clamp(-MAX_PITCH_CENTS, MAX_PITCH_CENTS),
        ));
    }

    fn set_loop(&mut self, region: Option<(f64, f64)>) {
        let region = region.map(|(a, b)| (self.secs_to_frames(a), self.secs_to_frames(b)));
        self.push(EngineCommand::SetLoop(region));
    }

    fn current_time_secs(&self) -> f64 {
        self.atomics.position_frames() as f64 / self.sample_rate as f64
    }

    fn drain_events(&mut self) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.pop() {
            events.push(event);
        }
        if self.stream_failed.load(Ordering::SeqCst) && !self.fault_reported {
            self.fault_reported = true;
            events.push(EngineEvent::Fault);
        }
        events
    }
}

/// Pick the best output configuration: f32, stereo, preferring 48 kHz
fn pick_output_config(device: &cpal::Device) -> AudioResult<cpal::SupportedStreamConfig> {
    let configs: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .collect();
    if configs.is_empty() {
        return Err(AudioError::ConfigError(
            "no supported output configurations".to_string(),
        ));
    }

    let best = configs
        .iter()
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .filter(|c| c.channels() >= 2)
        .find(|c| {
            DEFAULT_SAMPLE_RATE >= c.min_sample_rate().0
                && DEFAULT_SAMPLE_RATE <= c.max_sample_rate().0
        })
        .or_else(|| configs.iter().find(|c| c.channels() >= 2))
        .or_else(|| configs.first())
        .ok_or_else(|| AudioError::ConfigError("no suitable output configuration".to_string()))?;

    let rate = if DEFAULT_SAMPLE_RATE >= best.min_sample_rate().0
        && DEFAULT_SAMPLE_RATE <= best.max_sample_rate().0
    {
        cpal::SampleRate(DEFAULT_SAMPLE_RATE)
    } else {
        let fallback = best.max_sample_rate();
        log::warn!(
            "device does not support {} Hz, falling back to {} Hz",
            DEFAULT_SAMPLE_RATE,
            fallback.0
        );
        fallback
    };

    Ok(best.clone().with_sample_rate(rate))
}
