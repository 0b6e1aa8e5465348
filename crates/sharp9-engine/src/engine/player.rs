//! The render core owned by the audio callback
//!
//! All playback decisions happen here, inside the audio thread: applying
//! queued commands at the frame boundary, feeding the time stretcher,
//! wrapping the playhead at the loop boundary, and reporting progress.
//!
//! ## Seamless looping
//!
//! The loop jump is never a reactive seek. While filling the stretcher's
//! input block, reaching B continues reading from A *within the same block*,
//! blending a few milliseconds of the material past B into the material
//! after A. The output device is handed a complete block every callback, so
//! there is nothing to starve and no gap at the seam.

use std::sync::Arc;

use crate::stretch::TimeStretcher;
use crate::track::LoadedTrack;
use crate::types::{StereoBuffer, StereoSample};

use super::{EngineCommand, EngineEvent, TransportAtomics};

/// Maximum output block size to pre-allocate for
///
/// Covers all common device buffer sizes; pre-allocating removes every
/// allocation from the callback.
pub const MAX_BUFFER_SIZE: usize = 8192;

/// Input scratch capacity: worst case is the 2.0 rate ceiling
const MAX_INPUT_FRAMES: usize = MAX_BUFFER_SIZE * 2 + 8;

/// Playback rate bounds
pub const MIN_RATE: f64 = 0.25;
pub const MAX_RATE: f64 = 2.0;

/// Crossfade depth at the loop seam
const LOOP_CROSSFADE_MS: u32 = 5;

/// Fade-in length after a seek or play, to swallow the discontinuity
const DECLICK_MS: u32 = 5;

/// Position report cadence while playing
const TICK_HZ: u32 = 30;

/// In-progress crossfade across the loop seam
struct LoopCrossfade {
    /// Read position of the outgoing tail (continues past B)
    src_frame: u64,
    remaining: u32,
    total: u32,
}

/// The player state machine that lives on the audio thread
pub struct PlayerCore {
    sample_rate: u32,
    track: Option<LoadedTrack>,
    /// Read position in frames
    position: u64,
    playing: bool,
    rate: f64,
    /// Fractional input frames carried between blocks
    input_carry: f64,
    /// Validated loop region `[start, end)` in frames
    loop_region: Option<(u64, u64)>,
    stretcher: TimeStretcher,
    input: StereoBuffer,
    xfade: Option<LoopCrossfade>,
    declick_remaining: u32,
    declick_total: u32,
    events: rtrb::Producer<EngineEvent>,
    atomics: Arc<TransportAtomics>,
    frames_until_tick: u64,
}

impl PlayerCore {
    pub fn new(
        sample_rate: u32,
        events: rtrb::Producer<EngineEvent>,
        atomics: Arc<TransportAtomics>,
    ) -> Self {
        Self {
            sample_rate,
            track: None,
            position: 0,
            playing: false,
            rate: 1.0,
            input_carry: 0.0,
            loop_region: None,
            stretcher: TimeStretcher::new(sample_rate),
            input: StereoBuffer::silence(MAX_INPUT_FRAMES),
            xfade: None,
            declick_remaining: 0,
            declick_total: 1,
            events,
            atomics,
            frames_until_tick: (sample_rate / TICK_HZ) as u64,
        }
    }

    /// Apply all queued commands (called at the start of every callback)
    pub fn process_commands(&mut self, rx: &mut rtrb::Consumer<EngineCommand>) {
        while let Ok(cmd) = rx.pop() {
            self.apply(cmd);
        }
    }

    fn apply(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::InstallTrack(track) => self.install_track(*track),
            EngineCommand::Unload => self.unload(),
            EngineCommand::Play { from_frame } => self.play(from_frame),
            EngineCommand::Pause => self.pause(),
            EngineCommand::Seek { frame } => self.seek(frame),
            EngineCommand::SetRate(rate) => self.rate = rate.clamp(MIN_RATE, MAX_RATE),
            EngineCommand::SetPitchCents(cents) => self.stretcher.set_pitch_cents(cents),
            EngineCommand::SetLoop(region) => self.set_loop(region),
        }
    }

    /// Swap in a track, resetting the transport and both transform axes
    pub fn install_track(&mut self, track: LoadedTrack) {
        self.position = 0;
        self.playing = false;
        self.rate = 1.0;
        self.input_carry = 0.0;
        self.loop_region = None;
        self.xfade = None;
        self.stretcher.reset();
        self.stretcher.set_pitch_cents(0);
        self.frames_until_tick = (self.sample_rate / TICK_HZ) as u64;
        self.track = Some(track);
        self.sync_atomics();
    }

    pub fn unload(&mut self) {
        self.track = None;
        self.position = 0;
        self.playing = false;
        self.loop_region = None;
        self.xfade = None;
        self.sync_atomics();
    }

    /// Start playback; a no-op without a track
    pub fn play(&mut self, from_frame: Option<u64>) {
        if self.track.is_none() {
            return;
        }
        if let Some(frame) = from_frame {
            self.seek(frame);
        }
        self.playing = true;
        self.start_declick();
        self.sync_atomics();
    }

    pub fn pause(&mut self) {
        self.playing = false;
        self.sync_atomics();
    }

    /// Jump the read position; safe while playing or paused
    pub fn seek(&mut self, frame: u64) {
        let Some(track) = &self.track else {
            return;
        };
        self.position = frame.min(track.duration_frames().saturating_sub(1));
        self.xfade = None;
        self.input_carry = 0.0;
        self.stretcher.reset();
        self.start_declick();
        self.sync_atomics();
    }

    /// Configure the loop region; degenerate regions disable looping
    pub fn set_loop(&mut self, region: Option<(u64, u64)>) {
        self.loop_region = region.filter(|(a, b)| a < b);
        if self.loop_region.is_none() {
            self.xfade = None;
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn position_frames(&self) -> u64 {
        self.position
    }

    fn position_secs(&self) -> f64 {
        self.position as f64 / self.sample_rate as f64
    }

    fn start_declick(&mut self) {
        self.declick_total = (self.sample_rate * DECLICK_MS / 1000).max(1);
        self.declick_remaining = self.declick_total;
    }

    fn crossfade_frames(&self) -> u32 {
        self.sample_rate * LOOP_CROSSFADE_MS / 1000
    }

    fn sync_atomics(&self) {
        self.atomics.store_position(self.position);
        self.atomics.store_playing(self.playing);
    }

    fn push_event(&mut self, event: EngineEvent) {
        // Ring full means the control loop is stalled; dropping a report is
        // the RT-safe choice
        let _ = self.events.push(event);
    }

    /// Render one output block
    pub fn render(&mut self, output: &mut StereoBuffer) {
        let n = output.len();
        if n == 0 {
            return;
        }
        if self.track.is_none() || !self.playing {
            output.fill_silence();
            return;
        }

        // The rate decides how many source frames feed this block; the
        // fractional remainder carries into the next one
        let want = n as f64 * self.rate + self.input_carry;
        let in_frames = (want.floor() as usize).min(MAX_INPUT_FRAMES);
        self.input_carry = want - in_frames as f64;
        self.input.set_len_from_capacity(in_frames);

        let ended = self.fill_input(in_frames);
        self.stretcher.process(&self.input, output);
        self.apply_declick(output);

        if ended {
            self.playing = false;
            self.push_event(EngineEvent::Ended);
        } else {
            self.frames_until_tick = self.frames_until_tick.saturating_sub(n as u64);
            if self.frames_until_tick == 0 {
                self.push_event(EngineEvent::Position(self.position_secs()));
                self.frames_until_tick = (self.sample_rate / TICK_HZ) as u64;
            }
        }
        self.sync_atomics();
    }

    /// Fill the stretcher input, wrapping at the loop boundary
    ///
    /// Returns true when the track ran out of material (loop disabled).
    fn fill_input(&mut self, n: usize) -> bool {
        let frames = self
            .track
            .as_ref()
            .expect("fill_input requires a track")
            .frames
            .clone();
        let data = frames.as_slice();
        let duration = data.len() as u64;

        let loop_region = self.loop_region.and_then(|(a, b)| {
            let b = b.min(duration);
            (a < b).then_some((a, b))
        });
        let fade = loop_region
            .map(|(a, b)| self.crossfade_frames().min(((b - a) / 2) as u32))
            .unwrap_or(0);

        let input = self.input.as_mut_slice();
        let mut ended = false;

        for i in 0..n {
            if let Some((a, b)) = loop_region {
                if self.position >= b {
                    // Pre-scheduled jump: keep reading from A while the
                    // tail past B fades out underneath
                    self.xfade = Some(LoopCrossfade {
                        src_frame: self.position,
                        remaining: fade,
                        total: fade.max(1),
                    });
                    self.position = a;
                }
            }
            if self.position >= duration {
                for rest in input[i..n].iter_mut() {
                    *rest = StereoSample::silence();
                }
                ended = true;
                break;
            }

            let mut sample = data[self.position as usize];
            let mut xfade_done = false;
            if let Some(xf) = self.xfade.as_mut() {
                if xf.remaining > 0 && (xf.src_frame as usize) < data.len() {
                    let t = 1.0 - xf.remaining as f32 / xf.total as f32;
                    let (gain_in, gain_out) = equal_power(t);
                    sample = sample * gain_in + data[xf.src_frame as usize] * gain_out;
                    xf.src_frame += 1;
                    xf.remaining -= 1;
                } else {
                    xfade_done = true;
                }
            }
            if xfade_done {
                self.xfade = None;
            }

            input[i] = sample;
            self.position += 1;
        }

        ended
    }

    /// Short fade-in after a seek/play discontinuity
    fn apply_declick(&mut self, output: &mut StereoBuffer) {
        if self.declick_remaining == 0 {
            return;
        }
        for frame in output.as_mut_slice() {
            if self.declick_remaining == 0 {
                break;
            }
            let gain = 1.0 - self.declick_remaining as f32 / self.declick_total as f32;
            *frame = *frame * gain;
            self.declick_remaining -= 1;
        }
    }
}

/// Equal-power crossfade gains for progress `t` in [0, 1]
#[inline]
fn equal_power(t: f32) -> (f32, f32) {
    let angle = t * std::f32::consts::FRAC_PI_2;
    (angle.sin(), angle.cos())
}
