//! Transport handlers: play/pause, scrubbing, ticks, speed and pitch

use std::time::Instant;

use crate::effect::Effect;
use crate::state::{
    State, MAX_PITCH_SEMITONES, MAX_SPEED, MIN_PITCH_SEMITONES, MIN_SPEED,
};

use super::{format_value, show_toast, TOAST_ERROR, TOAST_STATUS};

/// Toggle between playing and paused
///
/// Without a track this is a no-op; the engine would ignore the command
/// anyway, but not emitting it keeps the state honest.
pub fn toggle_play(state: &mut State) -> Vec<Effect> {
    if state.transport.is_playing {
        state.transport.is_playing = false;
        vec![Effect::Pause]
    } else if state.track.is_some() {
        state.transport.is_playing = true;
        vec![Effect::Play {
            from_secs: state.transport.current_time_secs,
        }]
    } else {
        Vec::new()
    }
}

/// Move the playhead (drag scrub or loop-mode tap)
pub fn scrub(state: &mut State, secs: f64) -> Vec<Effect> {
    let secs = state.clamp_time(secs);
    state.transport.current_time_secs = secs;
    vec![Effect::Seek(secs)]
}

/// Engine progress report; updates the playhead and nothing else
pub fn tick(state: &mut State, secs: f64) -> Vec<Effect> {
    state.transport.current_time_secs = state.clamp_time(secs);
    Vec::new()
}

/// Adjust playback speed, clamped to [0.25, 2.0]
///
/// The result is quantized to 0.01 so repeated ±0.05 steps land on exact
/// display values instead of accumulating float error.
pub fn speed_delta(state: &mut State, delta: f64, now: Instant) -> Vec<Effect> {
    let speed = quantize(state.transport.speed + delta, 100.0).clamp(MIN_SPEED, MAX_SPEED);
    state.transport.speed = speed;
    show_toast(state, format!("Speed {}", format_value(speed)), now, TOAST_STATUS);
    vec![Effect::SetRate(speed)]
}

/// Adjust pitch in semitones, clamped to [-12, 12], quantized to 0.1
pub fn pitch_delta(state: &mut State, delta: f64, now: Instant) -> Vec<Effect> {
    let pitch = quantize(state.transport.pitch_semitones + delta, 10.0)
        .clamp(MIN_PITCH_SEMITONES, MAX_PITCH_SEMITONES);
    state.transport.pitch_semitones = pitch;
    show_toast(state, format!("Pitch {}", format_value(pitch)), now, TOAST_STATUS);
    vec![Effect::SetPitchSemitones(pitch)]
}

/// Engine ran off the end of the track
pub fn playback_ended(state: &mut State) -> Vec<Effect> {
    state.transport.is_playing = false;
    state.transport.current_time_secs = state.duration_secs();
    Vec::new()
}

/// Engine-level failure mid-playback: stop and alert rather than continue
/// silently
pub fn engine_fault(state: &mut State, message: String, now: Instant) -> Vec<Effect> {
    state.transport.is_playing = false;
    show_toast(state, message, now, TOAST_ERROR);
    Vec::new()
}

fn quantize(value: f64, steps_per_unit: f64) -> f64 {
    (value * steps_per_unit).round() / steps_per_unit
}
