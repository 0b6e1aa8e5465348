//! Import lifecycle and peak-analysis outcome handlers

use std::path::PathBuf;
use std::time::Instant;

use crate::effect::Effect;
use crate::state::{LoopPoints, State, Track, Transport, Viewport};

use super::{show_toast, TOAST_ERROR};

/// User picked a source: enter the loading state and ask the engine to
/// pause and start loading.
///
/// The previous track is dropped immediately so the presentation never shows
/// stale markers or loop bounds next to a loading indicator.
pub fn import_picked(state: &mut State, path: PathBuf) -> Vec<Effect> {
    state.is_loading = true;
    state.track = None;
    state.markers.clear();
    state.loop_points = LoopPoints::default();
    state.transport.is_playing = false;
    state.transport.current_time_secs = 0.0;
    state.peaks_ready = false;

    vec![Effect::Pause, Effect::LoadTrack(path)]
}

/// Load finished: install the track and reset everything track-scoped,
/// regardless of prior state.
pub fn import_succeeded(state: &mut State, track: Track) -> Vec<Effect> {
    state.is_loading = false;
    state.viewport = Viewport::full(track.duration_secs);
    state.transport = Transport::default();
    state.markers.clear();
    state.loop_points = LoopPoints::default();
    state.peaks_ready = false;
    state.track = Some(track);

    vec![Effect::ComputePeaks {
        target_buckets: state.peak_buckets,
    }]
}

/// Load failed: leave the empty-track state and surface a toast
pub fn import_failed(state: &mut State, message: String, now: Instant) -> Vec<Effect> {
    state.is_loading = false;
    let message = if message.is_empty() {
        "Unable to open file".to_string()
    } else {
        message
    };
    show_toast(state, message, now, TOAST_ERROR);
    Vec::new()
}

/// Peak worker delivered buckets for the live track
pub fn peaks_computed(state: &mut State) -> Vec<Effect> {
    state.peaks_ready = true;
    Vec::new()
}

/// Peak worker failed; the track stays playable
pub fn peaks_failed(state: &mut State, message: String, now: Instant) -> Vec<Effect> {
    show_toast(state, message, now, TOAST_ERROR);
    Vec::new()
}
