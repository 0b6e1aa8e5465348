//! The reducer: a total, deterministic transition function
//!
//! `reduce(state, action, now)` applies exactly one action and returns the
//! effects the orchestrator must execute. `now` is passed in by the caller
//! so toast expiry stays deterministic and testable.
//!
//! Handlers are split by topic the same way the player splits its update
//! modules: import lifecycle, transport, loop points, markers.

mod import;
mod loop_points;
mod markers;
mod transport;

use std::time::{Duration, Instant};

use crate::action::Action;
use crate::effect::Effect;
use crate::state::{State, TapMode};

/// Toast lifetime for status readouts (speed/pitch, loop refusal)
pub const TOAST_STATUS: Duration = Duration::from_millis(1500);

/// Toast lifetime for error messages
pub const TOAST_ERROR: Duration = Duration::from_secs(3);

/// Apply one action to the state, returning the effects to run
pub fn reduce(state: &mut State, action: Action, now: Instant) -> Vec<Effect> {
    match action {
        Action::ImportPicked(path) => import::import_picked(state, path),
        Action::ImportSucceeded(track) => import::import_succeeded(state, track),
        Action::ImportFailed(message) => import::import_failed(state, message, now),
        Action::PeaksComputed => import::peaks_computed(state),
        Action::PeakComputationFailed(message) => import::peaks_failed(state, message, now),

        Action::SetMode(mode) => {
            state.mode = mode;
            Vec::new()
        }
        Action::TapSurface(secs) => tap_surface(state, secs),
        Action::DragScrub(secs) => transport::scrub(state, secs),

        Action::TogglePlay => transport::toggle_play(state),
        Action::Tick(secs) => transport::tick(state, secs),
        Action::SpeedDelta(delta) => transport::speed_delta(state, delta, now),
        Action::PitchDelta(delta) => transport::pitch_delta(state, delta, now),
        Action::PlaybackEnded => transport::playback_ended(state),
        Action::EngineFault(message) => transport::engine_fault(state, message, now),

        Action::ToggleLoopEnabled(enabled) => loop_points::toggle_enabled(state, enabled, now),
        Action::SetA(secs) => loop_points::set_a(state, secs),
        Action::SetB(secs) => loop_points::set_b(state, secs),

        Action::AddMarker(secs) => markers::add_marker(state, secs),
        Action::DeleteMarker(id) => markers::delete_marker(state, id),

        Action::ClearToastIfExpired => {
            if let Some(toast) = &state.toast {
                if now >= toast.expires_at {
                    state.toast = None;
                }
            }
            Vec::new()
        }
    }
}

/// Mode-dependent tap dispatch
///
/// The mode is a closed enumeration; the tap meaning is decided here and
/// nowhere else.
fn tap_surface(state: &mut State, secs: f64) -> Vec<Effect> {
    match state.mode {
        TapMode::Marker => markers::add_marker(state, secs),
        TapMode::SetA => loop_points::set_a(state, secs),
        TapMode::SetB => loop_points::set_b(state, secs),
        TapMode::Loop => transport::scrub(state, secs),
    }
}

/// Replace the current toast
pub(crate) fn show_toast(state: &mut State, message: impl Into<String>, now: Instant, ttl: Duration) {
    state.toast = Some(crate::state::Toast {
        message: message.into(),
        expires_at: now + ttl,
    });
}

/// Render a speed/pitch value without trailing zeros ("1.25", "1", "-3")
pub(crate) fn format_value(value: f64) -> String {
    let rendered = format!("{:.2}", value);
    rendered
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{MarkerId, Track};

    fn loaded_state() -> State {
        let mut state = State::new();
        let now = Instant::now();
        reduce(
            &mut state,
            Action::ImportSucceeded(Track {
                name: "etude".into(),
                duration_secs: 180.0,
            }),
            now,
        );
        state
    }

    #[test]
    fn test_mode_changes_only_via_set_mode() {
        let mut state = loaded_state();
        let now = Instant::now();
        assert_eq!(state.mode, TapMode::Marker);

        // Taps, scrubs, and loop edits never change the mode
        reduce(&mut state, Action::TapSurface(3.0), now);
        reduce(&mut state, Action::DragScrub(10.0), now);
        reduce(&mut state, Action::SetA(1.0), now);
        assert_eq!(state.mode, TapMode::Marker);

        reduce(&mut state, Action::SetMode(TapMode::SetB), now);
        assert_eq!(state.mode, TapMode::SetB);
    }

    #[test]
    fn test_tap_dispatch_per_mode() {
        let mut state = loaded_state();
        let now = Instant::now();

        // Marker mode: tap drops a marker
        reduce(&mut state, Action::TapSurface(12.0), now);
        assert_eq!(state.markers.len(), 1);
        assert_eq!(state.markers[0].time_secs, 12.0);

        // SetA mode: tap writes the A bound
        reduce(&mut state, Action::SetMode(TapMode::SetA), now);
        reduce(&mut state, Action::TapSurface(20.0), now);
        assert_eq!(state.loop_points.a_secs, Some(20.0));

        // SetB mode: tap writes the B bound
        reduce(&mut state, Action::SetMode(TapMode::SetB), now);
        reduce(&mut state, Action::TapSurface(30.0), now);
        assert_eq!(state.loop_points.b_secs, Some(30.0));

        // Loop mode: tap is a seek
        reduce(&mut state, Action::SetMode(TapMode::Loop), now);
        let effects = reduce(&mut state, Action::TapSurface(45.0), now);
        assert_eq!(effects, vec![Effect::Seek(45.0)]);
        assert_eq!(state.transport.current_time_secs, 45.0);
        assert_eq!(state.markers.len(), 1);
    }

    #[test]
    fn test_clear_toast_is_idempotent_when_absent() {
        let mut state = State::new();
        let now = Instant::now();
        assert!(state.toast.is_none());
        assert!(reduce(&mut state, Action::ClearToastIfExpired, now).is_empty());
        assert!(state.toast.is_none());
    }

    #[test]
    fn test_toast_clears_only_after_expiry() {
        let mut state = State::new();
        let now = Instant::now();
        reduce(&mut state, Action::ImportFailed("bad file".into()), now);
        assert!(state.toast.is_some());

        // Still before the deadline
        reduce(&mut state, Action::ClearToastIfExpired, now + Duration::from_secs(1));
        assert!(state.toast.is_some());

        reduce(&mut state, Action::ClearToastIfExpired, now + Duration::from_secs(4));
        assert!(state.toast.is_none());
    }

    #[test]
    fn test_delete_unknown_marker_is_a_no_op() {
        let mut state = loaded_state();
        let now = Instant::now();
        reduce(&mut state, Action::AddMarker(5.0), now);
        let effects = reduce(&mut state, Action::DeleteMarker(MarkerId(999)), now);
        assert!(effects.is_empty());
        assert_eq!(state.markers.len(), 1);
    }

    #[test]
    fn test_format_value_trims_trailing_zeros() {
        assert_eq!(format_value(1.25), "1.25");
        assert_eq!(format_value(1.0), "1");
        assert_eq!(format_value(0.85), "0.85");
        assert_eq!(format_value(-3.0), "-3");
        assert_eq!(format_value(2.5), "2.5");
    }
}
