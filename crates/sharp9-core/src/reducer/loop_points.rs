//! A/B loop handlers
//!
//! Bounds are normalized on write: whenever both exist, a <= b. Enabling
//! requires both bounds; a refusal is a toast, never an error.

use std::time::Instant;

use crate::effect::Effect;
use crate::state::State;

use super::{show_toast, TOAST_STATUS};

/// Write the loop A bound
pub fn set_a(state: &mut State, secs: f64) -> Vec<Effect> {
    state.loop_points.a_secs = Some(state.clamp_time(secs));
    normalize_and_sync(state)
}

/// Write the loop B bound
pub fn set_b(state: &mut State, secs: f64) -> Vec<Effect> {
    state.loop_points.b_secs = Some(state.clamp_time(secs));
    normalize_and_sync(state)
}

/// Enable or disable the loop
pub fn toggle_enabled(state: &mut State, enabled: bool, now: Instant) -> Vec<Effect> {
    if enabled {
        if state.loop_points.region().is_none() {
            // Refuse: enabling needs both bounds
            show_toast(state, "Set A and B", now, TOAST_STATUS);
            return Vec::new();
        }
        state.loop_points.enabled = true;
    } else {
        state.loop_points.enabled = false;
    }
    vec![sync_effect(state)]
}

/// Swap out-of-order bounds, then mirror the loop to the engine
fn normalize_and_sync(state: &mut State) -> Vec<Effect> {
    if let (Some(a), Some(b)) = (state.loop_points.a_secs, state.loop_points.b_secs) {
        if a > b {
            state.loop_points.a_secs = Some(b);
            state.loop_points.b_secs = Some(a);
        }
    }
    vec![sync_effect(state)]
}

fn sync_effect(state: &State) -> Effect {
    Effect::SetLoop {
        a_secs: state.loop_points.a_secs,
        b_secs: state.loop_points.b_secs,
        enabled: state.loop_points.enabled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::reducer::reduce;
    use crate::state::Track;

    fn loaded_state() -> State {
        let mut state = State::new();
        reduce(
            &mut state,
            Action::ImportSucceeded(Track {
                name: "phrase".into(),
                duration_secs: 60.0,
            }),
            Instant::now(),
        );
        state
    }

    #[test]
    fn test_bounds_auto_swap() {
        // Scenario A: setA(10.0) then setB(4.0) stores (4.0, 10.0), disabled
        let mut state = loaded_state();
        let now = Instant::now();

        reduce(&mut state, Action::SetA(10.0), now);
        let effects = reduce(&mut state, Action::SetB(4.0), now);

        assert_eq!(state.loop_points.a_secs, Some(4.0));
        assert_eq!(state.loop_points.b_secs, Some(10.0));
        assert!(!state.loop_points.enabled);
        assert_eq!(
            effects,
            vec![Effect::SetLoop {
                a_secs: Some(4.0),
                b_secs: Some(10.0),
                enabled: false,
            }]
        );
    }

    #[test]
    fn test_auto_swap_holds_for_either_call_order() {
        let now = Instant::now();
        for (first, second) in [(3.0, 9.0), (9.0, 3.0)] {
            let mut state = loaded_state();
            reduce(&mut state, Action::SetA(first), now);
            reduce(&mut state, Action::SetB(second), now);
            let (a, b) = state.loop_points.region().unwrap();
            assert!(a <= b, "stored pair out of order: ({a}, {b})");
        }
    }

    #[test]
    fn test_enable_with_both_bounds() {
        // Scenario B: loop (4.0, 10.0), enable emits the effect exactly once
        let mut state = loaded_state();
        let now = Instant::now();
        reduce(&mut state, Action::SetA(4.0), now);
        reduce(&mut state, Action::SetB(10.0), now);

        let effects = reduce(&mut state, Action::ToggleLoopEnabled(true), now);

        assert!(state.loop_points.enabled);
        assert_eq!(
            effects,
            vec![Effect::SetLoop {
                a_secs: Some(4.0),
                b_secs: Some(10.0),
                enabled: true,
            }]
        );
    }

    #[test]
    fn test_enable_refused_without_both_bounds() {
        let now = Instant::now();

        // No bounds at all
        let mut state = loaded_state();
        let effects = reduce(&mut state, Action::ToggleLoopEnabled(true), now);
        assert!(!state.loop_points.enabled);
        assert!(effects.is_empty());
        assert_eq!(state.toast.as_ref().unwrap().message, "Set A and B");

        // Only A set
        let mut state = loaded_state();
        reduce(&mut state, Action::SetA(2.0), now);
        reduce(&mut state, Action::ToggleLoopEnabled(true), now);
        assert!(!state.loop_points.enabled);

        // Only B set
        let mut state = loaded_state();
        reduce(&mut state, Action::SetB(8.0), now);
        reduce(&mut state, Action::ToggleLoopEnabled(true), now);
        assert!(!state.loop_points.enabled);
    }

    #[test]
    fn test_disable_always_succeeds() {
        let mut state = loaded_state();
        let now = Instant::now();
        reduce(&mut state, Action::SetA(4.0), now);
        reduce(&mut state, Action::SetB(10.0), now);
        reduce(&mut state, Action::ToggleLoopEnabled(true), now);

        let effects = reduce(&mut state, Action::ToggleLoopEnabled(false), now);
        assert!(!state.loop_points.enabled);
        assert_eq!(
            effects,
            vec![Effect::SetLoop {
                a_secs: Some(4.0),
                b_secs: Some(10.0),
                enabled: false,
            }]
        );

        // Disabling with no bounds set is also fine
        let mut state = loaded_state();
        let effects = reduce(&mut state, Action::ToggleLoopEnabled(false), now);
        assert_eq!(
            effects,
            vec![Effect::SetLoop {
                a_secs: None,
                b_secs: None,
                enabled: false,
            }]
        );
    }

    #[test]
    fn test_bounds_clamp_to_track() {
        let mut state = loaded_state();
        let now = Instant::now();
        reduce(&mut state, Action::SetA(-5.0), now);
        reduce(&mut state, Action::SetB(500.0), now);
        assert_eq!(state.loop_points.region(), Some((0.0, 60.0)));
    }
}
