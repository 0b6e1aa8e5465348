//! Marker handlers

use crate::effect::Effect;
use crate::state::{Marker, MarkerId, State};

/// Append a marker at the given time
pub fn add_marker(state: &mut State, secs: f64) -> Vec<Effect> {
    let time_secs = state.clamp_time(secs);
    let id = state.alloc_marker_id();
    state.markers.push(Marker { id, time_secs });
    Vec::new()
}

/// Remove a marker by id; unknown ids are ignored
pub fn delete_marker(state: &mut State, id: MarkerId) -> Vec<Effect> {
    state.markers.retain(|m| m.id != id);
    Vec::new()
}
