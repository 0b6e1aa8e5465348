//! Pure state-transition core for the sharp9 practice player
//!
//! This crate holds the domain model, the closed Action/Effect vocabulary,
//! and the reducer that maps `(state, action)` to a new state plus a list of
//! side-effect requests. Nothing here performs I/O; the orchestrator in
//! `sharp9-player` executes the requested effects against the audio engine
//! and the waveform peak worker.

pub mod action;
pub mod effect;
pub mod reducer;
pub mod state;

pub use action::Action;
pub use effect::Effect;
pub use reducer::reduce;
pub use state::{LoopPoints, Marker, MarkerId, State, TapMode, Toast, Track, Transport, Viewport};
