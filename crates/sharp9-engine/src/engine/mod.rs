//! The real-time playback engine
//!
//! The cpal callback owns a [`PlayerCore`] exclusively. The control thread
//! talks to it only through a lock-free command ring, and hears back only
//! through a lock-free event ring plus the transport atomics. That keeps the
//! audio thread free of locks and the reducer free of audio-thread calls.

mod atomics;
mod command;
mod player;
mod stream;

pub use atomics::TransportAtomics;
pub use command::{command_channel, event_channel, EngineCommand, COMMAND_QUEUE_CAPACITY};
pub use player::{PlayerCore, MAX_BUFFER_SIZE};
pub use stream::RealtimeEngine;

use crate::track::LoadedTrack;

/// Notifications from the audio thread to the control thread
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineEvent {
    /// Playback position report, pushed at ~30 Hz while playing
    Position(f64),
    /// Playback ran off the end of the track
    Ended,
    /// The output stream failed; playback has stopped
    Fault,
}

/// Capability contract for the playback engine
///
/// One production implementation ([`RealtimeEngine`]) and one deterministic
/// test double (in the orchestrator's tests). All methods are safe to call
/// in any order; calls that need a track are no-ops without one.
pub trait PracticeEngine {
    /// Swap in a freshly decoded track; resets transport, rate, and pitch
    fn install_track(&mut self, track: LoadedTrack);
    /// Drop the current track
    fn unload(&mut self);
    /// Start or resume playback, optionally from a position
    fn play(&mut self, from_secs: Option<f64>);
    /// Pause playback
    fn pause(&mut self);
    /// Move the playhead; safe while playing or paused
    fn seek(&mut self, secs: f64);
    /// Playback speed in [0.25, 2.0]; does not alter pitch
    fn set_rate(&mut self, rate: f64);
    /// Pitch shift in [-12, 12] semitones; does not alter speed
    fn set_pitch_semitones(&mut self, semitones: f64);
    /// Loop region to honor on this and every subsequent pass; `None`
    /// disables looping
    fn set_loop(&mut self, region: Option<(f64, f64)>);
    /// Synchronous read of the playback position
    fn current_time_secs(&self) -> f64;
    /// Drain pending engine events (time updates, end, faults)
    fn drain_events(&mut self) -> Vec<EngineEvent>;
}
