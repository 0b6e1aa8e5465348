//! Actions accepted by the reducer
//!
//! This is the complete input vocabulary of the core. Presentation produces
//! the user-driven variants; the orchestrator produces the rest by
//! translating loader, peak-worker, and engine outcomes.

use std::path::PathBuf;

use crate::state::{MarkerId, TapMode, Track};

/// Inputs to [`crate::reduce`]
///
/// Every variant has a defined transition; no action can leave the state
/// violating the model invariants.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// User picked an audio source to open
    ImportPicked(PathBuf),
    /// Background load finished successfully
    ImportSucceeded(Track),
    /// Background load failed (message is user-facing)
    ImportFailed(String),
    /// Switch the tap-interpretation context
    SetMode(TapMode),
    /// Tap on the waveform surface at a track time
    TapSurface(f64),
    /// Drag/scrub to a track time (always a seek, regardless of mode)
    DragScrub(f64),
    /// Toggle play/pause
    TogglePlay,
    /// Engine progress report (no effects; this is a report, not a command)
    Tick(f64),
    /// Adjust playback speed by a delta (typically ±0.05)
    SpeedDelta(f64),
    /// Adjust pitch by a delta in semitones (typically ±1.0)
    PitchDelta(f64),
    /// Drop a marker at a track time
    AddMarker(f64),
    /// Remove a marker by id
    DeleteMarker(MarkerId),
    /// Enable or disable the A→B loop
    ToggleLoopEnabled(bool),
    /// Set the loop A bound
    SetA(f64),
    /// Set the loop B bound
    SetB(f64),
    /// Clear the toast if its deadline has passed
    ClearToastIfExpired,
    /// Engine reached the end of the track
    PlaybackEnded,
    /// Peak worker delivered buckets for the live track
    PeaksComputed,
    /// Peak worker failed; the track remains playable
    PeakComputationFailed(String),
    /// Engine-level failure during playback
    EngineFault(String),
}
