//! Domain model for the practice player
//!
//! Value types describing the loaded track, transport, A/B loop, markers,
//! viewport, and transient toast message. All mutation goes through the
//! reducer; the orchestrator and presentation only read these.

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Playback speed bounds (unitless rate multiplier)
pub const MIN_SPEED: f64 = 0.25;
pub const MAX_SPEED: f64 = 2.0;

/// Pitch shift bounds in semitones
pub const MIN_PITCH_SEMITONES: f64 = -12.0;
pub const MAX_PITCH_SEMITONES: f64 = 12.0;

/// Metadata for the loaded audio source
///
/// Created by a successful load and replaced wholesale by the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Display name (file stem of the source)
    pub name: String,
    /// Total duration in seconds (> 0 once loaded)
    pub duration_secs: f64,
}

/// Playback status
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transport {
    /// Whether the engine is currently playing
    pub is_playing: bool,
    /// Current playhead position in seconds
    pub current_time_secs: f64,
    /// Playback speed, clamped to [0.25, 2.0]
    pub speed: f64,
    /// Pitch shift in semitones, clamped to [-12, 12]
    pub pitch_semitones: f64,
}

impl Default for Transport {
    fn default() -> Self {
        Self {
            is_playing: false,
            current_time_secs: 0.0,
            speed: 1.0,
            pitch_semitones: 0.0,
        }
    }
}

/// A/B loop region
///
/// When both bounds are set they satisfy `a_secs <= b_secs` (normalized on
/// write by the reducer). `enabled` implies both bounds are set.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LoopPoints {
    pub a_secs: Option<f64>,
    pub b_secs: Option<f64>,
    pub enabled: bool,
}

impl LoopPoints {
    /// Both bounds present, in normalized order
    pub fn region(&self) -> Option<(f64, f64)> {
        match (self.a_secs, self.b_secs) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        }
    }
}

/// Interpretation context for a tap on the waveform surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TapMode {
    /// Tap drops a marker at the tapped time
    #[default]
    Marker,
    /// Tap sets the loop A bound
    SetA,
    /// Tap seeks the playhead
    Loop,
    /// Tap sets the loop B bound
    SetB,
}

/// Session-unique marker identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkerId(pub u64);

/// A user-placed point of interest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: MarkerId,
    pub time_secs: f64,
}

/// Visible time window for rendering
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub start_secs: f64,
    pub end_secs: f64,
}

impl Viewport {
    /// Full-track viewport for the given duration
    pub fn full(duration_secs: f64) -> Self {
        Self {
            start_secs: 0.0,
            end_secs: duration_secs,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        // Non-degenerate placeholder until a track is loaded
        Self::full(1.0)
    }
}

/// Transient user-facing message with an expiry deadline
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub message: String,
    pub expires_at: Instant,
}

/// The complete reducer-owned state
///
/// Waveform peaks are deliberately absent: they live in the orchestrator's
/// generation-keyed cache so snapshots stay small. `peaks_ready` tells the
/// presentation when that cache holds data for the current track.
#[derive(Debug, Clone)]
pub struct State {
    pub track: Option<Track>,
    pub is_loading: bool,
    pub transport: Transport,
    pub loop_points: LoopPoints,
    pub mode: TapMode,
    pub markers: Vec<Marker>,
    pub viewport: Viewport,
    pub toast: Option<Toast>,
    pub peaks_ready: bool,
    /// Bucket count requested from the peak worker on each successful load
    pub peak_buckets: usize,
    next_marker_id: u64,
}

impl State {
    /// Fresh session state
    pub fn new() -> Self {
        Self::with_peak_buckets(1000)
    }

    /// Fresh session state with a configured peak bucket target
    pub fn with_peak_buckets(peak_buckets: usize) -> Self {
        Self {
            track: None,
            is_loading: false,
            transport: Transport::default(),
            loop_points: LoopPoints::default(),
            mode: TapMode::default(),
            markers: Vec::new(),
            viewport: Viewport::default(),
            toast: None,
            peaks_ready: false,
            peak_buckets,
            next_marker_id: 1,
        }
    }

    /// Duration of the loaded track, or 0.0 when empty
    pub fn duration_secs(&self) -> f64 {
        self.track.as_ref().map(|t| t.duration_secs).unwrap_or(0.0)
    }

    /// Clamp a time value into the loaded track's range
    pub fn clamp_time(&self, secs: f64) -> f64 {
        secs.clamp(0.0, self.duration_secs().max(0.0))
    }

    /// Allocate the next session-unique marker id
    pub(crate) fn alloc_marker_id(&mut self) -> MarkerId {
        let id = MarkerId(self.next_marker_id);
        self.next_marker_id += 1;
        id
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}
