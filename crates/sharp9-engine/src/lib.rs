//! Real-time audio for the sharp9 practice player
//!
//! This crate implements the impure half of the practice core:
//!
//! - decoding arbitrary audio files into in-memory stereo buffers
//!   ([`decode`]), with RT-safe deferred deallocation ([`gc`])
//! - the real-time playback engine ([`engine`]): a cpal output stream whose
//!   callback owns the player core, fed by a lock-free command ring and
//!   reporting progress through a lock-free event ring
//! - independent tempo and pitch transformation ([`stretch`])
//! - the background waveform peak worker ([`peaks`])
//!
//! The control-side contract is the [`engine::PracticeEngine`] trait; the
//! orchestrator in `sharp9-player` is its only consumer.

pub mod decode;
pub mod engine;
pub mod error;
pub mod gc;
pub mod peaks;
pub mod stretch;
pub mod track;
pub mod types;

pub use engine::{EngineEvent, PracticeEngine, RealtimeEngine};
pub use error::{AudioError, AudioResult, LoadError};
pub use peaks::{PeaksComputer, PeaksOutcome, PeaksRequest, WaveformPeaks};
pub use track::LoadedTrack;
pub use types::{Sample, StereoBuffer, StereoSample};
