//! Lock-free transport state
//!
//! Written by the audio thread after every rendered block, read by the
//! control thread without taking any lock. `Relaxed` ordering is enough:
//! only visibility matters, not ordering against other memory.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Transport state shared between the audio callback and the control thread
pub struct TransportAtomics {
    /// Playhead position in frames
    position: AtomicU64,
    /// Whether the transport is playing
    playing: AtomicBool,
}

impl TransportAtomics {
    pub fn new() -> Self {
        Self {
            position: AtomicU64::new(0),
            playing: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn position_frames(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn store_position(&self, frames: u64) {
        self.position.store(frames, Ordering::Relaxed);
    }

    #[inline]
    pub fn store_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Relaxed);
    }
}

impl Default for TransportAtomics {
    fn default() -> Self {
        Self::new()
    }
}
