//! Lock-free rings between the control thread and the audio callback
//!
//! Commands flow control→audio, events flow audio→control. Both rings are
//! single-producer single-consumer, wait-free on both ends, and allocated
//! once at startup, so neither side can ever block the other.

use crate::track::LoadedTrack;

use super::EngineEvent;

/// Commands applied by the audio thread at frame boundaries
///
/// Positions are in frames at the engine sample rate; the control-side
/// wrapper converts from seconds.
pub enum EngineCommand {
    /// Swap in a decoded track
    ///
    /// Boxed: the command enum must stay pointer-sized for cache-efficient
    /// queueing, and a `LoadedTrack` carries a title string.
    InstallTrack(Box<LoadedTrack>),
    /// Drop the current track
    Unload,
    /// Start playback, optionally jumping first
    Play { from_frame: Option<u64> },
    /// Pause playback
    Pause,
    /// Move the playhead
    Seek { frame: u64 },
    /// Playback speed (pre-clamped to [0.25, 2.0])
    SetRate(f64),
    /// Pitch shift in cents (pre-clamped to ±1200)
    SetPitchCents(i32),
    /// Active loop region `[start, end)`, or `None` to disable
    SetLoop(Option<(u64, u64)>),
}

/// Capacity of the command ring
///
/// Commands are rare (human-scale interaction), so a small power of two is
/// plenty of headroom.
pub const COMMAND_QUEUE_CAPACITY: usize = 64;

/// Capacity of the event ring
///
/// Sized for several seconds of 30 Hz position reports in case the control
/// loop stalls; the audio thread drops events when the ring is full.
pub const EVENT_QUEUE_CAPACITY: usize = 256;

/// Create the control→audio command ring
pub fn command_channel() -> (rtrb::Producer<EngineCommand>, rtrb::Consumer<EngineCommand>) {
    rtrb::RingBuffer::new(COMMAND_QUEUE_CAPACITY)
}

/// Create the audio→control event ring
pub fn event_channel() -> (rtrb::Producer<EngineEvent>, rtrb::Consumer<EngineEvent>) {
    rtrb::RingBuffer::new(EVENT_QUEUE_CAPACITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_round_trip() {
        let (mut tx, mut rx) = command_channel();
        tx.push(EngineCommand::Play { from_frame: Some(42) }).ok().unwrap();
        let cmd = rx.pop().unwrap();
        assert!(matches!(cmd, EngineCommand::Play { from_frame: Some(42) }));
    }

    #[test]
    fn test_empty_ring() {
        let (_tx, mut rx) = command_channel();
        assert!(rx.pop().is_err());
    }

    #[test]
    fn test_command_size() {
        // Large payloads (the track) must be boxed so every variant stays
        // within a cache line.
        let size = std::mem::size_of::<EngineCommand>();
        assert!(size <= 32, "EngineCommand is {} bytes, expected <= 32", size);
    }

    #[test]
    fn test_event_round_trip() {
        let (mut tx, mut rx) = event_channel();
        tx.push(EngineEvent::Position(1.5)).unwrap();
        tx.push(EngineEvent::Ended).unwrap();
        assert_eq!(rx.pop().unwrap(), EngineEvent::Position(1.5));
        assert_eq!(rx.pop().unwrap(), EngineEvent::Ended);
    }
}
