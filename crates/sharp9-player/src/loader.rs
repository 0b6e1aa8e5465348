//! Background track loader
//!
//! Decoding and resampling can take hundreds of milliseconds, so they run on
//! a dedicated thread; the session polls for results. Every request carries
//! the session's track generation so a result that arrives after the user
//! has already opened another file is recognized as stale and discarded.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use sharp9_engine::decode::decode_file;
use sharp9_engine::{LoadError, LoadedTrack};

/// Request to load a track in the background
#[derive(Debug)]
struct LoadRequest {
    generation: u64,
    path: PathBuf,
}

/// Result of a background load, tagged with its generation
pub struct LoadOutcome {
    pub generation: u64,
    pub result: Result<LoadedTrack, LoadError>,
}

/// Handle to the background loader thread
pub struct TrackLoader {
    tx: Sender<LoadRequest>,
    rx: Receiver<LoadOutcome>,
    target_sample_rate: Arc<AtomicU32>,
    _handle: JoinHandle<()>,
}

impl TrackLoader {
    /// Spawn the loader thread
    ///
    /// `target_sample_rate` is the engine's device rate; tracks are
    /// resampled to it at load time so playback never resamples.
    pub fn spawn(target_sample_rate: u32) -> Self {
        let (request_tx, request_rx) = std::sync::mpsc::channel::<LoadRequest>();
        let (result_tx, result_rx) = std::sync::mpsc::channel::<LoadOutcome>();

        let rate = Arc::new(AtomicU32::new(target_sample_rate));
        let rate_for_thread = rate.clone();

        let handle = thread::Builder::new()
            .name("track-loader".to_string())
            .spawn(move || loader_thread(request_rx, result_tx, rate_for_thread))
            .expect("spawn track loader thread");

        log::info!("track loader started (target {} Hz)", target_sample_rate);

        Self {
            tx: request_tx,
            rx: result_rx,
            target_sample_rate: rate,
            _handle: handle,
        }
    }

    /// Update the target sample rate if the device rate changes
    pub fn set_sample_rate(&self, sample_rate: u32) {
        self.target_sample_rate.store(sample_rate, Ordering::SeqCst);
    }

    /// Request a load (non-blocking)
    pub fn load(&self, generation: u64, path: PathBuf) -> Result<(), String> {
        self.tx
            .send(LoadRequest { generation, path })
            .map_err(|e| format!("loader thread disconnected: {e}"))
    }

    /// Poll for a finished load (non-blocking)
    pub fn try_recv(&self) -> Option<LoadOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::error!("loader thread disconnected unexpectedly");
                None
            }
        }
    }
}

fn loader_thread(
    rx: Receiver<LoadRequest>,
    tx: Sender<LoadOutcome>,
    target_sample_rate: Arc<AtomicU32>,
) {
    log::debug!("track loader thread started");

    while let Ok(request) = rx.recv() {
        let sample_rate = target_sample_rate.load(Ordering::SeqCst);
        let started = Instant::now();
        let result = decode_file(&request.path, sample_rate);

        match &result {
            Ok(track) => log::info!(
                "loaded {:?} ({:.1}s) in {:?}",
                request.path,
                track.duration_secs(),
                started.elapsed()
            ),
            Err(e) => log::error!("failed to load {:?}: {}", request.path, e),
        }

        let _ = tx.send(LoadOutcome {
            generation: request.generation,
            result,
        });
    }

    log::debug!("track loader thread shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn wait_for(loader: &TrackLoader) -> LoadOutcome {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(outcome) = loader.try_recv() {
                return outcome;
            }
            assert!(Instant::now() < deadline, "loader timed out");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_load_failure_reports_generation() {
        let loader = TrackLoader::spawn(48_000);
        loader.load(7, PathBuf::from("/no/such/file.wav")).unwrap();
        let outcome = wait_for(&loader);
        assert_eq!(outcome.generation, 7);
        assert!(outcome.result.is_err());
    }
}
