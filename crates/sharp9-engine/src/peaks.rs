//! Background waveform peak computation
//!
//! Reduces a decoded track to a bucketed min/max amplitude summary for
//! visualization. Work runs on a dedicated worker thread, never on the
//! control thread or the audio callback. A newer request supersedes any
//! in-flight one: the worker checks a shared generation watermark between
//! chunks and abandons stale work; the orchestrator additionally fences
//! results by generation on receipt.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use basedrop::Shared;
use thiserror::Error;

use crate::types::StereoBuffer;

/// How many frames to scan between staleness checks
const CANCEL_CHECK_INTERVAL: usize = 65_536;

/// Bucketed min/max amplitude summary of one track
///
/// `min[i]`/`max[i]` are the extremes observed in the i-th of
/// `bucket_count()` equal time slices. Multi-channel audio is folded by
/// taking the extremum across channels.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformPeaks {
    pub min: Vec<f32>,
    pub max: Vec<f32>,
    pub duration_secs: f64,
}

impl WaveformPeaks {
    pub fn bucket_count(&self) -> usize {
        self.min.len()
    }
}

/// Peak computation failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PeaksError {
    #[error("Waveform analysis failed: track has no samples")]
    EmptyTrack,
    /// Superseded by a newer request; never surfaced to the user
    #[error("superseded by a newer request")]
    Superseded,
}

/// Request to analyze one track
pub struct PeaksRequest {
    /// Track generation, used for cancelation and fencing
    pub generation: u64,
    /// Decoded frames (shared with the engine, zero-copy)
    pub frames: Shared<StereoBuffer>,
    pub sample_rate: u32,
    pub target_buckets: usize,
}

/// Worker result, tagged with the request's generation
pub struct PeaksOutcome {
    pub generation: u64,
    pub result: Result<WaveformPeaks, PeaksError>,
}

/// Handle to the background peak worker
pub struct PeaksComputer {
    tx: Sender<PeaksRequest>,
    rx: Receiver<PeaksOutcome>,
    latest_generation: Arc<AtomicU64>,
    _handle: JoinHandle<()>,
}

impl PeaksComputer {
    /// Spawn the worker thread
    pub fn spawn() -> Self {
        let (request_tx, request_rx) = std::sync::mpsc::channel::<PeaksRequest>();
        let (result_tx, result_rx) = std::sync::mpsc::channel::<PeaksOutcome>();
        let latest_generation = Arc::new(AtomicU64::new(0));
        let watermark = latest_generation.clone();

        let handle = thread::Builder::new()
            .name("peaks-computer".to_string())
            .spawn(move || peaks_thread(request_rx, result_tx, watermark))
            .expect("spawn peaks computer thread");

        Self {
            tx: request_tx,
            rx: result_rx,
            latest_generation,
            _handle: handle,
        }
    }

    /// Submit a computation request (non-blocking)
    ///
    /// Also raises the cancelation watermark so any older in-flight
    /// computation aborts at its next check.
    pub fn compute(&self, request: PeaksRequest) -> Result<(), String> {
        self.latest_generation
            .fetch_max(request.generation, Ordering::SeqCst);
        self.tx
            .send(request)
            .map_err(|e| format!("peaks worker disconnected: {e}"))
    }

    /// Cancel any computation older than `generation` without submitting
    /// new work (used when a load begins before its peaks are requested)
    pub fn supersede(&self, generation: u64) {
        self.latest_generation.fetch_max(generation, Ordering::SeqCst);
    }

    /// Poll for a finished computation (non-blocking)
    pub fn try_recv(&self) -> Option<PeaksOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::error!("peaks worker disconnected unexpectedly");
                None
            }
        }
    }
}

fn peaks_thread(
    rx: Receiver<PeaksRequest>,
    tx: Sender<PeaksOutcome>,
    watermark: Arc<AtomicU64>,
) {
    log::debug!("peaks worker started");

    while let Ok(request) = rx.recv() {
        if watermark.load(Ordering::SeqCst) > request.generation {
            log::debug!("skipping superseded peaks request (gen {})", request.generation);
            continue;
        }

        let result = compute_peaks(
            &request.frames,
            request.sample_rate,
            request.target_buckets,
            &|| watermark.load(Ordering::SeqCst) > request.generation,
        );

        match result {
            Err(PeaksError::Superseded) => {
                log::debug!("abandoned superseded peaks computation (gen {})", request.generation);
            }
            other => {
                let _ = tx.send(PeaksOutcome {
                    generation: request.generation,
                    result: other,
                });
            }
        }
    }

    log::debug!("peaks worker shutting down");
}

/// Bucketed min/max reduction over the full track
///
/// `is_canceled` is polled every [`CANCEL_CHECK_INTERVAL`] frames.
pub fn compute_peaks(
    frames: &StereoBuffer,
    sample_rate: u32,
    target_buckets: usize,
    is_canceled: &dyn Fn() -> bool,
) -> Result<WaveformPeaks, PeaksError> {
    let total = frames.len();
    if total == 0 || target_buckets == 0 {
        return Err(PeaksError::EmptyTrack);
    }

    let mut min = vec![0.0f32; target_buckets];
    let mut max = vec![0.0f32; target_buckets];
    let data = frames.as_slice();

    let mut since_check = 0usize;
    for bucket in 0..target_buckets {
        // Integer bucket bounds over the full duration
        let start = bucket * total / target_buckets;
        let end = ((bucket + 1) * total / target_buckets).max(start + 1).min(total);

        let mut lo = f32::INFINITY;
        let mut hi = f32::NEG_INFINITY;
        for frame in &data[start..end] {
            // Extremum across channels
            lo = lo.min(frame.left.min(frame.right));
            hi = hi.max(frame.left.max(frame.right));
        }
        min[bucket] = if lo.is_finite() { lo } else { 0.0 };
        max[bucket] = if hi.is_finite() { hi } else { 0.0 };

        since_check += end - start;
        if since_check >= CANCEL_CHECK_INTERVAL {
            since_check = 0;
            if is_canceled() {
                return Err(PeaksError::Superseded);
            }
        }
    }

    Ok(WaveformPeaks {
        min,
        max,
        duration_secs: total as f64 / sample_rate as f64,
    })
}
