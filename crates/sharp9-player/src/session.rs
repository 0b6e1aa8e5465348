//! The orchestrator
//!
//! `Session` is the single component with side-effect authority. It owns the
//! reducer state, the audio engine, the loader, and the peak worker; it runs
//! every action through the reducer on one thread and executes the returned
//! effects. Asynchronous outcomes (loads, peaks, engine events) are polled in
//! [`Session::pump`] and re-enter the same action path, so exactly one state
//! transition is ever in flight.
//!
//! The session also owns the waveform peaks cache, keyed by track
//! generation, so the reducer state never carries large arrays. Any async
//! outcome tagged with a stale generation is discarded silently.

use std::time::Instant;

use sharp9_core::{reduce, Action, Effect, State, Track};
use sharp9_engine::{
    EngineEvent, PeaksComputer, PeaksRequest, PracticeEngine, StereoBuffer, WaveformPeaks,
};

use basedrop::Shared;

use crate::loader::TrackLoader;

/// Frames of the live track, retained for handing to the peak worker
struct LiveFrames {
    frames: Shared<StereoBuffer>,
    sample_rate: u32,
}

/// The effect runner and action pump
pub struct Session<E: PracticeEngine> {
    state: State,
    engine: E,
    loader: TrackLoader,
    peaks: PeaksComputer,
    /// Monotonically increasing track generation; fences every async outcome
    generation: u64,
    live: Option<LiveFrames>,
    peaks_cache: Option<(u64, WaveformPeaks)>,
}

impl<E: PracticeEngine> Session<E> {
    pub fn new(engine: E, loader: TrackLoader, peaks: PeaksComputer, peak_buckets: usize) -> Self {
        Self {
            state: State::with_peak_buckets(peak_buckets),
            engine,
            loader,
            peaks,
            generation: 0,
            live: None,
            peaks_cache: None,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Peaks for the current track, if computed
    pub fn peaks(&self) -> Option<&WaveformPeaks> {
        self.peaks_cache
            .as_ref()
            .filter(|(generation, _)| *generation == self.generation)
            .map(|(_, peaks)| peaks)
    }

    /// Run one action through the reducer and execute its effects
    pub fn dispatch(&mut self, action: Action) {
        let effects = reduce(&mut self.state, action, Instant::now());
        for effect in effects {
            self.run_effect(effect);
        }
    }

    /// Poll every asynchronous collaborator and feed outcomes back as actions
    pub fn pump(&mut self) {
        // Finished loads
        while let Some(outcome) = self.loader.try_recv() {
            if outcome.generation != self.generation {
                log::debug!("discarding stale load result (gen {})", outcome.generation);
                continue;
            }
            match outcome.result {
                Ok(loaded) => {
                    let track = Track {
                        name: loaded.title.clone(),
                        duration_secs: loaded.duration_secs(),
                    };
                    self.live = Some(LiveFrames {
                        frames: loaded.frames.clone(),
                        sample_rate: loaded.sample_rate,
                    });
                    self.engine.install_track(loaded);
                    self.dispatch(Action::ImportSucceeded(track));
                }
                Err(e) => self.dispatch(Action::ImportFailed(e.to_string())),
            }
        }

        // Finished peak computations
        while let Some(outcome) = self.peaks.try_recv() {
            if outcome.generation != self.generation {
                log::debug!("discarding stale peaks result (gen {})", outcome.generation);
                continue;
            }
            match outcome.result {
                Ok(peaks) => {
                    self.peaks_cache = Some((outcome.generation, peaks));
                    self.dispatch(Action::PeaksComputed);
                }
                Err(e) => self.dispatch(Action::PeakComputationFailed(e.to_string())),
            }
        }

        // Engine events, marshaled here onto the control thread
        for event in self.engine.drain_events() {
            match event {
                EngineEvent::Position(secs) => self.dispatch(Action::Tick(secs)),
                EngineEvent::Ended => self.dispatch(Action::PlaybackEnded),
                EngineEvent::Fault => {
                    self.dispatch(Action::EngineFault("Audio stream error".into()))
                }
            }
        }

        // Toast expiry
        if self.state.toast.is_some() {
            self.dispatch(Action::ClearToastIfExpired);
        }
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::LoadTrack(path) => {
                self.generation += 1;
                // Cancel any in-flight analysis for the superseded track
                self.peaks.supersede(self.generation);
                self.live = None;
                self.peaks_cache = None;
                log::info!("loading {:?} (gen {})", path, self.generation);
                if let Err(e) = self.loader.load(self.generation, path) {
                    self.dispatch(Action::ImportFailed(e));
                }
            }
            Effect::Play { from_secs } => self.engine.play(Some(from_secs)),
            Effect::Pause => self.engine.pause(),
            Effect::Seek(secs) => self.engine.seek(secs),
            Effect::SetRate(rate) => self.engine.set_rate(rate),
            Effect::SetPitchSemitones(semitones) => self.engine.set_pitch_semitones(semitones),
            Effect::SetLoop {
                a_secs,
                b_secs,
                enabled,
            } => {
                let region = match (a_secs, b_secs) {
                    (Some(a), Some(b)) if enabled => Some((a, b)),
                    _ => None,
                };
                self.engine.set_loop(region);
            }
            Effect::ComputePeaks { target_buckets } => {
                let Some(live) = &self.live else {
                    log::warn!("peaks requested with no live track");
                    return;
                };
                let request = PeaksRequest {
                    generation: self.generation,
                    frames: live.frames.clone(),
                    sample_rate: live.sample_rate,
                    target_buckets,
                };
                if let Err(e) = self.peaks.compute(request) {
                    self.dispatch(Action::PeakComputationFailed(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use sharp9_core::TapMode;
    use sharp9_engine::LoadedTrack;

    /// Deterministic engine double that records every call
    #[derive(Default)]
    struct FakeEngine {
        calls: Vec<String>,
        queued_events: Vec<EngineEvent>,
    }

    impl PracticeEngine for FakeEngine {
        fn install_track(&mut self, track: LoadedTrack) {
            self.calls.push(format!("install:{}", track.title));
        }
        fn unload(&mut self) {
            self.calls.push("unload".into());
        }
        fn play(&mut self, from_secs: Option<f64>) {
            self.calls.push(format!("play:{:?}", from_secs));
        }
        fn pause(&mut self) {
            self.calls.push("pause".into());
        }
        fn seek(&mut self, secs: f64) {
            self.calls.push(format!("seek:{secs}"));
        }
        fn set_rate(&mut self, rate: f64) {
            self.calls.push(format!("rate:{rate}"));
        }
        fn set_pitch_semitones(&mut self, semitones: f64) {
            self.calls.push(format!("pitch:{semitones}"));
        }
        fn set_loop(&mut self, region: Option<(f64, f64)>) {
            self.calls.push(format!("loop:{:?}", region));
        }
        fn current_time_secs(&self) -> f64 {
            0.0
        }
        fn drain_events(&mut self) -> Vec<EngineEvent> {
            std::mem::take(&mut self.queued_events)
        }
    }

    fn test_session() -> Session<FakeEngine> {
        Session::new(
            FakeEngine::default(),
            TrackLoader::spawn(8000),
            PeaksComputer::spawn(),
            100,
        )
    }

    /// Write a one-second 8 kHz mono PCM WAV fixture
    fn write_fixture(path: &Path) {
        let samples: Vec<i16> = (0..8000)
            .map(|i| ((i as f32 * 0.05).sin() * 12000.0) as i16)
            .collect();
        let mut file = File::create(path).unwrap();
        let data_len = (samples.len() * 2) as u32;
        file.write_all(b"RIFF").unwrap();
        file.write_all(&(36 + data_len).to_le_bytes()).unwrap();
        file.write_all(b"WAVEfmt ").unwrap();
        file.write_all(&16u32.to_le_bytes()).unwrap();
        file.write_all(&1u16.to_le_bytes()).unwrap();
        file.write_all(&1u16.to_le_bytes()).unwrap();
        file.write_all(&8000u32.to_le_bytes()).unwrap();
        file.write_all(&16000u32.to_le_bytes()).unwrap();
        file.write_all(&2u16.to_le_bytes()).unwrap();
        file.write_all(&16u16.to_le_bytes()).unwrap();
        file.write_all(b"data").unwrap();
        file.write_all(&data_len.to_le_bytes()).unwrap();
        for s in &samples {
            file.write_all(&s.to_le_bytes()).unwrap();
        }
    }

    fn fixture_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("sharp9-session-{}-{}", std::process::id(), name))
    }

    /// Pump until `done` or the deadline passes
    fn pump_until<E: PracticeEngine>(session: &mut Session<E>, done: impl Fn(&Session<E>) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done(session) {
            assert!(Instant::now() < deadline, "session pump timed out");
            session.pump();
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_import_failure_round_trip() {
        let mut session = test_session();
        session.dispatch(Action::ImportPicked(PathBuf::from("/no/such/file.wav")));
        assert!(session.state().is_loading);
        assert_eq!(session.engine.calls, vec!["pause".to_string()]);

        pump_until(&mut session, |s| !s.state().is_loading);
        assert!(session.state().track.is_none());
        assert!(session.state().toast.is_some());
    }

    #[test]
    fn test_import_success_installs_track_and_computes_peaks() {
        let path = fixture_path("ok.wav");
        write_fixture(&path);

        let mut session = test_session();
        session.dispatch(Action::ImportPicked(path.clone()));
        pump_until(&mut session, |s| s.state().track.is_some());

        let track = session.state().track.clone().unwrap();
        assert!((track.duration_secs - 1.0).abs() < 0.01);
        assert!(session
            .engine
            .calls
            .iter()
            .any(|c| c.starts_with("install:")));

        pump_until(&mut session, |s| s.state().peaks_ready);
        let peaks = session.peaks().expect("peaks cached");
        assert_eq!(peaks.bucket_count(), 100);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_loop_enable_emits_engine_region_exactly_once() {
        let mut session = test_session();
        let now = Instant::now();
        // Install a track directly through the reducer path
        let effects = reduce(
            &mut session.state,
            Action::ImportSucceeded(Track {
                name: "riff".into(),
                duration_secs: 30.0,
            }),
            now,
        );
        drop(effects); // peaks effect not relevant here

        session.dispatch(Action::SetA(4.0));
        session.dispatch(Action::SetB(10.0));
        session.engine.calls.clear();

        session.dispatch(Action::ToggleLoopEnabled(true));
        assert_eq!(
            session.engine.calls,
            vec!["loop:Some((4.0, 10.0))".to_string()]
        );

        session.dispatch(Action::ToggleLoopEnabled(false));
        assert_eq!(session.engine.calls.last().unwrap(), "loop:None");
    }

    #[test]
    fn test_disabled_or_partial_loop_clears_engine_region() {
        let mut session = test_session();
        reduce(
            &mut session.state,
            Action::ImportSucceeded(Track {
                name: "riff".into(),
                duration_secs: 30.0,
            }),
            Instant::now(),
        );

        // A bound written while disabled syncs a cleared region
        session.dispatch(Action::SetA(4.0));
        assert_eq!(session.engine.calls.last().unwrap(), "loop:None");
    }

    #[test]
    fn test_engine_events_become_actions() {
        let mut session = test_session();
        reduce(
            &mut session.state,
            Action::ImportSucceeded(Track {
                name: "riff".into(),
                duration_secs: 30.0,
            }),
            Instant::now(),
        );
        session.dispatch(Action::TogglePlay);

        session.engine.queued_events = vec![
            EngineEvent::Position(12.5),
            EngineEvent::Ended,
        ];
        session.pump();

        assert!(!session.state().transport.is_playing);
        assert_eq!(session.state().transport.current_time_secs, 30.0);
    }

    #[test]
    fn test_engine_fault_stops_playback_with_toast() {
        let mut session = test_session();
        reduce(
            &mut session.state,
            Action::ImportSucceeded(Track {
                name: "riff".into(),
                duration_secs: 30.0,
            }),
            Instant::now(),
        );
        session.dispatch(Action::TogglePlay);
        session.engine.queued_events = vec![EngineEvent::Fault];
        session.pump();

        assert!(!session.state().transport.is_playing);
        assert_eq!(
            session.state().toast.as_ref().unwrap().message,
            "Audio stream error"
        );
    }

    #[test]
    fn test_stale_peaks_are_fenced_out() {
        let path_a = fixture_path("gen-a.wav");
        let path_b = fixture_path("gen-b.wav");
        write_fixture(&path_a);
        write_fixture(&path_b);

        let mut session = test_session();
        session.dispatch(Action::ImportPicked(path_a.clone()));
        // Supersede immediately: the first generation's outcomes must all be
        // discarded, whether or not they arrive
        session.dispatch(Action::ImportPicked(path_b.clone()));

        pump_until(&mut session, |s| s.state().peaks_ready);
        assert_eq!(session.generation, 2);
        assert!(session.peaks().is_some());
        assert!(session.state().track.as_ref().unwrap().name.ends_with("gen-b"));

        std::fs::remove_file(&path_a).ok();
        std::fs::remove_file(&path_b).ok();
    }

    #[test]
    fn test_transport_effects_reach_engine() {
        let mut session = test_session();
        reduce(
            &mut session.state,
            Action::ImportSucceeded(Track {
                name: "riff".into(),
                duration_secs: 30.0,
            }),
            Instant::now(),
        );
        session.engine.calls.clear();

        session.dispatch(Action::SetMode(TapMode::Loop));
        session.dispatch(Action::TapSurface(7.0));
        session.dispatch(Action::SpeedDelta(0.05));
        session.dispatch(Action::PitchDelta(-1.0));
        session.dispatch(Action::TogglePlay);

        assert_eq!(
            session.engine.calls,
            vec![
                "seek:7".to_string(),
                "rate:1.05".to_string(),
                "pitch:-1".to_string(),
                "play:Some(7.0)".to_string(),
            ]
        );
    }
}
