//! sharp9 — practice player
//!
//! Loads an audio file, then loops, slows down, and transposes it from a
//! small command shell. The audio engine runs on its own stream; this
//! process's main thread is the control loop that serializes every state
//! transition.

mod config;
mod loader;
mod session;
mod shell;

use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam::channel;

use sharp9_core::Action;
use sharp9_engine::{PeaksComputer, RealtimeEngine};

use loader::TrackLoader;
use session::Session;
use shell::{ShellInput, HELP_TEXT};

/// Control loop cadence; also the toast-expiry resolution
const PUMP_INTERVAL: Duration = Duration::from_millis(33);

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config_path = config::default_config_path();
    let config = config::load_config(&config_path);

    let engine = RealtimeEngine::start(Some(config.audio.buffer_frames))
        .context("failed to start the audio engine")?;
    let sample_rate = engine.sample_rate();

    let loader = TrackLoader::spawn(sample_rate);
    let peaks = PeaksComputer::spawn();
    let mut session = Session::new(engine, loader, peaks, config.practice.peak_buckets);

    println!("sharp9 practice player ({} Hz). Type 'help' for commands.", sample_rate);

    // Open a file straight away if one was given on the command line
    if let Some(path) = std::env::args().nth(1) {
        session.dispatch(Action::ImportPicked(path.into()));
    }

    let (tx, rx) = channel::unbounded();
    shell::spawn_reader(tx, config.practice.speed_step, config.practice.pitch_step);

    let mut last_toast: Option<String> = None;
    loop {
        match rx.recv_timeout(PUMP_INTERVAL) {
            Ok(ShellInput::Act(action)) => session.dispatch(action),
            Ok(ShellInput::Status) => print_status(&session),
            Ok(ShellInput::Help) => println!("{HELP_TEXT}"),
            Ok(ShellInput::Quit) => break,
            Err(channel::RecvTimeoutError::Timeout) => {}
            Err(channel::RecvTimeoutError::Disconnected) => break,
        }
        session.pump();

        // Surface each toast once, when it appears or changes
        let toast = session.state().toast.as_ref().map(|t| t.message.clone());
        if toast != last_toast {
            if let Some(message) = &toast {
                println!("* {message}");
            }
            last_toast = toast;
        }
    }

    log::info!("sharp9 shutting down");
    Ok(())
}

fn print_status<E: sharp9_engine::PracticeEngine>(session: &Session<E>) {
    let state = session.state();
    match &state.track {
        Some(track) => {
            println!(
                "{}  {:.1}s / {:.1}s  {}  speed {:.2}  pitch {:+.1}",
                track.name,
                state.transport.current_time_secs,
                track.duration_secs,
                if state.transport.is_playing { "playing" } else { "paused" },
                state.transport.speed,
                state.transport.pitch_semitones,
            );
        }
        None if state.is_loading => println!("loading..."),
        None => println!("no track loaded"),
    }
    println!(
        "loop: A={:?} B={:?} {}  mode: {:?}  peaks: {}",
        state.loop_points.a_secs,
        state.loop_points.b_secs,
        if state.loop_points.enabled { "on" } else { "off" },
        state.mode,
        if state.peaks_ready {
            session.peaks().map(|p| p.bucket_count()).unwrap_or(0).to_string()
        } else {
            "pending".to_string()
        },
    );
    for marker in &state.markers {
        println!("  marker {} @ {:.2}s", marker.id.0, marker.time_secs);
    }
}
