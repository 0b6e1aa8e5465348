//! Minimal terminal front-end
//!
//! Stands in for the presentation layer: each typed command maps to one
//! core action, the same way a waveform tap or drag would after the
//! view-to-time conversion. Parsing is pure and tested; the reader thread
//! only forwards parsed input to the control loop.

use std::io::BufRead;
use std::path::PathBuf;
use std::thread;

use crossbeam::channel::Sender;

use sharp9_core::{Action, MarkerId, TapMode};

/// One line of user input, parsed
#[derive(Debug, Clone, PartialEq)]
pub enum ShellInput {
    Act(Action),
    Status,
    Help,
    Quit,
}

/// Spawn the stdin reader thread
///
/// Unparsable lines are reported on stderr and skipped; the channel closing
/// ends the program loop.
pub fn spawn_reader(tx: Sender<ShellInput>, speed_step: f64, pitch_step: f64) {
    thread::Builder::new()
        .name("shell-reader".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                match parse_line(&line, speed_step, pitch_step) {
                    Some(input) => {
                        let quit = input == ShellInput::Quit;
                        if tx.send(input).is_err() || quit {
                            break;
                        }
                    }
                    None => {
                        if !line.trim().is_empty() {
                            eprintln!("unrecognized command: {} (try 'help')", line.trim());
                        }
                    }
                }
            }
        })
        .expect("spawn shell reader thread");
}

/// Parse one input line into a shell input
pub fn parse_line(line: &str, speed_step: f64, pitch_step: f64) -> Option<ShellInput> {
    let mut parts = line.split_whitespace();
    let command = parts.next()?;
    let arg = parts.next();

    let action = match command {
        "open" => Action::ImportPicked(PathBuf::from(arg?)),
        "play" | "p" => Action::TogglePlay,
        "tap" => Action::TapSurface(arg?.parse().ok()?),
        "scrub" | "seek" => Action::DragScrub(arg?.parse().ok()?),
        "mode" => Action::SetMode(match arg? {
            "marker" | "m" => TapMode::Marker,
            "a" => TapMode::SetA,
            "b" => TapMode::SetB,
            "loop" | "l" => TapMode::Loop,
            _ => return None,
        }),
        "a" => Action::SetA(arg?.parse().ok()?),
        "b" => Action::SetB(arg?.parse().ok()?),
        "loop" => Action::ToggleLoopEnabled(match arg? {
            "on" => true,
            "off" => false,
            _ => return None,
        }),
        "speed" => Action::SpeedDelta(match arg? {
            "+" => speed_step,
            "-" => -speed_step,
            other => other.parse().ok()?,
        }),
        "pitch" => Action::PitchDelta(match arg? {
            "+" => pitch_step,
            "-" => -pitch_step,
            other => other.parse().ok()?,
        }),
        "mark" => Action::AddMarker(arg?.parse().ok()?),
        "unmark" => Action::DeleteMarker(MarkerId(arg?.parse().ok()?)),
        "status" | "s" => return Some(ShellInput::Status),
        "help" | "?" => return Some(ShellInput::Help),
        "quit" | "q" => return Some(ShellInput::Quit),
        _ => return None,
    };
    Some(ShellInput::Act(action))
}

/// Command reference printed by `help`
pub const HELP_TEXT: &str = "\
commands:
  open <path>      load an audio file
  play             toggle play/pause
  tap <secs>       tap the waveform (meaning depends on mode)
  scrub <secs>     drag the playhead
  mode <marker|a|b|loop>
  a <secs>         set loop point A
  b <secs>         set loop point B
  loop <on|off>    enable/disable the A-B loop
  speed <+|-|d>    adjust playback speed
  pitch <+|-|d>    adjust pitch in semitones
  mark <secs>      add a marker
  unmark <id>      delete a marker
  status           show transport, loop, and markers
  quit";
