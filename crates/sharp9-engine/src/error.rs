//! Engine error types

use thiserror::Error;

/// Errors from loading and decoding an audio source
///
/// These are surfaced to the user as an `ImportFailed` action; none of them
/// is fatal to the engine.
#[derive(Error, Debug, Clone)]
pub enum LoadError {
    /// File missing or unreadable
    #[error("Unable to open file: {0}")]
    Unreadable(String),

    /// Container or codec not supported
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// Container has no decodable audio track
    #[error("No audio track in file")]
    NoAudioTrack,

    /// Decoder gave up mid-stream
    #[error("Decode failed: {0}")]
    Decode(String),

    /// File decoded to zero frames
    #[error("File contains no audio")]
    Empty,
}

/// Errors from the audio output backend
#[derive(Error, Debug)]
pub enum AudioError {
    /// No usable output device
    #[error("No audio output device found")]
    NoDevice,

    /// Failed to query or negotiate a device configuration
    #[error("Failed to get device config: {0}")]
    ConfigError(String),

    /// Failed to build the output stream
    #[error("Failed to build audio stream: {0}")]
    StreamBuildError(String),

    /// Failed to start the output stream
    #[error("Failed to start audio stream: {0}")]
    StreamPlayError(String),
}

/// Result type for audio backend operations
pub type AudioResult<T> = Result<T, AudioError>;
