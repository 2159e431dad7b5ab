//! Error types for the render engine.
//!
//! Errors follow the three classes the engine distinguishes:
//!
//! - **Configuration** ([`ConfigError`]): the instance cannot be created.
//! - **Fatal per call** ([`RenderError`]): one render call fails, the buffer is
//!   left as the host handed it over, the next call may succeed.
//! - **Degraded**: logging, transport queries and UI delivery. These are never
//!   returned from a render call; they are counted in
//!   [`EngineStats`](crate::EngineStats) instead. [`LoggerError`] and
//!   [`StorageError`] only surface on the control thread.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Invalid engine configuration, detected at construction time.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Sample rate outside the supported range or not finite.
    #[error("unsupported sample rate {0} Hz")]
    UnsupportedSampleRate(f64),

    /// Channel count of zero or above `MAX_CHANNELS`.
    #[error("unsupported channel count {0}")]
    UnsupportedChannelCount(usize),

    /// Maximum frames per render call of zero or above `MAX_FRAMES_PER_RENDER`.
    #[error("invalid maximum frame count {0}")]
    InvalidMaxFrames(u32),

    /// Visualization interval shorter than 1/30 s (or not finite).
    #[error("visualization interval {0} s exceeds the 30 Hz reporting cap")]
    VisualizationRateTooHigh(f64),

    /// Visualization channel index outside the negotiated channel count.
    #[error("visualization channel {channel} out of range for {channels} channels")]
    InvalidVisualizationChannel { channel: usize, channels: usize },

    /// Test tone frequency that is not finite and positive.
    #[error("invalid test tone frequency {0} Hz")]
    InvalidTestToneFrequency(f64),

    /// Log queue length outside `(0, MAX_LOG_QUEUE_SECONDS]`.
    #[error("invalid log queue length {0} s")]
    InvalidLogQueue(f64),

    /// Report poll interval outside `1..=MAX_REPORT_POLL_INTERVAL_MS`.
    #[error("invalid report poll interval {0} ms")]
    InvalidPollInterval(u64),

    /// The configuration document could not be parsed.
    #[error("failed to parse engine configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failure of a single render call.
///
/// The buffer contents are unspecified only for [`RenderError::Upstream`]
/// (the host's pull function may have written into it). For every other
/// variant the buffer is untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RenderError {
    /// Pass-through requested but the host supplied no upstream input.
    #[error("no upstream connection")]
    NoConnection,

    /// The host's pull-input function returned a failure status.
    #[error("upstream pull failed with status {0}")]
    Upstream(i32),

    /// More frames than negotiated at construction.
    #[error("{frames} frames exceeds the negotiated maximum of {max}")]
    TooManyFrames { frames: usize, max: usize },

    /// Channel count differs from the negotiated format.
    #[error("buffer has {actual} channels, expected {expected}")]
    ChannelMismatch { expected: usize, actual: usize },
}

/// Result type for render calls.
pub type RenderResult = Result<(), RenderError>;

/// Failure opening or closing a diagnostic log session.
#[derive(Debug, Error)]
pub enum LoggerError {
    /// The log file could not be created or flushed.
    #[error("log file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The background writer thread could not be started.
    #[error("failed to start log writer: {0}")]
    Spawn(#[source] io::Error),

    /// The background writer thread panicked; the file may be incomplete.
    #[error("log writer for {0} panicked")]
    WriterPanicked(PathBuf),
}

/// Failure preparing the on-disk workspace.
#[derive(Debug, Error)]
#[error("workspace path {path}: {source}")]
pub struct StorageError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}
