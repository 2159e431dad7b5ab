//! Engine configuration.
//!
//! The format is negotiated once, when the instance is created, and stays
//! fixed for its lifetime. Everything the render thread needs to size its
//! buffers (channel count, maximum frames, log queue) is derived from here.
//!
//! # Example
//!
//! ```ignore
//! use atome_core::EngineConfig;
//!
//! let config = EngineConfig::new()
//!     .with_sample_rate(48_000.0)
//!     .with_log_directory("/tmp/atome")
//!     .with_start_muted(false);
//! config.validate()?;
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// =============================================================================
// Limits
// =============================================================================

/// Default sample rate of the negotiated bus format.
pub const DEFAULT_SAMPLE_RATE: f64 = 44_100.0;

/// Default channel count of the negotiated bus format.
pub const DEFAULT_CHANNELS: usize = 2;

/// Default maximum frames per render call.
pub const DEFAULT_MAX_FRAMES: u32 = 4096;

/// Lowest supported sample rate.
pub const MIN_SAMPLE_RATE: f64 = 8_000.0;

/// Highest supported sample rate (384 kHz).
pub const MAX_SAMPLE_RATE: f64 = 384_000.0;

/// Maximum channels per bus.
pub const MAX_CHANNELS: usize = 32;

/// Upper bound for frames per render call.
pub const MAX_FRAMES_PER_RENDER: u32 = 8192;

/// Shortest interval between two visualization frames (30 Hz).
pub const VISUALIZATION_INTERVAL: f64 = 1.0 / 30.0;

/// Longest diagnostic log queue, in seconds of audio.
pub const MAX_LOG_QUEUE_SECONDS: f64 = 60.0;

/// Slowest report dispatcher poll period.
pub const MAX_REPORT_POLL_INTERVAL_MS: u64 = 1000;

/// Default test tone frequency.
pub const DEFAULT_TEST_TONE_FREQUENCY: f64 = 440.0;

// =============================================================================
// LogLayout
// =============================================================================

/// Sample order of the raw diagnostic dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLayout {
    /// Each render call appends channel 0's block, then channel 1's, and so on.
    #[default]
    PerChannelBlocks,
    /// Each render call appends frame-interleaved samples (L R L R ...).
    Interleaved,
}

// =============================================================================
// EngineConfig
// =============================================================================

/// Configuration for one engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate in Hz.
    pub sample_rate: f64,
    /// Channels per render buffer.
    pub channels: usize,
    /// Maximum frames the host may request per render call.
    pub max_frames: u32,
    /// Seconds between two visualization frames (at least 1/30 s).
    pub visualization_interval: f64,
    /// Channel the visualization extractor reads.
    pub visualization_channel: usize,
    /// Frequency used when a test tone is started without one.
    pub test_tone_frequency: f64,
    /// Whether the instance starts muted.
    pub start_muted: bool,
    /// Directory the diagnostic logger writes into.
    pub log_directory: PathBuf,
    /// Sample order of the diagnostic dump.
    pub log_layout: LogLayout,
    /// Seconds of audio the log queue can hold before buffers are dropped.
    pub log_queue_seconds: f64,
    /// Poll period of the report dispatcher in milliseconds.
    pub report_poll_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            max_frames: DEFAULT_MAX_FRAMES,
            visualization_interval: VISUALIZATION_INTERVAL,
            visualization_channel: 0,
            test_tone_frequency: DEFAULT_TEST_TONE_FREQUENCY,
            start_muted: true,
            log_directory: std::env::temp_dir(),
            log_layout: LogLayout::default(),
            log_queue_seconds: 2.0,
            report_poll_interval_ms: 16,
        }
    }
}

impl EngineConfig {
    /// Create the default configuration (stereo, 44.1 kHz).
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON configuration document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the sample rate.
    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Set the channel count.
    pub fn with_channels(mut self, channels: usize) -> Self {
        self.channels = channels;
        self
    }

    /// Set the maximum frames per render call.
    pub fn with_max_frames(mut self, max_frames: u32) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Set the interval between visualization frames.
    pub fn with_visualization_interval(mut self, seconds: f64) -> Self {
        self.visualization_interval = seconds;
        self
    }

    /// Set the channel the visualization extractor reads.
    pub fn with_visualization_channel(mut self, channel: usize) -> Self {
        self.visualization_channel = channel;
        self
    }

    /// Set the default test tone frequency.
    pub fn with_test_tone_frequency(mut self, frequency: f64) -> Self {
        self.test_tone_frequency = frequency;
        self
    }

    /// Set whether the instance starts muted.
    pub fn with_start_muted(mut self, muted: bool) -> Self {
        self.start_muted = muted;
        self
    }

    /// Set the diagnostic log directory.
    pub fn with_log_directory(mut self, directory: impl AsRef<Path>) -> Self {
        self.log_directory = directory.as_ref().to_path_buf();
        self
    }

    /// Set the diagnostic log layout.
    pub fn with_log_layout(mut self, layout: LogLayout) -> Self {
        self.log_layout = layout;
        self
    }

    /// Set the log queue length in seconds of audio.
    pub fn with_log_queue_seconds(mut self, seconds: f64) -> Self {
        self.log_queue_seconds = seconds;
        self
    }

    /// Set the report dispatcher poll period.
    pub fn with_report_poll_interval_ms(mut self, millis: u64) -> Self {
        self.report_poll_interval_ms = millis;
        self
    }

    /// Poll period of the report dispatcher.
    pub fn report_poll_interval(&self) -> Duration {
        Duration::from_millis(self.report_poll_interval_ms)
    }

    /// Capacity of the log queue in samples.
    ///
    /// Never smaller than one full render call, so a single buffer always fits
    /// into an empty queue.
    pub fn log_queue_capacity(&self) -> usize {
        let seconds = (self.sample_rate * self.log_queue_seconds).ceil() as usize;
        let one_call = self.max_frames as usize;
        seconds.max(one_call) * self.channels
    }

    /// Check the configuration against the engine's limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sample_rate.is_finite()
            || self.sample_rate < MIN_SAMPLE_RATE
            || self.sample_rate > MAX_SAMPLE_RATE
        {
            return Err(ConfigError::UnsupportedSampleRate(self.sample_rate));
        }
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(ConfigError::UnsupportedChannelCount(self.channels));
        }
        if self.max_frames == 0 || self.max_frames > MAX_FRAMES_PER_RENDER {
            return Err(ConfigError::InvalidMaxFrames(self.max_frames));
        }
        if !self.visualization_interval.is_finite()
            || self.visualization_interval < VISUALIZATION_INTERVAL
        {
            return Err(ConfigError::VisualizationRateTooHigh(
                self.visualization_interval,
            ));
        }
        if self.visualization_channel >= self.channels {
            return Err(ConfigError::InvalidVisualizationChannel {
                channel: self.visualization_channel,
                channels: self.channels,
            });
        }
        if !is_valid_frequency(self.test_tone_frequency) {
            return Err(ConfigError::InvalidTestToneFrequency(
                self.test_tone_frequency,
            ));
        }
        if !self.log_queue_seconds.is_finite()
            || self.log_queue_seconds <= 0.0
            || self.log_queue_seconds > MAX_LOG_QUEUE_SECONDS
        {
            return Err(ConfigError::InvalidLogQueue(self.log_queue_seconds));
        }
        if self.report_poll_interval_ms == 0
            || self.report_poll_interval_ms > MAX_REPORT_POLL_INTERVAL_MS
        {
            return Err(ConfigError::InvalidPollInterval(
                self.report_poll_interval_ms,
            ));
        }
        Ok(())
    }
}

/// Whether `frequency` can drive the test tone.
#[inline]
pub fn is_valid_frequency(frequency: f64) -> bool {
    frequency.is_finite() && frequency > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Instance;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sample_rate, 44_100.0);
        assert_eq!(config.channels, 2);
        assert!(config.start_muted);
    }

    #[test]
    fn test_rejects_unsupported_format() {
        let config = EngineConfig::new().with_channels(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnsupportedChannelCount(0))
        ));

        let config = EngineConfig::new().with_sample_rate(1_000_000.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnsupportedSampleRate(_))
        ));

        let config = EngineConfig::new().with_sample_rate(f64::NAN);
        assert!(config.validate().is_err());

        let config = EngineConfig::new().with_max_frames(MAX_FRAMES_PER_RENDER + 1);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMaxFrames(_))
        ));
    }

    #[test]
    fn test_rejects_visualization_faster_than_30hz() {
        let config = EngineConfig::new().with_visualization_interval(1.0 / 60.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::VisualizationRateTooHigh(_))
        ));

        let config = EngineConfig::new().with_visualization_interval(0.1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_visualization_channel_out_of_range() {
        let config = EngineConfig::new().with_visualization_channel(2);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidVisualizationChannel {
                channel: 2,
                channels: 2
            })
        ));
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config =
            EngineConfig::from_json(r#"{ "sample_rate": 48000.0, "log_layout": "interleaved" }"#)
                .unwrap();
        assert_eq!(config.sample_rate, 48_000.0);
        assert_eq!(config.channels, DEFAULT_CHANNELS);
        assert_eq!(config.log_layout, LogLayout::Interleaved);
    }

    #[test]
    fn test_from_json_validates() {
        assert!(matches!(
            EngineConfig::from_json(r#"{ "channels": 64 }"#),
            Err(ConfigError::UnsupportedChannelCount(64))
        ));
        assert!(matches!(
            EngineConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_log_queue_capacity_holds_one_call() {
        let config = EngineConfig::new()
            .with_log_queue_seconds(0.001)
            .with_max_frames(4096);
        assert!(config.log_queue_capacity() >= 4096 * 2);

        let config = EngineConfig::new();
        assert_eq!(config.log_queue_capacity(), 88_200 * 2);
    }

    #[test]
    fn test_rejects_oversized_log_queue() {
        let config = EngineConfig::new().with_log_queue_seconds(1e10);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLogQueue(_))
        ));
        assert!(Instance::new(config).is_err());

        let config = EngineConfig::new().with_log_queue_seconds(MAX_LOG_QUEUE_SECONDS);
        assert!(config.validate().is_ok());
        // 60 s at the highest rate and channel count stays well below 4 GiB.
        let config = config
            .with_sample_rate(MAX_SAMPLE_RATE)
            .with_channels(MAX_CHANNELS);
        assert!(config.validate().is_ok());
        assert!(config.log_queue_capacity() * 4 < 4 << 30);

        for seconds in [0.0, -1.0, f64::INFINITY, f64::NAN] {
            let config = EngineConfig::new().with_log_queue_seconds(seconds);
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidLogQueue(_))
            ));
        }
    }

    #[test]
    fn test_rejects_out_of_range_poll_interval() {
        for millis in [0, MAX_REPORT_POLL_INTERVAL_MS + 1, u64::MAX] {
            let config = EngineConfig::new().with_report_poll_interval_ms(millis);
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidPollInterval(m)) if m == millis
            ));
        }
        let config = EngineConfig::new().with_report_poll_interval_ms(MAX_REPORT_POLL_INTERVAL_MS);
        assert!(config.validate().is_ok());
    }
}
