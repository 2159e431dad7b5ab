//! Visualization extraction.
//!
//! Reduces one channel of a render buffer to a display envelope of at most
//! [`VISUALIZATION_RESOLUTION`] points, plus RMS, peak and zero-crossing
//! metrics over the full buffer.
//!
//! # Real-Time Safety
//!
//! [`VisualizationFrame::with_capacity`] reserves the envelope once. After that
//! [`extract_into`] only overwrites the frame in place and never allocates.

use serde::{Deserialize, Serialize};

/// Maximum number of points in a visualization envelope.
pub const VISUALIZATION_RESOLUTION: usize = 1024;

/// Scalar metrics computed over a whole buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    /// Root mean square, `sqrt(mean(x²))`.
    pub rms: f32,
    /// Largest absolute sample value.
    pub peak: f32,
    /// Adjacent sample pairs with a strict sign flip (`a * b < 0`).
    pub zero_crossings: u32,
}

/// Downsampled envelope and metrics for one render call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizationFrame {
    /// Averaged absolute amplitudes, `min(frames, 1024)` points.
    pub samples: Vec<f32>,
    /// Host sample time of the buffer, in seconds.
    pub timestamp_seconds: f64,
    pub metrics: Metrics,
}

impl VisualizationFrame {
    /// Empty frame with room for a full-resolution envelope.
    pub fn with_capacity() -> Self {
        Self {
            samples: Vec::with_capacity(VISUALIZATION_RESOLUTION),
            timestamp_seconds: 0.0,
            metrics: Metrics::default(),
        }
    }

    /// Overwrite `self` with `other` without reallocating.
    pub fn copy_from(&mut self, other: &VisualizationFrame) {
        self.samples.clear();
        self.samples.extend_from_slice(&other.samples);
        self.timestamp_seconds = other.timestamp_seconds;
        self.metrics = other.metrics;
    }
}

impl Default for VisualizationFrame {
    fn default() -> Self {
        Self::with_capacity()
    }
}

/// Compute RMS, peak and zero crossings of `samples`.
///
/// A pure function of its input: the same buffer always yields the same
/// metrics.
pub fn compute_metrics(samples: &[f32]) -> Metrics {
    if samples.is_empty() {
        return Metrics::default();
    }

    let mut sum_squares = 0.0f64;
    let mut peak = 0.0f32;
    for &sample in samples {
        sum_squares += f64::from(sample) * f64::from(sample);
        peak = peak.max(sample.abs());
    }

    let zero_crossings = samples
        .windows(2)
        .filter(|pair| is_sign_flip(pair[0], pair[1]))
        .count() as u32;

    Metrics {
        rms: (sum_squares / samples.len() as f64).sqrt() as f32,
        peak,
        zero_crossings,
    }
}

/// Strict sign change between adjacent samples. Zero belongs to neither side.
///
/// Compares signs rather than testing `a * b < 0`, which underflows to zero
/// for tiny samples.
#[inline]
fn is_sign_flip(a: f32, b: f32) -> bool {
    a != 0.0 && b != 0.0 && (a < 0.0) != (b < 0.0)
}

/// Fill `frame` from one channel of a render buffer.
///
/// The envelope has `min(len, 1024)` points. Point `i` is the mean absolute
/// value of the contiguous window `[i·len/points, (i+1)·len/points)`, so every
/// sample lands in exactly one window. For buffers of at most 1024 frames the
/// envelope is the absolute signal itself.
pub fn extract_into(
    frame: &mut VisualizationFrame,
    samples: &[f32],
    sample_time: f64,
    sample_rate: f64,
) {
    let len = samples.len();
    let points = len.min(VISUALIZATION_RESOLUTION);

    frame.samples.clear();
    for i in 0..points {
        let start = i * len / points;
        let end = (i + 1) * len / points;
        let window = &samples[start..end];
        let sum: f32 = window.iter().map(|s| s.abs()).sum();
        frame.samples.push(sum / window.len() as f32);
    }

    frame.timestamp_seconds = if sample_rate > 0.0 {
        sample_time / sample_rate
    } else {
        0.0
    };
    frame.metrics = compute_metrics(samples);
}

/// Allocating convenience wrapper around [`extract_into`].
pub fn extract(samples: &[f32], sample_time: f64, sample_rate: f64) -> VisualizationFrame {
    let mut frame = VisualizationFrame::with_capacity();
    extract_into(&mut frame, samples, sample_time, sample_rate);
    frame
}

// =============================================================================
// Rate limiting
// =============================================================================

/// Gate that opens at most once per `interval` seconds.
///
/// The first query always opens. The emission time is recorded before the
/// caller extracts, so comparisons stay monotonic even if extraction is slow.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    interval: f64,
    last_emission: Option<f64>,
}

impl RateLimiter {
    pub fn new(interval: f64) -> Self {
        Self {
            interval,
            last_emission: None,
        }
    }

    /// Returns `true` and records `now` if at least `interval` has elapsed.
    #[inline]
    pub fn should_emit(&mut self, now: f64) -> bool {
        match self.last_emission {
            Some(last) if now - last < self.interval => false,
            _ => {
                self.last_emission = Some(now);
                true
            }
        }
    }
}
