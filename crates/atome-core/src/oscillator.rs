//! Phase-continuous sine test tone.
//!
//! The phase advances *before* each sample is computed and wraps at 2π, so
//! the first sample after `start` is `sin(2π·f/sr)·A`, not `sin(0)`.
//! Changing the frequency keeps the phase; only `start` resets it.

use std::f64::consts::TAU;

/// Peak amplitude of the test tone.
pub const TEST_TONE_AMPLITUDE: f64 = 0.5;

/// Sine generator owned by the render thread.
#[derive(Debug, Clone)]
pub struct Oscillator {
    phase: f64,
    frequency: f64,
    active: bool,
}

impl Oscillator {
    /// Create an inactive oscillator at `frequency`.
    pub fn new(frequency: f64) -> Self {
        Self {
            phase: 0.0,
            frequency,
            active: false,
        }
    }

    /// Start the tone at `frequency` with the phase reset to zero.
    pub fn start(&mut self, frequency: f64) {
        self.frequency = frequency;
        self.phase = 0.0;
        self.active = true;
    }

    /// Stop the tone. Phase and frequency are kept.
    pub fn stop(&mut self) {
        self.active = false;
    }

    /// Change the frequency without touching the phase.
    pub fn set_frequency(&mut self, frequency: f64) {
        self.frequency = frequency;
    }

    /// Whether the tone is running.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Current phase in radians, always in `[0, 2π)`.
    #[inline]
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Advance the phase by one sample and return the new sample.
    #[inline]
    pub fn next_sample(&mut self, sample_rate: f64) -> f32 {
        self.phase += TAU * self.frequency / sample_rate;
        if self.phase >= TAU {
            self.phase %= TAU;
        }
        (self.phase.sin() * TEST_TONE_AMPLITUDE) as f32
    }

    /// Overwrite `out` with consecutive samples.
    pub fn fill(&mut self, out: &mut [f32], sample_rate: f64) {
        for sample in out.iter_mut() {
            *sample = self.next_sample(sample_rate);
        }
    }

    /// Produce `frames` samples at `frequency`, continuing from the current phase.
    ///
    /// Allocates; meant for control-thread use and tests, not for rendering.
    pub fn advance(&mut self, frequency: f64, sample_rate: f64, frames: usize) -> Vec<f32> {
        self.frequency = frequency;
        let mut out = vec![0.0; frames];
        self.fill(&mut out, sample_rate);
        out
    }
}
