//! State shared between the render thread and the control thread.
//!
//! Every field is an independent atomic. The render loop reads each one once
//! per call; no multi-field transaction is needed. Floating-point values are
//! stored as their bit patterns in `AtomicU64`.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

/// Control-visible render parameters.
#[derive(Debug)]
pub struct RenderState {
    muted: AtomicBool,
    test_tone_active: AtomicBool,
    test_tone_frequency: AtomicU64,
    /// Bumped by every `start_test_tone`; the render thread resets the
    /// oscillator phase when it sees a new value.
    tone_generation: AtomicU32,
}

impl RenderState {
    pub fn new(muted: bool, test_tone_frequency: f64) -> Self {
        Self {
            muted: AtomicBool::new(muted),
            test_tone_active: AtomicBool::new(false),
            test_tone_frequency: AtomicU64::new(test_tone_frequency.to_bits()),
            tone_generation: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Release);
    }

    /// Flip the mute flag atomically and return the new value.
    #[inline]
    pub fn toggle_muted(&self) -> bool {
        !self.muted.fetch_xor(true, Ordering::AcqRel)
    }

    #[inline]
    pub fn is_test_tone_active(&self) -> bool {
        self.test_tone_active.load(Ordering::Acquire)
    }

    #[inline]
    pub fn test_tone_frequency(&self) -> f64 {
        f64::from_bits(self.test_tone_frequency.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set_test_tone_frequency(&self, frequency: f64) {
        self.test_tone_frequency
            .store(frequency.to_bits(), Ordering::Release);
    }

    /// Activate the tone and request a phase reset.
    pub fn start_test_tone(&self, frequency: f64) {
        self.set_test_tone_frequency(frequency);
        self.tone_generation.fetch_add(1, Ordering::AcqRel);
        self.test_tone_active.store(true, Ordering::Release);
    }

    pub fn stop_test_tone(&self) {
        self.test_tone_active.store(false, Ordering::Release);
    }

    #[inline]
    pub fn tone_generation(&self) -> u32 {
        self.tone_generation.load(Ordering::Acquire)
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Counters for degraded-mode events. Written by the render thread with
/// relaxed increments.
#[derive(Debug, Default)]
pub struct EngineCounters {
    pub(crate) renders: AtomicU64,
    pub(crate) failed_renders: AtomicU64,
    pub(crate) no_connection: AtomicU64,
    pub(crate) frames_published: AtomicU64,
    pub(crate) frames_dropped: AtomicU64,
    pub(crate) host_queries_failed: AtomicU64,
}

impl EngineCounters {
    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn set(counter: &AtomicU64, value: u64) {
        counter.store(value, Ordering::Relaxed);
    }
}

/// Point-in-time copy of the engine counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Render calls that returned success.
    pub renders: u64,
    /// Render calls that returned an error (including `no_connection`).
    pub failed_renders: u64,
    /// Calls that failed because no upstream input was connected.
    pub no_connection: u64,
    /// Visualization frames handed to the bridge.
    pub frames_published: u64,
    /// Visualization frames dropped because the consumer held the slot.
    pub frames_dropped: u64,
    /// Host transport or musical-context queries that reported failure.
    pub host_queries_failed: u64,
    /// Render buffers the diagnostic logger could not queue.
    pub log_buffers_dropped: u64,
    /// Diagnostic log writes that failed on disk.
    pub log_write_errors: u64,
}

impl EngineCounters {
    pub(crate) fn snapshot(&self, log_buffers_dropped: u64, log_write_errors: u64) -> EngineStats {
        EngineStats {
            renders: self.renders.load(Ordering::Relaxed),
            failed_renders: self.failed_renders.load(Ordering::Relaxed),
            no_connection: self.no_connection.load(Ordering::Relaxed),
            frames_published: self.frames_published.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            host_queries_failed: self.host_queries_failed.load(Ordering::Relaxed),
            log_buffers_dropped,
            log_write_errors,
        }
    }
}
