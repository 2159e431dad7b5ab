//! Control-thread handle to a running engine.
//!
//! Mute and test-tone commands only touch atomics and take effect on the next
//! render call. Logging commands open or close files and may block briefly,
//! so they must not be issued from the render thread.

use std::path::PathBuf;
use std::sync::Arc;

use crate::bridge::HostContextReader;
use crate::config::is_valid_frequency;
use crate::error::LoggerError;
use crate::logger::{DiagnosticLogger, LogSummary};
use crate::state::{EngineCounters, EngineStats, RenderState};
use crate::transport::HostContext;

/// Clonable handle for the UI/control layer.
#[derive(Clone)]
pub struct ControlHandle {
    state: Arc<RenderState>,
    counters: Arc<EngineCounters>,
    logger: Arc<DiagnosticLogger>,
    host_context: HostContextReader,
}

impl ControlHandle {
    pub(crate) fn new(
        state: Arc<RenderState>,
        counters: Arc<EngineCounters>,
        logger: Arc<DiagnosticLogger>,
        host_context: HostContextReader,
    ) -> Self {
        Self {
            state,
            counters,
            logger,
            host_context,
        }
    }

    // =========================================================================
    // Mute
    // =========================================================================

    pub fn set_mute(&self, muted: bool) {
        self.state.set_muted(muted);
    }

    /// Flip the mute state and return the new value.
    pub fn toggle_mute(&self) -> bool {
        self.state.toggle_muted()
    }

    pub fn is_muted(&self) -> bool {
        self.state.is_muted()
    }

    // =========================================================================
    // Test tone
    // =========================================================================

    /// Switch to the test tone at `frequency`, restarting its phase at zero.
    ///
    /// A frequency that is not finite and positive is ignored.
    pub fn start_test_tone(&self, frequency: f64) {
        if !is_valid_frequency(frequency) {
            log::warn!("ignoring test tone start at invalid frequency {}", frequency);
            return;
        }
        self.state.start_test_tone(frequency);
    }

    /// Return to pass-through.
    pub fn stop_test_tone(&self) {
        self.state.stop_test_tone();
    }

    /// Change the test tone frequency without resetting its phase.
    ///
    /// Also applies while the tone is stopped; the next start uses it unless
    /// given a frequency of its own.
    pub fn set_test_frequency(&self, frequency: f64) {
        if !is_valid_frequency(frequency) {
            log::warn!("ignoring invalid test tone frequency {}", frequency);
            return;
        }
        self.state.set_test_tone_frequency(frequency);
    }

    pub fn is_test_active(&self) -> bool {
        self.state.is_test_tone_active()
    }

    pub fn current_test_frequency(&self) -> f64 {
        self.state.test_tone_frequency()
    }

    /// Apply a play/stop request from the control surface.
    pub fn handle_test_tone_state(&self, is_playing: bool, frequency: f64) {
        if is_playing {
            self.start_test_tone(frequency);
        } else {
            self.stop_test_tone();
        }
    }

    // =========================================================================
    // Logging
    // =========================================================================

    /// Open a new capture file, closing the current one first.
    pub fn enable_logging(&self) -> Result<PathBuf, LoggerError> {
        self.logger.enable()
    }

    /// Close the current capture file.
    pub fn disable_logging(&self) -> Result<Option<LogSummary>, LoggerError> {
        self.logger.disable()
    }

    /// Enable or disable capture.
    ///
    /// Enabling while already enabled keeps the current file.
    pub fn set_logging(&self, enabled: bool) -> Result<(), LoggerError> {
        match (enabled, self.logger.is_enabled()) {
            (true, false) => self.enable_logging().map(|_| ()),
            (false, true) => self.disable_logging().map(|_| ()),
            _ => Ok(()),
        }
    }

    pub fn is_logging(&self) -> bool {
        self.logger.is_enabled()
    }

    /// File of the open capture session.
    pub fn log_path(&self) -> Option<PathBuf> {
        self.logger.current_path()
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Transport and tempo as of the last render call.
    pub fn host_context(&self) -> HostContext {
        self.host_context.get()
    }

    /// Degraded-mode counters.
    pub fn stats(&self) -> EngineStats {
        self.counters
            .snapshot(self.logger.buffers_dropped(), self.logger.write_errors())
    }
}

impl std::fmt::Debug for ControlHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlHandle")
            .field("muted", &self.is_muted())
            .field("test_active", &self.is_test_active())
            .field("test_frequency", &self.current_test_frequency())
            .field("logging", &self.is_logging())
            .finish()
    }
}
