//! # Atome
//!
//! In-process audio unit with a WebView control surface.
//!
//! Atome either passes the host's input through or replaces it with a sine
//! test tone. Along the way it can mute, capture raw PCM to disk, and
//! publish a downsampled waveform with level metrics to the UI.
//!
//! ## Architecture
//!
//! ```text
//! AU host ──▶ atome-au (C-ABI) ──▶ RenderEngine ──▶ ReportingBridge
//!                                       ▲                  │
//!                                 ControlHandle      ReportDispatcher
//!                                       ▲                  │
//!                            atome-webview ◀── visualizationFrame
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use atome::prelude::*;
//!
//! let config = EngineConfig::new().with_sample_rate(48_000.0);
//! let Instance { mut engine, control, reports } = Instance::new(config.clone())?;
//! let dispatcher = ReportDispatcher::spawn(reports, config.report_poll_interval())?;
//!
//! control.set_mute(false);
//! control.start_test_tone(440.0);
//! // render thread: engine.render(RenderContext::new(sample_time), &mut buffer)
//! ```

// Re-export sub-crates
pub use atome_core as core;

#[cfg(feature = "au")]
pub use atome_au as au_impl;

#[cfg(feature = "webview")]
pub use atome_webview as webview;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use atome::prelude::*;
/// ```
pub mod prelude {
    pub use atome_core::{
        // Construction and configuration
        EngineConfig, Instance, LogLayout,
        // Render path
        AudioBuffer, PullInput, RenderContext, RenderEngine, Renderer,
        // Control
        ControlHandle, EngineStats, LogSummary,
        // Reporting
        Metrics, Registration, ReportDispatcher, ReportReceiver, VisualizationFrame,
        // Host context
        HostContext, MusicalContextSource, TempoSnapshot, TransportSnapshot,
        TransportStateSource,
        // Storage
        prepare_workspace, Workspace,
        // Error types
        ConfigError, LoggerError, RenderError, RenderResult, StorageError,
    };

    #[cfg(feature = "webview")]
    pub use atome_webview::{
        forward_visualization, AudioState, ControlBridge, UiCommand, WebViewHandle,
        WebViewHandler,
    };
}
