//! Core render engine for the Atome audio unit.
//!
//! This crate is format-agnostic: it knows nothing about Audio Unit blocks or
//! web views. A host wrapper builds an [`Instance`], drives its
//! [`RenderEngine`] from the audio thread, and hands the [`ControlHandle`] and
//! [`ReportReceiver`] to the UI side.
//!
//! ```text
//! host render callback ──► RenderEngine ──► ReportPublisher ─┐
//!                             ▲                              │ latest-wins
//!              atomics        │                              ▼
//! UI commands ──► ControlHandle              ReportDispatcher ──► listeners
//! ```
//!
//! Logging goes through the [`log`] facade only; the render thread itself
//! never logs.

pub mod bridge;
pub mod buffer;
pub mod clock;
pub mod config;
pub mod control;
pub mod dispatch;
pub mod engine;
mod error;
pub mod logger;
pub mod oscillator;
pub mod state;
pub mod storage;
pub mod transport;
pub mod visualization;

pub use bridge::{HostContextReader, ReportPublisher, ReportReceiver, ReportingBridge};
pub use buffer::AudioBuffer;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    EngineConfig, LogLayout, DEFAULT_SAMPLE_RATE, MAX_CHANNELS, MAX_FRAMES_PER_RENDER,
    MAX_LOG_QUEUE_SECONDS, MAX_REPORT_POLL_INTERVAL_MS, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE,
    VISUALIZATION_INTERVAL,
};
pub use control::ControlHandle;
pub use dispatch::{FrameListener, Registration, ReportDispatcher};
pub use engine::{Instance, PullInput, RenderContext, RenderEngine, Renderer};
pub use error::{ConfigError, LoggerError, RenderError, RenderResult, StorageError};
pub use logger::{DiagnosticLogger, LogSummary};
pub use oscillator::{Oscillator, TEST_TONE_AMPLITUDE};
pub use state::{EngineStats, RenderState};
pub use storage::{prepare_workspace, Workspace};
pub use transport::{
    HostContext, MusicalContextSource, TempoSnapshot, TransportProbe, TransportSnapshot,
    TransportStateFlags, TransportStateSource,
};
pub use visualization::{
    compute_metrics, extract, extract_into, Metrics, RateLimiter, VisualizationFrame,
    VISUALIZATION_RESOLUTION,
};
