//! The render engine.
//!
//! One render call runs these steps in order:
//!
//! 1. Source: synthesize the test tone into every channel, or pull upstream
//!    input. With neither available the call fails with
//!    [`RenderError::NoConnection`] and the buffer is left untouched.
//! 2. Logging: queue the buffer for the diagnostic logger if enabled.
//! 3. Visualization: if the rate limiter allows, extract a frame and publish
//!    it through the reporting bridge.
//! 4. Mute: zero the buffer. Applied last among the audio steps so it always
//!    wins.
//! 5. Probe: query host transport and musical context and publish them.
//!
//! Only step 1 can fail the call. Everything after it is best-effort and
//! counted in [`EngineStats`](crate::EngineStats) when degraded.
//!
//! # Real-Time Safety
//!
//! `render` never allocates, never takes a blocking lock and never performs
//! I/O. All buffers it writes to are reserved in [`Instance::new`].

use std::sync::Arc;

use crate::bridge::{ReportPublisher, ReportReceiver, ReportingBridge};
use crate::buffer::AudioBuffer;
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::control::ControlHandle;
use crate::error::{ConfigError, RenderError, RenderResult};
use crate::logger::DiagnosticLogger;
use crate::oscillator::Oscillator;
use crate::state::{EngineCounters, RenderState};
use crate::transport::{MusicalContextSource, TransportProbe, TransportStateSource};
use crate::visualization::{extract_into, RateLimiter, VisualizationFrame};

// =============================================================================
// Host collaborators
// =============================================================================

/// Host-supplied upstream input.
///
/// Fills `buffer` with the upstream signal for this render call. On failure
/// returns the host's status code.
pub trait PullInput {
    fn pull(&mut self, sample_time: f64, buffer: &mut AudioBuffer<'_, '_>) -> Result<(), i32>;
}

impl<F> PullInput for F
where
    F: FnMut(f64, &mut AudioBuffer<'_, '_>) -> Result<(), i32>,
{
    #[inline]
    fn pull(&mut self, sample_time: f64, buffer: &mut AudioBuffer<'_, '_>) -> Result<(), i32> {
        self(sample_time, buffer)
    }
}

/// Per-call inputs from the host. Nothing in here outlives the call.
#[derive(Default)]
pub struct RenderContext<'h> {
    /// Host sample time of the buffer's first frame.
    pub sample_time: f64,
    pub pull_input: Option<&'h mut dyn PullInput>,
    pub transport_state: Option<&'h dyn TransportStateSource>,
    pub musical_context: Option<&'h dyn MusicalContextSource>,
}

impl<'h> RenderContext<'h> {
    pub fn new(sample_time: f64) -> Self {
        Self {
            sample_time,
            ..Default::default()
        }
    }

    pub fn with_pull_input(mut self, input: &'h mut dyn PullInput) -> Self {
        self.pull_input = Some(input);
        self
    }

    pub fn with_transport_state(mut self, source: &'h dyn TransportStateSource) -> Self {
        self.transport_state = Some(source);
        self
    }

    pub fn with_musical_context(mut self, source: &'h dyn MusicalContextSource) -> Self {
        self.musical_context = Some(source);
        self
    }
}

/// Anything the host can drive once per buffer.
pub trait Renderer {
    /// Fill `buffer` for one render call.
    fn render(&mut self, context: RenderContext<'_>, buffer: &mut AudioBuffer<'_, '_>)
        -> RenderResult;
}

// =============================================================================
// RenderEngine
// =============================================================================

/// Render-thread half of an instance. Owns its state outright; the control
/// side only shares the atomics.
pub struct RenderEngine {
    sample_rate: f64,
    channels: usize,
    max_frames: usize,
    visualization_channel: usize,

    state: Arc<RenderState>,
    counters: Arc<EngineCounters>,
    logger: Arc<DiagnosticLogger>,
    publisher: ReportPublisher,

    oscillator: Oscillator,
    tone_generation: u32,
    limiter: RateLimiter,
    clock: Box<dyn Clock>,
    frame: VisualizationFrame,
    probe: TransportProbe,
}

impl RenderEngine {
    /// Sample rate of the negotiated format.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Channel count of the negotiated format.
    pub fn channel_count(&self) -> usize {
        self.channels
    }

    /// Largest frame count a render call may carry.
    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    /// Bring the oscillator in line with the control state.
    ///
    /// A new tone generation means `start_test_tone` ran since the last call,
    /// so the phase restarts. Otherwise only the frequency follows.
    fn sync_oscillator(&mut self) -> bool {
        if !self.state.is_test_tone_active() {
            self.oscillator.stop();
            return false;
        }
        let frequency = self.state.test_tone_frequency();
        let generation = self.state.tone_generation();
        if generation != self.tone_generation || !self.oscillator.is_active() {
            self.tone_generation = generation;
            self.oscillator.start(frequency);
        } else {
            self.oscillator.set_frequency(frequency);
        }
        true
    }

    fn fail(&self, error: RenderError) -> RenderResult {
        EngineCounters::bump(&self.counters.failed_renders);
        if error == RenderError::NoConnection {
            EngineCounters::bump(&self.counters.no_connection);
        }
        Err(error)
    }
}

impl Renderer for RenderEngine {
    fn render(
        &mut self,
        context: RenderContext<'_>,
        buffer: &mut AudioBuffer<'_, '_>,
    ) -> RenderResult {
        if buffer.channel_count() != self.channels {
            return self.fail(RenderError::ChannelMismatch {
                expected: self.channels,
                actual: buffer.channel_count(),
            });
        }
        if buffer.frames() > self.max_frames {
            return self.fail(RenderError::TooManyFrames {
                frames: buffer.frames(),
                max: self.max_frames,
            });
        }

        // 1. Source
        if self.sync_oscillator() {
            if let Some(first) = buffer.channel_mut(0) {
                self.oscillator.fill(first, self.sample_rate);
            }
            buffer.copy_first_to_rest();
        } else {
            let Some(input) = context.pull_input else {
                return self.fail(RenderError::NoConnection);
            };
            if let Err(status) = input.pull(context.sample_time, buffer) {
                return self.fail(RenderError::Upstream(status));
            }
        }

        // 2. Logging
        if self.logger.is_enabled() {
            self.logger.append(buffer);
        }

        // 3. Visualization
        if self.limiter.should_emit(self.clock.now()) {
            if let Some(channel) = buffer.channel(self.visualization_channel) {
                extract_into(
                    &mut self.frame,
                    channel,
                    context.sample_time,
                    self.sample_rate,
                );
                if self.publisher.publish_frame(&self.frame) {
                    EngineCounters::bump(&self.counters.frames_published);
                } else {
                    EngineCounters::bump(&self.counters.frames_dropped);
                }
            }
        }

        // 4. Mute
        if self.state.is_muted() {
            buffer.fill(0.0);
        }

        // 5. Probe
        let host = self.probe.probe(
            context.sample_time,
            context.transport_state,
            context.musical_context,
        );
        self.publisher.publish_host_context(host);
        EngineCounters::set(&self.counters.host_queries_failed, self.probe.failures());

        EngineCounters::bump(&self.counters.renders);
        Ok(())
    }
}

// =============================================================================
// Instance
// =============================================================================

/// A freshly constructed engine with its control and reporting ends.
///
/// The three parts are created together and wired to each other; there is no
/// process-wide state.
pub struct Instance {
    /// Hand to the render thread.
    pub engine: RenderEngine,
    /// Hand to the UI/control layer.
    pub control: ControlHandle,
    /// Hand to a consumer thread, usually via
    /// [`ReportDispatcher::spawn`](crate::ReportDispatcher::spawn).
    pub reports: ReportReceiver,
}

impl Instance {
    /// Build an instance on the system clock.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, SystemClock::new())
    }

    /// Build an instance with a custom rate-limit clock.
    pub fn with_clock(
        config: EngineConfig,
        clock: impl Clock + 'static,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let state = Arc::new(RenderState::new(
            config.start_muted,
            config.test_tone_frequency,
        ));
        let counters = Arc::new(EngineCounters::default());
        let logger = Arc::new(DiagnosticLogger::new(
            &config.log_directory,
            config.log_layout,
            config.log_queue_capacity(),
        ));
        let (publisher, reports) = ReportingBridge::channel();

        let control = ControlHandle::new(
            Arc::clone(&state),
            Arc::clone(&counters),
            Arc::clone(&logger),
            reports.host_context_reader(),
        );

        let engine = RenderEngine {
            sample_rate: config.sample_rate,
            channels: config.channels,
            max_frames: config.max_frames as usize,
            visualization_channel: config.visualization_channel,
            state,
            counters,
            logger,
            publisher,
            oscillator: Oscillator::new(config.test_tone_frequency),
            tone_generation: 0,
            limiter: RateLimiter::new(config.visualization_interval),
            clock: Box::new(clock),
            frame: VisualizationFrame::with_capacity(),
            probe: TransportProbe::new(),
        };

        log::debug!(
            "engine created: {} Hz, {} channels, max {} frames",
            config.sample_rate,
            config.channels,
            config.max_frames
        );

        Ok(Self {
            engine,
            control,
            reports,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::LogLayout;
    use crate::transport::{TempoSnapshot, TransportSnapshot, TransportStateFlags};
    use crate::visualization::compute_metrics;
    use approx::assert_relative_eq;
    use std::f64::consts::TAU;
    use tempfile::TempDir;

    const SAMPLE_RATE: f64 = 44_100.0;
    const FRAMES: usize = 512;

    /// Upstream source producing a constant value.
    struct ConstantInput(f32);

    impl PullInput for ConstantInput {
        fn pull(&mut self, _: f64, buffer: &mut AudioBuffer<'_, '_>) -> Result<(), i32> {
            buffer.fill(self.0);
            Ok(())
        }
    }

    struct FailingInput(i32);

    impl PullInput for FailingInput {
        fn pull(&mut self, _: f64, _: &mut AudioBuffer<'_, '_>) -> Result<(), i32> {
            Err(self.0)
        }
    }

    fn instance(dir: &TempDir) -> (Instance, ManualClock) {
        let clock = ManualClock::new(0.0);
        let config = EngineConfig::new()
            .with_log_directory(dir.path())
            .with_start_muted(false);
        let instance = Instance::with_clock(config, clock.clone()).unwrap();
        (instance, clock)
    }

    /// Render one stereo buffer, returning the status and both channels.
    fn render_once(
        engine: &mut RenderEngine,
        context: RenderContext<'_>,
        initial: f32,
    ) -> (RenderResult, Vec<f32>, Vec<f32>) {
        let mut left = vec![initial; FRAMES];
        let mut right = vec![initial; FRAMES];
        let result = {
            let mut channels: [&mut [f32]; 2] = [&mut left, &mut right];
            let mut buffer = AudioBuffer::new(&mut channels);
            engine.render(context, &mut buffer)
        };
        (result, left, right)
    }

    #[test]
    fn test_instance_starts_muted_by_default() {
        let instance = Instance::new(EngineConfig::new()).unwrap();
        assert!(instance.control.is_muted());
        assert!(!instance.control.is_test_active());
        assert_eq!(instance.control.current_test_frequency(), 440.0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = Instance::new(EngineConfig::new().with_channels(0));
        assert!(matches!(
            result,
            Err(ConfigError::UnsupportedChannelCount(0))
        ));
    }

    #[test]
    fn test_no_connection_leaves_buffer_untouched() {
        let dir = TempDir::new().unwrap();
        let (mut instance, _clock) = instance(&dir);
        instance.control.set_mute(true);

        let (result, left, right) =
            render_once(&mut instance.engine, RenderContext::new(0.0), 0.75);

        assert_eq!(result, Err(RenderError::NoConnection));
        assert!(left.iter().chain(right.iter()).all(|&s| s == 0.75));
        let stats = instance.control.stats();
        assert_eq!(stats.no_connection, 1);
        assert_eq!(stats.renders, 0);
    }

    #[test]
    fn test_upstream_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let (mut instance, _clock) = instance(&dir);
        let mut input = FailingInput(-50);
        let context = RenderContext::new(0.0).with_pull_input(&mut input);
        let (result, _, _) = render_once(&mut instance.engine, context, 0.0);
        assert_eq!(result, Err(RenderError::Upstream(-50)));
    }

    #[test]
    fn test_passthrough_forwards_input() {
        let dir = TempDir::new().unwrap();
        let (mut instance, _clock) = instance(&dir);
        let mut input = ConstantInput(0.25);
        let context = RenderContext::new(0.0).with_pull_input(&mut input);
        let (result, left, right) = render_once(&mut instance.engine, context, 0.0);
        assert!(result.is_ok());
        assert!(left.iter().chain(right.iter()).all(|&s| s == 0.25));
    }

    #[test]
    fn test_format_mismatch_fails_call_only() {
        let dir = TempDir::new().unwrap();
        let (mut instance, _clock) = instance(&dir);
        let mut mono = vec![0.5f32; FRAMES];
        let mut channels: [&mut [f32]; 1] = [&mut mono];
        let mut buffer = AudioBuffer::new(&mut channels);
        let result = instance.engine.render(RenderContext::new(0.0), &mut buffer);
        assert_eq!(
            result,
            Err(RenderError::ChannelMismatch {
                expected: 2,
                actual: 1
            })
        );

        let mut left = vec![0.0f32; 8192];
        let mut right = vec![0.0f32; 8192];
        let mut channels: [&mut [f32]; 2] = [&mut left, &mut right];
        let mut buffer = AudioBuffer::new(&mut channels);
        let result = instance.engine.render(RenderContext::new(0.0), &mut buffer);
        assert!(matches!(result, Err(RenderError::TooManyFrames { .. })));

        instance.control.start_test_tone(440.0);
        let (result, _, _) = render_once(&mut instance.engine, RenderContext::new(0.0), 0.0);
        assert!(result.is_ok());
    }

    #[test]
    fn test_mute_dominates_every_source() {
        let dir = TempDir::new().unwrap();
        let (mut instance, _clock) = instance(&dir);
        instance.control.set_mute(true);
        instance.control.set_mute(true);

        let mut input = ConstantInput(0.9);
        let context = RenderContext::new(0.0).with_pull_input(&mut input);
        let (_, left, right) = render_once(&mut instance.engine, context, 0.0);
        assert!(left.iter().chain(right.iter()).all(|&s| s == 0.0));

        instance.control.start_test_tone(440.0);
        let (_, left, right) = render_once(&mut instance.engine, RenderContext::new(0.0), 0.3);
        assert!(left.iter().chain(right.iter()).all(|&s| s == 0.0));
    }

    #[test]
    fn test_toggle_mute_twice_restores_state() {
        let dir = TempDir::new().unwrap();
        let (instance, _clock) = instance(&dir);
        let before = instance.control.is_muted();
        instance.control.toggle_mute();
        assert_ne!(instance.control.is_muted(), before);
        instance.control.toggle_mute();
        assert_eq!(instance.control.is_muted(), before);
    }

    #[test]
    fn test_tone_is_replicated_across_channels() {
        let dir = TempDir::new().unwrap();
        let (mut instance, _clock) = instance(&dir);
        instance.control.start_test_tone(440.0);
        let (result, left, right) =
            render_once(&mut instance.engine, RenderContext::new(0.0), 0.0);
        assert!(result.is_ok());
        assert_eq!(left, right);
        let expected = ((TAU * 440.0 / SAMPLE_RATE).sin() * 0.5) as f32;
        assert_relative_eq!(left[0], expected, epsilon = 1e-7);
    }

    #[test]
    fn test_tone_440_over_100_calls() {
        let dir = TempDir::new().unwrap();
        let (mut instance, _clock) = instance(&dir);
        instance.control.start_test_tone(440.0);

        let mut run = Vec::with_capacity(100 * FRAMES);
        for call in 0..100 {
            let context = RenderContext::new((call * FRAMES) as f64);
            let (result, left, right) = render_once(&mut instance.engine, context, 0.0);
            assert!(result.is_ok());
            assert_eq!(left, right);
            run.extend(left);
        }

        // continuous across call boundaries
        let step = TAU * 440.0 / SAMPLE_RATE;
        for (n, sample) in run.iter().enumerate() {
            let expected = (((n + 1) as f64 * step) % TAU).sin() * 0.5;
            assert!((*sample as f64 - expected).abs() < 1e-4, "sample {n}");
        }

        let metrics = compute_metrics(&run);
        assert_relative_eq!(metrics.peak, 0.5, epsilon = 1e-3);
        assert_relative_eq!(metrics.rms, 0.3536, epsilon = 1e-3);
    }

    #[test]
    fn test_frequency_change_keeps_phase() {
        for (from, sample_rate) in [(20.0, 8_000.0), (440.0, SAMPLE_RATE), (15_000.0, 96_000.0)] {
            let to = from * 2.0;
            let dir = TempDir::new().unwrap();
            let config = EngineConfig::new()
                .with_sample_rate(sample_rate)
                .with_log_directory(dir.path())
                .with_start_muted(false);
            let mut instance = Instance::with_clock(config, ManualClock::new(0.0)).unwrap();
            instance.control.start_test_tone(from);
            let (_, before, _) = render_once(&mut instance.engine, RenderContext::new(0.0), 0.0);

            instance.control.set_test_frequency(to);
            assert!(instance.control.is_test_active());
            assert_eq!(instance.control.current_test_frequency(), to);
            let (_, after, _) = render_once(&mut instance.engine, RenderContext::new(0.0), 0.0);

            let phase_at_switch = (FRAMES as f64 * TAU * from / sample_rate) % TAU;
            let expected = ((phase_at_switch + TAU * to / sample_rate) % TAU).sin() * 0.5;
            assert!(
                (after[0] as f64 - expected).abs() < 1e-3,
                "{from} Hz -> {to} Hz at {sample_rate} Hz"
            );

            let max_step = (TAU * to / sample_rate * 0.5) as f32 + 1e-3;
            assert!((after[0] - before[FRAMES - 1]).abs() <= max_step);
        }
    }

    #[test]
    fn test_restart_resets_phase() {
        let dir = TempDir::new().unwrap();
        let (mut instance, _clock) = instance(&dir);
        instance.control.start_test_tone(440.0);
        let (_, first, _) = render_once(&mut instance.engine, RenderContext::new(0.0), 0.0);
        instance.control.stop_test_tone();
        instance.control.start_test_tone(440.0);
        let (_, again, _) = render_once(&mut instance.engine, RenderContext::new(0.0), 0.0);
        assert_eq!(first, again);
    }

    #[test]
    fn test_stop_returns_to_passthrough() {
        let dir = TempDir::new().unwrap();
        let (mut instance, _clock) = instance(&dir);
        instance.control.handle_test_tone_state(true, 440.0);
        assert!(instance.control.is_test_active());
        instance.control.handle_test_tone_state(false, 440.0);
        assert!(!instance.control.is_test_active());

        let (result, _, _) = render_once(&mut instance.engine, RenderContext::new(0.0), 0.0);
        assert_eq!(result, Err(RenderError::NoConnection));
    }

    #[test]
    fn test_invalid_frequency_is_ignored() {
        let dir = TempDir::new().unwrap();
        let (instance, _clock) = instance(&dir);
        instance.control.start_test_tone(-1.0);
        assert!(!instance.control.is_test_active());
        instance.control.set_test_frequency(f64::NAN);
        assert_eq!(instance.control.current_test_frequency(), 440.0);
    }

    #[test]
    fn test_visualization_capped_at_30hz() {
        for frames in [1, 64, 512, 4096] {
            let dir = TempDir::new().unwrap();
            let (mut instance, clock) = instance(&dir);
            instance.control.start_test_tone(440.0);

            // one second of audio in `frames`-sized calls
            let period = frames as f64 / SAMPLE_RATE;
            let mut left = vec![0.0f32; frames];
            let mut right = vec![0.0f32; frames];
            let calls = (1.0 / period).ceil() as usize;
            for call in 0..calls {
                let mut channels: [&mut [f32]; 2] = [&mut left, &mut right];
                let mut buffer = AudioBuffer::new(&mut channels);
                let context = RenderContext::new((call * frames) as f64);
                instance.engine.render(context, &mut buffer).unwrap();
                clock.advance(period);
            }

            // calls longer than the interval publish every time
            let published = instance.control.stats().frames_published;
            assert!(published <= 30, "{published} frames in one second at {frames} frames/call");
            assert!(published as usize >= calls.min(29), "{published} frames at {frames} frames/call");
        }
    }

    #[test]
    fn test_visualization_frame_contents() {
        let dir = TempDir::new().unwrap();
        let (mut instance, _clock) = instance(&dir);
        let mut input = ConstantInput(-0.5);
        let context = RenderContext::new(SAMPLE_RATE).with_pull_input(&mut input);
        render_once(&mut instance.engine, context, 0.0).0.unwrap();

        let frame = instance.reports.try_recv_frame().unwrap();
        assert_eq!(frame.samples.len(), FRAMES);
        assert!(frame.samples.iter().all(|&s| s == 0.5));
        assert_relative_eq!(frame.timestamp_seconds, 1.0);
        assert_relative_eq!(frame.metrics.peak, 0.5);
        assert_eq!(frame.metrics.zero_crossings, 0);
    }

    #[test]
    fn test_visualization_sees_signal_before_mute() {
        let dir = TempDir::new().unwrap();
        let (mut instance, _clock) = instance(&dir);
        instance.control.set_mute(true);
        let mut input = ConstantInput(0.5);
        let context = RenderContext::new(0.0).with_pull_input(&mut input);
        render_once(&mut instance.engine, context, 0.0).0.unwrap();

        let frame = instance.reports.try_recv_frame().unwrap();
        assert_relative_eq!(frame.metrics.peak, 0.5);
    }

    #[test]
    fn test_logging_ten_buffers() {
        let dir = TempDir::new().unwrap();
        let (mut instance, _clock) = instance(&dir);
        instance.control.start_test_tone(440.0);

        instance.control.set_logging(true).unwrap();
        assert!(instance.control.is_logging());
        let path = instance.control.log_path().unwrap();
        for call in 0..10 {
            let context = RenderContext::new((call * FRAMES) as f64);
            render_once(&mut instance.engine, context, 0.0).0.unwrap();
        }
        instance.control.set_logging(false).unwrap();

        let len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(len, (10 * FRAMES * 2 * 4) as u64);
        assert_eq!(instance.control.stats().log_buffers_dropped, 0);
    }

    #[test]
    fn test_logging_captures_pre_mute_signal() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::new(0.0);
        let config = EngineConfig::new()
            .with_log_directory(dir.path())
            .with_log_layout(LogLayout::Interleaved);
        let mut instance = Instance::with_clock(config, clock).unwrap();
        assert!(instance.control.is_muted());

        instance.control.enable_logging().unwrap();
        let mut input = ConstantInput(0.125);
        let context = RenderContext::new(0.0).with_pull_input(&mut input);
        let (_, left, _) = render_once(&mut instance.engine, context, 0.0);
        let summary = instance.control.disable_logging().unwrap().unwrap();

        assert!(left.iter().all(|&s| s == 0.0));
        let bytes = std::fs::read(summary.path).unwrap();
        assert_eq!(bytes.len(), FRAMES * 2 * 4);
        assert_eq!(&bytes[..4], &0.125f32.to_le_bytes());
    }

    #[test]
    fn test_host_context_is_published() {
        let dir = TempDir::new().unwrap();
        let (mut instance, _clock) = instance(&dir);
        instance.control.start_test_tone(440.0);

        let transport = || {
            Some(TransportSnapshot {
                flags: TransportStateFlags(TransportStateFlags::MOVING),
                sample_position: 1024.0,
            })
        };
        let tempo = || {
            Some(TempoSnapshot {
                tempo_bpm: 96.0,
                time_signature_numerator: 4.0,
                time_signature_denominator: 4,
                ..Default::default()
            })
        };
        let context = RenderContext::new(1024.0)
            .with_transport_state(&transport)
            .with_musical_context(&tempo);
        render_once(&mut instance.engine, context, 0.0).0.unwrap();

        let host = instance.control.host_context();
        assert_eq!(host.sample_time, 1024.0);
        assert!(host.transport.map(|t| t.is_playing()).unwrap_or(false));
        assert_eq!(host.tempo.map(|t| t.tempo_bpm), Some(96.0));
    }

    #[test]
    fn test_failed_host_query_does_not_fail_render() {
        let dir = TempDir::new().unwrap();
        let (mut instance, _clock) = instance(&dir);
        instance.control.start_test_tone(440.0);
        let transport = || None::<TransportSnapshot>;
        let context = RenderContext::new(0.0).with_transport_state(&transport);
        let (result, _, _) = render_once(&mut instance.engine, context, 0.0);
        assert!(result.is_ok());
        assert_eq!(instance.control.stats().host_queries_failed, 1);
    }
}
