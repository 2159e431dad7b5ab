//! Host transport and musical-context introspection.
//!
//! The host may expose two query functions: transport state (play/stop flags
//! and playhead position) and musical context (tempo, time signature, beat
//! position). Both are optional. Results are surfaced to the control thread
//! for diagnostics and never feed back into the signal path.

// =============================================================================
// Transport flags
// =============================================================================

/// Transport state flags reported by the host.
///
/// Only the play/stop bit is interpreted. Other bits are kept verbatim in
/// [`TransportSnapshot::flags`] for diagnostics.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStateFlags(pub u32);

impl TransportStateFlags {
    /// Transport state has changed since the last query.
    pub const CHANGED: u32 = 1 << 0;
    /// Transport is moving (playing).
    pub const MOVING: u32 = 1 << 1;

    /// Check if the transport is playing.
    #[inline]
    pub fn is_playing(self) -> bool {
        (self.0 & Self::MOVING) != 0
    }
}

// =============================================================================
// Snapshots
// =============================================================================

/// Point-in-time read of the host transport.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransportSnapshot {
    /// Raw flags as reported by the host.
    pub flags: TransportStateFlags,
    /// Playhead position in samples.
    pub sample_position: f64,
}

impl TransportSnapshot {
    /// Check if the transport is playing.
    #[inline]
    pub fn is_playing(&self) -> bool {
        self.flags.is_playing()
    }
}

/// Point-in-time read of the host musical context.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TempoSnapshot {
    /// Tempo in beats per minute.
    pub tempo_bpm: f64,
    /// Time signature numerator (e.g. 3.0 for 3/4).
    pub time_signature_numerator: f64,
    /// Time signature denominator (e.g. 4 for 3/4).
    pub time_signature_denominator: i64,
    /// Beat position of the current buffer's first sample.
    pub beat_position: f64,
    /// Samples until the next beat.
    pub sample_offset_to_next_beat: i64,
    /// Beat position of the current measure's downbeat.
    pub measure_downbeat_position: f64,
}

/// Everything the probe learned during one render call.
///
/// Either half is `None` when the host did not provide the query or the
/// query failed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HostContext {
    /// Host sample time of the render call.
    pub sample_time: f64,
    pub transport: Option<TransportSnapshot>,
    pub tempo: Option<TempoSnapshot>,
}

impl HostContext {
    /// Whether the two contexts differ in anything but the clock.
    ///
    /// Sample time and positions advance every call; this compares the
    /// parts worth reporting when they change.
    pub fn differs_in_state(&self, other: &HostContext) -> bool {
        let playing = |c: &HostContext| c.transport.map(|t| t.is_playing());
        let tempo = |c: &HostContext| {
            c.tempo.map(|t| {
                (
                    t.tempo_bpm,
                    t.time_signature_numerator,
                    t.time_signature_denominator,
                )
            })
        };
        playing(self) != playing(other) || tempo(self) != tempo(other)
    }
}

// =============================================================================
// Host query traits
// =============================================================================

/// Host-supplied transport state query.
///
/// Returns `None` when the host reports failure.
pub trait TransportStateSource {
    fn transport_state(&self) -> Option<TransportSnapshot>;
}

/// Host-supplied musical context query.
///
/// Returns `None` when the host reports failure.
pub trait MusicalContextSource {
    fn musical_context(&self) -> Option<TempoSnapshot>;
}

impl<F> TransportStateSource for F
where
    F: Fn() -> Option<TransportSnapshot>,
{
    #[inline]
    fn transport_state(&self) -> Option<TransportSnapshot> {
        self()
    }
}

impl<F> MusicalContextSource for F
where
    F: Fn() -> Option<TempoSnapshot>,
{
    #[inline]
    fn musical_context(&self) -> Option<TempoSnapshot> {
        self()
    }
}

// =============================================================================
// Probe
// =============================================================================

/// Queries both host sources once per render call.
///
/// Missing sources are skipped silently. A source that exists but fails is
/// a degraded error: the probe counts it and carries on.
#[derive(Debug, Default)]
pub struct TransportProbe {
    failures: u64,
}

impl TransportProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Query the host. Never allocates or blocks beyond the host's own calls.
    pub fn probe(
        &mut self,
        sample_time: f64,
        transport_state: Option<&dyn TransportStateSource>,
        musical_context: Option<&dyn MusicalContextSource>,
    ) -> HostContext {
        let transport = transport_state.and_then(|source| {
            let snapshot = source.transport_state();
            if snapshot.is_none() {
                self.failures += 1;
            }
            snapshot
        });
        let tempo = musical_context.and_then(|source| {
            let snapshot = source.musical_context();
            if snapshot.is_none() {
                self.failures += 1;
            }
            snapshot
        });
        HostContext {
            sample_time,
            transport,
            tempo,
        }
    }

    /// Total failed host queries since construction.
    pub fn failures(&self) -> u64 {
        self.failures
    }
}
