//! Adapters from AU host blocks to the engine's collaborator traits.
//!
//! Every adapter wraps a raw block pointer that is only valid for the render
//! call it was handed over in. Adapters are built on the stack inside
//! `atome_au_render` and dropped before it returns.

use std::ffi::c_void;

use atome_core::{
    AudioBuffer as EngineBuffer, MusicalContextSource, PullInput, TempoSnapshot,
    TransportSnapshot, TransportStateFlags, TransportStateSource,
};

use crate::buffers::AudioBufferList;
use crate::error::os_status;
use crate::objc_block;

// =============================================================================
// Core Audio time stamp
// =============================================================================

/// SMPTE time structure.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct SMPTETime {
    pub subframes: i16,
    pub subframe_divisor: i16,
    pub counter: u32,
    pub smpte_type: u32,
    pub flags: u32,
    pub hours: i16,
    pub minutes: i16,
    pub seconds: i16,
    pub frames: i16,
}

/// Audio timestamp structure from Core Audio.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct AudioTimeStamp {
    /// Sample time
    pub sample_time: f64,
    /// Host time (Mach absolute time)
    pub host_time: u64,
    /// Rate scalar
    pub rate_scalar: f64,
    /// Word clock time
    pub word_clock_time: u64,
    /// SMPTE time
    pub smpte_time: SMPTETime,
    /// Flags indicating which fields are valid
    pub flags: u32,
    /// Reserved
    pub reserved: u32,
}

// =============================================================================
// Block signatures
// =============================================================================

/// `AURenderPullInputBlock`:
///
/// ```objc
/// typedef OSStatus (^AURenderPullInputBlock)(
///     AudioUnitRenderActionFlags *actionFlags,
///     const AudioTimeStamp *timestamp,
///     AVAudioFrameCount frameCount,
///     NSInteger inputBusNumber,
///     AudioBufferList *inputData);
/// ```
pub type PullInputBlockFn = unsafe extern "C" fn(
    block: *const c_void,
    action_flags: *mut u32,
    timestamp: *const AudioTimeStamp,
    frame_count: u32,
    input_bus_number: isize,
    input_data: *mut AudioBufferList,
) -> i32;

/// `AUHostTransportStateBlock`:
///
/// ```objc
/// typedef BOOL (^AUHostTransportStateBlock)(
///     AUHostTransportStateFlags *transportStateFlags,
///     double *currentSamplePosition,
///     double *cycleStartBeatPosition,
///     double *cycleEndBeatPosition);
/// ```
pub type TransportStateBlockFn = unsafe extern "C" fn(
    block: *const c_void,
    flags: *mut u32,
    current_sample_position: *mut f64,
    cycle_start_beat_position: *mut f64,
    cycle_end_beat_position: *mut f64,
) -> bool;

/// `AUHostMusicalContextBlock`:
///
/// ```objc
/// typedef BOOL (^AUHostMusicalContextBlock)(
///     double *currentTempo,
///     double *timeSignatureNumerator,
///     NSInteger *timeSignatureDenominator,
///     double *currentBeatPosition,
///     NSInteger *sampleOffsetToNextBeat,
///     double *currentMeasureDownbeatPosition);
/// ```
pub type MusicalContextBlockFn = unsafe extern "C" fn(
    block: *const c_void,
    current_tempo: *mut f64,
    time_signature_numerator: *mut f64,
    time_signature_denominator: *mut isize,
    current_beat_position: *mut f64,
    sample_offset_to_next_beat: *mut isize,
    current_measure_downbeat_position: *mut f64,
) -> bool;

// =============================================================================
// Pull input
// =============================================================================

/// Upstream input pulled from the host's main input bus (bus 0).
pub struct HostPullInput {
    block: *const c_void,
    action_flags: *mut u32,
    timestamp: *const AudioTimeStamp,
    frame_count: u32,
    list: *mut AudioBufferList,
}

impl HostPullInput {
    /// # Safety
    ///
    /// All pointers must be valid for the current render call. `list` must
    /// hold at least as many buffers as the engine buffer passed to `pull`.
    pub unsafe fn new(
        block: *const c_void,
        action_flags: *mut u32,
        timestamp: *const AudioTimeStamp,
        frame_count: u32,
        list: *mut AudioBufferList,
    ) -> Self {
        Self {
            block,
            action_flags,
            timestamp,
            frame_count,
            list,
        }
    }
}

impl PullInput for HostPullInput {
    fn pull(&mut self, _sample_time: f64, buffer: &mut EngineBuffer<'_, '_>) -> Result<(), i32> {
        let frames = buffer.frames();
        let byte_size = (frames * std::mem::size_of::<f32>()) as u32;

        // Point the list at the engine's channel memory so the host renders
        // straight into it.
        for channel in 0..buffer.channel_count() {
            let Some(samples) = buffer.channel_mut(channel) else {
                break;
            };
            // SAFETY: `list` has at least `channel_count` buffers (constructor contract).
            unsafe {
                let entry = AudioBufferList::buffer_ptr(self.list, channel);
                (*entry).number_channels = 1;
                (*entry).data_byte_size = byte_size;
                (*entry).data = samples.as_mut_ptr().cast();
            }
        }

        // SAFETY: `block` is a live AURenderPullInputBlock for this render call,
        // and the signature matches Apple's documented declaration.
        let status = unsafe {
            let invoke = objc_block::invoke_ptr(self.block);
            let pull_fn: PullInputBlockFn = std::mem::transmute(invoke);
            pull_fn(
                self.block,
                self.action_flags,
                self.timestamp,
                self.frame_count,
                0,
                self.list,
            )
        };
        if status != os_status::NO_ERR {
            return Err(status);
        }

        // The host may have re-pointed `data` at its own memory instead of
        // filling ours. Copy back in that case.
        for channel in 0..buffer.channel_count() {
            let Some(samples) = buffer.channel_mut(channel) else {
                break;
            };
            // SAFETY: Same list as above; the host keeps re-pointed memory
            // valid for the rest of this render call.
            unsafe {
                let entry = AudioBufferList::buffer_ptr(self.list, channel);
                let data = (*entry).data as *const f32;
                if data.is_null() {
                    samples.fill(0.0);
                } else if data != samples.as_ptr() {
                    let available = (*entry).data_byte_size as usize / std::mem::size_of::<f32>();
                    let count = available.min(samples.len());
                    std::ptr::copy_nonoverlapping(data, samples.as_mut_ptr(), count);
                    samples[count..].fill(0.0);
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Transport state
// =============================================================================

/// Host transport state query.
pub struct HostTransportState {
    block: *const c_void,
}

impl HostTransportState {
    /// # Safety
    ///
    /// `block` must be a live `AUHostTransportStateBlock` for as long as the
    /// adapter is used.
    pub unsafe fn new(block: *const c_void) -> Self {
        Self { block }
    }
}

impl TransportStateSource for HostTransportState {
    fn transport_state(&self) -> Option<TransportSnapshot> {
        let mut flags: u32 = 0;
        let mut sample_position: f64 = 0.0;
        let mut cycle_start: f64 = 0.0;
        let mut cycle_end: f64 = 0.0;

        // SAFETY: Constructor contract; the signature matches Apple's
        // AUHostTransportStateBlock.
        let success = unsafe {
            let invoke = objc_block::invoke_ptr(self.block);
            let block_fn: TransportStateBlockFn = std::mem::transmute(invoke);
            block_fn(
                self.block,
                &mut flags,
                &mut sample_position,
                &mut cycle_start,
                &mut cycle_end,
            )
        };

        success.then_some(TransportSnapshot {
            flags: TransportStateFlags(flags),
            sample_position,
        })
    }
}

// =============================================================================
// Musical context
// =============================================================================

/// Host musical context query.
pub struct HostMusicalContext {
    block: *const c_void,
}

impl HostMusicalContext {
    /// # Safety
    ///
    /// `block` must be a live `AUHostMusicalContextBlock` for as long as the
    /// adapter is used.
    pub unsafe fn new(block: *const c_void) -> Self {
        Self { block }
    }
}

impl MusicalContextSource for HostMusicalContext {
    fn musical_context(&self) -> Option<TempoSnapshot> {
        let mut tempo: f64 = 0.0;
        let mut numerator: f64 = 0.0;
        let mut denominator: isize = 0;
        let mut beat_position: f64 = 0.0;
        let mut offset_to_next_beat: isize = 0;
        let mut downbeat: f64 = 0.0;

        // SAFETY: Constructor contract; the signature matches Apple's
        // AUHostMusicalContextBlock.
        let success = unsafe {
            let invoke = objc_block::invoke_ptr(self.block);
            let block_fn: MusicalContextBlockFn = std::mem::transmute(invoke);
            block_fn(
                self.block,
                &mut tempo,
                &mut numerator,
                &mut denominator,
                &mut beat_position,
                &mut offset_to_next_beat,
                &mut downbeat,
            )
        };

        success.then_some(TempoSnapshot {
            tempo_bpm: tempo,
            time_signature_numerator: numerator,
            time_signature_denominator: denominator as i64,
            beat_position,
            sample_offset_to_next_beat: offset_to_next_beat as i64,
            measure_downbeat_position: downbeat,
        })
    }
}
