//! C-ABI bridge for the Audio Unit wrapper.
//!
//! A thin Objective-C `AUAudioUnit` subclass owns one instance handle and
//! forwards its render block and UI commands here:
//!
//! ```text
//! AU Host (Logic Pro, GarageBand, ...)
//!        ↓
//! Objective-C wrapper (AtomeAudioUnit.m)
//!        ↓ (C-ABI calls)
//! bridge.rs (this module)
//!        ↓
//! atome_core::RenderEngine / ControlHandle
//! ```
//!
//! # Safety
//!
//! All functions use `std::panic::catch_unwind` to prevent panics from crossing the FFI boundary.
//! Pointers are validated before dereferencing.
//! Functions return OSStatus error codes on failure.

// These are C-ABI entry points called from Objective-C. The ObjC side is responsible
// for passing valid pointers. Marking them `unsafe` would be unusual for C FFI.
#![allow(clippy::not_unsafe_ptr_arg_deref)]

use std::ffi::{c_char, c_void, CStr};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::ptr;

use parking_lot::Mutex;

use atome_core::{
    AudioBuffer as EngineBuffer, ControlHandle, EngineConfig, HostContext, MusicalContextSource,
    PullInput, Registration, RenderContext, RenderEngine, Renderer, ReportDispatcher,
    TransportStateSource, VisualizationFrame, MAX_CHANNELS,
};

use crate::buffers::AudioBufferList;
use crate::error::{os_status, render_status};
use crate::host::{AudioTimeStamp, HostMusicalContext, HostPullInput, HostTransportState};

// =============================================================================
// Compile-time checks for C header constant sync
// =============================================================================
//
// If a constant changes in atome_core and the build fails here, update the
// corresponding #define in objc/AtomeAuBridge.h.

const _: () = assert!(MAX_CHANNELS == 32, "Update ATOME_AU_MAX_CHANNELS in AtomeAuBridge.h");

// =============================================================================
// Macros
// =============================================================================

/// Safely execute code with an instance handle, handling null checks and panics.
macro_rules! with_instance {
    ($instance:expr, $default:expr, |$handle:ident| $body:expr) => {{
        if $instance.is_null() {
            return $default;
        }
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            // SAFETY: Non-null handles come from `atome_au_create_instance` and
            // stay valid until `atome_au_destroy_instance`.
            let $handle = unsafe { &*$instance };
            $body
        }))
        .unwrap_or($default)
    }};
}

/// Variant of `with_instance!` for functions that return `()`.
macro_rules! with_instance_void {
    ($instance:expr, |$handle:ident| $body:expr) => {{
        if $instance.is_null() {
            return;
        }
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            // SAFETY: See `with_instance!`.
            let $handle = unsafe { &*$instance };
            $body
        }));
    }};
}

// =============================================================================
// C-ABI Structs (must match AtomeAuBridge.h exactly)
// =============================================================================

/// Visualization callback, invoked on the report dispatcher thread at most
/// 30 times per second.
///
/// `samples` is valid only for the duration of the call.
pub type AtomeAuVisualizationCallback = extern "C" fn(
    context: *mut c_void,
    samples: *const f32,
    sample_count: u32,
    timestamp_seconds: f64,
    rms: f32,
    peak: f32,
    zero_crossings: u32,
);

/// Host transport and tempo as of the last render call (matches
/// AtomeAuHostContext in header).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomeAuHostContext {
    pub sample_time: f64,
    /// Whether the transport fields are valid.
    pub has_transport: bool,
    pub is_playing: bool,
    pub transport_flags: u32,
    pub sample_position: f64,
    /// Whether the tempo fields are valid.
    pub has_tempo: bool,
    pub tempo_bpm: f64,
    pub time_signature_numerator: f64,
    pub time_signature_denominator: i64,
    pub beat_position: f64,
}

impl From<HostContext> for AtomeAuHostContext {
    fn from(context: HostContext) -> Self {
        let mut out = Self {
            sample_time: context.sample_time,
            ..Default::default()
        };
        if let Some(transport) = context.transport {
            out.has_transport = true;
            out.is_playing = transport.is_playing();
            out.transport_flags = transport.flags.0;
            out.sample_position = transport.sample_position;
        }
        if let Some(tempo) = context.tempo {
            out.has_tempo = true;
            out.tempo_bpm = tempo.tempo_bpm;
            out.time_signature_numerator = tempo.time_signature_numerator;
            out.time_signature_denominator = tempo.time_signature_denominator;
            out.beat_position = tempo.beat_position;
        }
        out
    }
}

// =============================================================================
// Instance Handle
// =============================================================================

/// Render-thread state guarded by one mutex.
struct RenderSide {
    engine: RenderEngine,
    /// Channel memory used when the host hands over null data pointers.
    scratch: Vec<Vec<f32>>,
}

/// Opaque instance handle passed across the C boundary.
pub struct AtomeAuInstance {
    render: Mutex<RenderSide>,
    control: ControlHandle,
    channels: usize,
    max_frames: u32,
    visualization: Mutex<Option<Registration>>,
    // Declared last: dropped after the registration above.
    dispatcher: ReportDispatcher,
}

/// Opaque handle type for C.
pub type AtomeAuInstanceHandle = *mut AtomeAuInstance;

/// Raw callback context forwarded to the dispatcher thread.
#[derive(Clone, Copy)]
struct CallbackContext(*mut c_void);

// SAFETY: The wrapper guarantees the context may be used from the dispatcher
// thread until the callback is replaced or the instance is destroyed.
unsafe impl Send for CallbackContext {}
// SAFETY: Only ever passed by value to the callback.
unsafe impl Sync for CallbackContext {}

// =============================================================================
// Lifecycle
// =============================================================================

/// Create an engine instance for the negotiated format.
///
/// # Arguments
///
/// * `sample_rate` - Sample rate of the output bus
/// * `channel_count` - Channels of the output bus
/// * `max_frames` - `maximumFramesToRender`
/// * `log_directory` - UTF-8 path for diagnostic captures, or null for the
///   system temp directory
///
/// # Returns
///
/// A pointer to the instance handle, or null if the format is unsupported.
/// The handle must be destroyed with `atome_au_destroy_instance`.
#[no_mangle]
pub extern "C" fn atome_au_create_instance(
    sample_rate: f64,
    channel_count: u32,
    max_frames: u32,
    log_directory: *const c_char,
) -> AtomeAuInstanceHandle {
    let result = catch_unwind(|| {
        let mut config = EngineConfig::new()
            .with_sample_rate(sample_rate)
            .with_channels(channel_count as usize)
            .with_max_frames(max_frames);

        if !log_directory.is_null() {
            // SAFETY: Non-null `log_directory` is a NUL-terminated string (header contract).
            let raw = unsafe { CStr::from_ptr(log_directory) };
            match raw.to_str() {
                Ok(path) => config = config.with_log_directory(PathBuf::from(path)),
                Err(_) => {
                    log::error!("log directory is not valid UTF-8");
                    return None;
                }
            }
        }

        create_instance(config)
    });

    match result {
        Ok(Some(ptr)) => ptr,
        Ok(None) => ptr::null_mut(),
        Err(_) => ptr::null_mut(),
    }
}

fn create_instance(config: EngineConfig) -> Option<AtomeAuInstanceHandle> {
    let instance = match atome_core::Instance::new(config.clone()) {
        Ok(instance) => instance,
        Err(err) => {
            log::error!("cannot create instance: {}", err);
            return None;
        }
    };
    let dispatcher = match ReportDispatcher::spawn(instance.reports, config.report_poll_interval())
    {
        Ok(dispatcher) => dispatcher,
        Err(err) => {
            log::error!("cannot start report dispatcher: {}", err);
            return None;
        }
    };

    let scratch = (0..config.channels)
        .map(|_| vec![0.0f32; config.max_frames as usize])
        .collect();

    let handle = Box::new(AtomeAuInstance {
        render: Mutex::new(RenderSide {
            engine: instance.engine,
            scratch,
        }),
        control: instance.control,
        channels: config.channels,
        max_frames: config.max_frames,
        visualization: Mutex::new(None),
        dispatcher,
    });
    Some(Box::into_raw(handle))
}

/// Destroy an instance.
///
/// Closes any open diagnostic log and stops the report dispatcher.
///
/// # Safety
///
/// - `instance` must be a valid pointer returned by `atome_au_create_instance`,
///   or null (in which case this function does nothing)
/// - `instance` must not have been previously destroyed
/// - Must not be called concurrently with any other function using the same instance
#[no_mangle]
pub extern "C" fn atome_au_destroy_instance(instance: AtomeAuInstanceHandle) {
    if instance.is_null() {
        return;
    }

    let _ = catch_unwind(AssertUnwindSafe(|| {
        // SAFETY: Caller contract; ownership returns to Rust exactly once.
        let handle = unsafe { Box::from_raw(instance) };
        if let Some(registration) = handle.visualization.lock().take() {
            registration.unregister();
        }
        handle.dispatcher.shutdown();
        drop(handle);
    }));
}

// =============================================================================
// Render
// =============================================================================

/// Render one buffer.
///
/// # Arguments
///
/// * `output_data` - Output buffer list. Null `data` pointers are replaced with
///   instance-owned memory, as AU hosts expect
/// * `pull_input_block` - Host's `AURenderPullInputBlock`, or null
/// * `musical_context_block` - Host's `AUHostMusicalContextBlock`, or null
/// * `transport_state_block` - Host's `AUHostTransportStateBlock`, or null
///
/// # Safety
///
/// - `instance` must be a valid handle
/// - `action_flags`, `timestamp` and `output_data` must be valid for this call
/// - Block pointers, when non-null, must be live blocks for this call
/// - Called from the render thread only; never blocks
#[no_mangle]
pub extern "C" fn atome_au_render(
    instance: AtomeAuInstanceHandle,
    action_flags: *mut u32,
    timestamp: *const AudioTimeStamp,
    frame_count: u32,
    output_data: *mut AudioBufferList,
    pull_input_block: *const c_void,
    musical_context_block: *const c_void,
    transport_state_block: *const c_void,
) -> i32 {
    if instance.is_null() {
        return os_status::K_AUDIO_UNIT_ERR_INVALID_PARAMETER;
    }
    if action_flags.is_null() || timestamp.is_null() || output_data.is_null() {
        return os_status::K_AUDIO_UNIT_ERR_INVALID_PARAMETER;
    }

    let result = catch_unwind(AssertUnwindSafe(|| {
        // SAFETY: Checked non-null above; caller contract for validity.
        let handle = unsafe { &*instance };

        if frame_count > handle.max_frames {
            return os_status::K_AUDIO_UNIT_ERR_TOO_MANY_FRAMES_TO_PROCESS;
        }

        // try_lock: the render thread never waits on the control thread
        let Some(mut guard) = handle.render.try_lock() else {
            return os_status::K_AUDIO_UNIT_ERR_CANNOT_DO_IN_CURRENT_CONTEXT;
        };
        let RenderSide { engine, scratch } = &mut *guard;

        // SAFETY: Non-null, valid for this call.
        let number_buffers = unsafe { (*output_data).number_buffers } as usize;
        if number_buffers != handle.channels || number_buffers > MAX_CHANNELS {
            return os_status::K_AUDIO_UNIT_ERR_FORMAT_NOT_SUPPORTED;
        }
        let frames = frame_count as usize;

        // Stack array of channel slices: no allocation on the render thread.
        let mut channels: [&mut [f32]; MAX_CHANNELS] = Default::default();
        for (index, slot) in channels.iter_mut().take(number_buffers).enumerate() {
            // SAFETY: `index < number_buffers` of a valid list.
            let entry = unsafe { AudioBufferList::buffer_ptr(output_data, index) };
            // SAFETY: `entry` points into the host's list.
            let data = unsafe { (*entry).data } as *mut f32;
            let data = if data.is_null() {
                let owned = scratch[index].as_mut_ptr();
                // SAFETY: As above; hand our memory back to the host.
                unsafe {
                    (*entry).data = owned.cast();
                    (*entry).data_byte_size = (frames * std::mem::size_of::<f32>()) as u32;
                }
                owned
            } else {
                data
            };
            // SAFETY: The host (or our scratch buffer) provides at least
            // `frames` samples, checked against `max_frames` above.
            *slot = unsafe { std::slice::from_raw_parts_mut(data, frames) };
        }
        let mut buffer = EngineBuffer::new(&mut channels[..number_buffers]);

        // SAFETY: Non-null, valid for this call.
        let sample_time = unsafe { (*timestamp).sample_time };

        // SAFETY: Block pointers are live for this render call (caller contract).
        let mut pull = (!pull_input_block.is_null()).then(|| unsafe {
            HostPullInput::new(
                pull_input_block,
                action_flags,
                timestamp,
                frame_count,
                output_data,
            )
        });
        // SAFETY: As above.
        let transport = (!transport_state_block.is_null())
            .then(|| unsafe { HostTransportState::new(transport_state_block) });
        // SAFETY: As above.
        let musical = (!musical_context_block.is_null())
            .then(|| unsafe { HostMusicalContext::new(musical_context_block) });

        let context = RenderContext {
            sample_time,
            pull_input: pull.as_mut().map(|p| p as &mut dyn PullInput),
            transport_state: transport.as_ref().map(|t| t as &dyn TransportStateSource),
            musical_context: musical.as_ref().map(|m| m as &dyn MusicalContextSource),
        };

        render_status(engine.render(context, &mut buffer))
    }));

    result.unwrap_or(os_status::K_AUDIO_UNIT_ERR_RENDER)
}

// =============================================================================
// Mute
// =============================================================================

#[no_mangle]
pub extern "C" fn atome_au_set_mute(instance: AtomeAuInstanceHandle, muted: bool) {
    with_instance_void!(instance, |handle| handle.control.set_mute(muted))
}

/// Flip the mute state. Returns the new state (`false` for a null handle).
#[no_mangle]
pub extern "C" fn atome_au_toggle_mute(instance: AtomeAuInstanceHandle) -> bool {
    with_instance!(instance, false, |handle| handle.control.toggle_mute())
}

#[no_mangle]
pub extern "C" fn atome_au_is_muted(instance: AtomeAuInstanceHandle) -> bool {
    with_instance!(instance, false, |handle| handle.control.is_muted())
}

// =============================================================================
// Test Tone
// =============================================================================

#[no_mangle]
pub extern "C" fn atome_au_start_test_tone(instance: AtomeAuInstanceHandle, frequency: f64) {
    with_instance_void!(instance, |handle| handle.control.start_test_tone(frequency))
}

#[no_mangle]
pub extern "C" fn atome_au_stop_test_tone(instance: AtomeAuInstanceHandle) {
    with_instance_void!(instance, |handle| handle.control.stop_test_tone())
}

#[no_mangle]
pub extern "C" fn atome_au_set_test_frequency(instance: AtomeAuInstanceHandle, frequency: f64) {
    with_instance_void!(instance, |handle| handle
        .control
        .set_test_frequency(frequency))
}

/// Start or stop the tone in one call, as the control surface reports it.
#[no_mangle]
pub extern "C" fn atome_au_handle_test_tone_state(
    instance: AtomeAuInstanceHandle,
    is_playing: bool,
    frequency: f64,
) {
    with_instance_void!(instance, |handle| handle
        .control
        .handle_test_tone_state(is_playing, frequency))
}

#[no_mangle]
pub extern "C" fn atome_au_is_test_active(instance: AtomeAuInstanceHandle) -> bool {
    with_instance!(instance, false, |handle| handle.control.is_test_active())
}

#[no_mangle]
pub extern "C" fn atome_au_current_test_frequency(instance: AtomeAuInstanceHandle) -> f64 {
    with_instance!(instance, 0.0, |handle| handle
        .control
        .current_test_frequency())
}

// =============================================================================
// Diagnostic Logging
// =============================================================================

/// Enable or disable raw PCM capture.
///
/// Performs file I/O: call from the main thread, never from the render thread.
///
/// # Returns
///
/// `noErr`, or `kAudioFileUnspecifiedError` if the log file could not be
/// opened or closed cleanly.
#[no_mangle]
pub extern "C" fn atome_au_set_logging(instance: AtomeAuInstanceHandle, enabled: bool) -> i32 {
    with_instance!(
        instance,
        os_status::K_AUDIO_UNIT_ERR_INVALID_PARAMETER,
        |handle| match handle.control.set_logging(enabled) {
            Ok(()) => os_status::NO_ERR,
            Err(err) => {
                log::error!("set_logging({}) failed: {}", enabled, err);
                os_status::K_AUDIO_FILE_UNSPECIFIED_ERROR
            }
        }
    )
}

#[no_mangle]
pub extern "C" fn atome_au_is_logging(instance: AtomeAuInstanceHandle) -> bool {
    with_instance!(instance, false, |handle| handle.control.is_logging())
}

// =============================================================================
// Reporting
// =============================================================================

/// Install (or with `None`, remove) the visualization callback.
///
/// Replacing a callback unregisters the previous one first; once this
/// function returns, the previous callback is never invoked again.
///
/// # Safety
///
/// `context` must remain valid until the callback is replaced or the instance
/// is destroyed.
#[no_mangle]
pub extern "C" fn atome_au_set_visualization_callback(
    instance: AtomeAuInstanceHandle,
    callback: Option<AtomeAuVisualizationCallback>,
    context: *mut c_void,
) {
    with_instance_void!(instance, |handle| {
        let mut slot = handle.visualization.lock();
        if let Some(previous) = slot.take() {
            previous.unregister();
        }
        if let Some(callback) = callback {
            let context = CallbackContext(context);
            *slot = Some(handle.dispatcher.register(move |frame: &VisualizationFrame| {
                let context = context;
                callback(
                    context.0,
                    frame.samples.as_ptr(),
                    frame.samples.len() as u32,
                    frame.timestamp_seconds,
                    frame.metrics.rms,
                    frame.metrics.peak,
                    frame.metrics.zero_crossings,
                );
            }));
        }
    })
}

/// Copy the latest host transport/tempo read into `out`.
///
/// Returns `false` for a null handle or output pointer.
#[no_mangle]
pub extern "C" fn atome_au_get_host_context(
    instance: AtomeAuInstanceHandle,
    out: *mut AtomeAuHostContext,
) -> bool {
    if out.is_null() {
        return false;
    }
    with_instance!(instance, false, |handle| {
        // SAFETY: Checked non-null; caller provides writable storage.
        unsafe { out.write(handle.control.host_context().into()) };
        true
    })
}
