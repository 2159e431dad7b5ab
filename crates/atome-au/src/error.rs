//! OSStatus codes and their mapping from engine errors.

use atome_core::{RenderError, RenderResult};

/// OSStatus values used at the C-ABI boundary.
pub mod os_status {
    pub const NO_ERR: i32 = 0;
    pub const K_AUDIO_UNIT_ERR_INVALID_PARAMETER: i32 = -10878;
    pub const K_AUDIO_UNIT_ERR_NO_CONNECTION: i32 = -10876;
    pub const K_AUDIO_UNIT_ERR_TOO_MANY_FRAMES_TO_PROCESS: i32 = -10874;
    pub const K_AUDIO_UNIT_ERR_FORMAT_NOT_SUPPORTED: i32 = -10868;
    pub const K_AUDIO_UNIT_ERR_CANNOT_DO_IN_CURRENT_CONTEXT: i32 = -10863;
    /// Generic failure, returned when a panic was caught at the boundary.
    pub const K_AUDIO_UNIT_ERR_RENDER: i32 = -1;
    /// Control call failed on file I/O (`kAudioFileUnspecifiedError`, 'wht?').
    pub const K_AUDIO_FILE_UNSPECIFIED_ERROR: i32 = 0x7768_743F;
}

/// Map a render result to the OSStatus the host expects.
///
/// Upstream failures pass the host's own status through unchanged.
pub fn render_status(result: RenderResult) -> i32 {
    match result {
        Ok(()) => os_status::NO_ERR,
        Err(RenderError::NoConnection) => os_status::K_AUDIO_UNIT_ERR_NO_CONNECTION,
        Err(RenderError::Upstream(status)) => status,
        Err(RenderError::TooManyFrames { .. }) => {
            os_status::K_AUDIO_UNIT_ERR_TOO_MANY_FRAMES_TO_PROCESS
        }
        Err(RenderError::ChannelMismatch { .. }) => os_status::K_AUDIO_UNIT_ERR_FORMAT_NOT_SUPPORTED,
    }
}
