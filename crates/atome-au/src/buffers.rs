//! Core Audio buffer list types.
//!
//! Mirrors `AudioBuffer` / `AudioBufferList` from `CoreAudioTypes.h`. The list
//! is a variable-length struct: `buffers` is declared with one element but
//! the host allocates `number_buffers` of them.

use std::ffi::c_void;

/// One non-interleaved channel buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AudioBuffer {
    /// Interleaved channels in `data` (always 1 for non-interleaved formats).
    pub number_channels: u32,
    /// Size of `data` in bytes.
    pub data_byte_size: u32,
    /// Sample memory, or null if the host expects the plugin to supply it.
    pub data: *mut c_void,
}

/// Variable-length list of [`AudioBuffer`]s.
#[repr(C)]
#[derive(Debug)]
pub struct AudioBufferList {
    /// Number of entries in `buffers`.
    pub number_buffers: u32,
    /// First entry of the variable-length array.
    pub buffers: [AudioBuffer; 1],
}

impl AudioBufferList {
    /// Get a buffer through a raw list pointer without creating a reference
    /// to the whole list.
    ///
    /// # Safety
    ///
    /// `list` must be valid and `index` less than its `number_buffers`.
    #[inline]
    pub unsafe fn buffer_ptr(list: *mut AudioBufferList, index: usize) -> *mut AudioBuffer {
        // SAFETY: Caller guarantees `list` is valid and the entry exists.
        unsafe {
            std::ptr::addr_of_mut!((*list).buffers)
                .cast::<AudioBuffer>()
                .add(index)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn test_layout_matches_core_audio() {
        assert_eq!(size_of::<AudioBuffer>(), 16);
        assert_eq!(offset_of!(AudioBuffer, data), 8);
        assert_eq!(offset_of!(AudioBufferList, buffers), 8);
    }
}
