//! Minimal Objective-C block calling support.
//!
//! Host callbacks (pull input, transport state, musical context) arrive as
//! Objective-C blocks. A block is a struct whose `invoke` field is a C
//! function taking the block itself as its first argument.

use std::ffi::c_void;

/// Leading fields of every Objective-C block literal.
#[repr(C)]
pub struct BlockLayout {
    pub isa: *const c_void,
    pub flags: i32,
    pub reserved: i32,
    pub invoke: *const c_void,
}

/// Read the invoke function pointer of a block.
///
/// # Safety
///
/// `block` must point to a live Objective-C block.
#[inline]
pub unsafe fn invoke_ptr(block: *const c_void) -> *const c_void {
    // SAFETY: Caller guarantees `block` points to a block literal.
    unsafe { (*(block as *const BlockLayout)).invoke }
}
