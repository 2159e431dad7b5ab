//! Audio Unit (AUv3) wrapper for the Atome render engine.
//!
//! The Objective-C `AUAudioUnit` subclass lives outside this crate and calls
//! into the C-ABI functions in [`bridge`]. Everything on the Rust side of that
//! boundary is plain `atome-core`: this crate only translates Core Audio
//! buffer lists, host blocks and OSStatus codes.
//!
//! # Render path
//!
//! `internalRenderBlock` calls [`bridge::atome_au_render`] with the host's
//! buffer list and blocks. The bridge wraps each block in an adapter from
//! [`host`] and hands them to the engine as its pull-input and transport
//! collaborators. The render thread never blocks: if the engine is busy the
//! call fails with `kAudioUnitErr_CannotDoInCurrentContext`.

pub mod bridge;
pub mod buffers;
pub mod error;
pub mod host;
pub mod objc_block;

pub use bridge::{AtomeAuHostContext, AtomeAuInstance, AtomeAuInstanceHandle};
pub use buffers::{AudioBuffer, AudioBufferList};
pub use error::{os_status, render_status};
pub use host::{AudioTimeStamp, HostMusicalContext, HostPullInput, HostTransportState};
