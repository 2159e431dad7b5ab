//! Cross-thread reporting bridge.
//!
//! Hands the latest [`VisualizationFrame`] and [`HostContext`] from the render
//! thread to a consumer thread.
//!
//! # Real-Time Safety
//!
//! Each report kind lives in a single-slot, latest-wins mailbox. The producer
//! side only ever calls `try_lock`: if the consumer happens to hold the slot,
//! the report is dropped and counted instead of waiting. Publishing copies
//! into storage reserved at construction, so it never allocates.
//!
//! The consumer compares a sequence number against the last one it saw and
//! copies the value out only when something new arrived.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::transport::HostContext;
use crate::visualization::VisualizationFrame;

// =============================================================================
// LatestSlot
// =============================================================================

/// Single-value mailbox shared by one producer and one consumer.
struct LatestSlot<T> {
    value: Mutex<T>,
    sequence: AtomicU64,
    dropped: AtomicU64,
}

impl<T> LatestSlot<T> {
    fn new(initial: T) -> Self {
        Self {
            value: Mutex::new(initial),
            sequence: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Overwrite the slot unless the consumer holds it. Returns `false` on drop.
    fn publish_with(&self, write: impl FnOnce(&mut T)) -> bool {
        match self.value.try_lock() {
            Some(mut guard) => {
                write(&mut guard);
                // Release pairs with the consumer's Acquire load.
                self.sequence.fetch_add(1, Ordering::Release);
                true
            }
            None => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Copy out the value if it changed since `last_seen`.
    fn take_newer<R>(&self, last_seen: &mut u64, read: impl FnOnce(&T) -> R) -> Option<R> {
        if self.sequence.load(Ordering::Acquire) == *last_seen {
            return None;
        }
        let guard = self.value.lock();
        // Re-read under the lock so the value and sequence agree.
        *last_seen = self.sequence.load(Ordering::Acquire);
        Some(read(&guard))
    }

    fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn published(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

struct Shared {
    frame: LatestSlot<VisualizationFrame>,
    host_context: LatestSlot<HostContext>,
}

// =============================================================================
// ReportingBridge
// =============================================================================

/// Factory for the producer/consumer pair.
pub struct ReportingBridge;

impl ReportingBridge {
    /// Create a connected publisher (render side) and receiver (consumer side).
    pub fn channel() -> (ReportPublisher, ReportReceiver) {
        let shared = Arc::new(Shared {
            frame: LatestSlot::new(VisualizationFrame::with_capacity()),
            host_context: LatestSlot::new(HostContext::default()),
        });
        (
            ReportPublisher {
                shared: Arc::clone(&shared),
            },
            ReportReceiver {
                shared,
                last_frame: 0,
                last_host_context: 0,
            },
        )
    }
}

/// Render-thread side of the bridge. Never blocks.
pub struct ReportPublisher {
    shared: Arc<Shared>,
}

impl ReportPublisher {
    /// Publish a visualization frame. Returns `false` if it was dropped.
    pub fn publish_frame(&self, frame: &VisualizationFrame) -> bool {
        self.shared
            .frame
            .publish_with(|slot| slot.copy_from(frame))
    }

    /// Publish the latest host context. Returns `false` if it was dropped.
    pub fn publish_host_context(&self, context: HostContext) -> bool {
        self.shared
            .host_context
            .publish_with(|slot| *slot = context)
    }
}

/// Consumer side of the bridge.
///
/// Reads are opportunistic: each call returns the newest value if one
/// arrived since the previous call, `None` otherwise.
pub struct ReportReceiver {
    shared: Arc<Shared>,
    last_frame: u64,
    last_host_context: u64,
}

impl ReportReceiver {
    /// Take the newest visualization frame, if any.
    pub fn try_recv_frame(&mut self) -> Option<VisualizationFrame> {
        self.shared
            .frame
            .take_newer(&mut self.last_frame, VisualizationFrame::clone)
    }

    /// Take the newest host context, if any.
    pub fn try_recv_host_context(&mut self) -> Option<HostContext> {
        self.shared
            .host_context
            .take_newer(&mut self.last_host_context, |context| *context)
    }

    /// Latest host context regardless of whether it was already received.
    pub fn peek_host_context(&self) -> HostContext {
        *self.shared.host_context.value.lock()
    }

    /// Frames published since construction.
    pub fn frames_published(&self) -> u64 {
        self.shared.frame.published()
    }

    /// Frames dropped because the consumer held the slot.
    pub fn frames_dropped(&self) -> u64 {
        self.shared.frame.dropped()
    }

    /// A second handle onto the host context slot, for control-thread reads.
    pub fn host_context_reader(&self) -> HostContextReader {
        HostContextReader {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Clonable read-only view of the latest host context.
#[derive(Clone)]
pub struct HostContextReader {
    shared: Arc<Shared>,
}

impl HostContextReader {
    pub fn get(&self) -> HostContext {
        *self.shared.host_context.value.lock()
    }
}
