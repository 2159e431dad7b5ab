//! Report dispatcher: the consumer thread behind the reporting bridge.
//!
//! Polls a [`ReportReceiver`] at a fixed period and fans each new
//! [`VisualizationFrame`] out to registered listeners. Host context changes
//! (play/stop, tempo, time signature) are logged at debug level here, off the
//! render thread.
//!
//! Listeners are registered explicitly and removed through the returned
//! [`Registration`]. Once [`Registration::unregister`] returns, the listener
//! is never invoked again.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use crate::bridge::ReportReceiver;
use crate::transport::HostContext;
use crate::visualization::VisualizationFrame;

/// Callback invoked with each delivered frame.
pub type FrameListener = Arc<dyn Fn(&VisualizationFrame) + Send + Sync>;

struct ListenerEntry {
    id: u64,
    listener: FrameListener,
}

#[derive(Default)]
struct Registry {
    listeners: RwLock<Vec<ListenerEntry>>,
    next_id: AtomicU64,
}

impl Registry {
    fn remove(&self, id: u64) {
        self.listeners.write().retain(|entry| entry.id != id);
    }
}

// =============================================================================
// Registration
// =============================================================================

/// Handle to a registered listener.
///
/// Dropping the handle unregisters the listener. Unregistering is
/// idempotent.
#[must_use = "dropping a Registration unregisters the listener"]
pub struct Registration {
    id: u64,
    registry: Weak<Registry>,
    active: AtomicBool,
}

impl Registration {
    /// Remove the listener. Safe to call repeatedly, and after the dispatcher
    /// has shut down.
    ///
    /// Waits for an in-flight invocation of the listener to finish, so it must
    /// not be called from inside that listener.
    pub fn unregister(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }

    /// Whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire) && self.registry.strong_count() > 0
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.unregister();
    }
}

// =============================================================================
// ReportDispatcher
// =============================================================================

/// Owns the polling thread that drains the reporting bridge.
pub struct ReportDispatcher {
    registry: Arc<Registry>,
    stop: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl ReportDispatcher {
    /// Start polling `receiver` every `interval`.
    pub fn spawn(receiver: ReportReceiver, interval: Duration) -> std::io::Result<Self> {
        let registry = Arc::new(Registry::default());
        let stop = Arc::new(AtomicBool::new(false));

        let thread = {
            let registry = Arc::clone(&registry);
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name("atome-report-dispatch".into())
                .spawn(move || run(receiver, registry, stop, interval))?
        };

        Ok(Self {
            registry,
            stop,
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Register a frame listener.
    pub fn register<F>(&self, listener: F) -> Registration
    where
        F: Fn(&VisualizationFrame) + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.listeners.write().push(ListenerEntry {
            id,
            listener: Arc::new(listener),
        });
        Registration {
            id,
            registry: Arc::downgrade(&self.registry),
            active: AtomicBool::new(true),
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.registry.listeners.read().len()
    }

    /// Stop the polling thread and wait for it. Idempotent.
    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::Release);
        let handle = self.thread.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("report dispatcher thread panicked");
            }
        }
    }

    /// Whether the polling thread is still running.
    pub fn is_running(&self) -> bool {
        self.thread.lock().is_some()
    }
}

impl Drop for ReportDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(
    mut receiver: ReportReceiver,
    registry: Arc<Registry>,
    stop: Arc<AtomicBool>,
    interval: Duration,
) {
    log::debug!("report dispatcher started ({:?} poll interval)", interval);
    let mut last_context: Option<HostContext> = None;

    while !stop.load(Ordering::Acquire) {
        if let Some(frame) = receiver.try_recv_frame() {
            deliver(&registry, &frame);
        }
        if let Some(context) = receiver.try_recv_host_context() {
            if last_context.map_or(true, |last| last.differs_in_state(&context)) {
                log_host_context(&context);
            }
            last_context = Some(context);
        }
        thread::sleep(interval);
    }

    log::debug!(
        "report dispatcher stopped ({} frames published, {} dropped)",
        receiver.frames_published(),
        receiver.frames_dropped()
    );
}

fn deliver(registry: &Registry, frame: &VisualizationFrame) {
    // The read lock is held across invocation so unregister() can wait for it.
    let listeners = registry.listeners.read();
    for entry in listeners.iter() {
        (entry.listener)(frame);
    }
}

fn log_host_context(context: &HostContext) {
    if let Some(transport) = context.transport {
        if transport.is_playing() {
            log::debug!(
                "transport playing at sample {}",
                transport.sample_position
            );
        } else {
            log::debug!(
                "transport stopped at sample {}",
                transport.sample_position
            );
        }
    }
    if let Some(tempo) = context.tempo {
        log::debug!(
            "tempo {} BPM, time signature {}/{}, beat {}",
            tempo.tempo_bpm,
            tempo.time_signature_numerator as i64,
            tempo.time_signature_denominator,
            tempo.beat_position
        );
    }
}
