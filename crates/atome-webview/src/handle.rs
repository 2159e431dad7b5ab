//! Handle for sending events from Rust to the control surface.

use std::ffi::c_void;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;

/// Function pointer type for evaluating JavaScript in the WebView.
///
/// Called with the context pointer and a UTF-8 JavaScript expression. The
/// implementation dispatches to the main thread if called from elsewhere.
pub type EvalJsFn = unsafe extern "C-unwind" fn(context: *mut c_void, script: *const u8, len: usize);

/// Handle for sending events from Rust to the WebView.
///
/// The handle is `Send + Sync` and is used from the control thread and the
/// report dispatcher thread.
///
/// **Not audio-thread safe.** `emit` allocates (JSON serialization).
#[derive(Clone)]
pub struct WebViewHandle {
    eval_fn: EvalJsFn,
    context: Arc<AtomicPtr<c_void>>,
}

// SAFETY: The context pointer is only dereferenced inside eval_fn, which
// dispatches to the main thread. Arc<AtomicPtr> makes access to the pointer
// itself thread-safe.
unsafe impl Send for WebViewHandle {}
// SAFETY: Same reasoning as Send.
unsafe impl Sync for WebViewHandle {}

impl WebViewHandle {
    /// Create a new WebView handle.
    ///
    /// # Safety
    ///
    /// - `eval_fn` must remain valid for the lifetime of the handle
    /// - `context` must remain valid until `invalidate()` is called
    pub unsafe fn new(eval_fn: EvalJsFn, context: *mut c_void) -> Self {
        Self {
            eval_fn,
            context: Arc::new(AtomicPtr::new(context)),
        }
    }

    /// Emit a named event to JavaScript.
    ///
    /// The script calls `window.__ATOME__._onEvent(name, data)`. If the
    /// WebView is detached the call is silently dropped.
    pub fn emit(&self, name: &str, data: &impl serde::Serialize) {
        let ctx = self.context.load(Ordering::Acquire);
        if ctx.is_null() {
            return;
        }

        let data_json = match serde_json::to_string(data) {
            Ok(json) => json,
            Err(e) => {
                log::error!("Failed to serialize event data: {e}");
                return;
            }
        };

        let script = event_script(name, &data_json);

        // SAFETY: eval_fn is valid (guaranteed by new()) and ctx was checked
        // non-null above.
        unsafe {
            (self.eval_fn)(ctx, script.as_ptr(), script.len());
        }
    }

    /// Invalidate the handle. Every clone becomes a no-op afterwards.
    pub fn invalidate(&self) {
        self.context.store(std::ptr::null_mut(), Ordering::Release);
    }

    /// Whether the WebView is still attached.
    pub fn is_attached(&self) -> bool {
        !self.context.load(Ordering::Acquire).is_null()
    }
}

fn event_script(name: &str, data_json: &str) -> String {
    format!(
        "window.__ATOME__._onEvent({},{})",
        serde_json::to_string(name).unwrap_or_default(),
        data_json,
    )
}
