//! WebView control surface support for the Atome render engine.
//!
//! The page talks to the engine through typed messages:
//!
//! - [`UiCommand`]s arrive via [`WebViewHandler`] and are applied to a
//!   [`ControlHandle`](atome_core::ControlHandle) by [`ControlBridge`].
//! - [`AudioState`] and visualization frames go back out through a
//!   [`WebViewHandle`] as `updateAudioState` / `visualizationFrame` events.
//!
//! Platform WebView embedding is left to the host wrapper, which provides
//! an [`EvalJsFn`] and forwards script messages.

mod error;
pub mod forwarder;
pub mod handle;
pub mod handler;
pub mod protocol;

pub use error::{Result, WebViewError};
pub use forwarder::forward_visualization;
pub use handle::{EvalJsFn, WebViewHandle};
pub use handler::{ControlBridge, WebViewHandler};
pub use protocol::{AudioState, UiCommand, EVENT_AUDIO_STATE, EVENT_VISUALIZATION_FRAME};
