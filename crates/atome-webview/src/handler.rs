//! Dispatch of UI commands to the engine's control handle.

use atome_core::ControlHandle;
use parking_lot::RwLock;
use serde_json::Value;

use crate::error::Result;
use crate::handle::WebViewHandle;
use crate::protocol::{AudioState, UiCommand, EVENT_AUDIO_STATE};

/// Handler for messages from the WebView.
///
/// Called on the main thread when JS calls `__ATOME__.invoke("method", args...)`
/// or `__ATOME__.emit("name", data)`.
pub trait WebViewHandler: Send + Sync {
    /// Handle an invoke call. `Ok` resolves the JS Promise, `Err` rejects it.
    fn on_invoke(&self, _method: &str, _args: &[Value]) -> std::result::Result<Value, String> {
        Ok(Value::Null)
    }

    /// Handle a fire-and-forget event.
    fn on_event(&self, _name: &str, _data: &Value) {}
}

/// Routes [`UiCommand`]s to a [`ControlHandle`] and pushes the resulting
/// [`AudioState`] back to the page.
pub struct ControlBridge {
    control: ControlHandle,
    webview: RwLock<Option<WebViewHandle>>,
}

impl ControlBridge {
    pub fn new(control: ControlHandle) -> Self {
        Self {
            control,
            webview: RwLock::new(None),
        }
    }

    /// Attach the page. The current state is pushed immediately.
    pub fn attach(&self, handle: WebViewHandle) {
        *self.webview.write() = Some(handle);
        self.push_state();
    }

    /// Detach the page, invalidating its handle.
    pub fn detach(&self) {
        if let Some(handle) = self.webview.write().take() {
            handle.invalidate();
        }
    }

    pub fn control(&self) -> &ControlHandle {
        &self.control
    }

    pub fn audio_state(&self) -> AudioState {
        AudioState::capture(&self.control)
    }

    /// Apply one command.
    ///
    /// Returns the state after the command for state-changing commands and
    /// `getState`, `None` for log messages.
    pub fn handle_command(&self, command: UiCommand) -> Result<Option<AudioState>> {
        match command {
            UiCommand::Log(message) => {
                log::info!("JS: {}", message);
                return Ok(None);
            }
            UiCommand::Console(message) => {
                log::warn!("WebView console: {}", message);
                return Ok(None);
            }
            UiCommand::ToggleMute => {
                self.control.toggle_mute();
            }
            UiCommand::SetMute(muted) => self.control.set_mute(muted),
            UiCommand::StartTestTone(frequency) => self.control.start_test_tone(frequency),
            UiCommand::StopTestTone => self.control.stop_test_tone(),
            UiCommand::SetTestFrequency(frequency) => self.control.set_test_frequency(frequency),
            UiCommand::TestToneState {
                is_playing,
                frequency,
            } => self.control.handle_test_tone_state(is_playing, frequency),
            UiCommand::SetLogging(enabled) => {
                let result = self.control.set_logging(enabled);
                // Push even on failure: the page shows the real state.
                self.push_state();
                result?;
                return Ok(Some(self.audio_state()));
            }
            UiCommand::GetState => {}
        }

        let state = self.audio_state();
        self.emit_state(state);
        Ok(Some(state))
    }

    /// Parse and apply a raw `{ "type": ..., "data": ... }` message.
    pub fn handle_message(&self, json: &str) -> Result<Option<AudioState>> {
        let command: UiCommand = serde_json::from_str(json)?;
        self.handle_command(command)
    }

    fn handle_value(&self, name: &str, data: Option<&Value>) -> Result<Option<AudioState>> {
        let mut message = serde_json::Map::new();
        message.insert("type".into(), Value::String(name.to_owned()));
        if let Some(data) = data.filter(|data| !data.is_null()) {
            message.insert("data".into(), data.clone());
        }
        let command: UiCommand = serde_json::from_value(Value::Object(message))?;
        self.handle_command(command)
    }

    fn push_state(&self) {
        self.emit_state(self.audio_state());
    }

    fn emit_state(&self, state: AudioState) {
        if let Some(handle) = self.webview.read().as_ref() {
            handle.emit(EVENT_AUDIO_STATE, &state);
        }
    }
}

impl WebViewHandler for ControlBridge {
    fn on_invoke(&self, method: &str, args: &[Value]) -> std::result::Result<Value, String> {
        match self.handle_value(method, args.first()) {
            Ok(Some(state)) => serde_json::to_value(state).map_err(|e| e.to_string()),
            Ok(None) => Ok(Value::Null),
            Err(e) => Err(e.to_string()),
        }
    }

    fn on_event(&self, name: &str, data: &Value) {
        if let Err(e) = self.handle_value(name, Some(data)) {
            log::warn!("Ignoring UI event `{}`: {}", name, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::testing::sink_handle;
    use atome_core::{EngineConfig, Instance};
    use serde_json::json;
    use tempfile::TempDir;

    fn bridge(dir: &TempDir) -> ControlBridge {
        let config = EngineConfig::new().with_log_directory(dir.path());
        let instance = Instance::new(config).unwrap();
        ControlBridge::new(instance.control)
    }

    #[test]
    fn test_toggle_mute_pushes_state() {
        let dir = TempDir::new().unwrap();
        let bridge = bridge(&dir);
        let (handle, sink) = sink_handle();
        bridge.attach(handle);
        assert_eq!(sink.scripts.lock().len(), 1);

        let state = bridge.handle_message(r#"{"type":"toggleMute"}"#).unwrap().unwrap();
        assert!(!state.muted);

        let scripts = sink.scripts.lock();
        assert_eq!(scripts.len(), 2);
        assert!(scripts[1].contains(r#""updateAudioState""#));
        assert!(scripts[1].contains(r#""muted":false"#));
    }

    #[test]
    fn test_test_tone_commands() {
        let dir = TempDir::new().unwrap();
        let bridge = bridge(&dir);

        bridge.handle_command(UiCommand::StartTestTone(880.0)).unwrap();
        assert!(bridge.control().is_test_active());
        assert_eq!(bridge.control().current_test_frequency(), 880.0);

        bridge
            .handle_command(UiCommand::TestToneState {
                is_playing: false,
                frequency: 880.0,
            })
            .unwrap();
        assert!(!bridge.control().is_test_active());

        bridge.handle_command(UiCommand::SetTestFrequency(220.0)).unwrap();
        assert_eq!(bridge.audio_state().test_frequency, 220.0);
    }

    #[test]
    fn test_log_messages_return_none() {
        let dir = TempDir::new().unwrap();
        let bridge = bridge(&dir);
        let (handle, sink) = sink_handle();
        bridge.attach(handle);

        assert_eq!(bridge.handle_command(UiCommand::Console("oops".into())).unwrap(), None);
        assert_eq!(sink.scripts.lock().len(), 1);
    }

    #[test]
    fn test_malformed_message() {
        let dir = TempDir::new().unwrap();
        let bridge = bridge(&dir);
        assert!(bridge.handle_message("not json").is_err());
        assert!(bridge.handle_message(r#"{"type":"setMute","data":"yes"}"#).is_err());
    }

    #[test]
    fn test_invoke_returns_state() {
        let dir = TempDir::new().unwrap();
        let bridge = bridge(&dir);

        let value = bridge.on_invoke("setMute", &[json!(false)]).unwrap();
        assert_eq!(value["muted"], json!(false));

        let value = bridge.on_invoke("getState", &[]).unwrap();
        assert_eq!(value["testFrequency"], json!(440.0));

        assert!(bridge.on_invoke("performCalculation", &[json!([1, 2])]).is_err());
    }

    #[test]
    fn test_set_logging_via_event() {
        let dir = TempDir::new().unwrap();
        let bridge = bridge(&dir);

        bridge.on_event("setLogging", &json!(true));
        assert!(bridge.audio_state().logging);
        bridge.on_event("setLogging", &json!(false));
        assert!(!bridge.audio_state().logging);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_detach_invalidates_handle() {
        let dir = TempDir::new().unwrap();
        let bridge = bridge(&dir);
        let (handle, sink) = sink_handle();
        bridge.attach(handle.clone());
        bridge.detach();
        assert!(!handle.is_attached());

        bridge.handle_command(UiCommand::ToggleMute).unwrap();
        assert_eq!(sink.scripts.lock().len(), 1);
    }
}
