//! Message schema between the control surface and the engine.
//!
//! Inbound commands are JSON objects shaped `{ "type": ..., "data": ... }`.
//! Outbound events are delivered through [`WebViewHandle::emit`] under the
//! names below.
//!
//! [`WebViewHandle::emit`]: crate::WebViewHandle::emit

use atome_core::ControlHandle;
use serde::{Deserialize, Serialize};

/// Event carrying an [`AudioState`], pushed after every state change.
pub const EVENT_AUDIO_STATE: &str = "updateAudioState";

/// Event carrying a [`VisualizationFrame`](atome_core::VisualizationFrame).
pub const EVENT_VISUALIZATION_FRAME: &str = "visualizationFrame";

/// A command from the control surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum UiCommand {
    /// Free-form log line from the UI script.
    Log(String),
    /// Console output or script error captured by the page.
    Console(String),
    ToggleMute,
    SetMute(bool),
    /// Start the tone at the given frequency in Hz.
    StartTestTone(f64),
    StopTestTone,
    SetTestFrequency(f64),
    /// Start or stop the tone in one message.
    TestToneState {
        #[serde(rename = "isPlaying")]
        is_playing: bool,
        frequency: f64,
    },
    SetLogging(bool),
    /// Request an `updateAudioState` push without changing anything.
    GetState,
}

/// Snapshot of the user-facing engine state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioState {
    pub muted: bool,
    pub test_active: bool,
    pub test_frequency: f64,
    pub logging: bool,
}

impl AudioState {
    /// Read the current state from a control handle.
    pub fn capture(control: &ControlHandle) -> Self {
        Self {
            muted: control.is_muted(),
            test_active: control.is_test_active(),
            test_frequency: control.current_test_frequency(),
            logging: control.is_logging(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_commands() {
        let parse = |value: serde_json::Value| serde_json::from_value::<UiCommand>(value).unwrap();

        assert_eq!(parse(json!({ "type": "toggleMute" })), UiCommand::ToggleMute);
        assert_eq!(
            parse(json!({ "type": "setMute", "data": true })),
            UiCommand::SetMute(true)
        );
        assert_eq!(
            parse(json!({ "type": "startTestTone", "data": 880.0 })),
            UiCommand::StartTestTone(880.0)
        );
        assert_eq!(
            parse(json!({ "type": "testToneState", "data": { "isPlaying": true, "frequency": 220.0 } })),
            UiCommand::TestToneState {
                is_playing: true,
                frequency: 220.0
            }
        );
        assert_eq!(
            parse(json!({ "type": "log", "data": "hello" })),
            UiCommand::Log("hello".into())
        );
        assert_eq!(parse(json!({ "type": "getState" })), UiCommand::GetState);
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        let result = serde_json::from_value::<UiCommand>(json!({ "type": "performCalculation", "data": [1, 2] }));
        assert!(result.is_err());
    }

    #[test]
    fn test_audio_state_shape() {
        let state = AudioState {
            muted: true,
            test_active: false,
            test_frequency: 440.0,
            logging: false,
        };
        assert_eq!(
            serde_json::to_value(state).unwrap(),
            json!({ "muted": true, "testActive": false, "testFrequency": 440.0, "logging": false })
        );
    }
}
