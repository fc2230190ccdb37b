//! Tagged message codec for the companion link.
//!
//! Every message is a JSON object with a `type` tag:
//!
//! ```text
//! {"type":"presets","data":[<preset>, ...]}          primary -> companion
//! {"type":"timerState","phase":"work",...}           primary -> companion
//! {"type":"startSession","preset":<preset>}          companion -> primary
//! {"type":"pauseResume"} {"type":"stop"} {"type":"requestState"}
//! ```
//!
//! The application context is a separate untagged object,
//! `{"presets":[<preset>, ...]}`.
//!
//! Decoding is strict per item: a preset with a missing or mistyped field is
//! dropped on its own without affecting the rest of its batch.

use serde_json::{json, Map, Value};

use super::WireError;
use crate::presets::SessionPreset;
use crate::timer::SessionSnapshot;

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Full replacement of the companion's preset list.
    Presets(Vec<SessionPreset>),
    TimerState(SessionSnapshot),
    StartSession(SessionPreset),
    /// Pause when running, resume when paused, as decided by the primary.
    PauseResume,
    Stop,
    RequestState,
}

impl Message {
    pub fn tag(&self) -> &'static str {
        match self {
            Message::Presets(_) => "presets",
            Message::TimerState(_) => "timerState",
            Message::StartSession(_) => "startSession",
            Message::PauseResume => "pauseResume",
            Message::Stop => "stop",
            Message::RequestState => "requestState",
        }
    }

    pub fn encode(&self) -> Value {
        match self {
            Message::Presets(presets) => json!({ "type": self.tag(), "data": presets }),
            Message::TimerState(snapshot) => {
                let mut obj = match serde_json::to_value(snapshot) {
                    Ok(Value::Object(obj)) => obj,
                    _ => Map::new(),
                };
                obj.insert("type".into(), Value::String(self.tag().into()));
                Value::Object(obj)
            }
            Message::StartSession(preset) => json!({ "type": self.tag(), "preset": preset }),
            Message::PauseResume | Message::Stop | Message::RequestState => {
                json!({ "type": self.tag() })
            }
        }
    }

    pub fn decode(value: &Value) -> Result<Self, WireError> {
        let obj = value.as_object().ok_or(WireError::NotAnObject)?;
        let tag = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or(WireError::MissingType)?;

        match tag {
            "presets" => {
                let items = obj.get("data").and_then(Value::as_array).ok_or_else(|| {
                    WireError::MalformedPreset("'data' must be an array".into())
                })?;
                Ok(Message::Presets(decode_presets(items)))
            }
            "timerState" => serde_json::from_value(value.clone())
                .map(Message::TimerState)
                .map_err(|e| WireError::MalformedState(e.to_string())),
            "startSession" => {
                let preset = obj
                    .get("preset")
                    .ok_or_else(|| WireError::MalformedPreset("missing 'preset'".into()))?;
                decode_preset(preset).map(Message::StartSession)
            }
            "pauseResume" => Ok(Message::PauseResume),
            "stop" => Ok(Message::Stop),
            "requestState" => Ok(Message::RequestState),
            other => Err(WireError::UnknownType(other.to_string())),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, WireError> {
        let value: Value = serde_json::from_str(raw).map_err(|_| WireError::NotAnObject)?;
        Self::decode(&value)
    }
}

/// Decode and validate one preset. Out-of-range durations count as malformed.
pub fn decode_preset(value: &Value) -> Result<SessionPreset, WireError> {
    let preset: SessionPreset = serde_json::from_value(value.clone())
        .map_err(|e| WireError::MalformedPreset(e.to_string()))?;
    preset
        .validate()
        .map_err(|e| WireError::MalformedPreset(e.to_string()))?;
    Ok(preset)
}

/// Decode a batch, skipping malformed entries.
pub fn decode_presets(items: &[Value]) -> Vec<SessionPreset> {
    items
        .iter()
        .filter_map(|item| match decode_preset(item) {
            Ok(preset) => Some(preset),
            Err(e) => {
                tracing::debug!(error = %e, "dropping malformed preset");
                None
            }
        })
        .collect()
}

/// The persistent, latest-value-wins context handed to the companion.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApplicationContext {
    pub presets: Vec<SessionPreset>,
}

impl ApplicationContext {
    pub fn encode(&self) -> Value {
        json!({ "presets": self.presets })
    }

    pub fn decode(value: &Value) -> Result<Self, WireError> {
        let items = value
            .get("presets")
            .and_then(Value::as_array)
            .ok_or_else(|| WireError::MalformedPreset("'presets' must be an array".into()))?;
        Ok(Self {
            presets: decode_presets(items),
        })
    }
}
