//! The observable live-timer state.
//!
//! A [`SessionSnapshot`] is what every display surface and the companion
//! device receive. Progress is never stored: it is derived from
//! `time_remaining_secs / total_duration_secs` whenever it is read or
//! serialized, and ignored when deserialized.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum TimerPhase {
    #[default]
    Idle,
    Work,
    #[serde(rename = "breakTime")]
    Break,
    Paused,
}

impl TimerPhase {
    /// Work or Break: the phases in which ticks advance the countdown.
    pub fn is_running(&self) -> bool {
        matches!(self, TimerPhase::Work | TimerPhase::Break)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "SnapshotRepr", try_from = "SnapshotRepr")]
pub struct SessionSnapshot {
    pub phase: TimerPhase,
    pub time_remaining_secs: u64,
    /// Length of the current phase.
    pub total_duration_secs: u64,
    pub session_elapsed_secs: u64,
    pub session_goal_secs: u64,
    /// Absolute end of the current phase; `None` while idle or paused.
    pub target_time: Option<DateTime<Utc>>,
    pub session_start_time: Option<DateTime<Utc>>,
    pub preset_name: String,
    pub preset_icon: String,
    pub preset_color_hex: String,
}

impl SessionSnapshot {
    /// 0.0 .. 1.0 progress within the current phase.
    pub fn progress(&self) -> f64 {
        if self.total_duration_secs == 0 {
            return 0.0;
        }
        1.0 - (self.time_remaining_secs as f64 / self.total_duration_secs as f64)
    }

    /// 0.0 .. 1.0 progress towards the session goal.
    pub fn session_progress(&self) -> f64 {
        if self.session_goal_secs == 0 {
            return 0.0;
        }
        (self.session_elapsed_secs as f64 / self.session_goal_secs as f64).min(1.0)
    }

    /// Planned end of the whole session, if one is running.
    pub fn session_end_time(&self) -> Option<DateTime<Utc>> {
        self.session_start_time
            .and_then(|start| super::offset_secs(start, self.session_goal_secs))
    }
}

/// Serialized shape of a snapshot (the `timerState` wire payload body).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotRepr {
    phase: TimerPhase,
    #[serde(deserialize_with = "secs::deserialize")]
    time_remaining: u64,
    #[serde(deserialize_with = "secs::deserialize")]
    total_duration: u64,
    #[serde(default)]
    progress: f64,
    #[serde(deserialize_with = "secs::deserialize")]
    session_elapsed: u64,
    #[serde(deserialize_with = "secs::deserialize")]
    session_goal: u64,
    #[serde(default)]
    target_time: Option<DateTime<Utc>>,
    #[serde(default)]
    session_start_time: Option<DateTime<Utc>>,
    preset_name: String,
    preset_icon: String,
    preset_color_hex: String,
}

impl From<SessionSnapshot> for SnapshotRepr {
    fn from(s: SessionSnapshot) -> Self {
        let progress = s.progress();
        Self {
            phase: s.phase,
            time_remaining: s.time_remaining_secs,
            total_duration: s.total_duration_secs,
            progress,
            session_elapsed: s.session_elapsed_secs,
            session_goal: s.session_goal_secs,
            target_time: s.target_time,
            session_start_time: s.session_start_time,
            preset_name: s.preset_name,
            preset_icon: s.preset_icon,
            preset_color_hex: s.preset_color_hex,
        }
    }
}

impl TryFrom<SnapshotRepr> for SessionSnapshot {
    type Error = String;

    fn try_from(r: SnapshotRepr) -> Result<Self, Self::Error> {
        if r.time_remaining > r.total_duration {
            return Err(format!(
                "timeRemaining ({}) exceeds totalDuration ({})",
                r.time_remaining, r.total_duration
            ));
        }
        Ok(Self {
            phase: r.phase,
            time_remaining_secs: r.time_remaining,
            total_duration_secs: r.total_duration,
            session_elapsed_secs: r.session_elapsed,
            session_goal_secs: r.session_goal,
            target_time: r.target_time,
            session_start_time: r.session_start_time,
            preset_name: r.preset_name,
            preset_icon: r.preset_icon,
            preset_color_hex: r.preset_color_hex,
        })
    }
}

/// Durations on the wire are whole seconds, but peers may send floats.
pub(crate) mod secs {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u64),
        Float(f64),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        match Raw::deserialize(d)? {
            Raw::Int(n) => Ok(n),
            Raw::Float(f) if f.is_finite() && f >= 0.0 => Ok(f.round() as u64),
            Raw::Float(f) => Err(D::Error::custom(format!("invalid duration: {f}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> SessionSnapshot {
        SessionSnapshot {
            phase: TimerPhase::Work,
            time_remaining_secs: 900,
            total_duration_secs: 1200,
            session_elapsed_secs: 300,
            session_goal_secs: 3600,
            target_time: None,
            session_start_time: None,
            preset_name: "Standard 20-20-20".into(),
            preset_icon: "👁️".into(),
            preset_color_hex: "#007AFF".into(),
        }
    }

    #[test]
    fn progress_is_derived() {
        let snap = sample();
        assert!((snap.progress() - 0.25).abs() < f64::EPSILON);
        assert!((snap.session_progress() - 300.0 / 3600.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_length_phase_has_zero_progress() {
        let mut snap = sample();
        snap.total_duration_secs = 0;
        snap.time_remaining_secs = 0;
        assert_eq!(snap.progress(), 0.0);
    }

    #[test]
    fn serialized_form_uses_wire_names() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["phase"], "work");
        assert_eq!(value["timeRemaining"], 900);
        assert_eq!(value["totalDuration"], 1200);
        assert_eq!(value["progress"], 0.25);
        assert_eq!(value["presetColorHex"], "#007AFF");
    }

    #[test]
    fn break_phase_uses_break_time_tag() {
        let value = serde_json::to_value(TimerPhase::Break).unwrap();
        assert_eq!(value, "breakTime");
    }

    #[test]
    fn incoming_progress_is_ignored() {
        let snap: SessionSnapshot = serde_json::from_value(json!({
            "phase": "breakTime",
            "timeRemaining": 10.0,
            "totalDuration": 20,
            "progress": 0.99,
            "sessionElapsed": 100,
            "sessionGoal": 3600,
            "presetName": "Quick Session",
            "presetIcon": "⏳",
            "presetColorHex": "#007AFF"
        }))
        .unwrap();
        assert_eq!(snap.phase, TimerPhase::Break);
        assert_eq!(snap.time_remaining_secs, 10);
        assert!((snap.progress() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn remaining_beyond_total_is_rejected() {
        let result: Result<SessionSnapshot, _> = serde_json::from_value(json!({
            "phase": "work",
            "timeRemaining": 30,
            "totalDuration": 20,
            "sessionElapsed": 0,
            "sessionGoal": 3600,
            "presetName": "x",
            "presetIcon": "x",
            "presetColorHex": "x"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn negative_duration_is_rejected() {
        let result: Result<SessionSnapshot, _> = serde_json::from_value(json!({
            "phase": "work",
            "timeRemaining": -1.0,
            "totalDuration": 20,
            "sessionElapsed": 0,
            "sessionGoal": 3600,
            "presetName": "x",
            "presetIcon": "x",
            "presetColorHex": "x"
        }));
        assert!(result.is_err());
    }
}
