//! Named session configurations.
//!
//! A preset parameterizes a session before it starts; the engine copies its
//! values at start time, so editing or deleting a preset never touches a
//! running session. The serialized form doubles as the companion wire
//! payload, which is why every field is required.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DatabaseError, ValidationError};
use crate::storage::KeyValueStore;
use crate::timer::secs;

/// Upper bound on stored presets.
pub const MAX_PRESETS: usize = 20;

/// Longest accepted goal, work or break interval (one week).
pub const MAX_DURATION_SECS: u64 = 7 * 24 * 3600;

/// kv key holding the JSON-encoded preset list.
pub const PRESETS_KEY: &str = "saved_presets";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionPreset {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "sessionGoal", deserialize_with = "secs::deserialize")]
    pub session_goal_secs: u64,
    #[serde(rename = "workInterval", deserialize_with = "secs::deserialize")]
    pub work_interval_secs: u64,
    #[serde(rename = "breakInterval", deserialize_with = "secs::deserialize")]
    pub break_interval_secs: u64,
    #[serde(rename = "colorHex")]
    pub color_hex: String,
    pub icon: String,
}

impl SessionPreset {
    pub fn new(
        name: impl Into<String>,
        session_goal_secs: u64,
        work_interval_secs: u64,
        break_interval_secs: u64,
        color_hex: impl Into<String>,
        icon: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            session_goal_secs,
            work_interval_secs,
            break_interval_secs,
            color_hex: color_hex.into(),
            icon: icon.into(),
        }
    }

    /// The presets seeded on first run.
    pub fn defaults() -> Vec<SessionPreset> {
        vec![
            SessionPreset::new("Standard 20-20-20", 4 * 3600, 20 * 60, 20, "#007AFF", "👁️"),
            SessionPreset::new("Deep Work", 2 * 3600, 50 * 60, 10 * 60, "#5856D6", "🧠"),
            SessionPreset::new("Quick Focus", 3600, 25 * 60, 5 * 60, "#FF9500", "⚡️"),
        ]
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(invalid("name", "must not be empty"));
        }
        if self.work_interval_secs == 0 {
            return Err(invalid("workInterval", "must be greater than zero"));
        }
        if self.session_goal_secs == 0 {
            return Err(invalid("sessionGoal", "must be greater than zero"));
        }
        for (field, secs) in [
            ("sessionGoal", self.session_goal_secs),
            ("workInterval", self.work_interval_secs),
            ("breakInterval", self.break_interval_secs),
        ] {
            if secs > MAX_DURATION_SECS {
                return Err(invalid(field, "must be at most one week"));
            }
        }
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// In-memory preset list with create/update/delete and kv persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct PresetRegistry {
    presets: Vec<SessionPreset>,
}

impl PresetRegistry {
    pub fn with_defaults() -> Self {
        Self {
            presets: SessionPreset::defaults(),
        }
    }

    pub fn from_presets(presets: Vec<SessionPreset>) -> Self {
        Self { presets }
    }

    /// Load from the kv store. Absent, unreadable or corrupt data all fall
    /// back to the defaults; this never fails.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        match store.kv_get(PRESETS_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<Vec<SessionPreset>>(&json) {
                Ok(presets) => Self { presets },
                Err(e) => {
                    tracing::warn!(error = %e, "stored presets are corrupt, using defaults");
                    Self::with_defaults()
                }
            },
            Ok(None) => Self::with_defaults(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read presets, using defaults");
                Self::with_defaults()
            }
        }
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), DatabaseError> {
        let json = serde_json::to_string(&self.presets).map_err(|e| DatabaseError::CorruptRow {
            table: "kv".into(),
            message: e.to_string(),
        })?;
        store.kv_set(PRESETS_KEY, &json)
    }

    /// Upsert and persist. The registry is left untouched unless both succeed.
    pub fn upsert_and_save(
        &mut self,
        preset: SessionPreset,
        store: &dyn KeyValueStore,
    ) -> crate::Result<()> {
        let mut next = self.clone();
        next.upsert(preset)?;
        next.save(store)?;
        *self = next;
        Ok(())
    }

    pub fn list(&self) -> &[SessionPreset] {
        &self.presets
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&SessionPreset> {
        self.presets.iter().find(|p| p.id == id)
    }

    /// Look up by id string, then by case-insensitive name.
    pub fn find(&self, key: &str) -> Option<&SessionPreset> {
        if let Ok(id) = Uuid::parse_str(key) {
            if let Some(preset) = self.get(id) {
                return Some(preset);
            }
        }
        self.presets
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(key.trim()))
    }

    /// Replace the preset with the same id, or append a new one.
    pub fn upsert(&mut self, preset: SessionPreset) -> Result<(), ValidationError> {
        preset.validate()?;
        if let Some(existing) = self.presets.iter_mut().find(|p| p.id == preset.id) {
            *existing = preset;
            return Ok(());
        }
        if self.presets.len() >= MAX_PRESETS {
            return Err(ValidationError::PresetLimit { max: MAX_PRESETS });
        }
        self.presets.push(preset);
        Ok(())
    }

    pub fn remove(&mut self, id: Uuid) -> Option<SessionPreset> {
        let index = self.presets.iter().position(|p| p.id == id)?;
        Some(self.presets.remove(index))
    }

    pub fn reset_to_defaults(&mut self) {
        self.presets = SessionPreset::defaults();
    }
}

impl Default for PresetRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
