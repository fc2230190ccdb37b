use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::presets::SessionPreset;

pub const QUICK_SESSION_NAME: &str = "Quick Session";
pub const QUICK_SESSION_ICON: &str = "⏳";
pub const QUICK_SESSION_COLOR: &str = "#007AFF";

/// Default quick-session goal: 4 hours.
pub const DEFAULT_GOAL_SECS: u64 = 4 * 60 * 60;
/// Default work interval: 20 minutes.
pub const DEFAULT_WORK_SECS: u64 = 20 * 60;
pub const RANDOM_BREAK_MIN_SECS: u64 = 20;
pub const RANDOM_BREAK_MAX_SECS: u64 = 25;

/// How long a break lasts when a Work phase completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BreakPolicy {
    /// Uniform whole-second length in `min_secs..=max_secs`, drawn anew for
    /// every break.
    Randomized { min_secs: u64, max_secs: u64 },
    Fixed { secs: u64 },
}

impl BreakPolicy {
    pub fn randomized_default() -> Self {
        BreakPolicy::Randomized {
            min_secs: RANDOM_BREAK_MIN_SECS,
            max_secs: RANDOM_BREAK_MAX_SECS,
        }
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        match *self {
            BreakPolicy::Fixed { secs } => secs,
            BreakPolicy::Randomized { min_secs, max_secs } => {
                let (lo, hi) = if min_secs <= max_secs {
                    (min_secs, max_secs)
                } else {
                    (max_secs, min_secs)
                };
                rng.gen_range(lo..=hi)
            }
        }
    }
}

/// Parameters for sessions started without a preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerDefaults {
    pub goal_secs: u64,
    pub work_secs: u64,
    pub break_policy: BreakPolicy,
}

impl Default for TimerDefaults {
    fn default() -> Self {
        Self {
            goal_secs: DEFAULT_GOAL_SECS,
            work_secs: DEFAULT_WORK_SECS,
            break_policy: BreakPolicy::randomized_default(),
        }
    }
}

/// The values a running session works from. Copied once at start, so later
/// edits to the preset or to the defaults never reach a live session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPlan {
    pub preset_id: Option<Uuid>,
    pub name: String,
    pub icon: String,
    pub color_hex: String,
    pub goal_secs: u64,
    pub work_secs: u64,
    pub break_policy: BreakPolicy,
}

impl SessionPlan {
    pub fn quick(defaults: &TimerDefaults) -> Self {
        Self {
            preset_id: None,
            name: QUICK_SESSION_NAME.to_string(),
            icon: QUICK_SESSION_ICON.to_string(),
            color_hex: QUICK_SESSION_COLOR.to_string(),
            goal_secs: defaults.goal_secs,
            work_secs: defaults.work_secs,
            break_policy: defaults.break_policy,
        }
    }

    /// A preset's own break interval always wins over the randomized window.
    pub fn from_preset(preset: &SessionPreset) -> Self {
        Self {
            preset_id: Some(preset.id),
            name: preset.name.clone(),
            icon: preset.icon.clone(),
            color_hex: preset.color_hex.clone(),
            goal_secs: preset.session_goal_secs,
            work_secs: preset.work_interval_secs,
            break_policy: BreakPolicy::Fixed {
                secs: preset.break_interval_secs,
            },
        }
    }
}
