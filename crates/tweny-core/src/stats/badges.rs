//! Achievement badges.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "at_least", rename_all = "snake_case")]
pub enum Requirement {
    Sessions(u64),
    Hours(f64),
    Streak(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Badge {
    /// Stable key; names may be reworded.
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
    pub requirement: Requirement,
}

impl Badge {
    pub fn is_unlocked(&self, sessions: u64, hours: f64, streak: u32) -> bool {
        match self.requirement {
            Requirement::Sessions(min) => sessions >= min,
            Requirement::Hours(min) => hours >= min,
            Requirement::Streak(min) => streak >= min,
        }
    }
}

pub const BADGES: [Badge; 10] = [
    Badge {
        id: "first_step",
        name: "First Step",
        icon: "figure.walk",
        description: "Complete your first session",
        requirement: Requirement::Sessions(1),
    },
    Badge {
        id: "consistency",
        name: "Consistency",
        icon: "calendar",
        description: "Reach a 3-day streak",
        requirement: Requirement::Streak(3),
    },
    Badge {
        id: "marathon",
        name: "Marathon",
        icon: "figure.run",
        description: "Focus for 10 total hours",
        requirement: Requirement::Hours(10.0),
    },
    Badge {
        id: "zen_master",
        name: "Zen Master",
        icon: "leaf.fill",
        description: "Focus for 50 total hours",
        requirement: Requirement::Hours(50.0),
    },
    Badge {
        id: "deep_diver",
        name: "Deep Diver",
        icon: "arrow.down.circle.fill",
        description: "Complete 50 sessions",
        requirement: Requirement::Sessions(50),
    },
    Badge {
        id: "flow_state",
        name: "Flow State",
        icon: "wind",
        description: "Reach a 7-day streak",
        requirement: Requirement::Streak(7),
    },
    Badge {
        id: "time_lord",
        name: "Time Lord",
        icon: "clock.badge.checkmark.fill",
        description: "Focus for 100 total hours",
        requirement: Requirement::Hours(100.0),
    },
    Badge {
        id: "century_club",
        name: "Century Club",
        icon: "trophy.fill",
        description: "Complete 100 sessions",
        requirement: Requirement::Sessions(100),
    },
    Badge {
        id: "focus_god",
        name: "Focus God",
        icon: "crown.fill",
        description: "Focus for 500 total hours",
        requirement: Requirement::Hours(500.0),
    },
    Badge {
        id: "unstoppable",
        name: "Unstoppable",
        icon: "flame.circle.fill",
        description: "Reach a 30-day streak",
        requirement: Requirement::Streak(30),
    },
];

/// Badges whose requirement holds for the given aggregates, in catalogue order.
pub fn unlocked(sessions: u64, hours: f64, streak: u32) -> Vec<&'static Badge> {
    BADGES
        .iter()
        .filter(|b| b.is_unlocked(sessions, hours, streak))
        .collect()
}
