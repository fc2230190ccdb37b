mod clock;
mod engine;
mod plan;
mod snapshot;

pub use clock::{Clock, ManualClock, Pace, SystemClock};
pub use engine::SessionEngine;
pub use plan::{
    BreakPolicy, SessionPlan, TimerDefaults, DEFAULT_GOAL_SECS, DEFAULT_WORK_SECS,
    QUICK_SESSION_COLOR, QUICK_SESSION_ICON, QUICK_SESSION_NAME, RANDOM_BREAK_MAX_SECS,
    RANDOM_BREAK_MIN_SECS,
};
pub use snapshot::{SessionSnapshot, TimerPhase};
pub(crate) use clock::offset_secs;
pub(crate) use snapshot::secs;
