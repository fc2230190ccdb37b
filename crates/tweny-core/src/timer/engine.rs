//! Session timer engine.
//!
//! The engine is a tick-driven state machine. It does not own a thread or a
//! timer: the caller invokes `tick()` once per second while a session runs
//! and applies the returned events (publish, persist, notify).
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Work <-> Break
//!          |        |
//!          +-Paused-+        (resume returns to the interrupted phase)
//! any  -> Idle               (stop, or goal reached)
//! ```
//!
//! ## Tick order
//!
//! 1. `session_elapsed += 1`
//! 2. goal reached -> stop, nothing else this tick
//! 3. `time_remaining > 0` -> count down
//! 4. otherwise -> Work->Break or Break->Work
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = SessionEngine::new(TimerDefaults::default(), Pace::RealTime, clock);
//! engine.start(None);
//! // Once per second:
//! for event in engine.tick() { /* publish */ }
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use super::clock::{offset_secs, Clock, Pace};
use super::plan::{BreakPolicy, SessionPlan, TimerDefaults};
use super::snapshot::{SessionSnapshot, TimerPhase};
use crate::events::{Event, StopReason};
use crate::history::CompletedSessionRecord;
use crate::presets::SessionPreset;

/// Core session engine. Sole writer of the live timer state.
pub struct SessionEngine {
    defaults: TimerDefaults,
    pace: Pace,
    clock: Arc<dyn Clock>,
    rng: Box<dyn RngCore + Send>,
    plan: SessionPlan,
    phase: TimerPhase,
    pre_pause_phase: TimerPhase,
    time_remaining_secs: u64,
    total_duration_secs: u64,
    session_elapsed_secs: u64,
    breaks_taken: u32,
    session_start: Option<DateTime<Utc>>,
    target_time: Option<DateTime<Utc>>,
}

impl SessionEngine {
    /// Create an idle engine showing the quick-session defaults.
    pub fn new(defaults: TimerDefaults, pace: Pace, clock: Arc<dyn Clock>) -> Self {
        let plan = SessionPlan::quick(&defaults);
        let work = pace.work_secs(plan.work_secs).max(1);
        Self {
            defaults,
            pace,
            clock,
            rng: Box::new(StdRng::from_entropy()),
            plan,
            phase: TimerPhase::Idle,
            pre_pause_phase: TimerPhase::Work,
            time_remaining_secs: work,
            total_duration_secs: work,
            session_elapsed_secs: 0,
            breaks_taken: 0,
            session_start: None,
            target_time: None,
        }
    }

    /// Replace the random source used for break lengths.
    pub fn with_rng<R: RngCore + Send + 'static>(mut self, rng: R) -> Self {
        self.rng = Box::new(rng);
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    /// The phase a pause interrupted (meaningful only while paused).
    pub fn pre_pause_phase(&self) -> TimerPhase {
        self.pre_pause_phase
    }

    pub fn time_remaining_secs(&self) -> u64 {
        self.time_remaining_secs
    }

    pub fn total_duration_secs(&self) -> u64 {
        self.total_duration_secs
    }

    pub fn session_elapsed_secs(&self) -> u64 {
        self.session_elapsed_secs
    }

    pub fn breaks_taken(&self) -> u32 {
        self.breaks_taken
    }

    pub fn session_start(&self) -> Option<DateTime<Utc>> {
        self.session_start
    }

    pub fn target_time(&self) -> Option<DateTime<Utc>> {
        self.target_time
    }

    pub fn plan(&self) -> &SessionPlan {
        &self.plan
    }

    pub fn defaults(&self) -> &TimerDefaults {
        &self.defaults
    }

    pub fn pace(&self) -> Pace {
        self.pace
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// 0.0 .. 1.0 progress within the current phase.
    pub fn progress(&self) -> f64 {
        self.snapshot().progress()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            time_remaining_secs: self.time_remaining_secs,
            total_duration_secs: self.total_duration_secs,
            session_elapsed_secs: self.session_elapsed_secs,
            session_goal_secs: self.plan.goal_secs,
            target_time: self.target_time,
            session_start_time: self.session_start,
            preset_name: self.plan.name.clone(),
            preset_icon: self.plan.icon.clone(),
            preset_color_hex: self.plan.color_hex.clone(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a session from a preset, or from the quick-session defaults.
    ///
    /// A session that is still live is stopped (and recorded) first.
    pub fn start(&mut self, preset: Option<&SessionPreset>) -> Vec<Event> {
        let mut events = Vec::new();
        if self.phase != TimerPhase::Idle {
            events.extend(self.stop(StopReason::Replaced));
        }

        let now = self.clock.now();
        self.plan = match preset {
            Some(preset) => SessionPlan::from_preset(preset),
            None => SessionPlan::quick(&self.defaults),
        };
        self.session_elapsed_secs = 0;
        self.breaks_taken = 0;
        self.session_start = Some(now);
        self.pre_pause_phase = TimerPhase::Work;
        self.enter_work(now);

        events.push(Event::SessionStarted {
            snapshot: self.snapshot(),
            at: now,
        });
        events
    }

    /// Freeze the countdown. No-op unless Work or Break.
    ///
    /// Unlike every other phase change, this one can happen outside a tick:
    /// a phase whose countdown already hit zero is completed here before
    /// pausing (emitting `PhaseChanged`, and counting the break when Work
    /// ends). Without it a paused session could have no time left to resume
    /// into.
    pub fn pause(&mut self) -> Vec<Event> {
        if !self.phase.is_running() {
            return Vec::new();
        }
        let now = self.clock.now();
        let mut events = Vec::new();
        // Work is never shorter than a second, so this ends within two steps.
        while self.time_remaining_secs == 0 {
            events.push(self.complete_phase(now));
        }
        self.pre_pause_phase = self.phase;
        self.phase = TimerPhase::Paused;
        self.target_time = None;
        events.push(Event::SessionPaused {
            snapshot: self.snapshot(),
            at: now,
        });
        events
    }

    /// Return to the interrupted phase with the same remaining time.
    pub fn resume(&mut self) -> Vec<Event> {
        if self.phase != TimerPhase::Paused || self.time_remaining_secs == 0 {
            return Vec::new();
        }
        let now = self.clock.now();
        self.phase = self.pre_pause_phase;
        self.target_time = offset_secs(now, self.time_remaining_secs);
        vec![Event::SessionResumed {
            snapshot: self.snapshot(),
            at: now,
        }]
    }

    /// Pause when running, resume when paused.
    pub fn toggle(&mut self) -> Vec<Event> {
        match self.phase {
            TimerPhase::Paused => self.resume(),
            TimerPhase::Work | TimerPhase::Break => self.pause(),
            TimerPhase::Idle => Vec::new(),
        }
    }

    /// End the session and produce its record. Safe to call while idle.
    pub fn stop(&mut self, reason: StopReason) -> Vec<Event> {
        let Some(start) = self.session_start else {
            return Vec::new();
        };
        let now = self.clock.now();
        let last = self.snapshot();
        let record = CompletedSessionRecord::new(start, now, self.breaks_taken);
        self.reset_idle();
        vec![Event::SessionStopped {
            reason,
            record: Some(record),
            last,
            snapshot: self.snapshot(),
            at: now,
        }]
    }

    /// Advance by one second. Ignored while idle or paused.
    pub fn tick(&mut self) -> Vec<Event> {
        if !self.phase.is_running() {
            return Vec::new();
        }

        self.session_elapsed_secs = self.session_elapsed_secs.saturating_add(1);
        if self.session_elapsed_secs >= self.plan.goal_secs {
            return self.stop(StopReason::GoalReached);
        }

        let now = self.clock.now();
        if self.time_remaining_secs > 0 {
            self.time_remaining_secs -= 1;
            vec![Event::SnapshotChanged {
                snapshot: self.snapshot(),
                at: now,
            }]
        } else {
            vec![self.complete_phase(now)]
        }
    }

    /// Change the quick-session work length and break policy.
    /// A session already in progress keeps the values it started with.
    pub fn update_configuration(&mut self, work_secs: u64, break_policy: BreakPolicy) {
        self.defaults.work_secs = work_secs.max(1);
        self.defaults.break_policy = break_policy;
        if self.phase == TimerPhase::Idle {
            self.reset_idle();
        }
    }

    pub fn set_default_goal(&mut self, goal_secs: u64) {
        self.defaults.goal_secs = goal_secs;
        if self.phase == TimerPhase::Idle {
            self.reset_idle();
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn enter_work(&mut self, now: DateTime<Utc>) {
        self.phase = TimerPhase::Work;
        self.total_duration_secs = self.pace.work_secs(self.plan.work_secs).max(1);
        self.time_remaining_secs = self.total_duration_secs;
        self.target_time = offset_secs(now, self.total_duration_secs);
    }

    fn enter_break(&mut self, now: DateTime<Utc>) {
        self.phase = TimerPhase::Break;
        self.breaks_taken = self.breaks_taken.saturating_add(1);
        self.total_duration_secs = match self.pace.break_override() {
            Some(secs) => secs,
            None => self.plan.break_policy.draw(&mut self.rng),
        };
        self.time_remaining_secs = self.total_duration_secs;
        self.target_time = offset_secs(now, self.total_duration_secs);
    }

    fn complete_phase(&mut self, now: DateTime<Utc>) -> Event {
        let from = self.phase;
        match from {
            TimerPhase::Work => self.enter_break(now),
            TimerPhase::Break => self.enter_work(now),
            TimerPhase::Idle | TimerPhase::Paused => {}
        }
        Event::PhaseChanged {
            from,
            to: self.phase,
            snapshot: self.snapshot(),
            at: now,
        }
    }

    fn reset_idle(&mut self) {
        self.plan = SessionPlan::quick(&self.defaults);
        self.phase = TimerPhase::Idle;
        self.pre_pause_phase = TimerPhase::Work;
        self.total_duration_secs = self.pace.work_secs(self.defaults.work_secs).max(1);
        self.time_remaining_secs = self.total_duration_secs;
        self.session_elapsed_secs = 0;
        self.breaks_taken = 0;
        self.session_start = None;
        self.target_time = None;
    }
}
