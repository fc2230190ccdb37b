//! End-to-end session lifecycle through the engine and the controller.

use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::SeedableRng;
use rand_pcg::Pcg64;
use tweny_core::live::{
    ActivityAttributes, ActivityContent, ActivityId, ActivityPhase, LiveActivityError,
};
use tweny_core::{
    BreakPolicy, Database, Event, HistoryStore, LiveSurface, ManualClock, Pace, SessionController,
    SessionEngine, SessionPreset, Services, StopReason, TimerDefaults, TimerPhase,
    TracingNotifier,
};

// ============================================================================
// Helpers
// ============================================================================

fn engine(clock: &ManualClock, seed: u64) -> SessionEngine {
    SessionEngine::new(TimerDefaults::default(), Pace::RealTime, Arc::new(clock.clone()))
        .with_rng(Pcg64::seed_from_u64(seed))
}

fn run_ticks(engine: &mut SessionEngine, clock: &ManualClock, n: u64) -> Vec<Event> {
    let mut events = Vec::new();
    for _ in 0..n {
        clock.advance_secs(1);
        events.extend(engine.tick());
    }
    events
}

/// Surface that records every call in order.
#[derive(Default)]
struct RecordingSurface {
    calls: Mutex<Vec<(String, ActivityId, ActivityPhase)>>,
}

#[async_trait]
impl LiveSurface for RecordingSurface {
    fn request(
        &self,
        _attributes: ActivityAttributes,
        content: ActivityContent,
    ) -> Result<ActivityId, LiveActivityError> {
        let id = ActivityId::new();
        self.calls.lock().unwrap().push(("request".into(), id, content.phase));
        Ok(id)
    }

    async fn update(
        &self,
        id: ActivityId,
        content: ActivityContent,
    ) -> Result<(), LiveActivityError> {
        self.calls.lock().unwrap().push(("update".into(), id, content.phase));
        Ok(())
    }

    async fn end(&self, id: ActivityId, content: ActivityContent) -> Result<(), LiveActivityError> {
        self.calls.lock().unwrap().push(("end".into(), id, content.phase));
        Ok(())
    }
}

// ============================================================================
// Engine
// ============================================================================

#[test]
fn full_cycle_with_quick_defaults() {
    let clock = ManualClock::new(Utc::now());
    let mut engine = engine(&clock, 11);
    engine.start(None);

    // 1200 ticks drain the work interval, the next one switches phase.
    run_ticks(&mut engine, &clock, 1200);
    assert_eq!(engine.phase(), TimerPhase::Work);
    assert_eq!(engine.time_remaining_secs(), 0);
    let events = run_ticks(&mut engine, &clock, 1);
    assert!(matches!(
        events.as_slice(),
        [Event::PhaseChanged {
            from: TimerPhase::Work,
            to: TimerPhase::Break,
            ..
        }]
    ));
    let brk = engine.total_duration_secs();
    assert!((20..=25).contains(&brk), "break of {brk}s");
    assert_eq!(engine.breaks_taken(), 1);

    run_ticks(&mut engine, &clock, brk + 1);
    assert_eq!(engine.phase(), TimerPhase::Work);
    assert_eq!(engine.total_duration_secs(), 1200);
    assert_eq!(engine.time_remaining_secs(), 1200);
}

#[test]
fn preset_break_interval_is_used() {
    let clock = ManualClock::new(Utc::now());
    let mut engine = engine(&clock, 5);
    let preset = SessionPreset::new("Deep Work", 2 * 3600, 50 * 60, 10 * 60, "#5856D6", "🧠");
    engine.start(Some(&preset));
    assert_eq!(engine.snapshot().preset_name, "Deep Work");

    run_ticks(&mut engine, &clock, 3001);
    assert_eq!(engine.phase(), TimerPhase::Break);
    assert_eq!(engine.total_duration_secs(), 600);
}

#[test]
fn goal_stops_session_and_records_it() {
    let start = Utc::now();
    let clock = ManualClock::new(start);
    let mut engine = engine(&clock, 1);
    let preset = SessionPreset::new("Tiny", 30, 10, 5, "#000000", "⏳");
    engine.start(Some(&preset));

    let events = run_ticks(&mut engine, &clock, 30);
    assert_eq!(engine.phase(), TimerPhase::Idle);
    let stopped = events
        .iter()
        .find_map(|e| match e {
            Event::SessionStopped {
                reason, record, last, ..
            } => Some((*reason, record.clone(), last.clone())),
            _ => None,
        })
        .expect("session stopped");
    assert_eq!(stopped.0, StopReason::GoalReached);
    assert_eq!(stopped.2.session_elapsed_secs, 30);
    let record = stopped.1.expect("record");
    assert_eq!(record.start_time, start);
    assert_eq!(record.duration(), Duration::seconds(30));
}

#[test]
fn accelerated_pace_shortens_every_interval() {
    let clock = ManualClock::new(Utc::now());
    let mut engine = SessionEngine::new(
        TimerDefaults::default(),
        Pace::Accelerated {
            work_secs: 10,
            break_secs: 5,
        },
        Arc::new(clock.clone()),
    );
    engine.start(None);
    assert_eq!(engine.time_remaining_secs(), 10);
    run_ticks(&mut engine, &clock, 11);
    assert_eq!(engine.phase(), TimerPhase::Break);
    assert_eq!(engine.total_duration_secs(), 5);
}

#[test]
fn configuration_changes_do_not_touch_running_session() {
    let clock = ManualClock::new(Utc::now());
    let mut engine = engine(&clock, 2);
    engine.start(None);
    engine.update_configuration(25 * 60, BreakPolicy::Fixed { secs: 30 });
    assert_eq!(engine.total_duration_secs(), 1200);

    engine.stop(StopReason::User);
    assert_eq!(engine.time_remaining_secs(), 1500);
    engine.start(None);
    run_ticks(&mut engine, &clock, 1501);
    assert_eq!(engine.total_duration_secs(), 30);
}

// ============================================================================
// Controller
// ============================================================================

#[tokio::test(start_paused = true)]
async fn controller_persists_and_publishes() {
    let clock = ManualClock::new(Utc::now());
    let surface = Arc::new(RecordingSurface::default());
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("tweny.db");

    let controller = SessionController::new(
        engine(&clock, 9),
        Services {
            live: surface.clone(),
            history: Box::new(Database::open_at(&db_path).unwrap()),
            notifier: Arc::new(TracingNotifier),
            notifications_enabled: false,
        },
    );

    controller.start_session(None).await;
    tokio::time::sleep(StdDuration::from_millis(5_500)).await;
    clock.advance_secs(5);
    controller.stop_session().await;
    tokio::time::sleep(StdDuration::from_millis(10)).await;

    let calls = surface.calls.lock().unwrap().clone();
    assert_eq!(calls.first().map(|c| c.0.as_str()), Some("request"));
    let updates = calls.iter().filter(|c| c.0 == "update").count();
    assert_eq!(updates, 5);
    let last = calls.last().unwrap();
    assert_eq!(last.0, "end");
    assert_eq!(last.2, ActivityPhase::Done);

    let db = Database::open_at(&db_path).unwrap();
    let records = db.list_desc().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].duration_secs(), 5);
}

#[tokio::test]
async fn restarting_replaces_and_records_previous_session() {
    let clock = ManualClock::new(Utc::now());
    let controller = SessionController::new(
        engine(&clock, 4),
        Services {
            live: Arc::new(RecordingSurface::default()),
            history: Box::new(Database::open_memory().unwrap()),
            notifier: Arc::new(TracingNotifier),
            notifications_enabled: true,
        },
    );
    let mut events = controller.subscribe();

    controller.start_session(None).await;
    clock.advance_secs(60);
    let preset = SessionPreset::defaults().remove(2);
    let snap = controller.start_session(Some(preset)).await;
    assert_eq!(snap.preset_name, "Quick Focus");
    assert_eq!(snap.time_remaining_secs, 25 * 60);

    let kinds: Vec<String> = std::iter::from_fn(|| events.try_recv().ok())
        .map(|e| match e {
            Event::SessionStarted { .. } => "started".to_string(),
            Event::SessionStopped { reason, .. } => format!("stopped:{reason:?}"),
            other => format!("{other:?}"),
        })
        .collect();
    assert_eq!(kinds, ["started", "stopped:Replaced", "started"]);
    controller.stop_session().await;
}
