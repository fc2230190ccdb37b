//! Session composition root.
//!
//! [`SessionController`] wires the engine to its collaborators: the live
//! activity publisher, the history store, the reminder notifier and the
//! event broadcast. It also owns the 1 Hz ticker.
//!
//! All engine access goes through one async mutex, so ticks and commands are
//! serialized. Pausing and stopping abort the ticker while that lock is held,
//! which means no tick can land after either returns.

use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::deeplink::DeepLink;
use crate::events::{Event, StopReason};
use crate::history::HistoryStore;
use crate::live::{LivePublisher, LiveSurface};
use crate::notify::{Notifier, Reminder};
use crate::presets::SessionPreset;
use crate::timer::{BreakPolicy, SessionEngine, SessionSnapshot, TimerPhase};

const EVENT_CAPACITY: usize = 256;
const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Collaborators handed to the controller at construction.
pub struct Services {
    pub live: Arc<dyn LiveSurface>,
    pub history: Box<dyn HistoryStore>,
    pub notifier: Arc<dyn Notifier>,
    pub notifications_enabled: bool,
}

struct Inner {
    engine: SessionEngine,
    publisher: LivePublisher,
    history: Box<dyn HistoryStore>,
    notifier: Arc<dyn Notifier>,
    notifications_enabled: bool,
}

/// Cheap to clone; every clone drives the same session.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Mutex<Inner>>,
    events: broadcast::Sender<Event>,
    ticker: Arc<StdMutex<Option<JoinHandle<()>>>>,
}

impl SessionController {
    pub fn new(engine: SessionEngine, services: Services) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                engine,
                publisher: LivePublisher::new(services.live),
                history: services.history,
                notifier: services.notifier,
                notifications_enabled: services.notifications_enabled,
            })),
            events,
            ticker: Arc::new(StdMutex::new(None)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().await.engine.snapshot()
    }

    pub async fn phase(&self) -> TimerPhase {
        self.inner.lock().await.engine.phase()
    }

    /// Start a session, replacing any live one, and start ticking.
    pub async fn start_session(&self, preset: Option<SessionPreset>) -> SessionSnapshot {
        let mut inner = self.inner.lock().await;
        self.stop_ticker();
        let events = inner.engine.start(preset.as_ref());
        tracing::info!(preset = %inner.engine.plan().name, "session started");
        inner.apply(&self.events, events);
        self.spawn_ticker();
        inner.engine.snapshot()
    }

    pub async fn pause_session(&self) -> SessionSnapshot {
        let mut inner = self.inner.lock().await;
        self.pause_locked(&mut inner);
        inner.engine.snapshot()
    }

    pub async fn resume_session(&self) -> SessionSnapshot {
        let mut inner = self.inner.lock().await;
        self.resume_locked(&mut inner);
        inner.engine.snapshot()
    }

    /// Pause when running, resume when paused; decided against the
    /// engine's current phase.
    pub async fn toggle_pause(&self) -> SessionSnapshot {
        let mut inner = self.inner.lock().await;
        match inner.engine.phase() {
            TimerPhase::Paused => self.resume_locked(&mut inner),
            TimerPhase::Work | TimerPhase::Break => self.pause_locked(&mut inner),
            TimerPhase::Idle => {}
        }
        inner.engine.snapshot()
    }

    /// Stop the session, recording it. A no-op while idle.
    pub async fn stop_session(&self) -> SessionSnapshot {
        let mut inner = self.inner.lock().await;
        self.stop_ticker();
        let events = inner.engine.stop(StopReason::User);
        inner.apply(&self.events, events);
        inner.engine.snapshot()
    }

    /// Advance one second. Returns whether the session is still running.
    ///
    /// The internal ticker calls this; it is public so callers without a
    /// ticker (tests, embedders with their own clock) can drive the engine.
    pub async fn tick(&self) -> bool {
        let mut inner = self.inner.lock().await;
        inner.tick(&self.events)
    }

    pub async fn update_configuration(&self, work_secs: u64, break_policy: BreakPolicy) {
        let mut inner = self.inner.lock().await;
        inner.engine.update_configuration(work_secs, break_policy);
    }

    pub async fn set_default_goal(&self, goal_secs: u64) {
        let mut inner = self.inner.lock().await;
        inner.engine.set_default_goal(goal_secs);
    }

    pub async fn handle_deep_link(&self, link: DeepLink) -> SessionSnapshot {
        tracing::debug!(%link, "deep link");
        match link {
            DeepLink::Open => self.snapshot().await,
            DeepLink::Toggle => self.toggle_pause().await,
            DeepLink::Stop => self.stop_session().await,
        }
    }

    /// True while the background ticker task is alive.
    pub fn is_ticking(&self) -> bool {
        self.ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn pause_locked(&self, inner: &mut Inner) {
        let events = inner.engine.pause();
        if !events.is_empty() {
            self.stop_ticker();
        }
        inner.apply(&self.events, events);
    }

    fn resume_locked(&self, inner: &mut Inner) {
        let events = inner.engine.resume();
        if !events.is_empty() {
            self.spawn_ticker();
        }
        inner.apply(&self.events, events);
    }

    fn spawn_ticker(&self) {
        let shared = Arc::clone(&self.inner);
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_PERIOD);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let mut inner = shared.lock().await;
                if !inner.tick(&events) {
                    break;
                }
            }
        });
        let previous = self
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    fn stop_ticker(&self) {
        let handle = self
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl Inner {
    fn tick(&mut self, tx: &broadcast::Sender<Event>) -> bool {
        let events = self.engine.tick();
        self.apply(tx, events);
        self.engine.phase().is_running()
    }

    /// Run side effects for each event, then broadcast it.
    fn apply(&mut self, tx: &broadcast::Sender<Event>, events: Vec<Event>) {
        for event in events {
            let mut follow_up = None;
            match &event {
                Event::SessionStarted { snapshot, at } => {
                    if let Err(e) = self.publisher.start(snapshot, *at) {
                        tracing::warn!(error = %e, "live activity could not be started");
                    }
                    self.remind_for(snapshot);
                }
                Event::SnapshotChanged { snapshot, .. } => self.publisher.update(snapshot),
                Event::PhaseChanged { from, to, snapshot, .. } => {
                    tracing::info!(from = ?from, to = ?to, "phase changed");
                    self.publisher.update(snapshot);
                    self.remind_for(snapshot);
                }
                Event::SessionPaused { snapshot, .. } => {
                    self.publisher.update(snapshot);
                    self.notifier.cancel_all();
                }
                Event::SessionResumed { snapshot, .. } => {
                    self.publisher.update(snapshot);
                    self.remind_for(snapshot);
                }
                Event::SessionStopped {
                    reason,
                    record,
                    last,
                    at,
                    ..
                } => {
                    self.publisher.end(last, *at);
                    self.notifier.cancel_all();
                    if *reason == StopReason::GoalReached && self.notifications_enabled {
                        self.notifier.schedule(Reminder::goal_reached());
                    }
                    if let Some(record) = record {
                        tracing::info!(
                            reason = ?reason,
                            duration_secs = record.duration_secs(),
                            "session stopped"
                        );
                        if let Err(e) = self.history.append(record) {
                            tracing::error!(error = %e, "failed to record completed session");
                            follow_up = Some(Event::HistoryWriteFailed {
                                message: e.to_string(),
                                at: *at,
                            });
                        }
                    }
                }
                Event::HistoryWriteFailed { .. } => {}
            }
            // No subscribers is not an error.
            let _ = tx.send(event);
            if let Some(event) = follow_up {
                let _ = tx.send(event);
            }
        }
    }

    /// Schedule the reminder for the end of the phase `snapshot` is in.
    fn remind_for(&self, snapshot: &SessionSnapshot) {
        if !self.notifications_enabled {
            return;
        }
        let reminder = match snapshot.phase {
            TimerPhase::Work => Reminder::break_due(snapshot.time_remaining_secs),
            TimerPhase::Break => Reminder::break_over(snapshot.time_remaining_secs),
            TimerPhase::Idle | TimerPhase::Paused => return,
        };
        self.notifier.cancel_all();
        self.notifier.schedule(reminder);
    }
}
