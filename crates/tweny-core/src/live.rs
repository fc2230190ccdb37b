//! Live activity publishing.
//!
//! A live activity is a system-level display surface (lock screen, widget)
//! that mirrors the running session. Each session gets one activity with a
//! start/update/end lifecycle:
//!
//! - **start** registers immutable [`ActivityAttributes`] plus the first
//!   [`ActivityContent`],
//! - **update** pushes fresh content on every tick and phase change,
//! - **end** pushes a final `Done` content and deregisters.
//!
//! Registration is synchronous; update and end are fire-and-forget tasks.
//! The publisher forgets its handle *before* dispatching the end, so a slow
//! end confirmation from an old session can never clear the handle of the
//! session that replaced it.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::timer::{SessionSnapshot, TimerPhase};

pub const ACTIVITY_SESSION_NAME: &str = "Eye Care Session";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivityId(pub Uuid);

impl ActivityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActivityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LiveActivityError {
    #[error("Live activities are unavailable: {0}")]
    Unavailable(String),

    #[error("Live activity {0} not found")]
    NotFound(ActivityId),

    #[error("Live activity push rejected: {0}")]
    Rejected(String),
}

/// Fixed for the lifetime of an activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityAttributes {
    pub session_name: String,
    pub interval_duration_secs: u64,
    pub session_goal_secs: u64,
}

impl ActivityAttributes {
    pub fn for_snapshot(snapshot: &SessionSnapshot) -> Self {
        Self {
            session_name: ACTIVITY_SESSION_NAME.to_string(),
            interval_duration_secs: snapshot.total_duration_secs,
            session_goal_secs: snapshot.session_goal_secs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityPhase {
    Focus,
    Break,
    Paused,
    Done,
}

impl ActivityPhase {
    pub fn status_message(&self) -> &'static str {
        match self {
            ActivityPhase::Focus => "Focus time",
            ActivityPhase::Break => "Look 20m away!",
            ActivityPhase::Paused => "Session Paused",
            ActivityPhase::Done => "Session Completed",
        }
    }
}

impl From<TimerPhase> for ActivityPhase {
    fn from(phase: TimerPhase) -> Self {
        match phase {
            TimerPhase::Work => ActivityPhase::Focus,
            TimerPhase::Break => ActivityPhase::Break,
            TimerPhase::Paused => ActivityPhase::Paused,
            TimerPhase::Idle => ActivityPhase::Done,
        }
    }
}

/// The mutable part of an activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityContent {
    pub time_remaining_secs: u64,
    pub progress: f64,
    pub phase: ActivityPhase,
    pub status_message: String,
    pub session_elapsed_secs: u64,
    pub target_time: Option<DateTime<Utc>>,
    pub session_start_time: Option<DateTime<Utc>>,
    pub session_end_time: Option<DateTime<Utc>>,
}

impl ActivityContent {
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        let phase = ActivityPhase::from(snapshot.phase);
        Self {
            time_remaining_secs: snapshot.time_remaining_secs,
            progress: snapshot.progress(),
            phase,
            status_message: phase.status_message().to_string(),
            session_elapsed_secs: snapshot.session_elapsed_secs,
            target_time: snapshot.target_time,
            session_start_time: snapshot.session_start_time,
            session_end_time: snapshot.session_end_time(),
        }
    }

    /// Final content pushed with the end of an activity.
    pub fn done(last: &SessionSnapshot, at: DateTime<Utc>) -> Self {
        Self {
            time_remaining_secs: 0,
            progress: 1.0,
            phase: ActivityPhase::Done,
            status_message: ActivityPhase::Done.status_message().to_string(),
            session_elapsed_secs: last.session_elapsed_secs,
            target_time: None,
            session_start_time: last.session_start_time,
            session_end_time: Some(at),
        }
    }
}

/// A platform surface that can host live activities.
#[async_trait]
pub trait LiveSurface: Send + Sync {
    /// Register a new activity and return its handle.
    fn request(
        &self,
        attributes: ActivityAttributes,
        content: ActivityContent,
    ) -> Result<ActivityId, LiveActivityError>;

    async fn update(&self, id: ActivityId, content: ActivityContent)
        -> Result<(), LiveActivityError>;

    /// Push the final content and deregister.
    async fn end(&self, id: ActivityId, content: ActivityContent) -> Result<(), LiveActivityError>;
}

/// Surface that only logs; used where no system surface exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSurface;

#[async_trait]
impl LiveSurface for TracingSurface {
    fn request(
        &self,
        attributes: ActivityAttributes,
        content: ActivityContent,
    ) -> Result<ActivityId, LiveActivityError> {
        let id = ActivityId::new();
        tracing::info!(%id, name = %attributes.session_name, status = %content.status_message, "live activity started");
        Ok(id)
    }

    async fn update(
        &self,
        id: ActivityId,
        content: ActivityContent,
    ) -> Result<(), LiveActivityError> {
        tracing::trace!(%id, remaining = content.time_remaining_secs, "live activity updated");
        Ok(())
    }

    async fn end(&self, id: ActivityId, content: ActivityContent) -> Result<(), LiveActivityError> {
        tracing::info!(%id, elapsed = content.session_elapsed_secs, "live activity ended");
        Ok(())
    }
}

/// Owns the single current activity handle.
pub struct LivePublisher {
    surface: Arc<dyn LiveSurface>,
    current: Option<ActivityId>,
}

impl LivePublisher {
    pub fn new(surface: Arc<dyn LiveSurface>) -> Self {
        Self {
            surface,
            current: None,
        }
    }

    pub fn current(&self) -> Option<ActivityId> {
        self.current
    }

    /// Start an activity for a freshly started session, ending any prior one.
    pub fn start(
        &mut self,
        snapshot: &SessionSnapshot,
        at: DateTime<Utc>,
    ) -> Result<ActivityId, LiveActivityError> {
        self.end(snapshot, at);
        let id = self.surface.request(
            ActivityAttributes::for_snapshot(snapshot),
            ActivityContent::from_snapshot(snapshot),
        )?;
        self.current = Some(id);
        Ok(id)
    }

    /// Push new content. Dropped silently when no activity is live.
    pub fn update(&self, snapshot: &SessionSnapshot) {
        let Some(id) = self.current else {
            return;
        };
        let surface = Arc::clone(&self.surface);
        let content = ActivityContent::from_snapshot(snapshot);
        dispatch(async move {
            if let Err(e) = surface.update(id, content).await {
                tracing::debug!(%id, error = %e, "live activity update dropped");
            }
        });
    }

    /// End the current activity with final content built from `last`.
    pub fn end(&mut self, last: &SessionSnapshot, at: DateTime<Utc>) {
        // Forget the handle before the end is in flight.
        let Some(id) = self.current.take() else {
            return;
        };
        let surface = Arc::clone(&self.surface);
        let content = ActivityContent::done(last, at);
        dispatch(async move {
            if let Err(e) = surface.end(id, content).await {
                tracing::debug!(%id, error = %e, "live activity end failed");
            }
        });
    }
}

fn dispatch<F>(fut: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(fut);
        }
        Err(_) => tracing::debug!("no async runtime, live activity push dropped"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// Surface whose `end` blocks until the gate opens.
    #[derive(Default)]
    struct GatedSurface {
        active: Mutex<HashSet<ActivityId>>,
        updates: Mutex<Vec<(ActivityId, ActivityContent)>>,
        ended: Mutex<Vec<(ActivityId, ActivityContent)>>,
        gate: Notify,
    }

    #[async_trait]
    impl LiveSurface for GatedSurface {
        fn request(
            &self,
            _attributes: ActivityAttributes,
            _content: ActivityContent,
        ) -> Result<ActivityId, LiveActivityError> {
            let id = ActivityId::new();
            self.active.lock().unwrap().insert(id);
            Ok(id)
        }

        async fn update(
            &self,
            id: ActivityId,
            content: ActivityContent,
        ) -> Result<(), LiveActivityError> {
            if !self.active.lock().unwrap().contains(&id) {
                return Err(LiveActivityError::NotFound(id));
            }
            self.updates.lock().unwrap().push((id, content));
            Ok(())
        }

        async fn end(
            &self,
            id: ActivityId,
            content: ActivityContent,
        ) -> Result<(), LiveActivityError> {
            self.gate.notified().await;
            self.active.lock().unwrap().remove(&id);
            self.ended.lock().unwrap().push((id, content));
            Ok(())
        }
    }

    fn snapshot(phase: TimerPhase, remaining: u64) -> SessionSnapshot {
        SessionSnapshot {
            phase,
            time_remaining_secs: remaining,
            total_duration_secs: 1200,
            session_elapsed_secs: 60,
            session_goal_secs: 14_400,
            target_time: None,
            session_start_time: Some(Utc::now()),
            preset_name: "Quick Session".into(),
            preset_icon: "⏳".into(),
            preset_color_hex: "#007AFF".into(),
        }
    }

    #[test]
    fn content_maps_phase_and_status() {
        let content = ActivityContent::from_snapshot(&snapshot(TimerPhase::Break, 10));
        assert_eq!(content.phase, ActivityPhase::Break);
        assert_eq!(content.status_message, "Look 20m away!");

        let paused = ActivityContent::from_snapshot(&snapshot(TimerPhase::Paused, 10));
        assert_eq!(paused.status_message, "Session Paused");
    }

    #[test]
    fn done_content_is_complete() {
        let now = Utc::now();
        let done = ActivityContent::done(&snapshot(TimerPhase::Work, 600), now);
        assert_eq!(done.phase, ActivityPhase::Done);
        assert_eq!(done.progress, 1.0);
        assert_eq!(done.time_remaining_secs, 0);
        assert_eq!(done.session_end_time, Some(now));
    }

    #[test]
    fn attributes_carry_interval_and_goal() {
        let attrs = ActivityAttributes::for_snapshot(&snapshot(TimerPhase::Work, 1200));
        assert_eq!(attrs.session_name, ACTIVITY_SESSION_NAME);
        assert_eq!(attrs.interval_duration_secs, 1200);
        assert_eq!(attrs.session_goal_secs, 14_400);
    }

    #[tokio::test]
    async fn stale_end_does_not_clear_new_handle() {
        let surface = Arc::new(GatedSurface::default());
        let mut publisher = LivePublisher::new(surface.clone());
        let now = Utc::now();

        let first = publisher.start(&snapshot(TimerPhase::Work, 1200), now).unwrap();
        // Starting again ends the first activity; its end is still pending.
        let second = publisher.start(&snapshot(TimerPhase::Work, 1200), now).unwrap();
        assert_ne!(first, second);
        assert_eq!(publisher.current(), Some(second));

        surface.gate.notify_one();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert_eq!(publisher.current(), Some(second));
        let ended = surface.ended.lock().unwrap().clone();
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].0, first);
        assert_eq!(ended[0].1.phase, ActivityPhase::Done);
        assert!(surface.active.lock().unwrap().contains(&second));
    }

    #[tokio::test]
    async fn update_without_activity_is_dropped() {
        let surface = Arc::new(GatedSurface::default());
        let publisher = LivePublisher::new(surface.clone());
        publisher.update(&snapshot(TimerPhase::Work, 100));
        tokio::task::yield_now().await;
        assert!(surface.updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_reaches_current_activity() {
        let surface = Arc::new(GatedSurface::default());
        let mut publisher = LivePublisher::new(surface.clone());
        let id = publisher.start(&snapshot(TimerPhase::Work, 1200), Utc::now()).unwrap();
        publisher.update(&snapshot(TimerPhase::Work, 1199));
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        let updates = surface.updates.lock().unwrap().clone();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, id);
        assert_eq!(updates[0].1.time_remaining_secs, 1199);
    }

    #[test]
    fn end_outside_runtime_still_clears_handle() {
        let surface = Arc::new(GatedSurface::default());
        let mut publisher = LivePublisher::new(surface);
        publisher.start(&snapshot(TimerPhase::Work, 1200), Utc::now()).unwrap();
        publisher.end(&snapshot(TimerPhase::Work, 1100), Utc::now());
        assert!(publisher.current().is_none());
    }
}
