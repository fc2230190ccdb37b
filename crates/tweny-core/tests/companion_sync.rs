//! Primary and companion talking over an in-process link.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tweny_core::sync::transport::{LoopbackInbox, LoopbackPair};
use tweny_core::sync::{CompanionMirror, LoopbackTransport, Message, PrimaryLink};
use tweny_core::{
    Database, ManualClock, Pace, SessionController, SessionEngine, SessionPreset, Services,
    TimerDefaults, TimerPhase, TracingNotifier, TracingSurface,
};

// ============================================================================
// Helpers
// ============================================================================

fn controller() -> SessionController {
    let clock = ManualClock::new(Utc::now());
    SessionController::new(
        SessionEngine::new(TimerDefaults::default(), Pace::RealTime, Arc::new(clock)),
        Services {
            live: Arc::new(TracingSurface),
            history: Box::new(Database::open_memory().unwrap()),
            notifier: Arc::new(TracingNotifier),
            notifications_enabled: false,
        },
    )
}

/// Feed link events into the mirror until `done` holds.
async fn pump_until<F>(mirror: &mut CompanionMirror, inbox: &mut LoopbackInbox, done: F) -> bool
where
    F: Fn(&CompanionMirror) -> bool,
{
    if done(mirror) {
        return true;
    }
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(event) = inbox.recv().await {
            mirror.handle_event(event).await;
            if done(mirror) {
                return true;
            }
        }
        false
    })
    .await;
    waited.unwrap_or(false)
}

struct Harness {
    controller: SessionController,
    mirror: CompanionMirror,
    inbox: LoopbackInbox,
    control: tweny_core::sync::transport::LinkControl,
    server: tokio::task::JoinHandle<()>,
}

fn harness(reachable: bool) -> Harness {
    let LoopbackPair {
        primary,
        primary_inbox,
        companion,
        companion_inbox,
        control,
    } = LoopbackTransport::pair();
    control.set_reachable(reachable);

    let controller = controller();
    let link = Arc::new(PrimaryLink::new(
        Arc::new(primary),
        controller.clone(),
        SessionPreset::defaults(),
    ));
    let events = controller.subscribe();
    let server = tokio::spawn(async move { link.run(primary_inbox, events).await });

    Harness {
        controller,
        mirror: CompanionMirror::new(Arc::new(companion)),
        inbox: companion_inbox,
        control,
        server,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn companion_drives_the_primary_session() {
    let mut h = harness(true);
    h.mirror.activate().await;

    assert!(
        pump_until(&mut h.mirror, &mut h.inbox, |m| {
            m.state().is_some() && m.presets().len() == 3
        })
        .await
    );
    assert_eq!(h.mirror.phase(), TimerPhase::Idle);

    let deep_work = h.mirror.presets()[1].clone();
    h.mirror.start_session(&deep_work).await.unwrap();
    assert!(
        pump_until(&mut h.mirror, &mut h.inbox, |m| {
            m.phase() == TimerPhase::Work
                && m.state().is_some_and(|s| s.preset_name == "Deep Work")
        })
        .await
    );
    assert_eq!(h.controller.snapshot().await.total_duration_secs, 50 * 60);

    h.mirror.toggle_pause().await.unwrap();
    assert!(pump_until(&mut h.mirror, &mut h.inbox, |m| m.phase() == TimerPhase::Paused).await);
    assert_eq!(h.controller.phase().await, TimerPhase::Paused);

    h.mirror.toggle_pause().await.unwrap();
    assert!(pump_until(&mut h.mirror, &mut h.inbox, |m| m.phase() == TimerPhase::Work).await);

    h.mirror.stop().await.unwrap();
    assert!(pump_until(&mut h.mirror, &mut h.inbox, |m| m.phase() == TimerPhase::Idle).await);
    assert_eq!(h.controller.phase().await, TimerPhase::Idle);

    h.server.abort();
}

#[tokio::test]
async fn reconnect_resyncs_state_and_context() {
    let mut h = harness(false);
    h.mirror.activate().await;
    assert!(!h.mirror.is_connected());
    assert!(h.mirror.toggle_pause().await.is_err());

    // Started on the primary while the companion is away.
    h.controller.start_session(None).await;
    tokio::task::yield_now().await;
    assert!(h.mirror.state().is_none());

    h.control.set_reachable(true);
    assert!(
        pump_until(&mut h.mirror, &mut h.inbox, |m| {
            m.is_connected() && m.phase() == TimerPhase::Work && m.presets().len() == 3
        })
        .await
    );
    assert_eq!(h.mirror.state().unwrap().preset_name, "Quick Session");

    h.controller.stop_session().await;
    h.server.abort();
}

#[test]
fn malformed_preset_does_not_poison_the_batch() {
    let raw = r##"{
        "type": "presets",
        "data": [
            {"id": "0E984725-C51C-4BF4-9960-E1C80E27ABA0", "name": "Broken",
             "sessionGoal": 3600, "breakInterval": 20, "colorHex": "#000000", "icon": "x"},
            {"id": "6F9619FF-8B86-D011-B42D-00C04FC964FF", "name": "Reading",
             "sessionGoal": 1800, "workInterval": 900, "breakInterval": 30,
             "colorHex": "#34C759", "icon": "📖"}
        ]
    }"##;
    let Message::Presets(presets) = Message::from_json(raw).unwrap() else {
        panic!("expected a preset batch");
    };
    assert_eq!(presets.len(), 1);
    assert_eq!(presets[0].name, "Reading");
}
