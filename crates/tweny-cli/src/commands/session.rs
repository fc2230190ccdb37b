use std::io::Write;
use std::sync::Arc;

use clap::Subcommand;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tweny_core::error::ValidationError;
use tweny_core::sync::{CompanionMirror, LoopbackTransport, PrimaryLink};
use tweny_core::{
    Config, Database, DeepLink, Event, Pace, PresetRegistry, SessionController, SessionEngine,
    Services, SystemClock, TimerPhase, TracingNotifier, TracingSurface,
};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start a session and stream its events as JSON lines.
    ///
    /// Reads `pause`, `resume`, `toggle`, `stop`, `open` or `tweny://` links
    /// from stdin. Ctrl-C stops the session.
    Run {
        /// Preset name or id (quick session when omitted)
        #[arg(long)]
        preset: Option<String>,
        /// Use the short debug intervals from config
        #[arg(long)]
        accelerated: bool,
        /// Do not start the companion link
        #[arg(long)]
        no_companion: bool,
    },
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SessionAction::Run {
            preset,
            accelerated,
            no_companion,
        } => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            let result = runtime.block_on(run_session(preset, accelerated, no_companion));
            // A pending stdin read would otherwise hold the process open.
            runtime.shutdown_background();
            result
        }
    }
}

async fn run_session(
    preset_key: Option<String>,
    accelerated: bool,
    no_companion: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    // A broken config file should not keep a session from starting.
    let config = Config::load_or_default();
    let db = Database::open()?;
    let registry = PresetRegistry::load(&db);
    let preset = match preset_key {
        Some(key) => Some(
            registry
                .find(&key)
                .cloned()
                .ok_or(ValidationError::PresetNotFound(key))?,
        ),
        None => None,
    };

    let pace = if accelerated {
        Pace::Accelerated {
            work_secs: config.debug.work_seconds,
            break_secs: config.debug.break_seconds,
        }
    } else {
        config.pace()
    };
    let engine = SessionEngine::new(config.timer_defaults(), pace, Arc::new(SystemClock));
    let controller = SessionController::new(
        engine,
        Services {
            live: Arc::new(TracingSurface),
            history: Box::new(db),
            notifier: Arc::new(TracingNotifier),
            notifications_enabled: config.notifications.enabled,
        },
    );

    let mut events = controller.subscribe();
    let link_tasks = if config.sync.companion_enabled && !no_companion {
        spawn_companion(&controller, registry.list().to_vec())
    } else {
        Vec::new()
    };

    controller.start_session(preset).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            received = events.recv() => {
                let mut out = std::io::stdout();
                if let Flow::Exit = on_event(received, &mut events, &controller, &mut out).await? {
                    break;
                }
            }
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => handle_command(&controller, line.trim()).await?,
                None => stdin_open = false,
            },
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                tracing::info!("interrupted, stopping session");
                controller.stop_session().await;
            }
        }
    }

    for task in link_tasks {
        task.abort();
    }
    Ok(())
}

enum Flow {
    Continue,
    Exit,
}

/// Print one received event. The run ends once the session is back to idle,
/// including when the stop itself was lost to a lag.
async fn on_event(
    received: Result<Event, RecvError>,
    events: &mut broadcast::Receiver<Event>,
    controller: &SessionController,
    out: &mut impl Write,
) -> Result<Flow, Box<dyn std::error::Error>> {
    match received {
        Ok(event) => {
            print_event(out, &event)?;
            if !matches!(event, Event::SessionStopped { .. }) {
                return Ok(Flow::Continue);
            }
        }
        Err(RecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "event output lagged");
            if controller.phase().await != TimerPhase::Idle {
                return Ok(Flow::Continue);
            }
        }
        Err(RecvError::Closed) => return Ok(Flow::Exit),
    }
    // History failures are broadcast right after the stop.
    loop {
        match events.try_recv() {
            Ok(event) => print_event(out, &event)?,
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    Ok(Flow::Exit)
}

fn print_event(out: &mut impl Write, event: &Event) -> Result<(), Box<dyn std::error::Error>> {
    serde_json::to_writer(&mut *out, event)?;
    writeln!(out)?;
    Ok(())
}

async fn handle_command(
    controller: &SessionController,
    line: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    match line {
        "" => {}
        "pause" => {
            controller.pause_session().await;
        }
        "resume" => {
            controller.resume_session().await;
        }
        "toggle" => {
            controller.toggle_pause().await;
        }
        "stop" => {
            controller.stop_session().await;
        }
        "open" | "status" => {
            let snapshot = controller.snapshot().await;
            println!(
                "{}",
                serde_json::to_string(&json!({ "type": "status", "snapshot": snapshot }))?
            );
        }
        other => match DeepLink::parse(other) {
            Ok(DeepLink::Open) => {
                let snapshot = controller.handle_deep_link(DeepLink::Open).await;
                println!(
                    "{}",
                    serde_json::to_string(&json!({ "type": "status", "snapshot": snapshot }))?
                );
            }
            Ok(link) => {
                controller.handle_deep_link(link).await;
            }
            Err(e) => tracing::warn!(input = other, error = %e, "unknown command"),
        },
    }
    Ok(())
}

/// Run the primary link and an in-process companion mirror over a loopback
/// transport. The mirror logs every state it receives.
fn spawn_companion(
    controller: &SessionController,
    presets: Vec<tweny_core::SessionPreset>,
) -> Vec<JoinHandle<()>> {
    let pair = LoopbackTransport::pair();
    let primary = PrimaryLink::new(Arc::new(pair.primary), controller.clone(), presets);
    let primary_inbox = pair.primary_inbox;
    let events = controller.subscribe();
    let primary_task = tokio::spawn(async move {
        primary.run(primary_inbox, events).await;
    });

    let mut companion_inbox = pair.companion_inbox;
    let mut mirror = CompanionMirror::new(Arc::new(pair.companion));
    let companion_task = tokio::spawn(async move {
        mirror.activate().await;
        while let Some(event) = companion_inbox.recv().await {
            mirror.handle_event(event).await;
            if let Some(state) = mirror.state() {
                tracing::debug!(
                    phase = ?state.phase,
                    remaining = state.time_remaining_secs,
                    presets = mirror.presets().len(),
                    "companion mirror updated"
                );
            }
        }
    });

    vec![primary_task, companion_task]
}
