//! # Tweny Core Library
//!
//! Core logic for Tweny, a 20-20-20 eye-care focus timer: every work
//! interval ends with a short break to look at something far away, until
//! the session goal is reached. Front ends (the `tweny` CLI, or any other
//! shell) are thin layers over this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a tick-driven state machine (Idle/Work/Break/Paused)
//!   that the caller advances once per second
//! - **Controller**: the composition root that owns the engine, the ticker
//!   and every collaborator, and broadcasts [`Event`]s
//! - **Live activity**: start/update/end publishing to a system surface
//! - **Sync**: primary/companion messaging over a [`sync::Transport`]
//! - **Storage**: SQLite history and preset storage, TOML configuration
//! - **Stats**: streaks, rank and badges derived from history
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: core timer state machine
//! - [`SessionController`]: runs sessions and fans out events
//! - [`PresetRegistry`]: saved session configurations
//! - [`Database`]: history and key-value persistence
//! - [`Config`]: application configuration management

pub mod controller;
pub mod deeplink;
pub mod error;
pub mod events;
pub mod history;
pub mod live;
pub mod notify;
pub mod presets;
pub mod stats;
pub mod storage;
pub mod sync;
pub mod timer;

pub use controller::{SessionController, Services};
pub use deeplink::DeepLink;
pub use error::{ConfigError, CoreError, DatabaseError, Result, ValidationError};
pub use events::{Event, StopReason};
pub use history::{CompletedSessionRecord, HistoryStore};
pub use live::{LivePublisher, LiveSurface, TracingSurface};
pub use notify::{Notifier, Reminder, TracingNotifier};
pub use presets::{PresetRegistry, SessionPreset, MAX_PRESETS};
pub use stats::HistorySummary;
pub use storage::{Config, Database, KeyValueStore};
pub use timer::{
    BreakPolicy, Clock, ManualClock, Pace, SessionEngine, SessionSnapshot, SystemClock,
    TimerDefaults, TimerPhase,
};
