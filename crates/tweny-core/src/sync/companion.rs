//! Companion side of the link: a read-only mirror plus remote commands.
//!
//! The mirror never edits timer state itself. Every incoming snapshot or
//! preset list replaces what it holds wholesale.

use std::sync::Arc;

use super::transport::{LinkEvent, Transport};
use super::wire::Message;
use super::SyncError;
use crate::presets::SessionPreset;
use crate::timer::{SessionSnapshot, TimerPhase};

pub struct CompanionMirror {
    transport: Arc<dyn Transport>,
    presets: Vec<SessionPreset>,
    state: Option<SessionSnapshot>,
    is_connected: bool,
}

impl CompanionMirror {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let is_connected = transport.is_reachable();
        Self {
            transport,
            presets: Vec::new(),
            state: None,
            is_connected,
        }
    }

    pub fn presets(&self) -> &[SessionPreset] {
        &self.presets
    }

    /// Last snapshot received from the primary.
    pub fn state(&self) -> Option<&SessionSnapshot> {
        self.state.as_ref()
    }

    pub fn phase(&self) -> TimerPhase {
        self.state.as_ref().map(|s| s.phase).unwrap_or_default()
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    /// Called once the link is up (app open): resync from the primary.
    pub async fn activate(&mut self) {
        self.is_connected = self.transport.is_reachable();
        if self.is_connected {
            self.send_best_effort(Message::RequestState).await;
        }
    }

    pub async fn handle_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Message(Message::Presets(presets)) => self.presets = presets,
            LinkEvent::Message(Message::TimerState(snapshot)) => self.state = Some(snapshot),
            LinkEvent::Message(other) => {
                tracing::debug!(kind = other.tag(), "ignoring companion-bound command");
            }
            LinkEvent::ApplicationContext(context) => self.presets = context.presets,
            LinkEvent::Reachability(reachable) => {
                self.is_connected = reachable;
                if reachable {
                    self.send_best_effort(Message::RequestState).await;
                }
            }
        }
    }

    pub async fn start_session(&self, preset: &SessionPreset) -> Result<(), SyncError> {
        self.send(Message::StartSession(preset.clone())).await
    }

    pub async fn toggle_pause(&self) -> Result<(), SyncError> {
        self.send(Message::PauseResume).await
    }

    pub async fn stop(&self) -> Result<(), SyncError> {
        self.send(Message::Stop).await
    }

    pub async fn request_state(&self) -> Result<(), SyncError> {
        self.send(Message::RequestState).await
    }

    async fn send(&self, message: Message) -> Result<(), SyncError> {
        if !self.transport.is_reachable() {
            return Err(SyncError::Unreachable);
        }
        self.transport.send_message(message).await
    }

    async fn send_best_effort(&self, message: Message) {
        if let Err(e) = self.send(message).await {
            tracing::debug!(error = %e, "companion request dropped");
        }
    }
}
