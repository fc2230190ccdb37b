//! Primary side of the companion link.
//!
//! Commands from the companion are delegated to the [`SessionController`];
//! nothing here re-derives timer logic. Outbound pushes are best-effort and
//! are skipped while the companion is unreachable.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use super::transport::{LinkEvent, LoopbackInbox, Transport};
use super::wire::{ApplicationContext, Message};
use crate::controller::SessionController;
use crate::events::Event;
use crate::presets::SessionPreset;

pub struct PrimaryLink {
    transport: Arc<dyn Transport>,
    controller: SessionController,
    presets: RwLock<Vec<SessionPreset>>,
}

impl PrimaryLink {
    pub fn new(
        transport: Arc<dyn Transport>,
        controller: SessionController,
        presets: Vec<SessionPreset>,
    ) -> Self {
        Self {
            transport,
            controller,
            presets: RwLock::new(presets),
        }
    }

    pub fn presets(&self) -> Vec<SessionPreset> {
        self.presets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Hand the companion the current preset list as application context.
    pub async fn activate(&self) {
        if !self.transport.is_activated() {
            tracing::debug!("link not activated, context not pushed");
            return;
        }
        let context = ApplicationContext {
            presets: self.presets(),
        };
        if let Err(e) = self.transport.update_application_context(context).await {
            tracing::debug!(error = %e, "application context not updated");
        }
    }

    /// Replace the preset list and push it over both channels.
    pub async fn update_presets(&self, presets: Vec<SessionPreset>) {
        *self
            .presets
            .write()
            .unwrap_or_else(PoisonError::into_inner) = presets;
        self.push_presets().await;
        self.activate().await;
    }

    pub async fn push_presets(&self) {
        self.send(Message::Presets(self.presets())).await;
    }

    pub async fn push_state(&self) {
        let snapshot = self.controller.snapshot().await;
        self.send(Message::TimerState(snapshot)).await;
    }

    pub async fn handle_event(&self, event: LinkEvent) {
        match event {
            LinkEvent::Message(message) => self.handle_message(message).await,
            LinkEvent::Reachability(true) => {
                tracing::debug!("companion reachable");
                self.push_presets().await;
                self.push_state().await;
            }
            LinkEvent::Reachability(false) => tracing::debug!("companion unreachable"),
            LinkEvent::ApplicationContext(_) => {
                tracing::debug!("ignoring application context from companion");
            }
        }
    }

    async fn handle_message(&self, message: Message) {
        let kind = message.tag();
        tracing::debug!(kind, "companion command");
        match message {
            Message::StartSession(preset) => {
                self.controller.start_session(Some(preset)).await;
            }
            Message::PauseResume => {
                self.controller.toggle_pause().await;
            }
            Message::Stop => {
                self.controller.stop_session().await;
            }
            Message::RequestState => {
                self.push_state().await;
                self.push_presets().await;
            }
            Message::Presets(_) | Message::TimerState(_) => {
                tracing::debug!(kind, "ignoring primary-bound push");
            }
        }
    }

    /// Mirror every state-bearing controller event to the companion.
    pub async fn forward(&self, event: &Event) {
        if let Some(snapshot) = event.snapshot() {
            self.send(Message::TimerState(snapshot.clone())).await;
        }
    }

    /// Serve the link until both the inbox and the event stream close.
    pub async fn run(&self, mut inbox: LoopbackInbox, mut events: broadcast::Receiver<Event>) {
        self.activate().await;
        let mut inbox_open = true;
        let mut events_open = true;
        while inbox_open || events_open {
            tokio::select! {
                incoming = inbox.recv(), if inbox_open => match incoming {
                    Some(event) => self.handle_event(event).await,
                    None => inbox_open = false,
                },
                event = events.recv(), if events_open => match event {
                    Ok(event) => self.forward(&event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "event stream lagged, resyncing");
                        self.push_state().await;
                    }
                    Err(RecvError::Closed) => events_open = false,
                },
            }
        }
    }

    async fn send(&self, message: Message) {
        if !self.transport.is_reachable() {
            return;
        }
        let kind = message.tag();
        if let Err(e) = self.transport.send_message(message).await {
            tracing::debug!(kind, error = %e, "push to companion dropped");
        }
    }
}
