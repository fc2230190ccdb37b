//! Link seam between primary and companion.
//!
//! Two delivery channels exist:
//! - messages: best-effort, dropped when the peer is unreachable
//! - application context: a single latest-value slot that is handed over
//!   immediately when the peer is reachable, otherwise on reconnect
//!
//! [`LoopbackTransport::pair`] wires two endpoints together in-process.
//! Payloads cross the loopback as encoded JSON and are decoded on receipt,
//! so the receiving side sees exactly what a real link would deliver.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use super::wire::{ApplicationContext, Message};
use super::SyncError;

/// What an endpoint observes on its side of the link.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Message(Message),
    ApplicationContext(ApplicationContext),
    Reachability(bool),
}

#[async_trait]
pub trait Transport: Send + Sync {
    fn is_reachable(&self) -> bool;

    fn is_activated(&self) -> bool;

    /// Best-effort delivery; fails fast when the peer is unreachable.
    async fn send_message(&self, message: Message) -> Result<(), SyncError>;

    /// Replace the context held for the peer.
    async fn update_application_context(
        &self,
        context: ApplicationContext,
    ) -> Result<(), SyncError>;
}

enum Frame {
    Message(Value),
    Context(Value),
    Reachability(bool),
}

struct LinkState {
    reachable: AtomicBool,
    activated: AtomicBool,
}

/// The receiving half of one endpoint.
struct Endpoint {
    tx: mpsc::UnboundedSender<Frame>,
    pending_context: Mutex<Option<Value>>,
}

impl Endpoint {
    fn deliver(&self, frame: Frame) -> Result<(), SyncError> {
        self.tx.send(frame).map_err(|_| SyncError::Closed)
    }

    fn pending(&self) -> MutexGuard<'_, Option<Value>> {
        self.pending_context
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// One side of an in-process link.
pub struct LoopbackTransport {
    state: Arc<LinkState>,
    peer: Arc<Endpoint>,
}

/// Inbound stream for one endpoint.
pub struct LoopbackInbox {
    rx: mpsc::UnboundedReceiver<Frame>,
}

/// Flips link-wide reachability and activation.
#[derive(Clone)]
pub struct LinkControl {
    state: Arc<LinkState>,
    endpoints: [Arc<Endpoint>; 2],
}

pub struct LoopbackPair {
    pub primary: LoopbackTransport,
    pub primary_inbox: LoopbackInbox,
    pub companion: LoopbackTransport,
    pub companion_inbox: LoopbackInbox,
    pub control: LinkControl,
}

impl LoopbackTransport {
    /// Build an activated, reachable link.
    pub fn pair() -> LoopbackPair {
        let state = Arc::new(LinkState {
            reachable: AtomicBool::new(true),
            activated: AtomicBool::new(true),
        });
        let (primary_tx, primary_rx) = mpsc::unbounded_channel();
        let (companion_tx, companion_rx) = mpsc::unbounded_channel();
        let primary_end = Arc::new(Endpoint {
            tx: primary_tx,
            pending_context: Mutex::new(None),
        });
        let companion_end = Arc::new(Endpoint {
            tx: companion_tx,
            pending_context: Mutex::new(None),
        });

        LoopbackPair {
            primary: LoopbackTransport {
                state: Arc::clone(&state),
                peer: Arc::clone(&companion_end),
            },
            primary_inbox: LoopbackInbox { rx: primary_rx },
            companion: LoopbackTransport {
                state: Arc::clone(&state),
                peer: Arc::clone(&primary_end),
            },
            companion_inbox: LoopbackInbox { rx: companion_rx },
            control: LinkControl {
                state,
                endpoints: [primary_end, companion_end],
            },
        }
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    fn is_reachable(&self) -> bool {
        self.state.reachable.load(Ordering::SeqCst)
    }

    fn is_activated(&self) -> bool {
        self.state.activated.load(Ordering::SeqCst)
    }

    async fn send_message(&self, message: Message) -> Result<(), SyncError> {
        if !self.is_activated() {
            return Err(SyncError::NotActivated);
        }
        if !self.is_reachable() {
            return Err(SyncError::Unreachable);
        }
        self.peer.deliver(Frame::Message(message.encode()))
    }

    async fn update_application_context(
        &self,
        context: ApplicationContext,
    ) -> Result<(), SyncError> {
        if !self.is_activated() {
            return Err(SyncError::NotActivated);
        }
        let encoded = context.encode();
        // Reachability only flips while every pending slot is locked.
        let mut pending = self.peer.pending();
        if self.is_reachable() {
            *pending = None;
            return self.peer.deliver(Frame::Context(encoded));
        }
        *pending = Some(encoded);
        Ok(())
    }
}

impl LinkControl {
    /// Change reachability. Both endpoints observe the change; pending
    /// contexts are delivered on reconnect.
    pub fn set_reachable(&self, reachable: bool) {
        let mut slots: Vec<_> = self.endpoints.iter().map(|e| e.pending()).collect();
        let previous = self.state.reachable.swap(reachable, Ordering::SeqCst);
        if previous == reachable {
            return;
        }
        if reachable {
            for (endpoint, slot) in self.endpoints.iter().zip(slots.iter_mut()) {
                if let Some(context) = slot.take() {
                    if endpoint.deliver(Frame::Context(context)).is_err() {
                        tracing::debug!("context dropped, endpoint closed");
                    }
                }
            }
        }
        drop(slots);
        for endpoint in &self.endpoints {
            if endpoint.deliver(Frame::Reachability(reachable)).is_err() {
                tracing::debug!("reachability change dropped, endpoint closed");
            }
        }
    }

    pub fn set_activated(&self, activated: bool) {
        self.state.activated.store(activated, Ordering::SeqCst);
    }
}

impl LoopbackInbox {
    /// Next decodable event. Malformed payloads are skipped; `None` once the
    /// sending side is gone.
    pub async fn recv(&mut self) -> Option<LinkEvent> {
        loop {
            if let Some(event) = decode_frame(self.rx.recv().await?) {
                return Some(event);
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<LinkEvent> {
        loop {
            if let Some(event) = decode_frame(self.rx.try_recv().ok()?) {
                return Some(event);
            }
        }
    }
}

fn decode_frame(frame: Frame) -> Option<LinkEvent> {
    let decoded = match frame {
        Frame::Message(raw) => Message::decode(&raw).map(LinkEvent::Message),
        Frame::Context(raw) => ApplicationContext::decode(&raw).map(LinkEvent::ApplicationContext),
        Frame::Reachability(reachable) => Ok(LinkEvent::Reachability(reachable)),
    };
    match decoded {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::debug!(error = %e, "dropping undecodable payload");
            None
        }
    }
}
