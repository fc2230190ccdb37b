//! Primary/companion device synchronization.
//!
//! The primary device owns the session; the companion is a pure projection
//! of it that can issue a handful of remote commands.
//!
//! - [`wire`]: the tagged message codec shared by both ends
//! - [`transport`]: the link seam plus an in-process loopback pair
//! - [`primary`]: applies companion commands to a [`SessionController`]
//!   and pushes presets and timer state
//! - [`companion`]: mirror of the primary's presets and timer state
//!
//! [`SessionController`]: crate::controller::SessionController

pub mod companion;
pub mod primary;
pub mod transport;
pub mod wire;

use thiserror::Error;

pub use companion::CompanionMirror;
pub use primary::PrimaryLink;
pub use transport::{LinkEvent, LoopbackTransport, Transport};
pub use wire::{ApplicationContext, Message};

/// Delivery errors on the companion link.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    #[error("Peer device is not reachable")]
    Unreachable,

    #[error("Link is not activated")]
    NotActivated,

    #[error("Link closed")]
    Closed,
}

/// Decode errors for incoming payloads.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WireError {
    #[error("Message has no 'type' tag")]
    MissingType,

    #[error("Unknown message type '{0}'")]
    UnknownType(String),

    #[error("Malformed preset payload: {0}")]
    MalformedPreset(String),

    #[error("Malformed timer state: {0}")]
    MalformedState(String),

    #[error("Message is not an object")]
    NotAnObject,
}
