//! treffpunkt-signaling – Echtzeit-Kern
//!
//! Verwaltet Live-Verbindungen, Raum-Mitgliedschaften und Voice-Presence und
//! verteilt Ereignisse an die richtigen Verbindungen.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (SignalingServer)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein lokaler Task, eine Sende-Queue)
//!     |
//!     v
//! MessageDispatcher
//!     |
//!     +-- auth_handler    (authenticate)
//!     +-- raum_handler    (join/leave channel, voice room, typing)
//!     +-- voice_handler   (voice_join, leave, participants, mute, kick)
//!     +-- chat_handler    (send, delete, reaction)
//!     +-- webrtc_handler  (offer, answer, ice)
//!
//! VerbindungsRegistry – Live-Verbindungen und ihre Queues
//! RaumManager         – Raum <-> Verbindungen
//! EventRouter         – Fanout an Raum / Verbindung / alle
//! SignalingRelay      – WebRTC-Signale an genau ein Ziel
//! VoicePresence       – Voice-Teilnehmer und tragende Verbindungen
//! ```

pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod relay;
pub mod rooms;
pub mod router;
pub mod server_state;
pub mod sperren;
pub mod tcp;
pub mod voice;

#[cfg(test)]
mod tests;

pub use connection::ClientConnection;
pub use dispatcher::{DispatcherContext, MessageDispatcher};
pub use error::{SignalingError, SignalingResult};
pub use registry::VerbindungsRegistry;
pub use relay::{SignalArt, SignalingRelay};
pub use rooms::{RaumManager, RaumName};
pub use router::EventRouter;
pub use server_state::{SignalingConfig, SignalingState, Trennung};
pub use tcp::SignalingServer;
pub use voice::{Beitritt, VoicePresence};
