//! treffpunkt-core – Gemeinsame Typen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Treffpunkt-Crates gemeinsam genutzt werden.

pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use types::{ChannelId, ConnectionId, MessageId, Rolle, UserId};
