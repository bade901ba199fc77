//! treffpunkt-chat – Text-Chat
//!
//! Der [`ChatService`] validiert und speichert Nachrichten und Reaktionen.
//! Das Verteilen der daraus entstehenden Ereignisse (`new_message`,
//! `message_deleted`, `reaction_added`) uebernimmt die Signalisierung.

pub mod error;
pub mod service;
pub mod types;


pub use error::{ChatError, ChatResult};
pub use service::ChatService;
pub use types::{HistoryAnfrage, MAX_EMOJI_LAENGE, MAX_NACHRICHT_LAENGE};
