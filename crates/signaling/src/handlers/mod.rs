//! Handler fuer alle Client-Ereignisse
//!
//! Jeder Handler liefert die `data` der `ok`-Antwort oder einen Fehler, den
//! der Dispatcher in eine `error`-Antwort uebersetzt.

pub mod auth_handler;
pub mod chat_handler;
pub mod raum_handler;
pub mod voice_handler;
pub mod webrtc_handler;
