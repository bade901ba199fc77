//! treffpunkt-protocol – Wire-Protokoll zwischen Client und Server
//!
//! Jede Nachricht ist ein [`Frame`] `{request_id, event, data}`, laengen-
//! praefixiert auf dem TCP-Stream uebertragen (siehe [`wire`]).
//! Eingehende Frames werden zu [`ClientEreignis`] geparst, ausgehende
//! Server-Pushes verwenden die Namen aus [`ereignisse::namen`].

pub mod ereignisse;
pub mod error;
pub mod frame;
pub mod wire;

pub use ereignisse::ClientEreignis;
pub use error::{ProtokollFehler, ProtokollResult};
pub use frame::{ErrorCode, FehlerAntwort, Frame};
pub use wire::FrameCodec;
