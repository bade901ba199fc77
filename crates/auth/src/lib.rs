//! treffpunkt-auth – Identity Provider
//!
//! Dieses Crate implementiert:
//! - Passwort-Hashing mit Argon2id
//! - Session-Tokens (in-memory mit TTL)
//! - AuthService (Registrierung, Login, Logout)
//! - den [`IdentityProvider`]-Trait, ueber den die Signalisierung Tokens
//!   prueft und Rollen nachschlaegt

pub mod error;
pub mod identity;
pub mod password;
pub mod service;
pub mod session;

pub use error::{AuthError, AuthResult};
pub use identity::{Identitaet, IdentityProvider};
pub use password::{passwort_hashen, passwort_verifizieren};
pub use service::AuthService;
pub use session::{Session, SessionStore};
